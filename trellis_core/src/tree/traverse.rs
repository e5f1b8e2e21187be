// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree iteration.

use alloc::vec::Vec;

use super::id::{INVALID, NodeId};
use super::store::RenderTree;

/// Iterator over the direct children of a node, in insertion order.
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a RenderTree,
    next: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a RenderTree, first: u32) -> Self {
        Self { tree, next: first }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.next == INVALID {
            return None;
        }
        let idx = self.next;
        self.next = self.tree.next_sibling[idx as usize];
        Some(self.tree.id_at(idx))
    }
}

/// Collects `root` and its descendants in pre-order (parents before children).
pub(crate) fn subtree(tree: &RenderTree, root: u32) -> Vec<u32> {
    let mut order = Vec::new();
    let mut stack = Vec::from([root]);
    while let Some(idx) = stack.pop() {
        order.push(idx);
        // Push children in reverse so the first child is visited first.
        let start = stack.len();
        let mut child = tree.first_child[idx as usize];
        while child != INVALID {
            stack.push(child);
            child = tree.next_sibling[child as usize];
        }
        stack[start..].reverse();
    }
    order
}
