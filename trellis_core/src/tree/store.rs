// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation and topology management.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::layout::LayoutSpec;
use crate::node::{LayoutNode, SizeNode, SpecNode};
use crate::size::NodeSize;
use crate::stream::{Stream, SubscriptionSet};

use super::id::{INVALID, NodeId};
use super::traverse::Children;

/// Struct-of-arrays storage for all nodes of one render root.
///
/// Nodes are addressed by [`NodeId`] handles. Destroyed nodes are recycled
/// through a free list, and generation counters reject stale handles.
#[derive(Debug, Default)]
pub struct RenderTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Inputs (set by callers) --
    pub(crate) size_node: Vec<SizeNode>,
    pub(crate) layout_node: Vec<LayoutNode>,
    pub(crate) kind: Vec<Option<String>>,

    // -- Resolved outputs (wired on attach) --
    pub(crate) size_out: Vec<Option<Stream<NodeSize>>>,
    pub(crate) layout_out: Vec<Option<Stream<LayoutSpec>>>,
    pub(crate) subscriptions: Vec<SubscriptionSet>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl RenderTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // -- Allocation API --

    /// Creates a detached node. `kind` names the native widget a surface node
    /// is backed by; `None` creates a plain grouping node.
    pub fn create_node(&mut self, kind: Option<&str>) -> NodeId {
        let kind = kind.map(ToString::to_string);
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.size_node[i] = SizeNode::new();
            self.layout_node[i] = LayoutNode::new();
            self.kind[i] = kind;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.size_node.push(SizeNode::new());
            self.layout_node.push(LayoutNode::new());
            self.kind.push(kind);
            self.size_out.push(None);
            self.layout_out.push(None);
            self.subscriptions.push(SubscriptionSet::new());
            self.generation.push(0);
            idx
        };

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node: unlinks it from its parent, disconnects its streams,
    /// and frees its slot.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (destroy them first) or if the handle
    /// is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );
        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }
        self.detach_outputs(idx);
        self.size_node[idx as usize].clear_bindings();
        self.layout_node[idx as usize].clear_bindings();
        self.kind[idx as usize] = None;

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    /// Whether the tree has no live nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent, or
    /// if `child` is an ancestor of `parent`.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(p != c, "node cannot be its own child");
        let mut ancestor = self.parent[p as usize];
        while ancestor != INVALID {
            assert!(ancestor != c, "cannot add an ancestor as a child");
            ancestor = self.parent[ancestor as usize];
        }

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `child` from its parent. Its streams stay connected.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] != INVALID,
            "node has no parent"
        );
        self.unlink_from_parent(child.idx);
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns `id` and all of its descendants, parents before children.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.validate(id);
        super::traverse::subtree(self, id.idx)
            .into_iter()
            .map(|idx| self.id_at(idx))
            .collect()
    }

    // -- Node data --

    /// The surface kind of a node, or `None` for a grouping node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<&str> {
        self.validate(id);
        self.kind[id.idx as usize].as_deref()
    }

    /// The size inputs of a node.
    #[must_use]
    pub fn size_node(&self, id: NodeId) -> &SizeNode {
        self.validate(id);
        &self.size_node[id.idx as usize]
    }

    /// Mutable access to the size inputs of a node.
    pub fn size_node_mut(&mut self, id: NodeId) -> &mut SizeNode {
        self.validate(id);
        &mut self.size_node[id.idx as usize]
    }

    /// The layout inputs of a node.
    #[must_use]
    pub fn layout_node(&self, id: NodeId) -> &LayoutNode {
        self.validate(id);
        &self.layout_node[id.idx as usize]
    }

    /// Mutable access to the layout inputs of a node.
    pub fn layout_node_mut(&mut self, id: NodeId) -> &mut LayoutNode {
        self.validate(id);
        &mut self.layout_node[id.idx as usize]
    }

    /// The resolved size stream, once the node is attached.
    #[must_use]
    pub fn size_stream(&self, id: NodeId) -> Option<&Stream<NodeSize>> {
        self.validate(id);
        self.size_out[id.idx as usize].as_ref()
    }

    /// The absolute layout stream, once the node is attached.
    #[must_use]
    pub fn layout_stream(&self, id: NodeId) -> Option<&Stream<LayoutSpec>> {
        self.validate(id);
        self.layout_out[id.idx as usize].as_ref()
    }

    /// The last resolved size of a node.
    #[must_use]
    pub fn size(&self, id: NodeId) -> Option<NodeSize> {
        self.size_stream(id).and_then(Stream::get)
    }

    /// The last composed absolute layout of a node.
    #[must_use]
    pub fn layout(&self, id: NodeId) -> Option<LayoutSpec> {
        self.layout_stream(id).and_then(Stream::get)
    }

    // -- Internal helpers --

    /// Builds the current handle for a live slot.
    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Installs the resolved output streams of a node and the subscriptions
    /// that keep them fed.
    pub(crate) fn set_outputs(
        &mut self,
        idx: u32,
        size: Stream<NodeSize>,
        layout: Stream<LayoutSpec>,
        subscriptions: SubscriptionSet,
    ) {
        self.detach_outputs(idx);
        self.size_out[idx as usize] = Some(size);
        self.layout_out[idx as usize] = Some(layout);
        self.subscriptions[idx as usize] = subscriptions;
    }

    /// Disconnects the output streams of a node from their sources.
    pub(crate) fn detach_outputs(&mut self, idx: u32) {
        self.subscriptions[idx as usize].clear();
        if let Some(size) = self.size_out[idx as usize].take() {
            size.detach();
        }
        if let Some(layout) = self.layout_out[idx as usize].take() {
            layout.detach();
        }
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Removes `idx` from its parent's child list.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}
