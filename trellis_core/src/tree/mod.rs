// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render tree data model.
//!
//! A *node* is a position in the render tree. Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that goes stale when
//!   the node is removed. Using a stale handle panics.
//! - Topology: parent, first-child and sibling links forming an ordered tree.
//! - A [`SizeNode`](crate::node::SizeNode) and a
//!   [`LayoutNode`](crate::node::LayoutNode) holding the node's own inputs.
//! - Once attached, a resolved size stream (lifted from the parent's size)
//!   and an absolute layout stream (lifted from the parent's layout and the
//!   node's own size), so ancestors always resolve before descendants.
//! - Optionally a surface kind. Surface nodes get a native widget the first
//!   time they commit; plain nodes only group and position their children.
//!
//! Nodes live in struct-of-arrays storage with index-based handles.

mod id;
mod store;
mod traverse;

pub use id::{INVALID, NodeId};
pub use store::RenderTree;
pub use traverse::Children;

pub(crate) use traverse::subtree;
