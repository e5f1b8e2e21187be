// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reactive layout propagation and frame-commit engine.
//!
//! `trellis_core` drives a tree of visual surfaces mounted on a native or DOM
//! widget host. Size and layout inputs flow through a graph of reactive
//! streams; once per frame, only the properties that actually changed are
//! written to host widgets. It is `no_std` compatible (with `alloc`) and
//! single-threaded.
//!
//! # Architecture
//!
//! ```text
//!   Host resize / input
//!       │
//!       ▼
//!   Engine pre-tick ──► Stream graph (size lift2, layout lift3)
//!                              │
//!                 ┌────────────┘
//!                 ▼
//!   SizeNode / LayoutNode ──► resolve_size / compose_layout
//!                                      │
//!                 ┌────────────────────┘
//!                 ▼
//!   DirtyTracker marks ──► Engine dirty phase ──► WidgetOutput ──► WidgetHost
//! ```
//!
//! **[`stream`]**: Push-based reactive values with `Start`/`Update`/`End`
//! phases, plus `map`, `pipe` and the `lift` family of combinators.
//!
//! **[`size`]** and **[`layout`]**: Pure resolution of size specs against a
//! parent size, and composition of local layout under an inherited one.
//!
//! **[`node`]**: `SizeNode` and `LayoutNode` accumulate per-key inputs, each
//! bound to a literal or a stream.
//!
//! **[`tree`]**: Struct-of-arrays render tree with generational handles.
//!
//! **[`engine`]**: The four-phase frame loop with resize debounce and idle
//! detection.
//!
//! **[`commit`]**: Per-widget cached state that writes only changed
//! properties.
//!
//! **[`context`]**: A mounted render root tying a tree, a host and an engine
//! together.
//!
//! **[`host`]**: The traits a platform integration implements.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod commit;
pub mod context;
pub mod dirty;
pub mod engine;
pub mod error;
pub mod events;
pub mod host;
pub mod layout;
pub mod node;
pub mod size;
pub mod stream;
pub mod time;
pub mod trace;
pub mod transform;
pub mod tree;

#[cfg(test)]
mod test_host;
