// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! A mounted [`Context`](crate::context::Context) coalesces pending widget
//! commits with a [`DirtyTracker`](understory_dirty::DirtyTracker) keyed by
//! node slot. Stream listeners only mark a channel; the single flush task
//! queued on the engine's dirty phase drains both channels and writes each
//! marked widget once, however many times it was marked during the frame.
//!
//! Both channels are local-only: size and layout already cascade through
//! the stream graph, so marking never propagates to descendants.
//!
//! [`SIZE`] is drained before [`LAYOUT`] so that a widget's size is on the
//! host before its transform is.

use understory_dirty::Channel;

/// Resolved size changed; requires a size commit.
pub const SIZE: Channel = Channel::new(0);

/// Absolute layout changed; requires a layout commit.
pub const LAYOUT: Channel = Channel::new(1);
