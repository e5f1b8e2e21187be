// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for platform integrations.
//!
//! Trellis never touches native widgets or the platform frame clock
//! directly. A host integration provides two pieces:
//!
//! - **Widget host**: implements [`WidgetHost`] to allocate native widgets
//!   (DOM elements, native views) and apply property writes to them. The
//!   commit layer is the only caller of [`WidgetHost::set`].
//!
//! - **Frame driver**: implements [`FrameDriver`] to schedule frame
//!   callbacks (e.g. `requestAnimationFrame`) and report the viewport size.
//!   The host calls [`Engine::on_frame`](crate::engine::Engine::on_frame)
//!   from the scheduled callback and
//!   [`Engine::notify_resize`](crate::engine::Engine::notify_resize) from
//!   its resize listener.
//!
//! # Frame loop pseudocode
//!
//! ```rust,ignore
//! // Resize listener
//! fn on_window_resize() {
//!     engine.notify_resize();
//! }
//!
//! // requestAnimationFrame callback
//! fn on_animation_frame(timestamp_ms: f64) {
//!     engine.on_frame(FrameTime::from_millis_f64(timestamp_ms));
//! }
//! ```

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use kurbo::{Size, Vec2};

use crate::transform::TransformParts;

/// A native widget handle issued by a [`WidgetHost`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(pub u32);

impl fmt::Debug for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WidgetId({})", self.0)
    }
}

/// One property write to a native widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WidgetProperty {
    /// Opacity in `[0, 1]`.
    Opacity(f64),
    /// Width in pixels.
    Width(f64),
    /// Height in pixels.
    Height(f64),
    /// Absolute 2-D transform.
    Transform(TransformParts),
    /// Transform origin as a fraction of the widget size.
    Origin(Vec2),
    /// Whether the widget is shown at all.
    Visible(bool),
    /// Whether the widget receives input.
    Enabled(bool),
}

/// Allocates native widgets and applies property writes.
pub trait WidgetHost {
    /// Allocates a widget of `kind` inside `container`.
    fn allocate(&mut self, kind: &str, container: WidgetId) -> WidgetId;

    /// Releases a widget. The widget must not be used afterwards.
    fn deallocate(&mut self, widget: WidgetId);

    /// Writes one property.
    fn set(&mut self, widget: WidgetId, property: WidgetProperty);

    /// Returns the widget's laid-out size.
    fn measure(&self, widget: WidgetId) -> Size;
}

/// A shared, dynamically typed widget host.
pub type SharedHost = Rc<RefCell<dyn WidgetHost>>;

/// Identifies a scheduled frame callback so it can be cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Schedules frame callbacks and reports the viewport.
///
/// All methods take `&self`; implementations keep their own interior
/// mutability so the engine never holds a borrow across a host call.
pub trait FrameDriver {
    /// Schedules one call to
    /// [`Engine::on_frame`](crate::engine::Engine::on_frame).
    fn request_frame(&self) -> FrameRequest;

    /// Cancels a scheduled frame.
    fn cancel_frame(&self, request: FrameRequest);

    /// The current viewport size.
    fn viewport(&self) -> Size;

    /// Reads the host's monotonic clock, if it has one. Used only to
    /// timestamp trace phases.
    fn now(&self) -> Option<crate::time::FrameTime> {
        None
    }
}
