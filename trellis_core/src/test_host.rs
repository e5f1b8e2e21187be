// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Test doubles for the host contract.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use kurbo::Size;

use crate::host::{FrameDriver, FrameRequest, WidgetHost, WidgetId, WidgetProperty};

/// Records every host call.
#[derive(Debug, Default)]
pub(crate) struct RecordingHost {
    next_id: u32,
    pub(crate) allocated: Vec<(WidgetId, String, WidgetId)>,
    pub(crate) deallocated: Vec<WidgetId>,
    log: Vec<(WidgetId, WidgetProperty)>,
    measured: BTreeMap<u32, Size>,
}

impl RecordingHost {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    pub(crate) fn set_measured(&mut self, widget: WidgetId, size: Size) {
        self.measured.insert(widget.0, size);
    }

    pub(crate) fn writes_to(&self, widget: WidgetId) -> Vec<WidgetProperty> {
        self.log
            .iter()
            .filter(|(w, _)| *w == widget)
            .map(|(_, p)| *p)
            .collect()
    }

    pub(crate) fn count_of(&self, widget: WidgetId, pred: impl Fn(&WidgetProperty) -> bool) -> usize {
        self.log
            .iter()
            .filter(|(w, p)| *w == widget && pred(p))
            .count()
    }

    pub(crate) fn last_width(&self, widget: WidgetId) -> Option<f64> {
        self.writes_to(widget).iter().rev().find_map(|p| match p {
            WidgetProperty::Width(w) => Some(*w),
            _ => None,
        })
    }

    pub(crate) fn last_height(&self, widget: WidgetId) -> Option<f64> {
        self.writes_to(widget).iter().rev().find_map(|p| match p {
            WidgetProperty::Height(h) => Some(*h),
            _ => None,
        })
    }

    pub(crate) fn write_count(&self) -> usize {
        self.log.len()
    }

    pub(crate) fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl WidgetHost for RecordingHost {
    fn allocate(&mut self, kind: &str, container: WidgetId) -> WidgetId {
        let id = WidgetId(self.next_id);
        self.next_id += 1;
        self.allocated.push((id, kind.to_string(), container));
        id
    }

    fn deallocate(&mut self, widget: WidgetId) {
        self.deallocated.push(widget);
    }

    fn set(&mut self, widget: WidgetId, property: WidgetProperty) {
        self.log.push((widget, property));
    }

    fn measure(&self, widget: WidgetId) -> Size {
        self.measured.get(&widget.0).copied().unwrap_or(Size::ZERO)
    }
}

/// A frame driver whose frames are delivered by hand.
#[derive(Debug)]
pub(crate) struct ManualDriver {
    viewport: Cell<Size>,
    next: Cell<u64>,
    pending: RefCell<Vec<FrameRequest>>,
    pub(crate) cancelled: RefCell<Vec<FrameRequest>>,
}

impl ManualDriver {
    pub(crate) fn new(viewport: Size) -> Self {
        Self {
            viewport: Cell::new(viewport),
            next: Cell::new(0),
            pending: RefCell::new(Vec::new()),
            cancelled: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn set_viewport(&self, size: Size) {
        self.viewport.set(size);
    }

    /// Whether a frame is scheduled and not cancelled.
    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.borrow().is_empty()
    }

    /// Consumes the scheduled frame, if any.
    pub(crate) fn take_pending(&self) -> bool {
        let mut pending = self.pending.borrow_mut();
        let had = !pending.is_empty();
        pending.clear();
        had
    }
}

impl FrameDriver for ManualDriver {
    fn request_frame(&self) -> FrameRequest {
        let request = FrameRequest(self.next.get());
        self.next.set(request.0 + 1);
        self.pending.borrow_mut().push(request);
        request
    }

    fn cancel_frame(&self, request: FrameRequest) {
        self.pending.borrow_mut().retain(|r| *r != request);
        self.cancelled.borrow_mut().push(request);
    }

    fn viewport(&self) -> Size {
        self.viewport.get()
    }
}
