// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for trellis frame-loop
//! diagnostics.
//!
//! This crate provides [`TraceSink`](trellis_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//! - [`Tee`]: forwards every event to two sinks.

pub mod chrome;
pub mod pretty;
pub mod recorder;

use trellis_core::trace::{
    FrameBeginEvent, FrameSummary, LoopStateEvent, PhaseBeginEvent, PhaseEndEvent,
    ResizeEndEvent, TraceSink,
};

/// A [`TraceSink`] that forwards each event to `A` and then `B`.
#[derive(Debug, Default)]
pub struct Tee<A, B>(pub A, pub B);

impl<A: TraceSink, B: TraceSink> TraceSink for Tee<A, B> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.0.on_frame_begin(e);
        self.1.on_frame_begin(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.0.on_phase_begin(e);
        self.1.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.0.on_phase_end(e);
        self.1.on_phase_end(e);
    }

    fn on_resize_end(&mut self, e: &ResizeEndEvent) {
        self.0.on_resize_end(e);
        self.1.on_resize_end(e);
    }

    fn on_loop_state(&mut self, e: &LoopStateEvent) {
        self.0.on_loop_state(e);
        self.1.on_loop_state(e);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.0.on_frame_summary(s);
        self.1.on_frame_summary(s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{RecordedEvent, RecorderSink, decode};
    use trellis_core::time::FrameTime;

    #[test]
    fn tee_forwards_to_both_sinks() {
        let mut tee = Tee(RecorderSink::new(), RecorderSink::new());
        tee.on_frame_begin(&FrameBeginEvent {
            frame_index: 3,
            now: FrameTime::from_millis(16),
        });

        for rec in [&tee.0, &tee.1] {
            let events: Vec<_> = decode(rec.as_bytes()).collect();
            assert!(
                matches!(events[..], [RecordedEvent::FrameBegin(e)] if e.frame_index == 3),
                "got {events:?}"
            );
        }
    }
}
