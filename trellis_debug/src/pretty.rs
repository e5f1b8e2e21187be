// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are printed in microseconds.

use std::io::Write;

use trellis_core::engine::LoopState;
use trellis_core::time::FrameTime;
use trellis_core::trace::{
    FrameBeginEvent, FrameSummary, LoopStateEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    ResizeEndEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(t: FrameTime) -> f64 {
    nanos_to_us(t.as_nanos())
}

fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::PreTick => "pre-tick",
        PhaseKind::Tick => "tick",
        PhaseKind::PostTick => "post-tick",
        PhaseKind::Dirty => "dirty",
    }
}

fn state_name(state: LoopState) -> &'static str {
    match state {
        LoopState::Stopped => "stopped",
        LoopState::Running => "running",
        LoopState::Idle => "idle",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] frame={} now={:.1}µs",
            e.frame_index,
            us(e.now),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            phase_name(e.phase),
            us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs tasks={}",
            e.frame_index,
            phase_name(e.phase),
            us(e.timestamp),
            e.tasks,
        );
    }

    fn on_resize_end(&mut self, e: &ResizeEndEvent) {
        let _ = writeln!(
            self.writer,
            "[resize:end] frame={} at {:.1}µs",
            e.frame_index,
            us(e.now),
        );
    }

    fn on_loop_state(&mut self, e: &LoopStateEvent) {
        let _ = writeln!(
            self.writer,
            "[loop] frame={} {} -> {}",
            e.frame_index,
            state_name(e.from),
            state_name(e.to),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let activity = if s.active { "active" } else { "quiet" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} tasks={}/{}/{}/{} pre={:.1}µs tick={:.1}µs \
             post={:.1}µs dirty={:.1}µs {activity}",
            s.frame_index,
            s.tasks[0],
            s.tasks[1],
            s.tasks[2],
            s.tasks[3],
            nanos_to_us(s.phase_nanos[0]),
            nanos_to_us(s.phase_nanos[1]),
            nanos_to_us(s.phase_nanos[2]),
            nanos_to_us(s.phase_nanos[3]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_begin_line() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_begin(&FrameBeginEvent {
            frame_index: 1,
            now: FrameTime(1_000_000),
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.starts_with("[frame]"), "got: {output}");
        assert!(output.contains("frame=1"), "got: {output}");
        assert!(output.contains("now=1000.0µs"), "got: {output}");
    }

    #[test]
    fn loop_state_and_summary_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_loop_state(&LoopStateEvent {
            frame_index: 4,
            from: LoopState::Running,
            to: LoopState::Idle,
        });
        sink.on_frame_summary(&FrameSummary {
            frame_index: 4,
            now: FrameTime::ZERO,
            tasks: [0, 1, 0, 0],
            phase_nanos: [0, 2500, 0, 0],
            active: false,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2, "got: {output}");
        assert_eq!(lines[0], "[loop] frame=4 running -> idle");
        assert!(lines[1].contains("tasks=0/1/0/0"), "got: {output}");
        assert!(lines[1].contains("tick=2.5µs"), "got: {output}");
        assert!(lines[1].ends_with("quiet"), "got: {output}");
    }
}
