// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use trellis_core::time::FrameTime;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Phases become duration slices; everything else is an instant event.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let events: Vec<Value> = decode(bytes).map(to_json).collect();
    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn to_json(recorded: RecordedEvent) -> Value {
    match recorded {
        RecordedEvent::FrameBegin(e) => json!({
            "ph": "i",
            "name": "FrameBegin",
            "cat": "Loop",
            "ts": us(e.now),
            "pid": 0,
            "tid": 0,
            "s": "g",
            "args": {
                "frame_index": e.frame_index,
            }
        }),
        RecordedEvent::PhaseBegin(e) => json!({
            "ph": "B",
            "name": format!("{:?}", e.phase),
            "cat": "Frame",
            "ts": us(e.timestamp),
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }),
        RecordedEvent::PhaseEnd(e) => json!({
            "ph": "E",
            "name": format!("{:?}", e.phase),
            "cat": "Frame",
            "ts": us(e.timestamp),
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
                "tasks": e.tasks,
            }
        }),
        RecordedEvent::ResizeEnd(e) => json!({
            "ph": "i",
            "name": "ResizeEnd",
            "cat": "Viewport",
            "ts": us(e.now),
            "pid": 0,
            "tid": 0,
            "s": "p",
            "args": {
                "frame_index": e.frame_index,
            }
        }),
        RecordedEvent::LoopState(e) => json!({
            "ph": "i",
            "name": "LoopState",
            "cat": "Loop",
            "ts": 0,
            "pid": 0,
            "tid": 0,
            "s": "p",
            "args": {
                "frame_index": e.frame_index,
                "from": format!("{:?}", e.from),
                "to": format!("{:?}", e.to),
            }
        }),
        RecordedEvent::FrameSummary(s) => json!({
            "ph": "i",
            "name": "FrameSummary",
            "cat": "Summary",
            "ts": us(s.now),
            "pid": 0,
            "tid": 0,
            "s": "g",
            "args": {
                "frame_index": s.frame_index,
                "tasks": s.tasks,
                "pre_tick_us": nanos_to_us(s.phase_nanos[0]),
                "tick_us": nanos_to_us(s.phase_nanos[1]),
                "post_tick_us": nanos_to_us(s.phase_nanos[2]),
                "dirty_us": nanos_to_us(s.phase_nanos[3]),
                "active": s.active,
            }
        }),
    }
}

fn us(t: FrameTime) -> f64 {
    nanos_to_us(t.as_nanos())
}

fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use trellis_core::engine::LoopState;
    use trellis_core::trace::{
        FrameBeginEvent, LoopStateEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&FrameBeginEvent {
            frame_index: 0,
            now: FrameTime(1_000_000),
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::PreTick,
            timestamp: FrameTime(1_000_000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 0,
            phase: PhaseKind::PreTick,
            timestamp: FrameTime(1_000_100),
            tasks: 2,
        });
        rec.on_loop_state(&LoopStateEvent {
            frame_index: 0,
            from: LoopState::Running,
            to: LoopState::Idle,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["ph"], "i");
        assert_eq!(parsed[0]["name"], "FrameBegin");
        assert_eq!(parsed[0]["ts"], 1000.0);

        assert_eq!(parsed[1]["ph"], "B");
        assert_eq!(parsed[1]["name"], "PreTick");

        assert_eq!(parsed[2]["ph"], "E");
        assert_eq!(parsed[2]["name"], "PreTick");
        assert_eq!(parsed[2]["args"]["tasks"], 2);

        assert_eq!(parsed[3]["args"]["to"], "Idle");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
