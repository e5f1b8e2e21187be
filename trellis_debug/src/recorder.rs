// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use trellis_core::engine::LoopState;
use trellis_core::time::FrameTime;
use trellis_core::trace::{
    FrameBeginEvent, FrameSummary, LoopStateEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    ResizeEndEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_RESIZE_END: u8 = 4;
const TAG_LOOP_STATE: u8 = 5;
const TAG_FRAME_SUMMARY: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_time(&mut self, t: FrameTime) {
        self.write_u64(t.as_nanos());
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::PreTick => 0,
            PhaseKind::Tick => 1,
            PhaseKind::PostTick => 2,
            PhaseKind::Dirty => 3,
        });
    }

    fn write_loop_state(&mut self, s: LoopState) {
        self.write_u8(match s {
            LoopState::Stopped => 0,
            LoopState::Running => 1,
            LoopState::Idle => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_time(e.now);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_time(e.timestamp);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_time(e.timestamp);
        self.write_u32(e.tasks);
    }

    fn on_resize_end(&mut self, e: &ResizeEndEvent) {
        self.write_u8(TAG_RESIZE_END);
        self.write_u64(e.frame_index);
        self.write_time(e.now);
    }

    fn on_loop_state(&mut self, e: &LoopStateEvent) {
        self.write_u8(TAG_LOOP_STATE);
        self.write_u64(e.frame_index);
        self.write_loop_state(e.from);
        self.write_loop_state(e.to);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_time(s.now);
        for tasks in s.tasks {
            self.write_u32(tasks);
        }
        for nanos in s.phase_nanos {
            self.write_u64(nanos);
        }
        self.write_u8(u8::from(s.active));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`ResizeEndEvent`].
    ResizeEnd(ResizeEndEvent),
    /// A [`LoopStateEvent`].
    LoopState(LoopStateEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

impl RecordedEvent {
    /// The frame the event belongs to.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        match self {
            Self::FrameBegin(e) => e.frame_index,
            Self::PhaseBegin(e) => e.frame_index,
            Self::PhaseEnd(e) => e.frame_index,
            Self::ResizeEnd(e) => e.frame_index,
            Self::LoopState(e) => e.frame_index,
            Self::FrameSummary(s) => s.frame_index,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_time(&mut self) -> Option<FrameTime> {
        self.read_u64().map(FrameTime)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_loop_state(&mut self) -> Option<LoopState> {
        Some(match self.read_u8()? {
            0 => LoopState::Stopped,
            1 => LoopState::Running,
            2 => LoopState::Idle,
            _ => return None,
        })
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            now: self.read_time()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
            tasks: self.read_u32()?,
        }))
    }

    fn decode_resize_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ResizeEnd(ResizeEndEvent {
            frame_index: self.read_u64()?,
            now: self.read_time()?,
        }))
    }

    fn decode_loop_state(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LoopState(LoopStateEvent {
            frame_index: self.read_u64()?,
            from: self.read_loop_state()?,
            to: self.read_loop_state()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let now = self.read_time()?;
        let mut tasks = [0; 4];
        for slot in &mut tasks {
            *slot = self.read_u32()?;
        }
        let mut phase_nanos = [0; 4];
        for slot in &mut phase_nanos {
            *slot = self.read_u64()?;
        }
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index,
            now,
            tasks,
            phase_nanos,
            active: self.read_u8()? != 0,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_RESIZE_END => self.decode_resize_end(),
            TAG_LOOP_STATE => self.decode_loop_state(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_summary() -> FrameSummary {
        FrameSummary {
            frame_index: 7,
            now: FrameTime(1_000_000),
            tasks: [2, 1, 0, 3],
            phase_nanos: [100, 400, 0, 1500],
            active: true,
        }
    }

    #[test]
    fn phase_events_keep_their_fields() {
        let mut rec = RecorderSink::new();
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 5,
            phase: PhaseKind::PostTick,
            timestamp: FrameTime(2000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 5,
            phase: PhaseKind::PostTick,
            timestamp: FrameTime(3000),
            tasks: 4,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 2);
        match &events[0] {
            RecordedEvent::PhaseBegin(e) => {
                assert_eq!(e.frame_index, 5);
                assert_eq!(e.phase, PhaseKind::PostTick);
                assert_eq!(e.timestamp, FrameTime(2000));
            }
            other => panic!("expected PhaseBegin, got {other:?}"),
        }
        match &events[1] {
            RecordedEvent::PhaseEnd(e) => {
                assert_eq!(e.phase, PhaseKind::PostTick);
                assert_eq!(e.timestamp, FrameTime(3000));
                assert_eq!(e.tasks, 4);
            }
            other => panic!("expected PhaseEnd, got {other:?}"),
        }
    }

    #[test]
    fn loop_state_change_is_recorded() {
        let mut rec = RecorderSink::new();
        rec.on_loop_state(&LoopStateEvent {
            frame_index: 12,
            from: LoopState::Running,
            to: LoopState::Idle,
        });

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match events[..] {
            [RecordedEvent::LoopState(e)] => {
                assert_eq!(e.frame_index, 12);
                assert_eq!(e.from, LoopState::Running);
                assert_eq!(e.to, LoopState::Idle);
            }
            ref other => panic!("expected one LoopState, got {other:?}"),
        }
    }

    #[test]
    fn frame_summary_is_recorded() {
        let mut rec = RecorderSink::new();
        rec.on_frame_summary(&sample_summary());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match events[..] {
            [RecordedEvent::FrameSummary(s)] => assert_eq!(s, sample_summary()),
            ref other => panic!("expected one FrameSummary, got {other:?}"),
        }
    }

    #[test]
    fn mixed_stream_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&FrameBeginEvent {
            frame_index: 7,
            now: FrameTime(1_000_000),
        });
        rec.on_resize_end(&ResizeEndEvent {
            frame_index: 7,
            now: FrameTime(1_000_000),
        });
        rec.on_frame_summary(&sample_summary());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], RecordedEvent::FrameBegin(_)));
        assert!(matches!(events[1], RecordedEvent::ResizeEnd(_)));
        assert!(matches!(events[2], RecordedEvent::FrameSummary(_)));
        assert!(events.iter().all(|e| e.frame_index() == 7));
    }

    #[test]
    fn truncated_record_stops_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_frame_begin(&FrameBeginEvent {
            frame_index: 1,
            now: FrameTime::ZERO,
        });
        rec.on_frame_summary(&sample_summary());

        let bytes = rec.into_bytes();
        let events: Vec<_> = decode(&bytes[..bytes.len() - 1]).collect();
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }
}
