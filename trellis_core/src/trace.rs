// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! [`Engine::step_traced`](crate::engine::Engine::step_traced) calls at each
//! stage of a frame. All method bodies default to no-ops, so implementing only
//! the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps and task counts during a
//! frame and produces a [`FrameSummary`] at the end.

use crate::engine::LoopState;
use crate::time::FrameTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which queue of the frame is being drained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Host event handlers.
    PreTick,
    /// Registered per-frame callbacks.
    Tick,
    /// One-shot resolution tasks.
    PostTick,
    /// Widget commits.
    Dirty,
}

impl PhaseKind {
    /// All phases in execution order.
    pub const ALL: [Self; 4] = [Self::PreTick, Self::Tick, Self::PostTick, Self::Dirty];

    /// Index of the phase in [`ALL`](Self::ALL).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::PreTick => 0,
            Self::Tick => 1,
            Self::PostTick => 2,
            Self::Dirty => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a frame starts.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Timestamp the host passed to the step.
    pub now: FrameTime,
}

/// Marks the beginning of a frame phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Time at the start of the phase.
    pub timestamp: FrameTime,
}

/// Marks the end of a frame phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Time at the end of the phase.
    pub timestamp: FrameTime,
    /// Tasks (or tick callbacks) run during the phase.
    pub tasks: u32,
}

/// Emitted when the resize debounce fires and the resize sequence ends.
#[derive(Clone, Copy, Debug)]
pub struct ResizeEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Frame timestamp at which the debounce fired.
    pub now: FrameTime,
}

/// Emitted when a step changes the loop state.
#[derive(Clone, Copy, Debug)]
pub struct LoopStateEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// State before the change.
    pub from: LoopState,
    /// State after the change.
    pub to: LoopState,
}

/// Per-frame summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Frame timestamp.
    pub now: FrameTime,
    /// Tasks run per phase, indexed by [`PhaseKind::index`].
    pub tasks: [u32; 4],
    /// Duration of each phase in nanoseconds (0 without a host clock).
    pub phase_nanos: [u64; 4],
    /// Whether any task ran or any tick callback reported activity.
    pub active: bool,
}

impl FrameSummary {
    /// Tasks run during `phase`.
    #[must_use]
    pub const fn tasks_in(&self, phase: PhaseKind) -> u32 {
        self.tasks[phase.index()]
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a frame starts.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a resize sequence ends.
    fn on_resize_end(&mut self, e: &ResizeEndEvent) {
        _ = e;
    }

    /// Called when the loop state changes during a step.
    fn on_loop_state(&mut self, e: &LoopStateEvent) {
        _ = e;
    }

    /// Called with a per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! dispatch {
    ($(#[$doc:meta] $name:ident => $method:ident($ty:ty);)*) => {
        $(
            #[$doc]
            #[inline]
            pub fn $name(&mut self, e: &$ty) {
                #[cfg(feature = "trace")]
                if let Some(s) = &mut self.sink {
                    s.$method(e);
                }
                #[cfg(not(feature = "trace"))]
                {
                    _ = e;
                }
            }
        )*
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    dispatch! {
        /// Emits a [`FrameBeginEvent`].
        frame_begin => on_frame_begin(FrameBeginEvent);
        /// Emits a [`PhaseBeginEvent`].
        phase_begin => on_phase_begin(PhaseBeginEvent);
        /// Emits a [`PhaseEndEvent`].
        phase_end => on_phase_end(PhaseEndEvent);
        /// Emits a [`ResizeEndEvent`].
        resize_end => on_resize_end(ResizeEndEvent);
        /// Emits a [`LoopStateEvent`].
        loop_state => on_loop_state(LoopStateEvent);
        /// Emits a [`FrameSummary`].
        frame_summary => on_frame_summary(FrameSummary);
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps and task counts during a frame and produces a
/// [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    frame_index: u64,
    now: FrameTime,
    tasks: [u32; 4],
    phase_starts: [Option<FrameTime>; 4],
    phase_ends: [Option<FrameTime>; 4],
    active: bool,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given frame.
    #[must_use]
    pub fn new(frame_index: u64, now: FrameTime) -> Self {
        Self {
            frame_index,
            now,
            tasks: [0; 4],
            phase_starts: [None; 4],
            phase_ends: [None; 4],
            active: false,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: FrameTime) {
        self.phase_starts[phase.index()] = Some(t);
    }

    /// Records the end of a phase and how many tasks it ran.
    pub fn phase_end(&mut self, phase: PhaseKind, t: FrameTime, tasks: u32) {
        self.phase_ends[phase.index()] = Some(t);
        self.tasks[phase.index()] = tasks;
    }

    /// Marks the frame as having done work.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        let phase_nanos = core::array::from_fn(|i| match (self.phase_starts[i], self.phase_ends[i]) {
            (Some(start), Some(end)) => end.as_nanos().saturating_sub(start.as_nanos()),
            _ => 0,
        });
        FrameSummary {
            frame_index: self.frame_index,
            now: self.now,
            tasks: self.tasks,
            phase_nanos,
            active: self.active,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
