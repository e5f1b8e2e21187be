// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame loop.
//!
//! An [`Engine`] owns four ordered work queues and runs them once per frame:
//!
//! ```text
//!  resize debounce ─┐
//!                   ▼
//!  ┌──────────┐  ┌──────┐  ┌───────────┐  ┌───────┐
//!  │ pre-tick │─▶│ tick │─▶│ post-tick │─▶│ dirty │
//!  └──────────┘  └──────┘  └───────────┘  └───────┘
//!   host events   per-frame  deferred        widget
//!                 callbacks  resolution      commits
//! ```
//!
//! Queued phases drain until empty, re-checking the queue after every task,
//! so a task may enqueue more work into its own phase and have it run in the
//! same frame. Work pushed into an *earlier* phase runs on the next frame.
//! Tick callbacks are a fixed, ordered set that runs once per frame.
//!
//! The engine never schedules frames itself: it asks its [`FrameDriver`] for
//! a callback and the host calls [`Engine::on_frame`] when it fires.
//!
//! # Resize handling
//!
//! [`Engine::notify_resize`] queues a viewport read into the pre-tick phase.
//! The first change of a sequence emits [`Phase::Start`] on the
//! [`viewport`](Engine::viewport) stream, later changes emit `Update` from
//! the post-tick phase, and once no change has been seen for
//! [`EngineConfig::resize_debounce`] an `End` is emitted from the dirty phase.
//!
//! # Idle policy
//!
//! With [`EngineConfig::idle_frames`] set, the loop moves to
//! [`LoopState::Idle`] after that many consecutive frames in which no task
//! ran, no tick callback returned [`TickStatus::Active`], and no resize was
//! in progress. Enqueuing any work wakes it. An explicit [`Engine::stop`] is
//! never undone by new work.
//!
//! [`Phase::Start`]: crate::stream::Phase::Start

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use core::time::Duration;

use kurbo::Size;

use crate::host::{FrameDriver, FrameRequest};
use crate::stream::Stream;
use crate::time::{Debounce, FrameTime};
use crate::trace::{
    FrameBeginEvent, FrameSummary, FrameSummaryBuilder, LoopStateEvent, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, ResizeEndEvent, Tracer,
};
use crate::transform::Transform;

/// Run state of the frame loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoopState {
    /// No frames are scheduled. Only [`Engine::start`] or registering a new
    /// root leaves this state.
    Stopped,
    /// A frame is requested after every step.
    Running,
    /// Stopped by the idle policy. Any new work resumes the loop.
    Idle,
}

/// What a tick callback did this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TickStatus {
    /// The callback has ongoing work and needs further frames.
    Active,
    /// Nothing to do this frame.
    Idle,
}

/// Configuration for an [`Engine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Quiet period after the last viewport change before the resize
    /// sequence ends.
    pub resize_debounce: Duration,
    /// Consecutive quiet frames before the loop goes idle. `None` keeps the
    /// loop running until [`Engine::stop`].
    pub idle_frames: Option<u32>,
}

impl EngineConfig {
    /// 150 ms resize debounce, idle after 3 quiet frames.
    pub const DEFAULT: Self = Self {
        resize_debounce: Duration::from_millis(150),
        idle_frames: Some(3),
    };

    /// Like [`DEFAULT`](Self::DEFAULT) but never idles.
    pub const CONTINUOUS: Self = Self {
        resize_debounce: Duration::from_millis(150),
        idle_frames: None,
    };
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Handle to a registered tick callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TickId(u64);

type Task = Box<dyn FnOnce()>;
type TickFn = Rc<RefCell<dyn FnMut(FrameTime) -> TickStatus>>;

#[derive(Debug)]
struct ResizeState {
    debounce: Debounce,
    last: Option<Size>,
    resizing: bool,
}

struct Inner {
    driver: Rc<dyn FrameDriver>,
    config: EngineConfig,
    state: Cell<LoopState>,
    pending_frame: Cell<Option<FrameRequest>>,
    frame_index: Cell<u64>,
    idle_streak: Cell<u32>,
    now: Cell<FrameTime>,
    roots: Cell<usize>,
    pre_tick: RefCell<VecDeque<Task>>,
    post_tick: RefCell<VecDeque<Task>>,
    dirty: RefCell<VecDeque<Task>>,
    ticks: RefCell<Vec<(TickId, TickFn)>>,
    next_tick: Cell<u64>,
    resize: RefCell<ResizeState>,
    viewport: Stream<Size>,
    root_transform: Stream<Transform>,
}

/// The frame scheduler. Cloning yields another handle to the same engine.
#[derive(Clone)]
pub struct Engine {
    inner: Rc<Inner>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.inner.state.get())
            .field("frame_index", &self.inner.frame_index.get())
            .field("roots", &self.inner.roots.get())
            .finish_non_exhaustive()
    }
}

/// A weak handle to an [`Engine`], held by queued tasks.
#[derive(Clone, Debug)]
pub struct WeakEngine {
    inner: Weak<Inner>,
}

impl WeakEngine {
    /// Returns the engine if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Engine> {
        self.inner.upgrade().map(|inner| Engine { inner })
    }
}

impl Engine {
    /// Creates a stopped engine driven by `driver`.
    #[must_use]
    pub fn new(driver: Rc<dyn FrameDriver>, config: EngineConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                driver,
                config,
                state: Cell::new(LoopState::Stopped),
                pending_frame: Cell::new(None),
                frame_index: Cell::new(0),
                idle_streak: Cell::new(0),
                now: Cell::new(FrameTime::ZERO),
                roots: Cell::new(0),
                pre_tick: RefCell::new(VecDeque::new()),
                post_tick: RefCell::new(VecDeque::new()),
                dirty: RefCell::new(VecDeque::new()),
                ticks: RefCell::new(Vec::new()),
                next_tick: Cell::new(0),
                resize: RefCell::new(ResizeState {
                    debounce: Debounce::new(config.resize_debounce),
                    last: None,
                    resizing: false,
                }),
                viewport: Stream::new(),
                root_transform: Stream::new(),
            }),
        }
    }

    /// Returns a weak handle.
    #[must_use]
    pub fn downgrade(&self) -> WeakEngine {
        WeakEngine {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Whether two handles refer to the same engine.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.inner.config
    }

    /// Current loop state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        self.inner.state.get()
    }

    /// Number of steps run so far.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.inner.frame_index.get()
    }

    /// Timestamp of the most recent step.
    #[must_use]
    pub fn now(&self) -> FrameTime {
        self.inner.now.get()
    }

    /// Whether a resize sequence is in progress.
    #[must_use]
    pub fn is_resizing(&self) -> bool {
        self.inner.resize.borrow().resizing
    }

    /// Number of registered render roots.
    #[must_use]
    pub fn root_count(&self) -> usize {
        self.inner.roots.get()
    }

    /// The viewport size, one sequence per resize.
    #[must_use]
    pub fn viewport(&self) -> Stream<Size> {
        self.inner.viewport.clone()
    }

    /// The transform every render root composes under.
    #[must_use]
    pub fn root_transform(&self) -> Stream<Transform> {
        self.inner.root_transform.clone()
    }

    // -- Loop control --------------------------------------------------------

    /// Starts the loop: runs one step at `now` and requests the next frame.
    ///
    /// Does nothing if the loop is already running.
    pub fn start(&self, now: FrameTime) {
        if self.inner.state.get() == LoopState::Running {
            return;
        }
        self.inner.state.set(LoopState::Running);
        self.inner.idle_streak.set(0);
        self.step(now);
        self.request_frame();
    }

    /// Stops the loop and cancels any requested frame.
    pub fn stop(&self) {
        self.inner.state.set(LoopState::Stopped);
        self.cancel_frame();
    }

    /// Frame callback entry point. Runs a step if the loop is running and
    /// requests the next frame.
    ///
    /// Returns `None` if the loop was not running.
    pub fn on_frame(&self, now: FrameTime) -> Option<FrameSummary> {
        self.on_frame_traced(now, &mut Tracer::none())
    }

    /// [`on_frame`](Self::on_frame) with trace events sent to `tracer`.
    pub fn on_frame_traced(&self, now: FrameTime, tracer: &mut Tracer<'_>) -> Option<FrameSummary> {
        self.inner.pending_frame.set(None);
        if self.inner.state.get() != LoopState::Running {
            return None;
        }
        let summary = self.step_traced(now, tracer);
        self.request_frame();
        Some(summary)
    }

    /// Runs one frame at `now`, whatever the loop state.
    pub fn step(&self, now: FrameTime) -> FrameSummary {
        self.step_traced(now, &mut Tracer::none())
    }

    /// [`step`](Self::step) with trace events sent to `tracer`.
    pub fn step_traced(&self, now: FrameTime, tracer: &mut Tracer<'_>) -> FrameSummary {
        let inner = &self.inner;
        let frame_index = inner.frame_index.get();
        inner.frame_index.set(frame_index + 1);
        inner.now.set(now);
        tracer.frame_begin(&FrameBeginEvent { frame_index, now });
        let mut summary = FrameSummaryBuilder::new(frame_index, now);

        let fired = inner.resize.borrow_mut().debounce.poll(now);
        if fired {
            tracer.resize_end(&ResizeEndEvent { frame_index, now });
            let engine = self.downgrade();
            self.push(PhaseKind::Dirty, Box::new(move || {
                if let Some(engine) = engine.upgrade() {
                    engine.finish_resize();
                }
            }));
        }

        let mut active = false;
        for phase in PhaseKind::ALL {
            let begin = self.clock(now);
            tracer.phase_begin(&PhaseBeginEvent {
                frame_index,
                phase,
                timestamp: begin,
            });
            summary.phase_begin(phase, begin);
            let tasks = match phase {
                PhaseKind::Tick => {
                    let (ran, busy) = self.run_ticks(now);
                    active |= busy;
                    ran
                }
                _ => {
                    let ran = self.drain(phase);
                    active |= ran > 0;
                    ran
                }
            };
            let end = self.clock(now);
            summary.phase_end(phase, end, tasks);
            tracer.phase_end(&PhaseEndEvent {
                frame_index,
                phase,
                timestamp: end,
                tasks,
            });
        }

        active |= inner.resize.borrow().resizing;
        summary.set_active(active);
        self.apply_idle_policy(active, frame_index, tracer);

        let summary = summary.finish();
        tracer.frame_summary(&summary);
        summary
    }

    // -- Work submission -----------------------------------------------------

    /// Queues `task` for the pre-tick phase of the next step.
    pub fn defer_pre_tick(&self, task: impl FnOnce() + 'static) {
        self.push(PhaseKind::PreTick, Box::new(task));
    }

    /// Queues `task` for the post-tick phase.
    pub fn defer_post_tick(&self, task: impl FnOnce() + 'static) {
        self.push(PhaseKind::PostTick, Box::new(task));
    }

    /// Queues `task` for the dirty phase.
    pub fn defer_dirty(&self, task: impl FnOnce() + 'static) {
        self.push(PhaseKind::Dirty, Box::new(task));
    }

    /// Registers a callback run once per frame, after every earlier
    /// registration.
    pub fn on_tick(&self, callback: impl FnMut(FrameTime) -> TickStatus + 'static) -> TickId {
        let id = TickId(self.inner.next_tick.get());
        self.inner.next_tick.set(id.0 + 1);
        let callback: TickFn = Rc::new(RefCell::new(callback));
        self.inner.ticks.borrow_mut().push((id, callback));
        self.wake();
        id
    }

    /// Unregisters a tick callback. Returns `false` if it was not registered.
    pub fn remove_tick(&self, id: TickId) -> bool {
        let mut ticks = self.inner.ticks.borrow_mut();
        let before = ticks.len();
        ticks.retain(|(t, _)| *t != id);
        ticks.len() != before
    }

    /// Reports a possible viewport change. The size is read from the
    /// driver during the next pre-tick phase.
    pub fn notify_resize(&self) {
        let engine = self.downgrade();
        self.defer_pre_tick(move || {
            if let Some(engine) = engine.upgrade() {
                engine.handle_resize();
            }
        });
    }

    /// Registers a render root: reads the viewport and opens the root
    /// transform on the next step, starting the loop if it is not running.
    pub(crate) fn register_root(&self) {
        self.inner.roots.set(self.inner.roots.get() + 1);
        self.notify_resize();
        let engine = self.downgrade();
        self.defer_pre_tick(move || {
            if let Some(engine) = engine.upgrade() {
                engine.handle_layout();
            }
        });
        if self.inner.state.get() != LoopState::Running {
            self.resume();
        }
    }

    pub(crate) fn deregister_root(&self) {
        self.inner.roots.set(self.inner.roots.get().saturating_sub(1));
    }

    // -- Internals -----------------------------------------------------------

    fn queue(&self, phase: PhaseKind) -> &RefCell<VecDeque<Task>> {
        match phase {
            PhaseKind::PreTick | PhaseKind::Tick => &self.inner.pre_tick,
            PhaseKind::PostTick => &self.inner.post_tick,
            PhaseKind::Dirty => &self.inner.dirty,
        }
    }

    fn push(&self, phase: PhaseKind, task: Task) {
        self.queue(phase).borrow_mut().push_back(task);
        self.wake();
    }

    fn drain(&self, phase: PhaseKind) -> u32 {
        let queue = self.queue(phase);
        let mut ran = 0_u32;
        loop {
            // The borrow ends before the task runs.
            let next = queue.borrow_mut().pop_front();
            let Some(task) = next else {
                break;
            };
            task();
            ran = ran.saturating_add(1);
        }
        ran
    }

    fn run_ticks(&self, now: FrameTime) -> (u32, bool) {
        let snapshot: Vec<(TickId, TickFn)> = self
            .inner
            .ticks
            .borrow()
            .iter()
            .map(|(id, f)| (*id, Rc::clone(f)))
            .collect();
        let mut ran = 0_u32;
        let mut active = false;
        for (id, callback) in snapshot {
            if !self.inner.ticks.borrow().iter().any(|(t, _)| *t == id) {
                continue;
            }
            let Ok(mut callback) = callback.try_borrow_mut() else {
                continue;
            };
            active |= callback(now) == TickStatus::Active;
            ran = ran.saturating_add(1);
        }
        (ran, active)
    }

    fn clock(&self, now: FrameTime) -> FrameTime {
        self.inner.driver.now().unwrap_or(now)
    }

    fn apply_idle_policy(&self, active: bool, frame_index: u64, tracer: &mut Tracer<'_>) {
        let inner = &self.inner;
        if active {
            inner.idle_streak.set(0);
            return;
        }
        let streak = inner.idle_streak.get().saturating_add(1);
        inner.idle_streak.set(streak);
        let Some(limit) = inner.config.idle_frames else {
            return;
        };
        if streak >= limit && inner.state.get() == LoopState::Running {
            inner.state.set(LoopState::Idle);
            tracer.loop_state(&LoopStateEvent {
                frame_index,
                from: LoopState::Running,
                to: LoopState::Idle,
            });
            self.cancel_frame();
        }
    }

    fn wake(&self) {
        if self.inner.state.get() == LoopState::Idle {
            self.resume();
        }
    }

    fn resume(&self) {
        self.inner.state.set(LoopState::Running);
        self.inner.idle_streak.set(0);
        self.request_frame();
    }

    fn request_frame(&self) {
        let inner = &self.inner;
        if inner.state.get() == LoopState::Running && inner.pending_frame.get().is_none() {
            let request = inner.driver.request_frame();
            inner.pending_frame.set(Some(request));
        }
    }

    fn cancel_frame(&self) {
        if let Some(request) = self.inner.pending_frame.take() {
            self.inner.driver.cancel_frame(request);
        }
    }

    fn handle_resize(&self) {
        let size = self.inner.driver.viewport();
        let now = self.inner.now.get();
        let mut resize = self.inner.resize.borrow_mut();
        if resize.last == Some(size) {
            return;
        }
        resize.last = Some(size);
        if resize.resizing {
            drop(resize);
            let engine = self.downgrade();
            self.defer_post_tick(move || {
                if let Some(engine) = engine.upgrade() {
                    engine.continue_resize(size);
                }
            });
        } else {
            resize.resizing = true;
            resize.debounce.arm(now);
            drop(resize);
            self.inner.viewport.start(size);
        }
    }

    fn continue_resize(&self, size: Size) {
        self.inner.viewport.update(size);
        let now = self.inner.now.get();
        self.inner.resize.borrow_mut().debounce.arm(now);
    }

    fn finish_resize(&self) {
        self.inner.resize.borrow_mut().resizing = false;
        self.inner.viewport.end();
    }

    fn handle_layout(&self) {
        self.inner.root_transform.start(Transform::IDENTITY);
        let engine = self.downgrade();
        self.defer_dirty(move || {
            if let Some(engine) = engine.upgrade() {
                engine.inner.root_transform.end();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Phase;
    use crate::test_host::ManualDriver;

    fn engine_with(config: EngineConfig) -> (Rc<ManualDriver>, Engine) {
        let driver = Rc::new(ManualDriver::new(Size::new(100.0, 100.0)));
        let engine = Engine::new(driver.clone(), config);
        (driver, engine)
    }

    fn ms(ms: u64) -> FrameTime {
        FrameTime::from_millis(ms)
    }

    #[test]
    fn phases_run_in_order() {
        let (_driver, engine) = engine_with(EngineConfig::DEFAULT);
        let log = Rc::new(RefCell::new(Vec::new()));

        let l = log.clone();
        engine.defer_dirty(move || l.borrow_mut().push("dirty"));
        let l = log.clone();
        engine.defer_post_tick(move || l.borrow_mut().push("post"));
        let l = log.clone();
        engine.defer_pre_tick(move || l.borrow_mut().push("pre"));
        let l = log.clone();
        engine.on_tick(move |_| {
            l.borrow_mut().push("tick");
            TickStatus::Idle
        });

        let summary = engine.step(ms(0));
        assert_eq!(*log.borrow(), ["pre", "tick", "post", "dirty"]);
        assert_eq!(summary.tasks, [1, 1, 1, 1]);
        assert!(summary.active);
    }

    #[test]
    fn tick_sees_viewport_resized_in_the_same_frame() {
        let (driver, engine) = engine_with(EngineConfig::DEFAULT);
        engine.register_root();
        engine.step(ms(0));
        engine.step(ms(300));
        assert!(!engine.is_resizing());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let (s, e) = (seen.clone(), engine.clone());
        engine.on_tick(move |_| {
            s.borrow_mut().push(e.viewport().get().map(|v| v.width));
            TickStatus::Idle
        });

        driver.set_viewport(Size::new(240.0, 100.0));
        engine.notify_resize();
        engine.step(ms(316));
        assert_eq!(*seen.borrow(), [Some(240.0)]);
        assert!(engine.is_resizing());
    }

    #[test]
    fn drain_picks_up_tasks_queued_by_tasks() {
        let (_driver, engine) = engine_with(EngineConfig::DEFAULT);
        let log = Rc::new(RefCell::new(Vec::new()));

        let (l, e) = (log.clone(), engine.clone());
        engine.defer_post_tick(move || {
            l.borrow_mut().push("post 1");
            let l2 = l.clone();
            e.defer_post_tick(move || l2.borrow_mut().push("post 2"));
            let l3 = l.clone();
            e.defer_pre_tick(move || l3.borrow_mut().push("pre (next frame)"));
        });

        engine.step(ms(0));
        assert_eq!(*log.borrow(), ["post 1", "post 2"]);
        engine.step(ms(16));
        assert_eq!(*log.borrow(), ["post 1", "post 2", "pre (next frame)"]);
    }

    #[test]
    fn tick_callbacks_run_in_registration_order() {
        let (_driver, engine) = engine_with(EngineConfig::DEFAULT);
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ids = Vec::new();
        for i in 0..3 {
            let l = log.clone();
            ids.push(engine.on_tick(move |_| {
                l.borrow_mut().push(i);
                TickStatus::Idle
            }));
        }
        engine.step(ms(0));
        assert_eq!(*log.borrow(), [0, 1, 2]);

        assert!(engine.remove_tick(ids[1]));
        assert!(!engine.remove_tick(ids[1]));
        engine.step(ms(16));
        assert_eq!(*log.borrow(), [0, 1, 2, 0, 2]);
    }

    #[test]
    fn resize_sequence_is_debounced() {
        let (driver, engine) = engine_with(EngineConfig::DEFAULT);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        let _sub = engine
            .viewport()
            .subscribe(move |phase, size| l.borrow_mut().push((phase, size.width)));

        engine.register_root();
        engine.step(ms(0));

        driver.set_viewport(Size::new(200.0, 100.0));
        engine.notify_resize();
        engine.step(ms(50));

        driver.set_viewport(Size::new(300.0, 100.0));
        engine.notify_resize();
        engine.step(ms(100));

        engine.step(ms(200));
        assert!(engine.is_resizing());
        assert_eq!(log.borrow().len(), 3);

        engine.step(ms(250));
        assert!(!engine.is_resizing());
        assert_eq!(
            *log.borrow(),
            [
                (Phase::Start, 100.0),
                (Phase::Update, 200.0),
                (Phase::Update, 300.0),
                (Phase::End, 300.0),
            ]
        );
    }

    #[test]
    fn unchanged_viewport_is_ignored() {
        let (_driver, engine) = engine_with(EngineConfig::DEFAULT);
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let _sub = engine.viewport().subscribe(move |_, _| c.set(c.get() + 1));

        engine.register_root();
        engine.step(ms(0));
        engine.step(ms(200));
        assert_eq!(count.get(), 2);

        engine.notify_resize();
        engine.step(ms(216));
        engine.step(ms(500));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn root_transform_is_a_discrete_identity_change() {
        let (_driver, engine) = engine_with(EngineConfig::DEFAULT);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        let _sub = engine
            .root_transform()
            .subscribe(move |phase, t| l.borrow_mut().push((phase, *t)));

        engine.register_root();
        engine.step(ms(0));
        assert_eq!(
            *log.borrow(),
            [
                (Phase::Start, Transform::IDENTITY),
                (Phase::End, Transform::IDENTITY)
            ]
        );
    }

    #[test]
    fn registering_a_root_starts_the_loop() {
        let (driver, engine) = engine_with(EngineConfig::DEFAULT);
        assert_eq!(engine.state(), LoopState::Stopped);
        engine.register_root();
        assert_eq!(engine.state(), LoopState::Running);
        assert!(driver.has_pending());
        assert_eq!(engine.root_count(), 1);
        engine.deregister_root();
        assert_eq!(engine.root_count(), 0);
    }

    #[test]
    fn idle_policy_stops_and_new_work_wakes() {
        let config = EngineConfig {
            idle_frames: Some(3),
            ..EngineConfig::DEFAULT
        };
        let (driver, engine) = engine_with(config);

        engine.start(ms(0));
        assert!(driver.take_pending());
        assert!(engine.on_frame(ms(16)).is_some());
        assert_eq!(engine.state(), LoopState::Running);
        assert!(driver.take_pending());

        let summary = engine.on_frame(ms(32));
        assert!(summary.is_some_and(|s| !s.active));
        assert_eq!(engine.state(), LoopState::Idle);
        assert!(!driver.has_pending());

        engine.defer_dirty(|| {});
        assert_eq!(engine.state(), LoopState::Running);
        assert!(driver.has_pending());
    }

    #[test]
    fn active_tick_keeps_the_loop_running() {
        let config = EngineConfig {
            idle_frames: Some(1),
            ..EngineConfig::DEFAULT
        };
        let (driver, engine) = engine_with(config);
        let frames = Rc::new(Cell::new(0));
        let f = frames.clone();
        engine.on_tick(move |_| {
            f.set(f.get() + 1);
            if f.get() < 3 {
                TickStatus::Active
            } else {
                TickStatus::Idle
            }
        });

        engine.start(ms(0));
        assert!(driver.take_pending());
        engine.on_frame(ms(16));
        assert_eq!(engine.state(), LoopState::Running);
        assert!(driver.take_pending());
        engine.on_frame(ms(32));
        assert_eq!(engine.state(), LoopState::Idle);
        assert!(!driver.has_pending());
        assert_eq!(frames.get(), 3);
    }

    #[test]
    fn stop_cancels_and_is_not_undone_by_work() {
        let (driver, engine) = engine_with(EngineConfig::CONTINUOUS);
        engine.start(ms(0));
        assert!(driver.has_pending());

        engine.stop();
        assert_eq!(engine.state(), LoopState::Stopped);
        assert!(!driver.has_pending());
        assert_eq!(driver.cancelled.borrow().len(), 1);

        engine.defer_pre_tick(|| {});
        assert_eq!(engine.state(), LoopState::Stopped);
        assert!(!driver.has_pending());
        assert!(engine.on_frame(ms(16)).is_none());
    }

    #[test]
    fn tasks_do_not_outlive_the_engine() {
        let (_driver, engine) = engine_with(EngineConfig::DEFAULT);
        let weak = engine.downgrade();
        engine.notify_resize();
        drop(engine);
        assert!(weak.upgrade().is_none());
    }
}
