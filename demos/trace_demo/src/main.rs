// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless frame loop that exercises the tracing and diagnostics pipeline.
//!
//! Mounts a small render tree on a simulated host, drives 60 synthetic
//! frames at 60 Hz with an opacity animation and a window resize, and sends
//! trace events to both a
//! [`PrettyPrintSink`](trellis_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](trellis_debug::recorder::RecorderSink). The recording is
//! then exported as a Chrome trace JSON file.

use std::cell::{Cell, RefCell};
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use trellis_core::commit::CommitConfig;
use trellis_core::context::Context;
use trellis_core::engine::{Engine, EngineConfig, TickStatus};
use trellis_core::host::{FrameDriver, FrameRequest, WidgetHost, WidgetId, WidgetProperty};
use kurbo::{Size, Vec2};
use trellis_core::size::Dimension;
use trellis_core::stream::Stream;
use trellis_core::time::FrameTime;
use trellis_core::trace::Tracer;

use trellis_debug::Tee;
use trellis_debug::pretty::PrettyPrintSink;
use trellis_debug::recorder::RecorderSink;

const FRAME_COUNT: u64 = 60;
/// 16.6ms refresh interval in nanoseconds (≈60 Hz).
const REFRESH_INTERVAL_NS: u64 = 16_666_667;
/// Frame on which the simulated window is resized.
const RESIZE_FRAME: u64 = 20;
/// Length of the fade-in animation.
const FADE_FRAMES: u32 = 12;

/// Frame driver backed by a simulated vsync.
#[derive(Debug, Default)]
struct SimDriver {
    viewport: Cell<Size>,
    pending: Cell<Option<FrameRequest>>,
    next: Cell<u64>,
    clock: Cell<u64>,
}

impl SimDriver {
    fn take_pending(&self) -> bool {
        self.pending.take().is_some()
    }
}

impl FrameDriver for SimDriver {
    fn request_frame(&self) -> FrameRequest {
        let request = FrameRequest(self.next.get());
        self.next.set(request.0 + 1);
        self.pending.set(Some(request));
        request
    }

    fn cancel_frame(&self, request: FrameRequest) {
        if self.pending.get() == Some(request) {
            self.pending.set(None);
        }
    }

    fn viewport(&self) -> Size {
        self.viewport.get()
    }

    // Each phase appears to take 25µs.
    fn now(&self) -> Option<FrameTime> {
        let t = self.clock.get() + 25_000;
        self.clock.set(t);
        Some(FrameTime(t))
    }
}

/// Widget host that counts property writes.
#[derive(Debug, Default)]
struct CountingHost {
    next_id: u32,
    writes: usize,
}

impl WidgetHost for CountingHost {
    fn allocate(&mut self, _kind: &str, _container: WidgetId) -> WidgetId {
        self.next_id += 1;
        WidgetId(self.next_id)
    }

    fn deallocate(&mut self, _widget: WidgetId) {}

    fn set(&mut self, _widget: WidgetId, _property: WidgetProperty) {
        self.writes += 1;
    }

    fn measure(&self, _widget: WidgetId) -> Size {
        Size::new(120.0, 24.0)
    }
}

fn main() {
    let driver = Rc::new(SimDriver::default());
    driver.viewport.set(Size::new(800.0, 600.0));
    let host = Rc::new(RefCell::new(CountingHost::default()));

    // -- sinks -------------------------------------------------------------
    let mut sinks = Tee(
        PrettyPrintSink::new(Box::new(std::io::stdout())),
        RecorderSink::new(),
    );

    // -- tree --------------------------------------------------------------
    let engine = Engine::new(driver.clone(), EngineConfig::DEFAULT);
    let mut cx = Context::new(&engine, host.clone(), WidgetId(0), CommitConfig::DEFAULT);

    let panel = cx.create_surface("div");
    cx.add(cx.root(), panel);
    cx.set_proportions(panel, [Some(0.5), Some(0.5)]);
    cx.set_align(panel, Some(Vec2::new(0.5, 0.5)));
    cx.set_origin(panel, Vec2::new(0.5, 0.5));

    let label = cx.create_surface("span");
    cx.add(panel, label);
    cx.set_size(label, [Dimension::Intrinsic, Dimension::Intrinsic]);

    let opacity = Stream::with_value(0.0);
    cx.set_opacity(panel, opacity.clone());

    let fade = {
        let mut frame = 0;
        engine.on_tick(move |_| {
            frame += 1;
            let t = f64::from(frame.min(FADE_FRAMES)) / f64::from(FADE_FRAMES);
            if frame < FADE_FRAMES {
                opacity.update(t);
                TickStatus::Active
            } else if frame == FADE_FRAMES {
                opacity.set(t);
                TickStatus::Active
            } else {
                TickStatus::Idle
            }
        })
    };

    // -- simulated loop ----------------------------------------------------
    let mut now_ns: u64 = 1_000_000_000; // start at 1s
    let mut frames_run = 0;

    for frame in 0..FRAME_COUNT {
        if frame == RESIZE_FRAME {
            driver.viewport.set(Size::new(1024.0, 768.0));
            engine.notify_resize();
        }
        driver.clock.set(now_ns);
        if driver.take_pending() {
            let mut tracer = Tracer::new(&mut sinks);
            if engine.on_frame_traced(FrameTime(now_ns), &mut tracer).is_some() {
                frames_run += 1;
            }
        }
        now_ns += REFRESH_INTERVAL_NS;
    }
    engine.remove_tick(fade);

    println!(
        "Ran {frames_run} of {FRAME_COUNT} frames, loop is {:?}, {} widget writes",
        engine.state(),
        host.borrow().writes,
    );
    if let Some(layout) = cx.layout(panel) {
        println!("panel transform: {:?}", layout.transform);
    }

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    trellis_debug::chrome::export(sinks.1.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path}");
}
