// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! N-ary combination of streams.
//!
//! A lift buffers the latest value of each source and recombines on every
//! source event. The output phase follows the triggering source, except that
//! an `End` is downgraded to `Update` while any other source still has a
//! sequence open: the combined sequence ends only when every source that
//! opened has ended.
//!
//! Source values present at construction are buffered but not combined.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;

use super::{Phase, Stream, Subscription};

/// Records `phase` for source `index` and returns the phase to emit.
fn gate(open: &mut [bool], index: usize, phase: Phase) -> Phase {
    open[index] = phase != Phase::End;
    if phase == Phase::End && open.iter().any(|o| *o) {
        Phase::Update
    } else {
        phase
    }
}

/// Subscribes `out` to `source` through shared lift state `S`.
///
/// `apply` stores the source value into the state and returns the combined
/// event. The state borrow is released before `out` emits.
fn feed<S, V, U>(
    source: &Stream<V>,
    state: &Rc<RefCell<S>>,
    out: &Stream<U>,
    mut apply: impl FnMut(&mut S, Phase, &V) -> (Phase, Option<U>) + 'static,
) -> Subscription
where
    S: 'static,
    V: Clone + 'static,
    U: Clone + 'static,
{
    let state = Rc::clone(state);
    let out = out.downgrade();
    source.listen(move |phase, value| {
        let Some(out) = out.upgrade() else {
            return false;
        };
        let combined = match state.try_borrow_mut() {
            Ok(mut state) => Some(apply(&mut state, phase, value)),
            // A source event re-entered from the lift's own emission is dropped.
            Err(_) => None,
        };
        if let Some((phase, value)) = combined {
            out.emit(phase, value);
        }
        true
    })
}

struct Lift2<A, B, U> {
    a: Option<A>,
    b: Option<B>,
    open: [bool; 2],
    combine: Box<dyn FnMut(Option<&A>, Option<&B>) -> Option<U>>,
}

impl<A, B, U> Lift2<A, B, U> {
    fn fire(&mut self, index: usize, phase: Phase) -> (Phase, Option<U>) {
        let phase = gate(&mut self.open, index, phase);
        (phase, (self.combine)(self.a.as_ref(), self.b.as_ref()))
    }
}

/// Combines two streams; `f` sees `None` for a source that has no value yet.
pub fn lift2_partial<A, B, U, F>(a: &Stream<A>, b: &Stream<B>, f: F) -> Stream<U>
where
    A: Clone + 'static,
    B: Clone + 'static,
    U: Clone + 'static,
    F: FnMut(Option<&A>, Option<&B>) -> Option<U> + 'static,
{
    let state = Rc::new(RefCell::new(Lift2 {
        a: a.get(),
        b: b.get(),
        open: [a.is_open(), b.is_open()],
        combine: Box::new(f),
    }));
    let out = Stream::new();
    out.add_upstream(feed(a, &state, &out, |s, phase, v: &A| {
        s.a = Some(v.clone());
        s.fire(0, phase)
    }));
    out.add_upstream(feed(b, &state, &out, |s, phase, v: &B| {
        s.b = Some(v.clone());
        s.fire(1, phase)
    }));
    out
}

/// Combines two streams once both have a value.
pub fn lift2<A, B, U, F>(a: &Stream<A>, b: &Stream<B>, mut f: F) -> Stream<U>
where
    A: Clone + 'static,
    B: Clone + 'static,
    U: Clone + 'static,
    F: FnMut(&A, &B) -> Option<U> + 'static,
{
    lift2_partial(a, b, move |a, b| f(a?, b?))
}

struct Lift3<A, B, C, U> {
    a: Option<A>,
    b: Option<B>,
    c: Option<C>,
    open: [bool; 3],
    combine: Box<dyn FnMut(Option<&A>, Option<&B>, Option<&C>) -> Option<U>>,
}

impl<A, B, C, U> Lift3<A, B, C, U> {
    fn fire(&mut self, index: usize, phase: Phase) -> (Phase, Option<U>) {
        let phase = gate(&mut self.open, index, phase);
        (
            phase,
            (self.combine)(self.a.as_ref(), self.b.as_ref(), self.c.as_ref()),
        )
    }
}

/// Combines three streams; `f` sees `None` for a source that has no value
/// yet.
pub fn lift3_partial<A, B, C, U, F>(a: &Stream<A>, b: &Stream<B>, c: &Stream<C>, f: F) -> Stream<U>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    U: Clone + 'static,
    F: FnMut(Option<&A>, Option<&B>, Option<&C>) -> Option<U> + 'static,
{
    let state = Rc::new(RefCell::new(Lift3 {
        a: a.get(),
        b: b.get(),
        c: c.get(),
        open: [a.is_open(), b.is_open(), c.is_open()],
        combine: Box::new(f),
    }));
    let out = Stream::new();
    out.add_upstream(feed(a, &state, &out, |s, phase, v: &A| {
        s.a = Some(v.clone());
        s.fire(0, phase)
    }));
    out.add_upstream(feed(b, &state, &out, |s, phase, v: &B| {
        s.b = Some(v.clone());
        s.fire(1, phase)
    }));
    out.add_upstream(feed(c, &state, &out, |s, phase, v: &C| {
        s.c = Some(v.clone());
        s.fire(2, phase)
    }));
    out
}

/// Combines three streams once all of them have a value.
pub fn lift3<A, B, C, U, F>(a: &Stream<A>, b: &Stream<B>, c: &Stream<C>, mut f: F) -> Stream<U>
where
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    U: Clone + 'static,
    F: FnMut(&A, &B, &C) -> Option<U> + 'static,
{
    lift3_partial(a, b, c, move |a, b, c| f(a?, b?, c?))
}

struct LiftAll<T, U> {
    values: Vec<Option<T>>,
    open: Vec<bool>,
    scratch: Vec<T>,
    combine: Box<dyn FnMut(&[T]) -> Option<U>>,
}

impl<T: Clone, U> LiftAll<T, U> {
    fn fire(&mut self, index: usize, phase: Phase, value: &T) -> (Phase, Option<U>) {
        self.values[index] = Some(value.clone());
        let phase = gate(&mut self.open, index, phase);
        self.scratch.clear();
        for v in &self.values {
            match v {
                Some(v) => self.scratch.push(v.clone()),
                None => return (phase, None),
            }
        }
        (phase, (self.combine)(&self.scratch))
    }
}

/// Combines any number of same-typed streams once all of them have a value.
pub fn lift_all<T, U, F>(sources: &[Stream<T>], f: F) -> Stream<U>
where
    T: Clone + 'static,
    U: Clone + 'static,
    F: FnMut(&[T]) -> Option<U> + 'static,
{
    let state = Rc::new(RefCell::new(LiftAll {
        values: sources.iter().map(Stream::get).collect(),
        open: sources.iter().map(Stream::is_open).collect(),
        scratch: Vec::with_capacity(sources.len()),
        combine: Box::new(f),
    }));
    let out = Stream::new();
    for (index, source) in sources.iter().enumerate() {
        out.add_upstream(feed(source, &state, &out, move |s, phase, v: &T| {
            s.fire(index, phase, v)
        }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn log_of<T: Clone + 'static>(s: &Stream<T>) -> Rc<RefCell<Vec<(Phase, T)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _ = s.subscribe(move |p, v: &T| sink.borrow_mut().push((p, v.clone())));
        log
    }

    #[test]
    fn lift_waits_for_all_values() {
        let a = Stream::new();
        let b = Stream::new();
        let sum = lift2(&a, &b, |a: &i32, b: &i32| Some(a + b));
        let log = log_of(&sum);
        a.set(1);
        assert!(log.borrow().is_empty());
        b.set(2);
        assert_eq!(*log.borrow(), vec![(Phase::Start, 3), (Phase::End, 3)]);
    }

    #[test]
    fn lift_uses_values_present_at_construction() {
        let a = Stream::with_value(10);
        let b = Stream::new();
        let sum = lift2(&a, &b, |a: &i32, b: &i32| Some(a + b));
        assert_eq!(sum.get(), None);
        b.set(5);
        assert_eq!(sum.get(), Some(15));
    }

    #[test]
    fn lift_ends_only_after_every_open_source_ends() {
        let a = Stream::new();
        let b = Stream::new();
        let pair = lift2(&a, &b, |a: &i32, b: &i32| Some((*a, *b)));
        let log = log_of(&pair);
        a.start(1);
        b.start(2);
        a.end();
        b.update(3);
        b.end();
        let phases: Vec<Phase> = log.borrow().iter().map(|(p, _)| *p).collect();
        assert_eq!(
            phases,
            vec![Phase::Start, Phase::Update, Phase::Update, Phase::End],
            "first combined value is (1, 2)"
        );
        assert_eq!(log.borrow().last(), Some(&(Phase::End, (1, 3))));
    }

    #[test]
    fn partial_lift_sees_missing_sources() {
        let a: Stream<i32> = Stream::new();
        let b: Stream<i32> = Stream::new();
        let c = lift2_partial(&a, &b, |a, b| Some(a.copied().unwrap_or(0) + b.copied().unwrap_or(100)));
        a.set(1);
        assert_eq!(c.get(), Some(101));
        b.set(2);
        assert_eq!(c.get(), Some(3));
    }

    #[test]
    fn lift3_combines() {
        let a = Stream::with_value(1);
        let b = Stream::with_value(2);
        let c = Stream::new();
        let total = lift3(&a, &b, &c, |a: &i32, b: &i32, c: &i32| Some(a * b * c));
        c.set(4);
        assert_eq!(total.get(), Some(8));
    }

    #[test]
    fn lift_all_combines_homogeneous_sources() {
        let sources: Vec<Stream<u32>> = (0..3).map(|_| Stream::new()).collect();
        let total = lift_all(&sources, |vals| Some(vals.iter().sum::<u32>()));
        sources[0].set(1);
        sources[1].set(2);
        assert_eq!(total.get(), None);
        sources[2].set(3);
        assert_eq!(total.get(), Some(6));
    }

    #[test]
    fn detached_lift_stops_listening() {
        let a = Stream::new();
        let b = Stream::with_value(1);
        let sum = lift2(&a, &b, |a: &i32, b: &i32| Some(a + b));
        sum.detach();
        assert_eq!(a.subscriber_count(), 0);
        assert_eq!(b.subscriber_count(), 0);
    }
}
