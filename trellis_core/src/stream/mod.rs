// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Push-based reactive values with `Start`/`Update`/`End` phases.
//!
//! A [`Stream`] caches its current value and pushes every change to its
//! subscribers in insertion order. Changes arrive in *sequences*: a sequence
//! opens with [`Phase::Start`], carries any number of [`Phase::Update`]s, and
//! closes with [`Phase::End`]. A discrete change is a `Start` immediately
//! followed by an `End`.
//!
//! # Phase normalization
//!
//! [`Stream::emit`] keeps every stream's output well formed regardless of what
//! its inputs do:
//!
//! - `Start`/`Update` with a value: delivered as `Start` if the stream is
//!   closed, otherwise as `Update`.
//! - `Start`/`Update` without a value: suppressed.
//! - `End` with a value on a closed stream: delivered as `Start` then `End`.
//! - `End` without a value: closes an open sequence with the last value.
//!
//! # Derived streams
//!
//! [`Stream::map`], [`lift2`], [`lift3`], [`lift_all`] and the `_partial`
//! variants build derived streams. A derived stream holds the subscriptions
//! to its sources; sources only hold a weak reference back, so dropping the
//! last handle to a derived stream disconnects it on the next source event.
//! Derived streams do not prime themselves: their first value comes from the
//! next source event. [`Stream::detach`] disconnects eagerly.

mod lift;

pub use lift::{lift_all, lift2, lift2_partial, lift3, lift3_partial};

use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;

/// Position of an event inside a change sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// First event of a sequence.
    Start,
    /// Intermediate event.
    Update,
    /// Last event of a sequence.
    End,
}

type Callback<T> = Rc<RefCell<dyn FnMut(Phase, &T) -> bool>>;

struct Listener<T> {
    id: u64,
    callback: Callback<T>,
}

struct Inner<T> {
    value: RefCell<Option<T>>,
    open: Cell<bool>,
    listeners: RefCell<Vec<Listener<T>>>,
    next_id: Cell<u64>,
    upstream: RefCell<Vec<Subscription>>,
}

trait Unsubscribe {
    fn remove_listener(&self, id: u64);
    fn has_listener(&self, id: u64) -> bool;
}

impl<T> Unsubscribe for Inner<T> {
    fn remove_listener(&self, id: u64) {
        if let Ok(mut listeners) = self.listeners.try_borrow_mut() {
            listeners.retain(|l| l.id != id);
        }
    }

    fn has_listener(&self, id: u64) -> bool {
        self.listeners.borrow().iter().any(|l| l.id == id)
    }
}

/// A shared, single-threaded reactive value.
///
/// Cloning a `Stream` clones the handle; both handles observe and drive the
/// same value.
pub struct Stream<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Stream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Default for Stream<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Stream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("value", &self.inner.value.try_borrow().ok())
            .field("open", &self.inner.open.get())
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> Stream<T> {
    /// Creates a closed stream with no value.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(None),
                open: Cell::new(false),
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                upstream: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Creates a closed stream holding `value` without emitting.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        let stream = Self::new();
        *stream.inner.value.borrow_mut() = Some(value);
        stream
    }

    /// Returns a clone of the current value.
    #[must_use]
    pub fn get(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    /// Whether a change sequence is in progress.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Whether both handles refer to the same stream.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns a weak handle that does not keep the stream alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakStream<T> {
        WeakStream {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Emits `value` with `phase`, normalized as described in the
    /// [module docs](self).
    pub fn emit(&self, phase: Phase, value: Option<T>) {
        match (phase, value) {
            (Phase::Start | Phase::Update, Some(value)) => {
                let phase = if self.inner.open.replace(true) {
                    Phase::Update
                } else {
                    Phase::Start
                };
                self.store(value.clone());
                self.deliver(phase, &value);
            }
            (Phase::Start | Phase::Update, None) => {}
            (Phase::End, Some(value)) => {
                self.store(value.clone());
                if !self.inner.open.get() {
                    self.deliver(Phase::Start, &value);
                }
                self.inner.open.set(false);
                self.deliver(Phase::End, &value);
            }
            (Phase::End, None) => {
                if self.inner.open.replace(false) {
                    if let Some(value) = self.get() {
                        self.deliver(Phase::End, &value);
                    }
                }
            }
        }
    }

    /// Opens (or continues) a sequence with `value`.
    pub fn start(&self, value: T) {
        self.emit(Phase::Start, Some(value));
    }

    /// Continues a sequence with `value`.
    pub fn update(&self, value: T) {
        self.emit(Phase::Update, Some(value));
    }

    /// Closes the current sequence with its last value.
    pub fn end(&self) {
        self.emit(Phase::End, None);
    }

    /// Emits `value` as a discrete change (`Start` then `End`).
    pub fn set(&self, value: T) {
        self.emit(Phase::Start, Some(value.clone()));
        self.emit(Phase::End, Some(value));
    }

    /// Re-emits the current value as a discrete change, if there is one.
    pub fn touch(&self) {
        if let Some(value) = self.get() {
            self.set(value);
        }
    }

    /// Registers `listener` and returns the subscription record.
    ///
    /// If a sequence is in progress, `listener` immediately receives `Start`
    /// with the current value. Dropping the returned [`Subscription`] does
    /// not unsubscribe.
    pub fn subscribe(&self, mut listener: impl FnMut(Phase, &T) + 'static) -> Subscription {
        if self.is_open() {
            if let Some(value) = self.get() {
                listener(Phase::Start, &value);
            }
        }
        self.listen(move |phase, value| {
            listener(phase, value);
            true
        })
    }

    /// Forwards every event of `self` to `target`.
    ///
    /// The link holds `target` weakly; it lapses once `target` is dropped.
    pub fn pipe(&self, target: &Self) -> Subscription {
        let target = target.downgrade();
        self.listen(move |phase, value| match target.upgrade() {
            Some(target) => {
                target.emit(phase, Some(value.clone()));
                true
            }
            None => false,
        })
    }

    /// Derives a stream whose payload is `f(value)`. `None` from `f`
    /// suppresses the event.
    pub fn map<U, F>(&self, mut f: F) -> Stream<U>
    where
        U: Clone + 'static,
        F: FnMut(&T) -> Option<U> + 'static,
    {
        let out = Stream::new();
        let weak = out.downgrade();
        let sub = self.listen(move |phase, value| match weak.upgrade() {
            Some(out) => {
                out.emit(phase, f(value));
                true
            }
            None => false,
        });
        out.add_upstream(sub);
        out
    }

    /// Unsubscribes a derived stream from all of its sources.
    pub fn detach(&self) {
        let upstream = core::mem::take(&mut *self.inner.upstream.borrow_mut());
        for sub in upstream {
            sub.unsubscribe();
        }
    }

    /// Whether this stream is currently linked to any source.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.upstream.borrow().iter().any(Subscription::is_active)
    }

    pub(crate) fn add_upstream(&self, sub: Subscription) {
        self.inner.upstream.borrow_mut().push(sub);
    }

    /// Registers a listener that returns `false` once it should be dropped.
    pub(crate) fn listen(
        &self,
        callback: impl FnMut(Phase, &T) -> bool + 'static,
    ) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let callback: Callback<T> = Rc::new(RefCell::new(callback));
        self.inner
            .listeners
            .borrow_mut()
            .push(Listener { id, callback });
        let source: Weak<dyn Unsubscribe> = Rc::downgrade(&self.inner) as Weak<dyn Unsubscribe>;
        Subscription { source, id }
    }

    fn store(&self, value: T) {
        *self.inner.value.borrow_mut() = Some(value);
    }

    fn deliver(&self, phase: Phase, value: &T) {
        let snapshot: Vec<(u64, Callback<T>)> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|l| (l.id, Rc::clone(&l.callback)))
            .collect();
        let mut lapsed = Vec::new();
        for (id, callback) in snapshot {
            // Listeners removed by an earlier listener in this pass are skipped.
            if !self.inner.has_listener(id) {
                continue;
            }
            // A listener re-entered through its own output is skipped.
            let Ok(mut callback) = callback.try_borrow_mut() else {
                continue;
            };
            if !callback(phase, value) {
                lapsed.push(id);
            }
        }
        if !lapsed.is_empty() {
            self.inner
                .listeners
                .borrow_mut()
                .retain(|l| !lapsed.contains(&l.id));
        }
    }
}

/// A non-owning handle to a [`Stream`].
pub struct WeakStream<T> {
    inner: Weak<Inner<T>>,
}

impl<T> Clone for WeakStream<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for WeakStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakStream")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<T> WeakStream<T> {
    /// Returns a strong handle if the stream is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Stream<T>> {
        self.inner.upgrade().map(|inner| Stream { inner })
    }
}

/// The record of one listener registration.
///
/// Holds its source weakly: a subscription never keeps a stream alive.
pub struct Subscription {
    source: Weak<dyn Unsubscribe>,
    id: u64,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    /// Removes the listener from its source. No-op if the source is gone.
    pub fn unsubscribe(self) {
        if let Some(source) = self.source.upgrade() {
            source.remove_listener(self.id);
        }
    }

    /// Whether the source is alive and still holds the listener.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.source
            .upgrade()
            .is_some_and(|source| source.has_listener(self.id))
    }
}

/// A set of subscriptions released together.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subs: Vec<Subscription>,
}

impl SubscriptionSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscription to the set.
    pub fn push(&mut self, sub: Subscription) {
        self.subs.push(sub);
    }

    /// Unsubscribes everything in the set.
    pub fn clear(&mut self) {
        for sub in self.subs.drain(..) {
            sub.unsubscribe();
        }
    }

    /// Number of subscriptions held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }
}

impl Extend<Subscription> for SubscriptionSet {
    fn extend<I: IntoIterator<Item = Subscription>>(&mut self, iter: I) {
        self.subs.extend(iter);
    }
}
