// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node accumulators of size and layout inputs.
//!
//! A [`SizeNode`] gathers the four size keys (`size`, `proportions`,
//! `margins`, `aspectRatio`) into a [`SizeSpec`]; a [`LayoutNode`] gathers
//! the four layout keys (`transform`, `opacity`, `origin`, `align`) into a
//! [`LocalLayout`]. Each key is bound to either a literal or a [`Stream`].
//! Every change to any key re-emits the whole accumulated value on the
//! node's output stream, keeping the phase of the change that caused it.

use alloc::string::ToString;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use kurbo::Vec2;

use crate::error::NodeError;
use crate::layout::LocalLayout;
use crate::size::{Dimension, SizeSpec};
use crate::stream::{Stream, Subscription};
use crate::transform::Transform;

/// A node input: a fixed value or a stream of values.
#[derive(Clone, Debug)]
pub enum Binding<T> {
    /// A value set once.
    Literal(T),
    /// A value that follows a stream.
    Reactive(Stream<T>),
}

impl<T> From<Stream<T>> for Binding<T> {
    fn from(stream: Stream<T>) -> Self {
        Self::Reactive(stream)
    }
}

macro_rules! literal_bindings {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Binding<$ty> {
                fn from(value: $ty) -> Self {
                    Self::Literal(value)
                }
            }
        )*
    };
}

literal_bindings!(
    f64,
    Option<f64>,
    [f64; 2],
    [Option<f64>; 2],
    [Dimension; 2],
    Vec2,
    Option<Vec2>,
    Transform,
);

impl From<[f64; 2]> for Binding<[Dimension; 2]> {
    fn from([w, h]: [f64; 2]) -> Self {
        Self::Literal([Dimension::Fixed(w), Dimension::Fixed(h)])
    }
}

impl From<Vec2> for Binding<Option<Vec2>> {
    fn from(v: Vec2) -> Self {
        Self::Literal(Some(v))
    }
}

/// A literal value for the string-keyed setter boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpecValue {
    /// A single number (`opacity`, `aspectRatio`).
    Number(f64),
    /// Two numbers (`size`, `margins`, `proportions`, `origin`, `align`).
    Pair([f64; 2]),
    /// Per-axis sizing policies (`size`).
    Dimensions([Dimension; 2]),
    /// Per-axis optional proportions (`proportions`).
    Proportions([Option<f64>; 2]),
    /// A 4×4 transform (`transform`).
    Transform(Transform),
    /// Clears an optional key (`aspectRatio`, `align`).
    Unset,
}

/// Shared behavior of [`SizeNode`] and [`LayoutNode`].
pub trait SpecNode {
    /// The accumulated value.
    type Spec: Clone + 'static;

    /// Returns the accumulated value.
    fn current(&self) -> Self::Spec;

    /// The stream the accumulated value is emitted on.
    fn stream(&self) -> &Stream<Self::Spec>;

    /// Sets a key from the string-keyed boundary.
    fn set_key(&mut self, key: &str, value: SpecValue) -> Result<(), NodeError>;

    /// Re-emits the accumulated value as a discrete change.
    fn touch(&self) {
        self.stream().set(self.current());
    }

    /// Unsubscribes every reactive binding.
    fn clear_bindings(&mut self);
}

/// Binding slots shared by both node kinds.
struct Accumulator<S> {
    value: Rc<RefCell<S>>,
    output: Stream<S>,
    slots: [Option<Subscription>; 4],
}

impl<S: Clone + 'static> Accumulator<S> {
    fn new(initial: S) -> Self {
        Self {
            value: Rc::new(RefCell::new(initial.clone())),
            output: Stream::with_value(initial),
            slots: [None, None, None, None],
        }
    }

    fn current(&self) -> S {
        self.value.borrow().clone()
    }

    fn bind<V: Clone + 'static>(&mut self, slot: usize, binding: Binding<V>, apply: fn(&mut S, V)) {
        if let Some(old) = self.slots[slot].take() {
            old.unsubscribe();
        }
        match binding {
            Binding::Literal(v) => {
                apply(&mut self.value.borrow_mut(), v);
                self.output.set(self.current());
            }
            Binding::Reactive(stream) => {
                // An open stream replays its `Start` on subscribe.
                if !stream.is_open() {
                    if let Some(v) = stream.get() {
                        apply(&mut self.value.borrow_mut(), v);
                        self.output.set(self.current());
                    }
                }
                let value = Rc::clone(&self.value);
                let output = self.output.downgrade();
                self.slots[slot] = Some(stream.subscribe(move |phase, v| {
                    apply(&mut value.borrow_mut(), v.clone());
                    let snapshot = value.borrow().clone();
                    if let Some(output) = output.upgrade() {
                        output.emit(phase, Some(snapshot));
                    }
                }));
            }
        }
    }

    fn clear(&mut self) {
        for slot in &mut self.slots {
            if let Some(sub) = slot.take() {
                sub.unsubscribe();
            }
        }
    }
}

/// Size keys, in slot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SizeKey {
    /// `size`
    Size,
    /// `proportions`
    Proportions,
    /// `margins`
    Margins,
    /// `aspectRatio`
    AspectRatio,
}

impl SizeKey {
    /// Parses a boundary key name.
    pub fn parse(key: &str) -> Result<Self, NodeError> {
        match key {
            "size" => Ok(Self::Size),
            "proportions" => Ok(Self::Proportions),
            "margins" => Ok(Self::Margins),
            "aspectRatio" => Ok(Self::AspectRatio),
            other => Err(NodeError::UnknownKey(other.to_string())),
        }
    }

    /// The boundary key name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Size => "size",
            Self::Proportions => "proportions",
            Self::Margins => "margins",
            Self::AspectRatio => "aspectRatio",
        }
    }
}

/// Accumulates a node's [`SizeSpec`].
pub struct SizeNode {
    acc: Accumulator<SizeSpec>,
}

impl fmt::Debug for SizeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SizeNode")
            .field("spec", &self.acc.current())
            .finish_non_exhaustive()
    }
}

impl Default for SizeNode {
    fn default() -> Self {
        Self::new()
    }
}

impl SizeNode {
    /// Creates a node with the default spec: inherit both axes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(SizeSpec::default()),
        }
    }

    /// Binds the `size` key.
    pub fn set_size(&mut self, size: impl Into<Binding<[Dimension; 2]>>) {
        self.acc.bind(SizeKey::Size as usize, size.into(), |s, v| s.size = v);
    }

    /// Binds the `proportions` key.
    pub fn set_proportions(&mut self, proportions: impl Into<Binding<[Option<f64>; 2]>>) {
        self.acc.bind(SizeKey::Proportions as usize, proportions.into(), |s, v| {
            s.proportions = v;
        });
    }

    /// Binds the `margins` key.
    pub fn set_margins(&mut self, margins: impl Into<Binding<[f64; 2]>>) {
        self.acc.bind(SizeKey::Margins as usize, margins.into(), |s, v| s.margins = v);
    }

    /// Binds the `aspectRatio` key.
    pub fn set_aspect_ratio(&mut self, ratio: impl Into<Binding<Option<f64>>>) {
        self.acc.bind(SizeKey::AspectRatio as usize, ratio.into(), |s, v| {
            s.aspect_ratio = v;
        });
    }
}

impl SpecNode for SizeNode {
    type Spec = SizeSpec;

    fn current(&self) -> SizeSpec {
        self.acc.current()
    }

    fn stream(&self) -> &Stream<SizeSpec> {
        &self.acc.output
    }

    fn set_key(&mut self, key: &str, value: SpecValue) -> Result<(), NodeError> {
        let key = SizeKey::parse(key)?;
        let mismatch = |expected| NodeError::ValueMismatch {
            key: key.name(),
            expected,
        };
        match (key, value) {
            (SizeKey::Size, SpecValue::Pair(px)) => self.set_size(px),
            (SizeKey::Size, SpecValue::Dimensions(d)) => self.set_size(d),
            (SizeKey::Size, _) => return Err(mismatch("a pair or per-axis dimensions")),
            (SizeKey::Proportions, SpecValue::Pair([x, y])) => {
                self.set_proportions([Some(x), Some(y)]);
            }
            (SizeKey::Proportions, SpecValue::Proportions(p)) => self.set_proportions(p),
            (SizeKey::Proportions, _) => return Err(mismatch("a pair of optional fractions")),
            (SizeKey::Margins, SpecValue::Pair(m)) => self.set_margins(m),
            (SizeKey::Margins, _) => return Err(mismatch("a pair")),
            (SizeKey::AspectRatio, SpecValue::Number(r)) => self.set_aspect_ratio(Some(r)),
            (SizeKey::AspectRatio, SpecValue::Unset) => self.set_aspect_ratio(None),
            (SizeKey::AspectRatio, _) => return Err(mismatch("a number")),
        }
        Ok(())
    }

    fn clear_bindings(&mut self) {
        self.acc.clear();
    }
}

/// Layout keys, in slot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayoutKey {
    /// `transform`
    Transform,
    /// `opacity`
    Opacity,
    /// `origin`
    Origin,
    /// `align`
    Align,
}

impl LayoutKey {
    /// Parses a boundary key name.
    pub fn parse(key: &str) -> Result<Self, NodeError> {
        match key {
            "transform" => Ok(Self::Transform),
            "opacity" => Ok(Self::Opacity),
            "origin" => Ok(Self::Origin),
            "align" => Ok(Self::Align),
            other => Err(NodeError::UnknownKey(other.to_string())),
        }
    }

    /// The boundary key name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Transform => "transform",
            Self::Opacity => "opacity",
            Self::Origin => "origin",
            Self::Align => "align",
        }
    }
}

/// Accumulates a node's [`LocalLayout`].
pub struct LayoutNode {
    acc: Accumulator<LocalLayout>,
}

impl fmt::Debug for LayoutNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutNode")
            .field("local", &self.acc.current())
            .finish_non_exhaustive()
    }
}

impl Default for LayoutNode {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutNode {
    /// Creates a node with the identity local layout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(LocalLayout::IDENTITY),
        }
    }

    /// Binds the `transform` key.
    pub fn set_transform(&mut self, transform: impl Into<Binding<Transform>>) {
        self.acc.bind(LayoutKey::Transform as usize, transform.into(), |l, v| {
            l.transform = v;
        });
    }

    /// Binds the `opacity` key.
    pub fn set_opacity(&mut self, opacity: impl Into<Binding<f64>>) {
        self.acc.bind(LayoutKey::Opacity as usize, opacity.into(), |l, v| l.opacity = v);
    }

    /// Binds the `origin` key.
    pub fn set_origin(&mut self, origin: impl Into<Binding<Vec2>>) {
        self.acc.bind(LayoutKey::Origin as usize, origin.into(), |l, v| l.origin = v);
    }

    /// Binds the `align` key.
    pub fn set_align(&mut self, align: impl Into<Binding<Option<Vec2>>>) {
        self.acc.bind(LayoutKey::Align as usize, align.into(), |l, v| l.align = v);
    }
}

impl SpecNode for LayoutNode {
    type Spec = LocalLayout;

    fn current(&self) -> LocalLayout {
        self.acc.current()
    }

    fn stream(&self) -> &Stream<LocalLayout> {
        &self.acc.output
    }

    fn set_key(&mut self, key: &str, value: SpecValue) -> Result<(), NodeError> {
        let key = LayoutKey::parse(key)?;
        let mismatch = |expected| NodeError::ValueMismatch {
            key: key.name(),
            expected,
        };
        match (key, value) {
            (LayoutKey::Transform, SpecValue::Transform(t)) => self.set_transform(t),
            (LayoutKey::Transform, _) => return Err(mismatch("a transform")),
            (LayoutKey::Opacity, SpecValue::Number(o)) => self.set_opacity(o),
            (LayoutKey::Opacity, _) => return Err(mismatch("a number")),
            (LayoutKey::Origin, SpecValue::Pair([x, y])) => self.set_origin(Vec2::new(x, y)),
            (LayoutKey::Origin, _) => return Err(mismatch("a pair")),
            (LayoutKey::Align, SpecValue::Pair([x, y])) => self.set_align(Vec2::new(x, y)),
            (LayoutKey::Align, SpecValue::Unset) => self.set_align(None),
            (LayoutKey::Align, _) => return Err(mismatch("a pair")),
        }
        Ok(())
    }

    fn clear_bindings(&mut self) {
        self.acc.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Phase;
    use alloc::vec::Vec;

    #[test]
    fn literal_setter_emits_discrete_change() {
        let mut node = SizeNode::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let _sub = node
            .stream()
            .subscribe(move |p, s: &SizeSpec| sink.borrow_mut().push((p, s.margins)));
        node.set_margins([4.0, 2.0]);
        assert_eq!(
            *log.borrow(),
            [(Phase::Start, [4.0, 2.0]), (Phase::End, [4.0, 2.0])]
        );
    }

    #[test]
    fn reactive_binding_follows_stream_phases() {
        let mut node = LayoutNode::new();
        let opacity = Stream::new();
        node.set_opacity(opacity.clone());
        let phases = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&phases);
        let _sub = node
            .stream()
            .subscribe(move |p, _: &LocalLayout| sink.borrow_mut().push(p));
        opacity.start(0.5);
        opacity.update(0.25);
        opacity.end();
        assert_eq!(*phases.borrow(), [Phase::Start, Phase::Update, Phase::End]);
        assert_eq!(node.current().opacity, 0.25);
    }

    #[test]
    fn rebinding_releases_previous_stream() {
        let mut node = LayoutNode::new();
        let first = Stream::new();
        node.set_opacity(first.clone());
        assert_eq!(first.subscriber_count(), 1);
        node.set_opacity(0.5);
        assert_eq!(first.subscriber_count(), 0);
        first.set(0.1);
        assert_eq!(node.current().opacity, 0.5);
    }

    #[test]
    fn reactive_binding_takes_current_value() {
        let mut node = SizeNode::new();
        node.set_aspect_ratio(Stream::with_value(Some(1.5)));
        assert_eq!(node.current().aspect_ratio, Some(1.5));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut size = SizeNode::new();
        let mut layout = LayoutNode::new();
        assert_eq!(
            size.set_key("padding", SpecValue::Pair([1.0, 1.0])),
            Err(NodeError::UnknownKey("padding".into()))
        );
        assert!(matches!(
            layout.set_key("size", SpecValue::Pair([1.0, 1.0])),
            Err(NodeError::UnknownKey(_))
        ));
    }

    #[test]
    fn mismatched_value_is_rejected() {
        let mut layout = LayoutNode::new();
        assert_eq!(
            layout.set_key("opacity", SpecValue::Pair([1.0, 1.0])),
            Err(NodeError::ValueMismatch {
                key: "opacity",
                expected: "a number"
            })
        );
        assert!(layout.set_key("align", SpecValue::Pair([0.5, 0.5])).is_ok());
        assert_eq!(layout.current().align, Some(Vec2::new(0.5, 0.5)));
    }

    #[test]
    fn clear_bindings_unsubscribes() {
        let mut node = SizeNode::new();
        let margins = Stream::with_value([1.0, 1.0]);
        node.set_margins(margins.clone());
        node.clear_bindings();
        assert_eq!(margins.subscriber_count(), 0);
    }
}
