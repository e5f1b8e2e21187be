// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Size resolution.
//!
//! A [`SizeSpec`] describes how a node sizes itself relative to its parent.
//! Each axis resolves independently, in this order of precedence:
//!
//! 1. [`Dimension::Fixed`] pixels.
//! 2. [`Dimension::Intrinsic`]: the host-measured size, or the
//!    [`Extent::Intrinsic`] sentinel while no measurement is known.
//! 3. A proportion of the parent axis.
//! 4. The aspect ratio applied to the other axis, once that axis resolved to
//!    pixels. The ratio is `width / height`. An axis takes its size from the
//!    ratio when it is [`Dimension::Aspect`], or when it would otherwise
//!    inherit while the other axis is sized explicitly. An aspect axis next
//!    to an inheriting axis derives from the inherited parent value.
//! 5. The parent axis, unchanged.
//!
//! Margins are then subtracted from pixel axes, clamping at zero. Measured
//! axes already describe the widget's own box and are left as measured.

use kurbo::Size;

/// How one axis of a [`SizeSpec`] is sized.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Dimension {
    /// Take the parent's size on this axis, unless a proportion applies.
    #[default]
    Inherit,
    /// Exactly this many pixels.
    Fixed(f64),
    /// The host's measured size of the widget content.
    Intrinsic,
    /// Derived from the other axis through the aspect ratio.
    Aspect,
}

impl From<f64> for Dimension {
    fn from(px: f64) -> Self {
        Self::Fixed(px)
    }
}

/// One resolved axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Extent {
    /// A pixel size.
    Px(f64),
    /// Intrinsic and not yet measured by the host.
    Intrinsic,
    /// Intrinsic, with the host's last measurement.
    Measured(f64),
}

impl Extent {
    /// The pixel value of this axis, if known.
    #[must_use]
    pub const fn px(self) -> Option<f64> {
        match self {
            Self::Px(v) | Self::Measured(v) => Some(v),
            Self::Intrinsic => None,
        }
    }

    /// Whether the host owns this axis.
    #[must_use]
    pub const fn is_intrinsic(self) -> bool {
        matches!(self, Self::Intrinsic | Self::Measured(_))
    }
}

/// A resolved node size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeSize {
    /// Horizontal axis.
    pub width: Extent,
    /// Vertical axis.
    pub height: Extent,
}

impl NodeSize {
    /// A pixel size.
    #[must_use]
    pub const fn px(width: f64, height: f64) -> Self {
        Self {
            width: Extent::Px(width),
            height: Extent::Px(height),
        }
    }

    /// Both axes as pixels, if both are known.
    #[must_use]
    pub fn to_size(self) -> Option<Size> {
        Some(Size::new(self.width.px()?, self.height.px()?))
    }

    /// Pixel size with unknown axes taken as zero.
    #[must_use]
    pub fn to_size_lossy(self) -> Size {
        Size::new(
            self.width.px().unwrap_or(0.0),
            self.height.px().unwrap_or(0.0),
        )
    }

    const fn axes(self) -> [Extent; 2] {
        [self.width, self.height]
    }

    const fn from_axes([width, height]: [Extent; 2]) -> Self {
        Self { width, height }
    }
}

impl From<Size> for NodeSize {
    fn from(size: Size) -> Self {
        Self::px(size.width, size.height)
    }
}

/// The accumulated size inputs of one node.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SizeSpec {
    /// Per-axis sizing policy.
    pub size: [Dimension; 2],
    /// Per-axis fraction of the parent size.
    pub proportions: [Option<f64>; 2],
    /// Per-axis pixels subtracted after resolution.
    pub margins: [f64; 2],
    /// `width / height`, used by aspect-derived axes.
    pub aspect_ratio: Option<f64>,
}

/// Resolves `spec` against `parent`.
///
/// `measured` is the host measurement of the widget, used for intrinsic
/// axes. Returns `None` while a dependency is unresolved: a proportion of, or
/// an axis inherited from, an unmeasured intrinsic parent axis.
#[must_use]
pub fn resolve_size(spec: &SizeSpec, parent: NodeSize, measured: Option<Size>) -> Option<NodeSize> {
    let parent = parent.axes();
    let measured = measured.map(|m| [m.width, m.height]);
    let mut out: [Option<Extent>; 2] = [None; 2];

    for axis in 0..2 {
        out[axis] = match spec.size[axis] {
            Dimension::Fixed(px) => Some(Extent::Px(px)),
            Dimension::Intrinsic => Some(measured.map_or(Extent::Intrinsic, |m| Extent::Measured(m[axis]))),
            Dimension::Inherit | Dimension::Aspect => match spec.proportions[axis] {
                Some(proportion) => Some(Extent::Px(parent[axis].px()? * proportion)),
                None => None,
            },
        };
    }

    if let Some(ratio) = spec.aspect_ratio.filter(|r| r.is_finite() && *r > 0.0) {
        let explicit =
            |axis: usize| spec.size[axis] != Dimension::Inherit || spec.proportions[axis].is_some();
        let derived: [Option<Extent>; 2] = core::array::from_fn(|axis| {
            if out[axis].is_some() {
                return None;
            }
            let other = 1 - axis;
            let wants_ratio = spec.size[axis] == Dimension::Aspect
                || (spec.size[axis] == Dimension::Inherit && explicit(other));
            let from = match out[other] {
                Some(extent) => extent.px()?,
                // An aspect axis still follows an inherited neighbour.
                None if spec.size[axis] == Dimension::Aspect
                    && spec.size[other] == Dimension::Inherit =>
                {
                    parent[other].px()?
                }
                None => return None,
            };
            wants_ratio.then(|| Extent::Px(if axis == 0 { from * ratio } else { from / ratio }))
        });
        for axis in 0..2 {
            if derived[axis].is_some() {
                out[axis] = derived[axis];
            }
        }
    }

    let mut resolved = [Extent::Intrinsic; 2];
    for axis in 0..2 {
        let extent = match out[axis] {
            Some(own) => own,
            // A measurement belongs to the parent's widget; children see pixels.
            None => Extent::Px(parent[axis].px()?),
        };
        resolved[axis] = match extent {
            Extent::Px(v) => Extent::Px((v - spec.margins[axis]).max(0.0)),
            other => other,
        };
    }
    Some(NodeSize::from_axes(resolved))
}

/// Resolves sizes and suppresses results equal to the previous one.
#[derive(Clone, Copy, Debug, Default)]
pub struct SizeResolver {
    previous: Option<NodeSize>,
}

impl SizeResolver {
    /// Creates a resolver with no previous result.
    #[must_use]
    pub const fn new() -> Self {
        Self { previous: None }
    }

    /// Resolves `spec`; returns `None` if unresolved or unchanged.
    pub fn resolve(
        &mut self,
        spec: &SizeSpec,
        parent: NodeSize,
        measured: Option<Size>,
    ) -> Option<NodeSize> {
        let size = resolve_size(spec, parent, measured)?;
        if self.previous == Some(size) {
            return None;
        }
        self.previous = Some(size);
        Some(size)
    }

    /// The last emitted resolution.
    #[must_use]
    pub const fn previous(&self) -> Option<NodeSize> {
        self.previous
    }

    /// Forgets the previous result so the next resolution is emitted.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
