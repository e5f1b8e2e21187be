// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layout composition.
//!
//! A node's absolute layout is its [`LocalLayout`] composed under the
//! parent's absolute [`LayoutSpec`]:
//!
//! ```text
//! transform = parent.transform
//!           × translate(align × parent size)
//!           × local.transform
//!           × translate(−origin × size)
//! opacity   = clamp(local.opacity × parent.opacity, MIN_OPACITY, MAX_OPACITY)
//! ```
//!
//! The opacity clamp keeps every committed value strictly inside `(0, 1)`,
//! so the commit layer sees reaching "invisible" as a threshold crossing
//! rather than a discrete value.

use kurbo::Vec2;

use crate::size::NodeSize;
use crate::transform::Transform;

/// Lowest committed opacity. At or below it a widget is treated as hidden
/// and stops receiving input.
pub const MIN_OPACITY: f64 = 0.0001;

/// Highest committed opacity.
pub const MAX_OPACITY: f64 = 0.9999;

/// The layout inputs a node sets for itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalLayout {
    /// Transform relative to the aligned position.
    pub transform: Transform,
    /// Opacity multiplier.
    pub opacity: f64,
    /// Anchor point as a fraction of the node's own size.
    pub origin: Vec2,
    /// Position inside the parent as a fraction of the parent's size.
    pub align: Option<Vec2>,
}

impl Default for LocalLayout {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl LocalLayout {
    /// No transform, full opacity, top-left origin, no alignment.
    pub const IDENTITY: Self = Self {
        transform: Transform::IDENTITY,
        opacity: 1.0,
        origin: Vec2::ZERO,
        align: None,
    };
}

/// A fully resolved absolute layout, ready to commit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutSpec {
    /// Absolute transform.
    pub transform: Transform,
    /// Effective opacity, within `[MIN_OPACITY, MAX_OPACITY]` once composed.
    pub opacity: f64,
    /// The node's own origin.
    pub origin: Vec2,
    /// The node's resolved size.
    pub size: NodeSize,
}

impl LayoutSpec {
    /// The layout of a render root of the given size.
    #[must_use]
    pub const fn root(size: NodeSize) -> Self {
        Self {
            transform: Transform::IDENTITY,
            opacity: 1.0,
            origin: Vec2::ZERO,
            size,
        }
    }
}

/// Clamps a composed opacity into `[MIN_OPACITY, MAX_OPACITY]`.
#[must_use]
pub fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_nan() {
        return MIN_OPACITY;
    }
    opacity.clamp(MIN_OPACITY, MAX_OPACITY)
}

/// Composes `local` under `parent` for a node of `size`.
///
/// Returns `None` until both `parent` and `size` are known.
#[must_use]
pub fn compose_layout(
    local: &LocalLayout,
    parent: Option<&LayoutSpec>,
    size: Option<NodeSize>,
) -> Option<LayoutSpec> {
    let parent = parent?;
    let size = size?;

    let mut transform = parent.transform;
    if let Some(align) = local.align {
        let p = parent.size.to_size_lossy();
        transform = transform.pre_translate(align.x * p.width, align.y * p.height);
    }
    transform = transform * local.transform;
    let own = size.to_size_lossy();
    transform = transform.pre_translate(-local.origin.x * own.width, -local.origin.y * own.height);

    Some(LayoutSpec {
        transform,
        opacity: clamp_opacity(local.opacity * parent.opacity),
        origin: local.origin,
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: NodeSize = NodeSize::px(100.0, 50.0);

    fn root() -> LayoutSpec {
        LayoutSpec::root(NodeSize::px(400.0, 300.0))
    }

    #[test]
    fn unresolved_inputs_yield_none() {
        let local = LocalLayout::IDENTITY;
        assert_eq!(compose_layout(&local, None, Some(SIZE)), None);
        assert_eq!(compose_layout(&local, Some(&root()), None), None);
    }

    #[test]
    fn opacity_is_multiplied_and_clamped() {
        let local = LocalLayout {
            opacity: 0.5,
            ..LocalLayout::IDENTITY
        };
        let mut parent = root();
        parent.opacity = 0.5;
        let out = compose_layout(&local, Some(&parent), Some(SIZE)).unwrap();
        assert_eq!(out.opacity, 0.25);

        let full = compose_layout(&LocalLayout::IDENTITY, Some(&root()), Some(SIZE)).unwrap();
        assert_eq!(full.opacity, MAX_OPACITY);

        let hidden = LocalLayout {
            opacity: 0.0,
            ..LocalLayout::IDENTITY
        };
        let out = compose_layout(&hidden, Some(&root()), Some(SIZE)).unwrap();
        assert_eq!(out.opacity, MIN_OPACITY);
        assert_eq!(clamp_opacity(f64::NAN), MIN_OPACITY);
    }

    #[test]
    fn align_and_origin_offset_translation() {
        let local = LocalLayout {
            align: Some(Vec2::new(0.5, 0.5)),
            origin: Vec2::new(0.5, 0.5),
            ..LocalLayout::IDENTITY
        };
        let out = compose_layout(&local, Some(&root()), Some(SIZE)).unwrap();
        // Centered: (200, 150) minus half the node size.
        assert_eq!(out.transform.translation(), Vec2::new(150.0, 125.0));
        assert_eq!(out.origin, Vec2::new(0.5, 0.5));
    }

    #[test]
    fn composition_is_associative() {
        let a = LocalLayout {
            transform: Transform::translate(10.0, 0.0) * Transform::scale(2.0, 2.0),
            opacity: 0.8,
            ..LocalLayout::IDENTITY
        };
        let b = LocalLayout {
            transform: Transform::rotate_z(0.3),
            opacity: 0.5,
            ..LocalLayout::IDENTITY
        };
        let c = LocalLayout {
            transform: Transform::translate(0.0, 7.0),
            ..LocalLayout::IDENTITY
        };
        // Compose a, then b under a, then c under b.
        let la = compose_layout(&a, Some(&root()), Some(SIZE)).unwrap();
        let lb = compose_layout(&b, Some(&la), Some(SIZE)).unwrap();
        let lc = compose_layout(&c, Some(&lb), Some(SIZE)).unwrap();
        // Compose (b then c) as one local first.
        let bc = LocalLayout {
            transform: b.transform * c.transform,
            opacity: b.opacity * c.opacity,
            ..LocalLayout::IDENTITY
        };
        let lbc = compose_layout(&bc, Some(&la), Some(SIZE)).unwrap();
        assert!(lc.transform.approx_eq(&lbc.transform, 1e-9));
        assert!((lc.opacity - lbc.opacity).abs() < 1e-9);
    }
}
