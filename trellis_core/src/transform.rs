// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transforms for layout composition.
//!
//! Layout composes transforms ancestor-first: a node's absolute transform is
//! `parent × local`. Hosts rarely accept raw matrices, so [`Transform::decompose`]
//! reduces a transform to the 2-D translate/scale/rotate parts widget hosts
//! understand.

use core::ops::Mul;

use kurbo::Vec2;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// Component magnitude below which transform entries are treated as zero.
pub const EPSILON: f64 = 1e-5;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one column `[x, y, z, w]`; the translation lives in
/// column 3.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Four columns.
    pub cols: [[f64; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// A translation in the XY plane.
    #[inline]
    #[must_use]
    pub const fn translate(x: f64, y: f64) -> Self {
        Self::translate_3d(x, y, 0.0)
    }

    /// A translation in 3-D.
    #[inline]
    #[must_use]
    pub const fn translate_3d(x: f64, y: f64, z: f64) -> Self {
        let mut t = Self::IDENTITY;
        t.cols[3] = [x, y, z, 1.0];
        t
    }

    /// A non-uniform scale in the XY plane.
    #[inline]
    #[must_use]
    pub const fn scale(sx: f64, sy: f64) -> Self {
        let mut t = Self::IDENTITY;
        t.cols[0][0] = sx;
        t.cols[1][1] = sy;
        t
    }

    /// A rotation about the Z axis, in radians.
    #[inline]
    #[must_use]
    pub fn rotate_z(radians: f64) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        let mut t = Self::IDENTITY;
        t.cols[0] = [c, s, 0.0, 0.0];
        t.cols[1] = [-s, c, 0.0, 0.0];
        t
    }

    /// Returns the XY translation component.
    #[inline]
    #[must_use]
    pub const fn translation(&self) -> Vec2 {
        Vec2::new(self.cols[3][0], self.cols[3][1])
    }

    /// Returns `self` followed by a translation applied in local space,
    /// i.e. `self × translate(x, y)`.
    #[must_use]
    pub fn pre_translate(self, x: f64, y: f64) -> Self {
        if x == 0.0 && y == 0.0 {
            return self;
        }
        self * Self::translate(x, y)
    }

    /// Returns a copy with every component whose magnitude is below
    /// [`EPSILON`] replaced by exact zero.
    #[must_use]
    pub fn snapped(mut self) -> Self {
        for col in &mut self.cols {
            for v in col.iter_mut() {
                if v.abs() < EPSILON {
                    *v = 0.0;
                }
            }
        }
        self
    }

    /// Component-wise comparison with tolerance `eps`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        self.cols
            .iter()
            .flatten()
            .zip(other.cols.iter().flatten())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// Rounds the XY translation to the nearest `1 / unit` increment.
    #[must_use]
    pub fn round_translation(mut self, unit: f64) -> Self {
        self.cols[3][0] = round_to(self.cols[3][0], unit);
        self.cols[3][1] = round_to(self.cols[3][1], unit);
        self
    }

    /// Decomposes the XY part of the transform into translation, scale and
    /// Z rotation. Skew is folded into the Y scale.
    #[must_use]
    pub fn decompose(&self) -> TransformParts {
        let [a, b, ..] = self.cols[0];
        let [c, d, ..] = self.cols[1];
        let scale_x = (a * a + b * b).sqrt();
        let (rotation, scale_y) = if scale_x > 0.0 {
            (b.atan2(a), (a * d - b * c) / scale_x)
        } else {
            (0.0, (c * c + d * d).sqrt())
        };
        TransformParts {
            translation: self.translation(),
            scale: Vec2::new(scale_x, scale_y),
            rotation,
        }
    }

    /// Is every component finite?
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }
}

impl Mul for Transform {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let mut out = [[0.0; 4]; 4];
        for (col, out_col) in out.iter_mut().enumerate() {
            for (row, v) in out_col.iter_mut().enumerate() {
                *v = self.cols[0][row] * rhs.cols[col][0]
                    + self.cols[1][row] * rhs.cols[col][1]
                    + self.cols[2][row] * rhs.cols[col][2]
                    + self.cols[3][row] * rhs.cols[col][3];
            }
        }
        Self { cols: out }
    }
}

/// The host-facing decomposition of a [`Transform`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformParts {
    /// XY translation in pixels.
    pub translation: Vec2,
    /// XY scale factors.
    pub scale: Vec2,
    /// Rotation about Z, in radians.
    pub rotation: f64,
}

impl TransformParts {
    /// The parts of the identity transform.
    pub const IDENTITY: Self = Self {
        translation: Vec2::ZERO,
        scale: Vec2::new(1.0, 1.0),
        rotation: 0.0,
    };
}

/// Rounds `value` to the nearest `1 / unit`. A `unit` of 1 rounds to whole
/// pixels.
#[must_use]
pub fn round_to(value: f64, unit: f64) -> f64 {
    if unit == 1.0 {
        value.round()
    } else {
        (value * unit).round() / unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_neutral() {
        let t = Transform::translate(3.0, 4.0) * Transform::scale(2.0, 2.0);
        assert_eq!(Transform::IDENTITY * t, t);
        assert_eq!(t * Transform::IDENTITY, t);
    }

    #[test]
    fn parent_is_outer_in_products() {
        // Scale applied after translation doubles the offset.
        let parent = Transform::scale(2.0, 2.0);
        let child = Transform::translate(5.0, 0.0);
        assert_eq!((parent * child).translation(), Vec2::new(10.0, 0.0));
        assert_eq!((child * parent).translation(), Vec2::new(5.0, 0.0));
    }

    #[test]
    fn snapping_zeroes_drift() {
        let mut t = Transform::rotate_z(core::f64::consts::FRAC_PI_2);
        t.cols[3][0] = 3e-6;
        let s = t.snapped();
        assert_eq!(s.cols[0][0], 0.0);
        assert_eq!(s.cols[3][0], 0.0);
        assert_eq!(s.cols[0][1], 1.0);
    }

    #[test]
    fn approx_eq_uses_tolerance() {
        let a = Transform::translate(1.0, 1.0);
        let b = Transform::translate(1.0 + 5e-6, 1.0);
        let c = Transform::translate(1.001, 1.0);
        assert!(a.approx_eq(&b, EPSILON));
        assert!(!a.approx_eq(&c, EPSILON));
    }

    #[test]
    fn decompose_recovers_parts() {
        let t = Transform::translate(10.0, 20.0)
            * Transform::rotate_z(0.5)
            * Transform::scale(2.0, 3.0);
        let parts = t.decompose();
        let eps = 1e-9;
        assert!((parts.translation.x - 10.0).abs() < eps);
        assert!((parts.translation.y - 20.0).abs() < eps);
        assert!((parts.rotation - 0.5).abs() < eps);
        assert!((parts.scale.x - 2.0).abs() < eps);
        assert!((parts.scale.y - 3.0).abs() < eps);
    }

    #[test]
    fn round_translation_uses_unit() {
        let t = Transform::translate(10.26, 3.74).round_translation(4.0);
        assert_eq!(t.translation(), Vec2::new(10.25, 3.75));
        let whole = Transform::translate(10.6, 3.2).round_translation(1.0);
        assert_eq!(whole.translation(), Vec2::new(11.0, 3.0));
    }
}
