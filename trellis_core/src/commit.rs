// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal property writes to host widgets.
//!
//! A [`WidgetOutput`] caches what was last written to one widget and writes
//! only what changed:
//!
//! - **Transform** is snapped (sub-[`EPSILON`] components become zero) and
//!   compared component-wise with tolerance [`EPSILON`]. The translation is
//!   rounded to device pixels when written.
//! - **Opacity** and **origin** are compared exactly. Opacity at or below
//!   [`MIN_OPACITY`] disables input on the widget; rising above it
//!   re-enables input. Both toggles fire only on the crossing.
//! - **Size** is rounded to `1 / (2 × device_pixel_ratio)` before comparison.
//!   Intrinsic axes are never written; their size is read back from the host.
//!
//! Every property starts dirty so the first commit writes everything.
//!
//! [`EPSILON`]: crate::transform::EPSILON

use kurbo::{Size, Vec2};

use crate::host::{WidgetHost, WidgetId, WidgetProperty};
use crate::layout::{LayoutSpec, MAX_OPACITY, MIN_OPACITY};
use crate::size::{Extent, NodeSize};
use crate::transform::{EPSILON, Transform, round_to};

/// Commit-layer settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommitConfig {
    /// Host device pixel ratio.
    pub device_pixel_ratio: f64,
    /// Round translations to whole pixels instead of device pixels. Keeps
    /// text crisp at the cost of jittery motion.
    pub round_to_pixel: bool,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl CommitConfig {
    /// A device pixel ratio of 1 with device-pixel translation rounding.
    pub const DEFAULT: Self = Self {
        device_pixel_ratio: 1.0,
        round_to_pixel: false,
    };

    /// Rounding increments per pixel for sizes.
    #[must_use]
    pub fn size_unit(&self) -> f64 {
        2.0 * self.device_pixel_ratio
    }

    /// Rounding increments per pixel for translations.
    #[must_use]
    pub fn translation_unit(&self) -> f64 {
        if self.round_to_pixel {
            1.0
        } else {
            self.size_unit()
        }
    }
}

/// Which layout properties a [`WidgetOutput::commit_layout`] call wrote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutWrites {
    /// Transform was written.
    pub transform: bool,
    /// Opacity was written.
    pub opacity: bool,
    /// Origin was written.
    pub origin: bool,
}

impl LayoutWrites {
    /// Whether anything was written.
    #[must_use]
    pub const fn any(self) -> bool {
        self.transform || self.opacity || self.origin
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum AxisState {
    Px(f64),
    Intrinsic,
}

/// Cached commit state for one widget.
#[derive(Clone, Debug)]
pub struct WidgetOutput {
    config: CommitConfig,
    transform_dirty: bool,
    opacity_dirty: bool,
    origin_dirty: bool,
    interactive: bool,
    transform: Option<Transform>,
    opacity: Option<f64>,
    origin: Option<Vec2>,
    size: Option<[AxisState; 2]>,
    measured: Option<Size>,
}

impl Default for WidgetOutput {
    fn default() -> Self {
        Self::new(CommitConfig::DEFAULT)
    }
}

impl WidgetOutput {
    /// Creates output state with every property dirty.
    #[must_use]
    pub fn new(config: CommitConfig) -> Self {
        Self {
            config,
            transform_dirty: true,
            opacity_dirty: true,
            origin_dirty: true,
            interactive: true,
            transform: None,
            opacity: None,
            origin: None,
            size: None,
            measured: None,
        }
    }

    /// The settings this output rounds with.
    #[must_use]
    pub fn config(&self) -> CommitConfig {
        self.config
    }

    /// Whether the widget currently receives input.
    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// The last committed size, with intrinsic axes taken from the last
    /// host measurement.
    #[must_use]
    pub fn committed_size(&self) -> Option<Size> {
        let [w, h] = self.size?;
        let measured = self.measured.unwrap_or(Size::ZERO);
        let axis = |a: AxisState, m: f64| match a {
            AxisState::Px(v) => v,
            AxisState::Intrinsic => m,
        };
        Some(Size::new(
            axis(w, measured.width),
            axis(h, measured.height),
        ))
    }

    /// Forces the next layout commit to write opacity.
    pub fn mark_opacity_dirty(&mut self) {
        self.opacity_dirty = true;
    }

    /// Forces the next layout commit to write origin.
    pub fn mark_origin_dirty(&mut self) {
        self.origin_dirty = true;
    }

    /// Forgets all cached state, as for a freshly allocated widget.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Writes the changed parts of `spec` to `widget`.
    pub fn commit_layout(
        &mut self,
        host: &mut dyn WidgetHost,
        widget: WidgetId,
        spec: &LayoutSpec,
    ) -> LayoutWrites {
        let transform = spec.transform.snapped();
        self.transform_dirty = self.transform_dirty
            || self
                .transform
                .is_none_or(|prev| !prev.approx_eq(&transform, EPSILON));
        self.opacity_dirty = self.opacity_dirty || self.opacity != Some(spec.opacity);
        self.origin_dirty = self.origin_dirty || self.origin != Some(spec.origin);

        let writes = LayoutWrites {
            transform: self.transform_dirty,
            opacity: self.opacity_dirty,
            origin: self.origin_dirty,
        };

        if self.opacity_dirty {
            self.opacity = Some(spec.opacity);
            self.write_opacity(host, widget, spec.opacity);
        }
        if self.origin_dirty {
            self.origin = Some(spec.origin);
            host.set(widget, WidgetProperty::Origin(spec.origin));
        }
        if self.transform_dirty {
            self.transform = Some(transform);
            let rounded = transform.round_translation(self.config.translation_unit());
            host.set(widget, WidgetProperty::Transform(rounded.decompose()));
        }

        self.transform_dirty = false;
        self.opacity_dirty = false;
        self.origin_dirty = false;
        writes
    }

    /// Writes `size` to `widget` if it changed after rounding.
    ///
    /// Intrinsic axes are measured from the host instead of written. Returns
    /// the widget's effective size when anything changed, `None` otherwise.
    pub fn commit_size(
        &mut self,
        host: &mut dyn WidgetHost,
        widget: WidgetId,
        size: NodeSize,
    ) -> Option<Size> {
        let unit = self.config.size_unit();
        let axis = |e: Extent| match e {
            Extent::Px(v) => AxisState::Px(round_to(v, unit)),
            Extent::Intrinsic | Extent::Measured(_) => AxisState::Intrinsic,
        };
        let next = [axis(size.width), axis(size.height)];

        let mut changed = false;
        if self.size != Some(next) {
            if let AxisState::Px(w) = next[0] {
                host.set(widget, WidgetProperty::Width(w));
            }
            if let AxisState::Px(h) = next[1] {
                host.set(widget, WidgetProperty::Height(h));
            }
            self.size = Some(next);
            changed = true;
        }

        if next.contains(&AxisState::Intrinsic) {
            let measured = host.measure(widget);
            if self.measured != Some(measured) {
                self.measured = Some(measured);
                changed = true;
            }
        }

        if changed { self.committed_size() } else { None }
    }

    fn write_opacity(&mut self, host: &mut dyn WidgetHost, widget: WidgetId, opacity: f64) {
        if !self.interactive && opacity > MIN_OPACITY {
            host.set(widget, WidgetProperty::Enabled(true));
            self.interactive = true;
        }
        let opacity = if opacity.is_nan() {
            MIN_OPACITY
        } else {
            opacity.clamp(MIN_OPACITY, MAX_OPACITY)
        };
        if opacity <= MIN_OPACITY && self.interactive {
            host.set(widget, WidgetProperty::Enabled(false));
            self.interactive = false;
        }
        host.set(widget, WidgetProperty::Opacity(opacity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_host::RecordingHost;
    use alloc::vec;

    const W: WidgetId = WidgetId(1);

    fn spec(opacity: f64) -> LayoutSpec {
        LayoutSpec {
            opacity,
            ..LayoutSpec::root(NodeSize::px(10.0, 10.0))
        }
    }

    #[test]
    fn first_commit_writes_everything() {
        let mut host = RecordingHost::new();
        let mut out = WidgetOutput::default();
        let writes = out.commit_layout(&mut host, W, &spec(0.5));
        assert!(writes.transform && writes.opacity && writes.origin);
        assert_eq!(host.writes_to(W).len(), 3);
    }

    #[test]
    fn identical_commit_writes_nothing() {
        let mut host = RecordingHost::new();
        let mut out = WidgetOutput::default();
        out.commit_layout(&mut host, W, &spec(0.5));
        host.clear_log();
        let writes = out.commit_layout(&mut host, W, &spec(0.5));
        assert!(!writes.any());
        assert!(host.writes_to(W).is_empty());
    }

    #[test]
    fn transform_drift_below_epsilon_is_ignored() {
        let mut host = RecordingHost::new();
        let mut out = WidgetOutput::default();
        let mut s = spec(0.5);
        s.transform = Transform::translate(10.0, 10.0);
        out.commit_layout(&mut host, W, &s);
        host.clear_log();
        s.transform = Transform::translate(10.0 + 4e-6, 10.0);
        assert!(!out.commit_layout(&mut host, W, &s).transform);
        s.transform = Transform::translate(11.0, 10.0);
        assert!(out.commit_layout(&mut host, W, &s).transform);
    }

    #[test]
    fn opacity_threshold_toggles_interactivity_once() {
        let mut host = RecordingHost::new();
        let mut out = WidgetOutput::default();
        out.commit_layout(&mut host, W, &spec(0.5));
        host.clear_log();

        out.commit_layout(&mut host, W, &spec(MIN_OPACITY));
        out.commit_layout(&mut host, W, &spec(MIN_OPACITY / 2.0));
        assert_eq!(
            host.count_of(W, |p| matches!(p, WidgetProperty::Enabled(false))),
            1
        );
        assert!(!out.is_interactive());

        out.commit_layout(&mut host, W, &spec(0.3));
        out.commit_layout(&mut host, W, &spec(0.4));
        assert_eq!(
            host.count_of(W, |p| matches!(p, WidgetProperty::Enabled(true))),
            1
        );
        assert!(out.is_interactive());
    }

    #[test]
    fn size_is_rounded_and_deduplicated() {
        let mut host = RecordingHost::new();
        let mut out = WidgetOutput::new(CommitConfig {
            device_pixel_ratio: 2.0,
            round_to_pixel: false,
        });
        let first = out.commit_size(&mut host, W, NodeSize::px(100.1, 50.0));
        assert_eq!(first, Some(Size::new(100.0, 50.0)));
        assert_eq!(
            host.writes_to(W),
            vec![WidgetProperty::Width(100.0), WidgetProperty::Height(50.0)]
        );
        host.clear_log();
        // 100.05 rounds to the same quarter pixel.
        assert_eq!(out.commit_size(&mut host, W, NodeSize::px(100.05, 50.0)), None);
        assert!(host.writes_to(W).is_empty());
        assert_eq!(
            out.commit_size(&mut host, W, NodeSize::px(100.3, 50.0)),
            Some(Size::new(100.25, 50.0))
        );
    }

    #[test]
    fn intrinsic_axes_are_measured_not_written() {
        let mut host = RecordingHost::new();
        host.set_measured(W, Size::new(80.0, 12.0));
        let mut out = WidgetOutput::default();
        let size = NodeSize {
            width: Extent::Intrinsic,
            height: Extent::Px(50.0),
        };
        assert_eq!(
            out.commit_size(&mut host, W, size),
            Some(Size::new(80.0, 50.0))
        );
        assert_eq!(host.writes_to(W), vec![WidgetProperty::Height(50.0)]);
        assert_eq!(out.commit_size(&mut host, W, size), None);
        host.set_measured(W, Size::new(90.0, 12.0));
        assert_eq!(
            out.commit_size(&mut host, W, size),
            Some(Size::new(90.0, 50.0))
        );
    }

    #[test]
    fn reset_forces_full_rewrite() {
        let mut host = RecordingHost::new();
        let mut out = WidgetOutput::default();
        out.commit_layout(&mut host, W, &spec(0.5));
        out.reset();
        host.clear_log();
        assert!(out.commit_layout(&mut host, W, &spec(0.5)).any());
    }

    #[test]
    fn marked_origin_is_rewritten() {
        let mut host = RecordingHost::new();
        let mut out = WidgetOutput::default();
        out.commit_layout(&mut host, W, &spec(0.5));
        out.mark_origin_dirty();
        let writes = out.commit_layout(&mut host, W, &spec(0.5));
        assert!(writes.origin && !writes.opacity && !writes.transform);
    }
}
