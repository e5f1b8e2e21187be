// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame timestamps and debounce timing.
//!
//! [`FrameTime`] is the monotonic timestamp a host hands to
//! [`Engine::step`](crate::engine::Engine::step), in nanoseconds. Hosts backed
//! by `requestAnimationFrame` convert the `DOMHighResTimeStamp` milliseconds
//! with [`FrameTime::from_millis_f64`].
//!
//! [`Debounce`] is the re-armable timer used for resize-end detection. It has
//! no clock of its own: it is polled with frame timestamps, so it "fires" on
//! the first frame at or after its deadline.

use core::fmt;
use core::time::Duration;

/// A monotonic frame timestamp in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FrameTime(pub u64);

impl FrameTime {
    /// The zero timestamp.
    pub const ZERO: Self = Self(0);

    /// Creates a timestamp from whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms.saturating_mul(1_000_000))
    }

    /// Creates a timestamp from fractional milliseconds, as delivered by
    /// `requestAnimationFrame`. Negative and non-finite inputs map to zero.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "frame timestamps are small positive values; nanoseconds fit in u64"
    )]
    pub fn from_millis_f64(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Self((ms * 1_000_000.0) as u64)
        } else {
            Self::ZERO
        }
    }

    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Returns the time elapsed since `earlier`, or zero if `earlier` is later.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// Adds a duration, saturating at `u64::MAX` nanoseconds.
    #[inline]
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "durations beyond u64 nanoseconds saturate"
    )]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        let nanos = duration.as_nanos();
        if nanos > u64::MAX as u128 {
            Self(u64::MAX)
        } else {
            Self(self.0.saturating_add(nanos as u64))
        }
    }
}

impl fmt::Debug for FrameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameTime({}ns)", self.0)
    }
}

/// A re-armable, frame-polled debounce timer.
///
/// Every [`arm`](Self::arm) pushes the deadline to `now + delay`. [`poll`]
/// returns `true` exactly once, on the first poll at or after the deadline,
/// and disarms the timer.
///
/// [`poll`]: Self::poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<FrameTime>,
}

impl Debounce {
    /// Creates a disarmed debounce with the given delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Returns the configured delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)arms the timer relative to `now`.
    pub fn arm(&mut self, now: FrameTime) {
        self.deadline = Some(now.saturating_add(self.delay));
    }

    /// Disarms the timer without firing.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Whether a deadline is pending.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fires (returns `true`) if armed and `now` has reached the deadline.
    pub fn poll(&mut self, now: FrameTime) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_millis_f64_converts_raf_timestamps() {
        assert_eq!(FrameTime::from_millis_f64(16.5), FrameTime(16_500_000));
        assert_eq!(FrameTime::from_millis_f64(-3.0), FrameTime::ZERO);
        assert_eq!(FrameTime::from_millis_f64(f64::NAN), FrameTime::ZERO);
    }

    #[test]
    fn saturating_duration_since_clamps() {
        let a = FrameTime::from_millis(10);
        let b = FrameTime::from_millis(4);
        assert_eq!(a.saturating_duration_since(b), Duration::from_millis(6));
        assert_eq!(b.saturating_duration_since(a), Duration::ZERO);
    }

    #[test]
    fn debounce_fires_once_after_last_arm() {
        let mut d = Debounce::new(Duration::from_millis(150));
        d.arm(FrameTime::from_millis(0));
        d.arm(FrameTime::from_millis(50));
        d.arm(FrameTime::from_millis(100));
        assert!(!d.poll(FrameTime::from_millis(200)));
        assert!(d.poll(FrameTime::from_millis(250)));
        assert!(!d.poll(FrameTime::from_millis(400)));
        assert!(!d.is_armed());
    }

    #[test]
    fn cancelled_debounce_never_fires() {
        let mut d = Debounce::new(Duration::from_millis(10));
        d.arm(FrameTime::ZERO);
        d.cancel();
        assert!(!d.poll(FrameTime::from_millis(100)));
    }
}
