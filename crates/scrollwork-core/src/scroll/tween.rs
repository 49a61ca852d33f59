//! L4 Atomic Layer: Time-bounded tween of the raw scroll position

use std::time::Duration;

use super::easing::Easing;
use super::timing::{is_complete, lerp, progress};

/// A programmatic scroll in flight
#[derive(Debug, Clone)]
pub struct ScrollTween {
    from: f64,
    to: f64,
    elapsed: Duration,
    duration: Duration,
    easing: Easing,
}

impl ScrollTween {
    pub fn new(from: f64, to: f64, duration: Duration, easing: Easing) -> Self {
        Self {
            from,
            to,
            elapsed: Duration::ZERO,
            duration,
            easing,
        }
    }

    pub fn target(&self) -> f64 {
        self.to
    }

    /// Advance by `dt` and return the sampled position
    ///
    /// On completion the exact target is returned, never an eased approximation.
    pub fn advance(&mut self, dt: Duration) -> f64 {
        self.elapsed = self.elapsed.saturating_add(dt);
        self.sample()
    }

    pub fn sample(&self) -> f64 {
        if self.is_done() {
            return self.to;
        }
        let t = progress(self.elapsed, self.duration);
        lerp(self.from, self.to, self.easing.apply(t))
    }

    pub fn is_done(&self) -> bool {
        is_complete(self.elapsed, self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EasingType;

    #[test]
    fn test_tween_lands_exactly_on_target() {
        // expo-out never reaches 1.0 on its own
        let mut tween = ScrollTween::new(
            0.0,
            500.0,
            Duration::from_millis(100),
            EasingType::ExpoOut.into(),
        );
        let mid = tween.advance(Duration::from_millis(50));
        assert!(mid > 0.0 && mid < 500.0);
        assert_eq!(tween.advance(Duration::from_millis(50)), 500.0);
        assert!(tween.is_done());
    }

    #[test]
    fn test_zero_duration_is_immediate() {
        let tween = ScrollTween::new(10.0, 20.0, Duration::ZERO, Easing::default());
        assert!(tween.is_done());
        assert_eq!(tween.sample(), 20.0);
    }
}
