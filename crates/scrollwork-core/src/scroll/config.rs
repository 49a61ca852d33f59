//! L4 Atomic Layer: Configuration types for the virtual scroll engine
//!
//! Re-exports configuration from the crate root and adds derived values.

use std::time::Duration;

pub use crate::config::{Orientation, ScrollConfig};

use super::easing::Easing;

/// Source of a raw input delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Wheel,
    Touch,
}

/// Extension trait for ScrollConfig with utility methods
pub trait ScrollConfigExt {
    /// Default duration of a programmatic scroll
    fn scroll_duration(&self) -> Duration;

    /// Default easing of a programmatic scroll
    fn scroll_easing(&self) -> Easing;

    /// Multiplier applied to a raw delta of the given kind
    fn multiplier(&self, kind: InputKind) -> f64;

    /// Pick the delta component that lies on the configured axis
    fn axis_delta(&self, dx: f64, dy: f64) -> f64;
}

impl ScrollConfigExt for ScrollConfig {
    #[inline]
    fn scroll_duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    #[inline]
    fn scroll_easing(&self) -> Easing {
        Easing::Preset(self.easing)
    }

    #[inline]
    fn multiplier(&self, kind: InputKind) -> f64 {
        match kind {
            InputKind::Wheel => self.wheel_multiplier,
            InputKind::Touch => self.touch_multiplier,
        }
    }

    #[inline]
    fn axis_delta(&self, dx: f64, dy: f64) -> f64 {
        match self.orientation {
            Orientation::Vertical => dy,
            Orientation::Horizontal => dx,
        }
    }
}
