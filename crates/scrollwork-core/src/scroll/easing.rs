//! L4 Atomic Layer: Pure easing functions
//!
//! Every curve maps input [0, 1] to output [0, 1]. Input is clamped before
//! evaluation so progress that overshoots through float accumulation never
//! extrapolates.

use std::fmt;
use std::rc::Rc;

pub use crate::config::EasingType;

impl EasingType {
    /// Apply the easing function to a progress value
    ///
    /// # Arguments
    /// * `t` - Progress value, clamped to [0, 1]
    ///
    /// # Returns
    /// Eased value in range [0, 1]
    #[inline]
    pub fn apply(&self, t: f64) -> f64 {
        let t = clamp_unit(t);
        match self {
            EasingType::None => {
                if t < 1.0 {
                    0.0
                } else {
                    1.0
                }
            }
            EasingType::Linear => t,
            EasingType::Power1Out => power_ease_out(t, 2),
            EasingType::Power2Out | EasingType::Cubic => power_ease_out(t, 3),
            EasingType::Power3Out => power_ease_out(t, 4),
            EasingType::Power3InOut => power_ease_in_out(t, 4),
            EasingType::Quintic => power_ease_out(t, 5),
            EasingType::ExpoOut => expo_ease_out(t),
        }
    }
}

/// An easing curve: one of the named presets or a caller-supplied function
#[derive(Clone)]
pub enum Easing {
    Preset(EasingType),
    Custom(Rc<dyn Fn(f64) -> f64>),
}

impl Easing {
    pub fn custom(f: impl Fn(f64) -> f64 + 'static) -> Self {
        Easing::Custom(Rc::new(f))
    }

    #[inline]
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Preset(preset) => preset.apply(t),
            Easing::Custom(f) => f(clamp_unit(t)),
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Preset(EasingType::Linear)
    }
}

impl From<EasingType> for Easing {
    fn from(preset: EasingType) -> Self {
        Easing::Preset(preset)
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Preset(preset) => write!(f, "Easing::{:?}", preset),
            Easing::Custom(_) => f.write_str("Easing::Custom"),
        }
    }
}

#[inline]
fn clamp_unit(t: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}

/// Power ease-out: f(t) = 1 - (1-t)^n
#[inline]
fn power_ease_out(t: f64, n: i32) -> f64 {
    1.0 - (1.0 - t).powi(n)
}

/// Power ease-in-out with the same exponent on both halves
#[inline]
fn power_ease_in_out(t: f64, n: i32) -> f64 {
    if t < 0.5 {
        2f64.powi(n - 1) * t.powi(n)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(n) / 2.0
    }
}

/// Exponential ease-out: f(t) = min(1, 1.001 - 2^(-10t))
#[inline]
fn expo_ease_out(t: f64) -> f64 {
    (1.001 - 2.0_f64.powf(-10.0 * t)).min(1.0)
}
