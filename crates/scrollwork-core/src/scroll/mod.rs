//! Virtual scroll system
//!
//! Turns raw wheel/touch input into an eased virtual scroll position.
//!
//! # Architecture
//!
//! ## L4 Atomic Layer
//! - `easing` - Pure easing functions (power curves, expo-out, custom)
//! - `timing` - Tick-driven time utilities (progress, interpolation)
//! - `config` - Configuration types and derived values
//! - `tween` - Time-bounded tween of the raw position
//!
//! ## L3 Molecular Layer
//! - `engine` - Virtual scroll engine combining atoms
//!
//! # Usage
//!
//! ```ignore
//! use scrollwork_core::scroll::{ScrollConfig, VirtualScrollEngine};
//!
//! let mut engine = VirtualScrollEngine::new(ScrollConfig::default());
//! engine.set_extents(content_height, viewport_height);
//!
//! // Feed input as it arrives
//! engine.wheel(0.0, delta_y);
//!
//! // Once per frame
//! let state = engine.update(dt);
//! ```

// L4 Atomic Layer
pub mod config;
pub mod easing;
pub mod timing;
pub mod tween;

// L3 Molecular Layer
pub mod engine;

// Re-exports for convenient access
pub use config::{InputKind, Orientation, ScrollConfig, ScrollConfigExt};
pub use easing::{Easing, EasingType};
pub use engine::{Direction, ScrollState, VirtualScrollEngine};
pub use tween::ScrollTween;
