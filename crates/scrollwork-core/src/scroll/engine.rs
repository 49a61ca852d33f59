//! L3 Molecular Layer: Virtual scroll engine
//!
//! Integrates raw wheel/touch deltas into a raw position and eases a virtual
//! position toward it once per tick. A programmatic scroll (`scroll_to`)
//! takes over the raw position until it completes or is cancelled; input
//! arriving in the meantime is dropped.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use super::config::{InputKind, ScrollConfig, ScrollConfigExt};
use super::easing::Easing;
use super::tween::ScrollTween;

/// Gap below which the virtual position snaps onto the raw position
pub const SNAP_DISTANCE: f64 = 0.01;

/// Velocity (px/s) below which the direction reads as `None`
pub const DIRECTION_EPSILON: f64 = 1.0;

/// Scroll direction derived from the sign of the velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    #[default]
    None,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::None => "none",
        }
    }

    fn from_velocity(velocity: f64) -> Self {
        if velocity > DIRECTION_EPSILON {
            Direction::Down
        } else if velocity < -DIRECTION_EPSILON {
            Direction::Up
        } else {
            Direction::None
        }
    }
}

/// Authoritative scroll state, mutated once per tick by the engine only
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScrollState {
    pub raw_position: f64,
    pub virtual_position: f64,
    /// Virtual position change per second over the last tick
    pub velocity: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone)]
pub struct VirtualScrollEngine {
    config: ScrollConfig,
    state: ScrollState,
    /// Input accumulated since the last tick
    pending_delta: f64,
    tween: Option<ScrollTween>,
    content_extent: f64,
    viewport_extent: f64,
}

impl VirtualScrollEngine {
    pub fn new(config: ScrollConfig) -> Self {
        Self {
            config,
            state: ScrollState::default(),
            pending_delta: 0.0,
            tween: None,
            content_extent: 0.0,
            viewport_extent: 0.0,
        }
    }

    pub fn config(&self) -> &ScrollConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> &ScrollState {
        &self.state
    }

    /// Largest reachable position: `content - viewport`, never negative
    pub fn limit(&self) -> f64 {
        (self.content_extent - self.viewport_extent).max(0.0)
    }

    /// Page progress of the virtual position over the scrollable range
    pub fn progress(&self) -> f64 {
        let limit = self.limit();
        if limit <= 0.0 {
            return 0.0;
        }
        (self.state.virtual_position / limit).clamp(0.0, 1.0)
    }

    /// Record the measured extents; re-clamps the position when finite
    pub fn set_extents(&mut self, content: f64, viewport: f64) {
        self.content_extent = content.max(0.0);
        self.viewport_extent = viewport.max(0.0);
        self.state.raw_position = self.clamp(self.state.raw_position);
        self.state.virtual_position = self.clamp(self.state.virtual_position);
    }

    /// Check if a programmatic scroll is in flight
    #[inline]
    pub fn is_scrolling_to(&self) -> bool {
        self.tween.is_some()
    }

    /// Queue a raw input delta for the next tick
    pub fn input(&mut self, kind: InputKind, dx: f64, dy: f64) {
        if self.tween.is_some() {
            debug!(?kind, "Dropping input during programmatic scroll");
            return;
        }
        let delta = self.config.axis_delta(dx, dy) * self.config.multiplier(kind);
        if delta.is_finite() {
            self.pending_delta += delta;
        }
    }

    pub fn wheel(&mut self, dx: f64, dy: f64) {
        self.input(InputKind::Wheel, dx, dy);
    }

    pub fn touch(&mut self, dx: f64, dy: f64) {
        self.input(InputKind::Touch, dx, dy);
    }

    /// Start a programmatic scroll toward `target`
    ///
    /// `immediate` (or a zero duration) jumps without a tween. Pending input
    /// is discarded either way.
    pub fn scroll_to(&mut self, target: f64, duration: Duration, easing: Easing, immediate: bool) {
        let target = self.clamp(target);
        self.pending_delta = 0.0;

        if immediate || duration.is_zero() {
            self.tween = None;
            self.state.raw_position = target;
            self.state.virtual_position = target;
            return;
        }

        debug!(from = self.state.virtual_position, to = target, "Starting programmatic scroll");
        self.state.raw_position = self.state.virtual_position;
        self.tween = Some(ScrollTween::new(
            self.state.virtual_position,
            target,
            duration,
            easing,
        ));
    }

    /// Stop a programmatic scroll where it is; no-op when none is running
    pub fn cancel_scroll_to(&mut self) {
        if self.tween.take().is_some() {
            debug!(position = self.state.raw_position, "Programmatic scroll cancelled");
        }
    }

    /// Integrate one tick and return the new state
    pub fn update(&mut self, dt: Duration) -> &ScrollState {
        let previous = self.state.virtual_position;

        if let Some(mut tween) = self.tween.take() {
            let position = self.clamp(tween.advance(dt));
            self.state.raw_position = position;
            self.state.virtual_position = position;
            if !tween.is_done() {
                self.tween = Some(tween);
            }
            self.pending_delta = 0.0;
        } else {
            if self.pending_delta != 0.0 {
                self.state.raw_position = self.clamp(self.state.raw_position + self.pending_delta);
                self.pending_delta = 0.0;
            }

            let gap = self.state.raw_position - self.state.virtual_position;
            self.state.virtual_position += gap * self.config.smoothing_factor;
            if (self.state.raw_position - self.state.virtual_position).abs() < SNAP_DISTANCE {
                self.state.virtual_position = self.state.raw_position;
            }
        }

        let secs = dt.as_secs_f64();
        self.state.velocity = if secs > 0.0 {
            (self.state.virtual_position - previous) / secs
        } else {
            0.0
        };
        self.state.direction = Direction::from_velocity(self.state.velocity);

        &self.state
    }

    /// Reset to the initial state
    pub fn reset(&mut self) {
        self.state = ScrollState::default();
        self.pending_delta = 0.0;
        self.tween = None;
    }

    fn clamp(&self, position: f64) -> f64 {
        if self.config.infinite {
            position
        } else {
            position.clamp(0.0, self.limit())
        }
    }
}
