//! Pinned section controller
//!
//! While its scrub trigger is active the section is held fixed in the
//! viewport and an inner track is translated by `progress * range_length`
//! instead, which reads as sideways (or extended) scrolling inside a
//! vertically scrolling page.

use std::time::Duration;

use tracing::debug;

use crate::config::Orientation;
use crate::dom::{Pin, Viewport, WeakElement};
use crate::trigger::{Edge, TriggerPosition};

/// Registration options for a pinned section
#[derive(Debug, Clone)]
pub struct PinnedSectionConfig {
    /// Where pinning begins; the range then runs `range_length` past it
    pub start: TriggerPosition,
    /// Axis the track moves along
    pub track_orientation: Orientation,
    /// Pre-arm the pin slightly before the start boundary
    pub anticipate: bool,
    pub scrub_lag: Option<Duration>,
}

impl Default for PinnedSectionConfig {
    fn default() -> Self {
        Self {
            start: TriggerPosition::edges(Edge::Start, Edge::Start),
            track_orientation: Orientation::Horizontal,
            anticipate: false,
            scrub_lag: None,
        }
    }
}

impl PinnedSectionConfig {
    pub fn anticipate(mut self, anticipate: bool) -> Self {
        self.anticipate = anticipate;
        self
    }

    pub fn track_orientation(mut self, orientation: Orientation) -> Self {
        self.track_orientation = orientation;
        self
    }

    pub fn scrub_lag(mut self, lag: Duration) -> Self {
        self.scrub_lag = Some(lag);
        self
    }
}

#[derive(Debug, Clone)]
pub struct PinnedSection {
    section: WeakElement,
    track: WeakElement,
    axis: Orientation,
    anticipate_px: f64,
    range_length: f64,
    progress: f64,
    pinned: bool,
}

impl PinnedSection {
    /// `anticipate_px` is the configured pre-arm distance, used only when
    /// the section asked for anticipation
    pub(crate) fn new(
        section: WeakElement,
        track: WeakElement,
        config: &PinnedSectionConfig,
        anticipate_px: f64,
    ) -> Self {
        Self {
            section,
            track,
            axis: config.track_orientation,
            anticipate_px: if config.anticipate { anticipate_px } else { 0.0 },
            range_length: 0.0,
            progress: 0.0,
            pinned: false,
        }
    }

    /// Recompute `range_length` from the track's content extent
    ///
    /// Returns false when either element is missing.
    pub(crate) fn measure(&mut self, viewport: &Viewport) -> bool {
        if !self.section.is_live() {
            return false;
        }
        let Some(track) = self.track.resolve() else {
            return false;
        };
        let extent = track.borrow().scroll_extent(self.axis);
        self.range_length = (extent - viewport.extent(self.axis)).max(0.0);
        debug!(
            section = %self.section.label(),
            range_length = self.range_length,
            "Pinned section measured"
        );
        true
    }

    pub fn range_length(&self) -> f64 {
        self.range_length
    }

    /// Extra scroll distance the host reserves after the section
    pub fn spacer_extent(&self) -> f64 {
        self.range_length
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Current track offset along its axis
    pub fn translate(&self) -> f64 {
        -self.progress * self.range_length
    }

    /// Map scrub progress onto the track transform
    pub(crate) fn scrub(&mut self, progress: f64) {
        self.progress = progress.clamp(0.0, 1.0);
        let offset = self.translate();
        let axis = self.axis;
        self.track.with_style(|style| match axis {
            Orientation::Horizontal => style.translate_x = offset,
            Orientation::Vertical => style.translate_y = offset,
        });
    }

    /// Apply or release the fixed-position style for the current scroll position
    ///
    /// Anticipation widens the pinned window at the start only; progress is
    /// unaffected.
    pub(crate) fn update_pin(&mut self, position: f64, start: f64, end: f64) {
        let pinned = position >= start - self.anticipate_px && position <= end;
        if pinned == self.pinned {
            return;
        }
        let applied = self.section.with_style(|style| {
            style.pinned = pinned.then_some(Pin { offset: 0.0 });
        });
        if applied {
            debug!(section = %self.section.label(), pinned, position, "Pin state changed");
            self.pinned = pinned;
        }
    }

    /// Drop the fixed-position style and return the track to its origin
    pub(crate) fn release(&mut self) {
        if self.pinned {
            self.section.with_style(|style| style.pinned = None);
            self.pinned = false;
        }
        self.progress = 0.0;
        let axis = self.axis;
        self.track.with_style(|style| match axis {
            Orientation::Horizontal => style.translate_x = 0.0,
            Orientation::Vertical => style.translate_y = 0.0,
        });
        debug!(section = %self.section.label(), "Pinned section released");
    }
}
