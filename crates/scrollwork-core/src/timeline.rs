//! L3 Molecular Layer: Timeline animator
//!
//! A timeline is an ordered list of steps placed on one local clock. The
//! clock advances by the tick delta during duration playback, or is set
//! directly from a scrub trigger's progress. Rendering walks the steps in
//! order, so when two steps write the same property the later one wins.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dom::{Property, Style, WeakElement};
use crate::scroll::timing::{lerp, progress};
use crate::scroll::Easing;
use crate::trigger::{ToggleAction, TriggerConfig};

/// Sparse set of property values; unset properties are left alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_y: Option<f64>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property: Property) -> Option<f64> {
        match property {
            Property::Opacity => self.opacity,
            Property::X => self.x,
            Property::Y => self.y,
            Property::XPercent => self.x_percent,
            Property::YPercent => self.y_percent,
            Property::Scale => self.scale,
            Property::ScaleY => self.scale_y,
        }
    }

    pub fn set(&mut self, property: Property, value: f64) {
        let slot = match property {
            Property::Opacity => &mut self.opacity,
            Property::X => &mut self.x,
            Property::Y => &mut self.y,
            Property::XPercent => &mut self.x_percent,
            Property::YPercent => &mut self.y_percent,
            Property::Scale => &mut self.scale,
            Property::ScaleY => &mut self.scale_y,
        };
        *slot = Some(value);
    }

    pub fn with(mut self, property: Property, value: f64) -> Self {
        self.set(property, value);
        self
    }

    pub fn opacity(self, value: f64) -> Self {
        self.with(Property::Opacity, value)
    }

    pub fn x(self, value: f64) -> Self {
        self.with(Property::X, value)
    }

    pub fn y(self, value: f64) -> Self {
        self.with(Property::Y, value)
    }

    pub fn x_percent(self, value: f64) -> Self {
        self.with(Property::XPercent, value)
    }

    pub fn y_percent(self, value: f64) -> Self {
        self.with(Property::YPercent, value)
    }

    pub fn scale(self, value: f64) -> Self {
        self.with(Property::Scale, value)
    }

    pub fn scale_y(self, value: f64) -> Self {
        self.with(Property::ScaleY, value)
    }

    /// Set properties in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (Property, f64)> + '_ {
        Property::ALL
            .into_iter()
            .filter_map(|property| self.get(property).map(|value| (property, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// One tween of a target's properties
///
/// A property given only in `to` animates from the element's style at
/// registration; one given only in `from` animates back to it.
#[derive(Debug, Clone)]
pub struct Step {
    pub target: WeakElement,
    pub from: PropertySet,
    pub to: PropertySet,
    pub duration: Duration,
    /// Offset from the step's placement in the timeline
    pub delay: Duration,
    pub easing: Easing,
}

impl Step {
    pub fn new(
        target: impl Into<WeakElement>,
        from: PropertySet,
        to: PropertySet,
        duration: Duration,
    ) -> Self {
        Self {
            target: target.into(),
            from,
            to,
            duration,
            delay: Duration::ZERO,
            easing: Easing::default(),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn easing(mut self, easing: impl Into<Easing>) -> Self {
        self.easing = easing.into();
        self
    }
}

#[derive(Debug, Clone)]
struct Placed {
    step: Step,
    start: Duration,
}

/// Places steps on a timeline's clock
#[derive(Debug, Clone, Default)]
pub struct TimelineBuilder {
    placed: Vec<Placed>,
    last_start: Duration,
    end: Duration,
}

impl TimelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append after everything placed so far
    pub fn then(mut self, step: Step) -> Self {
        let start = self.end + step.delay;
        self.place(step, start);
        self
    }

    /// Start together with the previously placed step
    pub fn with(mut self, step: Step) -> Self {
        let start = self.last_start + step.delay;
        self.place(step, start);
        self
    }

    /// Append a group whose members start `interval` apart
    pub fn stagger(mut self, steps: impl IntoIterator<Item = Step>, interval: Duration) -> Self {
        let base = self.end;
        for (index, step) in steps.into_iter().enumerate() {
            let start = base + interval * index as u32 + step.delay;
            self.place(step, start);
        }
        self.last_start = base;
        self
    }

    /// End of the last step placed
    pub fn duration(&self) -> Duration {
        self.end
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    fn place(&mut self, step: Step, start: Duration) {
        self.end = self.end.max(start + step.duration);
        self.last_start = start;
        self.placed.push(Placed { step, start });
    }
}

/// Registration options for a timeline
#[derive(Debug, Default)]
pub struct TimelineConfig {
    /// Drive playback from a trigger on this element
    pub trigger: Option<(WeakElement, TriggerConfig)>,
    /// Stay idle after registration instead of playing
    pub paused: bool,
}

impl TimelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(mut self, element: impl Into<WeakElement>, config: TriggerConfig) -> Self {
        self.trigger = Some((element.into(), config));
        self
    }

    pub fn paused(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayState {
    /// Not advancing on its own; position set by seek, reset or cancel
    #[default]
    Idle,
    Playing,
    Paused,
    /// Reached either end of the clock in the playing direction
    Finished,
}

#[derive(Debug, Clone, Copy)]
struct Channel {
    property: Property,
    from: f64,
    to: f64,
    /// First step to write this property on this target; renders `from`
    /// before it starts
    leading: bool,
}

#[derive(Debug, Clone)]
struct Track {
    target: WeakElement,
    start: Duration,
    duration: Duration,
    easing: Easing,
    channels: Vec<Channel>,
}

impl Track {
    fn end(&self) -> Duration {
        self.start + self.duration
    }

    fn writes(&self, property: Property) -> bool {
        self.channels.iter().any(|c| c.property == property)
    }
}

#[derive(Debug, Clone)]
pub struct Timeline {
    tracks: Vec<Track>,
    duration: Duration,
    time: Duration,
    reversed: bool,
    state: PlayState,
}

impl Timeline {
    /// Resolve the builder's steps against current element styles and
    /// render the starting values
    pub fn new(builder: TimelineBuilder) -> Self {
        let mut tracks: Vec<Track> = Vec::with_capacity(builder.placed.len());

        for Placed { step, start } in builder.placed {
            let base = step
                .target
                .resolve()
                .map(|el| el.borrow().style.clone())
                .unwrap_or_default();

            let mut channels = Vec::new();
            for property in Property::ALL {
                let (from, to) = match (step.from.get(property), step.to.get(property)) {
                    (None, None) => continue,
                    (from, to) => (
                        from.unwrap_or_else(|| base.get(property)),
                        to.unwrap_or_else(|| base.get(property)),
                    ),
                };
                let leading = !tracks
                    .iter()
                    .any(|t| t.target.ptr_eq(&step.target) && t.writes(property));
                channels.push(Channel {
                    property,
                    from,
                    to,
                    leading,
                });
            }

            tracks.push(Track {
                target: step.target,
                start,
                duration: step.duration,
                easing: step.easing,
                channels,
            });
        }

        let timeline = Self {
            tracks,
            duration: builder.end,
            time: Duration::ZERO,
            reversed: false,
            state: PlayState::Idle,
        };
        for (a, b, property) in timeline.overlaps() {
            warn!(
                element = %timeline.tracks[a].target.label(),
                ?property,
                first = a,
                second = b,
                "Overlapping timeline steps, later step wins"
            );
        }
        timeline.render();
        timeline
    }

    /// Pairs of steps writing the same property of the same target at the same time
    fn overlaps(&self) -> Vec<(usize, usize, Property)> {
        let mut found = Vec::new();
        for (i, a) in self.tracks.iter().enumerate() {
            for (j, b) in self.tracks.iter().enumerate().skip(i + 1) {
                if !a.target.ptr_eq(&b.target) || a.start >= b.end() || b.start >= a.end() {
                    continue;
                }
                for channel in &a.channels {
                    if b.writes(channel.property) {
                        found.push((i, j, channel.property));
                    }
                }
            }
        }
        found
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn time(&self) -> Duration {
        self.time
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Position of the clock in [0, 1]
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return if self.state == PlayState::Finished && !self.reversed {
                1.0
            } else {
                0.0
            };
        }
        progress(self.time, self.duration)
    }

    pub fn play(&mut self) {
        self.reversed = false;
        self.state = PlayState::Playing;
    }

    pub fn reverse(&mut self) {
        self.reversed = true;
        self.state = PlayState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == PlayState::Playing {
            self.state = PlayState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == PlayState::Paused {
            self.state = PlayState::Playing;
        }
    }

    pub fn restart(&mut self) {
        self.time = Duration::ZERO;
        self.render();
        self.play();
    }

    /// Rewind to the start and stop
    pub fn reset(&mut self) {
        self.time = Duration::ZERO;
        self.reversed = false;
        self.state = PlayState::Idle;
        self.render();
    }

    /// Jump to the end and stop
    pub fn complete(&mut self) {
        self.time = self.duration;
        self.reversed = false;
        self.state = PlayState::Finished;
        self.render();
    }

    /// Set the clock from external progress; stops duration playback
    pub fn seek_progress(&mut self, progress: f64) {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        self.time = self.duration.mul_f64(progress);
        self.state = PlayState::Idle;
        self.render();
    }

    /// Stop playback where it is; no-op when not playing
    pub fn cancel(&mut self) {
        if matches!(self.state, PlayState::Playing | PlayState::Paused) {
            debug!(time = ?self.time, "Timeline playback cancelled");
            self.state = PlayState::Idle;
        }
    }

    /// Carry out a trigger's toggle action
    pub fn apply(&mut self, action: ToggleAction) {
        match action {
            ToggleAction::Play => self.play(),
            ToggleAction::Pause => self.pause(),
            ToggleAction::Resume => self.resume(),
            ToggleAction::Reverse => self.reverse(),
            ToggleAction::Restart => self.restart(),
            ToggleAction::Reset => self.reset(),
            ToggleAction::Complete => self.complete(),
            ToggleAction::None => {}
        }
    }

    /// Advance the clock by one tick; returns whether anything rendered
    pub fn advance(&mut self, dt: Duration) -> bool {
        if self.state != PlayState::Playing {
            return false;
        }
        if self.reversed {
            self.time = self.time.saturating_sub(dt);
            if self.time.is_zero() {
                self.state = PlayState::Finished;
            }
        } else {
            self.time = (self.time + dt).min(self.duration);
            if self.time >= self.duration {
                self.state = PlayState::Finished;
            }
        }
        self.render();
        true
    }

    fn render(&self) {
        for track in &self.tracks {
            let local = if self.time >= track.start {
                let p = if self.state == PlayState::Finished && !self.reversed {
                    1.0
                } else {
                    progress(self.time - track.start, track.duration)
                };
                Some(track.easing.apply(p))
            } else {
                None
            };

            track.target.with_style(|style: &mut Style| {
                for channel in &track.channels {
                    match local {
                        Some(eased) => {
                            style.set(channel.property, lerp(channel.from, channel.to, eased))
                        }
                        None if channel.leading => style.set(channel.property, channel.from),
                        None => {}
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EasingType;
    use crate::dom::{Bounds, Element, ElementHandle};

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    fn element(label: &str) -> ElementHandle {
        Element::new(label, Bounds::default()).into_handle()
    }

    fn opacity(el: &ElementHandle) -> f64 {
        el.borrow().style.opacity
    }

    fn fade(el: &ElementHandle, duration: u64) -> Step {
        Step::new(
            el,
            PropertySet::new().opacity(0.0),
            PropertySet::new().opacity(1.0),
            ms(duration),
        )
    }

    #[test]
    fn test_from_values_render_on_creation() {
        let el = element("hero");
        let _timeline = Timeline::new(TimelineBuilder::new().then(Step::new(
            &el,
            PropertySet::new().y(60.0).opacity(0.0),
            PropertySet::new().y(0.0).opacity(1.0),
            ms(1200),
        )));
        assert_eq!(el.borrow().style.translate_y, 60.0);
        assert_eq!(opacity(&el), 0.0);
    }

    #[test]
    fn test_settles_exactly_on_to_values() {
        let el = element("hero");
        let mut timeline = Timeline::new(TimelineBuilder::new().then(
            Step::new(&el, PropertySet::new().y(60.0), PropertySet::new().y(0.0), ms(1000))
                .easing(EasingType::Power3Out),
        ));
        timeline.play();
        for _ in 0..70 {
            timeline.advance(ms(16));
        }
        assert_eq!(timeline.state(), PlayState::Finished);
        assert_eq!(el.borrow().style.translate_y, 0.0);
        assert_eq!(timeline.progress(), 1.0);
        assert!(!timeline.advance(ms(16)));
    }

    #[test]
    fn test_then_and_with_placement() {
        let a = element("a");
        let b = element("b");
        let builder = TimelineBuilder::new()
            .then(fade(&a, 500))
            .then(fade(&b, 500))
            .with(Step::new(&b, PropertySet::new(), PropertySet::new().scale(1.2), ms(300)));
        assert_eq!(builder.duration(), ms(1000));

        let mut timeline = Timeline::new(builder);
        timeline.play();
        timeline.advance(ms(500));
        assert_eq!(opacity(&a), 1.0);
        assert_eq!(opacity(&b), 0.0);
        timeline.advance(ms(300));
        assert!((b.borrow().style.scale - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_stagger_completes_with_last_member() {
        let words: Vec<ElementHandle> = (0..4).map(|i| element(&format!("w{}", i))).collect();
        let builder = TimelineBuilder::new()
            .stagger(words.iter().map(|w| fade(w, 800)), ms(50));
        assert_eq!(builder.duration(), ms(950));

        let mut timeline = Timeline::new(builder);
        timeline.play();
        timeline.advance(ms(800));
        assert_eq!(opacity(&words[0]), 1.0);
        assert!(opacity(&words[3]) < 1.0);
        assert_eq!(timeline.state(), PlayState::Playing);

        timeline.advance(ms(150));
        assert_eq!(timeline.state(), PlayState::Finished);
        assert_eq!(opacity(&words[3]), 1.0);
    }

    #[test]
    fn test_reverse_returns_to_start() {
        let el = element("card");
        let mut timeline = Timeline::new(TimelineBuilder::new().then(fade(&el, 400)));
        timeline.play();
        timeline.advance(ms(200));
        timeline.reverse();
        timeline.advance(ms(500));
        assert_eq!(timeline.state(), PlayState::Finished);
        assert_eq!(timeline.progress(), 0.0);
        assert_eq!(opacity(&el), 0.0);
    }

    #[test]
    fn test_seek_progress_and_cancel() {
        let el = element("card");
        let mut timeline = Timeline::new(TimelineBuilder::new().then(fade(&el, 1000)));
        timeline.seek_progress(0.25);
        assert!((opacity(&el) - 0.25).abs() < 1e-9);
        timeline.seek_progress(1.7);
        assert_eq!(opacity(&el), 1.0);

        timeline.reset();
        timeline.play();
        timeline.advance(ms(300));
        timeline.cancel();
        timeline.cancel();
        assert_eq!(timeline.state(), PlayState::Idle);
        assert!(!timeline.advance(ms(300)));
        assert_eq!(timeline.time(), ms(300));
    }

    #[test]
    fn test_to_only_step_starts_from_current_style() {
        let el = element("card");
        el.borrow_mut().style.translate_x = 40.0;
        let mut timeline = Timeline::new(TimelineBuilder::new().then(Step::new(
            &el,
            PropertySet::new(),
            PropertySet::new().x(0.0),
            ms(100),
        )));
        assert_eq!(el.borrow().style.translate_x, 40.0);
        timeline.complete();
        assert_eq!(el.borrow().style.translate_x, 0.0);
    }

    #[test]
    fn test_overlap_detected_and_last_write_wins() {
        let el = element("card");
        let timeline = Timeline::new(
            TimelineBuilder::new()
                .then(fade(&el, 1000))
                .with(Step::new(
                    &el,
                    PropertySet::new(),
                    PropertySet::new().opacity(0.5),
                    ms(1000),
                )),
        );
        assert_eq!(timeline.overlaps(), vec![(0, 1, Property::Opacity)]);

        let mut timeline = timeline;
        timeline.complete();
        assert_eq!(opacity(&el), 0.5);
    }

    #[test]
    fn test_sequenced_steps_on_same_property_do_not_overlap() {
        let el = element("card");
        let timeline = Timeline::new(
            TimelineBuilder::new()
                .then(fade(&el, 500))
                .then(Step::new(
                    &el,
                    PropertySet::new().opacity(1.0),
                    PropertySet::new().opacity(0.2),
                    ms(500),
                )),
        );
        assert!(timeline.overlaps().is_empty());
        // only the leading step renders before playback
        assert_eq!(opacity(&el), 0.0);
    }

    #[test]
    fn test_missing_target_is_skipped() {
        let el = element("gone");
        let mut timeline = Timeline::new(TimelineBuilder::new().then(fade(&el, 100)));
        el.borrow_mut().connected = false;
        timeline.complete();
        assert_eq!(opacity(&el), 0.0);
    }

    #[test]
    fn test_toggle_actions_drive_playback() {
        let el = element("card");
        let mut timeline = Timeline::new(TimelineBuilder::new().then(fade(&el, 100)));
        timeline.apply(ToggleAction::Play);
        assert!(timeline.is_playing());
        timeline.apply(ToggleAction::Pause);
        assert_eq!(timeline.state(), PlayState::Paused);
        timeline.apply(ToggleAction::Resume);
        timeline.apply(ToggleAction::Reverse);
        assert!(timeline.is_reversed());
        timeline.apply(ToggleAction::Complete);
        assert_eq!(opacity(&el), 1.0);
        timeline.apply(ToggleAction::None);
        assert_eq!(timeline.state(), PlayState::Finished);
    }
}
