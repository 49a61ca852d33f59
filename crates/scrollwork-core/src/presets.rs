//! Ready-made scroll animations
//!
//! Each preset registers its entities on the scheduler and hands back the
//! handle; track it in a [`Region`](crate::Region) to tear it down with the
//! owning UI region.

use std::time::Duration;

use crate::config::EasingType;
use crate::counter::CounterOptions;
use crate::dom::ElementHandle;
use crate::handle::{CounterHandle, PinHandle, TimelineHandle};
use crate::pin::PinnedSectionConfig;
use crate::scheduler::Scheduler;
use crate::timeline::{PropertySet, Step, TimelineBuilder, TimelineConfig};
use crate::trigger::{Edge, TriggerConfig, TriggerPosition};

/// `"top 85%"`: the element's top reaches 85% down the viewport
pub const REVEAL_START: TriggerPosition = TriggerPosition::edges(Edge::Start, Edge::Percent(85.0));

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

fn play_once_at(element: &ElementHandle, start: TriggerPosition) -> TimelineConfig {
    TimelineConfig::new().trigger(element, TriggerConfig::once().start(start))
}

#[derive(Debug, Clone, Copy)]
pub struct FadeIn {
    /// Distance travelled upward while fading in
    pub y: f64,
    pub duration: Duration,
    pub start: TriggerPosition,
}

impl Default for FadeIn {
    fn default() -> Self {
        Self {
            y: 60.0,
            duration: secs(1.2),
            start: REVEAL_START,
        }
    }
}

/// Rise and fade in once the element scrolls into view
pub fn fade_in(scheduler: &mut Scheduler, element: &ElementHandle) -> TimelineHandle {
    fade_in_with(scheduler, element, FadeIn::default())
}

pub fn fade_in_with(
    scheduler: &mut Scheduler,
    element: &ElementHandle,
    options: FadeIn,
) -> TimelineHandle {
    let step = Step::new(
        element,
        PropertySet::new().opacity(0.0).y(options.y),
        PropertySet::new().opacity(1.0).y(0.0),
        options.duration,
    )
    .easing(EasingType::Power3Out);
    scheduler.register_timeline(
        TimelineBuilder::new().then(step),
        play_once_at(element, options.start),
    )
}

pub fn scale_in(scheduler: &mut Scheduler, element: &ElementHandle) -> TimelineHandle {
    let step = Step::new(
        element,
        PropertySet::new().opacity(0.0).scale(0.9),
        PropertySet::new().opacity(1.0).scale(1.0),
        secs(1.0),
    )
    .easing(EasingType::Power3Out);
    scheduler.register_timeline(
        TimelineBuilder::new().then(step),
        play_once_at(element, REVEAL_START),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Slide in horizontally from `side`
pub fn slide_in(scheduler: &mut Scheduler, element: &ElementHandle, side: Side) -> TimelineHandle {
    let x = match side {
        Side::Left => -80.0,
        Side::Right => 80.0,
    };
    let step = Step::new(
        element,
        PropertySet::new().opacity(0.0).x(x),
        PropertySet::new().opacity(1.0).x(0.0),
        secs(1.2),
    )
    .easing(EasingType::Power3Out);
    scheduler.register_timeline(
        TimelineBuilder::new().then(step),
        play_once_at(element, REVEAL_START),
    )
}

/// Drift the element by `speed * 100`% of its height while it crosses the viewport
pub fn parallax(scheduler: &mut Scheduler, element: &ElementHandle, speed: f64) -> TimelineHandle {
    let step = Step::new(
        element,
        PropertySet::new().y_percent(0.0),
        PropertySet::new().y_percent(speed * 100.0),
        secs(1.0),
    )
    .easing(EasingType::Linear);
    let trigger = TriggerConfig::scrub()
        .start(TriggerPosition::DEFAULT_START)
        .end(TriggerPosition::DEFAULT_END)
        .scrub_lag(secs(1.0));
    scheduler.register_timeline(
        TimelineBuilder::new().then(step),
        TimelineConfig::new().trigger(element, trigger),
    )
}

/// Reveal `words` one after another once `container` scrolls into view
pub fn text_reveal(
    scheduler: &mut Scheduler,
    container: &ElementHandle,
    words: &[ElementHandle],
) -> TimelineHandle {
    let steps = words.iter().map(|word| {
        Step::new(
            word,
            PropertySet::new().opacity(0.0).y_percent(100.0),
            PropertySet::new().opacity(1.0).y_percent(0.0),
            secs(0.8),
        )
        .easing(EasingType::Power2Out)
    });
    scheduler.register_timeline(
        TimelineBuilder::new().stagger(steps, secs(0.05)),
        play_once_at(container, REVEAL_START),
    )
}

/// Wipe a mask away while the image underneath settles from a zoom
pub fn image_reveal(
    scheduler: &mut Scheduler,
    container: &ElementHandle,
    mask: &ElementHandle,
    image: &ElementHandle,
) -> TimelineHandle {
    let builder = TimelineBuilder::new()
        .then(
            Step::new(
                mask,
                PropertySet::new().scale_y(1.0),
                PropertySet::new().scale_y(0.0),
                secs(1.2),
            )
            .easing(EasingType::Power3InOut),
        )
        .with(
            Step::new(
                image,
                PropertySet::new().scale(1.3),
                PropertySet::new().scale(1.0),
                secs(1.2),
            )
            .easing(EasingType::Power3InOut),
        );
    let config = play_once_at(container, TriggerPosition::edges(Edge::Start, Edge::Percent(80.0)));
    scheduler.register_timeline(builder, config)
}

/// Pin `container` and scroll `track` sideways through its overflow
pub fn horizontal_scroll(
    scheduler: &mut Scheduler,
    container: &ElementHandle,
    track: &ElementHandle,
) -> PinHandle {
    let config = PinnedSectionConfig::default()
        .anticipate(true)
        .scrub_lag(secs(1.0));
    scheduler.register_pinned_section(container, track, config)
}

/// Count from 0 to `to` once the element scrolls into view
pub fn counter(scheduler: &mut Scheduler, element: &ElementHandle, to: f64) -> CounterHandle {
    let options = CounterOptions::new()
        .duration(secs(2.0))
        .easing(EasingType::Power1Out)
        .trigger(TriggerConfig::once().start(REVEAL_START));
    scheduler.register_counter(element, to, options)
}

/// Like [`counter`], reading the target from the element's current text
///
/// Returns `None` when the text is not a number (`,` separators allowed).
pub fn counter_from_text(
    scheduler: &mut Scheduler,
    element: &ElementHandle,
) -> Option<CounterHandle> {
    let to: f64 = element.borrow().text.replace(',', "").trim().parse().ok()?;
    Some(counter(scheduler, element, to))
}
