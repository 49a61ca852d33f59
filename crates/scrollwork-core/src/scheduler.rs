//! L2 Organism Layer: Scheduler
//!
//! The one explicit scheduler instance a host creates with [`Scheduler::init`]
//! and destroys with [`Scheduler::teardown`]. It owns the ticker, the scroll
//! engine and every registry, and runs the whole frame pipeline
//! synchronously inside [`Scheduler::frame`]:
//!
//! 1. reclaim destroyed entities
//! 2. integrate scroll input
//! 3. evaluate every trigger against that one scroll state
//! 4. apply trigger directives, advance timelines
//! 5. apply pinned section transforms
//! 6. advance counters
//! 7. notify frame listeners and re-arm the frame request

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::arena::{Arena, Key};
use crate::config::{sanitize_f64, SchedulerConfig};
use crate::counter::{format_thousands, Counter, CounterOptions, Formatter};
use crate::dom::{ElementHandle, Viewport, WeakElement};
use crate::handle::{CounterHandle, Lifeline, PinHandle, TimelineHandle, TriggerHandle};
use crate::pin::{PinnedSection, PinnedSectionConfig};
use crate::scroll::{Easing, ScrollConfigExt, ScrollState, VirtualScrollEngine};
use crate::ticker::{FrameSource, Listener, Ticker};
use crate::timeline::{Timeline, TimelineBuilder, TimelineConfig};
use crate::trigger::{
    Binding, Directive, TriggerConfig, TriggerEvent, TriggerPosition, TriggerRegistry, TriggerView,
};

/// Where a programmatic scroll should land
#[derive(Debug, Clone)]
pub enum ScrollTarget {
    Position(f64),
    /// The element's leading edge on the scroll axis
    Element(WeakElement),
}

impl From<f64> for ScrollTarget {
    fn from(position: f64) -> Self {
        ScrollTarget::Position(position)
    }
}

impl From<&ElementHandle> for ScrollTarget {
    fn from(element: &ElementHandle) -> Self {
        ScrollTarget::Element(WeakElement::new(element))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrollToOptions {
    /// Falls back to `scroll.duration_ms`
    pub duration: Option<Duration>,
    /// Falls back to `scroll.easing`
    pub easing: Option<Easing>,
    /// Added to the resolved target
    pub offset: f64,
    /// Jump without animating
    pub immediate: bool,
}

/// Everything observable about one processed frame
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub time_ms: f64,
    pub delta_ms: f64,
    pub scroll: ScrollState,
    /// Trigger crossings, in registration order
    pub events: Vec<TriggerEvent>,
}

/// A registered entity plus the trigger driving it, if any
struct Entry<T> {
    inner: T,
    life: Lifeline,
    trigger: Option<(Key, Lifeline)>,
}

impl<T> Entry<T> {
    fn new(inner: T, life: Lifeline) -> Self {
        Self {
            inner,
            life,
            trigger: None,
        }
    }

    fn is_alive(&self) -> bool {
        self.life.is_alive()
    }

    fn trigger_key(&self) -> Option<Key> {
        self.trigger.as_ref().map(|(key, _)| *key)
    }

    /// Destroy the entity together with its trigger
    fn kill(&self) {
        self.life.kill();
        if let Some((_, trigger)) = &self.trigger {
            trigger.kill();
        }
    }
}

/// Drop dead entries, taking their triggers down with them
///
/// `release` undoes whatever the entity left applied to the document.
fn sweep_entries<T>(arena: &mut Arena<Entry<T>>, mut release: impl FnMut(&mut T)) {
    arena.retain(|_, entry| {
        if entry.is_alive() {
            return true;
        }
        entry.kill();
        release(&mut entry.inner);
        false
    });
}

fn live<'a, T>(arena: &'a Arena<Entry<T>>, key: Key) -> Option<&'a T> {
    arena
        .get(key)
        .filter(|entry| entry.is_alive())
        .map(|entry| &entry.inner)
}

fn live_mut<T>(arena: &mut Arena<Entry<T>>, key: Key) -> Option<&mut T> {
    arena
        .get_mut(key)
        .filter(|entry| entry.is_alive())
        .map(|entry| &mut entry.inner)
}

pub struct Scheduler {
    config: SchedulerConfig,
    viewport: Viewport,
    content_extent: f64,
    engine: VirtualScrollEngine,
    ticker: Ticker,
    triggers: TriggerRegistry,
    timelines: Arena<Entry<Timeline>>,
    pins: Arena<Entry<PinnedSection>>,
    counters: Arena<Entry<Counter>>,
    directives: Vec<Directive>,
    shut_down: bool,
}

impl Scheduler {
    /// Create the scheduler and start the frame loop
    pub fn init(config: SchedulerConfig, viewport: Viewport, source: Box<dyn FrameSource>) -> Self {
        let config = config.sanitized();
        let mut ticker = Ticker::new(source, config.ticker.clone());
        ticker.attach_core();

        let mut scheduler = Self {
            engine: VirtualScrollEngine::new(config.scroll.clone()),
            ticker,
            triggers: TriggerRegistry::new(),
            timelines: Arena::new(),
            pins: Arena::new(),
            counters: Arena::new(),
            directives: Vec::new(),
            viewport,
            content_extent: 0.0,
            config,
            shut_down: false,
        };
        scheduler.refresh();
        info!(
            orientation = ?scheduler.config.scroll.orientation,
            infinite = scheduler.config.scroll.infinite,
            "Scheduler initialized"
        );
        scheduler
    }

    /// Destroy every registered entity and release the frame subscription
    pub fn teardown(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        for key in self.timelines.keys() {
            if let Some(entry) = self.timelines.get(key) {
                entry.kill();
            }
        }
        for key in self.pins.keys() {
            if let Some(entry) = self.pins.get_mut(key) {
                entry.kill();
                entry.inner.release();
            }
        }
        for key in self.counters.keys() {
            if let Some(entry) = self.counters.get(key) {
                entry.kill();
            }
        }
        self.timelines.clear();
        self.pins.clear();
        self.counters.clear();
        self.triggers.clear();
        self.engine.reset();
        self.ticker.shutdown();
        info!("Scheduler torn down");
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn viewport_extent(&self) -> f64 {
        self.viewport.extent(self.config.scroll.orientation)
    }

    /// Process one platform frame
    ///
    /// Returns `None` when no frame subscription is held, e.g. a late
    /// callback after teardown.
    pub fn frame(&mut self, time_ms: f64) -> Option<FrameReport> {
        let info = self.ticker.begin_frame(time_ms)?;
        let dt = info.delta;

        self.sweep();

        let state = *self.engine.update(dt);

        let mut events = Vec::new();
        let mut directives = std::mem::take(&mut self.directives);
        self.triggers.evaluate(&state, dt, &mut events, &mut directives);

        for directive in directives.drain(..) {
            self.apply_directive(directive);
        }
        self.directives = directives;

        for key in self.timelines.keys() {
            if let Some(timeline) = live_mut(&mut self.timelines, key) {
                timeline.advance(dt);
            }
        }

        let position = state.virtual_position;
        for key in self.pins.keys() {
            let Some(entry) = self.pins.get_mut(key) else {
                continue;
            };
            if !entry.is_alive() {
                continue;
            }
            let view = entry.trigger_key().and_then(|k| self.triggers.view(k));
            if let Some(view) = view {
                entry.inner.update_pin(position, view.start, view.end);
            }
        }

        for key in self.counters.keys() {
            if let Some(counter) = live_mut(&mut self.counters, key) {
                counter.advance(dt);
            }
        }

        self.ticker.dispatch(&info);
        self.ticker.end_frame();

        Some(FrameReport {
            frame: info.frame,
            time_ms: info.time_ms,
            delta_ms: dt.as_secs_f64() * 1000.0,
            scroll: state,
            events,
        })
    }

    fn apply_directive(&mut self, directive: Directive) {
        match directive {
            Directive::Toggle { binding, action } => match binding {
                Binding::Timeline(key) => {
                    if let Some(timeline) = live_mut(&mut self.timelines, key) {
                        timeline.apply(action);
                    }
                }
                Binding::Counter(key) => {
                    if let Some(counter) = live_mut(&mut self.counters, key) {
                        counter.apply(action);
                    }
                }
                Binding::Pin(_) | Binding::None => {}
            },
            Directive::Scrub { binding, progress } => match binding {
                Binding::Timeline(key) => {
                    if let Some(timeline) = live_mut(&mut self.timelines, key) {
                        timeline.seek_progress(progress);
                    }
                }
                Binding::Pin(key) => {
                    if let Some(pin) = live_mut(&mut self.pins, key) {
                        pin.scrub(progress);
                    }
                }
                Binding::Counter(key) => {
                    if let Some(counter) = live_mut(&mut self.counters, key) {
                        counter.seek_progress(progress);
                    }
                }
                Binding::None => {}
            },
        }
    }

    fn sweep(&mut self) {
        sweep_entries(&mut self.timelines, |_| {});
        sweep_entries(&mut self.pins, PinnedSection::release);
        sweep_entries(&mut self.counters, |_| {});
        let removed = self.triggers.sweep();
        if !removed.is_empty() {
            debug!(count = removed.len(), "Reclaimed destroyed triggers");
        }
    }

    /// Recompute all cached geometry
    ///
    /// Call after any layout-affecting change; cached trigger ranges and
    /// pin lengths are otherwise stale. Entities whose elements left the
    /// document are pruned here.
    pub fn refresh(&mut self) {
        let viewport_extent = self.viewport_extent();
        self.engine.set_extents(self.content_extent, viewport_extent);

        for key in self.pins.keys() {
            let Some(entry) = self.pins.get_mut(key) else {
                continue;
            };
            if !entry.is_alive() {
                continue;
            }
            if !entry.inner.measure(&self.viewport) {
                debug!(pin = %key, "Pruning pinned section with missing element");
                entry.kill();
                continue;
            }
            if let Some(trigger) = entry.trigger_key() {
                self.triggers
                    .set_end(trigger, TriggerPosition::Relative(entry.inner.range_length()));
            }
        }

        let pruned = self
            .triggers
            .refresh(viewport_extent, self.config.scroll.orientation);
        self.sweep();
        debug!(
            triggers = self.triggers.len(),
            pruned = pruned.len(),
            content = self.content_extent,
            viewport = viewport_extent,
            "Refreshed geometry"
        );
    }

    /// New viewport size; refreshes all geometry
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.refresh();
    }

    /// Scrollable content extent on the scroll axis; refreshes all geometry
    pub fn set_content_extent(&mut self, extent: f64) {
        self.content_extent = sanitize_f64("content_extent", extent, 0.0, f64::MAX);
        self.refresh();
    }

    pub fn wheel(&mut self, dx: f64, dy: f64) {
        self.engine.wheel(dx, dy);
    }

    pub fn touch(&mut self, dx: f64, dy: f64) {
        self.engine.touch(dx, dy);
    }

    /// Start a programmatic scroll; input is ignored until it lands or is cancelled
    pub fn scroll_to(&mut self, target: impl Into<ScrollTarget>, options: ScrollToOptions) {
        let position = match target.into() {
            ScrollTarget::Position(position) => position,
            ScrollTarget::Element(element) => match element.resolve() {
                Some(el) => el.borrow().bounds.start(self.config.scroll.orientation),
                None => {
                    debug!(element = %element.label(), "Scroll target missing, ignoring");
                    return;
                }
            },
        };
        let target = position + options.offset;
        if !target.is_finite() {
            warn!(target, "Ignoring non-finite scroll target");
            return;
        }
        let duration = options
            .duration
            .unwrap_or_else(|| self.config.scroll.scroll_duration());
        let easing = options
            .easing
            .unwrap_or_else(|| self.config.scroll.scroll_easing());
        self.engine
            .scroll_to(target, duration, easing, options.immediate);
    }

    pub fn cancel_scroll_to(&mut self) {
        self.engine.cancel_scroll_to();
    }

    pub fn scroll_state(&self) -> &ScrollState {
        self.engine.state()
    }

    pub fn engine(&self) -> &VirtualScrollEngine {
        &self.engine
    }

    /// Page-level scroll progress in [0, 1]
    pub fn page_progress(&self) -> f64 {
        self.engine.progress()
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn add_listener(&mut self, listener: &Listener) -> bool {
        self.ticker.add(listener)
    }

    pub fn remove_listener(&mut self, listener: &Listener) -> bool {
        self.ticker.remove(listener)
    }

    fn add_trigger(
        &mut self,
        element: WeakElement,
        config: TriggerConfig,
        binding: Binding,
    ) -> (Key, Lifeline) {
        let viewport_extent = self.viewport_extent();
        self.triggers.register(
            element,
            config,
            binding,
            viewport_extent,
            self.config.scroll.orientation,
        )
    }

    pub fn register_trigger(
        &mut self,
        element: impl Into<WeakElement>,
        config: TriggerConfig,
    ) -> TriggerHandle {
        let (key, life) = self.add_trigger(element.into(), config, Binding::None);
        TriggerHandle::new(key, life)
    }

    /// Register a timeline; without a trigger it plays right away unless paused
    pub fn register_timeline(
        &mut self,
        builder: TimelineBuilder,
        config: TimelineConfig,
    ) -> TimelineHandle {
        let life = Lifeline::new();
        let mut timeline = Timeline::new(builder);
        if config.trigger.is_none() && !config.paused {
            timeline.play();
        }
        let key = self.timelines.insert(Entry::new(timeline, life.clone()));

        if let Some((element, trigger)) = config.trigger {
            let trigger = self.add_trigger(element, trigger, Binding::Timeline(key));
            if let Some(entry) = self.timelines.get_mut(key) {
                entry.trigger = Some(trigger);
            }
        }
        debug!(timeline = %key, "Timeline registered");
        TimelineHandle::new(key, life)
    }

    /// Register a pinned section holding `section` while translating `track`
    pub fn register_pinned_section(
        &mut self,
        section: impl Into<WeakElement>,
        track: impl Into<WeakElement>,
        config: PinnedSectionConfig,
    ) -> PinHandle {
        let section = section.into();
        let mut pin = PinnedSection::new(
            section.clone(),
            track.into(),
            &config,
            self.config.pin.anticipate_px,
        );
        if !pin.measure(&self.viewport) {
            debug!(section = %section.label(), "Registered pinned section on a missing element");
        }
        let range = pin.range_length();
        let life = Lifeline::new();
        let key = self.pins.insert(Entry::new(pin, life.clone()));

        let mut trigger = TriggerConfig::scrub()
            .start(config.start)
            .end(TriggerPosition::Relative(range));
        trigger.scrub_lag = config.scrub_lag;
        let trigger = self.add_trigger(section, trigger, Binding::Pin(key));
        if let Some(entry) = self.pins.get_mut(key) {
            entry.trigger = Some(trigger);
        }
        debug!(pin = %key, range, "Pinned section registered");
        PinHandle::new(key, life)
    }

    /// Register a counter counting up (or down) to `to`
    ///
    /// Without a trigger it starts right away; a scrub trigger maps its
    /// progress onto the value instead of playing over time.
    pub fn register_counter(
        &mut self,
        element: impl Into<WeakElement>,
        to: f64,
        options: CounterOptions,
    ) -> CounterHandle {
        let element = element.into();
        let from = if options.from.is_finite() {
            options.from
        } else {
            warn!(from = options.from, "Non-finite counter start, using 0");
            0.0
        };
        let to = if to.is_finite() {
            to
        } else {
            warn!(to, "Non-finite counter target, using start value");
            from
        };
        let duration = options
            .duration
            .unwrap_or_else(|| Duration::from_millis(self.config.counter.duration_ms));
        let easing = options
            .easing
            .unwrap_or_else(|| self.config.counter.easing.into());
        let format = options
            .format
            .unwrap_or_else(|| Box::new(format_thousands) as Formatter);

        let mut counter = Counter::new(element.clone(), from, to, duration, easing, format);
        if options.trigger.is_none() {
            counter.start();
        }
        let life = Lifeline::new();
        let key = self.counters.insert(Entry::new(counter, life.clone()));

        if let Some(trigger) = options.trigger {
            let trigger = self.add_trigger(element, trigger, Binding::Counter(key));
            if let Some(entry) = self.counters.get_mut(key) {
                entry.trigger = Some(trigger);
            }
        }
        debug!(counter = %key, from, to, "Counter registered");
        CounterHandle::new(key, life)
    }

    pub fn trigger_view(&self, handle: &TriggerHandle) -> Option<TriggerView> {
        self.triggers.view(handle.key())
    }

    /// Un-lagged progress of a trigger in [0, 1]
    pub fn trigger_progress(&self, handle: &TriggerHandle) -> Option<f64> {
        self.trigger_view(handle).map(|view| view.progress)
    }

    pub fn timeline(&self, handle: &TimelineHandle) -> Option<&Timeline> {
        live(&self.timelines, handle.key())
    }

    /// Direct playback control
    pub fn timeline_mut(&mut self, handle: &TimelineHandle) -> Option<&mut Timeline> {
        live_mut(&mut self.timelines, handle.key())
    }

    pub fn timeline_progress(&self, handle: &TimelineHandle) -> Option<f64> {
        self.timeline(handle).map(Timeline::progress)
    }

    pub fn pinned_section(&self, handle: &PinHandle) -> Option<&PinnedSection> {
        live(&self.pins, handle.key())
    }

    pub fn counter(&self, handle: &CounterHandle) -> Option<&Counter> {
        live(&self.counters, handle.key())
    }

    pub fn counter_text(&self, handle: &CounterHandle) -> Option<&str> {
        self.counter(handle).map(Counter::text)
    }

    /// Live registrations as (triggers, timelines, pins, counters)
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.triggers.len(),
            self.timelines.len(),
            self.pins.len(),
            self.counters.len(),
        )
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Bounds, Element, ElementHandle};
    use crate::ticker::{listener, ManualFrameSource};
    use crate::timeline::{PropertySet, Step};
    use std::cell::Cell;
    use std::rc::Rc;

    fn scheduler() -> (Scheduler, ManualFrameSource) {
        let source = ManualFrameSource::new();
        let mut scheduler = Scheduler::init(
            SchedulerConfig::default(),
            Viewport::new(1200.0, 1000.0),
            Box::new(source.clone()),
        );
        scheduler.set_content_extent(10_000.0);
        (scheduler, source)
    }

    fn section(y: f64) -> ElementHandle {
        Element::new("section", Bounds::new(0.0, y, 1200.0, 500.0)).into_handle()
    }

    #[test]
    fn test_init_subscribes_and_teardown_releases() {
        let (scheduler, source) = scheduler();
        assert!(source.is_pending());
        scheduler.teardown();
        assert!(!source.is_pending());
        assert_eq!(source.cancels(), 1);
    }

    #[test]
    fn test_frame_rearms_request() {
        let (mut scheduler, source) = scheduler();
        assert!(source.take_pending());
        let report = scheduler.frame(0.0).unwrap();
        assert_eq!(report.frame, 1);
        assert!(source.is_pending());
    }

    #[test]
    fn test_toggle_binding_plays_timeline() {
        let (mut scheduler, _source) = scheduler();
        let el = section(2000.0);
        let handle = scheduler.register_timeline(
            TimelineBuilder::new().then(Step::new(
                &el,
                PropertySet::new().opacity(0.0),
                PropertySet::new().opacity(1.0),
                Duration::from_millis(100),
            )),
            TimelineConfig::new().trigger(&el, TriggerConfig::once()),
        );
        scheduler.frame(0.0);
        assert_eq!(scheduler.timeline_progress(&handle), Some(0.0));

        scheduler.scroll_to(
            1500.0,
            ScrollToOptions {
                immediate: true,
                ..Default::default()
            },
        );
        let report = scheduler.frame(16.0).unwrap();
        assert_eq!(report.events.len(), 1);
        assert!(scheduler.timeline(&handle).unwrap().is_playing());

        for i in 2..20 {
            scheduler.frame(i as f64 * 16.0);
        }
        assert_eq!(el.borrow().style.opacity, 1.0);
    }

    #[test]
    fn test_destroy_inside_callback_stops_same_frame() {
        let (mut scheduler, _source) = scheduler();
        let el = section(2000.0);
        let timeline = scheduler.register_timeline(
            TimelineBuilder::new().then(Step::new(
                &el,
                PropertySet::new().opacity(0.0),
                PropertySet::new().opacity(1.0),
                Duration::from_millis(100),
            )),
            TimelineConfig::new().trigger(&el, TriggerConfig::toggle()),
        );
        let victim = timeline.clone();
        scheduler.register_trigger(
            &el,
            TriggerConfig::toggle().on_enter(move |_| victim.destroy()),
        );

        scheduler.scroll_to(
            1500.0,
            ScrollToOptions {
                immediate: true,
                ..Default::default()
            },
        );
        scheduler.frame(0.0);
        scheduler.frame(200.0);
        assert!(timeline.is_destroyed());
        assert!(scheduler.timeline(&timeline).is_none());
        assert_eq!(scheduler.counts(), (1, 0, 0, 0));
    }

    #[test]
    fn test_listeners_run_after_pipeline() {
        let (mut scheduler, _source) = scheduler();
        let seen = Rc::new(Cell::new(0u64));
        let s = seen.clone();
        let l = listener(move |info| {
            s.set(info.frame);
            Ok(())
        });
        assert!(scheduler.add_listener(&l));
        assert!(!scheduler.add_listener(&l));
        scheduler.frame(0.0);
        scheduler.frame(16.0);
        assert_eq!(seen.get(), 2);
        assert!(scheduler.remove_listener(&l));
        assert!(!scheduler.remove_listener(&l));
    }

    #[test]
    fn test_scroll_to_element_with_offset() {
        let (mut scheduler, _source) = scheduler();
        let el = section(3000.0);
        scheduler.scroll_to(
            ScrollTarget::Element(WeakElement::new(&el)),
            ScrollToOptions {
                offset: -100.0,
                immediate: true,
                ..Default::default()
            },
        );
        assert_eq!(scheduler.scroll_state().raw_position, 2900.0);
    }

    #[test]
    fn test_scroll_to_tweens_with_default_duration() {
        let (mut scheduler, _source) = scheduler();
        scheduler.frame(0.0);
        scheduler.scroll_to(2000.0, ScrollToOptions::default());
        assert!(scheduler.engine().is_scrolling_to());

        for i in 1..=47 {
            scheduler.frame(i as f64 * 16.0);
        }
        let mid = scheduler.scroll_state().raw_position;
        assert!(mid > 0.0 && mid < 2000.0);
        assert_eq!(scheduler.scroll_state().virtual_position, mid);
        assert!(scheduler.engine().is_scrolling_to());

        for i in 48..=100 {
            scheduler.frame(i as f64 * 16.0);
        }
        assert_eq!(scheduler.scroll_state().raw_position, 2000.0);
        assert!(!scheduler.engine().is_scrolling_to());
    }

    #[test]
    fn test_missing_scroll_target_is_ignored() {
        let (mut scheduler, _source) = scheduler();
        let el = section(3000.0);
        let target = ScrollTarget::Element(WeakElement::new(&el));
        drop(el);
        scheduler.scroll_to(target, ScrollToOptions::default());
        assert!(!scheduler.engine().is_scrolling_to());
    }

    #[test]
    fn test_refresh_prunes_missing_elements() {
        let (mut scheduler, _source) = scheduler();
        let el = section(2000.0);
        let handle = scheduler.register_trigger(&el, TriggerConfig::toggle());
        drop(el);
        assert_eq!(scheduler.counts().0, 1);
        scheduler.refresh();
        assert_eq!(scheduler.counts().0, 0);
        assert!(handle.is_destroyed());
    }
}
