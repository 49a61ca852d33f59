use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use scrollwork_core::{
    listener, presets, Bounds, CounterOptions, Element, ElementHandle, Error, ManualFrameSource,
    PinnedSectionConfig, PropertySet, Region, Scheduler, SchedulerConfig, ScrollToOptions, Step,
    TimelineBuilder, TimelineConfig, TriggerConfig, TriggerEventKind, Viewport,
};

const FRAME_MS: f64 = 1000.0 / 60.0;

struct Harness {
    scheduler: Scheduler,
    source: ManualFrameSource,
    time_ms: f64,
}

impl Harness {
    fn new(content: f64) -> Self {
        Self::with_config(SchedulerConfig::default(), content)
    }

    fn with_config(config: SchedulerConfig, content: f64) -> Self {
        let source = ManualFrameSource::new();
        let mut scheduler = Scheduler::init(
            config,
            Viewport::new(1000.0, 1000.0),
            Box::new(source.clone()),
        );
        scheduler.set_content_extent(content);
        Self {
            scheduler,
            source,
            time_ms: 0.0,
        }
    }

    /// Run frames the way the platform would: only while a request is pending
    fn frames(&mut self, n: usize) -> Vec<TriggerEventKind> {
        let mut kinds = Vec::new();
        for _ in 0..n {
            if !self.source.take_pending() {
                break;
            }
            if let Some(report) = self.scheduler.frame(self.time_ms) {
                kinds.extend(report.events.into_iter().map(|e| e.kind));
            }
            self.time_ms += FRAME_MS;
        }
        kinds
    }

    fn jump(&mut self, position: f64) -> Vec<TriggerEventKind> {
        self.scheduler.scroll_to(
            position,
            ScrollToOptions {
                immediate: true,
                ..Default::default()
            },
        );
        self.frames(1)
    }
}

fn block(label: &str, y: f64, height: f64) -> ElementHandle {
    Element::new(label, Bounds::new(0.0, y, 1000.0, height)).into_handle()
}

#[test]
fn test_virtual_position_converges_without_overshoot() {
    let mut h = Harness::new(50_000.0);
    let mut previous_gap = f64::MAX;

    h.scheduler.wheel(0.0, 400.0);
    h.scheduler.wheel(0.0, 350.0);
    for _ in 0..200 {
        h.frames(1);
        let state = *h.scheduler.scroll_state();
        assert_eq!(state.raw_position, 750.0);
        assert!(state.virtual_position <= state.raw_position);
        let gap = state.raw_position - state.virtual_position;
        assert!(gap <= previous_gap);
        previous_gap = gap;
    }
    assert_eq!(h.scheduler.scroll_state().virtual_position, 750.0);
}

#[test]
fn test_raw_position_clamped_to_content() {
    let mut h = Harness::new(3000.0);
    h.scheduler.wheel(0.0, 10_000.0);
    h.frames(1);
    assert_eq!(h.scheduler.scroll_state().raw_position, 2000.0);
    h.scheduler.touch(0.0, -10_000.0);
    h.frames(1);
    assert_eq!(h.scheduler.scroll_state().raw_position, 0.0);
}

#[test]
fn test_once_trigger_fires_enter_once() {
    let mut h = Harness::new(10_000.0);
    let el = block("card", 3000.0, 500.0);
    let fired = Rc::new(RefCell::new(0));
    let f = fired.clone();
    h.scheduler
        .register_trigger(&el, TriggerConfig::once().on_enter(move |_| *f.borrow_mut() += 1));

    for _ in 0..3 {
        h.jump(2500.0);
        h.jump(5000.0);
        h.jump(0.0);
    }
    assert_eq!(*fired.borrow(), 1);
}

#[test]
fn test_toggle_trigger_fires_per_crossing() {
    use TriggerEventKind::*;
    let mut h = Harness::new(10_000.0);
    let el = block("card", 3000.0, 500.0);
    let log = Rc::new(RefCell::new(Vec::new()));
    let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
    h.scheduler.register_trigger(
        &el,
        TriggerConfig::toggle()
            .on_enter(move |e| a.borrow_mut().push((e.kind, e.direction)))
            .on_leave(move |e| b.borrow_mut().push((e.kind, e.direction)))
            .on_enter_back(move |e| c.borrow_mut().push((e.kind, e.direction)))
            .on_leave_back(move |e| d.borrow_mut().push((e.kind, e.direction))),
    );

    // range is [2000, 3500]; scroll through it smoothly and back
    h.frames(1);
    h.scheduler.wheel(0.0, 4000.0);
    h.frames(200);
    h.scheduler.wheel(0.0, -4000.0);
    h.frames(200);

    let kinds: Vec<_> = log.borrow().iter().map(|(k, _)| *k).collect();
    assert_eq!(kinds, vec![Enter, Leave, EnterBack, LeaveBack]);
    use scrollwork_core::Direction;
    let directions: Vec<_> = log.borrow().iter().map(|(_, d)| *d).collect();
    assert_eq!(
        directions,
        vec![Direction::Down, Direction::Down, Direction::Up, Direction::Up]
    );
}

#[test]
fn test_scrub_progress_endpoints_and_monotonic() {
    let mut h = Harness::new(10_000.0);
    let el = block("band", 3000.0, 500.0);
    let handle = h.scheduler.register_trigger(&el, TriggerConfig::scrub());

    h.jump(2000.0);
    assert_eq!(h.scheduler.trigger_progress(&handle), Some(0.0));
    h.jump(3500.0);
    assert_eq!(h.scheduler.trigger_progress(&handle), Some(1.0));

    let mut previous = -1.0;
    let mut position = 1800.0;
    while position <= 3700.0 {
        h.jump(position);
        let progress = h.scheduler.trigger_progress(&handle).unwrap();
        assert!((0.0..=1.0).contains(&progress));
        assert!(progress >= previous);
        previous = progress;
        position += 37.0;
    }
}

#[test]
fn test_scrub_timeline_follows_position() {
    let mut h = Harness::new(10_000.0);
    let el = block("band", 3000.0, 500.0);
    let timeline = h.scheduler.register_timeline(
        TimelineBuilder::new().then(Step::new(
            &el,
            PropertySet::new().x(0.0),
            PropertySet::new().x(-500.0),
            Duration::from_secs(1),
        )),
        TimelineConfig::new().trigger(&el, TriggerConfig::scrub()),
    );
    h.jump(2750.0);
    assert_eq!(h.scheduler.timeline_progress(&timeline), Some(0.5));
    assert_eq!(el.borrow().style.translate_x, -250.0);
}

#[test]
fn test_counter_lands_exactly_on_target() {
    let mut h = Harness::new(10_000.0);
    let el = block("stat", 100.0, 50.0);
    let handle = h.scheduler.register_counter(
        &el,
        12543.0,
        CounterOptions::new().duration(Duration::from_millis(2000)),
    );

    let mut elapsed = 0.0;
    while elapsed < 2000.0 - FRAME_MS {
        h.frames(1);
        let text = h.scheduler.counter_text(&handle).unwrap().to_string();
        let shown: f64 = text.replace(',', "").parse().unwrap();
        assert!(shown <= 12543.0);
        elapsed = h.time_ms - FRAME_MS;
    }
    h.frames(3);
    assert_eq!(h.scheduler.counter_text(&handle), Some("12,543"));
    assert_eq!(el.borrow().text, "12,543");
}

#[test]
fn test_counter_preset_waits_for_reveal() {
    let mut h = Harness::new(10_000.0);
    let el = block("stat", 4000.0, 50.0);
    let handle = presets::counter(&mut h.scheduler, &el, 500.0);
    h.frames(200);
    assert_eq!(h.scheduler.counter_text(&handle), Some("0"));

    h.jump(3500.0);
    h.frames(200);
    assert_eq!(h.scheduler.counter_text(&handle), Some("500"));
}

#[test]
fn test_pinned_section_range_and_translate() {
    let mut h = Harness::new(20_000.0);
    let section = block("gallery", 2000.0, 1000.0);
    let track = Element::new("track", Bounds::new(0.0, 2000.0, 1000.0, 1000.0))
        .with_scroll_extent(3000.0, 1000.0)
        .into_handle();
    let pin = h
        .scheduler
        .register_pinned_section(&section, &track, PinnedSectionConfig::default());
    assert_eq!(h.scheduler.pinned_section(&pin).unwrap().range_length(), 2000.0);

    // pinned over [2000, 4000]
    h.jump(3000.0);
    let state = h.scheduler.pinned_section(&pin).unwrap();
    assert!(state.is_pinned());
    assert_eq!(state.progress(), 0.5);
    assert_eq!(track.borrow().style.translate_x, -1000.0);
    assert!(section.borrow().style.pinned.is_some());

    h.jump(4500.0);
    assert!(!h.scheduler.pinned_section(&pin).unwrap().is_pinned());
    assert_eq!(track.borrow().style.translate_x, -2000.0);
}

fn gallery() -> (ElementHandle, ElementHandle) {
    let section = block("gallery", 2000.0, 1000.0);
    let track = Element::new("track", Bounds::new(0.0, 2000.0, 1000.0, 1000.0))
        .with_scroll_extent(3000.0, 1000.0)
        .into_handle();
    (section, track)
}

#[test]
fn test_destroying_pin_mid_range_releases_section() {
    let mut h = Harness::new(20_000.0);
    let (section, track) = gallery();
    let pin = h
        .scheduler
        .register_pinned_section(&section, &track, PinnedSectionConfig::default());
    h.jump(3000.0);
    assert!(section.borrow().style.pinned.is_some());
    assert_eq!(track.borrow().style.translate_x, -1000.0);

    pin.destroy();
    h.scheduler.frame(h.time_ms);
    h.time_ms += FRAME_MS;
    assert!(h.scheduler.pinned_section(&pin).is_none());
    assert!(section.borrow().style.pinned.is_none());
    assert_eq!(track.borrow().style.translate_x, 0.0);

    // nothing re-applies the pin afterwards
    h.jump(3500.0);
    assert!(section.borrow().style.pinned.is_none());
    assert_eq!(track.borrow().style.translate_x, 0.0);
}

#[test]
fn test_teardown_releases_pinned_sections() {
    let mut h = Harness::new(20_000.0);
    let (section, track) = gallery();
    h.scheduler
        .register_pinned_section(&section, &track, PinnedSectionConfig::default());
    h.jump(3000.0);
    assert!(section.borrow().style.pinned.is_some());

    h.scheduler.teardown();
    assert!(section.borrow().style.pinned.is_none());
    assert_eq!(track.borrow().style.translate_x, 0.0);
}

#[test]
fn test_pin_range_recomputed_on_resize() {
    let mut h = Harness::new(20_000.0);
    let section = block("gallery", 2000.0, 1000.0);
    let track = Element::new("track", Bounds::default())
        .with_scroll_extent(3000.0, 1000.0)
        .into_handle();
    let pin = presets::horizontal_scroll(&mut h.scheduler, &section, &track);

    h.scheduler.resize(Viewport::new(1500.0, 1000.0));
    assert_eq!(h.scheduler.pinned_section(&pin).unwrap().range_length(), 1500.0);
}

#[test]
fn test_destroy_stops_mutation_and_is_idempotent() {
    let mut h = Harness::new(10_000.0);
    let el = block("card", 3000.0, 500.0);
    let fired = Rc::new(RefCell::new(0));
    let f = fired.clone();
    let trigger = h
        .scheduler
        .register_trigger(&el, TriggerConfig::toggle().on_enter(move |_| *f.borrow_mut() += 1));
    let timeline = presets::fade_in(&mut h.scheduler, &el);
    let counter = h.scheduler.register_counter(&el, 100.0, CounterOptions::new());

    trigger.destroy();
    trigger.destroy();
    timeline.destroy();
    timeline.destroy();
    counter.destroy();

    h.jump(2800.0);
    h.frames(200);
    assert_eq!(*fired.borrow(), 0);
    assert_eq!(el.borrow().style.opacity, 0.0);
    assert_eq!(el.borrow().text, "0");
    assert_eq!(h.scheduler.counts(), (0, 0, 0, 0));
    assert!(h.scheduler.trigger_progress(&trigger).is_none());
}

#[test]
fn test_region_unmount_destroys_everything() {
    let mut h = Harness::new(10_000.0);
    let el = block("card", 3000.0, 500.0);
    let timeline;
    {
        let mut region = Region::new();
        timeline = region.track(presets::scale_in(&mut h.scheduler, &el));
        region.track(h.scheduler.register_trigger(&el, TriggerConfig::toggle()));
    }
    assert!(timeline.is_destroyed());
    h.frames(1);
    assert_eq!(h.scheduler.counts(), (0, 0, 0, 0));
}

#[test]
fn test_cancel_scroll_to_keeps_position_and_accepts_input() {
    let mut h = Harness::new(10_000.0);
    h.frames(1);
    h.scheduler.scroll_to(
        5000.0,
        ScrollToOptions {
            duration: Some(Duration::from_millis(1000)),
            ..Default::default()
        },
    );
    h.scheduler.wheel(0.0, 900.0);
    h.frames(20);
    let mid = h.scheduler.scroll_state().raw_position;
    assert!(mid > 0.0 && mid < 5000.0);

    h.scheduler.cancel_scroll_to();
    h.scheduler.cancel_scroll_to();
    assert_eq!(h.scheduler.scroll_state().raw_position, mid);

    h.scheduler.wheel(0.0, 100.0);
    h.frames(1);
    assert_eq!(h.scheduler.scroll_state().raw_position, mid + 100.0);
}

#[test]
fn test_faulting_listener_disabled_others_continue() {
    let mut h = Harness::new(10_000.0);
    let calls = Rc::new(RefCell::new(0));
    let c = calls.clone();
    let failing = listener(|_| Err(Error::Listener("boom".into())));
    let healthy = listener(move |_| {
        *c.borrow_mut() += 1;
        Ok(())
    });
    h.scheduler.add_listener(&failing);
    h.scheduler.add_listener(&healthy);

    h.frames(5);
    assert!(h.scheduler.ticker().is_disabled(&failing));
    assert_eq!(*calls.borrow(), 5);
}

#[test]
fn test_teardown_releases_frame_subscription() {
    let h = Harness::new(10_000.0);
    let source = h.source.clone();
    assert!(source.is_pending());
    h.scheduler.teardown();
    assert!(!source.is_pending());
}

#[test]
fn test_invalid_config_is_clamped() {
    let mut config = SchedulerConfig::default();
    config.scroll.smoothing_factor = 7.0;
    config.scroll.wheel_multiplier = -3.0;
    let h = Harness::with_config(config, 1000.0);
    assert_eq!(h.scheduler.config().scroll.smoothing_factor, 1.0);
    assert_eq!(h.scheduler.config().scroll.wheel_multiplier, 0.0);
}
