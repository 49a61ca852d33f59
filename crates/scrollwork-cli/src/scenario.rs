//! Scenario files: a scripted page for the headless driver
//!
//! A scenario lays out elements, registers triggers, timelines, pinned
//! sections, counters and presets against them, and scripts scroll input
//! by frame index.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scrollwork_core::presets::{self, Side};
use scrollwork_core::{
    Bounds, CounterHandle, CounterOptions, EasingType, Element, ElementHandle, Error, FrameReport,
    ManualFrameSource, Orientation, PinHandle, PinnedSectionConfig, PlayState, PropertySet,
    Region, Result, SchedulerConfig, Scheduler, ScrollState, ScrollToOptions, Step,
    TimelineBuilder, TimelineConfig, TimelineHandle, ToggleActions, TriggerConfig, TriggerHandle,
    TriggerMode, TriggerPosition, Viewport,
};

fn default_frames() -> u64 {
    600
}

fn default_fps() -> f64 {
    60.0
}

fn default_speed() -> f64 {
    0.3
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub viewport: Viewport,
    /// Total scrollable content length along the scroll axis
    pub content_extent: f64,
    #[serde(default = "default_frames")]
    pub frames: u64,
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Replaces the loaded scheduler configuration for this run
    #[serde(default)]
    pub config: Option<SchedulerConfig>,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
    #[serde(default)]
    pub timelines: Vec<TimelineSpec>,
    #[serde(default)]
    pub pins: Vec<PinSpec>,
    #[serde(default)]
    pub counters: Vec<CounterSpec>,
    #[serde(default)]
    pub presets: Vec<PresetSpec>,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementSpec {
    pub id: String,
    pub bounds: Bounds,
    #[serde(default)]
    pub scroll_width: Option<f64>,
    #[serde(default)]
    pub scroll_height: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerSpec {
    /// Required for standalone triggers and timelines; counters use their own element
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub mode: TriggerMode,
    #[serde(default)]
    pub start: Option<TriggerPosition>,
    #[serde(default)]
    pub end: Option<TriggerPosition>,
    #[serde(default)]
    pub toggle_actions: Option<ToggleActions>,
    #[serde(default)]
    pub scrub_lag_ms: Option<u64>,
}

impl TriggerSpec {
    fn to_config(&self) -> TriggerConfig {
        let mut config = TriggerConfig::new(self.mode);
        if let Some(start) = self.start {
            config = config.start(start);
        }
        if let Some(end) = self.end {
            config = config.end(end);
        }
        config.toggle_actions = self.toggle_actions;
        config.scrub_lag = self.scrub_lag_ms.map(Duration::from_millis);
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    /// After everything placed so far
    #[default]
    Then,
    /// Alongside the previous step
    With,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepSpec {
    #[serde(default)]
    pub target: Option<String>,
    /// Several targets animated one after another, `stagger_ms` apart
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub stagger_ms: u64,
    #[serde(default)]
    pub from: PropertySet,
    #[serde(default)]
    pub to: PropertySet,
    pub duration_ms: u64,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default)]
    pub easing: EasingType,
    #[serde(default)]
    pub position: Placement,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub trigger: Option<TriggerSpec>,
    #[serde(default)]
    pub paused: bool,
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PinSpec {
    pub section: String,
    pub track: String,
    #[serde(default)]
    pub start: Option<TriggerPosition>,
    #[serde(default)]
    pub track_orientation: Option<Orientation>,
    #[serde(default)]
    pub anticipate: bool,
    #[serde(default)]
    pub scrub_lag_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CounterSpec {
    pub element: String,
    pub to: f64,
    #[serde(default)]
    pub from: f64,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub easing: Option<EasingType>,
    #[serde(default)]
    pub trigger: Option<TriggerSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PresetSpec {
    FadeIn {
        element: String,
    },
    ScaleIn {
        element: String,
    },
    SlideIn {
        element: String,
        #[serde(default)]
        from_right: bool,
    },
    Parallax {
        element: String,
        #[serde(default = "default_speed")]
        speed: f64,
    },
    TextReveal {
        container: String,
        words: Vec<String>,
    },
    ImageReveal {
        container: String,
        mask: String,
        image: String,
    },
    HorizontalScroll {
        section: String,
        track: String,
    },
    /// Counts to `to`, or to the number in the element's text
    Counter {
        element: String,
        #[serde(default)]
        to: Option<f64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct InputSpec {
    /// Frame index the input is delivered before
    pub frame: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Wheel {
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    Touch {
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
    },
    ScrollTo {
        #[serde(default)]
        position: Option<f64>,
        #[serde(default)]
        element: Option<String>,
        #[serde(default)]
        duration_ms: Option<u64>,
        #[serde(default)]
        easing: Option<EasingType>,
        #[serde(default)]
        offset: f64,
        #[serde(default)]
        immediate: bool,
    },
    CancelScrollTo,
    Resize {
        width: f64,
        height: f64,
    },
    /// Detach an element from the document and re-measure
    Remove {
        element: String,
    },
    Refresh,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let scenario: Self =
            toml::from_str(content).map_err(|e| Error::Scenario(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(Error::Scenario(format!("fps must be positive, got {}", self.fps)));
        }
        if !self.content_extent.is_finite() || self.content_extent < 0.0 {
            return Err(Error::Scenario(format!(
                "content_extent must be a non-negative number, got {}",
                self.content_extent
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for element in &self.elements {
            if !seen.insert(element.id.as_str()) {
                return Err(Error::Scenario(format!("duplicate element id '{}'", element.id)));
            }
        }
        for trigger in &self.triggers {
            if trigger.element.is_none() {
                return Err(Error::Scenario("trigger without an element".into()));
            }
        }
        for (index, timeline) in self.timelines.iter().enumerate() {
            if timeline.steps.is_empty() {
                warn!(timeline = index, "Timeline has no steps");
            }
            if let Some(trigger) = &timeline.trigger {
                if trigger.element.is_none() {
                    return Err(Error::Scenario(format!(
                        "timeline {} has a trigger without an element",
                        index
                    )));
                }
            }
            for step in &timeline.steps {
                if step.target.is_none() && step.targets.is_empty() {
                    return Err(Error::Scenario(format!(
                        "timeline {} has a step without a target",
                        index
                    )));
                }
            }
        }
        for input in &self.inputs {
            if let Action::ScrollTo {
                position: None,
                element: None,
                ..
            } = input.action
            {
                return Err(Error::Scenario(format!(
                    "scroll_to at frame {} needs a position or an element",
                    input.frame
                )));
            }
        }
        Ok(())
    }
}

/// Final observable state of one element
#[derive(Debug, Clone, Serialize)]
pub struct ElementSnapshot {
    pub id: String,
    pub transform: String,
    pub opacity: f64,
    pub pinned: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineSnapshot {
    pub name: String,
    pub progress: f64,
    pub state: PlayState,
}

#[derive(Debug, Clone, Serialize)]
pub struct PinSnapshot {
    pub name: String,
    pub range_length: f64,
    pub pinned: bool,
    pub progress: f64,
    pub translate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterSnapshot {
    pub name: String,
    pub text: String,
    pub finished: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub scroll: ScrollState,
    pub page_progress: f64,
    pub elements: Vec<ElementSnapshot>,
    pub timelines: Vec<TimelineSnapshot>,
    pub pins: Vec<PinSnapshot>,
    pub counters: Vec<CounterSnapshot>,
}

/// A scenario wired into a live scheduler
pub struct Stage {
    scheduler: Scheduler,
    source: ManualFrameSource,
    elements: Vec<(String, ElementHandle)>,
    triggers: Vec<(String, TriggerHandle)>,
    timelines: Vec<(String, TimelineHandle)>,
    pins: Vec<(String, PinHandle)>,
    counters: Vec<(String, CounterHandle)>,
    region: Region,
    inputs: Vec<InputSpec>,
    next_input: usize,
}

impl Stage {
    pub fn build(scenario: &Scenario, config: SchedulerConfig) -> Result<Self> {
        let source = ManualFrameSource::new();
        let config = scenario.config.clone().unwrap_or(config);
        let mut scheduler =
            Scheduler::init(config, scenario.viewport, Box::new(source.clone()));
        scheduler.set_content_extent(scenario.content_extent);

        let elements = scenario
            .elements
            .iter()
            .map(|spec| {
                let mut element = Element::new(spec.id.clone(), spec.bounds);
                if spec.scroll_width.is_some() || spec.scroll_height.is_some() {
                    element = element.with_scroll_extent(
                        spec.scroll_width.unwrap_or(spec.bounds.width),
                        spec.scroll_height.unwrap_or(spec.bounds.height),
                    );
                }
                if let Some(text) = &spec.text {
                    element = element.with_text(text.clone());
                }
                (spec.id.clone(), element.into_handle())
            })
            .collect();

        let mut inputs = scenario.inputs.clone();
        inputs.sort_by_key(|input| input.frame);

        let mut stage = Self {
            scheduler,
            source,
            elements,
            triggers: Vec::new(),
            timelines: Vec::new(),
            pins: Vec::new(),
            counters: Vec::new(),
            region: Region::new(),
            inputs,
            next_input: 0,
        };
        stage.register(scenario)?;
        // Layout may have shifted while registering
        stage.scheduler.refresh();
        debug!(
            elements = stage.elements.len(),
            inputs = stage.inputs.len(),
            "Stage built"
        );
        Ok(stage)
    }

    fn element(&self, id: &str) -> Result<ElementHandle> {
        self.elements
            .iter()
            .find(|(name, _)| name == id)
            .map(|(_, handle)| handle.clone())
            .ok_or_else(|| Error::Scenario(format!("unknown element '{}'", id)))
    }

    fn register(&mut self, scenario: &Scenario) -> Result<()> {
        for spec in &scenario.triggers {
            let id = spec.element.as_deref().unwrap_or_default();
            let element = self.element(id)?;
            let handle = self.scheduler.register_trigger(&element, spec.to_config());
            self.triggers.push((id.to_string(), self.region.track(handle)));
        }

        for (index, spec) in scenario.timelines.iter().enumerate() {
            let builder = self.timeline_builder(spec)?;
            let mut config = TimelineConfig::new().paused(spec.paused);
            if let Some(trigger) = &spec.trigger {
                let element = self.element(trigger.element.as_deref().unwrap_or_default())?;
                config = config.trigger(&element, trigger.to_config());
            }
            let name = spec
                .name
                .clone()
                .unwrap_or_else(|| format!("timeline {}", index));
            let handle = self.scheduler.register_timeline(builder, config);
            self.timelines.push((name, self.region.track(handle)));
        }

        for spec in &scenario.pins {
            let section = self.element(&spec.section)?;
            let track = self.element(&spec.track)?;
            let mut config = PinnedSectionConfig::default().anticipate(spec.anticipate);
            if let Some(start) = spec.start {
                config.start = start;
            }
            if let Some(orientation) = spec.track_orientation {
                config = config.track_orientation(orientation);
            }
            if let Some(lag) = spec.scrub_lag_ms {
                config = config.scrub_lag(Duration::from_millis(lag));
            }
            let handle = self.scheduler.register_pinned_section(&section, &track, config);
            self.pins.push((spec.section.clone(), self.region.track(handle)));
        }

        for spec in &scenario.counters {
            let element = self.element(&spec.element)?;
            let mut options = CounterOptions::new().from(spec.from);
            if let Some(ms) = spec.duration_ms {
                options = options.duration(Duration::from_millis(ms));
            }
            if let Some(easing) = spec.easing {
                options = options.easing(easing);
            }
            if let Some(trigger) = &spec.trigger {
                options = options.trigger(trigger.to_config());
            }
            let handle = self.scheduler.register_counter(&element, spec.to, options);
            self.counters.push((spec.element.clone(), self.region.track(handle)));
        }

        for spec in &scenario.presets {
            self.register_preset(spec)?;
        }
        Ok(())
    }

    fn timeline_builder(&self, spec: &TimelineSpec) -> Result<TimelineBuilder> {
        let mut builder = TimelineBuilder::new();
        for step in &spec.steps {
            let make = |id: &str| -> Result<Step> {
                let element = self.element(id)?;
                Ok(Step::new(&element, step.from, step.to, Duration::from_millis(step.duration_ms))
                    .delay(Duration::from_millis(step.delay_ms))
                    .easing(step.easing))
            };

            if !step.targets.is_empty() {
                let steps = step
                    .targets
                    .iter()
                    .map(|id| make(id))
                    .collect::<Result<Vec<_>>>()?;
                builder = builder.stagger(steps, Duration::from_millis(step.stagger_ms));
                continue;
            }

            let single = make(step.target.as_deref().unwrap_or_default())?;
            builder = match step.position {
                Placement::Then => builder.then(single),
                Placement::With => builder.with(single),
            };
        }
        Ok(builder)
    }

    fn register_preset(&mut self, spec: &PresetSpec) -> Result<()> {
        match spec {
            PresetSpec::FadeIn { element } => {
                let target = self.element(element)?;
                let handle = presets::fade_in(&mut self.scheduler, &target);
                self.timelines
                    .push((format!("fade_in {}", element), self.region.track(handle)));
            }
            PresetSpec::ScaleIn { element } => {
                let target = self.element(element)?;
                let handle = presets::scale_in(&mut self.scheduler, &target);
                self.timelines
                    .push((format!("scale_in {}", element), self.region.track(handle)));
            }
            PresetSpec::SlideIn {
                element,
                from_right,
            } => {
                let target = self.element(element)?;
                let side = if *from_right { Side::Right } else { Side::Left };
                let handle = presets::slide_in(&mut self.scheduler, &target, side);
                self.timelines
                    .push((format!("slide_in {}", element), self.region.track(handle)));
            }
            PresetSpec::Parallax { element, speed } => {
                let target = self.element(element)?;
                let handle = presets::parallax(&mut self.scheduler, &target, *speed);
                self.timelines
                    .push((format!("parallax {}", element), self.region.track(handle)));
            }
            PresetSpec::TextReveal { container, words } => {
                let target = self.element(container)?;
                let words = words
                    .iter()
                    .map(|id| self.element(id))
                    .collect::<Result<Vec<_>>>()?;
                let handle = presets::text_reveal(&mut self.scheduler, &target, &words);
                self.timelines
                    .push((format!("text_reveal {}", container), self.region.track(handle)));
            }
            PresetSpec::ImageReveal {
                container,
                mask,
                image,
            } => {
                let target = self.element(container)?;
                let (mask, image) = (self.element(mask)?, self.element(image)?);
                let handle = presets::image_reveal(&mut self.scheduler, &target, &mask, &image);
                self.timelines
                    .push((format!("image_reveal {}", container), self.region.track(handle)));
            }
            PresetSpec::HorizontalScroll { section, track } => {
                let (target, track) = (self.element(section)?, self.element(track)?);
                let handle = presets::horizontal_scroll(&mut self.scheduler, &target, &track);
                self.pins.push((section.clone(), self.region.track(handle)));
            }
            PresetSpec::Counter { element, to } => {
                let target = self.element(element)?;
                let handle = match to {
                    Some(to) => presets::counter(&mut self.scheduler, &target, *to),
                    None => presets::counter_from_text(&mut self.scheduler, &target)
                        .ok_or_else(|| {
                            Error::Scenario(format!("element '{}' has no numeric text", element))
                        })?,
                };
                self.counters.push((element.clone(), self.region.track(handle)));
            }
        }
        Ok(())
    }

    /// Deliver every scripted input due at or before `frame`
    pub fn apply_inputs(&mut self, frame: u64) -> Result<()> {
        while let Some(input) = self.inputs.get(self.next_input) {
            if input.frame > frame {
                break;
            }
            let action = input.action.clone();
            self.next_input += 1;
            self.apply(&action)?;
        }
        Ok(())
    }

    fn apply(&mut self, action: &Action) -> Result<()> {
        debug!(?action, "Applying input");
        match action {
            Action::Wheel { dx, dy } => self.scheduler.wheel(*dx, *dy),
            Action::Touch { dx, dy } => self.scheduler.touch(*dx, *dy),
            Action::ScrollTo {
                position,
                element,
                duration_ms,
                easing,
                offset,
                immediate,
            } => {
                let options = ScrollToOptions {
                    duration: duration_ms.map(Duration::from_millis),
                    easing: easing.map(Into::into),
                    offset: *offset,
                    immediate: *immediate,
                };
                match (position, element) {
                    (Some(position), _) => self.scheduler.scroll_to(*position, options),
                    (None, Some(id)) => {
                        let element = self.element(id)?;
                        self.scheduler.scroll_to(&element, options)
                    }
                    (None, None) => {}
                }
            }
            Action::CancelScrollTo => self.scheduler.cancel_scroll_to(),
            Action::Resize { width, height } => {
                self.scheduler.resize(Viewport::new(*width, *height))
            }
            Action::Remove { element } => {
                self.element(element)?.borrow_mut().connected = false;
                self.scheduler.refresh();
            }
            Action::Refresh => self.scheduler.refresh(),
        }
        Ok(())
    }

    /// Run one frame if the scheduler asked for one
    pub fn step(&mut self, time_ms: f64) -> Option<FrameReport> {
        if !self.source.take_pending() {
            return None;
        }
        self.scheduler.frame(time_ms)
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn snapshot(&self) -> Snapshot {
        let elements = self
            .elements
            .iter()
            .map(|(id, handle)| {
                let element = handle.borrow();
                ElementSnapshot {
                    id: id.clone(),
                    transform: element.style.transform_css(),
                    opacity: element.style.opacity,
                    pinned: element.style.pinned.is_some(),
                    text: element.text.clone(),
                }
            })
            .collect();

        let timelines = self
            .timelines
            .iter()
            .filter_map(|(name, handle)| {
                self.scheduler.timeline(handle).map(|timeline| TimelineSnapshot {
                    name: name.clone(),
                    progress: timeline.progress(),
                    state: timeline.state(),
                })
            })
            .collect();

        let pins = self
            .pins
            .iter()
            .filter_map(|(name, handle)| {
                self.scheduler.pinned_section(handle).map(|pin| PinSnapshot {
                    name: name.clone(),
                    range_length: pin.range_length(),
                    pinned: pin.is_pinned(),
                    progress: pin.progress(),
                    translate: pin.translate(),
                })
            })
            .collect();

        let counters = self
            .counters
            .iter()
            .filter_map(|(name, handle)| {
                self.scheduler.counter(handle).map(|counter| CounterSnapshot {
                    name: name.clone(),
                    text: counter.text().to_string(),
                    finished: counter.is_finished(),
                })
            })
            .collect();

        Snapshot {
            scroll: *self.scheduler.scroll_state(),
            page_progress: self.scheduler.page_progress(),
            elements,
            timelines,
            pins,
            counters,
        }
    }

    /// Destroy every registration made for the scenario
    pub fn unmount(&mut self) {
        self.region.unmount();
        debug!(triggers = self.triggers.len(), "Stage unmounted");
    }
}
