//! Trigger registry
//!
//! Every trigger caches the scroll positions of its start and end boundary,
//! resolved from the element's bounds at registration and on `refresh`.
//! Each tick places the shared scroll position `Before`, `Inside` or `After`
//! that range; the change of place decides which callbacks fire. Cached
//! boundaries are never re-measured implicitly, so a layout change shows up
//! as stale timing until the host refreshes.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::actions::{ToggleAction, ToggleActions};
use super::offset::TriggerPosition;
use crate::arena::{Arena, Key};
use crate::config::Orientation;
use crate::dom::WeakElement;
use crate::handle::Lifeline;
use crate::scroll::{Direction, ScrollState};
use crate::ticker::panic_message;

/// Below this gap a lagging scrub snaps onto its target
const SCRUB_SNAP: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// Fire on the first activation, then stop evaluating
    Once,
    /// Fire on every boundary crossing
    #[default]
    Toggle,
    /// Feed continuous progress to the bound target, no discrete callbacks
    Scrub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEventKind {
    /// Crossed the start moving forward
    Enter,
    /// Crossed the end moving forward
    Leave,
    /// Crossed the end moving backward
    EnterBack,
    /// Crossed the start moving backward
    LeaveBack,
}

impl TriggerEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEventKind::Enter => "enter",
            TriggerEventKind::Leave => "leave",
            TriggerEventKind::EnterBack => "enter_back",
            TriggerEventKind::LeaveBack => "leave_back",
        }
    }

    fn implied_direction(self) -> Direction {
        match self {
            TriggerEventKind::Enter | TriggerEventKind::Leave => Direction::Down,
            TriggerEventKind::EnterBack | TriggerEventKind::LeaveBack => Direction::Up,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerEvent {
    pub trigger: Key,
    pub label: String,
    pub kind: TriggerEventKind,
    pub progress: f64,
    pub direction: Direction,
}

pub type TriggerCallback = Box<dyn FnMut(&TriggerEvent)>;

#[derive(Default)]
pub struct TriggerCallbacks {
    pub on_enter: Option<TriggerCallback>,
    pub on_leave: Option<TriggerCallback>,
    pub on_enter_back: Option<TriggerCallback>,
    pub on_leave_back: Option<TriggerCallback>,
}

impl TriggerCallbacks {
    fn slot(&mut self, kind: TriggerEventKind) -> &mut Option<TriggerCallback> {
        match kind {
            TriggerEventKind::Enter => &mut self.on_enter,
            TriggerEventKind::Leave => &mut self.on_leave,
            TriggerEventKind::EnterBack => &mut self.on_enter_back,
            TriggerEventKind::LeaveBack => &mut self.on_leave_back,
        }
    }
}

impl fmt::Debug for TriggerCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerCallbacks")
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .field("on_enter_back", &self.on_enter_back.is_some())
            .field("on_leave_back", &self.on_leave_back.is_some())
            .finish()
    }
}

/// Declarative trigger configuration
#[derive(Debug)]
pub struct TriggerConfig {
    pub start: TriggerPosition,
    pub end: TriggerPosition,
    pub mode: TriggerMode,
    /// Overrides the mode's default actions on a bound timeline
    pub toggle_actions: Option<ToggleActions>,
    /// Catch-up time of scrub progress applied to the bound target
    pub scrub_lag: Option<Duration>,
    pub callbacks: TriggerCallbacks,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::new(TriggerMode::default())
    }
}

impl TriggerConfig {
    pub fn new(mode: TriggerMode) -> Self {
        Self {
            start: TriggerPosition::DEFAULT_START,
            end: TriggerPosition::DEFAULT_END,
            mode,
            toggle_actions: None,
            scrub_lag: None,
            callbacks: TriggerCallbacks::default(),
        }
    }

    pub fn once() -> Self {
        Self::new(TriggerMode::Once)
    }

    pub fn toggle() -> Self {
        Self::new(TriggerMode::Toggle)
    }

    pub fn scrub() -> Self {
        Self::new(TriggerMode::Scrub)
    }

    pub fn start(mut self, start: TriggerPosition) -> Self {
        self.start = start;
        self
    }

    pub fn end(mut self, end: TriggerPosition) -> Self {
        self.end = end;
        self
    }

    pub fn toggle_actions(mut self, actions: ToggleActions) -> Self {
        self.toggle_actions = Some(actions);
        self
    }

    pub fn scrub_lag(mut self, lag: Duration) -> Self {
        self.scrub_lag = Some(lag);
        self
    }

    pub fn on_enter(mut self, f: impl FnMut(&TriggerEvent) + 'static) -> Self {
        self.callbacks.on_enter = Some(Box::new(f));
        self
    }

    pub fn on_leave(mut self, f: impl FnMut(&TriggerEvent) + 'static) -> Self {
        self.callbacks.on_leave = Some(Box::new(f));
        self
    }

    pub fn on_enter_back(mut self, f: impl FnMut(&TriggerEvent) + 'static) -> Self {
        self.callbacks.on_enter_back = Some(Box::new(f));
        self
    }

    pub fn on_leave_back(mut self, f: impl FnMut(&TriggerEvent) + 'static) -> Self {
        self.callbacks.on_leave_back = Some(Box::new(f));
        self
    }

    fn actions(&self) -> ToggleActions {
        self.toggle_actions.unwrap_or(match self.mode {
            TriggerMode::Once => ToggleActions::ONCE,
            TriggerMode::Toggle | TriggerMode::Scrub => ToggleActions::TOGGLE,
        })
    }
}

/// What a trigger drives besides its callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Binding {
    None,
    Timeline(Key),
    Pin(Key),
    Counter(Key),
}

/// Work a trigger hands to the later phases of the tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Directive {
    Toggle { binding: Binding, action: ToggleAction },
    Scrub { binding: Binding, progress: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Location {
    #[default]
    Before,
    Inside,
    After,
}

/// Crossings implied by moving from one place to another, in firing order
fn crossings(from: Location, to: Location) -> &'static [TriggerEventKind] {
    use Location::*;
    use TriggerEventKind::*;
    match (from, to) {
        (Before, Inside) => &[Enter],
        (Inside, After) => &[Leave],
        (After, Inside) => &[EnterBack],
        (Inside, Before) => &[LeaveBack],
        (Before, After) => &[Enter, Leave],
        (After, Before) => &[EnterBack, LeaveBack],
        _ => &[],
    }
}

/// Read-only snapshot of a trigger's computed values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerView {
    pub start: f64,
    pub end: f64,
    pub progress: f64,
    /// Progress after scrub lag, as last fed to the bound target
    pub applied_progress: f64,
    pub active: bool,
}

struct Trigger {
    element: WeakElement,
    start_position: TriggerPosition,
    end_position: TriggerPosition,
    mode: TriggerMode,
    actions: ToggleActions,
    scrub_lag: Option<Duration>,
    callbacks: TriggerCallbacks,
    callbacks_faulted: bool,
    binding: Binding,
    life: Lifeline,
    start: f64,
    end: f64,
    location: Location,
    active: bool,
    progress: f64,
    applied: f64,
    /// A `Once` trigger that has fired
    spent: bool,
}

impl Trigger {
    fn measure(&mut self, viewport_extent: f64, orientation: Orientation) -> bool {
        let Some(element) = self.element.resolve() else {
            return false;
        };
        let bounds = element.borrow().bounds;
        let mut start = self
            .start_position
            .resolve(&bounds, viewport_extent, orientation, None);
        if !start.is_finite() {
            warn!(element = %self.element.label(), start, "Non-finite trigger start, using 0");
            start = 0.0;
        }
        let mut end = self
            .end_position
            .resolve(&bounds, viewport_extent, orientation, Some(start));
        if !end.is_finite() {
            warn!(element = %self.element.label(), end, "Non-finite trigger end, collapsing range");
            end = start;
        }
        if end < start {
            warn!(
                element = %self.element.label(),
                start,
                end,
                "Trigger end precedes start, collapsing range"
            );
            end = start;
        }
        self.start = start;
        self.end = end;
        true
    }

    fn progress_at(&self, position: f64) -> f64 {
        let span = self.end - self.start;
        if span <= 0.0 {
            return if position >= self.start { 1.0 } else { 0.0 };
        }
        ((position - self.start) / span).clamp(0.0, 1.0)
    }

    fn location_at(&self, position: f64) -> Location {
        if position < self.start {
            Location::Before
        } else if position > self.end {
            Location::After
        } else {
            Location::Inside
        }
    }

    fn event(&self, key: Key, kind: TriggerEventKind, scroll: Direction) -> TriggerEvent {
        let direction = match scroll {
            Direction::None => kind.implied_direction(),
            direction => direction,
        };
        TriggerEvent {
            trigger: key,
            label: self.element.label(),
            kind,
            progress: self.progress,
            direction,
        }
    }

    fn fire(&mut self, event: &TriggerEvent) {
        if self.callbacks_faulted {
            return;
        }
        let Some(callback) = self.callbacks.slot(event.kind).as_mut() else {
            return;
        };
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
            error!(
                trigger = %event.trigger,
                kind = ?event.kind,
                message = %panic_message(panic.as_ref()),
                "Trigger callback fault, disabling callbacks"
            );
            self.callbacks_faulted = true;
        }
    }
}

#[derive(Default)]
pub struct TriggerRegistry {
    triggers: Arena<Trigger>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    pub(crate) fn register(
        &mut self,
        element: WeakElement,
        config: TriggerConfig,
        binding: Binding,
        viewport_extent: f64,
        orientation: Orientation,
    ) -> (Key, Lifeline) {
        let actions = config.actions();
        let scrub_lag = config.scrub_lag.filter(|lag| !lag.is_zero());
        let life = Lifeline::new();
        let mut trigger = Trigger {
            element,
            start_position: config.start,
            end_position: config.end,
            mode: config.mode,
            actions,
            scrub_lag,
            callbacks: config.callbacks,
            callbacks_faulted: false,
            binding,
            life: life.clone(),
            start: 0.0,
            end: 0.0,
            location: Location::Before,
            active: false,
            progress: 0.0,
            applied: 0.0,
            spent: false,
        };
        if !trigger.measure(viewport_extent, orientation) {
            debug!(element = %trigger.element.label(), "Registered trigger on a missing element");
        }
        let key = self.triggers.insert(trigger);
        debug!(trigger = %key, mode = ?config.mode, "Trigger registered");
        (key, life)
    }

    /// Replace the end boundary, re-measured on the next refresh
    pub(crate) fn set_end(&mut self, key: Key, end: TriggerPosition) {
        if let Some(trigger) = self.triggers.get_mut(key) {
            trigger.end_position = end;
        }
    }

    pub fn view(&self, key: Key) -> Option<TriggerView> {
        let trigger = self.triggers.get(key)?;
        if !trigger.life.is_alive() {
            return None;
        }
        Some(TriggerView {
            start: trigger.start,
            end: trigger.end,
            progress: trigger.progress,
            applied_progress: trigger.applied,
            active: trigger.active,
        })
    }

    /// Reclaim slots of destroyed triggers
    pub(crate) fn sweep(&mut self) -> Vec<Key> {
        self.triggers.retain(|_, trigger| trigger.life.is_alive())
    }

    /// Re-measure every trigger, pruning destroyed ones and ones whose
    /// element has left the document
    pub(crate) fn refresh(&mut self, viewport_extent: f64, orientation: Orientation) -> Vec<Key> {
        self.triggers.retain(|key, trigger| {
            if !trigger.life.is_alive() {
                return false;
            }
            if !trigger.measure(viewport_extent, orientation) {
                debug!(trigger = %key, "Pruning trigger with missing element");
                trigger.life.kill();
                return false;
            }
            true
        })
    }

    /// Destroy every trigger
    pub(crate) fn clear(&mut self) {
        self.triggers.retain(|_, trigger| {
            trigger.life.kill();
            false
        });
    }

    /// Evaluate every live trigger against one scroll state, in registration order
    pub(crate) fn evaluate(
        &mut self,
        state: &ScrollState,
        dt: Duration,
        events: &mut Vec<TriggerEvent>,
        directives: &mut Vec<Directive>,
    ) {
        let position = state.virtual_position;

        for key in self.triggers.keys() {
            let Some(trigger) = self.triggers.get_mut(key) else {
                continue;
            };
            if !trigger.life.is_alive() || trigger.spent {
                continue;
            }
            if !trigger.element.is_live() {
                continue;
            }

            let previous = trigger.location;
            let location = trigger.location_at(position);
            trigger.location = location;
            trigger.active = location == Location::Inside;
            trigger.progress = trigger.progress_at(position);

            match trigger.mode {
                TriggerMode::Scrub => {
                    let before = trigger.applied;
                    trigger.applied = match trigger.scrub_lag {
                        Some(lag) => {
                            let k = (dt.as_secs_f64() / lag.as_secs_f64()).min(1.0);
                            let next = before + (trigger.progress - before) * k;
                            if (trigger.progress - next).abs() < SCRUB_SNAP {
                                trigger.progress
                            } else {
                                next
                            }
                        }
                        None => trigger.progress,
                    };
                    // crossings are reported but callbacks belong to discrete triggers
                    for &kind in crossings(previous, location) {
                        events.push(trigger.event(key, kind, state.direction));
                    }
                    if location == Location::Inside
                        || location != previous
                        || trigger.applied != before
                    {
                        directives.push(Directive::Scrub {
                            binding: trigger.binding,
                            progress: trigger.applied,
                        });
                    }
                }
                TriggerMode::Once | TriggerMode::Toggle => {
                    trigger.applied = trigger.progress;
                    for &kind in crossings(previous, location) {
                        if trigger.mode == TriggerMode::Once && kind != TriggerEventKind::Enter {
                            continue;
                        }
                        let event = trigger.event(key, kind, state.direction);
                        trigger.fire(&event);

                        let action = match kind {
                            TriggerEventKind::Enter => trigger.actions.on_enter,
                            TriggerEventKind::Leave => trigger.actions.on_leave,
                            TriggerEventKind::EnterBack => trigger.actions.on_enter_back,
                            TriggerEventKind::LeaveBack => trigger.actions.on_leave_back,
                        };
                        if action != ToggleAction::None && trigger.binding != Binding::None {
                            directives.push(Directive::Toggle {
                                binding: trigger.binding,
                                action,
                            });
                        }
                        events.push(event);

                        if trigger.mode == TriggerMode::Once {
                            debug!(trigger = %key, "Once trigger spent");
                            trigger.spent = true;
                            break;
                        }
                    }
                }
            }
        }
    }
}
