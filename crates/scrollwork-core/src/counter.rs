//! Numeric counters written into an element's text
//!
//! Values between the ends are truncated toward `from`, so the display
//! never passes the target early; the final text is always exactly
//! `format(to)`.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::dom::WeakElement;
use crate::scroll::timing::{is_complete, lerp, progress};
use crate::scroll::Easing;
use crate::trigger::{ToggleAction, TriggerConfig};

pub type Formatter = Box<dyn Fn(f64) -> String>;

/// Integer part with `,` thousands grouping, e.g. `12543.9` → `"12,543"`
pub fn format_thousands(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let truncated = value.trunc();
    let digits = format!("{}", truncated.abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if truncated < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Registration options for a counter
#[derive(Default)]
pub struct CounterOptions {
    pub from: f64,
    /// Falls back to `counter.duration_ms`
    pub duration: Option<Duration>,
    /// Falls back to `counter.easing`
    pub easing: Option<Easing>,
    /// Falls back to [`format_thousands`]
    pub format: Option<Formatter>,
    /// Start on this trigger (or scrub with it) instead of immediately
    pub trigger: Option<TriggerConfig>,
}

impl CounterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, from: f64) -> Self {
        self.from = from;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn easing(mut self, easing: impl Into<Easing>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    pub fn format(mut self, format: impl Fn(f64) -> String + 'static) -> Self {
        self.format = Some(Box::new(format));
        self
    }

    pub fn trigger(mut self, trigger: TriggerConfig) -> Self {
        self.trigger = Some(trigger);
        self
    }
}

impl fmt::Debug for CounterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterOptions")
            .field("from", &self.from)
            .field("duration", &self.duration)
            .field("easing", &self.easing)
            .field("format", &self.format.is_some())
            .field("trigger", &self.trigger)
            .finish()
    }
}

pub struct Counter {
    target: WeakElement,
    from: f64,
    to: f64,
    duration: Duration,
    easing: Easing,
    format: Formatter,
    elapsed: Duration,
    running: bool,
    reversed: bool,
    /// Settled on `to`
    finished: bool,
    text: String,
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("target", &self.target)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("elapsed", &self.elapsed)
            .field("running", &self.running)
            .field("text", &self.text)
            .finish()
    }
}

impl Counter {
    /// Create a counter showing `format(from)` right away
    pub(crate) fn new(
        target: WeakElement,
        from: f64,
        to: f64,
        duration: Duration,
        easing: Easing,
        format: Formatter,
    ) -> Self {
        let mut counter = Self {
            target,
            from,
            to,
            duration,
            easing,
            format,
            elapsed: Duration::ZERO,
            running: false,
            reversed: false,
            finished: false,
            text: String::new(),
        };
        counter.render();
        counter
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn progress(&self) -> f64 {
        progress(self.elapsed, self.duration)
    }

    pub fn start(&mut self) {
        self.reversed = false;
        self.running = true;
    }

    pub fn apply(&mut self, action: ToggleAction) {
        match action {
            ToggleAction::Play | ToggleAction::Resume => self.start(),
            ToggleAction::Pause => self.running = false,
            ToggleAction::Reverse => {
                self.reversed = true;
                self.running = true;
                self.finished = false;
            }
            ToggleAction::Restart => {
                self.elapsed = Duration::ZERO;
                self.finished = false;
                self.start();
                self.render();
            }
            ToggleAction::Reset => {
                self.elapsed = Duration::ZERO;
                self.running = false;
                self.finished = false;
                self.render();
            }
            ToggleAction::Complete => {
                self.elapsed = self.duration;
                self.running = false;
                self.finished = true;
                self.render();
            }
            ToggleAction::None => {}
        }
    }

    /// Set the value from external progress
    pub(crate) fn seek_progress(&mut self, progress: f64) {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        self.running = false;
        self.finished = progress >= 1.0;
        self.elapsed = if self.finished {
            self.duration
        } else {
            self.duration.mul_f64(progress)
        };
        self.render();
    }

    /// Advance duration playback by one tick
    pub(crate) fn advance(&mut self, dt: Duration) -> bool {
        if !self.running {
            return false;
        }
        if self.reversed {
            self.elapsed = self.elapsed.saturating_sub(dt);
            self.running = !self.elapsed.is_zero();
        } else {
            self.elapsed = (self.elapsed + dt).min(self.duration);
            if is_complete(self.elapsed, self.duration) {
                debug!(element = %self.target.label(), to = self.to, "Counter finished");
                self.running = false;
                self.finished = true;
            }
        }
        self.render();
        true
    }

    fn value(&self) -> f64 {
        if self.finished {
            return self.to;
        }
        if self.elapsed.is_zero() {
            return self.from;
        }
        let eased = self.easing.apply(self.progress());
        if eased >= 1.0 {
            return self.to;
        }
        let value = lerp(self.from, self.to, eased);
        if self.to >= self.from {
            value.floor().clamp(self.from.min(self.to), self.to)
        } else {
            value.ceil().clamp(self.to, self.from)
        }
    }

    fn render(&mut self) {
        let text = (self.format)(self.value());
        if text == self.text {
            return;
        }
        if let Some(el) = self.target.resolve() {
            el.borrow_mut().text = text.clone();
        }
        self.text = text;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EasingType;
    use crate::dom::{Bounds, Element, ElementHandle};

    fn counter(to: f64) -> (ElementHandle, Counter) {
        let el = Element::new("stat", Bounds::default()).into_handle();
        let counter = Counter::new(
            WeakElement::new(&el),
            0.0,
            to,
            Duration::from_millis(2000),
            Easing::default(),
            Box::new(format_thousands),
        );
        (el, counter)
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.9), "999");
        assert_eq!(format_thousands(12543.0), "12,543");
        assert_eq!(format_thousands(1234567.0), "1,234,567");
        assert_eq!(format_thousands(-4321.0), "-4,321");
    }

    #[test]
    fn test_reaches_exact_target_and_never_exceeds() {
        let (el, mut counter) = counter(12543.0);
        assert_eq!(el.borrow().text, "0");
        counter.start();

        let mut elapsed = 0;
        while counter.is_running() {
            counter.advance(Duration::from_millis(16));
            elapsed += 16;
            if elapsed < 2000 {
                let shown: f64 = counter.text().replace(',', "").parse().unwrap();
                assert!(shown <= 12543.0);
            }
        }
        assert!(elapsed >= 2000);
        assert_eq!(counter.text(), "12,543");
        assert_eq!(el.borrow().text, "12,543");
    }

    #[test]
    fn test_eased_counter_still_lands_exactly() {
        let el = Element::new("stat", Bounds::default()).into_handle();
        let mut counter = Counter::new(
            WeakElement::new(&el),
            0.0,
            98.6,
            Duration::from_millis(500),
            EasingType::Power1Out.into(),
            Box::new(|v| format!("{:.1}", v)),
        );
        counter.start();
        for _ in 0..40 {
            counter.advance(Duration::from_millis(16));
        }
        assert_eq!(counter.text(), "98.6");
    }

    #[test]
    fn test_scrub_progress() {
        let (_el, mut counter) = counter(1000.0);
        counter.seek_progress(0.5);
        assert_eq!(counter.text(), "500");
        counter.seek_progress(1.0);
        assert_eq!(counter.text(), "1,000");
        counter.seek_progress(0.0);
        assert_eq!(counter.text(), "0");
    }

    #[test]
    fn test_countdown_truncates_toward_from() {
        let el = Element::new("stat", Bounds::default()).into_handle();
        let mut counter = Counter::new(
            WeakElement::new(&el),
            10.0,
            0.0,
            Duration::from_millis(1000),
            Easing::default(),
            Box::new(format_thousands),
        );
        counter.seek_progress(0.55);
        assert_eq!(counter.text(), "5");
    }

    #[test]
    fn test_missing_element_keeps_internal_text() {
        let (el, mut counter) = counter(100.0);
        el.borrow_mut().connected = false;
        counter.apply(ToggleAction::Complete);
        assert_eq!(counter.text(), "100");
        assert_eq!(el.borrow().text, "0");
    }
}
