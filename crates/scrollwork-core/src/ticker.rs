//! Frame loop
//!
//! The ticker owns the single subscription to the platform's frame-timing
//! primitive (a one-shot "call me next frame" request, re-armed after every
//! frame). It is alive while the scheduler core is attached or any listener
//! is registered, and releases the subscription as soon as neither holds.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, error};

use crate::config::TickerConfig;
use crate::scroll::timing::delta_from_ms;

/// The platform's frame-timing primitive
pub trait FrameSource {
    /// Ask for one callback on the next frame
    fn request_frame(&mut self);

    /// Withdraw an outstanding request
    fn cancel_frame(&mut self);
}

#[derive(Debug, Default)]
struct ManualFrameState {
    pending: bool,
    requests: usize,
    cancels: usize,
}

/// Frame source for headless hosts and tests
///
/// Clones share state, so a copy kept by the host can observe the
/// subscription after the original is handed to the scheduler.
#[derive(Debug, Clone, Default)]
pub struct ManualFrameSource {
    state: Rc<RefCell<ManualFrameState>>,
}

impl ManualFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame has been requested and not yet consumed or cancelled
    pub fn is_pending(&self) -> bool {
        self.state.borrow().pending
    }

    /// Consume the pending request, as the platform does when it fires
    pub fn take_pending(&self) -> bool {
        std::mem::take(&mut self.state.borrow_mut().pending)
    }

    pub fn requests(&self) -> usize {
        self.state.borrow().requests
    }

    pub fn cancels(&self) -> usize {
        self.state.borrow().cancels
    }
}

impl FrameSource for ManualFrameSource {
    fn request_frame(&mut self) {
        let mut state = self.state.borrow_mut();
        state.pending = true;
        state.requests += 1;
    }

    fn cancel_frame(&mut self) {
        let mut state = self.state.borrow_mut();
        if state.pending {
            state.pending = false;
            state.cancels += 1;
        }
    }
}

/// Timing of the frame being processed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Platform timestamp in milliseconds
    pub time_ms: f64,
    /// Delta since the previous frame after lag smoothing
    pub delta: Duration,
    /// Frames processed since the subscription was established
    pub frame: u64,
}

/// A per-frame listener; identity is the `Rc` allocation
pub type Listener = Rc<RefCell<dyn FnMut(&FrameInfo) -> crate::Result<()>>>;

/// Wrap a closure as a [`Listener`]
pub fn listener(f: impl FnMut(&FrameInfo) -> crate::Result<()> + 'static) -> Listener {
    Rc::new(RefCell::new(f))
}

struct ListenerEntry {
    listener: Listener,
    disabled: bool,
}

pub struct Ticker {
    source: Box<dyn FrameSource>,
    config: TickerConfig,
    listeners: Vec<ListenerEntry>,
    core_attached: bool,
    subscribed: bool,
    last_time: Option<f64>,
    frame: u64,
}

impl Ticker {
    pub(crate) fn new(source: Box<dyn FrameSource>, config: TickerConfig) -> Self {
        Self {
            source,
            config,
            listeners: Vec::new(),
            core_attached: false,
            subscribed: false,
            last_time: None,
            frame: 0,
        }
    }

    /// Register a listener; adding the same listener twice is a no-op
    pub fn add(&mut self, listener: &Listener) -> bool {
        if self.position(listener).is_some() {
            return false;
        }
        self.listeners.push(ListenerEntry {
            listener: Rc::clone(listener),
            disabled: false,
        });
        self.sync_subscription();
        true
    }

    /// Unregister a listener; unknown listeners are ignored
    pub fn remove(&mut self, listener: &Listener) -> bool {
        let Some(index) = self.position(listener) else {
            return false;
        };
        self.listeners.remove(index);
        self.sync_subscription();
        true
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether the listener was disabled after a fault
    pub fn is_disabled(&self, listener: &Listener) -> bool {
        self.position(listener)
            .map(|i| self.listeners[i].disabled)
            .unwrap_or(false)
    }

    /// Whether the frame subscription is currently held
    pub fn is_running(&self) -> bool {
        self.subscribed
    }

    pub(crate) fn attach_core(&mut self) {
        self.core_attached = true;
        self.sync_subscription();
    }

    pub(crate) fn detach_core(&mut self) {
        self.core_attached = false;
        self.sync_subscription();
    }

    /// Drop every listener and the core, releasing the subscription
    pub(crate) fn shutdown(&mut self) {
        self.listeners.clear();
        self.detach_core();
    }

    /// Start processing a platform frame
    ///
    /// Returns `None` when no subscription is held (a late callback after
    /// cancellation).
    pub(crate) fn begin_frame(&mut self, time_ms: f64) -> Option<FrameInfo> {
        if !self.subscribed {
            debug!(time_ms, "Ignoring frame without subscription");
            return None;
        }

        let raw_ms = match self.last_time {
            Some(last) => (time_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_time = Some(time_ms);
        self.frame += 1;

        Some(FrameInfo {
            time_ms,
            delta: self.smooth_delta(raw_ms),
            frame: self.frame,
        })
    }

    /// Invoke every enabled listener; a faulting listener is disabled for the session
    pub(crate) fn dispatch(&mut self, info: &FrameInfo) {
        for (index, entry) in self.listeners.iter_mut().enumerate() {
            if entry.disabled {
                continue;
            }
            let listener = Rc::clone(&entry.listener);
            let outcome = catch_unwind(AssertUnwindSafe(|| (&mut *listener.borrow_mut())(info)));
            let fault = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(panic) => Some(panic_message(panic.as_ref())),
            };
            if let Some(message) = fault {
                error!(listener = index, frame = info.frame, %message, "Listener fault, disabling");
                entry.disabled = true;
            }
        }
    }

    /// Finish a frame, re-arming the one-shot request while still wanted
    pub(crate) fn end_frame(&mut self) {
        if self.subscribed {
            self.source.request_frame();
        }
    }

    fn smooth_delta(&self, raw_ms: f64) -> Duration {
        let mut ms = raw_ms;
        if self.config.lag_threshold_ms > 0 && ms > self.config.lag_threshold_ms as f64 {
            ms = self.config.lag_adjusted_ms as f64;
        }
        ms = ms.min(self.config.max_delta_ms as f64);
        delta_from_ms(ms)
    }

    fn position(&self, listener: &Listener) -> Option<usize> {
        self.listeners
            .iter()
            .position(|entry| Rc::ptr_eq(&entry.listener, listener))
    }

    fn sync_subscription(&mut self) {
        let wanted = self.core_attached || !self.listeners.is_empty();
        if wanted && !self.subscribed {
            debug!("Frame loop started");
            self.subscribed = true;
            self.last_time = None;
            self.frame = 0;
            self.source.request_frame();
        } else if !wanted && self.subscribed {
            debug!("Frame loop stopped");
            self.subscribed = false;
            self.source.cancel_frame();
        }
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
