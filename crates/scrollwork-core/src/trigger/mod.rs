//! L3 Molecular Layer: Scroll triggers
//!
//! - `offset`: viewport-relative boundary grammar
//! - `actions`: per-crossing playback actions for bound timelines
//! - `registry`: boundary state machine evaluated once per tick

pub mod actions;
pub mod offset;
pub mod registry;

pub use actions::{ToggleAction, ToggleActions};
pub use offset::{Edge, TriggerPosition};
pub use registry::{
    TriggerCallback, TriggerCallbacks, TriggerConfig, TriggerEvent, TriggerEventKind, TriggerMode,
    TriggerRegistry, TriggerView,
};
pub(crate) use registry::{Binding, Directive};
