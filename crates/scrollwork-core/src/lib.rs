pub mod arena;
pub mod config;
pub mod counter;
pub mod dom;
pub mod error;
pub mod handle;
pub mod pin;
pub mod presets;
pub mod scheduler;
pub mod scroll;
pub mod ticker;
pub mod timeline;
pub mod trigger;

pub use arena::Key;
pub use config::{EasingType, Orientation, SchedulerConfig, ScrollConfig};
pub use counter::{format_thousands, CounterOptions};
pub use dom::{Bounds, Element, ElementHandle, Property, Viewport, WeakElement};
pub use error::{Error, Result};
pub use handle::{AnyHandle, CounterHandle, PinHandle, Region, TimelineHandle, TriggerHandle};
pub use pin::PinnedSectionConfig;
pub use scheduler::{FrameReport, Scheduler, ScrollTarget, ScrollToOptions};
pub use scroll::{Direction, Easing, ScrollState};
pub use ticker::{listener, FrameInfo, FrameSource, Listener, ManualFrameSource};
pub use timeline::{PlayState, PropertySet, Step, TimelineBuilder, TimelineConfig};
pub use trigger::{
    ToggleAction, ToggleActions, TriggerConfig, TriggerEvent, TriggerEventKind, TriggerMode,
    TriggerPosition,
};
