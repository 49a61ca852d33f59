//! Opaque registration handles
//!
//! A handle pairs an arena key with a shared liveness flag. `destroy()` only
//! flips the flag, so it is O(1), idempotent, and safe to call from inside a
//! trigger callback while the scheduler is mid-tick. The scheduler skips dead
//! entries immediately and reclaims their slots on its next sweep.

use std::cell::Cell;
use std::rc::Rc;

use crate::arena::Key;

/// Shared liveness flag between a handle and its registry entry
#[derive(Debug, Clone)]
pub struct Lifeline(Rc<Cell<bool>>);

impl Lifeline {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.0.get()
    }

    /// Mark dead; returns whether this call changed anything
    pub fn kill(&self) -> bool {
        self.0.replace(false)
    }
}

impl Default for Lifeline {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            key: Key,
            life: Lifeline,
        }

        impl $name {
            pub(crate) fn new(key: Key, life: Lifeline) -> Self {
                Self { key, life }
            }

            pub(crate) fn key(&self) -> Key {
                self.key
            }

            /// Registry id, as reported in frame events
            pub fn id(&self) -> Key {
                self.key
            }

            /// Stop all further evaluation and mutation for this entity
            ///
            /// Safe to call any number of times.
            pub fn destroy(&self) {
                if self.life.kill() {
                    tracing::debug!(handle = %self.key, kind = stringify!($name), "Destroyed");
                }
            }

            pub fn is_destroyed(&self) -> bool {
                !self.life.is_alive()
            }
        }

        impl From<$name> for AnyHandle {
            fn from(handle: $name) -> Self {
                AnyHandle::$name(handle)
            }
        }
    };
}

define_handle!(
    /// Handle to a registered trigger
    TriggerHandle
);
define_handle!(
    /// Handle to a registered timeline
    TimelineHandle
);
define_handle!(
    /// Handle to a registered pinned section
    PinHandle
);
define_handle!(
    /// Handle to a registered counter
    CounterHandle
);

#[derive(Debug, Clone)]
#[allow(clippy::enum_variant_names)]
pub enum AnyHandle {
    TriggerHandle(TriggerHandle),
    TimelineHandle(TimelineHandle),
    PinHandle(PinHandle),
    CounterHandle(CounterHandle),
}

impl AnyHandle {
    pub fn destroy(&self) {
        match self {
            AnyHandle::TriggerHandle(h) => h.destroy(),
            AnyHandle::TimelineHandle(h) => h.destroy(),
            AnyHandle::PinHandle(h) => h.destroy(),
            AnyHandle::CounterHandle(h) => h.destroy(),
        }
    }
}

/// Every handle registered on behalf of one UI region
///
/// Dropping the region (unmount) destroys all of them.
#[derive(Debug, Default)]
pub struct Region {
    handles: Vec<AnyHandle>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a handle and hand it back to the caller
    pub fn track<H: Clone + Into<AnyHandle>>(&mut self, handle: H) -> H {
        self.handles.push(handle.clone().into());
        handle
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Destroy everything tracked so far
    pub fn unmount(&mut self) {
        for handle in self.handles.drain(..) {
            handle.destroy();
        }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        self.unmount();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    #[test]
    fn test_destroy_is_idempotent() {
        let mut arena = Arena::new();
        let handle = TriggerHandle::new(arena.insert(()), Lifeline::new());
        assert!(!handle.is_destroyed());
        handle.destroy();
        handle.destroy();
        assert!(handle.is_destroyed());
    }

    #[test]
    fn test_region_drop_destroys_tracked_handles() {
        let mut arena = Arena::new();
        let trigger = TriggerHandle::new(arena.insert(()), Lifeline::new());
        let counter = CounterHandle::new(arena.insert(()), Lifeline::new());
        {
            let mut region = Region::new();
            region.track(trigger.clone());
            region.track(counter.clone());
            assert_eq!(region.len(), 2);
        }
        assert!(trigger.is_destroyed());
        assert!(counter.is_destroyed());
    }
}
