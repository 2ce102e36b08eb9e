//! Process-wide bot flags shared by every command instance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct Flags {
    active: AtomicBool,
    shitposting: AtomicBool,
    greens_only: AtomicBool,
}

/// Cheap-to-clone handle to the global flags.
///
/// Commands read all flags; only the admin toggle writes `active`.
#[derive(Debug, Clone, Default)]
pub struct BotState {
    flags: Arc<Flags>,
}

impl BotState {
    pub fn new(active: bool, shitposting: bool, greens_only: bool) -> Self {
        let state = Self::default();
        state.flags.active.store(active, Ordering::Relaxed);
        state.flags.shitposting.store(shitposting, Ordering::Relaxed);
        state.flags.greens_only.store(greens_only, Ordering::Relaxed);
        state
    }

    pub fn is_active(&self) -> bool {
        self.flags.active.load(Ordering::Relaxed)
    }

    pub fn set_active(&self, active: bool) {
        self.flags.active.store(active, Ordering::Relaxed);
    }

    pub fn shitposting(&self) -> bool {
        self.flags.shitposting.load(Ordering::Relaxed)
    }

    pub fn greens_only(&self) -> bool {
        self.flags.greens_only.load(Ordering::Relaxed)
    }
}
