//! Shared tick driver.
//!
//! Instead of one interval per countdown, a single driver holds the ids of
//! every timer that should receive the next 1-second tick. Cancelling is a
//! set removal, so once `cancel` returns no later dispatch can reach the id.

use std::time::Duration;

use indexmap::IndexSet;

/// Cadence of both the countdown tick and the blink pulse.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Default, Clone)]
pub struct TickDriver {
    scheduled: IndexSet<String>,
}

impl TickDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the id was already scheduled.
    pub fn schedule(&mut self, id: &str) -> bool {
        self.scheduled.insert(id.to_string())
    }

    /// Returns `false` if the id was not scheduled.
    pub fn cancel(&mut self, id: &str) -> bool {
        self.scheduled.shift_remove(id)
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.scheduled.contains(id)
    }

    pub fn len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty()
    }

    /// Scheduled ids in the order they were started.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.scheduled.iter().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.scheduled.clear();
    }
}
