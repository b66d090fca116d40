use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::HistoryEntry;
use crate::timer::{Timer, TimerStatus, Urgency, UrgencyThresholds};

/// Every state change in the engine produces an Event.
/// The CLI prints them with `--json`; completion events also reach
/// subscribers registered on the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerCreated {
        id: String,
        name: String,
        category: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerStarted {
        id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        id: String,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        id: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerDeleted {
        id: String,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        id: String,
        name: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        id: String,
        name: String,
        category: String,
        status: TimerStatus,
        remaining_secs: u64,
        duration_secs: u64,
        ratio: f64,
        urgency: Urgency,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Build a full state snapshot for one timer.
    pub fn snapshot(timer: &Timer, thresholds: &UrgencyThresholds, now: DateTime<Utc>) -> Self {
        Event::StateSnapshot {
            id: timer.id().to_string(),
            name: timer.name().to_string(),
            category: timer.category().to_string(),
            status: timer.status(),
            remaining_secs: timer.remaining_secs(),
            duration_secs: timer.duration_secs(),
            ratio: timer.remaining_ratio(),
            urgency: thresholds.classify_timer(timer),
            at: now,
        }
    }
}

/// Delivered once per completed timer, after the history entry is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// The timer as it was at completion (`status == Completed`).
    pub timer: Timer,
    pub entry: HistoryEntry,
}

impl Completion {
    /// User-facing notice shown once per completion.
    pub fn notice(&self) -> String {
        format!("Congratulations! Timer {} is completed!", self.timer.name())
    }
}
