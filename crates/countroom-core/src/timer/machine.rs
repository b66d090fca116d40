//! Countdown timer state machine.
//!
//! A [`Timer`] is both the persisted record and the state machine that
//! mutates it. It does not own a clock: the registry's tick driver decides
//! which timers receive a tick, and the caller passes the wall-clock time in.
//!
//! ## State Transitions
//!
//! ```text
//! Paused --start--> Running --tick--> Running | Completed
//! Running --pause--> Paused
//! *       --reset--> Paused
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, ValidationError};
use crate::events::Event;

/// Longest duration the `HH:MM:SS` display can show (99:59:59).
pub const MAX_DURATION_SECS: u64 = 99 * 3600 + 59 * 60 + 59;

/// Longest accepted timer name, in characters.
pub const MAX_NAME_LEN: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerStatus {
    Paused,
    Running,
    /// Terminal. A completed timer leaves the active set in the same dispatch.
    Completed,
}

/// Validated input for a new timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTimer {
    pub name: String,
    pub category: String,
    pub duration_secs: u64,
}

impl NewTimer {
    /// Trim and validate user input.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] for an empty name or category, a zero
    /// duration, or values beyond the display limits.
    pub fn validate(name: &str, duration_secs: u64, category: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let category = category.trim();

        if name.is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        if category.is_empty() {
            return Err(ValidationError::EmptyField { field: "category" });
        }
        let len = name.chars().count();
        if len > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong {
                len,
                max: MAX_NAME_LEN,
            });
        }
        if duration_secs == 0 {
            return Err(ValidationError::NonPositiveDuration);
        }
        if duration_secs > MAX_DURATION_SECS {
            return Err(ValidationError::DurationTooLong {
                seconds: duration_secs,
                max: MAX_DURATION_SECS,
            });
        }

        Ok(Self {
            name: name.to_string(),
            category: category.to_string(),
            duration_secs,
        })
    }
}

/// A single countdown timer.
///
/// Serialized as `{id, name, duration, remaining, category, status, running}`
/// plus an optional `lastTickAt` used when catching up after a relaunch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    id: String,
    name: String,
    duration: u64,
    remaining: u64,
    category: String,
    status: TimerStatus,
    #[serde(default)]
    running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_tick_at: Option<DateTime<Utc>>,
}

impl Timer {
    /// Create a paused timer with a full countdown.
    pub fn new(id: impl Into<String>, input: NewTimer) -> Self {
        Self {
            id: id.into(),
            name: input.name,
            duration: input.duration_secs,
            remaining: input.duration_secs,
            category: input.category,
            status: TimerStatus::Paused,
            running: false,
            last_tick_at: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn is_completed(&self) -> bool {
        self.status == TimerStatus::Completed
    }

    pub fn last_tick_at(&self) -> Option<DateTime<Utc>> {
        self.last_tick_at
    }

    /// Fraction of the countdown still left, 1.0 for a fresh timer.
    pub fn remaining_ratio(&self) -> f64 {
        if self.duration == 0 {
            return 0.0;
        }
        self.remaining as f64 / self.duration as f64
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin counting down. Starting a running timer is a no-op.
    ///
    /// # Errors
    /// Returns [`CoreError::InvalidTransition`] for a completed timer.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Option<Event>, CoreError> {
        match self.status {
            TimerStatus::Running => Ok(None),
            TimerStatus::Completed => Err(CoreError::InvalidTransition {
                id: self.id.clone(),
                from: self.status,
                action: "start",
            }),
            TimerStatus::Paused => {
                self.set_status(TimerStatus::Running);
                self.last_tick_at = Some(now);
                Ok(Some(Event::TimerStarted {
                    id: self.id.clone(),
                    remaining_secs: self.remaining,
                    at: now,
                }))
            }
        }
    }

    /// Freeze the countdown. Only a running timer can pause.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.status != TimerStatus::Running {
            return None;
        }
        self.set_status(TimerStatus::Paused);
        self.last_tick_at = None;
        Some(Event::TimerPaused {
            id: self.id.clone(),
            remaining_secs: self.remaining,
            at: now,
        })
    }

    /// Restore the full duration and pause. Valid from any status.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.remaining = self.duration;
        self.set_status(TimerStatus::Paused);
        self.last_tick_at = None;
        Some(Event::TimerReset {
            id: self.id.clone(),
            duration_secs: self.duration,
            at: now,
        })
    }

    /// Advance one second. Returns `Some(Event::TimerCompleted)` when the
    /// countdown reaches zero; ticking a paused or completed timer does nothing.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.elapse(1, now)
    }

    /// Apply several seconds at once, used when catching up after a relaunch.
    pub fn elapse(&mut self, secs: u64, now: DateTime<Utc>) -> Option<Event> {
        if self.status != TimerStatus::Running || secs == 0 {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(secs);
        self.last_tick_at = Some(now);
        if self.remaining > 0 {
            return None;
        }

        self.set_status(TimerStatus::Completed);
        self.last_tick_at = None;
        Some(Event::TimerCompleted {
            id: self.id.clone(),
            name: self.name.clone(),
            at: now,
        })
    }

    /// Apply the whole seconds of wall-clock time since the last tick.
    ///
    /// `last_tick_at` moves forward by exactly the seconds applied, so the
    /// sub-second remainder carries over to the next catch-up. A running
    /// record without a tick time starts its clock at `now`.
    pub fn catch_up(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.status != TimerStatus::Running {
            return None;
        }
        let Some(last) = self.last_tick_at else {
            self.last_tick_at = Some(now);
            return None;
        };
        let gap = (now - last).num_seconds();
        if gap <= 0 {
            return None;
        }
        self.elapse(gap as u64, last + Duration::seconds(gap))
    }

    /// Restart the tick clock at `now`, discarding any elapsed gap.
    pub(crate) fn rebase(&mut self, now: DateTime<Utc>) {
        if self.status == TimerStatus::Running {
            self.last_tick_at = Some(now);
        }
    }

    /// Demote a running timer to paused without emitting an event.
    pub(crate) fn suspend(&mut self) {
        if self.status == TimerStatus::Running {
            self.set_status(TimerStatus::Paused);
            self.last_tick_at = None;
        }
    }

    /// Repair a record read from storage.
    ///
    /// Clamps `remaining` into `[0, duration]` and re-derives `running` from
    /// `status`. Returns `false` when the record cannot be kept in the active
    /// set: zero duration, or a countdown that already reached zero.
    pub(crate) fn normalize(&mut self) -> bool {
        if self.duration == 0 || self.status == TimerStatus::Completed {
            return false;
        }
        self.remaining = self.remaining.min(self.duration);
        self.running = self.status == TimerStatus::Running;
        if !self.running {
            self.last_tick_at = None;
        }
        self.remaining > 0
    }

    fn set_status(&mut self, status: TimerStatus) {
        self.status = status;
        self.running = status == TimerStatus::Running;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(duration: u64) -> Timer {
        Timer::new("t1", NewTimer::validate("Tea", duration, "Kitchen").unwrap())
    }

    #[test]
    fn new_timer_is_paused_and_full() {
        let t = timer(5);
        assert_eq!(t.status(), TimerStatus::Paused);
        assert_eq!(t.remaining_secs(), 5);
        assert!(!t.running);
        assert_eq!(t.remaining_ratio(), 1.0);
    }

    #[test]
    fn start_pause_start() {
        let now = Utc::now();
        let mut t = timer(5);
        assert!(t.start(now).unwrap().is_some());
        assert!(t.is_running());
        assert!(t.running);

        assert!(t.pause(now).is_some());
        assert_eq!(t.status(), TimerStatus::Paused);
        assert!(!t.running);

        assert!(t.start(now).unwrap().is_some());
        assert!(t.is_running());
    }

    #[test]
    fn start_twice_is_noop() {
        let now = Utc::now();
        let mut t = timer(5);
        t.start(now).unwrap();
        assert!(t.start(now).unwrap().is_none());
        assert!(t.is_running());
    }

    #[test]
    fn pause_twice_is_noop() {
        let now = Utc::now();
        let mut t = timer(5);
        t.start(now).unwrap();
        t.tick(now);
        t.pause(now);
        let once = t.clone();
        assert!(t.pause(now).is_none());
        assert_eq!(t, once);
    }

    #[test]
    fn tick_on_paused_timer_is_noop() {
        let mut t = timer(5);
        assert!(t.tick(Utc::now()).is_none());
        assert_eq!(t.remaining_secs(), 5);
        assert_eq!(t.status(), TimerStatus::Paused);
    }

    #[test]
    fn ticks_down_to_completion() {
        let now = Utc::now();
        let mut t = timer(3);
        t.start(now).unwrap();
        assert!(t.tick(now).is_none());
        assert!(t.tick(now).is_none());
        match t.tick(now) {
            Some(Event::TimerCompleted { id, name, .. }) => {
                assert_eq!(id, "t1");
                assert_eq!(name, "Tea");
            }
            other => panic!("Expected TimerCompleted, got {other:?}"),
        }
        assert_eq!(t.remaining_secs(), 0);
        assert!(t.is_completed());
        assert!(!t.running);

        // Completion happens once.
        assert!(t.tick(now).is_none());
        assert_eq!(t.remaining_secs(), 0);
    }

    #[test]
    fn completed_timer_cannot_start() {
        let now = Utc::now();
        let mut t = timer(1);
        t.start(now).unwrap();
        t.tick(now);
        let err = t.start(now).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { action: "start", .. }));
    }

    #[test]
    fn reset_restores_duration_from_any_status() {
        let now = Utc::now();
        let mut t = timer(4);
        t.start(now).unwrap();
        t.tick(now);
        t.tick(now);
        assert!(t.reset(now).is_some());
        assert_eq!(t.remaining_secs(), 4);
        assert_eq!(t.status(), TimerStatus::Paused);
        assert!(t.last_tick_at().is_none());

        t.start(now).unwrap();
        for _ in 0..4 {
            t.tick(now);
        }
        assert!(t.is_completed());
        t.reset(now);
        assert_eq!(t.status(), TimerStatus::Paused);
        assert_eq!(t.remaining_secs(), 4);
    }

    #[test]
    fn elapse_clamps_at_zero() {
        let now = Utc::now();
        let mut t = timer(10);
        t.start(now).unwrap();
        assert!(t.elapse(4, now + Duration::seconds(4)).is_none());
        assert_eq!(t.remaining_secs(), 6);
        assert!(t.elapse(60, now + Duration::seconds(64)).is_some());
        assert_eq!(t.remaining_secs(), 0);
        assert!(t.is_completed());
    }

    #[test]
    fn catch_up_keeps_the_sub_second_remainder() {
        let t0 = Utc::now();
        let mut t = timer(100);
        t.start(t0).unwrap();
        for k in 1..=10 {
            t.catch_up(t0 + Duration::milliseconds(1900 * k));
        }
        assert_eq!(t.remaining_secs(), 81);
        assert_eq!(t.last_tick_at(), Some(t0 + Duration::seconds(19)));
    }

    #[test]
    fn catch_up_ignores_paused_and_future_clocks() {
        let now = Utc::now();
        let mut t = timer(10);
        assert!(t.catch_up(now + Duration::seconds(5)).is_none());
        assert_eq!(t.remaining_secs(), 10);

        t.start(now).unwrap();
        assert!(t.catch_up(now - Duration::seconds(3)).is_none());
        assert_eq!(t.remaining_secs(), 10);
        assert!(t.catch_up(now + Duration::seconds(12)).is_some());
        assert!(t.is_completed());
    }

    #[test]
    fn validate_rejects_bad_input() {
        assert_eq!(
            NewTimer::validate("", 10, "X").unwrap_err(),
            ValidationError::EmptyField { field: "name" }
        );
        assert_eq!(
            NewTimer::validate("Tea", 10, "   ").unwrap_err(),
            ValidationError::EmptyField { field: "category" }
        );
        assert_eq!(
            NewTimer::validate("Tea", 0, "X").unwrap_err(),
            ValidationError::NonPositiveDuration
        );
        assert!(matches!(
            NewTimer::validate("Tea", MAX_DURATION_SECS + 1, "X").unwrap_err(),
            ValidationError::DurationTooLong { .. }
        ));
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            NewTimer::validate(&long, 10, "X").unwrap_err(),
            ValidationError::NameTooLong { .. }
        ));
    }

    #[test]
    fn validate_trims_whitespace() {
        let input = NewTimer::validate("  Tea ", 5, " Kitchen").unwrap();
        assert_eq!(input.name, "Tea");
        assert_eq!(input.category, "Kitchen");
    }

    #[test]
    fn serializes_with_persisted_field_names() {
        let json = serde_json::to_value(timer(5)).unwrap();
        assert_eq!(json["id"], "t1");
        assert_eq!(json["duration"], 5);
        assert_eq!(json["remaining"], 5);
        assert_eq!(json["status"], "Paused");
        assert_eq!(json["running"], false);
        assert!(json.get("lastTickAt").is_none());
    }

    #[test]
    fn deserializes_legacy_record() {
        let json = r#"{"id":"1700000000000","name":"Tea","duration":60,"remaining":60,
            "category":"Kitchen","status":"Paused","running":false}"#;
        let t: Timer = serde_json::from_str(json).unwrap();
        assert_eq!(t.id(), "1700000000000");
        assert_eq!(t.remaining_secs(), 60);
        assert!(t.last_tick_at().is_none());
    }

    #[test]
    fn normalize_repairs_and_rejects() {
        let json = r#"{"id":"a","name":"Tea","duration":60,"remaining":90,
            "category":"Kitchen","status":"Running","running":false}"#;
        let mut t: Timer = serde_json::from_str(json).unwrap();
        assert!(t.normalize());
        assert_eq!(t.remaining_secs(), 60);
        assert!(t.running);

        let json = r#"{"id":"b","name":"Tea","duration":60,"remaining":0,
            "category":"Kitchen","status":"Paused","running":false}"#;
        let mut t: Timer = serde_json::from_str(json).unwrap();
        assert!(!t.normalize());

        let json = r#"{"id":"c","name":"Tea","duration":0,"remaining":0,
            "category":"Kitchen","status":"Paused","running":false}"#;
        let mut t: Timer = serde_json::from_str(json).unwrap();
        assert!(!t.normalize());
    }
}
