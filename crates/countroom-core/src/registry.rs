//! Timer registry.
//!
//! Owns the active set of timers, the completion history and the shared
//! [`TickDriver`]. Every mutating operation writes the full affected
//! collection back to the [`KeyValueStore`] right after the in-memory change.
//!
//! ## Persistence failures
//!
//! A failed write never rolls back the in-memory mutation. The operation
//! reports [`CoreError::Persistence`] and the next successful write brings
//! the store back in line.
//!
//! ## Usage
//!
//! ```ignore
//! let mut registry = TimerRegistry::new(SqliteStore::open()?, config.registry_settings());
//! registry.load_all()?;
//! let tea = registry.create("Tea", 300, "Kitchen")?;
//! registry.start(tea.id())?;
//! // Once per second:
//! let report = registry.advance();
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CoreError, PersistenceError, Result};
use crate::events::{Completion, Event};
use crate::history::{HistoryEntry, DEFAULT_TIME_FORMAT};
use crate::storage::store::{load_json, save_json, KeyValueStore, HISTORY_KEY, TIMERS_KEY};
use crate::timer::{
    BlinkBoard, Feedback, NewTimer, TickDriver, Timer, Urgency, UrgencyThresholds,
};

/// Category label for legacy records stored without one.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// How `load_all` treats timers that were `Running` when last persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaunchPolicy {
    /// Subtract the wall-clock time since the last tick, then keep running.
    #[default]
    CatchUp,
    /// Keep running from the stored remaining time, ignoring the gap.
    /// The tick clock restarts at load time.
    Resume,
    /// Reclassify as `Paused`.
    Pause,
}

/// Behavioural knobs, usually derived from [`crate::Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrySettings {
    pub start_on_create: bool,
    pub on_relaunch: RelaunchPolicy,
    pub thresholds: UrgencyThresholds,
    pub time_format: String,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            start_on_create: false,
            on_relaunch: RelaunchPolicy::default(),
            thresholds: UrgencyThresholds::default(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

/// Outcome of one tick dispatch.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Number of timers that received the tick.
    pub ticked: usize,
    pub completions: Vec<Completion>,
    pub persistence_errors: Vec<PersistenceError>,
}

impl TickReport {
    pub fn is_clean(&self) -> bool {
        self.persistence_errors.is_empty()
    }
}

type CompletionCallback = Box<dyn FnMut(&Completion)>;

pub struct TimerRegistry<S: KeyValueStore> {
    store: S,
    settings: RegistrySettings,
    timers: Vec<Timer>,
    history: Vec<HistoryEntry>,
    driver: TickDriver,
    subscribers: Vec<CompletionCallback>,
}

impl<S: KeyValueStore> TimerRegistry<S> {
    /// An empty registry. Call [`TimerRegistry::load_all`] to pick up stored state.
    pub fn new(store: S, settings: RegistrySettings) -> Self {
        Self {
            store,
            settings,
            timers: Vec::new(),
            history: Vec::new(),
            driver: TickDriver::new(),
            subscribers: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Active timers in insertion order.
    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    pub fn get(&self, id: &str) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id() == id)
    }

    /// Completion history in append order.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn settings(&self) -> &RegistrySettings {
        &self.settings
    }

    pub fn thresholds(&self) -> &UrgencyThresholds {
        &self.settings.thresholds
    }

    pub fn urgency(&self, id: &str) -> Option<Urgency> {
        self.get(id).map(|t| self.settings.thresholds.classify_timer(t))
    }

    /// Presentation snapshot for one timer, blink phase taken from `blink`.
    pub fn feedback(&self, id: &str, blink: &BlinkBoard) -> Option<Feedback> {
        self.get(id)
            .map(|t| blink.feedback(t, &self.settings.thresholds))
    }

    /// Timers currently receiving ticks.
    pub fn running_count(&self) -> usize {
        self.driver.len()
    }

    pub fn has_running(&self) -> bool {
        !self.driver.is_empty()
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.driver.is_scheduled(id)
    }

    /// Timers grouped by category, groups in order of first appearance.
    pub fn grouped_by_category(&self) -> IndexMap<&str, Vec<&Timer>> {
        let mut groups: IndexMap<&str, Vec<&Timer>> = IndexMap::new();
        for timer in &self.timers {
            let category = if timer.category().trim().is_empty() {
                UNCATEGORIZED
            } else {
                timer.category()
            };
            groups.entry(category).or_default().push(timer);
        }
        groups
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // ── Subscriptions ────────────────────────────────────────────────

    /// Register a callback invoked once per completed timer, after its
    /// history entry has been recorded.
    pub fn subscribe(&mut self, callback: impl FnMut(&Completion) + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Validate input and add a new timer to the end of the active set.
    ///
    /// # Errors
    /// [`CoreError::Validation`] leaves everything untouched.
    /// [`CoreError::Persistence`] means the timer was added but not saved.
    pub fn create(&mut self, name: &str, duration_secs: u64, category: &str) -> Result<Timer> {
        self.create_at(name, duration_secs, category, Utc::now())
    }

    pub fn create_at(
        &mut self,
        name: &str,
        duration_secs: u64,
        category: &str,
        now: DateTime<Utc>,
    ) -> Result<Timer> {
        let input = NewTimer::validate(name, duration_secs, category)?;
        let mut timer = Timer::new(Uuid::new_v4().to_string(), input);
        if self.settings.start_on_create {
            timer.start(now)?;
            self.driver.schedule(timer.id());
        }
        info!(id = timer.id(), name = timer.name(), duration_secs, "timer created");

        self.timers.push(timer.clone());
        self.persist_timers()?;
        Ok(timer)
    }

    /// Start counting down. A running timer is left alone.
    ///
    /// # Errors
    /// [`CoreError::NotFound`] for an unknown id, [`CoreError::Persistence`]
    /// if the started state could not be saved.
    pub fn start(&mut self, id: &str) -> Result<Option<Event>> {
        self.start_at(id, Utc::now())
    }

    pub fn start_at(&mut self, id: &str, now: DateTime<Utc>) -> Result<Option<Event>> {
        let timer = self
            .timers
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        let event = timer.start(now)?;
        if event.is_none() {
            return Ok(None);
        }
        self.driver.schedule(id);
        debug!(id, "timer started");
        self.persist_timers()?;
        Ok(event)
    }

    /// Stop counting down. Unknown ids and paused timers are a no-op.
    ///
    /// # Errors
    /// [`CoreError::Persistence`] if the paused state could not be saved.
    pub fn pause(&mut self, id: &str) -> Result<Option<Event>> {
        self.pause_at(id, Utc::now())
    }

    pub fn pause_at(&mut self, id: &str, now: DateTime<Utc>) -> Result<Option<Event>> {
        self.driver.cancel(id);
        let Some(timer) = self.timers.iter_mut().find(|t| t.id() == id) else {
            debug!(id, "pause ignored, timer not found");
            return Ok(None);
        };
        let event = timer.pause(now);
        if event.is_none() {
            return Ok(None);
        }
        debug!(id, "timer paused");
        self.persist_timers()?;
        Ok(event)
    }

    /// Restore a timer's full duration and pause it. Unknown ids are a no-op.
    ///
    /// # Errors
    /// [`CoreError::Persistence`] if the reset state could not be saved.
    pub fn reset(&mut self, id: &str) -> Result<Option<Event>> {
        self.reset_at(id, Utc::now())
    }

    pub fn reset_at(&mut self, id: &str, now: DateTime<Utc>) -> Result<Option<Event>> {
        self.driver.cancel(id);
        let Some(timer) = self.timers.iter_mut().find(|t| t.id() == id) else {
            debug!(id, "reset ignored, timer not found");
            return Ok(None);
        };
        let event = timer.reset(now);
        debug!(id, "timer reset");
        self.persist_timers()?;
        Ok(event)
    }

    /// Remove a timer from the active set. Unknown ids are a no-op.
    ///
    /// # Errors
    /// [`CoreError::Persistence`] if the shrunk set could not be saved.
    pub fn delete(&mut self, id: &str) -> Result<Option<Event>> {
        self.delete_at(id, Utc::now())
    }

    pub fn delete_at(&mut self, id: &str, now: DateTime<Utc>) -> Result<Option<Event>> {
        self.driver.cancel(id);
        let Some(index) = self.timers.iter().position(|t| t.id() == id) else {
            debug!(id, "delete ignored, timer not found");
            return Ok(None);
        };
        let removed = self.timers.remove(index);
        info!(id, name = removed.name(), "timer deleted");
        self.persist_timers()?;
        Ok(Some(Event::TimerDeleted {
            id: id.to_string(),
            at: now,
        }))
    }

    /// Deliver one tick to every scheduled timer, in active-set order.
    pub fn advance(&mut self) -> TickReport {
        self.advance_at(Utc::now())
    }

    pub fn advance_at(&mut self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        let mut completed = Vec::new();

        for timer in &mut self.timers {
            if !self.driver.is_scheduled(timer.id()) {
                continue;
            }
            report.ticked += 1;
            if timer.tick(now).is_some() {
                self.driver.cancel(timer.id());
                completed.push(timer.id().to_string());
            }
        }

        if report.ticked == 0 {
            return report;
        }
        if completed.is_empty() {
            if let Err(e) = self.persist_timers() {
                report.persistence_errors.push(e);
            }
            return report;
        }
        for id in completed {
            if let Some(completion) =
                self.on_completed(&id, now, &mut report.persistence_errors)
            {
                report.completions.push(completion);
            }
        }
        report
    }

    /// Rebuild the active set and history from the store.
    ///
    /// Running timers follow [`RegistrySettings::on_relaunch`]. Records that
    /// cannot be kept (zero duration, already at zero, repeated id) are
    /// dropped.
    ///
    /// # Errors
    /// [`CoreError::Persistence`] if either collection cannot be read or is
    /// corrupt. In that case the registry is left empty.
    pub fn load_all(&mut self) -> Result<Vec<Timer>> {
        self.load_all_at(Utc::now())
    }

    pub fn load_all_at(&mut self, now: DateTime<Utc>) -> Result<Vec<Timer>> {
        let report = self.reload_at(self.settings.on_relaunch, now)?;
        info!(
            loaded = self.timers.len(),
            running = self.driver.len(),
            caught_up = report.completions.len(),
            policy = ?self.settings.on_relaunch,
            "timers loaded"
        );
        if let Some(e) = report.persistence_errors.into_iter().next() {
            return Err(e.into());
        }
        Ok(self.timers.clone())
    }

    /// Re-read the store, then apply the wall-clock seconds since each
    /// running timer's last tick.
    ///
    /// This is the dispatch for a long-lived process that shares the store
    /// with other processes: their creates, pauses and deletes are adopted
    /// instead of being overwritten. Nothing is written unless a countdown
    /// moved or a record was repaired.
    ///
    /// # Errors
    /// [`CoreError::Persistence`] if either collection cannot be read or is
    /// corrupt. Write failures are collected in the report.
    pub fn sync(&mut self) -> Result<TickReport> {
        self.sync_at(Utc::now())
    }

    pub fn sync_at(&mut self, now: DateTime<Utc>) -> Result<TickReport> {
        self.reload_at(RelaunchPolicy::CatchUp, now)
    }

    /// Re-read only the completion history, leaving the active set alone.
    ///
    /// # Errors
    /// [`CoreError::Persistence`] if the history cannot be read or is corrupt.
    pub fn load_history(&mut self) -> Result<&[HistoryEntry]> {
        self.history = load_json(&self.store, HISTORY_KEY)?.unwrap_or_default();
        Ok(&self.history)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reload_at(&mut self, policy: RelaunchPolicy, now: DateTime<Utc>) -> Result<TickReport> {
        self.driver.clear();
        self.timers.clear();
        self.history.clear();

        let history = load_json(&self.store, HISTORY_KEY)?.unwrap_or_default();
        let stored: Vec<Timer> = load_json(&self.store, TIMERS_KEY)?.unwrap_or_default();
        self.history = history;

        let mut report = TickReport::default();
        let mut seen = HashSet::new();
        let mut changed = false;
        let mut caught_up = Vec::new();

        for mut timer in stored {
            if !seen.insert(timer.id().to_string()) {
                warn!(id = timer.id(), "dropping stored timer with duplicate id");
                changed = true;
                continue;
            }
            let before = timer.clone();
            if !timer.normalize() {
                warn!(id = timer.id(), "dropping stored timer that cannot run");
                changed = true;
                continue;
            }
            if timer.is_running() {
                match policy {
                    RelaunchPolicy::Pause => timer.suspend(),
                    RelaunchPolicy::Resume => timer.rebase(now),
                    RelaunchPolicy::CatchUp => {
                        report.ticked += 1;
                        if timer.catch_up(now).is_some() {
                            caught_up.push(timer.id().to_string());
                        }
                    }
                }
            }
            if timer.is_running() {
                self.driver.schedule(timer.id());
            }
            changed |= timer != before;
            self.timers.push(timer);
        }
        debug!(
            kept = self.timers.len(),
            running = self.driver.len(),
            completed = caught_up.len(),
            "store reloaded"
        );

        for id in &caught_up {
            if let Some(completion) = self.on_completed(id, now, &mut report.persistence_errors) {
                report.completions.push(completion);
            }
        }
        if changed && caught_up.is_empty() {
            if let Err(e) = self.persist_timers() {
                report.persistence_errors.push(e);
            }
        }
        Ok(report)
    }

    /// Record a completion: history first, then drop the timer from the
    /// active set, then notify subscribers.
    fn on_completed(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
        errors: &mut Vec<PersistenceError>,
    ) -> Option<Completion> {
        let index = self.timers.iter().position(|t| t.id() == id)?;
        self.driver.cancel(id);

        let entry = HistoryEntry::new(self.timers[index].name(), now, &self.settings.time_format);
        self.history.push(entry.clone());
        if let Err(e) = self.persist_history() {
            errors.push(e);
        }

        let timer = self.timers.remove(index);
        if let Err(e) = self.persist_timers() {
            errors.push(e);
        }
        info!(id, name = timer.name(), completion_time = %entry.completion_time, "timer completed");

        let completion = Completion { timer, entry };
        for callback in &mut self.subscribers {
            callback(&completion);
        }
        Some(completion)
    }

    fn persist_timers(&mut self) -> Result<(), PersistenceError> {
        save_json(&mut self.store, TIMERS_KEY, &self.timers).map_err(|e| {
            warn!(error = %e, "failed to persist active timers");
            e
        })
    }

    fn persist_history(&mut self) -> Result<(), PersistenceError> {
        save_json(&mut self.store, HISTORY_KEY, &self.history).map_err(|e| {
            warn!(error = %e, "failed to persist history");
            e
        })
    }
}
