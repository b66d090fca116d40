//! # Countroom Core Library
//!
//! This library provides the timer lifecycle engine for Countroom, a
//! multi-timer countdown tool. The `countroom` CLI binary is a thin view
//! layer over the same core library.
//!
//! ## Architecture
//!
//! - **Timer State Machine**: per-timer `Paused -> Running -> Completed`
//!   transitions; the caller supplies ticks and wall-clock time
//! - **Tick Driver**: one shared 1-second dispatch keyed by timer id
//! - **Urgency Policy**: remaining-ratio thresholds plus presentation-only
//!   blink state
//! - **Registry**: owns the active set, records completion history and
//!   persists on every mutation
//! - **Storage**: key-value blob stores (SQLite, in-memory) and TOML configuration
//!
//! ## Key Components
//!
//! - [`Timer`]: Countdown state machine and persisted record
//! - [`TimerRegistry`]: Active set, history and persistence contract
//! - [`UrgencyThresholds`]: Ratio to urgency classification
//! - [`KeyValueStore`]: Persistence seam
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod history;
pub mod registry;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, PersistenceError, ValidationError};
pub use events::{Completion, Event};
pub use history::HistoryEntry;
pub use registry::{RegistrySettings, RelaunchPolicy, TickReport, TimerRegistry};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
pub use timer::{
    BlinkBoard, Color, Feedback, NewTimer, TickDriver, Timer, TimerStatus, Urgency,
    UrgencyThresholds,
};
