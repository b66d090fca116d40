//! Urgency policy - visual feedback as a countdown runs low.
//!
//! ## Levels
//!
//! | Remaining ratio | Level | Background |
//! |-----------------|-------|------------|
//! | r > 0.7 | Calm | green |
//! | 0.4 < r ≤ 0.7 | Warning | yellow |
//! | r ≤ 0.4 | Critical | red / transparent, blinking |
//!
//! The level is a pure function of the ratio. The blink phase is presentation
//! state and lives in [`BlinkBoard`], never on the [`Timer`] record.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::machine::Timer;
use crate::error::ConfigError;

/// Cadence of [`BlinkBoard::pulse`], independent of the countdown tick.
pub const BLINK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Calm,
    Warning,
    Critical,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Urgency::Calm => "calm",
            Urgency::Warning => "warning",
            Urgency::Critical => "critical",
        }
    }

    /// Background colour; only `Critical` depends on the blink phase.
    pub fn background(self, blink_on: bool) -> Color {
        match self {
            Urgency::Calm => Color::Green,
            Urgency::Warning => Color::Yellow,
            Urgency::Critical if blink_on => Color::Red,
            Urgency::Critical => Color::Transparent,
        }
    }
}

/// Colours understood by any view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Green,
    Yellow,
    Red,
    Transparent,
    White,
    Black,
}

impl Color {
    /// Text colour that stays readable on this background.
    pub fn text_on(self) -> Color {
        match self {
            Color::Green => Color::White,
            _ => Color::Black,
        }
    }
}

/// Ratio boundaries between urgency levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrgencyThresholds {
    calm_above: f64,
    warning_above: f64,
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self {
            calm_above: 0.7,
            warning_above: 0.4,
        }
    }
}

impl UrgencyThresholds {
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] unless
    /// `0 <= warning_above < calm_above <= 1`.
    pub fn new(calm_above: f64, warning_above: f64) -> Result<Self, ConfigError> {
        let ordered = (0.0..=1.0).contains(&warning_above)
            && (0.0..=1.0).contains(&calm_above)
            && warning_above < calm_above;
        if !ordered {
            return Err(ConfigError::InvalidValue {
                key: "urgency".to_string(),
                message: format!(
                    "expected 0 <= warning_above < calm_above <= 1, got warning_above={warning_above}, calm_above={calm_above}"
                ),
            });
        }
        Ok(Self {
            calm_above,
            warning_above,
        })
    }

    pub fn calm_above(&self) -> f64 {
        self.calm_above
    }

    pub fn warning_above(&self) -> f64 {
        self.warning_above
    }

    pub fn classify(&self, ratio: f64) -> Urgency {
        if ratio > self.calm_above {
            Urgency::Calm
        } else if ratio > self.warning_above {
            Urgency::Warning
        } else {
            Urgency::Critical
        }
    }

    pub fn classify_timer(&self, timer: &Timer) -> Urgency {
        self.classify(timer.remaining_ratio())
    }
}

/// What a view layer needs to draw one timer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub urgency: Urgency,
    pub ratio: f64,
    pub blink_on: bool,
    pub background: Color,
    pub text: Color,
}

/// Blink phase per timer id.
///
/// A phase exists only while its timer is both `Running` and `Critical`.
/// [`BlinkBoard::pulse`] is driven on its own 1-second cadence and flips
/// every live phase.
#[derive(Debug, Default, Clone)]
pub struct BlinkBoard {
    phases: HashMap<String, bool>,
}

impl BlinkBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the cadence by one beat.
    ///
    /// Timers that just became critical join with the phase off; timers that
    /// left `Running` or `Critical`, or the active set, are dropped.
    pub fn pulse<'a>(
        &mut self,
        timers: impl IntoIterator<Item = &'a Timer>,
        thresholds: &UrgencyThresholds,
    ) {
        let mut next = HashMap::new();
        for timer in timers {
            if !timer.is_running() || thresholds.classify_timer(timer) != Urgency::Critical {
                continue;
            }
            let phase = match self.phases.get(timer.id()) {
                Some(on) => !on,
                None => false,
            };
            next.insert(timer.id().to_string(), phase);
        }
        self.phases = next;
    }

    /// Drop the phase for a timer that was paused, reset or deleted.
    pub fn forget(&mut self, id: &str) {
        self.phases.remove(id);
    }

    pub fn is_blinking(&self, id: &str) -> bool {
        self.phases.contains_key(id)
    }

    pub fn is_on(&self, id: &str) -> bool {
        self.phases.get(id).copied().unwrap_or(false)
    }

    pub fn feedback(&self, timer: &Timer, thresholds: &UrgencyThresholds) -> Feedback {
        let ratio = timer.remaining_ratio();
        let urgency = thresholds.classify(ratio);
        let blink_on = urgency == Urgency::Critical && self.is_on(timer.id());
        let background = urgency.background(blink_on);
        Feedback {
            urgency,
            ratio,
            blink_on,
            background,
            text: background.text_on(),
        }
    }
}
