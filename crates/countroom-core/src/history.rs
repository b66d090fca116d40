//! Completion history.
//!
//! Entries are appended once per completed timer and never edited.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Default `completionTime` layout, local time.
pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub name: String,
    pub completion_time: String,
}

impl HistoryEntry {
    /// Stamp a completion with the local rendering of `at`.
    ///
    /// Falls back to RFC 3339 if `time_format` cannot be rendered.
    pub fn new(name: impl Into<String>, at: DateTime<Utc>, time_format: &str) -> Self {
        let local = at.with_timezone(&Local);
        let mut completion_time = String::new();
        if write!(completion_time, "{}", local.format(time_format)).is_err() {
            completion_time = local.to_rfc3339();
        }
        Self {
            name: name.into(),
            completion_time,
        }
    }
}

/// Whether `format` is a strftime layout chrono can render.
pub fn is_valid_time_format(format: &str) -> bool {
    !format.is_empty() && StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_with_persisted_field_names() {
        let entry = HistoryEntry {
            name: "Tea".into(),
            completion_time: "2024-05-01 10:00:00".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["name"], "Tea");
        assert_eq!(json["completionTime"], "2024-05-01 10:00:00");
    }

    #[test]
    fn formats_completion_time() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let entry = HistoryEntry::new("Tea", at, "%Y");
        assert_eq!(entry.name, "Tea");
        assert_eq!(entry.completion_time, "2024");
    }

    #[test]
    fn bad_format_falls_back_to_rfc3339() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert!(!is_valid_time_format("%Q"));
        let entry = HistoryEntry::new("Tea", at, "%Q");
        assert!(DateTime::parse_from_rfc3339(&entry.completion_time).is_ok());
    }

    #[test]
    fn validates_time_formats() {
        assert!(is_valid_time_format(DEFAULT_TIME_FORMAT));
        assert!(is_valid_time_format("%c"));
        assert!(!is_valid_time_format(""));
    }

    #[test]
    fn reads_original_locale_strings() {
        let json = r#"[{"name":"Tea","completionTime":"5/1/2024, 10:00:00 AM"}]"#;
        let entries: Vec<HistoryEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries[0].completion_time, "5/1/2024, 10:00:00 AM");
    }
}
