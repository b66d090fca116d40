mod config;
pub mod store;

pub use config::{Config, HistoryConfig, NotificationsConfig, TimersConfig, UrgencyConfig};
pub use store::{KeyValueStore, MemoryStore, SqliteStore, HISTORY_KEY, TIMERS_KEY};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// `COUNTROOM_HOME` wins when set. Otherwise `~/.config/countroom[-dev]/`,
/// with the `-dev` suffix when `COUNTROOM_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("COUNTROOM_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("COUNTROOM_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("countroom-dev")
            } else {
                base_dir.join("countroom")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
