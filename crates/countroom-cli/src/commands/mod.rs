pub mod config;
pub mod history;
pub mod timer;

use countroom_core::{Completion, Config, SqliteStore, TimerRegistry};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Load config, open the store and rebuild the registry.
///
/// Completion notices (including timers that finished while the app was
/// closed) go to stderr when notifications are enabled.
pub fn open_registry() -> CliResult<TimerRegistry<SqliteStore>> {
    let config = Config::load()?;
    let store = SqliteStore::open()?;
    let mut registry = TimerRegistry::new(store, config.registry_settings());

    if config.notifications.enabled {
        registry.subscribe(|completion: &Completion| eprintln!("{}", completion.notice()));
    }
    registry.load_all()?;
    Ok(registry)
}
