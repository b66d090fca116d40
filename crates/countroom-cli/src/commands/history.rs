use clap::Subcommand;

use super::{open_registry, CliResult};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List completed timers, oldest first
    List {
        /// Print the raw history entries as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: HistoryAction) -> CliResult {
    let registry = open_registry()?;

    match action {
        HistoryAction::List { json } => {
            let history = registry.history();
            if json {
                println!("{}", serde_json::to_string_pretty(history)?);
            } else if history.is_empty() {
                println!("No completed timers yet.");
            } else {
                for entry in history {
                    println!("{}  completed at {}", entry.name, entry.completion_time);
                }
            }
        }
    }
    Ok(())
}
