use chrono::Utc;
use clap::Subcommand;
use countroom_core::timer::{format_hms, from_hms, parse_duration, BLINK_INTERVAL, TICK_INTERVAL};
use countroom_core::{BlinkBoard, CoreError, Event, KeyValueStore, Timer, TimerRegistry};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::warn;

use super::{open_registry, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Create a new timer
    Create {
        /// Display name
        name: String,
        /// Grouping label
        #[arg(long, short)]
        category: String,
        /// Duration: 90, 45s, 5m, 1h30m or 01:30:00
        #[arg(long, short, conflicts_with_all = ["hours", "minutes", "seconds"])]
        duration: Option<String>,
        #[arg(long)]
        hours: Option<u64>,
        #[arg(long)]
        minutes: Option<u64>,
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// List active timers grouped by category
    List {
        /// Print the raw timer records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start (or continue) counting down
    Start { id: String },
    /// Pause a running timer
    Pause { id: String },
    /// Restore the full duration and pause
    Reset { id: String },
    /// Remove a timer without recording it in history
    Delete { id: String },
    /// Print one timer's state as JSON
    Status { id: String },
    /// Tick running timers in the foreground until they finish or Ctrl-C
    Watch,
}

/// Resolve a full id or a unique id prefix.
///
/// Returns the input unchanged when nothing matches, so no-op commands stay
/// no-ops.
fn resolve_id<S: KeyValueStore>(registry: &TimerRegistry<S>, input: &str) -> CliResult<String> {
    if registry.get(input).is_some() {
        return Ok(input.to_string());
    }
    let matches: Vec<&Timer> = registry
        .timers()
        .iter()
        .filter(|t| t.id().starts_with(input))
        .collect();
    match matches.as_slice() {
        [one] => Ok(one.id().to_string()),
        [] => Ok(input.to_string()),
        _ => Err(format!("id prefix '{input}' matches {} timers", matches.len()).into()),
    }
}

fn print_event<S: KeyValueStore>(
    registry: &TimerRegistry<S>,
    id: &str,
    event: Option<Event>,
) -> CliResult {
    let event = match event {
        Some(e) => e,
        None => match registry.get(id) {
            Some(timer) => Event::snapshot(timer, registry.thresholds(), Utc::now()),
            None => {
                eprintln!("no timer with id {id}, nothing to do");
                return Ok(());
            }
        },
    };
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

fn duration_secs(
    duration: Option<String>,
    hours: Option<u64>,
    minutes: Option<u64>,
    seconds: Option<u64>,
) -> CliResult<u64> {
    if let Some(spec) = duration {
        return Ok(parse_duration(&spec)?);
    }
    if hours.is_none() && minutes.is_none() && seconds.is_none() {
        return Err("provide --duration or any of --hours/--minutes/--seconds".into());
    }
    Ok(from_hms(
        hours.unwrap_or(0),
        minutes.unwrap_or(0),
        seconds.unwrap_or(0),
    )?)
}

fn list(registry: &TimerRegistry<impl KeyValueStore>) {
    if registry.timers().is_empty() {
        println!("No active timers.");
        return;
    }
    for (category, timers) in registry.grouped_by_category() {
        println!("{category}");
        for timer in timers {
            let urgency = registry.thresholds().classify_timer(timer);
            println!(
                "  {}  {:<24} {}  {:<8} {:?}",
                timer.id().chars().take(8).collect::<String>(),
                timer.name(),
                format_hms(timer.remaining_secs()),
                urgency.as_str(),
                timer.status(),
            );
        }
    }
}

fn status_line<S: KeyValueStore>(registry: &TimerRegistry<S>, blink: &BlinkBoard) -> String {
    registry
        .timers()
        .iter()
        .filter(|t| t.is_running())
        .map(|t| {
            let feedback = blink.feedback(t, registry.thresholds());
            let marker = if feedback.blink_on { " !" } else { "" };
            format!(
                "{} {} {}{}",
                t.name(),
                format_hms(t.remaining_secs()),
                feedback.urgency.as_str(),
                marker
            )
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

async fn watch<S: KeyValueStore>(registry: &mut TimerRegistry<S>) -> CliResult {
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    // Blink beats land halfway between countdown ticks.
    let mut blinker = tokio::time::interval_at(Instant::now() + BLINK_INTERVAL / 2, BLINK_INTERVAL);
    blinker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut blink = BlinkBoard::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    if !registry.has_running() {
        println!("No running timers.");
        return Ok(());
    }
    println!("{}", status_line(registry, &blink));

    while registry.has_running() {
        tokio::select! {
            _ = ticker.tick() => {
                // Re-read the store so commands run in other terminals are
                // adopted rather than overwritten.
                let report = registry.sync()?;
                for e in &report.persistence_errors {
                    warn!(error = %e, "tick not persisted");
                }
            }
            _ = blinker.tick() => {
                blink.pulse(registry.timers(), registry.thresholds());
                println!("{}", status_line(registry, &blink));
            }
            _ = &mut ctrl_c => {
                println!();
                println!("Stopped watching; running timers stay running.");
                return Ok(());
            }
        }
    }
    println!("All timers finished.");
    Ok(())
}

pub fn run(action: TimerAction) -> CliResult {
    let mut registry = open_registry()?;

    match action {
        TimerAction::Create {
            name,
            category,
            duration,
            hours,
            minutes,
            seconds,
        } => {
            let secs = duration_secs(duration, hours, minutes, seconds)?;
            let timer = registry.create(&name, secs, &category)?;
            let event = Event::TimerCreated {
                id: timer.id().to_string(),
                name: timer.name().to_string(),
                category: timer.category().to_string(),
                duration_secs: timer.duration_secs(),
                at: Utc::now(),
            };
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        TimerAction::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(registry.timers())?);
            } else {
                list(&registry);
            }
        }
        TimerAction::Start { id } => {
            let id = resolve_id(&registry, &id)?;
            let event = registry.start(&id)?;
            print_event(&registry, &id, event)?;
        }
        TimerAction::Pause { id } => {
            let id = resolve_id(&registry, &id)?;
            let event = registry.pause(&id)?;
            print_event(&registry, &id, event)?;
        }
        TimerAction::Reset { id } => {
            let id = resolve_id(&registry, &id)?;
            let event = registry.reset(&id)?;
            print_event(&registry, &id, event)?;
        }
        TimerAction::Delete { id } => {
            let id = resolve_id(&registry, &id)?;
            let event = registry.delete(&id)?;
            print_event(&registry, &id, event)?;
        }
        TimerAction::Status { id } => {
            let id = resolve_id(&registry, &id)?;
            let timer = registry.get(&id).ok_or(CoreError::NotFound(id.clone()))?;
            let snapshot = Event::snapshot(timer, registry.thresholds(), Utc::now());
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        TimerAction::Watch => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(watch(&mut registry))?;
        }
    }
    Ok(())
}
