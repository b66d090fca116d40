//! Property tests for timer invariants under random command sequences.

use std::cell::Cell;
use std::rc::Rc;

use countroom_core::{Completion, MemoryStore, RegistrySettings, TimerRegistry, TimerStatus};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Action {
    Start(usize),
    Pause(usize),
    Reset(usize),
    Delete(usize),
    Tick,
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0..3usize).prop_map(Action::Start),
        (0..3usize).prop_map(Action::Pause),
        (0..3usize).prop_map(Action::Reset),
        (0..3usize).prop_map(Action::Delete),
        Just(Action::Tick),
        Just(Action::Tick),
        Just(Action::Tick),
    ]
}

fn allowed(from: TimerStatus, to: TimerStatus) -> bool {
    use TimerStatus::*;
    matches!(
        (from, to),
        (Paused, Paused) | (Paused, Running) | (Running, Running) | (Running, Paused) | (Running, Completed)
    )
}

proptest! {
    #[test]
    fn remaining_stays_in_bounds_and_transitions_follow_edges(
        durations in prop::collection::vec(1u64..8, 3),
        actions in prop::collection::vec(action(), 0..80),
    ) {
        let mut reg = TimerRegistry::new(MemoryStore::new(), RegistrySettings::default());
        let completed = Rc::new(Cell::new(0usize));
        let counter = Rc::clone(&completed);
        reg.subscribe(move |_: &Completion| counter.set(counter.get() + 1));

        let ids: Vec<String> = durations
            .iter()
            .enumerate()
            .map(|(i, d)| reg.create(&format!("T{i}"), *d, "Prop").unwrap().id().to_string())
            .collect();

        for action in actions {
            let before: Vec<_> = reg.timers().iter().map(|t| (t.id().to_string(), t.status())).collect();
            match action {
                Action::Start(i) => { let _ = reg.start(&ids[i]); }
                Action::Pause(i) => { reg.pause(&ids[i]).unwrap(); }
                Action::Reset(i) => { reg.reset(&ids[i]).unwrap(); }
                Action::Delete(i) => { reg.delete(&ids[i]).unwrap(); }
                Action::Tick => {
                    let report = reg.advance();
                    for c in &report.completions {
                        prop_assert_eq!(c.timer.status(), TimerStatus::Completed);
                        prop_assert_eq!(c.timer.remaining_secs(), 0);
                    }
                }
            }

            for timer in reg.timers() {
                prop_assert!(timer.remaining_secs() <= timer.duration_secs());
                prop_assert!(timer.remaining_secs() > 0);
                prop_assert!(timer.status() != TimerStatus::Completed);
                prop_assert_eq!(timer.is_running(), reg.is_scheduled(timer.id()));
                if let Some((_, from)) = before.iter().find(|(id, _)| id == timer.id()) {
                    prop_assert!(allowed(*from, timer.status()));
                }
            }
        }

        // One history entry per completion, never more.
        prop_assert_eq!(reg.history().len(), completed.get());
        prop_assert!(completed.get() <= ids.len());
    }

    #[test]
    fn ticking_paused_timers_changes_nothing(duration in 1u64..100, ticks in 0usize..20) {
        let mut reg = TimerRegistry::new(MemoryStore::new(), RegistrySettings::default());
        let timer = reg.create("Idle", duration, "Prop").unwrap();
        for _ in 0..ticks {
            reg.advance();
        }
        prop_assert_eq!(reg.get(timer.id()).unwrap(), &timer);
    }
}
