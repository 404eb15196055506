use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use serde::Serialize;

use habitloop_core::memory::{FixedClock, MemoryAlarms, RecordingNotifier};
use habitloop_core::{
    BackstopOutcome, DailyCompletionCheck, LifecycleEvent, OverdueEscalationScheduler,
    ReliabilityCoordinator, ReminderScheduler,
};

use crate::common::{resolve_now, HabitFile};

#[derive(Subcommand)]
pub enum ReplayAction {
    /// Simulate the post-reboot replay
    Boot {
        /// Habit file (TOML)
        #[arg(long)]
        habits: PathBuf,
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        now: Option<String>,
    },
    /// Simulate the clock/timezone-change replay
    TimeChange {
        /// Habit file (TOML)
        #[arg(long)]
        habits: PathBuf,
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        now: Option<String>,
    },
    /// Simulate the periodic backstop sweep
    Backstop {
        /// Habit file (TOML)
        #[arg(long)]
        habits: PathBuf,
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Serialize)]
struct ReplayReport {
    scheduled: usize,
    failed: usize,
    registrations: Vec<RegistrationRow>,
}

#[derive(Serialize)]
struct RegistrationRow {
    key: String,
    at: String,
    exact: bool,
}

struct Rig {
    alarms: Arc<MemoryAlarms>,
    coordinator: ReliabilityCoordinator,
}

fn build_rig(file: HabitFile, now: chrono::NaiveDateTime) -> Rig {
    let alarms = Arc::new(MemoryAlarms::new());
    let clock = Arc::new(FixedClock::at(now));
    let repo = file.into_repository();

    let reminders = Arc::new(ReminderScheduler::new(alarms.clone(), clock.clone()));
    let overdue = Arc::new(OverdueEscalationScheduler::new(alarms.clone(), clock.clone()));
    let daily = Arc::new(DailyCompletionCheck::new(
        alarms.clone(),
        repo.clone(),
        Arc::new(RecordingNotifier::new()),
        clock,
    ));
    let coordinator = ReliabilityCoordinator::new(repo, reminders, overdue, daily);
    Rig { alarms, coordinator }
}

fn report(alarms: &MemoryAlarms, scheduled: usize, failed: usize) -> ReplayReport {
    let mut registrations: Vec<RegistrationRow> = alarms
        .registered_keys()
        .into_iter()
        .filter_map(|key| {
            alarms.registration(&key).map(|reg| RegistrationRow {
                key: key.serialize(),
                at: reg.at.to_string(),
                exact: reg.exact,
            })
        })
        .collect();
    registrations
        .sort_by(|a, b| (a.at.as_str(), a.key.as_str()).cmp(&(b.at.as_str(), b.key.as_str())));
    ReplayReport { scheduled, failed, registrations }
}

pub fn run(action: ReplayAction) -> Result<(), Box<dyn std::error::Error>> {
    let (habits, now, event) = match action {
        ReplayAction::Boot { habits, now } => (habits, now, Some(LifecycleEvent::Boot)),
        ReplayAction::TimeChange { habits, now } => (habits, now, Some(LifecycleEvent::TimeChanged)),
        ReplayAction::Backstop { habits, now } => (habits, now, None),
    };

    let now = resolve_now(now.as_deref())?;
    let file = HabitFile::load(&habits)?;
    let rig = build_rig(file, now);

    let summary = match event {
        Some(event) => rig.coordinator.replay(event)?,
        None => match rig.coordinator.run_backstop() {
            BackstopOutcome::Completed(summary) => summary,
            BackstopOutcome::Retry => return Err("backstop asked for a retry".into()),
        },
    };

    let report = report(&rig.alarms, summary.scheduled, summary.failed);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
