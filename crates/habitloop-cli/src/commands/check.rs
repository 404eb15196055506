use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use serde::Serialize;

use habitloop_core::memory::{FixedClock, MemoryAlarms, NotificationRequest, RecordingNotifier};
use habitloop_core::DailyCompletionCheck;

use crate::common::{resolve_now, HabitFile};

#[derive(Subcommand)]
pub enum CheckAction {
    /// Run the end-of-day completion check and print the outcome
    Run {
        /// Habit file (TOML)
        #[arg(long)]
        habits: PathBuf,
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Serialize)]
struct CheckReport {
    all_completed: bool,
    habit_count: usize,
}

pub fn run(action: CheckAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CheckAction::Run { habits, now } => {
            let now = resolve_now(now.as_deref())?;
            let file = HabitFile::load(&habits)?;
            let repo = file.into_repository();
            let notifier = Arc::new(RecordingNotifier::new());
            let check = DailyCompletionCheck::new(
                Arc::new(MemoryAlarms::new()),
                repo,
                notifier.clone(),
                Arc::new(FixedClock::at(now)),
            );

            check.run_check()?;

            let report = match notifier.requests().first() {
                Some(NotificationRequest::DailyCompletion { habit_count }) => CheckReport {
                    all_completed: true,
                    habit_count: *habit_count,
                },
                _ => CheckReport { all_completed: false, habit_count: 0 },
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
