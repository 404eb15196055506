use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use serde::Serialize;

use habitloop_core::memory::{FixedClock, MemoryAlarms};
use habitloop_core::{
    overdue_status, recurrence, HabitRepository, OverdueEscalationScheduler, ReminderScheduler,
};

use crate::common::{resolve_now, HabitFile};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Print each habit's next due time as JSON
    Next {
        /// Habit file (TOML)
        #[arg(long)]
        habits: PathBuf,
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        now: Option<String>,
    },
    /// Print each habit's overdue status as JSON
    Status {
        /// Habit file (TOML)
        #[arg(long)]
        habits: PathBuf,
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        now: Option<String>,
    },
    /// Arm every wake-up against an in-memory alarm table and print it
    Plan {
        /// Habit file (TOML)
        #[arg(long)]
        habits: PathBuf,
        /// Override the current time (YYYY-MM-DDTHH:MM)
        #[arg(long)]
        now: Option<String>,
    },
}

#[derive(Serialize)]
struct NextRow {
    id: i64,
    title: String,
    next_trigger: String,
}

#[derive(Serialize)]
struct StatusRow {
    id: i64,
    title: String,
    due_today: bool,
    is_overdue: bool,
    overdue_hours: i64,
}

#[derive(Serialize)]
struct PlanRow {
    key: String,
    at: String,
    exact: bool,
}

pub fn run(action: ScheduleAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ScheduleAction::Next { habits, now } => {
            let now = resolve_now(now.as_deref())?;
            let file = HabitFile::load(&habits)?;
            let rows: Vec<NextRow> = file
                .habits
                .iter()
                .filter(|h| h.is_active())
                .map(|h| NextRow {
                    id: h.id,
                    title: h.title.clone(),
                    next_trigger: recurrence::next_trigger(h, now).to_string(),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        ScheduleAction::Status { habits, now } => {
            let now = resolve_now(now.as_deref())?;
            let file = HabitFile::load(&habits)?;
            let repo = file.into_repository();
            let mut rows = Vec::new();
            for habit in repo.all_habits()? {
                let completions = repo.completions(habit.id)?;
                let status = overdue_status(&habit, &completions, now);
                rows.push(StatusRow {
                    id: habit.id,
                    title: habit.title.clone(),
                    due_today: recurrence::is_due_on(&habit, now.date()),
                    is_overdue: status.is_overdue,
                    overdue_hours: status.overdue_hours,
                });
            }
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        ScheduleAction::Plan { habits, now } => {
            let now = resolve_now(now.as_deref())?;
            let file = HabitFile::load(&habits)?;
            let alarms = Arc::new(MemoryAlarms::new());
            let clock = Arc::new(FixedClock::at(now));
            let reminders = ReminderScheduler::new(alarms.clone(), clock.clone());
            let overdue = OverdueEscalationScheduler::new(alarms.clone(), clock);

            for habit in file.habits.iter().filter(|h| h.is_active()) {
                reminders.schedule(habit)?;
                overdue.schedule_overdue_checks(habit)?;
            }

            let mut rows: Vec<PlanRow> = alarms
                .registered_keys()
                .into_iter()
                .filter_map(|key| {
                    alarms.registration(&key).map(|reg| PlanRow {
                        key: key.serialize(),
                        at: reg.at.to_string(),
                        exact: reg.exact,
                    })
                })
                .collect();
            rows.sort_by(|a, b| (a.at.as_str(), a.key.as_str()).cmp(&(b.at.as_str(), b.key.as_str())));
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}
