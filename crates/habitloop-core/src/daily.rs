//! End-of-day aggregate completion check.
//!
//! One wake-up fires at 23:50 local time. If every habit due today has a
//! completion recorded for today, a single congratulatory notification is
//! requested; partial progress produces nothing. The host port has no
//! repeating-alarm primitive, so the handler re-arms the next occurrence
//! on every fire, the same self-perpetuating pattern the DUE path uses.

use std::sync::Arc;

use chrono::{Duration, NaiveTime};
use tracing::debug;

use crate::completion;
use crate::config::EngineConfig;
use crate::error::PortError;
use crate::keys::AlarmKey;
use crate::ports::{AlarmPort, Clock, HabitRepository, NotificationPort, RegisterOutcome};
use crate::recurrence;

/// Default check time, ten minutes before midnight.
pub const DEFAULT_CHECK_TIME: (u32, u32) = (23, 50);

pub struct DailyCompletionCheck {
    alarms: Arc<dyn AlarmPort>,
    repo: Arc<dyn HabitRepository>,
    notifier: Arc<dyn NotificationPort>,
    clock: Arc<dyn Clock>,
    check_time: NaiveTime,
}

impl DailyCompletionCheck {
    pub fn new(
        alarms: Arc<dyn AlarmPort>,
        repo: Arc<dyn HabitRepository>,
        notifier: Arc<dyn NotificationPort>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (hour, minute) = DEFAULT_CHECK_TIME;
        Self {
            alarms,
            repo,
            notifier,
            clock,
            check_time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN),
        }
    }

    /// Override the check time from configuration.
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.check_time = NaiveTime::from_hms_opt(
            config.daily_check_hour.min(23),
            config.daily_check_minute.min(59),
            0,
        )
        .unwrap_or(NaiveTime::MIN);
        self
    }

    /// Arm the next daily-check wake-up (today's check time, or tomorrow's
    /// if it has already passed).
    pub fn schedule_daily_check(&self) -> Result<(), PortError> {
        let key = AlarmKey::DailyCheck;
        self.alarms.cancel(&key)?;

        let now = self.clock.now();
        let mut at = now.date().and_time(self.check_time);
        if at <= now {
            at += Duration::days(1);
        }
        match self.alarms.register_exact(&key, at)? {
            RegisterOutcome::Registered => {
                debug!(%at, "daily completion check armed (exact)");
            }
            RegisterOutcome::ExactDenied => {
                self.alarms.register_inexact(&key, at)?;
                debug!(%at, "exact alarms denied, daily completion check armed inexact");
            }
        }
        Ok(())
    }

    /// Cancel the daily-check wake-up.
    pub fn cancel_daily_check(&self) -> Result<(), PortError> {
        self.alarms.cancel(&AlarmKey::DailyCheck)
    }

    /// Evaluate today's habits; request one notification only when every
    /// habit due today is satisfied.
    pub fn run_check(&self) -> Result<(), PortError> {
        let today = self.clock.today();
        let due_today: Vec<_> = self
            .repo
            .all_habits()?
            .into_iter()
            .filter(|h| h.is_active())
            .filter(|h| recurrence::is_due_on(h, today))
            .collect();

        if due_today.is_empty() {
            debug!("no habits due today, skipping completion check");
            return Ok(());
        }

        for habit in &due_today {
            let completions = self.repo.completions(habit.id)?;
            if !completion::is_satisfied(today, &completions) {
                debug!(habit_id = habit.id, "habit not completed today, no notification");
                return Ok(());
            }
        }

        debug!(count = due_today.len(), "all habits completed today");
        self.notifier.request_daily_completion(due_today.len())
    }
}
