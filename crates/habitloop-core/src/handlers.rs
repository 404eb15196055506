//! Wake-up fire handlers.
//!
//! A fired callback carries only its identifying key; anything else that
//! arrived with it could be stale (the habit may have been edited or
//! deleted after the alarm was registered). Every handler therefore
//! re-reads current truth from the repository and returns silently when
//! the habit is gone. The DUE handler re-arms the next occurrence
//! *before* deciding whether to notify, so a missed or suppressed
//! notification never stalls future recurrence.

use std::sync::Arc;

use tracing::debug;

use crate::channels::ChannelReconciler;
use crate::completion;
use crate::config::EngineConfig;
use crate::daily::DailyCompletionCheck;
use crate::error::PortError;
use crate::habit::HabitId;
use crate::overdue::{self, OverdueEscalationScheduler, AGGRESSIVE_THRESHOLD_HOURS};
use crate::ports::{Clock, HabitRepository, NotificationPort, OverdueTone};
use crate::reminder::ReminderScheduler;

pub struct FireHandlers {
    repo: Arc<dyn HabitRepository>,
    notifier: Arc<dyn NotificationPort>,
    clock: Arc<dyn Clock>,
    reminders: Arc<ReminderScheduler>,
    overdue: Arc<OverdueEscalationScheduler>,
    reconciler: Arc<ChannelReconciler>,
    daily: Arc<DailyCompletionCheck>,
    aggressive_threshold_hours: u32,
}

impl FireHandlers {
    pub fn new(
        repo: Arc<dyn HabitRepository>,
        notifier: Arc<dyn NotificationPort>,
        clock: Arc<dyn Clock>,
        reminders: Arc<ReminderScheduler>,
        overdue: Arc<OverdueEscalationScheduler>,
        reconciler: Arc<ChannelReconciler>,
        daily: Arc<DailyCompletionCheck>,
    ) -> Self {
        Self {
            repo,
            notifier,
            clock,
            reminders,
            overdue,
            reconciler,
            daily,
            aggressive_threshold_hours: AGGRESSIVE_THRESHOLD_HOURS,
        }
    }

    /// Override the aggressive-tier threshold from configuration.
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.aggressive_threshold_hours = config.aggressive_threshold_hours;
        self
    }

    /// A DUE wake-up fired for `habit_id`.
    pub fn on_due_fire(&self, habit_id: HabitId) -> Result<(), PortError> {
        let Some(habit) = self.repo.habit_by_id(habit_id)? else {
            debug!(habit_id, "due fire for missing habit, ignoring");
            return Ok(());
        };

        // Re-arm the next occurrence before any notification decision.
        self.reminders.schedule(&habit)?;
        if !habit.is_active() {
            return Ok(());
        }

        let today = self.clock.today();
        let completions = self.repo.completions(habit_id)?;
        if completion::is_satisfied(today, &completions) {
            debug!(habit_id, "already completed today, suppressing notification");
            return Ok(());
        }

        self.reconciler.ensure_channel(&habit)?;
        self.notifier.request_due(&habit)
    }

    /// An overdue-ladder wake-up fired for `(habit_id, offset_hours)`.
    ///
    /// The actual overdue duration is recomputed from scratch; a rung that
    /// outlived a completion or a reschedule is dropped.
    pub fn on_overdue_fire(&self, habit_id: HabitId, offset_hours: u32) -> Result<(), PortError> {
        let Some(habit) = self.repo.habit_by_id(habit_id)? else {
            debug!(habit_id, "overdue fire for missing habit, ignoring");
            return Ok(());
        };
        if !habit.is_active() {
            debug!(habit_id, "habit disabled or deleted, ignoring overdue fire");
            return Ok(());
        }

        let completions = self.repo.completions(habit_id)?;
        let status = overdue::overdue_status(&habit, &completions, self.clock.now());
        if !status.is_overdue || status.overdue_hours < i64::from(offset_hours) {
            debug!(
                habit_id,
                offset_hours,
                actual_hours = status.overdue_hours,
                "stale overdue rung, suppressing notification"
            );
            return Ok(());
        }

        let tone = if offset_hours >= self.aggressive_threshold_hours {
            OverdueTone::Aggressive
        } else {
            OverdueTone::Encouraging
        };
        self.reconciler.ensure_channel(&habit)?;
        self.notifier.request_overdue(&habit, offset_hours, tone)
    }

    /// The daily aggregate check fired.
    pub fn on_daily_check_fire(&self) -> Result<(), PortError> {
        // Re-arm tomorrow's check first so a failure below cannot stall
        // the recurrence.
        self.daily.schedule_daily_check()?;
        self.daily.run_check()
    }
}
