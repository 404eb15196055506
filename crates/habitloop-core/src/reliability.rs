//! Lifecycle replay and periodic backstop.
//!
//! Host wake-up registrations do not survive a reboot, a wall-clock or
//! timezone change, or an upgrade of the hosting process; after any of
//! those the engine must rebuild its whole alarm table from the
//! repository. [`ReliabilityCoordinator::replay`] does that rebuild with
//! per-habit failure isolation: one habit whose registration fails is
//! counted and skipped, the rest of the set is still replayed.
//!
//! [`ReliabilityCoordinator::run_backstop`] is the same sweep packaged
//! for a periodic host job. It is expected to find nothing to fix; when
//! the repository itself is unreadable it asks the host to retry the job
//! later instead of failing permanently.

use std::sync::Arc;

use tracing::{info, warn};

use crate::daily::DailyCompletionCheck;
use crate::error::PortError;
use crate::habit::Habit;
use crate::overdue::OverdueEscalationScheduler;
use crate::ports::HabitRepository;
use crate::reminder::ReminderScheduler;

/// Host event that invalidates outstanding wake-up registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The device rebooted; every registration is gone.
    Boot,
    /// The wall clock or timezone moved; registrations point at the
    /// wrong instants.
    TimeChanged,
    /// The hosting process was replaced by an upgrade.
    HostUpgraded,
}

/// What a replay pass accomplished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Habits whose wake-ups were rebuilt.
    pub scheduled: usize,
    /// Habits skipped because a registration failed.
    pub failed: usize,
}

/// Verdict of one periodic backstop run, for the host's job scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackstopOutcome {
    /// The sweep ran; the summary says what it rebuilt.
    Completed(ReplaySummary),
    /// The repository was unreadable; the host should retry the job.
    Retry,
}

pub struct ReliabilityCoordinator {
    repo: Arc<dyn HabitRepository>,
    reminders: Arc<ReminderScheduler>,
    overdue: Arc<OverdueEscalationScheduler>,
    daily: Arc<DailyCompletionCheck>,
}

impl ReliabilityCoordinator {
    pub fn new(
        repo: Arc<dyn HabitRepository>,
        reminders: Arc<ReminderScheduler>,
        overdue: Arc<OverdueEscalationScheduler>,
        daily: Arc<DailyCompletionCheck>,
    ) -> Self {
        Self { repo, reminders, overdue, daily }
    }

    /// Rebuild every wake-up after a lifecycle event.
    ///
    /// The repository read is the only hard failure; per-habit
    /// registration errors are logged and counted, never propagated, so
    /// one broken habit cannot leave the rest of the set unscheduled.
    pub fn replay(&self, event: LifecycleEvent) -> Result<ReplaySummary, PortError> {
        info!(?event, "replaying wake-up registrations");
        let habits = self.repo.all_habits()?;
        let summary = self.replay_habits(&habits);

        if let Err(e) = self.daily.schedule_daily_check() {
            warn!(error = %e, "failed to re-arm daily completion check");
        }
        info!(scheduled = summary.scheduled, failed = summary.failed, "replay finished");
        Ok(summary)
    }

    /// Periodic sweep re-asserting every registration.
    pub fn run_backstop(&self) -> BackstopOutcome {
        let habits = match self.repo.all_habits() {
            Ok(habits) => habits,
            Err(e) => {
                warn!(error = %e, "backstop could not read habits, asking host to retry");
                return BackstopOutcome::Retry;
            }
        };
        let summary = self.replay_habits(&habits);
        if let Err(e) = self.daily.schedule_daily_check() {
            warn!(error = %e, "backstop failed to re-arm daily completion check");
        }
        BackstopOutcome::Completed(summary)
    }

    fn replay_habits(&self, habits: &[Habit]) -> ReplaySummary {
        let mut summary = ReplaySummary::default();
        for habit in habits.iter().filter(|h| h.is_active()) {
            match self.replay_one(habit) {
                Ok(()) => summary.scheduled += 1,
                Err(e) => {
                    warn!(habit_id = habit.id, error = %e, "failed to replay habit, skipping");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    fn replay_one(&self, habit: &Habit) -> Result<(), PortError> {
        self.reminders.schedule(habit)?;
        // Repair rather than restart the ladder: rungs whose moment has
        // already passed stay gone.
        self.overdue.reschedule_from_today(habit)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{HabitFrequency, HabitId, NotificationSound};
    use crate::keys::AlarmKey;
    use crate::memory::{FixedClock, MemoryAlarms, MemoryRepository, RecordingNotifier};
    use chrono::{NaiveDate, NaiveDateTime};

    fn make_habit(id: HabitId) -> Habit {
        Habit {
            id,
            title: format!("Habit {id}"),
            frequency: HabitFrequency::Daily,
            reminder_hour: 9,
            reminder_minute: 0,
            day_of_week: None,
            day_of_month: None,
            month_of_year: None,
            reminder_enabled: true,
            is_deleted: false,
            sound: NotificationSound::Default,
            last_completed_date: None,
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    struct Fixture {
        alarms: Arc<MemoryAlarms>,
        repo: Arc<MemoryRepository>,
        coordinator: ReliabilityCoordinator,
    }

    fn fixture(now: NaiveDateTime) -> Fixture {
        let alarms = Arc::new(MemoryAlarms::new());
        let repo = Arc::new(MemoryRepository::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let clock = Arc::new(FixedClock::at(now));

        let reminders = Arc::new(ReminderScheduler::new(alarms.clone(), clock.clone()));
        let overdue = Arc::new(OverdueEscalationScheduler::new(alarms.clone(), clock.clone()));
        let daily = Arc::new(DailyCompletionCheck::new(
            alarms.clone(),
            repo.clone(),
            notifier,
            clock,
        ));
        let coordinator = ReliabilityCoordinator::new(repo.clone(), reminders, overdue, daily);
        Fixture { alarms, repo, coordinator }
    }

    #[test]
    fn boot_replay_rebuilds_all_wakeups() {
        let f = fixture(at(8, 0));
        f.repo.insert(make_habit(1));
        f.repo.insert(make_habit(2));

        let summary = f.coordinator.replay(LifecycleEvent::Boot).unwrap();

        assert_eq!(summary, ReplaySummary { scheduled: 2, failed: 0 });
        // Per habit: one DUE wake-up plus five ladder rungs, plus the
        // single daily check.
        assert_eq!(f.alarms.outstanding(), 2 * 6 + 1);
        assert!(f.alarms.registration(&AlarmKey::DailyCheck).is_some());
    }

    #[test]
    fn inactive_habits_are_not_replayed() {
        let f = fixture(at(8, 0));
        f.repo.insert(make_habit(1));
        let mut deleted = make_habit(2);
        deleted.is_deleted = true;
        f.repo.insert(deleted);
        let mut disabled = make_habit(3);
        disabled.reminder_enabled = false;
        f.repo.insert(disabled);

        let summary = f.coordinator.replay(LifecycleEvent::TimeChanged).unwrap();

        assert_eq!(summary.scheduled, 1);
        assert!(f.alarms.registration(&AlarmKey::Due(1)).is_some());
        assert!(f.alarms.registration(&AlarmKey::Due(2)).is_none());
        assert!(f.alarms.registration(&AlarmKey::Due(3)).is_none());
    }

    #[test]
    fn one_failing_habit_does_not_block_the_rest() {
        let f = fixture(at(8, 0));
        f.repo.insert(make_habit(1));
        f.repo.insert(make_habit(2));
        f.repo.insert(make_habit(3));
        f.alarms.fail_for_habit(2);

        let summary = f.coordinator.replay(LifecycleEvent::Boot).unwrap();

        assert_eq!(summary, ReplaySummary { scheduled: 2, failed: 1 });
        assert!(f.alarms.registration(&AlarmKey::Due(1)).is_some());
        assert!(f.alarms.registration(&AlarmKey::Due(2)).is_none());
        assert!(f.alarms.registration(&AlarmKey::Due(3)).is_some());
    }

    #[test]
    fn replay_repairs_partially_elapsed_ladders() {
        // Rebooted at 12:30 with a 09:00 habit: 3 whole hours overdue, so
        // only the later rungs come back.
        let f = fixture(at(12, 30));
        f.repo.insert(make_habit(1));

        f.coordinator.replay(LifecycleEvent::Boot).unwrap();

        assert!(f.alarms.registration(&AlarmKey::Overdue(1, 2)).is_none());
        assert!(f.alarms.registration(&AlarmKey::Overdue(1, 3)).is_none());
        assert!(f.alarms.registration(&AlarmKey::Overdue(1, 4)).is_some());
        assert!(f.alarms.registration(&AlarmKey::Overdue(1, 6)).is_some());
        // The DUE wake-up points at tomorrow.
        let reg = f.alarms.registration(&AlarmKey::Due(1)).unwrap();
        assert_eq!(
            reg.at,
            NaiveDate::from_ymd_opt(2025, 6, 3).unwrap().and_hms_opt(9, 0, 0).unwrap()
        );
    }

    #[test]
    fn unreadable_repository_fails_replay() {
        let f = fixture(at(8, 0));
        f.repo.set_fail(true);
        assert!(f.coordinator.replay(LifecycleEvent::Boot).is_err());
    }

    #[test]
    fn backstop_retries_when_repository_unreadable() {
        let f = fixture(at(8, 0));
        f.repo.set_fail(true);
        assert_eq!(f.coordinator.run_backstop(), BackstopOutcome::Retry);
    }

    #[test]
    fn backstop_completes_with_summary() {
        let f = fixture(at(8, 0));
        f.repo.insert(make_habit(1));

        let outcome = f.coordinator.run_backstop();

        assert_eq!(outcome, BackstopOutcome::Completed(ReplaySummary { scheduled: 1, failed: 0 }));
        assert!(f.alarms.registration(&AlarmKey::DailyCheck).is_some());
    }
}
