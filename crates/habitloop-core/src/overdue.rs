//! Overdue-escalation ladder.
//!
//! After a habit's due time passes uncompleted, a fixed ladder of checks
//! fires at 2, 3, 4, 5 and 6 hours past due. Each rung is its own keyed
//! wake-up so a completed or rescheduled habit invalidates stale rungs
//! when they fire (the handler re-derives the actual overdue duration and
//! drops anything that no longer applies). At 6 hours the notification
//! tone switches from encouraging to aggressive.
//!
//! A wider 8-48 hour recurring band exists in dismissal code elsewhere in
//! the surrounding system but was never armed by any scheduler; the
//! initial ladder is authoritative and nothing here schedules past it.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::debug;

use crate::completion;
use crate::error::PortError;
use crate::habit::{CompletionRecord, Habit, HabitId};
use crate::keys::AlarmKey;
use crate::ports::{AlarmPort, Clock, RegisterOutcome};
use crate::recurrence;

/// Offsets after due time, in hours, at which overdue checks are armed.
pub const INITIAL_LADDER_HOURS: [u32; 5] = [2, 3, 4, 5, 6];

/// Offsets at or above this many hours use the aggressive message tier.
pub const AGGRESSIVE_THRESHOLD_HOURS: u32 = 6;

/// How late a habit currently is, derived fresh from the completion set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverdueStatus {
    pub is_overdue: bool,
    pub overdue_hours: i64,
}

impl OverdueStatus {
    const NOT_OVERDUE: OverdueStatus = OverdueStatus { is_overdue: false, overdue_hours: 0 };
}

/// Compute whether the habit is overdue right now and by how many whole
/// hours.
///
/// A habit is overdue only when today is one of its occurrence dates, the
/// occurrence is not satisfied by a completion on that date, and at least
/// one full hour has elapsed since the occurrence's due time. Disabled
/// and deleted habits are never overdue.
pub fn overdue_status(
    habit: &Habit,
    completions: &[CompletionRecord],
    now: NaiveDateTime,
) -> OverdueStatus {
    if !habit.is_active() {
        return OverdueStatus::NOT_OVERDUE;
    }
    let today = now.date();
    if !recurrence::is_due_on(habit, today) {
        return OverdueStatus::NOT_OVERDUE;
    }
    if completion::is_satisfied(today, completions) {
        return OverdueStatus::NOT_OVERDUE;
    }
    let due = today.and_time(habit.reminder_time());
    let hours = (now - due).num_hours();
    OverdueStatus { is_overdue: hours > 0, overdue_hours: hours.max(0) }
}

/// Owner of the per-habit overdue-check wake-ups.
pub struct OverdueEscalationScheduler {
    alarms: Arc<dyn AlarmPort>,
    clock: Arc<dyn Clock>,
}

impl OverdueEscalationScheduler {
    pub fn new(alarms: Arc<dyn AlarmPort>, clock: Arc<dyn Clock>) -> Self {
        Self { alarms, clock }
    }

    /// Arm the full ladder relative to the habit's next due time.
    ///
    /// Used on habit create/update: the due time comes from the same
    /// recurrence arithmetic as the DUE wake-up, so every rung lands in
    /// the future. Existing rungs are cancelled first.
    pub fn schedule_overdue_checks(&self, habit: &Habit) -> Result<(), PortError> {
        if !habit.is_active() {
            debug!(habit_id = habit.id, "habit disabled or deleted, skipping overdue checks");
            return Ok(());
        }
        self.cancel_overdue_checks(habit.id)?;

        let now = self.clock.now();
        let due = recurrence::next_trigger(habit, now);
        let mut armed = 0;
        for hours in INITIAL_LADDER_HOURS {
            let at = due + Duration::hours(i64::from(hours));
            if self.arm(habit.id, hours, at, now)? {
                armed += 1;
            }
        }
        debug!(habit_id = habit.id, armed, %due, "overdue ladder armed");
        Ok(())
    }

    /// Re-arm remaining rungs relative to *today's* due time.
    ///
    /// Used to repair ladders after missed events: if today's due time has
    /// not yet passed there is nothing to repair, otherwise only rungs
    /// strictly beyond the hours already elapsed are armed. Once more than
    /// 6 hours have elapsed the ladder is exhausted and nothing is armed.
    pub fn reschedule_from_today(&self, habit: &Habit) -> Result<(), PortError> {
        if !habit.is_active() {
            debug!(habit_id = habit.id, "habit disabled or deleted, skipping overdue reschedule");
            return Ok(());
        }
        self.cancel_overdue_checks(habit.id)?;

        let now = self.clock.now();
        if !recurrence::is_due_on(habit, now.date()) {
            debug!(habit_id = habit.id, "no occurrence today, skipping overdue reschedule");
            return Ok(());
        }
        let today_due = now.date().and_time(habit.reminder_time());
        if today_due > now {
            debug!(habit_id = habit.id, "not yet due today, skipping overdue reschedule");
            return Ok(());
        }

        let hours_overdue = (now - today_due).num_hours();
        let mut armed = 0;
        for hours in INITIAL_LADDER_HOURS {
            if i64::from(hours) <= hours_overdue {
                continue;
            }
            let at = today_due + Duration::hours(i64::from(hours));
            if self.arm(habit.id, hours, at, now)? {
                armed += 1;
            }
        }
        debug!(habit_id = habit.id, hours_overdue, armed, "overdue ladder rescheduled from today");
        Ok(())
    }

    /// Cancel every ladder rung for the habit. Idempotent.
    pub fn cancel_overdue_checks(&self, habit_id: HabitId) -> Result<(), PortError> {
        for hours in INITIAL_LADDER_HOURS {
            self.alarms.cancel(&AlarmKey::Overdue(habit_id, hours))?;
        }
        Ok(())
    }

    /// Register one rung unless its moment has already passed. Returns
    /// whether a registration was made.
    fn arm(
        &self,
        habit_id: HabitId,
        hours: u32,
        at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<bool, PortError> {
        if at <= now {
            debug!(habit_id, hours, "overdue rung already elapsed, skipping");
            return Ok(false);
        }
        let key = AlarmKey::Overdue(habit_id, hours);
        match self.alarms.register_exact(&key, at)? {
            RegisterOutcome::Registered => {}
            RegisterOutcome::ExactDenied => self.alarms.register_inexact(&key, at)?,
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{HabitFrequency, NotificationSound};
    use crate::memory::{FixedClock, MemoryAlarms};
    use chrono::NaiveDate;

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

    #[test]
    fn full_ladder_is_armed_for_next_due_time() {
        let alarms = Arc::new(MemoryAlarms::new());
        let clock = Arc::new(FixedClock::at(at(8, 0)));
        let scheduler = OverdueEscalationScheduler::new(alarms.clone(), clock);

        scheduler.schedule_overdue_checks(&make_habit(1)).unwrap();

        assert_eq!(alarms.outstanding(), INITIAL_LADDER_HOURS.len());
        for hours in INITIAL_LADDER_HOURS {
            let reg = alarms.registration(&AlarmKey::Overdue(1, hours)).unwrap();
            assert_eq!(reg.at, at(9 + hours, 0));
        }
    }

    #[test]
    fn scheduling_twice_does_not_duplicate_rungs() {
        let alarms = Arc::new(MemoryAlarms::new());
        let clock = Arc::new(FixedClock::at(at(8, 0)));
        let scheduler = OverdueEscalationScheduler::new(alarms.clone(), clock);

        let habit = make_habit(1);
        scheduler.schedule_overdue_checks(&habit).unwrap();
        scheduler.schedule_overdue_checks(&habit).unwrap();

        assert_eq!(alarms.outstanding(), INITIAL_LADDER_HOURS.len());
    }

    #[test]
    fn deleted_habit_gets_no_rungs() {
        let alarms = Arc::new(MemoryAlarms::new());
        let clock = Arc::new(FixedClock::at(at(8, 0)));
        let scheduler = OverdueEscalationScheduler::new(alarms.clone(), clock);

        let mut habit = make_habit(1);
        habit.is_deleted = true;
        scheduler.schedule_overdue_checks(&habit).unwrap();

        assert_eq!(alarms.outstanding(), 0);
    }

    #[test]
    fn reschedule_skips_rungs_already_elapsed() {
        // Due at 09:00, now 12:30 -> 3 whole hours overdue; only the
        // 4, 5 and 6 hour rungs remain.
        let alarms = Arc::new(MemoryAlarms::new());
        let clock = Arc::new(FixedClock::at(at(12, 30)));
        let scheduler = OverdueEscalationScheduler::new(alarms.clone(), clock);

        scheduler.reschedule_from_today(&make_habit(1)).unwrap();

        let mut keys = alarms.registered_keys();
        keys.sort_by_key(|k| k.serialize());
        assert_eq!(
            keys,
            vec![AlarmKey::Overdue(1, 4), AlarmKey::Overdue(1, 5), AlarmKey::Overdue(1, 6)]
        );
    }

    #[test]
    fn reschedule_before_due_time_arms_nothing() {
        let alarms = Arc::new(MemoryAlarms::new());
        let clock = Arc::new(FixedClock::at(at(8, 0)));
        let scheduler = OverdueEscalationScheduler::new(alarms.clone(), clock);

        scheduler.reschedule_from_today(&make_habit(1)).unwrap();

        assert_eq!(alarms.outstanding(), 0);
    }

    #[test]
    fn ladder_fully_elapsed_arms_nothing() {
        // Due 09:00, now 16:00 -> more than 6 hours past; every candidate
        // has elapsed.
        let alarms = Arc::new(MemoryAlarms::new());
        let clock = Arc::new(FixedClock::at(at(16, 0)));
        let scheduler = OverdueEscalationScheduler::new(alarms.clone(), clock);

        scheduler.reschedule_from_today(&make_habit(1)).unwrap();

        assert_eq!(alarms.outstanding(), 0);
    }

    #[test]
    fn reschedule_skips_non_occurrence_days() {
        // 2025-06-02 is a Monday; the habit targets Wednesday, so even
        // well past 09:00 no rung belongs today.
        let alarms = Arc::new(MemoryAlarms::new());
        let clock = Arc::new(FixedClock::at(at(12, 30)));
        let scheduler = OverdueEscalationScheduler::new(alarms.clone(), clock);

        let mut habit = make_habit(1);
        habit.frequency = HabitFrequency::Weekly;
        habit.day_of_week = Some(3);
        scheduler.reschedule_from_today(&habit).unwrap();

        assert_eq!(alarms.outstanding(), 0);
    }

    #[test]
    fn cancel_is_idempotent() {
        let alarms = Arc::new(MemoryAlarms::new());
        let clock = Arc::new(FixedClock::at(at(8, 0)));
        let scheduler = OverdueEscalationScheduler::new(alarms.clone(), clock);

        let habit = make_habit(1);
        scheduler.schedule_overdue_checks(&habit).unwrap();
        scheduler.cancel_overdue_checks(1).unwrap();
        scheduler.cancel_overdue_checks(1).unwrap();

        assert_eq!(alarms.outstanding(), 0);
    }

    #[test]
    fn status_reports_hours_since_due() {
        let habit = make_habit(1);
        let status = overdue_status(&habit, &[], at(12, 30));
        assert!(status.is_overdue);
        assert_eq!(status.overdue_hours, 3);
    }

    #[test]
    fn status_not_overdue_before_due_time() {
        let habit = make_habit(1);
        let status = overdue_status(&habit, &[], at(8, 0));
        assert!(!status.is_overdue);
        assert_eq!(status.overdue_hours, 0);
    }

    #[test]
    fn status_cleared_by_completion_today() {
        let habit = make_habit(1);
        let completions = vec![CompletionRecord {
            habit_id: 1,
            completed_date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        }];
        let status = overdue_status(&habit, &completions, at(14, 0));
        assert!(!status.is_overdue);
    }

    #[test]
    fn status_ignores_non_occurrence_days() {
        // 2025-06-02 is a Monday; target Wednesday.
        let mut habit = make_habit(1);
        habit.frequency = HabitFrequency::Weekly;
        habit.day_of_week = Some(3);
        let status = overdue_status(&habit, &[], at(14, 0));
        assert!(!status.is_overdue);
    }

    #[test]
    fn status_under_one_hour_is_not_overdue() {
        let habit = make_habit(1);
        let status = overdue_status(&habit, &[], at(9, 30));
        assert!(!status.is_overdue);
    }
}
