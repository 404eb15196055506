//! Owner of the single DUE wake-up per habit.
//!
//! Discipline within one habit is always "cancel existing, then register
//! new", which keeps repeated calls idempotent without locks: at most one
//! DUE registration exists per habit at any instant. Exact-alarm denial
//! degrades to inexact delivery with the same key and is not an error.

use std::sync::Arc;

use tracing::debug;

use crate::error::PortError;
use crate::habit::{Habit, HabitId};
use crate::keys::AlarmKey;
use crate::ports::{AlarmPort, Clock, RegisterOutcome};
use crate::recurrence;

pub struct ReminderScheduler {
    alarms: Arc<dyn AlarmPort>,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    pub fn new(alarms: Arc<dyn AlarmPort>, clock: Arc<dyn Clock>) -> Self {
        Self { alarms, clock }
    }

    /// Arm (or re-arm) the habit's next DUE wake-up.
    ///
    /// A disabled habit has its outstanding registration cancelled and
    /// nothing else done. Any prior registration is cancelled first, so
    /// calling this twice leaves exactly one outstanding DUE key.
    pub fn schedule(&self, habit: &Habit) -> Result<(), PortError> {
        let key = AlarmKey::Due(habit.id);
        self.alarms.cancel(&key)?;
        if !habit.reminder_enabled {
            debug!(habit_id = habit.id, "reminder disabled, due wake-up cancelled");
            return Ok(());
        }

        let at = recurrence::next_trigger(habit, self.clock.now());
        match self.alarms.register_exact(&key, at)? {
            RegisterOutcome::Registered => {
                debug!(habit_id = habit.id, %at, "due wake-up registered (exact)");
            }
            RegisterOutcome::ExactDenied => {
                // Degraded but non-fatal: same key, inexact delivery.
                self.alarms.register_inexact(&key, at)?;
                debug!(habit_id = habit.id, %at, "exact alarms denied, registered inexact");
            }
        }
        Ok(())
    }

    /// Cancel the habit's DUE wake-up. Safe no-op when none is armed.
    pub fn cancel(&self, habit_id: HabitId) -> Result<(), PortError> {
        self.alarms.cancel(&AlarmKey::Due(habit_id))
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

    fn clock_at_8am() -> Arc<FixedClock> {
        let now = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(8, 0, 0).unwrap();
        Arc::new(FixedClock::at(now))
    }

    #[test]
    fn schedule_registers_exact_due_alarm() {
        let alarms = Arc::new(MemoryAlarms::new());
        let scheduler = ReminderScheduler::new(alarms.clone(), clock_at_8am());

        scheduler.schedule(&make_habit(1)).unwrap();

        let reg = alarms.registration(&AlarmKey::Due(1)).unwrap();
        assert!(reg.exact);
        assert_eq!(
            reg.at,
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap().and_hms_opt(9, 0, 0).unwrap()
        );
    }

    #[test]
    fn schedule_twice_leaves_one_registration() {
        let alarms = Arc::new(MemoryAlarms::new());
        let scheduler = ReminderScheduler::new(alarms.clone(), clock_at_8am());

        let habit = make_habit(1);
        scheduler.schedule(&habit).unwrap();
        scheduler.schedule(&habit).unwrap();

        assert_eq!(alarms.outstanding(), 1);
    }

    #[test]
    fn disabled_habit_cancels_outstanding_registration() {
        let alarms = Arc::new(MemoryAlarms::new());
        let scheduler = ReminderScheduler::new(alarms.clone(), clock_at_8am());

        let mut habit = make_habit(1);
        scheduler.schedule(&habit).unwrap();
        assert_eq!(alarms.outstanding(), 1);

        habit.reminder_enabled = false;
        scheduler.schedule(&habit).unwrap();
        assert_eq!(alarms.outstanding(), 0);
    }

    #[test]
    fn exact_denial_falls_back_to_inexact() {
        let alarms = Arc::new(MemoryAlarms::new());
        alarms.set_deny_exact(true);
        let scheduler = ReminderScheduler::new(alarms.clone(), clock_at_8am());

        scheduler.schedule(&make_habit(1)).unwrap();

        let reg = alarms.registration(&AlarmKey::Due(1)).unwrap();
        assert!(!reg.exact);
    }

    #[test]
    fn cancel_without_registration_is_a_no_op() {
        let alarms = Arc::new(MemoryAlarms::new());
        let scheduler = ReminderScheduler::new(alarms.clone(), clock_at_8am());
        scheduler.cancel(99).unwrap();
        assert_eq!(alarms.outstanding(), 0);
    }
}
