//! Pure calendar arithmetic for recurring habits.
//!
//! [`next_trigger`] maps a habit's recurrence spec and the current instant
//! to the next instant the habit is due, always strictly after `now`:
//! - equality counts as already passed (a trigger never fires twice for
//!   the same instant);
//! - day-of-month targets clamp down to the month's length (day 31 in a
//!   30-day month becomes day 30) and never roll into the next month.
//!
//! Everything here is a pure function of its arguments; `now` is threaded
//! explicitly so callers control the clock.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::habit::{Habit, HabitFrequency};

/// Next instant the habit's recurrence pattern says it is due.
///
/// Guaranteed strictly after `now`.
pub fn next_trigger(habit: &Habit, now: NaiveDateTime) -> NaiveDateTime {
    let base = now.date().and_time(habit.reminder_time());
    match habit.frequency {
        HabitFrequency::Daily => {
            if base <= now {
                base + Duration::days(1)
            } else {
                base
            }
        }
        HabitFrequency::Weekly => next_weekly(now, base, habit.target_weekday()),
        HabitFrequency::Monthly => next_monthly(now, base, habit.target_day_of_month()),
        HabitFrequency::Yearly => {
            next_yearly(now, base, habit.target_month(), habit.target_day_of_month())
        }
    }
}

/// Whether the habit's pattern falls on `date` (used by the daily
/// aggregate check).
pub fn is_due_on(habit: &Habit, date: NaiveDate) -> bool {
    match habit.frequency {
        HabitFrequency::Daily => true,
        HabitFrequency::Weekly => date.weekday().number_from_monday() == habit.target_weekday(),
        HabitFrequency::Monthly => date.day() == habit.target_day_of_month(),
        HabitFrequency::Yearly => {
            date.month() == habit.target_month() && date.day() == habit.target_day_of_month()
        }
    }
}

fn next_weekly(now: NaiveDateTime, base: NaiveDateTime, target_weekday: u32) -> NaiveDateTime {
    let current = now.date().weekday().number_from_monday();
    let days_until = if target_weekday >= current {
        if target_weekday == current && base <= now {
            7
        } else {
            i64::from(target_weekday - current)
        }
    } else {
        i64::from(7 - (current - target_weekday))
    };
    base + Duration::days(days_until)
}

fn next_monthly(now: NaiveDateTime, base: NaiveDateTime, target_day: u32) -> NaiveDateTime {
    let date = base.date();
    let mut trigger = clamped_date(date.year(), date.month(), target_day).and_time(base.time());
    if trigger <= now {
        let (year, month) = if date.month() == 12 {
            (date.year() + 1, 1)
        } else {
            (date.year(), date.month() + 1)
        };
        trigger = clamped_date(year, month, target_day).and_time(base.time());
    }
    trigger
}

fn next_yearly(
    now: NaiveDateTime,
    base: NaiveDateTime,
    target_month: u32,
    target_day: u32,
) -> NaiveDateTime {
    let year = base.date().year();
    let mut trigger = clamped_date(year, target_month, target_day).and_time(base.time());
    if trigger <= now {
        trigger = clamped_date(year + 1, target_month, target_day).and_time(base.time());
    }
    trigger
}

/// Build a date with the day clamped to the month's length.
fn clamped_date(year: i32, month: u32, target_day: u32) -> NaiveDate {
    let day = target_day.clamp(1, days_in_month(year, month));
    // day is within the month length, so construction succeeds
    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| NaiveDate::from_ymd_opt(year, month, 1))
        .unwrap_or_default()
}

/// Number of days in the given month.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
