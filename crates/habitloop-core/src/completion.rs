//! Completion predicate shared by the due and daily-check paths.

use chrono::NaiveDate;

use crate::habit::CompletionRecord;

/// Whether an occurrence on `date` is satisfied by the completion set.
///
/// Pure membership test; used both to suppress a DUE notification for an
/// already-completed occurrence and to gate the daily aggregate check.
pub fn is_satisfied(date: NaiveDate, completions: &[CompletionRecord]) -> bool {
    completions.iter().any(|c| c.completed_date == date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn satisfied_only_on_completed_dates() {
        let completions = vec![
            CompletionRecord { habit_id: 1, completed_date: day(2025, 6, 1) },
            CompletionRecord { habit_id: 1, completed_date: day(2025, 6, 3) },
        ];
        assert!(is_satisfied(day(2025, 6, 1), &completions));
        assert!(!is_satisfied(day(2025, 6, 2), &completions));
        assert!(is_satisfied(day(2025, 6, 3), &completions));
    }

    #[test]
    fn empty_completion_set_is_never_satisfied() {
        assert!(!is_satisfied(day(2025, 6, 1), &[]));
    }
}
