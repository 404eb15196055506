//! Habit read model consumed by the scheduling engine.
//!
//! Habits are owned by the external repository; the engine only reads them.
//! A habit carries its recurrence spec (frequency, wall-clock reminder time,
//! day selectors), a soft-delete flag and the notification sound reference
//! its channel is configured with.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Stable identifier assigned by the habit repository.
pub type HabitId = i64;

/// How often a habit recurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Sound reference attached to a habit's notification channel.
///
/// Channels are immutable on the host platform, so changing this value
/// forces the channel to be deleted and recreated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationSound {
    Default,
    Ringtone,
    Alarm,
    SystemDefault,
}

impl Default for NotificationSound {
    fn default() -> Self {
        NotificationSound::Default
    }
}

/// A recurring habit as read from the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub title: String,
    pub frequency: HabitFrequency,
    /// Reminder hour in the habit's local time zone (0-23).
    pub reminder_hour: u32,
    /// Reminder minute (0-59).
    pub reminder_minute: u32,
    /// Target weekday for WEEKLY habits, 1 = Monday .. 7 = Sunday.
    #[serde(default)]
    pub day_of_week: Option<u32>,
    /// Target day of month for MONTHLY and YEARLY habits (1-31).
    #[serde(default)]
    pub day_of_month: Option<u32>,
    /// Target month for YEARLY habits (1-12).
    #[serde(default)]
    pub month_of_year: Option<u32>,
    #[serde(default = "default_true")]
    pub reminder_enabled: bool,
    /// Soft-delete flag; deleted habits keep their row but lose all
    /// scheduling state.
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub sound: NotificationSound,
    #[serde(default)]
    pub last_completed_date: Option<NaiveDate>,
}

fn default_true() -> bool {
    true
}

impl Habit {
    /// Whether this habit should have any scheduling state at all.
    pub fn is_active(&self) -> bool {
        !self.is_deleted && self.reminder_enabled
    }

    /// Wall-clock reminder time. Out-of-range fields are clamped; the
    /// repository validates them on write.
    pub fn reminder_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.reminder_hour.min(23), self.reminder_minute.min(59), 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Target weekday (1 = Monday), defaulting to Monday.
    pub fn target_weekday(&self) -> u32 {
        self.day_of_week.unwrap_or(1).clamp(1, 7)
    }

    /// Target day of month, defaulting to the 1st.
    pub fn target_day_of_month(&self) -> u32 {
        self.day_of_month.unwrap_or(1).clamp(1, 31)
    }

    /// Target month, defaulting to January.
    pub fn target_month(&self) -> u32 {
        self.month_of_year.unwrap_or(1).clamp(1, 12)
    }
}

/// A single completion of a habit on a calendar date. Append-only,
/// owned by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub habit_id: HabitId,
    pub completed_date: NaiveDate,
}
