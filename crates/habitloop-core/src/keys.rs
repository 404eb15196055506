//! Typed keys for wake-up registrations and notification channels.
//!
//! The host alarm and channel tables are keyed by strings. Rather than
//! concatenating prefixes inline, both key kinds are value types with an
//! explicit `serialize`/`try_parse` pair. A string that fails to parse is
//! treated as invalid (and, for channels, deleted during reconciliation)
//! instead of propagating an error.

use std::fmt;

use crate::habit::HabitId;

/// Prefix shared by every per-habit notification channel id.
pub const CHANNEL_ID_PREFIX: &str = "habit_channel_";

const DUE_PREFIX: &str = "due:";
const OVERDUE_PREFIX: &str = "overdue:";
const DAILY_CHECK_KEY: &str = "daily-check";

/// Identity of one wake-up registration in the host alarm table.
///
/// At most one DUE key exists per habit; the overdue ladder uses one key
/// per (habit, offset) pair; the daily aggregate check has a single
/// process-wide key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmKey {
    /// The habit's single "due now" wake-up.
    Due(HabitId),
    /// One rung of the overdue-escalation ladder, tagged with its offset
    /// in hours after due time.
    Overdue(HabitId, u32),
    /// The 23:50 all-habits completion check.
    DailyCheck,
}

impl AlarmKey {
    /// Render the key to its wire form (`due:42`, `overdue:42:4`,
    /// `daily-check`).
    pub fn serialize(&self) -> String {
        match self {
            AlarmKey::Due(id) => format!("{DUE_PREFIX}{id}"),
            AlarmKey::Overdue(id, hours) => format!("{OVERDUE_PREFIX}{id}:{hours}"),
            AlarmKey::DailyCheck => DAILY_CHECK_KEY.to_string(),
        }
    }

    /// Parse a wire-form key. Returns `None` for anything malformed.
    pub fn try_parse(raw: &str) -> Option<AlarmKey> {
        if raw == DAILY_CHECK_KEY {
            return Some(AlarmKey::DailyCheck);
        }
        if let Some(rest) = raw.strip_prefix(DUE_PREFIX) {
            return rest.parse::<HabitId>().ok().map(AlarmKey::Due);
        }
        if let Some(rest) = raw.strip_prefix(OVERDUE_PREFIX) {
            let (id, hours) = rest.split_once(':')?;
            let id = id.parse::<HabitId>().ok()?;
            let hours = hours.parse::<u32>().ok()?;
            return Some(AlarmKey::Overdue(id, hours));
        }
        None
    }

    /// The habit this key belongs to, if it is habit-scoped.
    pub fn habit_id(&self) -> Option<HabitId> {
        match self {
            AlarmKey::Due(id) | AlarmKey::Overdue(id, _) => Some(*id),
            AlarmKey::DailyCheck => None,
        }
    }
}

impl fmt::Display for AlarmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Identity of a per-habit notification channel on the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(String);

impl ChannelId {
    /// The channel id owned by a habit.
    pub fn for_habit(id: HabitId) -> Self {
        ChannelId(format!("{CHANNEL_ID_PREFIX}{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a raw channel id back to the owning habit. `None` means the
    /// id does not follow the habit-channel pattern.
    pub fn try_parse(raw: &str) -> Option<HabitId> {
        raw.strip_prefix(CHANNEL_ID_PREFIX)?.parse::<HabitId>().ok()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
