//! Ports consumed by the scheduling engine.
//!
//! The engine owns no storage and no delivery mechanism; everything it
//! touches in the outside world goes through one of these traits:
//! - [`AlarmPort`] — the host's wake-up table
//! - [`ChannelPort`] — the host's notification-channel table
//! - [`HabitRepository`] — read access to habits and completions
//! - [`NotificationPort`] — notification rendering/delivery
//! - [`Clock`] — the current local wall-clock time
//!
//! All traits are object-safe and `Send + Sync`; the engine holds them as
//! `Arc<dyn …>`. Callbacks from the host carry only identifying keys and
//! handlers re-derive current truth through [`HabitRepository`].

use chrono::{Local, NaiveDate, NaiveDateTime};

use crate::error::PortError;
use crate::habit::{CompletionRecord, Habit, HabitId, NotificationSound};
use crate::keys::{AlarmKey, ChannelId};

/// Outcome of an exact wake-up registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Registered with exact delivery.
    Registered,
    /// The host denied exact-alarm capability; nothing was registered.
    /// Callers fall back to inexact delivery with the same key.
    ExactDenied,
}

/// The host's alarm table. Registrations are keyed; registering an
/// existing key replaces it, and cancelling an absent key is a no-op.
pub trait AlarmPort: Send + Sync {
    fn register_exact(
        &self,
        key: &AlarmKey,
        at: NaiveDateTime,
    ) -> Result<RegisterOutcome, PortError>;

    fn register_inexact(&self, key: &AlarmKey, at: NaiveDateTime) -> Result<(), PortError>;

    fn cancel(&self, key: &AlarmKey) -> Result<(), PortError>;
}

/// Desired configuration for a notification channel about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSpec {
    pub id: ChannelId,
    pub display_name: String,
    pub sound: NotificationSound,
}

/// A channel as it currently exists on the host. The raw id is kept as a
/// string because the table may contain ids the engine never created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    pub id: String,
    pub display_name: String,
    pub sound: NotificationSound,
}

/// The host's notification-channel table. Channels are immutable once
/// created; "update" is always delete-then-create.
pub trait ChannelPort: Send + Sync {
    fn create(&self, spec: &ChannelSpec) -> Result<(), PortError>;

    fn delete(&self, channel_id: &str) -> Result<(), PortError>;

    fn list(&self) -> Result<Vec<ChannelState>, PortError>;
}

/// Read access to the habit store. The storage engine behind it is an
/// external collaborator.
pub trait HabitRepository: Send + Sync {
    fn all_habits(&self) -> Result<Vec<Habit>, PortError>;

    fn habit_by_id(&self, id: HabitId) -> Result<Option<Habit>, PortError>;

    fn completions(&self, id: HabitId) -> Result<Vec<CompletionRecord>, PortError>;
}

/// Intensity tier of an overdue notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverdueTone {
    /// Supportive nudge for the early ladder rungs.
    Encouraging,
    /// Blunt variant once the habit is six or more hours late.
    Aggressive,
}

/// Outbound notification requests. Copy generation and rendering are
/// external collaborators; the engine only says what kind to show.
pub trait NotificationPort: Send + Sync {
    fn request_due(&self, habit: &Habit) -> Result<(), PortError>;

    fn request_overdue(
        &self,
        habit: &Habit,
        offset_hours: u32,
        tone: OverdueTone,
    ) -> Result<(), PortError>;

    fn request_daily_completion(&self, habit_count: usize) -> Result<(), PortError>;
}

/// Source of "now" in the habit's local time zone. Injected so triggers
/// are computable in tests without touching the system clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Production clock reading local wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
