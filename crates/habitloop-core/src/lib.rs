//! # Habitloop Core Library
//!
//! This library provides the scheduling engine for the Habitloop habit
//! reminder system. It implements a host-agnostic core: all time
//! arithmetic, escalation policy, and repair logic live here, while the
//! host platform supplies wake-ups, notification channels, and habit
//! storage through a small set of port traits.
//!
//! ## Architecture
//!
//! - **Recurrence**: Pure next-occurrence arithmetic for daily, weekly,
//!   monthly and yearly habits, including end-of-month clamping
//! - **Schedulers**: Keyed wake-up owners for due reminders, the overdue
//!   escalation ladder, and the nightly completion check
//! - **Reliability**: Full replay after reboot, clock change or host
//!   upgrade, plus a periodic backstop sweep
//! - **Dispatch**: Routes fired wake-ups to handlers under a keep-alive
//!   token that is released on every exit path
//!
//! ## Key Components
//!
//! - [`ReminderScheduler`]: Arms the next due-time wake-up per habit
//! - [`OverdueEscalationScheduler`]: Arms the 2-6 hour overdue ladder
//! - [`DailyCompletionCheck`]: The 23:50 all-habits-done check
//! - [`ChannelReconciler`]: Keeps the host channel table in sync
//! - [`ReliabilityCoordinator`]: Replay and backstop
//! - [`AlarmPort`]/[`ChannelPort`]/[`HabitRepository`]/[`NotificationPort`]:
//!   Traits the host implements

pub mod channels;
pub mod completion;
pub mod config;
pub mod daily;
pub mod dispatch;
pub mod error;
pub mod habit;
pub mod handlers;
pub mod keys;
pub mod memory;
pub mod overdue;
pub mod ports;
pub mod recurrence;
pub mod reliability;
pub mod reminder;

pub use channels::{ChannelReconciler, ReconcileSummary};
pub use config::EngineConfig;
pub use daily::DailyCompletionCheck;
pub use dispatch::{CompletionToken, Dispatcher};
pub use error::{ConfigError, CoreError, PortError};
pub use habit::{CompletionRecord, Habit, HabitFrequency, HabitId, NotificationSound};
pub use handlers::FireHandlers;
pub use keys::{AlarmKey, ChannelId};
pub use overdue::{
    overdue_status, OverdueEscalationScheduler, OverdueStatus, AGGRESSIVE_THRESHOLD_HOURS,
    INITIAL_LADDER_HOURS,
};
pub use ports::{
    AlarmPort, ChannelPort, ChannelSpec, ChannelState, Clock, HabitRepository, NotificationPort,
    OverdueTone, RegisterOutcome, SystemClock,
};
pub use reliability::{BackstopOutcome, LifecycleEvent, ReliabilityCoordinator, ReplaySummary};
pub use reminder::ReminderScheduler;
