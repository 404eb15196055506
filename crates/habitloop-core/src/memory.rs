//! In-memory port adapters.
//!
//! Drop-in [`AlarmPort`]/[`ChannelPort`]/[`HabitRepository`]/
//! [`NotificationPort`]/[`Clock`] implementations backed by plain
//! collections. The unit tests run the whole engine against them, and the
//! CLI's replay/reconcile commands use them to show what the engine would
//! do to the host tables for a given habit set.
//!
//! The alarm and repository adapters support failure injection so
//! partial-failure isolation is testable.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::error::PortError;
use crate::habit::{CompletionRecord, Habit, HabitId};
use crate::keys::AlarmKey;
use crate::ports::{
    AlarmPort, ChannelPort, ChannelSpec, ChannelState, Clock, HabitRepository, NotificationPort,
    OverdueTone, RegisterOutcome,
};

/// One live wake-up registration in a [`MemoryAlarms`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    pub at: NaiveDateTime,
    pub exact: bool,
}

#[derive(Default)]
struct AlarmsInner {
    registered: HashMap<AlarmKey, Registration>,
    deny_exact: bool,
    fail_habits: HashSet<HabitId>,
}

/// In-memory alarm table. Registering an existing key replaces it;
/// cancelling an absent key is a no-op.
#[derive(Default)]
pub struct MemoryAlarms {
    inner: Mutex<AlarmsInner>,
}

impl MemoryAlarms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `register_exact` report [`RegisterOutcome::ExactDenied`],
    /// emulating a host that withholds exact-alarm capability.
    pub fn set_deny_exact(&self, deny: bool) {
        self.lock().deny_exact = deny;
    }

    /// Make every registration for the given habit fail.
    pub fn fail_for_habit(&self, id: HabitId) {
        self.lock().fail_habits.insert(id);
    }

    pub fn registration(&self, key: &AlarmKey) -> Option<Registration> {
        self.lock().registered.get(key).copied()
    }

    pub fn registered_keys(&self) -> Vec<AlarmKey> {
        self.lock().registered.keys().copied().collect()
    }

    /// Number of currently outstanding registrations.
    pub fn outstanding(&self) -> usize {
        self.lock().registered.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AlarmsInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_injected_failure(inner: &AlarmsInner, key: &AlarmKey) -> Result<(), PortError> {
        if key.habit_id().is_some_and(|id| inner.fail_habits.contains(&id)) {
            return Err(PortError::Alarm(format!("injected failure for {key}")));
        }
        Ok(())
    }
}

impl AlarmPort for MemoryAlarms {
    fn register_exact(
        &self,
        key: &AlarmKey,
        at: NaiveDateTime,
    ) -> Result<RegisterOutcome, PortError> {
        let mut inner = self.lock();
        Self::check_injected_failure(&inner, key)?;
        if inner.deny_exact {
            return Ok(RegisterOutcome::ExactDenied);
        }
        inner.registered.insert(*key, Registration { at, exact: true });
        Ok(RegisterOutcome::Registered)
    }

    fn register_inexact(&self, key: &AlarmKey, at: NaiveDateTime) -> Result<(), PortError> {
        let mut inner = self.lock();
        Self::check_injected_failure(&inner, key)?;
        inner.registered.insert(*key, Registration { at, exact: false });
        Ok(())
    }

    fn cancel(&self, key: &AlarmKey) -> Result<(), PortError> {
        self.lock().registered.remove(key);
        Ok(())
    }
}

#[derive(Default)]
struct ChannelsInner {
    channels: Vec<ChannelState>,
    creates: usize,
    deletes: usize,
}

/// In-memory channel table. Backed by a Vec so tests can seed duplicate
/// or foreign ids the way a real host table can contain them.
#[derive(Default)]
pub struct MemoryChannels {
    inner: Mutex<ChannelsInner>,
}

impl MemoryChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw channel state without going through `create` (and
    /// without counting it), e.g. an unparsable or duplicate id.
    pub fn seed(&self, state: ChannelState) {
        self.lock().channels.push(state);
    }

    /// Number of `create` operations performed.
    pub fn create_count(&self) -> usize {
        self.lock().creates
    }

    /// Number of `delete` operations performed.
    pub fn delete_count(&self) -> usize {
        self.lock().deletes
    }

    pub fn snapshot(&self) -> Vec<ChannelState> {
        self.lock().channels.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ChannelsInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChannelPort for MemoryChannels {
    fn create(&self, spec: &ChannelSpec) -> Result<(), PortError> {
        let mut inner = self.lock();
        inner.channels.push(ChannelState {
            id: spec.id.as_str().to_string(),
            display_name: spec.display_name.clone(),
            sound: spec.sound,
        });
        inner.creates += 1;
        Ok(())
    }

    fn delete(&self, channel_id: &str) -> Result<(), PortError> {
        let mut inner = self.lock();
        inner.channels.retain(|c| c.id != channel_id);
        inner.deletes += 1;
        Ok(())
    }

    fn list(&self) -> Result<Vec<ChannelState>, PortError> {
        Ok(self.lock().channels.clone())
    }
}

#[derive(Default)]
struct RepoInner {
    habits: Vec<Habit>,
    completions: HashMap<HabitId, Vec<CompletionRecord>>,
    fail: bool,
}

/// In-memory habit repository.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<RepoInner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, habit: Habit) {
        let mut inner = self.lock();
        inner.habits.retain(|h| h.id != habit.id);
        inner.habits.push(habit);
    }

    pub fn remove(&self, id: HabitId) {
        self.lock().habits.retain(|h| h.id != id);
    }

    pub fn add_completion(&self, id: HabitId, date: NaiveDate) {
        self.lock()
            .completions
            .entry(id)
            .or_default()
            .push(CompletionRecord { habit_id: id, completed_date: date });
    }

    /// Make every read fail, emulating a repository outage.
    pub fn set_fail(&self, fail: bool) {
        self.lock().fail = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RepoInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_fail(inner: &RepoInner) -> Result<(), PortError> {
        if inner.fail {
            return Err(PortError::Repository("injected repository failure".to_string()));
        }
        Ok(())
    }
}

impl HabitRepository for MemoryRepository {
    fn all_habits(&self) -> Result<Vec<Habit>, PortError> {
        let inner = self.lock();
        Self::check_fail(&inner)?;
        Ok(inner.habits.clone())
    }

    fn habit_by_id(&self, id: HabitId) -> Result<Option<Habit>, PortError> {
        let inner = self.lock();
        Self::check_fail(&inner)?;
        Ok(inner.habits.iter().find(|h| h.id == id).cloned())
    }

    fn completions(&self, id: HabitId) -> Result<Vec<CompletionRecord>, PortError> {
        let inner = self.lock();
        Self::check_fail(&inner)?;
        Ok(inner.completions.get(&id).cloned().unwrap_or_default())
    }
}

/// A notification request the engine asked the host to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationRequest {
    Due { habit_id: HabitId },
    Overdue { habit_id: HabitId, offset_hours: u32, tone: OverdueTone },
    DailyCompletion { habit_count: usize },
}

/// Notification port that records every request instead of rendering it.
#[derive(Default)]
pub struct RecordingNotifier {
    requests: Mutex<Vec<NotificationRequest>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<NotificationRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn push(&self, request: NotificationRequest) {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);
    }
}

impl NotificationPort for RecordingNotifier {
    fn request_due(&self, habit: &Habit) -> Result<(), PortError> {
        self.push(NotificationRequest::Due { habit_id: habit.id });
        Ok(())
    }

    fn request_overdue(
        &self,
        habit: &Habit,
        offset_hours: u32,
        tone: OverdueTone,
    ) -> Result<(), PortError> {
        self.push(NotificationRequest::Overdue { habit_id: habit.id, offset_hours, tone });
        Ok(())
    }

    fn request_daily_completion(&self, habit_count: usize) -> Result<(), PortError> {
        self.push(NotificationRequest::DailyCompletion { habit_count });
        Ok(())
    }
}

/// Clock pinned to a settable instant.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
