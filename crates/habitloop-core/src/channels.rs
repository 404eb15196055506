//! Reconciliation of per-habit notification channels.
//!
//! The host's channel table is external state the engine cannot trust: an
//! interrupted deletion leaves orphans, a botched migration leaves
//! duplicates or foreign ids. [`ChannelReconciler::reconcile`] re-derives
//! the whole table from the live habit set in three independent cleanup
//! passes (unparsable ids, orphans, duplicates) followed by creation of
//! whatever is missing. Run twice with no habit change, the second pass
//! performs zero operations.
//!
//! Channels are immutable once created on the host, so a sound change is
//! applied as delete-then-create, never in-place mutation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PortError;
use crate::habit::{Habit, HabitId};
use crate::keys::ChannelId;
use crate::ports::{ChannelPort, ChannelSpec};

/// What one reconcile pass did to the channel table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Channels deleted because their id did not parse.
    pub deleted_unparsable: usize,
    /// Channels deleted because their habit is gone or soft-deleted.
    pub deleted_orphans: usize,
    /// Channels deleted because their habit id appeared more than once.
    pub deleted_duplicates: usize,
    /// Channels created for active habits that had none.
    pub created: usize,
}

impl ReconcileSummary {
    /// Whether the pass touched the table at all.
    pub fn changed(&self) -> bool {
        self.deleted_unparsable + self.deleted_orphans + self.deleted_duplicates + self.created > 0
    }
}

pub struct ChannelReconciler {
    channels: Arc<dyn ChannelPort>,
}

impl ChannelReconciler {
    pub fn new(channels: Arc<dyn ChannelPort>) -> Self {
        Self { channels }
    }

    /// Bring the channel table into bijection with the active habit set.
    pub fn reconcile(&self, habits: &[Habit]) -> Result<ReconcileSummary, PortError> {
        let mut summary = ReconcileSummary::default();
        let active: HashMap<HabitId, &Habit> =
            habits.iter().filter(|h| !h.is_deleted).map(|h| (h.id, h)).collect();

        let existing = self.channels.list()?;
        let mut removed: HashSet<String> = HashSet::new();

        // Pass 1: ids that do not follow the habit-channel pattern.
        for state in &existing {
            if ChannelId::try_parse(&state.id).is_none() {
                warn!(channel_id = %state.id, "deleting channel with unparsable id");
                self.channels.delete(&state.id)?;
                removed.insert(state.id.clone());
                summary.deleted_unparsable += 1;
            }
        }

        // Pass 2: channels whose habit no longer exists or is soft-deleted.
        for state in &existing {
            if removed.contains(&state.id) {
                continue;
            }
            let Some(habit_id) = ChannelId::try_parse(&state.id) else { continue };
            if !active.contains_key(&habit_id) {
                debug!(channel_id = %state.id, habit_id, "deleting orphaned channel");
                self.channels.delete(&state.id)?;
                removed.insert(state.id.clone());
                summary.deleted_orphans += 1;
            }
        }

        // Pass 3: habit ids with more than one channel lose all of them;
        // the creation step below rebuilds a single fresh one.
        let mut per_habit: HashMap<HabitId, usize> = HashMap::new();
        for state in &existing {
            if removed.contains(&state.id) {
                continue;
            }
            if let Some(habit_id) = ChannelId::try_parse(&state.id) {
                *per_habit.entry(habit_id).or_default() += 1;
            }
        }
        for (&habit_id, &count) in &per_habit {
            if count > 1 {
                let id = ChannelId::for_habit(habit_id);
                warn!(habit_id, count, "deleting duplicated channels");
                self.channels.delete(id.as_str())?;
                removed.insert(id.as_str().to_string());
                summary.deleted_duplicates += count;
            }
        }

        // Create whatever the cleanup left missing.
        let surviving: HashSet<HabitId> = existing
            .iter()
            .filter(|s| !removed.contains(&s.id))
            .filter_map(|s| ChannelId::try_parse(&s.id))
            .collect();
        for (habit_id, habit) in &active {
            if !surviving.contains(habit_id) {
                self.channels.create(&Self::spec_for(habit))?;
                summary.created += 1;
            }
        }

        debug!(?summary, "channel reconcile finished");
        Ok(summary)
    }

    /// Make sure this one habit's channel exists and matches its sound.
    ///
    /// Used on the hot notification path just before a notification is
    /// shown. A channel with a stale sound is deleted and recreated.
    pub fn ensure_channel(&self, habit: &Habit) -> Result<(), PortError> {
        let id = ChannelId::for_habit(habit.id);
        let existing = self
            .channels
            .list()?
            .into_iter()
            .find(|state| state.id == id.as_str());

        match existing {
            Some(state) if state.sound == habit.sound => Ok(()),
            Some(state) => {
                debug!(
                    habit_id = habit.id,
                    stale = ?state.sound,
                    current = ?habit.sound,
                    "channel sound is stale, recreating"
                );
                self.channels.delete(id.as_str())?;
                self.channels.create(&Self::spec_for(habit))
            }
            None => self.channels.create(&Self::spec_for(habit)),
        }
    }

    /// Remove the channel for a permanently purged habit.
    pub fn delete_channel(&self, habit_id: HabitId) -> Result<(), PortError> {
        self.channels.delete(ChannelId::for_habit(habit_id).as_str())
    }

    /// Remove channels for a batch of purged habits.
    pub fn delete_channels(&self, habit_ids: &[HabitId]) -> Result<(), PortError> {
        for id in habit_ids {
            self.delete_channel(*id)?;
        }
        Ok(())
    }

    fn spec_for(habit: &Habit) -> ChannelSpec {
        ChannelSpec {
            id: ChannelId::for_habit(habit.id),
            display_name: habit.title.clone(),
            sound: habit.sound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::habit::{HabitFrequency, NotificationSound};
    use crate::memory::MemoryChannels;
    use crate::ports::ChannelState;

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

    fn raw_channel(id: &str) -> ChannelState {
        ChannelState {
            id: id.to_string(),
            display_name: "stale".to_string(),
            sound: NotificationSound::Default,
        }
    }

    #[test]
    fn reconcile_creates_channels_for_active_habits() {
        let channels = Arc::new(MemoryChannels::new());
        let reconciler = ChannelReconciler::new(channels.clone());

        let habits = vec![make_habit(1), make_habit(2)];
        let summary = reconciler.reconcile(&habits).unwrap();

        assert_eq!(summary.created, 2);
        assert_eq!(channels.snapshot().len(), 2);
    }

    #[test]
    fn reconcile_is_idempotent() {
        let channels = Arc::new(MemoryChannels::new());
        let reconciler = ChannelReconciler::new(channels.clone());
        let habits = vec![make_habit(1), make_habit(2)];

        reconciler.reconcile(&habits).unwrap();
        let creates = channels.create_count();
        let deletes = channels.delete_count();

        let second = reconciler.reconcile(&habits).unwrap();
        assert!(!second.changed());
        assert_eq!(channels.create_count(), creates);
        assert_eq!(channels.delete_count(), deletes);
    }

    #[test]
    fn reconcile_deletes_unparsable_ids() {
        let channels = Arc::new(MemoryChannels::new());
        channels.seed(raw_channel("chat_channel_5"));
        channels.seed(raw_channel("habit_channel_not_a_number"));
        let reconciler = ChannelReconciler::new(channels.clone());

        let summary = reconciler.reconcile(&[]).unwrap();

        assert_eq!(summary.deleted_unparsable, 2);
        assert!(channels.snapshot().is_empty());
    }

    #[test]
    fn reconcile_deletes_orphans_of_deleted_habits() {
        let channels = Arc::new(MemoryChannels::new());
        channels.seed(raw_channel("habit_channel_9"));
        let reconciler = ChannelReconciler::new(channels.clone());

        let mut deleted = make_habit(9);
        deleted.is_deleted = true;
        let summary = reconciler.reconcile(&[deleted]).unwrap();

        assert_eq!(summary.deleted_orphans, 1);
        assert_eq!(summary.created, 0);
        assert!(channels.snapshot().is_empty());
    }

    #[test]
    fn reconcile_collapses_duplicates_to_one_fresh_channel() {
        let channels = Arc::new(MemoryChannels::new());
        channels.seed(raw_channel("habit_channel_1"));
        channels.seed(raw_channel("habit_channel_1"));
        let reconciler = ChannelReconciler::new(channels.clone());

        let summary = reconciler.reconcile(&[make_habit(1)]).unwrap();

        assert_eq!(summary.deleted_duplicates, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(channels.snapshot().len(), 1);
    }

    #[test]
    fn ensure_channel_recreates_on_sound_change() {
        let channels = Arc::new(MemoryChannels::new());
        let reconciler = ChannelReconciler::new(channels.clone());

        let mut habit = make_habit(1);
        reconciler.ensure_channel(&habit).unwrap();
        assert_eq!(channels.create_count(), 1);

        habit.sound = NotificationSound::Alarm;
        reconciler.ensure_channel(&habit).unwrap();

        assert_eq!(channels.delete_count(), 1);
        assert_eq!(channels.create_count(), 2);
        let snapshot = channels.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].sound, NotificationSound::Alarm);
    }

    #[test]
    fn ensure_channel_with_matching_sound_does_nothing() {
        let channels = Arc::new(MemoryChannels::new());
        let reconciler = ChannelReconciler::new(channels.clone());

        let habit = make_habit(1);
        reconciler.ensure_channel(&habit).unwrap();
        reconciler.ensure_channel(&habit).unwrap();

        assert_eq!(channels.create_count(), 1);
        assert_eq!(channels.delete_count(), 0);
    }

    #[test]
    fn delete_channels_removes_each_habit_channel() {
        let channels = Arc::new(MemoryChannels::new());
        let reconciler = ChannelReconciler::new(channels.clone());
        reconciler.reconcile(&[make_habit(1), make_habit(2)]).unwrap();

        reconciler.delete_channels(&[1, 2]).unwrap();

        assert!(channels.snapshot().is_empty());
    }
}
