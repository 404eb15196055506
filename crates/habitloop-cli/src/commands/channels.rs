use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use serde::Serialize;

use habitloop_core::memory::MemoryChannels;
use habitloop_core::{ChannelReconciler, ChannelState, NotificationSound};

use crate::common::HabitFile;

#[derive(Subcommand)]
pub enum ChannelsAction {
    /// Reconcile a channel table against the habit set and print what
    /// would change
    Reconcile {
        /// Habit file (TOML)
        #[arg(long)]
        habits: PathBuf,
        /// Existing channel ids to seed the table with (repeatable)
        #[arg(long = "existing")]
        existing: Vec<String>,
    },
}

#[derive(Serialize)]
struct ReconcileReport {
    deleted_unparsable: usize,
    deleted_orphans: usize,
    deleted_duplicates: usize,
    created: usize,
    table: Vec<String>,
}

pub fn run(action: ChannelsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ChannelsAction::Reconcile { habits, existing } => {
            let file = HabitFile::load(&habits)?;
            let channels = Arc::new(MemoryChannels::new());
            for id in existing {
                channels.seed(ChannelState {
                    id,
                    display_name: String::new(),
                    sound: NotificationSound::Default,
                });
            }

            let reconciler = ChannelReconciler::new(channels.clone());
            let summary = reconciler.reconcile(&file.habits)?;

            let mut table: Vec<String> =
                channels.snapshot().into_iter().map(|c| c.id).collect();
            table.sort();
            let report = ReconcileReport {
                deleted_unparsable: summary.deleted_unparsable,
                deleted_orphans: summary.deleted_orphans,
                deleted_duplicates: summary.deleted_duplicates,
                created: summary.created,
                table,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
