use std::path::Path;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::Deserialize;

use habitloop_core::memory::MemoryRepository;
use habitloop_core::{CompletionRecord, Habit};

/// On-disk habit set the CLI runs the engine against.
#[derive(Debug, Deserialize)]
pub struct HabitFile {
    #[serde(default)]
    pub habits: Vec<Habit>,
    #[serde(default)]
    pub completions: Vec<CompletionRecord>,
}

impl HabitFile {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let file: HabitFile = toml::from_str(&raw)?;
        Ok(file)
    }

    /// Build an in-memory repository holding this file's habits and
    /// completions.
    pub fn into_repository(self) -> Arc<MemoryRepository> {
        let repo = Arc::new(MemoryRepository::new());
        for habit in self.habits {
            repo.insert(habit);
        }
        for record in self.completions {
            repo.add_completion(record.habit_id, record.completed_date);
        }
        repo
    }
}

/// Parse a `--now` override, falling back to the local wall clock.
pub fn resolve_now(now: Option<&str>) -> Result<NaiveDateTime, Box<dyn std::error::Error>> {
    match now {
        Some(raw) => {
            let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
                .map_err(|_| format!("cannot parse --now {raw:?}, expected YYYY-MM-DDTHH:MM"))?;
            Ok(parsed)
        }
        None => Ok(Local::now().naive_local()),
    }
}
