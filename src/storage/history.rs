// Rolling state snapshot, fully rewritten each run
use crate::model::{OutputError, RankedResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub code: String,
    pub above_ma20: Option<bool>,
    pub cross_date: Option<NaiveDate>,
}

/// An index whose above/below state differs from the previous run.
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub code: String,
    pub previous: Option<bool>,
    pub current: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    entries: Vec<HistoryEntry>,
}

impl HistorySnapshot {
    pub fn from_results(results: &[RankedResult]) -> Self {
        Self {
            entries: results
                .iter()
                .map(|r| HistoryEntry {
                    code: r.index_spec.code.clone(),
                    above_ma20: r.trend_state.as_ref().and_then(|t| t.above_ma20),
                    cross_date: r.trend_state.as_ref().and_then(|t| t.cross_date),
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn get(&self, code: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.code == code)
    }

    /// `Ok(None)` when no snapshot has been written yet.
    pub fn load(path: &Path) -> Result<Option<Self>, OutputError> {
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = csv::Reader::from_path(path)?;
        let entries = reader
            .deserialize::<HistoryEntry>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Self { entries }))
    }

    /// Overwrites `path` with this snapshot.
    pub fn save(&self, path: &Path) -> Result<(), OutputError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Indices present in both snapshots whose state differs.
    pub fn changes_since(&self, previous: &HistorySnapshot) -> Vec<StateChange> {
        self.entries
            .iter()
            .filter_map(|current| {
                let before = previous.get(&current.code)?;
                (before.above_ma20 != current.above_ma20).then(|| StateChange {
                    code: current.code.clone(),
                    previous: before.above_ma20,
                    current: current.above_ma20,
                })
            })
            .collect()
    }
}
