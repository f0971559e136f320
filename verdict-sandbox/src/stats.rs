//! Per-name execution counters

use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeMap;
use verdict_common::{ExecutionStats, StatsReport};

/// Counters keyed by registered name.
///
/// Each entry lives in one `DashMap` shard; `record` updates all counters of an entry while
/// holding that shard's write lock, so concurrent calls for the same name never lose an update.
#[derive(Debug, Default)]
pub struct StatsRecorder {
    entries: DashMap<String, ExecutionStats>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one invocation into the counters for `name`, creating them on first use.
    pub fn record(&self, name: &str, elapsed_ms: f64, success: bool) {
        self.entries
            .entry(name.to_string())
            .or_default()
            .observe(elapsed_ms, success, Utc::now());
    }

    /// Counters for `name`; an unknown name yields a zeroed record.
    pub fn get(&self, name: &str) -> ExecutionStats {
        self.entries
            .get(name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Snapshot of every tracked name, sorted by name
    pub fn all(&self) -> BTreeMap<String, ExecutionStats> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn get_stats(&self, name: Option<&str>) -> StatsReport {
        match name {
            Some(name) => StatsReport::Single(self.get(name)),
            None => StatsReport::All(self.all()),
        }
    }

    /// Drop the counters for `name`. Returns whether anything was tracked.
    pub fn reset(&self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
