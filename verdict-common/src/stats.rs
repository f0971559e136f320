use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters kept for one registered name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStats {
    pub total_executions: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub average_execution_time_ms: f64,
    /// `None` until the first invocation.
    pub last_executed_at: Option<DateTime<Utc>>,
}

impl ExecutionStats {
    /// Fold one invocation into the counters.
    ///
    /// The average is updated incrementally from the post-increment count, so no latency
    /// history is stored.
    pub fn observe(&mut self, elapsed_ms: f64, success: bool, at: DateTime<Utc>) {
        self.total_executions += 1;
        if success {
            self.success_count += 1;
        } else {
            self.failure_count += 1;
        }
        let n = self.total_executions as f64;
        self.average_execution_time_ms =
            (self.average_execution_time_ms * (n - 1.0) + elapsed_ms) / n;
        self.last_executed_at = Some(at);
    }
}

/// Either one name's counters or every tracked name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StatsReport {
    Single(ExecutionStats),
    All(BTreeMap<String, ExecutionStats>),
}
