//! Execution counters and bounded learning logs.
//!
//! Statistics are for reporting only; admission decisions belong to the
//! circuit breaker and rate limiter.

use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, SystemTime};

use serde::Serialize;
use serde_json::Value;

use crate::{ToolError, ToolErrorKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum LearningOutcome {
    #[serde(rename_all = "camelCase")]
    Success { execution_time_ms: f64 },
    #[serde(rename_all = "camelCase")]
    Failure { error: ToolErrorKind, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningRecord {
    pub tool_name: String,
    pub args: Value,
    pub outcome: LearningOutcome,
    pub timestamp: SystemTime,
}

/// Fixed-capacity ring buffer; pushing past capacity evicts the oldest record.
#[derive(Debug, Clone)]
pub struct LearningLog {
    capacity: usize,
    records: VecDeque<LearningRecord>,
}

impl LearningLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, record: LearningRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn records(&self) -> impl Iterator<Item = &LearningRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LearningSnapshot {
    pub successes: Vec<LearningRecord>,
    pub failures: Vec<LearningRecord>,
}

#[derive(Debug, Clone)]
pub struct ExecutionStats {
    total_calls: u64,
    successful_calls: u64,
    failed_calls: u64,
    cache_hits: u64,
    timed_calls: u64,
    average_execution_ms: f64,
    per_tool_usage: BTreeMap<String, u64>,
    successes: LearningLog,
    failures: LearningLog,
}

impl ExecutionStats {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            total_calls: 0,
            successful_calls: 0,
            failed_calls: 0,
            cache_hits: 0,
            timed_calls: 0,
            average_execution_ms: 0.0,
            per_tool_usage: BTreeMap::new(),
            successes: LearningLog::new(log_capacity),
            failures: LearningLog::new(log_capacity),
        }
    }

    fn count_call(&mut self, tool_name: Option<&str>) {
        self.total_calls += 1;
        if let Some(tool_name) = tool_name {
            *self.per_tool_usage.entry(tool_name.to_string()).or_insert(0) += 1;
        }
    }

    pub fn record_unknown_tool(&mut self) {
        self.count_call(None);
        self.failed_calls += 1;
    }

    /// A registered tool's call was refused before dispatch.
    pub fn record_rejection(&mut self, tool_name: &str) {
        self.count_call(Some(tool_name));
        self.failed_calls += 1;
    }

    pub fn record_cache_hit(&mut self, tool_name: &str) {
        self.count_call(Some(tool_name));
        self.successful_calls += 1;
        self.cache_hits += 1;
    }

    pub fn record_success(&mut self, tool_name: &str, args: &Value, latency: Duration) {
        self.count_call(Some(tool_name));
        self.successful_calls += 1;
        self.timed_calls += 1;

        let latency_ms = latency.as_secs_f64() * 1000.0;
        let n = self.timed_calls as f64;
        self.average_execution_ms = (self.average_execution_ms * (n - 1.0) + latency_ms) / n;

        self.successes.push(LearningRecord {
            tool_name: tool_name.to_string(),
            args: args.clone(),
            outcome: LearningOutcome::Success {
                execution_time_ms: latency_ms,
            },
            timestamp: SystemTime::now(),
        });
    }

    pub fn record_failure(&mut self, tool_name: &str, args: &Value, error: &ToolError) {
        self.count_call(Some(tool_name));
        self.failed_calls += 1;

        self.failures.push(LearningRecord {
            tool_name: tool_name.to_string(),
            args: args.clone(),
            outcome: LearningOutcome::Failure {
                error: error.kind,
                message: error.message.clone(),
            },
            timestamp: SystemTime::now(),
        });
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls
    }

    pub fn successful_calls(&self) -> u64 {
        self.successful_calls
    }

    pub fn failed_calls(&self) -> u64 {
        self.failed_calls
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.successful_calls as f64 / self.total_calls as f64
        }
    }

    pub fn average_execution_ms(&self) -> f64 {
        self.average_execution_ms
    }

    pub fn per_tool_usage(&self) -> &BTreeMap<String, u64> {
        &self.per_tool_usage
    }

    pub fn successes(&self) -> &LearningLog {
        &self.successes
    }

    pub fn failures(&self) -> &LearningLog {
        &self.failures
    }

    pub fn learning_snapshot(&self) -> LearningSnapshot {
        LearningSnapshot {
            successes: self.successes.records().cloned().collect(),
            failures: self.failures.records().cloned().collect(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.successes.capacity());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub success_rate: f64,
    #[serde(rename = "averageExecutionTime")]
    pub average_execution_ms: f64,
    pub per_tool_usage: BTreeMap<String, u64>,
    pub cache_size: usize,
    pub cache_hits: u64,
    pub open_circuits: Vec<String>,
    pub registered_tools: usize,
    pub recent_failures: usize,
}
