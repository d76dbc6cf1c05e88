//! Timed-operation statistics: which timed blocking operations each run
//! used, how long it waited, and who called them.
//!
//! Each run folder may carry a three-line `timed-operations.txt`:
//! comma-separated operation names, wait times in ms, and caller names.

use crate::config::LayoutConfig;
use crate::run_aggregator::{AggregateError, RunAggregator};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

const SUMMARY_FILE: &str = "timed-operations.json";
const TOTAL_KEY: &str = "total";

/// Timed-operation usage across the runs of one leaf.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TimedOpsSummary {
    /// Runs using each operation kind, at most once per run.
    pub runs_by_operation: BTreeMap<String, u64>,
    /// Run folders inspected.
    pub total: u64,
    pub wait_times: Vec<i64>,
    pub callers: Vec<String>,
}

impl TimedOpsSummary {
    /// Fraction of runs using each operation kind.
    pub fn shares(&self) -> Vec<(&str, u64, f64)> {
        self.runs_by_operation
            .iter()
            .map(|(op, n)| {
                let share = if self.total == 0 {
                    0.0
                } else {
                    *n as f64 / self.total as f64
                };
                (op.as_str(), *n, share)
            })
            .collect()
    }

    pub fn distinct_callers(&self) -> BTreeSet<&str> {
        self.callers.iter().map(String::as_str).collect()
    }
}

/// Errors from gathering timed-operation statistics.
#[derive(Debug)]
pub enum TimedOpsError {
    List(AggregateError),
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    WaitTime {
        path: PathBuf,
        value: String,
    },
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::fmt::Display for TimedOpsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimedOpsError::List(e) => write!(f, "{e}"),
            TimedOpsError::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            TimedOpsError::WaitTime { path, value } => {
                write!(f, "invalid wait time {value:?} in {}", path.display())
            }
            TimedOpsError::Write { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for TimedOpsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TimedOpsError::List(e) => Some(e),
            TimedOpsError::Read { source, .. } => Some(source),
            TimedOpsError::WaitTime { .. } => None,
            TimedOpsError::Write { source, .. } => Some(source),
        }
    }
}

/// Collapse the many JDK condition/park/lock entry points into one kind each.
fn operation_kind(name: &str) -> &str {
    if name.contains("onLock") {
        "Lock"
    } else if name.contains("Park") {
        "Park"
    } else if name.contains("Condition") {
        "Condition"
    } else {
        name
    }
}

/// Gather statistics for one leaf and persist them as
/// `results/timed-operations.json`.
pub fn gather(leaf: &RunAggregator, layout: &LayoutConfig) -> Result<TimedOpsSummary, TimedOpsError> {
    let mut summary = TimedOpsSummary::default();

    for folder in leaf.run_folders(layout).map_err(TimedOpsError::List)? {
        summary.total += 1;
        let path = leaf.path().join(&folder).join(&layout.timed_ops_file);
        let text = std::fs::read_to_string(&path).map_err(|e| TimedOpsError::Read {
            path: path.clone(),
            source: e,
        })?;
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() < 3 {
            tracing::debug!(path = %path.display(), "incomplete timed-operations file");
            continue;
        }

        for value in lines[1].trim().split(',').filter(|v| !v.is_empty()) {
            let wait = value.parse().map_err(|_| TimedOpsError::WaitTime {
                path: path.clone(),
                value: value.to_string(),
            })?;
            summary.wait_times.push(wait);
        }
        summary
            .callers
            .extend(lines[2].trim().split(',').map(str::to_string));

        let kinds: BTreeSet<&str> = lines[0]
            .trim()
            .split(',')
            .filter(|op| !op.is_empty())
            .map(operation_kind)
            .collect();
        for kind in kinds {
            *summary.runs_by_operation.entry(kind.to_string()).or_default() += 1;
        }
    }

    let results = leaf.results_dir(layout);
    std::fs::create_dir_all(&results).map_err(|e| TimedOpsError::Write {
        path: results.clone(),
        source: e,
    })?;
    let mut counts = summary.runs_by_operation.clone();
    counts.insert(TOTAL_KEY.to_string(), summary.total);
    let json_path = results.join(SUMMARY_FILE);
    let json = serde_json::to_string(&counts).map_err(|e| TimedOpsError::Write {
        path: json_path.clone(),
        source: e.into(),
    })?;
    std::fs::write(&json_path, json).map_err(|e| TimedOpsError::Write {
        path: json_path.clone(),
        source: e,
    })?;

    tracing::info!(
        leaf = %leaf.path().display(),
        runs = summary.total,
        kinds = summary.runs_by_operation.len(),
        "gathered timed operations"
    );
    Ok(summary)
}
