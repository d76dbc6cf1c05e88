//! Normalized per-run records and the `summary.csv` line format.
//!
//! Each run folder produces exactly one [`RunOutcome`]. Outcomes are written
//! as headerless CSV lines in a fixed column order and read back as
//! [`SummaryRow`]s with the same schema.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Tag used when a bug could not be (or was not) classified.
pub const UNCLASSIFIED: &str = "N/A";

/// Outcome category of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorResult {
    /// Completed without finding a bug.
    NoError,
    /// A genuine bug was observed.
    Error,
    /// The run crashed for reasons unrelated to the bug under test.
    Failure,
}

impl ErrorResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorResult::NoError => "NoError",
            ErrorResult::Error => "Error",
            ErrorResult::Failure => "Failure",
        }
    }
}

impl std::fmt::Display for ErrorResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed run, as extracted from its log directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub benchmark_id: String,
    pub run_index: String,
    /// Trial replicate, `"iter-1"` when the technique has no trials.
    pub trial: String,
    /// Raw technique directory name (before display remapping).
    pub technique: String,
    pub error_result: ErrorResult,
    pub bug_type: String,
    /// Milliseconds until the first bug, -1 if none.
    pub first_bug_time: i64,
    /// 1-based iteration of the first bug, -1 if none.
    pub first_bug_iter: i64,
    /// Wall-clock seconds from the timing file, 0 if unavailable.
    pub total_time: f64,
    pub total_iter: i64,
}

impl RunOutcome {
    /// `<benchmark_id>-<run_index>`, the `id` column of the summary.
    pub fn id(&self) -> String {
        format!("{}-{}", self.benchmark_id, self.run_index)
    }

    /// Build the row this outcome serializes to.
    pub fn to_row(&self) -> SummaryRow {
        SummaryRow {
            id: self.id(),
            trial: self.trial.clone(),
            error: self.error_result,
            bug_type: self.bug_type.clone(),
            bug_time: self.first_bug_time,
            bug_iter: self.first_bug_iter,
            total_time: self.total_time,
            total_iter: self.total_iter,
        }
    }
}

/// One line of `summary.csv`, in its fixed column order:
/// `[id, trial, error, type, bug_time, bug_iter, total_time, total_iter]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub id: String,
    pub trial: String,
    pub error: ErrorResult,
    #[serde(rename = "type")]
    pub bug_type: String,
    pub bug_time: i64,
    pub bug_iter: i64,
    pub total_time: f64,
    pub total_iter: i64,
}

/// Serialize rows as headerless summary lines.
pub fn write_rows<W: Write>(writer: W, rows: &[SummaryRow]) -> Result<(), csv::Error> {
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(())
}

/// Parse headerless summary lines back into rows.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<SummaryRow>, csv::Error> {
    let mut r = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);
    r.deserialize().collect()
}
