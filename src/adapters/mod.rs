pub mod fray;
pub mod java;
pub mod jpf;

use crate::config::{BaselineConfig, LayoutConfig};
use crate::outcome::RunOutcome;
use std::path::{Path, PathBuf};

/// Which artifact of a run folder holds the primary log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    /// The structured execution report (`report/fray.log`).
    Report,
    /// The captured standard output (`stdout.txt`).
    Stdout,
}

impl LogSource {
    /// Resolve the log path inside `run_dir`.
    pub fn path_in(&self, run_dir: &Path, layout: &LayoutConfig) -> PathBuf {
        match self {
            LogSource::Report => run_dir.join(&layout.report_log),
            LogSource::Stdout => run_dir.join(&layout.stdout_log),
        }
    }
}

/// Technique families that share one log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TechniqueFamily {
    /// The controlled-scheduling tool itself (random, pct*, pos, ...).
    Fray,
    /// Record/replay chaos mode (`rr`): same format, iteration reported as-is.
    Replay,
    /// Java PathFinder (`jpf`).
    Jpf,
    /// Uninstrumented baseline execution (`java`).
    Java,
}

impl TechniqueFamily {
    /// Select the family from a raw technique directory name.
    pub fn from_technique(name: &str) -> Self {
        match name {
            "rr" => TechniqueFamily::Replay,
            "jpf" => TechniqueFamily::Jpf,
            "java" => TechniqueFamily::Java,
            _ => TechniqueFamily::Fray,
        }
    }

    /// Build the log adapter for this family.
    pub fn adapter(&self, baseline: &BaselineConfig) -> Box<dyn LogAdapter> {
        match self {
            TechniqueFamily::Fray => Box::new(fray::FrayAdapter::new()),
            TechniqueFamily::Replay => Box::new(fray::FrayAdapter::replay()),
            TechniqueFamily::Jpf => Box::new(jpf::JpfAdapter::new()),
            TechniqueFamily::Java => Box::new(java::JavaAdapter::new(baseline.timeout_secs)),
        }
    }
}

/// What a family parser extracts from one log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogScan {
    pub total_iter: i64,
    pub first_bug_iter: i64,
    pub first_bug_time: i64,
    /// The tool itself broke; the run says nothing about the bug.
    pub infra_failure: bool,
}

impl Default for LogScan {
    fn default() -> Self {
        Self {
            total_iter: -1,
            first_bug_iter: -1,
            first_bug_time: -1,
            infra_failure: false,
        }
    }
}

/// Errors produced by adapter operations.
#[derive(Debug)]
pub enum ExtractError {
    /// A marker matched but its number did not fit.
    Number { line: String, value: String },
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Number { line, value } => {
                write!(f, "invalid number {value:?} in log line {line:?}")
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Parse a decimal marker value, keeping the offending line for context.
pub(crate) fn parse_number(value: &str, line: &str) -> Result<i64, ExtractError> {
    value.trim().parse().map_err(|_| ExtractError::Number {
        line: line.to_string(),
        value: value.to_string(),
    })
}

/// Normalizes technique-specific run logs into a [`LogScan`].
pub trait LogAdapter {
    /// Human-readable family name (e.g., "fray", "jpf").
    fn name(&self) -> &str;

    /// Where this family writes its primary log.
    fn log_source(&self) -> LogSource;

    /// Extract iteration totals and the first-bug marker from the log text.
    fn scan(&self, text: &str) -> Result<LogScan, ExtractError>;

    /// Adjust a fully assembled outcome once the timing file is known.
    ///
    /// Families without a search loop use this to derive the outcome from
    /// the measured run time.
    fn reclassify(&self, _outcome: &mut RunOutcome) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_selection_by_technique_name() {
        assert_eq!(TechniqueFamily::from_technique("rr"), TechniqueFamily::Replay);
        assert_eq!(TechniqueFamily::from_technique("jpf"), TechniqueFamily::Jpf);
        assert_eq!(TechniqueFamily::from_technique("java"), TechniqueFamily::Java);
        for name in ["random", "pct3", "pct15", "pos", "surw", "lincheck"] {
            assert_eq!(TechniqueFamily::from_technique(name), TechniqueFamily::Fray);
        }
    }

    #[test]
    fn test_adapter_log_sources() {
        let baseline = BaselineConfig::default();
        let source = |name| TechniqueFamily::from_technique(name).adapter(&baseline).log_source();
        assert_eq!(source("random"), LogSource::Report);
        assert_eq!(source("java"), LogSource::Report);
        assert_eq!(source("rr"), LogSource::Stdout);
        assert_eq!(source("jpf"), LogSource::Stdout);
    }

    #[test]
    fn test_log_source_paths_follow_layout() {
        let layout = LayoutConfig::default();
        let run = Path::new("/data/bm/random/3");
        assert_eq!(
            LogSource::Report.path_in(run, &layout),
            PathBuf::from("/data/bm/random/3/report/fray.log")
        );
        assert_eq!(
            LogSource::Stdout.path_in(run, &layout),
            PathBuf::from("/data/bm/random/3/stdout.txt")
        );
    }

    #[test]
    fn test_parse_number_reports_line() {
        let err = parse_number("99999999999999999999", "Starting iteration 99999999999999999999")
            .unwrap_err();
        assert!(err.to_string().contains("Starting iteration"));
    }
}
