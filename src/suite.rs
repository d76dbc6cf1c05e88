//! Suite discovery and the merged long-form results table.
//!
//! Layout under each root: `<root>/<technique>/[<trial>/]<run>/`. A
//! technique directory containing `iter-0` holds one subdirectory per
//! trial; otherwise it is a single implicit trial.

use crate::outcome::{ErrorResult, SummaryRow};
use crate::run_aggregator::{AggregateError, ExtractContext, LoadError, RunAggregator};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Name of the first trial directory; its presence marks a multi-trial technique.
const FIRST_TRIAL: &str = "iter-0";

/// Maps raw technique directory names to the labels used in every table.
#[derive(Debug, Clone)]
pub struct DisplayNames {
    tool: String,
}

impl DisplayNames {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    /// Display label for a raw technique name. Unknown names are upper-cased.
    pub fn display_name(&self, raw: &str) -> String {
        if raw == "random" {
            return format!("{}-Random", self.tool);
        }
        if let Some(rest) = raw.strip_prefix("pct") {
            return format!("{}-PCT{}", self.tool, rest.replace("pct", ""));
        }
        if raw.starts_with("pos") {
            return format!("{}-POS", self.tool);
        }
        match raw {
            "rr" => "RR-Chaos".to_string(),
            "jpf" => "JPF-Random".to_string(),
            "java" => "Original".to_string(),
            _ => raw.to_uppercase(),
        }
    }
}

impl Default for DisplayNames {
    fn default() -> Self {
        Self::new("Fray")
    }
}

/// One summary row tagged with its technique's display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRow {
    pub id: String,
    pub trial: String,
    pub error: ErrorResult,
    #[serde(rename = "type")]
    pub bug_type: String,
    pub bug_time: i64,
    pub bug_iter: i64,
    pub total_time: f64,
    pub total_iter: i64,
    pub technique: String,
}

impl MergedRow {
    pub fn from_summary(row: SummaryRow, technique: String) -> Self {
        Self {
            id: row.id,
            trial: row.trial,
            error: row.error,
            bug_type: row.bug_type,
            bug_time: row.bug_time,
            bug_iter: row.bug_iter,
            total_time: row.total_time,
            total_iter: row.total_iter,
            technique,
        }
    }
}

/// Errors from aggregating a whole suite.
#[derive(Debug)]
pub enum SuiteError {
    Discover {
        path: PathBuf,
        source: std::io::Error,
    },
    Aggregate(AggregateError),
    Load(LoadError),
}

impl std::fmt::Display for SuiteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuiteError::Discover { path, source } => {
                write!(f, "failed to list {}: {source}", path.display())
            }
            SuiteError::Aggregate(e) => write!(f, "{e}"),
            SuiteError::Load(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SuiteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SuiteError::Discover { source, .. } => Some(source),
            SuiteError::Aggregate(e) => Some(e),
            SuiteError::Load(e) => Some(e),
        }
    }
}

impl From<AggregateError> for SuiteError {
    fn from(e: AggregateError) -> Self {
        SuiteError::Aggregate(e)
    }
}

impl From<LoadError> for SuiteError {
    fn from(e: LoadError) -> Self {
        SuiteError::Load(e)
    }
}

/// Sorted subdirectory names of `dir`.
fn subdirs(dir: &Path) -> Result<Vec<PathBuf>, SuiteError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SuiteError::Discover {
        path: dir.to_path_buf(),
        source: e,
    })?;
    let mut dirs: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Every leaf found under a set of benchmark roots.
#[derive(Debug, Clone)]
pub struct BenchmarkSuite {
    leaves: Vec<RunAggregator>,
}

impl BenchmarkSuite {
    /// Walk each root and build one aggregator per (technique, trial) leaf.
    pub fn discover<P: AsRef<Path>>(roots: &[P]) -> Result<Self, SuiteError> {
        let mut leaves = Vec::new();
        for root in roots {
            let root = std::path::absolute(root.as_ref()).map_err(|e| SuiteError::Discover {
                path: root.as_ref().to_path_buf(),
                source: e,
            })?;
            for technique_dir in subdirs(&root)? {
                if technique_dir.join(FIRST_TRIAL).exists() {
                    for trial_dir in subdirs(&technique_dir)? {
                        leaves.push(RunAggregator::new(trial_dir, true));
                    }
                } else {
                    leaves.push(RunAggregator::new(technique_dir, false));
                }
            }
        }
        tracing::debug!(leaves = leaves.len(), "discovered result leaves");
        Ok(Self { leaves })
    }

    pub fn leaves(&self) -> &[RunAggregator] {
        &self.leaves
    }

    /// Re-aggregate every leaf and merge the summaries into one table.
    pub fn aggregate(
        &self,
        ctx: &ExtractContext<'_>,
        names: &DisplayNames,
    ) -> Result<Vec<MergedRow>, SuiteError> {
        let mut merged = Vec::new();
        for leaf in &self.leaves {
            leaf.write_summary(ctx)?;
            let display = names.display_name(leaf.technique());
            merged.extend(
                leaf.load(ctx.layout)?
                    .into_iter()
                    .map(|row| MergedRow::from_summary(row, display.clone())),
            );
        }
        tracing::info!(rows = merged.len(), leaves = self.leaves.len(), "merged results");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ClassifierRegistry;
    use crate::config::{BaselineConfig, LayoutConfig};
    use tempfile::tempdir;

    fn run(dir: &Path, log: &str) {
        std::fs::create_dir_all(dir.join("report")).unwrap();
        std::fs::write(dir.join("report/fray.log"), log).unwrap();
    }

    #[test]
    fn remap_covers_known_techniques() {
        let names = DisplayNames::default();
        assert_eq!(names.display_name("random"), "Fray-Random");
        assert_eq!(names.display_name("pct3"), "Fray-PCT3");
        assert_eq!(names.display_name("pct15"), "Fray-PCT15");
        assert_eq!(names.display_name("pos"), "Fray-POS");
        assert_eq!(names.display_name("rr"), "RR-Chaos");
        assert_eq!(names.display_name("jpf"), "JPF-Random");
        assert_eq!(names.display_name("java"), "Original");
        assert_eq!(names.display_name("foo"), "FOO");
        assert_eq!(names.display_name("surw"), "SURW");
    }

    #[test]
    fn remap_is_stable() {
        let names = DisplayNames::default();
        for raw in ["pct3", "pos", "rr", "jpf", "java", "random", "foo"] {
            assert_eq!(names.display_name(raw), names.display_name(raw));
        }
    }

    #[test]
    fn remap_uses_configured_tool_name() {
        let names = DisplayNames::new("Sched");
        assert_eq!(names.display_name("random"), "Sched-Random");
        assert_eq!(names.display_name("pct3"), "Sched-PCT3");
        assert_eq!(names.display_name("rr"), "RR-Chaos");
    }

    #[test]
    fn discover_single_and_multi_trial() {
        let root = tempdir().unwrap();
        let bench = root.path().join("sctbench");
        run(&bench.join("random/0"), "Starting iteration 0\n");
        run(&bench.join("pct3/iter-0/0"), "Starting iteration 0\n");
        run(&bench.join("pct3/iter-1/0"), "Starting iteration 0\n");
        std::fs::write(bench.join("notes.txt"), "ignored").unwrap();

        let suite = BenchmarkSuite::discover(&[&bench]).unwrap();
        let leaves: Vec<(&str, &str, &str)> = suite
            .leaves()
            .iter()
            .map(|l| (l.benchmark(), l.technique(), l.trial()))
            .collect();
        assert_eq!(
            leaves,
            vec![
                ("sctbench", "pct3", "iter-0"),
                ("sctbench", "pct3", "iter-1"),
                ("sctbench", "random", "iter-1"),
            ]
        );
    }

    #[test]
    fn aggregate_merges_and_tags_display_names() {
        let root = tempdir().unwrap();
        let bench = root.path().join("sctbench");
        run(&bench.join("random/0"), "Error found at iter: 1 Elapsed time: 20\n");
        run(&bench.join("random/1"), "Starting iteration 9\n");
        run(&bench.join("foo/iter-0/0"), "Starting iteration 0\n");

        let layout = LayoutConfig::default();
        let baseline = BaselineConfig::default();
        let classifiers = ClassifierRegistry::with_builtins();
        let ctx = ExtractContext {
            layout: &layout,
            baseline: &baseline,
            classifiers: &classifiers,
        };

        let suite = BenchmarkSuite::discover(&[&bench]).unwrap();
        let rows = suite.aggregate(&ctx, &DisplayNames::default()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].technique, "FOO");
        assert_eq!(rows[0].trial, "iter-0");
        assert_eq!(rows[1].technique, "Fray-Random");
        assert_eq!(rows[1].id, "sctbench-0");
        assert_eq!(rows[1].error, ErrorResult::Error);
        assert_eq!(rows[2].total_iter, 10);
        assert!(bench.join("random/results/summary.csv").exists());
        assert!(bench.join("foo/iter-0/results/summary.csv").exists());
    }

    #[test]
    fn missing_root_is_an_error() {
        let root = tempdir().unwrap();
        let err = BenchmarkSuite::discover(&[root.path().join("absent")]).unwrap_err();
        assert!(matches!(err, SuiteError::Discover { .. }));
    }
}
