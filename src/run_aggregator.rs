//! One (benchmark, technique, trial) leaf: parse every run folder and
//! persist the normalized records to `results/summary.csv`.

use crate::adapters::{ExtractError, LogAdapter, TechniqueFamily};
use crate::classify::ClassifierRegistry;
use crate::config::{BaselineConfig, LayoutConfig};
use crate::outcome::{self, ErrorResult, RunOutcome, SummaryRow, UNCLASSIFIED};
use crate::timing::{self, TimingError};
use std::path::{Path, PathBuf};

/// Trial name used when a technique directory holds runs directly.
pub const IMPLICIT_TRIAL: &str = "iter-1";

/// Marker printed by the tools whenever a bug is reported.
const ERROR_FOUND: &str = "Error found";

const SUMMARY_FILE: &str = "summary.csv";

/// Everything run extraction needs besides the leaf itself.
pub struct ExtractContext<'a> {
    pub layout: &'a LayoutConfig,
    pub baseline: &'a BaselineConfig,
    pub classifiers: &'a ClassifierRegistry,
}

/// Errors that abort aggregation of a leaf.
#[derive(Debug)]
pub enum AggregateError {
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// A run folder has no primary log.
    MissingLog {
        path: PathBuf,
        source: std::io::Error,
    },
    Extract {
        path: PathBuf,
        source: ExtractError,
    },
    Timing(TimingError),
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize {
        path: PathBuf,
        source: csv::Error,
    },
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateError::ReadDir { path, source } => {
                write!(f, "failed to list {}: {source}", path.display())
            }
            AggregateError::MissingLog { path, source } => {
                write!(f, "failed to read run log {}: {source}", path.display())
            }
            AggregateError::Extract { path, source } => {
                write!(f, "failed to parse {}: {source}", path.display())
            }
            AggregateError::Timing(e) => write!(f, "{e}"),
            AggregateError::Write { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
            AggregateError::Serialize { path, source } => {
                write!(f, "failed to serialize {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AggregateError::ReadDir { source, .. } => Some(source),
            AggregateError::MissingLog { source, .. } => Some(source),
            AggregateError::Extract { source, .. } => Some(source),
            AggregateError::Timing(e) => Some(e),
            AggregateError::Write { source, .. } => Some(source),
            AggregateError::Serialize { source, .. } => Some(source),
        }
    }
}

impl From<TimingError> for AggregateError {
    fn from(e: TimingError) -> Self {
        AggregateError::Timing(e)
    }
}

/// Errors from reading a persisted summary back.
#[derive(Debug)]
pub enum LoadError {
    /// Aggregation has not been run for this leaf.
    NoResults { path: PathBuf },
    Read { path: PathBuf, source: csv::Error },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::NoResults { path } => {
                write!(f, "no results found: {} does not exist", path.display())
            }
            LoadError::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::NoResults { .. } => None,
            LoadError::Read { source, .. } => Some(source),
        }
    }
}

/// Aggregates the run folders of one leaf directory.
#[derive(Debug, Clone)]
pub struct RunAggregator {
    path: PathBuf,
    benchmark: String,
    technique: String,
    trial: String,
}

impl RunAggregator {
    /// Leaf at `<benchmark>/<technique>/<trial>` when `has_trial`, otherwise
    /// at `<benchmark>/<technique>` with the implicit trial.
    pub fn new(path: impl Into<PathBuf>, has_trial: bool) -> Self {
        let path = path.into();
        let name = |p: &Path| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let (trial, technique_dir) = if has_trial {
            (name(&path), path.parent().map(Path::to_path_buf).unwrap_or_default())
        } else {
            (IMPLICIT_TRIAL.to_string(), path.clone())
        };
        let technique = name(&technique_dir);
        let benchmark = technique_dir.parent().map(name).unwrap_or_default();
        Self {
            path,
            benchmark,
            technique,
            trial,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    pub fn technique(&self) -> &str {
        &self.technique
    }

    pub fn trial(&self) -> &str {
        &self.trial
    }

    pub fn results_dir(&self, layout: &LayoutConfig) -> PathBuf {
        self.path.join(&layout.results_dir)
    }

    pub fn summary_path(&self, layout: &LayoutConfig) -> PathBuf {
        self.results_dir(layout).join(SUMMARY_FILE)
    }

    /// Run folder names in sorted order, skipping the results directory.
    pub fn run_folders(&self, layout: &LayoutConfig) -> Result<Vec<String>, AggregateError> {
        let entries = std::fs::read_dir(&self.path).map_err(|e| AggregateError::ReadDir {
            path: self.path.clone(),
            source: e,
        })?;
        let mut folders = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name == layout.results_dir {
                continue;
            }
            folders.push(name);
        }
        folders.sort();
        Ok(folders)
    }

    /// Replace `results/` and write one summary line per run folder.
    ///
    /// The summary is written to a temporary file and renamed into place,
    /// so a failed pass leaves no `summary.csv` behind.
    pub fn write_summary(&self, ctx: &ExtractContext<'_>) -> Result<usize, AggregateError> {
        let results = self.results_dir(ctx.layout);
        if results.exists() {
            std::fs::remove_dir_all(&results).map_err(|e| AggregateError::Write {
                path: results.clone(),
                source: e,
            })?;
        }
        std::fs::create_dir_all(&results).map_err(|e| AggregateError::Write {
            path: results.clone(),
            source: e,
        })?;

        let adapter = TechniqueFamily::from_technique(&self.technique).adapter(ctx.baseline);
        let mut rows = Vec::new();
        for folder in self.run_folders(ctx.layout)? {
            let outcome = self.extract_run(adapter.as_ref(), &folder, ctx)?;
            rows.push(outcome.to_row());
        }

        let summary = self.summary_path(ctx.layout);
        let mut tmp = tempfile::NamedTempFile::new_in(&results).map_err(|e| {
            AggregateError::Write {
                path: results.clone(),
                source: e,
            }
        })?;
        outcome::write_rows(&mut tmp, &rows).map_err(|e| AggregateError::Serialize {
            path: summary.clone(),
            source: e,
        })?;
        tmp.persist(&summary).map_err(|e| AggregateError::Write {
            path: summary.clone(),
            source: e.error,
        })?;

        tracing::info!(
            leaf = %self.path.display(),
            technique = %self.technique,
            trial = %self.trial,
            runs = rows.len(),
            "wrote summary"
        );
        Ok(rows.len())
    }

    /// Build the outcome for one run folder.
    pub fn extract_run(
        &self,
        adapter: &dyn LogAdapter,
        folder: &str,
        ctx: &ExtractContext<'_>,
    ) -> Result<RunOutcome, AggregateError> {
        let run_dir = self.path.join(folder);
        let log_path = adapter.log_source().path_in(&run_dir, ctx.layout);
        let bytes = std::fs::read(&log_path).map_err(|e| AggregateError::MissingLog {
            path: log_path.clone(),
            source: e,
        })?;
        let log = String::from_utf8_lossy(&bytes);

        let scan = adapter.scan(&log).map_err(|e| AggregateError::Extract {
            path: log_path.clone(),
            source: e,
        })?;

        let mut error_result = if scan.infra_failure {
            ErrorResult::Failure
        } else if scan.first_bug_iter < 0 {
            ErrorResult::NoError
        } else {
            ErrorResult::Error
        };
        let mut first_bug_iter = scan.first_bug_iter;
        let mut bug_type = UNCLASSIFIED.to_string();

        if error_result != ErrorResult::Failure && log.contains(ERROR_FOUND) {
            bug_type = ctx.classifiers.classify(&self.benchmark, &log, &run_dir);
            error_result = ErrorResult::Error;
            // Reported without an iteration number.
            if first_bug_iter < 0 {
                first_bug_iter = 0;
            }
        }

        let total_time = timing::read_real_time(&run_dir.join(&ctx.layout.time_file))?;

        let mut outcome = RunOutcome {
            benchmark_id: self.benchmark.clone(),
            run_index: folder.to_string(),
            trial: self.trial.clone(),
            technique: self.technique.clone(),
            error_result,
            bug_type,
            first_bug_time: scan.first_bug_time,
            first_bug_iter,
            total_time,
            total_iter: scan.total_iter,
        };
        adapter.reclassify(&mut outcome);

        tracing::debug!(
            run = %run_dir.display(),
            family = adapter.name(),
            error = %outcome.error_result,
            bug_type = %outcome.bug_type,
            bug_iter = outcome.first_bug_iter,
            total_iter = outcome.total_iter,
            "extracted run"
        );
        Ok(outcome)
    }

    /// Read the persisted summary back with the fixed column schema.
    pub fn load(&self, layout: &LayoutConfig) -> Result<Vec<SummaryRow>, LoadError> {
        let results = self.results_dir(layout);
        if !results.exists() {
            return Err(LoadError::NoResults { path: results });
        }
        let summary = self.summary_path(layout);
        let file = std::fs::File::open(&summary).map_err(|e| LoadError::Read {
            path: summary.clone(),
            source: e.into(),
        })?;
        outcome::read_rows(file).map_err(|e| LoadError::Read {
            path: summary,
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Fixture {
        layout: LayoutConfig,
        baseline: BaselineConfig,
        classifiers: ClassifierRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                layout: LayoutConfig::default(),
                baseline: BaselineConfig::default(),
                classifiers: ClassifierRegistry::with_builtins(),
            }
        }

        fn ctx(&self) -> ExtractContext<'_> {
            ExtractContext {
                layout: &self.layout,
                baseline: &self.baseline,
                classifiers: &self.classifiers,
            }
        }
    }

    fn write_report(run: &Path, text: &str) {
        std::fs::create_dir_all(run.join("report")).unwrap();
        std::fs::write(run.join("report/fray.log"), text).unwrap();
    }

    fn write_stdout(run: &Path, text: &str) {
        std::fs::create_dir_all(run).unwrap();
        std::fs::write(run.join("stdout.txt"), text).unwrap();
    }

    fn write_time(run: &Path, secs: &str) {
        std::fs::write(run.join("time.txt"), format!("real {secs}\nuser 1.00\nsys 0.10\n"))
            .unwrap();
    }

    #[test]
    fn leaf_components_without_trial() {
        let agg = RunAggregator::new("/out/sctbench/random", false);
        assert_eq!(agg.benchmark(), "sctbench");
        assert_eq!(agg.technique(), "random");
        assert_eq!(agg.trial(), IMPLICIT_TRIAL);
    }

    #[test]
    fn leaf_components_with_trial() {
        let agg = RunAggregator::new("/out/kafka/pct3/iter-4", true);
        assert_eq!(agg.benchmark(), "kafka");
        assert_eq!(agg.technique(), "pct3");
        assert_eq!(agg.trial(), "iter-4");
    }

    #[test]
    fn writes_one_line_per_run_in_sorted_order() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("sctbench/random");
        write_report(&leaf.join("1"), "Starting iteration 0\nStarting iteration 41\n");
        write_time(&leaf.join("1"), "600.12");
        write_report(
            &leaf.join("0"),
            "Starting iteration 0\nStarting iteration 5\nError found at iter: 5  Elapsed time: 1200\n",
        );
        write_time(&leaf.join("0"), "1.50");

        let fx = Fixture::new();
        let agg = RunAggregator::new(&leaf, false);
        assert_eq!(agg.write_summary(&fx.ctx()).unwrap(), 2);

        let text = std::fs::read_to_string(agg.summary_path(&fx.layout)).unwrap();
        assert_eq!(
            text,
            "sctbench-0,iter-1,Error,N/A,1200,6,1.5,6\n\
             sctbench-1,iter-1,NoError,N/A,-1,-1,600.12,42\n"
        );

        let rows = agg.load(&fx.layout).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].error, ErrorResult::Error);
        assert_eq!(rows[1].total_iter, 42);
    }

    #[test]
    fn classifier_runs_only_on_reported_bugs() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("lincheck/random");
        write_report(&leaf.join("0"), "Error found at iter: 0, Elapsed time: 15\n");
        write_report(&leaf.join("1"), "Run finished. Total iter: 100\n");

        let fx = Fixture::new();
        let agg = RunAggregator::new(&leaf, false);
        agg.write_summary(&fx.ctx()).unwrap();
        let rows = agg.load(&fx.layout).unwrap();

        assert_eq!(rows[0].bug_type, "TP(0000)");
        assert_eq!(rows[0].bug_iter, 1);
        assert_eq!(rows[0].total_time, 0.0);
        assert_eq!(rows[1].bug_type, "N/A");
        assert_eq!(rows[1].error, ErrorResult::NoError);
    }

    #[test]
    fn jpf_failure_takes_precedence() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("jacontebe/jpf");
        write_stdout(
            &leaf.join("0"),
            "java.lang.UnsupportedOperationException\nError found\nms time: 40\nstates: new=1,end=0\npaths = 1\n",
        );
        write_time(&leaf.join("0"), "3.00");

        let fx = Fixture::new();
        let agg = RunAggregator::new(&leaf, false);
        agg.write_summary(&fx.ctx()).unwrap();
        let rows = agg.load(&fx.layout).unwrap();

        assert_eq!(rows[0].error, ErrorResult::Failure);
        assert_eq!(rows[0].bug_type, "N/A");
    }

    #[test]
    fn java_baseline_crash_is_a_bug() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("sctbench/java");
        write_report(&leaf.join("0"), "Starting iteration 0\n");
        write_time(&leaf.join("0"), "2.30");
        write_report(&leaf.join("1"), "Starting iteration 0\n");
        write_time(&leaf.join("1"), "610.00");

        let fx = Fixture::new();
        let agg = RunAggregator::new(&leaf, false);
        agg.write_summary(&fx.ctx()).unwrap();
        let rows = agg.load(&fx.layout).unwrap();

        assert_eq!(rows[0].error, ErrorResult::Error);
        assert_eq!(rows[0].bug_time, 2300);
        assert_eq!(rows[1].error, ErrorResult::NoError);
        assert_eq!(rows[1].bug_time, -1);
    }

    #[test]
    fn replay_reads_stdout_without_increment() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("sctbench/rr");
        write_stdout(&leaf.join("0"), "Error found at iter: 3 Elapsed time: 77\n");

        let fx = Fixture::new();
        let agg = RunAggregator::new(&leaf, false);
        agg.write_summary(&fx.ctx()).unwrap();
        let rows = agg.load(&fx.layout).unwrap();
        assert_eq!(rows[0].bug_iter, 3);
        assert_eq!(rows[0].bug_time, 77);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("sctbench/pct3");
        for i in 0..5 {
            let run = leaf.join(i.to_string());
            write_report(
                &run,
                &format!("Starting iteration {i}\nError found at iter: {i} Elapsed time: {}\n", i * 10),
            );
            write_time(&run, &format!("{i}.25"));
        }

        let fx = Fixture::new();
        let agg = RunAggregator::new(&leaf, false);
        agg.write_summary(&fx.ctx()).unwrap();
        let first = std::fs::read(agg.summary_path(&fx.layout)).unwrap();
        agg.write_summary(&fx.ctx()).unwrap();
        let second = std::fs::read(agg.summary_path(&fx.layout)).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn stale_results_are_replaced() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("sctbench/random");
        write_report(&leaf.join("0"), "Starting iteration 0\n");
        let results = leaf.join("results");
        std::fs::create_dir_all(&results).unwrap();
        std::fs::write(results.join("old.json"), "{}").unwrap();

        let fx = Fixture::new();
        let agg = RunAggregator::new(&leaf, false);
        agg.write_summary(&fx.ctx()).unwrap();

        assert!(!results.join("old.json").exists());
        assert_eq!(agg.load(&fx.layout).unwrap().len(), 1);
    }

    #[test]
    fn missing_log_is_fatal_and_commits_nothing() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("sctbench/random");
        write_report(&leaf.join("0"), "Starting iteration 0\n");
        std::fs::create_dir_all(leaf.join("1")).unwrap();

        let fx = Fixture::new();
        let agg = RunAggregator::new(&leaf, false);
        let err = agg.write_summary(&fx.ctx()).unwrap_err();
        assert!(matches!(err, AggregateError::MissingLog { .. }));
        assert!(!agg.summary_path(&fx.layout).exists());
    }

    #[test]
    fn malformed_time_file_is_fatal() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("sctbench/random");
        write_report(&leaf.join("0"), "Starting iteration 0\n");
        std::fs::write(leaf.join("0/time.txt"), "garbage\n").unwrap();

        let fx = Fixture::new();
        let err = RunAggregator::new(&leaf, false)
            .write_summary(&fx.ctx())
            .unwrap_err();
        assert!(matches!(err, AggregateError::Timing(TimingError::Malformed { .. })));
    }

    #[test]
    fn load_without_results_reports_no_results() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("sctbench/random");
        std::fs::create_dir_all(&leaf).unwrap();
        let err = RunAggregator::new(&leaf, false)
            .load(&LayoutConfig::default())
            .unwrap_err();
        assert!(matches!(err, LoadError::NoResults { .. }));
        assert!(err.to_string().starts_with("no results found"));
    }

    #[test]
    fn error_marker_without_iteration_still_counts() {
        let root = tempdir().unwrap();
        let leaf = root.path().join("sctbench/random");
        write_report(&leaf.join("0"), "Error found: deadlock\n");

        let fx = Fixture::new();
        let agg = RunAggregator::new(&leaf, false);
        agg.write_summary(&fx.ctx()).unwrap();
        let rows = agg.load(&fx.layout).unwrap();
        assert_eq!(rows[0].error, ErrorResult::Error);
        assert_eq!(rows[0].bug_iter, 0);
    }
}
