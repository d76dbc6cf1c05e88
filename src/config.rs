use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from bench-results.toml.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResultsConfig {
    pub display: DisplayConfig,
    pub layout: LayoutConfig,
    pub baseline: BaselineConfig,
    pub timeline: TimelineConfig,
    pub ranking: RankingConfig,
    #[serde(rename = "classifier")]
    pub classifiers: Vec<ClassifierRule>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub tool_name: String,
}

/// File names inside a run folder and a leaf directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub report_log: PathBuf,
    pub stdout_log: PathBuf,
    pub time_file: PathBuf,
    pub timed_ops_file: PathBuf,
    pub results_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Baseline runs shorter than this are treated as crashing on the bug.
    pub timeout_secs: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub ceiling_ms: i64,
    pub step_ms: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Display name whose values order the x-axis. Defaults to `<tool>-Random`.
    pub reference: Option<String>,
    pub primary_marker: String,
    pub primary_label: String,
    pub secondary_label: String,
}

/// A configured classification rule: the first matching rule for a
/// benchmark decides its tag.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierRule {
    pub benchmark: String,
    pub pattern: String,
    pub tag: String,
}

// --- Default implementations ---

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            tool_name: "Fray".to_string(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            report_log: PathBuf::from("report/fray.log"),
            stdout_log: PathBuf::from("stdout.txt"),
            time_file: PathBuf::from("time.txt"),
            timed_ops_file: PathBuf::from("timed-operations.txt"),
            results_dir: "results".to_string(),
        }
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600.0,
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            ceiling_ms: 600 * 1000,
            step_ms: 100,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            reference: None,
            primary_marker: "sctbench".to_string(),
            primary_label: "SCTBench".to_string(),
            secondary_label: "JaConTeBe".to_string(),
        }
    }
}

/// Load config from `path`, or defaults when the file is absent.
///
/// A file that exists but does not parse is reported and ignored.
pub fn load_config(path: &Path) -> ResultsConfig {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("failed to parse {}: {e}", path.display());
                ResultsConfig::default()
            }
        },
        Err(_) => {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            ResultsConfig::default()
        }
    }
}
