use super::{parse_number, ExtractError, LogAdapter, LogScan, LogSource};
use regex::Regex;
use std::sync::LazyLock;

static ERROR_FOUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Error found at iter: (\d+).+Elapsed time: (\d+)").unwrap());

static RUN_FINISHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Run finished. Total iter: (\d+)").unwrap());

const STARTING_ITERATION: &str = "Starting iteration";

/// Adapter for the controlled-scheduler execution report.
///
/// The report is plain text. Key lines:
///
/// - `Starting iteration N` at the top of every iteration (0-based)
/// - `Run finished. Total iter: N` when the tool stops on its own
/// - `Error found at iter: I ... Elapsed time: T` on the first bug
///
/// The same format is produced by record/replay chaos runs, except that
/// their iteration counter is already 1-based.
pub struct FrayAdapter {
    replay: bool,
}

impl FrayAdapter {
    pub fn new() -> Self {
        FrayAdapter { replay: false }
    }

    /// Adapter for record/replay logs: bug iterations are reported as-is.
    pub fn replay() -> Self {
        FrayAdapter { replay: true }
    }
}

impl Default for FrayAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan an execution report.
///
/// The total comes from the last iteration marker in the file, whichever
/// kind appears last. The first bug comes from the earliest error line.
pub(crate) fn scan_report(text: &str, replay: bool) -> Result<LogScan, ExtractError> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut scan = LogScan::default();

    for line in lines.iter().rev() {
        if line.starts_with(STARTING_ITERATION) {
            let last = line.split(' ').next_back().unwrap_or_default();
            scan.total_iter = parse_number(last, line)? + 1;
            break;
        }
        if let Some(caps) = RUN_FINISHED.captures(line) {
            scan.total_iter = parse_number(&caps[1], line)?;
            break;
        }
    }

    for line in &lines {
        if let Some(caps) = ERROR_FOUND.captures(line) {
            scan.first_bug_iter = parse_number(&caps[1], line)?;
            scan.first_bug_time = parse_number(&caps[2], line)?;
            // Report iterations are 0-based; replay counters are not.
            if !replay {
                scan.first_bug_iter += 1;
            }
            break;
        }
    }

    Ok(scan)
}

impl LogAdapter for FrayAdapter {
    fn name(&self) -> &str {
        if self.replay {
            "rr"
        } else {
            "fray"
        }
    }

    fn log_source(&self) -> LogSource {
        if self.replay {
            LogSource::Stdout
        } else {
            LogSource::Report
        }
    }

    fn scan(&self, text: &str) -> Result<LogScan, ExtractError> {
        scan_report(text, self.replay)
    }
}
