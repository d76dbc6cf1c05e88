use super::fray::scan_report;
use super::{ExtractError, LogAdapter, LogScan, LogSource};
use crate::outcome::{ErrorResult, RunOutcome};

/// Adapter for the uninstrumented baseline.
///
/// The baseline runs the program once under the same launcher, so its
/// report has the scheduler format but no search loop. A run that ends
/// before the timeout crashed on the bug; the crash time is the bug time.
pub struct JavaAdapter {
    timeout_secs: f64,
}

impl JavaAdapter {
    pub fn new(timeout_secs: f64) -> Self {
        JavaAdapter { timeout_secs }
    }
}

impl LogAdapter for JavaAdapter {
    fn name(&self) -> &str {
        "java"
    }

    fn log_source(&self) -> LogSource {
        LogSource::Report
    }

    fn scan(&self, text: &str) -> Result<LogScan, ExtractError> {
        scan_report(text, false)
    }

    fn reclassify(&self, outcome: &mut RunOutcome) {
        if outcome.total_time >= self.timeout_secs {
            return;
        }
        if outcome.total_time <= 0.0 {
            tracing::warn!(
                benchmark = %outcome.benchmark_id,
                run = %outcome.run_index,
                "baseline run has no recorded time, counting it as a crash at 0 ms"
            );
        }
        outcome.error_result = ErrorResult::Error;
        outcome.first_bug_time = (outcome.total_time * 1000.0).round() as i64;
        // The single execution is the one that crashed.
        if outcome.first_bug_iter < 0 {
            outcome.first_bug_iter = 1;
        }
    }
}
