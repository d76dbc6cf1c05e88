use super::{parse_number, ExtractError, LogAdapter, LogScan, LogSource};
use regex::Regex;
use std::sync::LazyLock;

static SEARCH_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"ms time:\s+(\d+)").unwrap());

static SEARCH_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",end=(\d+)").unwrap());

/// Output fragments that mean the model checker could not execute the
/// program at all.
const INFRA_FAILURES: &[&str] = &[
    "UnsupportedOperationException",
    "NoSuchMethodException",
    "FileNotFoundException",
    "Null charset name",
    "NoSuchMethodError",
    "JPF out of memory",
    "java.lang.NullPointerException: Calling 'startsWith(Ljava/lang/String;)Z' on null object",
];

/// Adapter for Java PathFinder standard output.
///
/// - `paths = N` in the final statistics block gives the explored paths
/// - `ms time: T` lines carry the elapsed search time
/// - `,end=I` closes the search that hit the bug
pub struct JpfAdapter;

impl JpfAdapter {
    pub fn new() -> Self {
        JpfAdapter
    }
}

impl Default for JpfAdapter {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the output shows the checker itself failing.
pub(crate) fn is_infra_failure(text: &str) -> bool {
    INFRA_FAILURES.iter().any(|needle| text.contains(needle))
}

impl LogAdapter for JpfAdapter {
    fn name(&self) -> &str {
        "jpf"
    }

    fn log_source(&self) -> LogSource {
        LogSource::Stdout
    }

    fn scan(&self, text: &str) -> Result<LogScan, ExtractError> {
        let mut scan = LogScan {
            infra_failure: is_infra_failure(text),
            ..Default::default()
        };
        let lines: Vec<&str> = text.split('\n').collect();

        for line in lines.iter().rev() {
            let line = line.trim();
            if line.starts_with("paths =") {
                let value = line.rsplit('=').next().unwrap_or_default();
                scan.total_iter = parse_number(value, line)?;
                break;
            }
        }

        for line in &lines {
            if let Some(caps) = SEARCH_TIME.captures(line) {
                scan.first_bug_time = parse_number(&caps[1], line)?;
            }
            if let Some(caps) = SEARCH_END.captures(line) {
                scan.first_bug_iter = parse_number(&caps[1], line)? + 1;
                break;
            }
        }

        Ok(scan)
    }
}
