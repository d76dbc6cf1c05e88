/// Timing artifacts: the `time -p` output written next to each run.
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static REAL_TIME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"real (\d+\.\d+)").unwrap());

/// Errors from reading a run's timing file.
#[derive(Debug)]
pub enum TimingError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file exists but has no `real <seconds>` line.
    Malformed { path: PathBuf },
}

impl std::fmt::Display for TimingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimingError::Read { path, source } => {
                write!(f, "failed to read timing file {}: {source}", path.display())
            }
            TimingError::Malformed { path } => {
                write!(f, "no `real <seconds>` line in {}", path.display())
            }
        }
    }
}

impl std::error::Error for TimingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TimingError::Read { source, .. } => Some(source),
            TimingError::Malformed { .. } => None,
        }
    }
}

/// Wall-clock seconds recorded in `path`.
///
/// A missing file means the run was not timed and yields 0.
pub fn read_real_time(path: &Path) -> Result<f64, TimingError> {
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no timing file, using 0s");
            return Ok(0.0);
        }
        Err(e) => {
            return Err(TimingError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    parse_real_time(&text).ok_or_else(|| TimingError::Malformed {
        path: path.to_path_buf(),
    })
}

fn parse_real_time(text: &str) -> Option<f64> {
    REAL_TIME
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reads_real_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("time.txt");
        std::fs::write(&path, "real 12.57\nuser 30.10\nsys 1.02\n").unwrap();
        assert_eq!(read_real_time(&path).unwrap(), 12.57);
    }

    #[test]
    fn test_missing_file_is_zero() {
        let dir = tempdir().unwrap();
        assert_eq!(read_real_time(&dir.path().join("time.txt")).unwrap(), 0.0);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("time.txt");
        std::fs::write(&path, "Command terminated by signal 9\nreal 3\n").unwrap();
        let err = read_real_time(&path).unwrap_err();
        assert!(matches!(err, TimingError::Malformed { .. }));
        assert!(err.to_string().contains("time.txt"));
    }

    #[test]
    fn test_real_line_after_noise() {
        assert_eq!(
            parse_real_time("Command exited with non-zero status 1\nreal 0.42\n"),
            Some(0.42)
        );
    }
}
