//! Per-benchmark bug classification.
//!
//! A classifier turns the log of a run that reported a bug into a short
//! category tag such as `TP(deadlock)` or `FP(Time)`. Classifiers are looked
//! up by benchmark id; benchmarks without one get [`UNCLASSIFIED`].

use crate::config::ClassifierRule;
use crate::outcome::UNCLASSIFIED;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

/// Classifies the bug reported by one run.
pub trait BugClassifier {
    fn classify(&self, log: &str, run_dir: &Path) -> String;
}

impl<F> BugClassifier for F
where
    F: Fn(&str, &Path) -> String,
{
    fn classify(&self, log: &str, run_dir: &Path) -> String {
        self(log, run_dir)
    }
}

/// Always returns the same tag.
pub struct FixedTag(pub String);

impl BugClassifier for FixedTag {
    fn classify(&self, _log: &str, _run_dir: &Path) -> String {
        self.0.clone()
    }
}

/// Ordered regex rules over the log text; the first match decides.
pub struct PatternClassifier {
    rules: Vec<(Regex, String)>,
}

impl BugClassifier for PatternClassifier {
    fn classify(&self, log: &str, _run_dir: &Path) -> String {
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.is_match(log))
            .map(|(_, tag)| tag.clone())
            .unwrap_or_else(|| UNCLASSIFIED.to_string())
    }
}

/// An invalid pattern in a configured rule.
#[derive(Debug)]
pub struct ClassifyError {
    pub benchmark: String,
    pub source: regex::Error,
}

impl std::fmt::Display for ClassifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid classifier pattern for benchmark {}: {}",
            self.benchmark, self.source
        )
    }
}

impl std::error::Error for ClassifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Benchmark id → classifier.
#[derive(Default)]
pub struct ClassifierRegistry {
    by_benchmark: HashMap<String, Box<dyn BugClassifier>>,
}

impl ClassifierRegistry {
    /// Registry with the classifiers that need no configuration.
    pub fn with_builtins() -> Self {
        let mut registry = Self::default();
        // Linearizability checking only reports real violations.
        registry.register("lincheck", FixedTag("TP(0000)".to_string()));
        registry
    }

    /// Built-ins plus configured rules; rules replace a built-in for the
    /// same benchmark.
    pub fn from_rules(rules: &[ClassifierRule]) -> Result<Self, ClassifyError> {
        let mut registry = Self::with_builtins();
        let mut grouped: Vec<(String, Vec<(Regex, String)>)> = Vec::new();
        for rule in rules {
            let pattern = Regex::new(&rule.pattern).map_err(|e| ClassifyError {
                benchmark: rule.benchmark.clone(),
                source: e,
            })?;
            match grouped.iter_mut().find(|(b, _)| *b == rule.benchmark) {
                Some((_, list)) => list.push((pattern, rule.tag.clone())),
                None => grouped.push((rule.benchmark.clone(), vec![(pattern, rule.tag.clone())])),
            }
        }
        for (benchmark, rules) in grouped {
            registry.register(&benchmark, PatternClassifier { rules });
        }
        Ok(registry)
    }

    pub fn register(&mut self, benchmark: &str, classifier: impl BugClassifier + 'static) {
        self.by_benchmark
            .insert(benchmark.to_string(), Box::new(classifier));
    }

    /// Tag for a run of `benchmark`, or `N/A` when nothing is registered.
    pub fn classify(&self, benchmark: &str, log: &str, run_dir: &Path) -> String {
        match self.by_benchmark.get(benchmark) {
            Some(classifier) => classifier.classify(log, run_dir),
            None => {
                tracing::debug!(benchmark, "no classifier registered");
                UNCLASSIFIED.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(benchmark: &str, pattern: &str, tag: &str) -> ClassifierRule {
        ClassifierRule {
            benchmark: benchmark.to_string(),
            pattern: pattern.to_string(),
            tag: tag.to_string(),
        }
    }

    #[test]
    fn unknown_benchmark_is_unclassified() {
        let registry = ClassifierRegistry::with_builtins();
        assert_eq!(registry.classify("guava", "Error found", Path::new(".")), "N/A");
    }

    #[test]
    fn lincheck_is_builtin() {
        let registry = ClassifierRegistry::with_builtins();
        assert_eq!(
            registry.classify("lincheck", "anything", Path::new(".")),
            "TP(0000)"
        );
    }

    #[test]
    fn first_matching_rule_wins() {
        let registry = ClassifierRegistry::from_rules(&[
            rule("kafka", "TimeoutException", "TP(Time)"),
            rule("kafka", "Exception", "TP(other)"),
            rule("lucene", "deadlock", "TP(deadlock)"),
        ])
        .unwrap();
        let dir = Path::new("/runs/0");
        assert_eq!(
            registry.classify("kafka", "org.apache.kafka.TimeoutException", dir),
            "TP(Time)"
        );
        assert_eq!(registry.classify("kafka", "IllegalStateException", dir), "TP(other)");
        assert_eq!(registry.classify("kafka", "ok", dir), "N/A");
        assert_eq!(registry.classify("lucene", "deadlock detected", dir), "TP(deadlock)");
    }

    #[test]
    fn rules_override_builtins() {
        let registry =
            ClassifierRegistry::from_rules(&[rule("lincheck", "Timeout", "FP(Time)")]).unwrap();
        assert_eq!(registry.classify("lincheck", "Timeout", Path::new(".")), "FP(Time)");
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = ClassifierRegistry::from_rules(&[rule("guava", "(unclosed", "x")])
            .err()
            .unwrap();
        assert_eq!(err.benchmark, "guava");
    }

    #[test]
    fn closures_can_be_registered() {
        let mut registry = ClassifierRegistry::default();
        registry.register("guava", |log: &str, dir: &Path| {
            if dir.join("hang.txt").exists() || log.contains("wait") {
                "FP(Time)".to_string()
            } else {
                "TP(race)".to_string()
            }
        });
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(registry.classify("guava", "assert", dir.path()), "TP(race)");
        std::fs::write(dir.path().join("hang.txt"), "").unwrap();
        assert_eq!(registry.classify("guava", "assert", dir.path()), "FP(Time)");
    }
}
