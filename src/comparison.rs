//! Cross-technique comparison tables derived from the merged results.

use crate::outcome::ErrorResult;
use crate::suite::MergedRow;
use std::collections::{BTreeMap, BTreeSet};

/// Collapsed bug-type category used by the outcome-count table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BugCategory {
    /// `TP(Time...)`: a real bug that manifested as a timeout.
    Time,
    /// `FP(Time...)`: a timeout that was not the bug under test.
    TimeFalsePositive,
    /// Any other `TP(...)` tag. Unclassified bugs are counted here too.
    TruePositive,
    /// Unclassified or unrecognized tags.
    Other,
}

impl BugCategory {
    pub fn of(tag: &str) -> Self {
        if tag.starts_with("TP(Time)") {
            BugCategory::Time
        } else if tag.len() > 3 && tag.starts_with("TP(") {
            BugCategory::TruePositive
        } else if tag.starts_with("FP(Time)") {
            BugCategory::TimeFalsePositive
        } else {
            BugCategory::Other
        }
    }
}

/// Per-technique outcome counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub technique: String,
    pub no_error: u64,
    pub error: u64,
    pub failure: u64,
    pub true_positive: u64,
    pub time: u64,
    pub time_false_positive: u64,
}

impl OutcomeCounts {
    /// Runs that completed a test: timeouts, clean runs and real bugs.
    pub fn test_run(&self) -> u64 {
        self.time_false_positive + self.time + self.no_error + self.true_positive
    }

    /// Runs that failed the test on a real bug.
    pub fn failed(&self) -> u64 {
        self.true_positive
    }

    /// `"<all timeouts> (<false-positive timeouts>)"`.
    pub fn time_cell(&self) -> String {
        format!(
            "{} ({})",
            self.time + self.time_false_positive,
            self.time_false_positive
        )
    }
}

/// Count outcomes and collapsed bug categories per technique, ordered by
/// display name.
pub fn outcome_counts(rows: &[MergedRow]) -> Vec<OutcomeCounts> {
    let mut by_technique: BTreeMap<&str, OutcomeCounts> = BTreeMap::new();
    for row in rows {
        let counts = by_technique
            .entry(row.technique.as_str())
            .or_insert_with(|| OutcomeCounts {
                technique: row.technique.clone(),
                ..Default::default()
            });
        match row.error {
            ErrorResult::NoError => counts.no_error += 1,
            ErrorResult::Failure => counts.failure += 1,
            ErrorResult::Error => {
                counts.error += 1;
                // An unclassified bug still failed the test.
                match BugCategory::of(&row.bug_type) {
                    BugCategory::Time => counts.time += 1,
                    BugCategory::TimeFalsePositive => counts.time_false_positive += 1,
                    BugCategory::TruePositive | BugCategory::Other => counts.true_positive += 1,
                }
            }
        }
    }
    by_technique.into_values().collect()
}

/// Which per-run quantity an efficiency table compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Iterations until the first bug, over runs that found one.
    BugIterations,
    /// Iterations per second, over runs that did not fail.
    ExecSpeed,
}

impl Metric {
    fn value(&self, row: &MergedRow) -> Option<f64> {
        match self {
            Metric::BugIterations => {
                (row.error == ErrorResult::Error).then_some(row.bug_iter as f64)
            }
            Metric::ExecSpeed => {
                if row.error == ErrorResult::Failure {
                    return None;
                }
                let speed = row.total_iter as f64 / row.total_time;
                speed.is_finite().then_some(speed)
            }
        }
    }
}

/// How benchmark ids are split into the two corpora.
#[derive(Debug, Clone)]
pub struct Corpora {
    /// Ids containing this marker belong to the primary corpus.
    pub primary_marker: String,
    pub primary_label: String,
    pub secondary_label: String,
}

/// One mean value on the shared x-axis.
#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyPoint {
    pub position: usize,
    pub id: String,
    pub technique: String,
    pub value: f64,
}

/// Mean metric per (technique, id), placed on an x-axis shared by all
/// techniques.
#[derive(Debug, Clone)]
pub struct EfficiencyTable {
    /// Benchmark ids in x-axis order.
    pub order: Vec<String>,
    /// The first `primary_len` ids of `order` belong to the primary corpus.
    pub primary_len: usize,
    pub points: Vec<EfficiencyPoint>,
}

impl EfficiencyTable {
    pub fn group_label<'a>(&self, position: usize, corpora: &'a Corpora) -> &'a str {
        if position < self.primary_len {
            &corpora.primary_label
        } else {
            &corpora.secondary_label
        }
    }
}

/// Build the efficiency table.
///
/// The reference technique orders the x-axis by ascending mean; ids it never
/// reached follow in first-seen order. The primary corpus is then moved in
/// front of the secondary one, each keeping that order.
pub fn efficiency_table(
    rows: &[MergedRow],
    metric: Metric,
    reference: &str,
    corpora: &Corpora,
) -> EfficiencyTable {
    let mut sums: BTreeMap<(&str, &str), (f64, u32)> = BTreeMap::new();
    for row in rows {
        if let Some(value) = metric.value(row) {
            let entry = sums
                .entry((row.technique.as_str(), row.id.as_str()))
                .or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    let means: Vec<(&str, &str, f64)> = sums
        .into_iter()
        .map(|((technique, id), (sum, n))| (technique, id, sum / n as f64))
        .collect();

    let mut reference_points: Vec<(&str, f64)> = means
        .iter()
        .filter(|(technique, _, _)| *technique == reference)
        .map(|(_, id, value)| (*id, *value))
        .collect();
    reference_points.sort_by(|a, b| a.1.total_cmp(&b.1));

    let mut ranked: Vec<&str> = reference_points.into_iter().map(|(id, _)| id).collect();
    for (_, id, _) in &means {
        if !ranked.contains(id) {
            ranked.push(*id);
        }
    }
    if ranked.is_empty() {
        tracing::warn!(reference, "no rows to rank");
    }

    let (primary, secondary): (Vec<&str>, Vec<&str>) = ranked
        .into_iter()
        .partition(|id| id.contains(corpora.primary_marker.as_str()));
    let primary_len = primary.len();
    let order: Vec<String> = primary
        .into_iter()
        .chain(secondary)
        .map(str::to_string)
        .collect();

    let mut points: Vec<EfficiencyPoint> = means
        .iter()
        .filter_map(|(technique, id, value)| {
            let position = order.iter().position(|o| o == id)?;
            Some(EfficiencyPoint {
                position,
                id: id.to_string(),
                technique: technique.to_string(),
                value: *value,
            })
        })
        .collect();
    points.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| a.technique.cmp(&b.technique))
    });

    EfficiencyTable {
        order,
        primary_len,
        points,
    }
}

/// Mean iterations-to-bug for a bug found by every technique.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonBug {
    pub id: String,
    pub technique: String,
    pub bug_iter: f64,
}

/// Restrict to bugs every technique found, then average `bug_iter` per
/// (id, technique).
pub fn common_bugs(rows: &[MergedRow]) -> Vec<CommonBug> {
    let errors: Vec<&MergedRow> = rows
        .iter()
        .filter(|r| r.error == ErrorResult::Error)
        .collect();
    let techniques: BTreeSet<&str> = errors.iter().map(|r| r.technique.as_str()).collect();

    let mut finders: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for row in &errors {
        finders
            .entry(row.id.as_str())
            .or_default()
            .insert(row.technique.as_str());
    }

    let mut sums: BTreeMap<(&str, &str), (f64, u32)> = BTreeMap::new();
    for row in &errors {
        if finders[row.id.as_str()].len() != techniques.len() {
            continue;
        }
        let entry = sums
            .entry((row.id.as_str(), row.technique.as_str()))
            .or_insert((0.0, 0));
        entry.0 += row.bug_iter as f64;
        entry.1 += 1;
    }

    sums.into_iter()
        .map(|((id, technique), (sum, n))| CommonBug {
            id: id.to_string(),
            technique: technique.to_string(),
            bug_iter: sum / n as f64,
        })
        .collect()
}

/// Number of distinct benchmark ids in the table.
pub fn total_bugs(rows: &[MergedRow]) -> usize {
    rows.iter()
        .map(|r| r.id.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}
