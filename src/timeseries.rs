//! Cumulative bugs-over-time curves.
//!
//! For every (trial, technique) the bugs found so far form a step function
//! of the first-bug time. Each step function is forward-filled and sampled
//! on a uniform grid so curves from different trials can be averaged.

use crate::config::TimelineConfig;
use crate::outcome::ErrorResult;
use crate::suite::MergedRow;
use std::collections::{BTreeMap, BTreeSet};

/// One sample of a cumulative curve.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePoint {
    pub trial: String,
    pub technique: String,
    pub seconds: f64,
    pub bugs: u64,
}

/// Mean and spread of one technique's curves at one sample time.
#[derive(Debug, Clone, PartialEq)]
pub struct BandPoint {
    pub technique: String,
    pub seconds: f64,
    pub mean: f64,
    /// Sample standard deviation across trials, 0 with a single trial.
    pub sd: f64,
    pub trials: usize,
}

type Group = (String, String);

/// Steps of each group: (time ms, bugs found by then), sorted by time.
fn step_records(rows: &[MergedRow]) -> BTreeMap<Group, Vec<(i64, u64)>> {
    let mut groups: BTreeMap<Group, Vec<(i64, u64)>> = BTreeMap::new();

    // Every observed pair starts at zero, even if it never found a bug.
    for row in rows {
        groups
            .entry((row.trial.clone(), row.technique.clone()))
            .or_insert_with(|| vec![(0, 0)]);
    }

    let mut times: BTreeMap<Group, Vec<i64>> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.error == ErrorResult::Error) {
        times
            .entry((row.trial.clone(), row.technique.clone()))
            .or_default()
            .push(row.bug_time.max(0));
    }

    for (group, mut bug_times) in times {
        bug_times.sort_unstable();
        let steps = groups.entry(group).or_default();
        // Ties share the highest rank, so each distinct time maps to the
        // number of bugs found at or before it.
        for (i, t) in bug_times.iter().enumerate() {
            let rank = (i + 1) as u64;
            match steps.iter_mut().find(|(time, _)| time == t) {
                Some(step) => step.1 = step.1.max(rank),
                None => steps.push((*t, rank)),
            }
        }
        steps.sort_by_key(|(time, _)| *time);
        let mut found = 0;
        for step in steps.iter_mut() {
            found = found.max(step.1);
            step.1 = found;
        }
    }
    groups
}

/// Sample every (trial, technique) curve on the configured grid.
///
/// The grid runs from 0 up to and including `ceiling_ms` in `step_ms`
/// increments. Each sample carries the last step at or before it. Bugs
/// without a recorded time count from 0.
pub fn cumulative_curves(rows: &[MergedRow], timeline: &TimelineConfig) -> Vec<CurvePoint> {
    let groups = step_records(rows);
    let step = timeline.step_ms.max(1);

    let mut points = Vec::new();
    for ((trial, technique), steps) in &groups {
        let mut next = 0;
        let mut current: Option<u64> = None;
        let mut t = 0;
        while t <= timeline.ceiling_ms {
            while next < steps.len() && steps[next].0 <= t {
                current = Some(steps[next].1);
                next += 1;
            }
            if let Some(bugs) = current {
                points.push(CurvePoint {
                    trial: trial.clone(),
                    technique: technique.clone(),
                    seconds: t as f64 / 1000.0,
                    bugs,
                });
            }
            t += step;
        }
    }
    tracing::debug!(
        groups = groups.len(),
        points = points.len(),
        "interpolated cumulative curves"
    );
    points
}

/// Average the curves of each technique across trials.
pub fn trial_band(points: &[CurvePoint]) -> Vec<BandPoint> {
    let mut samples: BTreeMap<(String, i64), (f64, Vec<f64>)> = BTreeMap::new();
    for p in points {
        let key = (p.technique.clone(), (p.seconds * 1000.0).round() as i64);
        samples
            .entry(key)
            .or_insert_with(|| (p.seconds, Vec::new()))
            .1
            .push(p.bugs as f64);
    }

    samples
        .into_iter()
        .map(|((technique, _), (seconds, values))| {
            let n = values.len();
            let mean = values.iter().sum::<f64>() / n as f64;
            let sd = if n > 1 {
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
                var.sqrt()
            } else {
                0.0
            };
            BandPoint {
                technique,
                seconds,
                mean,
                sd,
                trials: n,
            }
        })
        .collect()
}

/// Distinct (trial, technique) pairs present in the curves.
pub fn curve_groups(points: &[CurvePoint]) -> BTreeSet<(&str, &str)> {
    points
        .iter()
        .map(|p| (p.trial.as_str(), p.technique.as_str()))
        .collect()
}
