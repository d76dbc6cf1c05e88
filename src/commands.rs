//! Subcommand handlers: aggregate the suite, derive one table, write it.

use crate::classify::ClassifierRegistry;
use crate::comparison::{self, Corpora, Metric};
use crate::config::ResultsConfig;
use crate::report::{self, TimedStatsEntry};
use crate::run_aggregator::ExtractContext;
use crate::suite::{BenchmarkSuite, DisplayNames, MergedRow};
use crate::timed_ops;
use crate::timeseries;
use std::io::Write;
use std::path::{Path, PathBuf};

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Resolved settings shared by every subcommand.
pub struct Session {
    config: ResultsConfig,
    classifiers: ClassifierRegistry,
    names: DisplayNames,
}

impl Session {
    pub fn new(config: ResultsConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let classifiers = ClassifierRegistry::from_rules(&config.classifiers)?;
        let names = DisplayNames::new(config.display.tool_name.clone());
        Ok(Self {
            config,
            classifiers,
            names,
        })
    }

    fn reference(&self) -> String {
        self.config
            .ranking
            .reference
            .clone()
            .unwrap_or_else(|| self.names.display_name("random"))
    }

    fn corpora(&self) -> Corpora {
        let ranking = &self.config.ranking;
        Corpora {
            primary_marker: ranking.primary_marker.clone(),
            primary_label: ranking.primary_label.clone(),
            secondary_label: ranking.secondary_label.clone(),
        }
    }

    /// Discover, re-aggregate and merge every leaf under `roots`.
    pub fn merged(&self, roots: &[PathBuf]) -> Result<Vec<MergedRow>, Box<dyn std::error::Error>> {
        let suite = BenchmarkSuite::discover(roots)?;
        let ctx = ExtractContext {
            layout: &self.config.layout,
            baseline: &self.config.baseline,
            classifiers: &self.classifiers,
        };
        Ok(suite.aggregate(&ctx, &self.names)?)
    }
}

/// Write to `path`, or stdout when absent.
fn output(path: Option<&Path>) -> std::io::Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(std::io::BufWriter::new(std::fs::File::create(p)?)),
        None => Box::new(std::io::stdout().lock()),
    })
}

pub fn handle_aggregate(session: &Session, roots: &[PathBuf], out: Option<&Path>) -> CommandResult {
    let rows = session.merged(roots)?;
    report::write_merged(output(out)?, &rows)?;
    Ok(())
}

pub fn handle_bug_table(session: &Session, roots: &[PathBuf], out: Option<&Path>) -> CommandResult {
    let rows = session.merged(roots)?;
    let counts = comparison::outcome_counts(&rows);
    report::write_bug_table(output(out)?, &counts)?;
    Ok(())
}

pub fn handle_efficiency(
    session: &Session,
    roots: &[PathBuf],
    metric: Metric,
    out: Option<&Path>,
) -> CommandResult {
    let rows = session.merged(roots)?;
    let corpora = session.corpora();
    let table = comparison::efficiency_table(&rows, metric, &session.reference(), &corpora);
    tracing::info!(
        ids = table.order.len(),
        primary = table.primary_len,
        reference = %session.reference(),
        "ranked benchmark ids"
    );
    report::write_efficiency(output(out)?, &table, &corpora)?;
    Ok(())
}

pub fn handle_bug_over_time(
    session: &Session,
    roots: &[PathBuf],
    band: bool,
    out: Option<&Path>,
) -> CommandResult {
    let rows = session.merged(roots)?;
    tracing::info!(total_bugs = comparison::total_bugs(&rows), "bug ceiling");
    let points = timeseries::cumulative_curves(&rows, &session.config.timeline);
    tracing::debug!(curves = timeseries::curve_groups(&points).len(), "sampled curves");
    if band {
        report::write_band(output(out)?, &timeseries::trial_band(&points))?;
    } else {
        report::write_curves(output(out)?, &points)?;
    }
    Ok(())
}

pub fn handle_common_bugs(session: &Session, roots: &[PathBuf], out: Option<&Path>) -> CommandResult {
    let rows = session.merged(roots)?;
    report::write_common_bugs(output(out)?, &comparison::common_bugs(&rows))?;
    Ok(())
}

pub fn handle_timed_stats(session: &Session, roots: &[PathBuf], out: Option<&Path>) -> CommandResult {
    let suite = BenchmarkSuite::discover(roots)?;
    let mut summaries = Vec::new();
    for leaf in suite.leaves() {
        let summary = timed_ops::gather(leaf, &session.config.layout)?;
        tracing::info!(
            benchmark = leaf.benchmark(),
            callers = ?summary.distinct_callers(),
            "timed-operation callers"
        );
        summaries.push(summary);
    }
    let entries: Vec<TimedStatsEntry<'_>> = suite
        .leaves()
        .iter()
        .zip(summaries)
        .map(|(leaf, summary)| TimedStatsEntry {
            benchmark: leaf.benchmark(),
            technique: leaf.technique(),
            trial: leaf.trial(),
            summary,
        })
        .collect();
    report::write_timed_stats(output(out)?, &entries)?;
    Ok(())
}
