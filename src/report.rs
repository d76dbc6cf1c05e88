//! CSV rendering of the derived tables for downstream plotting.

use crate::comparison::{CommonBug, Corpora, EfficiencyTable, OutcomeCounts};
use crate::suite::MergedRow;
use crate::timed_ops::TimedOpsSummary;
use crate::timeseries::{BandPoint, CurvePoint};
use serde::Serialize;
use std::io::Write;

const MERGED_HEADER: [&str; 9] = [
    "id",
    "trial",
    "error",
    "type",
    "bug_time",
    "bug_iter",
    "total_time",
    "total_iter",
    "technique",
];
const BUG_TABLE_HEADER: [&str; 4] = ["Technique", "Test Run", "Failure", "Time (FP)"];
const EFFICIENCY_HEADER: [&str; 5] = ["position", "id", "group", "technique", "value"];
const CURVE_HEADER: [&str; 4] = ["trial", "technique", "seconds", "bugs"];
const BAND_HEADER: [&str; 5] = ["technique", "seconds", "mean", "sd", "trials"];
const COMMON_BUGS_HEADER: [&str; 3] = ["id", "technique", "bug_iter"];
const TIMED_STATS_HEADER: [&str; 6] = ["benchmark", "technique", "trial", "operation", "runs", "share"];

#[derive(Serialize)]
struct BugTableRow<'a> {
    technique: &'a str,
    test_run: u64,
    failure: u64,
    time: String,
}

#[derive(Serialize)]
struct EfficiencyRow<'a> {
    position: usize,
    id: &'a str,
    group: &'a str,
    technique: &'a str,
    value: f64,
}

#[derive(Serialize)]
struct CurveRow<'a> {
    trial: &'a str,
    technique: &'a str,
    seconds: f64,
    bugs: u64,
}

#[derive(Serialize)]
struct BandRow<'a> {
    technique: &'a str,
    seconds: f64,
    mean: f64,
    sd: f64,
    trials: usize,
}

#[derive(Serialize)]
struct CommonBugRow<'a> {
    id: &'a str,
    technique: &'a str,
    bug_iter: f64,
}

#[derive(Serialize)]
struct TimedStatsRow<'a> {
    benchmark: &'a str,
    technique: &'a str,
    trial: &'a str,
    operation: &'a str,
    runs: u64,
    share: f64,
}

/// Write `header`, then one record per row. Row fields serialize in
/// header order; the header is written even when there are no rows.
fn write_all<W: Write, T: Serialize>(
    writer: W,
    header: &[&str],
    rows: impl IntoIterator<Item = T>,
) -> Result<(), csv::Error> {
    let mut w = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    w.write_record(header)?;
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn write_merged<W: Write>(writer: W, rows: &[MergedRow]) -> Result<(), csv::Error> {
    write_all(writer, &MERGED_HEADER, rows)
}

pub fn write_bug_table<W: Write>(writer: W, counts: &[OutcomeCounts]) -> Result<(), csv::Error> {
    write_all(
        writer,
        &BUG_TABLE_HEADER,
        counts.iter().map(|c| BugTableRow {
            technique: &c.technique,
            test_run: c.test_run(),
            failure: c.failed(),
            time: c.time_cell(),
        }),
    )
}

pub fn write_efficiency<W: Write>(
    writer: W,
    table: &EfficiencyTable,
    corpora: &Corpora,
) -> Result<(), csv::Error> {
    write_all(
        writer,
        &EFFICIENCY_HEADER,
        table.points.iter().map(|p| EfficiencyRow {
            position: p.position,
            id: &p.id,
            group: table.group_label(p.position, corpora),
            technique: &p.technique,
            value: p.value,
        }),
    )
}

pub fn write_curves<W: Write>(writer: W, points: &[CurvePoint]) -> Result<(), csv::Error> {
    write_all(
        writer,
        &CURVE_HEADER,
        points.iter().map(|p| CurveRow {
            trial: &p.trial,
            technique: &p.technique,
            seconds: p.seconds,
            bugs: p.bugs,
        }),
    )
}

pub fn write_band<W: Write>(writer: W, band: &[BandPoint]) -> Result<(), csv::Error> {
    write_all(
        writer,
        &BAND_HEADER,
        band.iter().map(|p| BandRow {
            technique: &p.technique,
            seconds: p.seconds,
            mean: p.mean,
            sd: p.sd,
            trials: p.trials,
        }),
    )
}

pub fn write_common_bugs<W: Write>(writer: W, bugs: &[CommonBug]) -> Result<(), csv::Error> {
    write_all(
        writer,
        &COMMON_BUGS_HEADER,
        bugs.iter().map(|b| CommonBugRow {
            id: &b.id,
            technique: &b.technique,
            bug_iter: b.bug_iter,
        }),
    )
}

/// One summary per (benchmark, technique, trial) leaf.
pub struct TimedStatsEntry<'a> {
    pub benchmark: &'a str,
    pub technique: &'a str,
    pub trial: &'a str,
    pub summary: TimedOpsSummary,
}

pub fn write_timed_stats<W: Write>(writer: W, entries: &[TimedStatsEntry<'_>]) -> Result<(), csv::Error> {
    write_all(
        writer,
        &TIMED_STATS_HEADER,
        entries.iter().flat_map(|e| {
            e.summary
                .shares()
                .into_iter()
                .map(move |(operation, runs, share)| TimedStatsRow {
                    benchmark: e.benchmark,
                    technique: e.technique,
                    trial: e.trial,
                    operation,
                    runs,
                    share,
                })
        }),
    )
}
