mod adapters;
mod classify;
mod commands;
mod comparison;
mod config;
mod outcome;
mod report;
mod run_aggregator;
mod suite;
mod timed_ops;
mod timeseries;
mod timing;

use clap::{Args, Parser, Subcommand};
use commands::Session;
use comparison::Metric;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Aggregate concurrency-testing benchmark runs into per-run summaries
/// and derive comparison tables across techniques.
#[derive(Parser, Debug)]
#[command(name = "bench-results", version, about)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "bench-results.toml")]
    config: PathBuf,

    /// Extra logging (per-run extraction, classifier decisions)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct TableArgs {
    /// Benchmark directories (<root>/<technique>[/iter-N]/<run>)
    #[arg(required = true, value_name = "ROOT")]
    roots: Vec<PathBuf>,

    /// Write the table here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Re-aggregate every leaf and print the merged outcome table
    Aggregate(TableArgs),
    /// Per-technique outcome counts
    BugTable(TableArgs),
    /// Mean iterations to first bug, ranked against the reference technique
    SearchSpace(TableArgs),
    /// Mean iterations per second, ranked against the reference technique
    ExecSpeed(TableArgs),
    /// Cumulative bugs found over time
    BugOverTime {
        #[command(flatten)]
        table: TableArgs,
        /// Average trials into a mean/sd band per technique
        #[arg(long)]
        band: bool,
    },
    /// Bugs found by every technique, with iterations to find them
    CommonBugs(TableArgs),
    /// Timed blocking operation usage per leaf
    TimedStats(TableArgs),
}

fn init_tracing(cli: &Cli) {
    let default = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(&cli.config);
    let session = Session::new(config)?;

    match &cli.command {
        Command::Aggregate(args) => {
            commands::handle_aggregate(&session, &args.roots, args.output.as_deref())
        }
        Command::BugTable(args) => {
            commands::handle_bug_table(&session, &args.roots, args.output.as_deref())
        }
        Command::SearchSpace(args) => commands::handle_efficiency(
            &session,
            &args.roots,
            Metric::BugIterations,
            args.output.as_deref(),
        ),
        Command::ExecSpeed(args) => commands::handle_efficiency(
            &session,
            &args.roots,
            Metric::ExecSpeed,
            args.output.as_deref(),
        ),
        Command::BugOverTime { table, band } => {
            commands::handle_bug_over_time(&session, &table.roots, *band, table.output.as_deref())
        }
        Command::CommonBugs(args) => {
            commands::handle_common_bugs(&session, &args.roots, args.output.as_deref())
        }
        Command::TimedStats(args) => {
            commands::handle_timed_stats(&session, &args.roots, args.output.as_deref())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    tracing::debug!(?cli, "parsed CLI arguments");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "bench-results failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
