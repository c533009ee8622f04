mod elements;
mod geo;
mod grid;
mod pipeline;
mod propagate;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::elements::{load_tle_file, RejectedSet};
use crate::geo::Polygon;
use crate::grid::TimeGrid;
use crate::pipeline::{RunConfig, RunReport};

#[derive(Parser)]
#[command(name = "satfence")]
#[command(about = "Find satellites whose ground track crosses a geographic region")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate TLE and region files without propagating
    Validate { tle: PathBuf, region: PathBuf },
    /// Propagate every satellite over a day and filter by the region
    Run {
        tle: PathBuf,
        region: PathBuf,
        /// UTC day the time grid starts at (midnight), YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Grid length
        #[arg(long, default_value = "24h", value_parser = humantime::parse_duration)]
        duration: std::time::Duration,
        /// Grid step
        #[arg(long, default_value = "1m", value_parser = humantime::parse_duration)]
        interval: std::time::Duration,
        /// Worker thread count (default: available parallelism)
        #[arg(long)]
        workers: Option<usize>,
        /// Deadline for worker chunks; pending chunks are failed, not awaited
        #[arg(long, value_parser = humantime::parse_duration)]
        chunk_timeout: Option<std::time::Duration>,
        /// Emit the report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { tle, region } => validate(&tle, &region),
        Commands::Run {
            tle,
            region,
            date,
            duration,
            interval,
            workers,
            chunk_timeout,
            json,
        } => {
            let options = RunOptions {
                date,
                duration,
                interval,
                workers,
                chunk_timeout,
                json,
            };
            run(&tle, &region, &options)
        }
    }
}

struct RunOptions {
    date: NaiveDate,
    duration: std::time::Duration,
    interval: std::time::Duration,
    workers: Option<usize>,
    chunk_timeout: Option<std::time::Duration>,
    json: bool,
}

fn validate(tle: &Path, region: &Path) -> ExitCode {
    let outcome = match load_tle_file(tle) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error loading TLE file: {e}");
            return ExitCode::FAILURE;
        }
    };
    println!(
        "{} satellites loaded, {} element sets rejected",
        outcome.states.len(),
        outcome.rejected.len()
    );
    for rejected in &outcome.rejected {
        println!("  rejected {}: {}", rejected.label, rejected.error);
    }

    match Polygon::from_file(region) {
        Ok(_) => println!("Region is valid"),
        Err(e) => {
            eprintln!("Error loading region: {e}");
            return ExitCode::FAILURE;
        }
    }

    if outcome.states.is_empty() {
        eprintln!("No usable satellites");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn run(tle: &Path, region: &Path, options: &RunOptions) -> ExitCode {
    let outcome = match load_tle_file(tle) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error loading TLE file: {e}");
            return ExitCode::FAILURE;
        }
    };

    let polygon = match Polygon::from_file(region) {
        Ok(polygon) => polygon,
        Err(e) => {
            eprintln!("Error loading region: {e}");
            return ExitCode::FAILURE;
        }
    };

    let grid = match build_grid(options.date, options.duration, options.interval) {
        Ok(grid) => grid,
        Err(e) => {
            eprintln!("Error building time grid: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (invalid, unattributable) = split_rejected(outcome.rejected);
    for rejected in &unattributable {
        log::warn!(
            "rejected element set {} has no recoverable catalog number and will be \
             missing from the failure manifest: {}",
            rejected.label,
            rejected.error
        );
    }

    let config = RunConfig {
        workers: options.workers.unwrap_or_else(pipeline::default_workers),
        chunk_timeout: options.chunk_timeout,
    };

    log::info!(
        "run: {} satellites, {} instants, {} workers",
        outcome.states.len(),
        grid.len(),
        config.workers
    );

    let started = Instant::now();
    let report = pipeline::run(
        outcome.states,
        invalid,
        Arc::new(grid),
        Arc::new(polygon),
        &config,
    );
    let elapsed = started.elapsed();

    if options.json {
        match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("Error rendering report: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        print_table(&report);
    }
    println!("{:.3}s elapsed", elapsed.as_secs_f64());
    ExitCode::SUCCESS
}

/// Partition rejected element sets into manifest entries (catalog number
/// recovered) and sets the manifest cannot name.
fn split_rejected(rejected: Vec<RejectedSet>) -> (Vec<(u32, String)>, Vec<RejectedSet>) {
    let mut invalid = Vec::new();
    let mut unattributable = Vec::new();
    for set in rejected {
        match set.norad_id {
            Some(norad_id) => invalid.push((norad_id, set.error.to_string())),
            None => unattributable.push(set),
        }
    }
    (invalid, unattributable)
}

fn build_grid(
    date: NaiveDate,
    duration: std::time::Duration,
    interval: std::time::Duration,
) -> Result<TimeGrid, String> {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let duration = chrono::Duration::from_std(duration).map_err(|e| e.to_string())?;
    let interval = chrono::Duration::from_std(interval).map_err(|e| e.to_string())?;
    TimeGrid::new(start, duration, interval).map_err(|e| e.to_string())
}

fn print_table(report: &RunReport) {
    if report.rows.is_empty() {
        println!("No satellites inside the region");
    } else {
        println!(
            "{:>9} {:>6} {:<20} {:>10} {:>10} {:>9}",
            "norad", "index", "timestamp", "lat", "lon", "alt_km"
        );
        for row in &report.rows {
            println!(
                "{:>9} {:>6} {:<20} {:>10.4} {:>10.4} {:>9.1}",
                row.norad_id,
                row.time_index,
                row.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
                row.latitude_deg,
                row.longitude_deg,
                row.altitude_km
            );
        }
        println!("{} rows", report.rows.len());
    }

    if !report.failures.is_empty() {
        println!("{} satellites not fully processed:", report.failures.len());
        for (norad_id, reason) in &report.failures {
            println!("  {norad_id}: {reason:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::ElementsError;

    fn reject(norad_id: Option<u32>, label: &str) -> RejectedSet {
        RejectedSet {
            norad_id,
            label: label.to_string(),
            error: ElementsError::FileRead(std::io::Error::other("bad element set")),
        }
    }

    #[test]
    fn split_rejected_keeps_nameless_sets_visible() {
        let (invalid, unattributable) = split_rejected(vec![
            reject(Some(25544), "ISS (ZARYA)"),
            reject(None, "GARBLED LINE"),
        ]);
        assert_eq!(invalid.len(), 1);
        assert_eq!(invalid[0].0, 25544);
        assert_eq!(unattributable.len(), 1);
        assert_eq!(unattributable[0].label, "GARBLED LINE");
    }
}
