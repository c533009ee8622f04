mod types;

pub use types::{FailureReason, ResultRow, RunReport};

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError};

use crate::elements::OrbitState;
use crate::geo::{ecef_to_geodetic, Geodetic, Polygon};
use crate::grid::TimeGrid;
use crate::propagate;

pub struct RunConfig {
    pub workers: usize,
    /// Deadline for the whole fan-out; chunks still pending when it expires
    /// are reported as timed out instead of hanging the run.
    pub chunk_timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            chunk_timeout: None,
        }
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

struct ChunkOutcome {
    index: usize,
    rows: Vec<ResultRow>,
    failures: Vec<(u32, FailureReason)>,
}

/// Fan the satellite set out over a fixed pool of worker threads, run
/// propagate → convert → filter per chunk, and merge the partial tables.
///
/// Every satellite lands in exactly one chunk, so the merged row set does not
/// depend on the worker count. The grid and region are shared read-only; each
/// chunk owns its satellites and intermediate buffers outright. A chunk whose
/// worker dies or misses the deadline is reported against all of its
/// satellites; completed chunks' rows are always kept.
pub fn run(
    states: Vec<OrbitState>,
    invalid: Vec<(u32, String)>,
    grid: Arc<TimeGrid>,
    polygon: Arc<Polygon>,
    config: &RunConfig,
) -> RunReport {
    let mut report = RunReport::default();
    for (norad_id, reason) in invalid {
        report
            .failures
            .insert(norad_id, FailureReason::InvalidElements { reason });
    }
    if states.is_empty() {
        return report;
    }

    let chunks = partition(states, config.workers.max(1));
    let chunk_ids: Vec<Vec<u32>> = chunks
        .iter()
        .map(|chunk| chunk.iter().map(|s| s.norad_id).collect())
        .collect();
    log::info!(
        "dispatching {} satellites over {} workers",
        chunk_ids.iter().map(Vec::len).sum::<usize>(),
        chunks.len()
    );

    // Capacity covers every outcome, so workers never block on send even if
    // the scheduler has already given up on the run.
    let (tx, rx) = bounded(chunks.len());
    for (index, chunk) in chunks.into_iter().enumerate() {
        let tx = tx.clone();
        let grid = Arc::clone(&grid);
        let polygon = Arc::clone(&polygon);
        thread::spawn(move || {
            let _ = tx.send(process_chunk(index, &chunk, &grid, &polygon));
        });
    }
    drop(tx);

    let deadline = config.chunk_timeout.map(|t| Instant::now() + t);
    let mut completed = vec![false; chunk_ids.len()];
    let mut pending = chunk_ids.len();
    let mut timed_out = false;
    while pending > 0 {
        let outcome = match deadline {
            Some(deadline) => match rx.recv_deadline(deadline) {
                Ok(outcome) => outcome,
                Err(RecvTimeoutError::Timeout) => {
                    timed_out = true;
                    break;
                }
                // A disconnect with chunks still pending means a worker died.
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match rx.recv() {
                Ok(outcome) => outcome,
                Err(_) => break,
            },
        };
        completed[outcome.index] = true;
        pending -= 1;
        report.rows.extend(outcome.rows);
        for (norad_id, reason) in outcome.failures {
            report.failures.insert(norad_id, reason);
        }
    }

    for (index, done) in completed.iter().enumerate() {
        if !done {
            let reason = if timed_out {
                FailureReason::ChunkTimeout
            } else {
                FailureReason::ChunkFailure
            };
            log::warn!(
                "chunk {index} did not complete, failing its {} satellites",
                chunk_ids[index].len()
            );
            for norad_id in &chunk_ids[index] {
                report.failures.insert(*norad_id, reason.clone());
            }
        }
    }

    report
        .rows
        .sort_by(|a, b| (a.norad_id, a.time_index).cmp(&(b.norad_id, b.time_index)));
    report
}

/// Split the satellite set into at most `workers` contiguous chunks of
/// near-equal size, the remainder going to the leading chunks. Input order is
/// preserved within and across chunks.
fn partition(states: Vec<OrbitState>, workers: usize) -> Vec<Vec<OrbitState>> {
    let total = states.len();
    let count = workers.min(total).max(1);
    let base = total / count;
    let remainder = total % count;

    let mut chunks = Vec::with_capacity(count);
    let mut rest = states;
    for index in 0..count {
        let take = base + usize::from(index < remainder);
        let tail = rest.split_off(take);
        chunks.push(rest);
        rest = tail;
    }
    chunks
}

fn process_chunk(
    index: usize,
    states: &[OrbitState],
    grid: &TimeGrid,
    polygon: &Polygon,
) -> ChunkOutcome {
    let mut rows = Vec::new();
    let mut failures = Vec::new();

    for track in propagate::propagate_chunk(states, grid) {
        if track.failed_instants > 0 {
            failures.push((
                track.norad_id,
                FailureReason::PropagationFailed {
                    failed_instants: track.failed_instants,
                },
            ));
        }

        // Undefined cells drop out here and can never reach the result table.
        let points: Vec<(usize, Geodetic)> = track
            .positions
            .iter()
            .enumerate()
            .filter_map(|(i, position)| position.map(|p| (i, ecef_to_geodetic(p))))
            .collect();
        let geodetic: Vec<Geodetic> = points.iter().map(|(_, g)| *g).collect();
        let inside = polygon.mask(&geodetic);

        for ((time_index, point), inside) in points.into_iter().zip(inside) {
            if inside {
                rows.push(ResultRow {
                    norad_id: track.norad_id,
                    time_index,
                    timestamp: grid.datetime(time_index),
                    latitude_deg: point.latitude_deg,
                    longitude_deg: point.longitude_deg,
                    altitude_km: point.altitude_km,
                });
            }
        }
    }

    ChunkOutcome { index, rows, failures }
}
