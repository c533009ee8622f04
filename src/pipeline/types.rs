use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One qualifying (satellite, instant) pair: the satellite's subsatellite
/// point was inside the region at that grid instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub norad_id: u32,
    pub time_index: usize,
    pub timestamp: DateTime<Utc>,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

/// Why a satellite could not be fully processed this run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Element set rejected before propagation; the satellite produced no rows.
    InvalidElements { reason: String },
    /// The model failed at some instants; rows for the remaining instants are
    /// still present.
    PropagationFailed { failed_instants: usize },
    /// The worker assigned this satellite's chunk did not complete.
    ChunkFailure,
    /// The worker assigned this satellite's chunk missed the run deadline.
    ChunkTimeout,
}

/// Final output of a run: the (possibly partial) result table, sorted by
/// (catalog number, time index), plus a per-satellite failure manifest. The
/// caller decides whether partial results are acceptable.
#[derive(Debug, Default, Serialize)]
pub struct RunReport {
    pub rows: Vec<ResultRow>,
    pub failures: BTreeMap<u32, FailureReason>,
}
