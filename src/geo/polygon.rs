use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::geo::Geodetic;

const EDGE_EPSILON: f64 = 1e-9;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("region file read error: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("region parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("ring needs at least 3 distinct vertices, got {0}")]
    DegenerateRing(usize),
}

/// A geographic region: one outer ring and any number of hole rings, vertices
/// as (longitude, latitude) pairs in degrees. Immutable for the duration of a
/// run and shared read-only by all workers.
///
/// Membership is boundary-inclusive: a point on any ring edge or vertex
/// counts as inside. NaN coordinates are never inside. Rings may be given
/// open or closed; a closing vertex equal to the first is dropped.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RegionFile")]
pub struct Polygon {
    outer: Vec<[f64; 2]>,
    holes: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Deserialize)]
struct RegionFile {
    outer: Vec<[f64; 2]>,
    #[serde(default)]
    holes: Vec<Vec<[f64; 2]>>,
}

impl TryFrom<RegionFile> for Polygon {
    type Error = RegionError;

    fn try_from(file: RegionFile) -> Result<Self, Self::Error> {
        Polygon::new(file.outer, file.holes)
    }
}

impl Polygon {
    pub fn new(outer: Vec<[f64; 2]>, holes: Vec<Vec<[f64; 2]>>) -> Result<Self, RegionError> {
        let outer = normalize_ring(outer)?;
        let holes = holes
            .into_iter()
            .map(normalize_ring)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { outer, holes })
    }

    pub fn from_file(path: &Path) -> Result<Self, RegionError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Boundary-inclusive point-in-polygon test for one (longitude, latitude)
    /// pair in degrees.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        if lon.is_nan() || lat.is_nan() {
            return false;
        }
        if on_ring_boundary(&self.outer, lon, lat)
            || self.holes.iter().any(|h| on_ring_boundary(h, lon, lat))
        {
            return true;
        }
        ray_cast(&self.outer, lon, lat) && !self.holes.iter().any(|h| ray_cast(h, lon, lat))
    }

    /// One-pass membership mask over a batch of points; mask[i] corresponds
    /// to points[i].
    pub fn mask(&self, points: &[Geodetic]) -> Vec<bool> {
        points
            .iter()
            .map(|p| self.contains(p.longitude_deg, p.latitude_deg))
            .collect()
    }
}

fn normalize_ring(mut ring: Vec<[f64; 2]>) -> Result<Vec<[f64; 2]>, RegionError> {
    if ring.len() >= 2 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(RegionError::DegenerateRing(ring.len()));
    }
    Ok(ring)
}

/// Even-odd ray casting against one ring, boundary cases excluded (handled
/// separately by `on_ring_boundary`).
fn ray_cast(ring: &[[f64; 2]], lon: f64, lat: f64) -> bool {
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn on_ring_boundary(ring: &[[f64; 2]], lon: f64, lat: f64) -> bool {
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        if on_segment(ring[j], ring[i], lon, lat) {
            return true;
        }
        j = i;
    }
    false
}

fn on_segment(a: [f64; 2], b: [f64; 2], lon: f64, lat: f64) -> bool {
    let cross = (b[0] - a[0]) * (lat - a[1]) - (b[1] - a[1]) * (lon - a[0]);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    lon >= a[0].min(b[0]) - EDGE_EPSILON
        && lon <= a[0].max(b[0]) + EDGE_EPSILON
        && lat >= a[1].min(b[1]) - EDGE_EPSILON
        && lat <= a[1].max(b[1]) + EDGE_EPSILON
}
