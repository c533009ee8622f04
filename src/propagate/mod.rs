use sgp4::MinutesSinceEpoch;

use crate::elements::OrbitState;
use crate::grid::TimeGrid;

/// Dense per-satellite position table over one time grid: one entry per grid
/// instant, `None` where the model failed (decayed orbit, numerical
/// singularity). A cell failure never disturbs the satellite's other cells.
pub struct GroundTrack {
    pub norad_id: u32,
    pub positions: Vec<Option<[f64; 3]>>,
    pub failed_instants: usize,
}

/// Propagate a sub-list of satellites across the shared grid, returning ECEF
/// positions in km. Accepts any chunk of the full satellite set; results are
/// identical however the set is partitioned, and identical to evaluating one
/// instant at a time.
pub fn propagate_chunk(states: &[OrbitState], grid: &TimeGrid) -> Vec<GroundTrack> {
    // The Earth rotation angle depends only on the instant, so compute it
    // once per grid and share it across the chunk.
    let sidereal: Vec<f64> = grid
        .instants()
        .iter()
        .map(|jd| sgp4::iau_epoch_to_sidereal_time(jd.years_since_j2000()))
        .collect();

    states
        .iter()
        .map(|state| {
            let mut positions = Vec::with_capacity(grid.len());
            let mut failed_instants = 0;
            for (index, instant) in grid.instants().iter().enumerate() {
                let minutes = instant.minutes_since(&state.epoch);
                match state.constants().propagate(MinutesSinceEpoch(minutes)) {
                    Ok(prediction) => {
                        positions.push(Some(teme_to_ecef(prediction.position, sidereal[index])));
                    }
                    Err(err) => {
                        log::debug!(
                            "propagation failed for {} at grid index {index}: {err}",
                            state.norad_id
                        );
                        failed_instants += 1;
                        positions.push(None);
                    }
                }
            }
            GroundTrack {
                norad_id: state.norad_id,
                positions,
                failed_instants,
            }
        })
        .collect()
}

/// Rotate a TEME position into the Earth-fixed frame by the Greenwich
/// sidereal angle (rotation about the polar axis).
pub fn teme_to_ecef(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let (sin_gmst, cos_gmst) = gmst.sin_cos();
    let [x, y, z] = pos_teme;
    [x * cos_gmst + y * sin_gmst, y * cos_gmst - x * sin_gmst, z]
}
