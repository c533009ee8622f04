mod error;
mod loader;

pub use error::ElementsError;
pub use loader::{load_tle_file, parse_tle_set, LoadOutcome, RejectedSet};

use sgp4::{Constants, Elements};

use crate::grid::JulianDate;

/// Propagatable per-satellite state, derived once from an element set and
/// never mutated afterwards. Building it front-loads every validity check the
/// orbital model performs (eccentricity range, mean motion sign, perigee
/// height), so a satellite that survives construction can always be handed to
/// the batch propagator.
#[derive(Debug)]
pub struct OrbitState {
    pub name: String,
    pub norad_id: u32,
    pub epoch: JulianDate,
    constants: Constants,
}

impl OrbitState {
    pub fn from_elements(elements: Elements) -> Result<Self, ElementsError> {
        let constants = Constants::from_elements(&elements)?;
        let name = elements
            .object_name
            .clone()
            .unwrap_or_else(|| format!("NORAD {}", elements.norad_id));
        Ok(Self {
            name,
            norad_id: elements.norad_id as u32,
            epoch: JulianDate::from_datetime(&elements.datetime),
            constants,
        })
    }

    pub fn from_tle(
        name: Option<String>,
        line1: &str,
        line2: &str,
    ) -> Result<Self, ElementsError> {
        let elements = Elements::from_tle(name, line1.as_bytes(), line2.as_bytes())?;
        Self::from_elements(elements)
    }

    pub(crate) fn constants(&self) -> &Constants {
        &self.constants
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2008-09-20 epoch, valid checksums
    const ISS_LINE1: &str = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const ISS_LINE2: &str = "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    #[test]
    fn builds_state_from_valid_tle() {
        let state = OrbitState::from_tle(Some("ISS (ZARYA)".to_string()), ISS_LINE1, ISS_LINE2)
            .expect("valid TLE");
        assert_eq!(state.norad_id, 25544);
        assert_eq!(state.name, "ISS (ZARYA)");
        // Epoch day 264.51782528 of 2008
        assert!(state.epoch.fraction > 0.51 && state.epoch.fraction < 0.52);
    }

    #[test]
    fn names_unnamed_satellites_after_catalog_number() {
        let state = OrbitState::from_tle(None, ISS_LINE1, ISS_LINE2).expect("valid TLE");
        assert_eq!(state.name, "NORAD 25544");
    }

    #[test]
    fn rejects_out_of_range_eccentricity() {
        let mut elements =
            Elements::from_tle(None, ISS_LINE1.as_bytes(), ISS_LINE2.as_bytes()).unwrap();
        elements.eccentricity = 1.5;
        let result = OrbitState::from_elements(elements);
        assert!(matches!(result, Err(ElementsError::ModelInit(_))));
    }

    #[test]
    fn rejection_is_deterministic() {
        let garbled = ISS_LINE1.replace("25544", "2554X");
        let first = OrbitState::from_tle(None, &garbled, ISS_LINE2);
        let second = OrbitState::from_tle(None, &garbled, ISS_LINE2);
        assert!(first.is_err());
        assert_eq!(
            first.unwrap_err().to_string(),
            second.unwrap_err().to_string()
        );
    }
}
