mod polygon;

pub use polygon::{Polygon, RegionError};

// WGS-84 ellipsoid
const EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const ECCENTRICITY_SQUARED: f64 = 0.006_694_379_990_14;

const LATITUDE_ITERATIONS: usize = 10;

/// Geodetic coordinates of one subsatellite point. Longitude is normalized
/// to [-180, 180).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodetic {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

/// Convert an ECEF position (km) to geodetic latitude/longitude/altitude on
/// the WGS-84 ellipsoid. Fixed-count iterative latitude refinement; stateless
/// per point, so callers are free to batch or loop.
pub fn ecef_to_geodetic(position: [f64; 3]) -> Geodetic {
    let [x, y, z] = position;

    let mut longitude_deg = y.atan2(x).to_degrees();
    if longitude_deg >= 180.0 {
        longitude_deg -= 360.0;
    }

    let p = (x * x + y * y).sqrt();
    let mut latitude_rad = z.atan2(p);
    let mut sin_lat = latitude_rad.sin();
    let mut n = prime_vertical_radius(sin_lat);
    for _ in 0..LATITUDE_ITERATIONS {
        latitude_rad = (z + ECCENTRICITY_SQUARED * n * sin_lat).atan2(p);
        sin_lat = latitude_rad.sin();
        n = prime_vertical_radius(sin_lat);
    }

    let cos_lat = latitude_rad.cos();
    // Near the poles p/cos(lat) degenerates; fall back to the polar axis form.
    let altitude_km = if cos_lat.abs() > 1e-10 {
        p / cos_lat - n
    } else {
        z.abs() / sin_lat.abs() - n * (1.0 - ECCENTRICITY_SQUARED)
    };

    Geodetic {
        latitude_deg: latitude_rad.to_degrees(),
        longitude_deg,
        altitude_km,
    }
}

fn prime_vertical_radius(sin_lat: f64) -> f64 {
    EQUATORIAL_RADIUS_KM / (1.0 - ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt()
}
