use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use thiserror::Error;

const MINUTES_PER_DAY: f64 = 1440.0;
const SECONDS_PER_DAY: f64 = 86_400.0;
const J2000_JD: f64 = 2_451_545.0;
const DAYS_PER_JULIAN_YEAR: f64 = 365.25;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("grid step must be positive")]
    NonPositiveStep,
    #[error("grid duration must be positive")]
    NonPositiveDuration,
    #[error("grid duration or step exceeds the nanosecond-representable range")]
    Overflow,
}

/// A split Julian date: the Julian day number at 0h UT plus the elapsed
/// fraction of that day. Keeping the two parts separate preserves sub-second
/// resolution; a single f64 Julian date loses it at modern epochs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JulianDate {
    pub day: f64,
    pub fraction: f64,
}

impl JulianDate {
    pub fn from_datetime(t: &NaiveDateTime) -> Self {
        let day = julian_day_number(t.year(), t.month(), t.day());
        let seconds = f64::from(t.time().num_seconds_from_midnight())
            + f64::from(t.time().nanosecond()) * 1e-9;
        Self {
            day,
            fraction: seconds / SECONDS_PER_DAY,
        }
    }

    /// Julian years since the J2000.0 epoch, the argument expected by
    /// `sgp4::iau_epoch_to_sidereal_time`.
    pub fn years_since_j2000(&self) -> f64 {
        ((self.day - J2000_JD) + self.fraction) / DAYS_PER_JULIAN_YEAR
    }

    /// Signed offset from `epoch` in minutes. The day and fraction parts are
    /// differenced separately before scaling so sub-second precision survives.
    pub fn minutes_since(&self, epoch: &JulianDate) -> f64 {
        (self.day - epoch.day) * MINUTES_PER_DAY + (self.fraction - epoch.fraction) * MINUTES_PER_DAY
    }
}

/// Julian day number at 0h UT for a Gregorian calendar date (Vallado's
/// algorithm, valid 1900-2100).
fn julian_day_number(year: i32, month: u32, day: u32) -> f64 {
    let y = f64::from(year);
    let m = f64::from(month);
    let d = f64::from(day);
    367.0 * y - ((7.0 * (y + ((m + 9.0) / 12.0).floor())) / 4.0).floor()
        + ((275.0 * m) / 9.0).floor()
        + d
        + 1_721_013.5
}

/// The ordered instants every satellite in a run is evaluated at.
///
/// Start inclusive, end exclusive: length = duration / step, rounded down.
/// Instants are strictly increasing with uniform spacing, and the grid is
/// shared read-only across workers.
#[derive(Debug, Clone)]
pub struct TimeGrid {
    start: DateTime<Utc>,
    step: Duration,
    instants: Vec<JulianDate>,
}

impl TimeGrid {
    /// Lengths are computed in nanoseconds so sub-millisecond steps count
    /// correctly; durations past the nanosecond-representable range
    /// (roughly 292 years) are rejected.
    pub fn new(start: DateTime<Utc>, duration: Duration, step: Duration) -> Result<Self, GridError> {
        if step <= Duration::zero() {
            return Err(GridError::NonPositiveStep);
        }
        if duration <= Duration::zero() {
            return Err(GridError::NonPositiveDuration);
        }
        let (Some(duration_ns), Some(step_ns)) =
            (duration.num_nanoseconds(), step.num_nanoseconds())
        else {
            return Err(GridError::Overflow);
        };
        let count = (duration_ns / step_ns) as usize;
        Ok(Self::from_parts(start, step, count))
    }

    /// The grid the batch pipeline uses by default: one UTC day sampled every
    /// minute, 1440 instants starting at midnight.
    pub fn for_day(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        Self::from_parts(start, Duration::minutes(1), 24 * 60)
    }

    fn from_parts(start: DateTime<Utc>, step: Duration, count: usize) -> Self {
        let instants = (0..count)
            .map(|i| JulianDate::from_datetime(&(start + step * i as i32).naive_utc()))
            .collect();
        Self { start, step, instants }
    }

    pub fn instants(&self) -> &[JulianDate] {
        &self.instants
    }

    /// Resolve a grid index back to the absolute instant it represents.
    pub fn datetime(&self, index: usize) -> DateTime<Utc> {
        self.start + self.step * index as i32
    }

    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn julian_day_of_j2000() {
        // 2000-01-01 00:00 UT is JD 2451544.5
        assert_eq!(julian_day_number(2000, 1, 1), 2_451_544.5);
    }

    #[test]
    fn day_grid_has_one_instant_per_minute() {
        let grid = TimeGrid::for_day(NaiveDate::from_ymd_opt(2019, 12, 9).unwrap());
        assert_eq!(grid.len(), 1440);

        let first = grid.instants()[0];
        assert_eq!(first.fraction, 0.0);
        assert_eq!(grid.datetime(0).to_rfc3339(), "2019-12-09T00:00:00+00:00");
        // End exclusive: the last instant is 23:59, not midnight of the next day.
        assert_eq!(grid.datetime(1439).to_rfc3339(), "2019-12-09T23:59:00+00:00");
    }

    #[test]
    fn grid_is_strictly_increasing_and_uniform() {
        let grid = TimeGrid::for_day(NaiveDate::from_ymd_opt(2019, 12, 9).unwrap());
        let step_minutes = 1.0;
        for pair in grid.instants().windows(2) {
            let dt = pair[1].minutes_since(&pair[0]);
            assert!((dt - step_minutes).abs() < 1e-9);
        }
    }

    #[test]
    fn length_rounds_down() {
        let start = NaiveDate::from_ymd_opt(2019, 12, 9)
            .unwrap()
            .and_time(NaiveTime::MIN)
            .and_utc();
        let grid = TimeGrid::new(start, Duration::seconds(150), Duration::seconds(60)).unwrap();
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn counts_sub_millisecond_steps() {
        let start = NaiveDate::from_ymd_opt(2019, 12, 9)
            .unwrap()
            .and_time(NaiveTime::MIN)
            .and_utc();
        let grid =
            TimeGrid::new(start, Duration::seconds(1), Duration::microseconds(500)).unwrap();
        assert_eq!(grid.len(), 2000);
    }

    #[test]
    fn rejects_durations_past_nanosecond_range() {
        let start = NaiveDate::from_ymd_opt(2019, 12, 9)
            .unwrap()
            .and_time(NaiveTime::MIN)
            .and_utc();
        // ~383 years: representable in milliseconds, not in nanoseconds
        let result = TimeGrid::new(start, Duration::weeks(20_000), Duration::minutes(1));
        assert!(matches!(result, Err(GridError::Overflow)));
    }

    #[test]
    fn rejects_non_positive_step() {
        let start = NaiveDate::from_ymd_opt(2019, 12, 9)
            .unwrap()
            .and_time(NaiveTime::MIN)
            .and_utc();
        assert!(TimeGrid::new(start, Duration::hours(1), Duration::zero()).is_err());
        assert!(TimeGrid::new(start, Duration::zero(), Duration::minutes(1)).is_err());
    }

    #[test]
    fn fraction_carries_sub_second_precision() {
        let t = NaiveDate::from_ymd_opt(2019, 12, 9)
            .unwrap()
            .and_hms_nano_opt(12, 0, 0, 500_000_000)
            .unwrap();
        let jd = JulianDate::from_datetime(&t);
        let noon = JulianDate {
            day: jd.day,
            fraction: 0.5,
        };
        let offset_minutes = jd.minutes_since(&noon);
        assert!((offset_minutes - 0.5 / 60.0).abs() < 1e-12);
    }
}
