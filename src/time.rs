//! Time representations for propagation
//!
//! Two representations are supported everywhere a model is queried by time:
//!
//! - **`f64`**: seconds since J2000, fast but loses resolution far from the epoch
//! - **`Time`**: compensated representation (whole hours + seconds into the hour)
//!
//! Time-dependent interfaces receive a [`TimeArgument`] so that an
//! implementation written for one form is still reachable from the other
//! through an explicit conversion instead of a silent truncation.

use chrono::{DateTime, TimeDelta, Utc};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// Length of one full period of the compensated representation, in seconds
pub const TIME_NORMALIZATION_TERM: f64 = 3600.0;

/// J2000 reference epoch (2000-01-01 12:00:00 UTC) as a Unix timestamp
const J2000_UNIX_SECONDS: i64 = 946_728_000;

/// Time as handed to a time-dependent model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeArgument {
    Seconds(f64),
    Extended(Time),
}

impl TimeArgument {
    /// Plain seconds since J2000 (lossy for `Extended`)
    pub fn seconds(&self) -> f64 {
        match self {
            Self::Seconds(seconds) => *seconds,
            Self::Extended(time) => time.to_seconds(),
        }
    }

    /// Compensated time (exact for both forms)
    pub fn extended(&self) -> Time {
        match self {
            Self::Seconds(seconds) => Time::from_seconds(*seconds),
            Self::Extended(time) => *time,
        }
    }
}

/// Time type usable by the integrator and the orchestrator
pub trait TimeValue: Copy + PartialOrd + fmt::Debug + Send + Sync + 'static {
    fn from_seconds(seconds: f64) -> Self;

    /// Seconds since J2000
    fn to_seconds(self) -> f64;

    fn to_extended(self) -> Time;

    fn from_extended(time: Time) -> Self;

    /// Advance by a step size in seconds
    fn add_seconds(self, dt: f64) -> Self;

    /// Difference `self - earlier` in seconds, computed in this representation
    fn seconds_since(self, earlier: Self) -> f64;

    /// Wrap for a time-dependent model query
    fn argument(self) -> TimeArgument;

    fn from_epoch(epoch: &DateTime<Utc>) -> Option<Self> {
        Time::from_epoch(epoch).map(Self::from_extended)
    }

    fn to_epoch(self) -> Option<DateTime<Utc>> {
        Time::to_epoch(&self.to_extended())
    }
}

impl TimeValue for f64 {
    fn from_seconds(seconds: f64) -> Self {
        seconds
    }

    fn to_seconds(self) -> f64 {
        self
    }

    fn to_extended(self) -> Time {
        Time::from_seconds(self)
    }

    fn from_extended(time: Time) -> Self {
        time.to_seconds()
    }

    fn add_seconds(self, dt: f64) -> Self {
        self + dt
    }

    fn seconds_since(self, earlier: Self) -> f64 {
        self - earlier
    }

    fn argument(self) -> TimeArgument {
        TimeArgument::Seconds(self)
    }
}

/// Compensated time: `full_periods * 3600 + seconds_into_full_period`
///
/// Invariant: `0 <= seconds_into_full_period < 3600` after every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Time {
    full_periods: i64,
    seconds_into_full_period: f64,
}

impl Time {
    pub fn new(full_periods: i64, seconds_into_full_period: f64) -> Self {
        let mut time = Self {
            full_periods,
            seconds_into_full_period,
        };
        time.normalize();
        time
    }

    pub fn from_seconds(seconds: f64) -> Self {
        Self::new(0, seconds)
    }

    pub fn full_periods(&self) -> i64 {
        self.full_periods
    }

    pub fn seconds_into_full_period(&self) -> f64 {
        self.seconds_into_full_period
    }

    pub fn to_seconds(&self) -> f64 {
        self.full_periods as f64 * TIME_NORMALIZATION_TERM + self.seconds_into_full_period
    }

    /// Exact difference `self - earlier` in seconds
    pub fn difference_in_seconds(&self, earlier: &Time) -> f64 {
        (self.full_periods - earlier.full_periods) as f64 * TIME_NORMALIZATION_TERM
            + (self.seconds_into_full_period - earlier.seconds_into_full_period)
    }

    /// Convert a UTC epoch to time since J2000 (leap seconds ignored)
    pub fn from_epoch(epoch: &DateTime<Utc>) -> Option<Self> {
        let j2000 = DateTime::<Utc>::from_timestamp(J2000_UNIX_SECONDS, 0)?;
        let delta = epoch.signed_duration_since(j2000);
        let whole_seconds = delta.num_seconds();
        let nanos = delta.subsec_nanos();

        Some(Self::new(
            whole_seconds.div_euclid(TIME_NORMALIZATION_TERM as i64),
            whole_seconds.rem_euclid(TIME_NORMALIZATION_TERM as i64) as f64 + nanos as f64 * 1e-9,
        ))
    }

    pub fn to_epoch(&self) -> Option<DateTime<Utc>> {
        if !self.seconds_into_full_period.is_finite() {
            return None;
        }
        let j2000 = DateTime::<Utc>::from_timestamp(J2000_UNIX_SECONDS, 0)?;
        let whole = self.seconds_into_full_period.floor();
        let nanos = ((self.seconds_into_full_period - whole) * 1e9).round() as i64;
        let seconds = self
            .full_periods
            .checked_mul(TIME_NORMALIZATION_TERM as i64)?
            .checked_add(whole as i64)?;

        j2000
            .checked_add_signed(TimeDelta::try_seconds(seconds)?)?
            .checked_add_signed(TimeDelta::nanoseconds(nanos))
    }

    fn normalize(&mut self) {
        if !self.seconds_into_full_period.is_finite() {
            return;
        }
        let shift = (self.seconds_into_full_period / TIME_NORMALIZATION_TERM).floor();
        if shift != 0.0 {
            self.full_periods += shift as i64;
            self.seconds_into_full_period -= shift * TIME_NORMALIZATION_TERM;
        }
        // Rounding in the subtraction above can land exactly on the upper bound
        if self.seconds_into_full_period >= TIME_NORMALIZATION_TERM {
            self.full_periods += 1;
            self.seconds_into_full_period -= TIME_NORMALIZATION_TERM;
        } else if self.seconds_into_full_period < 0.0 {
            self.full_periods -= 1;
            self.seconds_into_full_period += TIME_NORMALIZATION_TERM;
        }
    }
}

impl PartialEq for Time {
    fn eq(&self, other: &Self) -> bool {
        self.full_periods == other.full_periods
            && self.seconds_into_full_period == other.seconds_into_full_period
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.full_periods.cmp(&other.full_periods) {
            Ordering::Equal => self
                .seconds_into_full_period
                .partial_cmp(&other.seconds_into_full_period),
            ordering => Some(ordering),
        }
    }
}

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        Time::new(
            self.full_periods + rhs.full_periods,
            self.seconds_into_full_period + rhs.seconds_into_full_period,
        )
    }
}

impl Add<f64> for Time {
    type Output = Time;

    fn add(self, rhs: f64) -> Time {
        Time::new(self.full_periods, self.seconds_into_full_period + rhs)
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        Time::new(
            self.full_periods - rhs.full_periods,
            self.seconds_into_full_period - rhs.seconds_into_full_period,
        )
    }
}

impl Sub<f64> for Time {
    type Output = Time;

    fn sub(self, rhs: f64) -> Time {
        Time::new(self.full_periods, self.seconds_into_full_period - rhs)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.9} s", self.to_seconds())
    }
}

impl TimeValue for Time {
    fn from_seconds(seconds: f64) -> Self {
        Time::from_seconds(seconds)
    }

    fn to_seconds(self) -> f64 {
        Time::to_seconds(&self)
    }

    fn to_extended(self) -> Time {
        self
    }

    fn from_extended(time: Time) -> Self {
        time
    }

    fn add_seconds(self, dt: f64) -> Self {
        self + dt
    }

    fn seconds_since(self, earlier: Self) -> f64 {
        self.difference_in_seconds(&earlier)
    }

    fn argument(self) -> TimeArgument {
        TimeArgument::Extended(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    #[test]
    fn test_normalization() {
        let time = Time::new(1, 7300.5);
        assert_eq!(time.full_periods(), 3);
        assert_abs_diff_eq!(time.seconds_into_full_period(), 100.5);

        let negative = Time::from_seconds(-10.0);
        assert_eq!(negative.full_periods(), -1);
        assert_abs_diff_eq!(negative.seconds_into_full_period(), 3590.0);
        assert_abs_diff_eq!(negative.to_seconds(), -10.0);
    }

    #[test]
    fn test_compensated_accumulation() {
        // Far from the epoch, micro-second increments survive in the compensated form
        let start = Time::from_seconds(1.0e9);
        let mut time = start;
        let mut plain = 1.0e9_f64;
        for _ in 0..1000 {
            time = time + 1.0e-6;
            plain += 1.0e-6;
        }
        // Each add rounds within the 3600 s period, below 1e-12 s
        assert_abs_diff_eq!(time.difference_in_seconds(&start), 1.0e-3, epsilon = 1e-9);
        // A bare f64 rounds every increment to its 1.2e-7 s spacing
        assert!((plain - 1.0e9 - 1.0e-3).abs() > 1.0e-5);
    }

    #[test]
    fn test_ordering() {
        let a = Time::new(2, 10.0);
        let b = Time::new(1, 3599.0);
        assert!(a > b);
        assert!(b < a);
        assert_eq!(a, Time::from_seconds(7210.0));
    }

    #[test]
    fn test_arithmetic() {
        let a = Time::from_seconds(5000.0);
        let b = Time::from_seconds(1500.0);
        assert_abs_diff_eq!((a - b).to_seconds(), 3500.0);
        assert_abs_diff_eq!((a + b).to_seconds(), 6500.0);
        assert_abs_diff_eq!((a - 6000.0).to_seconds(), -1000.0);
    }

    #[test]
    fn test_epoch_round_trip() {
        let epoch = Utc.with_ymd_and_hms(2026, 1, 29, 12, 0, 0).unwrap();
        let time = Time::from_epoch(&epoch).unwrap();
        assert_eq!(time.to_epoch().unwrap(), epoch);

        let j2000 = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert_abs_diff_eq!(<f64 as TimeValue>::from_epoch(&j2000).unwrap(), 0.0);
    }

    #[test]
    fn test_argument_conversion() {
        let argument = Time::new(10, 1.25).argument();
        assert_abs_diff_eq!(argument.seconds(), 36001.25);
        assert_eq!(argument.extended(), Time::new(10, 1.25));
        assert_eq!(TimeArgument::Seconds(7200.0).extended(), Time::new(2, 0.0));
    }
}
