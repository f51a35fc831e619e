//! Translational state providers
//!
//! All ephemerides return the Cartesian state (position, velocity) of a body
//! in the global inertial frame.

use crate::time::TimeArgument;
use nalgebra::{Vector3, Vector6};

/// Translational state as a function of time
pub trait Ephemeris: Send + Sync {
    fn state(&self, time: TimeArgument) -> Vector6<f64>;

    fn name(&self) -> &'static str;
}

/// Body at rest at a fixed position
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantEphemeris {
    state: Vector6<f64>,
}

impl ConstantEphemeris {
    pub fn new(state: Vector6<f64>) -> Self {
        Self { state }
    }

    /// Body at the origin of the inertial frame
    pub fn origin() -> Self {
        Self::new(Vector6::zeros())
    }
}

impl Ephemeris for ConstantEphemeris {
    fn state(&self, _time: TimeArgument) -> Vector6<f64> {
        self.state
    }

    fn name(&self) -> &'static str {
        "Constant"
    }
}

/// Cubic Hermite interpolation of a tabulated state history
///
/// Positions are interpolated with the tabulated velocities as node
/// derivatives; the velocity is the derivative of that polynomial, so the
/// two remain consistent. Queries outside the table return the nearest node.
#[derive(Debug, Clone)]
pub struct TabulatedEphemeris {
    times: Vec<f64>,
    states: Vec<Vector6<f64>>,
}

impl TabulatedEphemeris {
    /// Returns `None` when the table is empty, lengths differ or the times are not increasing
    pub fn new(times: Vec<f64>, states: Vec<Vector6<f64>>) -> Option<Self> {
        if times.is_empty() || times.len() != states.len() {
            return None;
        }
        if times.windows(2).any(|pair| pair[1] <= pair[0]) {
            return None;
        }
        Some(Self { times, states })
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn time_span(&self) -> (f64, f64) {
        (self.times[0], self.times[self.times.len() - 1])
    }

    fn interpolate(&self, t: f64) -> Vector6<f64> {
        let last = self.times.len() - 1;
        if t <= self.times[0] {
            return self.states[0];
        }
        if t >= self.times[last] {
            return self.states[last];
        }

        let upper = self.times.partition_point(|&node| node <= t);
        let lower = upper - 1;
        let h = self.times[upper] - self.times[lower];
        let s = (t - self.times[lower]) / h;

        let (p0, v0) = split(&self.states[lower]);
        let (p1, v1) = split(&self.states[upper]);

        let s2 = s * s;
        let s3 = s2 * s;
        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        let position = p0 * h00 + v0 * (h10 * h) + p1 * h01 + v1 * (h11 * h);

        // d/dt = (1/h) d/ds
        let dh00 = 6.0 * s2 - 6.0 * s;
        let dh10 = 3.0 * s2 - 4.0 * s + 1.0;
        let dh01 = -6.0 * s2 + 6.0 * s;
        let dh11 = 3.0 * s2 - 2.0 * s;
        let velocity = p0 * (dh00 / h) + v0 * dh10 + p1 * (dh01 / h) + v1 * dh11;

        join(&position, &velocity)
    }
}

impl Ephemeris for TabulatedEphemeris {
    fn state(&self, time: TimeArgument) -> Vector6<f64> {
        self.interpolate(time.seconds())
    }

    fn name(&self) -> &'static str {
        "Tabulated (cubic Hermite)"
    }
}

pub(crate) fn split(state: &Vector6<f64>) -> (Vector3<f64>, Vector3<f64>) {
    (
        state.fixed_rows::<3>(0).into_owned(),
        state.fixed_rows::<3>(3).into_owned(),
    )
}

pub(crate) fn join(position: &Vector3<f64>, velocity: &Vector3<f64>) -> Vector6<f64> {
    Vector6::new(
        position.x, position.y, position.z, velocity.x, velocity.y, velocity.z,
    )
}
