//! Frame rotation providers
//!
//! A rotation is always reported as a [`RotationState`]: the rotation from a
//! base frame to a target frame, its time derivative and the angular velocity
//! of the target frame expressed in the base frame. The latter two are
//! algebraically tied to each other; see [`angular_velocity_from_matrices`]
//! and [`derivative_of_rotation_matrix_to_frame`].

use crate::time::{Time, TimeArgument};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

/// Rotation, its derivative and the associated angular velocity
///
/// `derivative_to_target` and `angular_velocity_in_base` are `None` when the
/// provider cannot supply them (angle-driven orientation).
#[derive(Debug, Clone, PartialEq)]
pub struct RotationState {
    pub rotation_to_target: UnitQuaternion<f64>,
    pub derivative_to_target: Option<Matrix3<f64>>,
    pub angular_velocity_in_base: Option<Vector3<f64>>,
}

impl Default for RotationState {
    fn default() -> Self {
        Self::identity()
    }
}

impl RotationState {
    /// Identity rotation, not rotating
    pub fn identity() -> Self {
        Self {
            rotation_to_target: UnitQuaternion::identity(),
            derivative_to_target: Some(Matrix3::zeros()),
            angular_velocity_in_base: Some(Vector3::zeros()),
        }
    }

    /// Build from a rotation and the target frame's angular velocity in the base frame
    pub fn from_angular_velocity(
        rotation_to_target: UnitQuaternion<f64>,
        angular_velocity_in_base: Vector3<f64>,
    ) -> Self {
        let derivative = derivative_of_rotation_matrix_to_frame(
            &rotation_to_target.to_rotation_matrix().into_inner(),
            &angular_velocity_in_base,
        );
        Self {
            rotation_to_target,
            derivative_to_target: Some(derivative),
            angular_velocity_in_base: Some(angular_velocity_in_base),
        }
    }

    /// Build from a rotation and its derivative; angular velocity follows
    pub fn from_derivative(
        rotation_to_target: UnitQuaternion<f64>,
        derivative_to_target: Option<Matrix3<f64>>,
    ) -> Self {
        let angular_velocity_in_base = derivative_to_target.map(|derivative| {
            angular_velocity_from_matrices(
                &rotation_to_target.to_rotation_matrix().into_inner(),
                &derivative.transpose(),
            )
        });
        Self {
            rotation_to_target,
            derivative_to_target,
            angular_velocity_in_base,
        }
    }

    pub fn rotation_to_base(&self) -> UnitQuaternion<f64> {
        self.rotation_to_target.inverse()
    }

    pub fn matrix_to_target(&self) -> Matrix3<f64> {
        self.rotation_to_target.to_rotation_matrix().into_inner()
    }

    pub fn matrix_to_base(&self) -> Matrix3<f64> {
        self.matrix_to_target().transpose()
    }

    pub fn derivative_to_base(&self) -> Option<Matrix3<f64>> {
        self.derivative_to_target.map(|derivative| derivative.transpose())
    }

    /// Whether the stored angular velocity matches the one recovered from the matrices
    pub fn is_kinematically_consistent(&self, tolerance: f64) -> bool {
        match (self.derivative_to_base(), self.angular_velocity_in_base) {
            (Some(derivative_to_base), Some(omega)) => {
                let recovered =
                    angular_velocity_from_matrices(&self.matrix_to_target(), &derivative_to_base);
                (recovered - omega).amax() <= tolerance
            }
            (None, None) => true,
            _ => false,
        }
    }
}

/// Angular velocity of the target frame, expressed in the base frame
///
/// `Ṙ_base · R_target` is the cross-product matrix of ω.
pub fn angular_velocity_from_matrices(
    rotation_to_target: &Matrix3<f64>,
    derivative_of_rotation_to_base: &Matrix3<f64>,
) -> Vector3<f64> {
    let cross = derivative_of_rotation_to_base * rotation_to_target;
    Vector3::new(cross[(2, 1)], cross[(0, 2)], cross[(1, 0)])
}

/// Time derivative of the rotation to the target frame
pub fn derivative_of_rotation_matrix_to_frame(
    rotation_to_target: &Matrix3<f64>,
    angular_velocity_in_base: &Vector3<f64>,
) -> Matrix3<f64> {
    (-rotation_to_target * angular_velocity_in_base).cross_matrix() * rotation_to_target
}

/// Rotation between a base and a target frame as a function of time
///
/// Both time forms are available on every query; implementations that only
/// provide the `f64` form are reached from [`Time`] through an explicit
/// conversion.
pub trait RotationalEphemeris: Send + Sync {
    fn base_frame(&self) -> &str;

    fn target_frame(&self) -> &str;

    fn rotation_to_target_frame(&self, time: f64) -> UnitQuaternion<f64>;

    fn rotation_to_target_frame_extended(&self, time: Time) -> UnitQuaternion<f64> {
        self.rotation_to_target_frame(time.to_seconds())
    }

    /// `None` when the derivative is undefined for this provider
    fn derivative_of_rotation_to_target_frame(&self, time: f64) -> Option<Matrix3<f64>>;

    fn derivative_of_rotation_to_target_frame_extended(&self, time: Time) -> Option<Matrix3<f64>> {
        self.derivative_of_rotation_to_target_frame(time.to_seconds())
    }

    fn rotation_to_base_frame(&self, time: TimeArgument) -> UnitQuaternion<f64> {
        self.rotation_to_target(time).inverse()
    }

    fn rotation_to_target(&self, time: TimeArgument) -> UnitQuaternion<f64> {
        match time {
            TimeArgument::Seconds(seconds) => self.rotation_to_target_frame(seconds),
            TimeArgument::Extended(extended) => self.rotation_to_target_frame_extended(extended),
        }
    }

    fn derivative_to_target(&self, time: TimeArgument) -> Option<Matrix3<f64>> {
        match time {
            TimeArgument::Seconds(seconds) => self.derivative_of_rotation_to_target_frame(seconds),
            TimeArgument::Extended(extended) => {
                self.derivative_of_rotation_to_target_frame_extended(extended)
            }
        }
    }

    fn rotation_state(&self, time: TimeArgument) -> RotationState {
        RotationState::from_derivative(self.rotation_to_target(time), self.derivative_to_target(time))
    }
}

/// Time-invariant rotation
pub struct ConstantRotation {
    base_frame: String,
    target_frame: String,
    rotation_to_target: UnitQuaternion<f64>,
}

impl ConstantRotation {
    pub fn new(base_frame: &str, target_frame: &str, rotation_to_target: UnitQuaternion<f64>) -> Self {
        Self {
            base_frame: base_frame.to_string(),
            target_frame: target_frame.to_string(),
            rotation_to_target,
        }
    }
}

impl RotationalEphemeris for ConstantRotation {
    fn base_frame(&self) -> &str {
        &self.base_frame
    }

    fn target_frame(&self) -> &str {
        &self.target_frame
    }

    fn rotation_to_target_frame(&self, _time: f64) -> UnitQuaternion<f64> {
        self.rotation_to_target
    }

    fn derivative_of_rotation_to_target_frame(&self, _time: f64) -> Option<Matrix3<f64>> {
        Some(Matrix3::zeros())
    }
}

/// Uniform rotation about the target frame's z-axis
///
/// `R(t) = Rz(ω (t - t₀)) · R₀`, the usual model for a planet's spin.
pub struct SimpleRotation {
    base_frame: String,
    target_frame: String,
    initial_rotation_to_target: UnitQuaternion<f64>,
    rotation_rate: f64,
    initial_time: f64,
}

impl SimpleRotation {
    pub fn new(
        base_frame: &str,
        target_frame: &str,
        initial_rotation_to_target: UnitQuaternion<f64>,
        rotation_rate: f64,
        initial_time: f64,
    ) -> Self {
        Self {
            base_frame: base_frame.to_string(),
            target_frame: target_frame.to_string(),
            initial_rotation_to_target,
            rotation_rate,
            initial_time,
        }
    }

    /// Earth-like spin starting aligned with the base frame at J2000
    pub fn earth(base_frame: &str, target_frame: &str) -> Self {
        Self::new(
            base_frame,
            target_frame,
            UnitQuaternion::identity(),
            crate::state::OMEGA_EARTH,
            0.0,
        )
    }

    pub fn rotation_rate(&self) -> f64 {
        self.rotation_rate
    }

    fn rotation_at_angle(&self, angle: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -angle) * self.initial_rotation_to_target
    }

    fn derivative_at_angle(&self, angle: f64) -> Matrix3<f64> {
        let (sin, cos) = angle.sin_cos();
        let spin_derivative = Matrix3::new(
            -sin, cos, 0.0, //
            -cos, -sin, 0.0, //
            0.0, 0.0, 0.0,
        ) * self.rotation_rate;
        spin_derivative * self.initial_rotation_to_target.to_rotation_matrix().into_inner()
    }

    fn angle_extended(&self, time: Time) -> f64 {
        self.rotation_rate * time.difference_in_seconds(&Time::from_seconds(self.initial_time))
    }
}

impl RotationalEphemeris for SimpleRotation {
    fn base_frame(&self) -> &str {
        &self.base_frame
    }

    fn target_frame(&self) -> &str {
        &self.target_frame
    }

    fn rotation_to_target_frame(&self, time: f64) -> UnitQuaternion<f64> {
        self.rotation_at_angle(self.rotation_rate * (time - self.initial_time))
    }

    fn rotation_to_target_frame_extended(&self, time: Time) -> UnitQuaternion<f64> {
        self.rotation_at_angle(self.angle_extended(time))
    }

    fn derivative_of_rotation_to_target_frame(&self, time: f64) -> Option<Matrix3<f64>> {
        Some(self.derivative_at_angle(self.rotation_rate * (time - self.initial_time)))
    }

    fn derivative_of_rotation_to_target_frame_extended(&self, time: Time) -> Option<Matrix3<f64>> {
        Some(self.derivative_at_angle(self.angle_extended(time)))
    }
}

/// Quaternion from a proper rotation matrix
pub(crate) fn quaternion_from_matrix(matrix: &Matrix3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*matrix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_simple_rotation_angular_velocity() {
        let initial = UnitQuaternion::from_euler_angles(0.3, -0.2, 0.7);
        let rate = 7.292115e-5;
        let rotation = SimpleRotation::new("J2000", "IAU_Earth", initial, rate, 100.0);

        let state = rotation.rotation_state(TimeArgument::Seconds(5000.0));
        let expected = initial.inverse() * Vector3::new(0.0, 0.0, rate);

        let omega = state.angular_velocity_in_base.unwrap();
        assert_abs_diff_eq!(omega, expected, epsilon = 1e-15);
        assert!(state.is_kinematically_consistent(1e-15));
    }

    #[test]
    fn test_derivative_matches_finite_difference() {
        let rotation = SimpleRotation::earth("J2000", "IAU_Earth");
        let t = 12_345.0;
        let h = 1e-2;

        let ahead = rotation.rotation_to_target_frame(t + h).to_rotation_matrix().into_inner();
        let behind = rotation.rotation_to_target_frame(t - h).to_rotation_matrix().into_inner();
        let numerical = (ahead - behind) / (2.0 * h);

        let analytical = rotation.derivative_of_rotation_to_target_frame(t).unwrap();
        assert_abs_diff_eq!(analytical, numerical, epsilon = 1e-12);
    }

    #[test]
    fn test_kinematic_relations_round_trip() {
        let rotation = UnitQuaternion::from_euler_angles(1.1, 0.4, -2.0);
        let omega = Vector3::new(1e-3, -2e-3, 5e-4);

        let state = RotationState::from_angular_velocity(rotation, omega);
        let recovered = RotationState::from_derivative(rotation, state.derivative_to_target);

        assert_abs_diff_eq!(recovered.angular_velocity_in_base.unwrap(), omega, epsilon = 1e-15);
    }

    #[test]
    fn test_extended_time_dispatch() {
        let rotation = SimpleRotation::earth("J2000", "IAU_Earth");
        let time = Time::new(100_000, 12.5);

        let plain = rotation.rotation_to_target(TimeArgument::Seconds(time.to_seconds()));
        let extended = rotation.rotation_to_target(TimeArgument::Extended(time));
        assert!(plain.angle_to(&extended) < 1e-9);
    }

    #[test]
    fn test_constant_rotation() {
        let fixed = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let rotation = ConstantRotation::new("J2000", "body", fixed);
        let state = rotation.rotation_state(TimeArgument::Seconds(1.0e6));

        assert_eq!(state.rotation_to_target, fixed);
        assert_eq!(state.angular_velocity_in_base, Some(Vector3::zeros()));
        assert_eq!(rotation.base_frame(), "J2000");
    }
}
