//! Body orientation derived from aerodynamic angles
//!
//! The rotation is built from the current trajectory frame and an angle
//! triple, either from a function owned by this model or from the body's
//! guidance. Only the rotation itself is defined: its time derivative and
//! angular velocity are reported as `None`.

use super::aero_angles::{trajectory_to_body_frame, AngleFunction, AngleTriple, ScalarFunction};
use super::rotation::{quaternion_from_matrix, RotationState};
use crate::time::{Time, TimeArgument};
use nalgebra::{Matrix3, UnitQuaternion};

pub struct AerodynamicAngleRotation {
    base_frame: String,
    target_frame: String,
    angle_function: Option<AngleFunction>,
    current_time: Option<Time>,
    current_angles: AngleTriple,
    rotation_to_target: UnitQuaternion<f64>,
    is_body_in_propagation: bool,
}

impl AerodynamicAngleRotation {
    pub fn new(base_frame: &str, target_frame: &str) -> Self {
        Self {
            base_frame: base_frame.to_string(),
            target_frame: target_frame.to_string(),
            angle_function: None,
            current_time: None,
            current_angles: AngleTriple::zero(),
            rotation_to_target: UnitQuaternion::identity(),
            is_body_in_propagation: false,
        }
    }

    pub fn with_angle_function(mut self, angle_function: AngleFunction) -> Self {
        self.set_angle_function(angle_function);
        self
    }

    pub fn base_frame(&self) -> &str {
        &self.base_frame
    }

    pub fn target_frame(&self) -> &str {
        &self.target_frame
    }

    pub fn set_angle_function(&mut self, angle_function: AngleFunction) {
        self.angle_function = Some(angle_function);
        self.current_time = None;
    }

    /// Impose sideslip and bank, keeping the attack angle of the existing function
    ///
    /// Without an existing function the attack angle is zero.
    pub fn add_sideslip_bank_angle_functions(&mut self, sideslip: ScalarFunction, bank: ScalarFunction) {
        let composed: AngleFunction = match self.angle_function.take() {
            Some(existing) => Box::new(move |t| AngleTriple::new(existing(t).attack, sideslip(t), bank(t))),
            None => Box::new(move |t| AngleTriple::new(0.0, sideslip(t), bank(t))),
        };
        self.set_angle_function(composed);
    }

    pub fn has_angle_function(&self) -> bool {
        self.angle_function.is_some()
    }

    /// Angles imposed by this model's own function
    pub fn angles_from_function(&self, time: f64) -> Option<AngleTriple> {
        self.angle_function.as_ref().map(|function| function(time))
    }

    /// Angles at `time`
    ///
    /// While the body is propagated only the memoized angles are served;
    /// otherwise the angle function is evaluated directly.
    pub fn body_angles(&self, time: TimeArgument) -> Option<AngleTriple> {
        if self.current_time == Some(time.extended()) {
            return Some(self.current_angles);
        }
        if self.is_body_in_propagation {
            return None;
        }
        self.angles_from_function(time.seconds())
    }

    pub fn set_is_body_in_propagation(&mut self, is_in_propagation: bool) {
        self.is_body_in_propagation = is_in_propagation;
    }

    pub fn is_body_in_propagation(&self) -> bool {
        self.is_body_in_propagation
    }

    pub fn current_time(&self) -> Option<Time> {
        self.current_time
    }

    pub fn current_angles(&self) -> AngleTriple {
        self.current_angles
    }

    /// Recompute the rotation at `time`; returns `false` when already current
    ///
    /// `external_angles` is used when this model has no function of its own.
    pub fn update(
        &mut self,
        time: TimeArgument,
        trajectory_to_inertial: &Matrix3<f64>,
        external_angles: Option<AngleTriple>,
    ) -> bool {
        let extended = time.extended();
        if self.current_time == Some(extended) {
            return false;
        }

        let angles = self
            .angles_from_function(time.seconds())
            .or(external_angles)
            .unwrap_or_default();

        let inertial_to_body = trajectory_to_body_frame(&angles) * trajectory_to_inertial.transpose();
        self.rotation_to_target = quaternion_from_matrix(&inertial_to_body);
        self.current_angles = angles;
        self.current_time = Some(extended);
        true
    }

    pub fn reset_current_time(&mut self) {
        self.current_time = None;
    }

    pub fn rotation_to_target(&self) -> UnitQuaternion<f64> {
        self.rotation_to_target
    }

    /// Current rotation with undefined derivative and angular velocity
    pub fn current_rotation_state(&self) -> RotationState {
        RotationState {
            rotation_to_target: self.rotation_to_target,
            derivative_to_target: None,
            angular_velocity_in_base: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::aero_angles::{compute_body_fixed_aero_angles, trajectory_frame};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn trajectory() -> Matrix3<f64> {
        trajectory_frame(&Vector3::new(6.4e6, 0.0, 3.0e5), &Vector3::new(50.0, 6800.0, -900.0)).unwrap()
    }

    #[test]
    fn test_sideslip_bank_composition_keeps_attack() {
        let mut rotation = AerodynamicAngleRotation::new("J2000", "vehicle")
            .with_angle_function(Box::new(|t| AngleTriple::new(0.1 + 0.001 * t, 9.0, 9.0)));
        rotation.add_sideslip_bank_angle_functions(Box::new(|t| -0.002 * t), Box::new(|t| 0.5 * t.sin()));

        for t in [0.0, 13.0, 250.5] {
            assert_eq!(
                rotation.angles_from_function(t),
                Some(AngleTriple::new(0.1 + 0.001 * t, -0.002 * t, 0.5 * t.sin()))
            );
        }
    }

    #[test]
    fn test_sideslip_bank_without_attack_function() {
        let mut rotation = AerodynamicAngleRotation::new("J2000", "vehicle");
        rotation.add_sideslip_bank_angle_functions(Box::new(|_| 0.02), Box::new(|_| -0.4));

        assert_eq!(rotation.angles_from_function(5.0), Some(AngleTriple::new(0.0, 0.02, -0.4)));
    }

    #[test]
    fn test_angles_round_trip_through_rotation() {
        let angles = AngleTriple::new(0.35, -0.08, 0.9);
        let mut rotation = AerodynamicAngleRotation::new("J2000", "vehicle")
            .with_angle_function(Box::new(move |_| angles));

        let frame = trajectory();
        assert!(rotation.update(TimeArgument::Seconds(10.0), &frame, None));

        let inertial_to_body = rotation.rotation_to_target().to_rotation_matrix().into_inner();
        let recovered = compute_body_fixed_aero_angles(&inertial_to_body, &frame);
        assert_relative_eq!(recovered.as_vector(), angles.as_vector(), epsilon = 1e-10);
    }

    #[test]
    fn test_update_memoizes_on_time() {
        let mut rotation = AerodynamicAngleRotation::new("J2000", "vehicle");
        let frame = trajectory();

        assert!(rotation.update(TimeArgument::Seconds(1.0), &frame, Some(AngleTriple::new(0.1, 0.0, 0.0))));
        assert!(!rotation.update(TimeArgument::Seconds(1.0), &frame, Some(AngleTriple::new(0.5, 0.0, 0.0))));
        assert_eq!(rotation.current_angles(), AngleTriple::new(0.1, 0.0, 0.0));

        rotation.reset_current_time();
        assert_eq!(rotation.current_time(), None);
        assert!(rotation.update(TimeArgument::Seconds(1.0), &frame, Some(AngleTriple::new(0.5, 0.0, 0.0))));
        assert_eq!(rotation.current_angles(), AngleTriple::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn test_derivative_is_undefined() {
        let rotation = AerodynamicAngleRotation::new("J2000", "vehicle");
        let state = rotation.current_rotation_state();
        assert!(state.derivative_to_target.is_none());
        assert!(state.angular_velocity_in_base.is_none());
        assert!(state.is_kinematically_consistent(0.0));
    }

    #[test]
    fn test_body_angles_while_in_propagation() {
        let mut rotation = AerodynamicAngleRotation::new("J2000", "vehicle")
            .with_angle_function(Box::new(|t| AngleTriple::new(t, 0.0, 0.0)));

        assert_eq!(rotation.body_angles(TimeArgument::Seconds(2.0)), Some(AngleTriple::new(2.0, 0.0, 0.0)));

        rotation.set_is_body_in_propagation(true);
        assert_eq!(rotation.body_angles(TimeArgument::Seconds(2.0)), None);

        rotation.update(TimeArgument::Seconds(2.0), &trajectory(), None);
        assert_eq!(rotation.body_angles(TimeArgument::Seconds(2.0)), Some(AngleTriple::new(2.0, 0.0, 0.0)));
    }
}
