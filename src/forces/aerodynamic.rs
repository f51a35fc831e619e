//! Aerodynamic force model
//!
//! Computes acceleration from the body's current flight conditions and
//! aerodynamic coefficients:
//!
//! a = C_IA × (-q S [C_D, C_S, C_L]) / m
//!
//! where:
//! - q is the dynamic pressure relative to the co-rotating atmosphere
//! - S is the reference area of the coefficient interface
//! - C_IA rotates the aerodynamic frame into the inertial frame
//! - m is the body's current mass

use super::{bound, current_mass, DerivativeContribution, ForceModel, Requirement};
use crate::environment::{BodyId, EnvironmentNode, SystemOfBodies};
use crate::error::{Capability, ConfigurationError};
use crate::time::TimeArgument;
use nalgebra::Vector3;

/// Aerodynamic acceleration of a body in an atmosphere
///
/// Flight conditions for the body must exist by the time the model is
/// evaluated; the simulator creates them against the propagation's central
/// body when they are missing.
pub struct AerodynamicAcceleration {
    body: String,
    id: Option<BodyId>,
    acceleration: Vector3<f64>,
}

impl AerodynamicAcceleration {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            id: None,
            acceleration: Vector3::zeros(),
        }
    }

    fn missing(&self, capability: Capability) -> ConfigurationError {
        ConfigurationError::IncompleteForceModel {
            model: self.name().to_string(),
            body: self.body.clone(),
            capability,
        }
    }
}

impl DerivativeContribution for AerodynamicAcceleration {
    fn name(&self) -> &'static str {
        "Aerodynamic Acceleration"
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn bind(&mut self, bodies: &SystemOfBodies) -> Result<(), ConfigurationError> {
        self.id = Some(bodies.id(&self.body)?);
        Ok(())
    }

    fn environment_requirements(&self) -> Vec<Requirement> {
        vec![
            Requirement::new(&self.body, Capability::FlightConditions),
            Requirement::new(&self.body, Capability::AerodynamicCoefficients),
            Requirement::new(&self.body, Capability::Mass),
        ]
    }

    fn environment_dependencies(&self) -> Vec<EnvironmentNode> {
        self.id
            .map(|id| {
                vec![
                    EnvironmentNode::AerodynamicCoefficients(id),
                    EnvironmentNode::FlightConditions(id),
                    EnvironmentNode::Mass(id),
                ]
            })
            .unwrap_or_default()
    }

    fn update_members(&mut self, bodies: &SystemOfBodies, _time: TimeArgument) -> Result<(), ConfigurationError> {
        let id = bound(self.id, self.name(), &self.body)?;
        let body = bodies.get(id)?;
        let conditions = body
            .flight_conditions()
            .ok_or_else(|| self.missing(Capability::FlightConditions))?;
        let coefficients = body
            .aerodynamic_coefficients()
            .ok_or_else(|| self.missing(Capability::AerodynamicCoefficients))?;
        let mass = current_mass(bodies, id, self.name())?;

        // Outside the atmosphere
        if conditions.density() <= 0.0 {
            self.acceleration = Vector3::zeros();
            return Ok(());
        }

        let force_in_aerodynamic_frame =
            -conditions.dynamic_pressure() * coefficients.reference_area() * coefficients.current_force_coefficients();
        self.acceleration = conditions.angle_calculator().aerodynamic_to_inertial() * force_in_aerodynamic_frame / mass;
        Ok(())
    }
}

impl ForceModel for AerodynamicAcceleration {
    fn derivative_contribution(&self) -> Vector3<f64> {
        self.acceleration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::Exponential;
    use crate::environment::{
        AerodynamicAngleRotation, AngleTriple, Body, ConstantCoefficients, ConstantEphemeris, EnvironmentUpdater,
        RotationModel, SimpleRotation, SphericalShape,
    };
    use crate::state::{StateBlockKind, StateLayout, EARTH_RADIUS_M};
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    fn entry(coefficients: Vector3<f64>, max_altitude: f64) -> (SystemOfBodies, EnvironmentUpdater<f64, f64>) {
        let mut bodies = SystemOfBodies::new();
        let earth = bodies
            .add_body(
                Body::new("Earth")
                    .with_ephemeris(Box::new(ConstantEphemeris::origin()))
                    .with_atmosphere(Box::new(Exponential::new(1.225, 8500.0, max_altitude)))
                    .with_shape(Box::new(SphericalShape::earth()))
                    .with_rotation(RotationModel::Ephemeris(Box::new(SimpleRotation::earth("J2000", "IAU_Earth")))),
            )
            .unwrap();
        let vehicle = bodies
            .add_body(
                Body::new("vehicle")
                    .with_mass(2000.0)
                    .with_aerodynamic_coefficients(Box::new(ConstantCoefficients::new(4.0, coefficients)))
                    .with_rotation(RotationModel::AngleDriven(
                        AerodynamicAngleRotation::new("J2000", "vehicle")
                            .with_angle_function(Box::new(|_| AngleTriple::new(0.2, 0.0, 0.0))),
                    )),
            )
            .unwrap();
        bodies.create_flight_conditions("vehicle", "Earth").unwrap();

        let mut layout = StateLayout::new();
        layout.push(StateBlockKind::Translational, vehicle, Some(earth));
        let updater = EnvironmentUpdater::new(
            &bodies,
            layout,
            &[
                EnvironmentNode::AerodynamicCoefficients(vehicle),
                EnvironmentNode::FlightConditions(vehicle),
                EnvironmentNode::Mass(vehicle),
            ],
            &[],
            Vec::new(),
        )
        .unwrap();
        (bodies, updater)
    }

    fn evaluate(bodies: &mut SystemOfBodies, updater: &mut EnvironmentUpdater<f64, f64>) -> Vector3<f64> {
        let state = DVector::from_vec(vec![EARTH_RADIUS_M + 70_000.0, 0.0, 0.0, 0.0, 7000.0, 0.0]);
        updater.update(bodies, 0.0, &state).unwrap();

        let mut aerodynamic = AerodynamicAcceleration::new("vehicle");
        aerodynamic.bind(bodies).unwrap();
        aerodynamic.update_members(bodies, TimeArgument::Seconds(0.0)).unwrap();
        aerodynamic.derivative_contribution()
    }

    #[test]
    fn test_drag_opposes_airspeed() {
        let (mut bodies, mut updater) = entry(Vector3::new(1.2, 0.0, 0.0), 1_000_000.0);
        let accel = evaluate(&mut bodies, &mut updater);

        let conditions = bodies.body("vehicle").unwrap().flight_conditions().unwrap();
        let expected = conditions.dynamic_pressure() * 4.0 * 1.2 / 2000.0;
        assert_relative_eq!(accel.norm(), expected, max_relative = 1e-10);
        // Drag along -x of the aerodynamic frame, i.e. against the trajectory direction
        assert!(accel.y < 0.0);
    }

    #[test]
    fn test_lift_is_perpendicular_to_drag() {
        let (mut bodies, mut updater) = entry(Vector3::new(0.0, 0.0, 0.5), 1_000_000.0);
        let accel = evaluate(&mut bodies, &mut updater);

        let conditions = bodies.body("vehicle").unwrap().flight_conditions().unwrap();
        let trajectory_x = conditions.angle_calculator().trajectory_to_inertial().column(0).into_owned();
        assert!(accel.norm() > 0.0);
        assert_relative_eq!(accel.dot(&trajectory_x), 0.0, epsilon = 1e-9 * accel.norm());
    }

    #[test]
    fn test_zero_above_atmosphere() {
        let (mut bodies, mut updater) = entry(Vector3::new(1.2, 0.0, 0.3), 50_000.0);
        assert_eq!(evaluate(&mut bodies, &mut updater), Vector3::zeros());
    }
}
