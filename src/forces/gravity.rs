//! Central body gravity
//!
//! Provides two fidelity levels:
//! - Point mass (μ/r²)
//! - Point mass + J2 oblateness, evaluated in the central body's fixed frame

use super::{bound, DerivativeContribution, ForceModel, Requirement};
use crate::environment::{BodyId, EnvironmentNode, SystemOfBodies};
use crate::error::{Capability, ConfigurationError};
use crate::time::TimeArgument;
use nalgebra::Vector3;

/// Earth's J2 coefficient (WGS84)
pub const J2_EARTH: f64 = 1.08263e-3;

/// Gravity of a central body acting on another body
pub struct CentralGravity {
    body: String,
    central_body: String,
    /// `(J2, reference radius)`
    oblateness: Option<(f64, f64)>,
    ids: Option<(BodyId, BodyId)>,
    acceleration: Vector3<f64>,
}

impl CentralGravity {
    /// Create a point mass gravity model
    pub fn point_mass(body: &str, central_body: &str) -> Self {
        Self {
            body: body.to_string(),
            central_body: central_body.to_string(),
            oblateness: None,
            ids: None,
            acceleration: Vector3::zeros(),
        }
    }

    /// Add the J2 oblateness perturbation
    ///
    /// Needs the central body's rotation to locate its equator.
    pub fn with_j2(mut self, j2: f64, reference_radius: f64) -> Self {
        self.oblateness = Some((j2, reference_radius));
        self
    }

    /// Point mass acceleration: a = -μ/r³ × r
    fn point_mass_accel(mu: f64, position: &Vector3<f64>) -> Vector3<f64> {
        let r = position.norm();
        if r < 1.0 {
            // Avoid singularity at origin
            return Vector3::zeros();
        }
        let r3 = r * r * r;
        -mu / r3 * position
    }

    /// J2 perturbation acceleration, in the frame of `position`
    ///
    /// Uses the standard J2 perturbation formula in Cartesian coordinates,
    /// with z along the central body's rotation axis.
    fn j2_accel(mu: f64, j2: f64, reference_radius: f64, position: &Vector3<f64>) -> Vector3<f64> {
        let r = position.norm();
        if r < 1.0 {
            return Vector3::zeros();
        }

        let r2 = r * r;
        let r5 = r2 * r2 * r;
        let factor = 1.5 * j2 * mu * reference_radius * reference_radius / r5;
        let z2_r2 = position.z * position.z / r2;

        Vector3::new(
            factor * position.x * (5.0 * z2_r2 - 1.0),
            factor * position.y * (5.0 * z2_r2 - 1.0),
            factor * position.z * (5.0 * z2_r2 - 3.0),
        )
    }
}

impl DerivativeContribution for CentralGravity {
    fn name(&self) -> &'static str {
        match self.oblateness {
            None => "Central Gravity (Point Mass)",
            Some(_) => "Central Gravity (J2)",
        }
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn bind(&mut self, bodies: &SystemOfBodies) -> Result<(), ConfigurationError> {
        self.ids = Some((bodies.id(&self.body)?, bodies.id(&self.central_body)?));
        Ok(())
    }

    fn environment_requirements(&self) -> Vec<Requirement> {
        let mut requirements = vec![Requirement::new(&self.central_body, Capability::GravityField)];
        if self.oblateness.is_some() {
            requirements.push(Requirement::new(&self.central_body, Capability::Rotation));
        }
        requirements
    }

    fn environment_dependencies(&self) -> Vec<EnvironmentNode> {
        let Some((body, central)) = self.ids else {
            return Vec::new();
        };
        let mut nodes = vec![
            EnvironmentNode::TranslationalState(body),
            EnvironmentNode::TranslationalState(central),
        ];
        if self.oblateness.is_some() {
            nodes.push(EnvironmentNode::Rotation(central));
        }
        nodes
    }

    fn update_members(&mut self, bodies: &SystemOfBodies, _time: TimeArgument) -> Result<(), ConfigurationError> {
        let (body_id, central_id) = bound(self.ids, self.name(), &self.body)?;
        let central = bodies.get(central_id)?;
        let mu = central
            .gravitational_parameter()
            .ok_or_else(|| ConfigurationError::IncompleteForceModel {
                model: self.name().to_string(),
                body: central.name().to_string(),
                capability: Capability::GravityField,
            })?;

        let position = bodies.get(body_id)?.current_position() - central.current_position();
        let mut acceleration = Self::point_mass_accel(mu, &position);

        if let Some((j2, reference_radius)) = self.oblateness {
            let rotation = central.current_rotation_state();
            let fixed_position = rotation.matrix_to_target() * position;
            acceleration += rotation.matrix_to_base() * Self::j2_accel(mu, j2, reference_radius, &fixed_position);
        }

        self.acceleration = acceleration;
        Ok(())
    }
}

impl ForceModel for CentralGravity {
    fn derivative_contribution(&self) -> Vector3<f64> {
        self.acceleration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Body, ConstantEphemeris, ConstantRotation, RotationModel};
    use crate::state::{EARTH_RADIUS_M, MU_EARTH};
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector6};

    fn bodies_with_vehicle_at(position: Vector3<f64>) -> SystemOfBodies {
        let mut bodies = SystemOfBodies::new();
        bodies
            .add_body(
                Body::new("Earth")
                    .with_ephemeris(Box::new(ConstantEphemeris::origin()))
                    .with_gravitational_parameter(MU_EARTH)
                    .with_rotation(RotationModel::Ephemeris(Box::new(ConstantRotation::new(
                        "J2000",
                        "IAU_Earth",
                        UnitQuaternion::identity(),
                    )))),
            )
            .unwrap();
        let vehicle = bodies.add_body(Body::new("vehicle")).unwrap();
        bodies.get_mut(vehicle).unwrap().set_current_state(Vector6::new(
            position.x, position.y, position.z, 0.0, 7660.0, 0.0,
        ));
        bodies
    }

    #[test]
    fn test_point_mass() {
        let r = EARTH_RADIUS_M + 400_000.0;
        let bodies = bodies_with_vehicle_at(Vector3::new(r, 0.0, 0.0));
        let mut gravity = CentralGravity::point_mass("vehicle", "Earth");
        gravity.bind(&bodies).unwrap();
        gravity.update_members(&bodies, TimeArgument::Seconds(0.0)).unwrap();

        let accel = gravity.derivative_contribution();

        // Should point toward center
        assert!(accel.x < 0.0);

        // Expected: μ/r² ≈ 8.7 m/s²
        assert_relative_eq!(accel.norm(), MU_EARTH / (r * r), max_relative = 1e-10);
    }

    #[test]
    fn test_j2_nonzero() {
        let r = EARTH_RADIUS_M + 400_000.0;
        let position = Vector3::new(r * 0.707, 0.0, r * 0.707);
        let bodies = bodies_with_vehicle_at(position);

        let mut point_mass = CentralGravity::point_mass("vehicle", "Earth");
        let mut oblate = CentralGravity::point_mass("vehicle", "Earth").with_j2(J2_EARTH, EARTH_RADIUS_M);
        for gravity in [&mut point_mass, &mut oblate] {
            gravity.bind(&bodies).unwrap();
            gravity.update_members(&bodies, TimeArgument::Seconds(0.0)).unwrap();
        }

        let perturbation = oblate.derivative_contribution() - point_mass.derivative_contribution();
        assert!(perturbation.norm() > 0.0);
        // Still pointing inward overall
        assert!(oblate.derivative_contribution().dot(&position) < 0.0);
        assert!(oblate
            .environment_dependencies()
            .contains(&EnvironmentNode::Rotation(BodyId::from_index(0))));
    }

    #[test]
    fn test_requires_gravity_field() {
        let gravity = CentralGravity::point_mass("vehicle", "Moon");
        assert_eq!(
            gravity.environment_requirements(),
            vec![Requirement::new("Moon", Capability::GravityField)]
        );
    }
}
