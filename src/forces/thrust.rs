//! Engines and thrust acceleration

use super::{bound, current_mass, DerivativeContribution, ForceModel, Requirement};
use crate::environment::{BodyId, EnvironmentNode, SystemOfBodies};
use crate::error::{Capability, ConfigurationError};
use crate::state::STANDARD_GRAVITY;
use crate::time::TimeArgument;
use nalgebra::Vector3;
use std::sync::Arc;

/// Constant-thrust engine mounted on a body
#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    pub name: String,
    /// Thrust magnitude (N)
    pub thrust: f64,
    /// Specific impulse (s)
    pub specific_impulse: f64,
    /// Unit thrust direction in the body-fixed frame
    pub body_fixed_direction: Vector3<f64>,
}

impl Engine {
    pub fn new(name: &str, thrust: f64, specific_impulse: f64) -> Self {
        Self {
            name: name.to_string(),
            thrust,
            specific_impulse,
            body_fixed_direction: Vector3::x(),
        }
    }

    pub fn with_direction(mut self, direction: Vector3<f64>) -> Self {
        self.body_fixed_direction = direction.normalize();
        self
    }

    /// Propellant mass flow (kg/s), positive
    pub fn mass_rate(&self) -> f64 {
        if self.specific_impulse <= 0.0 {
            return 0.0;
        }
        self.thrust / (self.specific_impulse * STANDARD_GRAVITY)
    }
}

/// How the thrust of a body's engines is pointed
#[derive(Debug, Clone, PartialEq)]
pub enum ThrustDirection {
    /// Fixed inertial direction, shared by all engines
    Inertial(Vector3<f64>),
    /// Each engine's own body-fixed direction, through the body's rotation
    BodyFixed,
}

/// Acceleration from all engines of a body
pub struct ThrustAcceleration {
    body: String,
    direction: ThrustDirection,
    id: Option<BodyId>,
    engines: Vec<Arc<Engine>>,
    acceleration: Vector3<f64>,
}

impl ThrustAcceleration {
    pub fn new(body: &str, direction: ThrustDirection) -> Self {
        Self {
            body: body.to_string(),
            direction,
            id: None,
            engines: Vec::new(),
            acceleration: Vector3::zeros(),
        }
    }

    pub fn total_thrust(&self) -> f64 {
        self.engines.iter().map(|engine| engine.thrust).sum()
    }
}

impl DerivativeContribution for ThrustAcceleration {
    fn name(&self) -> &'static str {
        "Thrust"
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn bind(&mut self, bodies: &SystemOfBodies) -> Result<(), ConfigurationError> {
        let id = bodies.id(&self.body)?;
        self.engines = bodies.get(id)?.engines().to_vec();
        self.id = Some(id);
        Ok(())
    }

    fn environment_requirements(&self) -> Vec<Requirement> {
        let mut requirements = vec![
            Requirement::new(&self.body, Capability::Mass),
            Requirement::new(&self.body, Capability::Engine),
        ];
        if self.direction == ThrustDirection::BodyFixed {
            requirements.push(Requirement::new(&self.body, Capability::Rotation));
        }
        requirements
    }

    fn environment_dependencies(&self) -> Vec<EnvironmentNode> {
        let Some(id) = self.id else {
            return Vec::new();
        };
        match self.direction {
            ThrustDirection::Inertial(_) => vec![EnvironmentNode::Mass(id)],
            ThrustDirection::BodyFixed => vec![EnvironmentNode::Mass(id), EnvironmentNode::Rotation(id)],
        }
    }

    fn update_members(&mut self, bodies: &SystemOfBodies, _time: TimeArgument) -> Result<(), ConfigurationError> {
        let id = bound(self.id, self.name(), &self.body)?;
        let mass = current_mass(bodies, id, self.name())?;

        let force = match &self.direction {
            ThrustDirection::Inertial(direction) => direction.normalize() * self.total_thrust(),
            ThrustDirection::BodyFixed => {
                let body_to_inertial = bodies.get(id)?.current_rotation_state().matrix_to_base();
                self.engines
                    .iter()
                    .map(|engine| body_to_inertial * engine.body_fixed_direction * engine.thrust)
                    .sum()
            }
        };
        self.acceleration = force / mass;
        Ok(())
    }
}

impl ForceModel for ThrustAcceleration {
    fn derivative_contribution(&self) -> Vector3<f64> {
        self.acceleration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Body, ConstantRotation, RotationModel, RotationState};
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_mass_rate_from_isp() {
        let engine = Engine::new("main", 10_000.0, 300.0);
        assert_relative_eq!(engine.mass_rate(), 10_000.0 / (300.0 * 9.80665), max_relative = 1e-12);
        assert_eq!(Engine::new("cold gas", 1.0, 0.0).mass_rate(), 0.0);
    }

    #[test]
    fn test_inertial_thrust() {
        let mut bodies = SystemOfBodies::new();
        bodies
            .add_body(
                Body::new("vehicle")
                    .with_mass(1000.0)
                    .with_engine(Engine::new("a", 500.0, 300.0))
                    .with_engine(Engine::new("b", 1500.0, 300.0)),
            )
            .unwrap();

        let mut thrust = ThrustAcceleration::new("vehicle", ThrustDirection::Inertial(Vector3::new(0.0, 0.0, 2.0)));
        thrust.bind(&bodies).unwrap();
        thrust.update_members(&bodies, TimeArgument::Seconds(0.0)).unwrap();

        assert_relative_eq!(thrust.derivative_contribution(), Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_body_fixed_thrust_follows_rotation() {
        let mut bodies = SystemOfBodies::new();
        let vehicle = bodies
            .add_body(
                Body::new("vehicle")
                    .with_mass(100.0)
                    .with_engine(Engine::new("main", 100.0, 300.0))
                    .with_rotation(RotationModel::Ephemeris(Box::new(ConstantRotation::new(
                        "J2000",
                        "vehicle",
                        UnitQuaternion::identity(),
                    )))),
            )
            .unwrap();
        // Body x axis along inertial y
        let rotation_to_base = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        bodies.get_mut(vehicle).unwrap().current_rotation =
            RotationState::from_angular_velocity(rotation_to_base.inverse(), Vector3::zeros());

        let mut thrust = ThrustAcceleration::new("vehicle", ThrustDirection::BodyFixed);
        thrust.bind(&bodies).unwrap();
        thrust.update_members(&bodies, TimeArgument::Seconds(0.0)).unwrap();

        assert_relative_eq!(thrust.derivative_contribution(), Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        assert!(thrust.environment_requirements().contains(&Requirement::new("vehicle", Capability::Rotation)));
    }
}
