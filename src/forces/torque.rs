//! Torque models

use super::{DerivativeContribution, Requirement, TorqueModel};
use crate::environment::SystemOfBodies;
use crate::error::{Capability, ConfigurationError};
use crate::time::TimeArgument;
use nalgebra::Vector3;

/// Torque fixed in the body frame
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantTorque {
    body: String,
    torque: Vector3<f64>,
}

impl ConstantTorque {
    pub fn new(body: &str, torque: Vector3<f64>) -> Self {
        Self {
            body: body.to_string(),
            torque,
        }
    }
}

impl DerivativeContribution for ConstantTorque {
    fn name(&self) -> &'static str {
        "Constant Torque"
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn bind(&mut self, bodies: &SystemOfBodies) -> Result<(), ConfigurationError> {
        bodies.id(&self.body).map(|_| ())
    }

    fn environment_requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new(&self.body, Capability::Inertia)]
    }

    fn update_members(&mut self, _bodies: &SystemOfBodies, _time: TimeArgument) -> Result<(), ConfigurationError> {
        Ok(())
    }
}

impl TorqueModel for ConstantTorque {
    fn derivative_contribution(&self) -> Vector3<f64> {
        self.torque
    }
}
