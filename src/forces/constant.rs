//! Fixed inertial acceleration

use super::{DerivativeContribution, ForceModel};
use crate::environment::SystemOfBodies;
use crate::error::ConfigurationError;
use crate::time::TimeArgument;
use nalgebra::Vector3;

/// Acceleration independent of time, state and environment
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantAcceleration {
    body: String,
    acceleration: Vector3<f64>,
}

impl ConstantAcceleration {
    pub fn new(body: &str, acceleration: Vector3<f64>) -> Self {
        Self {
            body: body.to_string(),
            acceleration,
        }
    }
}

impl DerivativeContribution for ConstantAcceleration {
    fn name(&self) -> &'static str {
        "Constant Acceleration"
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn bind(&mut self, bodies: &SystemOfBodies) -> Result<(), ConfigurationError> {
        bodies.id(&self.body).map(|_| ())
    }

    fn update_members(&mut self, _bodies: &SystemOfBodies, _time: TimeArgument) -> Result<(), ConfigurationError> {
        Ok(())
    }
}

impl ForceModel for ConstantAcceleration {
    fn derivative_contribution(&self) -> Vector3<f64> {
        self.acceleration
    }
}
