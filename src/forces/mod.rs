//! Force, mass-rate and torque models
//!
//! This module provides the models whose contributions are summed by the
//! state derivative model.
//!
//! # Architecture
//!
//! Every model implements [`DerivativeContribution`]: it names the body it
//! acts on, resolves body names once at setup, declares the environment
//! capabilities it needs and the environment nodes it reads, and refreshes
//! its cached contribution in `update_members`. The typed traits
//! [`ForceModel`], [`MassRateModel`] and [`TorqueModel`] then expose that
//! contribution.
//!
//! # Available Models
//!
//! - **CentralGravity**: point mass gravity of a central body, optional J2
//! - **ConstantAcceleration**: fixed inertial acceleration
//! - **AerodynamicAcceleration**: aerodynamic force from flight conditions and coefficients
//! - **ThrustAcceleration**: thrust of the body's engines
//! - **CustomMassRate** / **FromThrustMassRate**: mass flow
//! - **ConstantTorque**: fixed body-fixed torque

mod aerodynamic;
mod constant;
mod gravity;
mod mass_rate;
mod thrust;
mod torque;

pub use aerodynamic::AerodynamicAcceleration;
pub use constant::ConstantAcceleration;
pub use gravity::CentralGravity;
pub use mass_rate::{CustomMassRate, FromThrustMassRate};
pub use thrust::{Engine, ThrustAcceleration, ThrustDirection};
pub use torque::ConstantTorque;

use crate::environment::{BodyId, EnvironmentNode, SystemOfBodies};
use crate::error::{Capability, ConfigurationError};
use crate::time::TimeArgument;
use nalgebra::Vector3;

/// Environment requirement of a model: a capability on a named body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub body: String,
    pub capability: Capability,
}

impl Requirement {
    pub fn new(body: &str, capability: Capability) -> Self {
        Self {
            body: body.to_string(),
            capability,
        }
    }
}

/// Common interface of everything contributing to the state derivative
pub trait DerivativeContribution: Send + Sync {
    /// Model name for debugging and logging
    fn name(&self) -> &'static str;

    /// Body whose state derivative receives the contribution
    fn body(&self) -> &str;

    /// Resolve body names; called once at setup
    fn bind(&mut self, bodies: &SystemOfBodies) -> Result<(), ConfigurationError>;

    /// Capabilities that must be present for the model to be evaluated
    fn environment_requirements(&self) -> Vec<Requirement> {
        Vec::new()
    }

    /// Environment nodes read in `update_members`; valid after `bind`
    fn environment_dependencies(&self) -> Vec<EnvironmentNode> {
        Vec::new()
    }

    /// Refresh the cached contribution from the current environment
    fn update_members(&mut self, bodies: &SystemOfBodies, time: TimeArgument) -> Result<(), ConfigurationError>;
}

/// Acceleration of a body, in the inertial frame, m/s²
pub trait ForceModel: DerivativeContribution {
    fn derivative_contribution(&self) -> Vector3<f64>;
}

/// Mass rate of a body, kg/s
pub trait MassRateModel: DerivativeContribution {
    fn derivative_contribution(&self) -> f64;
}

/// Torque on a body, in its body-fixed frame, N·m
pub trait TorqueModel: DerivativeContribution {
    fn derivative_contribution(&self) -> Vector3<f64>;
}

/// Resolved handles of a model, failing when `bind` was skipped
pub(crate) fn bound<I>(ids: Option<I>, model: &'static str, body: &str) -> Result<I, ConfigurationError> {
    ids.ok_or_else(|| ConfigurationError::InvalidSettings(format!("{model} on {body} used before binding")))
}

/// Current mass of a body, which must be known by now
pub(crate) fn current_mass(bodies: &SystemOfBodies, id: BodyId, model: &'static str) -> Result<f64, ConfigurationError> {
    let body = bodies.get(id)?;
    body.current_mass()
        .ok_or_else(|| ConfigurationError::IncompleteForceModel {
            model: model.to_string(),
            body: body.name().to_string(),
            capability: Capability::Mass,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_model_is_rejected() {
        let bodies = SystemOfBodies::new();
        let mut gravity = CentralGravity::point_mass("vehicle", "Earth");
        assert!(gravity.update_members(&bodies, TimeArgument::Seconds(0.0)).is_err());
        assert_eq!(
            gravity.bind(&bodies),
            Err(ConfigurationError::UnknownBody("vehicle".to_string()))
        );
    }
}
