//! Error taxonomy for setup and propagation
//!
//! Configuration errors are raised while a simulation is being set up and
//! always name the offending body or model. Propagation errors are raised
//! while stepping and terminate the run.

use std::fmt;

/// Environment capability a body may or may not carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Ephemeris,
    GravityField,
    Atmosphere,
    Shape,
    Rotation,
    AerodynamicCoefficients,
    FlightConditions,
    AngleCalculator,
    Inertia,
    Mass,
    Engine,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ephemeris => "ephemeris",
            Self::GravityField => "gravity field",
            Self::Atmosphere => "atmosphere model",
            Self::Shape => "shape model",
            Self::Rotation => "rotation model",
            Self::AerodynamicCoefficients => "aerodynamic coefficients",
            Self::FlightConditions => "flight conditions",
            Self::AngleCalculator => "aerodynamic angle calculator",
            Self::Inertia => "inertia tensor",
            Self::Mass => "mass",
            Self::Engine => "engine",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors detected before the first integration step
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("body {body} has no {capability}")]
    MissingEnvironmentModel { body: String, capability: Capability },

    #[error("circular environment dependency between: {}", models.join(" -> "))]
    CircularEnvironmentDependency { models: Vec<String> },

    #[error("ambiguous orientation closure for body {body}: {reason}")]
    AmbiguousOrientationClosure { body: String, reason: String },

    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("model {model} on body {body} requires {capability}, which is not available")]
    IncompleteForceModel {
        model: String,
        body: String,
        capability: Capability,
    },

    #[error("no body named {0}")]
    UnknownBody(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("cannot {action} while simulator is {from}")]
    InvalidTransition {
        from: crate::simulator::SimulatorStatus,
        action: &'static str,
    },
}

/// Errors raised while stepping
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropagationError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("integrator rejected step at t = {time} s: {message}")]
    StepRejected { time: f64, message: String },

    #[error("non-finite state derivative at t = {time} s (element {index})")]
    NonFiniteDerivative { time: f64, index: usize },

    #[error("state vector has {found} elements, layout expects {expected}")]
    StateDimensionMismatch { expected: usize, found: usize },

    #[error("no trimmed angle of attack for {body} at t = {time} s")]
    TrimNotFound { body: String, time: f64 },
}
