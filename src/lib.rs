//! High-fidelity propagation engine
//!
//! Numerically propagates the translational, mass and rotational-rate state
//! of bodies while keeping a web of mutually dependent environment models
//! (atmosphere, rotation, aerodynamic angles, coefficients) consistent with
//! the current time and state.
//!
//! # Architecture
//!
//! - **Integrator**: pluggable stepping scheme (RK4 fixed/adaptive, Euler)
//! - **EnvironmentUpdater**: refreshes environment models once per (time, state),
//!   in an order derived from the closure-binding graph
//! - **StateDerivativeModel**: environment update followed by force, mass-rate
//!   and torque contributions
//! - **BaseSimulator**: drives the integrator, applies termination conditions and
//!   post-processes the solution
//!
//! # Example
//!
//! ```ignore
//! use hifi_propagation::prelude::*;
//!
//! let mut bodies = SystemOfBodies::new();
//! bodies.add_body(Body::new("vehicle").with_mass(1.0))?;
//!
//! let settings = PropagatorSettings::new(0.0, initial_state, TerminationCondition::time_limit(10.0))
//!     .propagate_translational("vehicle", "Earth")
//!     .with_force(Box::new(ConstantAcceleration::new("vehicle", Vector3::x())));
//!
//! let mut simulator = BaseSimulator::new(bodies, SimulatorConfig::default());
//! simulator.initialize(IntegratorSettings::RungeKutta4 { step_size: 1.0 }, settings)?;
//! simulator.run()?;
//! ```

pub mod atmosphere;
pub mod dependent;
pub mod environment;
pub mod error;
pub mod forces;
pub mod history;
pub mod integrator;
pub mod settings;
pub mod simulator;
pub mod state;
pub mod state_derivative;
pub mod termination;
pub mod time;

pub use error::{Capability, ConfigurationError, PropagationError};

/// Commonly used types
pub mod prelude {
    pub use crate::atmosphere::{AtmosphereDensity, AtmosphereModel, Exponential};
    pub use crate::dependent::DependentVariable;
    pub use crate::environment::{
        AerodynamicAngleRotation, AngleTriple, Body, BodyId, ClosureBinding,
        ConstantCoefficients, ConstantEphemeris, ConstantRotation, EnvironmentNode,
        EnvironmentUpdater, RotationModel, RotationState, SimpleRotation, SphericalShape,
        SystemOfBodies, TrimOrientation,
    };
    pub use crate::error::{Capability, ConfigurationError, PropagationError};
    pub use crate::forces::{
        AerodynamicAcceleration, CentralGravity, ConstantAcceleration, ConstantTorque,
        CustomMassRate, Engine, ForceModel, FromThrustMassRate, MassRateModel,
        ThrustAcceleration, ThrustDirection, TorqueModel,
    };
    pub use crate::history::SolutionHistory;
    pub use crate::integrator::{Euler, Integrator, RungeKutta4};
    pub use crate::settings::{IntegratorSettings, PropagatorSettings, SimulatorConfig};
    pub use crate::simulator::{BaseSimulator, BodyStateHistory, PropagationOutcome, SimulatorStatus};
    pub use crate::state::{GlobalState, StateBlockKind, StateLayout, StateScalar};
    pub use crate::state_derivative::{DerivativeModels, StateDerivativeModel};
    pub use crate::termination::{TerminationCondition, TerminationDecision};
    pub use crate::time::{Time, TimeArgument, TimeValue};
    pub use nalgebra::{DVector, Matrix3, UnitQuaternion, Vector3, Vector6};
}
