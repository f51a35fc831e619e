//! Configuration for propagation runs
//!
//! Everything a run needs is collected here and handed to
//! [`BaseSimulator::initialize`](crate::simulator::BaseSimulator::initialize);
//! there is no global model registry.

use crate::dependent::DependentVariable;
use crate::environment::{ClosureBinding, SharedEnvironmentModel};
use crate::error::ConfigurationError;
use crate::forces::{ForceModel, MassRateModel, TorqueModel};
use crate::integrator::{Euler, Integrator, RungeKutta4};
use crate::state::{StateBlockKind, StateScalar};
use crate::state_derivative::DerivativeModels;
use crate::termination::TerminationCondition;
use crate::time::TimeValue;
use nalgebra::DVector;

/// Orchestrator behaviour
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatorConfig {
    /// Release the raw solution once it has been processed
    pub clear_numerical_solutions: bool,

    /// Push processed histories back into the bodies' ephemerides
    pub set_integrated_result: bool,

    /// Maximum number of steps before giving up
    pub max_steps: usize,

    /// Progress log interval in simulated seconds (None = silent)
    pub print_interval: Option<f64>,

    /// Whether to evaluate and store dependent variables
    pub save_dependent_variables: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            clear_numerical_solutions: false,
            set_integrated_result: false,
            max_steps: 1_000_000, // ~1 million steps max
            print_interval: None,
            save_dependent_variables: true,
        }
    }
}

impl SimulatorConfig {
    /// Quick runs: fewer steps, no dependent variables
    pub fn fast() -> Self {
        Self {
            max_steps: 100_000,
            save_dependent_variables: false,
            ..Default::default()
        }
    }

    /// Feed the result back into the bodies and drop the raw solution
    pub fn feed_back() -> Self {
        Self {
            clear_numerical_solutions: true,
            set_integrated_result: true,
            ..Default::default()
        }
    }

    pub fn with_clear_numerical_solutions(mut self, clear: bool) -> Self {
        self.clear_numerical_solutions = clear;
        self
    }

    pub fn with_integrated_result(mut self, enabled: bool) -> Self {
        self.set_integrated_result = enabled;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// With progress logging every `interval` simulated seconds
    pub fn with_print_interval(mut self, interval: f64) -> Self {
        self.print_interval = Some(interval);
        self
    }

    pub fn with_dependent_variables(mut self, save: bool) -> Self {
        self.save_dependent_variables = save;
        self
    }
}

/// Integrator selection
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IntegratorSettings {
    /// Classic RK4, fixed step
    RungeKutta4 { step_size: f64 },
    /// RK4 with step doubling error control
    AdaptiveRungeKutta4 {
        initial_step: f64,
        tolerance: f64,
        min_step: f64,
        max_step: f64,
    },
    /// Forward Euler, fixed step
    Euler { step_size: f64 },
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self::AdaptiveRungeKutta4 {
            initial_step: 60.0,
            tolerance: 1e-6,
            min_step: 0.1,
            max_step: 300.0,
        }
    }
}

impl IntegratorSettings {
    /// Display name for the integrator
    pub fn name(&self) -> &'static str {
        match self {
            Self::RungeKutta4 { .. } => "RK4 (Fixed Step)",
            Self::AdaptiveRungeKutta4 { .. } => "RK4 (Adaptive)",
            Self::Euler { .. } => "Euler",
        }
    }

    /// Short description of when to use this integrator
    pub fn description(&self) -> &'static str {
        match self {
            Self::RungeKutta4 { .. } => "Fourth order with a constant step. Predictable cost, output on a regular grid.",
            Self::AdaptiveRungeKutta4 { .. } => "Fourth order with step doubling. Step follows the local error.",
            Self::Euler { .. } => "First order. Reference and testing only.",
        }
    }

    /// All available integrators, with default parameters
    pub fn all() -> &'static [IntegratorSettings] {
        &[
            IntegratorSettings::RungeKutta4 { step_size: 10.0 },
            IntegratorSettings::AdaptiveRungeKutta4 {
                initial_step: 60.0,
                tolerance: 1e-6,
                min_step: 0.1,
                max_step: 300.0,
            },
            IntegratorSettings::Euler { step_size: 1.0 },
        ]
    }

    pub fn is_adaptive(&self) -> bool {
        matches!(self, Self::AdaptiveRungeKutta4 { .. })
    }

    /// Create the integrator, rejecting unusable parameters
    pub fn create<S: StateScalar, T: TimeValue>(&self) -> Result<Box<dyn Integrator<S, T>>, ConfigurationError> {
        let invalid = |what: &str| Err(ConfigurationError::InvalidSettings(format!("{}: {what}", self.name())));
        match *self {
            Self::RungeKutta4 { step_size } | Self::Euler { step_size }
                if !(step_size.is_finite() && step_size != 0.0) =>
            {
                invalid("step size must be finite and non-zero")
            }
            Self::RungeKutta4 { step_size } => Ok(Box::new(RungeKutta4::fixed(step_size))),
            Self::Euler { step_size } => Ok(Box::new(Euler::new(step_size))),
            Self::AdaptiveRungeKutta4 {
                initial_step,
                tolerance,
                min_step,
                max_step,
            } => {
                if !(tolerance > 0.0) {
                    return invalid("tolerance must be positive");
                }
                if !(min_step > 0.0 && min_step <= max_step && initial_step > 0.0) {
                    return invalid("steps must satisfy 0 < min_step <= max_step and initial_step > 0");
                }
                Ok(Box::new(
                    RungeKutta4::adaptive(initial_step, tolerance).with_limits(min_step, max_step),
                ))
            }
        }
    }
}

/// One propagated block, by body name
#[derive(Debug, Clone, PartialEq)]
pub struct PropagatedBlock {
    pub kind: StateBlockKind,
    pub body: String,
    pub central_body: Option<String>,
}

/// Everything that defines one propagation run
///
/// The initial state is laid out in the order the blocks are added.
pub struct PropagatorSettings<S: StateScalar, T: TimeValue> {
    pub start_time: T,
    pub initial_state: DVector<S>,
    pub termination: TerminationCondition<S, T>,
    pub blocks: Vec<PropagatedBlock>,
    pub models: DerivativeModels,
    pub dependent_variables: Vec<DependentVariable>,
    pub environment_models: Vec<SharedEnvironmentModel>,
    pub bindings: Vec<ClosureBinding>,
}

impl<S: StateScalar, T: TimeValue> PropagatorSettings<S, T> {
    pub fn new(start_time: T, initial_state: DVector<S>, termination: TerminationCondition<S, T>) -> Self {
        Self {
            start_time,
            initial_state,
            termination,
            blocks: Vec::new(),
            models: DerivativeModels::default(),
            dependent_variables: Vec::new(),
            environment_models: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Propagate position and velocity of `body` relative to `central_body`
    pub fn propagate_translational(mut self, body: &str, central_body: &str) -> Self {
        self.blocks.push(PropagatedBlock {
            kind: StateBlockKind::Translational,
            body: body.to_string(),
            central_body: Some(central_body.to_string()),
        });
        self
    }

    pub fn propagate_mass(mut self, body: &str) -> Self {
        self.blocks.push(PropagatedBlock {
            kind: StateBlockKind::Mass,
            body: body.to_string(),
            central_body: None,
        });
        self
    }

    /// Propagate the body-fixed angular velocity of `body`
    pub fn propagate_angular_velocity(mut self, body: &str) -> Self {
        self.blocks.push(PropagatedBlock {
            kind: StateBlockKind::AngularVelocity,
            body: body.to_string(),
            central_body: None,
        });
        self
    }

    pub fn with_force(mut self, force: Box<dyn ForceModel>) -> Self {
        self.models.forces.push(force);
        self
    }

    pub fn with_mass_rate(mut self, rate: Box<dyn MassRateModel>) -> Self {
        self.models.mass_rates.push(rate);
        self
    }

    pub fn with_torque(mut self, torque: Box<dyn TorqueModel>) -> Self {
        self.models.torques.push(torque);
        self
    }

    pub fn with_dependent_variable(mut self, variable: DependentVariable) -> Self {
        self.dependent_variables.push(variable);
        self
    }

    /// Register a custom environment model, refreshed every step
    pub fn with_environment_model(mut self, model: SharedEnvironmentModel) -> Self {
        self.environment_models.push(model);
        self
    }

    /// Require `binding.dependent` to be refreshed after `binding.dependency`
    pub fn with_binding(mut self, binding: ClosureBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Central body of the translational block of `body`
    pub fn central_body_of(&self, body: &str) -> Option<&str> {
        self.blocks
            .iter()
            .find(|block| block.kind == StateBlockKind::Translational && block.body == body)
            .and_then(|block| block.central_body.as_deref())
    }

    /// Expected length of the initial state
    pub fn state_size(&self) -> usize {
        self.blocks.iter().map(|block| block.kind.size()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forces::ConstantAcceleration;
    use nalgebra::Vector3;

    #[test]
    fn test_integrator_factory() {
        for settings in IntegratorSettings::all() {
            let integrator = settings.create::<f64, f64>().unwrap();
            assert!(integrator.order() >= 1);
        }
        assert!(IntegratorSettings::Euler { step_size: 0.0 }.create::<f64, f64>().is_err());
        assert!(IntegratorSettings::AdaptiveRungeKutta4 {
            initial_step: 1.0,
            tolerance: 1e-6,
            min_step: 10.0,
            max_step: 1.0,
        }
        .create::<f64, f64>()
        .is_err());

        let backward = IntegratorSettings::RungeKutta4 { step_size: -5.0 }.create::<f64, f64>().unwrap();
        assert_eq!(backward.current_step_size(), -5.0);
    }

    #[test]
    fn test_config_builders() {
        let config = SimulatorConfig::fast().with_print_interval(60.0).with_integrated_result(true);
        assert_eq!(config.max_steps, 100_000);
        assert_eq!(config.print_interval, Some(60.0));
        assert!(config.set_integrated_result);
        assert!(!config.clear_numerical_solutions);
        assert!(SimulatorConfig::feed_back().clear_numerical_solutions);
    }

    #[test]
    fn test_propagator_settings_layout() {
        let settings = PropagatorSettings::<f64, f64>::new(
            0.0,
            DVector::zeros(7),
            TerminationCondition::time_limit(10.0),
        )
        .propagate_translational("vehicle", "Earth")
        .propagate_mass("vehicle")
        .with_force(Box::new(ConstantAcceleration::new("vehicle", Vector3::x())));

        assert_eq!(settings.state_size(), 7);
        assert_eq!(settings.central_body_of("vehicle"), Some("Earth"));
        assert_eq!(settings.central_body_of("Earth"), None);
        assert_eq!(settings.models.forces.len(), 1);
    }
}
