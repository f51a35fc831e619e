//! Propagation orchestrator
//!
//! [`BaseSimulator`] owns the bodies, drives the integrator over the state
//! derivative model, applies termination conditions and post-processes the
//! result.
//!
//! # State machine
//!
//! `Unconfigured → Initialized → Running → {Completed, Failed}`
//!
//! A finished run cannot be resumed; `initialize` must be called again.
//! Only one simulator may drive a given body set at a time, which ownership
//! of the [`SystemOfBodies`] enforces.

use crate::dependent::{evaluate_all, DependentVariable};
use crate::environment::{BodyId, SystemOfBodies};
use crate::error::{Capability, ConfigurationError, PropagationError};
use crate::history::SolutionHistory;
use crate::integrator::Integrator;
use crate::settings::{IntegratorSettings, PropagatorSettings, SimulatorConfig};
use crate::state::{StateBlockKind, StateLayout, StateScalar};
use crate::state_derivative::StateDerivativeModel;
use crate::termination::TerminationCondition;
use crate::time::TimeValue;
use log::{debug, error, info, trace, warn};
use nalgebra::{DVector, Vector3, Vector6};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorStatus {
    Unconfigured,
    Initialized,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for SimulatorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationOutcome {
    /// A termination condition fired
    CompletedTerminated,
    /// The step limit was reached
    CompletedExhausted,
    /// A step failed; the history ends at the last valid state
    Failed,
}

/// Processed history of one propagated body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BodyStateHistory {
    /// Inertial position and velocity
    pub translational: Vec<(f64, Vector6<f64>)>,
    pub mass: Vec<(f64, f64)>,
    /// Body-fixed angular velocity
    pub angular_velocity: Vec<(f64, Vector3<f64>)>,
}

/// Everything set up by `initialize` for one run
struct ConfiguredRun<S: StateScalar, T: TimeValue> {
    integrator: Box<dyn Integrator<S, T>>,
    model: StateDerivativeModel<S, T>,
    termination: TerminationCondition<S, T>,
    dependent_variables: Vec<DependentVariable>,
    start_time: T,
    initial_state: DVector<S>,
}

pub struct BaseSimulator<S: StateScalar, T: TimeValue> {
    bodies: SystemOfBodies,
    config: SimulatorConfig,
    status: SimulatorStatus,
    run: Option<ConfiguredRun<S, T>>,
    solution: SolutionHistory<S, T>,
    body_histories: BTreeMap<String, BodyStateHistory>,
    outcome: Option<PropagationOutcome>,
    last_error: Option<PropagationError>,
}

impl<S: StateScalar, T: TimeValue> BaseSimulator<S, T> {
    pub fn new(bodies: SystemOfBodies, config: SimulatorConfig) -> Self {
        Self {
            bodies,
            config,
            status: SimulatorStatus::Unconfigured,
            run: None,
            solution: SolutionHistory::new(),
            body_histories: BTreeMap::new(),
            outcome: None,
            last_error: None,
        }
    }

    pub fn status(&self) -> SimulatorStatus {
        self.status
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    fn transition_error(&self, action: &'static str) -> ConfigurationError {
        ConfigurationError::InvalidTransition {
            from: self.status,
            action,
        }
    }

    /// Validate the settings against the bodies and prepare a run
    ///
    /// On error the simulator and the bodies are left as they were.
    pub fn initialize(
        &mut self,
        integrator_settings: IntegratorSettings,
        settings: PropagatorSettings<S, T>,
    ) -> Result<(), ConfigurationError> {
        if self.status == SimulatorStatus::Running {
            return Err(self.transition_error("initialize"));
        }

        let mut created = Vec::new();
        match self.configure(integrator_settings, settings, &mut created) {
            Ok(run) => {
                info!(
                    "Initialized propagation with {} ({} state elements, {} environment nodes)",
                    run.integrator.name(),
                    run.initial_state.len(),
                    run.model.updater().order().len()
                );
                self.run = Some(run);
                self.solution.clear();
                self.body_histories.clear();
                self.outcome = None;
                self.last_error = None;
                self.status = SimulatorStatus::Initialized;
                Ok(())
            }
            Err(e) => {
                for id in created {
                    if let Ok(body) = self.bodies.get_mut(id) {
                        body.remove_flight_conditions();
                    }
                }
                Err(e)
            }
        }
    }

    fn configure(
        &mut self,
        integrator_settings: IntegratorSettings,
        settings: PropagatorSettings<S, T>,
        created: &mut Vec<BodyId>,
    ) -> Result<ConfiguredRun<S, T>, ConfigurationError> {
        let mut layout = StateLayout::new();
        for block in &settings.blocks {
            let body = self.bodies.id(&block.body)?;
            if layout.contains(block.kind, body) {
                return Err(ConfigurationError::InvalidSettings(format!(
                    "{} state of {} is propagated twice",
                    block.kind.name(),
                    block.body
                )));
            }
            let central = block
                .central_body
                .as_deref()
                .map(|name| self.bodies.id(name))
                .transpose()?;
            layout.push(block.kind, body, central);
        }
        if settings.initial_state.len() != layout.size() {
            return Err(ConfigurationError::DimensionMismatch {
                context: "initial state".to_string(),
                expected: layout.size(),
                found: settings.initial_state.len(),
            });
        }

        // Flight conditions needed by models or outputs are created against
        // the central body of the propagation
        let mut needs_flight_conditions: Vec<String> = Vec::new();
        let requirements = settings
            .models
            .forces
            .iter()
            .flat_map(|m| m.environment_requirements())
            .chain(settings.models.mass_rates.iter().flat_map(|m| m.environment_requirements()))
            .chain(settings.models.torques.iter().flat_map(|m| m.environment_requirements()))
            .chain(settings.dependent_variables.iter().flat_map(|v| v.requirements()));
        for requirement in requirements {
            if requirement.capability == Capability::FlightConditions && !needs_flight_conditions.contains(&requirement.body) {
                needs_flight_conditions.push(requirement.body);
            }
        }
        for vehicle in needs_flight_conditions {
            let id = self.bodies.id(&vehicle)?;
            if self.bodies.get(id)?.has_capability(Capability::FlightConditions) {
                continue;
            }
            let central = settings.central_body_of(&vehicle).ok_or_else(|| {
                ConfigurationError::InvalidSettings(format!(
                    "flight conditions of {vehicle} need a propagated translational state with a central body"
                ))
            })?;
            self.bodies.create_flight_conditions(&vehicle, central)?;
            created.push(id);
        }

        let mut roots = Vec::new();
        for variable in &settings.dependent_variables {
            for requirement in variable.requirements() {
                let body = self.bodies.body(&requirement.body)?;
                let propagated_mass = requirement.capability == Capability::Mass
                    && layout.contains(StateBlockKind::Mass, self.bodies.id(&requirement.body)?);
                if !body.has_capability(requirement.capability) && !propagated_mass {
                    return Err(ConfigurationError::MissingEnvironmentModel {
                        body: requirement.body,
                        capability: requirement.capability,
                    });
                }
            }
            roots.extend(variable.environment_dependencies(&self.bodies)?);
        }

        let model = StateDerivativeModel::new(
            &self.bodies,
            layout,
            settings.models,
            &roots,
            &settings.bindings,
            settings.environment_models,
        )?;
        let integrator = integrator_settings.create()?;

        Ok(ConfiguredRun {
            integrator,
            model,
            termination: settings.termination,
            dependent_variables: settings.dependent_variables,
            start_time: settings.start_time,
            initial_state: settings.initial_state,
        })
    }

    /// Integrate until a termination condition fires, a step fails or the
    /// step limit is reached
    ///
    /// Numerical failures end the run with [`PropagationOutcome::Failed`]
    /// (see [`last_error`](Self::last_error)); only calling `run` in the wrong
    /// state is an `Err`.
    pub fn run(&mut self) -> Result<PropagationOutcome, ConfigurationError> {
        let status = self.status;
        let Some(run) = self.run.as_mut().filter(|_| status == SimulatorStatus::Initialized) else {
            return Err(ConfigurationError::InvalidTransition { from: status, action: "run" });
        };
        self.status = SimulatorStatus::Running;
        info!("Starting propagation until {}", run.termination);

        run.model.attach(&mut self.bodies);
        let result = Self::integrate(run, &mut self.bodies, &self.config, &mut self.solution);
        run.model.detach(&mut self.bodies);

        let outcome = match result {
            Ok(outcome) => {
                self.status = SimulatorStatus::Completed;
                outcome
            }
            Err(e) => {
                error!("Propagation failed: {e}");
                self.last_error = Some(e);
                self.status = SimulatorStatus::Failed;
                PropagationOutcome::Failed
            }
        };
        info!(
            "Propagation {} after {} states ({} derivative evaluations)",
            self.status,
            self.solution.len(),
            run.model.function_evaluations()
        );
        self.outcome = Some(outcome);
        Ok(outcome)
    }

    fn integrate(
        run: &mut ConfiguredRun<S, T>,
        bodies: &mut SystemOfBodies,
        config: &SimulatorConfig,
        solution: &mut SolutionHistory<S, T>,
    ) -> Result<PropagationOutcome, PropagationError> {
        let ConfiguredRun {
            integrator,
            model,
            termination,
            dependent_variables,
            start_time,
            initial_state,
        } = run;
        let save_dependent = config.save_dependent_variables && !dependent_variables.is_empty();
        let time_limit = termination.time_limit_value();
        let wall_clock = Instant::now();

        let mut time = *start_time;
        let mut state = initial_state.clone();
        let mut last_print = time;

        solution.clear();
        solution.push(time, state.clone())?;
        if save_dependent {
            model.update_environment(bodies, time, &state)?;
            solution.push_dependent_variables(time, evaluate_all(dependent_variables, bodies)?);
        }
        solution.push_cost(time, 0.0, model.function_evaluations());
        if termination.evaluate(time, &state).is_stop() {
            return Ok(PropagationOutcome::CompletedTerminated);
        }

        for _ in 0..config.max_steps {
            // Land the final step on the time limit
            if let Some(limit) = time_limit {
                let remaining = limit.seconds_since(time);
                let step = integrator.current_step_size();
                if remaining * step > 0.0 && remaining.abs() < step.abs() {
                    integrator.set_step_size(remaining);
                }
            }

            let result = {
                let mut derivative = |t: T, y: &DVector<S>| model.evaluate(bodies, t, y);
                integrator.step(&mut derivative, time, &state)?
            };
            if !result.succeeded {
                return Err(PropagationError::StepRejected {
                    time: time.to_seconds(),
                    message: format!("{} could not take a step of {} s", integrator.name(), result.step_size),
                });
            }

            time = result.time;
            state = result.state;
            solution.push(time, state.clone())?;

            if save_dependent {
                model.update_environment(bodies, time, &state)?;
                solution.push_dependent_variables(time, evaluate_all(dependent_variables, bodies)?);
            }
            solution.push_cost(time, wall_clock.elapsed().as_secs_f64(), model.function_evaluations());
            trace!("Accepted step to t = {:.6} s (h = {} s)", time.to_seconds(), result.step_size);

            if let Some(interval) = config.print_interval {
                if time.seconds_since(last_print).abs() >= interval {
                    info!("Propagated to t = {:.3} s", time.to_seconds());
                    last_print = time;
                }
            }

            if termination.evaluate(time, &state).is_stop() {
                debug!("Termination condition met at t = {:.6} s", time.to_seconds());
                return Ok(PropagationOutcome::CompletedTerminated);
            }
        }

        warn!("Maximum of {} steps reached before termination", config.max_steps);
        Ok(PropagationOutcome::CompletedExhausted)
    }

    pub fn integration_completed_successfully(&self) -> bool {
        matches!(
            self.outcome,
            Some(PropagationOutcome::CompletedTerminated) | Some(PropagationOutcome::CompletedExhausted)
        )
    }

    pub fn outcome(&self) -> Option<PropagationOutcome> {
        self.outcome
    }

    /// Error that ended the last failed run
    pub fn last_error(&self) -> Option<&PropagationError> {
        self.last_error.as_ref()
    }

    /// Raw integrated solution; empty after processing with
    /// `clear_numerical_solutions` set
    pub fn solution(&self) -> &SolutionHistory<S, T> {
        &self.solution
    }

    /// Split the raw solution into per-body histories
    ///
    /// With `set_integrated_result` the histories replace each body's
    /// ephemeris and mass model, so later runs see the propagated trajectory.
    pub fn process_numerical_equations_of_motion_solution(&mut self) -> Result<(), ConfigurationError> {
        if !matches!(self.status, SimulatorStatus::Completed | SimulatorStatus::Failed) {
            return Err(self.transition_error("process the solution"));
        }
        let Some(run) = self.run.as_ref() else {
            return Err(self.transition_error("process the solution"));
        };
        let layout = run.model.layout();

        let mut histories: BTreeMap<String, BodyStateHistory> = BTreeMap::new();
        for block in layout.blocks() {
            let name = self.bodies.name_of(block.body);
            let history = histories.entry(name).or_default();
            match block.kind {
                StateBlockKind::Translational => {
                    let central = block.central_body.map(|id| self.bodies.get(id)).transpose()?;
                    for (time, relative) in self.solution.translational_history(block.offset) {
                        let origin = match central {
                            Some(central) => central.state_at(time.argument()).ok_or_else(|| {
                                ConfigurationError::MissingEnvironmentModel {
                                    body: central.name().to_string(),
                                    capability: Capability::Ephemeris,
                                }
                            })?,
                            None => Vector6::zeros(),
                        };
                        history.translational.push((time.to_seconds(), origin + relative));
                    }
                }
                StateBlockKind::Mass => {
                    history.mass = self
                        .solution
                        .scalar_history(block.offset)
                        .into_iter()
                        .map(|(time, mass)| (time.to_seconds(), mass))
                        .collect();
                }
                StateBlockKind::AngularVelocity => {
                    history.angular_velocity = self
                        .solution
                        .entries()
                        .iter()
                        .map(|entry| (entry.time.to_seconds(), layout.vector3(&entry.state, block)))
                        .collect();
                }
            }
        }

        if self.config.set_integrated_result {
            for (name, history) in &histories {
                let body = self.bodies.body_mut(name)?;
                if history.translational.len() > 1 {
                    let (times, states) = increasing(&history.translational);
                    body.set_state_history(times, states)?;
                }
                if history.mass.len() > 1 {
                    let (times, masses) = increasing(&history.mass);
                    body.set_mass_history(times, masses)?;
                }
                debug!("Set integrated result of {name}");
            }
        }

        self.body_histories = histories;
        if self.config.clear_numerical_solutions {
            self.solution.clear();
        }
        Ok(())
    }

    /// Per-body histories from the last processing
    pub fn body_state_histories(&self) -> &BTreeMap<String, BodyStateHistory> {
        &self.body_histories
    }

    pub fn system_of_bodies(&self) -> &SystemOfBodies {
        &self.bodies
    }

    /// Replace the bodies; any prepared run refers to the old ones and is dropped
    pub fn reset_system_of_bodies(&mut self, bodies: SystemOfBodies) -> Result<(), ConfigurationError> {
        if self.status == SimulatorStatus::Running {
            return Err(self.transition_error("replace the bodies"));
        }
        self.bodies = bodies;
        self.run = None;
        self.status = SimulatorStatus::Unconfigured;
        Ok(())
    }

    pub fn set_integrated_result(&mut self, enabled: bool) {
        self.config.set_integrated_result = enabled;
    }

    pub fn is_integrated_result_set(&self) -> bool {
        self.config.set_integrated_result
    }

    /// State derivative model of the prepared run
    pub fn derivative_model(&self) -> Option<&StateDerivativeModel<S, T>> {
        self.run.as_ref().map(|run| &run.model)
    }
}

/// Samples sorted by increasing time, as required by the tabulated models
fn increasing<V: Copy>(samples: &[(f64, V)]) -> (Vec<f64>, Vec<V>) {
    let mut samples = samples.to_vec();
    if samples.len() > 1 && samples[0].0 > samples[samples.len() - 1].0 {
        samples.reverse();
    }
    samples.into_iter().unzip()
}
