//! State derivative model
//!
//! Maps (time, global state) to the time derivative of the global state:
//! the environment is refreshed first, then every force, mass-rate and torque
//! model contributes to the block of the body it acts on.
//!
//! Translational blocks are relative to their central body, whose origin is
//! taken as non-accelerating.

use crate::environment::{
    BodyId, ClosureBinding, EnvironmentNode, EnvironmentUpdater, SharedEnvironmentModel, SystemOfBodies,
};
use crate::error::{Capability, ConfigurationError, PropagationError};
use crate::forces::{DerivativeContribution, ForceModel, MassRateModel, Requirement, TorqueModel};
use crate::state::{from_f64, StateBlockKind, StateLayout, StateScalar};
use crate::time::TimeValue;
use log::debug;
use nalgebra::{DVector, Matrix3, Vector3};

/// Models registered with a [`StateDerivativeModel`]
#[derive(Default)]
pub struct DerivativeModels {
    pub forces: Vec<Box<dyn ForceModel>>,
    pub mass_rates: Vec<Box<dyn MassRateModel>>,
    pub torques: Vec<Box<dyn TorqueModel>>,
}

/// Inertia of a body with propagated angular velocity
struct RigidBody {
    body: BodyId,
    inertia: Matrix3<f64>,
    inverse_inertia: Matrix3<f64>,
}

pub struct StateDerivativeModel<S: StateScalar, T: TimeValue> {
    forces: Vec<(BodyId, Box<dyn ForceModel>)>,
    mass_rates: Vec<(BodyId, Box<dyn MassRateModel>)>,
    torques: Vec<(BodyId, Box<dyn TorqueModel>)>,
    rigid_bodies: Vec<RigidBody>,
    updater: EnvironmentUpdater<S, T>,
    function_evaluations: usize,
}

impl<S: StateScalar, T: TimeValue> StateDerivativeModel<S, T> {
    /// Bind all models, verify their environment and resolve the update order
    ///
    /// `extra_roots` are environment nodes read outside the models, such as
    /// by dependent variables.
    pub fn new(
        bodies: &SystemOfBodies,
        layout: StateLayout,
        models: DerivativeModels,
        extra_roots: &[EnvironmentNode],
        bindings: &[ClosureBinding],
        custom_models: Vec<SharedEnvironmentModel>,
    ) -> Result<Self, ConfigurationError> {
        let DerivativeModels {
            forces,
            mass_rates,
            torques,
        } = models;

        let mut roots = extra_roots.to_vec();
        let forces = bind_all(bodies, &layout, forces, StateBlockKind::Translational, &mut roots)?;
        let mass_rates = bind_all(bodies, &layout, mass_rates, StateBlockKind::Mass, &mut roots)?;
        let torques = bind_all(bodies, &layout, torques, StateBlockKind::AngularVelocity, &mut roots)?;

        let mut rigid_bodies = Vec::new();
        for block in layout.blocks().iter().filter(|b| b.kind == StateBlockKind::AngularVelocity) {
            let body = bodies.get(block.body)?;
            let inertia = *body
                .inertia_tensor()
                .ok_or_else(|| ConfigurationError::MissingEnvironmentModel {
                    body: body.name().to_string(),
                    capability: Capability::Inertia,
                })?;
            let inverse_inertia = inertia.try_inverse().ok_or_else(|| {
                ConfigurationError::InvalidSettings(format!("inertia tensor of {} is singular", body.name()))
            })?;
            rigid_bodies.push(RigidBody {
                body: block.body,
                inertia,
                inverse_inertia,
            });
        }

        let updater = EnvironmentUpdater::new(bodies, layout, &roots, bindings, custom_models)?;

        Ok(Self {
            forces,
            mass_rates,
            torques,
            rigid_bodies,
            updater,
            function_evaluations: 0,
        })
    }

    pub fn layout(&self) -> &StateLayout {
        self.updater.layout()
    }

    pub fn updater(&self) -> &EnvironmentUpdater<S, T> {
        &self.updater
    }

    /// Derivative evaluations since construction
    pub fn function_evaluations(&self) -> usize {
        self.function_evaluations
    }

    /// Prepare the bodies for a run driven by this model
    pub fn attach(&mut self, bodies: &mut SystemOfBodies) {
        self.updater.attach(bodies, true);
    }

    /// Release the bodies after a run
    pub fn detach(&mut self, bodies: &mut SystemOfBodies) {
        self.updater.attach(bodies, false);
    }

    /// Bring the environment to (time, state) without evaluating the models
    pub fn update_environment(
        &mut self,
        bodies: &mut SystemOfBodies,
        time: T,
        state: &DVector<S>,
    ) -> Result<(), PropagationError> {
        self.updater.update(bodies, time, state)
    }

    /// Current acceleration of each force model, after an evaluation
    pub fn acceleration_breakdown(&self) -> Vec<(&'static str, String, Vector3<f64>)> {
        self.forces
            .iter()
            .map(|(_, force)| (force.name(), force.body().to_string(), force.derivative_contribution()))
            .collect()
    }

    pub fn evaluate(
        &mut self,
        bodies: &mut SystemOfBodies,
        time: T,
        state: &DVector<S>,
    ) -> Result<DVector<S>, PropagationError> {
        self.function_evaluations += 1;
        self.updater.update(bodies, time, state)?;

        let argument = time.argument();
        let bodies: &SystemOfBodies = bodies;
        for (_, force) in self.forces.iter_mut() {
            force.update_members(bodies, argument)?;
        }
        for (_, rate) in self.mass_rates.iter_mut() {
            rate.update_members(bodies, argument)?;
        }
        for (_, torque) in self.torques.iter_mut() {
            torque.update_members(bodies, argument)?;
        }

        let layout = self.updater.layout();
        let mut derivative = DVector::<f64>::zeros(layout.size());
        for block in layout.blocks() {
            let o = block.offset;
            match block.kind {
                StateBlockKind::Translational => {
                    let relative = layout.translational(state, block);
                    let acceleration: Vector3<f64> = self
                        .forces
                        .iter()
                        .filter(|(id, _)| *id == block.body)
                        .map(|(_, force)| force.derivative_contribution())
                        .sum();
                    for i in 0..3 {
                        derivative[o + i] = relative[3 + i];
                        derivative[o + 3 + i] = acceleration[i];
                    }
                }
                StateBlockKind::Mass => {
                    derivative[o] = self
                        .mass_rates
                        .iter()
                        .filter(|(id, _)| *id == block.body)
                        .map(|(_, rate)| rate.derivative_contribution())
                        .sum();
                }
                StateBlockKind::AngularVelocity => {
                    let omega = layout.vector3(state, block);
                    let torque: Vector3<f64> = self
                        .torques
                        .iter()
                        .filter(|(id, _)| *id == block.body)
                        .map(|(_, torque)| torque.derivative_contribution())
                        .sum();
                    let omega_dot = self
                        .rigid_bodies
                        .iter()
                        .find(|rigid| rigid.body == block.body)
                        .map(|rigid| rigid.inverse_inertia * (torque - omega.cross(&(rigid.inertia * omega))))
                        .unwrap_or_else(Vector3::zeros);
                    for i in 0..3 {
                        derivative[o + i] = omega_dot[i];
                    }
                }
            }
        }

        if let Some(index) = derivative.iter().position(|value| !value.is_finite()) {
            return Err(PropagationError::NonFiniteDerivative {
                time: time.to_seconds(),
                index,
            });
        }

        Ok(derivative.map(from_f64::<S>))
    }
}

/// Resolve bodies of a set of models and verify what they need
///
/// Each model's body must own a state block of `kind`; every environment
/// requirement must be present, where a propagated mass block satisfies a
/// mass requirement.
fn bind_all<M: DerivativeContribution + ?Sized>(
    bodies: &SystemOfBodies,
    layout: &StateLayout,
    models: Vec<Box<M>>,
    kind: StateBlockKind,
    roots: &mut Vec<EnvironmentNode>,
) -> Result<Vec<(BodyId, Box<M>)>, ConfigurationError> {
    let mut bound = Vec::with_capacity(models.len());
    for mut model in models {
        model.bind(bodies)?;
        let id = bodies.id(model.body())?;
        if !layout.contains(kind, id) {
            return Err(ConfigurationError::InvalidSettings(format!(
                "{} acts on {}, whose {} state is not propagated",
                model.name(),
                model.body(),
                kind.name()
            )));
        }
        for Requirement { body, capability } in model.environment_requirements() {
            let requirement_id = bodies.id(&body)?;
            let satisfied = bodies.get(requirement_id)?.has_capability(capability)
                || (capability == Capability::Mass && layout.contains(StateBlockKind::Mass, requirement_id));
            if !satisfied {
                return Err(ConfigurationError::IncompleteForceModel {
                    model: model.name().to_string(),
                    body,
                    capability,
                });
            }
        }
        roots.extend(model.environment_dependencies());
        debug!("Registered {} on {}", model.name(), model.body());
        bound.push((id, model));
    }
    Ok(bound)
}
