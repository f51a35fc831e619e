//! Per-step refresh of the environment
//!
//! The updater owns the dependency order computed at setup and writes the
//! current snapshot of every involved body for a given (time, state). A
//! repeated call with the same pair is a cache hit; a call with a new state
//! at the same time only refreshes the models that depend on the state.

use super::aero_angles::{compute_body_fixed_aero_angles, AngleTriple};
use super::body::{BodyId, RotationModel, SystemOfBodies};
use super::closure::{ClosureBinding, DependencyGraph, EnvironmentNode, OrientationClosure};
use crate::error::{Capability, ConfigurationError, PropagationError};
use crate::state::{StateBlockKind, StateLayout, StateScalar};
use crate::time::{TimeArgument, TimeValue};
use nalgebra::{DVector, Vector3, Vector6};
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

/// Environment model outside the built-in set
///
/// Its position in the update order comes from [`ClosureBinding`]s.
pub trait CustomEnvironmentModel: Send + Sync {
    fn name(&self) -> &str;

    fn update(&mut self, time: TimeArgument, bodies: &SystemOfBodies);

    /// Whether the model reads propagated quantities directly
    fn depends_on_state(&self) -> bool {
        true
    }
}

/// Handle shared between the updater and the models reading a custom model
pub type SharedEnvironmentModel = Arc<RwLock<dyn CustomEnvironmentModel>>;

pub struct EnvironmentUpdater<S: StateScalar, T: TimeValue> {
    layout: StateLayout,
    order: Vec<EnvironmentNode>,
    closures: HashMap<BodyId, OrientationClosure>,
    state_dependent: BTreeSet<EnvironmentNode>,
    custom_models: Vec<SharedEnvironmentModel>,
    last_time: Option<T>,
    last_state: Option<DVector<S>>,
    node_update_times: HashMap<EnvironmentNode, T>,
    recomputations: usize,
    _scalar: PhantomData<S>,
}

impl<S: StateScalar, T: TimeValue> EnvironmentUpdater<S, T> {
    /// Resolve the update order for `roots` and every propagated quantity
    pub fn new(
        bodies: &SystemOfBodies,
        layout: StateLayout,
        roots: &[EnvironmentNode],
        bindings: &[ClosureBinding],
        custom_models: Vec<SharedEnvironmentModel>,
    ) -> Result<Self, ConfigurationError> {
        let mut all_roots: Vec<EnvironmentNode> = roots.to_vec();
        for block in layout.blocks() {
            all_roots.push(match block.kind {
                StateBlockKind::Translational => EnvironmentNode::TranslationalState(block.body),
                StateBlockKind::Mass => EnvironmentNode::Mass(block.body),
                StateBlockKind::AngularVelocity => EnvironmentNode::AngularVelocity(block.body),
            });
        }
        all_roots.extend((0..custom_models.len()).map(EnvironmentNode::Custom));

        let custom_names: Vec<String> = custom_models
            .iter()
            .map(|model| model.read().name().to_string())
            .collect();

        let graph = DependencyGraph::build(bodies, &layout, &all_roots, bindings, custom_models.len())?;
        let order = graph.dependency_order(bodies, &custom_names)?;

        let mut closures = HashMap::new();
        let mut state_dependent = BTreeSet::new();
        for node in &order {
            if let Some(body) = node.body() {
                if let Some(closure) = graph.closure(body) {
                    closures.insert(body, closure);
                }
            }
            let reads_state = match node {
                EnvironmentNode::TranslationalState(body) => {
                    layout.contains(StateBlockKind::Translational, *body)
                }
                EnvironmentNode::Mass(body) => layout.contains(StateBlockKind::Mass, *body),
                EnvironmentNode::AngularVelocity(body) => {
                    layout.contains(StateBlockKind::AngularVelocity, *body)
                }
                EnvironmentNode::Custom(index) => custom_models[*index].read().depends_on_state(),
                _ => false,
            };
            let inherits_state = graph
                .dependencies(node)
                .is_some_and(|dependencies| dependencies.iter().any(|dep| state_dependent.contains(dep)));
            if reads_state || inherits_state {
                state_dependent.insert(*node);
            }
        }

        log::debug!(
            "Environment update order: {}",
            order
                .iter()
                .map(|node| node.label(bodies, &custom_names))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            layout,
            order,
            closures,
            state_dependent,
            custom_models,
            last_time: None,
            last_state: None,
            node_update_times: HashMap::new(),
            recomputations: 0,
            _scalar: PhantomData,
        })
    }

    pub fn order(&self) -> &[EnvironmentNode] {
        &self.order
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn closure(&self, body: BodyId) -> Option<OrientationClosure> {
        self.closures.get(&body).copied()
    }

    pub fn is_state_dependent(&self, node: &EnvironmentNode) -> bool {
        self.state_dependent.contains(node)
    }

    /// Number of individual model refreshes since creation
    pub fn recomputation_count(&self) -> usize {
        self.recomputations
    }

    /// Mark angle-driven rotations as driven by this updater
    pub fn attach(&mut self, bodies: &mut SystemOfBodies, in_propagation: bool) {
        for node in &self.order {
            if let EnvironmentNode::Rotation(id) = node {
                if let Ok(body) = bodies.get_mut(*id) {
                    if let Some(rotation) = body.rotation.as_mut().and_then(RotationModel::as_angle_driven_mut) {
                        rotation.set_is_body_in_propagation(in_propagation);
                    }
                }
            }
        }
        self.invalidate(bodies);
    }

    /// Drop every cached value
    pub fn invalidate(&mut self, bodies: &mut SystemOfBodies) {
        self.last_time = None;
        self.last_state = None;
        self.node_update_times.clear();
        bodies.reset_current_time();
    }

    pub fn update(
        &mut self,
        bodies: &mut SystemOfBodies,
        time: T,
        state: &DVector<S>,
    ) -> Result<(), PropagationError> {
        self.layout.check(state)?;

        let same_time = self.last_time == Some(time);
        if same_time && self.last_state.as_ref() == Some(state) {
            log::trace!("Environment cache hit at {:?}", time);
            return Ok(());
        }

        if !same_time {
            self.node_update_times.clear();
        }
        // Time-memoized models must see the new state even at the same time
        bodies.reset_current_time();

        let argument = time.argument();
        for index in 0..self.order.len() {
            let node = self.order[index];
            let current = self.node_update_times.get(&node) == Some(&time);
            if current && !self.state_dependent.contains(&node) {
                continue;
            }
            self.update_node(node, bodies, argument, state)?;
            self.node_update_times.insert(node, time);
            self.recomputations += 1;
        }

        self.last_time = Some(time);
        match self.last_state.as_mut() {
            Some(last) if last.len() == state.len() => last.copy_from(state),
            _ => self.last_state = Some(state.clone()),
        }
        Ok(())
    }

    fn update_node(
        &self,
        node: EnvironmentNode,
        bodies: &mut SystemOfBodies,
        time: TimeArgument,
        state: &DVector<S>,
    ) -> Result<(), PropagationError> {
        use EnvironmentNode::*;

        match node {
            TranslationalState(id) => {
                let new_state = match self.layout.block(StateBlockKind::Translational, id) {
                    Some(block) => {
                        let relative = self.layout.translational(state, block);
                        let origin = match block.central_body {
                            Some(central) => bodies.get(central)?.current_state,
                            None => Vector6::zeros(),
                        };
                        origin + relative
                    }
                    None => {
                        let body = bodies.get(id)?;
                        body.state_at(time).ok_or_else(|| missing(body.name(), Capability::Ephemeris))?
                    }
                };
                bodies.get_mut(id)?.current_state = new_state;
            }
            Mass(id) => {
                let body = bodies.get_mut(id)?;
                body.current_mass = Some(match self.layout.block(StateBlockKind::Mass, id) {
                    Some(block) => self.layout.scalar(state, block),
                    None => body
                        .mass
                        .as_ref()
                        .map(|mass| mass.mass_at(time.seconds()))
                        .ok_or_else(|| missing(body.name(), Capability::Mass))?,
                });
            }
            AngularVelocity(id) => {
                let body = bodies.get_mut(id)?;
                body.current_angular_velocity = match self.layout.block(StateBlockKind::AngularVelocity, id) {
                    Some(block) => self.layout.vector3(state, block),
                    None => body
                        .current_rotation
                        .angular_velocity_in_base
                        .map(|omega| body.current_rotation.matrix_to_target() * omega)
                        .unwrap_or_else(Vector3::zeros),
                };
            }
            Rotation(id) => self.update_rotation(bodies, id, time)?,
            FlightConditions(id) => {
                let central_id = bodies
                    .get(id)?
                    .flight_conditions
                    .as_ref()
                    .map(|conditions| conditions.central_body())
                    .ok_or_else(|| missing(&bodies.name_of(id), Capability::FlightConditions))?;
                let (vehicle, central) = bodies.pair_mut(id, central_id)?;
                let atmosphere = central
                    .atmosphere
                    .as_deref()
                    .ok_or_else(|| missing(central.name(), Capability::Atmosphere))?;
                let shape = central
                    .shape
                    .as_deref()
                    .ok_or_else(|| missing(central.name(), Capability::Shape))?;
                let vehicle_state = vehicle.current_state;
                if let Some(conditions) = vehicle.flight_conditions.as_mut() {
                    conditions.update(
                        time.seconds(),
                        &vehicle_state,
                        &central.current_state,
                        &central.current_rotation,
                        atmosphere,
                        shape,
                    );
                }
            }
            AerodynamicAngles(id) => self.update_aerodynamic_angles(bodies, id, time)?,
            AerodynamicCoefficients(id) => {
                let body = bodies.get_mut(id)?;
                let name = body.name().to_string();
                let conditions = body
                    .flight_conditions
                    .as_ref()
                    .ok_or_else(|| missing(&name, Capability::FlightConditions))?;
                let coefficients = body
                    .aerodynamic_coefficients
                    .as_mut()
                    .ok_or_else(|| missing(&name, Capability::AerodynamicCoefficients))?;
                let values: Vec<f64> = coefficients
                    .independent_variables()
                    .iter()
                    .map(|variable| conditions.coefficient_variable(*variable))
                    .collect();
                coefficients.update_current_coefficients(&values);
            }
            Custom(index) => {
                if let Some(model) = self.custom_models.get(index) {
                    model.write().update(time, bodies);
                }
            }
        }
        Ok(())
    }

    fn update_rotation(
        &self,
        bodies: &mut SystemOfBodies,
        id: BodyId,
        time: TimeArgument,
    ) -> Result<(), PropagationError> {
        let closure = self.closures.get(&id).copied();
        let body = bodies.get_mut(id)?;
        let name = body.name().to_string();

        match body.rotation.as_mut() {
            None => return Err(missing(&name, Capability::Rotation).into()),
            Some(RotationModel::Ephemeris(ephemeris)) => {
                body.current_rotation = ephemeris.rotation_state(time);
            }
            Some(RotationModel::AngleDriven(rotation)) => {
                let calculator = body
                    .flight_conditions
                    .as_ref()
                    .map(|conditions| conditions.angle_calculator())
                    .ok_or_else(|| missing(&name, Capability::FlightConditions))?;
                let external_angles = match closure {
                    Some(OrientationClosure::AngleDriven {
                        angles_from_guidance: true,
                    }) => Some(calculator.current_angles()),
                    _ => None,
                };
                rotation.update(time, calculator.trajectory_to_inertial(), external_angles);
                body.current_rotation = rotation.current_rotation_state();
            }
        }
        Ok(())
    }

    fn update_aerodynamic_angles(
        &self,
        bodies: &mut SystemOfBodies,
        id: BodyId,
        time: TimeArgument,
    ) -> Result<(), PropagationError> {
        let closure = self.closures.get(&id).copied();
        let body = bodies.get_mut(id)?;
        let name = body.name().to_string();
        let conditions = body
            .flight_conditions
            .as_mut()
            .ok_or_else(|| missing(&name, Capability::FlightConditions))?;
        let calculator = conditions.angle_calculator();

        let angles = match closure {
            Some(OrientationClosure::RotationDriven) => compute_body_fixed_aero_angles(
                &body.current_rotation.matrix_to_target(),
                calculator.trajectory_to_inertial(),
            ),
            Some(OrientationClosure::AngleDriven {
                angles_from_guidance: false,
            }) => body
                .rotation
                .as_ref()
                .and_then(RotationModel::as_angle_driven)
                .map(|rotation| rotation.current_angles())
                .unwrap_or_default(),
            Some(OrientationClosure::AngleDriven {
                angles_from_guidance: true,
            })
            | Some(OrientationClosure::AnglesOnly) => match calculator.trim() {
                Some(trim) => {
                    let coefficients = body
                        .aerodynamic_coefficients
                        .as_deref()
                        .ok_or_else(|| missing(&name, Capability::AerodynamicCoefficients))?;
                    trim.trimmed_angles(time.seconds(), conditions, coefficients)
                        .ok_or(PropagationError::TrimNotFound {
                            body: name,
                            time: time.seconds(),
                        })?
                }
                None => calculator.guidance_angles(time.seconds()).unwrap_or_default(),
            },
            None => AngleTriple::zero(),
        };
        conditions.angle_calculator_mut().set_angles(time.extended(), angles);
        Ok(())
    }
}

fn missing(body: &str, capability: Capability) -> ConfigurationError {
    ConfigurationError::MissingEnvironmentModel {
        body: body.to_string(),
        capability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::Exponential;
    use crate::environment::{
        AerodynamicAngleRotation, Body, CoefficientGrid, CoefficientTable, CoefficientVariable, ConstantCoefficients,
        ConstantEphemeris, SimpleRotation, SphericalShape, TabulatedCoefficients, TrimOrientation,
    };
    use crate::state::EARTH_RADIUS_M;
    use crate::time::Time;
    use approx::assert_relative_eq;

    fn reentry_system(vehicle_rotation: RotationModel) -> (SystemOfBodies, StateLayout, BodyId) {
        let mut bodies = SystemOfBodies::new();
        let earth = bodies
            .add_body(
                Body::new("Earth")
                    .with_ephemeris(Box::new(ConstantEphemeris::origin()))
                    .with_atmosphere(Box::new(Exponential::standard()))
                    .with_shape(Box::new(SphericalShape::earth()))
                    .with_rotation(RotationModel::Ephemeris(Box::new(SimpleRotation::earth(
                        "J2000",
                        "IAU_Earth",
                    )))),
            )
            .unwrap();
        let vehicle = bodies
            .add_body(
                Body::new("vehicle")
                    .with_mass(2000.0)
                    .with_aerodynamic_coefficients(Box::new(ConstantCoefficients::drag_only(4.0, 1.2)))
                    .with_rotation(vehicle_rotation),
            )
            .unwrap();
        bodies.create_flight_conditions("vehicle", "Earth").unwrap();

        let mut layout = StateLayout::new();
        layout.push(StateBlockKind::Translational, vehicle, Some(earth));
        (bodies, layout, vehicle)
    }

    fn trimmed() -> RotationModel {
        RotationModel::AngleDriven(
            AerodynamicAngleRotation::new("J2000", "vehicle")
                .with_angle_function(Box::new(|t| AngleTriple::new(0.3, 0.01, 1.0e-4 * t))),
        )
    }

    fn entry_state() -> DVector<f64> {
        DVector::from_vec(vec![EARTH_RADIUS_M + 80_000.0, 0.0, 1.0e5, -500.0, 7200.0, -100.0])
    }

    /// Bilinear Mach × α tables with `C_m = -0.4 (α - 0.01 M)`
    fn trim_coefficients() -> TabulatedCoefficients {
        let mach = vec![0.0, 50.0];
        let alpha = vec![-1.0, 1.0];
        let mut forces = Vec::new();
        let mut moments = Vec::new();
        for m in &mach {
            for a in &alpha {
                forces.push(Vector3::new(1.2, 0.0, 0.5 * a));
                moments.push(Vector3::new(0.0, -0.4 * (a - 0.01 * m), 0.0));
            }
        }
        let table = |values| CoefficientTable {
            values,
            independent_variables: vec![mach.clone(), alpha.clone()],
        };
        TabulatedCoefficients::new(
            4.0,
            vec![CoefficientVariable::MachNumber, CoefficientVariable::AngleOfAttack],
            CoefficientGrid::new(table(forces), "forces").unwrap(),
        )
        .unwrap()
        .with_moment_grid(CoefficientGrid::new(table(moments), "moments").unwrap())
        .unwrap()
    }

    fn trim_system(trim: TrimOrientation) -> (SystemOfBodies, EnvironmentUpdater<f64, f64>, BodyId) {
        let (mut bodies, layout, vehicle) =
            reentry_system(RotationModel::AngleDriven(AerodynamicAngleRotation::new("J2000", "vehicle")));
        let body = bodies.get_mut(vehicle).unwrap();
        body.aerodynamic_coefficients = Some(Box::new(trim_coefficients()));
        body.set_trimmed_conditions(trim).unwrap();

        let updater = EnvironmentUpdater::new(
            &bodies,
            layout,
            &[
                EnvironmentNode::AerodynamicCoefficients(vehicle),
                EnvironmentNode::Rotation(vehicle),
            ],
            &[],
            Vec::new(),
        )
        .unwrap();
        (bodies, updater, vehicle)
    }

    #[test]
    fn test_trimmed_angles_drive_rotation_and_coefficients() {
        let (mut bodies, mut updater, vehicle) = trim_system(TrimOrientation::new().with_bank(Box::new(|_| 0.4)));
        updater.update(&mut bodies, 30.0, &entry_state()).unwrap();

        let body = bodies.get(vehicle).unwrap();
        let conditions = body.flight_conditions().unwrap();
        let mach = conditions.mach_number().unwrap();
        let angles = conditions.angle_calculator().current_angles();
        assert!(mach > 15.0);
        assert_relative_eq!(angles.attack, 0.01 * mach, epsilon = 1e-8);
        assert_relative_eq!(angles.bank, 0.4);

        // Coefficients were evaluated at the trimmed attack angle
        let coefficients = body.aerodynamic_coefficients().unwrap();
        assert_relative_eq!(coefficients.current_moment_coefficients().y, 0.0, epsilon = 1e-8);
        assert_relative_eq!(coefficients.current_force_coefficients().z, 0.5 * angles.attack, epsilon = 1e-9);

        // Orientation follows the trimmed angles
        let recovered = compute_body_fixed_aero_angles(
            &body.current_rotation_state().matrix_to_target(),
            conditions.angle_calculator().trajectory_to_inertial(),
        );
        assert_relative_eq!(recovered.attack, angles.attack, epsilon = 1e-10);
        assert_relative_eq!(recovered.bank, 0.4, epsilon = 1e-10);
    }

    #[test]
    fn test_missing_trim_point_is_reported() {
        let (mut bodies, mut updater, _) = trim_system(TrimOrientation::new().with_attack_range(0.5, 0.7));
        assert!(matches!(
            updater.update(&mut bodies, 30.0, &entry_state()),
            Err(PropagationError::TrimNotFound { ref body, .. }) if body == "vehicle"
        ));
    }

    #[test]
    fn test_identical_call_is_cache_hit() {
        let (mut bodies, layout, vehicle) = reentry_system(trimmed());
        let mut updater = EnvironmentUpdater::<f64, f64>::new(
            &bodies,
            layout,
            &[EnvironmentNode::AerodynamicCoefficients(vehicle)],
            &[],
            Vec::new(),
        )
        .unwrap();
        let state = entry_state();

        updater.update(&mut bodies, 10.0, &state).unwrap();
        let count = updater.recomputation_count();
        let conditions = bodies.get(vehicle).unwrap().flight_conditions().unwrap();
        let (density, angles) = (conditions.density(), conditions.angle_calculator().current_angles());
        let rotation = bodies.get(vehicle).unwrap().current_rotation_state().clone();

        updater.update(&mut bodies, 10.0, &state).unwrap();
        assert_eq!(updater.recomputation_count(), count);

        let conditions = bodies.get(vehicle).unwrap().flight_conditions().unwrap();
        assert_eq!(conditions.density().to_bits(), density.to_bits());
        assert_eq!(conditions.angle_calculator().current_angles(), angles);
        assert_eq!(bodies.get(vehicle).unwrap().current_rotation_state(), &rotation);
    }

    #[test]
    fn test_new_state_at_same_time_skips_time_only_models() {
        let (mut bodies, layout, vehicle) = reentry_system(trimmed());
        let mut updater = EnvironmentUpdater::<f64, f64>::new(
            &bodies,
            layout,
            &[EnvironmentNode::AerodynamicCoefficients(vehicle)],
            &[],
            Vec::new(),
        )
        .unwrap();
        let earth = bodies.id("Earth").unwrap();
        assert!(!updater.is_state_dependent(&EnvironmentNode::Rotation(earth)));
        assert!(updater.is_state_dependent(&EnvironmentNode::Rotation(vehicle)));

        let mut state = entry_state();
        updater.update(&mut bodies, 10.0, &state).unwrap();
        let first = updater.recomputation_count();
        assert_eq!(first, updater.order().len());

        state[0] += 1000.0;
        updater.update(&mut bodies, 10.0, &state).unwrap();
        // Earth's translational state and rotation are reused
        assert_eq!(updater.recomputation_count() - first, updater.order().len() - 2);

        updater.update(&mut bodies, 11.0, &state).unwrap();
        assert_eq!(updater.recomputation_count() - first, 2 * updater.order().len() - 2);
    }

    #[test]
    fn test_snapshot_is_consistent_with_state() {
        let (mut bodies, layout, vehicle) = reentry_system(trimmed());
        let mut updater = EnvironmentUpdater::<f64, Time>::new(
            &bodies,
            layout,
            &[EnvironmentNode::AerodynamicCoefficients(vehicle)],
            &[],
            Vec::new(),
        )
        .unwrap();
        let time = Time::new(2, 400.0);
        updater.update(&mut bodies, time, &entry_state()).unwrap();

        let body = bodies.get(vehicle).unwrap();
        assert_relative_eq!(body.current_position().x, EARTH_RADIUS_M + 80_000.0);

        let conditions = body.flight_conditions().unwrap();
        let expected = AngleTriple::new(0.3, 0.01, 1.0e-4 * time.to_seconds());
        assert_relative_eq!(
            conditions.angle_calculator().current_angles().as_vector(),
            expected.as_vector(),
            epsilon = 1e-12
        );

        // Angles recovered from the rotation match the imposed ones
        let recovered = compute_body_fixed_aero_angles(
            &body.current_rotation_state().matrix_to_target(),
            conditions.angle_calculator().trajectory_to_inertial(),
        );
        assert_relative_eq!(recovered.as_vector(), expected.as_vector(), epsilon = 1e-10);
        assert!(body.current_rotation_state().angular_velocity_in_base.is_none());
    }

    #[test]
    fn test_state_dimension_is_checked() {
        let (mut bodies, layout, _) = reentry_system(trimmed());
        let mut updater = EnvironmentUpdater::<f64, f64>::new(&bodies, layout, &[], &[], Vec::new()).unwrap();

        assert_eq!(
            updater.update(&mut bodies, 0.0, &DVector::zeros(3)),
            Err(PropagationError::StateDimensionMismatch {
                expected: 6,
                found: 3
            })
        );
    }

    struct Counter {
        name: String,
        updates: usize,
        seen_altitude: f64,
        vehicle: BodyId,
    }

    impl CustomEnvironmentModel for Counter {
        fn name(&self) -> &str {
            &self.name
        }

        fn update(&mut self, _time: TimeArgument, bodies: &SystemOfBodies) {
            self.updates += 1;
            self.seen_altitude = bodies
                .get(self.vehicle)
                .ok()
                .and_then(|body| body.flight_conditions())
                .map_or(f64::NAN, |conditions| conditions.altitude());
        }
    }

    #[test]
    fn test_custom_model_follows_bindings() {
        let (mut bodies, layout, vehicle) = reentry_system(trimmed());
        let counter = Arc::new(RwLock::new(Counter {
            name: "heating".to_string(),
            updates: 0,
            seen_altitude: f64::NAN,
            vehicle,
        }));
        let shared: SharedEnvironmentModel = counter.clone();
        let bindings = [ClosureBinding::new(
            EnvironmentNode::Custom(0),
            EnvironmentNode::FlightConditions(vehicle),
        )];

        let mut updater =
            EnvironmentUpdater::<f64, f64>::new(&bodies, layout, &[], &bindings, vec![shared]).unwrap();
        updater.update(&mut bodies, 0.0, &entry_state()).unwrap();
        updater.update(&mut bodies, 0.0, &entry_state()).unwrap();

        let counter = counter.read();
        assert_eq!(counter.updates, 1);
        assert_relative_eq!(counter.seen_altitude, 80_000.0, max_relative = 2e-2);
    }
}
