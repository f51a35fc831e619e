//! Orientation closure and environment dependency ordering
//!
//! A body's orientation and its aerodynamic angles can each be defined from
//! the other. [`verify_orientation_closure`] decides, per body and before any
//! step is taken, which one is authoritative. The resulting dependencies
//! between environment models, together with user supplied
//! [`ClosureBinding`]s, form a graph that is sorted once into a safe update
//! order by [`DependencyGraph::dependency_order`].

use super::body::{Body, BodyId, RotationModel, SystemOfBodies};
use crate::error::{Capability, ConfigurationError};
use crate::state::{StateBlockKind, StateLayout};
use std::collections::{BTreeMap, BTreeSet};

/// One refreshable piece of the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnvironmentNode {
    TranslationalState(BodyId),
    Mass(BodyId),
    AngularVelocity(BodyId),
    Rotation(BodyId),
    FlightConditions(BodyId),
    AerodynamicAngles(BodyId),
    AerodynamicCoefficients(BodyId),
    /// User supplied model, by registration index
    Custom(usize),
}

impl EnvironmentNode {
    pub fn body(&self) -> Option<BodyId> {
        match *self {
            Self::TranslationalState(body)
            | Self::Mass(body)
            | Self::AngularVelocity(body)
            | Self::Rotation(body)
            | Self::FlightConditions(body)
            | Self::AerodynamicAngles(body)
            | Self::AerodynamicCoefficients(body) => Some(body),
            Self::Custom(_) => None,
        }
    }

    /// Human readable name used in error messages
    pub fn label(&self, bodies: &SystemOfBodies, custom_names: &[String]) -> String {
        let of = |what: &str, body: BodyId| format!("{what} of {}", bodies.name_of(body));
        match *self {
            Self::TranslationalState(body) => of("translational state", body),
            Self::Mass(body) => of("mass", body),
            Self::AngularVelocity(body) => of("angular velocity", body),
            Self::Rotation(body) => of("rotation", body),
            Self::FlightConditions(body) => of("flight conditions", body),
            Self::AerodynamicAngles(body) => of("aerodynamic angles", body),
            Self::AerodynamicCoefficients(body) => of("aerodynamic coefficients", body),
            Self::Custom(index) => custom_names
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("custom model {index}")),
        }
    }
}

/// `dependent` must be refreshed after `dependency`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClosureBinding {
    pub dependent: EnvironmentNode,
    pub dependency: EnvironmentNode,
}

impl ClosureBinding {
    pub fn new(dependent: EnvironmentNode, dependency: EnvironmentNode) -> Self {
        Self {
            dependent,
            dependency,
        }
    }
}

/// Which of orientation and aerodynamic angles is authoritative for a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrientationClosure {
    /// Rotation model is an ephemeris; angles are derived from it
    RotationDriven,
    /// Rotation is derived from angles, taken from the rotation model's own
    /// function or imposed by guidance or trim
    AngleDriven { angles_from_guidance: bool },
    /// Imposed angles without any body orientation
    AnglesOnly,
}

/// Decide how orientation and aerodynamic angles of `body` close
///
/// Fails when both are defined from each other, or when both are imposed
/// independently.
pub fn verify_orientation_closure(body: &Body) -> Result<OrientationClosure, ConfigurationError> {
    let ambiguous = |reason: &str| ConfigurationError::AmbiguousOrientationClosure {
        body: body.name().to_string(),
        reason: reason.to_string(),
    };
    let missing = |capability| ConfigurationError::MissingEnvironmentModel {
        body: body.name().to_string(),
        capability,
    };

    let Some(conditions) = body.flight_conditions() else {
        return match body.rotation() {
            Some(RotationModel::Ephemeris(_)) => Ok(OrientationClosure::RotationDriven),
            Some(RotationModel::AngleDriven(_)) => Err(missing(Capability::FlightConditions)),
            None => Err(missing(Capability::Rotation)),
        };
    };
    let imposed = conditions.angle_calculator().source_kind().is_imposed();

    match (body.rotation(), imposed) {
        (None, true) => Ok(OrientationClosure::AnglesOnly),
        (None, false) => Err(missing(Capability::Rotation)),
        (Some(RotationModel::Ephemeris(_)), false) => Ok(OrientationClosure::RotationDriven),
        (Some(RotationModel::Ephemeris(_)), true) => Err(ambiguous(
            "rotational ephemeris and imposed aerodynamic angles both define the orientation",
        )),
        (Some(RotationModel::AngleDriven(rotation)), false) => {
            if rotation.has_angle_function() {
                Ok(OrientationClosure::AngleDriven {
                    angles_from_guidance: false,
                })
            } else {
                Err(ambiguous(
                    "rotation is derived from aerodynamic angles that are derived from the rotation",
                ))
            }
        }
        (Some(RotationModel::AngleDriven(rotation)), true) => {
            if rotation.has_angle_function() {
                Err(ambiguous(
                    "rotation model angle function and imposed aerodynamic angles both define the angles",
                ))
            } else {
                Ok(OrientationClosure::AngleDriven {
                    angles_from_guidance: true,
                })
            }
        }
    }
}

/// Environment nodes with their dependencies, closed under the dependency relation
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    dependencies: BTreeMap<EnvironmentNode, BTreeSet<EnvironmentNode>>,
    closures: BTreeMap<BodyId, OrientationClosure>,
}

impl DependencyGraph {
    /// Collect `roots`, the binding endpoints and everything they depend on
    pub fn build(
        bodies: &SystemOfBodies,
        layout: &StateLayout,
        roots: &[EnvironmentNode],
        bindings: &[ClosureBinding],
        custom_model_count: usize,
    ) -> Result<Self, ConfigurationError> {
        let mut graph = Self::default();
        let mut pending: Vec<EnvironmentNode> = roots.to_vec();
        for binding in bindings {
            pending.push(binding.dependent);
            pending.push(binding.dependency);
        }

        while let Some(node) = pending.pop() {
            if graph.dependencies.contains_key(&node) {
                continue;
            }
            let mut dependencies: BTreeSet<EnvironmentNode> =
                graph.intrinsic_dependencies(node, bodies, layout, custom_model_count)?;
            dependencies.extend(
                bindings
                    .iter()
                    .filter(|binding| binding.dependent == node)
                    .map(|binding| binding.dependency),
            );
            pending.extend(dependencies.iter().copied());
            graph.dependencies.insert(node, dependencies);
        }
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn contains(&self, node: &EnvironmentNode) -> bool {
        self.dependencies.contains_key(node)
    }

    pub fn dependencies(&self, node: &EnvironmentNode) -> Option<&BTreeSet<EnvironmentNode>> {
        self.dependencies.get(node)
    }

    pub fn closure(&self, body: BodyId) -> Option<OrientationClosure> {
        self.closures.get(&body).copied()
    }

    fn closure_for(&mut self, body: BodyId, bodies: &SystemOfBodies) -> Result<OrientationClosure, ConfigurationError> {
        if let Some(closure) = self.closures.get(&body) {
            return Ok(*closure);
        }
        let closure = verify_orientation_closure(bodies.get(body)?)?;
        log::debug!("Orientation of {} is {:?}", bodies.name_of(body), closure);
        self.closures.insert(body, closure);
        Ok(closure)
    }

    fn intrinsic_dependencies(
        &mut self,
        node: EnvironmentNode,
        bodies: &SystemOfBodies,
        layout: &StateLayout,
        custom_model_count: usize,
    ) -> Result<BTreeSet<EnvironmentNode>, ConfigurationError> {
        use EnvironmentNode::*;

        let require = |body: &Body, capability: Capability| {
            if body.has_capability(capability) {
                Ok(())
            } else {
                Err(ConfigurationError::MissingEnvironmentModel {
                    body: body.name().to_string(),
                    capability,
                })
            }
        };

        let mut dependencies = BTreeSet::new();
        match node {
            TranslationalState(id) => match layout.block(StateBlockKind::Translational, id) {
                Some(block) => {
                    if let Some(central) = block.central_body {
                        dependencies.insert(TranslationalState(central));
                    }
                }
                None => require(bodies.get(id)?, Capability::Ephemeris)?,
            },
            Mass(id) => {
                if !layout.contains(StateBlockKind::Mass, id) {
                    require(bodies.get(id)?, Capability::Mass)?;
                }
            }
            AngularVelocity(id) => {
                if !layout.contains(StateBlockKind::AngularVelocity, id) {
                    dependencies.insert(Rotation(id));
                }
            }
            Rotation(id) => {
                let body = bodies.get(id)?;
                match body.rotation() {
                    None => require(body, Capability::Rotation)?,
                    Some(RotationModel::Ephemeris(_)) => {}
                    Some(RotationModel::AngleDriven(_)) => {
                        if let OrientationClosure::AngleDriven {
                            angles_from_guidance,
                        } = self.closure_for(id, bodies)?
                        {
                            dependencies.insert(FlightConditions(id));
                            if angles_from_guidance {
                                dependencies.insert(AerodynamicAngles(id));
                            }
                        }
                    }
                }
            }
            FlightConditions(id) => {
                let body = bodies.get(id)?;
                let conditions =
                    body.flight_conditions()
                        .ok_or_else(|| ConfigurationError::MissingEnvironmentModel {
                            body: body.name().to_string(),
                            capability: Capability::FlightConditions,
                        })?;
                let central = conditions.central_body();
                dependencies.insert(TranslationalState(id));
                dependencies.insert(TranslationalState(central));
                dependencies.insert(Rotation(central));
            }
            AerodynamicAngles(id) => {
                require(bodies.get(id)?, Capability::FlightConditions)?;
                dependencies.insert(FlightConditions(id));
                match self.closure_for(id, bodies)? {
                    OrientationClosure::RotationDriven
                    | OrientationClosure::AngleDriven {
                        angles_from_guidance: false,
                    } => {
                        dependencies.insert(Rotation(id));
                    }
                    OrientationClosure::AngleDriven {
                        angles_from_guidance: true,
                    }
                    | OrientationClosure::AnglesOnly => {}
                }
            }
            AerodynamicCoefficients(id) => {
                let body = bodies.get(id)?;
                require(body, Capability::AerodynamicCoefficients)?;
                require(body, Capability::FlightConditions)?;
                dependencies.insert(FlightConditions(id));
                dependencies.insert(AerodynamicAngles(id));
            }
            Custom(index) => {
                if index >= custom_model_count {
                    return Err(ConfigurationError::InvalidSettings(format!(
                        "binding refers to custom environment model {index}, only {custom_model_count} registered"
                    )));
                }
            }
        }
        Ok(dependencies)
    }

    /// Deterministic topological order, dependencies first
    ///
    /// A cycle is reported with the labels of the participating models.
    pub fn dependency_order(
        &self,
        bodies: &SystemOfBodies,
        custom_names: &[String],
    ) -> Result<Vec<EnvironmentNode>, ConfigurationError> {
        let mut remaining: BTreeMap<EnvironmentNode, usize> = self
            .dependencies
            .iter()
            .map(|(node, dependencies)| (*node, dependencies.len()))
            .collect();
        let mut dependents: BTreeMap<EnvironmentNode, Vec<EnvironmentNode>> = BTreeMap::new();
        for (node, dependencies) in &self.dependencies {
            for dependency in dependencies {
                dependents.entry(*dependency).or_default().push(*node);
            }
        }

        let mut ready: BTreeSet<EnvironmentNode> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| *node)
            .collect();
        let mut order = Vec::with_capacity(remaining.len());

        while let Some(node) = ready.pop_first() {
            remaining.remove(&node);
            order.push(node);
            for dependent in dependents.get(&node).into_iter().flatten() {
                if let Some(count) = remaining.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if remaining.is_empty() {
            return Ok(order);
        }

        let cycle = self.find_cycle(&remaining);
        Err(ConfigurationError::CircularEnvironmentDependency {
            models: cycle
                .iter()
                .map(|node| node.label(bodies, custom_names))
                .collect(),
        })
    }

    /// Every unsorted node still waits on an unsorted dependency, so walking
    /// those edges must revisit a node.
    fn find_cycle(&self, remaining: &BTreeMap<EnvironmentNode, usize>) -> Vec<EnvironmentNode> {
        let Some(mut node) = remaining.keys().next().copied() else {
            return Vec::new();
        };
        let mut path: Vec<EnvironmentNode> = Vec::new();
        loop {
            if let Some(start) = path.iter().position(|visited| *visited == node) {
                let mut cycle = path.split_off(start);
                cycle.push(node);
                return cycle;
            }
            path.push(node);
            let next = self
                .dependencies
                .get(&node)
                .and_then(|dependencies| dependencies.iter().find(|dep| remaining.contains_key(dep)));
            match next {
                Some(next) => node = *next,
                None => return path,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atmosphere::Exponential;
    use crate::environment::{
        AerodynamicAngleRotation, AngleTriple, ConstantCoefficients, ConstantEphemeris, ConstantRotation,
        SimpleRotation, SphericalShape, TrimOrientation,
    };
    use nalgebra::UnitQuaternion;

    fn system(vehicle_rotation: Option<RotationModel>) -> (SystemOfBodies, BodyId, BodyId) {
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
        let mut vehicle = Body::new("vehicle")
            .with_mass(1000.0)
            .with_aerodynamic_coefficients(Box::new(ConstantCoefficients::drag_only(1.0, 1.5)));
        if let Some(rotation) = vehicle_rotation {
            vehicle = vehicle.with_rotation(rotation);
        }
        let vehicle = bodies.add_body(vehicle).unwrap();
        bodies.create_flight_conditions("vehicle", "Earth").unwrap();
        (bodies, earth, vehicle)
    }

    fn angle_driven(with_function: bool) -> RotationModel {
        let rotation = AerodynamicAngleRotation::new("J2000", "vehicle");
        RotationModel::AngleDriven(if with_function {
            rotation.with_angle_function(Box::new(|_| AngleTriple::new(0.1, 0.0, 0.2)))
        } else {
            rotation
        })
    }

    fn ephemeris_rotation() -> RotationModel {
        RotationModel::Ephemeris(Box::new(ConstantRotation::new(
            "J2000",
            "vehicle",
            UnitQuaternion::identity(),
        )))
    }

    fn guidance(bodies: &mut SystemOfBodies) {
        bodies
            .body_mut("vehicle")
            .unwrap()
            .set_guidance_angle_functions(Box::new(|_| AngleTriple::new(0.2, 0.0, 0.0)))
            .unwrap();
    }

    #[test]
    fn test_closure_table() {
        let (bodies, _, vehicle) = system(Some(ephemeris_rotation()));
        assert_eq!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Ok(OrientationClosure::RotationDriven)
        );

        let (bodies, _, vehicle) = system(Some(angle_driven(true)));
        assert_eq!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Ok(OrientationClosure::AngleDriven {
                angles_from_guidance: false
            })
        );

        let (mut bodies, _, vehicle) = system(Some(angle_driven(false)));
        guidance(&mut bodies);
        assert_eq!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Ok(OrientationClosure::AngleDriven {
                angles_from_guidance: true
            })
        );

        let (mut bodies, _, vehicle) = system(None);
        guidance(&mut bodies);
        assert_eq!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Ok(OrientationClosure::AnglesOnly)
        );
    }

    #[test]
    fn test_mutually_derived_orientation_is_ambiguous() {
        let (bodies, _, vehicle) = system(Some(angle_driven(false)));
        assert!(matches!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Err(ConfigurationError::AmbiguousOrientationClosure { body, .. }) if body == "vehicle"
        ));
    }

    #[test]
    fn test_doubly_imposed_orientation_is_ambiguous() {
        let (mut bodies, _, vehicle) = system(Some(ephemeris_rotation()));
        guidance(&mut bodies);
        assert!(matches!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Err(ConfigurationError::AmbiguousOrientationClosure { .. })
        ));

        let (mut bodies, _, vehicle) = system(Some(angle_driven(true)));
        guidance(&mut bodies);
        assert!(matches!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Err(ConfigurationError::AmbiguousOrientationClosure { .. })
        ));
    }

    #[test]
    fn test_trim_closes_like_guidance() {
        let trim = |bodies: &mut SystemOfBodies| {
            bodies
                .body_mut("vehicle")
                .unwrap()
                .flight_conditions_mut()
                .unwrap()
                .angle_calculator_mut()
                .set_trimmed_conditions(TrimOrientation::new());
        };

        let (mut bodies, _, vehicle) = system(Some(angle_driven(false)));
        trim(&mut bodies);
        assert_eq!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Ok(OrientationClosure::AngleDriven {
                angles_from_guidance: true
            })
        );

        let (mut bodies, _, vehicle) = system(None);
        trim(&mut bodies);
        assert_eq!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Ok(OrientationClosure::AnglesOnly)
        );

        let (mut bodies, _, vehicle) = system(Some(ephemeris_rotation()));
        trim(&mut bodies);
        assert!(matches!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Err(ConfigurationError::AmbiguousOrientationClosure { .. })
        ));
    }

    #[test]
    fn test_missing_rotation_without_guidance() {
        let (bodies, _, vehicle) = system(None);
        assert_eq!(
            verify_orientation_closure(bodies.get(vehicle).unwrap()),
            Err(ConfigurationError::MissingEnvironmentModel {
                body: "vehicle".to_string(),
                capability: Capability::Rotation
            })
        );
    }

    #[test]
    fn test_order_for_angle_driven_vehicle() {
        let (bodies, earth, vehicle) = system(Some(angle_driven(true)));
        let mut layout = StateLayout::new();
        layout.push(StateBlockKind::Translational, vehicle, Some(earth));

        let graph = DependencyGraph::build(
            &bodies,
            &layout,
            &[EnvironmentNode::AerodynamicCoefficients(vehicle)],
            &[],
            0,
        )
        .unwrap();
        let order = graph.dependency_order(&bodies, &[]).unwrap();
        let position = |node| order.iter().position(|n| *n == node).unwrap();

        use EnvironmentNode::*;
        assert!(position(TranslationalState(earth)) < position(TranslationalState(vehicle)));
        assert!(position(Rotation(earth)) < position(FlightConditions(vehicle)));
        assert!(position(FlightConditions(vehicle)) < position(Rotation(vehicle)));
        assert!(position(Rotation(vehicle)) < position(AerodynamicAngles(vehicle)));
        assert!(position(AerodynamicAngles(vehicle)) < position(AerodynamicCoefficients(vehicle)));
        assert_eq!(order.len(), 7);
    }

    #[test]
    fn test_guidance_angles_precede_rotation() {
        let (mut bodies, earth, vehicle) = system(Some(angle_driven(false)));
        guidance(&mut bodies);
        let mut layout = StateLayout::new();
        layout.push(StateBlockKind::Translational, vehicle, Some(earth));

        let graph =
            DependencyGraph::build(&bodies, &layout, &[EnvironmentNode::Rotation(vehicle)], &[], 0).unwrap();
        let order = graph.dependency_order(&bodies, &[]).unwrap();
        let position = |node| order.iter().position(|n| *n == node).unwrap();

        assert!(
            position(EnvironmentNode::AerodynamicAngles(vehicle)) < position(EnvironmentNode::Rotation(vehicle))
        );
    }

    #[test]
    fn test_cycle_between_bindings_is_reported() {
        let bodies = SystemOfBodies::new();
        let names = vec!["winds".to_string(), "plasma".to_string(), "solar flux".to_string()];
        let bindings = [
            ClosureBinding::new(EnvironmentNode::Custom(0), EnvironmentNode::Custom(1)),
            ClosureBinding::new(EnvironmentNode::Custom(1), EnvironmentNode::Custom(0)),
            ClosureBinding::new(EnvironmentNode::Custom(2), EnvironmentNode::Custom(0)),
        ];

        let graph = DependencyGraph::build(&bodies, &StateLayout::new(), &[], &bindings, 3).unwrap();
        match graph.dependency_order(&bodies, &names) {
            Err(ConfigurationError::CircularEnvironmentDependency { models }) => {
                assert!(models.contains(&"winds".to_string()));
                assert!(models.contains(&"plasma".to_string()));
                assert!(!models.contains(&"solar flux".to_string()));
                assert_eq!(models.first(), models.last());
            }
            other => panic!("expected a circular dependency, got {other:?}"),
        }
    }

    #[test]
    fn test_binding_to_unknown_custom_model() {
        let bodies = SystemOfBodies::new();
        let bindings = [ClosureBinding::new(EnvironmentNode::Custom(4), EnvironmentNode::Custom(0))];
        assert!(matches!(
            DependencyGraph::build(&bodies, &StateLayout::new(), &[], &bindings, 1),
            Err(ConfigurationError::InvalidSettings(_))
        ));
    }
}
