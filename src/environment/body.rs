//! Bodies and the registry that owns them
//!
//! Bodies refer to each other only through [`BodyId`] handles into a
//! [`SystemOfBodies`]. Every environment model of a body is optional; its
//! presence is queried through [`Body::has_capability`].
//!
//! The "current" members of a body (state, mass, rotation, angular velocity)
//! form the snapshot written by the environment updater. A body set must be
//! driven by at most one simulator at a time.

use super::aero_angles::AngleFunction;
use super::aero_rotation::AerodynamicAngleRotation;
use super::coefficients::{AerodynamicCoefficientInterface, CoefficientVariable};
use super::ephemeris::{Ephemeris, TabulatedEphemeris};
use super::flight_conditions::{create_flight_conditions, FlightConditions};
use super::rotation::{RotationState, RotationalEphemeris};
use super::shape::ShapeModel;
use super::trim::TrimOrientation;
use crate::atmosphere::AtmosphereModel;
use crate::error::{Capability, ConfigurationError};
use crate::forces::Engine;
use crate::time::TimeArgument;
use nalgebra::{Matrix3, Vector3, Vector6};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Handle of a body inside a [`SystemOfBodies`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(usize);

impl BodyId {
    pub fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Orientation model of a body
pub enum RotationModel {
    /// Rotation is an independent input
    Ephemeris(Box<dyn RotationalEphemeris>),
    /// Rotation follows from aerodynamic angles and the trajectory frame
    AngleDriven(AerodynamicAngleRotation),
}

impl RotationModel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ephemeris(_) => "rotational ephemeris",
            Self::AngleDriven(_) => "aerodynamic angle rotation",
        }
    }

    pub fn as_angle_driven(&self) -> Option<&AerodynamicAngleRotation> {
        match self {
            Self::AngleDriven(rotation) => Some(rotation),
            Self::Ephemeris(_) => None,
        }
    }

    pub fn as_angle_driven_mut(&mut self) -> Option<&mut AerodynamicAngleRotation> {
        match self {
            Self::AngleDriven(rotation) => Some(rotation),
            Self::Ephemeris(_) => None,
        }
    }
}

/// Mass of a body that is not propagated
#[derive(Debug, Clone, PartialEq)]
pub enum MassModel {
    Constant(f64),
    /// Linear interpolation, clamped outside the table
    Tabulated { times: Vec<f64>, masses: Vec<f64> },
}

impl MassModel {
    pub fn mass_at(&self, time: f64) -> f64 {
        match self {
            Self::Constant(mass) => *mass,
            Self::Tabulated { times, masses } => {
                if times.is_empty() || times.len() != masses.len() {
                    return f64::NAN;
                }
                let last = times.len() - 1;
                if time <= times[0] {
                    return masses[0];
                }
                if time >= times[last] {
                    return masses[last];
                }
                let upper = times.partition_point(|&node| node <= time);
                let lower = upper - 1;
                let weight = (time - times[lower]) / (times[upper] - times[lower]);
                masses[lower] + weight * (masses[upper] - masses[lower])
            }
        }
    }
}

/// A celestial body or vehicle with its environment models
pub struct Body {
    name: String,
    pub(crate) ephemeris: Option<Box<dyn Ephemeris>>,
    pub(crate) gravitational_parameter: Option<f64>,
    pub(crate) rotation: Option<RotationModel>,
    pub(crate) shape: Option<Box<dyn ShapeModel>>,
    pub(crate) atmosphere: Option<Box<dyn AtmosphereModel>>,
    pub(crate) aerodynamic_coefficients: Option<Box<dyn AerodynamicCoefficientInterface>>,
    pub(crate) flight_conditions: Option<FlightConditions>,
    pub(crate) mass: Option<MassModel>,
    pub(crate) inertia_tensor: Option<Matrix3<f64>>,
    pub(crate) engines: Vec<Arc<Engine>>,

    pub(crate) current_state: Vector6<f64>,
    pub(crate) current_mass: Option<f64>,
    pub(crate) current_rotation: RotationState,
    pub(crate) current_angular_velocity: Vector3<f64>,
}

impl Body {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ephemeris: None,
            gravitational_parameter: None,
            rotation: None,
            shape: None,
            atmosphere: None,
            aerodynamic_coefficients: None,
            flight_conditions: None,
            mass: None,
            inertia_tensor: None,
            engines: Vec::new(),
            current_state: Vector6::zeros(),
            current_mass: None,
            current_rotation: RotationState::identity(),
            current_angular_velocity: Vector3::zeros(),
        }
    }

    pub fn with_ephemeris(mut self, ephemeris: Box<dyn Ephemeris>) -> Self {
        self.ephemeris = Some(ephemeris);
        self
    }

    pub fn with_gravitational_parameter(mut self, mu: f64) -> Self {
        self.gravitational_parameter = Some(mu);
        self
    }

    pub fn with_rotation(mut self, rotation: RotationModel) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_shape(mut self, shape: Box<dyn ShapeModel>) -> Self {
        self.shape = Some(shape);
        self
    }

    pub fn with_atmosphere(mut self, atmosphere: Box<dyn AtmosphereModel>) -> Self {
        self.atmosphere = Some(atmosphere);
        self
    }

    pub fn with_aerodynamic_coefficients(
        mut self,
        coefficients: Box<dyn AerodynamicCoefficientInterface>,
    ) -> Self {
        self.aerodynamic_coefficients = Some(coefficients);
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = Some(MassModel::Constant(mass));
        self.current_mass = Some(mass);
        self
    }

    pub fn with_inertia_tensor(mut self, inertia: Matrix3<f64>) -> Self {
        self.inertia_tensor = Some(inertia);
        self
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engines.push(Arc::new(engine));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::Ephemeris => self.ephemeris.is_some(),
            Capability::GravityField => self.gravitational_parameter.is_some(),
            Capability::Atmosphere => self.atmosphere.is_some(),
            Capability::Shape => self.shape.is_some(),
            Capability::Rotation => self.rotation.is_some(),
            Capability::AerodynamicCoefficients => self.aerodynamic_coefficients.is_some(),
            Capability::FlightConditions | Capability::AngleCalculator => {
                self.flight_conditions.is_some()
            }
            Capability::Inertia => self.inertia_tensor.is_some(),
            Capability::Mass => self.mass.is_some(),
            Capability::Engine => !self.engines.is_empty(),
        }
    }

    pub fn ephemeris(&self) -> Option<&dyn Ephemeris> {
        self.ephemeris.as_deref()
    }

    pub fn set_ephemeris(&mut self, ephemeris: Box<dyn Ephemeris>) {
        self.ephemeris = Some(ephemeris);
    }

    pub fn gravitational_parameter(&self) -> Option<f64> {
        self.gravitational_parameter
    }

    pub fn rotation(&self) -> Option<&RotationModel> {
        self.rotation.as_ref()
    }

    pub fn rotation_mut(&mut self) -> Option<&mut RotationModel> {
        self.rotation.as_mut()
    }

    pub fn set_rotation(&mut self, rotation: RotationModel) {
        self.rotation = Some(rotation);
    }

    pub fn shape(&self) -> Option<&dyn ShapeModel> {
        self.shape.as_deref()
    }

    pub fn atmosphere(&self) -> Option<&dyn AtmosphereModel> {
        self.atmosphere.as_deref()
    }

    pub fn aerodynamic_coefficients(&self) -> Option<&dyn AerodynamicCoefficientInterface> {
        self.aerodynamic_coefficients.as_deref()
    }

    pub fn flight_conditions(&self) -> Option<&FlightConditions> {
        self.flight_conditions.as_ref()
    }

    pub fn flight_conditions_mut(&mut self) -> Option<&mut FlightConditions> {
        self.flight_conditions.as_mut()
    }

    pub fn set_flight_conditions(&mut self, flight_conditions: FlightConditions) {
        self.flight_conditions = Some(flight_conditions);
    }

    pub(crate) fn remove_flight_conditions(&mut self) {
        self.flight_conditions = None;
    }

    /// Impose aerodynamic angles from guidance
    pub fn set_guidance_angle_functions(&mut self, angles: AngleFunction) -> Result<(), ConfigurationError> {
        let name = self.name.clone();
        let conditions = self
            .flight_conditions
            .as_mut()
            .ok_or(ConfigurationError::MissingEnvironmentModel {
                body: name,
                capability: Capability::AngleCalculator,
            })?;
        conditions.angle_calculator_mut().set_guidance_angle_functions(angles);
        Ok(())
    }

    /// Impose trimmed aerodynamic angles, solved from the pitch moment coefficient
    ///
    /// The coefficient interface must depend on the angle of attack and carry
    /// moment coefficients.
    pub fn set_trimmed_conditions(&mut self, trim: TrimOrientation) -> Result<(), ConfigurationError> {
        let missing = |capability| ConfigurationError::MissingEnvironmentModel {
            body: self.name.clone(),
            capability,
        };
        let coefficients = self
            .aerodynamic_coefficients
            .as_deref()
            .ok_or_else(|| missing(Capability::AerodynamicCoefficients))?;
        if !coefficients
            .independent_variables()
            .contains(&CoefficientVariable::AngleOfAttack)
        {
            return Err(ConfigurationError::InvalidSettings(format!(
                "trim of {} needs coefficients depending on the angle of attack",
                self.name
            )));
        }
        if coefficients
            .moment_coefficients_at(&vec![0.0; coefficients.independent_variables().len()])
            .is_none()
        {
            return Err(ConfigurationError::InvalidSettings(format!(
                "trim of {} needs moment coefficients",
                self.name
            )));
        }
        let conditions = self
            .flight_conditions
            .as_mut()
            .ok_or_else(|| missing(Capability::FlightConditions))?;
        conditions.angle_calculator_mut().set_trimmed_conditions(trim);
        Ok(())
    }

    pub fn mass_model(&self) -> Option<&MassModel> {
        self.mass.as_ref()
    }

    /// Replace the mass by a tabulated history
    pub fn set_mass_history(&mut self, times: Vec<f64>, masses: Vec<f64>) -> Result<(), ConfigurationError> {
        if times.is_empty() || times.len() != masses.len() {
            return Err(ConfigurationError::DimensionMismatch {
                context: format!("mass history of {}", self.name),
                expected: times.len(),
                found: masses.len(),
            });
        }
        self.mass = Some(MassModel::Tabulated { times, masses });
        Ok(())
    }

    /// Replace the ephemeris by an interpolated state history
    pub fn set_state_history(
        &mut self,
        times: Vec<f64>,
        states: Vec<Vector6<f64>>,
    ) -> Result<(), ConfigurationError> {
        let (expected, found) = (times.len(), states.len());
        let ephemeris = TabulatedEphemeris::new(times, states).ok_or_else(|| {
            ConfigurationError::DimensionMismatch {
                context: format!("state history of {} (times must increase)", self.name),
                expected,
                found,
            }
        })?;
        self.ephemeris = Some(Box::new(ephemeris));
        Ok(())
    }

    pub fn inertia_tensor(&self) -> Option<&Matrix3<f64>> {
        self.inertia_tensor.as_ref()
    }

    pub fn engines(&self) -> &[Arc<Engine>] {
        &self.engines
    }

    /// Inertial position and velocity at the last update
    pub fn current_state(&self) -> &Vector6<f64> {
        &self.current_state
    }

    pub fn current_position(&self) -> Vector3<f64> {
        self.current_state.fixed_rows::<3>(0).into_owned()
    }

    pub fn current_velocity(&self) -> Vector3<f64> {
        self.current_state.fixed_rows::<3>(3).into_owned()
    }

    pub fn set_current_state(&mut self, state: Vector6<f64>) {
        self.current_state = state;
    }

    pub fn current_mass(&self) -> Option<f64> {
        self.current_mass
    }

    /// Rotation from the inertial frame to the body-fixed frame
    pub fn current_rotation_state(&self) -> &RotationState {
        &self.current_rotation
    }

    /// Angular velocity in the body-fixed frame
    pub fn current_angular_velocity(&self) -> &Vector3<f64> {
        &self.current_angular_velocity
    }

    /// Translational state from the ephemeris, outside of any propagation
    pub fn state_at(&self, time: TimeArgument) -> Option<Vector6<f64>> {
        self.ephemeris.as_ref().map(|ephemeris| ephemeris.state(time))
    }

    /// Invalidate time-memoized environment members
    pub fn reset_current_time(&mut self) {
        if let Some(rotation) = self.rotation.as_mut().and_then(RotationModel::as_angle_driven_mut) {
            rotation.reset_current_time();
        }
        if let Some(conditions) = self.flight_conditions.as_mut() {
            conditions.angle_calculator_mut().reset_current_time();
        }
    }
}

/// Registry of bodies, addressed by name or [`BodyId`]
#[derive(Default)]
pub struct SystemOfBodies {
    bodies: Vec<Body>,
    index: HashMap<String, BodyId>,
}

impl SystemOfBodies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_body(&mut self, body: Body) -> Result<BodyId, ConfigurationError> {
        if self.index.contains_key(body.name()) {
            return Err(ConfigurationError::InvalidSettings(format!(
                "body {} already exists",
                body.name()
            )));
        }
        let id = BodyId(self.bodies.len());
        log::debug!("Adding body {} as {}", body.name(), id);
        self.index.insert(body.name().to_string(), id);
        self.bodies.push(body);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Result<BodyId, ConfigurationError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| ConfigurationError::UnknownBody(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, id: BodyId) -> Result<&Body, ConfigurationError> {
        self.bodies
            .get(id.0)
            .ok_or_else(|| ConfigurationError::UnknownBody(id.to_string()))
    }

    pub fn get_mut(&mut self, id: BodyId) -> Result<&mut Body, ConfigurationError> {
        self.bodies
            .get_mut(id.0)
            .ok_or_else(|| ConfigurationError::UnknownBody(id.to_string()))
    }

    pub fn body(&self, name: &str) -> Result<&Body, ConfigurationError> {
        self.get(self.id(name)?)
    }

    pub fn body_mut(&mut self, name: &str) -> Result<&mut Body, ConfigurationError> {
        let id = self.id(name)?;
        self.get_mut(id)
    }

    /// Name of a body, or its handle when it is unknown
    pub fn name_of(&self, id: BodyId) -> String {
        self.bodies
            .get(id.0)
            .map_or_else(|| id.to_string(), |body| body.name().to_string())
    }

    /// One body mutably and another one immutably
    pub fn pair_mut(&mut self, target: BodyId, other: BodyId) -> Result<(&mut Body, &Body), ConfigurationError> {
        if target == other {
            return Err(ConfigurationError::InvalidSettings(format!(
                "body {} cannot be its own central body",
                self.name_of(target)
            )));
        }
        self.get(target)?;
        self.get(other)?;

        if target.0 < other.0 {
            let (head, tail) = self.bodies.split_at_mut(other.0);
            Ok((&mut head[target.0], &tail[0]))
        } else {
            let (head, tail) = self.bodies.split_at_mut(target.0);
            Ok((&mut tail[0], &head[other.0]))
        }
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> {
        self.bodies
            .iter()
            .enumerate()
            .map(|(index, body)| (BodyId(index), body))
    }

    /// Attach flight conditions of `vehicle` relative to `central`
    pub fn create_flight_conditions(&mut self, vehicle: &str, central: &str) -> Result<(), ConfigurationError> {
        let vehicle = self.id(vehicle)?;
        let central = self.id(central)?;
        let conditions = create_flight_conditions(self, vehicle, central)?;
        self.get_mut(vehicle)?.set_flight_conditions(conditions);
        Ok(())
    }

    pub fn reset_current_time(&mut self) {
        for body in &mut self.bodies {
            body.reset_current_time();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::aero_angles::{AngleSourceKind, AngleTriple};
    use crate::environment::coefficients::{CoefficientGrid, CoefficientTable, ConstantCoefficients, TabulatedCoefficients};
    use crate::environment::ephemeris::ConstantEphemeris;

    #[test]
    fn test_registry_lookup() {
        let mut bodies = SystemOfBodies::new();
        let earth = bodies.add_body(Body::new("Earth")).unwrap();
        let vehicle = bodies.add_body(Body::new("vehicle").with_mass(500.0)).unwrap();

        assert_eq!(bodies.id("vehicle").unwrap(), vehicle);
        assert_eq!(bodies.get(earth).unwrap().name(), "Earth");
        assert_eq!(bodies.len(), 2);
        assert_eq!(
            bodies.id("Mars"),
            Err(ConfigurationError::UnknownBody("Mars".to_string()))
        );
        assert!(bodies.add_body(Body::new("Earth")).is_err());
    }

    #[test]
    fn test_pair_mut_in_both_orders() {
        let mut bodies = SystemOfBodies::new();
        let a = bodies.add_body(Body::new("a")).unwrap();
        let b = bodies.add_body(Body::new("b")).unwrap();

        let (first, second) = bodies.pair_mut(a, b).unwrap();
        assert_eq!((first.name(), second.name()), ("a", "b"));
        let (first, second) = bodies.pair_mut(b, a).unwrap();
        assert_eq!((first.name(), second.name()), ("b", "a"));
        assert!(bodies.pair_mut(a, a).is_err());
    }

    #[test]
    fn test_capability_queries() {
        let body = Body::new("Earth")
            .with_ephemeris(Box::new(ConstantEphemeris::origin()))
            .with_gravitational_parameter(crate::state::MU_EARTH);

        assert!(body.has_capability(Capability::Ephemeris));
        assert!(body.has_capability(Capability::GravityField));
        assert!(!body.has_capability(Capability::Atmosphere));
        assert!(!body.has_capability(Capability::FlightConditions));
    }

    #[test]
    fn test_guidance_requires_angle_calculator() {
        let mut body = Body::new("vehicle");
        assert_eq!(
            body.set_guidance_angle_functions(Box::new(|_| AngleTriple::zero())),
            Err(ConfigurationError::MissingEnvironmentModel {
                body: "vehicle".to_string(),
                capability: Capability::AngleCalculator
            })
        );
    }

    #[test]
    fn test_trim_requirements() {
        let mut body = Body::new("vehicle");
        assert_eq!(
            body.set_trimmed_conditions(TrimOrientation::new()),
            Err(ConfigurationError::MissingEnvironmentModel {
                body: "vehicle".to_string(),
                capability: Capability::AerodynamicCoefficients
            })
        );

        let mut body = Body::new("vehicle")
            .with_aerodynamic_coefficients(Box::new(ConstantCoefficients::drag_only(1.0, 1.2)));
        assert!(matches!(
            body.set_trimmed_conditions(TrimOrientation::new()),
            Err(ConfigurationError::InvalidSettings(_))
        ));

        let alpha = vec![-0.5, 0.5];
        let table = |values| CoefficientTable {
            values,
            independent_variables: vec![alpha.clone()],
        };
        let coefficients = TabulatedCoefficients::new(
            1.0,
            vec![CoefficientVariable::AngleOfAttack],
            CoefficientGrid::new(table(vec![Vector3::new(1.2, 0.0, 0.0); 2]), "forces").unwrap(),
        )
        .unwrap();
        let mut body = Body::new("vehicle").with_aerodynamic_coefficients(Box::new(coefficients));
        assert!(matches!(
            body.set_trimmed_conditions(TrimOrientation::new()),
            Err(ConfigurationError::InvalidSettings(_))
        ));

        let moments = CoefficientGrid::new(
            table(vec![Vector3::new(0.0, 0.1, 0.0), Vector3::new(0.0, -0.1, 0.0)]),
            "moments",
        )
        .unwrap();
        let coefficients = TabulatedCoefficients::new(
            1.0,
            vec![CoefficientVariable::AngleOfAttack],
            CoefficientGrid::new(table(vec![Vector3::new(1.2, 0.0, 0.0); 2]), "forces").unwrap(),
        )
        .unwrap()
        .with_moment_grid(moments)
        .unwrap();
        let mut body = Body::new("vehicle").with_aerodynamic_coefficients(Box::new(coefficients));
        assert_eq!(
            body.set_trimmed_conditions(TrimOrientation::new()),
            Err(ConfigurationError::MissingEnvironmentModel {
                body: "vehicle".to_string(),
                capability: Capability::FlightConditions
            })
        );

        body.set_flight_conditions(FlightConditions::new(BodyId::from_index(0)));
        body.set_trimmed_conditions(TrimOrientation::new()).unwrap();
        let calculator = body.flight_conditions().unwrap().angle_calculator();
        assert_eq!(calculator.source_kind(), AngleSourceKind::Trim);
    }

    #[test]
    fn test_mass_history_interpolation() {
        let mut body = Body::new("vehicle").with_mass(100.0);
        body.set_mass_history(vec![0.0, 10.0], vec![100.0, 90.0]).unwrap();

        let mass = body.mass_model().unwrap();
        assert_eq!(mass.mass_at(5.0), 95.0);
        assert_eq!(mass.mass_at(20.0), 90.0);
        assert!(body.set_mass_history(vec![0.0], vec![]).is_err());
    }
}
