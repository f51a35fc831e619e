//! Atmospheric flight conditions of a vehicle relative to its central body

use super::aero_angles::{fallback_trajectory_frame, trajectory_frame, AerodynamicAngleCalculator};
use super::body::{BodyId, SystemOfBodies};
use super::coefficients::CoefficientVariable;
use super::ephemeris::split;
use super::rotation::RotationState;
use super::shape::{latitude_longitude, ShapeModel};
use crate::atmosphere::AtmosphereModel;
use crate::error::{Capability, ConfigurationError};
use nalgebra::{Vector3, Vector6};

/// Altitude, airspeed, atmosphere and trajectory frame at the current step
pub struct FlightConditions {
    central_body: BodyId,
    angle_calculator: AerodynamicAngleCalculator,
    altitude: f64,
    latitude: f64,
    longitude: f64,
    density: f64,
    speed_of_sound: Option<f64>,
    airspeed: f64,
    body_fixed_state: Vector6<f64>,
    time: f64,
    warned_undefined_derivative: bool,
}

impl FlightConditions {
    pub fn new(central_body: BodyId) -> Self {
        Self {
            central_body,
            angle_calculator: AerodynamicAngleCalculator::new(),
            altitude: f64::NAN,
            latitude: 0.0,
            longitude: 0.0,
            density: 0.0,
            speed_of_sound: None,
            airspeed: 0.0,
            body_fixed_state: Vector6::zeros(),
            time: f64::NAN,
            warned_undefined_derivative: false,
        }
    }

    pub fn central_body(&self) -> BodyId {
        self.central_body
    }

    pub fn angle_calculator(&self) -> &AerodynamicAngleCalculator {
        &self.angle_calculator
    }

    pub fn angle_calculator_mut(&mut self) -> &mut AerodynamicAngleCalculator {
        &mut self.angle_calculator
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn speed_of_sound(&self) -> Option<f64> {
        self.speed_of_sound
    }

    pub fn airspeed(&self) -> f64 {
        self.airspeed
    }

    /// `None` when the atmosphere provides no speed of sound
    pub fn mach_number(&self) -> Option<f64> {
        self.speed_of_sound
            .filter(|&sound| sound > 0.0)
            .map(|sound| self.airspeed / sound)
    }

    pub fn dynamic_pressure(&self) -> f64 {
        0.5 * self.density * self.airspeed * self.airspeed
    }

    /// Position and airspeed velocity in the central body's fixed frame
    pub fn body_fixed_state(&self) -> &Vector6<f64> {
        &self.body_fixed_state
    }

    pub fn airspeed_velocity(&self) -> Vector3<f64> {
        self.body_fixed_state.fixed_rows::<3>(3).into_owned()
    }

    /// Value of a coefficient independent variable at the current step
    pub fn coefficient_variable(&self, variable: CoefficientVariable) -> f64 {
        let angles = self.angle_calculator.current_angles();
        match variable {
            CoefficientVariable::MachNumber => self.mach_number().unwrap_or(f64::NAN),
            CoefficientVariable::AngleOfAttack => angles.attack,
            CoefficientVariable::AngleOfSideslip => angles.sideslip,
            CoefficientVariable::Altitude => self.altitude,
            CoefficientVariable::Time => self.time,
        }
    }

    /// Refresh from the vehicle state and the central body's current snapshot
    ///
    /// Both states are inertial. With an undefined rotation derivative the
    /// transport term of the airspeed velocity is dropped.
    pub(crate) fn update(
        &mut self,
        time: f64,
        vehicle_state: &Vector6<f64>,
        central_state: &Vector6<f64>,
        central_rotation: &RotationState,
        atmosphere: &dyn AtmosphereModel,
        shape: &dyn ShapeModel,
    ) {
        let (position, velocity) = split(&(vehicle_state - central_state));
        let to_fixed = central_rotation.matrix_to_target();

        let fixed_position = to_fixed * position;
        let fixed_velocity = match central_rotation.derivative_to_target {
            Some(derivative) => to_fixed * velocity + derivative * position,
            None => {
                if !self.warned_undefined_derivative {
                    log::warn!(
                        "Central body rotation has no derivative; airspeed ignores frame rotation"
                    );
                    self.warned_undefined_derivative = true;
                }
                to_fixed * velocity
            }
        };

        self.time = time;
        self.altitude = shape.altitude(&fixed_position);
        let (latitude, longitude) = latitude_longitude(&fixed_position);
        self.latitude = latitude;
        self.longitude = longitude;

        let atmosphere = atmosphere.density(self.altitude, longitude, latitude, time);
        self.density = atmosphere.rho;
        self.speed_of_sound = atmosphere.speed_of_sound;
        self.airspeed = fixed_velocity.norm();
        self.body_fixed_state = super::ephemeris::join(&fixed_position, &fixed_velocity);

        let trajectory_to_fixed = trajectory_frame(&fixed_position, &fixed_velocity).unwrap_or_else(|| {
            log::debug!("Airspeed zero or radial at t = {time} s; using the fallback trajectory frame");
            fallback_trajectory_frame(&fixed_velocity)
        });
        self.angle_calculator
            .set_trajectory_to_inertial(to_fixed.transpose() * trajectory_to_fixed);
    }
}

/// Create flight conditions for `vehicle` flying through `central`'s atmosphere
///
/// Checks, in order: central atmosphere, central shape, central rotation and
/// vehicle aerodynamic coefficients.
pub fn create_flight_conditions(
    bodies: &SystemOfBodies,
    vehicle: BodyId,
    central: BodyId,
) -> Result<FlightConditions, ConfigurationError> {
    let central_body = bodies.get(central)?;
    let vehicle_body = bodies.get(vehicle)?;

    let missing = |body: &str, capability| ConfigurationError::MissingEnvironmentModel {
        body: body.to_string(),
        capability,
    };

    if central_body.atmosphere().is_none() {
        return Err(missing(central_body.name(), Capability::Atmosphere));
    }
    if central_body.shape().is_none() {
        return Err(missing(central_body.name(), Capability::Shape));
    }
    if central_body.rotation().is_none() {
        return Err(missing(central_body.name(), Capability::Rotation));
    }
    if vehicle_body.aerodynamic_coefficients().is_none() {
        return Err(missing(vehicle_body.name(), Capability::AerodynamicCoefficients));
    }

    log::debug!(
        "Creating flight conditions for {} relative to {}",
        vehicle_body.name(),
        central_body.name()
    );
    Ok(FlightConditions::new(central))
}
