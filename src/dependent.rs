//! Dependent variables
//!
//! Quantities derived from the environment that are saved alongside the
//! propagated state after every accepted step. Each variable names the
//! environment nodes it reads so that the updater refreshes them.

use crate::environment::{EnvironmentNode, SystemOfBodies};
use crate::error::{Capability, ConfigurationError};
use crate::forces::Requirement;
use nalgebra::DVector;

#[derive(Debug, Clone, PartialEq)]
pub enum DependentVariable {
    /// Altitude above the central body's shape (m)
    Altitude(String),
    /// Airspeed relative to the central body's atmosphere (m/s)
    Airspeed(String),
    /// Mach number; NaN when the atmosphere provides no speed of sound
    MachNumber(String),
    /// Dynamic pressure (Pa)
    DynamicPressure(String),
    /// Local atmospheric density (kg/m³)
    Density(String),
    /// Angle of attack, sideslip and bank (rad)
    AerodynamicAngles(String),
    /// Current mass (kg)
    Mass(String),
    /// Position relative to another body, inertial axes (m)
    RelativePosition { body: String, relative_to: String },
    /// Velocity relative to another body, inertial axes (m/s)
    RelativeVelocity { body: String, relative_to: String },
    /// Angular velocity in the body-fixed frame (rad/s)
    AngularVelocity(String),
}

impl DependentVariable {
    /// Number of scalar entries
    pub fn size(&self) -> usize {
        match self {
            Self::AerodynamicAngles(_)
            | Self::RelativePosition { .. }
            | Self::RelativeVelocity { .. }
            | Self::AngularVelocity(_) => 3,
            _ => 1,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Altitude(body)
            | Self::Airspeed(body)
            | Self::MachNumber(body)
            | Self::DynamicPressure(body)
            | Self::Density(body)
            | Self::AerodynamicAngles(body)
            | Self::Mass(body)
            | Self::AngularVelocity(body)
            | Self::RelativePosition { body, .. }
            | Self::RelativeVelocity { body, .. } => body,
        }
    }

    pub fn name(&self) -> String {
        let what = match self {
            Self::Altitude(_) => "altitude",
            Self::Airspeed(_) => "airspeed",
            Self::MachNumber(_) => "Mach number",
            Self::DynamicPressure(_) => "dynamic pressure",
            Self::Density(_) => "density",
            Self::AerodynamicAngles(_) => "aerodynamic angles",
            Self::Mass(_) => "mass",
            Self::AngularVelocity(_) => "body-fixed angular velocity",
            Self::RelativePosition { relative_to, .. } => {
                return format!("position of {} w.r.t. {relative_to}", self.body());
            }
            Self::RelativeVelocity { relative_to, .. } => {
                return format!("velocity of {} w.r.t. {relative_to}", self.body());
            }
        };
        format!("{what} of {}", self.body())
    }

    fn uses_flight_conditions(&self) -> bool {
        matches!(
            self,
            Self::Altitude(_)
                | Self::Airspeed(_)
                | Self::MachNumber(_)
                | Self::DynamicPressure(_)
                | Self::Density(_)
                | Self::AerodynamicAngles(_)
        )
    }

    pub fn requirements(&self) -> Vec<Requirement> {
        match self {
            _ if self.uses_flight_conditions() => vec![Requirement::new(self.body(), Capability::FlightConditions)],
            Self::Mass(body) => vec![Requirement::new(body, Capability::Mass)],
            _ => Vec::new(),
        }
    }

    /// Environment nodes read by [`evaluate`](Self::evaluate)
    pub fn environment_dependencies(&self, bodies: &SystemOfBodies) -> Result<Vec<EnvironmentNode>, ConfigurationError> {
        let id = bodies.id(self.body())?;
        Ok(match self {
            Self::AerodynamicAngles(_) => vec![
                EnvironmentNode::FlightConditions(id),
                EnvironmentNode::AerodynamicAngles(id),
            ],
            _ if self.uses_flight_conditions() => vec![EnvironmentNode::FlightConditions(id)],
            Self::Mass(_) => vec![EnvironmentNode::Mass(id)],
            Self::AngularVelocity(_) => vec![EnvironmentNode::AngularVelocity(id)],
            Self::RelativePosition { relative_to, .. } | Self::RelativeVelocity { relative_to, .. } => vec![
                EnvironmentNode::TranslationalState(id),
                EnvironmentNode::TranslationalState(bodies.id(relative_to)?),
            ],
            _ => Vec::new(),
        })
    }

    /// Write the current value into `out`, which has [`size`](Self::size) entries
    pub fn evaluate(&self, bodies: &SystemOfBodies, out: &mut [f64]) -> Result<(), ConfigurationError> {
        let body = bodies.body(self.body())?;
        let conditions = || {
            body.flight_conditions()
                .ok_or_else(|| ConfigurationError::MissingEnvironmentModel {
                    body: body.name().to_string(),
                    capability: Capability::FlightConditions,
                })
        };
        let relative = |relative_to: &str| -> Result<_, ConfigurationError> {
            Ok(body.current_state() - bodies.body(relative_to)?.current_state())
        };

        match self {
            Self::Altitude(_) => out[0] = conditions()?.altitude(),
            Self::Airspeed(_) => out[0] = conditions()?.airspeed(),
            Self::MachNumber(_) => out[0] = conditions()?.mach_number().unwrap_or(f64::NAN),
            Self::DynamicPressure(_) => out[0] = conditions()?.dynamic_pressure(),
            Self::Density(_) => out[0] = conditions()?.density(),
            Self::AerodynamicAngles(_) => {
                let angles = conditions()?.angle_calculator().current_angles();
                out.copy_from_slice(angles.as_vector().as_slice());
            }
            Self::Mass(_) => {
                out[0] = body.current_mass().ok_or_else(|| ConfigurationError::MissingEnvironmentModel {
                    body: body.name().to_string(),
                    capability: Capability::Mass,
                })?
            }
            Self::AngularVelocity(_) => out.copy_from_slice(body.current_angular_velocity().as_slice()),
            Self::RelativePosition { relative_to, .. } => {
                let state = relative(relative_to)?;
                out.copy_from_slice(&[state[0], state[1], state[2]]);
            }
            Self::RelativeVelocity { relative_to, .. } => {
                let state = relative(relative_to)?;
                out.copy_from_slice(&[state[3], state[4], state[5]]);
            }
        }
        Ok(())
    }
}

/// Evaluate a list of dependent variables into one vector
pub fn evaluate_all(variables: &[DependentVariable], bodies: &SystemOfBodies) -> Result<DVector<f64>, ConfigurationError> {
    let mut values = DVector::zeros(variables.iter().map(DependentVariable::size).sum());
    let mut offset = 0;
    for variable in variables {
        let size = variable.size();
        variable.evaluate(bodies, &mut values.as_mut_slice()[offset..offset + size])?;
        offset += size;
    }
    Ok(values)
}
