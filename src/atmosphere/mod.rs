//! Atmospheric models consumed by flight conditions
//!
//! An atmosphere is attached to a central body and queried in that body's
//! fixed frame, by altitude, longitude, latitude and time.
//!
//! # Implemented Models
//!
//! - **Exponential**: single scale-height decay with an isothermal temperature

mod exponential;

pub use exponential::Exponential;

/// Output from an atmosphere model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtmosphereDensity {
    /// Total atmospheric mass density in kg/m³
    pub rho: f64,

    /// Local temperature in Kelvin (if available)
    pub temperature: Option<f64>,

    /// Local speed of sound in m/s (if available)
    pub speed_of_sound: Option<f64>,
}

impl AtmosphereDensity {
    /// Create a density-only result
    pub fn new(rho: f64) -> Self {
        Self {
            rho,
            temperature: None,
            speed_of_sound: None,
        }
    }

    /// Create with full output
    pub fn full(rho: f64, temperature: f64, speed_of_sound: f64) -> Self {
        Self {
            rho,
            temperature: Some(temperature),
            speed_of_sound: Some(speed_of_sound),
        }
    }

    /// Zero density (for altitudes above atmosphere)
    pub fn zero() -> Self {
        Self::new(0.0)
    }
}

/// Trait for atmospheric models
pub trait AtmosphereModel: Send + Sync {
    /// Atmospheric properties at a point of the central body
    ///
    /// # Arguments
    ///
    /// * `altitude` - Altitude above the body's shape, meters
    /// * `longitude`, `latitude` - Body-fixed spherical coordinates, radians
    /// * `time` - Seconds since J2000
    fn density(&self, altitude: f64, longitude: f64, latitude: f64, time: f64) -> AtmosphereDensity;

    /// Model name for logging and display
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        "Atmospheric density model"
    }
}

impl AtmosphereModel for Box<dyn AtmosphereModel> {
    fn density(&self, altitude: f64, longitude: f64, latitude: f64, time: f64) -> AtmosphereDensity {
        self.as_ref().density(altitude, longitude, latitude, time)
    }

    fn name(&self) -> &'static str {
        self.as_ref().name()
    }

    fn description(&self) -> &'static str {
        self.as_ref().description()
    }
}
