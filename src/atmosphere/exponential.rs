//! Exponential atmospheric density model
//!
//! The simplest atmosphere model, using an exponential density decay
//! with a single scale height and an isothermal temperature profile.

use super::{AtmosphereDensity, AtmosphereModel};

/// Ratio of specific heats for air
const HEAT_CAPACITY_RATIO: f64 = 1.4;

/// Specific gas constant for air, J/(kg K)
const SPECIFIC_GAS_CONSTANT: f64 = 287.058;

/// Exponential atmosphere model
///
/// Uses a simple exponential decay: ρ(h) = ρ₀ × exp(-h / H)
///
/// This is the fastest model but least accurate, as it doesn't account for:
/// - Temperature variations
/// - Day/night differences
/// - Solar activity effects
#[derive(Debug, Clone)]
pub struct Exponential {
    /// Reference density at zero altitude (kg/m³)
    pub rho0: f64,

    /// Scale height (meters)
    pub scale_height: f64,

    /// Maximum altitude for non-zero density (meters)
    pub max_altitude: f64,

    /// Constant temperature (Kelvin)
    pub temperature: f64,
}

impl Default for Exponential {
    fn default() -> Self {
        Self::standard()
    }
}

impl Exponential {
    /// Standard Earth atmosphere parameters
    pub fn standard() -> Self {
        Self {
            rho0: 1.225,               // kg/m³ at sea level
            scale_height: 7200.0,      // ~7.2 km, isothermal fit
            max_altitude: 1_000_000.0, // 1000 km
            temperature: 246.0,
        }
    }

    /// Create with custom parameters
    pub fn new(rho0: f64, scale_height: f64, max_altitude: f64) -> Self {
        Self {
            rho0,
            scale_height,
            max_altitude,
            ..Self::standard()
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn speed_of_sound(&self) -> f64 {
        (HEAT_CAPACITY_RATIO * SPECIFIC_GAS_CONSTANT * self.temperature).sqrt()
    }
}

impl AtmosphereModel for Exponential {
    fn density(&self, altitude: f64, _longitude: f64, _latitude: f64, _time: f64) -> AtmosphereDensity {
        if altitude > self.max_altitude {
            return AtmosphereDensity::full(0.0, self.temperature, self.speed_of_sound());
        }

        // Below the surface the reference density is held
        let rho = self.rho0 * (-altitude.max(0.0) / self.scale_height).exp();

        AtmosphereDensity::full(rho, self.temperature, self.speed_of_sound())
    }

    fn name(&self) -> &'static str {
        "Exponential"
    }

    fn description(&self) -> &'static str {
        "Simple exponential density decay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exponential_sea_level() {
        let model = Exponential::standard();

        let density = model.density(0.0, 0.0, 0.0, 0.0);
        assert!((density.rho - 1.225).abs() < 0.001);
        assert_eq!(model.density(-50.0, 0.0, 0.0, 0.0).rho, 1.225);
    }

    #[test]
    fn test_exponential_one_scale_height() {
        let model = Exponential::new(1.225, 8500.0, 1_000_000.0);

        // At one scale height, density should be ~37% of surface (1/e)
        let density = model.density(8500.0, 0.3, -0.2, 100.0);

        let expected = 1.225 * (-1.0_f64).exp();
        assert_relative_eq!(density.rho, expected, max_relative = 1e-12);
    }

    #[test]
    fn test_exponential_above_cutoff() {
        let model = Exponential::new(1.225, 8500.0, 500_000.0);
        let density = model.density(600_000.0, 0.0, 0.0, 0.0);

        assert_eq!(density.rho, 0.0);
        assert!(density.speed_of_sound.is_some());
    }

    #[test]
    fn test_speed_of_sound() {
        let model = Exponential::standard().with_temperature(288.15);
        assert_relative_eq!(model.speed_of_sound(), 340.3, max_relative = 1e-3);
    }
}
