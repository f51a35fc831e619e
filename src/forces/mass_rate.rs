//! Mass rate models

use super::{bound, DerivativeContribution, MassRateModel};
use crate::environment::{BodyId, ScalarFunction, SystemOfBodies};
use crate::error::ConfigurationError;
use crate::forces::Engine;
use crate::time::TimeArgument;
use log::warn;
use std::sync::Arc;

/// Mass rate given as a function of time
pub struct CustomMassRate {
    body: String,
    rate: ScalarFunction,
    current: f64,
}

impl CustomMassRate {
    pub fn new(body: &str, rate: ScalarFunction) -> Self {
        Self {
            body: body.to_string(),
            rate,
            current: 0.0,
        }
    }

    pub fn constant(body: &str, rate: f64) -> Self {
        Self::new(body, Box::new(move |_| rate))
    }
}

impl DerivativeContribution for CustomMassRate {
    fn name(&self) -> &'static str {
        "Custom Mass Rate"
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn bind(&mut self, bodies: &SystemOfBodies) -> Result<(), ConfigurationError> {
        bodies.id(&self.body).map(|_| ())
    }

    fn update_members(&mut self, _bodies: &SystemOfBodies, time: TimeArgument) -> Result<(), ConfigurationError> {
        self.current = (self.rate)(time.seconds());
        Ok(())
    }
}

impl MassRateModel for CustomMassRate {
    fn derivative_contribution(&self) -> f64 {
        self.current
    }
}

/// Propellant consumption of all engines of a body
pub struct FromThrustMassRate {
    body: String,
    id: Option<BodyId>,
    engines: Vec<Arc<Engine>>,
}

impl FromThrustMassRate {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            id: None,
            engines: Vec::new(),
        }
    }
}

impl DerivativeContribution for FromThrustMassRate {
    fn name(&self) -> &'static str {
        "Mass Rate From Thrust"
    }

    fn body(&self) -> &str {
        &self.body
    }

    fn bind(&mut self, bodies: &SystemOfBodies) -> Result<(), ConfigurationError> {
        let id = bodies.id(&self.body)?;
        self.engines = bodies.get(id)?.engines().to_vec();
        if self.engines.is_empty() {
            warn!("{} has no engines, its mass rate from thrust is zero", self.body);
        }
        self.id = Some(id);
        Ok(())
    }

    fn update_members(&mut self, _bodies: &SystemOfBodies, _time: TimeArgument) -> Result<(), ConfigurationError> {
        bound(self.id, self.name(), &self.body).map(|_| ())
    }
}

impl MassRateModel for FromThrustMassRate {
    fn derivative_contribution(&self) -> f64 {
        -self.engines.iter().map(|engine| engine.mass_rate()).sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Body;
    use approx::assert_relative_eq;

    #[test]
    fn test_custom_rate_follows_time() {
        let mut bodies = SystemOfBodies::new();
        bodies.add_body(Body::new("vehicle")).unwrap();

        let mut rate = CustomMassRate::new("vehicle", Box::new(|t| -0.5 - 0.01 * t));
        rate.bind(&bodies).unwrap();
        rate.update_members(&bodies, TimeArgument::Seconds(100.0)).unwrap();
        assert_relative_eq!(rate.derivative_contribution(), -1.5);
    }

    #[test]
    fn test_thrust_rate_sums_engines() {
        let mut bodies = SystemOfBodies::new();
        bodies
            .add_body(
                Body::new("vehicle")
                    .with_engine(Engine::new("a", 3000.0, 300.0))
                    .with_engine(Engine::new("b", 1000.0, 250.0)),
            )
            .unwrap();

        let mut rate = FromThrustMassRate::new("vehicle");
        rate.bind(&bodies).unwrap();
        rate.update_members(&bodies, TimeArgument::Seconds(0.0)).unwrap();

        let expected = -(3000.0 / (300.0 * 9.80665) + 1000.0 / (250.0 * 9.80665));
        assert_relative_eq!(rate.derivative_contribution(), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_no_engines_gives_zero() {
        let mut bodies = SystemOfBodies::new();
        bodies.add_body(Body::new("glider")).unwrap();

        let mut rate = FromThrustMassRate::new("glider");
        rate.bind(&bodies).unwrap();
        assert_eq!(rate.derivative_contribution(), 0.0);
    }
}
