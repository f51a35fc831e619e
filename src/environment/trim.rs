//! Trimmed aerodynamic angles
//!
//! The angle of attack is chosen so that the pitch moment coefficient `C_m`
//! vanishes at the current flight conditions; sideslip and bank are imposed
//! as functions of time.

use super::aero_angles::{AngleTriple, ScalarFunction};
use super::coefficients::{AerodynamicCoefficientInterface, CoefficientVariable};
use super::flight_conditions::FlightConditions;

/// Samples of `C_m` used to bracket a trim point
const BRACKET_SAMPLES: usize = 64;

/// Width of the final bisection interval, rad
const ATTACK_TOLERANCE: f64 = 1e-10;

/// Angle source solving `C_m(α) = 0` over an attack range
pub struct TrimOrientation {
    sideslip: ScalarFunction,
    bank: ScalarFunction,
    lower_attack: f64,
    upper_attack: f64,
}

impl Default for TrimOrientation {
    fn default() -> Self {
        Self::new()
    }
}

impl TrimOrientation {
    /// Zero sideslip and bank, trim searched within ±45°
    pub fn new() -> Self {
        Self {
            sideslip: Box::new(|_| 0.0),
            bank: Box::new(|_| 0.0),
            lower_attack: -std::f64::consts::FRAC_PI_4,
            upper_attack: std::f64::consts::FRAC_PI_4,
        }
    }

    pub fn with_sideslip(mut self, sideslip: ScalarFunction) -> Self {
        self.sideslip = sideslip;
        self
    }

    pub fn with_bank(mut self, bank: ScalarFunction) -> Self {
        self.bank = bank;
        self
    }

    pub fn with_attack_range(mut self, lower: f64, upper: f64) -> Self {
        self.lower_attack = lower.min(upper);
        self.upper_attack = lower.max(upper);
        self
    }

    pub fn attack_range(&self) -> (f64, f64) {
        (self.lower_attack, self.upper_attack)
    }

    /// Trimmed angles at `time`, or `None` when no trim point lies in range
    ///
    /// A statically stable trim (`C_m` decreasing through zero) is preferred
    /// over other roots.
    pub fn trimmed_angles(
        &self,
        time: f64,
        conditions: &FlightConditions,
        coefficients: &dyn AerodynamicCoefficientInterface,
    ) -> Option<AngleTriple> {
        let sideslip = (self.sideslip)(time);
        let variables = coefficients.independent_variables();
        let pitch_moment = |attack: f64| -> Option<f64> {
            let values: Vec<f64> = variables
                .iter()
                .map(|variable| match variable {
                    CoefficientVariable::AngleOfAttack => attack,
                    CoefficientVariable::AngleOfSideslip => sideslip,
                    other => conditions.coefficient_variable(*other),
                })
                .collect();
            coefficients
                .moment_coefficients_at(&values)
                .map(|moments| moments.y)
                .filter(|value| value.is_finite())
        };

        let (lower, upper) = self.bracket(&pitch_moment)?;
        let attack = bisect(&pitch_moment, lower, upper)?;
        Some(AngleTriple::new(attack, sideslip, (self.bank)(time)))
    }

    fn bracket(&self, pitch_moment: &impl Fn(f64) -> Option<f64>) -> Option<(f64, f64)> {
        let step = (self.upper_attack - self.lower_attack) / BRACKET_SAMPLES as f64;
        let mut unstable = None;
        let mut previous = (self.lower_attack, pitch_moment(self.lower_attack)?);
        for index in 1..=BRACKET_SAMPLES {
            let attack = self.lower_attack + step * index as f64;
            let value = pitch_moment(attack)?;
            let (previous_attack, previous_value) = previous;
            if previous_value == 0.0 {
                return Some((previous_attack, previous_attack));
            }
            if previous_value > 0.0 && value <= 0.0 {
                return Some((previous_attack, attack));
            }
            if previous_value < 0.0 && value >= 0.0 && unstable.is_none() {
                unstable = Some((previous_attack, attack));
            }
            previous = (attack, value);
        }
        unstable
    }
}

fn bisect(function: &impl Fn(f64) -> Option<f64>, mut lower: f64, mut upper: f64) -> Option<f64> {
    let lower_sign = function(lower)?.signum();
    while upper - lower > ATTACK_TOLERANCE {
        let middle = 0.5 * (lower + upper);
        let value = function(middle)?;
        if value == 0.0 {
            return Some(middle);
        }
        if value.signum() == lower_sign {
            lower = middle;
        } else {
            upper = middle;
        }
    }
    Some(0.5 * (lower + upper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{BodyId, CoefficientGrid, CoefficientTable, ConstantCoefficients, TabulatedCoefficients};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    /// `C_m = slope (α - trim)` tabulated over α
    fn linear_moments(trim: f64, slope: f64) -> TabulatedCoefficients {
        let alpha = vec![-0.8, 0.0, 0.8];
        let forces = CoefficientTable {
            values: vec![Vector3::new(1.2, 0.0, 0.3); 3],
            independent_variables: vec![alpha.clone()],
        };
        let moments = CoefficientTable {
            values: alpha.iter().map(|a| Vector3::new(0.0, slope * (a - trim), 0.0)).collect(),
            independent_variables: vec![alpha],
        };
        TabulatedCoefficients::new(
            1.0,
            vec![CoefficientVariable::AngleOfAttack],
            CoefficientGrid::new(forces, "forces").unwrap(),
        )
        .unwrap()
        .with_moment_grid(CoefficientGrid::new(moments, "moments").unwrap())
        .unwrap()
    }

    fn conditions() -> FlightConditions {
        FlightConditions::new(BodyId::from_index(0))
    }

    #[test]
    fn test_stable_trim_point() {
        let coefficients = linear_moments(0.2, -0.4);
        let trim = TrimOrientation::new().with_bank(Box::new(|t| 0.01 * t));

        let angles = trim.trimmed_angles(10.0, &conditions(), &coefficients).unwrap();
        assert_relative_eq!(angles.attack, 0.2, epsilon = 1e-8);
        assert_eq!(angles.sideslip, 0.0);
        assert_relative_eq!(angles.bank, 0.1);
    }

    #[test]
    fn test_unstable_root_used_without_stable_one() {
        let coefficients = linear_moments(-0.1, 0.4);
        let angles = TrimOrientation::new()
            .trimmed_angles(0.0, &conditions(), &coefficients)
            .unwrap();
        assert_relative_eq!(angles.attack, -0.1, epsilon = 1e-8);
    }

    #[test]
    fn test_trim_outside_range_is_not_found() {
        let coefficients = linear_moments(0.6, -0.4);
        let trim = TrimOrientation::new().with_attack_range(0.3, -0.3);

        assert_eq!(trim.attack_range(), (-0.3, 0.3));
        assert!(trim.trimmed_angles(0.0, &conditions(), &coefficients).is_none());
    }

    #[test]
    fn test_no_moment_data_is_not_found() {
        let coefficients = ConstantCoefficients::drag_only(1.0, 1.2);
        assert!(TrimOrientation::new()
            .trimmed_angles(0.0, &conditions(), &coefficients)
            .is_none());
    }
}
