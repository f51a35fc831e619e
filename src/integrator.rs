//! Numerical integrators
//!
//! This module provides a trait-based abstraction for numerical integration,
//! so the orchestrator can drive any stepping scheme over any state scalar and
//! time representation.
//!
//! # Available Integrators
//!
//! - **RungeKutta4**: classic RK4, fixed step or adaptive via step doubling
//! - **Euler**: forward Euler, fixed step (testing and reference only)

use crate::error::PropagationError;
use crate::state::{from_f64, to_f64, StateScalar};
use crate::time::TimeValue;
use log::warn;
use nalgebra::DVector;

/// Derivative function handed to an integrator: `(t, y) -> dy/dt`
pub type DerivativeFunction<'a, S, T> = dyn FnMut(T, &DVector<S>) -> Result<DVector<S>, PropagationError> + 'a;

/// Result of a single integration step
#[derive(Debug, Clone)]
pub struct StepResult<S: StateScalar, T: TimeValue> {
    /// Time at the end of the step
    pub time: T,

    /// New state after the step
    pub state: DVector<S>,

    /// Whether step was successful
    pub succeeded: bool,

    /// Actual step size used (for adaptive methods)
    pub step_size: f64,

    /// Estimated local truncation error (if available)
    pub error_estimate: Option<f64>,

    /// Derivative evaluations spent on this step
    pub function_evaluations: usize,
}

/// Trait for numerical integrators
///
/// `step` returns `Err` only when the derivative function itself fails. A
/// step the scheme cannot accept is reported with `succeeded = false`.
pub trait Integrator<S: StateScalar, T: TimeValue>: Send {
    /// Take a single integration step
    fn step(
        &mut self,
        derivative: &mut DerivativeFunction<'_, S, T>,
        time: T,
        state: &DVector<S>,
    ) -> Result<StepResult<S, T>, PropagationError>;

    /// Integrator name
    fn name(&self) -> &'static str;

    /// Integrator order (for error estimation)
    fn order(&self) -> u8;

    /// Step size the next call will attempt
    fn current_step_size(&self) -> f64;

    /// Override the step size of the next call
    fn set_step_size(&mut self, step_size: f64);
}

/// Largest absolute component difference, infinite if anything is non-finite
fn max_abs_difference<S: StateScalar>(a: &DVector<S>, b: &DVector<S>) -> f64 {
    a.iter().zip(b.iter()).fold(0.0, |acc: f64, (x, y)| {
        let diff = (to_f64(*x) - to_f64(*y)).abs();
        if diff.is_finite() {
            acc.max(diff)
        } else {
            f64::INFINITY
        }
    })
}

fn is_finite<S: StateScalar>(state: &DVector<S>) -> bool {
    state.iter().all(|value| to_f64(*value).is_finite())
}

/// Runge-Kutta 4 integrator with optional adaptive stepping via step doubling
#[derive(Debug, Clone)]
pub struct RungeKutta4 {
    /// Step size for the next step (seconds)
    pub step_size: f64,

    /// Error tolerance; `None` for fixed-step integration
    pub tolerance: Option<f64>,

    /// Minimum allowed step size (seconds)
    pub min_step: f64,

    /// Maximum allowed step size (seconds)
    pub max_step: f64,

    /// Safety factor for step size adjustment
    pub safety: f64,

    /// Maximum step growth factor
    pub max_growth: f64,

    /// Maximum step shrink factor
    pub max_shrink: f64,
}

impl RungeKutta4 {
    /// Fixed step RK4
    pub fn fixed(step_size: f64) -> Self {
        Self {
            step_size,
            tolerance: None,
            min_step: step_size,
            max_step: step_size,
            safety: 0.9,
            max_growth: 5.0,
            max_shrink: 0.2,
        }
    }

    /// Adaptive RK4 with default limits
    pub fn adaptive(initial_step: f64, tolerance: f64) -> Self {
        Self {
            step_size: initial_step,
            tolerance: Some(tolerance),
            min_step: 0.1,   // 0.1 seconds
            max_step: 300.0, // 5 minutes
            safety: 0.9,     // 90% of optimal step
            max_growth: 5.0, // Max 5x step increase
            max_shrink: 0.2, // Min 1/5 step decrease
        }
    }

    /// Create with custom step limits
    pub fn with_limits(mut self, min_step: f64, max_step: f64) -> Self {
        self.min_step = min_step;
        self.max_step = max_step;
        self
    }

    /// RK4 step
    fn rk4_step<S: StateScalar, T: TimeValue>(
        derivative: &mut DerivativeFunction<'_, S, T>,
        time: T,
        state: &DVector<S>,
        dt: f64,
    ) -> Result<DVector<S>, PropagationError> {
        let half = from_f64::<S>(dt / 2.0);
        let full = from_f64::<S>(dt);
        let mid_time = time.add_seconds(dt / 2.0);

        let k1 = derivative(time, state)?;
        let k2 = derivative(mid_time, &(state + &k1 * half))?;
        let k3 = derivative(mid_time, &(state + &k2 * half))?;
        let k4 = derivative(time.add_seconds(dt), &(state + &k3 * full))?;

        let two = from_f64::<S>(2.0);
        let increment = (k1 + k2 * two + k3 * two + k4) * from_f64::<S>(dt / 6.0);
        Ok(state + increment)
    }
}

impl<S: StateScalar, T: TimeValue> Integrator<S, T> for RungeKutta4 {
    fn step(
        &mut self,
        derivative: &mut DerivativeFunction<'_, S, T>,
        time: T,
        state: &DVector<S>,
    ) -> Result<StepResult<S, T>, PropagationError> {
        let Some(tolerance) = self.tolerance else {
            let h = self.step_size;
            let new_state = Self::rk4_step(derivative, time, state, h)?;
            return Ok(StepResult {
                time: time.add_seconds(h),
                succeeded: is_finite(&new_state),
                state: new_state,
                step_size: h,
                error_estimate: None,
                function_evaluations: 4,
            });
        };

        // Limits bound the magnitude; the sign sets the direction of integration
        let direction = self.step_size.signum();
        let mut h = direction * self.step_size.abs().min(self.max_step);
        let mut evaluations = 0;

        loop {
            // Take one full step
            let y_full = Self::rk4_step(derivative, time, state, h)?;

            // Take two half steps
            let y_half1 = Self::rk4_step(derivative, time, state, h / 2.0)?;
            let y_half2 = Self::rk4_step(derivative, time.add_seconds(h / 2.0), &y_half1, h / 2.0)?;
            evaluations += 12;

            // Estimate error (difference between methods)
            let error = max_abs_difference(&y_full, &y_half2);

            if !error.is_finite() {
                return Ok(StepResult {
                    time,
                    state: state.clone(),
                    succeeded: false,
                    step_size: h,
                    error_estimate: None,
                    function_evaluations: evaluations,
                });
            }

            if error < tolerance || h.abs() <= self.min_step {
                if error >= tolerance {
                    warn!("RK4 step accepted at minimum step {h} s with error {error:.3e}");
                }

                // Accept step, use Richardson extrapolation for better accuracy
                let extrapolated = (&y_half2 * from_f64::<S>(16.0) - y_full) / from_f64::<S>(15.0);

                let growth = if error > 0.0 {
                    (self.safety * (tolerance / error).powf(0.2)).clamp(1.0, self.max_growth)
                } else {
                    self.max_growth
                };
                self.step_size = direction * (h.abs() * growth).min(self.max_step);

                return Ok(StepResult {
                    time: time.add_seconds(h),
                    state: extrapolated,
                    succeeded: true,
                    step_size: h,
                    error_estimate: Some(error),
                    function_evaluations: evaluations,
                });
            }

            // Reduce step size
            let factor = self.safety * (tolerance / error).powf(0.2);
            h = direction * (h.abs() * factor.clamp(self.max_shrink, 1.0)).max(self.min_step);
        }
    }

    fn name(&self) -> &'static str {
        match self.tolerance {
            None => "RK4 (fixed step)",
            Some(_) => "RK4 (adaptive)",
        }
    }

    fn order(&self) -> u8 {
        4
    }

    fn current_step_size(&self) -> f64 {
        self.step_size
    }

    fn set_step_size(&mut self, step_size: f64) {
        self.step_size = step_size;
    }
}

/// Forward Euler integrator
#[derive(Debug, Clone)]
pub struct Euler {
    pub step_size: f64,
}

impl Euler {
    pub fn new(step_size: f64) -> Self {
        Self { step_size }
    }
}

impl<S: StateScalar, T: TimeValue> Integrator<S, T> for Euler {
    fn step(
        &mut self,
        derivative: &mut DerivativeFunction<'_, S, T>,
        time: T,
        state: &DVector<S>,
    ) -> Result<StepResult<S, T>, PropagationError> {
        let h = self.step_size;
        let new_state = state + derivative(time, state)? * from_f64::<S>(h);
        Ok(StepResult {
            time: time.add_seconds(h),
            succeeded: is_finite(&new_state),
            state: new_state,
            step_size: h,
            error_estimate: None,
            function_evaluations: 1,
        })
    }

    fn name(&self) -> &'static str {
        "Euler"
    }

    fn order(&self) -> u8 {
        1
    }

    fn current_step_size(&self) -> f64 {
        self.step_size
    }

    fn set_step_size(&mut self, step_size: f64) {
        self.step_size = step_size;
    }
}
