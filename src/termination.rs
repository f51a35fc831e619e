//! Termination conditions
//!
//! Evaluated once per accepted step; composable with [`TerminationCondition::any`]
//! and [`TerminationCondition::all`].

use crate::state::{to_f64, StateScalar};
use crate::time::TimeValue;
use nalgebra::DVector;
use std::fmt;

/// Predicate on the propagated state
pub type StatePredicate<S, T> = Box<dyn Fn(T, &DVector<S>) -> bool + Send + Sync>;

/// Outcome of one termination check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationDecision {
    Continue,
    Stop,
}

impl TerminationDecision {
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

pub enum TerminationCondition<S: StateScalar, T: TimeValue> {
    /// Stop once time reaches the limit, in the direction of propagation
    TimeLimit { limit: T, forward: bool },
    /// Stop when the predicate holds
    Custom { name: String, predicate: StatePredicate<S, T> },
    /// Stop when any member says stop
    Any(Vec<TerminationCondition<S, T>>),
    /// Stop when every member says stop
    All(Vec<TerminationCondition<S, T>>),
    /// Only the step limit of the simulator ends the run
    Never,
}

impl<S: StateScalar, T: TimeValue> TerminationCondition<S, T> {
    /// Forward propagation up to `limit`
    pub fn time_limit(limit: T) -> Self {
        Self::TimeLimit { limit, forward: true }
    }

    /// Backward propagation down to `limit`
    pub fn time_limit_backward(limit: T) -> Self {
        Self::TimeLimit { limit, forward: false }
    }

    pub fn custom(name: &str, predicate: StatePredicate<S, T>) -> Self {
        Self::Custom {
            name: name.to_string(),
            predicate,
        }
    }

    /// Stop when the state component at `index` drops below `threshold`
    pub fn lower_limit(name: &str, index: usize, threshold: f64) -> Self {
        Self::custom(
            name,
            Box::new(move |_, state: &DVector<S>| state.get(index).is_some_and(|value| to_f64(*value) < threshold)),
        )
    }

    pub fn any(conditions: Vec<Self>) -> Self {
        Self::Any(conditions)
    }

    pub fn all(conditions: Vec<Self>) -> Self {
        Self::All(conditions)
    }

    /// Combine with another condition, stopping when either does
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Any(mut conditions) => {
                conditions.push(other);
                Self::Any(conditions)
            }
            condition => Self::Any(vec![condition, other]),
        }
    }

    /// Combine with another condition, stopping when both do
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::All(mut conditions) => {
                conditions.push(other);
                Self::All(conditions)
            }
            condition => Self::All(vec![condition, other]),
        }
    }

    pub fn evaluate(&self, time: T, state: &DVector<S>) -> TerminationDecision {
        let stop = match self {
            Self::TimeLimit { limit, forward } => {
                let remaining = limit.seconds_since(time);
                if *forward {
                    remaining <= 0.0
                } else {
                    remaining >= 0.0
                }
            }
            Self::Custom { predicate, .. } => predicate(time, state),
            Self::Any(conditions) => conditions.iter().any(|c| c.evaluate(time, state).is_stop()),
            // An empty conjunction never stops
            Self::All(conditions) => {
                !conditions.is_empty() && conditions.iter().all(|c| c.evaluate(time, state).is_stop())
            }
            Self::Never => false,
        };
        if stop {
            TerminationDecision::Stop
        } else {
            TerminationDecision::Continue
        }
    }

    /// Time limit in the direction of propagation, if the condition has one
    ///
    /// Used by the simulator to shorten the final step onto the limit.
    pub fn time_limit_value(&self) -> Option<T> {
        match self {
            Self::TimeLimit { limit, .. } => Some(*limit),
            Self::Any(conditions) => conditions.iter().find_map(|c| c.time_limit_value()),
            _ => None,
        }
    }
}

impl<S: StateScalar, T: TimeValue> fmt::Display for TerminationCondition<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, conditions: &[Self], separator: &str| -> fmt::Result {
            write!(f, "(")?;
            for (i, condition) in conditions.iter().enumerate() {
                if i > 0 {
                    write!(f, " {separator} ")?;
                }
                write!(f, "{condition}")?;
            }
            write!(f, ")")
        };
        match self {
            Self::TimeLimit { limit, forward: true } => write!(f, "t >= {:.3} s", limit.to_seconds()),
            Self::TimeLimit { limit, forward: false } => write!(f, "t <= {:.3} s", limit.to_seconds()),
            Self::Custom { name, .. } => write!(f, "{name}"),
            Self::Any(conditions) => join(f, conditions, "or"),
            Self::All(conditions) => join(f, conditions, "and"),
            Self::Never => write!(f, "never"),
        }
    }
}
