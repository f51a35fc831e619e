//! Solution history of a propagation run
//!
//! Append-only while the run is in progress. Time must strictly advance in
//! the direction of propagation; a non-advancing entry is rejected so the
//! history stays usable as an interpolation table.

use crate::error::PropagationError;
use crate::state::{to_f64, StateScalar};
use crate::time::TimeValue;
use nalgebra::{DVector, Vector6};

/// One accepted step
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry<S: StateScalar, T: TimeValue> {
    pub time: T,
    pub state: DVector<S>,
}

#[derive(Debug, Clone)]
pub struct SolutionHistory<S: StateScalar, T: TimeValue> {
    entries: Vec<HistoryEntry<S, T>>,
    dependent_variables: Vec<(T, DVector<f64>)>,
    /// Cumulative wall-clock seconds at each accepted step
    computation_time: Vec<(T, f64)>,
    /// Cumulative derivative evaluations at each accepted step
    function_evaluations: Vec<(T, usize)>,
}

impl<S: StateScalar, T: TimeValue> Default for SolutionHistory<S, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: StateScalar, T: TimeValue> SolutionHistory<S, T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            dependent_variables: Vec::new(),
            computation_time: Vec::new(),
            function_evaluations: Vec::new(),
        }
    }

    /// Append an accepted state
    pub fn push(&mut self, time: T, state: DVector<S>) -> Result<(), PropagationError> {
        if let Some(expected) = self.entries.first().map(|entry| entry.state.len()) {
            if state.len() != expected {
                return Err(PropagationError::StateDimensionMismatch {
                    expected,
                    found: state.len(),
                });
            }
        }
        if let [.., previous, last] = self.entries.as_slice() {
            let direction = last.time.seconds_since(previous.time).signum();
            if time.seconds_since(last.time) * direction <= 0.0 {
                return Err(self.not_advancing(time));
            }
        } else if let Some(last) = self.entries.last() {
            if time.seconds_since(last.time) == 0.0 {
                return Err(self.not_advancing(time));
            }
        }
        self.entries.push(HistoryEntry { time, state });
        Ok(())
    }

    fn not_advancing(&self, time: T) -> PropagationError {
        PropagationError::StepRejected {
            time: time.to_seconds(),
            message: "time does not advance".to_string(),
        }
    }

    pub fn push_dependent_variables(&mut self, time: T, values: DVector<f64>) {
        self.dependent_variables.push((time, values));
    }

    pub fn push_cost(&mut self, time: T, elapsed_seconds: f64, evaluations: usize) {
        self.computation_time.push((time, elapsed_seconds));
        self.function_evaluations.push((time, evaluations));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry<S, T>] {
        &self.entries
    }

    pub fn first(&self) -> Option<&HistoryEntry<S, T>> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&HistoryEntry<S, T>> {
        self.entries.last()
    }

    pub fn times(&self) -> impl Iterator<Item = T> + '_ {
        self.entries.iter().map(|entry| entry.time)
    }

    pub fn dependent_variables(&self) -> &[(T, DVector<f64>)] {
        &self.dependent_variables
    }

    pub fn computation_time(&self) -> &[(T, f64)] {
        &self.computation_time
    }

    pub fn function_evaluations(&self) -> &[(T, usize)] {
        &self.function_evaluations
    }

    /// Slice of every state as a 6-vector, starting at `offset`
    pub fn translational_history(&self, offset: usize) -> Vec<(T, Vector6<f64>)> {
        self.entries
            .iter()
            .filter(|entry| entry.state.len() >= offset + 6)
            .map(|entry| {
                let state = Vector6::from_iterator(entry.state.rows(offset, 6).iter().map(|value| to_f64(*value)));
                (entry.time, state)
            })
            .collect()
    }

    /// Single component of every state
    pub fn scalar_history(&self, index: usize) -> Vec<(T, f64)> {
        self.entries
            .iter()
            .filter_map(|entry| entry.state.get(index).map(|value| (entry.time, to_f64(*value))))
            .collect()
    }

    /// Release all stored data
    pub fn clear(&mut self) {
        self.entries = Vec::new();
        self.dependent_variables = Vec::new();
        self.computation_time = Vec::new();
        self.function_evaluations = Vec::new();
    }
}
