//! Global state vector layout
//!
//! The integrator sees one flat vector. A [`StateLayout`] records which slice
//! of that vector belongs to which body and which kind of state:
//!
//! - translational: position and velocity relative to a central body (6)
//! - mass (1)
//! - angular velocity in the body-fixed frame (3)

use crate::environment::BodyId;
use crate::error::PropagationError;
use nalgebra::{DVector, RealField, Vector3, Vector6};

/// Scalar type of the propagated state
///
/// Environment models always work in `f64`; conversion happens at the
/// state-vector boundary only, through [`from_f64`] and [`to_f64`].
pub trait StateScalar: RealField + Copy {}

impl StateScalar for f64 {}

impl StateScalar for f32 {}

/// State scalar nearest to an `f64`
pub fn from_f64<S: StateScalar>(value: f64) -> S {
    nalgebra::convert(value)
}

/// `f64` value of a state scalar
pub fn to_f64<S: StateScalar>(value: S) -> f64 {
    nalgebra::try_convert(value).unwrap_or(f64::NAN)
}

/// Integrated state of one propagation run
pub type GlobalState<S> = DVector<S>;

/// Kind of state held by a block of the global state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateBlockKind {
    Translational,
    Mass,
    AngularVelocity,
}

impl StateBlockKind {
    pub fn size(&self) -> usize {
        match self {
            Self::Translational => 6,
            Self::Mass => 1,
            Self::AngularVelocity => 3,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Translational => "translational",
            Self::Mass => "mass",
            Self::AngularVelocity => "angular velocity",
        }
    }
}

/// One contiguous slice of the global state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateBlock {
    pub kind: StateBlockKind,
    pub body: BodyId,
    /// Origin of a translational block
    pub central_body: Option<BodyId>,
    pub offset: usize,
}

impl StateBlock {
    pub fn size(&self) -> usize {
        self.kind.size()
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.size()
    }
}

/// Ordered description of the global state vector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateLayout {
    blocks: Vec<StateBlock>,
    size: usize,
}

impl StateLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block; returns its offset
    pub fn push(&mut self, kind: StateBlockKind, body: BodyId, central_body: Option<BodyId>) -> usize {
        let offset = self.size;
        self.blocks.push(StateBlock {
            kind,
            body,
            central_body,
            offset,
        });
        self.size += kind.size();
        offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn blocks(&self) -> &[StateBlock] {
        &self.blocks
    }

    pub fn block(&self, kind: StateBlockKind, body: BodyId) -> Option<&StateBlock> {
        self.blocks
            .iter()
            .find(|block| block.kind == kind && block.body == body)
    }

    pub fn contains(&self, kind: StateBlockKind, body: BodyId) -> bool {
        self.block(kind, body).is_some()
    }

    pub fn check<S: StateScalar>(&self, state: &DVector<S>) -> Result<(), PropagationError> {
        if state.len() != self.size {
            return Err(PropagationError::StateDimensionMismatch {
                expected: self.size,
                found: state.len(),
            });
        }
        Ok(())
    }

    /// Relative position and velocity of a translational block, in `f64`
    pub fn translational<S: StateScalar>(&self, state: &DVector<S>, block: &StateBlock) -> Vector6<f64> {
        let o = block.offset;
        Vector6::from_fn(|i, _| to_f64(state[o + i]))
    }

    pub fn scalar<S: StateScalar>(&self, state: &DVector<S>, block: &StateBlock) -> f64 {
        to_f64(state[block.offset])
    }

    pub fn vector3<S: StateScalar>(&self, state: &DVector<S>, block: &StateBlock) -> Vector3<f64> {
        let o = block.offset;
        Vector3::new(to_f64(state[o]), to_f64(state[o + 1]), to_f64(state[o + 2]))
    }
}

// Physical constants
/// Earth's gravitational parameter (GM) in m³/s²
pub const MU_EARTH: f64 = 3.986004418e14;

/// Earth's mean equatorial radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Earth's rotation rate in rad/s
pub const OMEGA_EARTH: f64 = 7.2921150e-5;

/// Standard gravity for specific impulse conversion, m/s²
pub const STANDARD_GRAVITY: f64 = 9.80665;
