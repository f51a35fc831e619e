//! Aerodynamic angles and the frames they relate
//!
//! Frames used here:
//!
//! - **inertial**: global propagation frame
//! - **trajectory**: x along the airspeed velocity, z towards the central
//!   body (perpendicular to x), y completing the right-handed set
//! - **aerodynamic**: trajectory frame rolled by the bank angle σ
//! - **body**: aerodynamic frame rotated by sideslip β and attack α
//!
//! The rotation from the trajectory frame to the body frame is
//! `C_BT = R_y(α) · R_z(-β) · R_x(σ)` with passive elementary rotations.

use super::trim::TrimOrientation;
use crate::time::Time;
use nalgebra::{Matrix3, Vector3};

/// Angle of attack, sideslip and bank angle, in radians
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AngleTriple {
    pub attack: f64,
    pub sideslip: f64,
    pub bank: f64,
}

impl AngleTriple {
    pub fn new(attack: f64, sideslip: f64, bank: f64) -> Self {
        Self {
            attack,
            sideslip,
            bank,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.attack, self.sideslip, self.bank)
    }

    pub fn is_finite(&self) -> bool {
        self.attack.is_finite() && self.sideslip.is_finite() && self.bank.is_finite()
    }
}

/// Angle triple as a function of seconds since J2000
pub type AngleFunction = Box<dyn Fn(f64) -> AngleTriple + Send + Sync>;

/// Single angle as a function of seconds since J2000
pub type ScalarFunction = Box<dyn Fn(f64) -> f64 + Send + Sync>;

/// Passive rotation about x
pub fn rotation_x(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, c, s, //
        0.0, -s, c,
    )
}

/// Passive rotation about y
pub fn rotation_y(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, 0.0, -s, //
        0.0, 1.0, 0.0, //
        s, 0.0, c,
    )
}

/// Passive rotation about z
pub fn rotation_z(angle: f64) -> Matrix3<f64> {
    let (s, c) = angle.sin_cos();
    Matrix3::new(
        c, s, 0.0, //
        -s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

/// Rotation from the trajectory frame to the body frame
pub fn trajectory_to_body_frame(angles: &AngleTriple) -> Matrix3<f64> {
    rotation_y(angles.attack) * rotation_z(-angles.sideslip) * rotation_x(angles.bank)
}

/// Rotation from the aerodynamic frame to the inertial frame
pub fn aerodynamic_to_inertial_frame(trajectory_to_inertial: &Matrix3<f64>, bank: f64) -> Matrix3<f64> {
    trajectory_to_inertial * rotation_x(bank).transpose()
}

/// Recover attack, sideslip and bank from a body orientation
///
/// `inertial_to_body` rotates inertial vectors into the body frame and
/// `trajectory_to_inertial` rotates trajectory-frame vectors into the
/// inertial frame.
pub fn compute_body_fixed_aero_angles(
    inertial_to_body: &Matrix3<f64>,
    trajectory_to_inertial: &Matrix3<f64>,
) -> AngleTriple {
    let c = inertial_to_body * trajectory_to_inertial;
    AngleTriple {
        attack: c[(2, 0)].atan2(c[(0, 0)]),
        sideslip: c[(1, 0)].clamp(-1.0, 1.0).asin(),
        bank: c[(1, 2)].atan2(c[(1, 1)]),
    }
}

/// Rotation from the trajectory frame to the frame of the airspeed state
///
/// Columns are the trajectory axes expressed in the frame of `position` and
/// `velocity` (the central body's fixed frame). Degenerate when the velocity
/// is zero or radial.
pub fn trajectory_frame(position: &Vector3<f64>, velocity: &Vector3<f64>) -> Option<Matrix3<f64>> {
    let x = velocity.try_normalize(f64::EPSILON)?;
    let down = -position.try_normalize(f64::EPSILON)?;
    let z = (down - x * down.dot(&x)).try_normalize(1e-12)?;
    let y = z.cross(&x);
    Some(Matrix3::from_columns(&[x, y, z]))
}

/// Trajectory frame when [`trajectory_frame`] is degenerate
///
/// The x-axis follows the airspeed and z is completed from the fixed axis
/// least aligned with it. Identity for a vanishing airspeed.
pub fn fallback_trajectory_frame(velocity: &Vector3<f64>) -> Matrix3<f64> {
    let Some(x) = velocity.try_normalize(f64::EPSILON) else {
        return Matrix3::identity();
    };
    let reference = if x.z.abs() < 0.9 { Vector3::z() } else { Vector3::x() };
    let z = (reference - x * reference.dot(&x)).normalize();
    let y = z.cross(&x);
    Matrix3::from_columns(&[x, y, z])
}

/// Where a body's aerodynamic angles come from
pub enum AngleSource {
    /// Externally imposed angles
    Guidance(AngleFunction),
    /// Attack angle of zero pitch moment, sideslip and bank imposed
    Trim(TrimOrientation),
    /// Angles follow from the body orientation
    FromRotation,
}

/// Discriminant of [`AngleSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleSourceKind {
    Guidance,
    Trim,
    FromRotation,
}

impl AngleSourceKind {
    /// Angles are set independently of the body orientation
    pub fn is_imposed(&self) -> bool {
        matches!(self, Self::Guidance | Self::Trim)
    }
}

impl AngleSource {
    pub fn kind(&self) -> AngleSourceKind {
        match self {
            Self::Guidance(_) => AngleSourceKind::Guidance,
            Self::Trim(_) => AngleSourceKind::Trim,
            Self::FromRotation => AngleSourceKind::FromRotation,
        }
    }
}

/// Current aerodynamic angles and trajectory frame of one body
pub struct AerodynamicAngleCalculator {
    source: AngleSource,
    angles: AngleTriple,
    trajectory_to_inertial: Matrix3<f64>,
    current_time: Option<Time>,
}

impl Default for AerodynamicAngleCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl AerodynamicAngleCalculator {
    pub fn new() -> Self {
        Self {
            source: AngleSource::FromRotation,
            angles: AngleTriple::zero(),
            trajectory_to_inertial: Matrix3::identity(),
            current_time: None,
        }
    }

    pub fn set_guidance_angle_functions(&mut self, angles: AngleFunction) {
        self.source = AngleSource::Guidance(angles);
        self.current_time = None;
    }

    /// Solve for trimmed angles at every update
    pub fn set_trimmed_conditions(&mut self, trim: TrimOrientation) {
        self.source = AngleSource::Trim(trim);
        self.current_time = None;
    }

    /// Derive angles from the body orientation again
    pub fn clear_guidance(&mut self) {
        self.source = AngleSource::FromRotation;
        self.current_time = None;
    }

    pub fn source_kind(&self) -> AngleSourceKind {
        self.source.kind()
    }

    pub fn guidance_angles(&self, time: f64) -> Option<AngleTriple> {
        match &self.source {
            AngleSource::Guidance(function) => Some(function(time)),
            AngleSource::Trim(_) | AngleSource::FromRotation => None,
        }
    }

    pub fn trim(&self) -> Option<&TrimOrientation> {
        match &self.source {
            AngleSource::Trim(trim) => Some(trim),
            AngleSource::Guidance(_) | AngleSource::FromRotation => None,
        }
    }

    pub fn current_angles(&self) -> AngleTriple {
        self.angles
    }

    pub fn current_time(&self) -> Option<Time> {
        self.current_time
    }

    pub fn trajectory_to_inertial(&self) -> &Matrix3<f64> {
        &self.trajectory_to_inertial
    }

    pub fn aerodynamic_to_inertial(&self) -> Matrix3<f64> {
        aerodynamic_to_inertial_frame(&self.trajectory_to_inertial, self.angles.bank)
    }

    /// Inertial-to-body rotation implied by the current angles
    pub fn inertial_to_body(&self) -> Matrix3<f64> {
        trajectory_to_body_frame(&self.angles) * self.trajectory_to_inertial.transpose()
    }

    pub(crate) fn set_trajectory_to_inertial(&mut self, trajectory_to_inertial: Matrix3<f64>) {
        self.trajectory_to_inertial = trajectory_to_inertial;
    }

    pub(crate) fn set_angles(&mut self, time: Time, angles: AngleTriple) {
        self.angles = angles;
        self.current_time = Some(time);
    }

    pub fn reset_current_time(&mut self) {
        self.current_time = None;
    }
}
