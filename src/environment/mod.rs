//! Environment of a propagation: bodies and their time/state-dependent models
//!
//! # Components
//!
//! - **Bodies**: [`Body`] and the [`SystemOfBodies`] registry
//! - **Ephemerides**: translational state providers
//! - **Rotation**: [`RotationState`] providers, either rotational ephemerides
//!   or [`AerodynamicAngleRotation`] derived from aerodynamic angles
//! - **Aerodynamics**: shapes, coefficient interfaces, flight conditions,
//!   the aerodynamic angle calculator and [`TrimOrientation`]
//! - **Closure**: per-body orientation closure and the dependency order of
//!   all environment models
//! - **Updater**: [`EnvironmentUpdater`], refreshing everything once per
//!   (time, state)

mod aero_angles;
mod aero_rotation;
mod body;
mod closure;
mod coefficients;
mod ephemeris;
mod flight_conditions;
mod rotation;
mod shape;
mod trim;
mod updater;

pub use aero_angles::{
    aerodynamic_to_inertial_frame, compute_body_fixed_aero_angles, fallback_trajectory_frame, rotation_x, rotation_y,
    rotation_z, trajectory_frame, trajectory_to_body_frame, AerodynamicAngleCalculator, AngleFunction, AngleSource,
    AngleSourceKind, AngleTriple, ScalarFunction,
};
pub use aero_rotation::AerodynamicAngleRotation;
pub use body::{Body, BodyId, MassModel, RotationModel, SystemOfBodies};
pub use closure::{
    verify_orientation_closure, ClosureBinding, DependencyGraph, EnvironmentNode, OrientationClosure,
};
pub use coefficients::{
    create_tabulated_coefficient_interface, AerodynamicCoefficientInterface, CoefficientGrid,
    CoefficientReader, CoefficientTable, CoefficientVariable, ConstantCoefficients, TabulatedCoefficients,
};
pub use ephemeris::{ConstantEphemeris, Ephemeris, TabulatedEphemeris};
pub use flight_conditions::{create_flight_conditions, FlightConditions};
pub use rotation::{
    angular_velocity_from_matrices, derivative_of_rotation_matrix_to_frame, ConstantRotation,
    RotationState, RotationalEphemeris, SimpleRotation,
};
pub use shape::{latitude_longitude, ShapeModel, SphericalShape};
pub use trim::TrimOrientation;
pub use updater::{CustomEnvironmentModel, EnvironmentUpdater, SharedEnvironmentModel};
