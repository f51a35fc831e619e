//! hifi-propagation - entry demo
//!
//! Propagates a lifting capsule from 120 km down to 25 km through an
//! exponential atmosphere and prints a short trajectory summary.

use anyhow::{Context, Result};
use hifi_propagation::prelude::*;
use hifi_propagation::state::{EARTH_RADIUS_M, MU_EARTH};

const CUTOFF_ALTITUDE: f64 = 25_000.0;

fn build_bodies() -> Result<SystemOfBodies> {
    let mut bodies = SystemOfBodies::new();
    bodies.add_body(
        Body::new("Earth")
            .with_ephemeris(Box::new(ConstantEphemeris::origin()))
            .with_gravitational_parameter(MU_EARTH)
            .with_atmosphere(Box::new(Exponential::standard()))
            .with_shape(Box::new(SphericalShape::earth()))
            .with_rotation(RotationModel::Ephemeris(Box::new(SimpleRotation::earth("J2000", "IAU_Earth")))),
    )?;
    bodies.add_body(
        Body::new("capsule")
            .with_mass(5000.0)
            .with_aerodynamic_coefficients(Box::new(ConstantCoefficients::new(12.0, Vector3::new(1.25, 0.0, 0.35))))
            .with_rotation(RotationModel::AngleDriven(
                AerodynamicAngleRotation::new("J2000", "capsule")
                    // Constant trim, bank reversal halfway down
                    .with_angle_function(Box::new(|t| {
                        let bank = if t < 300.0 { 0.6 } else { -0.6 };
                        AngleTriple::new(-0.35, 0.0, bank)
                    })),
            )),
    )?;
    Ok(bodies)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting entry propagation...");

    let bodies = build_bodies()?;

    let r0 = EARTH_RADIUS_M + 120_000.0;
    let flight_path_angle = -1.5_f64.to_radians();
    let speed = 7_600.0;
    let initial_state = DVector::from_vec(vec![
        r0,
        0.0,
        0.0,
        speed * flight_path_angle.sin(),
        speed * flight_path_angle.cos(),
        0.0,
    ]);

    let cutoff = TerminationCondition::custom(
        "altitude below 25 km",
        Box::new(|_: f64, y: &DVector<f64>| {
            Vector3::new(y[0], y[1], y[2]).norm() - EARTH_RADIUS_M < CUTOFF_ALTITUDE
        }),
    );
    let settings = PropagatorSettings::new(0.0, initial_state, cutoff.or(TerminationCondition::time_limit(3600.0)))
        .propagate_translational("capsule", "Earth")
        .with_force(Box::new(CentralGravity::point_mass("capsule", "Earth")))
        .with_force(Box::new(AerodynamicAcceleration::new("capsule")))
        .with_dependent_variable(DependentVariable::Altitude("capsule".to_string()))
        .with_dependent_variable(DependentVariable::Airspeed("capsule".to_string()))
        .with_dependent_variable(DependentVariable::DynamicPressure("capsule".to_string()));

    let config = SimulatorConfig::default().with_print_interval(120.0);
    let mut simulator = BaseSimulator::new(bodies, config);
    simulator
        .initialize(IntegratorSettings::RungeKutta4 { step_size: 1.0 }, settings)
        .context("setting up the entry propagation")?;

    let outcome = simulator.run()?;
    if let Some(error) = simulator.last_error() {
        log::error!("Run ended early: {error}");
    }

    let outputs = simulator.solution().dependent_variables();
    let peak = outputs
        .iter()
        .max_by(|a, b| a.1[2].total_cmp(&b.1[2]))
        .map(|(time, values)| (*time, values[2]));
    if let (Some((time, values)), Some((peak_time, peak_pressure))) = (outputs.last(), peak) {
        println!("Outcome:            {outcome:?}");
        println!("Final time:         {time:.1} s");
        println!("Final altitude:     {:.1} km", values[0] / 1000.0);
        println!("Final airspeed:     {:.1} m/s", values[1]);
        println!("Peak dyn. pressure: {:.1} kPa at t = {peak_time:.1} s", peak_pressure / 1000.0);
    }

    if let Some(model) = simulator.derivative_model() {
        for (name, body, acceleration) in model.acceleration_breakdown() {
            log::info!("Final {name} on {body}: {:.2} m/s²", acceleration.norm());
        }
    }

    simulator.process_numerical_equations_of_motion_solution()?;
    if let Some(history) = simulator.body_state_histories().get("capsule") {
        log::info!("Stored {} translational states for capsule", history.translational.len());
    }

    Ok(())
}
