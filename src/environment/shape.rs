//! Body shape models used for altitude computation

use nalgebra::Vector3;

/// Shape of a central body
pub trait ShapeModel: Send + Sync {
    /// Altitude of a body-fixed position above the surface, in meters
    fn altitude(&self, body_fixed_position: &Vector3<f64>) -> f64;

    fn average_radius(&self) -> f64;

    fn name(&self) -> &'static str;
}

/// Sphere of constant radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalShape {
    radius: f64,
}

impl SphericalShape {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    pub fn earth() -> Self {
        Self::new(crate::state::EARTH_RADIUS_M)
    }
}

impl ShapeModel for SphericalShape {
    fn altitude(&self, body_fixed_position: &Vector3<f64>) -> f64 {
        body_fixed_position.norm() - self.radius
    }

    fn average_radius(&self) -> f64 {
        self.radius
    }

    fn name(&self) -> &'static str {
        "Spherical"
    }
}

/// Geocentric latitude and longitude of a body-fixed position, in radians
pub fn latitude_longitude(body_fixed_position: &Vector3<f64>) -> (f64, f64) {
    let r = body_fixed_position.norm();
    if r == 0.0 {
        return (0.0, 0.0);
    }
    let latitude = (body_fixed_position.z / r).clamp(-1.0, 1.0).asin();
    let longitude = body_fixed_position.y.atan2(body_fixed_position.x);
    (latitude, longitude)
}
