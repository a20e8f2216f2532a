use crate::{
    constants::{MEAN_EARTH_RADIUS, REFRACTION_COEFFICIENT},
    math, GeoCoordinate,
};

/// Spherical earth with a constant refraction correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarthModel {
    /// Radius in meters.
    pub radius: f64,

    /// Fraction of the geometric curvature drop cancelled by
    /// atmospheric refraction.
    pub refraction: f64,
}

impl Default for EarthModel {
    fn default() -> Self {
        Self {
            radius: MEAN_EARTH_RADIUS,
            refraction: REFRACTION_COEFFICIENT,
        }
    }
}

impl EarthModel {
    pub fn new(radius: f64, refraction: f64) -> Self {
        Self { radius, refraction }
    }

    /// Returns the great-circle distance (meters) and initial bearing
    /// (radians clockwise from north, `[0, 2π)`) from `a` to `b`.
    pub fn distance_and_bearing(&self, a: &GeoCoordinate, b: &GeoCoordinate) -> (f64, f64) {
        let distance = math::central_angle(a.lat, a.lon, b.lat, b.lon) * self.radius;
        let bearing = math::initial_bearing(a.lat, a.lon, b.lat, b.lon);
        (distance, bearing)
    }

    /// Returns the point `distance_m` from `origin` along `bearing`.
    ///
    /// The result carries no elevation.
    pub fn destination(&self, origin: &GeoCoordinate, bearing: f64, distance_m: f64) -> GeoCoordinate {
        let (lat, lon) = math::destination(origin.lat, origin.lon, bearing, distance_m / self.radius);
        GeoCoordinate::new(lat, lon)
    }

    pub fn curvature_drop(&self, distance_m: f64) -> f64 {
        math::curvature_drop(distance_m, self.radius, self.refraction)
    }

    /// Returns `c` such that `curvature_drop(d) == c * d²`.
    pub fn drop_coefficient(&self) -> f64 {
        (1.0 - self.refraction) / (2.0 * self.radius)
    }

    pub fn apparent_elevation_angle(&self, observer_m: f64, target_m: f64, distance_m: f64) -> f64 {
        math::apparent_elevation_angle(observer_m, target_m, distance_m, self.curvature_drop(distance_m))
    }
}
