/// Mean earth radius in meters.
pub const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;

/// Fraction of geometric curvature cancelled by standard atmospheric
/// refraction.
pub const REFRACTION_COEFFICIENT: f64 = 0.13;

pub const ARCSEC_PER_DEG: f64 = 3600.0;
