//! Great-circle routines on a sphere. All angles are radians.

use num_traits::{Float, FloatConst};

/// Returns the angle subtended at the earth's center by the two
/// points.
pub fn central_angle<T: Float>(lat1: T, lon1: T, lat2: T, lon2: T) -> T {
    let two = T::one() + T::one();
    let h = ((lat2 - lat1) / two).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon2 - lon1) / two).sin().powi(2);
    two * h.sqrt().min(T::one()).asin()
}

/// Returns the initial compass bearing from point 1 to point 2,
/// clockwise from north, in `[0, 2π)`.
pub fn initial_bearing<T: Float + FloatConst>(lat1: T, lon1: T, lat2: T, lon2: T) -> T {
    let dlon = lon2 - lon1;
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    normalize_angle(y.atan2(x))
}

/// Returns the (lat, lon) reached by travelling `delta` radians of arc
/// from (lat, lon) along `bearing`.
pub fn destination<T: Float + FloatConst>(lat: T, lon: T, bearing: T, delta: T) -> (T, T) {
    let (lat_sin, lat_cos) = lat.sin_cos();
    let (delta_sin, delta_cos) = delta.sin_cos();
    let lat2 = (lat_sin * delta_cos + lat_cos * delta_sin * bearing.cos())
        .max(-T::one())
        .min(T::one())
        .asin();
    let lon2 = lon + (bearing.sin() * delta_sin * lat_cos).atan2(delta_cos - lat_sin * lat2.sin());
    (lat2, wrap_longitude(lon2))
}

/// Wraps `angle` into `[0, 2π)`.
pub fn normalize_angle<T: Float + FloatConst>(angle: T) -> T {
    let tau = T::TAU();
    let wrapped = angle % tau;
    let wrapped = if wrapped < T::zero() {
        wrapped + tau
    } else {
        wrapped
    };
    // Tiny negative inputs round up to exactly 2π above.
    if wrapped >= tau {
        T::zero()
    } else {
        wrapped
    }
}

/// Wraps a longitude into `[-π, π)`.
pub fn wrap_longitude<T: Float + FloatConst>(lon: T) -> T {
    if lon >= -T::PI() && lon < T::PI() {
        lon
    } else {
        normalize_angle(lon + T::PI()) - T::PI()
    }
}

#[cfg(test)]
mod tests {
    use super::{central_angle, destination, initial_bearing, normalize_angle, wrap_longitude};
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    #[test]
    fn test_central_angle() {
        let one_deg = 1.0_f64.to_radians();
        assert_relative_eq!(central_angle(0.0, 0.0, 0.0, one_deg), one_deg, epsilon = 1e-15);
        assert_relative_eq!(central_angle(0.0, 0.0, one_deg, 0.0), one_deg, epsilon = 1e-15);
        assert_relative_eq!(central_angle(0.3, 0.2, 0.3, 0.2), 0.0);
        // Antipodes.
        assert_relative_eq!(central_angle(0.0, 0.0, 0.0, PI), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_initial_bearing() {
        let one_deg = 1.0_f64.to_radians();
        assert_relative_eq!(initial_bearing(0.0, 0.0, 0.0, one_deg), FRAC_PI_2);
        assert_relative_eq!(initial_bearing(0.0, 0.0, one_deg, 0.0), 0.0);
        assert_relative_eq!(initial_bearing(0.0, 0.0, -one_deg, 0.0), PI);
        assert_relative_eq!(initial_bearing(0.0, 0.0, 0.0, -one_deg), 3.0 * FRAC_PI_2);
    }

    #[test]
    fn test_destination_inverts_bearing_and_distance() {
        let (lat, lon) = (47.2_f64.to_radians(), 11.4_f64.to_radians());
        for bearing in [0.0, 0.7, 2.0, 3.5, 5.9] {
            let delta = 0.004;
            let (lat2, lon2) = destination(lat, lon, bearing, delta);
            assert_relative_eq!(central_angle(lat, lon, lat2, lon2), delta, epsilon = 1e-12);
            assert_relative_eq!(initial_bearing(lat, lon, lat2, lon2), bearing, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_destination_across_antimeridian() {
        let (_, lon) = destination(0.0, 179.9_f64.to_radians(), FRAC_PI_2, 0.2_f64.to_radians());
        assert_relative_eq!(lon.to_degrees(), -179.9, epsilon = 1e-9);
    }

    #[test]
    fn test_wrapping() {
        assert_relative_eq!(normalize_angle(-FRAC_PI_2), 3.0 * FRAC_PI_2);
        assert_relative_eq!(normalize_angle(TAU + 0.5), 0.5, epsilon = 1e-15);
        assert_eq!(normalize_angle(TAU), 0.0);
        assert_eq!(normalize_angle(-1e-20), 0.0);
        assert_relative_eq!(wrap_longitude(PI + 0.1), -PI + 0.1, epsilon = 1e-12);
        assert_relative_eq!(wrap_longitude(-0.1), -0.1);
    }
}
