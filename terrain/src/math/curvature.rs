use num_traits::Float;

/// Returns how far (meters) a target at `distance_m` appears to sink
/// below the observer's tangent plane, with `refraction` of the
/// geometric drop cancelled by the atmosphere.
pub fn curvature_drop<T: Float>(distance_m: T, earth_radius: T, refraction: T) -> T {
    let two = T::one() + T::one();
    (T::one() - refraction) * distance_m * distance_m / (two * earth_radius)
}

/// Returns the up/down angle (in radians) from the observer to a
/// target `distance_m` away, given the target's curvature drop.
///
/// `atan2` keeps this finite as `distance_m` approaches zero.
pub fn apparent_elevation_angle<T: Float>(
    observer_elev_m: T,
    target_elev_m: T,
    distance_m: T,
    drop_m: T,
) -> T {
    (target_elev_m - observer_elev_m - drop_m).atan2(distance_m)
}
