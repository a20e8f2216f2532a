mod curvature;
mod haversine;

pub(crate) use curvature::{apparent_elevation_angle, curvature_drop};
pub(crate) use haversine::{central_angle, destination, initial_bearing};
pub use haversine::{normalize_angle, wrap_longitude};
