//! Visible terrain from a fixed viewpoint.
//!
//! [`TileStore`] holds a mosaic of elevation tiles, [`EarthModel`]
//! supplies the spherical-earth math, and [`VisibilityEngine`] casts
//! one ray per output column to find the skyline.

pub mod constants;
mod coord;
mod earth;
mod error;
mod horizon;
mod math;
mod store;

pub use crate::{
    coord::GeoCoordinate,
    earth::EarthModel,
    error::TerrainError,
    horizon::{Candidate, ColumnRecord, HorizonProfile, MarchParams, Sweep, VisibilityEngine},
    math::{normalize_angle, wrap_longitude},
    store::{Cell, Source, TileKey, TileMode, TileStore},
};
pub use geo;
pub use nasadem;
