use crate::math::wrap_longitude;
use geo::geometry::{Coord, Point};

/// A position on the earth's surface.
///
/// Latitude and longitude are radians. `elevation` is meters above
/// mean sea level, when known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCoordinate {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
}

impl GeoCoordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
        }
    }

    pub fn from_degrees(lat_deg: f64, lon_deg: f64) -> Self {
        Self::new(lat_deg.to_radians(), lon_deg.to_radians())
    }

    #[must_use]
    pub fn with_elevation(mut self, meters: f64) -> Self {
        self.elevation = Some(meters);
        self
    }

    pub fn lat_deg(&self) -> f64 {
        self.lat.to_degrees()
    }

    /// Longitude in degrees, wrapped into `[-180, 180)`.
    pub fn lon_deg(&self) -> f64 {
        wrap_longitude(self.lon).to_degrees()
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.elevation.map_or(true, f64::is_finite)
    }
}

/// Degrees, `x` = longitude, the way tiles are addressed.
impl From<GeoCoordinate> for Coord<f64> {
    fn from(coord: GeoCoordinate) -> Self {
        Coord {
            x: coord.lon_deg(),
            y: coord.lat_deg(),
        }
    }
}

impl From<GeoCoordinate> for Point<f64> {
    fn from(coord: GeoCoordinate) -> Self {
        Point(coord.into())
    }
}
