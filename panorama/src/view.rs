use crate::{canvas::Projection, PanoramaError};
use std::f64::consts::PI;
use terrain::{GeoCoordinate, Source, Sweep};

/// Default vertical extent when neither it nor the canvas height is
/// given, radians (20°).
const DEFAULT_VERTICAL_HEIGHT: f64 = 20.0 * PI / 180.0;

/// Default canvas height when neither it nor the vertical extent is
/// given, pixels.
const DEFAULT_HEIGHT: u32 = 2000;

/// Where the observer stands and what part of the world lands on the
/// canvas. All angles are radians.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewParameters {
    pub observer: GeoCoordinate,
    pub eye_height_m: f64,

    /// Compass bearing of the canvas' center column, `[0, 2π)`.
    pub azimuth_center: f64,
    /// Horizontal field of view, `(0, 2π]`.
    pub azimuth_width: f64,

    /// Elevation angle of the canvas' middle row.
    pub vertical_center: f64,
    /// Vertical field of view, `(0, π]`.
    pub vertical_height: f64,

    pub max_range_m: f64,

    /// Canvas size, pixels.
    pub width: u32,
    pub height: u32,

    /// Elevation sources in order of preference.
    pub sources: Vec<Source>,
}

impl ViewParameters {
    pub fn builder() -> ViewBuilder {
        ViewBuilder {
            observer: None,
            eye_height_m: 10.0,
            azimuth_center: None,
            azimuth_width: None,
            vertical_center: 0.0,
            vertical_height: None,
            max_range_m: None,
            width: None,
            height: None,
            sources: vec![Source::View1, Source::Srtm1, Source::View3, Source::Srtm3],
        }
    }

    /// Returns the ray fan, one ray per canvas column.
    pub fn sweep(&self) -> Sweep {
        Sweep {
            observer: self.observer,
            eye_height_m: self.eye_height_m,
            azimuth_center: self.azimuth_center,
            azimuth_width: self.azimuth_width,
            max_range_m: self.max_range_m,
            columns: self.width as usize,
        }
    }

    pub fn projection(&self) -> Projection {
        Projection {
            width: self.width,
            height: self.height,
            azimuth_start: self.azimuth_center - self.azimuth_width / 2.0,
            azimuth_width: self.azimuth_width,
            vertical_center: self.vertical_center,
            vertical_height: self.vertical_height,
        }
    }

    /// Fails on anything that would make the render meaningless,
    /// before any tile is touched.
    pub fn validate(&self) -> Result<(), PanoramaError> {
        self.sweep().validate()?;
        let invalid = |msg: String| Err(PanoramaError::InvalidViewParameters(msg));
        if !self.vertical_center.is_finite() {
            return invalid(format!("vertical center {} is not finite", self.vertical_center));
        }
        if !(self.vertical_height > 0.0 && self.vertical_height <= PI) {
            return invalid(format!("vertical height {} outside (0, π]", self.vertical_height));
        }
        if self.height == 0 {
            return invalid("zero canvas height".to_owned());
        }
        Ok(())
    }
}

pub struct ViewBuilder {
    observer: Option<GeoCoordinate>,
    eye_height_m: f64,
    azimuth_center: Option<f64>,
    azimuth_width: Option<f64>,
    vertical_center: f64,
    vertical_height: Option<f64>,
    max_range_m: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
    sources: Vec<Source>,
}

impl ViewBuilder {
    #[must_use]
    pub fn observer(mut self, coord: GeoCoordinate) -> Self {
        self.observer = Some(coord);
        self
    }

    #[must_use]
    pub fn eye_height(mut self, meters: f64) -> Self {
        self.eye_height_m = meters;
        self
    }

    #[must_use]
    pub fn azimuth(mut self, center: f64, width: f64) -> Self {
        self.azimuth_center = Some(center);
        self.azimuth_width = Some(width);
        self
    }

    #[must_use]
    pub fn vertical_center(mut self, angle: f64) -> Self {
        self.vertical_center = angle;
        self
    }

    /// Vertical field of view. When omitted it is derived from the
    /// canvas height so that pixels are square.
    #[must_use]
    pub fn vertical_height(mut self, angle: f64) -> Self {
        self.vertical_height = Some(angle);
        self
    }

    #[must_use]
    pub fn range(mut self, meters: f64) -> Self {
        self.max_range_m = Some(meters);
        self
    }

    #[must_use]
    pub fn width(mut self, pixels: u32) -> Self {
        self.width = Some(pixels);
        self
    }

    /// Canvas height. When omitted it is derived from the vertical
    /// field of view so that pixels are square.
    #[must_use]
    pub fn height(mut self, pixels: u32) -> Self {
        self.height = Some(pixels);
        self
    }

    #[must_use]
    pub fn sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    pub fn build(self) -> Result<ViewParameters, PanoramaError> {
        let observer = self.observer.ok_or(PanoramaError::Builder("observer"))?;
        let azimuth_center = self.azimuth_center.ok_or(PanoramaError::Builder("azimuth"))?;
        let azimuth_width = self.azimuth_width.ok_or(PanoramaError::Builder("azimuth"))?;
        let max_range_m = self.max_range_m.ok_or(PanoramaError::Builder("range"))?;
        let width = self.width.ok_or(PanoramaError::Builder("width"))?;

        let px_per_rad = f64::from(width) / azimuth_width;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (vertical_height, height) = match (self.vertical_height, self.height) {
            (Some(vh), Some(h)) => (vh, h),
            (Some(vh), None) => (vh, (vh * px_per_rad).round() as u32),
            (None, Some(h)) => (f64::from(h) / px_per_rad, h),
            (None, None) => (DEFAULT_VERTICAL_HEIGHT, DEFAULT_HEIGHT),
        };

        let view = ViewParameters {
            observer,
            eye_height_m: self.eye_height_m,
            azimuth_center,
            azimuth_width,
            vertical_center: self.vertical_center,
            vertical_height,
            max_range_m,
            width,
            height,
            sources: self.sources,
        };
        view.validate()?;
        Ok(view)
    }
}
