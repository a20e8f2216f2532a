//! Per-column horizon sweeps.
//!
//! Every column of a panorama is one ray cast from the observer along
//! a fixed bearing. The ray is marched outward in steps which grow
//! with distance, and a sample becomes a *candidate* only when its
//! apparent elevation angle beats everything nearer. Whatever is
//! lower than an earlier candidate is hidden behind it.

use crate::{math::normalize_angle, EarthModel, GeoCoordinate, TerrainError, TileStore};
use log::debug;
use rayon::prelude::*;
use std::{
    f64::consts::{FRAC_PI_2, TAU},
    time::Instant,
};

/// Smallest step a ray will ever take, meters.
const MIN_STEP_FLOOR_M: f64 = 1.0;

/// Ray marching tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarchParams {
    /// Lower bound for the distance between samples, meters. The
    /// native spacing of the loaded tiles raises it further.
    pub min_step_m: f64,

    /// Step size as a fraction of the distance already travelled.
    pub step_ratio: f64,

    /// Longest run of missing elevation data a ray crosses before
    /// giving up, meters.
    pub max_gap_m: f64,

    /// Stop a ray once no loaded terrain could rise above its current
    /// horizon.
    pub early_exit: bool,
}

impl Default for MarchParams {
    fn default() -> Self {
        Self {
            min_step_m: 30.0,
            step_ratio: 0.001,
            max_gap_m: 1000.0,
            early_exit: true,
        }
    }
}

/// The fan of rays making up a panorama.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub observer: GeoCoordinate,

    /// Added to the observer's elevation, meters.
    pub eye_height_m: f64,

    /// Compass bearing of the middle of the fan, `[0, 2π)`.
    pub azimuth_center: f64,

    /// Angular width of the fan, `(0, 2π]`.
    pub azimuth_width: f64,

    pub max_range_m: f64,

    /// Number of rays.
    pub columns: usize,
}

impl Sweep {
    pub fn validate(&self) -> Result<(), TerrainError> {
        let invalid = |msg: String| Err(TerrainError::InvalidViewParameters(msg));
        if !self.observer.is_finite() {
            return invalid(format!("observer {:?} is not finite", self.observer));
        }
        if !self.eye_height_m.is_finite() {
            return invalid(format!("eye height {} is not finite", self.eye_height_m));
        }
        if !(0.0..TAU).contains(&self.azimuth_center) {
            return invalid(format!("azimuth center {} outside [0, 2π)", self.azimuth_center));
        }
        if !(self.azimuth_width > 0.0 && self.azimuth_width <= TAU) {
            return invalid(format!("azimuth width {} outside (0, 2π]", self.azimuth_width));
        }
        if !(self.max_range_m.is_finite() && self.max_range_m >= 0.0) {
            return invalid(format!("range {} must be finite and non-negative", self.max_range_m));
        }
        if self.columns == 0 {
            return invalid("zero columns".to_owned());
        }
        Ok(())
    }

    /// Bearing of the left edge of the fan.
    pub fn azimuth_start(&self) -> f64 {
        self.azimuth_center - self.azimuth_width / 2.0
    }

    /// Bearing of the center of `column`, `[0, 2π)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn column_azimuth(&self, column: usize) -> f64 {
        let frac = (column as f64 + 0.5) / self.columns as f64;
        normalize_angle(self.azimuth_start() + frac * self.azimuth_width)
    }
}

/// A ray sample which rose above everything nearer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub distance_m: f64,
    pub angle: f64,
    pub height_m: f64,
}

/// Outcome of marching one ray.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRecord {
    pub azimuth: f64,

    /// Apparent elevation angle of the skyline, or `-π/2` for sky-only
    /// columns.
    pub angle: f64,

    /// Distance to the skyline point, meters.
    pub distance_m: f64,

    /// Terrain height at the skyline point, meters.
    pub height_m: f64,

    /// `false` when the ray found no terrain at all.
    pub valid: bool,

    /// The ray was cut short by missing elevation data.
    pub truncated: bool,

    /// Accepted candidates, strictly increasing in both distance and
    /// angle. The last one is the skyline.
    pub candidates: Vec<Candidate>,
}

impl ColumnRecord {
    fn new(azimuth: f64, candidates: Vec<Candidate>, truncated: bool) -> Self {
        match candidates.last().copied() {
            Some(skyline) => Self {
                azimuth,
                angle: skyline.angle,
                distance_m: skyline.distance_m,
                height_m: skyline.height_m,
                valid: true,
                truncated,
                candidates,
            },
            None => Self {
                azimuth,
                angle: -FRAC_PI_2,
                distance_m: 0.0,
                height_m: 0.0,
                valid: false,
                truncated,
                candidates,
            },
        }
    }

    /// Returns the distance of the terrain seen at `angle` along this
    /// ray, or `None` if `angle` is above the skyline.
    pub fn depth_at(&self, angle: f64) -> Option<f64> {
        let idx = self.candidates.partition_point(|c| c.angle < angle);
        self.candidates.get(idx).map(|c| c.distance_m)
    }

    /// Returns `true` if terrain strictly nearer than `distance_m`
    /// rises to `angle` or above.
    pub fn occludes(&self, angle: f64, distance_m: f64) -> bool {
        let nearer = self.candidates.partition_point(|c| c.distance_m < distance_m);
        nearer > 0 && self.candidates[nearer - 1].angle >= angle
    }
}

/// Skyline records for every column of a [`Sweep`], in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonProfile {
    observer: GeoCoordinate,
    observer_altitude_m: f64,
    azimuth_start: f64,
    azimuth_width: f64,
    max_range_m: f64,
    records: Vec<ColumnRecord>,
}

impl HorizonProfile {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ColumnRecord] {
        &self.records
    }

    pub fn get(&self, column: usize) -> Option<&ColumnRecord> {
        self.records.get(column)
    }

    pub fn observer(&self) -> &GeoCoordinate {
        &self.observer
    }

    /// Eye altitude above mean sea level all angles are measured from.
    pub fn observer_altitude_m(&self) -> f64 {
        self.observer_altitude_m
    }

    pub fn max_range_m(&self) -> f64 {
        self.max_range_m
    }

    /// Returns the column whose span contains `azimuth`, or `None`
    /// when `azimuth` is outside the fan.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn column_for_azimuth(&self, azimuth: f64) -> Option<usize> {
        if self.records.is_empty() {
            return None;
        }
        let offset = normalize_angle(azimuth - self.azimuth_start);
        if offset > self.azimuth_width {
            return None;
        }
        let column = (offset / self.azimuth_width * self.records.len() as f64).floor() as usize;
        Some(column.min(self.records.len() - 1))
    }
}

/// Casts rays over a populated [`TileStore`].
pub struct VisibilityEngine<'a> {
    store: &'a TileStore,
    earth: EarthModel,
    march: MarchParams,
}

impl<'a> VisibilityEngine<'a> {
    pub fn new(store: &'a TileStore, earth: EarthModel, march: MarchParams) -> Self {
        Self { store, earth, march }
    }

    pub fn earth(&self) -> &EarthModel {
        &self.earth
    }

    /// Returns the observer's eye altitude: its own elevation if
    /// known, else the terrain under it (sea level over missing data),
    /// plus `eye_height_m`.
    pub fn observer_altitude(&self, observer: &GeoCoordinate, eye_height_m: f64) -> f64 {
        let ground = observer
            .elevation
            .or_else(|| self.store.sample(observer))
            .unwrap_or(0.0);
        ground + eye_height_m
    }

    /// Returns the distance between the first two ray samples.
    pub fn min_step_m(&self) -> f64 {
        self.march
            .min_step_m
            .max(self.store.native_resolution_m().unwrap_or(0.0))
            .max(MIN_STEP_FLOOR_M)
    }

    /// Marches every column of `sweep` in parallel.
    pub fn compute(&self, sweep: &Sweep) -> Result<HorizonProfile, TerrainError> {
        sweep.validate()?;

        let now = Instant::now();
        let altitude = self.observer_altitude(&sweep.observer, sweep.eye_height_m);
        let min_step = self.min_step_m();
        let max_elevation = self.store.max_elevation();

        let records: Vec<ColumnRecord> = (0..sweep.columns)
            .into_par_iter()
            .map(|column| {
                self.march_ray(
                    &sweep.observer,
                    altitude,
                    sweep.column_azimuth(column),
                    sweep.max_range_m,
                    min_step,
                    max_elevation,
                )
            })
            .collect();

        debug!(
            "horizon; columns: {}, valid: {}, truncated: {}, altitude: {altitude:.1}, min_step: {min_step:.1}, exec: {:?}",
            records.len(),
            records.iter().filter(|r| r.valid).count(),
            records.iter().filter(|r| r.truncated).count(),
            now.elapsed()
        );

        Ok(HorizonProfile {
            observer: sweep.observer,
            observer_altitude_m: altitude,
            azimuth_start: sweep.azimuth_start(),
            azimuth_width: sweep.azimuth_width,
            max_range_m: sweep.max_range_m,
            records,
        })
    }

    /// Marches a single ray from an eye at `altitude_m`.
    pub fn march(
        &self,
        observer: &GeoCoordinate,
        altitude_m: f64,
        bearing: f64,
        max_range_m: f64,
    ) -> ColumnRecord {
        self.march_ray(
            observer,
            altitude_m,
            bearing,
            max_range_m,
            self.min_step_m(),
            self.store.max_elevation(),
        )
    }
}

/// Private API.
impl<'a> VisibilityEngine<'a> {
    fn steps(&self, max_range_m: f64, min_step_m: f64) -> RaySteps {
        RaySteps {
            next: min_step_m,
            min_step_m,
            step_ratio: self.march.step_ratio,
            max_range_m,
            done: !(max_range_m > 0.0),
        }
    }

    fn march_ray(
        &self,
        observer: &GeoCoordinate,
        altitude: f64,
        bearing: f64,
        max_range_m: f64,
        min_step_m: f64,
        max_elevation: Option<f64>,
    ) -> ColumnRecord {
        let drop_coefficient = self.earth.drop_coefficient();
        let mut candidates = Vec::new();
        let mut max_angle = -FRAC_PI_2;
        let mut gap_start: Option<f64> = None;
        let mut truncated = false;

        for distance in self.steps(max_range_m, min_step_m) {
            let point = self.earth.destination(observer, bearing, distance);
            let Some(height) = self.store.sample(&point) else {
                let start = *gap_start.get_or_insert(distance);
                if distance - start >= self.march.max_gap_m {
                    truncated = true;
                    break;
                }
                continue;
            };
            gap_start = None;

            let angle = self.earth.apparent_elevation_angle(altitude, height, distance);
            if angle > max_angle {
                max_angle = angle;
                candidates.push(Candidate {
                    distance_m: distance,
                    angle,
                    height_m: height,
                });
            }

            if let Some(highest) = max_elevation.filter(|_| self.march.early_exit) {
                if steepest_slope(highest - altitude, drop_coefficient, distance) < max_angle.tan() {
                    break;
                }
            }
        }

        ColumnRecord::new(bearing, candidates, truncated)
    }
}

/// Distances along a ray. The step grows with distance and the last
/// sample lands exactly on the maximum range.
struct RaySteps {
    next: f64,
    min_step_m: f64,
    step_ratio: f64,
    max_range_m: f64,
    done: bool,
}

impl Iterator for RaySteps {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.done {
            return None;
        }
        let distance = self.next.min(self.max_range_m);
        self.done = distance >= self.max_range_m;
        self.next = distance + self.min_step_m.max(distance * self.step_ratio);
        Some(distance)
    }
}

/// Returns the greatest `(rise - c·x²) / x` for any `x ≥ distance`,
/// the steepest slope a target `rise` meters above the eye could
/// subtend beyond `distance`.
fn steepest_slope(rise: f64, c: f64, distance: f64) -> f64 {
    if c < 0.0 {
        f64::INFINITY
    } else if rise >= 0.0 {
        (rise - c * distance * distance) / distance
    } else if c > 0.0 {
        let x = (-rise / c).sqrt().max(distance);
        (rise - c * x * x) / x
    } else {
        0.0
    }
}
