//! Render tunables.
//!
//! Every field has a default, so a config file only needs to mention
//! what it changes:
//!
//! ```json
//! { "haze_distance_m": 40000, "occlusion": { "epsilon": 0.002 } }
//! ```

use crate::PanoramaError;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use terrain::{constants, EarthModel, MarchParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub earth: EarthConfig,
    pub march: MarchConfig,
    pub occlusion: OcclusionConfig,
    pub labels: LabelConfig,
    pub edges: EdgeConfig,
    pub axis: AxisConfig,
    pub colors: Palette,

    /// Distance at which terrain is `1 - 1/e` of the way to the haze
    /// color, meters. Zero disables haze.
    pub haze_distance_m: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            earth: EarthConfig::default(),
            march: MarchConfig::default(),
            occlusion: OcclusionConfig::default(),
            labels: LabelConfig::default(),
            edges: EdgeConfig::default(),
            axis: AxisConfig::default(),
            colors: Palette::default(),
            haze_distance_m: 60_000.0,
        }
    }
}

impl RenderConfig {
    /// Reads a JSON config file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PanoramaError> {
        let rdr = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(rdr)?)
    }

    pub fn earth_model(&self) -> EarthModel {
        EarthModel::new(self.earth.radius_m, self.earth.refraction)
    }

    pub fn march_params(&self) -> MarchParams {
        MarchParams {
            min_step_m: self.march.min_step_m,
            step_ratio: self.march.step_ratio,
            max_gap_m: self.march.max_gap_m,
            early_exit: self.march.early_exit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EarthConfig {
    pub radius_m: f64,
    pub refraction: f64,
}

impl Default for EarthConfig {
    fn default() -> Self {
        Self {
            radius_m: constants::MEAN_EARTH_RADIUS,
            refraction: constants::REFRACTION_COEFFICIENT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarchConfig {
    pub min_step_m: f64,
    pub step_ratio: f64,
    pub max_gap_m: f64,
    pub early_exit: bool,
}

impl Default for MarchConfig {
    fn default() -> Self {
        let MarchParams {
            min_step_m,
            step_ratio,
            max_gap_m,
            early_exit,
        } = MarchParams::default();
        Self {
            min_step_m,
            step_ratio,
            max_gap_m,
            early_exit,
        }
    }
}

/// How to decide whether a point feature is hidden by terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcclusionTest {
    /// Visible iff its apparent angle is no more than `epsilon` below
    /// the skyline of its column.
    Skyline,

    /// Visible iff nothing strictly nearer (by more than the margin)
    /// rises more than `epsilon` above it. Admits features in front of
    /// a higher, farther skyline.
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcclusionConfig {
    /// Angular tolerance, radians.
    pub epsilon: f64,
    pub test: OcclusionTest,
    /// Occluders within this many meters of the feature are ignored by
    /// the depth test.
    pub depth_margin_m: f64,
}

impl Default for OcclusionConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.001,
            test: OcclusionTest::Skyline,
            depth_margin_m: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Features nearer than this are not labelled, meters.
    pub min_distance_m: f64,
    /// Largest offset from the preferred position tried, pixels.
    pub search_radius_px: u32,
    /// Offset increment while searching, pixels.
    pub search_step_px: u32,
    /// Gap between a feature and its label, pixels.
    pub leader_px: u32,
    /// Label text height, pixels.
    pub font_size_px: f32,
    /// Clear border around each label, pixels.
    pub padding_px: u32,
    /// Mark features which are hidden or could not be labelled.
    pub mark_unlabelled: bool,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            min_distance_m: 1000.0,
            search_radius_px: 120,
            search_step_px: 4,
            leader_px: 12,
            font_size_px: 13.0,
            padding_px: 1,
            mark_unlabelled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Skyline steps between neighbouring columns taller than this get
    /// an outline, pixels.
    pub skyline_step_px: u32,
    /// Depth ratio and difference (meters) above which a ridge line is
    /// drawn at full strength.
    pub strong_ratio: f64,
    pub strong_min_m: f64,
    /// Same for the faint ridge lines.
    pub weak_ratio: f64,
    pub weak_min_m: f64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            skyline_step_px: 1,
            strong_ratio: 1.15,
            strong_min_m: 500.0,
            weak_ratio: 1.05,
            weak_min_m: 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisConfig {
    /// Labelled ticks, degrees.
    pub major_interval_deg: f64,
    pub minor_interval_deg: f64,
    pub major_tick_px: u32,
    pub minor_tick_px: u32,
    /// Minor ticks closer together than this are skipped, pixels.
    pub min_tick_spacing_px: f64,
    /// Print N/E/S/W under the quarter ticks.
    pub cardinals: bool,
}

impl Default for AxisConfig {
    fn default() -> Self {
        Self {
            major_interval_deg: 10.0,
            minor_interval_deg: 5.0,
            major_tick_px: 14,
            minor_tick_px: 8,
            min_tick_spacing_px: 4.0,
            cardinals: true,
        }
    }
}

/// RGB colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub sky: [u8; 3],
    pub terrain: [u8; 3],
    pub haze: [u8; 3],
    pub ridge_strong: [u8; 3],
    pub ridge_weak: [u8; 3],
    pub skyline: [u8; 3],
    pub label: [u8; 3],
    pub marker: [u8; 3],
    pub unlabelled: [u8; 3],
    pub axis: [u8; 3],
    pub coastline: [u8; 3],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            sky: [100, 100, 100],
            terrain: [50, 50, 150],
            haze: [235, 50, 150],
            ridge_strong: [0, 0, 0],
            ridge_weak: [30, 30, 30],
            skyline: [0, 0, 0],
            label: [0, 0, 0],
            marker: [255, 0, 0],
            unlabelled: [0, 255, 0],
            axis: [0, 0, 0],
            coastline: [0, 255, 0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OcclusionTest, RenderConfig};
    use std::io::Write;

    #[test]
    fn test_partial_config() {
        let json = r#"{
            "haze_distance_m": 0,
            "occlusion": { "test": "depth" },
            "colors": { "sky": [1, 2, 3] }
        }"#;
        let config: RenderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.haze_distance_m, 0.0);
        assert_eq!(config.occlusion.test, OcclusionTest::Depth);
        assert_eq!(config.occlusion.epsilon, 0.001);
        assert_eq!(config.colors.sky, [1, 2, 3]);
        assert_eq!(config.colors.terrain, RenderConfig::default().colors.terrain);
        assert_eq!(config.march_params(), terrain::MarchParams::default());
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "earth": {{ "refraction": 0.0 }} }}"#).unwrap();
        let config = RenderConfig::from_path(file.path()).unwrap();
        assert_eq!(config.earth_model().refraction, 0.0);
        assert!(RenderConfig::from_path("/nonexistent.json").is_err());
    }
}
