use anyhow::{anyhow, Error as AnyError};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, str::FromStr};
use terrain::Source;

/// Render panoramic views of visible terrain.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Directory with one subdirectory of elevation tiles per source.
    #[arg(short, long)]
    pub tile_dir: PathBuf,

    /// Directory of per-cell GeoJSON features to label.
    #[arg(short, long)]
    pub poi_dir: Option<PathBuf>,

    /// JSON render configuration.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Memory map tiles instead of reading them.
    #[arg(long, default_value_t = false)]
    pub memmap: bool,

    /// Observer "lat,lon" or "lat,lon,elevation", degrees and meters
    /// above sea level. Without elevation the terrain is used.
    #[arg(long, allow_hyphen_values = true)]
    pub observer: LatLonElev,

    /// Eye height above the observer's elevation, in meters.
    #[arg(long, default_value_t = 10.0)]
    pub eye_height: f64,

    /// Compass direction of the view center, in degrees.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub view_dir: f64,

    /// Horizontal field of view, in degrees.
    #[arg(long, default_value_t = 100.0)]
    pub view_width: f64,

    /// Elevation angle of the view center, in degrees.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub view_dir_v: f64,

    /// Vertical field of view, in degrees. Derived from the canvas
    /// height when omitted.
    #[arg(long)]
    pub view_height: Option<f64>,

    /// How far to look, in kilometers.
    #[arg(short, long, default_value_t = 20.0)]
    pub range: f64,

    /// Canvas width, in pixels.
    #[arg(long, default_value_t = 10000)]
    pub canvas_width: u32,

    /// Canvas height, in pixels. Derived from the vertical field of
    /// view when omitted.
    #[arg(long)]
    pub canvas_height: Option<u32>,

    /// Elevation sources, most preferred first.
    #[arg(long, value_delimiter = ',', default_value = "view1,srtm1,view3,srtm3")]
    pub sources: Vec<Source>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Clone, Debug, Copy)]
pub struct LatLonElev {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
}

impl FromStr for LatLonElev {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let (lat, lon, elevation) = match parts.as_slice() {
            [lat, lon] => (lat, lon, None),
            [lat, lon, elevation] => (lat, lon, Some(f64::from_str(elevation)?)),
            _ => return Err(anyhow!("not a valid lat,lon[,elevation]")),
        };
        Ok(Self {
            lat: f64::from_str(lat)?,
            lon: f64::from_str(lon)?,
            elevation,
        })
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the tiles the view needs as JSON, for fetching.
    Footprint,

    /// Render the panorama to an image file.
    Render {
        /// Output PNG file.
        #[arg(short, long, default_value = "panorama.png")]
        output: PathBuf,
    },
}
