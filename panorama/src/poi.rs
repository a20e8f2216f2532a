//! Named features read from per-cell GeoJSON files.

use crate::PanoramaError;
use geo::{Centroid, LineString, Polygon};
use geojson::{feature::Id, Feature, GeoJson, Value};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs::File,
    io::BufReader,
    path::Path,
    time::Instant,
};
use terrain::{Cell, GeoCoordinate, TileStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoiKind {
    Peak,
    Island,
    Coastline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointOfInterest {
    pub name: String,
    /// Position, with elevation in meters when known.
    pub coord: GeoCoordinate,
    pub kind: PoiKind,
    /// Coastline vertices of one line share a way.
    pub way: Option<u64>,
}

impl PointOfInterest {
    pub fn peak(name: impl Into<String>, coord: GeoCoordinate) -> Self {
        Self {
            name: name.into(),
            coord,
            kind: PoiKind::Peak,
            way: None,
        }
    }

    pub fn elevation(&self) -> Option<f64> {
        self.coord.elevation
    }
}

/// Reads `<poi_dir>/<cell>.geojson` for every cell. Missing files are
/// skipped, features present in more than one file are kept once.
pub fn load_pois<'a, I>(poi_dir: &Path, cells: I) -> Result<Vec<PointOfInterest>, PanoramaError>
where
    I: IntoIterator<Item = &'a Cell>,
{
    let now = Instant::now();
    let mut loader = Loader::default();
    for cell in cells {
        let path = poi_dir.join(format!("{cell}.geojson"));
        if !path.exists() {
            debug!("no features for {cell}");
            continue;
        }
        debug!("reading {path:?}");
        let rdr = BufReader::new(File::open(&path)?);
        loader.add(GeoJson::from_reader(rdr)?);
    }
    info!(
        "features; files: {}, pois: {}, exec: {:?}",
        loader.files,
        loader.pois.len(),
        now.elapsed()
    );
    Ok(loader.pois)
}

/// Fills in missing elevations from the loaded terrain. Features off
/// the loaded tiles keep `None`.
pub fn resolve_elevations(pois: &mut [PointOfInterest], store: &TileStore) {
    for poi in pois.iter_mut().filter(|p| p.coord.elevation.is_none()) {
        poi.coord.elevation = store.sample(&poi.coord);
    }
}

#[derive(Default)]
struct Loader {
    files: usize,
    seen: HashSet<String>,
    next_way: u64,
    pois: Vec<PointOfInterest>,
}

impl Loader {
    fn add(&mut self, geojson: GeoJson) {
        self.files += 1;
        match geojson {
            GeoJson::FeatureCollection(fc) => {
                for feature in fc.features {
                    self.add_feature(feature);
                }
            }
            GeoJson::Feature(feature) => self.add_feature(feature),
            GeoJson::Geometry(_) => (),
        }
    }

    fn add_feature(&mut self, feature: Feature) {
        let Some(geometry) = feature.geometry.as_ref() else {
            return;
        };
        let kind = match feature
            .property("kind")
            .or_else(|| feature.property("natural"))
            .and_then(|v| v.as_str())
        {
            Some("peak") => PoiKind::Peak,
            Some("island") => PoiKind::Island,
            Some("coastline") => PoiKind::Coastline,
            _ => return,
        };
        if let Some(id) = &feature.id {
            let key = match id {
                Id::String(s) => s.clone(),
                Id::Number(n) => n.to_string(),
            };
            if !self.seen.insert(key) {
                return;
            }
        }
        let name = feature
            .property("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_owned();
        let elevation = feature.property("ele").and_then(parse_elevation);

        match (&geometry.value, kind) {
            (Value::Point(pos), PoiKind::Peak | PoiKind::Island) => {
                if let Some(coord) = position(pos) {
                    self.push(name, coord, elevation, kind, None);
                }
            }
            (Value::Polygon(rings), PoiKind::Island) => {
                let Some(exterior) = rings.first() else {
                    return;
                };
                let ring: LineString = exterior
                    .iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| (p[0], p[1]))
                    .collect::<Vec<_>>()
                    .into();
                if let Some(center) = Polygon::new(ring, vec![]).centroid() {
                    let coord = GeoCoordinate::from_degrees(center.y(), center.x());
                    self.push(name, coord, elevation, kind, None);
                }
            }
            (Value::LineString(line), PoiKind::Coastline) => {
                let way = self.next_way;
                self.next_way += 1;
                for pos in line {
                    if let Some(coord) = position(pos) {
                        self.push(name.clone(), coord, Some(0.0), kind, Some(way));
                    }
                }
            }
            _ => (),
        }
    }

    fn push(
        &mut self,
        name: String,
        coord: GeoCoordinate,
        elevation: Option<f64>,
        kind: PoiKind,
        way: Option<u64>,
    ) {
        self.pois.push(PointOfInterest {
            name,
            coord: GeoCoordinate {
                elevation,
                ..coord
            },
            kind,
            way,
        });
    }
}

/// GeoJSON positions are `[lon, lat, ...]` in degrees.
fn position(pos: &[f64]) -> Option<GeoCoordinate> {
    match pos {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => {
            Some(GeoCoordinate::from_degrees(*lat, *lon))
        }
        _ => None,
    }
}

/// Accepts `1234`, `"1234"`, `"1234.5 m"`.
fn parse_elevation(value: &serde_json::Value) -> Option<f64> {
    let meters = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s
            .trim()
            .trim_end_matches('m')
            .trim()
            .replace(',', ".")
            .parse()
            .ok(),
        _ => None,
    };
    meters.filter(|e| e.is_finite())
}
