//! Elevation tile mosaic.

use crate::{
    constants::{ARCSEC_PER_DEG, MEAN_EARTH_RADIUS},
    math::{normalize_angle, wrap_longitude},
    EarthModel, GeoCoordinate, TerrainError,
};
use geo::geometry::Coord;
use log::{debug, info, warn};
use nasadem::Tile;
use rayon::prelude::*;
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::Instant,
};

/// Maximum spacing between sector boundary samples when computing a
/// footprint.
const FOOTPRINT_SPACING_M: f64 = 50.0;

/// A whole-degree cell, addressed by its southwest corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub lat: i16,
    pub lon: i16,
}

impl Cell {
    pub fn new(lat: i16, lon: i16) -> Self {
        Self { lat, lon }
    }

    /// Returns the cell containing `coord`.
    pub fn containing(coord: &GeoCoordinate) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        Self {
            lat: (coord.lat_deg().floor() as i16).clamp(-90, 89),
            lon: (coord.lon_deg().floor() as i16).clamp(-180, 179),
        }
    }

    pub fn sw_corner(&self) -> Coord<i16> {
        Coord {
            x: self.lon,
            y: self.lat,
        }
    }

    /// Returns the expected tile file name for this cell.
    pub fn file_name(&self) -> String {
        format!("{self}.hgt")
    }
}

/// Hemisphere-prefixed stem, e.g. `N47E011`.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n_s, lat) = {
            let lat = self.lat.abs();
            let n_s = if self.lat.is_negative() { 'S' } else { 'N' };
            (n_s, lat)
        };
        let (e_w, lon) = {
            let lon = self.lon.abs();
            let e_w = if self.lon.is_negative() { 'W' } else { 'E' };
            (e_w, lon)
        };
        write!(f, "{n_s}{lat:02}{e_w}{lon:03}")
    }
}

/// Elevation data provider and resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Source {
    /// SRTM v3, 1 arc-second.
    Srtm1,
    /// SRTM v3, 3 arc-second.
    Srtm3,
    /// viewfinderpanoramas.org, 1 arc-second.
    View1,
    /// viewfinderpanoramas.org, 3 arc-second.
    View3,
}

impl Source {
    pub const ALL: [Self; 4] = [Self::Srtm1, Self::Srtm3, Self::View1, Self::View3];

    /// Directory holding this source's tiles, relative to the tile
    /// root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Srtm1 => "SRTM1v3.0",
            Self::Srtm3 => "SRTM3v3.0",
            Self::View1 => "VIEW1",
            Self::View3 => "VIEW3",
        }
    }

    /// Nominal sample spacing in arcseconds.
    pub fn resolution(self) -> u8 {
        match self {
            Self::Srtm1 | Self::View1 => 1,
            Self::Srtm3 | Self::View3 => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Srtm1 => "srtm1",
            Self::Srtm3 => "srtm3",
            Self::View1 => "view1",
            Self::View3 => "view3",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts either the short name (`srtm3`) or the directory name
/// (`SRTM3v3.0`), case-insensitively.
impl FromStr for Source {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self, TerrainError> {
        Self::ALL
            .into_iter()
            .find(|src| src.name().eq_ignore_ascii_case(s) || src.dir_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TerrainError::UnknownSource(s.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub cell: Cell,
    pub source: Source,
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.cell, self.source.dir_name())
    }
}

/// How to handle tile.
///
/// The trade off between loading tile data into memory versus memory
/// mapping is not obvious, and you should measure both before
/// deciding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TileMode {
    /// Parse tile and load into memory.
    ///
    /// Note that this can consume gigabytes of RAM when loading many
    /// tiles.
    InMem,

    /// Memory map file contents.
    #[default]
    MemMap,
}

/// A read-mostly mosaic of elevation tiles from one or more sources.
///
/// Populate it with [`TileStore::load`], [`TileStore::load_footprint`]
/// or [`TileStore::insert`], then share it by reference.
pub struct TileStore {
    /// Root directory containing one subdirectory per source.
    tile_dir: PathBuf,

    /// How to load tiles (in-memory or mapped).
    tile_mode: TileMode,

    /// Sources in order of preference.
    sources: Vec<Source>,

    tiles: HashMap<TileKey, Arc<Tile>>,
}

impl TileStore {
    pub fn new<P: Into<PathBuf>>(tile_dir: P, tile_mode: TileMode, sources: Vec<Source>) -> Self {
        Self {
            tile_dir: tile_dir.into(),
            tile_mode,
            sources,
            tiles: HashMap::new(),
        }
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.tiles.contains_key(key)
    }

    /// Loads the tile for `key` from disk.
    ///
    /// Loading a key which is already present is a no-op.
    pub fn load(&mut self, key: TileKey) -> Result<(), TerrainError> {
        if !self.tiles.contains_key(&key) {
            let tile = self.read_tile(&key)?;
            self.tiles.insert(key, Arc::new(tile));
        }
        Ok(())
    }

    /// Loads every configured source for every cell in `cells`, in
    /// parallel.
    ///
    /// Missing files are skipped. `on_tile` is called once per key
    /// attempted. Returns the keys which were newly loaded.
    pub fn load_footprint<'a, I, F>(&mut self, cells: I, on_tile: F) -> Result<Vec<TileKey>, TerrainError>
    where
        I: IntoIterator<Item = &'a Cell>,
        F: Fn(&TileKey) + Sync,
    {
        let now = Instant::now();
        let cells: Vec<Cell> = cells.into_iter().copied().collect();
        let pending: Vec<TileKey> = self
            .required_keys(&cells)
            .into_iter()
            .filter(|key| !self.tiles.contains_key(key))
            .collect();

        let loaded = pending
            .par_iter()
            .filter_map(|key| {
                let res = match self.read_tile(key) {
                    Ok(tile) => Some(Ok((*key, tile))),
                    Err(TerrainError::TileUnavailable(_)) => None,
                    Err(e) => Some(Err(e)),
                };
                on_tile(key);
                res
            })
            .collect::<Result<Vec<(TileKey, Tile)>, TerrainError>>()?;

        let keys: Vec<TileKey> = loaded.iter().map(|(key, _)| *key).collect();
        for (key, tile) in loaded {
            self.tiles.insert(key, Arc::new(tile));
        }

        for cell in &cells {
            let covered = self
                .sources
                .iter()
                .any(|&source| self.tiles.contains_key(&TileKey { cell: *cell, source }));
            if !covered {
                warn!("no elevation data for {cell}");
            }
        }

        info!(
            "loaded {} of {} tiles for {} cells in {:?}",
            keys.len(),
            pending.len(),
            cells.len(),
            now.elapsed()
        );
        Ok(keys)
    }

    /// Adds a tile built elsewhere. Returns `false`, leaving the store
    /// unchanged, when `key` is already present.
    pub fn insert(&mut self, key: TileKey, tile: Tile) -> bool {
        if self.tiles.contains_key(&key) {
            return false;
        }
        self.tiles.insert(key, Arc::new(tile));
        true
    }

    /// Returns the bilinearly interpolated elevation at `coord` from
    /// the first source, in preference order, able to answer.
    pub fn sample(&self, coord: &GeoCoordinate) -> Option<f64> {
        let cell = Cell::containing(coord);
        let xy: Coord<f64> = (*coord).into();
        self.sources.iter().find_map(|&source| {
            self.tiles
                .get(&TileKey { cell, source })
                .and_then(|tile| tile.interpolate(xy))
        })
    }

    /// Returns every cell which intersects the circular sector of
    /// radius `max_range_m` centered on `observer` and spanning
    /// `azimuth_width` radians around `azimuth_center`.
    ///
    /// The observer's own cell is always included.
    pub fn required_footprint(
        earth: &EarthModel,
        observer: &GeoCoordinate,
        azimuth_center: f64,
        azimuth_width: f64,
        max_range_m: f64,
    ) -> BTreeSet<Cell> {
        let mut cells = BTreeSet::new();
        cells.insert(Cell::containing(observer));
        if max_range_m.is_nan() || max_range_m <= 0.0 {
            return cells;
        }

        let start = azimuth_center - azimuth_width / 2.0;
        let boundary = sector_boundary(earth, observer, start, azimuth_width, max_range_m);
        cells.extend(boundary.iter().map(Cell::containing));

        // Cells lying wholly inside the sector are not crossed by its
        // boundary, but their corners are inside.
        let unwrap = |lon: f64| (observer.lon + wrap_longitude(lon - observer.lon)).to_degrees();
        let (mut lat_min, mut lat_max) = (observer.lat_deg(), observer.lat_deg());
        let (mut lon_min, mut lon_max) = (unwrap(observer.lon), unwrap(observer.lon));
        for point in &boundary {
            lat_min = lat_min.min(point.lat_deg());
            lat_max = lat_max.max(point.lat_deg());
            lon_min = lon_min.min(unwrap(point.lon));
            lon_max = lon_max.max(unwrap(point.lon));
        }

        let full_circle = azimuth_width >= std::f64::consts::TAU;
        #[allow(clippy::cast_possible_truncation)]
        for lat in (lat_min.floor() as i32)..=(lat_max.ceil() as i32) {
            if lat.abs() >= 90 {
                continue;
            }
            for lon in (lon_min.floor() as i32)..=(lon_max.ceil() as i32) {
                let corner = GeoCoordinate::from_degrees(f64::from(lat), f64::from(lon));
                let (distance, bearing) = earth.distance_and_bearing(observer, &corner);
                let offset = normalize_angle(bearing - start);
                let inside = distance > 0.0
                    && distance < max_range_m
                    && (full_circle || (offset > 0.0 && offset < azimuth_width));
                if inside {
                    for (dlat, dlon) in [(0.5, 0.5), (-0.5, 0.5), (0.5, -0.5), (-0.5, -0.5)] {
                        let inner = GeoCoordinate::from_degrees(
                            f64::from(lat) + dlat,
                            f64::from(lon) + dlon,
                        );
                        cells.insert(Cell::containing(&inner));
                    }
                }
            }
        }

        debug!("footprint; cells: {}, boundary samples: {}", cells.len(), boundary.len());
        cells
    }

    /// Crosses `cells` with this store's sources, in preference order.
    pub fn required_keys<'a, I>(&self, cells: I) -> Vec<TileKey>
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        cells
            .into_iter()
            .flat_map(|&cell| self.sources.iter().map(move |&source| TileKey { cell, source }))
            .collect()
    }

    /// Returns the finest sample spacing of any loaded tile, in meters
    /// along a meridian.
    pub fn native_resolution_m(&self) -> Option<f64> {
        self.tiles
            .values()
            .map(|tile| (tile.resolution() / ARCSEC_PER_DEG).to_radians() * MEAN_EARTH_RADIUS)
            .reduce(f64::min)
    }

    /// Returns the highest sample of any loaded tile.
    pub fn max_elevation(&self) -> Option<f64> {
        self.tiles
            .values()
            .map(|tile| tile.max_elevation())
            .max()
            .map(f64::from)
    }
}

/// Private API.
impl TileStore {
    fn tile_path(&self, key: &TileKey) -> Option<PathBuf> {
        let dir = self.tile_dir.join(key.source.dir_name());
        let file_name = key.cell.file_name();
        let tile_path: PathBuf = [&dir, Path::new(&file_name)].iter().collect();
        if tile_path.exists() {
            return Some(tile_path);
        }
        let file_name = file_name.to_lowercase();
        let tile_path: PathBuf = [&dir, Path::new(&file_name)].iter().collect();
        tile_path.exists().then_some(tile_path)
    }

    fn read_tile(&self, key: &TileKey) -> Result<Tile, TerrainError> {
        let tile_path = self
            .tile_path(key)
            .ok_or(TerrainError::TileUnavailable(*key))?;
        debug!("loading {tile_path:?}");
        match self.tile_mode {
            TileMode::InMem => Ok(Tile::load(tile_path)?),
            TileMode::MemMap => Ok(Tile::memmap(tile_path)?),
        }
    }
}

/// Samples both bounding rays and the far arc of a sector no more
/// than `FOOTPRINT_SPACING_M` apart.
fn sector_boundary(
    earth: &EarthModel,
    observer: &GeoCoordinate,
    start: f64,
    width: f64,
    range: f64,
) -> Vec<GeoCoordinate> {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let ray_steps = (range / FOOTPRINT_SPACING_M).ceil().max(1.0) as usize;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let arc_steps = (width * range / FOOTPRINT_SPACING_M).ceil().max(1.0) as usize;

    let mut boundary = Vec::with_capacity(2 * ray_steps + arc_steps + 1);
    for bearing in [start, start + width] {
        #[allow(clippy::cast_precision_loss)]
        boundary.extend(
            (1..=ray_steps).map(|i| earth.destination(observer, bearing, range * i as f64 / ray_steps as f64)),
        );
    }
    #[allow(clippy::cast_precision_loss)]
    boundary.extend(
        (0..=arc_steps).map(|j| earth.destination(observer, start + width * j as f64 / arc_steps as f64, range)),
    );
    boundary
}
