//! SRTM/NASADEM elevation (`.hgt`) tiles.
//!
//! A tile covers one whole-degree cell. Samples are stored row-major
//! starting at the north-west corner, and the outermost rows and
//! columns sit exactly on the cell boundary, so neighbouring tiles
//! share their edge samples.
//!
//! # References
//!
//! 1. [30-Meter SRTM Tile Downloader](https://dwtkns.com/srtm30m)
//! 1. [Archive Team](http://fileformats.archiveteam.org/index.php?title=HGT&oldid=17250)
//! 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)

mod error;

pub use crate::error::NasademError;
use byteorder::{BigEndian as BE, ReadBytesExt};
use geo::geometry::Coord;
use memmap2::Mmap;
use std::{fs::File, io::BufReader, mem::size_of, path::Path, sync::OnceLock};

/// Base floating point type used for all coordinates and calculations.
pub type C = f64;

const ARCSEC_PER_DEG: C = 3600.0;

/// Sample value SRTM uses to mark holes in the data.
pub const VOID: i16 = i16::MIN;

pub struct Tile {
    /// Southwest corner of the tile, in whole degrees.
    ///
    /// This is also the position of the SW most sample.
    sw_corner: Coord<i16>,

    /// Number of samples along each edge.
    dim: usize,

    /// (lowest, highest) non-void sample, computed on first use.
    extrema: OnceLock<(i16, i16)>,

    /// Elevation samples.
    samples: SampleStore,
}

enum SampleStore {
    InMem(Box<[i16]>),
    MemMap(Mmap),
}

impl SampleStore {
    fn get_unchecked(&self, index: usize) -> i16 {
        match self {
            Self::InMem(samples) => samples[index],
            Self::MemMap(raw) => {
                let start = index * size_of::<u16>();
                let bytes = [raw[start], raw[start + 1]];
                i16::from_be_bytes(bytes)
            }
        }
    }

    fn extrema(&self) -> (i16, i16) {
        let fold = |(lo, hi): (i16, i16), sample: i16| {
            if sample == VOID {
                (lo, hi)
            } else {
                (lo.min(sample), hi.max(sample))
            }
        };
        let (lo, hi) = match self {
            Self::InMem(samples) => samples.iter().copied().fold((i16::MAX, i16::MIN), fold),
            Self::MemMap(raw) => raw
                .chunks_exact(2)
                .map(|bytes| i16::from_be_bytes([bytes[0], bytes[1]]))
                .fold((i16::MAX, i16::MIN), fold),
        };
        if lo > hi {
            // Every sample is void.
            (0, 0)
        } else {
            (lo, hi)
        }
    }
}

impl Tile {
    /// Returns a Tile read into memory from the file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, NasademError> {
        let dim = extract_dimension(&path)?;
        let sw_corner = parse_sw_corner(&path)?;

        let mut file = BufReader::new(File::open(path)?);

        let samples = {
            let mut sample_store = Vec::with_capacity(dim * dim);
            for _ in 0..(dim * dim) {
                let sample = file.read_i16::<BE>()?;
                sample_store.push(sample);
            }
            SampleStore::InMem(sample_store.into_boxed_slice())
        };

        Ok(Self {
            sw_corner,
            dim,
            extrema: OnceLock::new(),
            samples,
        })
    }

    /// Returns a Tile using the memory-mapped file as storage.
    pub fn memmap<P: AsRef<Path>>(path: P) -> Result<Self, NasademError> {
        let dim = extract_dimension(&path)?;
        let sw_corner = parse_sw_corner(&path)?;

        let samples = {
            let file = File::open(path)?;
            // Safety: tiles are treated as read-only archives; nothing
            // in this process writes to them while mapped.
            let mmap = unsafe { Mmap::map(&file)? };
            SampleStore::MemMap(mmap)
        };

        Ok(Self {
            sw_corner,
            dim,
            extrema: OnceLock::new(),
            samples,
        })
    }

    /// Returns an in-memory tile built from `samples`, which must be
    /// `dim * dim` values laid out north row first.
    pub fn from_samples(
        sw_corner: Coord<i16>,
        dim: usize,
        samples: Vec<i16>,
    ) -> Result<Self, NasademError> {
        let expected = dim * dim;
        if dim < 2 || samples.len() != expected {
            return Err(NasademError::SampleCount {
                dim,
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            sw_corner,
            dim,
            extrema: OnceLock::new(),
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    /// Returns an in-memory tile whose samples are `f(lat, lon)`
    /// evaluated at each sample position (degrees).
    #[allow(clippy::cast_precision_loss)]
    pub fn from_fn<F>(sw_corner: Coord<i16>, dim: usize, f: F) -> Result<Self, NasademError>
    where
        F: Fn(C, C) -> i16,
    {
        let spacing = 1.0 / dim.saturating_sub(1).max(1) as C;
        let north = C::from(sw_corner.y) + 1.0;
        let west = C::from(sw_corner.x);
        let samples = (0..dim * dim)
            .map(|idx| {
                let (row, col) = (idx / dim, idx % dim);
                f(north - row as C * spacing, west + col as C * spacing)
            })
            .collect();
        Self::from_samples(sw_corner, dim, samples)
    }

    /// Returns the number of samples in this tile.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.dim * self.dim
    }

    /// Returns the number of samples along one edge.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Returns this tile's southwest corner in whole degrees.
    pub fn sw_corner(&self) -> Coord<i16> {
        self.sw_corner
    }

    /// Returns this tile's resolution in arcseconds per sample.
    #[allow(clippy::cast_precision_loss)]
    pub fn resolution(&self) -> C {
        ARCSEC_PER_DEG / (self.dim - 1) as C
    }

    /// Returns the lowest non-void elevation sample in this tile.
    pub fn min_elevation(&self) -> i16 {
        self.extrema.get_or_init(|| self.samples.extrema()).0
    }

    /// Returns the highest non-void elevation sample in this tile.
    pub fn max_elevation(&self) -> i16 {
        self.extrema.get_or_init(|| self.samples.extrema()).1
    }

    /// Returns the nearest sample to the given geo coordinates (x =
    /// longitude, y = latitude, degrees).
    ///
    /// Returns `None` outside the tile or on a void sample.
    pub fn get(&self, coord: Coord<C>) -> Option<i16> {
        let (fx, fy) = self.coord_to_fractional_xy(coord)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let sample = self.get_xy((fx.round() as usize, fy.round() as usize));
        (sample != VOID).then_some(sample)
    }

    /// Returns the bilinearly interpolated elevation at the given geo
    /// coordinates.
    ///
    /// Returns `None` outside the tile or when any of the four
    /// surrounding samples is void.
    pub fn interpolate(&self, coord: Coord<C>) -> Option<C> {
        let (fx, fy) = self.coord_to_fractional_xy(coord)?;
        let last = self.dim - 2;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x0, y0) = (
            (fx.floor() as usize).min(last),
            (fy.floor() as usize).min(last),
        );
        #[allow(clippy::cast_precision_loss)]
        let (tx, ty) = (fx - x0 as C, fy - y0 as C);

        let sw = self.get_xy((x0, y0));
        let se = self.get_xy((x0 + 1, y0));
        let nw = self.get_xy((x0, y0 + 1));
        let ne = self.get_xy((x0 + 1, y0 + 1));
        if [sw, se, nw, ne].contains(&VOID) {
            return None;
        }

        let south = C::from(sw) * (1.0 - tx) + C::from(se) * tx;
        let north = C::from(nw) * (1.0 - tx) + C::from(ne) * tx;
        Some(south * (1.0 - ty) + north * ty)
    }
}

/// Private API
impl Tile {
    /// `x` counts columns eastward from the west edge, `y` counts rows
    /// northward from the south edge.
    fn get_xy(&self, (x, y): (usize, usize)) -> i16 {
        let idx_1d = self.xy_to_linear_index((x, y));
        self.samples.get_unchecked(idx_1d)
    }

    /// Returns the fractional sample position of `coord`, or `None` if
    /// it lies outside this tile.
    #[allow(clippy::cast_precision_loss)]
    fn coord_to_fractional_xy(&self, coord: Coord<C>) -> Option<(C, C)> {
        let samples_per_deg = (self.dim - 1) as C;
        let fx = (coord.x - C::from(self.sw_corner.x)) * samples_per_deg;
        let fy = (coord.y - C::from(self.sw_corner.y)) * samples_per_deg;
        let range = 0.0..=samples_per_deg;
        (range.contains(&fx) && range.contains(&fy)).then_some((fx, fy))
    }

    fn linear_index_to_xy(&self, idx: usize) -> (usize, usize) {
        let y = idx / self.dim;
        let x = idx % self.dim;
        (x, self.dim - 1 - y)
    }

    fn xy_to_linear_index(&self, (x, y): (usize, usize)) -> usize {
        self.dim * (self.dim - y - 1) + x
    }
}

fn extract_dimension<P: AsRef<Path>>(path: P) -> Result<usize, NasademError> {
    const RES_1_ARCSECONDS_FILE_LEN: u64 = 3601 * 3601 * size_of::<u16>() as u64;
    const RES_3_ARCSECONDS_FILE_LEN: u64 = 1201 * 1201 * size_of::<u16>() as u64;
    match path.as_ref().metadata().map(|m| m.len())? {
        RES_1_ARCSECONDS_FILE_LEN => Ok(3601),
        RES_3_ARCSECONDS_FILE_LEN => Ok(1201),
        invalid_len => Err(NasademError::HgtLen(invalid_len, path.as_ref().to_owned())),
    }
}

fn parse_sw_corner<P: AsRef<Path>>(path: P) -> Result<Coord<i16>, NasademError> {
    let mk_err = || NasademError::HgtName(path.as_ref().to_owned());
    let name = path
        .as_ref()
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .ok_or_else(mk_err)?;
    if name.len() != 7 || !name.is_ascii() {
        return Err(mk_err());
    }
    let lat_sign = match &name[0..1] {
        "N" | "n" => 1,
        "S" | "s" => -1,
        _ => return Err(mk_err()),
    };
    let lat = lat_sign * name[1..3].parse::<i16>().map_err(|_| mk_err())?;
    let lon_sign = match &name[3..4] {
        "E" | "e" => 1,
        "W" | "w" => -1,
        _ => return Err(mk_err()),
    };
    let lon = lon_sign * name[4..7].parse::<i16>().map_err(|_| mk_err())?;
    Ok(Coord { x: lon, y: lat })
}
