//! Cylindrical projection raster.
//!
//! Columns map linearly to compass bearing and rows linearly to
//! apparent elevation angle. Pixels are stored column-major so each
//! column can be rendered independently.

use crate::{
    config::{EdgeConfig, Palette},
    text::LabelFont,
    PanoramaError, RenderConfig, Scene,
};
use image::{Rgb, RgbImage};
use imageproc::{drawing, rect::Rect as ImRect};
use log::debug;
use rayon::prelude::*;
use std::{f64::consts::TAU, path::Path, time::Instant};
use terrain::normalize_angle;

/// Angle to pixel mapping of a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub width: u32,
    pub height: u32,
    /// Bearing of the canvas' left edge.
    pub azimuth_start: f64,
    pub azimuth_width: f64,
    pub vertical_center: f64,
    pub vertical_height: f64,
}

impl Projection {
    /// Elevation angle at the center of row `y`.
    pub fn row_angle(&self, y: u32) -> f64 {
        self.vertical_center + self.vertical_height / 2.0
            - (f64::from(y) + 0.5) / f64::from(self.height) * self.vertical_height
    }

    /// Fractional row whose center is at `angle`.
    pub fn angle_to_row(&self, angle: f64) -> f64 {
        (self.vertical_center + self.vertical_height / 2.0 - angle) / self.vertical_height
            * f64::from(self.height)
            - 0.5
    }

    /// Bearing at the center of column `x`, `[0, 2π)`.
    pub fn column_azimuth(&self, x: u32) -> f64 {
        normalize_angle(
            self.azimuth_start
                + (f64::from(x) + 0.5) / f64::from(self.width) * self.azimuth_width,
        )
    }

    /// Fractional column whose center is at `azimuth`, or `None` if
    /// it is outside the view.
    pub fn azimuth_to_column(&self, azimuth: f64) -> Option<f64> {
        let offset = normalize_angle(azimuth - self.azimuth_start);
        (offset <= self.azimuth_width)
            .then(|| offset / self.azimuth_width * f64::from(self.width) - 0.5)
    }
}

pub struct Canvas {
    projection: Projection,
    /// Column-major, `x * height + y`.
    pixels: Vec<Rgb<u8>>,
    /// Distance to the terrain drawn at each pixel, infinite for sky.
    depth: Vec<f64>,
}

impl Canvas {
    pub fn new(projection: Projection) -> Self {
        let len = projection.width as usize * projection.height as usize;
        Self {
            projection,
            pixels: vec![Rgb([0, 0, 0]); len],
            depth: vec![f64::INFINITY; len],
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn width(&self) -> u32 {
        self.projection.width
    }

    pub fn height(&self) -> u32 {
        self.projection.height
    }

    pub fn bucket_fill(&mut self, color: Rgb<u8>) {
        self.pixels.fill(color);
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgb<u8>> {
        self.index(i64::from(x), i64::from(y)).map(|i| self.pixels[i])
    }

    /// Distance to the terrain at a pixel, infinite for sky, `None`
    /// off canvas.
    pub fn depth(&self, x: i64, y: i64) -> Option<f64> {
        self.index(x, y).map(|i| self.depth[i])
    }

    /// Sets a pixel, ignoring coordinates off canvas.
    pub fn put_pixel(&mut self, x: i64, y: i64, color: Rgb<u8>) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    /// Paints the terrain of `scene`, one column per horizon record.
    pub fn render_scene(&mut self, scene: &Scene, config: &RenderConfig) {
        let now = Instant::now();
        let height = self.projection.height as usize;
        let rows: Vec<f64> = (0..self.projection.height)
            .map(|y| self.projection.row_angle(y))
            .collect();
        let palette = config.colors;
        let haze = config.haze_distance_m;

        self.pixels
            .par_chunks_mut(height)
            .zip(self.depth.par_chunks_mut(height))
            .zip(scene.profile().records().par_iter())
            .for_each(|((pixels, depth), record)| {
                if !record.valid {
                    return;
                }
                for (y, &angle) in rows.iter().enumerate() {
                    if angle > record.angle {
                        continue;
                    }
                    if let Some(d) = record.depth_at(angle) {
                        depth[y] = d;
                        pixels[y] = terrain_color(&palette, haze, d);
                    }
                }
            });

        debug!("render; exec: {:?}", now.elapsed());
    }

    /// Darkens pixels where the terrain distance jumps: ridge lines
    /// inside the terrain and the outline of the skyline.
    pub fn highlight_edges(&mut self, edges: &EdgeConfig, palette: &Palette) {
        let now = Instant::now();
        let (width, height) = (self.projection.width, self.projection.height);
        let strong = Rgb(palette.ridge_strong);
        let weak = Rgb(palette.ridge_weak);

        for x in 0..width {
            let mut z_prev = 1e6;
            for y in 0..height {
                let i = x as usize * height as usize + y as usize;
                let z = self.depth[i];
                if z_prev / z > edges.strong_ratio && z_prev - z > edges.strong_min_m {
                    self.pixels[i] = strong;
                } else if z_prev / z > edges.weak_ratio && z_prev - z > edges.weak_min_m {
                    self.pixels[i] = weak;
                }
                z_prev = z;
            }
        }

        let tops: Vec<Option<u32>> = (0..width).map(|x| self.column_top(x)).collect();
        let skyline = Rgb(palette.skyline);
        // A full circle also joins across the seam.
        let seam = (self.projection.azimuth_width >= TAU && width > 1).then_some((width - 1, 0));
        for (lx, rx) in (1..width).map(|x| (x - 1, x)).chain(seam) {
            let (Some(left), Some(right)) = (tops[lx as usize], tops[rx as usize]) else {
                continue;
            };
            if left.abs_diff(right) <= edges.skyline_step_px {
                continue;
            }
            let (column, from, to) = if left < right {
                (lx, left, right)
            } else {
                (rx, right, left)
            };
            for y in from..to {
                self.put_pixel(i64::from(column), i64::from(y), skyline);
            }
        }

        debug!("highlight; exec: {:?}", now.elapsed());
    }

    /// First terrain row of column `x`.
    pub fn column_top(&self, x: u32) -> Option<u32> {
        let height = self.projection.height as usize;
        let start = x as usize * height;
        self.depth
            .get(start..start + height)?
            .iter()
            .position(|d| d.is_finite())
            .and_then(|y| u32::try_from(y).ok())
    }

    /// Straight line, clipped to the canvas.
    pub fn draw_line(&mut self, (x0, y0): (i64, i64), (x1, y1): (i64, i64), color: Rgb<u8>) {
        #[allow(clippy::cast_precision_loss)]
        drawing::draw_line_segment_mut(
            self,
            (x0 as f32, y0 as f32),
            (x1 as f32, y1 as f32),
            color,
        );
    }

    pub fn fill_rect(&mut self, x: i64, y: i64, width: u32, height: u32, color: Rgb<u8>) {
        let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
            return;
        };
        if width > 0 && height > 0 {
            drawing::draw_filled_rect_mut(self, ImRect::at(x, y).of_size(width, height), color);
        }
    }

    /// Draws `text` with the top-left corner of its box at `(x, y)`.
    pub fn draw_text(&mut self, x: i64, y: i64, text: &str, font: &LabelFont, color: Rgb<u8>) {
        let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) else {
            return;
        };
        drawing::draw_text_mut(self, color, x, y, font.scale(), font.font(), text);
    }

    /// Row-major copy of the raster.
    pub fn into_image(self) -> RgbImage {
        let height = self.projection.height;
        RgbImage::from_fn(self.projection.width, height, |x, y| {
            self.pixels[x as usize * height as usize + y as usize]
        })
    }

    /// Writes the raster, format chosen by the file extension.
    pub fn save<P: AsRef<Path>>(self, path: P) -> Result<(), PanoramaError> {
        let now = Instant::now();
        let path = path.as_ref();
        self.into_image().save(path)?;
        debug!("saved {path:?}; exec: {:?}", now.elapsed());
        Ok(())
    }
}

/// Private API.
impl Canvas {
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let (width, height) = (
            i64::from(self.projection.width),
            i64::from(self.projection.height),
        );
        if (0..width).contains(&x) && (0..height).contains(&y) {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            Some((x * height + y) as usize)
        } else {
            None
        }
    }
}

/// Lets `imageproc` draw straight into the column-major buffer.
impl drawing::Canvas for Canvas {
    type Pixel = Rgb<u8>;

    fn dimensions(&self) -> (u32, u32) {
        (self.projection.width, self.projection.height)
    }

    fn get_pixel(&self, x: u32, y: u32) -> Rgb<u8> {
        Canvas::get_pixel(self, x, y).unwrap_or(Rgb([0, 0, 0]))
    }

    fn draw_pixel(&mut self, x: u32, y: u32, color: Rgb<u8>) {
        self.put_pixel(i64::from(x), i64::from(y), color);
    }
}

/// Terrain color at `distance_m`, fading towards the haze color.
fn terrain_color(palette: &Palette, haze_distance_m: f64, distance_m: f64) -> Rgb<u8> {
    let t = if haze_distance_m > 0.0 {
        1.0 - (-distance_m / haze_distance_m).exp()
    } else {
        0.0
    };
    let mix = |a: u8, b: u8| {
        let v = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let v = v.round().clamp(0.0, 255.0) as u8;
        v
    };
    let (near, far) = (palette.terrain, palette.haze);
    Rgb([
        mix(near[0], far[0]),
        mix(near[1], far[1]),
        mix(near[2], far[2]),
    ])
}
