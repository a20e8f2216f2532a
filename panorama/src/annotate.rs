//! Labels on top of a rendered panorama.
//!
//! Point features are projected with the same earth model as the
//! terrain, tested against the horizon of their column, and labelled
//! highest first. Labels never overlap each other or the axis.

use crate::{
    config::OcclusionTest, text::LabelFont, Canvas, PanoramaError, PoiKind, PointOfInterest,
    RenderConfig, Scene,
};
use image::Rgb;
use log::{debug, info};
use std::{f64::consts::TAU, iter, time::Instant};
use terrain::EarthModel;

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    fn right(&self) -> i64 {
        self.x + i64::from(self.width)
    }

    fn bottom(&self) -> i64 {
        self.y + i64::from(self.height)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    fn within(&self, width: u32, height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= i64::from(width)
            && self.bottom() <= i64::from(height)
    }

    fn padded(&self, pad: u32) -> Rect {
        Rect {
            x: self.x - i64::from(pad),
            y: self.y - i64::from(pad),
            width: self.width + 2 * pad,
            height: self.height + 2 * pad,
        }
    }

    fn offset(&self, dx: i64, dy: i64) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// A feature which was labelled.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub name: String,
    pub kind: PoiKind,
    pub anchor: (i64, i64),
    pub label: Rect,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationReport {
    pub placed: Vec<Placement>,
    /// In view but behind terrain.
    pub hidden: usize,
    /// Visible, but no free spot for the label.
    pub dropped: usize,
    /// Out of range, outside the view window, or without elevation.
    pub out_of_view: usize,
}

/// A feature projected onto the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Located {
    x: f64,
    y: f64,
    distance_m: f64,
    azimuth: f64,
    elevation_m: f64,
    visible: bool,
}

pub struct Annotator<'a> {
    config: &'a RenderConfig,
    earth: EarthModel,
    font: LabelFont,
    /// Padded rectangles already taken.
    placed: Vec<Rect>,
}

impl<'a> Annotator<'a> {
    pub fn new(config: &'a RenderConfig) -> Result<Self, PanoramaError> {
        Ok(Self {
            config,
            earth: config.earth_model(),
            font: LabelFont::new(config.labels.font_size_px)?,
            placed: Vec::new(),
        })
    }

    /// Returns whether `poi` can be seen from the scene's observer, or
    /// `None` if it is not in view at all.
    pub fn is_visible(&self, scene: &Scene, poi: &PointOfInterest) -> Option<bool> {
        self.locate(scene, poi).map(|l| l.visible)
    }

    pub fn annotate_peaks(&mut self, scene: &Scene, canvas: &mut Canvas) -> AnnotationReport {
        let now = Instant::now();
        let report = self.annotate_points(scene, canvas, PoiKind::Peak);
        info!(
            "peaks; placed: {}, hidden: {}, dropped: {}, out of view: {}, exec: {:?}",
            report.placed.len(),
            report.hidden,
            report.dropped,
            report.out_of_view,
            now.elapsed()
        );
        report
    }

    pub fn annotate_islands(&mut self, scene: &Scene, canvas: &mut Canvas) -> AnnotationReport {
        let now = Instant::now();
        let report = self.annotate_points(scene, canvas, PoiKind::Island);
        info!(
            "islands; placed: {}, hidden: {}, dropped: {}, out of view: {}, exec: {:?}",
            report.placed.len(),
            report.hidden,
            report.dropped,
            report.out_of_view,
            now.elapsed()
        );
        report
    }

    /// Compass ticks along the top edge, degrees under the major ticks
    /// and N/E/S/W under the quarter ticks. Text boxes are reserved so
    /// feature labels keep clear of them.
    ///
    /// Ticks on the canvas edges are pulled inside. A full circle gets
    /// its seam tick once, on the left.
    #[allow(clippy::cast_possible_truncation)]
    pub fn label_axis(&mut self, scene: &Scene, canvas: &mut Canvas) {
        let axis = self.config.axis;
        let color = Rgb(self.config.colors.axis);
        let projection = scene.projection();
        let full_circle = projection.azimuth_width >= TAU;
        let last_x = i64::from(projection.width) - 1;
        let start_deg = projection.azimuth_start.to_degrees();
        let width_deg = projection.azimuth_width.to_degrees();
        let px_per_deg = f64::from(projection.width) / width_deg;

        let interval = if axis.minor_interval_deg * px_per_deg >= axis.min_tick_spacing_px {
            axis.minor_interval_deg
        } else {
            axis.major_interval_deg
        };
        if !(interval > 0.0) {
            return;
        }

        let first = (start_deg / interval).ceil() as i64;
        let mut last = ((start_deg + width_deg) / interval).floor() as i64;
        #[allow(clippy::cast_precision_loss)]
        let span_deg = (last - first) as f64 * interval;
        if full_circle && span_deg >= 360.0 - 1e-9 {
            last -= 1;
        }
        let mut ticks = 0;
        for k in first..=last {
            #[allow(clippy::cast_precision_loss)]
            let deg = k as f64 * interval;
            let x = (((deg - start_deg) * px_per_deg).floor() as i64).clamp(0, last_x);
            let major = is_multiple(deg, axis.major_interval_deg);
            let length = if major {
                axis.major_tick_px
            } else {
                axis.minor_tick_px
            };
            canvas.fill_rect(x, 0, 1, length, color);
            ticks += 1;
            if !major {
                continue;
            }

            let compass = deg.rem_euclid(360.0).round() as i64 % 360;
            let mut y = i64::from(length) + 2;
            let mut texts = vec![format!("{compass}°")];
            if axis.cardinals && compass % 90 == 0 {
                texts.push(["N", "E", "S", "W"][(compass / 90) as usize].to_owned());
            }
            for text in texts {
                let (w, h) = self.font.text_size(&text);
                let rect = Rect {
                    x: (x - i64::from(w / 2)).clamp(0, (last_x + 1 - i64::from(w)).max(0)),
                    y,
                    width: w,
                    height: h,
                };
                canvas.draw_text(rect.x, rect.y, &text, &self.font, color);
                self.placed.push(rect.padded(self.config.labels.padding_px));
                y += i64::from(h) + 2;
            }
        }
        debug!("axis; ticks: {ticks}");
    }

    /// Joins consecutive vertices of each coastline which are not
    /// hidden behind terrain. Returns the number of segments drawn.
    #[allow(clippy::cast_possible_truncation)]
    pub fn draw_coastlines(&self, scene: &Scene, canvas: &mut Canvas) -> usize {
        let now = Instant::now();
        let color = Rgb(self.config.colors.coastline);
        let margin = self.config.occlusion.depth_margin_m;
        let half_width = f64::from(canvas.width()) / 2.0;

        let vertices: Vec<(Option<u64>, Option<(f64, f64)>)> = scene
            .pois()
            .iter()
            .filter(|p| p.kind == PoiKind::Coastline)
            .map(|p| {
                let on_canvas = self.project(scene, p, 0.0).and_then(|l| {
                    let depth = canvas.depth(l.x.round() as i64, l.y.round() as i64)?;
                    (depth > l.distance_m - margin).then_some((l.x, l.y))
                });
                (p.way, on_canvas)
            })
            .collect();

        let mut segments = 0;
        for pair in vertices.windows(2) {
            let ((way_a, a), (way_b, b)) = (pair[0], pair[1]);
            if way_a.is_none() || way_a != way_b {
                continue;
            }
            let (Some((xa, ya)), Some((xb, yb))) = (a, b) else {
                continue;
            };
            if (xa - xb).abs() > half_width {
                continue;
            }
            canvas.draw_line(
                (xa.round() as i64, ya.round() as i64),
                (xb.round() as i64, yb.round() as i64),
                color,
            );
            segments += 1;
        }
        info!("coastlines; segments: {segments}, exec: {:?}", now.elapsed());
        segments
    }
}

/// Private API.
impl<'a> Annotator<'a> {
    fn annotate_points(&mut self, scene: &Scene, canvas: &mut Canvas, kind: PoiKind) -> AnnotationReport {
        let mut report = AnnotationReport::default();
        let mut located: Vec<(&PointOfInterest, Located)> = Vec::new();
        for poi in scene.pois().iter().filter(|p| p.kind == kind) {
            match self.locate(scene, poi) {
                None => report.out_of_view += 1,
                Some(l) if !l.visible => {
                    report.hidden += 1;
                    self.mark_unlabelled(canvas, &l);
                }
                Some(l) => located.push((poi, l)),
            }
        }

        located.sort_by(|(pa, a), (pb, b)| {
            b.elevation_m
                .total_cmp(&a.elevation_m)
                .then_with(|| a.azimuth.total_cmp(&b.azimuth))
                .then_with(|| pa.name.cmp(&pb.name))
        });

        let colors = self.config.colors;
        for (poi, l) in located {
            #[allow(clippy::cast_possible_truncation)]
            let anchor = (l.x.round() as i64, l.y.round() as i64);
            let text = label_text(poi, &l);
            let size = self.font.text_size(&text);
            let Some(rect) = self.place(canvas.width(), canvas.height(), anchor, size) else {
                report.dropped += 1;
                self.mark_unlabelled(canvas, &l);
                continue;
            };

            let leader_end = if rect.bottom() <= anchor.1 {
                (rect.x + i64::from(rect.width / 2), rect.bottom())
            } else {
                (rect.x + i64::from(rect.width / 2), rect.y - 1)
            };
            canvas.draw_line(anchor, leader_end, Rgb(colors.label));
            canvas.fill_rect(anchor.0 - 1, anchor.1 - 1, 3, 3, Rgb(colors.marker));
            canvas.draw_text(rect.x, rect.y, &text, &self.font, Rgb(colors.label));

            report.placed.push(Placement {
                name: poi.name.clone(),
                kind: poi.kind,
                anchor,
                label: rect,
                text,
            });
        }
        report
    }

    fn mark_unlabelled(&self, canvas: &mut Canvas, l: &Located) {
        if self.config.labels.mark_unlabelled {
            #[allow(clippy::cast_possible_truncation)]
            let (x, y) = (l.x.round() as i64, l.y.round() as i64);
            canvas.fill_rect(x - 1, y - 1, 3, 3, Rgb(self.config.colors.unlabelled));
        }
    }

    /// Projects `poi` and tests it against the horizon of its column.
    fn locate(&self, scene: &Scene, poi: &PointOfInterest) -> Option<Located> {
        let mut l = self.project(scene, poi, self.config.labels.min_distance_m)?;
        let column = scene.profile().column_for_azimuth(l.azimuth)?;
        let record = scene.profile().get(column)?;
        let angle = self
            .earth
            .apparent_elevation_angle(scene.observer_altitude_m(), l.elevation_m, l.distance_m);
        let occlusion = self.config.occlusion;
        l.visible = match occlusion.test {
            OcclusionTest::Skyline => !record.valid || angle >= record.angle - occlusion.epsilon,
            OcclusionTest::Depth => !record.occludes(
                angle + occlusion.epsilon,
                l.distance_m - occlusion.depth_margin_m,
            ),
        };
        Some(l)
    }

    /// Canvas position of `poi`, if it lies within range and inside the
    /// view window.
    fn project(&self, scene: &Scene, poi: &PointOfInterest, min_distance_m: f64) -> Option<Located> {
        let elevation_m = poi.elevation()?;
        let (distance_m, azimuth) = self
            .earth
            .distance_and_bearing(scene.profile().observer(), &poi.coord);
        if distance_m > scene.profile().max_range_m() || distance_m < min_distance_m {
            return None;
        }
        let projection = scene.projection();
        let x = projection.azimuth_to_column(azimuth)?;
        let angle = self
            .earth
            .apparent_elevation_angle(scene.observer_altitude_m(), elevation_m, distance_m);
        let y = projection.angle_to_row(angle);
        if !(-0.5..f64::from(projection.height) - 0.5).contains(&y) {
            return None;
        }
        Some(Located {
            x,
            y,
            distance_m,
            azimuth,
            elevation_m,
            visible: true,
        })
    }

    /// Finds a free spot for a label of `size` near `anchor`, trying
    /// vertical offsets first, then horizontal ones. The preferred spot
    /// is centered above the anchor.
    fn place(&mut self, width: u32, height: u32, anchor: (i64, i64), size: (u32, u32)) -> Option<Rect> {
        let labels = self.config.labels;
        let step = i64::from(labels.search_step_px.max(1));
        let radius = i64::from(labels.search_radius_px);
        let (w, h) = size;
        let base = Rect {
            x: anchor.0 - i64::from(w / 2),
            y: anchor.1 - i64::from(labels.leader_px) - i64::from(h),
            width: w,
            height: h,
        };
        let marker = Rect {
            x: anchor.0 - 1,
            y: anchor.1 - 1,
            width: 3,
            height: 3,
        };

        for dx in offsets(step, radius) {
            for dy in offsets(step, radius).map(|d| -d) {
                let rect = base.offset(dx, dy);
                let padded = rect.padded(labels.padding_px);
                if rect.within(width, height)
                    && !padded.intersects(&marker)
                    && !self.placed.iter().any(|r| r.intersects(&padded))
                {
                    self.placed.push(padded);
                    self.placed.push(marker);
                    return Some(rect);
                }
            }
        }
        None
    }
}

/// `0, s, -s, 2s, -2s, ...` up to `radius`.
fn offsets(step: i64, radius: i64) -> impl Iterator<Item = i64> {
    iter::once(0).chain(
        (1..)
            .take_while(move |k| k * step <= radius)
            .flat_map(move |k| [k * step, -k * step]),
    )
}

fn is_multiple(value: f64, interval: f64) -> bool {
    interval > 0.0 && {
        let ratio = value / interval;
        (ratio - ratio.round()).abs() < 1e-9
    }
}

fn label_text(poi: &PointOfInterest, l: &Located) -> String {
    let km = l.distance_m / 1000.0;
    match (poi.name.is_empty(), poi.kind) {
        (true, PoiKind::Island) => format!("{km:.0}km"),
        (false, PoiKind::Island) => format!("{}, {km:.0}km", poi.name),
        (true, _) => format!("{:.0}m, {km:.0}km", l.elevation_m),
        (false, _) => format!("{}, {:.0}m, {km:.0}km", poi.name, l.elevation_m),
    }
}

#[cfg(test)]
mod tests {
    use super::{label_text, offsets, AnnotationReport, Annotator, Located, Rect};
    use crate::{
        config::OcclusionTest, poi, testing, Canvas, PoiKind, PointOfInterest, RenderConfig,
        ViewParameters,
    };
    use image::Rgb;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};
    use terrain::{Cell, GeoCoordinate};

    #[test]
    fn test_offsets() {
        assert_eq!(offsets(4, 10).collect::<Vec<_>>(), vec![0, 4, -4, 8, -8]);
        assert_eq!(offsets(4, 0).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect { x: 0, y: 0, width: 10, height: 5 };
        assert!(a.intersects(&Rect { x: 9, y: 4, width: 3, height: 3 }));
        assert!(!a.intersects(&Rect { x: 10, y: 0, width: 3, height: 3 }));
        assert!(!a.intersects(&Rect { x: 0, y: 5, width: 3, height: 3 }));
        assert!(a.within(10, 5));
        assert!(!a.offset(-1, 0).within(10, 5));
    }

    #[test]
    fn test_label_search() {
        let config = RenderConfig::default();
        let mut annotator = Annotator::new(&config).unwrap();
        let first = annotator.place(400, 200, (200, 100), (60, 7)).unwrap();
        assert_eq!(first, Rect { x: 170, y: 81, width: 60, height: 7 });

        // Same spot again: the label moves up, clear of the first one.
        let second = annotator.place(400, 200, (200, 100), (60, 7)).unwrap();
        assert_eq!(second.x, first.x);
        assert!(second.y < first.y);
        assert!(!second.intersects(&first.padded(config.labels.padding_px)));

        // No room at all.
        let mut tight = RenderConfig::default();
        tight.labels.search_radius_px = 0;
        let mut annotator = Annotator::new(&tight).unwrap();
        assert!(annotator.place(400, 200, (200, 100), (60, 7)).is_some());
        assert!(annotator.place(400, 200, (200, 100), (60, 7)).is_none());
        assert!(annotator.place(400, 200, (5, 5), (60, 7)).is_none());
    }

    /// A peak 10 km out along the middle column, `delta` radians above
    /// or below the visibility threshold. The skyline is the flat
    /// ground at the 30 km range limit.
    fn threshold_peak(delta: f64, test: OcclusionTest) -> (AnnotationReport, Option<bool>) {
        let store = testing::flat_store(0);
        let mut config = RenderConfig::default();
        config.occlusion.test = test;
        let earth = config.earth_model();
        let observer = GeoCoordinate::from_degrees(46.5, 10.5).with_elevation(0.0);

        let view = |vertical_center: f64| {
            ViewParameters::builder()
                .observer(observer)
                .eye_height(100.0)
                .azimuth(FRAC_PI_2, 10_f64.to_radians())
                .vertical_center(vertical_center)
                .vertical_height(2_f64.to_radians())
                .range(30_000.0)
                .width(200)
                .height(120)
                .build()
                .unwrap()
        };
        let skyline = testing::scene(view(0.0), &store, &config, vec![]);
        let record = skyline.profile().get(100).unwrap().clone();
        assert!(record.valid);

        let theta = record.angle - config.occlusion.epsilon + delta;
        let distance = 10_000.0;
        let elevation = 100.0 + earth.curvature_drop(distance) + distance * theta.tan();
        let coord = earth
            .destination(&observer, record.azimuth, distance)
            .with_elevation(elevation);
        let peak = PointOfInterest::peak("Threshold", coord);

        let scene = testing::scene(view(record.angle), &store, &config, vec![peak.clone()]);
        let mut annotator = Annotator::new(&config).unwrap();
        let visible = annotator.is_visible(&scene, &peak);
        let mut canvas = Canvas::new(scene.projection());
        (annotator.annotate_peaks(&scene, &mut canvas), visible)
    }

    #[test]
    fn test_visible_iff_above_horizon_minus_epsilon() {
        let (report, visible) = threshold_peak(1e-5, OcclusionTest::Skyline);
        assert_eq!(visible, Some(true));
        assert_eq!(report.placed.len(), 1);
        assert_eq!(report.hidden, 0);
        assert!(report.placed[0].text.starts_with("Threshold, "));
        assert!(report.placed[0].text.ends_with(", 10km"));

        let (report, visible) = threshold_peak(-1e-5, OcclusionTest::Skyline);
        assert_eq!(visible, Some(false));
        assert!(report.placed.is_empty());
        assert_eq!(report.hidden, 1);
    }

    #[test]
    fn test_depth_test_admits_foreground() {
        // Below the skyline but nothing nearer rises above it: the
        // flat ground in front never occludes.
        let (report, visible) = threshold_peak(-2e-3, OcclusionTest::Depth);
        assert_eq!(visible, Some(true));
        assert_eq!(report.placed.len(), 1);

        let (_, visible) = threshold_peak(-2e-3, OcclusionTest::Skyline);
        assert_eq!(visible, Some(false));
    }

    #[test]
    fn test_out_of_view() {
        let store = testing::flat_store(500);
        let config = RenderConfig::default();
        let observer = GeoCoordinate::from_degrees(46.5, 10.5);
        let view = ViewParameters::builder()
            .observer(observer)
            .azimuth(0.0, FRAC_PI_2)
            .range(20_000.0)
            .width(90)
            .height(40)
            .build()
            .unwrap();
        let earth = config.earth_model();
        let at = |bearing: f64, distance: f64| {
            earth.destination(&observer, bearing, distance).with_elevation(3000.0)
        };
        let pois = vec![
            PointOfInterest::peak("behind", at(PI, 10_000.0)),
            PointOfInterest::peak("too far", at(0.1, 25_000.0)),
            PointOfInterest::peak("too near", at(0.1, 500.0)),
            PointOfInterest::peak("unknown", GeoCoordinate::from_degrees(46.6, 10.5)),
        ];
        let scene = testing::scene(view, &store, &config, pois);
        let mut annotator = Annotator::new(&config).unwrap();
        for poi in scene.pois() {
            assert_eq!(annotator.is_visible(&scene, poi), None, "{}", poi.name);
        }
        let mut canvas = Canvas::new(scene.projection());
        let report = annotator.annotate_peaks(&scene, &mut canvas);
        assert_eq!(report.out_of_view, 4);
    }

    #[test]
    fn test_peaks_placed_highest_first() {
        let store = testing::flat_store(0);
        let config = RenderConfig::default();
        let observer = GeoCoordinate::from_degrees(46.5, 10.5).with_elevation(0.0);
        let view = ViewParameters::builder()
            .observer(observer)
            .azimuth(0.0, 60_f64.to_radians())
            .vertical_center(0.03)
            .vertical_height(12_f64.to_radians())
            .range(30_000.0)
            .width(600)
            .height(120)
            .build()
            .unwrap();
        let earth = config.earth_model();
        let peak = |name: &str, bearing: f64, elevation: f64| {
            PointOfInterest::peak(
                name,
                earth
                    .destination(&observer, bearing, 10_000.0)
                    .with_elevation(elevation),
            )
        };
        let pois = vec![
            peak("Low", 0.01, 400.0),
            peak("High", 0.02, 900.0),
            peak("Mid", 0.015, 600.0),
        ];
        let scene = testing::scene(view, &store, &config, pois);
        let mut canvas = Canvas::new(scene.projection());
        let report = Annotator::new(&config).unwrap().annotate_peaks(&scene, &mut canvas);

        let names: Vec<_> = report.placed.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["High", "Mid", "Low"]);
        for (i, a) in report.placed.iter().enumerate() {
            assert!(a.label.within(600, 120));
            for b in &report.placed[i + 1..] {
                assert!(!a.label.intersects(&b.label));
            }
        }
        let (x, y) = report.placed[0].anchor;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let marker = canvas.get_pixel(x as u32, y as u32).unwrap();
        assert_eq!(marker, Rgb(config.colors.marker));
    }

    #[test]
    fn test_axis() {
        let store = testing::flat_store(0);
        let config = RenderConfig::default();
        let view = ViewParameters::builder()
            .observer(GeoCoordinate::from_degrees(46.5, 10.5))
            .azimuth(PI, TAU)
            .range(0.0)
            .width(400)
            .height(60)
            .build()
            .unwrap();
        let scene = testing::scene(view, &store, &config, vec![]);
        let mut canvas = Canvas::new(scene.projection());
        let sky = Rgb([7, 7, 7]);
        canvas.bucket_fill(sky);
        let mut annotator = Annotator::new(&config).unwrap();
        annotator.label_axis(&scene, &mut canvas);

        let axis = Rgb(config.colors.axis);
        // 10° major tick, 15° minor tick.
        assert_eq!(canvas.get_pixel(11, 13), Some(axis));
        assert_eq!(canvas.get_pixel(16, 7), Some(axis));
        assert_eq!(canvas.get_pixel(16, 8), Some(sky));
        assert_eq!(canvas.get_pixel(13, 0), Some(sky));
        assert!(!annotator.placed.is_empty());

        // An east-facing peak label may not cover the "90°" and "E" text.
        let reserved = annotator.placed.clone();
        let rect = annotator.place(400, 60, (100, 20), (30, 7)).unwrap();
        assert!(reserved.iter().all(|r| !r.intersects(&rect)));
    }

    #[test]
    fn test_axis_full_circle_has_north() {
        let store = testing::flat_store(0);
        let config = RenderConfig::default();
        let view = ViewParameters::builder()
            .observer(GeoCoordinate::from_degrees(46.5, 10.5))
            .azimuth(PI, TAU)
            .range(0.0)
            .width(360)
            .height(80)
            .build()
            .unwrap();
        let scene = testing::scene(view, &store, &config, vec![]);
        let mut canvas = Canvas::new(scene.projection());
        let sky = Rgb([7, 7, 7]);
        canvas.bucket_fill(sky);
        let mut annotator = Annotator::new(&config).unwrap();
        annotator.label_axis(&scene, &mut canvas);

        let axis = Rgb(config.colors.axis);
        // North sits on the left edge, full length.
        assert_eq!(canvas.get_pixel(0, 0), Some(axis));
        assert_eq!(canvas.get_pixel(0, 13), Some(axis));
        assert_eq!(canvas.get_pixel(355, 0), Some(axis));
        // 360° is not drawn again on the right edge.
        assert_eq!(canvas.get_pixel(359, 0), Some(sky));

        // "0°" and "N" below it are both kept on the canvas.
        let first_row = i64::from(config.axis.major_tick_px) + 2 - 1;
        assert!(annotator.placed.iter().any(|r| r.x == -1 && r.y == first_row));
        assert!(annotator.placed.iter().any(|r| r.x == -1 && r.y > first_row));
        let inked = (0..12)
            .flat_map(|x| (16..80).map(move |y| (x, y)))
            .filter(|&(x, y)| canvas.get_pixel(x, y) != Some(sky))
            .count();
        assert!(inked > 0);
    }

    #[test]
    fn test_label_text() {
        let located = |distance_m: f64, elevation_m: f64| Located {
            x: 0.0,
            y: 0.0,
            distance_m,
            azimuth: 0.0,
            elevation_m,
            visible: true,
        };
        let poi = |name: &str, kind: PoiKind| PointOfInterest {
            name: name.to_owned(),
            coord: GeoCoordinate::from_degrees(46.5, 10.5),
            kind,
            way: None,
        };
        let l = located(41_400.0, 2962.4);
        assert_eq!(label_text(&poi("Zugspitze", PoiKind::Peak), &l), "Zugspitze, 2962m, 41km");
        assert_eq!(label_text(&poi("", PoiKind::Peak), &l), "2962m, 41km");
        assert_eq!(label_text(&poi("Insel", PoiKind::Island), &l), "Insel, 41km");
        assert_eq!(label_text(&poi("", PoiKind::Island), &l), "41km");
    }

    #[test]
    fn test_nameless_peak() {
        let store = testing::flat_store(0);
        let config = RenderConfig::default();
        let observer = GeoCoordinate::from_degrees(46.5, 10.5).with_elevation(0.0);
        let view = ViewParameters::builder()
            .observer(observer)
            .azimuth(0.0, 60_f64.to_radians())
            .vertical_center(0.03)
            .vertical_height(12_f64.to_radians())
            .range(30_000.0)
            .width(600)
            .height(120)
            .build()
            .unwrap();
        let coord = config
            .earth_model()
            .destination(&observer, 0.02, 10_000.0)
            .with_elevation(900.0);
        let scene = testing::scene(view, &store, &config, vec![PointOfInterest::peak("", coord)]);
        let mut canvas = Canvas::new(scene.projection());
        let report = Annotator::new(&config).unwrap().annotate_peaks(&scene, &mut canvas);
        assert_eq!(report.placed.len(), 1);
        assert_eq!(report.placed[0].text, "900m, 10km");
    }

    #[test]
    fn test_islands() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("N46E010.geojson"),
            r#"{ "type": "FeatureCollection", "features": [
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [10.5, 46.59] },
                  "properties": { "name": "Insel", "ele": 100, "kind": "island" } },
                { "type": "Feature",
                  "geometry": { "type": "Polygon", "coordinates": [[
                    [10.5107, 46.6023], [10.5207, 46.6023], [10.5207, 46.6123],
                    [10.5107, 46.6123], [10.5107, 46.6023] ]] },
                  "properties": { "ele": "80 m", "natural": "island" } },
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [10.5, 46.6] },
                  "properties": { "name": "Not an island", "ele": 900, "kind": "peak" } } ] }"#,
        )
        .unwrap();
        let store = testing::flat_store(0);
        let mut pois = poi::load_pois(dir.path(), &[Cell::new(46, 10)]).unwrap();
        poi::resolve_elevations(&mut pois, &store);
        assert_eq!(pois.iter().filter(|p| p.kind == PoiKind::Island).count(), 2);

        let config = RenderConfig::default();
        let observer = GeoCoordinate::from_degrees(46.5, 10.5).with_elevation(0.0);
        let view = ViewParameters::builder()
            .observer(observer)
            .azimuth(0.0, 40_f64.to_radians())
            .vertical_center(0.0)
            .vertical_height(4_f64.to_radians())
            .range(30_000.0)
            .width(400)
            .height(100)
            .build()
            .unwrap();
        let scene = testing::scene(view, &store, &config, pois);
        let mut canvas = Canvas::new(scene.projection());
        let report = Annotator::new(&config).unwrap().annotate_islands(&scene, &mut canvas);

        // Highest first; the polygon is labelled at its centroid.
        let texts: Vec<_> = report.placed.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, ["Insel, 10km", "12km"]);
        assert_eq!(report.hidden + report.dropped + report.out_of_view, 0);
        let (x, _) = report.placed[1].anchor;
        assert!((250..=262).contains(&x), "{x}");
        assert!(report.placed.iter().all(|p| p.kind == PoiKind::Island));
        assert!(!report.placed[0].label.intersects(&report.placed[1].label));
    }

    #[test]
    fn test_coastlines() {
        let store = testing::flat_store(0);
        let config = RenderConfig::default();
        let observer = GeoCoordinate::from_degrees(46.5, 10.5).with_elevation(0.0);
        let view = ViewParameters::builder()
            .observer(observer)
            .eye_height(300.0)
            .azimuth(0.0, 40_f64.to_radians())
            .vertical_center(-0.02)
            .vertical_height(6_f64.to_radians())
            .range(30_000.0)
            .width(400)
            .height(100)
            .build()
            .unwrap();
        let earth = config.earth_model();
        let vertex = |way: u64, bearing: f64| PointOfInterest {
            name: String::new(),
            coord: earth
                .destination(&observer, bearing, 8_000.0)
                .with_elevation(0.0),
            kind: PoiKind::Coastline,
            way: Some(way),
        };
        let pois = vec![
            vertex(0, -0.2),
            vertex(0, 0.0),
            vertex(0, 0.2),
            vertex(1, 0.25),
            vertex(1, 1.5),
        ];
        let scene = testing::scene(view, &store, &config, pois);
        let mut canvas = Canvas::new(scene.projection());
        canvas.render_scene(&scene, &config);
        let segments = Annotator::new(&config).unwrap().draw_coastlines(&scene, &mut canvas);
        // Way 1 has one vertex out of view; ways are never joined.
        assert_eq!(segments, 2);
    }
}
