use crate::{
    poi, Annotator, Canvas, PanoramaError, PointOfInterest, RenderConfig, Scene, ViewParameters,
};
use image::Rgb;
use log::{debug, info};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    time::Instant,
};
use terrain::{Cell, TileKey, TileMode, TileStore, VisibilityEngine};

/// Where tiles and features live, and how to draw them.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub config: RenderConfig,
    /// Root holding one subdirectory per elevation source.
    pub tile_dir: PathBuf,
    pub tile_mode: TileMode,
    /// Per-cell GeoJSON features. No labels without it.
    pub poi_dir: Option<PathBuf>,
}

impl RenderContext {
    pub fn new<P: Into<PathBuf>>(config: RenderConfig, tile_dir: P) -> Self {
        Self {
            config,
            tile_dir: tile_dir.into(),
            tile_mode: TileMode::default(),
            poi_dir: None,
        }
    }

    #[must_use]
    pub fn tile_mode(mut self, tile_mode: TileMode) -> Self {
        self.tile_mode = tile_mode;
        self
    }

    #[must_use]
    pub fn poi_dir<P: Into<PathBuf>>(mut self, poi_dir: P) -> Self {
        self.poi_dir = Some(poi_dir.into());
        self
    }

    /// Validates `view` and returns the cells its sweep can reach.
    pub fn footprint(&self, view: &ViewParameters) -> Result<BTreeSet<Cell>, PanoramaError> {
        view.validate()?;
        Ok(TileStore::required_footprint(
            &self.config.earth_model(),
            &view.observer,
            view.azimuth_center,
            view.azimuth_width,
            view.max_range_m,
        ))
    }

    /// Loads every tile of `cells` for the view's sources. `on_tile` is
    /// called once per tile attempted.
    pub fn load_store<'a, I, F>(
        &self,
        view: &ViewParameters,
        cells: I,
        on_tile: F,
    ) -> Result<TileStore, PanoramaError>
    where
        I: IntoIterator<Item = &'a Cell>,
        F: Fn(&TileKey) + Sync,
    {
        let mut store = TileStore::new(&self.tile_dir, self.tile_mode, view.sources.clone());
        store.load_footprint(cells, on_tile)?;
        Ok(store)
    }

    /// Reads the features of `cells`, if a feature directory is set.
    pub fn load_pois<'a, I>(&self, cells: I, store: &TileStore) -> Result<Vec<PointOfInterest>, PanoramaError>
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        let Some(poi_dir) = &self.poi_dir else {
            return Ok(Vec::new());
        };
        let mut pois = poi::load_pois(poi_dir, cells)?;
        poi::resolve_elevations(&mut pois, store);
        Ok(pois)
    }

    /// Computes the horizon of `view` over `store`.
    pub fn build_scene(
        &self,
        view: ViewParameters,
        store: &TileStore,
        pois: Vec<PointOfInterest>,
    ) -> Result<Scene, PanoramaError> {
        view.validate()?;
        let engine =
            VisibilityEngine::new(store, self.config.earth_model(), self.config.march_params());
        let profile = engine.compute(&view.sweep())?;
        Scene::new(view, profile, pois)
    }

    /// Draws `scene`: sky, terrain, edges, then annotations.
    pub fn render(&self, scene: &Scene) -> Result<Canvas, PanoramaError> {
        let now = Instant::now();
        let config = &self.config;
        let mut canvas = Canvas::new(scene.projection());
        canvas.bucket_fill(Rgb(config.colors.sky));
        canvas.render_scene(scene, config);
        canvas.highlight_edges(&config.edges, &config.colors);

        let mut annotator = Annotator::new(config)?;
        annotator.draw_coastlines(scene, &mut canvas);
        annotator.label_axis(scene, &mut canvas);
        annotator.annotate_peaks(scene, &mut canvas);
        annotator.annotate_islands(scene, &mut canvas);

        debug!("canvas; exec: {:?}", now.elapsed());
        Ok(canvas)
    }

    /// The whole pipeline, from view parameters to an image file.
    pub fn run<F>(&self, view: ViewParameters, output: &Path, on_tile: F) -> Result<(), PanoramaError>
    where
        F: Fn(&TileKey) + Sync,
    {
        let now = Instant::now();
        let cells = self.footprint(&view)?;
        let store = self.load_store(&view, &cells, on_tile)?;
        let pois = self.load_pois(&cells, &store)?;
        let scene = self.build_scene(view, &store, pois)?;
        self.render(&scene)?.save(output)?;
        info!(
            "panorama; cells: {}, tiles: {}, output: {output:?}, exec: {:?}",
            cells.len(),
            store.len(),
            now.elapsed()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::RenderContext;
    use crate::{testing, PanoramaError, RenderConfig, ViewParameters};
    use image::Rgb;
    use std::{f64::consts::PI, fs};
    use terrain::{Cell, GeoCoordinate, Source, TileStore};

    fn bumpy(lat: f64, lon: f64) -> i16 {
        let h = 1200.0 + 700.0 * (lat * 41.0).sin() * (lon * 29.0).cos();
        #[allow(clippy::cast_possible_truncation)]
        let h = h.round() as i16;
        h
    }

    fn view(range: f64) -> ViewParameters {
        ViewParameters::builder()
            .observer(GeoCoordinate::from_degrees(46.9, 10.9))
            .azimuth(PI, 2.0 * PI)
            .vertical_center(0.0)
            .vertical_height(0.5)
            .range(range)
            .width(180)
            .height(60)
            .build()
            .unwrap()
    }

    #[test]
    fn test_zero_range_is_all_sky() {
        let store = testing::store_from_fn(bumpy);
        let context = RenderContext::new(RenderConfig::default(), "/nonexistent");
        let scene = context.build_scene(view(0.0), &store, vec![]).unwrap();
        let mut canvas = crate::Canvas::new(scene.projection());
        let sky = Rgb(context.config.colors.sky);
        canvas.bucket_fill(sky);
        canvas.render_scene(&scene, &context.config);
        canvas.highlight_edges(&context.config.edges, &context.config.colors);
        let image = canvas.into_image();
        assert!(image.pixels().all(|p| *p == sky));
    }

    #[test]
    fn test_render_is_deterministic() {
        let store = testing::store_from_fn(bumpy);
        let context = RenderContext::new(RenderConfig::default(), "/nonexistent");
        let render = || {
            let scene = context.build_scene(view(40_000.0), &store, vec![]).unwrap();
            context.render(&scene).unwrap().into_image().into_raw()
        };
        let first = render();
        assert_eq!(first, render());
        // Something other than sky was drawn.
        let sky = context.config.colors.sky;
        assert!(first.chunks(3).any(|p| p != sky));
    }

    #[test]
    fn test_invalid_view_touches_nothing() {
        let context = RenderContext::new(RenderConfig::default(), "/nonexistent");
        let mut bad = view(1000.0);
        bad.vertical_height = 0.0;
        assert!(matches!(
            context.footprint(&bad),
            Err(PanoramaError::InvalidViewParameters(_))
        ));
        bad = view(1000.0);
        bad.azimuth_center = 7.0;
        let store = TileStore::new("/nonexistent", Default::default(), vec![]);
        assert!(matches!(
            context.build_scene(bad, &store, vec![]),
            Err(PanoramaError::InvalidViewParameters(_))
        ));
    }

    #[test]
    fn test_run_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let tiles = dir.path().join("tiles");
        let pois = dir.path().join("pois");
        fs::create_dir_all(tiles.join(Source::Srtm3.dir_name())).unwrap();
        fs::create_dir_all(&pois).unwrap();

        let cell = Cell::new(46, 10);
        let bytes: Vec<u8> = (0..1201 * 1201)
            .flat_map(|i| {
                let (row, col) = (i / 1201, i % 1201);
                let lat = 47.0 - f64::from(row) / 1200.0;
                let lon = 10.0 + f64::from(col) / 1200.0;
                bumpy(lat, lon).to_be_bytes()
            })
            .collect();
        fs::write(
            tiles.join(Source::Srtm3.dir_name()).join(cell.file_name()),
            bytes,
        )
        .unwrap();
        fs::write(
            pois.join("N46E010.geojson"),
            r#"{ "type": "FeatureCollection", "features": [
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [10.6, 46.6] },
                  "properties": { "name": "Test Peak", "kind": "peak" } } ] }"#,
        )
        .unwrap();

        let view = ViewParameters::builder()
            .observer(GeoCoordinate::from_degrees(46.4, 10.4))
            .azimuth(PI / 4.0, PI / 2.0)
            .range(20_000.0)
            .width(300)
            .height(100)
            .sources(vec![Source::Srtm1, Source::Srtm3])
            .build()
            .unwrap();
        let context = RenderContext::new(RenderConfig::default(), &tiles).poi_dir(&pois);

        let cells = context.footprint(&view).unwrap();
        assert!(cells.contains(&cell));
        let store = context.load_store(&view, &cells, |_| ()).unwrap();
        assert_eq!(store.len(), 1);
        let loaded = context.load_pois(&cells, &store).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].elevation().is_some());

        let output = dir.path().join("pano.png");
        context.run(view, &output, |_| ()).unwrap();
        let image = image::open(&output).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (300, 100));
    }
}
