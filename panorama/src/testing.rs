//! Synthetic terrain shared by the unit tests.

use crate::{PointOfInterest, RenderConfig, Scene, ViewParameters};
use terrain::{nasadem::Tile, Cell, Source, TileKey, TileMode, TileStore, VisibilityEngine};

/// 30 arc-second tiles at a constant elevation over 46..48°N 10..12°E.
pub fn flat_store(elevation: i16) -> TileStore {
    store_from_fn(move |_, _| elevation)
}

pub fn store_from_fn<F>(f: F) -> TileStore
where
    F: Fn(f64, f64) -> i16 + Copy,
{
    let mut store = TileStore::new("/nonexistent", TileMode::InMem, vec![Source::Srtm3]);
    for lat in 46..=47 {
        for lon in 10..=11 {
            let cell = Cell::new(lat, lon);
            let tile = Tile::from_fn(cell.sw_corner(), 121, f).unwrap();
            store.insert(
                TileKey {
                    cell,
                    source: Source::Srtm3,
                },
                tile,
            );
        }
    }
    store
}

pub fn scene(
    view: ViewParameters,
    store: &TileStore,
    config: &RenderConfig,
    pois: Vec<PointOfInterest>,
) -> Scene {
    let engine = VisibilityEngine::new(store, config.earth_model(), config.march_params());
    let profile = engine.compute(&view.sweep()).unwrap();
    Scene::new(view, profile, pois).unwrap()
}
