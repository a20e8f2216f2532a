mod options;
mod progress;

use anyhow::Error as AnyError;
use clap::Parser;
use log::info;
use options::{Cli, Command as CliCmd};
use panorama::{RenderConfig, RenderContext, ViewParameters};
use serde::Serialize;
use std::{collections::BTreeSet, path::Path, time::Instant};
use terrain::{normalize_angle, Cell, GeoCoordinate, TileMode};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();
    env_logger::init();

    let config = match &cli.config {
        Some(path) => RenderConfig::from_path(path)?,
        None => RenderConfig::default(),
    };
    let view = view_parameters(&cli)?;

    let tile_mode = if cli.memmap {
        TileMode::MemMap
    } else {
        TileMode::InMem
    };
    let mut context = RenderContext::new(config, &cli.tile_dir).tile_mode(tile_mode);
    if let Some(poi_dir) = &cli.poi_dir {
        context = context.poi_dir(poi_dir);
    }

    match cli.cmd {
        CliCmd::Footprint => print_footprint(&context, &view),
        CliCmd::Render { ref output } => render(&context, view, output),
    }
}

/// Degrees and kilometers from the command line to the radians and
/// meters used everywhere else.
fn view_parameters(cli: &Cli) -> Result<ViewParameters, AnyError> {
    let mut observer = GeoCoordinate::from_degrees(cli.observer.lat, cli.observer.lon);
    observer.elevation = cli.observer.elevation;

    let mut builder = ViewParameters::builder()
        .observer(observer)
        .eye_height(cli.eye_height)
        .azimuth(
            normalize_angle(cli.view_dir.to_radians()),
            cli.view_width.to_radians(),
        )
        .vertical_center(cli.view_dir_v.to_radians())
        .range(cli.range * 1000.0)
        .width(cli.canvas_width)
        .sources(cli.sources.clone());
    if let Some(view_height) = cli.view_height {
        builder = builder.vertical_height(view_height.to_radians());
    }
    if let Some(canvas_height) = cli.canvas_height {
        builder = builder.height(canvas_height);
    }
    Ok(builder.build()?)
}

fn print_footprint(context: &RenderContext, view: &ViewParameters) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct Footprint {
        cells: Vec<String>,
        sources: Vec<&'static str>,
    }

    let cells: BTreeSet<Cell> = context.footprint(view)?;
    let footprint = Footprint {
        cells: cells.iter().map(ToString::to_string).collect(),
        sources: view.sources.iter().map(|s| s.dir_name()).collect(),
    };
    let json = serde_json::to_string_pretty(&footprint)?;
    println!("{json}");
    Ok(())
}

fn render(context: &RenderContext, view: ViewParameters, output: &Path) -> Result<(), AnyError> {
    let now = Instant::now();
    let cells = context.footprint(&view)?;

    let pb = progress::bar(
        "Loading tiles".to_string(),
        (cells.len() * view.sources.len()) as u64,
    )?;
    let store = context.load_store(&view, &cells, |_| pb.inc(1))?;
    pb.finish_and_clear();

    let pois = context.load_pois(&cells, &store)?;
    let scene = context.build_scene(view, &store, pois)?;
    context.render(&scene)?.save(output)?;
    info!("wrote {output:?} in {:?}", now.elapsed());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::view_parameters;
    use crate::options::Cli;
    use clap::Parser;
    use std::f64::consts::TAU;

    fn cli(view_dir: &str) -> Cli {
        Cli::try_parse_from([
            "panoview",
            "--tile-dir",
            "/tiles",
            "--observer",
            "47.42,10.98,2962",
            "--view-dir",
            view_dir,
            "--canvas-width",
            "1000",
            "footprint",
        ])
        .unwrap()
    }

    #[test]
    fn test_view_direction_wraps() {
        for (view_dir, expected) in [("-1e-14", 0.0), ("-90", 270.0), ("450", 90.0), ("0", 0.0)] {
            let view = view_parameters(&cli(view_dir)).unwrap();
            assert!((0.0..TAU).contains(&view.azimuth_center), "{view_dir}");
            assert!((view.azimuth_center.to_degrees() - expected).abs() < 1e-9, "{view_dir}");
        }
    }

    #[test]
    fn test_units() {
        let view = view_parameters(&cli("180")).unwrap();
        assert_eq!(view.max_range_m, 20_000.0);
        assert_eq!(view.width, 1000);
        assert_eq!(view.observer.elevation, Some(2962.0));
        assert!((view.azimuth_width - 100_f64.to_radians()).abs() < 1e-12);
    }
}
