//! Panoramic renderings of visible terrain.
//!
//! A [`RenderContext`] drives the pipeline: the [`ViewParameters`]
//! decide which tiles to load, the horizon of every canvas column is
//! computed over them, and the resulting [`Scene`] is painted onto a
//! [`Canvas`] and annotated with named features.
//!
//! ```no_run
//! use panorama::{RenderConfig, RenderContext, ViewParameters};
//! use std::path::Path;
//! use terrain::GeoCoordinate;
//!
//! let view = ViewParameters::builder()
//!     .observer(GeoCoordinate::from_degrees(47.42, 10.98))
//!     .azimuth(180_f64.to_radians(), 100_f64.to_radians())
//!     .range(80_000.0)
//!     .width(4000)
//!     .build()?;
//! RenderContext::new(RenderConfig::default(), "/data/tiles")
//!     .poi_dir("/data/features")
//!     .run(view, Path::new("zugspitze.png"), |_| ())?;
//! # Ok::<(), panorama::PanoramaError>(())
//! ```

mod annotate;
mod canvas;
pub mod config;
mod context;
mod error;
pub mod poi;
mod scene;
#[cfg(test)]
mod testing;
mod text;
mod view;

pub use crate::{
    annotate::{AnnotationReport, Annotator, Placement, Rect},
    canvas::{Canvas, Projection},
    config::RenderConfig,
    context::RenderContext,
    error::PanoramaError,
    poi::{PoiKind, PointOfInterest},
    scene::Scene,
    text::LabelFont,
    view::{ViewBuilder, ViewParameters},
};
pub use terrain;
