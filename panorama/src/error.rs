use terrain::TerrainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PanoramaError {
    #[error("missing required parameter {0}")]
    Builder(&'static str),

    #[error("invalid view parameters: {0}")]
    InvalidViewParameters(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("{0}")]
    Terrain(TerrainError),

    #[error("label font: {0}")]
    Font(#[from] ab_glyph::InvalidFont),

    #[error("{0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    GeoJson(#[from] geojson::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// View problems keep their own variant whichever layer reports them.
impl From<TerrainError> for PanoramaError {
    fn from(err: TerrainError) -> Self {
        match err {
            TerrainError::InvalidViewParameters(msg) => Self::InvalidViewParameters(msg),
            other => Self::Terrain(other),
        }
    }
}
