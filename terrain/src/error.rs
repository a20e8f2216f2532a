use crate::TileKey;
use nasadem::NasademError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("no tile file for {0}")]
    TileUnavailable(TileKey),

    #[error("invalid view parameters: {0}")]
    InvalidViewParameters(String),

    #[error("unknown elevation source {0:?}")]
    UnknownSource(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Nasadem(#[from] NasademError),
}
