use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NasademError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid HGT name {0}")]
    HgtName(PathBuf),

    #[error("invalid HGT file len {0} for {1}")]
    HgtLen(u64, PathBuf),

    #[error("expected {expected} samples for a {dim}x{dim} tile, got {actual}")]
    SampleCount {
        dim: usize,
        expected: usize,
        actual: usize,
    },
}
