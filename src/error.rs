use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("checkpoint not found: `{}`", .0.display())]
    MissingCheckpoint(PathBuf),

    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch { expected: Vec<usize>, found: Vec<usize> },

    #[error("class count must be at least 1, got {0}")]
    InvalidClassCount(usize),

    #[error("image size {0:?} must be a non-zero multiple of 32 in both dimensions")]
    InvalidImageSize([usize; 2]),

    #[error("no samples found under `{}`", .0.display())]
    EmptyDataset(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("recorder error: {0}")]
    Recorder(String),

    #[error("config error: {0}")]
    Config(String),
}
