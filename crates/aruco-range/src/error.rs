use std::path::PathBuf;

use aruco_range_aruco::DictionaryError;
use aruco_range_core::GeometryError;
use aruco_range_print::PrintError;

/// Errors produced by the frame analysis harness and the CLI.
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Dictionary(#[from] DictionaryError),

    #[error(transparent)]
    Print(#[from] PrintError),

    #[error("no image frames found in {0}")]
    NoFrames(PathBuf),

    #[error("failed to load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },
}
