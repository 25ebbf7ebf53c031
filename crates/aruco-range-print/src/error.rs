use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum PrintError {
    #[error("marker id {id} is not in {dictionary} ({len} markers)")]
    UnknownMarkerId {
        id: u32,
        dictionary: &'static str,
        len: usize,
    },
    #[error("marker side {size_px}px is smaller than the {cells}-cell grid")]
    InvalidSize { size_px: usize, cells: usize },
    #[error("failed to encode png: {0}")]
    PngEncode(String),
    #[error("failed to decode png {path}: {reason}")]
    PngDecode { path: PathBuf, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
