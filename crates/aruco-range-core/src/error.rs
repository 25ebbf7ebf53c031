/// Errors raised when building a [`crate::CameraModel`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("focal length must be a positive finite number of pixels (got {0})")]
    InvalidFocalLength(f64),
    #[error("real marker width must be a positive finite length (got {0})")]
    InvalidMarkerWidth(f64),
}
