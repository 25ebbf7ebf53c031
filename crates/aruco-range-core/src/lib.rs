//! Core types and utilities for fiducial marker ranging.
//!
//! This crate is intentionally small and purely geometric. It does *not*
//! detect markers itself; it turns the four image corners of a detected
//! marker into a center, an apparent size, a pinhole distance estimate and
//! an offset from a reference point.

mod error;
pub mod geometry;
mod homography;
mod image;
mod logger;

pub use error::GeometryError;
pub use geometry::{
    compute_avg_side, compute_center, compute_offset, estimate, estimate_distance, CameraModel,
    GeometryResult, MarkerObservation, SIDE_EPSILON_PX,
};
pub use homography::{homography_from_4pt, Homography};
pub use image::{sample_bilinear, GrayImage, GrayImageView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
