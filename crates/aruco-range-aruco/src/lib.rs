//! ArUco marker dictionaries and full-frame detection.
//!
//! This crate covers:
//! - embedded built-in dictionaries (`DICT_4X4_50`, `DICT_4X4_100`),
//! - matching observed marker codes against those dictionaries,
//! - finding candidate quads in a grayscale frame and decoding them.
//!
//! The output of [`ArucoDetector::observe`] feeds the geometry estimator in
//! `aruco-range-core`.
//!
//! ```
//! use aruco_range_aruco::{builtins, ArucoDetector, DetectorParams};
//! use aruco_range_core::GrayImage;
//!
//! let frame = GrayImage::filled(64, 48, 255);
//! let detector = ArucoDetector::new(builtins::DICT_4X4_50, DetectorParams::default());
//! assert!(detector.observe(&frame.view()).is_empty());
//! ```

pub mod builtins;
mod decode;
mod detector;
mod dictionary;
mod matcher;
mod quad;
mod threshold;

pub use decode::DecodeConfig;
pub use detector::{ArucoDetector, DetectorParams, MarkerDetection};
pub use dictionary::{Dictionary, DictionaryError};
pub use matcher::{rotate_code_u64, Match, Matcher};
pub use quad::{CornerRefinement, QuadParams};
