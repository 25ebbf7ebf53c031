//! Distance and centering guidance from ArUco markers.
//!
//! This crate ties the workspace together:
//! - re-exports of the core geometry, the detector and the marker printer,
//! - [`detect::analyze_frame`]: markers → distance and offset from the frame center,
//! - [`annotate::Annotator`]: outline, labels, guidance arrow and HUD overlay,
//! - [`pipeline::run_frame_loop`]: frame source → analysis → frame sink,
//! - [`config::AppConfig`]: JSON configuration,
//! - the `aruco-range` CLI (feature `cli`).
//!
//! ## Quickstart
//!
//! ```no_run
//! use aruco_range::{analyze_frame, aruco, AppConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = AppConfig::default();
//! let detector = aruco::ArucoDetector::new(cfg.dictionary()?, cfg.detector.clone());
//! let img = image::open("frame.png")?.to_luma8();
//!
//! let analysis = analyze_frame(&detector, &cfg.camera, &cfg.guidance, &img);
//! for m in &analysis.markers {
//!     println!("marker {} at {}", m.id, m.distance_label(&cfg.unit));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `aruco_range::core`: marker geometry, gray image views, homographies, logger.
//! - `aruco_range::aruco`: dictionaries and marker detection.
//! - `aruco_range::print`: printable marker generation.

pub use aruco_range_aruco as aruco;
pub use aruco_range_core as core;
pub use aruco_range_print as print;

pub mod annotate;
pub mod config;
pub mod detect;
mod error;
mod fps;
pub mod guidance;
pub mod pipeline;

pub use aruco_range_core::{CameraModel, GeometryResult, MarkerObservation};
pub use annotate::Annotator;
pub use config::{AppConfig, OverlayStyle};
pub use detect::{analyze_frame, gray_view, FrameAnalysis, MarkerReport};
pub use error::AppError;
pub use fps::FpsMeter;
pub use guidance::{Alignment, GuidanceParams};
pub use pipeline::{
    run_frame_loop, DirectorySink, Frame, FrameProcessor, FrameSink, FrameSource,
    ImageSequenceSource, LoopOptions, NullSink, RunSummary,
};
