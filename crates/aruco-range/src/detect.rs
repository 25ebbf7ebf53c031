//! Per-frame analysis: detect markers, estimate geometry, decide alignment.

use aruco_range_aruco::{ArucoDetector, MarkerDetection};
use aruco_range_core::{estimate, CameraModel, GrayImageView};
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::guidance::{self, Alignment, GuidanceParams};

/// Borrow an `image::GrayImage` as a core view.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Everything derived for one detected marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerReport {
    pub id: u32,
    pub corners: [Point2<f32>; 4],
    pub center: Point2<i32>,
    pub avg_side_px: f64,
    pub distance: Option<f64>,
    /// `frame_center - center`: how far the camera must move, in pixels.
    pub offset: Vector2<i32>,
    pub offset_norm: f64,
    pub alignment: Alignment,
    pub hamming: u8,
    pub score: f32,
}

impl MarkerReport {
    /// Human-readable distance, `n/a` when undetermined.
    pub fn distance_label(&self, unit: &str) -> String {
        match self.distance {
            Some(d) => format!("{d:.2} {unit}"),
            None => "n/a".to_string(),
        }
    }
}

/// Analysis of one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameAnalysis {
    pub width: u32,
    pub height: u32,
    pub frame_center: Point2<i32>,
    pub markers: Vec<MarkerReport>,
}

impl FrameAnalysis {
    /// Marker closest to the frame center, used for the guidance text.
    pub fn primary(&self) -> Option<&MarkerReport> {
        self.markers
            .iter()
            .min_by(|a, b| a.offset_norm.total_cmp(&b.offset_norm))
    }
}

fn report_for(
    det: &MarkerDetection,
    camera: &CameraModel,
    reference: Point2<i32>,
    guidance_params: &GuidanceParams,
) -> MarkerReport {
    let geometry = estimate(&det.observation(), camera, reference);
    MarkerReport {
        id: det.id,
        corners: det.corners,
        center: geometry.center,
        avg_side_px: geometry.avg_side_px,
        distance: geometry.distance,
        offset: geometry.offset,
        offset_norm: guidance::offset_norm(&geometry.offset),
        alignment: guidance::classify(&geometry.offset, guidance_params),
        hamming: det.hamming,
        score: det.score,
    }
}

/// Detect markers in a grayscale frame and derive distance and offset for
/// each, relative to the frame center.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "info", skip_all, fields(width = img.width(), height = img.height()))
)]
pub fn analyze_frame(
    detector: &ArucoDetector,
    camera: &CameraModel,
    guidance_params: &GuidanceParams,
    img: &::image::GrayImage,
) -> FrameAnalysis {
    let reference = guidance::frame_center(img.width(), img.height());
    let markers = detector
        .detect(&gray_view(img))
        .iter()
        .map(|det| report_for(det, camera, reference, guidance_params))
        .collect();

    FrameAnalysis {
        width: img.width(),
        height: img.height(),
        frame_center: reference,
        markers,
    }
}
