//! Marker-to-camera geometry.
//!
//! Given the four image corners of a detected planar marker, its real side
//! length and the camera focal length (in pixels), this module computes the
//! marker center, its mean apparent side length, a pinhole distance estimate
//! and the pixel offset from a reference point (usually the frame center).
//!
//! The distance estimate inverts the pinhole projection
//! `side_px = focal_px * width / distance`. It assumes the marker plane is
//! perpendicular to the optical axis and ignores lens distortion, so it
//! becomes less accurate as the marker is viewed at an angle.
//!
//! Every function here is pure: no state, no I/O.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::GeometryError;

/// Apparent side lengths at or below this value are treated as degenerate.
pub const SIDE_EPSILON_PX: f64 = 1e-6;

/// One detected marker in one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerObservation {
    /// Dictionary id of the marker.
    pub id: u32,
    /// Image corners in detection order. Corner 0 is the marker's own
    /// top-left corner, the rest follow clockwise as seen in the image.
    pub corners: [Point2<f32>; 4],
}

impl MarkerObservation {
    pub fn new(id: u32, corners: [Point2<f32>; 4]) -> Self {
        Self { id, corners }
    }
}

/// Camera constants used for distance estimation.
///
/// `real_marker_width` is expressed in whatever unit the caller wants the
/// distance in (centimeters in the default setup).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraModel {
    pub focal_length_px: f64,
    pub real_marker_width: f64,
}

impl Default for CameraModel {
    fn default() -> Self {
        Self {
            focal_length_px: 700.0,
            real_marker_width: 5.0,
        }
    }
}

impl CameraModel {
    /// Build a validated camera model.
    pub fn new(focal_length_px: f64, real_marker_width: f64) -> Result<Self, GeometryError> {
        let model = Self {
            focal_length_px,
            real_marker_width,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check that both constants are positive and finite.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if !(self.focal_length_px.is_finite() && self.focal_length_px > 0.0) {
            return Err(GeometryError::InvalidFocalLength(self.focal_length_px));
        }
        if !(self.real_marker_width.is_finite() && self.real_marker_width > 0.0) {
            return Err(GeometryError::InvalidMarkerWidth(self.real_marker_width));
        }
        Ok(())
    }

    /// Distance for a marker whose mean apparent side is `avg_side_px`.
    #[inline]
    pub fn distance_for(&self, avg_side_px: f64) -> Option<f64> {
        estimate_distance(avg_side_px, self.real_marker_width, self.focal_length_px)
    }
}

/// Geometry derived from one observation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryResult {
    pub center: Point2<i32>,
    pub avg_side_px: f64,
    /// `None` when the marker is degenerate and the distance is undetermined.
    pub distance: Option<f64>,
    /// `reference_point - center`.
    pub offset: Vector2<i32>,
}

/// Mean of the four corners, rounded to the nearest pixel.
pub fn compute_center(corners: &[Point2<f32>; 4]) -> Point2<i32> {
    let (sx, sy) = corners
        .iter()
        .fold((0.0f64, 0.0f64), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    Point2::new((sx / 4.0).round() as i32, (sy / 4.0).round() as i32)
}

/// Mean length of the four edges 0-1, 1-2, 2-3, 3-0.
///
/// Returns 0 when all corners coincide.
pub fn compute_avg_side(corners: &[Point2<f32>; 4]) -> f64 {
    let mut total = 0.0f64;
    for i in 0..4 {
        let a = corners[i];
        let b = corners[(i + 1) % 4];
        let dx = (b.x - a.x) as f64;
        let dy = (b.y - a.y) as f64;
        total += dx.hypot(dy);
    }
    total / 4.0
}

/// Pinhole distance `real_width * focal_length_px / avg_side_px`.
///
/// Returns `None` when `avg_side_px <= SIDE_EPSILON_PX` or any input is not
/// finite.
pub fn estimate_distance(avg_side_px: f64, real_width: f64, focal_length_px: f64) -> Option<f64> {
    if !avg_side_px.is_finite() || avg_side_px <= SIDE_EPSILON_PX {
        return None;
    }
    let distance = (real_width * focal_length_px) / avg_side_px;
    distance.is_finite().then_some(distance)
}

/// Vector from the marker center to the reference point.
#[inline]
pub fn compute_offset(marker_center: Point2<i32>, reference_point: Point2<i32>) -> Vector2<i32> {
    reference_point - marker_center
}

/// Run every estimator step for one observation.
pub fn estimate(
    observation: &MarkerObservation,
    camera: &CameraModel,
    reference_point: Point2<i32>,
) -> GeometryResult {
    let center = compute_center(&observation.corners);
    let avg_side_px = compute_avg_side(&observation.corners);
    GeometryResult {
        center,
        avg_side_px,
        distance: camera.distance_for(avg_side_px),
        offset: compute_offset(center, reference_point),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x0: f32, y0: f32, s: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(x0, y0),
            Point2::new(x0 + s, y0),
            Point2::new(x0 + s, y0 + s),
            Point2::new(x0, y0 + s),
        ]
    }

    #[test]
    fn avg_side_of_square_is_its_side() {
        for s in [1.0f32, 37.5, 200.0] {
            assert_relative_eq!(compute_avg_side(&square(12.0, -3.0, s)), s as f64, epsilon = 1e-9);
        }
    }

    #[test]
    fn avg_side_of_rotated_square() {
        let h = 50.0f32;
        let diamond = [
            Point2::new(100.0, 100.0 - h),
            Point2::new(100.0 + h, 100.0),
            Point2::new(100.0, 100.0 + h),
            Point2::new(100.0 - h, 100.0),
        ];
        assert_relative_eq!(
            compute_avg_side(&diamond),
            (h as f64) * 2.0f64.sqrt(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn center_of_unit_grid_square() {
        assert_eq!(compute_center(&square(0.0, 0.0, 10.0)), Point2::new(5, 5));
    }

    #[test]
    fn center_rounds_to_nearest_pixel() {
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 0.0),
            Point2::new(3.0, 3.0),
            Point2::new(0.0, 3.0),
        ];
        // Mean is (1.5, 1.5), rounded away from zero.
        assert_eq!(compute_center(&corners), Point2::new(2, 2));
    }

    #[test]
    fn distance_matches_pinhole_formula() {
        let d = estimate_distance(100.0, 5.0, 700.0).expect("distance");
        assert_relative_eq!(d, 35.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_side_gives_no_distance() {
        assert_eq!(estimate_distance(0.0, 5.0, 700.0), None);
        assert_eq!(estimate_distance(1e-9, 5.0, 700.0), None);
        assert_eq!(estimate_distance(-3.0, 5.0, 700.0), None);
        assert_eq!(estimate_distance(f64::NAN, 5.0, 700.0), None);
    }

    #[test]
    fn collapsed_marker_has_no_distance() {
        let p = Point2::new(42.0f32, 17.0);
        let obs = MarkerObservation::new(3, [p; 4]);
        let res = estimate(&obs, &CameraModel::default(), Point2::new(0, 0));
        assert_eq!(res.avg_side_px, 0.0);
        assert_eq!(res.distance, None);
        assert_eq!(res.center, Point2::new(42, 17));
    }

    #[test]
    fn offset_points_from_marker_to_reference() {
        let off = compute_offset(Point2::new(120, 80), Point2::new(100, 100));
        assert_eq!(off, Vector2::new(-20, 20));
    }

    #[test]
    fn estimate_combines_all_steps() {
        let obs = MarkerObservation::new(7, square(270.0, 190.0, 100.0));
        let camera = CameraModel::new(700.0, 5.0).expect("camera");
        let res = estimate(&obs, &camera, Point2::new(320, 240));
        assert_eq!(res.center, Point2::new(320, 240));
        assert_relative_eq!(res.avg_side_px, 100.0, epsilon = 1e-9);
        assert_relative_eq!(res.distance.expect("distance"), 35.0, epsilon = 1e-9);
        assert_eq!(res.offset, Vector2::new(0, 0));
    }

    #[test]
    fn estimator_is_idempotent() {
        let obs = MarkerObservation::new(
            1,
            [
                Point2::new(10.3, 11.9),
                Point2::new(58.2, 14.1),
                Point2::new(55.7, 60.4),
                Point2::new(9.1, 57.8),
            ],
        );
        let camera = CameraModel::default();
        let reference = Point2::new(64, 48);
        assert_eq!(estimate(&obs, &camera, reference), estimate(&obs, &camera, reference));
        assert_eq!(compute_center(&obs.corners), compute_center(&obs.corners));
        assert_eq!(
            compute_avg_side(&obs.corners).to_bits(),
            compute_avg_side(&obs.corners).to_bits()
        );
    }

    #[test]
    fn camera_model_rejects_bad_constants() {
        assert_eq!(
            CameraModel::new(0.0, 5.0),
            Err(GeometryError::InvalidFocalLength(0.0))
        );
        assert_eq!(
            CameraModel::new(700.0, -1.0),
            Err(GeometryError::InvalidMarkerWidth(-1.0))
        );
        assert!(CameraModel::new(f64::INFINITY, 5.0).is_err());
    }

    #[test]
    fn camera_model_fills_missing_fields_from_defaults() {
        let camera: CameraModel =
            serde_json::from_str(r#"{ "focal_length_px": 900.0 }"#).expect("parse");
        assert_eq!(camera.focal_length_px, 900.0);
        assert_eq!(camera.real_marker_width, 5.0);
    }
}
