//! Centering guidance: is the marker under the frame center, and which way
//! should the camera move if not.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GuidanceParams {
    /// Offsets shorter than this count as centered, in pixels.
    pub center_threshold_px: f64,
}

impl Default for GuidanceParams {
    fn default() -> Self {
        Self {
            center_threshold_px: 50.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Centered,
    OffCenter,
}

impl Alignment {
    pub fn is_centered(self) -> bool {
        matches!(self, Alignment::Centered)
    }
}

/// Euclidean length of an integer offset.
#[inline]
pub fn offset_norm(offset: &Vector2<i32>) -> f64 {
    (offset.x as f64).hypot(offset.y as f64)
}

pub fn classify(offset: &Vector2<i32>, params: &GuidanceParams) -> Alignment {
    if offset_norm(offset) < params.center_threshold_px {
        Alignment::Centered
    } else {
        Alignment::OffCenter
    }
}

/// End point of the guidance arrow: halfway from the marker center towards
/// the reference point, rounding each step towards negative infinity.
pub fn arrow_tip(marker_center: Point2<i32>, offset: &Vector2<i32>) -> Point2<i32> {
    Point2::new(
        marker_center.x + offset.x.div_euclid(2),
        marker_center.y + offset.y.div_euclid(2),
    )
}

/// Frame center used as the reference point, `(width / 2, height / 2)`.
#[inline]
pub fn frame_center(width: u32, height: u32) -> Point2<i32> {
    Point2::new((width / 2) as i32, (height / 2) as i32)
}
