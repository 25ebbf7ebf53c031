//! Full-frame marker detection.

use aruco_range_core::{GrayImageView, MarkerObservation};
use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::decode::{DecodeConfig, MarkerDecoder};
use crate::quad::{find_quads, QuadParams};
use crate::threshold::adaptive_dark_mask;
use crate::{Dictionary, Matcher};

/// Detector configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorParams {
    /// Tile side for the adaptive threshold, in pixels.
    pub threshold_tile_px: usize,
    /// Minimum local contrast for a region to be binarized.
    pub min_contrast: u8,
    pub quad: QuadParams,
    pub decode: DecodeConfig,
    /// Maximum Hamming distance for matching. `None` uses the dictionary's
    /// own correction capacity.
    pub max_hamming: Option<u8>,
    /// Collapse same-id detections whose quads overlap, keeping the best
    /// score. Separate markers that share an id are always kept.
    pub merge_overlapping: bool,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            threshold_tile_px: 8,
            min_contrast: 20,
            quad: QuadParams::default(),
            decode: DecodeConfig::default(),
            max_hamming: None,
            merge_overlapping: true,
        }
    }
}

/// One decoded marker in image coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerDetection {
    pub id: u32,
    /// Corner 0 is the marker's own top-left, then clockwise in the image.
    pub corners: [Point2<f32>; 4],
    pub rotation: u8,
    pub hamming: u8,
    pub score: f32,
    pub border_score: f32,
    /// Whether the marker was read with inverted polarity.
    pub inverted: bool,
}

impl MarkerDetection {
    pub fn observation(&self) -> MarkerObservation {
        MarkerObservation::new(self.id, self.corners)
    }
}

/// Marker detector bound to one dictionary.
#[derive(Clone, Debug)]
pub struct ArucoDetector {
    params: DetectorParams,
    matcher: Matcher,
}

impl ArucoDetector {
    pub fn new(dictionary: Dictionary, params: DetectorParams) -> Self {
        let max_hamming = params
            .max_hamming
            .unwrap_or(dictionary.max_correction_bits)
            .min(dictionary.max_correction_bits);
        Self {
            params,
            matcher: Matcher::new(dictionary, max_hamming),
        }
    }

    pub fn params(&self) -> &DetectorParams {
        &self.params
    }

    pub fn dictionary(&self) -> Dictionary {
        self.matcher.dictionary()
    }

    /// Detect all markers in a grayscale frame.
    ///
    /// An empty result means no marker was found; that is not an error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(width = image.width, height = image.height))
    )]
    pub fn detect(&self, image: &GrayImageView<'_>) -> Vec<MarkerDetection> {
        if !image.is_consistent() || image.width == 0 || image.height == 0 {
            debug!(
                "skipping frame with inconsistent buffer ({}x{}, {} bytes)",
                image.width,
                image.height,
                image.data.len()
            );
            return Vec::new();
        }

        let mask = adaptive_dark_mask(image, self.params.threshold_tile_px, self.params.min_contrast);
        let quads = find_quads(&mask, image.width, image.height, &self.params.quad);

        let Some(mut decoder) =
            MarkerDecoder::new(&self.params.decode, self.matcher.dictionary().marker_size)
        else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(quads.len());
        for quad in &quads {
            let Some(decoded) = decoder.decode_quad(image, &quad.corners, &self.matcher) else {
                continue;
            };
            out.push(MarkerDetection {
                id: decoded.matched.id,
                corners: decoded.corners,
                rotation: decoded.matched.rotation,
                hamming: decoded.matched.hamming,
                score: decoded.score,
                border_score: decoded.reading.border_score,
                inverted: decoded.reading.inverted,
            });
        }

        debug!("{} quad candidates, {} markers decoded", quads.len(), out.len());

        let mut out = if self.params.merge_overlapping {
            merge_overlapping(out)
        } else {
            out
        };
        out.sort_by(|a, b| {
            let (ca, cb) = (quad_center(&a.corners), quad_center(&b.corners));
            a.id.cmp(&b.id)
                .then(ca.y.total_cmp(&cb.y))
                .then(ca.x.total_cmp(&cb.x))
        });
        out
    }

    /// Detect markers and return only id + corners.
    pub fn observe(&self, image: &GrayImageView<'_>) -> Vec<MarkerObservation> {
        self.detect(image).iter().map(MarkerDetection::observation).collect()
    }
}

fn quad_center(q: &[Point2<f32>; 4]) -> Point2<f32> {
    Point2::new(
        q.iter().map(|p| p.x).sum::<f32>() / 4.0,
        q.iter().map(|p| p.y).sum::<f32>() / 4.0,
    )
}

/// Point inside a clockwise (image coordinates) convex quad.
fn quad_contains(q: &[Point2<f32>; 4], p: Point2<f32>) -> bool {
    (0..4).all(|i| {
        let a = q[i];
        let e = q[(i + 1) % 4] - a;
        let d = p - a;
        e.x * d.y - e.y * d.x >= 0.0
    })
}

fn same_marker(a: &MarkerDetection, b: &MarkerDetection) -> bool {
    a.id == b.id
        && (quad_contains(&a.corners, quad_center(&b.corners))
            || quad_contains(&b.corners, quad_center(&a.corners)))
}

fn merge_overlapping(mut dets: Vec<MarkerDetection>) -> Vec<MarkerDetection> {
    dets.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<MarkerDetection> = Vec::with_capacity(dets.len());
    for d in dets {
        if !kept.iter().any(|k| same_marker(k, &d)) {
            kept.push(d);
        }
    }
    kept
}
