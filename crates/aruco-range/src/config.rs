//! JSON configuration for the ranging tools.

use std::fs;
use std::path::{Path, PathBuf};

use aruco_range_aruco::{DetectorParams, Dictionary};
use aruco_range_core::CameraModel;
use serde::{Deserialize, Serialize};

use crate::guidance::GuidanceParams;
use crate::AppError;

/// Drawing options for annotated frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayStyle {
    /// Marker outline thickness in pixels.
    pub line_thickness: u32,
    /// Guidance arrow thickness in pixels.
    pub arrow_thickness: u32,
    /// TrueType/OpenType font replacing the embedded DejaVu Sans Mono.
    pub font_path: Option<PathBuf>,
    /// Draw the id and distance labels next to each marker.
    pub labels: bool,
    pub label_px: f32,
    pub hud_px: f32,
    /// Draw the FPS and guidance text block in the top-left corner.
    pub hud: bool,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_thickness: 4,
            arrow_thickness: 3,
            font_path: None,
            labels: true,
            label_px: 24.0,
            hud_px: 20.0,
            hud: true,
        }
    }
}

/// Top-level configuration; every field has a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub camera: CameraModel,
    /// Unit label of `camera.real_marker_width`, echoed for distances.
    pub unit: String,
    pub dictionary: String,
    pub detector: DetectorParams,
    pub guidance: GuidanceParams,
    pub overlay: OverlayStyle,
    /// Number of frames in the rolling FPS mean.
    pub fps_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            camera: CameraModel::default(),
            unit: "cm".to_string(),
            dictionary: "DICT_4X4_50".to_string(),
            detector: DetectorParams::default(),
            guidance: GuidanceParams::default(),
            overlay: OverlayStyle::default(),
            fps_window: 30,
        }
    }
}

impl AppConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let text = fs::read_to_string(path.as_ref())?;
        let cfg: AppConfig = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.camera.validate()?;
        Dictionary::by_name(&self.dictionary)?;
        let thr = self.guidance.center_threshold_px;
        if !thr.is_finite() || thr < 0.0 {
            return Err(AppError::Config(format!(
                "guidance.center_threshold_px must be a non-negative number, got {thr}"
            )));
        }
        if self.fps_window == 0 {
            return Err(AppError::Config("fps_window must be at least 1".into()));
        }
        if self.overlay.line_thickness == 0 {
            return Err(AppError::Config("overlay.line_thickness must be at least 1".into()));
        }
        Ok(())
    }

    pub fn dictionary(&self) -> Result<Dictionary, AppError> {
        Ok(Dictionary::by_name(&self.dictionary)?)
    }

    /// Apply command-line overrides and re-validate.
    pub fn with_overrides(
        mut self,
        focal_length_px: Option<f64>,
        marker_width: Option<f64>,
        center_threshold_px: Option<f64>,
    ) -> Result<Self, AppError> {
        if let Some(f) = focal_length_px {
            self.camera.focal_length_px = f;
        }
        if let Some(w) = marker_width {
            self.camera.real_marker_width = w;
        }
        if let Some(t) = center_threshold_px {
            self.guidance.center_threshold_px = t;
        }
        self.validate()?;
        Ok(self)
    }
}
