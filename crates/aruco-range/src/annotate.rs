//! Annotation overlay drawn on RGB frames.

use std::fs;
use std::path::PathBuf;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_line_segment_mut, draw_polygon_mut,
    draw_text_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use log::debug;
use nalgebra::Point2;

use crate::config::OverlayStyle;
use crate::detect::{FrameAnalysis, MarkerReport};
use crate::guidance::arrow_tip;
use crate::AppError;

pub const OUTLINE_OFF_CENTER: Rgb<u8> = Rgb([255, 255, 0]);
pub const OUTLINE_CENTERED: Rgb<u8> = Rgb([0, 255, 0]);
pub const MARKER_CENTER: Rgb<u8> = Rgb([255, 0, 0]);
pub const FRAME_CENTER: Rgb<u8> = Rgb([0, 0, 255]);
pub const ARROW: Rgb<u8> = Rgb([0, 0, 255]);
const TEXT: Rgb<u8> = Rgb([255, 255, 255]);
const DISTANCE_TEXT: Rgb<u8> = Rgb([0, 255, 0]);
const LABEL_BOX: Rgb<u8> = Rgb([0, 0, 0]);

const DOT_RADIUS: i32 = 5;
const EMBEDDED_FONT: &[u8] = include_bytes!("../fonts/DejaVuSansMono.ttf");
const ARROW_TIP_FRACTION: f32 = 0.3;

/// Draws marker outlines, labels, guidance arrows and the HUD.
pub struct Annotator {
    style: OverlayStyle,
    unit: String,
    font: FontArc,
}

impl Annotator {
    /// Use `style.font_path` when set, the embedded DejaVu Sans Mono otherwise.
    pub fn new(style: OverlayStyle, unit: impl Into<String>) -> Result<Self, AppError> {
        let font = match &style.font_path {
            Some(path) => {
                let bytes = fs::read(path).map_err(|e| AppError::Font {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                debug!("overlay font {}", path.display());
                FontArc::try_from_vec(bytes).map_err(|e| AppError::Font {
                    path: path.clone(),
                    reason: e.to_string(),
                })?
            }
            None => FontArc::try_from_slice(EMBEDDED_FONT).map_err(|e| AppError::Font {
                path: PathBuf::from("<embedded DejaVuSansMono.ttf>"),
                reason: e.to_string(),
            })?,
        };
        Ok(Self {
            style,
            unit: unit.into(),
            font,
        })
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Draw the overlay for `analysis` onto `canvas`.
    pub fn draw(&self, canvas: &mut RgbImage, analysis: &FrameAnalysis, fps: Option<f64>) {
        for marker in &analysis.markers {
            self.draw_marker(canvas, marker);
        }

        let fc = analysis.frame_center;
        draw_filled_circle_mut(canvas, (fc.x, fc.y), DOT_RADIUS, FRAME_CENTER);

        if self.style.hud {
            self.draw_hud(canvas, analysis, fps);
        }
    }

    /// Copy `frame` and draw the overlay on the copy.
    pub fn render(&self, frame: &RgbImage, analysis: &FrameAnalysis, fps: Option<f64>) -> RgbImage {
        let mut canvas = frame.clone();
        self.draw(&mut canvas, analysis, fps);
        canvas
    }

    fn draw_marker(&self, canvas: &mut RgbImage, marker: &MarkerReport) {
        let c = marker.center;
        if !marker.alignment.is_centered() {
            let tip = arrow_tip(c, &marker.offset);
            draw_arrow(canvas, c, tip, self.style.arrow_thickness, ARROW);
        }

        let color = if marker.alignment.is_centered() {
            OUTLINE_CENTERED
        } else {
            OUTLINE_OFF_CENTER
        };
        draw_closed_polyline(canvas, &marker.corners, self.style.line_thickness, color);

        if self.style.labels {
            let anchor = marker.corners[0];
            let (ax, ay) = (anchor.x.round() as i32, anchor.y.round() as i32);
            let label = PxScale::from(self.style.label_px);
            draw_filled_rect_mut(canvas, Rect::at(ax, ay - 25).of_size(100, 30), LABEL_BOX);
            let id = format!("ID: {}", marker.id);
            draw_text_mut(canvas, TEXT, ax + 2, ay - 24, label, &self.font, &id);
            let dist = format!("Distance: {}", marker.distance_label(&self.unit));
            draw_text_mut(canvas, DISTANCE_TEXT, ax, ay + 8, label, &self.font, &dist);
        }

        draw_filled_circle_mut(canvas, (c.x, c.y), DOT_RADIUS, MARKER_CENTER);
    }

    fn draw_hud(&self, canvas: &mut RgbImage, analysis: &FrameAnalysis, fps: Option<f64>) {
        let scale = PxScale::from(self.style.hud_px);
        let step = (self.style.hud_px * 2.0).round() as i32;

        let mut lines = Vec::with_capacity(4);
        if let Some(fps) = fps {
            lines.push(format!("FPS: {}", fps as i64));
        }
        if let Some(m) = analysis.primary() {
            lines.push(format!("Marker Center: ({}, {})", m.center.x, m.center.y));
            lines.push(format!("Distance from Center: {} px", m.offset_norm as i64));
            lines.push(format!("Move X: {} px, Y: {} px", m.offset.x, m.offset.y));
        }
        for (i, line) in lines.iter().enumerate() {
            draw_text_mut(canvas, TEXT, 10, 10 + i as i32 * step, scale, &self.font, line);
        }
    }
}

/// Segment from `a` to `b` with the given thickness.
fn draw_thick_segment(canvas: &mut RgbImage, a: (f32, f32), b: (f32, f32), thickness: u32, color: Rgb<u8>) {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = dx.hypot(dy);
    if thickness <= 1 || len < 0.5 {
        draw_line_segment_mut(canvas, a, b, color);
        return;
    }
    let half = thickness as f32 / 2.0;
    let (nx, ny) = (-dy / len * half, dx / len * half);
    let quad = [
        Point::new((a.0 + nx).round() as i32, (a.1 + ny).round() as i32),
        Point::new((b.0 + nx).round() as i32, (b.1 + ny).round() as i32),
        Point::new((b.0 - nx).round() as i32, (b.1 - ny).round() as i32),
        Point::new((a.0 - nx).round() as i32, (a.1 - ny).round() as i32),
    ];
    draw_polygon_mut(canvas, &quad, color);
}

fn draw_closed_polyline(canvas: &mut RgbImage, pts: &[Point2<f32>; 4], thickness: u32, color: Rgb<u8>) {
    let radius = (thickness / 2) as i32;
    for i in 0..4 {
        let a = pts[i];
        let b = pts[(i + 1) % 4];
        draw_thick_segment(canvas, (a.x, a.y), (b.x, b.y), thickness, color);
        if radius > 0 {
            draw_filled_circle_mut(canvas, (a.x.round() as i32, a.y.round() as i32), radius, color);
        }
    }
}

/// Arrow from `from` to `to` with two head strokes at 45 degrees, each
/// `ARROW_TIP_FRACTION` of the shaft length.
fn draw_arrow(canvas: &mut RgbImage, from: Point2<i32>, to: Point2<i32>, thickness: u32, color: Rgb<u8>) {
    let (fx, fy) = (from.x as f32, from.y as f32);
    let (tx, ty) = (to.x as f32, to.y as f32);
    draw_thick_segment(canvas, (fx, fy), (tx, ty), thickness, color);

    let len = (tx - fx).hypot(ty - fy);
    if len < 1.0 {
        return;
    }
    let tip = len * ARROW_TIP_FRACTION;
    let angle = (fy - ty).atan2(fx - tx);
    for side in [std::f32::consts::FRAC_PI_4, -std::f32::consts::FRAC_PI_4] {
        let head = (tx + tip * (angle + side).cos(), ty + tip * (angle + side).sin());
        draw_thick_segment(canvas, head, (tx, ty), thickness, color);
    }
}
