//! Reading the bit grid of a candidate quad.
//!
//! The quad is mapped onto a square of `cells x cells` units (inner bits
//! plus the black border). Each cell is sampled on a small sub-grid that
//! keeps clear of the cell edges, and the cell means are split into black
//! and white with an Otsu level computed from all samples of the quad.

use aruco_range_core::{homography_from_4pt, sample_bilinear, GrayImageView, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::threshold::otsu_level;
use crate::{Match, Matcher};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    /// Width of the black frame around the inner bits, in cells.
    pub border_bits: usize,
    /// Fraction of a cell skipped on each side before sampling.
    pub cell_margin: f32,
    /// Samples per cell along each axis.
    pub samples_per_cell: usize,
    /// Minimum fraction of border cells that must read black.
    pub min_border_score: f32,
    /// Accept white-on-black markers too.
    pub allow_inverted: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            border_bits: 1,
            cell_margin: 0.2,
            samples_per_cell: 3,
            min_border_score: 0.85,
            allow_inverted: false,
        }
    }
}

/// Inner code and border quality of one quad.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CellReading {
    /// Row-major inner bits, white = 1.
    pub code: u64,
    pub border_score: f32,
    pub inverted: bool,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct DecodedQuad {
    pub matched: Match,
    pub reading: CellReading,
    /// Corners reordered so index 0 is the marker's top-left.
    pub corners: [Point2<f32>; 4],
    pub score: f32,
}

pub(crate) struct MarkerDecoder<'a> {
    cfg: &'a DecodeConfig,
    bits: usize,
    cells: usize,
    /// Sample offsets inside a unit cell.
    pattern: Vec<Point2<f32>>,
    cell_means: Vec<u8>,
    raw: Vec<u8>,
}

impl<'a> MarkerDecoder<'a> {
    /// `None` if the bit count does not fit a `u64` or the sampling
    /// pattern is empty.
    pub(crate) fn new(cfg: &'a DecodeConfig, bits: usize) -> Option<Self> {
        if bits == 0 || bits * bits > 64 || cfg.samples_per_cell == 0 {
            return None;
        }
        let margin = cfg.cell_margin.clamp(0.0, 0.45);
        let span = 1.0 - 2.0 * margin;
        let k = cfg.samples_per_cell;
        let step = span / k as f32;
        let pattern = (0..k * k)
            .map(|i| {
                Point2::new(
                    margin + ((i % k) as f32 + 0.5) * step,
                    margin + ((i / k) as f32 + 0.5) * step,
                )
            })
            .collect();

        let cells = bits + 2 * cfg.border_bits;
        Some(Self {
            cfg,
            bits,
            cells,
            pattern,
            cell_means: Vec::with_capacity(cells * cells),
            raw: Vec::with_capacity(cells * cells * k * k),
        })
    }

    /// Read `corners` (clockwise, any starting corner) and look the code up.
    pub(crate) fn decode_quad(
        &mut self,
        img: &GrayImageView<'_>,
        corners: &[Point2<f32>; 4],
        matcher: &Matcher,
    ) -> Option<DecodedQuad> {
        let n = self.cells as f32;
        let grid = [
            Point2::new(0.0, 0.0),
            Point2::new(n, 0.0),
            Point2::new(n, n),
            Point2::new(0.0, n),
        ];
        let h = homography_from_4pt(&grid, corners)?;
        self.sample_cells(img, &h)?;
        let reading = self.classify()?;
        let matched = matcher.match_code(reading.code)?;

        let bit_count = matcher.dictionary().bit_count().max(1) as f32;
        let agreement = 1.0 - f32::from(matched.hamming) / bit_count;

        let mut oriented = *corners;
        oriented.rotate_left(usize::from(matched.rotation));

        Some(DecodedQuad {
            matched,
            reading,
            corners: oriented,
            score: (reading.border_score * agreement).clamp(0.0, 1.0),
        })
    }

    fn sample_cells(&mut self, img: &GrayImageView<'_>, h: &Homography) -> Option<()> {
        let max_x = img.width.saturating_sub(1) as f32;
        let max_y = img.height.saturating_sub(1) as f32;
        self.cell_means.clear();
        self.raw.clear();

        for cy in 0..self.cells {
            for cx in 0..self.cells {
                let mut sum = 0.0f32;
                for offset in &self.pattern {
                    let p = h.apply(Point2::new(cx as f32 + offset.x, cy as f32 + offset.y));
                    if !(0.0..=max_x).contains(&p.x) || !(0.0..=max_y).contains(&p.y) {
                        return None;
                    }
                    let v = sample_bilinear(img, p.x, p.y);
                    self.raw.push(v.round() as u8);
                    sum += v;
                }
                self.cell_means.push((sum / self.pattern.len() as f32).round() as u8);
            }
        }
        Some(())
    }

    fn classify(&self) -> Option<CellReading> {
        let level = otsu_level(&self.raw);
        let border = self.cfg.border_bits;
        let inner = border..self.cells - border;

        let read = |inverted: bool| {
            let mut border_black = 0u32;
            let mut border_cells = 0u32;
            let mut code = 0u64;
            for (i, &mean) in self.cell_means.iter().enumerate() {
                let (cx, cy) = (i % self.cells, i / self.cells);
                let black = (mean < level) ^ inverted;
                if inner.contains(&cx) && inner.contains(&cy) {
                    if !black {
                        code |= 1u64 << ((cy - border) * self.bits + (cx - border));
                    }
                } else {
                    border_cells += 1;
                    border_black += u32::from(black);
                }
            }
            let border_score = if border_cells == 0 {
                1.0
            } else {
                border_black as f32 / border_cells as f32
            };
            CellReading {
                code,
                border_score,
                inverted,
            }
        };

        let normal = read(false);
        let best = if self.cfg.allow_inverted {
            let flipped = read(true);
            if flipped.border_score > normal.border_score {
                flipped
            } else {
                normal
            }
        } else {
            normal
        };
        (best.border_score >= self.cfg.min_border_score).then_some(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::DICT_4X4_50;
    use aruco_range_core::GrayImage;

    fn draw(img: &mut GrayImage, code: u64, origin: (usize, usize), cell: usize, ink: u8, paper: u8) {
        for cy in 0..6 {
            for cx in 0..6 {
                let inner = (1..5).contains(&cx) && (1..5).contains(&cy);
                let white = inner && (code >> ((cy - 1) * 4 + (cx - 1))) & 1 == 1;
                let v = if white { paper } else { ink };
                for y in 0..cell {
                    for x in 0..cell {
                        img.set(origin.0 + cx * cell + x, origin.1 + cy * cell + y, v);
                    }
                }
            }
        }
    }

    fn square(x0: f32, y0: f32, s: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(x0, y0),
            Point2::new(x0 + s, y0),
            Point2::new(x0 + s, y0 + s),
            Point2::new(x0, y0 + s),
        ]
    }

    #[test]
    fn reads_upright_marker() {
        let mut img = GrayImage::filled(120, 120, 255);
        draw(&mut img, DICT_4X4_50.codes[9], (30, 30), 10, 0, 255);
        let cfg = DecodeConfig::default();
        let mut dec = MarkerDecoder::new(&cfg, 4).expect("decoder");

        let q = square(29.5, 29.5, 60.0);
        let d = dec
            .decode_quad(&img.view(), &q, &Matcher::new(DICT_4X4_50, 0))
            .expect("decoded");
        assert_eq!((d.matched.id, d.matched.rotation), (9, 0));
        assert_eq!(d.corners, q);
        assert!(d.score > 0.9);
        assert!(!d.reading.inverted);
    }

    #[test]
    fn start_corner_follows_marker_orientation() {
        let mut img = GrayImage::filled(120, 120, 255);
        draw(&mut img, DICT_4X4_50.codes[9], (30, 30), 10, 0, 255);
        let cfg = DecodeConfig::default();
        let mut dec = MarkerDecoder::new(&cfg, 4).expect("decoder");

        let q = square(29.5, 29.5, 60.0);
        let mut shifted = q;
        shifted.rotate_left(2);
        let d = dec
            .decode_quad(&img.view(), &shifted, &Matcher::new(DICT_4X4_50, 0))
            .expect("decoded");
        assert_eq!(d.matched.id, 9);
        assert_eq!(d.corners, q);
    }

    #[test]
    fn inverted_marker_needs_opt_in() {
        let mut img = GrayImage::filled(120, 120, 0);
        draw(&mut img, DICT_4X4_50.codes[9], (30, 30), 10, 255, 0);
        let q = square(29.5, 29.5, 60.0);
        let matcher = Matcher::new(DICT_4X4_50, 0);

        let strict = DecodeConfig::default();
        let mut dec = MarkerDecoder::new(&strict, 4).expect("decoder");
        assert!(dec.decode_quad(&img.view(), &q, &matcher).is_none());

        let lenient = DecodeConfig {
            allow_inverted: true,
            ..DecodeConfig::default()
        };
        let mut dec = MarkerDecoder::new(&lenient, 4).expect("decoder");
        let d = dec.decode_quad(&img.view(), &q, &matcher).expect("decoded");
        assert_eq!(d.matched.id, 9);
        assert!(d.reading.inverted);
    }

    #[test]
    fn blank_quad_is_rejected() {
        let img = GrayImage::filled(120, 120, 255);
        let cfg = DecodeConfig::default();
        let mut dec = MarkerDecoder::new(&cfg, 4).expect("decoder");
        let q = square(30.0, 30.0, 60.0);
        assert!(dec
            .decode_quad(&img.view(), &q, &Matcher::new(DICT_4X4_50, 1))
            .is_none());
    }

    #[test]
    fn quad_leaving_the_frame_is_rejected() {
        let mut img = GrayImage::filled(60, 60, 255);
        draw(&mut img, DICT_4X4_50.codes[2], (0, 0), 10, 0, 255);
        let cfg = DecodeConfig::default();
        let mut dec = MarkerDecoder::new(&cfg, 4).expect("decoder");
        let q = square(-20.0, -20.0, 60.0);
        assert!(dec
            .decode_quad(&img.view(), &q, &Matcher::new(DICT_4X4_50, 0))
            .is_none());
    }

    #[test]
    fn unusable_layouts_are_refused() {
        let cfg = DecodeConfig {
            samples_per_cell: 0,
            ..DecodeConfig::default()
        };
        assert!(MarkerDecoder::new(&cfg, 4).is_none());
        assert!(MarkerDecoder::new(&DecodeConfig::default(), 9).is_none());
    }
}
