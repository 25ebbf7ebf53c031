//! Thresholding utilities for quad finding and bit decoding.

use aruco_range_core::GrayImageView;

/// Otsu level of a sample set: values strictly below it are dark.
///
/// A flat set returns its only value (everything reads light). When just
/// two distinct values occur the level sits halfway between them.
pub(crate) fn otsu_level(samples: &[u8]) -> u8 {
    let mut hist = [0u64; 256];
    for &v in samples {
        hist[usize::from(v)] += 1;
    }
    let occupied: Vec<usize> = (0..256).filter(|&v| hist[v] > 0).collect();
    match occupied.as_slice() {
        [] => return 128,
        [only] => return *only as u8,
        [lo, hi] => return ((lo + hi + 1) / 2) as u8,
        _ => {}
    }

    let n = samples.len() as f64;
    let mean = hist
        .iter()
        .enumerate()
        .map(|(v, &c)| v as f64 * c as f64)
        .sum::<f64>()
        / n;

    // Between-class variance via the cumulative form (mean*w - s)^2 / (w*(1-w)).
    let (mut w, mut s) = (0.0f64, 0.0f64);
    let mut best = (f64::MIN, 0usize);
    for (v, &c) in hist.iter().enumerate().take(255) {
        w += c as f64 / n;
        s += v as f64 * c as f64 / n;
        if w <= 0.0 || w >= 1.0 {
            continue;
        }
        let spread = (mean * w - s).powi(2) / (w * (1.0 - w));
        if spread > best.0 {
            best = (spread, v);
        }
    }
    (best.1 + 1) as u8
}

/// Binarize `img` into a dark mask using tile-local extrema.
///
/// The image is split into `tile_size` square tiles; each pixel is compared
/// with the midpoint of the min/max over its tile and the 8 neighbouring
/// tiles. Pixels in regions whose contrast is below `min_contrast` are
/// treated as background. Returns a row-major mask with `true` = dark.
pub(crate) fn adaptive_dark_mask(
    img: &GrayImageView<'_>,
    tile_size: usize,
    min_contrast: u8,
) -> Vec<bool> {
    let (w, h) = (img.width, img.height);
    let mut mask = vec![false; w * h];
    if w == 0 || h == 0 {
        return mask;
    }

    let tile = tile_size.max(2);
    let tiles_x = w.div_ceil(tile);
    let tiles_y = h.div_ceil(tile);

    let mut tile_min = vec![255u8; tiles_x * tiles_y];
    let mut tile_max = vec![0u8; tiles_x * tiles_y];
    for y in 0..h {
        let row = &img.data[y * w..(y + 1) * w];
        let ty = y / tile;
        for (x, &v) in row.iter().enumerate() {
            let idx = ty * tiles_x + x / tile;
            tile_min[idx] = tile_min[idx].min(v);
            tile_max[idx] = tile_max[idx].max(v);
        }
    }

    // Spread extrema over the 3x3 tile neighbourhood.
    let mut thresh = vec![None; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut lo = 255u8;
            let mut hi = 0u8;
            for ny in ty.saturating_sub(1)..(ty + 2).min(tiles_y) {
                for nx in tx.saturating_sub(1)..(tx + 2).min(tiles_x) {
                    lo = lo.min(tile_min[ny * tiles_x + nx]);
                    hi = hi.max(tile_max[ny * tiles_x + nx]);
                }
            }
            if hi.saturating_sub(lo) >= min_contrast {
                thresh[ty * tiles_x + tx] = Some(((lo as u16 + hi as u16) / 2) as u8);
            }
        }
    }

    for y in 0..h {
        let ty = y / tile;
        for x in 0..w {
            if let Some(t) = thresh[ty * tiles_x + x / tile] {
                mask[y * w + x] = img.data[y * w + x] < t;
            }
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use aruco_range_core::GrayImage;

    #[test]
    fn otsu_separates_two_levels() {
        let mut samples = vec![20u8; 50];
        samples.extend(vec![220u8; 50]);
        let t = otsu_level(&samples);
        assert!(t > 20 && t <= 220, "threshold {t}");
    }

    #[test]
    fn otsu_separates_noisy_bimodal_samples() {
        let samples: Vec<u8> = (0..200)
            .map(|i| if i % 2 == 0 { 30 + (i % 7) as u8 } else { 200 + (i % 5) as u8 })
            .collect();
        let t = otsu_level(&samples);
        assert!(t > 36 && t <= 200, "threshold {t}");
    }

    #[test]
    fn flat_region_is_background() {
        let img = GrayImage::filled(32, 32, 90);
        let mask = adaptive_dark_mask(&img.view(), 8, 20);
        assert!(mask.iter().all(|&d| !d));
    }

    #[test]
    fn dark_square_on_white_is_dark() {
        let mut img = GrayImage::filled(40, 40, 240);
        for y in 10..30 {
            for x in 10..30 {
                img.set(x, y, 15);
            }
        }
        let mask = adaptive_dark_mask(&img.view(), 8, 20);
        assert!(mask[20 * 40 + 20]);
        assert!(mask[10 * 40 + 10]);
        assert!(!mask[5 * 40 + 5]);
        assert!(!mask[35 * 40 + 20]);
    }
}
