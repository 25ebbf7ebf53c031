use aruco_range_aruco::Dictionary;
use aruco_range_core::GrayImage;

use crate::PrintError;

const BLACK: u8 = 0;
const WHITE: u8 = 255;

/// Cell grid of marker `id` (border included), row-major, `true` = white.
pub(crate) fn marker_cells(dict: &Dictionary, id: u32) -> Result<(usize, Vec<bool>), PrintError> {
    let code = dict.code(id).ok_or(PrintError::UnknownMarkerId {
        id,
        dictionary: dict.name,
        len: dict.len(),
    })?;
    let n = dict.marker_size;
    let cells = n + 2;
    let mut grid = vec![false; cells * cells];
    for y in 0..n {
        for x in 0..n {
            grid[(y + 1) * cells + (x + 1)] = dict.bit(code, x, y);
        }
    }
    Ok((cells, grid))
}

/// Draw marker `id` as a `size_px` square grayscale image.
pub fn render_marker(dict: &Dictionary, id: u32, size_px: usize) -> Result<GrayImage, PrintError> {
    let (cells, grid) = marker_cells(dict, id)?;
    if size_px < cells {
        return Err(PrintError::InvalidSize { size_px, cells });
    }

    let mut img = GrayImage::filled(size_px, size_px, BLACK);
    for y in 0..size_px {
        let cy = y * cells / size_px;
        for x in 0..size_px {
            let cx = x * cells / size_px;
            if grid[cy * cells + cx] {
                img.data[y * size_px + x] = WHITE;
            }
        }
    }
    Ok(img)
}

/// Surround `img` with a white margin of `margin_px` pixels.
pub fn add_quiet_zone(img: &GrayImage, margin_px: usize) -> GrayImage {
    if margin_px == 0 {
        return img.clone();
    }
    let w = img.width + 2 * margin_px;
    let h = img.height + 2 * margin_px;
    let mut out = GrayImage::filled(w, h, WHITE);
    for y in 0..img.height {
        let src = &img.data[y * img.width..(y + 1) * img.width];
        let start = (y + margin_px) * w + margin_px;
        out.data[start..start + img.width].copy_from_slice(src);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use aruco_range_aruco::builtins::{DICT_4X4_100, DICT_4X4_50};

    #[test]
    fn border_is_black_and_bits_follow_the_code() {
        let dict = DICT_4X4_50;
        let img = render_marker(&dict, 23, 60).expect("render");
        let code = dict.code(23).expect("code");

        for i in 0..60 {
            assert_eq!(img.data[i], BLACK, "top border");
            assert_eq!(img.data[59 * 60 + i], BLACK, "bottom border");
            assert_eq!(img.data[i * 60], BLACK, "left border");
            assert_eq!(img.data[i * 60 + 59], BLACK, "right border");
        }
        for y in 0..4 {
            for x in 0..4 {
                let px = img.data[((y + 1) * 10 + 5) * 60 + (x + 1) * 10 + 5];
                let expected = if dict.bit(code, x, y) { WHITE } else { BLACK };
                assert_eq!(px, expected, "cell ({x}, {y})");
            }
        }
    }

    #[test]
    fn uneven_sizes_still_cover_the_whole_square() {
        let img = render_marker(&DICT_4X4_50, 0, 200).expect("render");
        assert_eq!(img.data.len(), 200 * 200);
        assert_eq!(img.data[199 * 200 + 199], BLACK);
    }

    #[test]
    fn unknown_id_and_tiny_size_are_rejected() {
        assert!(matches!(
            render_marker(&DICT_4X4_50, 50, 100),
            Err(PrintError::UnknownMarkerId { id: 50, len: 50, .. })
        ));
        assert!(render_marker(&DICT_4X4_100, 50, 100).is_ok());
        assert!(matches!(
            render_marker(&DICT_4X4_50, 0, 5),
            Err(PrintError::InvalidSize { size_px: 5, cells: 6 })
        ));
    }

    #[test]
    fn quiet_zone_pads_with_white() {
        let img = render_marker(&DICT_4X4_50, 1, 12).expect("render");
        let padded = add_quiet_zone(&img, 4);
        assert_eq!((padded.width, padded.height), (20, 20));
        assert_eq!(padded.data[0], WHITE);
        assert_eq!(padded.data[4 * 20 + 4], BLACK);
        assert_eq!(add_quiet_zone(&img, 0), img);
    }
}
