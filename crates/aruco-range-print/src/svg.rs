use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use aruco_range_aruco::Dictionary;

use crate::render::marker_cells;
use crate::PrintError;

/// SVG document for marker `id`, `size_px` user units on a side.
///
/// Black cells become one `<rect>` each over a white background, so the
/// output scales without resampling.
pub fn render_marker_svg(dict: &Dictionary, id: u32, size_px: usize) -> Result<String, PrintError> {
    let (cells, grid) = marker_cells(dict, id)?;
    if size_px < cells {
        return Err(PrintError::InvalidSize { size_px, cells });
    }
    let cell = size_px as f64 / cells as f64;

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" version="1.1" width="{size_px}" height="{size_px}" viewBox="0 0 {size_px} {size_px}" shape-rendering="crispEdges">"#
    );
    let _ = writeln!(out, r#"  <title>{} id {id}</title>"#, dict.name);
    let _ = writeln!(out, r#"  <rect width="{size_px}" height="{size_px}" fill="white"/>"#);
    for cy in 0..cells {
        for cx in 0..cells {
            if grid[cy * cells + cx] {
                continue;
            }
            let _ = writeln!(
                out,
                r#"  <rect x="{:.3}" y="{:.3}" width="{:.3}" height="{:.3}" fill="black"/>"#,
                cx as f64 * cell,
                cy as f64 * cell,
                cell,
                cell
            );
        }
    }
    out.push_str("</svg>\n");
    Ok(out)
}

pub fn write_svg(path: impl AsRef<Path>, svg: &str) -> Result<(), PrintError> {
    fs::write(path, svg)?;
    Ok(())
}
