//! Printable ArUco marker generation.
//!
//! Markers are drawn the way OpenCV's `generateImageMarker` does: a
//! `(n + 2) x (n + 2)` cell grid with a one-cell black border, white cells
//! for set bits, scaled to the requested side with nearest-neighbour
//! sampling.
//!
//! ```
//! use aruco_range_aruco::builtins::DICT_4X4_50;
//! use aruco_range_print::render_marker;
//!
//! let img = render_marker(&DICT_4X4_50, 0, 120).unwrap();
//! assert_eq!((img.width, img.height), (120, 120));
//! assert_eq!(img.data[0], 0);
//! ```

mod batch;
mod error;
mod io;
mod render;
mod svg;

pub use batch::{generate_markers, GenerateRequest, MarkerFormat};
pub use error::PrintError;
pub use io::{encode_png, read_png_gray, write_png};
pub use render::{add_quiet_zone, render_marker};
pub use svg::{render_marker_svg, write_svg};
