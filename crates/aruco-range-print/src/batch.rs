use std::fs;
use std::path::{Path, PathBuf};

use aruco_range_aruco::Dictionary;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::{add_quiet_zone, render_marker, render_marker_svg, write_png, write_svg, PrintError};

/// Output encoding of generated markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerFormat {
    #[default]
    Png,
    Svg,
}

impl MarkerFormat {
    pub fn extension(self) -> &'static str {
        match self {
            MarkerFormat::Png => "png",
            MarkerFormat::Svg => "svg",
        }
    }
}

/// A run of consecutive marker ids to write to disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateRequest {
    pub first_id: u32,
    pub count: u32,
    pub size_px: usize,
    /// White margin around each PNG marker.
    pub quiet_zone_px: usize,
    pub format: MarkerFormat,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            first_id: 0,
            count: 20,
            size_px: 200,
            quiet_zone_px: 0,
            format: MarkerFormat::Png,
        }
    }
}

/// Write `marker_{id}.{ext}` for every requested id into `out_dir`.
///
/// The directory is created if needed. All ids are checked against the
/// dictionary before anything is written.
pub fn generate_markers(
    dict: &Dictionary,
    request: &GenerateRequest,
    out_dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, PrintError> {
    let out_dir = out_dir.as_ref();
    let ids = request.first_id..request.first_id.saturating_add(request.count);
    if let Some(bad) = ids.clone().find(|&id| dict.code(id).is_none()) {
        return Err(PrintError::UnknownMarkerId {
            id: bad,
            dictionary: dict.name,
            len: dict.len(),
        });
    }

    fs::create_dir_all(out_dir)?;
    let mut written = Vec::with_capacity(request.count as usize);
    for id in ids {
        let path = out_dir.join(format!("marker_{id}.{}", request.format.extension()));
        match request.format {
            MarkerFormat::Png => {
                let img = render_marker(dict, id, request.size_px)?;
                write_png(&path, &add_quiet_zone(&img, request.quiet_zone_px))?;
            }
            MarkerFormat::Svg => {
                write_svg(&path, &render_marker_svg(dict, id, request.size_px)?)?;
            }
        }
        debug!("wrote {}", path.display());
        written.push(path);
    }

    info!(
        "generated {} {} markers in {}",
        written.len(),
        dict.name,
        out_dir.display()
    );
    Ok(written)
}
