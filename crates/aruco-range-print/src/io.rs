use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use aruco_range_core::GrayImage;
use png::{BitDepth, ColorType, Decoder, Encoder};

use crate::PrintError;

fn encode_into<W: Write>(w: W, img: &GrayImage) -> Result<(), PrintError> {
    let mut encoder = Encoder::new(w, img.width as u32, img.height as u32);
    encoder.set_color(ColorType::Grayscale);
    encoder.set_depth(BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|e| PrintError::PngEncode(e.to_string()))?;
    writer
        .write_image_data(&img.data)
        .map_err(|e| PrintError::PngEncode(e.to_string()))?;
    writer
        .finish()
        .map_err(|e| PrintError::PngEncode(e.to_string()))
}

/// Encode an 8-bit grayscale PNG in memory.
pub fn encode_png(img: &GrayImage) -> Result<Vec<u8>, PrintError> {
    let mut buf = Vec::new();
    encode_into(&mut buf, img)?;
    Ok(buf)
}

pub fn write_png(path: impl AsRef<Path>, img: &GrayImage) -> Result<(), PrintError> {
    let file = File::create(path)?;
    encode_into(BufWriter::new(file), img)
}

/// Read back an 8-bit grayscale PNG.
pub fn read_png_gray(path: impl AsRef<Path>) -> Result<GrayImage, PrintError> {
    let path = path.as_ref();
    let decode_err = |reason: String| PrintError::PngDecode {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path)?;
    let mut reader = Decoder::new(BufReader::new(file))
        .read_info()
        .map_err(|e| decode_err(e.to_string()))?;
    let info = reader.info();
    if info.color_type != ColorType::Grayscale || info.bit_depth != BitDepth::Eight {
        return Err(decode_err(format!(
            "expected 8-bit grayscale, got {:?} {:?}",
            info.color_type, info.bit_depth
        )));
    }
    let (width, height) = (info.width as usize, info.height as usize);

    let mut img = GrayImage::filled(width, height, 0);
    reader
        .next_frame(&mut img.data)
        .map_err(|e| decode_err(e.to_string()))?;
    Ok(img)
}
