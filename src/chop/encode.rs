// Phase 4: image crate: cropped RGBA -> JPEG/PNG bytes

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, RgbImage, RgbaImage};

use crate::config::settings::OutputFormat;
use crate::error::ChopError;

/// Encode an RGBA image in the requested output format.
///
/// JPEG drops the alpha channel; PNG keeps it.
pub fn encode_rgba(
    rgba: RgbaImage,
    format: OutputFormat,
    jpeg_quality: u8,
) -> crate::error::Result<Vec<u8>> {
    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
            encode_rgb_to_jpeg(&rgb, jpeg_quality)
        }
        OutputFormat::Png => encode_rgba_to_png(&rgba),
    }
}

/// Encode an RGB image to JPEG bytes at `quality` (1-100).
pub fn encode_rgb_to_jpeg(rgb: &RgbImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    if !(1..=100).contains(&quality) {
        return Err(ChopError::encode(format!(
            "JPEG quality must be 1-100, got {}",
            quality
        )));
    }

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)?;

    Ok(buf.into_inner())
}

/// Encode an RGBA image to PNG bytes.
pub fn encode_rgba_to_png(rgba: &RgbaImage) -> crate::error::Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    let encoder = PngEncoder::new(&mut buf);
    rgba.write_with_encoder(encoder)?;

    Ok(buf.into_inner())
}
