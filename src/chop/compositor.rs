// Phase 4: crop to bounding box + background removal -> encoded bytes

use image::RgbaImage;

use super::encode::encode_rgba;
use super::pixels::CHANNELS;
use super::segmenter::is_chop_pixel;
use super::{BoundingBox, PixelBuffer, ProcessedImage};
use crate::config::settings::{BackgroundMode, OutputFormat};
use crate::error::ChopError;
use crate::fetch::decode_image;

/// Output settings for the cropper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropConfig {
    pub output_format: OutputFormat,
    /// JPEG quality (1-100). Ignored for PNG.
    pub jpeg_quality: u8,
    pub background: BackgroundMode,
    /// Replacement colour for background pixels in [`BackgroundMode::Matte`].
    pub matte_color: [u8; 3],
}

impl Default for CropConfig {
    fn default() -> Self {
        CropConfig {
            output_format: OutputFormat::Jpeg,
            jpeg_quality: 90,
            background: BackgroundMode::Keep,
            matte_color: [255, 255, 255],
        }
    }
}

impl CropConfig {
    /// Reject combinations the encoder cannot honour.
    ///
    /// A transparent background needs an alpha channel, so it requires PNG.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.background == BackgroundMode::Transparent && self.output_format != OutputFormat::Png
        {
            return Err(ChopError::config(format!(
                "transparent background requires png output, got {}",
                self.output_format.extension()
            )));
        }
        Ok(())
    }
}

/// Crop `pixels` to `bbox` and re-encode the region.
///
/// The box is clamped to the image first. A sentinel box, or one that is
/// empty after clamping, is a [`ChopError::CropError`]. Output is
/// deterministic for identical inputs.
pub fn crop_chop(
    pixels: &PixelBuffer,
    bbox: &BoundingBox,
    config: &CropConfig,
) -> crate::error::Result<ProcessedImage> {
    if bbox.is_sentinel() {
        return Err(ChopError::crop("cannot crop the no-detection sentinel box"));
    }
    config.validate()?;

    let x1 = bbox.x1.min(pixels.width());
    let x2 = bbox.x2.min(pixels.width());
    let y1 = bbox.y1.min(pixels.height());
    let y2 = bbox.y2.min(pixels.height());
    if x1 >= x2 || y1 >= y2 {
        return Err(ChopError::crop(format!(
            "box [{}, {}]x[{}, {}] is empty within {}x{} image",
            bbox.x1,
            bbox.x2,
            bbox.y1,
            bbox.y2,
            pixels.width(),
            pixels.height()
        )));
    }

    let (crop_w, crop_h) = (x2 - x1, y2 - y1);
    let mut data = Vec::with_capacity(crop_w as usize * crop_h as usize * CHANNELS);
    for y in y1..y2 {
        let row = pixels.row(y);
        let span = &row[x1 as usize * CHANNELS..x2 as usize * CHANNELS];
        for px in span.chunks_exact(CHANNELS) {
            data.extend_from_slice(&composite_pixel(px, config));
        }
    }

    let rgba = RgbaImage::from_raw(crop_w, crop_h, data)
        .ok_or_else(|| ChopError::crop("failed to build cropped image buffer"))?;
    let bytes = encode_rgba(rgba, config.output_format, config.jpeg_quality)?;

    Ok(ProcessedImage {
        bytes,
        content_type: config.output_format.content_type(),
        width: crop_w,
        height: crop_h,
    })
}

/// Decode `source_bytes` and crop them to `bbox`.
pub fn crop_chop_bytes(
    source_bytes: &[u8],
    bbox: &BoundingBox,
    config: &CropConfig,
) -> crate::error::Result<ProcessedImage> {
    let pixels = decode_image(source_bytes)?;
    crop_chop(&pixels, bbox, config)
}

fn composite_pixel(px: &[u8], config: &CropConfig) -> [u8; 4] {
    let (r, g, b, a) = (px[0], px[1], px[2], px[3]);
    match config.background {
        BackgroundMode::Keep => [r, g, b, a],
        _ if is_chop_pixel(r, g, b) => [r, g, b, a],
        BackgroundMode::Matte => {
            let [mr, mg, mb] = config.matte_color;
            [mr, mg, mb, 255]
        }
        BackgroundMode::Transparent => [r, g, b, 0],
    }
}
