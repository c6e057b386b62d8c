// Phase 5: 画像単位処理: 取得 → 境界検出 → 切り抜き

use tracing::{debug, warn};

use crate::chop::compositor::{CropConfig, crop_chop};
use crate::chop::{BoundaryDetector, BoundingBox, PixelBuffer, ProcessedImage};
use crate::fetch::{ImageSource, fetch_pixels};
use crate::record::StoredCrop;

/// Result of running one image through detect + crop.
#[derive(Debug, Clone)]
pub enum ChopOutcome {
    Detected {
        bbox: BoundingBox,
        /// `None` when the box came from stored coordinates instead of detection.
        area_ratio: Option<f64>,
        image: ProcessedImage,
        source_width: u32,
        source_height: u32,
    },
    /// Detection ran and found nothing. The cropper was not invoked.
    NoChopDetected {
        source_width: u32,
        source_height: u32,
        area_ratio: f64,
    },
}

/// Detect (or take `stored_crop`) and crop an already-decoded image.
///
/// Stored coordinates are validated against the image and bypass the
/// detector entirely.
pub fn process_pixels(
    pixels: &PixelBuffer,
    detector: &dyn BoundaryDetector,
    stored_crop: Option<&StoredCrop>,
    crop_config: &CropConfig,
) -> crate::error::Result<ChopOutcome> {
    let (source_width, source_height) = (pixels.width(), pixels.height());

    let (bbox, area_ratio) = match stored_crop {
        Some(stored) => (stored.validate(source_width, source_height)?, None),
        None => {
            let detection = detector.detect(pixels);
            if detection.is_sentinel() {
                return Ok(ChopOutcome::NoChopDetected {
                    source_width,
                    source_height,
                    area_ratio: detection.area_ratio,
                });
            }
            (detection.bbox, Some(detection.area_ratio))
        }
    };

    let image = crop_chop(pixels, &bbox, crop_config)?;
    debug!(
        x1 = bbox.x1,
        y1 = bbox.y1,
        x2 = bbox.x2,
        y2 = bbox.y2,
        confidence = bbox.confidence,
        bytes = image.bytes.len(),
        "cropped chop"
    );

    Ok(ChopOutcome::Detected {
        bbox,
        area_ratio,
        image,
        source_width,
        source_height,
    })
}

/// Fetch `url`, then detect and crop.
///
/// A fetch failure returns before the detector or cropper run.
pub fn process_chop_image(
    url: &str,
    source: &dyn ImageSource,
    detector: &dyn BoundaryDetector,
    stored_crop: Option<&StoredCrop>,
    crop_config: &CropConfig,
) -> crate::error::Result<ChopOutcome> {
    let fetched = fetch_pixels(source, url)?;
    let outcome = process_pixels(&fetched.pixels, detector, stored_crop, crop_config)?;

    if matches!(outcome, ChopOutcome::NoChopDetected { .. }) {
        warn!(url, detector = detector.name(), "no chop detected");
    }
    Ok(outcome)
}
