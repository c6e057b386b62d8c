// Phase 3: chop region -> bounding box + confidence

use tracing::debug;

use super::segmenter::{ChopRegion, scan_chop_region};
use super::{BoundingBox, Detection, PixelBuffer};

/// Fraction of the tight box's width/height added on each side.
pub const MARGIN_FRACTION: f64 = 0.05;

/// Base confidence for any non-sentinel detection.
pub const BASE_CONFIDENCE: f64 = 0.5;
/// Bonus when the chop covers a plausible share of the frame.
pub const AREA_BONUS: f64 = 0.2;
/// Bonus when the expanded box is densely filled by chop pixels.
pub const FILL_BONUS: f64 = 0.3;

/// Exclusive bounds of the plausible chop/frame area ratio.
pub const AREA_RATIO_RANGE: (f64, f64) = (0.1, 0.6);
/// Fill ratio must exceed this for the fill bonus.
pub const MIN_FILL_RATIO: f64 = 0.4;

/// Detect the chop in `pixels` and report its margin-expanded bounding box.
///
/// Returns a detection carrying [`BoundingBox::NONE`] when no pixel passes
/// the colour test or the chop pixels span a single row or column.
pub fn detect_chop_boundaries(pixels: &PixelBuffer) -> Detection {
    let region = scan_chop_region(pixels);
    let detection = detection_from_region(&region, pixels.width(), pixels.height());

    debug!(
        chop_pixels = region.count,
        area_ratio = detection.area_ratio,
        fill_ratio = detection.fill_ratio,
        confidence = detection.bbox.confidence,
        "chop boundary scan finished"
    );

    detection
}

/// Turn an accumulated chop region into a detection for a `width x height` image.
pub fn detection_from_region(region: &ChopRegion, width: u32, height: u32) -> Detection {
    let total_pixels = width as f64 * height as f64;
    let area_ratio = if total_pixels > 0.0 {
        region.count as f64 / total_pixels
    } else {
        0.0
    };

    if region.is_degenerate() {
        return Detection {
            bbox: BoundingBox::NONE,
            area_ratio: round_to(area_ratio, 4),
            fill_ratio: 0.0,
        };
    }

    // Inclusive pixel extents -> half-open box.
    let (x1, x2) = expand_with_margin(region.min_x, region.max_x + 1, width);
    let (y1, y2) = expand_with_margin(region.min_y, region.max_y + 1, height);

    let expanded_area = (x2 - x1) as f64 * (y2 - y1) as f64;
    let fill_ratio = region.count as f64 / expanded_area;

    Detection {
        bbox: BoundingBox {
            x1,
            y1,
            x2,
            y2,
            confidence: score_confidence(area_ratio, fill_ratio),
        },
        area_ratio: round_to(area_ratio, 4),
        fill_ratio,
    }
}

/// Grow `[start, end)` by 5% of its length on both sides, clamped to `[0, limit]`.
pub fn expand_with_margin(start: u32, end: u32, limit: u32) -> (u32, u32) {
    let margin = (MARGIN_FRACTION * (end - start) as f64).round() as u32;
    (
        start.saturating_sub(margin),
        end.saturating_add(margin).min(limit),
    )
}

/// Heuristic confidence from the two segmentation ratios, rounded to 2 decimals.
pub fn score_confidence(area_ratio: f64, fill_ratio: f64) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    if area_ratio > AREA_RATIO_RANGE.0 && area_ratio < AREA_RATIO_RANGE.1 {
        confidence += AREA_BONUS;
    }
    if fill_ratio > MIN_FILL_RATIO {
        confidence += FILL_BONUS;
    }
    round_to(confidence, 2)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
