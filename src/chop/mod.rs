pub mod compositor;
pub mod detector;
pub mod encode;
pub mod pixels;
pub mod segmenter;

pub use pixels::PixelBuffer;

use serde::{Deserialize, Serialize};

/// Axis-aligned chop bounds in pixel coordinates.
///
/// Extents are half-open (`x1..x2`, `y1..y2`) and always lie within
/// `[0, width] x [0, height]` of the image they were detected in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub confidence: f64,
}

impl BoundingBox {
    /// The "no chop detected" result. Not a degenerate valid box.
    pub const NONE: BoundingBox = BoundingBox {
        x1: 0,
        y1: 0,
        x2: 0,
        y2: 0,
        confidence: 0.0,
    };

    pub fn is_sentinel(&self) -> bool {
        self.confidence == 0.0 && self.x1 == 0 && self.y1 == 0 && self.x2 == 0 && self.y2 == 0
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// Result of running a boundary detector over one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Chop pixels over total image pixels, rounded to 4 decimals.
    pub area_ratio: f64,
    /// Chop pixels over the margin-expanded box area (0 for the sentinel).
    pub fill_ratio: f64,
}

impl Detection {
    pub fn is_sentinel(&self) -> bool {
        self.bbox.is_sentinel()
    }
}

/// Encoded output of the cropper. Ownership passes to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Strategy that locates the chop in a decoded image.
///
/// Implementations must be pure: the same buffer yields the same detection.
pub trait BoundaryDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, pixels: &PixelBuffer) -> Detection;
}

/// Colour-threshold detector (see [`detector::detect_chop_boundaries`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDetector;

impl BoundaryDetector for HeuristicDetector {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn detect(&self, pixels: &PixelBuffer) -> Detection {
        detector::detect_chop_boundaries(pixels)
    }
}
