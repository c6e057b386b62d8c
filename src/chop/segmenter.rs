// Phase 3: per-pixel chop/background classification

use rayon::prelude::*;

use super::pixels::{CHANNELS, PixelBuffer};

/// Minimum red intensity for a chop pixel.
pub const MIN_RED: i32 = 100;
/// Red must exceed blue by more than this.
pub const RED_OVER_BLUE: i32 = 30;
/// Red may trail green by less than this.
pub const GREEN_TOLERANCE: i32 = 20;
/// Channels all above this value are treated as white background.
pub const WHITE_LEVEL: i32 = 240;

/// Classify one pixel as chop (pink/red meat) or background.
///
/// Alpha is not considered. Arithmetic is done in `i32` so `b + 30` and
/// `g - 20` cannot wrap.
#[inline]
pub fn is_chop_pixel(r: u8, g: u8, b: u8) -> bool {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let near_white = r > WHITE_LEVEL && g > WHITE_LEVEL && b > WHITE_LEVEL;
    r > MIN_RED && r > b + RED_OVER_BLUE && r > g - GREEN_TOLERANCE && !near_white
}

/// Per-pixel chop flags with the same dimensions as the source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChopMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl ChopMask {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.bits[y as usize * self.width as usize + x as usize]
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }
}

/// Materialise the chop mask for every pixel of `pixels`.
pub fn segment_chop_mask(pixels: &PixelBuffer) -> ChopMask {
    let bits = pixels
        .as_raw()
        .par_chunks_exact(CHANNELS)
        .map(|px| is_chop_pixel(px[0], px[1], px[2]))
        .collect();

    ChopMask {
        width: pixels.width(),
        height: pixels.height(),
        bits,
    }
}

/// Running chop-pixel count and inclusive extents.
///
/// Merging is min/max/sum, so partial regions from different rows can be
/// combined in any order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChopRegion {
    pub count: u64,
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl ChopRegion {
    pub const EMPTY: ChopRegion = ChopRegion {
        count: 0,
        min_x: u32::MAX,
        max_x: 0,
        min_y: u32::MAX,
        max_y: 0,
    };

    fn add(mut self, x: u32, y: u32) -> Self {
        self.count += 1;
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
        self
    }

    pub fn merge(self, other: Self) -> Self {
        if self.count == 0 {
            return other;
        }
        if other.count == 0 {
            return self;
        }
        ChopRegion {
            count: self.count + other.count,
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// True when there are no chop pixels or the extents span a single
    /// row or column.
    pub fn is_degenerate(&self) -> bool {
        self.count == 0 || self.min_x >= self.max_x || self.min_y >= self.max_y
    }
}

/// Scan the buffer row-parallel and accumulate the chop region without
/// materialising a mask.
pub fn scan_chop_region(pixels: &PixelBuffer) -> ChopRegion {
    if pixels.pixel_count() == 0 {
        return ChopRegion::EMPTY;
    }

    (0..pixels.height())
        .into_par_iter()
        .fold(
            || ChopRegion::EMPTY,
            |acc, y| {
                pixels
                    .row(y)
                    .chunks_exact(CHANNELS)
                    .enumerate()
                    .filter(|(_, px)| is_chop_pixel(px[0], px[1], px[2]))
                    .fold(acc, |acc, (x, _)| acc.add(x as u32, y))
            },
        )
        .reduce(|| ChopRegion::EMPTY, ChopRegion::merge)
}
