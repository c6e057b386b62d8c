// Phase 2: decoded RGBA pixel buffer

use image::DynamicImage;

use crate::error::ChopError;

/// Bytes per pixel. Buffers always carry an alpha channel.
pub const CHANNELS: usize = 4;

/// A decoded image as flat RGBA samples.
///
/// Pixel `(x, y)` starts at `(y * width + x) * 4`. The buffer is immutable
/// once constructed; the constructor guarantees the length matches the
/// dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes, checking the length against `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> crate::error::Result<Self> {
        let expected_len = rgba_len(width, height)?;
        if data.len() != expected_len {
            return Err(ChopError::fetch(format!(
                "RGBA data size mismatch: expected {} bytes, got {}",
                expected_len,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Convert a decoded image, synthesizing full opacity when it has no alpha.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let rgba = image.into_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            data: rgba.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// RGBA samples of the pixel at `(x, y)`, or `None` outside the buffer.
    pub fn rgba_at(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        let px = &self.data[offset..offset + CHANNELS];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Borrow a row of RGBA samples.
    pub(crate) fn row(&self, y: u32) -> &[u8] {
        let stride = self.width as usize * CHANNELS;
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }
}

fn rgba_len(width: u32, height: u32) -> crate::error::Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|wh| wh.checked_mul(CHANNELS))
        .ok_or_else(|| {
            ChopError::fetch(format!(
                "Overflow computing buffer size for {}x{} RGBA image",
                width, height
            ))
        })
}
