// Phase 2: URL -> source bytes -> RGBA pixel buffer

pub mod http;

pub use http::HttpFetcher;

use crate::chop::PixelBuffer;
use crate::error::ChopError;

/// Something that can produce the raw bytes behind an image URL.
pub trait ImageSource: Send + Sync {
    /// Retrieve the bytes at `url`. Failures are [`ChopError::FetchError`].
    fn fetch(&self, url: &str) -> crate::error::Result<Vec<u8>>;
}

/// Source bytes together with their decoded pixels.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub pixels: PixelBuffer,
}

/// Decode encoded image bytes into an RGBA buffer.
///
/// Images without alpha get a fully opaque channel. Undecodable input is a
/// [`ChopError::FetchError`].
pub fn decode_image(bytes: &[u8]) -> crate::error::Result<PixelBuffer> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ChopError::fetch(format!("failed to decode image: {e}")))?;
    Ok(PixelBuffer::from_dynamic(image))
}

/// Fetch `url` from `source` and decode it.
pub fn fetch_pixels(source: &dyn ImageSource, url: &str) -> crate::error::Result<FetchedImage> {
    let bytes = source.fetch(url)?;
    let pixels = decode_image(&bytes)?;
    Ok(FetchedImage { bytes, pixels })
}
