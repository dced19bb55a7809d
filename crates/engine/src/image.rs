//! Canonical grayscale images and multi-codec decoding.
//!
//! The engine consumes opaque byte payloads and reduces them to a single
//! in-memory representation: an 8-bit single-channel pixel grid. Decoding
//! tries each supported codec in a fixed priority order; callers never learn
//! which codec matched, only whether any did.

use image::ImageFormat;
use tracing::debug;

use crate::error::DecodeError;

/// Codec probe order. JPEG first because fingerprint capture devices emit it
/// most often; the order is a latency heuristic only and never changes the
/// decoded result.
const CODEC_PRIORITY: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Gif];

/// An in-memory single-channel image with explicit bounds.
///
/// Pixels are row-major, one byte per pixel, `width * height` long. The
/// value has no persistent identity; it is owned by the call that produced
/// it and discarded after template extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Row-major grayscale intensities.
    pub pixels: Vec<u8>,
}

impl CanonicalImage {
    /// Builds an image from raw parts, returning `None` when the buffer
    /// length does not match the declared bounds.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> Option<Self> {
        if pixels.len() != (width as usize) * (height as usize) {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// Intensity at `(x, y)`. Callers are expected to stay in bounds; the
    /// slice index panics otherwise, as for any Rust slice.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }
}

/// Decode an opaque byte payload into a grayscale [`CanonicalImage`].
///
/// Codecs are tried in [`CODEC_PRIORITY`] order and the first successful
/// parse wins. Every pixel is reduced through the standard luminance
/// transform; output dimensions equal the source bounds exactly. The
/// function is pure: no I/O, no side effects.
pub fn decode_gray(bytes: &[u8]) -> Result<CanonicalImage, DecodeError> {
    for format in CODEC_PRIORITY {
        let Ok(decoded) = image::load_from_memory_with_format(bytes, format) else {
            continue;
        };
        let gray = decoded.to_luma8();
        let (width, height) = gray.dimensions();
        debug!(?format, width, height, "decoded image payload");
        return Ok(CanonicalImage {
            width,
            height,
            pixels: gray.into_raw(),
        });
    }
    Err(DecodeError::UnsupportedFormat)
}
