//! Encoded image payload parsing.
//!
//! An inbound image arrives as a base64 string, optionally wrapped in a
//! data-URI prefix (`data:image/png;base64,<payload>`). This module strips
//! the prefix, derives the staging extension from the declared media type,
//! and decodes the body into raw bytes. Nothing here touches the filesystem.
//!
//! # Payload Flow
//!
//! ```text
//! "data:image/png;base64,iVBOR..."
//!        │
//!        ▼
//! ┌─────────────────────────────┐
//! │ 1. Emptiness check          │
//! ├─────────────────────────────┤
//! │ 2. Data-URI prefix          │
//! │    - whitelist media type   │
//! │    - pick extension         │
//! ├─────────────────────────────┤
//! │ 3. Base64 decode            │
//! └─────────────────────────────┘
//!        │
//!        ▼
//! EncodedImage { bytes, extension }
//! ```
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::StageError;

/// File extension a staged image is written under.
///
/// The extension is derived from the data-URI media type, not from sniffing
/// the bytes; a payload without a prefix defaults to [`Png`](ImageExt::Png)
/// and the decoder downstream makes the final call on the actual format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageExt {
    /// `image/jpeg`, staged as `.jpg`.
    Jpg,
    /// `image/png`, staged as `.png`. Also the default when no prefix is present.
    Png,
    /// `image/gif`, staged as `.gif`.
    Gif,
}

impl ImageExt {
    /// Maps a declared media type to an extension.
    ///
    /// Returns `None` for anything outside the `image/jpeg`, `image/png`,
    /// `image/gif` whitelist.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ingest::ImageExt;
    ///
    /// assert_eq!(ImageExt::from_media_type("image/jpeg"), Some(ImageExt::Jpg));
    /// assert_eq!(ImageExt::from_media_type("image/webp"), None);
    /// ```
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            "image/jpeg" => Some(ImageExt::Jpg),
            "image/png" => Some(ImageExt::Png),
            "image/gif" => Some(ImageExt::Gif),
            _ => None,
        }
    }

    /// Returns the extension string without a leading dot.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageExt::Jpg => "jpg",
            ImageExt::Png => "png",
            ImageExt::Gif => "gif",
        }
    }
}

impl std::fmt::Display for ImageExt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed image payload: decoded bytes plus the staging extension.
///
/// This is the validated form the staging store accepts. Construction via
/// [`EncodedImage::from_base64`] is the only path, so holding one implies the
/// payload passed the whitelist and decoded cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// Raw image bytes after base64 decoding.
    pub bytes: Vec<u8>,
    /// Extension the staged file will carry.
    pub extension: ImageExt,
}

impl EncodedImage {
    /// Parses a base64 payload, honoring an optional data-URI prefix.
    ///
    /// # Arguments
    ///
    /// * `payload` - The request field value, base64 with or without a
    ///   `data:<media-type>;base64,` prefix
    ///
    /// # Errors
    ///
    /// - [`StageError::EmptyImage`] - payload empty before or after decoding
    /// - [`StageError::UnsupportedMediaType`] - declared type outside the whitelist
    /// - [`StageError::InvalidBase64`] - malformed prefix or body
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ingest::{EncodedImage, ImageExt, StageError};
    ///
    /// let parsed = EncodedImage::from_base64("data:image/jpeg;base64,aGVsbG8=").unwrap();
    /// assert_eq!(parsed.extension, ImageExt::Jpg);
    /// assert_eq!(parsed.bytes, b"hello");
    ///
    /// // No prefix defaults to png.
    /// let parsed = EncodedImage::from_base64("aGVsbG8=").unwrap();
    /// assert_eq!(parsed.extension, ImageExt::Png);
    ///
    /// let err = EncodedImage::from_base64("data:image/webp;base64,aGVsbG8=");
    /// assert!(matches!(err, Err(StageError::UnsupportedMediaType { .. })));
    /// ```
    pub fn from_base64(payload: &str) -> Result<Self, StageError> {
        if payload.trim().is_empty() {
            return Err(StageError::EmptyImage);
        }

        let (extension, body) = split_data_uri(payload)?;
        let bytes = BASE64
            .decode(body.trim())
            .map_err(|err| StageError::InvalidBase64 {
                detail: err.to_string(),
            })?;
        if bytes.is_empty() {
            return Err(StageError::EmptyImage);
        }

        Ok(Self { bytes, extension })
    }
}

/// Splits an optional data-URI prefix off the payload.
///
/// Returns the extension implied by the prefix (default png when absent) and
/// the base64 body. The media type is validated here so unsupported types
/// fail before any decoding work.
fn split_data_uri(payload: &str) -> Result<(ImageExt, &str), StageError> {
    let Some(rest) = payload.strip_prefix("data:") else {
        return Ok((ImageExt::Png, payload));
    };

    match rest.split_once(";base64,") {
        Some((media_type, body)) => {
            let extension = ImageExt::from_media_type(media_type).ok_or_else(|| {
                StageError::UnsupportedMediaType {
                    declared: media_type.to_string(),
                }
            })?;
            Ok((extension, body))
        }
        None => Err(StageError::InvalidBase64 {
            detail: "data uri is missing the \";base64,\" marker".to_string(),
        }),
    }
}
