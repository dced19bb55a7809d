//! Error types produced by the ingest crate.
//!
//! This module defines the error surface for payload parsing and staging. All
//! errors are typed, cloneable, and comparable to enable precise error
//! handling and testing. I/O causes are flattened into message strings so the
//! variants stay `Clone + PartialEq + Eq`.
//!
//! # Error Categories
//!
//! | Error | Category | Description |
//! |-------|----------|-------------|
//! | [`EmptyImage`](StageError::EmptyImage) | Validation | Image payload has zero bytes |
//! | [`UnsupportedMediaType`](StageError::UnsupportedMediaType) | Validation | Data-URI media type outside the whitelist |
//! | [`InvalidBase64`](StageError::InvalidBase64) | Validation | Payload is not valid base64 |
//! | [`CreateDir`](StageError::CreateDir) | I/O | Staging directory could not be created |
//! | [`Write`](StageError::Write) | I/O | Staged file could not be written |
//!
//! Normalization never produces a `StageError`; its failures degrade to a
//! warning carried by [`NormalizeOutcome`](crate::NormalizeOutcome).
//!
//! # HTTP Status Code Mapping
//!
//! ```rust
//! use ingest::StageError;
//!
//! let err = StageError::EmptyImage;
//! assert_eq!(err.http_status_code(), 400);
//!
//! let err = StageError::CreateDir {
//!     path: "temp".to_string(),
//!     detail: "permission denied".to_string(),
//! };
//! assert_eq!(err.http_status_code(), 500);
//! ```
use thiserror::Error;

/// Errors that can occur while parsing an encoded payload or staging it to
/// disk.
///
/// Validation variants mean the caller sent something unusable and fire before
/// any file is written; I/O variants mean the service itself could not stage a
/// valid payload.
///
/// The enum is marked `#[non_exhaustive]` to allow future additions without
/// breaking existing code. Callers should always include a catch-all arm when
/// matching.
///
/// # Examples
///
/// ```rust
/// use ingest::StageError;
///
/// let err = StageError::EmptyImage;
/// assert_eq!(err.to_string(), "image payload is empty");
///
/// let err = StageError::UnsupportedMediaType { declared: "image/tiff".to_string() };
/// assert!(err.to_string().contains("image/tiff"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StageError {
    /// Image payload is empty (zero bytes before or after base64 decoding).
    ///
    /// Both the raw request field and the decoded byte vector are checked;
    /// an empty image can never produce a template, so it is rejected at the
    /// door.
    #[error("image payload is empty")]
    EmptyImage,

    /// Data-URI prefix declared a media type outside the whitelist.
    ///
    /// Only `image/jpeg`, `image/png`, and `image/gif` are accepted. The
    /// declared type is carried verbatim for diagnostics. This fires during
    /// parsing, before any bytes reach the filesystem.
    #[error("unsupported media type: {declared}")]
    UnsupportedMediaType {
        /// The media type string taken from the data-URI prefix.
        declared: String,
    },

    /// Payload body is not valid standard base64.
    ///
    /// The decoder's diagnostic is preserved in `detail` (e.g. invalid byte,
    /// invalid padding).
    #[error("invalid base64 image payload: {detail}")]
    InvalidBase64 {
        /// Decoder diagnostic describing what was malformed.
        detail: String,
    },

    /// The staging directory could not be created.
    ///
    /// Creation is idempotent (`create_dir_all`), so this indicates a real
    /// filesystem problem such as permissions or a full disk.
    #[error("failed to create staging directory {path}: {detail}")]
    CreateDir {
        /// The staging directory path.
        path: String,
        /// Underlying I/O error message.
        detail: String,
    },

    /// The staged image file could not be written.
    #[error("failed to write staged image {path}: {detail}")]
    Write {
        /// The staged file path.
        path: String,
        /// Underlying I/O error message.
        detail: String,
    },
}

impl StageError {
    /// Returns true if this error indicates a client-side issue.
    ///
    /// Validation failures (empty payload, bad base64, unsupported media
    /// type) are client errors; staging I/O failures are not.
    ///
    /// # Example
    ///
    /// ```rust
    /// use ingest::StageError;
    ///
    /// assert!(StageError::EmptyImage.is_client_error());
    /// assert!(!StageError::Write {
    ///     path: "temp/x.png".to_string(),
    ///     detail: "disk full".to_string(),
    /// }.is_client_error());
    /// ```
    pub fn is_client_error(&self) -> bool {
        self.http_status_code() < 500
    }

    /// Returns a suggested HTTP status code for this error.
    ///
    /// # Status Codes
    ///
    /// - `EmptyImage`, `UnsupportedMediaType`, `InvalidBase64`: 400
    /// - `CreateDir`, `Write`: 500
    pub fn http_status_code(&self) -> u16 {
        match self {
            StageError::EmptyImage
            | StageError::UnsupportedMediaType { .. }
            | StageError::InvalidBase64 { .. } => 400,
            _ => 500,
        }
    }
}
