//! Ridgeline Ingest Layer
//!
//! This is where images enter the comparison pipeline. We take base64
//! payloads off the wire, validate them, park them as uniquely named temp
//! files, and give the external normalizer a chance to clean them up before
//! decoding.
//!
//! ## What we do here
//!
//! - **Parse encoded payloads** - Strip optional data-URI prefixes, enforce
//!   the jpeg/png/gif media-type whitelist, decode base64. Anything else is
//!   rejected before a single byte touches disk.
//! - **Stage to disk** - Write each image under a timestamp-plus-counter
//!   filename so concurrent requests never collide. [`StagedFile`] removes
//!   the file on drop; staged images cannot outlive their request.
//! - **Normalize best-effort** - Run ImageMagick (or whatever `command` is
//!   configured) over the staged file in place. Failures degrade to warnings,
//!   never errors.
//! - **Log everything** - Structured logs via tracing for debugging
//!   production issues.
//!
//! ## Typical flow
//!
//! ```rust,no_run
//! use ingest::{normalize, EncodedImage, NormalizerConfig, StagingConfig, StagingStore};
//!
//! # async fn demo(payload: &str) -> Result<(), ingest::StageError> {
//! let store = StagingStore::new(&StagingConfig::default());
//!
//! let parsed = EncodedImage::from_base64(payload)?;
//! let staged = store.stage(&parsed.bytes, parsed.extension)?;
//! let outcome = normalize(staged.path(), &NormalizerConfig::default()).await;
//! if let Some(warning) = outcome.warning() {
//!     tracing::warn!(path = %staged.path().display(), warning, "normalization degraded");
//! }
//! // ... decode from staged.path() ...
//! // File is removed here when `staged` drops.
//! # Ok(())
//! # }
//! ```
mod config;
mod encoded;
mod error;
mod normalize;
mod staging;

pub use crate::config::{
    ConfigError, DEFAULT_NORMALIZER_COMMAND, DEFAULT_NORMALIZER_TIMEOUT_MS, DEFAULT_STAGING_DIR,
    NormalizerConfig, StagingConfig,
};
pub use crate::encoded::{EncodedImage, ImageExt};
pub use crate::error::StageError;
pub use crate::normalize::{NormalizeOutcome, normalize};
pub use crate::staging::{StagedFile, StagingStore};
