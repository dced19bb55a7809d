//! Error types for the biometric engine.
//!
//! Each stage of the engine has its own error enum so callers can tell a
//! user-correctable decode problem apart from a quality-gate failure or a
//! cancelled comparison without string matching.

use thiserror::Error;

/// Errors produced while decoding an opaque byte payload into a
/// [`crate::CanonicalImage`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// No codec in the fixed priority order accepted the payload. The
    /// message deliberately names the condition rather than any
    /// codec-internal diagnostic.
    #[error("unsupported image format")]
    UnsupportedFormat,
}

/// Errors produced while deriving a [`crate::Template`] from a canonical
/// image. These are quality-gate failures, not I/O failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuildError {
    /// The image is smaller than the minimum block grid the extractor needs.
    #[error("image {width}x{height} is too small for template extraction (minimum {min}x{min})")]
    ImageTooSmall { width: u32, height: u32, min: u32 },

    /// The image carries no gradient energy at all (flat or zero-variance),
    /// so no ridge structure can be derived.
    #[error("image has no measurable ridge structure")]
    NoRidgeStructure,
}

/// Errors produced while initializing or executing a match run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MatchError {
    /// The reference template carries no cells; nothing can be compared
    /// against it.
    #[error("reference template contains no cells")]
    EmptyReference,

    /// The configured worker budget is unusable.
    #[error("worker budget must be at least 1 (got {workers})")]
    WorkerBudget { workers: usize },

    /// The worker pool backing parallel comparison could not be built.
    #[error("failed to build worker pool: {reason}")]
    WorkerPool { reason: String },

    /// The supplied cancellation token fired before the comparison finished.
    #[error("comparison cancelled before completion")]
    Cancelled,
}
