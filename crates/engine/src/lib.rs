//! Biometric engine for ridgeline: the opaque capability boundary the
//! comparison pipeline orchestrates against.
//!
//! The engine exposes exactly three operations:
//!
//! 1. [`decode_gray`] — turn an opaque byte payload into a canonical
//!    grayscale image, probing JPEG, PNG, and GIF in a fixed priority order.
//! 2. [`build_template`] — derive an opaque, comparable [`Template`] from a
//!    canonical image, optionally emitting named transparency artifacts
//!    through a caller-supplied [`TransparencySink`].
//! 3. [`MatchRun::compare`] — score a candidate template against a prepared
//!    reference under a [`CancelToken`] and a configured worker budget.
//!
//! Everything in here is deterministic: the same bytes produce the same
//! template, and the same template pair produces the same score for every
//! worker count. Callers treat templates as opaque values; the block-grid
//! layout is an implementation detail that may change with
//! [`TEMPLATE_VERSION`].

pub mod error;
pub mod image;
pub mod matcher;
pub mod template;
pub mod transparency;

pub use error::{BuildError, DecodeError, MatchError};
pub use image::{CanonicalImage, decode_gray};
pub use matcher::{CancelToken, MatchRun, MatcherConfig, WorkerPool};
pub use template::{BLOCK_SIZE, TEMPLATE_VERSION, Template, TemplateCell, build_template};
pub use transparency::{
    ARTIFACT_GRAYSCALE, ARTIFACT_ORIENTATION, ARTIFACT_TEMPLATE, ArtifactRecord, MemorySink,
    NoopSink, SinkError, TransparencySink,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_then_build_never_yields_a_wrong_type() {
        // A payload either decodes and templates, or fails with a typed
        // error; there is no silent fallback path.
        let garbage = decode_gray(&[1, 2, 3, 4]);
        assert!(matches!(garbage, Err(DecodeError::UnsupportedFormat)));

        let flat = CanonicalImage::from_raw(64, 64, vec![9; 64 * 64]).unwrap();
        assert!(matches!(
            build_template(&flat, &NoopSink),
            Err(BuildError::NoRidgeStructure)
        ));
    }
}
