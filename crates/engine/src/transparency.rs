//! Transparency sink: an injected capability that observes intermediate
//! artifacts of template extraction.
//!
//! The sink exists purely for diagnostic replay. It can decline individual
//! artifact keys up front via [`TransparencySink::accepts`], and a failing
//! [`TransparencySink::record`] call is logged and ignored; neither path can
//! influence the extracted template.

use std::fmt;
use std::sync::Mutex;

use thiserror::Error;

/// Artifact key for the raw grayscale pixel buffer.
pub const ARTIFACT_GRAYSCALE: &str = "grayscale";
/// Artifact key for the per-block orientation field (JSON).
pub const ARTIFACT_ORIENTATION: &str = "orientation-field";
/// Artifact key for the final template summary (JSON).
pub const ARTIFACT_TEMPLATE: &str = "template";

/// Error reported by a sink that accepted a key but failed to record it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transparency sink failed: {reason}")]
pub struct SinkError {
    /// Human-readable failure description supplied by the sink.
    pub reason: String,
}

impl SinkError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Receiver for named intermediate artifacts emitted during template
/// extraction.
///
/// Implementations must be thread-safe: extraction may run on a blocking
/// worker thread while the sink is shared across concurrent requests.
pub trait TransparencySink: Send + Sync {
    /// Whether this sink wants the artifact under `key`. Extraction skips
    /// serialization work for declined keys.
    fn accepts(&self, key: &str) -> bool;

    /// Record one artifact. Errors are logged by the caller and never
    /// propagate into the build result.
    fn record(&self, key: &str, media_type: &str, data: &[u8]) -> Result<(), SinkError>;
}

/// Sink that declines every artifact. The default for callers without
/// transparency requirements.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TransparencySink for NoopSink {
    fn accepts(&self, _key: &str) -> bool {
        false
    }

    fn record(&self, _key: &str, _media_type: &str, _data: &[u8]) -> Result<(), SinkError> {
        Ok(())
    }
}

/// One artifact captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub key: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// Sink that accepts everything and keeps the artifacts in memory, in
/// arrival order. Intended for diagnostics, demos, and tests.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ArtifactRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<ArtifactRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Keys recorded so far, in arrival order.
    pub fn keys(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .map(|record| record.key)
            .collect()
    }
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("records", &self.records().len())
            .finish()
    }
}

impl TransparencySink for MemorySink {
    fn accepts(&self, _key: &str) -> bool {
        true
    }

    fn record(&self, key: &str, media_type: &str, data: &[u8]) -> Result<(), SinkError> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(ArtifactRecord {
                key: key.to_string(),
                media_type: media_type.to_string(),
                data: data.to_vec(),
            });
        Ok(())
    }
}
