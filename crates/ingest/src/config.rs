//! Configuration types for staging and normalization.
//!
//! This module defines [`StagingConfig`] and [`NormalizerConfig`], which
//! control where inbound images land on disk and how the external
//! normalization tool is invoked. Both types are cheap to clone and easy to
//! deserialize from external configuration formats such as JSON or TOML.
//!
//! # Quick Start
//!
//! ```rust
//! use ingest::{NormalizerConfig, StagingConfig};
//!
//! // Use defaults for development
//! let staging = StagingConfig::default();
//! let normalizer = NormalizerConfig::default();
//!
//! // Always validate at startup
//! staging.validate().expect("invalid staging configuration");
//! normalizer.validate().expect("invalid normalizer configuration");
//! ```
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default staging directory, relative to the process working directory.
pub const DEFAULT_STAGING_DIR: &str = "temp";

/// Default normalization command (the ImageMagick CLI).
pub const DEFAULT_NORMALIZER_COMMAND: &str = "convert";

/// Default upper bound on a single normalization run, in milliseconds.
pub const DEFAULT_NORMALIZER_TIMEOUT_MS: u64 = 10_000;

/// Controls where staged images are written.
///
/// # Examples
///
/// ```rust
/// use ingest::StagingConfig;
///
/// let config = StagingConfig {
///     dir: "/var/tmp/ridgeline".into(),
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StagingConfig {
    /// Directory staged images are written into.
    ///
    /// Created on demand with `create_dir_all`, so it does not need to exist
    /// at startup. All concurrent requests share this directory; filenames
    /// carry a timestamp plus a process-wide counter, so collisions cannot
    /// occur without locking.
    ///
    /// Default: `"temp"`
    #[serde(default = "default_staging_dir")]
    pub dir: PathBuf,
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STAGING_DIR)
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            dir: default_staging_dir(),
        }
    }
}

impl StagingConfig {
    /// Validates internal consistency of this configuration.
    ///
    /// Intended to run at process start-up, before live traffic.
    ///
    /// # Validation Rules
    ///
    /// 1. `dir` must not be empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStagingDir);
        }
        Ok(())
    }
}

/// Controls how the external normalization tool is invoked.
///
/// The normalizer is best-effort: every failure mode (missing binary,
/// non-zero exit, timeout) degrades to a warning rather than failing the
/// request, so pointing `command` at something that does not exist is safe,
/// if noisy.
///
/// # Examples
///
/// ```rust
/// use ingest::NormalizerConfig;
///
/// // Swap ImageMagick for GraphicsMagick
/// let config = NormalizerConfig {
///     command: "gm".to_string(),
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizerConfig {
    /// Executable invoked with the staged path as both input and output.
    ///
    /// The command is resolved through `PATH` the same way a shell would.
    ///
    /// Default: `"convert"`
    #[serde(default = "default_normalizer_command")]
    pub command: String,

    /// Upper bound on a single normalization run, in milliseconds.
    ///
    /// On timeout the child process is killed and the run degrades to a
    /// warning.
    ///
    /// Default: `10_000`
    #[serde(default = "default_normalizer_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_normalizer_command() -> String {
    DEFAULT_NORMALIZER_COMMAND.to_string()
}

fn default_normalizer_timeout_ms() -> u64 {
    DEFAULT_NORMALIZER_TIMEOUT_MS
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            command: default_normalizer_command(),
            timeout_ms: default_normalizer_timeout_ms(),
        }
    }
}

impl NormalizerConfig {
    /// Validates internal consistency of this configuration.
    ///
    /// # Validation Rules
    ///
    /// 1. `command` must not be empty or whitespace
    /// 2. `timeout_ms` must be at least 1
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand);
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Errors that can occur when validating ingest configuration.
///
/// These are configuration-time issues, surfaced during service start-up
/// rather than at request time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The staging directory path is empty.
    #[error("staging dir must not be empty")]
    EmptyStagingDir,

    /// The normalizer command is empty or whitespace.
    #[error("normalizer command must not be empty")]
    EmptyCommand,

    /// The normalizer timeout is zero, which would kill every run instantly.
    #[error("normalizer timeout_ms must be at least 1")]
    ZeroTimeout,
}
