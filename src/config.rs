//! YAML configuration file support for the ridgeline pipeline.
//!
//! This module lets all pipeline knobs (staging, normalizer, matcher,
//! threshold policy) be defined in a single YAML file and loaded at runtime.
//! The HTTP server layers its own file-plus-environment loading on top; this
//! is the shared shape both go through.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! # Ridgeline pipeline configuration
//! staging:
//!   dir: "temp"
//!
//! normalizer:
//!   command: "convert"
//!   timeout_ms: 10000
//!
//! matcher:
//!   workers: 4
//!
//! match_threshold: 0.5
//! compare_timeout_ms: 30000
//! ```

use std::fs;
use std::path::Path;

use engine::MatcherConfig;
use ingest::{NormalizerConfig, StagingConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when loading pipeline configuration files.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level configuration for the comparison pipeline.
///
/// Every field has a sensible default, so an empty YAML document (or a
/// missing file handled by the caller) yields a working development
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PipelineConfig {
    /// Staging store configuration.
    #[serde(default)]
    pub staging: StagingConfig,

    /// External normalizer configuration.
    #[serde(default)]
    pub normalizer: NormalizerConfig,

    /// Matcher worker budget.
    #[serde(default)]
    pub matcher: MatcherConfig,

    /// Scores strictly above this threshold count as a match.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Upper bound on the comparison stage, in milliseconds. On expiry the
    /// in-flight comparison is cancelled and the request fails as cancelled.
    #[serde(default = "default_compare_timeout_ms")]
    pub compare_timeout_ms: u64,
}

impl PipelineConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Delegates to each section's own `validate()` and checks the
    /// pipeline-level policy knobs.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        self.staging
            .validate()
            .map_err(|err| ConfigLoadError::Validation(err.to_string()))?;
        self.normalizer
            .validate()
            .map_err(|err| ConfigLoadError::Validation(err.to_string()))?;
        self.matcher
            .validate()
            .map_err(|err| ConfigLoadError::Validation(err.to_string()))?;

        if !self.match_threshold.is_finite() || self.match_threshold <= 0.0 {
            return Err(ConfigLoadError::Validation(
                "match_threshold must be finite and positive".to_string(),
            ));
        }
        if self.compare_timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "compare_timeout_ms must be >= 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging: StagingConfig::default(),
            normalizer: NormalizerConfig::default(),
            matcher: MatcherConfig::default(),
            match_threshold: default_match_threshold(),
            compare_timeout_ms: default_compare_timeout_ms(),
        }
    }
}

// Helper functions for serde defaults
fn default_match_threshold() -> f64 {
    0.5
}
fn default_compare_timeout_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_yaml() {
        let yaml = r#"
staging:
  dir: "/var/tmp/ridgeline"
normalizer:
  command: "gm"
  timeout_ms: 2000
matcher:
  workers: 2
match_threshold: 0.6
"#;

        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.staging.dir, std::path::PathBuf::from("/var/tmp/ridgeline"));
        assert_eq!(config.normalizer.command, "gm");
        assert_eq!(config.normalizer.timeout_ms, 2000);
        assert_eq!(config.matcher.workers, 2);
        assert_eq!(config.match_threshold, 0.6);
        assert_eq!(config.compare_timeout_ms, 30_000);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = PipelineConfig::from_yaml("{}").unwrap();
        assert_eq!(config.staging.dir, std::path::PathBuf::from("temp"));
        assert_eq!(config.normalizer.command, "convert");
        assert_eq!(config.match_threshold, 0.5);
        assert!(config.matcher.workers >= 1);
    }

    #[test]
    fn test_load_from_file() {
        let yaml = "match_threshold: 0.7\n";
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(yaml.as_bytes()).unwrap();

        let config = PipelineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.match_threshold, 0.7);
    }

    #[test]
    fn test_section_validation_is_delegated() {
        let yaml = r#"
matcher:
  workers: 0
"#;
        let result = PipelineConfig::from_yaml(yaml);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("worker budget must be at least 1")
        );
    }

    #[test]
    fn test_threshold_validation() {
        let result = PipelineConfig::from_yaml("match_threshold: 0.0");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("match_threshold"));

        let result = PipelineConfig::from_yaml("match_threshold: .nan");
        assert!(result.is_err());
    }

    #[test]
    fn test_timeout_validation() {
        let result = PipelineConfig::from_yaml("compare_timeout_ms: 0");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("compare_timeout_ms")
        );
    }
}
