use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ridgeline::PipelineConfig;

/// Server configuration
///
/// Loaded from an optional `server.toml` file, then overridden by
/// environment variables with the `RIDGELINE` prefix and `__` separator
/// (for example `RIDGELINE__PORT=9000` or
/// `RIDGELINE__PIPELINE__MATCH_THRESHOLD=0.6`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum request body size in MB
    #[serde(default = "default_max_body_size_mb")]
    pub max_body_size_mb: usize,

    /// Enable permissive CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Emit logs as JSON
    #[serde(default)]
    pub json_logs: bool,

    /// Log level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Comparison pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout_secs(),
            max_body_size_mb: default_max_body_size_mb(),
            enable_cors: default_true(),
            json_logs: false,
            log_level: default_log_level(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the config file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            // Load from file if it exists
            .add_source(config::File::with_name("server").required(false))
            // Override with environment variables
            .add_source(config::Environment::with_prefix("RIDGELINE").separator("__"));

        let config: ServerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Validate everything before the listener binds
    pub fn validate(&self) -> anyhow::Result<()> {
        self.socket_addr()?;
        self.pipeline.validate()?;
        Ok(())
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        Ok(addr_str.parse()?)
    }

    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get max body size in bytes
    pub fn max_body_size(&self) -> usize {
        self.max_body_size_mb * 1024 * 1024
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_body_size_mb() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.max_body_size_mb, 10);
        assert!(cfg.enable_cors);
        assert!(!cfg.json_logs);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = ServerConfig::default();
        let addr = cfg.socket_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn partial_sources_fall_back_to_defaults() {
        let cfg: ServerConfig = serde_json::from_str(
            r#"{"port": 9000, "pipeline": {"match_threshold": 0.7}}"#,
        )
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.pipeline.match_threshold, 0.7);
        assert_eq!(cfg.pipeline.compare_timeout_ms, 30_000);
    }

    #[test]
    fn unparseable_host_fails_validation() {
        let cfg = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
