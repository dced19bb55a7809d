//! Ridgeline Server - HTTP API for fingerprint image comparison
//!
//! This crate exposes the comparison pipeline over HTTP:
//!
//! - `POST /match` - compare two base64-encoded fingerprint images
//! - `GET /health` - liveness probe with uptime
//!
//! The middleware stack provides request-ID tracking, structured request
//! logging, CORS, response compression, a request timeout, and a body-size
//! limit. Configuration layers defaults, an optional `server.toml`, and
//! `RIDGELINE`-prefixed environment variables.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
