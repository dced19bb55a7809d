//! Ridgeline Server - HTTP API for fingerprint image comparison
//!
//! This binary serves the comparison pipeline over REST endpoints with
//! request logging, timeouts, and graceful shutdown.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so it can feed the config environment source
    dotenvy::dotenv().ok();

    let config = ServerConfig::load()?;

    server::start_server(config).await?;

    Ok(())
}
