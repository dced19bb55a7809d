use std::sync::Arc;

use ridgeline::Pipeline;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Comparison pipeline (worker pool built once, shared across requests)
    pub pipeline: Arc<Pipeline>,
}

impl ServerState {
    /// Create new server state
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let pipeline = Pipeline::new(config.pipeline.clone())
            .map_err(|err| ServerError::Internal(err.to_string()))?;

        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
        })
    }
}
