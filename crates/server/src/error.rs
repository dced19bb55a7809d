use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use ridgeline::PipelineError;

pub type ServerResult<T> = Result<T, ServerError>;

/// Server error types
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Both probe_image and candidate_image are required")]
    MissingImages,

    #[error("{source}")]
    Pipeline {
        #[source]
        source: PipelineError,
        elapsed: Duration,
    },

    #[error("Not found")]
    NotFound,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ServerError::MissingImages => StatusCode::BAD_REQUEST,
            ServerError::Pipeline { source, .. } => {
                StatusCode::from_u16(source.http_status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn elapsed(&self) -> Duration {
        match self {
            ServerError::Pipeline { elapsed, .. } => *elapsed,
            _ => Duration::ZERO,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "score": 0.0,
            "elapsed": format!("{:?}", self.elapsed()),
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}
