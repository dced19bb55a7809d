use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use ridgeline::CancelToken;

use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;

/// Comparison request
///
/// Both fields are required; each may carry a bare base64 payload or a
/// `data:image/<kind>;base64,<payload>` URI.
#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    /// Probe image, base64-encoded
    #[serde(default)]
    pub image1: Option<String>,

    /// Candidate image, base64-encoded
    #[serde(default)]
    pub image2: Option<String>,
}

/// Comparison response
///
/// On success `error` carries the human-readable verdict; on failure the
/// same shape is reused with `score` 0 and the failure message in `error`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResponse {
    pub score: f64,
    pub elapsed: String,
    pub error: String,
}

/// Compare two fingerprint images
///
/// Runs the full pipeline on the submitted pair and reports the similarity
/// score together with the match verdict. A fresh cancellation token is
/// minted per request; dropping the connection cancels the comparison.
pub async fn match_images(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<MatchRequest>,
) -> ServerResult<Json<MatchResponse>> {
    let probe = request
        .image1
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let candidate = request
        .image2
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (Some(probe), Some(candidate)) = (probe, candidate) else {
        return Err(ServerError::MissingImages);
    };

    let started = Instant::now();
    let outcome = state
        .pipeline
        .compare_images(probe, candidate, CancelToken::new())
        .await
        .map_err(|source| ServerError::Pipeline {
            source,
            elapsed: started.elapsed(),
        })?;

    Ok(Json(MatchResponse {
        score: outcome.score,
        elapsed: format!("{:?}", outcome.elapsed),
        error: outcome.verdict,
    }))
}
