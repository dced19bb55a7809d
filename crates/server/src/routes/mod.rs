//! API route handlers
//!
//! - `health`: liveness probe with uptime
//! - `matching`: fingerprint image comparison

pub mod health;
pub mod matching;

use crate::error::ServerError;

/// 404 Not Found handler
///
/// Returns the standard error body for undefined routes.
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
