use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::SharedState;

/// Simple health-check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub chain_id: String,
    pub head_height: Option<u64>,
}

/// `GET /health`
///
/// Returns a basic JSON document indicating liveness. A ledger that cannot
/// be read reports `degraded` with a 503.
pub async fn health(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let chain_id = state.engine.config().chain_id.clone();
    match state.engine.head() {
        Ok(head) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok",
                chain_id,
                head_height: head.map(|h| h.height),
            }),
        ),
        Err(e) => {
            tracing::warn!("health check could not read head: {e}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    chain_id,
                    head_height: None,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{CHAIN_ID, state};

    #[tokio::test]
    async fn empty_ledger_is_healthy() {
        let (status, Json(body)) = health(State(state(&[]))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.chain_id, CHAIN_ID);
        assert_eq!(body.head_height, None);
    }
}
