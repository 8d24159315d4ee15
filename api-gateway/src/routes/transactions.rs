use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use authority_chain::{CandidateTransaction, ChainLedgerView};

use crate::state::SharedState;

/// Response body for `POST /transactions`.
#[derive(Debug, Serialize)]
pub struct SubmitTxResponse {
    pub status: &'static str,
    pub tx_hash: String,
    pub pending: usize,
}

/// `POST /transactions`
///
/// Queues a transaction into the local pool. The block producer loop will
/// include it in a later block; it leaves the pool once that block is
/// accepted. Hashes already queued or already in the ledger are refused
/// with `409`.
pub async fn submit_transaction(
    State(state): State<SharedState>,
    Json(tx): Json<CandidateTransaction>,
) -> Result<(StatusCode, Json<SubmitTxResponse>), (StatusCode, String)> {
    if tx.tx_hash.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "tx_hash must not be empty".to_string()));
    }

    let tx_hash = tx.tx_hash.clone();
    let committed = state
        .engine
        .store()
        .tx_exists(&tx_hash)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    if committed {
        return Err((
            StatusCode::CONFLICT,
            format!("transaction {tx_hash} already committed"),
        ));
    }

    let mut pool = state.tx_pool.lock().await;
    if !pool.push(tx) {
        return Err((
            StatusCode::CONFLICT,
            format!("transaction {tx_hash} already queued"),
        ));
    }

    tracing::debug!(tx_hash = %tx_hash, pending = pool.len(), "transaction queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitTxResponse {
            status: "queued",
            tx_hash,
            pending: pool.len(),
        }),
    ))
}
