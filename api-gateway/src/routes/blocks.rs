//! Block import and chain read endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use authority_chain::{
    AdmissionOutcome, Block, CandidateBlock, ChainHead, ChainLedgerView, HexDigest, RejectionKind,
    StoredReceipt, StoredTransaction,
};

use crate::state::SharedState;

/// Response body for `POST /blocks/import`.
#[derive(Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportResponse {
    Imported {
        height: u64,
        hash: HexDigest,
    },
    /// Replay of an accepted block; reported as success.
    Exists {
        height: Option<u64>,
        hash: Option<String>,
        detail: String,
    },
    Rejected {
        kind: RejectionKind,
        detail: String,
    },
    /// Transient failure; the caller may retry.
    Error {
        detail: String,
    },
}

impl ImportResponse {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ImportResponse::Imported { .. } | ImportResponse::Exists { .. } => StatusCode::OK,
            ImportResponse::Rejected {
                kind: RejectionKind::Fork,
                ..
            } => StatusCode::CONFLICT,
            ImportResponse::Rejected { .. } => StatusCode::BAD_REQUEST,
            ImportResponse::Error { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `POST /blocks/import`
///
/// Runs the candidate through the admission engine on the blocking pool.
/// On acceptance the included transactions leave the local pool and the
/// block is published to subscribers.
pub async fn import_block(
    State(state): State<SharedState>,
    Json(candidate): Json<CandidateBlock>,
) -> (StatusCode, Json<ImportResponse>) {
    let height = candidate.height;
    let hash = candidate.hash.clone();
    let tx_hashes: Vec<String> = candidate
        .transactions
        .iter()
        .map(|tx| tx.tx_hash.clone())
        .collect();

    let engine_state = state.clone();
    let admitted = tokio::task::spawn_blocking(move || {
        let _timer = engine_state.metrics.admission.admission_seconds.start_timer();
        engine_state.engine.admit(candidate)
    })
    .await;

    let response = match admitted {
        Ok(Ok(AdmissionOutcome::Accepted { height, hash })) => {
            state.on_accepted(height, &tx_hashes).await;
            ImportResponse::Imported { height, hash }
        }
        Ok(Ok(AdmissionOutcome::Rejected {
            kind: RejectionKind::AlreadyExists,
            detail,
        })) => ImportResponse::Exists {
            height,
            hash,
            detail,
        },
        Ok(Ok(AdmissionOutcome::Rejected { kind, detail })) => {
            ImportResponse::Rejected { kind, detail }
        }
        Ok(Err(e)) => ImportResponse::Error {
            detail: e.to_string(),
        },
        Err(e) => {
            tracing::error!("admission task failed: {e}");
            ImportResponse::Error {
                detail: "admission task failed".to_string(),
            }
        }
    };

    (response.status_code(), Json(response))
}

/// Response body for `GET /chain/head`.
#[derive(Debug, Serialize)]
pub struct HeadResponse {
    pub head: Option<ChainHead>,
}

/// `GET /chain/head`
///
/// Status read outside the admission section; may be momentarily stale.
pub async fn chain_head(
    State(state): State<SharedState>,
) -> Result<Json<HeadResponse>, (StatusCode, String)> {
    let head = state.engine.head().map_err(internal)?;
    Ok(Json(HeadResponse { head }))
}

/// Response body for `GET /blocks/{height}`.
#[derive(Debug, Serialize)]
pub struct BlockResponse {
    pub block: Block,
    pub transactions: Vec<StoredTransaction>,
    pub receipts: Vec<StoredReceipt>,
}

/// `GET /blocks/{height}`
pub async fn get_block(
    State(state): State<SharedState>,
    Path(height): Path<u64>,
) -> Result<Json<BlockResponse>, (StatusCode, String)> {
    let store = state.engine.store();
    let block = store
        .block_at(height)
        .map_err(internal)?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no block at height {height}")))?;

    Ok(Json(BlockResponse {
        block,
        transactions: store.transactions_at(height).map_err(internal)?,
        receipts: store.receipts_at(height).map_err(internal)?,
    }))
}

fn internal(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
