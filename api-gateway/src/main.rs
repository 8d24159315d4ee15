// api-gateway/src/main.rs

//! API gateway binary.
//!
//! This binary exposes a small HTTP API on top of the `authority-chain`
//! crate:
//!
//! - `GET /health`
//! - `GET /chain/head`
//! - `GET /blocks/{height}`
//! - `POST /blocks/import`
//! - `POST /transactions`
//!
//! It embeds a `DefaultAdmissionEngine` (in-memory ledger), a simple queued
//! transaction pool, a background block producer loop, and a Prometheus
//! metrics exporter on `/metrics`.

mod config;
mod routes;
mod state;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use chrono::Utc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use authority_chain::{
    AdmissionEngine, AdmissionOutcome, ChainConfig, InMemoryLedger, MetricsRegistry,
    StorageBackend, run_prometheus_http_server,
};
use config::ApiConfig;
use routes::{blocks, health, transactions};
use state::{AppState, SharedState};

const DEFAULT_LOG_FILTER: &str = "api_gateway=info,authority_chain=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    run().await
}

async fn run() -> anyhow::Result<()> {
    let api_cfg = ApiConfig::from_env()?;
    let chain_cfg = ChainConfig::from_env_or_default().context("failed to load chain config")?;

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics =
        Arc::new(MetricsRegistry::new().context("failed to initialise metrics registry")?);

    if chain_cfg.metrics.enabled {
        let exporter = metrics.clone();
        let addr = chain_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(exporter, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Storage + admission engine
    // ---------------------------

    if chain_cfg.storage.backend != StorageBackend::Memory {
        anyhow::bail!("the API gateway only runs on the in-memory ledger");
    }

    let engine = AdmissionEngine::new(
        chain_cfg.consensus.clone(),
        InMemoryLedger::new(),
        metrics.clone(),
    );

    let app_state: SharedState = Arc::new(AppState::new(
        engine,
        api_cfg.proposer_id.clone(),
        metrics.clone(),
    ));

    // ---------------------------
    // Gossip stand-in
    // ---------------------------

    let mut accepted = app_state.blocks.subscribe();
    tokio::spawn(async move {
        while let Ok(block) = accepted.recv().await {
            tracing::debug!(height = block.height, hash = %block.hash, "publishing block to peers");
        }
    });

    // ---------------------------
    // Block producer loop
    // ---------------------------

    if api_cfg.produce_blocks {
        let block_interval_secs = chain_cfg.consensus.block_time_secs;
        let producer_state = app_state.clone();
        tokio::spawn(async move {
            run_block_producer(producer_state, block_interval_secs).await;
        });
    }

    // ---------------------------
    // HTTP router
    // ---------------------------

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/chain/head", get(blocks::chain_head))
        .route("/blocks/import", post(blocks::import_block))
        .route("/blocks/{height}", get(blocks::get_block))
        .route("/transactions", post(transactions::submit_transaction))
        .with_state(app_state);

    // ---------------------------
    // axum 0.8 server (hyper 1 / tokio 1.48 style)
    // ---------------------------

    tracing::info!("API gateway listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    Ok(())
}

/// Background block producer loop.
///
/// Periodically asks the admission engine to propose a block on the
/// current head from the queued transaction pool. Proposals go through the
/// same admission path as imported blocks.
async fn run_block_producer(state: SharedState, interval_secs: u64) {
    let interval = std::time::Duration::from_secs(interval_secs.max(1));
    tracing::info!(
        "block producer running with interval {}s",
        interval.as_secs()
    );

    loop {
        let task_state = state.clone();
        let proposed = tokio::task::spawn_blocking(move || {
            let _timer = task_state.metrics.admission.admission_seconds.start_timer();
            let mut pool = task_state.tx_pool.blocking_lock();
            task_state
                .engine
                .propose(&task_state.proposer_id, &mut *pool, Utc::now())
        })
        .await;

        match proposed {
            Ok(Ok((AdmissionOutcome::Accepted { height, hash }, candidate))) => {
                let tx_hashes: Vec<String> = candidate
                    .transactions
                    .iter()
                    .map(|tx| tx.tx_hash.clone())
                    .collect();
                state.on_accepted(height, &tx_hashes).await;
                tracing::info!(height, hash = %hash, txs = tx_hashes.len(), "proposed block");
            }
            Ok(Ok((AdmissionOutcome::Rejected { kind, detail }, _))) => {
                tracing::warn!(kind = kind.as_str(), %detail, "own proposal rejected");
            }
            Ok(Err(e)) => {
                tracing::warn!("failed to propose block: {e}");
            }
            Err(e) => {
                tracing::error!("block producer task failed: {e}");
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
    }
    tracing::info!("shutdown signal received");
}
