// src/main.rs
//
// Minimal demo node that wires up the chain library:
//
// - in-memory or RocksDB-backed ledger (per config)
// - admission engine with proposer authority and canonical hashing
// - Prometheus metrics exporter on /metrics
// - Simple loop that proposes (currently empty) blocks at a fixed interval.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::EnvFilter;

use authority_chain::{
    AdmissionEngine, AdmissionOutcome, CandidateTransaction, ChainConfig, InMemoryLedger,
    LedgerStore, MetricsRegistry, StorageBackend, TxPool, run_prometheus_http_server,
};

const DEFAULT_LOG_FILTER: &str = "authority_chain=info,chain_node=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cfg = ChainConfig::from_env_or_default().context("failed to load chain config")?;

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(MetricsRegistry::new().context("failed to initialise metrics registry")?);

    if cfg.metrics.enabled {
        let exporter = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(exporter, addr).await {
                tracing::error!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{addr}/metrics");
    }

    // ---------------------------
    // Storage backend
    // ---------------------------

    match cfg.storage.backend {
        StorageBackend::Memory => run_node(&cfg, InMemoryLedger::new(), metrics).await,
        StorageBackend::RocksDb => open_rocksdb_and_run(&cfg, metrics).await,
    }
}

#[cfg(feature = "rocksdb")]
async fn open_rocksdb_and_run(cfg: &ChainConfig, metrics: Arc<MetricsRegistry>) -> anyhow::Result<()> {
    let store = authority_chain::RocksDbLedger::open(&cfg.storage)
        .with_context(|| format!("failed to open RocksDB ledger at {}", cfg.storage.path))?;
    run_node(cfg, store, metrics).await
}

#[cfg(not(feature = "rocksdb"))]
async fn open_rocksdb_and_run(
    _cfg: &ChainConfig,
    _metrics: Arc<MetricsRegistry>,
) -> anyhow::Result<()> {
    anyhow::bail!("storage backend \"rocksdb\" requires building with `--features rocksdb`")
}

/// Transaction pool that never has anything to include.
struct EmptyTxPool;

impl TxPool for EmptyTxPool {
    fn select_for_block(&mut self, _max_txs: usize) -> Vec<CandidateTransaction> {
        Vec::new()
    }

    fn remove_included(&mut self, _tx_hashes: &[String]) {}
}

async fn run_node<S: LedgerStore>(
    cfg: &ChainConfig,
    store: S,
    metrics: Arc<MetricsRegistry>,
) -> anyhow::Result<()> {
    let engine = AdmissionEngine::new(cfg.consensus.clone(), store, metrics.clone());

    // The demo node proposes under the first trusted id, or a fixed one in
    // trust-all mode.
    let proposer_id = cfg
        .consensus
        .trusted_proposers
        .first()
        .cloned()
        .unwrap_or_else(|| "node-local".to_string());

    let mut tx_pool = EmptyTxPool;
    let block_interval = Duration::from_secs(cfg.consensus.block_time_secs.max(1));

    tracing::info!(
        chain_id = %cfg.consensus.chain_id,
        proposer = %proposer_id,
        block_time_secs = block_interval.as_secs(),
        "starting node (empty TxPool)"
    );

    // ---------------------------
    // Main proposal loop
    // ---------------------------

    loop {
        let timer = metrics.admission.admission_seconds.start_timer();
        let result = engine.propose(&proposer_id, &mut tx_pool, Utc::now());
        timer.observe_duration();

        match result {
            Ok((AdmissionOutcome::Accepted { height, hash }, _)) => {
                tracing::info!(height, hash = %hash, "proposed block");
            }
            Ok((AdmissionOutcome::Rejected { kind, detail }, _)) => {
                tracing::warn!(kind = kind.as_str(), %detail, "own proposal rejected");
            }
            Err(e) => {
                tracing::warn!("failed to propose block: {e}");
            }
        }

        tokio::time::sleep(block_interval).await;
    }
}
