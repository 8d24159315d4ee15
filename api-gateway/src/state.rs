//! Shared application state and transaction pool implementation.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};

use authority_chain::{
    Block, CandidateTransaction, ChainLedgerView, DefaultAdmissionEngine, MetricsRegistry, TxPool,
};

/// Capacity of the accepted-block broadcast channel.
pub const BLOCK_CHANNEL_CAPACITY: usize = 64;

/// Simple in-memory transaction pool backed by a FIFO queue.
///
/// HTTP handlers push transactions into the queue; the block producer
/// selects from the front and accepted blocks prune what they included.
#[derive(Default)]
pub struct QueuedTxPool {
    queue: VecDeque<CandidateTransaction>,
}

impl QueuedTxPool {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Enqueues a new transaction to be included in a future block.
    ///
    /// Returns `false` if a transaction with the same hash is already queued.
    pub fn push(&mut self, tx: CandidateTransaction) -> bool {
        if self.queue.iter().any(|queued| queued.tx_hash == tx.tx_hash) {
            return false;
        }
        self.queue.push_back(tx);
        true
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl TxPool for QueuedTxPool {
    fn select_for_block(&mut self, max_txs: usize) -> Vec<CandidateTransaction> {
        self.queue.iter().take(max_txs).cloned().collect()
    }

    fn remove_included(&mut self, tx_hashes: &[String]) {
        self.queue.retain(|tx| !tx_hashes.contains(&tx.tx_hash));
    }
}

/// Shared state held by the API and background tasks.
///
/// This is wrapped in an [`Arc`] and passed to request handlers via Axum's
/// `State` extractor.
pub struct AppState {
    /// Embedded admission engine (ledger + authority + hasher).
    pub engine: DefaultAdmissionEngine,
    /// Transaction pool feeding the proposer.
    pub tx_pool: Mutex<QueuedTxPool>,
    /// Proposer identity used by the block producer loop.
    pub proposer_id: String,
    /// Metrics registry shared between the engine and the API.
    pub metrics: Arc<MetricsRegistry>,
    /// Accepted blocks, for whoever gossips them to peers.
    pub blocks: broadcast::Sender<Block>,
}

impl AppState {
    pub fn new(
        engine: DefaultAdmissionEngine,
        proposer_id: String,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let (blocks, _) = broadcast::channel(BLOCK_CHANNEL_CAPACITY);
        Self {
            engine,
            tx_pool: Mutex::new(QueuedTxPool::new()),
            proposer_id,
            metrics,
            blocks,
        }
    }

    /// Post-accept duties the engine leaves to its caller: prune the pool
    /// and publish the block.
    pub async fn on_accepted(&self, height: u64, tx_hashes: &[String]) {
        self.tx_pool.lock().await.remove_included(tx_hashes);

        match self.engine.store().block_at(height) {
            Ok(Some(block)) => {
                if self.blocks.send(block).is_err() {
                    tracing::debug!(height, "no block subscribers");
                }
            }
            Ok(None) => tracing::warn!(height, "accepted block missing from ledger"),
            Err(e) => tracing::warn!(height, "failed to read accepted block: {e}"),
        }
    }
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
