//! In-memory ledger.
//!
//! This implementation is useful for unit tests, benchmarks, and small
//! devnets. Blocks are kept in a `BTreeMap` keyed by height, so the head is
//! always the last entry. A scoped write holds the ledger's write lock for
//! its whole lifetime and stages rows locally; nothing becomes visible
//! until [`ScopedWrite::commit`] succeeds.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::consensus::error::StorageError;
use crate::consensus::store::{ChainLedgerView, LedgerStore, ScopedWrite};
use crate::types::{Block, ChainHead, HexDigest, StoredReceipt, StoredTransaction};

#[derive(Default)]
struct LedgerState {
    blocks: BTreeMap<u64, Block>,
    transactions: BTreeMap<u64, Vec<StoredTransaction>>,
    receipts: BTreeMap<u64, Vec<StoredReceipt>>,
    tx_hashes: HashSet<String>,
    receipt_ids: HashSet<String>,
}

/// In-memory implementation of [`LedgerStore`].
#[derive(Default)]
pub struct InMemoryLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryLedger {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of blocks currently stored.
    pub fn len(&self) -> usize {
        self.state.read().blocks.len()
    }

    /// Returns `true` if no blocks are stored.
    pub fn is_empty(&self) -> bool {
        self.state.read().blocks.is_empty()
    }
}

impl ChainLedgerView for InMemoryLedger {
    fn head(&self) -> Result<Option<ChainHead>, StorageError> {
        let state = self.state.read();
        Ok(state.blocks.values().next_back().map(|b| ChainHead {
            height: b.height,
            hash: b.hash.clone(),
        }))
    }

    fn hash_at(&self, height: u64) -> Result<Option<HexDigest>, StorageError> {
        Ok(self.state.read().blocks.get(&height).map(|b| b.hash.clone()))
    }

    fn block_at(&self, height: u64) -> Result<Option<Block>, StorageError> {
        Ok(self.state.read().blocks.get(&height).cloned())
    }

    fn transactions_at(&self, height: u64) -> Result<Vec<StoredTransaction>, StorageError> {
        Ok(self
            .state
            .read()
            .transactions
            .get(&height)
            .cloned()
            .unwrap_or_default())
    }

    fn receipts_at(&self, height: u64) -> Result<Vec<StoredReceipt>, StorageError> {
        Ok(self
            .state
            .read()
            .receipts
            .get(&height)
            .cloned()
            .unwrap_or_default())
    }

    fn tx_exists(&self, tx_hash: &str) -> Result<bool, StorageError> {
        Ok(self.state.read().tx_hashes.contains(tx_hash))
    }
}

/// Write scope over an [`InMemoryLedger`].
pub struct InMemoryWrite<'a> {
    state: RwLockWriteGuard<'a, LedgerState>,
    block: Option<Block>,
    transactions: Vec<StoredTransaction>,
    receipts: Vec<StoredReceipt>,
}

impl InMemoryWrite<'_> {
    fn check_constraints(&self, block: &Block) -> Result<(), StorageError> {
        if self.state.blocks.contains_key(&block.height) {
            return Err(StorageError::Constraint(format!(
                "block at height {} already stored",
                block.height
            )));
        }
        let expected = self
            .state
            .blocks
            .keys()
            .next_back()
            .map_or(0, |h| h + 1);
        if block.height != expected {
            return Err(StorageError::Constraint(format!(
                "block height {} is not the next height {expected}",
                block.height
            )));
        }

        let mut batch_tx = HashSet::new();
        for tx in &self.transactions {
            if self.state.tx_hashes.contains(&tx.tx_hash) || !batch_tx.insert(&tx.tx_hash) {
                return Err(StorageError::Constraint(format!(
                    "duplicate transaction hash {}",
                    tx.tx_hash
                )));
            }
        }

        let mut batch_receipts = HashSet::new();
        for r in &self.receipts {
            if self.state.receipt_ids.contains(&r.receipt_id)
                || !batch_receipts.insert(&r.receipt_id)
            {
                return Err(StorageError::Constraint(format!(
                    "duplicate receipt id {}",
                    r.receipt_id
                )));
            }
        }

        Ok(())
    }
}

impl ScopedWrite for InMemoryWrite<'_> {
    fn insert_block(&mut self, block: &Block) -> Result<(), StorageError> {
        if self.block.is_some() {
            return Err(StorageError::Constraint(
                "write scope already holds a block".to_string(),
            ));
        }
        self.block = Some(block.clone());
        Ok(())
    }

    fn insert_transaction(&mut self, tx: StoredTransaction) -> Result<(), StorageError> {
        self.transactions.push(tx);
        Ok(())
    }

    fn insert_receipt(&mut self, receipt: StoredReceipt) -> Result<(), StorageError> {
        self.receipts.push(receipt);
        Ok(())
    }

    fn commit(mut self) -> Result<(), StorageError> {
        let block = self
            .block
            .take()
            .ok_or_else(|| StorageError::Constraint("write scope holds no block".to_string()))?;
        self.check_constraints(&block)?;

        let height = block.height;
        let transactions = std::mem::take(&mut self.transactions);
        let receipts = std::mem::take(&mut self.receipts);

        let state = &mut *self.state;
        state
            .tx_hashes
            .extend(transactions.iter().map(|tx| tx.tx_hash.clone()));
        state
            .receipt_ids
            .extend(receipts.iter().map(|r| r.receipt_id.clone()));
        state.transactions.insert(height, transactions);
        state.receipts.insert(height, receipts);
        state.blocks.insert(height, block);
        Ok(())
    }

    fn rollback(self) {
        // Staged rows are dropped with the handle.
    }
}

impl LedgerStore for InMemoryLedger {
    type Write<'a> = InMemoryWrite<'a>;

    fn begin_scoped_write(&self, timeout: Duration) -> Result<InMemoryWrite<'_>, StorageError> {
        let state = self
            .state
            .try_write_for(timeout)
            .ok_or(StorageError::Timeout(timeout))?;
        Ok(InMemoryWrite {
            state,
            block: None,
            transactions: Vec::new(),
            receipts: Vec::new(),
        })
    }
}
