//! Storage abstraction used by the admission engine.
//!
//! The engine only ever reads the ledger through [`ChainLedgerView`] and
//! writes through a [`ScopedWrite`] handle obtained from
//! [`LedgerStore::begin_scoped_write`]. A handle either commits all of its
//! rows or none of them; dropping it without calling
//! [`ScopedWrite::commit`] must roll back.

use std::time::Duration;

use crate::types::{Block, ChainHead, HexDigest, StoredReceipt, StoredTransaction};

use super::error::StorageError;

/// Read-only accessor over the canonical chain.
pub trait ChainLedgerView {
    /// Current head, or `None` while the ledger is empty.
    fn head(&self) -> Result<Option<ChainHead>, StorageError>;

    /// Hash of the accepted block at `height`, if one exists.
    fn hash_at(&self, height: u64) -> Result<Option<HexDigest>, StorageError>;

    /// Full accepted block at `height`, if one exists.
    fn block_at(&self, height: u64) -> Result<Option<Block>, StorageError>;

    /// Transactions committed with the block at `height`, in insertion order.
    fn transactions_at(&self, height: u64) -> Result<Vec<StoredTransaction>, StorageError>;

    /// Receipts committed with the block at `height`, in insertion order.
    fn receipts_at(&self, height: u64) -> Result<Vec<StoredReceipt>, StorageError>;

    /// Returns `true` if a transaction with this hash is already committed.
    fn tx_exists(&self, tx_hash: &str) -> Result<bool, StorageError>;

    /// Returns `true` if a block has been accepted at `height`.
    fn exists_at(&self, height: u64) -> Result<bool, StorageError> {
        Ok(self.hash_at(height)?.is_some())
    }
}

/// All-or-nothing write scope.
pub trait ScopedWrite {
    fn insert_block(&mut self, block: &Block) -> Result<(), StorageError>;

    fn insert_transaction(&mut self, tx: StoredTransaction) -> Result<(), StorageError>;

    fn insert_receipt(&mut self, receipt: StoredReceipt) -> Result<(), StorageError>;

    /// Applies every staged row and advances the head, atomically.
    fn commit(self) -> Result<(), StorageError>;

    /// Discards every staged row.
    fn rollback(self);
}

/// Storage collaborator able to open scoped writes.
pub trait LedgerStore: ChainLedgerView {
    type Write<'a>: ScopedWrite
    where
        Self: 'a;

    /// Opens a write scope, waiting at most `timeout` for the backend.
    fn begin_scoped_write(&self, timeout: Duration) -> Result<Self::Write<'_>, StorageError>;
}
