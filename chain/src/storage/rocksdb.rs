//! RocksDB-backed ledger.
//!
//! This implementation persists the chain in a RocksDB instance with
//! dedicated column families:
//!
//! - `"blocks"`:        big-endian height -> bincode block,
//! - `"transactions"`:  big-endian height -> bincode `Vec<StoredTransaction>`,
//! - `"receipts"`:      big-endian height -> bincode `Vec<StoredReceipt>`,
//! - `"tx_index"`:      tx hash -> big-endian height,
//! - `"receipt_index"`: receipt id -> big-endian height,
//! - `"meta"`:          the current head height under the key `"head"`.
//!
//! A scoped write stages rows in memory and commits them as a single
//! `WriteBatch`, so the block, its rows and the head pointer land
//! together or not at all.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::StorageConfig;
use crate::consensus::error::StorageError;
use crate::consensus::store::{ChainLedgerView, LedgerStore, ScopedWrite};
use crate::types::{Block, ChainHead, HexDigest, StoredReceipt, StoredTransaction};

const CF_BLOCKS: &str = "blocks";
const CF_TRANSACTIONS: &str = "transactions";
const CF_RECEIPTS: &str = "receipts";
const CF_TX_INDEX: &str = "tx_index";
const CF_RECEIPT_INDEX: &str = "receipt_index";
const CF_META: &str = "meta";
const HEAD_KEY: &[u8] = b"head";

/// RocksDB-backed implementation of [`LedgerStore`].
pub struct RocksDbLedger {
    db: DB,
    writer: Mutex<()>,
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    let (value, _): (T, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(value)
}

fn height_key(height: u64) -> [u8; 8] {
    height.to_be_bytes()
}

fn decode_height(bytes: &[u8]) -> Result<u64, StorageError> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::Serialization("height key length".to_string()))?;
    Ok(u64::from_be_bytes(arr))
}

impl RocksDbLedger {
    /// Opens (or creates) a RocksDB-backed ledger at the configured path.
    pub fn open(cfg: &StorageConfig) -> Result<Self, StorageError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = [
            CF_BLOCKS,
            CF_TRANSACTIONS,
            CF_RECEIPTS,
            CF_TX_INDEX,
            CF_RECEIPT_INDEX,
            CF_META,
        ]
        .into_iter()
        .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db,
            writer: Mutex::new(()),
        })
    }

    fn cf(&self, name: &'static str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::Unavailable(format!("missing column family {name}")))
    }

    fn load_head_height(&self) -> Result<Option<u64>, StorageError> {
        match self.db.get_cf(self.cf(CF_META)?, HEAD_KEY)? {
            None => Ok(None),
            Some(bytes) => decode_height(&bytes).map(Some),
        }
    }

    fn load_rows<T: DeserializeOwned>(
        &self,
        cf: &'static str,
        height: u64,
    ) -> Result<Vec<T>, StorageError> {
        match self.db.get_cf(self.cf(cf)?, height_key(height))? {
            None => Ok(Vec::new()),
            Some(bytes) => decode(&bytes),
        }
    }
}

impl ChainLedgerView for RocksDbLedger {
    fn head(&self) -> Result<Option<ChainHead>, StorageError> {
        let Some(height) = self.load_head_height()? else {
            return Ok(None);
        };
        let block = self.block_at(height)?.ok_or_else(|| {
            StorageError::Unavailable(format!("head points at missing block {height}"))
        })?;
        Ok(Some(ChainHead {
            height,
            hash: block.hash,
        }))
    }

    fn hash_at(&self, height: u64) -> Result<Option<HexDigest>, StorageError> {
        Ok(self.block_at(height)?.map(|b| b.hash))
    }

    fn block_at(&self, height: u64) -> Result<Option<Block>, StorageError> {
        match self.db.get_cf(self.cf(CF_BLOCKS)?, height_key(height))? {
            None => Ok(None),
            Some(bytes) => decode(&bytes).map(Some),
        }
    }

    fn transactions_at(&self, height: u64) -> Result<Vec<StoredTransaction>, StorageError> {
        self.load_rows(CF_TRANSACTIONS, height)
    }

    fn receipts_at(&self, height: u64) -> Result<Vec<StoredReceipt>, StorageError> {
        self.load_rows(CF_RECEIPTS, height)
    }

    fn tx_exists(&self, tx_hash: &str) -> Result<bool, StorageError> {
        Ok(self
            .db
            .get_cf(self.cf(CF_TX_INDEX)?, tx_hash.as_bytes())?
            .is_some())
    }
}

/// Write scope over a [`RocksDbLedger`].
pub struct RocksDbWrite<'a> {
    ledger: &'a RocksDbLedger,
    _writer: MutexGuard<'a, ()>,
    block: Option<Block>,
    transactions: Vec<StoredTransaction>,
    receipts: Vec<StoredReceipt>,
}

impl RocksDbWrite<'_> {
    fn check_constraints(&self, block: &Block) -> Result<(), StorageError> {
        let expected = self.ledger.load_head_height()?.map_or(0, |h| h + 1);
        if block.height != expected {
            return Err(StorageError::Constraint(format!(
                "block height {} is not the next height {expected}",
                block.height
            )));
        }

        let tx_index = self.ledger.cf(CF_TX_INDEX)?;
        let mut batch_tx = HashSet::new();
        for tx in &self.transactions {
            if !batch_tx.insert(tx.tx_hash.as_str())
                || self.ledger.db.get_cf(tx_index, tx.tx_hash.as_bytes())?.is_some()
            {
                return Err(StorageError::Constraint(format!(
                    "duplicate transaction hash {}",
                    tx.tx_hash
                )));
            }
        }

        let receipt_index = self.ledger.cf(CF_RECEIPT_INDEX)?;
        let mut batch_receipts = HashSet::new();
        for r in &self.receipts {
            if !batch_receipts.insert(r.receipt_id.as_str())
                || self
                    .ledger
                    .db
                    .get_cf(receipt_index, r.receipt_id.as_bytes())?
                    .is_some()
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

impl ScopedWrite for RocksDbWrite<'_> {
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

        let ledger = self.ledger;
        let key = height_key(block.height);
        let mut batch = WriteBatch::default();

        batch.put_cf(ledger.cf(CF_BLOCKS)?, key, encode(&block)?);
        batch.put_cf(ledger.cf(CF_TRANSACTIONS)?, key, encode(&self.transactions)?);
        batch.put_cf(ledger.cf(CF_RECEIPTS)?, key, encode(&self.receipts)?);

        let tx_index = ledger.cf(CF_TX_INDEX)?;
        for tx in &self.transactions {
            batch.put_cf(tx_index, tx.tx_hash.as_bytes(), key);
        }
        let receipt_index = ledger.cf(CF_RECEIPT_INDEX)?;
        for r in &self.receipts {
            batch.put_cf(receipt_index, r.receipt_id.as_bytes(), key);
        }
        batch.put_cf(ledger.cf(CF_META)?, HEAD_KEY, key);

        ledger.db.write(batch)?;
        Ok(())
    }

    fn rollback(self) {
        // Nothing reaches RocksDB before commit.
    }
}

impl LedgerStore for RocksDbLedger {
    type Write<'a> = RocksDbWrite<'a>;

    fn begin_scoped_write(&self, timeout: Duration) -> Result<RocksDbWrite<'_>, StorageError> {
        let writer = self
            .writer
            .try_lock_for(timeout)
            .ok_or(StorageError::Timeout(timeout))?;
        Ok(RocksDbWrite {
            ledger: self,
            _writer: writer,
            block: None,
            transactions: Vec::new(),
            receipts: Vec::new(),
        })
    }
}
