//! Storage backends for the chain.
//!
//! This module provides concrete implementations of the
//! [`crate::consensus::store::LedgerStore`] trait, including:
//!
//! - an in-memory ledger ([`mem::InMemoryLedger`]) suitable for tests and
//!   devnets,
//! - a RocksDB-backed ledger (`rocksdb::RocksDbLedger`, behind the
//!   `rocksdb` cargo feature) for persistent nodes.

pub mod mem;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;

pub use mem::InMemoryLedger;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::RocksDbLedger;
