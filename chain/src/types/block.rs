// chain/src/types/block.rs

//! Accepted block types and the canonical timestamp encoding.
//!
//! A [`Block`] is only ever created by the admission engine's accept path
//! and is never mutated afterwards. The timestamp is held as a UTC
//! `DateTime` and always serialised through [`canonical_timestamp`], so
//! re-encoding a block (JSON on the wire, bincode in RocksDB) cannot drift
//! from the string that was hashed.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{HexDigest, ProposerId};

/// Renders a timestamp in the canonical form used for hashing:
/// RFC 3339, UTC, microsecond precision, `Z` suffix.
///
/// Example: `2024-05-01T12:00:00.000000Z`.
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parses an ISO-8601 timestamp.
///
/// Offsets are normalised to UTC. A timestamp without an offset
/// (`2024-05-01T12:00:00.5`) is read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}

mod canonical_ts {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::canonical_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

/// A block accepted into the canonical chain.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Zero-based height, strictly contiguous from genesis.
    pub height: u64,

    /// Canonical hash binding chain id, height, parent and timestamp.
    pub hash: HexDigest,

    /// Hash of the accepted block at `height - 1`, or the configured
    /// genesis sentinel at height 0.
    pub parent_hash: HexDigest,

    /// Identity credited with producing the block.
    pub proposer: ProposerId,

    #[serde(with = "canonical_ts")]
    pub timestamp: DateTime<Utc>,

    /// Declared transaction count, as supplied by the proposer.
    pub transaction_count: u32,

    /// Optional post-state commitment supplied by the proposer.
    pub state_root: Option<HexDigest>,
}

/// Tip of the canonical chain.
///
/// Always derived from the ledger view on demand; never cached across
/// admission calls.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChainHead {
    pub height: u64,
    pub hash: HexDigest,
}

/// Transaction row persisted alongside its block.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub block_height: u64,
    pub tx_hash: String,
    pub sender: String,
    pub recipient: String,
    /// Compact JSON text of the payload.
    pub payload: String,
}

/// Receipt row persisted alongside its block.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StoredReceipt {
    pub block_height: u64,
    pub receipt_id: String,
    pub job_id: String,
    /// Compact JSON text of the payload.
    pub payload: String,
    pub miner_signature: Option<String>,
    pub coordinator_attestations: Vec<String>,
    pub minted_amount: Option<u64>,
}
