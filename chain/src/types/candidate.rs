//! Unverified block proposals.
//!
//! A [`CandidateBlock`] is the loosely-populated input to admission: it
//! arrives from the RPC import endpoint, the gossip consumer or the local
//! proposer, and every header field is optional until the proposer
//! authority has checked it. [`CandidateBlock::required_fields`] turns the
//! optional header into borrowed, present values with one exhaustive match;
//! [`CandidateBlock::seal`] goes further and produces the fully-typed
//! [`SealedCandidate`] the classifier and commit path work with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::consensus::error::ValidationError;

use super::block::{StoredReceipt, StoredTransaction, parse_timestamp};
use super::{Block, HexDigest, ProposerId};

/// Transaction carried by a candidate and persisted with it on accept.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateTransaction {
    pub tx_hash: String,
    pub sender: String,
    pub recipient: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Compute-job receipt carried by a candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateReceipt {
    pub receipt_id: String,
    pub job_id: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub miner_signature: Option<String>,
    #[serde(default)]
    pub coordinator_attestations: Vec<String>,
    #[serde(default)]
    pub minted_amount: Option<u64>,
}

/// Untrusted block proposal, shaped like the RPC import body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateBlock {
    #[serde(default)]
    pub height: Option<u64>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub parent_hash: Option<String>,
    #[serde(default)]
    pub proposer: Option<String>,
    /// ISO-8601 timestamp as supplied by the proposer.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub transaction_count: Option<u32>,
    #[serde(default)]
    pub state_root: Option<String>,
    #[serde(default)]
    pub transactions: Vec<CandidateTransaction>,
    #[serde(default)]
    pub receipts: Vec<CandidateReceipt>,
}

/// Borrowed view of a candidate's required header fields.
#[derive(Clone, Copy, Debug)]
pub struct RequiredFields<'a> {
    pub height: u64,
    pub hash: &'a str,
    pub parent_hash: &'a str,
    pub proposer: &'a str,
    pub timestamp: &'a str,
}

impl CandidateBlock {
    /// Returns the required header fields, or the first one missing.
    ///
    /// Fields are checked in the order height, hash, parent_hash,
    /// proposer, timestamp. An absent proposer is reported as
    /// [`ValidationError::MissingProposer`] rather than a generic missing
    /// field; a blank one is reported the same way once every field is
    /// present.
    pub fn required_fields(&self) -> Result<RequiredFields<'_>, ValidationError> {
        match (
            self.height,
            self.hash.as_deref(),
            self.parent_hash.as_deref(),
            self.proposer.as_deref(),
            self.timestamp.as_deref(),
        ) {
            (None, ..) => Err(ValidationError::MissingField("height")),
            (_, None, ..) => Err(ValidationError::MissingField("hash")),
            (_, _, None, ..) => Err(ValidationError::MissingField("parent_hash")),
            (_, _, _, None, _) => Err(ValidationError::MissingProposer),
            (_, _, _, _, None) => Err(ValidationError::MissingField("timestamp")),
            (Some(_), Some(_), Some(_), Some(p), Some(_)) if p.trim().is_empty() => {
                Err(ValidationError::MissingProposer)
            }
            (Some(height), Some(hash), Some(parent_hash), Some(proposer), Some(timestamp)) => {
                Ok(RequiredFields {
                    height,
                    hash,
                    parent_hash,
                    proposer,
                    timestamp,
                })
            }
        }
    }

    /// Converts the candidate into its fully-typed form.
    ///
    /// Callers run the proposer authority and hash verification first; this
    /// step only fails on fields those checks do not cover (a malformed
    /// state root, an oversized batch). Digests must already be canonical,
    /// so the stored block carries exactly the bytes that were hashed.
    pub fn seal(self) -> Result<SealedCandidate, ValidationError> {
        let fields = self.required_fields()?;

        let hash = HexDigest::parse_canonical(fields.hash).map_err(ValidationError::from)?;
        let parent_hash = HexDigest::parse_canonical(fields.parent_hash)
            .map_err(|e| ValidationError::InvalidParentHash(e.to_string()))?;
        let timestamp = parse_timestamp(fields.timestamp)
            .map_err(|e| ValidationError::InvalidTimestamp(e.to_string()))?;
        let state_root = self
            .state_root
            .as_deref()
            .map(HexDigest::parse_canonical)
            .transpose()
            .map_err(|e| ValidationError::InvalidStateRoot(e.to_string()))?;

        let height = fields.height;
        let proposer = fields.proposer.to_string();
        let transaction_count = match self.transaction_count {
            Some(declared) => declared,
            None => transaction_count(self.transactions.len())?,
        };

        Ok(SealedCandidate {
            block: Block {
                height,
                hash,
                parent_hash,
                proposer,
                timestamp,
                transaction_count,
                state_root,
            },
            transactions: self.transactions,
            receipts: self.receipts,
        })
    }
}

/// Transaction count for a batch of `len` transactions, as carried in the
/// block header.
pub fn transaction_count(len: usize) -> Result<u32, ValidationError> {
    u32::try_from(len).map_err(|_| ValidationError::TooManyTransactions(len))
}

/// A candidate whose header has been validated and typed.
///
/// Holds the block that would be written on accept together with the rows
/// that must land in the same atomic commit.
#[derive(Clone, Debug, PartialEq)]
pub struct SealedCandidate {
    pub block: Block,
    pub transactions: Vec<CandidateTransaction>,
    pub receipts: Vec<CandidateReceipt>,
}

impl SealedCandidate {
    pub fn height(&self) -> u64 {
        self.block.height
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.block.timestamp
    }

    pub fn proposer(&self) -> &ProposerId {
        &self.block.proposer
    }

    /// Transaction rows keyed to this block.
    pub fn transaction_rows(&self) -> impl Iterator<Item = StoredTransaction> + '_ {
        self.transactions.iter().map(|tx| StoredTransaction {
            block_height: self.block.height,
            tx_hash: tx.tx_hash.clone(),
            sender: tx.sender.clone(),
            recipient: tx.recipient.clone(),
            payload: tx.payload.to_string(),
        })
    }

    /// Receipt rows keyed to this block.
    pub fn receipt_rows(&self) -> impl Iterator<Item = StoredReceipt> + '_ {
        self.receipts.iter().map(|r| StoredReceipt {
            block_height: self.block.height,
            receipt_id: r.receipt_id.clone(),
            job_id: r.job_id.clone(),
            payload: r.payload.to_string(),
            miner_signature: r.miner_signature.clone(),
            coordinator_attestations: r.coordinator_attestations.clone(),
            minted_amount: r.minted_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HASH_LEN;

    fn full_candidate() -> CandidateBlock {
        CandidateBlock {
            height: Some(1),
            hash: Some(HexDigest::from_bytes(&[1u8; HASH_LEN]).to_string()),
            parent_hash: Some(HexDigest::zero().to_string()),
            proposer: Some("node-a".to_string()),
            timestamp: Some("2024-05-01T12:00:00Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn required_fields_reports_first_missing_field() {
        let mut c = full_candidate();
        c.parent_hash = None;
        c.timestamp = None;
        assert_eq!(
            c.required_fields().unwrap_err(),
            ValidationError::MissingField("parent_hash")
        );
    }

    #[test]
    fn missing_proposer_is_reported_before_missing_timestamp() {
        let mut c = full_candidate();
        c.proposer = None;
        c.timestamp = None;
        assert_eq!(c.required_fields().unwrap_err(), ValidationError::MissingProposer);

        let mut c = full_candidate();
        c.timestamp = None;
        assert_eq!(
            c.required_fields().unwrap_err(),
            ValidationError::MissingField("timestamp")
        );
    }

    #[test]
    fn transaction_count_is_checked_not_truncated() {
        assert_eq!(transaction_count(3), Ok(3));
        assert_eq!(transaction_count(u32::MAX as usize), Ok(u32::MAX));

        #[cfg(target_pointer_width = "64")]
        {
            let too_many = u32::MAX as usize + 1;
            assert_eq!(
                transaction_count(too_many),
                Err(ValidationError::TooManyTransactions(too_many))
            );
        }
    }

    #[test]
    fn seal_keeps_digests_byte_identical() {
        let parent = HexDigest::from_bytes(&[0xcd; HASH_LEN]);
        let mut c = full_candidate();
        c.parent_hash = Some(format!("0x{}", parent.as_str()[2..].to_ascii_uppercase()));
        assert!(matches!(
            c.clone().seal().unwrap_err(),
            ValidationError::InvalidParentHash(_)
        ));

        c.parent_hash = Some(parent.to_string());
        let sealed = c.seal().unwrap();
        assert_eq!(sealed.block.parent_hash, parent);
    }

    #[test]
    fn missing_or_blank_proposer_is_reported_separately() {
        let mut c = full_candidate();
        c.proposer = None;
        assert_eq!(c.required_fields().unwrap_err(), ValidationError::MissingProposer);

        c.proposer = Some("   ".to_string());
        assert_eq!(c.required_fields().unwrap_err(), ValidationError::MissingProposer);
    }

    #[test]
    fn seal_defaults_transaction_count_to_batch_len() {
        let mut c = full_candidate();
        c.transactions = vec![CandidateTransaction {
            tx_hash: "tx-1".to_string(),
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            payload: serde_json::json!({"amount": 5}),
        }];

        let sealed = c.seal().expect("seal");
        assert_eq!(sealed.block.transaction_count, 1);

        let rows: Vec<_> = sealed.transaction_rows().collect();
        assert_eq!(rows[0].block_height, 1);
        assert_eq!(rows[0].payload, r#"{"amount":5}"#);
    }

    #[test]
    fn seal_rejects_malformed_parent_hash() {
        let mut c = full_candidate();
        c.parent_hash = Some("genesis".to_string());
        assert!(matches!(
            c.seal().unwrap_err(),
            ValidationError::InvalidParentHash(_)
        ));
    }

    #[test]
    fn import_body_deserializes_without_batches() {
        let json = r#"{
            "height": 0,
            "hash": "0xabc",
            "parent_hash": "0x00",
            "proposer": "node-a",
            "timestamp": "2024-05-01T12:00:00Z",
            "transaction_count": 0
        }"#;
        let c: CandidateBlock = serde_json::from_str(json).unwrap();
        assert!(c.transactions.is_empty());
        assert!(c.receipts.is_empty());
        assert_eq!(c.state_root, None);
    }
}
