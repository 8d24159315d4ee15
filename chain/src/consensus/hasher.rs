//! Canonical block hashing.
//!
//! The canonical hash binds a block to its position in the chain:
//!
//! ```text
//! "0x" || hex(SHA-256(chain_id "|" height "|" parent_hash "|" timestamp))
//! ```
//!
//! Every input is hashed exactly as received, so the stored block is
//! always re-verifiable from its own fields. For that to hold, verification
//! only accepts canonical renderings: the parent hash must be lowercase
//! hex and the timestamp must be exactly what [`canonical_timestamp`]
//! produces for that instant. Anything else is rejected up front with a
//! detail naming the field, not as a hash mismatch.

use sha2::{Digest, Sha256};

use crate::types::block::parse_timestamp;
use crate::types::{CandidateBlock, HASH_LEN, HexDigest, canonical_timestamp};

use super::error::ValidationError;
use super::validator::CandidateValidator;

const DELIMITER: &str = "|";

/// Produces and verifies canonical block hashes for one chain id.
#[derive(Clone, Debug)]
pub struct CanonicalHasher {
    chain_id: String,
}

impl CanonicalHasher {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Hashes the four binding fields, in order, joined by `|`.
    pub fn compute(chain_id: &str, height: u64, parent_hash: &str, timestamp: &str) -> HexDigest {
        let mut hasher = Sha256::new();
        hasher.update(chain_id.as_bytes());
        hasher.update(DELIMITER.as_bytes());
        hasher.update(height.to_string().as_bytes());
        hasher.update(DELIMITER.as_bytes());
        hasher.update(parent_hash.as_bytes());
        hasher.update(DELIMITER.as_bytes());
        hasher.update(timestamp.as_bytes());

        let mut digest = [0u8; HASH_LEN];
        digest.copy_from_slice(&hasher.finalize());
        HexDigest::from_bytes(&digest)
    }

    /// Hash for a block on this hasher's chain.
    pub fn hash_for(
        &self,
        height: u64,
        parent_hash: &HexDigest,
        timestamp: &chrono::DateTime<chrono::Utc>,
    ) -> HexDigest {
        Self::compute(
            &self.chain_id,
            height,
            parent_hash.as_str(),
            &canonical_timestamp(timestamp),
        )
    }

    /// Recomputes the candidate's hash and compares it to the claimed one.
    ///
    /// The comparison is byte-exact; a mismatch is always fatal.
    pub fn verify(&self, candidate: &CandidateBlock) -> Result<(), ValidationError> {
        let fields = candidate.required_fields()?;

        let parent = HexDigest::parse_canonical(fields.parent_hash)
            .map_err(|e| ValidationError::InvalidParentHash(format!("{}: {e}", fields.parent_hash)))?;
        let timestamp = canonical_timestamp_str(fields.timestamp)?;

        let expected = Self::compute(&self.chain_id, fields.height, parent.as_str(), timestamp);

        if expected.as_str() != fields.hash {
            return Err(ValidationError::HashMismatch {
                expected: expected.to_string(),
                actual: fields.hash.to_string(),
            });
        }

        Ok(())
    }
}

/// Returns `raw` if it is the canonical rendering of the instant it names.
fn canonical_timestamp_str(raw: &str) -> Result<&str, ValidationError> {
    let parsed = parse_timestamp(raw)
        .map_err(|e| ValidationError::InvalidTimestamp(format!("{raw}: {e}")))?;
    let canonical = canonical_timestamp(&parsed);
    if canonical != raw {
        return Err(ValidationError::InvalidTimestamp(format!(
            "{raw} is not canonical; expected {canonical}"
        )));
    }
    Ok(raw)
}

impl CandidateValidator for CanonicalHasher {
    fn validate(&self, candidate: &CandidateBlock) -> Result<(), ValidationError> {
        self.verify(candidate)
    }
}
