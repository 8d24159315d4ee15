//! Proposer authority: structural and identity gatekeeping.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. required header fields are present,
//! 2. the proposer is present and non-blank,
//! 3. the hash is `0x` followed by hex digits,
//! 4. the hash is exactly 66 characters,
//! 5. the proposer is trusted, when a trusted set is configured.
//!
//! Hash *correctness* is not checked here; see
//! [`CanonicalHasher`](super::hasher::CanonicalHasher).

use std::collections::BTreeSet;

use parking_lot::RwLock;

use crate::types::{CandidateBlock, HEX_DIGEST_LEN, ProposerId};

use super::error::ValidationError;
use super::validator::CandidateValidator;

/// Validates candidate structure and proposer identity.
///
/// An empty trusted set means trust-all, which suits single-authority and
/// dev deployments. The set lives for the process and can be changed at
/// runtime.
#[derive(Debug, Default)]
pub struct ProposerAuthority {
    trusted: RwLock<BTreeSet<ProposerId>>,
}

impl ProposerAuthority {
    pub fn new<I, S>(trusted: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ProposerId>,
    {
        Self {
            trusted: RwLock::new(trusted.into_iter().map(Into::into).collect()),
        }
    }

    /// Adds a proposer to the trusted set. Returns `false` if it was
    /// already present.
    pub fn add_trusted(&self, id: impl Into<ProposerId>) -> bool {
        self.trusted.write().insert(id.into())
    }

    /// Removes a proposer from the trusted set. Returns `false` if it was
    /// not present. Removing the last entry switches back to trust-all.
    pub fn remove_trusted(&self, id: &str) -> bool {
        self.trusted.write().remove(id)
    }

    /// Snapshot of the trusted set, in sorted order.
    pub fn trusted_proposers(&self) -> Vec<ProposerId> {
        self.trusted.read().iter().cloned().collect()
    }

    pub fn is_trusted(&self, id: &str) -> bool {
        let trusted = self.trusted.read();
        trusted.is_empty() || trusted.contains(id)
    }

    pub fn validate(&self, candidate: &CandidateBlock) -> Result<(), ValidationError> {
        let fields = candidate.required_fields()?;

        let digits = fields
            .hash
            .strip_prefix("0x")
            .ok_or(ValidationError::InvalidHashFormat)?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidHashFormat);
        }

        if fields.hash.len() != HEX_DIGEST_LEN {
            return Err(ValidationError::InvalidHashLength(fields.hash.len()));
        }

        if !self.is_trusted(fields.proposer) {
            return Err(ValidationError::UntrustedProposer(
                fields.proposer.to_string(),
            ));
        }

        Ok(())
    }
}

impl CandidateValidator for ProposerAuthority {
    fn validate(&self, candidate: &CandidateBlock) -> Result<(), ValidationError> {
        ProposerAuthority::validate(self, candidate)
    }
}
