use std::time::Duration;

use crate::types::{DigestError, RejectionKind};

/// Reason a candidate failed structural, identity or hash checks.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("missing proposer")]
    MissingProposer,
    #[error("invalid hash format: expected 0x-prefixed hex")]
    InvalidHashFormat,
    #[error("invalid hash length: expected 66 characters, got {0}")]
    InvalidHashLength(usize),
    #[error("untrusted proposer: {0}")]
    UntrustedProposer(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid block hash: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },
    #[error("invalid parent hash: {0}")]
    InvalidParentHash(String),
    #[error("invalid state root: {0}")]
    InvalidStateRoot(String),
    #[error("declared transaction count does not fit in u32: {0} transactions")]
    TooManyTransactions(usize),
    #[error("genesis parent hash {actual} does not match configured sentinel {expected}")]
    GenesisParentMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Protocol rejection this failure is reported as.
    pub fn rejection_kind(&self) -> RejectionKind {
        match self {
            ValidationError::UntrustedProposer(_) => RejectionKind::UntrustedProposer,
            _ => RejectionKind::InvalidSignatureOrFormat,
        }
    }
}

impl From<DigestError> for ValidationError {
    fn from(e: DigestError) -> Self {
        match e {
            DigestError::Format => ValidationError::InvalidHashFormat,
            DigestError::Length(len) => ValidationError::InvalidHashLength(len),
            DigestError::NotLowercase => ValidationError::InvalidHashFormat,
        }
    }
}

/// Failure reported by a storage collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("storage lock not acquired within {0:?}")]
    Timeout(Duration),
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[cfg(feature = "rocksdb")]
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

/// Failure while assembling a local proposal.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Failure of an admission call that is not a protocol rejection.
///
/// The candidate was not judged. Storage and lock failures are transient
/// and retrying the same call is safe.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("admission section not acquired within {0:?}")]
    LockTimeout(Duration),
    #[error("cannot build proposal: {0}")]
    Proposal(ValidationError),
}

impl From<ProposalError> for AdmissionError {
    fn from(e: ProposalError) -> Self {
        match e {
            ProposalError::Storage(e) => AdmissionError::Storage(e),
            ProposalError::Invalid(e) => AdmissionError::Proposal(e),
        }
    }
}
