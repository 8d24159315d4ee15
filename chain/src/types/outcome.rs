//! Admission outcomes returned to callers.

use serde::{Deserialize, Serialize};

use super::HexDigest;

/// Why a candidate was not admitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// Identical block already accepted at this height.
    AlreadyExists,
    /// Competing content at a finalized height, or a parent that does not
    /// match the head.
    Fork,
    /// Candidate leaves heights unfilled above the head.
    Gap,
    /// Malformed header, bad hash or wrong genesis parent.
    InvalidSignatureOrFormat,
    /// Proposer is not in the configured trusted set.
    UntrustedProposer,
}

impl RejectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionKind::AlreadyExists => "already_exists",
            RejectionKind::Fork => "fork",
            RejectionKind::Gap => "gap",
            RejectionKind::InvalidSignatureOrFormat => "invalid_signature_or_format",
            RejectionKind::UntrustedProposer => "untrusted_proposer",
        }
    }
}

/// Result of a single admission call.
///
/// Rejections are ordinary values: they are expected, terminal for the
/// given candidate, and always carry a detail string naming the rule that
/// fired.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdmissionOutcome {
    Accepted { height: u64, hash: HexDigest },
    Rejected { kind: RejectionKind, detail: String },
}

impl AdmissionOutcome {
    pub fn rejected(kind: RejectionKind, detail: impl Into<String>) -> Self {
        AdmissionOutcome::Rejected {
            kind,
            detail: detail.into(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, AdmissionOutcome::Accepted { .. })
    }

    /// Returns the rejection kind, if any.
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        match self {
            AdmissionOutcome::Accepted { .. } => None,
            AdmissionOutcome::Rejected { kind, .. } => Some(*kind),
        }
    }
}
