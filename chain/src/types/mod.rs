//! Core domain types used by the chain
//!
//! This module defines the strongly-typed digest, block, candidate and
//! outcome types shared across the admission engine, the storage
//! backends and the RPC surface. The goal is to avoid "naked" strings in
//! public APIs where a value carries a protocol invariant (for example,
//! a block hash is always `0x` + 64 lowercase hex characters).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod block;
pub mod candidate;
pub mod outcome;

pub use block::{Block, ChainHead, StoredReceipt, StoredTransaction, canonical_timestamp};
pub use candidate::{
    CandidateBlock, CandidateReceipt, CandidateTransaction, RequiredFields, SealedCandidate,
    transaction_count,
};
pub use outcome::{AdmissionOutcome, RejectionKind};

/// Length in bytes of the SHA-256 digests used for block hashes.
pub const HASH_LEN: usize = 32;

/// Length in characters of a hex-encoded digest including the `0x` prefix.
pub const HEX_DIGEST_LEN: usize = 2 + HASH_LEN * 2;

/// Opaque proposer identity. Authority is granted by configuration, so
/// the core never interprets the contents.
pub type ProposerId = String;

/// Hex-encoded 32-byte digest: `0x` followed by 64 lowercase hex chars.
///
/// Construction goes through [`HexDigest::parse`] or
/// [`HexDigest::from_bytes`], so a value of this type always satisfies the
/// format invariant.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct HexDigest(String);

/// Reasons a string is not a valid [`HexDigest`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum DigestError {
    #[error("digest must be 0x-prefixed hex")]
    Format,
    #[error("digest must be {HEX_DIGEST_LEN} characters, got {0}")]
    Length(usize),
    #[error("digest must use lowercase hex digits")]
    NotLowercase,
}

impl HexDigest {
    /// Wraps raw digest bytes.
    pub fn from_bytes(bytes: &[u8; HASH_LEN]) -> Self {
        HexDigest(format!("0x{}", hex::encode(bytes)))
    }

    /// All-zero digest, the default genesis parent sentinel.
    pub fn zero() -> Self {
        Self::from_bytes(&[0u8; HASH_LEN])
    }

    /// Parses a `0x`-prefixed hex digest, normalising hex digits to
    /// lowercase.
    ///
    /// The format check runs before the length check, mirroring the order
    /// the proposer authority reports them in.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        let digits = s.strip_prefix("0x").ok_or(DigestError::Format)?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::Format);
        }
        if s.len() != HEX_DIGEST_LEN {
            return Err(DigestError::Length(s.len()));
        }
        Ok(HexDigest(s.to_ascii_lowercase()))
    }

    /// Like [`HexDigest::parse`], but only accepts the canonical lowercase
    /// rendering, so the parsed value is byte-identical to the input.
    ///
    /// Anything that is hashed or compared on the wire goes through here.
    pub fn parse_canonical(s: &str) -> Result<Self, DigestError> {
        let digest = Self::parse(s)?;
        if digest.0 != s {
            return Err(DigestError::NotLowercase);
        }
        Ok(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for HexDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for HexDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        HexDigest::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_and_lowercases_valid_digest() {
        let upper = format!("0x{}", "AB".repeat(HASH_LEN));
        let d = HexDigest::parse(&upper).expect("valid digest");
        assert_eq!(d.as_str(), format!("0x{}", "ab".repeat(HASH_LEN)));
        assert_eq!(d.as_str().len(), HEX_DIGEST_LEN);
    }

    #[test]
    fn parse_reports_format_before_length() {
        assert_eq!(HexDigest::parse("abc"), Err(DigestError::Format));
        assert_eq!(HexDigest::parse("0x"), Err(DigestError::Format));
        assert_eq!(HexDigest::parse("0xzz"), Err(DigestError::Format));
        assert_eq!(HexDigest::parse("0xabcd"), Err(DigestError::Length(6)));
    }

    #[test]
    fn parse_canonical_rejects_upper_case() {
        let upper = format!("0x{}", "AB".repeat(HASH_LEN));
        assert_eq!(
            HexDigest::parse_canonical(&upper),
            Err(DigestError::NotLowercase)
        );
        let lower = upper.to_ascii_lowercase();
        assert_eq!(
            HexDigest::parse_canonical(&lower).unwrap().as_str(),
            lower.as_str()
        );
        assert_eq!(HexDigest::parse_canonical("0x12"), Err(DigestError::Length(4)));
    }

    #[test]
    fn zero_digest_is_well_formed() {
        let zero = HexDigest::zero();
        assert_eq!(HexDigest::parse(zero.as_str()), Ok(zero.clone()));
        assert!(zero.as_str()[2..].chars().all(|c| c == '0'));
    }

    #[test]
    fn serde_rejects_malformed_digest() {
        let err = serde_json::from_str::<HexDigest>("\"0x1234\"");
        assert!(err.is_err());

        let ok: HexDigest = serde_json::from_str(&format!("\"{}\"", HexDigest::zero())).unwrap();
        assert_eq!(ok, HexDigest::zero());
    }
}
