//! Placement of a candidate relative to the canonical chain.

use crate::types::{Block, ChainHead, HexDigest};

use super::error::StorageError;
use super::store::ChainLedgerView;

/// Where a validated candidate falls relative to the current chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Placement {
    /// Candidate is the next block on the head (or a valid genesis).
    Extends,
    /// Identical block already accepted at this height.
    Duplicate,
    /// Different content already accepted at this height.
    ConflictsAtHeight { stored: HexDigest },
    /// Candidate leaves heights unfilled above the head.
    Gap { head: Option<u64> },
    /// Candidate is at the next height but does not build on the head.
    ParentMismatch { head: ChainHead },
    /// Genesis candidate whose parent is not the configured sentinel.
    GenesisParentMismatch { expected: HexDigest },
}

/// Abstraction over fork-choice rules.
///
/// Given the ledger and a candidate, a fork-choice implementation decides
/// whether the candidate may extend the canonical chain. It must be called
/// inside the admission critical section so the head it observes is the one
/// the commit builds on.
pub trait ForkChoice {
    fn place<V>(&self, view: &V, candidate: &Block) -> Result<Placement, StorageError>
    where
        V: ChainLedgerView + ?Sized;
}

/// Single-authority rule: the existing chain is authoritative.
///
/// - Any block already accepted at the candidate's height wins; identical
///   content is a duplicate, anything else is a fork. No side chains are
///   tracked.
/// - Otherwise only `head + 1` (or `0` on an empty ledger) is admissible,
///   and its parent must be the head hash (or the genesis sentinel).
#[derive(Clone, Debug)]
pub struct AuthoritativeChainRule {
    genesis_parent_hash: HexDigest,
}

impl AuthoritativeChainRule {
    pub fn new(genesis_parent_hash: HexDigest) -> Self {
        Self {
            genesis_parent_hash,
        }
    }

    pub fn genesis_parent_hash(&self) -> &HexDigest {
        &self.genesis_parent_hash
    }
}

impl Default for AuthoritativeChainRule {
    fn default() -> Self {
        Self::new(HexDigest::zero())
    }
}

impl ForkChoice for AuthoritativeChainRule {
    fn place<V>(&self, view: &V, candidate: &Block) -> Result<Placement, StorageError>
    where
        V: ChainLedgerView + ?Sized,
    {
        if let Some(stored) = view.hash_at(candidate.height)? {
            return Ok(if stored == candidate.hash {
                Placement::Duplicate
            } else {
                Placement::ConflictsAtHeight { stored }
            });
        }

        let head = view.head()?;
        let next_height = head.as_ref().map_or(0, |h| h.height + 1);

        if candidate.height > next_height {
            return Ok(Placement::Gap {
                head: head.map(|h| h.height),
            });
        }

        match head {
            None => {
                if candidate.parent_hash != self.genesis_parent_hash {
                    return Ok(Placement::GenesisParentMismatch {
                        expected: self.genesis_parent_hash.clone(),
                    });
                }
                Ok(Placement::Extends)
            }
            Some(head) => {
                if candidate.parent_hash != head.hash {
                    return Ok(Placement::ParentMismatch { head });
                }
                Ok(Placement::Extends)
            }
        }
    }
}
