//! Block proposal logic.
//!
//! The proposer assembles a candidate block on top of the current head,
//! given a view of the chain and a transaction pool. It produces an
//! ordinary [`CandidateBlock`] that goes through the same admission path as
//! blocks received from peers or the RPC import endpoint.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::types::{
    CandidateBlock, CandidateTransaction, ProposerId, canonical_timestamp, transaction_count,
};

use super::config::ConsensusConfig;
use super::error::ProposalError;
use super::fork_choice::AuthoritativeChainRule;
use super::hasher::CanonicalHasher;
use super::store::ChainLedgerView;

/// Abstract transaction pool interface.
///
/// Admission does not care how transactions are stored or gossiped; the
/// proposer only needs a batch for the next block, and callers remove
/// included transactions once a block is accepted.
pub trait TxPool {
    /// Selects up to `max_txs` transactions, in inclusion order.
    ///
    /// Selection must not remove transactions; a candidate can still be
    /// rejected.
    fn select_for_block(&mut self, max_txs: usize) -> Vec<CandidateTransaction>;

    /// Drops transactions that are now part of an accepted block.
    fn remove_included(&mut self, tx_hashes: &[String]);
}

/// Configurable block proposer.
///
/// Holds no chain state; the [`ChainLedgerView`] and [`TxPool`] are
/// provided at call time.
#[derive(Clone, Debug)]
pub struct Proposer {
    pub max_block_txs: usize,
    hasher: CanonicalHasher,
    genesis: AuthoritativeChainRule,
}

impl Proposer {
    /// Constructs a proposer from a [`ConsensusConfig`].
    pub fn from_config(cfg: &ConsensusConfig) -> Self {
        Self {
            max_block_txs: cfg.max_block_txs,
            hasher: CanonicalHasher::new(cfg.chain_id.clone()),
            genesis: AuthoritativeChainRule::new(cfg.genesis_parent_hash.clone()),
        }
    }

    /// Builds a candidate on top of the current head, or a genesis
    /// candidate on an empty ledger.
    ///
    /// Pool entries the ledger already holds are left out of the candidate
    /// and pruned from the pool, as are repeats within the batch. The block
    /// may therefore carry fewer than `max_block_txs` transactions.
    ///
    /// This does not perform validation or persistence; callers pass the
    /// result to the admission engine.
    pub fn build_candidate<V, P>(
        &self,
        view: &V,
        proposer: &ProposerId,
        tx_pool: &mut P,
        now: DateTime<Utc>,
    ) -> Result<CandidateBlock, ProposalError>
    where
        V: ChainLedgerView + ?Sized,
        P: TxPool + ?Sized,
    {
        let (height, parent_hash) = match view.head()? {
            Some(head) => (head.height + 1, head.hash),
            None => (0, self.genesis.genesis_parent_hash().clone()),
        };

        let selected = tx_pool.select_for_block(self.max_block_txs);
        let mut seen = HashSet::with_capacity(selected.len());
        let mut committed = Vec::new();
        let mut transactions = Vec::with_capacity(selected.len());
        for tx in selected {
            if view.tx_exists(&tx.tx_hash)? {
                committed.push(tx.tx_hash);
            } else if seen.insert(tx.tx_hash.clone()) {
                transactions.push(tx);
            }
        }
        if !committed.is_empty() {
            tracing::debug!(
                count = committed.len(),
                "pruning already committed transactions from pool"
            );
            tx_pool.remove_included(&committed);
        }

        let hash = self.hasher.hash_for(height, &parent_hash, &now);

        Ok(CandidateBlock {
            height: Some(height),
            hash: Some(hash.to_string()),
            parent_hash: Some(parent_hash.to_string()),
            proposer: Some(proposer.clone()),
            timestamp: Some(canonical_timestamp(&now)),
            transaction_count: Some(transaction_count(transactions.len())?),
            state_root: None,
            transactions,
            receipts: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryLedger;
    use chrono::TimeZone;

    #[derive(Default)]
    struct VecPool {
        txs: Vec<CandidateTransaction>,
    }

    impl TxPool for VecPool {
        fn select_for_block(&mut self, max_txs: usize) -> Vec<CandidateTransaction> {
            self.txs.iter().take(max_txs).cloned().collect()
        }

        fn remove_included(&mut self, tx_hashes: &[String]) {
            self.txs.retain(|tx| !tx_hashes.contains(&tx.tx_hash));
        }
    }

    fn tx(hash: &str) -> CandidateTransaction {
        CandidateTransaction {
            tx_hash: hash.to_string(),
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            payload: serde_json::Value::Null,
        }
    }

    #[test]
    fn proposer_from_config_copies_limits() {
        let cfg = ConsensusConfig {
            max_block_txs: 7,
            ..ConsensusConfig::default()
        };
        let p = Proposer::from_config(&cfg);
        assert_eq!(p.max_block_txs, 7);
    }

    #[test]
    fn genesis_candidate_verifies_against_same_chain_id() {
        let cfg = ConsensusConfig::default();
        let proposer = Proposer::from_config(&cfg);
        let store = InMemoryLedger::new();
        let mut pool = VecPool {
            txs: vec![tx("a"), tx("b"), tx("c")],
        };
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let candidate = proposer
            .build_candidate(&store, &"node-a".to_string(), &mut pool, now)
            .expect("build");

        assert_eq!(candidate.height, Some(0));
        assert_eq!(
            candidate.parent_hash.as_deref(),
            Some(cfg.genesis_parent_hash.as_str())
        );
        assert_eq!(candidate.transaction_count, Some(3));
        assert_eq!(pool.txs.len(), 3, "selection must not drain the pool");

        let hasher = CanonicalHasher::new(cfg.chain_id.clone());
        assert!(hasher.verify(&candidate).is_ok());
    }

    #[test]
    fn committed_and_repeated_transactions_are_left_out() {
        let cfg = ConsensusConfig::default();
        let proposer = Proposer::from_config(&cfg);
        let engine = crate::AdmissionEngine::new(
            cfg.clone(),
            InMemoryLedger::new(),
            crate::InMemoryCounters::new(),
        );
        let id = "node-a".to_string();

        // "a" is committed but this pool never hears about it.
        let mut pool = VecPool {
            txs: vec![tx("a")],
        };
        let (outcome, _) = engine.propose(&id, &mut pool, Utc::now()).unwrap();
        assert!(outcome.is_accepted());

        pool.txs = vec![tx("a"), tx("b"), tx("b")];
        let candidate = proposer
            .build_candidate(engine.store(), &id, &mut pool, Utc::now())
            .unwrap();

        let included: Vec<&str> = candidate
            .transactions
            .iter()
            .map(|t| t.tx_hash.as_str())
            .collect();
        assert_eq!(included, vec!["b"]);
        assert_eq!(candidate.transaction_count, Some(1));
        assert!(pool.txs.iter().all(|t| t.tx_hash != "a"));
        assert!(engine.admit(candidate).unwrap().is_accepted());
    }

    #[test]
    fn selection_respects_max_block_txs() {
        let cfg = ConsensusConfig {
            max_block_txs: 1,
            ..ConsensusConfig::default()
        };
        let proposer = Proposer::from_config(&cfg);
        let mut pool = VecPool {
            txs: vec![tx("a"), tx("b")],
        };
        let candidate = proposer
            .build_candidate(&InMemoryLedger::new(), &"node-a".to_string(), &mut pool, Utc::now())
            .unwrap();
        assert_eq!(candidate.transactions.len(), 1);

        pool.remove_included(&["a".to_string()]);
        assert_eq!(pool.txs.len(), 1);
    }
}
