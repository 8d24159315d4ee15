//! Block admission engine.
//!
//! The admission engine wires together:
//!
//! - a [`ProposerAuthority`] for structural and identity checks,
//! - a [`CanonicalHasher`] for hash verification,
//! - an [`AuthoritativeChainRule`] to place the candidate against the ledger,
//! - a [`LedgerStore`] for persistence, and
//! - a [`MetricsSink`] for outcome counters.
//!
//! Every candidate, whether proposed locally, received by gossip or
//! submitted over RPC, goes through [`AdmissionEngine::admit`]. The engine
//! holds no chain state of its own; the ledger is the only source of truth.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::metrics::{AdmissionCounter, MetricsSink};
use crate::types::{
    AdmissionOutcome, CandidateBlock, ChainHead, ProposerId, RejectionKind, SealedCandidate,
};

use super::authority::ProposerAuthority;
use super::config::ConsensusConfig;
use super::error::{AdmissionError, StorageError, ValidationError};
use super::fork_choice::{AuthoritativeChainRule, ForkChoice, Placement};
use super::hasher::CanonicalHasher;
use super::proposer::{Proposer, TxPool};
use super::store::{LedgerStore, ScopedWrite};
use super::validator::{CandidateValidator, CombinedValidator};

const DETAIL_DUPLICATE: &str = "block already exists";
const DETAIL_FORK_AT_HEIGHT: &str =
    "candidate height is not longer than the current chain; current chain wins";
const DETAIL_GAP: &str = "gap detected between submitted height and current chain head";
const DETAIL_PARENT_MISMATCH: &str = "parent hash does not match current head";

/// Admission engine for one chain id.
///
/// Generic over:
///
/// - `S`: ledger backend implementing [`LedgerStore`],
/// - `M`: counter sink implementing [`MetricsSink`].
///
/// `admit` takes `&self`, so one engine can be shared behind an `Arc` by
/// the proposer loop and every inbound handler. The read-head, classify
/// and commit steps run under a single mutex.
pub struct AdmissionEngine<S, M> {
    config: ConsensusConfig,
    authority: ProposerAuthority,
    hasher: CanonicalHasher,
    fork_choice: AuthoritativeChainRule,
    proposer: Proposer,
    store: S,
    metrics: M,
    admission: Mutex<()>,
}

impl<S, M> AdmissionEngine<S, M>
where
    S: LedgerStore,
    M: MetricsSink,
{
    /// Creates a new admission engine.
    pub fn new(config: ConsensusConfig, store: S, metrics: M) -> Self {
        let authority = ProposerAuthority::new(config.trusted_proposers.iter().cloned());
        let hasher = CanonicalHasher::new(config.chain_id.clone());
        let fork_choice = AuthoritativeChainRule::new(config.genesis_parent_hash.clone());
        let proposer = Proposer::from_config(&config);
        Self {
            config,
            authority,
            hasher,
            fork_choice,
            proposer,
            store,
            metrics,
            admission: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    /// Returns a reference to the underlying ledger.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// The trusted-proposer set; mutations apply to subsequent calls.
    pub fn authority(&self) -> &ProposerAuthority {
        &self.authority
    }

    pub fn hasher(&self) -> &CanonicalHasher {
        &self.hasher
    }

    /// Current head, read outside the admission section.
    ///
    /// May be stale by the time the caller uses it.
    pub fn head(&self) -> Result<Option<ChainHead>, StorageError> {
        self.store.head()
    }

    /// Builds a candidate on the current head and admits it.
    ///
    /// Returns the outcome together with the candidate, so the caller can
    /// prune its pool and publish the block on `Accepted`.
    pub fn propose<P>(
        &self,
        proposer_id: &ProposerId,
        tx_pool: &mut P,
        now: DateTime<Utc>,
    ) -> Result<(AdmissionOutcome, CandidateBlock), AdmissionError>
    where
        P: TxPool + ?Sized,
    {
        let candidate = self
            .proposer
            .build_candidate(&self.store, proposer_id, tx_pool, now)?;
        let outcome = self.admit(candidate.clone())?;
        Ok((outcome, candidate))
    }

    /// Validates, classifies and (if admissible) commits a candidate.
    ///
    /// Protocol rejections come back as `Ok(AdmissionOutcome::Rejected)`;
    /// `Err` is reserved for transient failures and is safe to retry.
    pub fn admit(&self, candidate: CandidateBlock) -> Result<AdmissionOutcome, AdmissionError> {
        self.metrics.increment(AdmissionCounter::Received);

        let sealed = match self.check(candidate) {
            Ok(sealed) => sealed,
            Err(e) => return Ok(self.reject_invalid(e)),
        };

        match self.classify_and_commit(&sealed) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.metrics.increment(AdmissionCounter::Errors);
                tracing::error!(
                    height = sealed.height(),
                    hash = %sealed.block.hash,
                    error = %e,
                    "admission failed transiently"
                );
                Err(e)
            }
        }
    }

    /// Ledger-independent checks: authority first, then the hash.
    fn check(&self, candidate: CandidateBlock) -> Result<SealedCandidate, ValidationError> {
        CombinedValidator::new(&self.authority, &self.hasher).validate(&candidate)?;
        candidate.seal()
    }

    fn classify_and_commit(
        &self,
        sealed: &SealedCandidate,
    ) -> Result<AdmissionOutcome, AdmissionError> {
        let timeout = self.config.commit_timeout();
        let _section = self
            .admission
            .try_lock_for(timeout)
            .ok_or(AdmissionError::LockTimeout(timeout))?;

        let block = &sealed.block;
        let outcome = match self.fork_choice.place(&self.store, block)? {
            Placement::Extends => {
                self.commit(sealed)?;
                self.metrics.increment(AdmissionCounter::Accepted);
                tracing::info!(
                    height = block.height,
                    hash = %block.hash,
                    proposer = %block.proposer,
                    txs = sealed.transactions.len(),
                    receipts = sealed.receipts.len(),
                    "block accepted"
                );
                AdmissionOutcome::Accepted {
                    height: block.height,
                    hash: block.hash.clone(),
                }
            }
            Placement::Duplicate => {
                self.metrics.increment(AdmissionCounter::Duplicate);
                tracing::debug!(height = block.height, hash = %block.hash, "duplicate block");
                AdmissionOutcome::rejected(RejectionKind::AlreadyExists, DETAIL_DUPLICATE)
            }
            Placement::ConflictsAtHeight { stored } => {
                tracing::warn!(
                    height = block.height,
                    hash = %block.hash,
                    stored = %stored,
                    "fork rejected: height already finalized"
                );
                self.reject_fork(DETAIL_FORK_AT_HEIGHT)
            }
            Placement::ParentMismatch { head } => {
                tracing::warn!(
                    height = block.height,
                    parent = %block.parent_hash,
                    head = %head.hash,
                    "fork rejected: parent is not the head"
                );
                self.reject_fork(DETAIL_PARENT_MISMATCH)
            }
            Placement::Gap { head } => {
                self.metrics.increment(AdmissionCounter::Rejected);
                self.metrics.increment(AdmissionCounter::GapsDetected);
                tracing::warn!(height = block.height, head = ?head, "gap rejected");
                AdmissionOutcome::rejected(RejectionKind::Gap, DETAIL_GAP)
            }
            Placement::GenesisParentMismatch { expected } => {
                self.reject_invalid(ValidationError::GenesisParentMismatch {
                    expected: expected.to_string(),
                    actual: block.parent_hash.to_string(),
                })
            }
        };
        Ok(outcome)
    }

    /// Writes the block and its rows in one scope; any failure rolls back.
    fn commit(&self, sealed: &SealedCandidate) -> Result<(), StorageError> {
        let mut write = self
            .store
            .begin_scoped_write(self.config.commit_timeout())?;

        write.insert_block(&sealed.block)?;
        for tx in sealed.transaction_rows() {
            write.insert_transaction(tx)?;
        }
        for receipt in sealed.receipt_rows() {
            write.insert_receipt(receipt)?;
        }
        write.commit()
    }

    fn reject_fork(&self, detail: &str) -> AdmissionOutcome {
        self.metrics.increment(AdmissionCounter::Rejected);
        self.metrics.increment(AdmissionCounter::ForksDetected);
        AdmissionOutcome::rejected(RejectionKind::Fork, detail)
    }

    fn reject_invalid(&self, err: ValidationError) -> AdmissionOutcome {
        let kind = err.rejection_kind();
        self.metrics.increment(AdmissionCounter::Rejected);
        self.metrics.increment(match kind {
            RejectionKind::UntrustedProposer => AdmissionCounter::UntrustedProposer,
            _ => AdmissionCounter::Invalid,
        });
        tracing::warn!(kind = kind.as_str(), error = %err, "candidate rejected");
        AdmissionOutcome::rejected(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::store::ChainLedgerView;
    use crate::metrics::InMemoryCounters;
    use crate::storage::InMemoryLedger;
    use crate::types::{CandidateReceipt, CandidateTransaction, HexDigest};
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    type TestEngine = AdmissionEngine<InMemoryLedger, Arc<InMemoryCounters>>;

    const CHAIN: &str = "test-chain";

    fn config(trusted: &[&str]) -> ConsensusConfig {
        ConsensusConfig {
            chain_id: CHAIN.to_string(),
            trusted_proposers: trusted.iter().map(|s| s.to_string()).collect(),
            commit_timeout_ms: 200,
            ..ConsensusConfig::default()
        }
    }

    fn engine_with(cfg: ConsensusConfig) -> (TestEngine, Arc<InMemoryCounters>) {
        let counters = Arc::new(InMemoryCounters::new());
        let engine = AdmissionEngine::new(cfg, InMemoryLedger::new(), counters.clone());
        (engine, counters)
    }

    fn timestamp(height: u64, variant: u32) -> String {
        format!(
            "2024-05-01T12:{:02}:{:02}.{:06}Z",
            height % 60,
            variant % 60,
            height
        )
    }

    /// Correctly hashed candidate with no rows.
    fn candidate(height: u64, parent: &HexDigest, proposer: &str, variant: u32) -> CandidateBlock {
        let ts = timestamp(height, variant);
        let hash = CanonicalHasher::compute(CHAIN, height, parent.as_str(), &ts);
        CandidateBlock {
            height: Some(height),
            hash: Some(hash.to_string()),
            parent_hash: Some(parent.to_string()),
            proposer: Some(proposer.to_string()),
            timestamp: Some(ts),
            ..CandidateBlock::default()
        }
    }

    /// Admits heights `0..=tip` and returns their hashes.
    fn build_chain(engine: &TestEngine, tip: u64) -> Vec<HexDigest> {
        let mut hashes = Vec::new();
        let mut parent = HexDigest::zero();
        for h in 0..=tip {
            let outcome = engine.admit(candidate(h, &parent, "node-a", 0)).unwrap();
            match outcome {
                AdmissionOutcome::Accepted { height, hash } => {
                    assert_eq!(height, h);
                    parent = hash.clone();
                    hashes.push(hash);
                }
                other => panic!("expected accept at {h}, got {other:?}"),
            }
        }
        hashes
    }

    fn tx(hash: &str) -> CandidateTransaction {
        CandidateTransaction {
            tx_hash: hash.to_string(),
            sender: "alice".to_string(),
            recipient: "bob".to_string(),
            payload: serde_json::json!({ "amount": 5 }),
        }
    }

    fn assert_conserved(counters: &InMemoryCounters) {
        assert_eq!(
            counters.get(AdmissionCounter::Received),
            counters.get(AdmissionCounter::Accepted)
                + counters.get(AdmissionCounter::Rejected)
                + counters.get(AdmissionCounter::Duplicate)
                + counters.get(AdmissionCounter::Errors)
        );
    }

    #[test]
    fn genesis_on_empty_ledger_is_accepted() {
        let (engine, counters) = engine_with(config(&[]));
        let c = candidate(0, &HexDigest::zero(), "node-a", 0);
        let expected = c.hash.clone().unwrap();

        let outcome = engine.admit(c).unwrap();

        assert_eq!(
            outcome,
            AdmissionOutcome::Accepted {
                height: 0,
                hash: HexDigest::parse(&expected).unwrap(),
            }
        );
        assert_eq!(engine.head().unwrap().map(|h| h.height), Some(0));
        assert_eq!(counters.get(AdmissionCounter::Received), 1);
        assert_eq!(counters.get(AdmissionCounter::Accepted), 1);
    }

    #[test]
    fn next_block_on_head_is_accepted() {
        let (engine, _) = engine_with(config(&[]));
        let hashes = build_chain(&engine, 2);

        let outcome = engine
            .admit(candidate(3, &hashes[2], "node-a", 0))
            .unwrap();

        assert!(outcome.is_accepted());
        let stored = engine.store().block_at(3).unwrap().unwrap();
        assert_eq!(stored.parent_hash, hashes[2]);
    }

    #[test]
    fn competing_block_at_finalized_height_is_a_fork() {
        let (engine, counters) = engine_with(config(&[]));
        let hashes = build_chain(&engine, 4);

        let outcome = engine
            .admit(candidate(2, &hashes[1], "node-a", 7))
            .unwrap();

        assert_eq!(
            outcome,
            AdmissionOutcome::rejected(RejectionKind::Fork, DETAIL_FORK_AT_HEIGHT)
        );
        assert_eq!(counters.get(AdmissionCounter::ForksDetected), 1);
        assert_eq!(counters.get(AdmissionCounter::Rejected), 1);
        assert_eq!(engine.store().hash_at(2).unwrap(), Some(hashes[2].clone()));
        assert_conserved(&counters);
    }

    #[test]
    fn height_beyond_next_is_a_gap() {
        let (engine, counters) = engine_with(config(&[]));
        let hashes = build_chain(&engine, 2);

        let outcome = engine
            .admit(candidate(10, &hashes[2], "node-a", 0))
            .unwrap();

        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::Gap));
        assert_eq!(counters.get(AdmissionCounter::GapsDetected), 1);
        assert_eq!(counters.get(AdmissionCounter::ForksDetected), 0);
        assert_eq!(engine.head().unwrap().map(|h| h.height), Some(2));
    }

    #[test]
    fn non_genesis_height_on_empty_ledger_is_a_gap() {
        let (engine, _) = engine_with(config(&[]));
        let outcome = engine
            .admit(candidate(1, &HexDigest::zero(), "node-a", 0))
            .unwrap();
        assert_eq!(outcome.rejection_kind(), Some(RejectionKind::Gap));
    }

    #[test]
    fn wrong_parent_at_next_height_is_a_fork() {
        let (engine, counters) = engine_with(config(&[]));
        let hashes = build_chain(&engine, 1);

        let outcome = engine
            .admit(candidate(2, &hashes[0], "node-a", 0))
            .unwrap();

        assert_eq!(
            outcome,
            AdmissionOutcome::rejected(RejectionKind::Fork, DETAIL_PARENT_MISMATCH)
        );
        assert_eq!(counters.get(AdmissionCounter::ForksDetected), 1);
    }

    #[test]
    fn untrusted_proposer_leaves_fork_and_duplicate_counters_alone() {
        let (engine, counters) = engine_with(config(&["node-a"]));

        let outcome = engine
            .admit(candidate(0, &HexDigest::zero(), "node-evil", 0))
            .unwrap();

        assert_eq!(
            outcome.rejection_kind(),
            Some(RejectionKind::UntrustedProposer)
        );
        assert_eq!(counters.get(AdmissionCounter::UntrustedProposer), 1);
        assert_eq!(counters.get(AdmissionCounter::ForksDetected), 0);
        assert_eq!(counters.get(AdmissionCounter::Duplicate), 0);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn missing_parent_hash_names_the_field() {
        let (engine, counters) = engine_with(config(&[]));
        let mut c = candidate(0, &HexDigest::zero(), "node-a", 0);
        c.parent_hash = None;

        match engine.admit(c).unwrap() {
            AdmissionOutcome::Rejected { kind, detail } => {
                assert_eq!(kind, RejectionKind::InvalidSignatureOrFormat);
                assert!(detail.contains("parent_hash"), "detail: {detail}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(counters.get(AdmissionCounter::Invalid), 1);
    }

    #[test]
    fn tampered_hash_is_invalid() {
        let (engine, _) = engine_with(config(&[]));
        let mut c = candidate(0, &HexDigest::zero(), "node-a", 0);
        c.timestamp = Some(timestamp(0, 1));

        let outcome = engine.admit(c).unwrap();
        assert_eq!(
            outcome.rejection_kind(),
            Some(RejectionKind::InvalidSignatureOrFormat)
        );
    }

    #[test]
    fn genesis_with_wrong_sentinel_is_invalid() {
        let (engine, _) = engine_with(config(&[]));
        let other = HexDigest::from_bytes(&[9; crate::types::HASH_LEN]);

        let outcome = engine.admit(candidate(0, &other, "node-a", 0)).unwrap();

        match outcome {
            AdmissionOutcome::Rejected { kind, detail } => {
                assert_eq!(kind, RejectionKind::InvalidSignatureOrFormat);
                assert!(detail.contains("genesis"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(engine.store().is_empty());
    }

    #[test]
    fn resubmitting_accepted_block_is_idempotent() {
        let (engine, counters) = engine_with(config(&[]));
        let hashes = build_chain(&engine, 1);
        let replay = candidate(1, &hashes[0], "node-a", 0);

        for _ in 0..3 {
            let outcome = engine.admit(replay.clone()).unwrap();
            assert_eq!(
                outcome,
                AdmissionOutcome::rejected(RejectionKind::AlreadyExists, DETAIL_DUPLICATE)
            );
        }

        assert_eq!(engine.store().len(), 2);
        assert_eq!(counters.get(AdmissionCounter::Accepted), 2);
        assert_eq!(counters.get(AdmissionCounter::Duplicate), 3);
        assert_eq!(counters.get(AdmissionCounter::Rejected), 0);
        assert_conserved(&counters);
    }

    #[test]
    fn rows_are_committed_with_the_block() {
        let (engine, _) = engine_with(config(&[]));
        let mut c = candidate(0, &HexDigest::zero(), "node-a", 0);
        c.transactions = vec![tx("tx-1"), tx("tx-2")];
        c.receipts = vec![CandidateReceipt {
            receipt_id: "r-1".to_string(),
            job_id: "job-1".to_string(),
            payload: serde_json::json!({ "ok": true }),
            miner_signature: Some("sig".to_string()),
            coordinator_attestations: vec!["att".to_string()],
            minted_amount: Some(10),
        }];

        assert!(engine.admit(c).unwrap().is_accepted());

        let txs = engine.store().transactions_at(0).unwrap();
        assert_eq!(
            txs.iter().map(|t| t.tx_hash.as_str()).collect::<Vec<_>>(),
            ["tx-1", "tx-2"]
        );
        let block = engine.store().block_at(0).unwrap().unwrap();
        assert_eq!(block.transaction_count, 2);
        assert_eq!(engine.store().receipts_at(0).unwrap()[0].minted_amount, Some(10));
    }

    #[test]
    fn failing_row_rolls_back_the_block() {
        let (engine, counters) = engine_with(config(&[]));
        let mut c = candidate(0, &HexDigest::zero(), "node-a", 0);
        c.transactions = vec![tx("same"), tx("same")];

        let err = engine.admit(c).unwrap_err();

        assert!(matches!(
            err,
            AdmissionError::Storage(StorageError::Constraint(_))
        ));
        assert!(engine.store().is_empty());
        assert_eq!(engine.head().unwrap(), None);
        assert_eq!(counters.get(AdmissionCounter::Errors), 1);
        assert_eq!(counters.get(AdmissionCounter::Accepted), 0);
        assert_conserved(&counters);

        // The call is retryable once the input is fixed.
        let retry = candidate(0, &HexDigest::zero(), "node-a", 0);
        assert!(engine.admit(retry).unwrap().is_accepted());
    }

    #[test]
    fn held_admission_section_times_out_transiently() {
        let cfg = ConsensusConfig {
            commit_timeout_ms: 10,
            ..config(&[])
        };
        let (engine, counters) = engine_with(cfg);
        let guard = engine.admission.lock();

        let err = engine
            .admit(candidate(0, &HexDigest::zero(), "node-a", 0))
            .unwrap_err();
        drop(guard);

        assert!(matches!(err, AdmissionError::LockTimeout(d) if d == Duration::from_millis(10)));
        assert_eq!(counters.get(AdmissionCounter::Errors), 1);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn concurrent_candidates_for_same_height_admit_one() {
        let (engine, counters) = engine_with(config(&[]));
        let engine = Arc::new(engine);

        let handles: Vec<_> = (0..8u32)
            .map(|variant| {
                let engine = engine.clone();
                std::thread::spawn(move || {
                    engine
                        .admit(candidate(0, &HexDigest::zero(), "node-a", variant))
                        .unwrap()
                })
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let accepted = outcomes.iter().filter(|o| o.is_accepted()).count();
        assert_eq!(accepted, 1);
        assert!(
            outcomes
                .iter()
                .filter(|o| !o.is_accepted())
                .all(|o| o.rejection_kind() == Some(RejectionKind::Fork))
        );
        assert_eq!(engine.store().len(), 1);
        assert_eq!(counters.get(AdmissionCounter::Received), 8);
        assert_conserved(&counters);
    }

    #[test]
    fn trusted_set_changes_apply_to_next_call() {
        let (engine, _) = engine_with(config(&["node-a"]));
        let c = candidate(0, &HexDigest::zero(), "node-b", 0);

        assert_eq!(
            engine.admit(c.clone()).unwrap().rejection_kind(),
            Some(RejectionKind::UntrustedProposer)
        );
        engine.authority().add_trusted("node-b");
        assert!(engine.admit(c).unwrap().is_accepted());
    }

    #[test]
    fn propose_builds_on_head() {
        struct OneShot(Vec<CandidateTransaction>);

        impl TxPool for OneShot {
            fn select_for_block(&mut self, max_txs: usize) -> Vec<CandidateTransaction> {
                self.0.iter().take(max_txs).cloned().collect()
            }

            fn remove_included(&mut self, tx_hashes: &[String]) {
                self.0.retain(|t| !tx_hashes.contains(&t.tx_hash));
            }
        }

        let (engine, _) = engine_with(config(&[]));
        let hashes = build_chain(&engine, 0);
        let mut pool = OneShot(vec![tx("p-1")]);

        let (outcome, proposed) = engine
            .propose(&"node-a".to_string(), &mut pool, Utc::now())
            .unwrap();

        assert!(outcome.is_accepted());
        assert_eq!(proposed.height, Some(1));
        assert_eq!(proposed.parent_hash.as_deref(), Some(hashes[0].as_str()));
        assert_eq!(engine.store().transactions_at(1).unwrap().len(), 1);
    }

    #[test]
    fn proposals_continue_when_pool_holds_committed_tx() {
        // Pool that forgets to prune, so "p-1" stays after its block lands.
        struct Sticky(Vec<CandidateTransaction>, Vec<String>);

        impl TxPool for Sticky {
            fn select_for_block(&mut self, max_txs: usize) -> Vec<CandidateTransaction> {
                self.0.iter().take(max_txs).cloned().collect()
            }

            fn remove_included(&mut self, tx_hashes: &[String]) {
                self.1.extend_from_slice(tx_hashes);
                self.0.retain(|t| !tx_hashes.contains(&t.tx_hash));
            }
        }

        let (engine, counters) = engine_with(config(&[]));
        let id = "node-a".to_string();
        let mut first_pool = Sticky(vec![tx("p-1")], Vec::new());
        let (first, _) = engine.propose(&id, &mut first_pool, Utc::now()).unwrap();
        assert!(first.is_accepted());

        let mut pool = Sticky(vec![tx("p-1"), tx("p-2")], Vec::new());
        let (second, proposed) = engine.propose(&id, &mut pool, Utc::now()).unwrap();

        assert!(second.is_accepted());
        assert_eq!(proposed.transactions.len(), 1);
        assert_eq!(proposed.transactions[0].tx_hash, "p-2");
        assert_eq!(pool.1, vec!["p-1".to_string()]);
        assert_eq!(engine.store().head().unwrap().map(|h| h.height), Some(1));
        assert_eq!(counters.get(AdmissionCounter::Errors), 0);
    }

    proptest! {
        #[test]
        fn accepted_heights_stay_contiguous(
            attempts in prop::collection::vec((0u64..8, 0u32..3, any::<bool>()), 1..40)
        ) {
            let (engine, counters) = engine_with(config(&[]));

            for (height, variant, link_to_parent) in attempts {
                let parent = if height == 0 {
                    HexDigest::zero()
                } else if link_to_parent {
                    engine
                        .store()
                        .hash_at(height - 1)
                        .unwrap()
                        .unwrap_or_else(|| HexDigest::from_bytes(&[1; crate::types::HASH_LEN]))
                } else {
                    HexDigest::from_bytes(&[2; crate::types::HASH_LEN])
                };
                engine.admit(candidate(height, &parent, "node-a", variant)).unwrap();
            }

            let accepted = counters.get(AdmissionCounter::Accepted);
            prop_assert_eq!(engine.store().len() as u64, accepted);

            let mut expected_parent = HexDigest::zero();
            for h in 0..accepted {
                let block = engine.store().block_at(h).unwrap();
                prop_assert!(block.is_some(), "hole at height {}", h);
                let block = block.unwrap();
                prop_assert_eq!(&block.parent_hash, &expected_parent);
                expected_parent = block.hash;
            }

            prop_assert_eq!(
                counters.get(AdmissionCounter::Received),
                accepted
                    + counters.get(AdmissionCounter::Rejected)
                    + counters.get(AdmissionCounter::Duplicate)
            );
        }
    }
}
