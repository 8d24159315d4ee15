use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{HexDigest, ProposerId};

/// Consensus configuration parameters.
///
/// This includes both protocol-level values (chain id, genesis sentinel,
/// trusted proposers) and implementation-level limits (commit timeout,
/// transactions per locally proposed block).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Chain id bound into every canonical block hash.
    pub chain_id: String,
    /// Parent hash a genesis block must carry.
    pub genesis_parent_hash: HexDigest,
    /// Initial trusted proposer set; empty means trust-all.
    pub trusted_proposers: Vec<ProposerId>,
    /// Upper bound on waiting for the admission section and storage
    /// commit, in milliseconds.
    pub commit_timeout_ms: u64,
    /// Target block time in seconds for the local proposer loop.
    pub block_time_secs: u64,
    /// Limit on the number of transactions per locally proposed block.
    pub max_block_txs: usize,
}

impl ConsensusConfig {
    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            chain_id: "authority-devnet".to_string(),
            genesis_parent_hash: HexDigest::zero(),
            trusted_proposers: Vec::new(),
            commit_timeout_ms: 2_000,
            block_time_secs: 5,
            max_block_txs: 1_000,
        }
    }
}
