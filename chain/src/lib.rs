//! Chain library crate.
//!
//! This crate provides the core building blocks for block admission on an
//! authority-set chain:
//!
//! - strongly-typed domain types (`types`),
//! - canonical hashing, proposer gatekeeping and the admission engine
//!   (`consensus`),
//! - storage backends (`storage`),
//! - outcome counters and a Prometheus exporter (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! Higher-level binaries (the demo node, the RPC gateway) compose these
//! pieces and own everything around an admission call: gossip, mempool
//! pruning, HTTP status mapping.

pub mod config;
pub mod consensus;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-export top-level configuration types.
pub use config::{ChainConfig, ConfigError, MetricsConfig, StorageBackend, StorageConfig};

// Re-export "core" admission types and traits.
pub use consensus::{
    AdmissionEngine, AdmissionError, AuthoritativeChainRule, CanonicalHasher, CandidateValidator,
    ChainLedgerView, CombinedValidator, ConsensusConfig, ForkChoice, LedgerStore,
    ProposalError, ProposerAuthority, Proposer, ScopedWrite, StorageError, TxPool,
    ValidationError,
};

// Re-export storage backends.
pub use storage::InMemoryLedger;
#[cfg(feature = "rocksdb")]
pub use storage::RocksDbLedger;

// Re-export metrics sinks.
pub use metrics::{
    AdmissionCounter, AdmissionMetrics, InMemoryCounters, MetricsRegistry, MetricsSink,
    run_prometheus_http_server,
};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the engine stack used by a typical in-memory node.
///
/// This uses:
///
/// - [`InMemoryLedger`] for the ledger,
/// - a shared Prometheus [`MetricsRegistry`] as the counter sink.
pub type DefaultAdmissionEngine = AdmissionEngine<InMemoryLedger, std::sync::Arc<MetricsRegistry>>;
