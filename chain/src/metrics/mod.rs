//! Metrics and instrumentation for the chain.
//!
//! The admission engine reports outcomes through the [`MetricsSink`] trait,
//! one `increment` call per event. Sinks are injected, so tests use a fresh
//! [`InMemoryCounters`] each while nodes plug in the Prometheus-backed
//! [`MetricsRegistry`], which also serves `/metrics` in Prometheus text
//! format.
//!
//! Typical usage in a node:
//!
//! ```ignore
//! use std::net::SocketAddr;
//! use std::sync::Arc;
//! use authority_chain::metrics::{MetricsRegistry, run_prometheus_http_server};
//!
//! let registry = Arc::new(MetricsRegistry::new()?);
//! let addr: SocketAddr = "127.0.0.1:9898".parse()?;
//!
//! // Spawn the HTTP exporter in the background:
//! tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
//!
//! // Hand the same registry to the admission engine as its sink.
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub mod prometheus;

pub use self::prometheus::{AdmissionMetrics, MetricsRegistry, run_prometheus_http_server};

/// Monotonic counters driven by admission outcomes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum AdmissionCounter {
    Received,
    Accepted,
    Rejected,
    Duplicate,
    ForksDetected,
    GapsDetected,
    Invalid,
    UntrustedProposer,
    /// Transient storage or lock failures; the candidate was not judged.
    Errors,
}

impl AdmissionCounter {
    pub const ALL: [AdmissionCounter; 9] = [
        AdmissionCounter::Received,
        AdmissionCounter::Accepted,
        AdmissionCounter::Rejected,
        AdmissionCounter::Duplicate,
        AdmissionCounter::ForksDetected,
        AdmissionCounter::GapsDetected,
        AdmissionCounter::Invalid,
        AdmissionCounter::UntrustedProposer,
        AdmissionCounter::Errors,
    ];

    /// Exported metric name.
    pub fn name(&self) -> &'static str {
        match self {
            AdmissionCounter::Received => "blocks_received_total",
            AdmissionCounter::Accepted => "blocks_accepted_total",
            AdmissionCounter::Rejected => "blocks_rejected_total",
            AdmissionCounter::Duplicate => "blocks_duplicate_total",
            AdmissionCounter::ForksDetected => "forks_detected_total",
            AdmissionCounter::GapsDetected => "gaps_detected_total",
            AdmissionCounter::Invalid => "blocks_invalid_total",
            AdmissionCounter::UntrustedProposer => "untrusted_proposer_total",
            AdmissionCounter::Errors => "admission_errors_total",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            AdmissionCounter::Received => "Candidate blocks submitted for admission",
            AdmissionCounter::Accepted => "Candidate blocks committed to the canonical chain",
            AdmissionCounter::Rejected => "Candidate blocks rejected (forks, gaps, invalid, untrusted)",
            AdmissionCounter::Duplicate => "Candidate blocks identical to an accepted block",
            AdmissionCounter::ForksDetected => "Candidates conflicting with the canonical chain",
            AdmissionCounter::GapsDetected => "Candidates leaving heights unfilled above the head",
            AdmissionCounter::Invalid => "Candidates with malformed headers or bad hashes",
            AdmissionCounter::UntrustedProposer => "Candidates from proposers outside the trusted set",
            AdmissionCounter::Errors => "Admission calls that failed transiently",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Sink for admission counter increments.
///
/// Implementations must be safe to call concurrently; the engine never
/// reads counters back.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, counter: AdmissionCounter);
}

impl<T: MetricsSink + ?Sized> MetricsSink for Arc<T> {
    fn increment(&self, counter: AdmissionCounter) {
        (**self).increment(counter);
    }
}

/// Atomic in-process counters, mainly for tests and tooling.
#[derive(Debug, Default)]
pub struct InMemoryCounters {
    values: [AtomicU64; AdmissionCounter::ALL.len()],
}

impl InMemoryCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, counter: AdmissionCounter) -> u64 {
        self.values[counter.index()].load(Ordering::Relaxed)
    }
}

impl MetricsSink for InMemoryCounters {
    fn increment(&self, counter: AdmissionCounter) {
        self.values[counter.index()].fetch_add(1, Ordering::Relaxed);
    }
}
