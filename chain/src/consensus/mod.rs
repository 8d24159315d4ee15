//! Block admission and related abstractions.
//!
//! This module provides a modular, testable admission layer consisting of:
//!
//! - configuration parameters ([`config::ConsensusConfig`]),
//! - canonical hashing ([`hasher::CanonicalHasher`]),
//! - proposer gatekeeping ([`authority::ProposerAuthority`]),
//! - candidate validators ([`validator::CandidateValidator`]),
//! - the fork-choice rule ([`fork_choice::AuthoritativeChainRule`]),
//! - storage traits ([`store::ChainLedgerView`], [`store::LedgerStore`]),
//! - a local block proposer ([`proposer::Proposer`]), and
//! - the engine tying them together ([`engine::AdmissionEngine`]).

pub mod authority;
pub mod config;
pub mod engine;
pub mod error;
pub mod fork_choice;
pub mod hasher;
pub mod proposer;
pub mod store;
pub mod validator;

pub use authority::ProposerAuthority;
pub use config::ConsensusConfig;
pub use engine::AdmissionEngine;
pub use error::{AdmissionError, ProposalError, StorageError, ValidationError};
pub use fork_choice::{AuthoritativeChainRule, ForkChoice, Placement};
pub use hasher::CanonicalHasher;
pub use proposer::{Proposer, TxPool};
pub use store::{ChainLedgerView, LedgerStore, ScopedWrite};
pub use validator::{CandidateValidator, CombinedValidator};
