//! Candidate validity predicates used before any chain-state comparison.

use crate::types::CandidateBlock;

use super::error::ValidationError;

/// Pluggable validity predicate for candidate blocks.
///
/// Implementations must be deterministic and must not touch the ledger;
/// the admission engine runs them outside its critical section.
pub trait CandidateValidator {
    fn validate(&self, candidate: &CandidateBlock) -> Result<(), ValidationError>;
}

impl<T: CandidateValidator + ?Sized> CandidateValidator for &T {
    fn validate(&self, candidate: &CandidateBlock) -> Result<(), ValidationError> {
        (**self).validate(candidate)
    }
}

/// A validator that composes two other validators.
///
/// `CombinedValidator { first, second }` runs `first.validate` and then
/// `second.validate`, failing fast on the first error. The admission engine
/// uses it to run the proposer authority ahead of hash verification.
pub struct CombinedValidator<A, B> {
    pub first: A,
    pub second: B,
}

impl<A, B> CombinedValidator<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A, B> CandidateValidator for CombinedValidator<A, B>
where
    A: CandidateValidator,
    B: CandidateValidator,
{
    fn validate(&self, candidate: &CandidateBlock) -> Result<(), ValidationError> {
        self.first.validate(candidate)?;
        self.second.validate(candidate)?;
        Ok(())
    }
}
