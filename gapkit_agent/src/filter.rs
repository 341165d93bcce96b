//! Cheap string-level rejection of obviously false conjectures.

use serde::{Deserialize, Serialize};

use crate::conjecture::ConjectureCandidate;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDecision {
    pub accepted: bool,
    pub reason: String,
}

impl FilterDecision {
    fn accept(reason: &str) -> Self {
        Self {
            accepted: true,
            reason: reason.to_string(),
        }
    }

    fn reject(reason: &str) -> Self {
        Self {
            accepted: false,
            reason: reason.to_string(),
        }
    }
}

/// Pre-verification screen for conjectures.
pub trait CounterexampleFilter {
    fn evaluate(&self, candidate: &ConjectureCandidate) -> FilterDecision;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BasicCounterexampleFilter;

impl CounterexampleFilter for BasicCounterexampleFilter {
    fn evaluate(&self, candidate: &ConjectureCandidate) -> FilterDecision {
        let statement = candidate.lean_statement.to_lowercase();
        if statement.contains(" : false") {
            return FilterDecision::reject("contains_false_literal");
        }
        if statement.contains("1 = 0") || statement.contains("0 = 1") {
            return FilterDecision::reject("contains_obvious_contradiction");
        }
        FilterDecision::accept("passed_basic_checks")
    }
}
