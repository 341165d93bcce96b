//! Proof attempt generation.

use serde::{Deserialize, Serialize};

use crate::conjecture::ConjectureCandidate;
use crate::error::{AgentError, Result};

/// One proof script to try against a statement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofAttempt {
    pub statement: String,
    pub proof_script: String,
    pub engine: String,
    /// 1-based
    pub attempt_index: usize,
}

pub trait ProofEngine {
    /// Largest attempt budget the engine can fill; `None` when unbounded.
    fn supported_attempts(&self) -> Option<usize> {
        None
    }

    /// Returns up to `max_attempts` attempts in the order they should run,
    /// or an error when the budget exceeds [`ProofEngine::supported_attempts`].
    fn build_attempts(&self, candidate: &ConjectureCandidate, max_attempts: usize) -> Result<Vec<ProofAttempt>>;
}

const BASELINE_SCRIPTS: [&str; 3] = ["by\n  exact?", "by\n  aesop", "by\n  simp"];

/// Fixed sequence of baseline tactics.
#[derive(Clone, Debug)]
pub struct SimpleProofEngine {
    pub engine_name: String,
}

impl Default for SimpleProofEngine {
    fn default() -> Self {
        Self {
            engine_name: "simple-proof-engine".to_string(),
        }
    }
}

impl ProofEngine for SimpleProofEngine {
    fn supported_attempts(&self) -> Option<usize> {
        Some(BASELINE_SCRIPTS.len())
    }

    fn build_attempts(&self, candidate: &ConjectureCandidate, max_attempts: usize) -> Result<Vec<ProofAttempt>> {
        if max_attempts > BASELINE_SCRIPTS.len() {
            return Err(AgentError::InvalidConfig(format!(
                "max_attempts={} exceeds the {} supported baseline proof scripts",
                max_attempts,
                BASELINE_SCRIPTS.len()
            )));
        }
        Ok(BASELINE_SCRIPTS
            .iter()
            .take(max_attempts)
            .enumerate()
            .map(|(i, script)| ProofAttempt {
                statement: candidate.lean_statement.clone(),
                proof_script: script.to_string(),
                engine: self.engine_name.clone(),
                attempt_index: i + 1,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn candidate() -> ConjectureCandidate {
        ConjectureCandidate {
            gap_missing_decl: "Ring.one_mul".to_string(),
            lean_statement: "theorem Ring_one_mul : Prop".to_string(),
            rationale: String::new(),
            model_id: "template-v1".to_string(),
            temperature: 0.0,
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_attempts_capped_and_indexed() {
        let engine = SimpleProofEngine::default();
        let attempts = engine.build_attempts(&candidate(), 2).unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].attempt_index, 1);
        assert_eq!(attempts[0].proof_script, "by\n  exact?");
        assert_eq!(attempts[1].proof_script, "by\n  aesop");
        assert_eq!(attempts[1].engine, "simple-proof-engine");
        assert_eq!(attempts[1].statement, "theorem Ring_one_mul : Prop");
    }

    #[test]
    fn test_budget_beyond_scripts_is_rejected() {
        let engine = SimpleProofEngine::default();
        assert_eq!(engine.supported_attempts(), Some(3));
        assert_eq!(engine.build_attempts(&candidate(), 3).unwrap().len(), 3);
        match engine.build_attempts(&candidate(), 4) {
            Err(AgentError::InvalidConfig(message)) => assert!(message.contains("supported")),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_budget_yields_no_attempts() {
        let engine = SimpleProofEngine::default();
        assert!(engine.build_attempts(&candidate(), 0).unwrap().is_empty());
    }
}
