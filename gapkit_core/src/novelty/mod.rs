//! Layered duplicate detection for conjectured statements.
//!
//! Layers run in a fixed order: exact, normalized, structural (bound
//! variable renaming), bi-implication, then an optional semantic comparator.
//! Only statements accepted as novel are indexed.

mod normalize;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use normalize::{bi_implication_key, extract_body, normalize, structural_key};

pub const DEFAULT_SEMANTIC_LOOKBACK: usize = 32;
pub const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoveltyReason {
    Novel,
    ExactDuplicate,
    NormalizedDuplicate,
    DefeqDuplicate,
    BiImplicationDuplicate,
    SemanticDuplicate,
    /// The semantic comparator saw a match below the confidence threshold
    Unknown,
}

impl NoveltyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoveltyReason::Novel => "novel",
            NoveltyReason::ExactDuplicate => "exact_duplicate",
            NoveltyReason::NormalizedDuplicate => "normalized_duplicate",
            NoveltyReason::DefeqDuplicate => "defeq_duplicate",
            NoveltyReason::BiImplicationDuplicate => "bi_implication_duplicate",
            NoveltyReason::SemanticDuplicate => "semantic_duplicate",
            NoveltyReason::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoveltyLayer {
    Exact,
    Normalized,
    Structural,
    BiImplication,
    Semantic,
}

/// Outcome of a novelty check.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoveltyDecision {
    pub is_novel: bool,
    pub reason: NoveltyReason,
    /// Layer that rejected the statement
    pub layer: Option<NoveltyLayer>,
    /// Comparator confidence, semantic layer only
    pub confidence: Option<f64>,
}

impl NoveltyDecision {
    pub fn novel() -> Self {
        Self {
            is_novel: true,
            reason: NoveltyReason::Novel,
            layer: None,
            confidence: None,
        }
    }

    fn duplicate(reason: NoveltyReason, layer: NoveltyLayer) -> Self {
        Self {
            is_novel: false,
            reason,
            layer: Some(layer),
            confidence: None,
        }
    }

    fn semantic(reason: NoveltyReason, confidence: f64) -> Self {
        Self {
            is_novel: false,
            reason,
            layer: Some(NoveltyLayer::Semantic),
            confidence: Some(confidence),
        }
    }
}

/// Verdict of a semantic comparator on one pair of statements.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SemanticComparison {
    pub equivalent: bool,
    pub confidence: f64,
    pub reason: String,
}

/// Pluggable semantic equivalence judge.
///
/// Errors are treated as "no opinion" by the checker.
pub trait SemanticComparator {
    fn compare(&self, candidate: &str, previous: &str) -> Result<SemanticComparison>;
}

/// Novelty capability consumed by the discovery cycle.
pub trait NoveltyCheck {
    /// Classifies `statement`, indexing it when novel.
    fn is_novel(&mut self, statement: &str) -> NoveltyDecision;
}

/// Append-only log of accepted statements plus derived indices.
pub struct NoveltyChecker {
    accepted: Vec<String>,
    exact: HashSet<String>,
    normalized: HashSet<String>,
    structural: HashSet<String>,
    bi_implications: HashSet<(String, String)>,
    comparator: Option<Box<dyn SemanticComparator>>,
    semantic_threshold: f64,
    semantic_lookback: usize,
}

impl Default for NoveltyChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NoveltyChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoveltyChecker")
            .field("accepted", &self.accepted.len())
            .field("semantic", &self.comparator.is_some())
            .field("semantic_threshold", &self.semantic_threshold)
            .field("semantic_lookback", &self.semantic_lookback)
            .finish()
    }
}

/// Keys derived from one statement.
struct StatementKeys {
    normalized: String,
    structural: String,
    bi_implication: Option<(String, String)>,
}

impl StatementKeys {
    fn of(statement: &str) -> Self {
        let normalized = normalize(statement);
        let structural = structural_key(&normalized);
        let bi_implication = bi_implication_key(&structural);
        Self {
            normalized,
            structural,
            bi_implication,
        }
    }
}

impl NoveltyChecker {
    pub fn new() -> Self {
        Self {
            accepted: Vec::new(),
            exact: HashSet::new(),
            normalized: HashSet::new(),
            structural: HashSet::new(),
            bi_implications: HashSet::new(),
            comparator: None,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            semantic_lookback: DEFAULT_SEMANTIC_LOOKBACK,
        }
    }

    /// Seeds the log with already-known statements.
    pub fn with_existing<I, S>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for statement in statements {
            let statement = statement.as_ref();
            self.accept(statement, StatementKeys::of(statement));
        }
        self
    }

    pub fn with_semantic_comparator(mut self, comparator: Box<dyn SemanticComparator>) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn with_semantic_threshold(mut self, threshold: f64) -> Self {
        self.semantic_threshold = threshold;
        self
    }

    pub fn with_semantic_lookback(mut self, lookback: usize) -> Self {
        self.semantic_lookback = lookback;
        self
    }

    /// Accepted statements, oldest first.
    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    fn accept(&mut self, statement: &str, keys: StatementKeys) {
        if !self.exact.insert(statement.to_string()) {
            return;
        }
        self.accepted.push(statement.to_string());
        self.normalized.insert(keys.normalized);
        self.structural.insert(keys.structural);
        if let Some(pair) = keys.bi_implication {
            self.bi_implications.insert(pair);
        }
    }

    fn semantic_check(&self, statement: &str) -> Option<NoveltyDecision> {
        let comparator = self.comparator.as_ref()?;
        let mut best_weak: Option<f64> = None;

        for previous in self.accepted.iter().rev().take(self.semantic_lookback) {
            let comparison = match comparator.compare(statement, previous) {
                Ok(comparison) => comparison,
                Err(err) => {
                    tracing::warn!(error = %err, "semantic comparator failed; ignoring");
                    continue;
                }
            };
            if !comparison.equivalent {
                continue;
            }
            if comparison.confidence >= self.semantic_threshold {
                return Some(NoveltyDecision::semantic(
                    NoveltyReason::SemanticDuplicate,
                    comparison.confidence,
                ));
            }
            best_weak = Some(best_weak.map_or(comparison.confidence, |b| b.max(comparison.confidence)));
        }

        best_weak.map(|confidence| NoveltyDecision::semantic(NoveltyReason::Unknown, confidence))
    }
}

impl NoveltyCheck for NoveltyChecker {
    fn is_novel(&mut self, statement: &str) -> NoveltyDecision {
        if self.exact.contains(statement) {
            return NoveltyDecision::duplicate(NoveltyReason::ExactDuplicate, NoveltyLayer::Exact);
        }

        let keys = StatementKeys::of(statement);
        if self.normalized.contains(&keys.normalized) {
            return NoveltyDecision::duplicate(
                NoveltyReason::NormalizedDuplicate,
                NoveltyLayer::Normalized,
            );
        }
        if self.structural.contains(&keys.structural) {
            return NoveltyDecision::duplicate(
                NoveltyReason::DefeqDuplicate,
                NoveltyLayer::Structural,
            );
        }
        if keys
            .bi_implication
            .as_ref()
            .is_some_and(|pair| self.bi_implications.contains(pair))
        {
            return NoveltyDecision::duplicate(
                NoveltyReason::BiImplicationDuplicate,
                NoveltyLayer::BiImplication,
            );
        }
        if let Some(decision) = self.semantic_check(statement) {
            return decision;
        }

        self.accept(statement, keys);
        NoveltyDecision::novel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GapError;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FixedComparator {
        equivalent: bool,
        confidence: f64,
    }

    impl SemanticComparator for FixedComparator {
        fn compare(&self, _candidate: &str, _previous: &str) -> Result<SemanticComparison> {
            Ok(SemanticComparison {
                equivalent: self.equivalent,
                confidence: self.confidence,
                reason: "fixed".to_string(),
            })
        }
    }

    struct FailingComparator;

    impl SemanticComparator for FailingComparator {
        fn compare(&self, _candidate: &str, _previous: &str) -> Result<SemanticComparison> {
            Err(GapError::Comparator("backend offline".to_string()))
        }
    }

    struct RecordingComparator {
        seen: Rc<RefCell<Vec<String>>>,
    }

    impl SemanticComparator for RecordingComparator {
        fn compare(&self, _candidate: &str, previous: &str) -> Result<SemanticComparison> {
            self.seen.borrow_mut().push(previous.to_string());
            Ok(SemanticComparison {
                equivalent: false,
                confidence: 0.0,
                reason: "different".to_string(),
            })
        }
    }

    fn checker_with(existing: &[&str]) -> NoveltyChecker {
        NoveltyChecker::new().with_existing(existing.iter().copied())
    }

    #[test]
    fn test_exact_duplicate() {
        let mut checker = checker_with(&["theorem x : True"]);
        let decision = checker.is_novel("theorem x : True");
        assert_eq!(decision.reason, NoveltyReason::ExactDuplicate);
        assert!(!decision.is_novel);
    }

    #[test]
    fn test_normalized_duplicate() {
        let mut checker = checker_with(&["theorem foo  :   True"]);
        assert_eq!(
            checker.is_novel("theorem foo : True").reason,
            NoveltyReason::NormalizedDuplicate
        );

        let mut checker = checker_with(&["theorem x : True -- baseline"]);
        assert_eq!(
            checker.is_novel("theorem x : True").reason,
            NoveltyReason::NormalizedDuplicate
        );
    }

    #[test]
    fn test_defeq_duplicate_with_alpha_renaming() {
        let mut checker = checker_with(&["theorem foo : ∀ n : Nat, n = n"]);
        let decision = checker.is_novel("theorem foo : ∀ m : Nat, m = m");
        assert_eq!(decision.reason, NoveltyReason::DefeqDuplicate);
        assert_eq!(decision.layer, Some(NoveltyLayer::Structural));
    }

    #[test]
    fn test_bi_implication_duplicate() {
        let mut checker = checker_with(&["theorem foo : P ↔ Q"]);
        assert_eq!(
            checker.is_novel("theorem foo : Q ↔ P").reason,
            NoveltyReason::BiImplicationDuplicate
        );
    }

    #[test]
    fn test_flipped_implication_is_novel() {
        let mut checker = checker_with(&["theorem foo : P -> Q"]);
        let decision = checker.is_novel("theorem foo : Q -> P");
        assert_eq!(decision, NoveltyDecision::novel());
    }

    #[test]
    fn test_new_statement_is_indexed() {
        let mut checker = checker_with(&["theorem x : True"]);
        assert!(checker.is_novel("theorem y : False").is_novel);
        assert_eq!(checker.len(), 2);
        assert_eq!(
            checker.is_novel("theorem z  : False").reason,
            NoveltyReason::DefeqDuplicate
        );
        assert_eq!(checker.len(), 2);
    }

    #[test]
    fn test_semantic_duplicate() {
        let mut checker = checker_with(&["theorem x : Nat.succ n = n + 1"]).with_semantic_comparator(
            Box::new(FixedComparator {
                equivalent: true,
                confidence: 0.95,
            }),
        );
        let decision = checker.is_novel("theorem y : n + 1 = Nat.succ n");
        assert_eq!(decision.reason, NoveltyReason::SemanticDuplicate);
        assert_eq!(decision.layer, Some(NoveltyLayer::Semantic));
        assert_eq!(decision.confidence, Some(0.95));
    }

    #[test]
    fn test_low_semantic_confidence_is_unknown() {
        let mut checker = checker_with(&["theorem x : Nat.succ n = n + 1"])
            .with_semantic_comparator(Box::new(FixedComparator {
                equivalent: true,
                confidence: 0.4,
            }))
            .with_semantic_threshold(0.9);
        let decision = checker.is_novel("theorem y : n + 1 = Nat.succ n");
        assert!(!decision.is_novel);
        assert_eq!(decision.reason, NoveltyReason::Unknown);
        assert_eq!(decision.confidence, Some(0.4));
        assert_eq!(checker.len(), 1);
    }

    #[test]
    fn test_comparator_errors_are_no_opinion() {
        let mut checker = checker_with(&["theorem x : True"])
            .with_semantic_comparator(Box::new(FailingComparator));
        assert!(checker.is_novel("theorem y : 1 + 1 = 2").is_novel);
    }

    #[test]
    fn test_semantic_lookback_is_most_recent_first() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut checker = checker_with(&["theorem a : A", "theorem b : B", "theorem c : C"])
            .with_semantic_comparator(Box::new(RecordingComparator { seen: seen.clone() }))
            .with_semantic_lookback(2);
        assert!(checker.is_novel("theorem d : D").is_novel);
        assert_eq!(*seen.borrow(), vec!["theorem c : C", "theorem b : B"]);
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let json = serde_json::to_string(&NoveltyReason::BiImplicationDuplicate).unwrap();
        assert_eq!(json, "\"bi_implication_duplicate\"");
        assert_eq!(NoveltyReason::DefeqDuplicate.as_str(), "defeq_duplicate");
    }
}
