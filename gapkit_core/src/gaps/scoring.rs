//! Weighted gap scoring and the deterministic ranking order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::GapCandidate;

/// Weights for the three score components.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub dependency_overlap: f64,
    pub pagerank: f64,
    pub descendants: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            dependency_overlap: 0.55,
            pagerank: 0.30,
            descendants: 0.15,
        }
    }
}

impl ScoringWeights {
    /// `w_dep * dependency_overlap + w_pr * pagerank + w_desc * descendants`
    pub fn score(&self, dependency_overlap: f64, pagerank: f64, descendants: f64) -> f64 {
        self.dependency_overlap * dependency_overlap
            + self.pagerank * pagerank
            + self.descendants * descendants
    }
}

/// Saturating descendant signal `d / (d + 10)`.
pub fn descendant_signal(descendants: usize) -> f64 {
    if descendants == 0 {
        return 0.0;
    }
    let d = descendants as f64;
    d / (d + 10.0)
}

/// Sort key `(-score, missing_decl, source_decl, target_family)`.
pub fn ranking_key(candidate: &GapCandidate) -> (f64, &str, &str, &str) {
    (
        -candidate.score,
        candidate.missing_decl.as_str(),
        candidate.source_decl.as_str(),
        candidate.target_family.as_str(),
    )
}

/// Total order over candidates: higher score first, then names ascending.
pub fn compare_candidates(a: &GapCandidate, b: &GapCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.missing_decl.cmp(&b.missing_decl))
        .then_with(|| a.source_decl.cmp(&b.source_decl))
        .then_with(|| a.target_family.cmp(&b.target_family))
}

/// Sorts by the ranking order and keeps the first `top_k`.
pub fn rank_candidates(mut candidates: Vec<GapCandidate>, top_k: usize) -> Vec<GapCandidate> {
    candidates.sort_by(compare_candidates);
    candidates.truncate(top_k);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn make_test_candidate(missing: &str, source: &str, target: &str, score: f64) -> GapCandidate {
        GapCandidate {
            source_decl: source.to_string(),
            target_family: target.to_string(),
            missing_decl: missing.to_string(),
            score,
            signals: BTreeMap::new(),
        }
    }

    #[test]
    fn test_weighted_sum() {
        let weights = ScoringWeights::default();
        assert!((weights.score(1.0, 1.0, 1.0) - 1.0).abs() < 1e-12);
        assert!((weights.score(1.0, 0.0, 0.0) - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_descendant_signal_saturates() {
        assert_eq!(descendant_signal(0), 0.0);
        assert!((descendant_signal(10) - 0.5).abs() < 1e-12);
        assert!(descendant_signal(1000) < 1.0);
        assert!(descendant_signal(1000) > descendant_signal(100));
    }

    #[test]
    fn test_rank_by_score_then_names() {
        let ranked = rank_candidates(
            vec![
                make_test_candidate("Ring.b", "Group.b", "Ring.", 0.5),
                make_test_candidate("Ring.a", "Group.a", "Ring.", 0.5),
                make_test_candidate("Module.z", "Group.z", "Module.", 0.9),
                make_test_candidate("Ring.a", "Group.a", "Module.", 0.5),
            ],
            10,
        );
        let order: Vec<_> = ranked
            .iter()
            .map(|c| (c.missing_decl.as_str(), c.target_family.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Module.z", "Module."),
                ("Ring.a", "Module."),
                ("Ring.a", "Ring."),
                ("Ring.b", "Ring."),
            ]
        );
    }

    #[test]
    fn test_rank_truncates() {
        let ranked = rank_candidates(
            vec![
                make_test_candidate("Ring.a", "Group.a", "Ring.", 0.3),
                make_test_candidate("Ring.b", "Group.b", "Ring.", 0.4),
            ],
            1,
        );
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].missing_decl, "Ring.b");
    }
}
