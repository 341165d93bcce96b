//! Analogical gap detection across declaration families.
//!
//! A gap is a declaration that exists under one family prefix (the source,
//! e.g. `Group.`) but whose translated name is absent under another (the
//! target, e.g. `Ring.`).

pub mod analyzer;
pub mod evaluation;
pub mod report;
pub mod scoring;
pub mod seeds;
pub mod type_classes;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GapError, Result};

pub use analyzer::AnalogicalGapDetector;
pub use scoring::{rank_candidates, ranking_key, ScoringWeights};
pub use type_classes::{extract_required_classes, TypeClassCompatibility, UNIVERSAL_CLASSES};

/// A ranked missing counterpart inferred by cross-family analogy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GapCandidate {
    pub source_decl: String,
    pub target_family: String,
    /// Never a node of the graph the candidate was detected on
    pub missing_decl: String,
    pub score: f64,
    pub signals: BTreeMap<String, f64>,
}

/// Configuration for analogical gap detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapDetectorConfig {
    pub family_prefixes: Vec<String>,
    pub min_score: f64,
    pub top_k: usize,
    pub weights: ScoringWeights,
    pub min_cross_family_hits: usize,
    pub min_cross_family_overlap: f64,
    pub require_namespace_stem_match: bool,
    pub enable_type_class_filter: bool,
    pub min_type_class_satisfaction: f64,
    pub enable_weighted_dependencies: bool,
}

impl Default for GapDetectorConfig {
    fn default() -> Self {
        Self {
            family_prefixes: vec!["Group.".into(), "Ring.".into(), "Module.".into()],
            min_score: 0.20,
            top_k: 20,
            weights: ScoringWeights::default(),
            min_cross_family_hits: 1,
            min_cross_family_overlap: 0.25,
            require_namespace_stem_match: true,
            enable_type_class_filter: true,
            min_type_class_satisfaction: 0.5,
            enable_weighted_dependencies: true,
        }
    }
}

impl GapDetectorConfig {
    /// Default thresholds over a custom family list.
    pub fn with_families<S: Into<String>>(families: impl IntoIterator<Item = S>) -> Self {
        Self {
            family_prefixes: families.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(GapError::InvalidConfig("top_k must be positive".to_string()));
        }
        if self.family_prefixes.iter().any(|p| p.is_empty()) {
            return Err(GapError::InvalidConfig(
                "family prefixes must be non-empty".to_string(),
            ));
        }
        for (name, value) in [
            ("min_cross_family_overlap", self.min_cross_family_overlap),
            ("min_type_class_satisfaction", self.min_type_class_satisfaction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GapError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
