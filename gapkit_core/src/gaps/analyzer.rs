//! Analogical gap detector.
//!
//! For every ordered pair of distinct families `(source, target)` and every
//! declaration `source + suffix`, proposes `target + suffix` when that name
//! is absent from the graph and the source's dependencies translate well.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::graph::DependencyGraph;

use super::scoring::{descendant_signal, rank_candidates};
use super::type_classes::{extract_required_classes, TypeClassCompatibility};
use super::{GapCandidate, GapDetectorConfig};

const MIN_UNIVERSAL_WEIGHT: f64 = 0.05;

/// Weighted overlap between a source dependency list and the target family.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct TranslationStats {
    /// Weighted count of all dependencies
    total: f64,
    /// Weighted count of dependencies whose translation exists
    hits: f64,
    /// Dependencies inside the source family
    cross_total: usize,
    /// Source-family dependencies whose translation exists
    cross_hits: usize,
}

impl TranslationStats {
    fn dependency_overlap(&self) -> f64 {
        if self.total > 0.0 {
            self.hits / self.total
        } else {
            0.0
        }
    }

    fn cross_family_overlap(&self) -> f64 {
        if self.cross_total > 0 {
            self.cross_hits as f64 / self.cross_total as f64
        } else {
            0.0
        }
    }
}

/// Detects missing counterparts across declaration families.
#[derive(Clone, Debug, Default)]
pub struct AnalogicalGapDetector {
    config: GapDetectorConfig,
    compatibility: TypeClassCompatibility,
}

impl AnalogicalGapDetector {
    pub fn new(config: GapDetectorConfig) -> Self {
        Self {
            config,
            compatibility: TypeClassCompatibility::default(),
        }
    }

    /// Replaces the family capability table used by the type-class filter.
    pub fn with_compatibility(mut self, compatibility: TypeClassCompatibility) -> Self {
        self.compatibility = compatibility;
        self
    }

    pub fn config(&self) -> &GapDetectorConfig {
        &self.config
    }

    /// Returns ranked candidates, truncated to `top_k` (or the configured
    /// `top_k` when `None`).
    pub fn detect(&self, graph: &DependencyGraph, top_k: Option<usize>) -> Vec<GapCandidate> {
        let effective_top_k = top_k.unwrap_or(self.config.top_k);
        let nodes: HashSet<&str> = graph.nodes().collect();
        if nodes.is_empty() {
            return Vec::new();
        }

        let pagerank = graph.pagerank();
        let max_pr = pagerank.values().copied().fold(0.0_f64, f64::max);

        let prefixes = &self.config.family_prefixes;
        let family_nodes: HashMap<&str, BTreeSet<&str>> = prefixes
            .iter()
            .map(|prefix| {
                let members = nodes
                    .iter()
                    .copied()
                    .filter(|n| n.starts_with(prefix.as_str()))
                    .collect();
                (prefix.as_str(), members)
            })
            .collect();
        let family_stems: HashMap<&str, HashSet<&str>> = family_nodes
            .iter()
            .map(|(prefix, members)| {
                let stems = members
                    .iter()
                    .filter_map(|&name| namespace_stem(suffix_after_prefix(name, prefix)))
                    .collect();
                (*prefix, stems)
            })
            .collect();
        let universal_weight = self.universal_dependency_weight(&family_nodes);

        let mut ranked = Vec::new();
        for source_prefix in prefixes {
            let Some(sources) = family_nodes.get(source_prefix.as_str()) else {
                continue;
            };
            for &source_decl in sources {
                let suffix = suffix_after_prefix(source_decl, source_prefix);
                if suffix.is_empty() {
                    continue;
                }
                let suffix_stem = namespace_stem(suffix);
                let source_deps = graph.dependencies_of(source_decl);

                let pr_signal = match pagerank.get(source_decl) {
                    Some(pr) if max_pr > 0.0 => pr / max_pr,
                    _ => 0.0,
                };
                let descendants = graph.descendants_count(source_decl);
                let desc_signal = descendant_signal(descendants);

                let required = if self.config.enable_type_class_filter {
                    graph
                        .type_signature_of(source_decl)
                        .map(extract_required_classes)
                        .unwrap_or_default()
                } else {
                    BTreeSet::new()
                };

                for target_prefix in prefixes {
                    if target_prefix == source_prefix {
                        continue;
                    }
                    if family_nodes
                        .get(target_prefix.as_str())
                        .is_none_or(|members| members.is_empty())
                    {
                        continue;
                    }

                    let missing_decl = format!("{}{}", target_prefix, suffix);
                    if nodes.contains(missing_decl.as_str()) {
                        continue;
                    }

                    let stem_match = match suffix_stem {
                        None => true,
                        Some(stem) => family_stems
                            .get(target_prefix.as_str())
                            .is_some_and(|stems| stems.contains(stem)),
                    };
                    if self.config.require_namespace_stem_match && !stem_match {
                        continue;
                    }

                    let type_class_satisfaction = if required.is_empty() {
                        1.0
                    } else {
                        let (_, ratio) = self.compatibility.can_satisfy(&required, target_prefix);
                        if ratio < self.config.min_type_class_satisfaction {
                            continue;
                        }
                        ratio
                    };

                    let stats = self.translation_stats(
                        &source_deps,
                        source_prefix,
                        target_prefix,
                        &nodes,
                        universal_weight,
                    );
                    let dependency_overlap = stats.dependency_overlap();
                    let cross_overlap = stats.cross_family_overlap();
                    if stats.cross_hits < self.config.min_cross_family_hits
                        || cross_overlap < self.config.min_cross_family_overlap
                    {
                        continue;
                    }

                    let score = self.config.weights.score(dependency_overlap, pr_signal, desc_signal);
                    if score < self.config.min_score {
                        continue;
                    }

                    let mut signals = BTreeMap::from([
                        ("dependency_overlap".to_string(), dependency_overlap),
                        ("translated_dependency_hits".to_string(), stats.hits),
                        ("translated_dependency_total".to_string(), stats.total),
                        ("source_pagerank".to_string(), pr_signal),
                        ("source_descendants".to_string(), desc_signal),
                        ("source_descendant_count".to_string(), descendants as f64),
                        ("cross_family_hits".to_string(), stats.cross_hits as f64),
                        ("cross_family_total".to_string(), stats.cross_total as f64),
                        ("cross_family_overlap".to_string(), cross_overlap),
                        (
                            "namespace_stem_match".to_string(),
                            if stem_match { 1.0 } else { 0.0 },
                        ),
                    ]);
                    if self.config.enable_type_class_filter {
                        signals.insert("type_class_satisfaction".to_string(), type_class_satisfaction);
                    }

                    ranked.push(GapCandidate {
                        source_decl: source_decl.to_string(),
                        target_family: target_prefix.clone(),
                        missing_decl,
                        score,
                        signals,
                    });
                }
            }
        }

        tracing::debug!(
            candidates = ranked.len(),
            top_k = effective_top_k,
            "analogical gap detection finished"
        );
        rank_candidates(ranked, effective_top_k)
    }

    /// Weight of a dependency outside every family, or `None` when weighting
    /// is disabled.
    fn universal_dependency_weight(&self, family_nodes: &HashMap<&str, BTreeSet<&str>>) -> Option<f64> {
        if !self.config.enable_weighted_dependencies || self.config.family_prefixes.is_empty() {
            return None;
        }
        let total = self.config.family_prefixes.len() as f64;
        let nonempty = self
            .config
            .family_prefixes
            .iter()
            .filter(|p| family_nodes.get(p.as_str()).is_some_and(|m| !m.is_empty()))
            .count() as f64;
        Some((1.0 - nonempty / total).max(MIN_UNIVERSAL_WEIGHT))
    }

    fn dependency_weight(&self, dep: &str, universal_weight: Option<f64>) -> f64 {
        match universal_weight {
            None => 1.0,
            Some(_)
                if self
                    .config
                    .family_prefixes
                    .iter()
                    .any(|p| dep.starts_with(p.as_str())) =>
            {
                1.0
            }
            Some(w) => w,
        }
    }

    fn translation_stats(
        &self,
        source_deps: &[&str],
        source_prefix: &str,
        target_prefix: &str,
        nodes: &HashSet<&str>,
        universal_weight: Option<f64>,
    ) -> TranslationStats {
        let mut stats = TranslationStats::default();
        for dep in source_deps {
            let weight = self.dependency_weight(dep, universal_weight);
            stats.total += weight;

            let in_source_family = dep.starts_with(source_prefix);
            let exists = if let Some(rest) = dep.strip_prefix(source_prefix) {
                stats.cross_total += 1;
                nodes.contains(format!("{}{}", target_prefix, rest).as_str())
            } else {
                nodes.contains(dep)
            };
            if exists {
                stats.hits += weight;
                if in_source_family {
                    stats.cross_hits += 1;
                }
            }
        }
        stats
    }
}

fn suffix_after_prefix<'a>(name: &'a str, prefix: &str) -> &'a str {
    name.get(prefix.len()..).unwrap_or("").trim_start_matches('.')
}

/// First dot-segment of a dotted suffix; `None` for single-segment suffixes.
fn namespace_stem(suffix: &str) -> Option<&str> {
    let (stem, _) = suffix.split_once('.')?;
    (!stem.is_empty()).then_some(stem)
}
