//! Go/no-go evaluation of human-labeled top-k candidates.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::report::{read_label_rows, to_sorted_json_pretty, LabelRow};
use crate::error::{GapError, Result};

/// Label values counted as non-trivial (compared lowercase, trimmed).
pub const POSITIVE_LABELS: [&str; 4] = ["1", "true", "yes", "y"];

pub const DETECTION_RATE_BASIS: &str = "evaluated_module_proxy_rate";

const DEFAULT_TOP_K: usize = 20;

/// Thresholds of the phase-1 decision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoNoGoThresholds {
    pub min_detection_rate: f64,
    pub min_top20_precision: f64,
    pub min_nontrivial_gaps: usize,
}

impl Default for GoNoGoThresholds {
    fn default() -> Self {
        Self {
            min_detection_rate: 0.05,
            min_top20_precision: 0.60,
            min_nontrivial_gaps: 20,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoNoGoChecks {
    pub primary_detection_rate_ok: bool,
    pub secondary_topk_precision_ok: bool,
    pub minimum_non_trivial_count_ok: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoNoGoStatus {
    Go,
    NoGo,
}

/// Outcome of evaluating the first `top_k` labeled rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabelEvaluation {
    pub top_k: usize,
    pub topk_precision: f64,
    pub detection_rate: f64,
    pub non_trivial_candidate_rate: f64,
    pub non_trivial_count: usize,
    pub evaluated_module_count: usize,
    pub modules_with_non_trivial_gaps_count: usize,
    pub go_no_go_checks: GoNoGoChecks,
    pub go_no_go_status: GoNoGoStatus,
}

impl LabelEvaluation {
    /// Merges the evaluation fields into a metrics document.
    ///
    /// `top20_precision` is present only for `top_k == 20`.
    pub fn apply_to(&self, metrics: &mut Map<String, Value>) -> Result<()> {
        if self.top_k == 20 {
            metrics.insert("top20_precision".into(), self.topk_precision.into());
        } else {
            metrics.remove("top20_precision");
        }
        metrics.insert("topk_precision".into(), self.topk_precision.into());
        metrics.insert("detection_rate".into(), self.detection_rate.into());
        metrics.insert("detection_rate_basis".into(), DETECTION_RATE_BASIS.into());
        metrics.insert(
            "non_trivial_candidate_rate".into(),
            self.non_trivial_candidate_rate.into(),
        );
        metrics.insert("non_trivial_count".into(), self.non_trivial_count.into());
        metrics.insert("evaluated_module_count".into(), self.evaluated_module_count.into());
        metrics.insert(
            "modules_with_non_trivial_gaps_count".into(),
            self.modules_with_non_trivial_gaps_count.into(),
        );
        metrics.insert("go_no_go_checks".into(), serde_json::to_value(self.go_no_go_checks)?);
        metrics.insert("go_no_go_status".into(), serde_json::to_value(self.go_no_go_status)?);
        Ok(())
    }
}

/// Fraction of positive labels; `0.0` for no labels.
pub fn compute_topk_precision(labels: &[bool]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    labels.iter().filter(|l| **l).count() as f64 / labels.len() as f64
}

pub fn compute_detection_rate(non_trivial_count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    non_trivial_count as f64 / total as f64
}

pub fn is_non_trivial(label: &str) -> bool {
    let label = label.trim().to_lowercase();
    POSITIVE_LABELS.contains(&label.as_str())
}

/// Coarse module of a declaration: first two segments of a name with three
/// or more, otherwise the first segment.
pub fn module_proxy(decl_name: &str) -> String {
    let parts: Vec<&str> = decl_name.split('.').filter(|p| !p.is_empty()).collect();
    match parts.len() {
        0 => "<unknown>".to_string(),
        1 | 2 => parts[0].to_string(),
        _ => parts[..2].join("."),
    }
}

/// Evaluates the first `top_k` rows against the thresholds.
pub fn evaluate_labels(
    rows: &[LabelRow],
    top_k: usize,
    thresholds: &GoNoGoThresholds,
) -> Result<LabelEvaluation> {
    if top_k == 0 {
        return Err(GapError::InvalidConfig("top_k must be a positive integer".to_string()));
    }
    if let Some(first) = rows.first() {
        for column in ["label_non_trivial", "source_decl"] {
            if !first.contains_key(column) {
                return Err(GapError::Parse(format!(
                    "Labels CSV must include '{}' column",
                    column
                )));
            }
        }
    }

    let top_rows = &rows[..rows.len().min(top_k)];
    let field = |row: &LabelRow, col: &str| row.get(col).cloned().unwrap_or_default();
    let labels: Vec<bool> = top_rows
        .iter()
        .map(|row| is_non_trivial(&field(row, "label_non_trivial")))
        .collect();
    let non_trivial_count = labels.iter().filter(|l| **l).count();
    let topk_precision = compute_topk_precision(&labels);

    let evaluated: BTreeSet<String> = top_rows
        .iter()
        .map(|row| module_proxy(&field(row, "source_decl")))
        .collect();
    let non_trivial_modules: BTreeSet<String> = top_rows
        .iter()
        .zip(&labels)
        .filter(|(_, label)| **label)
        .map(|(row, _)| module_proxy(&field(row, "source_decl")))
        .collect();

    let detection_rate = compute_detection_rate(non_trivial_modules.len(), evaluated.len());
    let non_trivial_candidate_rate = compute_detection_rate(non_trivial_count, top_rows.len());

    let checks = GoNoGoChecks {
        primary_detection_rate_ok: detection_rate >= thresholds.min_detection_rate,
        secondary_topk_precision_ok: topk_precision >= thresholds.min_top20_precision,
        minimum_non_trivial_count_ok: non_trivial_count >= thresholds.min_nontrivial_gaps,
    };
    let go = checks.minimum_non_trivial_count_ok
        && (checks.primary_detection_rate_ok || checks.secondary_topk_precision_ok);

    Ok(LabelEvaluation {
        top_k,
        topk_precision,
        detection_rate,
        non_trivial_candidate_rate,
        non_trivial_count,
        evaluated_module_count: evaluated.len(),
        modules_with_non_trivial_gaps_count: non_trivial_modules.len(),
        go_no_go_checks: checks,
        go_no_go_status: if go { GoNoGoStatus::Go } else { GoNoGoStatus::NoGo },
    })
}

/// Reads a metrics document and label CSV, evaluates, and rewrites the
/// metrics document in place.
///
/// Without an explicit `top_k`, the metrics' own `top_k` is used
/// (20 when absent).
pub fn evaluate_metrics_file(
    metrics_path: &Path,
    labels_path: &Path,
    top_k: Option<usize>,
    thresholds: &GoNoGoThresholds,
) -> Result<LabelEvaluation> {
    if !metrics_path.is_file() {
        return Err(GapError::MissingInput(metrics_path.to_path_buf()));
    }
    let text = fs::read_to_string(metrics_path)?;
    let mut metrics: Map<String, Value> = serde_json::from_str(&text)
        .map_err(|e| GapError::Parse(format!("Invalid JSON in metrics file: {}", e)))?;
    let rows = read_label_rows(labels_path)?;

    let top_k = match top_k {
        Some(k) => k,
        None => match metrics.get("top_k") {
            None | Some(Value::Null) => DEFAULT_TOP_K,
            Some(value) => value
                .as_u64()
                .and_then(|k| usize::try_from(k).ok())
                .ok_or_else(|| GapError::Parse("Invalid top_k value in metrics file".to_string()))?,
        },
    };

    let evaluation = evaluate_labels(&rows, top_k, thresholds)?;
    evaluation.apply_to(&mut metrics)?;
    fs::write(metrics_path, to_sorted_json_pretty(&metrics)?)?;
    tracing::info!(
        top_k,
        status = ?evaluation.go_no_go_status,
        "label evaluation written"
    );
    Ok(evaluation)
}
