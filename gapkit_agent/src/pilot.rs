//! Phase-1 pilot: detection artifacts for human labeling.

use std::fs;
use std::path::{Path, PathBuf};

use gapkit_core::gaps::report::{to_sorted_json_pretty, write_gap_report, write_label_template};
use gapkit_core::{AnalogicalGapDetector, DependencyGraph, GapDetectorConfig};
use serde_json::{json, Map, Value};

use crate::error::{AgentError, Result};

pub const PILOT_METRICS_FILE: &str = "phase1_metrics.json";

/// Paths and counts written by [`run_pilot`].
#[derive(Clone, Debug, PartialEq)]
pub struct PilotSummary {
    pub candidate_count: usize,
    pub candidates_path: PathBuf,
    pub labels_path: PathBuf,
    pub metrics_path: PathBuf,
    pub metrics: Map<String, Value>,
}

/// Detects gaps with the default families and writes the labeling kit.
pub fn run_pilot(
    premises_path: &Path,
    decl_types_path: &Path,
    output_dir: &Path,
    top_k: usize,
) -> Result<PilotSummary> {
    if top_k == 0 {
        return Err(AgentError::InvalidConfig("top_k must be a positive integer".to_string()));
    }
    let (premises, declarations) = gapkit_core::parser::load_records(premises_path, decl_types_path)?;
    let graph = DependencyGraph::from_records(&premises, &declarations);

    let detector = AnalogicalGapDetector::new(GapDetectorConfig {
        top_k,
        ..GapDetectorConfig::default()
    });
    let candidates = detector.detect(&graph, None);

    fs::create_dir_all(output_dir)?;
    let candidates_path = output_dir.join("gap_candidates.jsonl");
    let labels_path = output_dir.join(format!("top{}_label_template.csv", top_k));
    let metrics_path = output_dir.join(PILOT_METRICS_FILE);

    write_gap_report(&candidates, &candidates_path)?;
    write_label_template(&labels_path, &candidates)?;

    let mut metrics = Map::new();
    metrics.insert("candidate_count".into(), json!(candidates.len()));
    metrics.insert("top_k".into(), json!(top_k));
    metrics.insert("output_dir".into(), json!(output_dir.display().to_string()));
    metrics.insert("candidates_path".into(), json!(candidates_path.display().to_string()));
    metrics.insert("labels_path".into(), json!(labels_path.display().to_string()));
    metrics.insert("metrics_path".into(), json!(metrics_path.display().to_string()));
    for pending in ["topk_precision", "detection_rate", "non_trivial_count"] {
        metrics.insert(pending.into(), Value::Null);
    }
    if top_k == 20 {
        metrics.insert("top20_precision".into(), Value::Null);
    }
    metrics.insert("go_no_go_status".into(), json!("pending"));
    fs::write(&metrics_path, to_sorted_json_pretty(&metrics)?)?;

    tracing::info!(candidates = candidates.len(), output = %output_dir.display(), "pilot artifacts written");
    Ok(PilotSummary {
        candidate_count: candidates.len(),
        candidates_path,
        labels_path,
        metrics_path,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapkit_core::gaps::report::read_label_rows;

    fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
        let premises = dir.join("premises.txt");
        let decls = dir.join("decl_types.txt");
        fs::write(
            &premises,
            "---\nGroup.one_mul\n  * Group.mul\n  * Group.one\n---\nGroup.mul\n---\nGroup.one\n---\nRing.mul\n---\nRing.one\n",
        )
        .unwrap();
        fs::write(&decls, "---\ntheorem\nGroup.one_mul\n∀ {G : Type} [Group G] (a : G), 1 * a = a\n").unwrap();
        (premises, decls)
    }

    #[test]
    fn test_pilot_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let (premises, decls) = write_inputs(dir.path());
        let out = dir.path().join("processed");

        let summary = run_pilot(&premises, &decls, &out, 20).unwrap();
        assert_eq!(summary.candidate_count, 1);
        assert!(summary.labels_path.ends_with("top20_label_template.csv"));

        let rows = read_label_rows(&summary.labels_path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["missing_decl"], "Ring.one_mul");
        assert_eq!(rows[0]["label_non_trivial"], "");

        let metrics: Value = serde_json::from_str(&fs::read_to_string(&summary.metrics_path).unwrap()).unwrap();
        assert_eq!(metrics["go_no_go_status"], "pending");
        assert!(metrics["top20_precision"].is_null());
        assert!(metrics.get("top20_precision").is_some());
    }

    #[test]
    fn test_top20_only_for_twenty() {
        let dir = tempfile::tempdir().unwrap();
        let (premises, decls) = write_inputs(dir.path());
        let summary = run_pilot(&premises, &decls, dir.path(), 5).unwrap();
        assert!(!summary.metrics.contains_key("top20_precision"));
        assert!(summary.metrics_path.is_file());
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_pilot(&dir.path().join("nope.txt"), &dir.path().join("d.txt"), dir.path(), 20)
            .unwrap_err();
        assert!(err.to_string().contains("nope.txt"));
    }
}
