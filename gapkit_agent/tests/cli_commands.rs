//! Subcommands that do not need a Lean toolchain.

use std::fs;
use std::path::Path;

use gapkit_agent::cli::run_from;
use serde_json::Value;

fn write_fixture(dir: &Path) {
    fs::write(
        dir.join("premises.txt"),
        "---\nGroup.one_mul\n  * Group.mul\n---\nGroup.mul\n---\nRing.mul\n",
    )
    .unwrap();
    fs::write(
        dir.join("decl_types.txt"),
        "---\ntheorem\nGroup.one_mul\n∀ {G : Type} [Group G] (a : G), 1 * a = a\n",
    )
    .unwrap();
}

fn arg(path: &Path) -> String {
    path.display().to_string()
}

#[test]
fn detect_writes_gap_report() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let output = dir.path().join("gaps.jsonl");

    run_from([
        "gapkit".to_string(),
        "detect".to_string(),
        "--premises-path".to_string(),
        arg(&dir.path().join("premises.txt")),
        "--decl-types-path".to_string(),
        arg(&dir.path().join("decl_types.txt")),
        "--output-path".to_string(),
        arg(&output),
    ])
    .unwrap();

    let text = fs::read_to_string(&output).unwrap();
    let first: Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
    assert_eq!(first["missing_decl"], "Ring.one_mul");
}

#[test]
fn pilot_then_evaluate_updates_metrics() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let out = dir.path().join("processed");

    run_from([
        "gapkit".to_string(),
        "pilot".to_string(),
        "--premises-path".to_string(),
        arg(&dir.path().join("premises.txt")),
        "--decl-types-path".to_string(),
        arg(&dir.path().join("decl_types.txt")),
        "--output-dir".to_string(),
        arg(&out),
    ])
    .unwrap();

    let labels = out.join("top20_label_template.csv");
    let template = fs::read_to_string(&labels).unwrap();
    let labeled = template.replacen(",,\r\n", ",yes,transfer holds\r\n", 1);
    fs::write(&labels, labeled).unwrap();

    let metrics_path = out.join("phase1_metrics.json");
    run_from([
        "gapkit".to_string(),
        "evaluate".to_string(),
        "--metrics-path".to_string(),
        arg(&metrics_path),
        "--labels-csv".to_string(),
        arg(&labels),
    ])
    .unwrap();

    let metrics: Value = serde_json::from_str(&fs::read_to_string(&metrics_path).unwrap()).unwrap();
    assert_eq!(metrics["non_trivial_count"], 1);
    assert_eq!(metrics["top20_precision"], 1.0);
    // fewer than twenty non-trivial gaps
    assert_eq!(metrics["go_no_go_status"], "no_go");
    assert_eq!(metrics["detection_rate_basis"], "evaluated_module_proxy_rate");
}

#[test]
fn missing_input_is_an_error_naming_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_from([
        "gapkit".to_string(),
        "detect".to_string(),
        "--premises-path".to_string(),
        arg(&dir.path().join("absent.txt")),
        "--decl-types-path".to_string(),
        arg(&dir.path().join("decl_types.txt")),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("absent.txt"));
}

#[test]
fn cycle_rejects_zero_budget_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path());
    let out = dir.path().join("out");
    let err = run_from([
        "gapkit".to_string(),
        "cycle".to_string(),
        "--premises-path".to_string(),
        arg(&dir.path().join("premises.txt")),
        "--decl-types-path".to_string(),
        arg(&dir.path().join("decl_types.txt")),
        "--output-dir".to_string(),
        arg(&out),
        "--proof-retry-budget".to_string(),
        "0".to_string(),
    ])
    .unwrap_err();
    assert!(err.to_string().contains("proof_retry_budget"));
    assert!(!out.exists());
}
