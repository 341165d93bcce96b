//! Conjecture candidates and the deterministic template generator.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use gapkit_core::gaps::report::to_sorted_json;
use gapkit_core::gaps::scoring::compare_candidates;
use gapkit_core::GapCandidate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AgentError, Result};

/// A Lean statement proposed for one detected gap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConjectureCandidate {
    pub gap_missing_decl: String,
    pub lean_statement: String,
    pub rationale: String,
    pub model_id: String,
    pub temperature: f64,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Produces conjectures from ranked gaps.
pub trait ConjectureGenerator {
    /// Returns at most `max_candidates` conjectures.
    fn generate(&self, gaps: &[GapCandidate], max_candidates: usize) -> Vec<ConjectureCandidate>;
}

/// Gaps in ranking order, without mutating the input.
pub(crate) fn ranked_gaps(gaps: &[GapCandidate]) -> Vec<&GapCandidate> {
    let mut ranked: Vec<&GapCandidate> = gaps.iter().collect();
    ranked.sort_by(|a, b| compare_candidates(a, b));
    ranked
}

pub(crate) fn gap_metadata(gap: &GapCandidate) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("source_decl".to_string(), gap.source_decl.clone());
    metadata.insert("target_family".to_string(), gap.target_family.clone());
    metadata.insert("score".to_string(), format!("{:.6}", gap.score));
    metadata
}

/// Emits `theorem <name> : Prop` placeholders, one per gap.
#[derive(Clone, Debug)]
pub struct TemplateConjectureGenerator {
    pub model_id: String,
    pub temperature: f64,
}

impl Default for TemplateConjectureGenerator {
    fn default() -> Self {
        Self {
            model_id: "template-v1".to_string(),
            temperature: 0.0,
        }
    }
}

impl TemplateConjectureGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConjectureGenerator for TemplateConjectureGenerator {
    fn generate(&self, gaps: &[GapCandidate], max_candidates: usize) -> Vec<ConjectureCandidate> {
        ranked_gaps(gaps)
            .into_iter()
            .take(max_candidates)
            .map(|gap| {
                let mut metadata = gap_metadata(gap);
                for (name, value) in &gap.signals {
                    metadata.insert(format!("signal_{}", name), format!("{:.6}", value));
                }
                ConjectureCandidate {
                    gap_missing_decl: gap.missing_decl.clone(),
                    lean_statement: format!("theorem {} : Prop", gap.missing_decl.replace('.', "_")),
                    rationale: format!(
                        "Analogical transfer from {} to {} for missing declaration {}.",
                        gap.source_decl, gap.target_family, gap.missing_decl
                    ),
                    model_id: self.model_id.clone(),
                    temperature: self.temperature,
                    metadata,
                }
            })
            .collect()
    }
}

/// Writes one sorted-key JSON object per conjecture.
pub fn write_conjectures(conjectures: &[ConjectureCandidate], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut out = BufWriter::new(File::create(path)?);
    for conjecture in conjectures {
        writeln!(out, "{}", to_sorted_json(conjecture)?)?;
    }
    out.flush()?;
    Ok(())
}

/// Reads conjectures back; metadata values are stringified.
pub fn read_conjectures(path: &Path) -> Result<Vec<ConjectureCandidate>> {
    if !path.is_file() {
        return Err(gapkit_core::GapError::MissingInput(path.to_path_buf()).into());
    }
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row: Value = serde_json::from_str(&line)?;
        items.push(conjecture_from_row(&row)?);
    }
    Ok(items)
}

fn required<'a>(row: &'a Value, field: &str) -> Result<&'a Value> {
    row.get(field).ok_or_else(|| {
        AgentError::InvalidRecord(format!("Missing required field in JSONL line: '{}'", field))
    })
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn conjecture_from_row(row: &Value) -> Result<ConjectureCandidate> {
    let metadata = match row.get("metadata") {
        None => BTreeMap::new(),
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), as_text(v))).collect(),
        Some(_) => {
            return Err(AgentError::InvalidRecord(
                "metadata must be a JSON object".to_string(),
            ))
        }
    };
    // fields are checked in column order so the first missing one is reported
    let gap_missing_decl = as_text(required(row, "gap_missing_decl")?);
    let lean_statement = as_text(required(row, "lean_statement")?);
    let rationale = as_text(required(row, "rationale")?);
    let model_id = as_text(required(row, "model_id")?);
    let temperature = required(row, "temperature")?;
    let temperature = temperature
        .as_f64()
        .or_else(|| temperature.as_str().and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| AgentError::InvalidRecord(format!("temperature is not a number: {}", temperature)))?;

    Ok(ConjectureCandidate {
        gap_missing_decl,
        lean_statement,
        rationale,
        model_id,
        temperature,
        metadata,
    })
}
