//! Gap report artifacts: candidate JSONL and the labeling CSV template.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;

use super::GapCandidate;
use crate::error::{GapError, Result};

/// Column order of the labeling template.
pub const LABEL_COLUMNS: [&str; 6] = [
    "missing_decl",
    "source_decl",
    "target_family",
    "score",
    "label_non_trivial",
    "notes",
];

/// One CSV row keyed by column name, in header order.
pub type LabelRow = IndexMap<String, String>;

/// Serializes a value with object keys in sorted order.
pub fn to_sorted_json<T: serde::Serialize>(value: &T) -> Result<String> {
    // serde_json::Value keeps object keys in a BTreeMap
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&value)?)
}

/// Pretty, sorted-key JSON followed by a newline.
pub fn to_sorted_json_pretty<T: serde::Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    Ok(text)
}

fn create_with_parents(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Writes one sorted-key JSON object per candidate.
pub fn write_gap_report(candidates: &[GapCandidate], path: &Path) -> Result<()> {
    let mut out = create_with_parents(path)?;
    for candidate in candidates {
        writeln!(out, "{}", to_sorted_json(candidate)?)?;
    }
    out.flush()?;
    Ok(())
}

/// Reads candidates back, skipping blank lines.
pub fn read_gap_report(path: &Path) -> Result<Vec<GapCandidate>> {
    if !path.is_file() {
        return Err(GapError::MissingInput(path.to_path_buf()));
    }
    let reader = BufReader::new(File::open(path)?);
    let mut candidates = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        candidates.push(serde_json::from_str(trimmed)?);
    }
    Ok(candidates)
}

/// Template rows with empty label and notes columns.
pub fn label_template_rows(candidates: &[GapCandidate]) -> Vec<LabelRow> {
    candidates
        .iter()
        .map(|c| {
            let values = [
                c.missing_decl.clone(),
                c.source_decl.clone(),
                c.target_family.clone(),
                format!("{:.6}", c.score),
                String::new(),
                String::new(),
            ];
            LABEL_COLUMNS
                .iter()
                .map(|col| col.to_string())
                .zip(values)
                .collect()
        })
        .collect()
}

/// Writes `top{K}_label_template.csv`.
pub fn write_label_template(path: &Path, candidates: &[GapCandidate]) -> Result<()> {
    let mut out = create_with_parents(path)?;
    write_csv_record(&mut out, LABEL_COLUMNS.iter().copied())?;
    for row in label_template_rows(candidates) {
        write_csv_record(&mut out, row.values().map(String::as_str))?;
    }
    out.flush()?;
    Ok(())
}

fn write_csv_record<'a, W: Write>(out: &mut W, fields: impl Iterator<Item = &'a str>) -> Result<()> {
    let line = fields.map(quote_csv_field).collect::<Vec<_>>().join(",");
    write!(out, "{}\r\n", line)?;
    Ok(())
}

fn quote_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Reads a header-driven CSV file into rows keyed by column name.
///
/// Missing trailing cells read as empty strings.
pub fn read_label_rows(path: &Path) -> Result<Vec<LabelRow>> {
    if !path.is_file() {
        return Err(GapError::MissingInput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    let mut records = parse_csv(&text)?.into_iter();
    let Some(header) = records.next() else {
        return Ok(Vec::new());
    };

    Ok(records
        .filter(|record| !(record.len() == 1 && record[0].is_empty()))
        .map(|record| {
            header
                .iter()
                .enumerate()
                .map(|(i, col)| (col.clone(), record.get(i).cloned().unwrap_or_default()))
                .collect()
        })
        .collect())
}

/// Minimal RFC 4180 reader: quoted fields, doubled quotes, CRLF or LF.
fn parse_csv(text: &str) -> Result<Vec<Vec<String>>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_quotes {
            match ch {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(ch),
            }
            continue;
        }
        match ch {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(ch),
        }
    }

    if in_quotes {
        return Err(GapError::Parse("unterminated quoted CSV field".to_string()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}
