//! `TODO` and `sorry` markers in Lean sources, used as gap seeds.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GapError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedKind {
    Todo,
    Sorry,
}

/// An annotation that may point at a useful gap.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedHint {
    pub file_path: PathBuf,
    /// 1-based
    pub line_number: usize,
    pub kind: SeedKind,
    /// The trimmed line
    pub content: String,
}

/// Scans every file for seed annotations, in path then line order.
pub fn scan_seed_annotations<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SeedHint>> {
    let mut hints = Vec::new();
    for path in paths {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GapError::MissingInput(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        hints.extend(scan_text(path, &text));
    }
    Ok(hints)
}

fn scan_text(path: &Path, text: &str) -> Vec<SeedHint> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let trimmed = line.trim();
            let lowered = trimmed.to_lowercase();
            let kind = if lowered.contains("todo") {
                SeedKind::Todo
            } else if lowered == "sorry" || lowered.starts_with("sorry ") {
                SeedKind::Sorry
            } else {
                return None;
            };
            Some(SeedHint {
                file_path: path.to_path_buf(),
                line_number: idx + 1,
                kind,
                content: trimmed.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_todo_and_sorry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Example.lean");
        fs::write(
            &path,
            "theorem a : True := by\n  sorry\n-- TODO: generalize to rings\ntheorem b : True := sorryAx _\n  sorry -- later\n",
        )
        .unwrap();

        let hints = scan_seed_annotations(&[&path]).unwrap();
        let summary: Vec<_> = hints.iter().map(|h| (h.line_number, h.kind)).collect();
        assert_eq!(
            summary,
            vec![(2, SeedKind::Sorry), (3, SeedKind::Todo), (5, SeedKind::Sorry)]
        );
        assert_eq!(hints[1].content, "-- TODO: generalize to rings");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("Missing.lean");
        assert!(matches!(
            scan_seed_annotations(&[&missing]),
            Err(GapError::MissingInput(_))
        ));
    }
}
