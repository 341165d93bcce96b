//! Parsers for the `premises` and `declaration_types` flat files.
//!
//! Both formats are sequences of blocks separated by `---` lines.

use std::fs;
use std::path::Path;

use crate::error::{GapError, Result};
use crate::types::{DeclarationRecord, Dependency, PremisesRecord};

const BLOCK_SEPARATOR: &str = "---";

/// Parses `premises` output.
///
/// The first non-blank line of a block names the declaration. Every later
/// non-blank line is a dependency, prefixed with `* ` when explicit or
/// `s ` when used by the simplifier.
pub fn parse_premises(text: &str) -> Vec<PremisesRecord> {
    let mut records = Vec::new();

    for block in text.split(BLOCK_SEPARATOR) {
        let mut lines = block.lines().map(str::trim).filter(|l| !l.is_empty());
        let Some(name) = lines.next() else {
            continue;
        };

        let dependencies = lines.map(parse_dependency_line).collect();
        records.push(PremisesRecord {
            name: name.to_string(),
            dependencies,
        });
    }

    records
}

fn parse_dependency_line(line: &str) -> Dependency {
    if let Some(rest) = line.strip_prefix("* ") {
        Dependency {
            name: rest.trim().to_string(),
            is_explicit: true,
            is_simp: false,
        }
    } else if let Some(rest) = line.strip_prefix("s ") {
        Dependency {
            name: rest.trim().to_string(),
            is_explicit: false,
            is_simp: true,
        }
    } else {
        Dependency {
            name: line.to_string(),
            is_explicit: false,
            is_simp: false,
        }
    }
}

/// Parses `declaration_types` output.
///
/// A block holds the kind, the name and a possibly multi-line signature.
/// Blocks with fewer than three non-blank lines are skipped. Leading and
/// trailing blank lines of the signature are dropped, inner lines are kept
/// verbatim.
pub fn parse_declaration_types(text: &str) -> Vec<DeclarationRecord> {
    let mut records = Vec::new();

    for block in text.split(BLOCK_SEPARATOR) {
        let lines: Vec<&str> = block.split('\n').collect();
        if lines.iter().filter(|l| !l.trim().is_empty()).count() < 3 {
            continue;
        }

        let mut header = Vec::with_capacity(2);
        let mut signature_start = 0;
        for (idx, line) in lines.iter().enumerate() {
            if !line.trim().is_empty() {
                header.push(line.trim());
                if header.len() == 2 {
                    signature_start = idx + 1;
                    break;
                }
            }
        }

        let signature_lines = &lines[signature_start..];
        let end = signature_lines
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(0, |i| i + 1);
        let start = signature_lines[..end]
            .iter()
            .position(|l| !l.trim().is_empty())
            .unwrap_or(end);

        records.push(DeclarationRecord {
            kind: header[0].to_string(),
            name: header[1].to_string(),
            type_signature: signature_lines[start..end].join("\n"),
        });
    }

    records
}

/// Reads and parses both input files.
///
/// A missing file yields [`GapError::MissingInput`] naming its path.
pub fn load_records(
    premises_path: &Path,
    decl_types_path: &Path,
) -> Result<(Vec<PremisesRecord>, Vec<DeclarationRecord>)> {
    let premises = read_input(premises_path)?;
    let decl_types = read_input(decl_types_path)?;
    Ok((parse_premises(&premises), parse_declaration_types(&decl_types)))
}

fn read_input(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(GapError::MissingInput(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premises_single_block() {
        let text = "---\nNat.add_comm\n  * Nat.rec\n  * Nat.add\n  Nat.add_succ\n  Nat.succ_add\n";
        let records = parse_premises(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Nat.add_comm");
        assert_eq!(records[0].dependencies.len(), 4);

        let explicit: Vec<_> = records[0]
            .dependencies
            .iter()
            .filter(|d| d.is_explicit)
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(explicit, vec!["Nat.rec", "Nat.add"]);
    }

    #[test]
    fn test_premises_simp_flag() {
        let text = "---\nList.toFinset.ext_iff\ns List.mem_toFinset\n  * congrArg\n";
        let records = parse_premises(text);
        let simp: Vec<_> = records[0].dependencies.iter().filter(|d| d.is_simp).collect();
        assert_eq!(simp.len(), 1);
        assert_eq!(simp[0].name, "List.mem_toFinset");
        assert!(!simp[0].is_explicit);
    }

    #[test]
    fn test_premises_empty_input() {
        assert!(parse_premises("").is_empty());
        assert!(parse_premises("   \n\n  ").is_empty());
    }

    #[test]
    fn test_declaration_single_block() {
        let text = "---\ntheorem\nNat.add_comm\n∀ (n m : Nat), n + m = m + n\n";
        let records = parse_declaration_types(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, "theorem");
        assert_eq!(records[0].name, "Nat.add_comm");
        assert_eq!(records[0].type_signature, "∀ (n m : Nat), n + m = m + n");
    }

    #[test]
    fn test_declaration_multiline_signature() {
        let text = "---\ntheorem\nFoo.bar\n\n  ∀ {G : Type u} [inst : Group G],\n    1 * 1 = 1\n\n---\n";
        let records = parse_declaration_types(text);
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].type_signature,
            "  ∀ {G : Type u} [inst : Group G],\n    1 * 1 = 1"
        );
    }

    #[test]
    fn test_declaration_short_block_skipped() {
        let text = "---\ntheorem\nOnly.name\n---\ndef\nX.y\nNat\n";
        let records = parse_declaration_types(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "X.y");
    }

    #[test]
    fn test_load_records_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let premises = dir.path().join("premises.txt");
        std::fs::write(&premises, "---\nA\n").unwrap();
        let missing = dir.path().join("decl_types.txt");

        match load_records(&premises, &missing) {
            Err(GapError::MissingInput(path)) => assert_eq!(path, missing),
            other => panic!("expected MissingInput, got {:?}", other.map(|_| ())),
        }
    }
}
