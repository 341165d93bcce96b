//! Type-class requirements extracted from Lean 4 signatures.
//!
//! Only instance brackets are recognized: `[inst : ClassName args]` and
//! `[ClassName args]`. Implicit binders such as `{R : Type u}` are ignored.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use regex::Regex;

static INSTANCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?:\w+\s*:\s*)?((?:[A-Z]\w*\.)*[A-Z]\w*)(?:\s[^\]]*?)?\]")
        .expect("instance bracket pattern is valid")
});

/// Classes every family is assumed to provide.
pub const UNIVERSAL_CLASSES: &[&str] = &[
    "DecidableEq",
    "Fintype",
    "Inhabited",
    "Repr",
    "ToString",
    "BEq",
    "Hashable",
    "Nonempty",
    "Decidable",
];

const GROUP_PROVIDES: &[&str] = &[
    "Group",
    "Monoid",
    "Semigroup",
    "MulOneClass",
    "AddGroup",
    "AddMonoid",
    "AddSemigroup",
    "AddCommGroup",
    "CommGroup",
    "Inv",
    "Neg",
];

const RING_PROVIDES: &[&str] = &[
    "Ring",
    "CommRing",
    "Semiring",
    "CommSemiring",
    "Group",
    "CommGroup",
    "Monoid",
    "Semigroup",
    "MulOneClass",
    "AddGroup",
    "AddMonoid",
    "AddSemigroup",
    "AddCommGroup",
    "AddCommMonoid",
    // a ring is a module over itself
    "Module",
    "Algebra",
    "Inv",
    "Neg",
];

const MODULE_PROVIDES: &[&str] = &[
    "Module",
    "Semiring",
    "CommSemiring",
    "Ring",
    "CommRing",
    "AddCommMonoid",
    "AddCommGroup",
    "AddMonoid",
    "AddSemigroup",
];

/// Returns the set of class names bound in instance brackets.
pub fn extract_required_classes(signature: &str) -> BTreeSet<String> {
    INSTANCE_RE
        .captures_iter(signature)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Family prefix to provided-capability table.
#[derive(Clone, Debug)]
pub struct TypeClassCompatibility {
    provided: HashMap<String, BTreeSet<String>>,
}

impl Default for TypeClassCompatibility {
    fn default() -> Self {
        let mut compat = Self::empty();
        compat.insert_family("Group.", GROUP_PROVIDES.iter().copied());
        compat.insert_family("Ring.", RING_PROVIDES.iter().copied());
        compat.insert_family("Module.", MODULE_PROVIDES.iter().copied());
        compat
    }
}

impl TypeClassCompatibility {
    pub fn empty() -> Self {
        Self {
            provided: HashMap::new(),
        }
    }

    /// Registers (or replaces) the classes a family provides.
    pub fn insert_family<'a>(&mut self, prefix: &str, classes: impl IntoIterator<Item = &'a str>) {
        self.provided.insert(
            prefix.to_string(),
            classes.into_iter().map(str::to_string).collect(),
        );
    }

    pub fn provided_by(&self, family: &str) -> Option<&BTreeSet<String>> {
        self.provided.get(family)
    }

    /// Checks how much of `required` the target family provides.
    ///
    /// Universal classes are ignored. Returns `(all_satisfied, ratio)`:
    /// nothing relevant required gives `(true, 1.0)`, an unknown family
    /// gives `(false, 0.0)`.
    pub fn can_satisfy(&self, required: &BTreeSet<String>, target_family: &str) -> (bool, f64) {
        let relevant: Vec<&String> = required
            .iter()
            .filter(|cls| !UNIVERSAL_CLASSES.contains(&cls.as_str()))
            .collect();
        if relevant.is_empty() {
            return (true, 1.0);
        }

        let Some(provided) = self.provided.get(target_family) else {
            return (false, 0.0);
        };

        let satisfied = relevant.iter().filter(|cls| provided.contains(**cls)).count();
        let ratio = satisfied as f64 / relevant.len() as f64;
        (satisfied == relevant.len(), ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_named_instance() {
        let sig = "∀ {R : Type u_1} [inst : Semiring R] (x : R), x * 1 = x";
        assert_eq!(extract_required_classes(sig), set(&["Semiring"]));
    }

    #[test]
    fn test_anonymous_and_mixed_instances() {
        let sig = "∀ {R : Type u_1} {M : Type u_2} [inst : Semiring R] [Module R M], ...";
        assert_eq!(extract_required_classes(sig), set(&["Module", "Semiring"]));
    }

    #[test]
    fn test_dotted_class_name() {
        let sig = "∀ {C : Type u_1} [inst : CategoryTheory.Category C], ...";
        assert_eq!(
            extract_required_classes(sig),
            set(&["CategoryTheory.Category"])
        );
    }

    #[test]
    fn test_implicit_binders_ignored() {
        assert!(extract_required_classes("∀ {R : Type u_1} {M : Type u_2}, ...").is_empty());
        assert!(extract_required_classes("∀ (n m : Nat), n + m = m + n").is_empty());
        assert!(extract_required_classes("").is_empty());
    }

    #[test]
    fn test_repeated_class_collapses() {
        let sig = "∀ {R : Type u_1} [inst : Ring R] [inst2 : Ring S], ...";
        assert_eq!(extract_required_classes(sig), set(&["Ring"]));
    }

    #[test]
    fn test_ring_satisfies_group_and_module() {
        let compat = TypeClassCompatibility::default();
        assert_eq!(compat.can_satisfy(&set(&["Group"]), "Ring."), (true, 1.0));
        assert_eq!(compat.can_satisfy(&set(&["Module"]), "Ring."), (true, 1.0));
    }

    #[test]
    fn test_group_cannot_satisfy_module() {
        let compat = TypeClassCompatibility::default();
        let (ok, ratio) = compat.can_satisfy(&set(&["Module"]), "Group.");
        assert!(!ok);
        assert!(ratio < 0.5);
    }

    #[test]
    fn test_partial_satisfaction_ratio() {
        let compat = TypeClassCompatibility::default();
        let (ok, ratio) = compat.can_satisfy(&set(&["Group", "Module"]), "Group.");
        assert!(!ok);
        assert!((ratio - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_universal_classes_ignored() {
        let compat = TypeClassCompatibility::default();
        assert_eq!(
            compat.can_satisfy(&set(&["DecidableEq", "Fintype", "Group"]), "Ring."),
            (true, 1.0)
        );
        assert_eq!(
            compat.can_satisfy(&set(&["DecidableEq", "Fintype"]), "Unknown."),
            (true, 1.0)
        );
        assert_eq!(compat.can_satisfy(&BTreeSet::new(), "Group."), (true, 1.0));
    }

    #[test]
    fn test_unknown_family() {
        let compat = TypeClassCompatibility::default();
        assert_eq!(
            compat.can_satisfy(&set(&["Group"]), "UnknownFamily."),
            (false, 0.0)
        );
    }
}
