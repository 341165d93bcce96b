//! Record types shared by the parsers, the graph and the detector.

use serde::{Deserialize, Serialize};

/// One dependency mention inside a premises block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Name of the declaration that is depended upon
    pub name: String,
    /// Mentioned explicitly in the proof term
    pub is_explicit: bool,
    /// Used by the simplifier
    pub is_simp: bool,
}

/// A declaration and everything its proof mentions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremisesRecord {
    pub name: String,
    pub dependencies: Vec<Dependency>,
}

/// Kind, name and type signature of one declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRecord {
    pub kind: String,
    pub name: String,
    pub type_signature: String,
}

/// Node payload of the dependency graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationNode {
    pub name: String,
    /// Absent for nodes only known as a dependency target
    pub kind: Option<String>,
    pub type_signature: Option<String>,
}

impl DeclarationNode {
    /// Creates a bare node with no kind or signature.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: None,
            type_signature: None,
        }
    }
}

/// Edge payload of the dependency graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub is_explicit: bool,
    pub is_simp: bool,
}

impl From<&Dependency> for DependencyEdge {
    fn from(dep: &Dependency) -> Self {
        Self {
            is_explicit: dep.is_explicit,
            is_simp: dep.is_simp,
        }
    }
}
