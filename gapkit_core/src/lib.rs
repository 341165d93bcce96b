//! gapkit core - analogical gap ranking over declaration dependency graphs.
//!
//! This crate holds everything that runs without external processes:
//!
//! - [`parser`]: the `premises` and `declaration_types` flat-file formats
//! - [`graph`]: [`DependencyGraph`], an immutable-after-build petgraph wrapper
//! - [`gaps`]: type-class compatibility, the [`AnalogicalGapDetector`], gap
//!   reports, label evaluation and seed scanning
//! - [`novelty`]: the layered [`NoveltyChecker`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use gapkit_core::{AnalogicalGapDetector, DependencyGraph, GapDetectorConfig};
//! use std::path::Path;
//!
//! # fn main() -> gapkit_core::Result<()> {
//! let (premises, decls) = gapkit_core::parser::load_records(
//!     Path::new("data/raw/premises.txt"),
//!     Path::new("data/raw/decl_types.txt"),
//! )?;
//! let graph = DependencyGraph::from_records(&premises, &decls);
//!
//! let detector = AnalogicalGapDetector::new(GapDetectorConfig::default());
//! for gap in detector.detect(&graph, Some(10)) {
//!     println!("{} -> {} ({:.3})", gap.source_decl, gap.missing_decl, gap.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod gaps;
pub mod graph;
pub mod novelty;
pub mod parser;
pub mod types;

pub use error::{GapError, Result};
pub use gaps::{AnalogicalGapDetector, GapCandidate, GapDetectorConfig, TypeClassCompatibility};
pub use graph::DependencyGraph;
pub use novelty::{NoveltyCheck, NoveltyChecker, NoveltyDecision, NoveltyReason};
pub use types::{DeclarationNode, DeclarationRecord, Dependency, DependencyEdge, PremisesRecord};
