//! gapkit runtime layer - graph caching and sandboxed verification.
//!
//! This crate provides the process-facing services used by the discovery
//! cycle:
//!
//! - [`GraphCache`]: bounded LRU of parsed dependency graphs keyed by file stamps
//! - [`CommandRunner`]: subprocess execution with a hard timeout
//! - [`SandboxedVerifier`]: gated Lean verification of candidate proofs
//!
//! # Examples
//!
//! ```rust,no_run
//! use gapkit_runtime::{SandboxedVerifier, Verifier, VerifierConfig};
//!
//! # fn main() -> gapkit_runtime::Result<()> {
//! let verifier = SandboxedVerifier::new(VerifierConfig::default())?;
//! let status = verifier.runtime_status();
//! if status.runtime_ready {
//!     let result = verifier.verify("theorem t : True", "by\n  trivial");
//!     println!("success: {}", result.success);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod runner;
pub mod verifier;

pub use cache::{GraphCache, GraphCacheKey, DEFAULT_GRAPH_CACHE_SIZE};
pub use error::{Result, RuntimeError};
pub use runner::{CommandOutput, CommandRunner, LeanRunner};
pub use verifier::{
    RuntimeStatus, SandboxedVerifier, VerificationMode, VerificationResult, Verifier, VerifierConfig,
    REJECTION_PREFIX,
};
