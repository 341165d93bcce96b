//! Project configuration.
//!
//! Every field has a default; a YAML file passed with `--config` only needs
//! the keys it overrides:
//!
//! ```yaml
//! data_raw_dir: /srv/mathlib/raw
//! proof_local_retries: 2
//! verifier:
//!   trusted_local_run: true
//! llm:
//!   model_name: qwen2.5-math:7b
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use gapkit_core::gaps::evaluation::GoNoGoThresholds;
use gapkit_runtime::{VerifierConfig, DEFAULT_GRAPH_CACHE_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Declaration name prefixes of the algebra subset.
pub const ALGEBRA_NAME_PREFIXES: [&str; 16] = [
    "Algebra.",
    "CommRing.",
    "Field.",
    "Group.",
    "Ideal.",
    "LinearMap.",
    "Matrix.",
    "Module.",
    "MonoidHom.",
    "MulAction.",
    "Polynomial.",
    "Ring.",
    "RingHom.",
    "Subgroup.",
    "Submodule.",
    "Subring.",
];

/// Settings for Ollama inference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub ollama_base_url: String,
    pub model_name: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Extra requests per gap after an unparseable reply
    pub parse_retries: usize,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            model_name: "gpt-oss:20b".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            parse_retries: 2,
            timeout_secs: 120,
        }
    }
}

pub const DEFAULT_LEAN_PROJECT_DIR: &str = "lean/LeanExtract";

/// Project-wide configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub data_raw_dir: PathBuf,
    pub data_processed_dir: PathBuf,
    pub lean_project_dir: PathBuf,
    pub premises_file: String,
    pub decl_types_file: String,
    pub algebra_name_prefixes: Vec<String>,
    #[serde(flatten)]
    pub thresholds: GoNoGoThresholds,
    /// Per-attempt Lean timeout; overrides `verifier.timeout`
    pub lean_timeout_secs: u64,
    pub proof_local_retries: usize,
    pub graph_cache_size: usize,
    pub llm: LlmConfig,
    pub verifier: VerifierConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            data_raw_dir: PathBuf::from("data/raw"),
            data_processed_dir: PathBuf::from("data/processed"),
            lean_project_dir: PathBuf::from(DEFAULT_LEAN_PROJECT_DIR),
            premises_file: "premises.txt".to_string(),
            decl_types_file: "decl_types.txt".to_string(),
            algebra_name_prefixes: ALGEBRA_NAME_PREFIXES.iter().map(|p| p.to_string()).collect(),
            thresholds: GoNoGoThresholds::default(),
            lean_timeout_secs: 30,
            proof_local_retries: 3,
            graph_cache_size: DEFAULT_GRAPH_CACHE_SIZE,
            llm: LlmConfig::default(),
            verifier: VerifierConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Loads `path` if given, otherwise returns the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(gapkit_core::GapError::MissingInput(path.to_path_buf()).into());
                }
                Self::from_yaml_str(&fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.algebra_name_prefixes.is_empty() {
            return Err(AgentError::InvalidConfig(
                "algebra_name_prefixes must not be empty".to_string(),
            ));
        }
        if self.lean_timeout_secs == 0 {
            return Err(AgentError::InvalidConfig(
                "lean_timeout_secs must be positive".to_string(),
            ));
        }
        if self.proof_local_retries == 0 {
            return Err(AgentError::InvalidConfig(
                "proof_local_retries must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn premises_path(&self) -> PathBuf {
        self.data_raw_dir.join(&self.premises_file)
    }

    pub fn decl_types_path(&self) -> PathBuf {
        self.data_raw_dir.join(&self.decl_types_file)
    }

    /// Verifier settings with the project timeout applied.
    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            timeout: std::time::Duration::from_secs(self.lean_timeout_secs),
            ..self.verifier.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProjectConfig::default();
        assert_eq!(config.algebra_name_prefixes.len(), 16);
        assert_eq!(config.premises_path(), PathBuf::from("data/raw/premises.txt"));
        assert_eq!(config.thresholds.min_nontrivial_gaps, 20);
        assert_eq!(config.graph_cache_size, 8);
        assert_eq!(config.verifier.sandbox_command, vec!["nsjail"]);
        assert_eq!(config.llm.model_name, "gpt-oss:20b");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = "\
min_detection_rate: 0.1
proof_local_retries: 5
verifier:
  trusted_local_run: true
llm:
  temperature: 0.2
";
        let config = ProjectConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.thresholds.min_detection_rate, 0.1);
        assert_eq!(config.thresholds.min_top20_precision, 0.60);
        assert_eq!(config.proof_local_retries, 5);
        assert!(config.verifier.trusted_local_run);
        assert_eq!(config.verifier.max_stderr_chars, 4000);
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.llm.parse_retries, 2);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ProjectConfig::from_yaml_str("\n").unwrap(), ProjectConfig::default());
    }

    #[test]
    fn test_verifier_timeout_from_project() {
        let config = ProjectConfig {
            lean_timeout_secs: 12,
            ..ProjectConfig::default()
        };
        assert_eq!(config.verifier_config().timeout.as_secs(), 12);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ProjectConfig::load(Some(Path::new("/nonexistent/gapkit.yaml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/gapkit.yaml"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ProjectConfig::from_yaml_str("lean_timeout_secs: 0\n")
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidConfig(_)));
    }
}
