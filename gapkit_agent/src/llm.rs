//! Ollama-backed conjecture generator.

use std::sync::LazyLock;
use std::time::Duration;

use gapkit_core::GapCandidate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::LlmConfig;
use crate::conjecture::{gap_metadata, ranked_gaps, ConjectureCandidate, ConjectureGenerator};
use crate::error::{AgentError, Result};

const SYSTEM_PROMPT: &str = "\
You are a mathematical conjecture generator for Lean 4 and Mathlib.
Given a gap between algebraic families, produce a precise Lean 4 theorem or lemma
statement that would fill the gap. Output ONLY valid Lean 4 code.
Do NOT include import statements. Include the proof using `sorry` as placeholder.
";

const REPAIR_PROMPT: &str = "Your response did not contain a valid Lean 4 theorem or lemma \
declaration. Please output ONLY a single theorem/lemma statement with `:= by sorry` proof.";

// Stops at the first `:=` or `where`, so a literal `:=` inside a type
// signature truncates the statement.
static DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)((?:theorem|lemma)\s+\S+.*?)(?:\s*:=|\s+where\b)")
        .expect("declaration pattern is valid")
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// One round trip to a chat model.
pub trait ChatTransport {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// Blocking client for Ollama's `/api/chat` endpoint.
pub struct OllamaTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl OllamaTransport {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| AgentError::Llm(format!("client setup failed: {}", err)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/chat", config.ollama_base_url.trim_end_matches('/')),
            model: config.model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    content: String,
}

impl ChatTransport for OllamaTransport {
    fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens,
            },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|err| AgentError::Llm(format!("request failed: {}", err)))?;

        let status = response.status();
        let body_text = response
            .text()
            .map_err(|err| AgentError::Llm(format!("response read failed: {}", err)))?;
        if !status.is_success() {
            return Err(AgentError::Llm(format!("status {}: {}", status, body_text)));
        }

        let parsed: OllamaChatResponse = serde_json::from_str(&body_text)
            .map_err(|err| AgentError::Llm(format!("unexpected response format: {}", err)))?;
        Ok(parsed.message.content)
    }
}

/// Extracts `theorem`/`lemma` statements, dropping everything from `:=` or `where`.
pub fn parse_lean_statements(raw: &str) -> Vec<String> {
    DECL_RE
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Asks a chat model for one statement per gap, with repair retries.
pub struct OllamaConjectureGenerator<T = OllamaTransport> {
    transport: T,
    model_id: String,
    temperature: f64,
    parse_retries: usize,
}

impl OllamaConjectureGenerator<OllamaTransport> {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self::with_transport(config, OllamaTransport::new(config)?))
    }
}

impl<T: ChatTransport> OllamaConjectureGenerator<T> {
    pub fn with_transport(config: &LlmConfig, transport: T) -> Self {
        Self {
            transport,
            model_id: config.model_name.clone(),
            temperature: config.temperature,
            parse_retries: config.parse_retries,
        }
    }

    fn build_messages(gap: &GapCandidate) -> Vec<ChatMessage> {
        let user = format!(
            "Generate a Lean 4 theorem statement for the missing declaration: {missing}\n\
             \n\
             Context:\n\
             - Source declaration: {source}\n\
             - Target family: {family}\n\
             - Gap score: {score:.4}\n\
             - Signals: {signals:?}\n\
             \n\
             The source declaration {source} exists but {missing} does not. Write a plausible \
             Lean 4 theorem or lemma that would fill this gap, using appropriate type class \
             assumptions for the {family} family.",
            missing = gap.missing_decl,
            source = gap.source_decl,
            family = gap.target_family,
            score = gap.score,
            signals = gap.signals,
        );
        vec![ChatMessage::new("system", SYSTEM_PROMPT), ChatMessage::new("user", user)]
    }

    fn generate_for_gap(&self, gap: &GapCandidate) -> Option<ConjectureCandidate> {
        let mut messages = Self::build_messages(gap);
        let attempts = 1 + self.parse_retries;

        for attempt in 1..=attempts {
            let content = match self.transport.chat(&messages) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(gap = %gap.missing_decl, attempt, attempts, error = %e, "LLM request failed");
                    continue;
                }
            };

            if let Some(statement) = parse_lean_statements(&content).into_iter().next() {
                return Some(ConjectureCandidate {
                    gap_missing_decl: gap.missing_decl.clone(),
                    lean_statement: statement,
                    rationale: format!(
                        "LLM-generated conjecture for {} via analogy from {} to {}.",
                        gap.missing_decl, gap.source_decl, gap.target_family
                    ),
                    model_id: self.model_id.clone(),
                    temperature: self.temperature,
                    metadata: gap_metadata(gap),
                });
            }

            tracing::info!(gap = %gap.missing_decl, attempt, attempts, "no parseable Lean statement, retrying");
            messages.push(ChatMessage::new("assistant", content));
            messages.push(ChatMessage::new("user", REPAIR_PROMPT));
        }

        tracing::warn!(gap = %gap.missing_decl, attempts, "no conjecture generated");
        None
    }
}

impl<T: ChatTransport> ConjectureGenerator for OllamaConjectureGenerator<T> {
    fn generate(&self, gaps: &[GapCandidate], max_candidates: usize) -> Vec<ConjectureCandidate> {
        let mut candidates = Vec::new();
        if max_candidates == 0 {
            return candidates;
        }
        for gap in ranked_gaps(gaps) {
            if candidates.len() >= max_candidates {
                break;
            }
            if let Some(candidate) = self.generate_for_gap(gap) {
                candidates.push(candidate);
            }
        }
        candidates
    }
}
