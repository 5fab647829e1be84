//! Context providers for escalation
//!
//! Practices with a reference link are grounded on that page; the rest fall
//! back to a local documentation index. Either way the LLM condenses the most
//! relevant passages into a short brief for the window evaluator.

use super::error::ContextError;
use super::escalation::EscalationContextProvider;
use super::prompt;
use crate::llm::{LLMClient, LLMRequest};
use crate::practice::Practice;
use anyhow::{Context, Result};
use async_trait::async_trait;
use ignore::WalkBuilder;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_PASSAGE_WORDS: usize = 120;
const DEFAULT_TOP_K: usize = 4;
const DOC_EXTENSIONS: [&str; 6] = ["md", "markdown", "txt", "rst", "html", "htm"];

/// A slice of documentation text and where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub source: String,
    pub text: String,
}

fn script_or_style() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid regex")
    })
}

fn any_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]+>").expect("valid regex"))
}

/// Reduces an HTML page to its visible text
pub fn strip_markup(html: &str) -> String {
    let without_code = script_or_style().replace_all(html, " ");
    let text = any_tag().replace_all(&without_code, " ");
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Consecutive windows of `words` words
pub fn split_passages(text: &str, words: usize) -> Vec<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    tokens
        .chunks(words.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// Orders passages by how many query terms they share; zero-overlap
/// passages are dropped and ties keep document order.
pub fn rank_passages<'a>(passages: &'a [Passage], query: &str, top_k: usize) -> Vec<&'a Passage> {
    let query_terms = terms(query);
    let mut scored: Vec<(usize, usize, &Passage)> = passages
        .iter()
        .enumerate()
        .map(|(idx, passage)| {
            let overlap = terms(&passage.text).intersection(&query_terms).count();
            (overlap, idx, passage)
        })
        .filter(|(overlap, _, _)| *overlap > 0)
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().take(top_k).map(|(_, _, p)| p).collect()
}

/// Passages built from a local documentation directory
#[derive(Debug, Clone, Default)]
pub struct DocumentationIndex {
    passages: Vec<Passage>,
}

impl DocumentationIndex {
    pub fn from_passages(passages: Vec<Passage>) -> Self {
        Self { passages }
    }

    /// Indexes every markdown, text, reStructuredText and HTML file under `dir`
    pub fn build(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            anyhow::bail!("Documentation directory does not exist: {}", dir.display());
        }

        let mut passages = Vec::new();
        let mut files = 0usize;

        for result in WalkBuilder::new(dir).build() {
            let entry = match result {
                Ok(e) => e,
                Err(err) => {
                    warn!(error = %err, "Failed to read documentation entry");
                    continue;
                }
            };
            let path = entry.path();
            let is_doc = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| DOC_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if !path.is_file() || !is_doc {
                continue;
            }

            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let text = if matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("html") | Some("htm")
            ) {
                strip_markup(&raw)
            } else {
                raw
            };

            let source = path
                .strip_prefix(dir)
                .unwrap_or(path)
                .display()
                .to_string();
            passages.extend(
                split_passages(&text, DEFAULT_PASSAGE_WORDS)
                    .into_iter()
                    .map(|text| Passage {
                        source: source.clone(),
                        text,
                    }),
            );
            files += 1;
        }

        info!(
            files,
            passages = passages.len(),
            "Built documentation index from {}",
            dir.display()
        );
        Ok(Self { passages })
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    pub fn query(&self, statement: &str, top_k: usize) -> Vec<&Passage> {
        rank_passages(&self.passages, statement, top_k)
    }
}

/// Condenses passages into a brief via the LLM
#[derive(Clone)]
pub struct ContextSynthesizer {
    client: Arc<dyn LLMClient>,
}

impl ContextSynthesizer {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }

    pub async fn synthesize(
        &self,
        practice: &Practice,
        passages: &[&str],
    ) -> Result<String, ContextError> {
        if passages.is_empty() {
            return Err(ContextError::unavailable(
                &practice.id,
                "no relevant documentation passages",
            ));
        }

        let request = LLMRequest::review(
            prompt::CONTEXT_SYSTEM_PROMPT,
            prompt::context_prompt(practice, passages),
            1024,
        );

        let response = self
            .client
            .chat(request)
            .await
            .map_err(|e| ContextError::unavailable(&practice.id, e.to_string()))?;

        let brief = response.content.trim();
        if brief.is_empty() || brief.eq_ignore_ascii_case("error") {
            return Err(ContextError::unavailable(
                &practice.id,
                "documentation does not cover this practice",
            ));
        }

        debug!(practice = %practice.id, chars = brief.len(), "Synthesized context");
        Ok(brief.to_string())
    }
}

/// Grounds a practice on the page its `reference` points at
pub struct ReferenceContextProvider {
    http: reqwest::Client,
    synthesizer: ContextSynthesizer,
    top_k: usize,
}

impl ReferenceContextProvider {
    pub fn new(synthesizer: ContextSynthesizer, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            synthesizer,
            top_k: DEFAULT_TOP_K,
        })
    }

    async fn fetch(&self, practice: &Practice, url: &str) -> Result<String, ContextError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ContextError::unavailable(&practice.id, format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(ContextError::unavailable(
                &practice.id,
                format!("{} returned {}", url, response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ContextError::unavailable(&practice.id, e.to_string()))?;
        Ok(strip_markup(&body))
    }
}

#[async_trait]
impl EscalationContextProvider for ReferenceContextProvider {
    async fn get_context(&self, practice: &Practice) -> Result<String, ContextError> {
        let url = practice
            .reference
            .as_deref()
            .ok_or_else(|| ContextError::unavailable(&practice.id, "practice has no reference"))?;

        let text = self.fetch(practice, url).await?;
        let passages: Vec<Passage> = split_passages(&text, DEFAULT_PASSAGE_WORDS)
            .into_iter()
            .map(|text| Passage {
                source: url.to_string(),
                text,
            })
            .collect();

        let mut selected: Vec<&str> = rank_passages(&passages, &practice.statement, self.top_k)
            .into_iter()
            .map(|p| p.text.as_str())
            .collect();
        if selected.is_empty() {
            selected = passages.iter().take(self.top_k).map(|p| p.text.as_str()).collect();
        }

        self.synthesizer.synthesize(practice, &selected).await
    }
}

/// Grounds a practice on the local documentation index
pub struct IndexContextProvider {
    index: Arc<DocumentationIndex>,
    synthesizer: ContextSynthesizer,
    top_k: usize,
}

impl IndexContextProvider {
    pub fn new(index: Arc<DocumentationIndex>, synthesizer: ContextSynthesizer) -> Self {
        Self {
            index,
            synthesizer,
            top_k: DEFAULT_TOP_K,
        }
    }
}

#[async_trait]
impl EscalationContextProvider for IndexContextProvider {
    async fn get_context(&self, practice: &Practice) -> Result<String, ContextError> {
        if self.index.is_empty() {
            return Err(ContextError::unavailable(
                &practice.id,
                "documentation index is empty",
            ));
        }

        let selected: Vec<&str> = self
            .index
            .query(&practice.statement, self.top_k)
            .into_iter()
            .map(|p| p.text.as_str())
            .collect();
        self.synthesizer.synthesize(practice, &selected).await
    }
}

/// Reference first when the practice has one, otherwise the index
pub struct LayeredContextProvider {
    reference: Option<ReferenceContextProvider>,
    index: Option<IndexContextProvider>,
}

impl LayeredContextProvider {
    pub fn new(
        reference: Option<ReferenceContextProvider>,
        index: Option<IndexContextProvider>,
    ) -> Self {
        Self { reference, index }
    }
}

#[async_trait]
impl EscalationContextProvider for LayeredContextProvider {
    async fn get_context(&self, practice: &Practice) -> Result<String, ContextError> {
        match (&practice.reference, &self.reference, &self.index) {
            (Some(_), Some(reference), _) => reference.get_context(practice).await,
            (_, _, Some(index)) => index.get_context(practice).await,
            _ => Err(ContextError::unavailable(
                &practice.id,
                "no reference link and no documentation index configured",
            )),
        }
    }
}
