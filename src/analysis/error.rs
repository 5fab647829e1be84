//! Error taxonomy for the analysis core
//!
//! Only [`CacheError`] is fatal for a run. Evaluation, parse and context
//! failures are absorbed at the task that produced them.

use crate::llm::BackendError;
use thiserror::Error;

/// The evaluator answered, but not in a shape we can use
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON {expected} found in response")]
    MissingPayload { expected: &'static str },

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),
}

/// A verdict evaluator call failed
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("LLM call failed: {0}")]
    Backend(#[from] BackendError),

    #[error("malformed evaluator response: {0}")]
    Parse(#[from] ParseError),
}

/// Supplementary context for an escalation could not be obtained
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("context unavailable for practice '{practice}': {reason}")]
    Unavailable { practice: String, reason: String },
}

impl ContextError {
    pub fn unavailable(practice: impl Into<String>, reason: impl Into<String>) -> Self {
        ContextError::Unavailable {
            practice: practice.into(),
            reason: reason.into(),
        }
    }
}

/// The durable verdict store failed
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to (de)serialize cached verdicts: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache connection lock poisoned")]
    Poisoned,

    #[error("Cache worker task failed: {0}")]
    TaskJoin(String),
}

/// Errors surfaced by the file and repository coordinators
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("verdict cache unavailable: {0}")]
    Cache(#[from] CacheError),

    #[error("cannot analyze {path}: {reason}")]
    FileSetup { path: String, reason: String },
}

impl AnalysisError {
    /// Fatal errors abort the whole run; the rest only drop one file
    pub fn is_fatal(&self) -> bool {
        matches!(self, AnalysisError::Cache(_))
    }
}
