//! Core value types shared by the analysis coordinators

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of judging one practice against one piece of code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerdictStatus {
    Violated,
    #[serde(rename = "Not Violated", alias = "NotViolated")]
    NotViolated,
    #[serde(rename = "Not Relevant", alias = "NotRelevant")]
    NotRelevant,
    Unknown,
    Skipped,
}

impl VerdictStatus {
    /// Parses the loose spellings models produce (`"not violated"`, `"Not_Relevant"`,
    /// `"VIOLATED"`). Anything unrecognised is treated as `Unknown` so it goes
    /// through escalation instead of being trusted.
    pub fn parse_lenient(raw: &str) -> Self {
        let folded: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match folded.as_str() {
            "violated" => VerdictStatus::Violated,
            "notviolated" => VerdictStatus::NotViolated,
            "notrelevant" => VerdictStatus::NotRelevant,
            "skipped" => VerdictStatus::Skipped,
            _ => VerdictStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Violated => "Violated",
            VerdictStatus::NotViolated => "Not Violated",
            VerdictStatus::NotRelevant => "Not Relevant",
            VerdictStatus::Unknown => "Unknown",
            VerdictStatus::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single verdict, optionally pointing at the offending code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictRecord {
    pub status: VerdictStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl VerdictRecord {
    pub fn new(status: VerdictStatus) -> Self {
        Self {
            status,
            code_snippet: None,
            suggestion: None,
        }
    }

    pub fn violated(code_snippet: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            status: VerdictStatus::Violated,
            code_snippet: Some(code_snippet.into()),
            suggestion: Some(suggestion.into()),
        }
    }

    pub fn unknown() -> Self {
        Self::new(VerdictStatus::Unknown)
    }

    pub fn skipped() -> Self {
        Self::new(VerdictStatus::Skipped)
    }

    pub fn with_code_snippet(mut self, code_snippet: impl Into<String>) -> Self {
        self.code_snippet = Some(code_snippet.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn is_violation(&self) -> bool {
        self.status == VerdictStatus::Violated
    }
}

/// Verdict lists for one file, keyed by practice id
pub type PracticeVerdicts = BTreeMap<String, Vec<VerdictRecord>>;

/// A file under analysis. The content is read once and never re-read during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub path: String,
    pub content: String,
}

impl FileTarget {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Project-wide facts handed to every evaluator call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    #[serde(default)]
    pub frameworks: Vec<String>,
}

impl ProjectMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frameworks: Vec::new(),
        }
    }

    pub fn with_frameworks(mut self, frameworks: Vec<String>) -> Self {
        self.frameworks = frameworks;
        self
    }

    /// Human-readable framework list for prompts
    pub fn frameworks_label(&self) -> String {
        if self.frameworks.is_empty() {
            "not specified".to_string()
        } else {
            self.frameworks.join(", ")
        }
    }
}
