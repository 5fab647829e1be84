//! Best practices: the model and how practice documents are loaded

mod loader;

pub use loader::{parse_manifest, parse_plain_text, PracticeLoader};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PracticeError {
    #[error("Failed to read practices from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid practice manifest: {0}")]
    Manifest(#[from] toml::de::Error),

    #[error("No best practices found in {0}")]
    NoPracticeFound(String),
}

/// A single best practice. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Practice {
    pub id: String,
    pub statement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub is_repo_level: bool,
    #[serde(default)]
    pub applicable_frameworks: BTreeSet<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Practice {
    pub fn new(id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            statement: statement.into(),
            reference: None,
            is_repo_level: false,
            applicable_frameworks: BTreeSet::new(),
            keywords: Vec::new(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn repo_level(mut self) -> Self {
        self.is_repo_level = true;
        self
    }

    pub fn with_frameworks<I, S>(mut self, frameworks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.applicable_frameworks = frameworks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// A practice with no framework restriction applies to every project, and
    /// a project with no declared frameworks is checked against everything.
    pub fn applies_to(&self, project_frameworks: &[String]) -> bool {
        if self.applicable_frameworks.is_empty() || project_frameworks.is_empty() {
            return true;
        }
        self.applicable_frameworks.iter().any(|wanted| {
            project_frameworks
                .iter()
                .any(|have| have.eq_ignore_ascii_case(wanted))
        })
    }

    /// True when the practice has no keywords or `content` mentions one of them
    pub fn mentioned_in(&self, content: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let haystack = content.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| haystack.contains(&keyword.to_lowercase()))
    }
}

/// Loaded practices in document order, with unique ids
#[derive(Debug, Clone, Default)]
pub struct PracticeSet {
    practices: Vec<Arc<Practice>>,
    by_id: HashMap<String, usize>,
}

impl PracticeSet {
    /// Builds the set, appending `_` to colliding ids until each is unique
    pub fn new(practices: Vec<Practice>) -> Self {
        let mut set = Self::default();
        for mut practice in practices {
            if set.by_id.contains_key(&practice.id) {
                let original = practice.id.clone();
                practice.id = disambiguate_id(&original, |candidate| {
                    set.by_id.contains_key(candidate)
                });
                debug!("Practice id '{}' already taken, using '{}'", original, practice.id);
            }
            set.by_id.insert(practice.id.clone(), set.practices.len());
            set.practices.push(Arc::new(practice));
        }
        set
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Practice>> {
        self.by_id.get(id).map(|&idx| &self.practices[idx])
    }

    pub fn statement_for(&self, id: &str) -> Option<&str> {
        self.get(id).map(|p| p.statement.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Practice>> {
        self.practices.iter()
    }

    pub fn len(&self) -> usize {
        self.practices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.practices.is_empty()
    }

    pub fn code_level(&self) -> Vec<Arc<Practice>> {
        self.practices
            .iter()
            .filter(|p| !p.is_repo_level)
            .cloned()
            .collect()
    }

    pub fn repo_level(&self) -> Vec<Arc<Practice>> {
        self.practices
            .iter()
            .filter(|p| p.is_repo_level)
            .cloned()
            .collect()
    }
}

pub(crate) fn disambiguate_id(base: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut candidate = base.to_string();
    loop {
        candidate.push('_');
        if !taken(&candidate) {
            return candidate;
        }
    }
}
