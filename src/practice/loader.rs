use super::{Practice, PracticeError, PracticeSet};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Loads a practice document from disk.
///
/// `.toml` files are read as a `[[practice]]` manifest; anything else is
/// treated as a plain-text document of `Practice <n>.` entries.
pub struct PracticeLoader {
    path: PathBuf,
}

impl PracticeLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<PracticeSet, PracticeError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| PracticeError::Io {
            path: self.path.clone(),
            source,
        })?;

        let practices = if is_manifest(&self.path) {
            parse_manifest(&raw)?
        } else {
            parse_plain_text(&raw)
        };

        if practices.is_empty() {
            return Err(PracticeError::NoPracticeFound(
                self.path.display().to_string(),
            ));
        }

        let set = PracticeSet::new(practices);
        info!(
            "Loaded {} practices ({} repo-level) from {}",
            set.len(),
            set.repo_level().len(),
            self.path.display()
        );
        Ok(set)
    }
}

fn is_manifest(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false)
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default, rename = "practice")]
    practices: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: Option<String>,
    statement: String,
    reference: Option<String>,
    #[serde(default)]
    repo_level: bool,
    #[serde(default)]
    frameworks: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

pub fn parse_manifest(raw: &str) -> Result<Vec<Practice>, PracticeError> {
    let manifest: Manifest = toml::from_str(raw)?;

    Ok(manifest
        .practices
        .into_iter()
        .filter(|entry| !entry.statement.trim().is_empty())
        .map(|entry| {
            let statement = entry.statement.trim().to_string();
            let id = entry
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| slug_id(&statement));
            let mut practice = Practice::new(id, statement)
                .with_frameworks(entry.frameworks)
                .with_keywords(entry.keywords);
            practice.reference = entry.reference.filter(|r| !r.trim().is_empty());
            practice.is_repo_level = entry.repo_level;
            practice
        })
        .collect())
}

fn practice_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)\bpractice\s+\d+\s*[.)]").expect("practice marker regex is valid")
    })
}

/// Parses `Practice <n>.` blocks.
///
/// Within a block, lines starting with `Reference:`, `Scope:`, `Frameworks:`,
/// `Keywords:` or `Id:` carry metadata; every other line is statement text.
pub fn parse_plain_text(raw: &str) -> Vec<Practice> {
    practice_marker()
        .split(raw)
        .skip(1)
        .filter_map(parse_block)
        .collect()
}

fn parse_block(block: &str) -> Option<Practice> {
    let mut statement_lines = Vec::new();
    let mut id = None;
    let mut reference = None;
    let mut repo_level = false;
    let mut frameworks = Vec::new();
    let mut keywords = Vec::new();

    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match split_metadata(line) {
            Some(("reference", value)) => reference = Some(value.to_string()),
            Some(("scope", value)) => repo_level = is_repository_scope(value),
            Some(("frameworks", value)) => frameworks = split_list(value),
            Some(("keywords", value)) => keywords = split_list(value),
            Some(("id", value)) => id = Some(value.to_string()),
            _ => statement_lines.push(line),
        }
    }

    let statement = statement_lines.join(" ");
    if statement.is_empty() {
        warn!("Skipping practice entry without a statement");
        return None;
    }

    let id = id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| slug_id(&statement));
    let mut practice = Practice::new(id, statement)
        .with_frameworks(frameworks)
        .with_keywords(keywords);
    practice.reference = reference.filter(|r| !r.is_empty());
    practice.is_repo_level = repo_level;
    Some(practice)
}

fn split_metadata(line: &str) -> Option<(&'static str, &str)> {
    const KEYS: [&str; 5] = ["reference", "scope", "frameworks", "keywords", "id"];

    let (key, value) = line.split_once(':')?;
    let key = key.trim().to_ascii_lowercase();
    KEYS.iter()
        .find(|known| **known == key)
        .map(|known| (*known, value.trim()))
}

fn is_repository_scope(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "repository" | "repo" | "repo-level" | "project"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// `"Use context managers for files."` -> `"use_context_managers_for"`
fn slug_id(statement: &str) -> String {
    let words: Vec<String> = statement
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .take(4)
        .map(|w| w.to_ascii_lowercase())
        .collect();

    if words.is_empty() {
        "practice".to_string()
    } else {
        words.join("_")
    }
}
