//! Configuration management for practice-audit
//!
//! Settings are loaded from environment variables with sensible defaults and
//! can be overridden by command-line flags before validation.
//!
//! # Environment Variables
//!
//! - `PRACTICE_AUDIT_PROVIDER`: LLM provider (ollama|openai|anthropic|gemini|xai|groq) - default: "ollama"
//! - `PRACTICE_AUDIT_MODEL`: Model name - default: "qwen2.5-coder:7b"
//! - `PRACTICE_AUDIT_REQUEST_TIMEOUT`: Timeout in seconds - default: "60"
//! - `PRACTICE_AUDIT_CACHE_PATH`: SQLite verdict cache - default: `<data dir>/practice-audit/cache.sqlite3`
//! - `PRACTICE_AUDIT_CODE_CHUNK_LINES`: Lines per primary code window - default: "500"
//! - `PRACTICE_AUDIT_ESCALATION_CHUNK_LINES`: Lines per escalation window - default: "50"
//! - `PRACTICE_AUDIT_PRACTICE_BATCH_SIZE`: Practices per evaluator call - default: "10"
//! - `PRACTICE_AUDIT_FILE_WORKERS`: Files analyzed concurrently - default: "3"
//! - `PRACTICE_AUDIT_CHUNK_WORKERS`: Evaluator calls in flight per file - default: "3"
//! - `PRACTICE_AUDIT_DOCS_DIR`: Documentation directory used for escalation context
//! - `PRACTICE_AUDIT_EXTENSIONS`: Comma-separated file extensions to analyze - default: "py"
//! - `PRACTICE_AUDIT_MAX_FILE_SIZE`: Skip files larger than this many bytes - default: "1048576"
//! - `PRACTICE_AUDIT_LOG_LEVEL`: Logging level - default: "info"
//!
//! Provider credentials (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `OLLAMA_HOST`, ...)
//! are read directly by the genai library.

use crate::analysis::AnalysisSettings;
use genai::adapter::AdapterKind;
use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5-coder:7b";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CODE_CHUNK_LINES: usize = 500;
const DEFAULT_ESCALATION_CHUNK_LINES: usize = 50;
const DEFAULT_PRACTICE_BATCH_SIZE: usize = 10;
const DEFAULT_FILE_WORKERS: usize = 3;
const DEFAULT_CHUNK_WORKERS: usize = 3;
const DEFAULT_EXTENSIONS: &str = "py";
const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid provider name
    #[error("Invalid provider: {0}. Valid options: ollama, openai, anthropic, gemini, xai, groq")]
    InvalidProvider(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Main configuration structure for practice-audit
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// LLM provider (from genai)
    pub provider: AdapterKind,

    /// Model name to use for inference (provider-specific)
    pub model: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Location of the durable verdict cache
    pub cache_path: PathBuf,

    pub code_chunk_lines: usize,
    pub escalation_chunk_lines: usize,
    pub practice_batch_size: usize,

    /// Outer bound: files analyzed at once
    pub file_workers: usize,

    /// Inner bound: evaluator calls in flight per file
    pub chunk_workers: usize,

    /// Documentation used when an `Unknown` verdict has no reference link
    pub docs_dir: Option<PathBuf>,

    /// File extensions (without dot) selected for analysis
    pub file_extensions: Vec<String>,

    pub max_file_size: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for AuditConfig {
    /// Loads from `PRACTICE_AUDIT_*` environment variables, falling back to defaults
    fn default() -> Self {
        let provider = env::var("PRACTICE_AUDIT_PROVIDER")
            .ok()
            .and_then(|s| parse_provider(&s).ok())
            .unwrap_or(AdapterKind::Ollama);

        let model = env::var("PRACTICE_AUDIT_MODEL")
            .ok()
            .unwrap_or_else(|| match provider {
                AdapterKind::Ollama => DEFAULT_OLLAMA_MODEL.to_string(),
                _ => "default-model".to_string(),
            });

        let request_timeout_secs =
            env_parse("PRACTICE_AUDIT_REQUEST_TIMEOUT").unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let cache_path = env::var("PRACTICE_AUDIT_CACHE_PATH")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(default_cache_path);

        let file_extensions = env::var("PRACTICE_AUDIT_EXTENSIONS")
            .unwrap_or_else(|_| DEFAULT_EXTENSIONS.to_string());

        let log_level = env::var("PRACTICE_AUDIT_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            provider,
            model,
            request_timeout_secs,
            cache_path,
            code_chunk_lines: env_parse("PRACTICE_AUDIT_CODE_CHUNK_LINES")
                .unwrap_or(DEFAULT_CODE_CHUNK_LINES),
            escalation_chunk_lines: env_parse("PRACTICE_AUDIT_ESCALATION_CHUNK_LINES")
                .unwrap_or(DEFAULT_ESCALATION_CHUNK_LINES),
            practice_batch_size: env_parse("PRACTICE_AUDIT_PRACTICE_BATCH_SIZE")
                .unwrap_or(DEFAULT_PRACTICE_BATCH_SIZE),
            file_workers: env_parse("PRACTICE_AUDIT_FILE_WORKERS").unwrap_or(DEFAULT_FILE_WORKERS),
            chunk_workers: env_parse("PRACTICE_AUDIT_CHUNK_WORKERS")
                .unwrap_or(DEFAULT_CHUNK_WORKERS),
            docs_dir: env::var("PRACTICE_AUDIT_DOCS_DIR").ok().map(PathBuf::from),
            file_extensions: parse_extensions(&file_extensions),
            max_file_size: env_parse("PRACTICE_AUDIT_MAX_FILE_SIZE")
                .unwrap_or(DEFAULT_MAX_FILE_SIZE),
            log_level,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("practice-audit")
        .join("cache.sqlite3")
}

/// Parses a provider name as accepted on the command line and in the environment
pub fn parse_provider(s: &str) -> Result<AdapterKind, ConfigError> {
    let lower = s.trim().to_lowercase();
    let normalized = match lower.as_str() {
        "claude" => "anthropic",
        "grok" => "xai",
        other => other,
    };
    AdapterKind::from_lower_str(normalized).ok_or_else(|| ConfigError::InvalidProvider(s.to_string()))
}

/// Splits `"py, .rs,ts"` into `["py", "rs", "ts"]`
pub fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

impl AuditConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationFailed` when a value is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout_secs > 600 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout cannot exceed 10 minutes".to_string(),
            ));
        }

        for (name, value) in [
            ("code_chunk_lines", self.code_chunk_lines),
            ("escalation_chunk_lines", self.escalation_chunk_lines),
            ("practice_batch_size", self.practice_batch_size),
            ("file_workers", self.file_workers),
            ("chunk_workers", self.chunk_workers),
        ] {
            if value == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }

        if self.file_workers > self.chunk_workers {
            return Err(ConfigError::ValidationFailed(format!(
                "file_workers ({}) must not exceed chunk_workers ({})",
                self.file_workers, self.chunk_workers
            )));
        }

        if self.file_extensions.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "At least one file extension is required".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// The subset of settings consumed by the analysis coordinators
    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings::new()
            .with_code_chunk_lines(self.code_chunk_lines)
            .with_escalation_chunk_lines(self.escalation_chunk_lines)
            .with_practice_batch_size(self.practice_batch_size)
            .with_file_workers(self.file_workers)
            .with_chunk_workers(self.chunk_workers)
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> std::collections::BTreeMap<String, String> {
        let mut map = std::collections::BTreeMap::new();

        map.insert("provider".to_string(), self.provider.as_str().to_string());
        map.insert("model".to_string(), self.model.clone());
        map.insert(
            "request_timeout_secs".to_string(),
            self.request_timeout_secs.to_string(),
        );
        map.insert(
            "cache_path".to_string(),
            self.cache_path.display().to_string(),
        );
        map.insert(
            "code_chunk_lines".to_string(),
            self.code_chunk_lines.to_string(),
        );
        map.insert(
            "escalation_chunk_lines".to_string(),
            self.escalation_chunk_lines.to_string(),
        );
        map.insert(
            "practice_batch_size".to_string(),
            self.practice_batch_size.to_string(),
        );
        map.insert("file_workers".to_string(), self.file_workers.to_string());
        map.insert("chunk_workers".to_string(), self.chunk_workers.to_string());
        if let Some(ref dir) = self.docs_dir {
            map.insert("docs_dir".to_string(), dir.display().to_string());
        }
        map.insert(
            "file_extensions".to_string(),
            self.file_extensions.join(","),
        );
        map.insert("max_file_size".to_string(), self.max_file_size.to_string());
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "practice-audit configuration:")?;
        writeln!(f, "  Provider: {}", self.provider.as_str())?;
        writeln!(f, "  Model: {}", self.model)?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(f, "  Cache Path: {}", self.cache_path.display())?;
        writeln!(
            f,
            "  Chunking: {} lines/window, {} lines/escalation window, {} practices/batch",
            self.code_chunk_lines, self.escalation_chunk_lines, self.practice_batch_size
        )?;
        writeln!(
            f,
            "  Workers: {} files x {} chunks",
            self.file_workers, self.chunk_workers
        )?;
        if let Some(ref dir) = self.docs_dir {
            writeln!(f, "  Docs Dir: {}", dir.display())?;
        }
        writeln!(f, "  Extensions: {}", self.file_extensions.join(", "))?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
