//! practice-audit - LLM-assisted best-practice auditing for source repositories
//!
//! Every source file of a checkout is checked against a list of natural-language
//! best practices. The work fans out over files and, within a file, over code
//! windows and practice batches. Verdicts are memoized per (file content,
//! practice statement), so an unchanged file is never sent to the LLM twice.
//!
//! # Core Concepts
//!
//! - **Practices**: statements loaded from a plain-text or TOML document, some of
//!   them scoped to frameworks or keywords, some judged on the repository as a whole
//! - **Verdicts**: per-practice lists of `Violated` / `Not Violated` / `Not Relevant`
//!   / `Unknown` / `Skipped` records
//! - **Escalation**: an `Unknown` verdict is re-evaluated at most once per
//!   (practice, file) with documentation context in small windows
//! - **Report**: violations only, keyed by file path and practice statement
//!
//! # Example Usage
//!
//! ```ignore
//! use practice_audit::analysis::*;
//! use practice_audit::practice::PracticeLoader;
//! use std::sync::Arc;
//!
//! async fn audit(files: FileAnalysisCoordinator, work: Vec<FileWork>) -> anyhow::Result<()> {
//!     let catalog = PracticeLoader::new("practices.txt").load()?;
//!     let outcome = RepoAnalysisCoordinator::new(files)
//!         .run("/path/to/repo", work, &catalog, None)
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&outcome.report)?);
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod llm;
pub mod plan;
pub mod practice;
pub mod progress;
pub mod util;
pub mod workspace;

pub use analysis::{
    AnalysisError, AnalysisOutcome, AnalysisReport, AnalysisSettings, FileAnalysisCoordinator,
    FileTarget, FileWork, RepoAnalysisCoordinator, VerdictRecord, VerdictStatus,
};
pub use config::{AuditConfig, ConfigError};
pub use llm::{BackendError, LLMClient};
pub use practice::{Practice, PracticeLoader, PracticeSet};
pub use util::{init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
