//! The memoized, concurrent analysis core
//!
//! A run fans out over files (outer pool), and within each file over
//! code windows × practice batches (inner pool). Verdict lists are memoized in
//! a content-addressed [`ContentCache`], `Unknown` verdicts are escalated at
//! most once per (practice, file) through the [`EscalationResolver`], and the
//! merged verdicts are finalized into an [`AnalysisReport`] of violations.

pub mod cache;
pub mod chunker;
pub mod context;
pub mod error;
pub mod escalation;
pub mod evaluator;
pub mod file;
pub mod pool;
pub mod prompt;
pub mod repo;
pub mod repo_level;
pub mod report;
pub mod response;
pub mod settings;
pub mod types;

pub use cache::{content_digest, CacheKey, ContentCache, MemoryContentCache, SqliteContentCache};
pub use context::{
    ContextSynthesizer, DocumentationIndex, IndexContextProvider, LayeredContextProvider,
    ReferenceContextProvider,
};
pub use error::{AnalysisError, CacheError, ContextError, EvaluationError, ParseError};
pub use escalation::{Escalation, EscalationContextProvider, EscalationLedger, EscalationResolver};
pub use evaluator::{LlmVerdictEvaluator, LlmWindowEvaluator, VerdictEvaluator, WindowEvaluator};
pub use file::{FileAnalysisCoordinator, FileOutcome, FileWork};
pub use pool::WorkerPool;
pub use repo::{AnalysisOutcome, RepoAnalysisCoordinator, RepoLevelInput, RunStats};
pub use repo_level::{LlmRepoLevelEvaluator, RepoLevelEvaluator};
pub use report::AnalysisReport;
pub use settings::AnalysisSettings;
pub use types::{FileTarget, PracticeVerdicts, ProjectMetadata, VerdictRecord, VerdictStatus};
