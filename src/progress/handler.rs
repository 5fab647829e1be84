//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a repository is analyzed
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started
    Started {
        repo_path: String,
        files: usize,
        practices: usize,
    },

    /// A file coordinator picked up a file
    FileStarted {
        path: String,
        index: usize,
        total: usize,
    },

    /// Cache probe finished for a file
    CacheProbeComplete {
        path: String,
        hits: usize,
        pending: usize,
    },

    /// One chunk × batch evaluation failed and contributes nothing
    EvaluationTaskFailed {
        path: String,
        chunk: usize,
        batch: usize,
        error: String,
    },

    /// An unknown verdict is being re-evaluated with context
    EscalationStarted { path: String, practice: String },

    EscalationComplete {
        path: String,
        practice: String,
        records: usize,
        duration: Duration,
    },

    /// A file coordinator finished
    FileComplete {
        path: String,
        evaluator_calls: usize,
        duration: Duration,
    },

    /// A file was dropped from the run
    FileFailed { path: String, error: String },

    /// Repository-level evaluation finished
    RepoLevelComplete {
        practices: usize,
        success: bool,
        duration: Duration,
    },

    /// Run completed
    Completed {
        files: usize,
        violations: usize,
        total_time: Duration,
    },

    /// Run aborted
    Failed { error: String },
}

/// Receives progress events; implementations must tolerate concurrent calls
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
