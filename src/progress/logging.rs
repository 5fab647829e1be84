//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started {
                repo_path,
                files,
                practices,
            } => {
                info!(repo = %repo_path, files, practices, "Starting analysis");
            }
            ProgressEvent::FileStarted { path, index, total } => {
                info!(
                    file = %path,
                    progress = format!("{}/{}", index, total),
                    "Analyzing file"
                );
            }
            ProgressEvent::CacheProbeComplete {
                path,
                hits,
                pending,
            } => {
                debug!(file = %path, hits, pending, "Cache probe complete");
            }
            ProgressEvent::EvaluationTaskFailed {
                path,
                chunk,
                batch,
                error,
            } => {
                warn!(file = %path, chunk, batch, error = %error, "Evaluation task failed");
            }
            ProgressEvent::EscalationStarted { path, practice } => {
                debug!(file = %path, practice = %practice, "Escalation started");
            }
            ProgressEvent::EscalationComplete {
                path,
                practice,
                records,
                duration,
            } => {
                info!(
                    file = %path,
                    practice = %practice,
                    records,
                    duration_ms = duration.as_millis(),
                    "Escalation complete"
                );
            }
            ProgressEvent::FileComplete {
                path,
                evaluator_calls,
                duration,
            } => {
                info!(
                    file = %path,
                    evaluator_calls,
                    duration_ms = duration.as_millis(),
                    "File analysis complete"
                );
            }
            ProgressEvent::FileFailed { path, error } => {
                warn!(file = %path, error = %error, "File skipped");
            }
            ProgressEvent::RepoLevelComplete {
                practices,
                success,
                duration,
            } => {
                if *success {
                    info!(
                        practices,
                        duration_ms = duration.as_millis(),
                        "Repository-level analysis complete"
                    );
                } else {
                    warn!(practices, "Repository-level analysis failed");
                }
            }
            ProgressEvent::Completed {
                files,
                violations,
                total_time,
            } => {
                info!(
                    files,
                    violations,
                    total_time_ms = total_time.as_millis(),
                    "Analysis complete"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Analysis failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::Started {
                repo_path: "/repo".to_string(),
                files: 1,
                practices: 2,
            },
            ProgressEvent::FileStarted {
                path: "a.py".to_string(),
                index: 1,
                total: 1,
            },
            ProgressEvent::CacheProbeComplete {
                path: "a.py".to_string(),
                hits: 1,
                pending: 1,
            },
            ProgressEvent::EvaluationTaskFailed {
                path: "a.py".to_string(),
                chunk: 0,
                batch: 0,
                error: "timeout".to_string(),
            },
            ProgressEvent::EscalationStarted {
                path: "a.py".to_string(),
                practice: "p1".to_string(),
            },
            ProgressEvent::EscalationComplete {
                path: "a.py".to_string(),
                practice: "p1".to_string(),
                records: 1,
                duration: Duration::from_millis(20),
            },
            ProgressEvent::FileComplete {
                path: "a.py".to_string(),
                evaluator_calls: 1,
                duration: Duration::from_millis(30),
            },
            ProgressEvent::FileFailed {
                path: "b.py".to_string(),
                error: "unknown practice".to_string(),
            },
            ProgressEvent::RepoLevelComplete {
                practices: 1,
                success: false,
                duration: Duration::from_millis(5),
            },
            ProgressEvent::Completed {
                files: 1,
                violations: 0,
                total_time: Duration::from_secs(1),
            },
            ProgressEvent::Failed {
                error: "cache unavailable".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
