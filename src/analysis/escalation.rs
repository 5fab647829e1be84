//! Documentation-grounded re-evaluation of `Unknown` verdicts

use super::chunker::{split_lines, window_text};
use super::error::ContextError;
use super::evaluator::WindowEvaluator;
use super::pool::WorkerPool;
use super::types::{FileTarget, VerdictRecord};
use crate::practice::Practice;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Supplies the documentation an escalation is grounded on
#[async_trait]
pub trait EscalationContextProvider: Send + Sync {
    async fn get_context(&self, practice: &Practice) -> Result<String, ContextError>;
}

/// (practice id, file path) pairs already escalated during one run
#[derive(Debug, Default)]
pub struct EscalationLedger {
    claimed: Mutex<HashSet<(String, String)>>,
}

impl EscalationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically records the pair; only the first caller gets `true`
    pub fn try_claim(&self, practice_id: &str, file_path: &str) -> bool {
        match self.claimed.lock() {
            Ok(mut claimed) => claimed.insert((practice_id.to_string(), file_path.to_string())),
            Err(poisoned) => poisoned
                .into_inner()
                .insert((practice_id.to_string(), file_path.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.claimed.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Replacement verdicts for one (practice, file) escalation
#[derive(Debug, Clone, PartialEq)]
pub struct Escalation {
    pub records: Vec<VerdictRecord>,
    /// False when at least one window failed; such a list must not be cached
    pub complete: bool,
}

/// Re-evaluates one file against one practice in small windows, with context
pub struct EscalationResolver {
    context: Arc<dyn EscalationContextProvider>,
    evaluator: Arc<dyn WindowEvaluator>,
    window_lines: usize,
    workers: usize,
}

impl EscalationResolver {
    pub fn new(
        context: Arc<dyn EscalationContextProvider>,
        evaluator: Arc<dyn WindowEvaluator>,
    ) -> Self {
        Self {
            context,
            evaluator,
            window_lines: 50,
            workers: 3,
        }
    }

    pub fn with_window_lines(mut self, lines: usize) -> Self {
        self.window_lines = lines;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Produces the replacement verdict list.
    ///
    /// Missing context yields a single `Skipped` record. Each window the
    /// evaluator still cannot decide yields an `Unknown` record, which is
    /// reported as-is and never escalated again. Failed windows contribute
    /// nothing and mark the result incomplete.
    pub async fn resolve(&self, practice: &Practice, file: &FileTarget) -> Escalation {
        info!(practice = %practice.id, file = %file.path, "Escalating unknown verdict");

        let context = match self.context.get_context(practice).await {
            Ok(context) => context,
            Err(e) => {
                warn!(practice = %practice.id, file = %file.path, "Skipping escalation: {}", e);
                return Escalation {
                    records: vec![VerdictRecord::skipped()],
                    complete: true,
                };
            }
        };

        let windows = split_lines(&file.content, self.window_lines);
        let pool = WorkerPool::new("escalation", self.workers);
        let context = context.as_str();

        let mut results = pool
            .drain(windows.iter().enumerate().map(|(idx, window)| async move {
                let code = window_text(window);
                let result = self
                    .evaluator
                    .evaluate_window(&file.path, &code, practice, context)
                    .await;
                (idx, result)
            }))
            .await;
        results.sort_by_key(|(idx, _)| *idx);

        let mut records = Vec::new();
        let mut failed = 0;
        for (idx, result) in results {
            match result {
                Ok(window_records) if window_records.is_empty() => {
                    records.push(VerdictRecord::unknown())
                }
                Ok(window_records) => records.extend(window_records),
                Err(e) => {
                    failed += 1;
                    warn!(
                        practice = %practice.id,
                        file = %file.path,
                        window = idx,
                        "Escalation window failed: {}",
                        e
                    );
                }
            }
        }

        debug!(
            practice = %practice.id,
            file = %file.path,
            windows = windows.len(),
            records = records.len(),
            failed,
            "Escalation finished"
        );
        Escalation {
            records,
            complete: failed == 0,
        }
    }
}
