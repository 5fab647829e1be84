//! Per-file coordination: cache probe, fan-out, aggregation, escalation, write-back

use super::cache::ContentCache;
use super::chunker::{split_lines, split_practices, window_text};
use super::error::{AnalysisError, EvaluationError};
use super::escalation::{Escalation, EscalationLedger, EscalationResolver};
use super::evaluator::VerdictEvaluator;
use super::pool::WorkerPool;
use super::settings::AnalysisSettings;
use super::types::{FileTarget, PracticeVerdicts, ProjectMetadata, VerdictStatus};
use crate::practice::{Practice, PracticeSet};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// A file together with the ids of the practices it should be checked against
#[derive(Debug, Clone)]
pub struct FileWork {
    pub target: Arc<FileTarget>,
    pub practice_ids: Vec<String>,
}

impl FileWork {
    pub fn new(target: FileTarget, practice_ids: Vec<String>) -> Self {
        Self {
            target: Arc::new(target),
            practice_ids,
        }
    }
}

/// What one file contributed to the run
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub path: String,
    /// Verdict lists served from the cache
    pub cached: PracticeVerdicts,
    /// Verdict lists computed during this run
    pub computed: PracticeVerdicts,
    pub evaluator_calls: usize,
    pub failed_tasks: usize,
    pub escalations: usize,
}

impl FileOutcome {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            ..Default::default()
        }
    }
}

struct TaskResult {
    chunk: usize,
    batch: usize,
    result: Result<PracticeVerdicts, EvaluationError>,
}

pub struct FileAnalysisCoordinator {
    cache: Arc<dyn ContentCache>,
    evaluator: Arc<dyn VerdictEvaluator>,
    escalation: Arc<EscalationResolver>,
    settings: AnalysisSettings,
    metadata: Arc<ProjectMetadata>,
    progress: Arc<dyn ProgressHandler>,
}

impl FileAnalysisCoordinator {
    pub fn new(
        cache: Arc<dyn ContentCache>,
        evaluator: Arc<dyn VerdictEvaluator>,
        escalation: Arc<EscalationResolver>,
        settings: AnalysisSettings,
        metadata: ProjectMetadata,
    ) -> Self {
        Self {
            cache,
            evaluator,
            escalation,
            settings,
            metadata: Arc::new(metadata),
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    pub fn metadata(&self) -> &ProjectMetadata {
        &self.metadata
    }

    /// Analyzes one file.
    ///
    /// Only cache failures are returned as fatal errors. Evaluation failures
    /// are absorbed per task; the practices of a failed batch or a failed
    /// escalation window are reported but not written back, so a later run
    /// evaluates them again.
    pub async fn analyze(
        &self,
        work: &FileWork,
        catalog: &PracticeSet,
        ledger: &EscalationLedger,
    ) -> Result<FileOutcome, AnalysisError> {
        let start = Instant::now();
        let target = work.target.as_ref();
        let practices = resolve_practices(work, catalog)?;
        let mut outcome = FileOutcome::new(&target.path);

        let mut pending: Vec<Arc<Practice>> = Vec::new();
        for practice in practices {
            match self.cache.lookup(&target.content, &practice.statement).await? {
                Some(records) => {
                    outcome.cached.insert(practice.id.clone(), records);
                }
                None => pending.push(practice),
            }
        }

        self.progress.on_progress(&ProgressEvent::CacheProbeComplete {
            path: target.path.clone(),
            hits: outcome.cached.len(),
            pending: pending.len(),
        });

        if !pending.is_empty() {
            self.evaluate_pending(target, &pending, ledger, &mut outcome)
                .await?;
        }

        self.progress.on_progress(&ProgressEvent::FileComplete {
            path: target.path.clone(),
            evaluator_calls: outcome.evaluator_calls,
            duration: start.elapsed(),
        });
        Ok(outcome)
    }

    async fn evaluate_pending(
        &self,
        target: &FileTarget,
        pending: &[Arc<Practice>],
        ledger: &EscalationLedger,
        outcome: &mut FileOutcome,
    ) -> Result<(), AnalysisError> {
        let chunks: Vec<String> = split_lines(&target.content, self.settings.code_chunk_lines)
            .iter()
            .map(|window| window_text(window))
            .collect();
        let batches = split_practices(pending, self.settings.practice_batch_size);

        let mut tasks = Vec::with_capacity(chunks.len() * batches.len());
        for (chunk_idx, code) in chunks.iter().enumerate() {
            for (batch_idx, batch) in batches.iter().enumerate() {
                tasks.push(self.evaluate_task(&target.path, code, batch, chunk_idx, batch_idx));
            }
        }
        outcome.evaluator_calls = tasks.len();

        let pool = WorkerPool::new("chunk", self.settings.chunk_workers);
        let mut results = pool.drain(tasks).await;
        results.sort_by_key(|r| (r.chunk, r.batch));

        let wanted: HashSet<&str> = pending.iter().map(|p| p.id.as_str()).collect();
        let mut merged = PracticeVerdicts::new();
        let mut incomplete: HashSet<String> = HashSet::new();

        for task in results {
            match task.result {
                Ok(verdicts) => {
                    for (id, records) in verdicts {
                        if !wanted.contains(id.as_str()) {
                            debug!(file = %target.path, practice = %id, "Ignoring verdicts for unrequested practice");
                            continue;
                        }
                        merged.entry(id).or_default().extend(records);
                    }
                }
                Err(e) => {
                    if matches!(&e, EvaluationError::Backend(b) if !b.is_transient()) {
                        warn!(file = %target.path, "Evaluator backend rejected the request: {}", e);
                    }
                    outcome.failed_tasks += 1;
                    self.progress.on_progress(&ProgressEvent::EvaluationTaskFailed {
                        path: target.path.clone(),
                        chunk: task.chunk,
                        batch: task.batch,
                        error: e.to_string(),
                    });
                    incomplete.extend(batches[task.batch].iter().map(|p| p.id.clone()));
                }
            }
        }

        // a practice no window reported on is settled with an empty list
        for practice in pending {
            if !incomplete.contains(&practice.id) {
                merged.entry(practice.id.clone()).or_default();
            }
        }

        let mut to_escalate: Vec<&Arc<Practice>> = Vec::new();
        for (id, records) in merged.iter_mut() {
            if !records.iter().any(|r| r.status == VerdictStatus::Unknown) {
                continue;
            }
            records.retain(|r| r.status != VerdictStatus::Unknown);

            if ledger.try_claim(id, &target.path) {
                if let Some(practice) = pending.iter().find(|p| &p.id == id) {
                    to_escalate.push(practice);
                }
            } else {
                debug!(file = %target.path, practice = %id, "Escalation already claimed, dropping unknown verdict");
                incomplete.insert(id.clone());
            }
        }

        // one escalation at a time; its windows already use the chunk pool width
        outcome.escalations = to_escalate.len();
        for practice in to_escalate {
            let escalation = self.escalate(practice, target).await;
            if !escalation.complete {
                incomplete.insert(practice.id.clone());
            }
            merged
                .entry(practice.id.clone())
                .or_default()
                .extend(escalation.records);
        }

        for (id, records) in &merged {
            if incomplete.contains(id) {
                debug!(file = %target.path, practice = %id, "Verdict list incomplete, not caching");
                continue;
            }
            if let Some(practice) = pending.iter().find(|p| &p.id == id) {
                self.cache
                    .store(&target.content, &practice.statement, records)
                    .await?;
            }
        }

        if outcome.failed_tasks > 0 {
            warn!(
                file = %target.path,
                failed = outcome.failed_tasks,
                total = outcome.evaluator_calls,
                "Some evaluation tasks failed"
            );
        }

        outcome.computed = merged;
        Ok(())
    }

    async fn evaluate_task(
        &self,
        path: &str,
        code: &str,
        batch: &[Arc<Practice>],
        chunk: usize,
        batch_idx: usize,
    ) -> TaskResult {
        let result = self
            .evaluator
            .evaluate(path, code, batch, &self.metadata)
            .await;
        TaskResult {
            chunk,
            batch: batch_idx,
            result,
        }
    }

    async fn escalate(&self, practice: &Practice, target: &FileTarget) -> Escalation {
        let start = Instant::now();
        self.progress.on_progress(&ProgressEvent::EscalationStarted {
            path: target.path.clone(),
            practice: practice.id.clone(),
        });

        let escalation = self.escalation.resolve(practice, target).await;

        self.progress.on_progress(&ProgressEvent::EscalationComplete {
            path: target.path.clone(),
            practice: practice.id.clone(),
            records: escalation.records.len(),
            duration: start.elapsed(),
        });
        escalation
    }
}

/// Looks up the work item's practices, dropping repeated ids
fn resolve_practices(
    work: &FileWork,
    catalog: &PracticeSet,
) -> Result<Vec<Arc<Practice>>, AnalysisError> {
    let mut seen = HashSet::new();
    let mut practices = Vec::with_capacity(work.practice_ids.len());

    for id in &work.practice_ids {
        if !seen.insert(id.as_str()) {
            continue;
        }
        let practice = catalog.get(id).ok_or_else(|| AnalysisError::FileSetup {
            path: work.target.path.clone(),
            reason: format!("unknown practice id '{}'", id),
        })?;
        practices.push(Arc::clone(practice));
    }

    Ok(practices)
}
