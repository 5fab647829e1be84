//! Repository-level coordination: bounded fan-out over files, merge, finalize

use super::error::AnalysisError;
use super::escalation::EscalationLedger;
use super::file::{FileAnalysisCoordinator, FileOutcome, FileWork};
use super::pool::WorkerPool;
use super::report::{merge_contributions, AnalysisReport, MergedVerdicts};
use super::repo_level::RepoLevelEvaluator;
use crate::practice::PracticeSet;
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info_span, warn, Instrument};

/// Inputs for the optional repository-level evaluation
#[derive(Debug, Clone)]
pub struct RepoLevelInput {
    /// Report key the verdicts are filed under
    pub key: String,
    /// Rendered project tree
    pub structure: String,
}

/// Counters describing one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub files_total: usize,
    pub files_analyzed: usize,
    pub files_failed: usize,
    pub cache_hits: usize,
    pub evaluator_calls: usize,
    pub failed_tasks: usize,
    pub escalations: usize,
    #[serde(skip)]
    pub duration: Duration,
}

impl RunStats {
    fn record(&mut self, outcome: &FileOutcome) {
        self.files_analyzed += 1;
        self.cache_hits += outcome.cached.len();
        self.evaluator_calls += outcome.evaluator_calls;
        self.failed_tasks += outcome.failed_tasks;
        self.escalations += outcome.escalations;
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub stats: RunStats,
}

pub struct RepoAnalysisCoordinator {
    files: FileAnalysisCoordinator,
    repo_level: Option<Arc<dyn RepoLevelEvaluator>>,
    progress: Arc<dyn ProgressHandler>,
}

impl RepoAnalysisCoordinator {
    pub fn new(files: FileAnalysisCoordinator) -> Self {
        Self {
            files,
            repo_level: None,
            progress: Arc::new(NoOpHandler),
        }
    }

    pub fn with_repo_level(mut self, evaluator: Arc<dyn RepoLevelEvaluator>) -> Self {
        self.repo_level = Some(evaluator);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.files = self.files.with_progress(Arc::clone(&progress));
        self.progress = progress;
        self
    }

    /// Runs one analysis pass.
    ///
    /// Files are analyzed concurrently under the outer bound, each driving its
    /// own inner pool. A fresh escalation ledger is shared by every file of
    /// the run. A cache failure aborts the run once all in-flight files have
    /// drained; any other per-file failure only drops that file.
    pub async fn run(
        &self,
        repo_path: &str,
        work: Vec<FileWork>,
        catalog: &PracticeSet,
        repo_level: Option<RepoLevelInput>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let start = Instant::now();
        let ledger = EscalationLedger::new();
        let ledger = &ledger;
        let work: Vec<FileWork> = work
            .into_iter()
            .map(|w| code_level_only(w, catalog))
            .collect();

        self.progress.on_progress(&ProgressEvent::Started {
            repo_path: repo_path.to_string(),
            files: work.len(),
            practices: catalog.len(),
        });

        let total = work.len();
        let pool = WorkerPool::new("file", self.files.settings().file_workers);
        let mut results = pool
            .drain(work.iter().enumerate().map(|(idx, item)| {
                let span = info_span!("file", path = %item.target.path);
                async move {
                    self.progress.on_progress(&ProgressEvent::FileStarted {
                        path: item.target.path.clone(),
                        index: idx + 1,
                        total,
                    });
                    let result = self.files.analyze(item, catalog, ledger).await;
                    (idx, result)
                }
                .instrument(span)
            }))
            .await;
        results.sort_by_key(|(idx, _)| *idx);

        let mut stats = RunStats {
            files_total: total,
            ..Default::default()
        };
        let mut merged = MergedVerdicts::new();
        let mut fatal = None;

        for (idx, result) in results {
            match result {
                Ok(outcome) => {
                    stats.record(&outcome);
                    merge_contributions(&mut merged, &outcome.path, outcome.cached, outcome.computed);
                }
                Err(e) if e.is_fatal() => {
                    fatal.get_or_insert(e);
                }
                Err(e) => {
                    stats.files_failed += 1;
                    self.progress.on_progress(&ProgressEvent::FileFailed {
                        path: work[idx].target.path.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if let Some(e) = fatal {
            self.progress.on_progress(&ProgressEvent::Failed {
                error: e.to_string(),
            });
            return Err(e);
        }

        if let Some(input) = repo_level {
            self.run_repo_level(input, catalog, &mut merged).await;
        }

        let report = AnalysisReport::finalize(merged, catalog);
        stats.duration = start.elapsed();

        self.progress.on_progress(&ProgressEvent::Completed {
            files: stats.files_analyzed,
            violations: report.violation_count(),
            total_time: stats.duration,
        });

        Ok(AnalysisOutcome { report, stats })
    }

    async fn run_repo_level(
        &self,
        input: RepoLevelInput,
        catalog: &PracticeSet,
        merged: &mut MergedVerdicts,
    ) {
        let Some(evaluator) = &self.repo_level else {
            return;
        };
        let practices = catalog.repo_level();
        if practices.is_empty() {
            return;
        }

        let start = Instant::now();
        let result = evaluator
            .evaluate(&input.structure, &practices, self.files.metadata())
            .instrument(info_span!("repo_level", key = %input.key))
            .await;

        let success = result.is_ok();
        match result {
            Ok(verdicts) => {
                merged.insert(input.key, verdicts);
            }
            Err(e) => warn!("Repository-level evaluation failed: {}", e),
        }

        self.progress.on_progress(&ProgressEvent::RepoLevelComplete {
            practices: practices.len(),
            success,
            duration: start.elapsed(),
        });
    }
}

/// Repository-level practices are never evaluated per file
fn code_level_only(mut work: FileWork, catalog: &PracticeSet) -> FileWork {
    work.practice_ids
        .retain(|id| catalog.get(id).map(|p| !p.is_repo_level).unwrap_or(true));
    work
}
