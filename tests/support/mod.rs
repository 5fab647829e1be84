//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use practice_audit::analysis::{
    AnalysisSettings, CacheError, ContentCache, ContextError, EscalationContextProvider,
    EscalationResolver, EvaluationError, FileAnalysisCoordinator, MemoryContentCache,
    PracticeVerdicts, ProjectMetadata, RepoLevelEvaluator, VerdictEvaluator, VerdictRecord,
    WindowEvaluator,
};
use practice_audit::llm::BackendError;
use practice_audit::Practice;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Decides the records of one (code window, practice) pair
pub type Rule = dyn Fn(&str, &Practice) -> Vec<VerdictRecord> + Send + Sync;

/// Evaluator driven by a rule, with per-path delays and failures
pub struct RuleEvaluator {
    rule: Box<Rule>,
    delays: HashMap<String, Duration>,
    failing_paths: Vec<String>,
    calls: AtomicUsize,
    calls_by_path: Mutex<HashMap<String, usize>>,
}

impl RuleEvaluator {
    pub fn new(rule: impl Fn(&str, &Practice) -> Vec<VerdictRecord> + Send + Sync + 'static) -> Self {
        Self {
            rule: Box::new(rule),
            delays: HashMap::new(),
            failing_paths: Vec::new(),
            calls: AtomicUsize::new(0),
            calls_by_path: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    pub fn failing_on(mut self, path: &str) -> Self {
        self.failing_paths.push(path.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, path: &str) -> usize {
        self.calls_by_path
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl VerdictEvaluator for RuleEvaluator {
    async fn evaluate(
        &self,
        file_path: &str,
        code: &str,
        batch: &[Arc<Practice>],
        _metadata: &ProjectMetadata,
    ) -> Result<PracticeVerdicts, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_path
            .lock()
            .unwrap()
            .entry(file_path.to_string())
            .or_default() += 1;

        if let Some(delay) = self.delays.get(file_path) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_paths.iter().any(|p| p == file_path) {
            return Err(BackendError::Other {
                message: format!("scripted failure for {}", file_path),
            }
            .into());
        }

        Ok(batch
            .iter()
            .map(|p| (p.id.clone(), (self.rule)(code, p)))
            .collect())
    }
}

/// Context provider that either always answers or always fails
#[derive(Default)]
pub struct StaticContext {
    unavailable: bool,
    calls: AtomicUsize,
}

impl StaticContext {
    pub fn available() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EscalationContextProvider for StaticContext {
    async fn get_context(&self, practice: &Practice) -> Result<String, ContextError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        if self.unavailable {
            return Err(ContextError::unavailable(&practice.id, "reference unreachable"));
        }
        Ok(format!("Guidance for: {}", practice.statement))
    }
}

/// Window evaluator that flags every window containing `needle`
pub struct NeedleWindow {
    needle: String,
    failing_on: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl NeedleWindow {
    pub fn new(needle: &str) -> Self {
        Self {
            needle: needle.to_string(),
            failing_on: None,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Windows containing `marker` fail with a backend error
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.failing_on = Some(marker.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of window calls observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WindowEvaluator for NeedleWindow {
    async fn evaluate_window(
        &self,
        _file_path: &str,
        code: &str,
        _practice: &Practice,
        _context: &str,
    ) -> Result<Vec<VerdictRecord>, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(ref marker) = self.failing_on {
            if code.contains(marker.as_str()) {
                return Err(BackendError::Other {
                    message: format!("scripted window failure on {}", marker),
                }
                .into());
            }
        }
        if code.contains(&self.needle) {
            Ok(vec![VerdictRecord::violated(code, "escalated finding")])
        } else {
            Ok(vec![VerdictRecord::new(
                practice_audit::VerdictStatus::NotViolated,
            )])
        }
    }
}

/// Repository-level evaluator that flags every practice it is given
#[derive(Default)]
pub struct FlagEverything {
    calls: AtomicUsize,
}

impl FlagEverything {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RepoLevelEvaluator for FlagEverything {
    async fn evaluate(
        &self,
        _structure: &str,
        practices: &[Arc<Practice>],
        _metadata: &ProjectMetadata,
    ) -> Result<PracticeVerdicts, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(practices
            .iter()
            .map(|p| {
                (
                    p.id.clone(),
                    vec![VerdictRecord::new(practice_audit::VerdictStatus::Violated)
                        .with_suggestion("Add the missing project file")],
                )
            })
            .collect())
    }
}

/// Cache whose reads succeed and whose writes always fail
#[derive(Default)]
pub struct ReadOnlyCache {
    inner: MemoryContentCache,
}

#[async_trait]
impl ContentCache for ReadOnlyCache {
    async fn lookup(
        &self,
        content: &str,
        statement: &str,
    ) -> Result<Option<Vec<VerdictRecord>>, CacheError> {
        self.inner.lookup(content, statement).await
    }

    async fn store(
        &self,
        _content: &str,
        _statement: &str,
        _records: &[VerdictRecord],
    ) -> Result<(), CacheError> {
        Err(CacheError::Poisoned)
    }
}

/// Small windows and batches so every run exercises the fan-out
pub fn test_settings() -> AnalysisSettings {
    AnalysisSettings::new()
        .with_code_chunk_lines(2)
        .with_escalation_chunk_lines(1)
        .with_practice_batch_size(1)
        .with_file_workers(2)
        .with_chunk_workers(3)
}

pub fn file_coordinator(
    cache: Arc<dyn ContentCache>,
    evaluator: Arc<dyn VerdictEvaluator>,
    context: Arc<dyn EscalationContextProvider>,
    window: Arc<dyn WindowEvaluator>,
    settings: AnalysisSettings,
) -> FileAnalysisCoordinator {
    let resolver = EscalationResolver::new(context, window)
        .with_window_lines(settings.escalation_chunk_lines)
        .with_workers(settings.chunk_workers);
    FileAnalysisCoordinator::new(
        cache,
        evaluator,
        Arc::new(resolver),
        settings,
        ProjectMetadata::new("sample"),
    )
}
