//! The verdict evaluator boundary and its LLM-backed implementations

use super::error::EvaluationError;
use super::prompt;
use super::response::{decode_batch_response, decode_window_response, RecordLayout};
use super::types::{PracticeVerdicts, ProjectMetadata, VerdictRecord};
use crate::llm::{LLMClient, LLMRequest};
use crate::practice::Practice;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const EVALUATION_MAX_TOKENS: u32 = 4096;

/// Judges one code window against a batch of practices
#[async_trait]
pub trait VerdictEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        file_path: &str,
        code: &str,
        batch: &[Arc<Practice>],
        metadata: &ProjectMetadata,
    ) -> Result<PracticeVerdicts, EvaluationError>;
}

/// Judges one escalation window against a single practice, given context.
///
/// An empty result means the evaluator still could not decide.
#[async_trait]
pub trait WindowEvaluator: Send + Sync {
    async fn evaluate_window(
        &self,
        file_path: &str,
        code: &str,
        practice: &Practice,
        context: &str,
    ) -> Result<Vec<VerdictRecord>, EvaluationError>;
}

pub struct LlmVerdictEvaluator {
    client: Arc<dyn LLMClient>,
}

impl LlmVerdictEvaluator {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VerdictEvaluator for LlmVerdictEvaluator {
    async fn evaluate(
        &self,
        file_path: &str,
        code: &str,
        batch: &[Arc<Practice>],
        metadata: &ProjectMetadata,
    ) -> Result<PracticeVerdicts, EvaluationError> {
        let request = LLMRequest::review(
            prompt::BATCH_SYSTEM_PROMPT,
            prompt::batch_prompt(file_path, code, batch, metadata),
            EVALUATION_MAX_TOKENS,
        );

        let response = self.client.chat(request).await?;
        debug!(
            file = %file_path,
            practices = batch.len(),
            "Evaluator answered in {:?}",
            response.response_time
        );

        let ids: Vec<&str> = batch.iter().map(|p| p.id.as_str()).collect();
        Ok(decode_batch_response(
            &response.content,
            &ids,
            RecordLayout::StatusCodeSuggestion,
        )?)
    }
}

pub struct LlmWindowEvaluator {
    client: Arc<dyn LLMClient>,
}

impl LlmWindowEvaluator {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl WindowEvaluator for LlmWindowEvaluator {
    async fn evaluate_window(
        &self,
        file_path: &str,
        code: &str,
        practice: &Practice,
        context: &str,
    ) -> Result<Vec<VerdictRecord>, EvaluationError> {
        let request = LLMRequest::review(
            prompt::WINDOW_SYSTEM_PROMPT,
            prompt::window_prompt(file_path, code, practice, context),
            EVALUATION_MAX_TOKENS,
        );

        let response = self.client.chat(request).await?;
        Ok(decode_window_response(&response.content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::types::VerdictStatus;
    use crate::llm::{BackendError, MockLLMClient, MockResponse};

    fn batch() -> Vec<Arc<Practice>> {
        vec![
            Arc::new(Practice::new("ctx", "Use context managers")),
            Arc::new(Practice::new("naming", "Use snake_case")),
        ]
    }

    #[tokio::test]
    async fn test_llm_evaluator_decodes_answer() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text(
            r#"{"ctx": [["Violated", "f = open(p)", "Use with"]], "naming": [["Not Violated"]]}"#,
        ));

        let evaluator = LlmVerdictEvaluator::new(mock.clone());
        let verdicts = evaluator
            .evaluate("a.py", "f = open(p)", &batch(), &ProjectMetadata::new("demo"))
            .await
            .unwrap();

        assert_eq!(verdicts["ctx"][0].status, VerdictStatus::Violated);
        assert_eq!(verdicts["naming"][0].status, VerdictStatus::NotViolated);

        let requests = mock.received_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].user_text().contains("ctx: Use context managers"));
    }

    #[tokio::test]
    async fn test_llm_evaluator_backend_failure() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::error(BackendError::TimeoutError { seconds: 1 }));

        let evaluator = LlmVerdictEvaluator::new(mock);
        let err = evaluator
            .evaluate("a.py", "x", &batch(), &ProjectMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Backend(_)));
    }

    #[tokio::test]
    async fn test_llm_evaluator_garbage_is_parse_error() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text("Sorry, I can't do that."));

        let evaluator = LlmVerdictEvaluator::new(mock);
        let err = evaluator
            .evaluate("a.py", "x", &batch(), &ProjectMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Parse(_)));
    }

    #[tokio::test]
    async fn test_window_evaluator_empty_answer() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text("[]"));

        let evaluator = LlmWindowEvaluator::new(mock.clone());
        let practice = Practice::new("ctx", "Use context managers");
        let records = evaluator
            .evaluate_window("a.py", "open(p)", &practice, "docs")
            .await
            .unwrap();

        assert!(records.is_empty());
        assert!(mock.received_requests()[0].user_text().contains("docs"));
    }
}
