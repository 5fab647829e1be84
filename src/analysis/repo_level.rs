use super::error::EvaluationError;
use super::prompt;
use super::response::{decode_batch_response, RecordLayout};
use super::types::{PracticeVerdicts, ProjectMetadata};
use crate::llm::{LLMClient, LLMRequest};
use crate::practice::Practice;
use async_trait::async_trait;
use std::sync::Arc;

/// Judges practices that concern the repository as a whole
#[async_trait]
pub trait RepoLevelEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        structure: &str,
        practices: &[Arc<Practice>],
        metadata: &ProjectMetadata,
    ) -> Result<PracticeVerdicts, EvaluationError>;
}

pub struct LlmRepoLevelEvaluator {
    client: Arc<dyn LLMClient>,
}

impl LlmRepoLevelEvaluator {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RepoLevelEvaluator for LlmRepoLevelEvaluator {
    async fn evaluate(
        &self,
        structure: &str,
        practices: &[Arc<Practice>],
        metadata: &ProjectMetadata,
    ) -> Result<PracticeVerdicts, EvaluationError> {
        let request = LLMRequest::review(
            prompt::REPO_SYSTEM_PROMPT,
            prompt::repo_prompt(structure, practices, metadata),
            2048,
        );

        let response = self.client.chat(request).await?;
        let ids: Vec<&str> = practices.iter().map(|p| p.id.as_str()).collect();
        Ok(decode_batch_response(
            &response.content,
            &ids,
            RecordLayout::StatusSuggestion,
        )?)
    }
}
