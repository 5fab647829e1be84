use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;

/// A chat-completion backend. Evaluators, the context synthesizer and the
/// repository-level evaluator all talk to the model through this trait.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError>;

    fn name(&self) -> &str;

    fn model_info(&self) -> Option<String> {
        None
    }

    /// `"provider (model)"`, or just the provider when the model is unknown
    fn describe(&self) -> String {
        match self.model_info() {
            Some(model) => format!("{} ({})", self.name(), model),
            None => self.name().to_string(),
        }
    }
}
