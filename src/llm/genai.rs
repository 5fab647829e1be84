//! Provider-agnostic chat client on top of the `genai` crate
//!
//! Ollama, OpenAI, Anthropic, Gemini, xAI and Groq are reached through the
//! same client; credentials come from the provider's usual environment
//! variable. Setting [`API_BASE_URL_ENV`] routes every request to a custom
//! endpoint (an OpenAI-compatible proxy, a remote Ollama, ...).

use super::client::LLMClient;
use super::error::BackendError;
use super::types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
use async_trait::async_trait;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage as GenAIChatMessage, ChatOptions, ChatRequest as GenAIChatRequest};
use genai::resolver::{AuthData, Endpoint, ServiceTargetResolver};
use genai::{Client, ModelIden, ServiceTarget};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Environment variable overriding the provider endpoint
pub const API_BASE_URL_ENV: &str = "PRACTICE_AUDIT_API_BASE_URL";

pub struct GenAIClient {
    client: Client,
    model: String,
    provider: AdapterKind,
    timeout: Duration,
}

impl GenAIClient {
    /// Builds a client for `model` on `provider`. Every `chat` call is bounded by `timeout`.
    pub async fn new(
        provider: AdapterKind,
        model: String,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = match std::env::var(API_BASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                debug!(provider = provider.as_str(), endpoint = %url, "Using custom endpoint");
                Client::builder()
                    .with_service_target_resolver(fixed_endpoint(provider, &model, url))
                    .build()
            }
            _ => Client::default(),
        };

        debug!(provider = provider.as_str(), model = %model, "GenAI client ready");
        Ok(Self {
            client,
            model,
            provider,
            timeout,
        })
    }

    fn options(request: &LLMRequest) -> ChatOptions {
        let mut options = ChatOptions::default();
        if let Some(temperature) = request.temperature {
            options = options.with_temperature(f64::from(temperature));
        }
        if let Some(max_tokens) = request.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        options
    }
}

/// Sends every request for `provider` to `url`, keeping the provider's key variable
fn fixed_endpoint(provider: AdapterKind, model: &str, url: String) -> ServiceTargetResolver {
    let model = model.to_string();
    ServiceTargetResolver::from_resolver_fn(
        move |_target: ServiceTarget| -> Result<ServiceTarget, genai::resolver::Error> {
            let auth = provider
                .default_key_env_name()
                .map(AuthData::from_env)
                .unwrap_or_else(|| AuthData::from_single(""));
            Ok(ServiceTarget {
                endpoint: Endpoint::from_owned(url.clone()),
                auth,
                model: ModelIden::new(provider, &model),
            })
        },
    )
}

fn to_genai(message: &ChatMessage) -> GenAIChatMessage {
    match message.role {
        MessageRole::System => GenAIChatMessage::system(&message.content),
        MessageRole::User => GenAIChatMessage::user(&message.content),
        MessageRole::Assistant => GenAIChatMessage::assistant(&message.content),
    }
}

/// Maps a provider failure message onto the closest [`BackendError`]
fn classify_failure(provider: AdapterKind, detail: String) -> BackendError {
    let lower = detail.to_lowercase();
    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        BackendError::RateLimitError { retry_after: None }
    } else if lower.contains("connection refused")
        || lower.contains("error sending request")
        || lower.contains("dns error")
    {
        BackendError::NetworkError { message: detail }
    } else if lower.contains("api key") || lower.contains("401") || lower.contains("unauthorized") {
        BackendError::ConfigurationError {
            message: format!("{} rejected the credentials: {}", provider.as_str(), detail),
        }
    } else {
        BackendError::ApiError {
            message: format!("{} request failed: {}", provider.as_str(), detail),
            status_code: None,
        }
    }
}

#[async_trait]
impl LLMClient for GenAIClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let start = Instant::now();
        let options = Self::options(&request);
        let chat = GenAIChatRequest::new(request.messages.iter().map(to_genai).collect());

        let call = self.client.exec_chat(&self.model, chat, Some(&options));
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let err = classify_failure(self.provider, e.to_string());
                warn!(provider = self.provider.as_str(), "LLM call failed: {}", err);
                return Err(err);
            }
            Err(_) => {
                warn!(
                    provider = self.provider.as_str(),
                    "LLM call timed out after {}s",
                    self.timeout.as_secs()
                );
                return Err(BackendError::TimeoutError {
                    seconds: self.timeout.as_secs(),
                });
            }
        };

        let content = response.first_text().unwrap_or_default().to_string();
        debug!(
            model = %self.model,
            chars = content.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "LLM call complete"
        );
        Ok(LLMResponse::text(content, start.elapsed()))
    }

    fn name(&self) -> &str {
        self.provider.as_str()
    }

    fn model_info(&self) -> Option<String> {
        Some(self.model.clone())
    }
}

impl std::fmt::Debug for GenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenAIClient")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_reports_provider_and_model() {
        let client = GenAIClient::new(
            AdapterKind::Ollama,
            "qwen2.5-coder:7b".to_string(),
            Duration::from_secs(30),
        )
        .await
        .unwrap();

        assert_eq!(client.name(), "Ollama");
        assert_eq!(client.model_info(), Some("qwen2.5-coder:7b".to_string()));
    }

    #[test]
    fn test_options_carry_sampling_settings() {
        let request = LLMRequest::new(vec![ChatMessage::user("hi")])
            .with_temperature(0.0)
            .with_max_tokens(512);
        let options = GenAIClient::options(&request);
        assert_eq!(options.temperature, Some(0.0));
        assert_eq!(options.max_tokens, Some(512));
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure(AdapterKind::OpenAI, "HTTP 429 Too Many Requests".to_string()),
            BackendError::RateLimitError { .. }
        ));
        assert!(matches!(
            classify_failure(AdapterKind::Ollama, "error sending request for url".to_string()),
            BackendError::NetworkError { .. }
        ));
        assert!(matches!(
            classify_failure(AdapterKind::Anthropic, "invalid x-api-key".to_string()),
            BackendError::ConfigurationError { .. }
        ));
        assert!(matches!(
            classify_failure(AdapterKind::Groq, "model not found".to_string()),
            BackendError::ApiError { .. }
        ));
    }
}
