//! Picks the backend an audit runs against

use crate::config::{AuditConfig, DEFAULT_OLLAMA_MODEL};
use crate::llm::{GenAIClient, LLMClient};
use anyhow::{bail, Result};
use genai::adapter::AdapterKind;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const OLLAMA_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub struct SelectedClient {
    pub client: Arc<dyn LLMClient>,
    pub provider: AdapterKind,
    pub description: String,
}

/// The configured provider when its credentials are present, otherwise a
/// local Ollama if one answers.
pub async fn select_llm_client(config: &AuditConfig) -> Result<SelectedClient> {
    let timeout = Duration::from_secs(config.request_timeout_secs);

    for (provider, model) in candidates(config) {
        if provider == AdapterKind::Ollama {
            if !ollama_responds().await {
                debug!("Ollama is not running");
                continue;
            }
        } else if !has_credentials(provider) {
            debug!(provider = provider.as_str(), "No credentials in environment");
            continue;
        }

        match GenAIClient::new(provider, model, timeout).await {
            Ok(client) => {
                let description = client.describe();
                info!("Using {}", description);
                return Ok(SelectedClient {
                    client: Arc::new(client),
                    provider,
                    description,
                });
            }
            Err(e) => warn!(provider = provider.as_str(), "Backend unavailable: {}", e),
        }
    }

    bail!(
        "No LLM backend available. Either:\n\
         - set PRACTICE_AUDIT_PROVIDER and the provider's API key (OPENAI_API_KEY, ANTHROPIC_API_KEY, ...)\n\
         - start Ollama locally (ollama serve)"
    )
}

/// Providers to try, in order, with the model to use on each
fn candidates(config: &AuditConfig) -> Vec<(AdapterKind, String)> {
    let mut order = vec![(config.provider, config.model.clone())];
    if config.provider != AdapterKind::Ollama {
        order.push((AdapterKind::Ollama, DEFAULT_OLLAMA_MODEL.to_string()));
    }
    order
}

fn has_credentials(provider: AdapterKind) -> bool {
    provider
        .default_key_env_name()
        .map(|var| std::env::var(var).is_ok())
        .unwrap_or(true)
}

async fn ollama_responds() -> bool {
    let host =
        std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost:11434".to_string());
    let url = format!("{}/api/tags", host.trim_end_matches('/'));

    match reqwest::Client::new()
        .get(&url)
        .timeout(OLLAMA_PROBE_TIMEOUT)
        .send()
        .await
    {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            debug!("Ollama probe failed: {}", e);
            false
        }
    }
}
