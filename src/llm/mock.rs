use super::client::LLMClient;
use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

type Router = dyn Fn(&LLMRequest) -> MockResponse + Send + Sync;

/// Scripted LLM client for tests.
///
/// Queued responses are handed out in call order. When calls run
/// concurrently and their order is not fixed, a router picks the answer from
/// the request instead; queued responses still take precedence.
pub struct MockLLMClient {
    responses: Mutex<VecDeque<MockResponse>>,
    router: Option<Box<Router>>,
    requests: Mutex<Vec<LLMRequest>>,
    name: String,
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub content: String,
    pub error: Option<BackendError>,
}

impl MockResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            error: None,
        }
    }

    pub fn error(error: BackendError) -> Self {
        Self {
            content: String::new(),
            error: Some(error),
        }
    }
}

impl MockLLMClient {
    pub fn new() -> Self {
        Self::with_name("MockLLM")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            router: None,
            requests: Mutex::new(Vec::new()),
            name: name.into(),
        }
    }

    /// Answers every request through `router`
    pub fn routed(router: impl Fn(&LLMRequest) -> MockResponse + Send + Sync + 'static) -> Self {
        Self {
            router: Some(Box::new(router)),
            ..Self::new()
        }
    }

    pub fn add_response(&self, response: MockResponse) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        self.responses.lock().unwrap().extend(responses);
    }

    pub fn remaining_responses(&self) -> usize {
        self.responses.lock().unwrap().len()
    }

    /// Requests received so far, in call order
    pub fn received_requests(&self) -> Vec<LLMRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self, request: &LLMRequest) -> Result<MockResponse, BackendError> {
        if let Some(queued) = self.responses.lock().unwrap().pop_front() {
            return Ok(queued);
        }
        match &self.router {
            Some(router) => Ok(router(request)),
            None => Err(BackendError::Other {
                message: "MockLLMClient: No more responses in queue".to_string(),
            }),
        }
    }
}

impl Default for MockLLMClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let response = self.next_response(&request);
        self.requests.lock().unwrap().push(request);

        let response = response?;
        match response.error {
            Some(error) => Err(error),
            None => Ok(LLMResponse::text(response.content, Duration::from_millis(10))),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn model_info(&self) -> Option<String> {
        Some("mock-model".to_string())
    }
}

impl std::fmt::Debug for MockLLMClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLLMClient")
            .field("name", &self.name)
            .field("routed", &self.router.is_some())
            .field("remaining_responses", &self.remaining_responses())
            .finish()
    }
}
