//! Ollama backend implementation
//!
//! HTTP client for the Ollama API. Uses the model router to pick the model
//! and timeout for each advisor task.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model_router::ModelRouter;

use super::types::{GenerateRequest, RouterInfo};
use super::{describe_router, record_outcome, route, router_with_default, AIBackend};

/// Ollama backend with model router integration
///
/// Routing is configured in `~/.local/share/budgee/config/models.toml`:
///
/// ```toml
/// [defaults]
/// model = "llama3.2"
/// fallback_model = "gemma3"
///
/// [models.analysis]
/// model = "qwen2.5:14b"
/// timeout_secs = 120
/// ```
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    router: Arc<RwLock<ModelRouter>>,
    default_model: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, default_model: &str) -> Self {
        Self::with_router(base_url, default_model, router_with_default(default_model))
    }

    /// Create with a custom router
    pub fn with_router(base_url: &str, default_model: &str, router: ModelRouter) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            router: Arc::new(RwLock::new(router)),
            default_model: default_model.to_string(),
        }
    }

    /// Create a new instance with a different default model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            http_client: self.http_client.clone(),
            base_url: self.base_url.clone(),
            router: Arc::new(RwLock::new(router_with_default(model))),
            default_model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }

    async fn call(
        &self,
        model: &str,
        request: &GenerateRequest,
        timeout: std::time::Duration,
    ) -> Result<String> {
        let body = OllamaRequest {
            model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(timeout)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let ollama_response: OllamaResponse = response.json().await?;
        debug!(task = request.task.as_str(), "Ollama response: {}", ollama_response.response);

        Ok(ollama_response.response)
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let (model, timeout) = route(&self.router, request.task)?;
        let outcome = self.call(&model, request, timeout).await;
        record_outcome(&self.router, &model, &outcome);
        outcome
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.default_model
    }

    fn host(&self) -> &str {
        &self.base_url
    }

    fn router_info(&self) -> RouterInfo {
        describe_router(&self.router, &self.default_model)
    }
}
