//! Pluggable AI backend abstraction for the advisor
//!
//! This module provides a backend-agnostic interface for text generation.
//! Backends are local or self-hosted model servers: Ollama, any
//! OpenAI-compatible server, and a mock for tests.
//!
//! # Architecture
//!
//! - `AIBackend` trait: the interface every backend implements
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - `Advisor`: renders prompts, calls the backend and drives conversations
//!
//! # Usage
//!
//! ```rust,ignore
//! if let Some(client) = AIClient::from_env() {
//!     let advisor = Advisor::new(client);
//!     let analysis = advisor.analyze_spending(&summary).await?;
//!     println!("{}", plain_text(&analysis.blocks));
//! }
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `BUDGEE_AI_BACKEND`: Backend to use (ollama, openai_compatible, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Default model name (default: llama3.2)
//! - `OPENAI_COMPAT_HOST`: Server URL (required for openai_compatible backend)
//! - `OPENAI_COMPAT_MODEL`: Model name (default: llama3.2)
//! - `OPENAI_COMPAT_API_KEY`: API key if required (optional)

mod advisor;
mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod types;

pub use advisor::{Advisor, ChatExchange, CHAT_APOLOGY};
pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;
pub use parsing::{parse_structured, plain_text, Block, ListItem, Span, Trend};
pub use types::*;

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model_router::{ModelRouter, TaskType};

/// Environment variable selecting the backend
pub const AI_BACKEND_ENV: &str = "BUDGEE_AI_BACKEND";

/// Trait defining the interface for all AI backends
///
/// Backends should be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Run a prompt and return the model's text
    async fn generate(&self, request: &GenerateRequest) -> Result<String>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the default model name
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;

    /// Get router configuration info
    fn router_info(&self) -> RouterInfo;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// OpenAI-compatible backend (vLLM, LocalAI, llama-server, etc.)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `BUDGEE_AI_BACKEND` to determine which backend to use:
    /// - `ollama` (default): Uses OLLAMA_HOST and OLLAMA_MODEL
    /// - `openai_compatible`: Uses OPENAI_COMPAT_HOST, OPENAI_COMPAT_MODEL
    ///   and OPENAI_COMPAT_API_KEY
    /// - `mock`: Canned responses, no server needed
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var(AI_BACKEND_ENV).unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(AIClient::Ollama),
            "openai_compatible" | "openai" | "vllm" | "localai" | "llamacpp" => {
                OpenAICompatibleBackend::from_env().map(AIClient::OpenAICompatible)
            }
            "mock" => Some(AIClient::Mock(MockBackend::new())),
            _ => {
                warn!(backend = %backend, "Unknown {}, falling back to ollama", AI_BACKEND_ENV);
                OllamaBackend::from_env().map(AIClient::Ollama)
            }
        }
    }

    /// Create an Ollama backend directly
    pub fn ollama(host: &str, model: &str) -> Self {
        AIClient::Ollama(OllamaBackend::new(host, model))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }

    /// Create a new instance with a different default model
    pub fn with_model(&self, model: &str) -> Self {
        match self {
            AIClient::Ollama(b) => AIClient::Ollama(b.with_model(model)),
            AIClient::OpenAICompatible(b) => AIClient::OpenAICompatible(b.with_model(model)),
            AIClient::Mock(b) => AIClient::Mock(b.with_model(model)),
        }
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        match self {
            AIClient::Ollama(b) => b.generate(request).await,
            AIClient::OpenAICompatible(b) => b.generate(request).await,
            AIClient::Mock(b) => b.generate(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.model(),
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::Ollama(b) => b.host(),
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }

    fn router_info(&self) -> RouterInfo {
        match self {
            AIClient::Ollama(b) => b.router_info(),
            AIClient::OpenAICompatible(b) => b.router_info(),
            AIClient::Mock(b) => b.router_info(),
        }
    }
}

/// Model and timeout the router picks for a task
fn route(router: &RwLock<ModelRouter>, task: TaskType) -> Result<(String, Duration)> {
    let router = router
        .read()
        .map_err(|_| Error::Ai("Failed to acquire model router lock".into()))?;
    Ok((
        router.model_for_task(task).to_string(),
        router.timeout_for_task(task),
    ))
}

/// Feed the outcome of a call back into model health tracking
fn record_outcome<T>(router: &RwLock<ModelRouter>, model: &str, outcome: &Result<T>) {
    let Ok(mut router) = router.write() else {
        return;
    };
    match outcome {
        Ok(_) => router.record_success(model),
        Err(e) => {
            warn!(model, error = %e, "AI request failed");
            router.record_failure(model);
        }
    }
}

/// Describe the router for status output
fn describe_router(router: &RwLock<ModelRouter>, fallback_default: &str) -> RouterInfo {
    let mut task_models = Vec::new();
    let mut default_model = fallback_default.to_string();
    let mut fallback_model = None;

    if let Ok(router) = router.read() {
        default_model = router.config().default_model.clone();
        fallback_model = router.config().fallback_model.clone();

        for task in TaskType::all() {
            let model = router.model_for_task(*task);
            if model != default_model {
                task_models.push((task.as_str().to_string(), model.to_string()));
            }
        }
    }

    RouterInfo {
        default_model,
        fallback_model,
        task_models,
    }
}

/// Router loaded from config with `model` as the default
fn router_with_default(model: &str) -> ModelRouter {
    let mut router = ModelRouter::default();
    router.set_default_model(model);
    router
}
