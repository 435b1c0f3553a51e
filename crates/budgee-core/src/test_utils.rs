//! Test utilities for budgee-core
//!
//! This module provides testing infrastructure including a mock model server
//! that speaks both the Ollama and the OpenAI-compatible APIs.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::oneshot;

pub const MOCK_TITLE: &str = "Mindful Spending Chat";

pub const MOCK_ANALYSIS: &str = "# Overall spending patterns\n\
Food is your largest expense.\n\n\
# Emotional spending trends\n\
* Spending is high on days you feel unhappy\n\
* Happy purchases are smaller\n\n\
# Recommendations\n\
1. Set a daily **food** limit\n\
2. Wait a day before regret-prone purchases";

/// A request seen by the mock server
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
}

#[derive(Clone, Default)]
struct MockState {
    failing: bool,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

/// Mock model server for testing and development
pub struct MockOllamaServer {
    addr: SocketAddr,
    state: MockState,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockOllamaServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::start_with(MockState::default()).await
    }

    /// Start a server whose generate endpoints answer 500
    pub async fn start_failing() -> Self {
        Self::start_with(MockState {
            failing: true,
            ..Default::default()
        })
        .await
    }

    async fn start_with(state: MockState) -> Self {
        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat_completions))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockOllamaServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pick a reply from the prompt text (patterns match prompts/*.md)
fn reply_for(system: Option<&str>, prompt: &str) -> String {
    if prompt.contains("concise title") {
        format!("\"{}\"", MOCK_TITLE)
    } else if prompt.contains("analyze these transactions") {
        MOCK_ANALYSIS.to_string()
    } else {
        let message = prompt
            .rsplit("User message: ")
            .next()
            .unwrap_or(prompt)
            .trim();
        let stressed = system.is_some() && message.to_lowercase().contains("stress");
        if stressed {
            format!(
                "I understand \"{}\" feels heavy. Try a slow breathing exercise before reviewing your budget.",
                message
            )
        } else {
            format!("Here is some advice about \"{}\".", message)
        }
    }
}

fn record(state: &MockState, model: &str, system: Option<&str>, prompt: &str) {
    state.requests.lock().unwrap().push(ReceivedRequest {
        model: model.to_string(),
        system: system.map(str::to_string),
        prompt: prompt.to_string(),
    });
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<serde_json::Value> {
    Json(json!({
        "models": [{
            "name": "llama3.2:latest",
            "modified_at": "2024-01-01T00:00:00Z",
            "size": 4_000_000_000u64
        }]
    }))
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(default)]
    system: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}

/// Ollama generate endpoint
async fn handle_generate(
    State(state): State<MockState>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, StatusCode> {
    record(&state, &request.model, request.system.as_deref(), &request.prompt);
    if state.failing {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(Json(GenerateResponse {
        response: reply_for(request.system.as_deref(), &request.prompt),
        model: request.model,
        done: true,
    }))
}

async fn handle_models() -> Json<serde_json::Value> {
    Json(json!({ "object": "list", "data": [{ "id": "llama3.2", "object": "model" }] }))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatRequestMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatRequestMessage {
    role: String,
    content: String,
}

/// OpenAI-compatible chat completions endpoint
async fn handle_chat_completions(
    State(state): State<MockState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let system = request
        .messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str());
    let prompt = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    record(&state, &request.model, system, prompt);
    if state.failing {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    Ok(Json(json!({
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": reply_for(system, prompt) },
            "finish_reason": "stop"
        }]
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AIBackend, AIClient, GenerateRequest as AiRequest, OpenAICompatibleBackend};
    use crate::model_router::TaskType;

    #[tokio::test]
    async fn test_mock_server_health_check() {
        let server = MockOllamaServer::start().await;
        let client = AIClient::ollama(&server.url(), "llama3.2");
        assert!(client.health_check().await);
    }

    #[tokio::test]
    async fn test_mock_server_title() {
        let server = MockOllamaServer::start().await;
        let client = AIClient::ollama(&server.url(), "llama3.2");
        let reply = client
            .generate(&AiRequest::new(
                TaskType::Title,
                "Summarize the following conversation into a concise title (max 5 words)",
            ))
            .await
            .unwrap();
        assert_eq!(reply, format!("\"{}\"", MOCK_TITLE));
    }

    #[tokio::test]
    async fn test_mock_server_records_system_prompt() {
        let server = MockOllamaServer::start().await;
        let client = AIClient::ollama(&server.url(), "llama3.2");
        client
            .generate(&AiRequest::new(TaskType::Chat, "User message: hi").with_system("Be kind"))
            .await
            .unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system.as_deref(), Some("Be kind"));
    }

    #[tokio::test]
    async fn test_mock_server_openai_compatible() {
        let server = MockOllamaServer::start().await;
        let client =
            AIClient::OpenAICompatible(OpenAICompatibleBackend::new(&server.url(), "llama3.2"));
        assert!(client.health_check().await);

        let reply = client
            .generate(&AiRequest::new(TaskType::Chat, "User message: budget tips"))
            .await
            .unwrap();
        assert_eq!(reply, "Here is some advice about \"budget tips\".");
    }

    #[tokio::test]
    async fn test_advisor_conversation_over_http() {
        use crate::ai::Advisor;
        use crate::context::FinancialSummary;
        use crate::db::Database;
        use crate::prompts::PromptLibrary;
        use chrono::{Offset, Utc};

        let server = MockOllamaServer::start().await;
        let advisor = Advisor::with_prompts(
            AIClient::ollama(&server.url(), "llama3.2"),
            PromptLibrary::embedded_only(),
        );

        let db = Database::in_memory().unwrap();
        db.set_total_budget(3000.0).unwrap();
        let summary = FinancialSummary::load(&db, Utc.fix()).unwrap();

        let exchange = advisor
            .send_chat_message(&db, None, "I'm so stressed about rent", &summary)
            .await
            .unwrap();

        assert!(!exchange.failed);
        assert!(exchange.advisor_message.text.contains("breathing"));
        assert_eq!(exchange.title.as_deref(), Some(MOCK_TITLE));

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0]
            .system
            .as_deref()
            .unwrap()
            .contains("\"total_budget\":3000.0"));
    }

    #[tokio::test]
    async fn test_mock_server_failing() {
        let server = MockOllamaServer::start_failing().await;
        let client = AIClient::ollama(&server.url(), "llama3.2");
        let result = client
            .generate(&AiRequest::new(TaskType::Chat, "User message: hi"))
            .await;
        assert!(result.is_err());
    }
}
