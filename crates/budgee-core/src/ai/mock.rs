//! Mock backend for testing
//!
//! Returns canned advisor text for each task. Useful for unit tests and
//! development without a running model server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::model_router::TaskType;

use super::types::{GenerateRequest, RouterInfo};
use super::AIBackend;

const CHAT_REPLY: &str = "I hear that money has been on your mind. Your remaining budget \
still covers the rest of the month if you keep daily spending steady.\n\n\
**Try this:** take three slow breaths before your next purchase and notice how you feel.";

const ANALYSIS_REPLY: &str = "# Overall spending patterns\n\
Most of your spending goes to food and transport.\n\n\
# Emotional spending trends\n\
* Spending tends to increase on days you feel unhappy\n\
* Purchases you felt happy about are smaller on average\n\n\
# Recommendations\n\
1. Pause for a day before purchases over **₱1,000**\n\
2. Move a fixed amount to savings at the start of each month";

const TITLE_REPLY: &str = "\"Budget Check-In\"";

/// Mock AI backend for testing
///
/// Replies can be overridden per task, and every request is recorded so
/// tests can inspect the rendered prompts.
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    failing: bool,
    replies: HashMap<TaskType, String>,
    requests: Arc<Mutex<Vec<GenerateRequest>>>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Default::default()
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self::default()
    }

    /// Every generate call fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// Reply with `text` for `task`
    pub fn with_reply(mut self, task: TaskType, text: &str) -> Self {
        self.replies.insert(task, text.to_string());
        self
    }

    /// Create a new instance with a different model (no-op for mock)
    pub fn with_model(&self, _model: &str) -> Self {
        self.clone()
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if self.failing {
            return Err(Error::Ai("mock backend configured to fail".into()));
        }

        let reply = match self.replies.get(&request.task) {
            Some(reply) => reply.clone(),
            None => match request.task {
                TaskType::Chat => CHAT_REPLY.to_string(),
                TaskType::Analysis => ANALYSIS_REPLY.to_string(),
                TaskType::Title => TITLE_REPLY.to_string(),
            },
        };
        Ok(reply)
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }

    fn router_info(&self) -> RouterInfo {
        RouterInfo {
            default_model: "mock".to_string(),
            fallback_model: None,
            task_models: vec![],
        }
    }
}
