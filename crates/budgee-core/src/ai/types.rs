//! AI backend request and response types
//!
//! These types are backend-agnostic and used across all AI implementations.

use serde::Serialize;

use crate::model_router::TaskType;

use super::parsing::Block;

/// A rendered prompt ready to send to a backend
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Task the prompt serves, used for model routing
    pub task: TaskType,
    /// Instructions sent ahead of the prompt
    pub system: Option<String>,
    pub prompt: String,
}

impl GenerateRequest {
    pub fn new(task: TaskType, prompt: impl Into<String>) -> Self {
        Self {
            task,
            system: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// System and user text joined for backends with a single prompt field
    pub fn combined(&self) -> String {
        match &self.system {
            Some(system) => format!("{}\n\n{}", system, self.prompt),
            None => self.prompt.clone(),
        }
    }
}

/// Router configuration information for display
#[derive(Debug, Clone, Serialize)]
pub struct RouterInfo {
    /// Default model for all tasks
    pub default_model: String,
    /// Fallback model when primary fails
    pub fallback_model: Option<String>,
    /// Task-specific model overrides (only non-default)
    pub task_models: Vec<(String, String)>,
}

/// Advisor review of the ledger
#[derive(Debug, Clone, Serialize)]
pub struct SpendingAnalysis {
    /// Model output as returned
    pub raw: String,
    /// Output split into headings, lists and paragraphs
    pub blocks: Vec<Block>,
    pub model: String,
}
