//! Budgee Core Library
//!
//! Shared functionality for the Budgee mood-aware budgeting tool:
//! - Database access and migrations (ledger, budget, notifications, chat)
//! - Mood-weighted daily aggregation for the spending chart
//! - Change feed for live clients
//! - Pluggable AI backends for the mindful financial advisor
//! - Model router for task-based model selection
//! - Prompt library for customizable advisor prompts
//! - Transaction export and read-only MCP tools

pub mod ai;
pub mod context;
pub mod db;
pub mod error;
pub mod events;
pub mod export;
pub mod model_router;
pub mod models;
pub mod mood;
pub mod prompts;
pub mod tools;

/// Test utilities including mock Ollama server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, Advisor, ChatExchange, GenerateRequest, MockBackend, OllamaBackend,
    OpenAICompatibleBackend, RouterInfo, SpendingAnalysis, CHAT_APOLOGY,
};
pub use context::FinancialSummary;
pub use db::{AuditEntry, Database, MonthlyReset, TransactionFilter};
pub use error::{Error, Result};
pub use events::{EventBus, LedgerEvent, Subscription};
pub use export::{export_transactions, ExportFormat};
pub use model_router::{ModelRouter, RouterConfig, TaskConfig, TaskType};
pub use mood::{DailyAggregate, MoodChart};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
