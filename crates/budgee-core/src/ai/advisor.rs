//! Mindful financial advisor
//!
//! Renders the advisor prompts from the prompt library, runs them on an AI
//! backend and stores conversations in the database.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::FinancialSummary;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::model_router::TaskType;
use crate::models::{ChatMessage, Conversation, Sender, DEFAULT_CONVERSATION_NAME};
use crate::prompts::{PromptId, PromptLibrary};

use super::parsing::parse_structured;
use super::types::{GenerateRequest, SpendingAnalysis};
use super::{AIBackend, AIClient};

/// Stored as the advisor's reply when the backend fails
pub const CHAT_APOLOGY: &str =
    "I apologize, but I'm having trouble processing your request. Please try again.";

/// Earlier messages included in a chat prompt
const HISTORY_MESSAGES: usize = 10;

/// Result of one user turn in a conversation
#[derive(Debug, Clone, Serialize)]
pub struct ChatExchange {
    pub conversation: Conversation,
    pub user_message: ChatMessage,
    pub advisor_message: ChatMessage,
    /// Set when this turn gave the conversation its title
    pub title: Option<String>,
    /// The backend failed and the apology was stored instead
    pub failed: bool,
}

/// Advisor bound to an AI backend and a prompt library
#[derive(Clone)]
pub struct Advisor {
    client: AIClient,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl Advisor {
    /// Advisor using prompt overrides from the data dir
    pub fn new(client: AIClient) -> Self {
        Self::with_prompts(client, PromptLibrary::new())
    }

    pub fn with_prompts(client: AIClient, prompts: PromptLibrary) -> Self {
        Self {
            client,
            prompts: Arc::new(RwLock::new(prompts)),
        }
    }

    pub fn client(&self) -> &AIClient {
        &self.client
    }

    /// Review spending amounts together with moods
    pub async fn analyze_spending(&self, summary: &FinancialSummary) -> Result<SpendingAnalysis> {
        let owned = summary.template_vars()?;
        let vars = borrow_vars(&owned);
        let request = self.render(PromptId::SpendingAnalysis, TaskType::Analysis, &vars)?;

        let raw = require_text(self.client.generate(&request).await?)?;
        info!(
            model = self.client.model(),
            transactions = summary.transactions.len(),
            "Generated spending analysis"
        );

        Ok(SpendingAnalysis {
            blocks: parse_structured(&raw),
            raw,
            model: self.client.model().to_string(),
        })
    }

    /// Answer a user message in the context of their finances
    ///
    /// `history` is the conversation before `user_message`, oldest first.
    pub async fn reply(
        &self,
        summary: &FinancialSummary,
        history: &[ChatMessage],
        user_message: &str,
    ) -> Result<String> {
        let mut owned = summary.template_vars()?;
        owned.insert("history", format_history(history));
        owned.insert("message", user_message.to_string());

        let vars = borrow_vars(&owned);
        let request = self.render(PromptId::AdvisorChat, TaskType::Chat, &vars)?;
        require_text(self.client.generate(&request).await?)
    }

    /// Short title for a conversation, "New Chat" when none can be produced
    pub async fn generate_title(&self, user_message: &str, advisor_reply: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("message", user_message);
        vars.insert("reply", advisor_reply);

        let generated = match self.render(PromptId::ChatTitle, TaskType::Title, &vars) {
            Ok(request) => self.client.generate(&request).await,
            Err(e) => Err(e),
        };

        match generated {
            Ok(text) => {
                clean_title(&text).unwrap_or_else(|| DEFAULT_CONVERSATION_NAME.to_string())
            }
            Err(e) => {
                warn!(error = %e, "Title generation failed");
                DEFAULT_CONVERSATION_NAME.to_string()
            }
        }
    }

    /// Run one user turn: store the message, ask the advisor, store the reply
    ///
    /// Starts a new conversation when `conversation_id` is `None`. A backend
    /// failure is not an error: the apology is stored as the reply. A
    /// conversation still carrying the default name gets a generated title.
    pub async fn send_chat_message(
        &self,
        db: &Database,
        conversation_id: Option<i64>,
        text: &str,
        summary: &FinancialSummary,
    ) -> Result<ChatExchange> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidData("Message cannot be empty".into()));
        }

        let conversation = match conversation_id {
            Some(id) => db
                .get_conversation(id)?
                .ok_or_else(|| Error::NotFound(format!("Conversation {}", id)))?,
            None => db.create_conversation(None)?,
        };
        let id = conversation.id;

        let history = db.list_chat_messages(id)?;
        let user_message = db.add_chat_message(id, Sender::User, text)?;
        db.update_conversation_preview(id, text)?;

        let (reply, failed) = match self.reply(summary, &history, text).await {
            Ok(reply) => (reply, false),
            Err(e) => {
                warn!(conversation = id, error = %e, "Advisor reply failed");
                (CHAT_APOLOGY.to_string(), true)
            }
        };
        let advisor_message = db.add_chat_message(id, Sender::Advisor, &reply)?;

        let mut title = None;
        if conversation.has_default_name() && !failed {
            let generated = self.generate_title(text, &reply).await;
            if generated != DEFAULT_CONVERSATION_NAME {
                db.rename_conversation(id, &generated)?;
                db.update_conversation_preview(id, &reply)?;
                debug!(conversation = id, title = %generated, "Titled conversation");
                title = Some(generated);
            }
        }

        let conversation = db
            .get_conversation(id)?
            .ok_or_else(|| Error::NotFound(format!("Conversation {}", id)))?;

        Ok(ChatExchange {
            conversation,
            user_message,
            advisor_message,
            title,
            failed,
        })
    }

    /// Render a prompt into a request
    ///
    /// The task comes from the prompt's frontmatter so overrides can reroute
    /// it; `default_task` covers an unknown value.
    fn render(
        &self,
        id: PromptId,
        default_task: TaskType,
        vars: &HashMap<&str, &str>,
    ) -> Result<GenerateRequest> {
        let mut prompts = self
            .prompts
            .write()
            .map_err(|_| Error::Ai("Failed to acquire prompt library lock".into()))?;
        let prompt = prompts.get(id)?;

        let task = prompt
            .metadata
            .task_type
            .parse::<TaskType>()
            .unwrap_or(default_task);

        let mut request = GenerateRequest::new(task, prompt.render_user(vars));
        if let Some(system) = prompt.render_system(vars) {
            request = request.with_system(system);
        }
        Ok(request)
    }
}

fn borrow_vars<'a>(owned: &'a HashMap<&'static str, String>) -> HashMap<&'a str, &'a str> {
    owned.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

fn require_text(text: String) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::Ai("Empty response from model".into()));
    }
    Ok(trimmed.to_string())
}

/// Transcript lines for the chat prompt
fn format_history(history: &[ChatMessage]) -> String {
    let skip = history.len().saturating_sub(HISTORY_MESSAGES);
    history[skip..]
        .iter()
        .map(|m| {
            let who = match m.sender {
                Sender::User => "User",
                Sender::Advisor => "Advisor",
            };
            format!("{}: {}", who, m.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First line of the model output without surrounding quotes
fn clean_title(text: &str) -> Option<String> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let title = line
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '*'))
        .trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}
