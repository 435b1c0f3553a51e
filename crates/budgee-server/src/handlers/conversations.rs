//! Advisor conversation handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;

use crate::{get_user_email, AppError, AppState, SuccessResponse};
use budgee_core::models::{ChatMessage, Conversation};
use budgee_core::{ChatExchange, FinancialSummary, LedgerEvent};

/// Query parameters for listing conversations
#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    /// Case-insensitive substring of the conversation name
    pub search: Option<String>,
}

/// GET /api/conversations - Most recently active first
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConversationQuery>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let conversations = match params.search.as_deref() {
        Some(query) => state.db.search_conversations(query)?,
        None => state.db.list_conversations()?,
    };
    Ok(Json(conversations))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    pub name: Option<String>,
}

/// POST /api/conversations - Start a conversation
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Option<Json<CreateConversationRequest>>,
) -> Result<Json<Conversation>, AppError> {
    let user_email = get_user_email(&headers);
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let conversation = state.db.create_conversation(req.name.as_deref())?;

    state.db.log_audit(
        &user_email,
        "create",
        Some("conversation"),
        Some(conversation.id),
        None,
    )?;
    state.events.publish(LedgerEvent::ConversationChanged {
        id: conversation.id,
    });

    Ok(Json(conversation))
}

#[derive(Debug, Deserialize)]
pub struct RenameConversationRequest {
    pub name: String,
}

/// PATCH /api/conversations/:id - Rename a conversation
pub async fn rename_conversation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<RenameConversationRequest>,
) -> Result<Json<Conversation>, AppError> {
    let user_email = get_user_email(&headers);

    let conversation = state.db.rename_conversation(id, &req.name)?;

    state
        .db
        .log_audit(&user_email, "rename", Some("conversation"), Some(id), None)?;
    state.events.publish(LedgerEvent::ConversationChanged { id });

    Ok(Json(conversation))
}

/// DELETE /api/conversations/:id - Delete a conversation and its messages
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    let user_email = get_user_email(&headers);

    if !state.db.delete_conversation(id)? {
        return Err(AppError::not_found("Conversation not found"));
    }

    state
        .db
        .log_audit(&user_email, "delete", Some("conversation"), Some(id), None)?;
    state.events.publish(LedgerEvent::ConversationDeleted { id });

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/conversations/:id/messages - History, oldest first; marks the conversation read
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    if state.db.get_conversation(id)?.is_none() {
        return Err(AppError::not_found("Conversation not found"));
    }

    let messages = state.db.list_chat_messages(id)?;
    state.db.mark_conversation_read(id)?;

    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

/// POST /api/conversations/:id/messages - Send a message to the advisor
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<ChatExchange>, AppError> {
    let advisor = state.advisor()?;
    let user_email = get_user_email(&headers);

    let summary = FinancialSummary::load(&state.db, state.config.utc_offset)?;
    let exchange = advisor
        .send_chat_message(&state.db, Some(id), &req.text, &summary)
        .await?;

    state.db.log_audit(
        &user_email,
        "send_message",
        Some("conversation"),
        Some(id),
        Some(&format!("failed={}", exchange.failed)),
    )?;

    state.events.publish(LedgerEvent::MessageAdded {
        conversation_id: id,
        id: exchange.user_message.id,
    });
    state.events.publish(LedgerEvent::MessageAdded {
        conversation_id: id,
        id: exchange.advisor_message.id,
    });
    state.events.publish(LedgerEvent::ConversationChanged { id });

    Ok(Json(exchange))
}
