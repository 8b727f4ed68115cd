use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_user_id, require};
use crate::api::AppState;
use crate::domain::{Chat, Message, NewMessage, UserId, ADMIN_ID};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatRequest {
    pub customer_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatThread {
    pub chat: Chat,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadResponse {
    pub user_id: UserId,
    pub unread_count: i64,
}

pub async fn list_chats(State(state): State<AppState>) -> Result<Json<Vec<Chat>>, AppError> {
    Ok(Json(state.repo.list_chats().await?))
}

/// Returns the customer's chat, opening one if none exists.
pub async fn create_chat(
    State(state): State<AppState>,
    Json(req): Json<CreateChatRequest>,
) -> Result<Json<Chat>, AppError> {
    let customer = parse_user_id(&req.customer_id)?;
    if customer.as_str() == ADMIN_ID {
        return Err(AppError::BadRequest(
            "customerId cannot be the admin desk".to_string(),
        ));
    }
    Ok(Json(state.repo.create_chat(&customer).await?))
}

/// The chat with its messages in chronological order.
pub async fn chat_messages(
    Path(chat_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ChatThread>, AppError> {
    let chat = state
        .repo
        .get_chat(&chat_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Chat {} not found", chat_id)))?;
    let messages = state.repo.messages_for_customer(&chat.customer_id).await?;
    Ok(Json(ChatThread { chat, messages }))
}

pub async fn add_message(
    State(state): State<AppState>,
    Json(message): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    require("senderId", message.sender_id.as_str())?;
    require("receiverId", message.receiver_id.as_str())?;
    require("content", &message.content)?;
    if message.sender_id == message.receiver_id {
        return Err(AppError::BadRequest(
            "senderId and receiverId must differ".to_string(),
        ));
    }

    let stored = state.repo.add_message(&message).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn mark_read(
    Path(chat_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if !state.repo.mark_chat_read(&chat_id).await? {
        return Err(AppError::NotFound(format!("Chat {} not found", chat_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_chat(
    Path(chat_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    if !state.repo.delete_chat(&chat_id).await? {
        return Err(AppError::NotFound(format!("Chat {} not found", chat_id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// "admin" gets the total across all chats; a customer gets their own chat's count.
pub async fn unread_count(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UnreadResponse>, AppError> {
    let user_id = parse_user_id(&user_id)?;
    let unread_count = state.repo.unread_count(&user_id).await?;
    Ok(Json(UnreadResponse {
        user_id,
        unread_count,
    }))
}
