//! Chat history endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::dto::{ChatHistoryResponse, MessageResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;

/// GET /chat/:target_user_id
pub async fn get_history(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(target_user_id): Path<String>,
) -> Result<Json<ChatHistoryResponse>, AppError> {
    let (conversation_id, messages) = state
        .chat
        .history(&session.user_id, &target_user_id)
        .await?;

    Ok(Json(ChatHistoryResponse {
        conversation_id: conversation_id.to_string(),
        messages,
    }))
}

/// DELETE /chat/:target_user_id
///
/// Live room membership is unaffected.
pub async fn clear_history(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(target_user_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .chat
        .clear(&session.user_id, &target_user_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Conversation cleared".to_string(),
    }))
}
