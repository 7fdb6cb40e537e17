//! Chat service
//!
//! Message persistence and history between connected users. Live
//! delivery lives in `realtime`; this service is what both the
//! websocket gateway and the HTTP history endpoints call.

use std::sync::Arc;

use crate::config::ChatConfig;
use crate::data::{ChatMessage, ConversationId, Database, Message};
use crate::error::AppError;
use crate::metrics::MESSAGES_SENT_TOTAL;

/// Chat service
pub struct ChatService {
    db: Arc<Database>,
    config: ChatConfig,
}

impl ChatService {
    /// Create new chat service
    pub fn new(db: Arc<Database>, config: ChatConfig) -> Self {
        Self { db, config }
    }

    /// Trim and check message text
    ///
    /// # Errors
    /// `Validation` if the text is blank or longer than the configured limit
    pub fn validate_text<'a>(&self, text: &'a str) -> Result<&'a str, AppError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "Message text must not be empty".to_string(),
            ));
        }

        let length = trimmed.chars().count();
        if length > self.config.max_message_length {
            return Err(AppError::Validation(format!(
                "Message text exceeds {} characters",
                self.config.max_message_length
            )));
        }

        Ok(trimmed)
    }

    /// Persist a message from `sender_id` to `target_user_id`
    ///
    /// # Errors
    /// - `Unauthorized` if the users are not connected
    /// - `Validation` if the text is rejected
    pub async fn send(
        &self,
        sender_id: &str,
        target_user_id: &str,
        text: &str,
    ) -> Result<Message, AppError> {
        self.ensure_connected(sender_id, target_user_id).await?;
        let text = self.validate_text(text)?;

        let conversation_id = ConversationId::between(sender_id, target_user_id);
        let message = self.db.insert_message(&conversation_id, sender_id, text).await?;

        MESSAGES_SENT_TOTAL.inc();
        tracing::debug!(
            message_id = %message.id,
            conversation_id = %conversation_id,
            sender_id,
            "Message stored"
        );

        Ok(message)
    }

    /// Ordered history between two connected users
    pub async fn history(
        &self,
        user_id: &str,
        target_user_id: &str,
    ) -> Result<(ConversationId, Vec<ChatMessage>), AppError> {
        self.ensure_connected(user_id, target_user_id).await?;

        let conversation_id = ConversationId::between(user_id, target_user_id);
        let messages = self.db.get_chat_messages(&conversation_id).await?;
        Ok((conversation_id, messages))
    }

    /// Delete the whole history between two connected users
    ///
    /// Clearing an empty conversation succeeds. Returns the number of
    /// messages removed.
    pub async fn clear(&self, user_id: &str, target_user_id: &str) -> Result<u64, AppError> {
        self.ensure_connected(user_id, target_user_id).await?;

        let conversation_id = ConversationId::between(user_id, target_user_id);
        let removed = self.db.delete_messages(&conversation_id).await?;

        tracing::info!(
            conversation_id = %conversation_id,
            user_id,
            removed,
            "Conversation cleared"
        );

        Ok(removed)
    }

    async fn ensure_connected(&self, user_id: &str, target_user_id: &str) -> Result<(), AppError> {
        if user_id == target_user_id || !self.db.has_connection(user_id, target_user_id).await? {
            return Err(AppError::Unauthorized);
        }
        Ok(())
    }
}
