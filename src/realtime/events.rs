//! Websocket wire events
//!
//! JSON text frames tagged by `type`. Anything that does not match a
//! known variant with its required fields is rejected at parse time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Message, UserProfile};
use crate::error::AppError;

/// Events sent by clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientEvent {
    JoinChat(JoinChat),
    SendMessage(SendMessage),
}

impl ClientEvent {
    /// Parse a text frame
    ///
    /// # Errors
    /// `Validation` for non-JSON, unknown `type` or missing fields
    pub fn parse(frame: &str) -> Result<Self, AppError> {
        serde_json::from_str(frame)
            .map_err(|e| AppError::Validation(format!("Malformed event: {e}")))
    }

    /// Identity the client claims to act as
    pub fn user_id(&self) -> &str {
        match self {
            ClientEvent::JoinChat(event) => &event.user_id,
            ClientEvent::SendMessage(event) => &event.user_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinChat {
    pub user_id: String,
    pub target_user_id: String,
    pub first_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub user_id: String,
    pub target_user_id: String,
    pub text: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Events pushed to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerEvent {
    MessageReceived(MessageReceived),
    Joined {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

impl ServerEvent {
    pub fn error(error: &AppError) -> Self {
        ServerEvent::Error {
            code: error.code(),
            message: error.public_message(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceived {
    pub message_id: String,
    pub conversation_id: String,
    pub sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl MessageReceived {
    /// Build the broadcast for a stored message
    ///
    /// Display fields come from the sender's stored profile when there is
    /// one; the client's echoed values only fill the gaps.
    pub fn new(message: Message, profile: Option<&UserProfile>, echoed: &SendMessage) -> Self {
        let first_name = profile
            .map(|p| p.first_name.clone())
            .or_else(|| echoed.first_name.clone());
        let last_name = profile
            .and_then(|p| p.last_name.clone())
            .or_else(|| echoed.last_name.clone());
        let photo_url = profile
            .and_then(|p| p.photo_url.clone())
            .or_else(|| echoed.photo_url.clone());

        Self {
            message_id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            first_name,
            last_name,
            photo_url,
            text: message.text,
            sent_at: message.sent_at,
        }
    }
}
