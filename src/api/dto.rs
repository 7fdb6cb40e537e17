//! HTTP request and response DTOs
//!
//! List responses are wrapped as `{"data": ...}`.

use serde::{Deserialize, Serialize};

use crate::data::{ChatMessage, ConnectionRequest, UserProfile};

/// Feed query parameters
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub after: Option<String>,
}

/// Generic `{"data": ...}` envelope
#[derive(Debug, Clone, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Feed page response
#[derive(Debug, Clone, Serialize)]
pub struct FeedResponse {
    pub data: Vec<UserProfile>,
    pub next_cursor: Option<String>,
}

/// Result of sending or reviewing a request
#[derive(Debug, Clone, Serialize)]
pub struct RequestResponse {
    pub message: String,
    pub data: ConnectionRequest,
}

/// Conversation history
#[derive(Debug, Clone, Serialize)]
pub struct ChatHistoryResponse {
    pub conversation_id: String,
    pub messages: Vec<ChatMessage>,
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
