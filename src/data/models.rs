//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical identity of the conversation between two users.
///
/// Independent of who initiated contact: the smaller id (byte order)
/// always comes first, so `between(a, b) == between(b, a)`. The first id
/// is length-prefixed (`"{len}:{first}:{second}"`) because user ids may
/// themselves contain `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn between(user_a: &str, user_b: &str) -> Self {
        let (first, second) = if user_a <= user_b {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        };
        Self(format!("{}:{first}:{second}", first.len()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unordered pair key for the connection request uniqueness constraint.
///
/// Shares the conversation's canonical ordering.
pub fn pair_key(user_a: &str, user_b: &str) -> String {
    ConversationId::between(user_a, user_b).0
}

// =============================================================================
// Users (owned by the profile subsystem)
// =============================================================================

/// Public profile of a user
///
/// Written by the profile subsystem; read here for feed candidates
/// and to decorate requests and chat history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub about: Option<String>,
    /// Comma separated skill tags
    pub skills: Option<String>,
}

// =============================================================================
// Connection requests
// =============================================================================

/// Lifecycle of a connection request
///
/// `Interested` is the only pending state; everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RequestStatus {
    Interested,
    Ignored,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interested => "interested",
            Self::Ignored => "ignored",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Whether the sender may open a request with this status
    pub fn is_sendable(&self) -> bool {
        matches!(self, Self::Interested | Self::Ignored)
    }

    /// Whether the addressee may move a pending request to this status
    pub fn is_review_outcome(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Interested)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interested" => Ok(Self::Interested),
            "ignored" => Ok(Self::Ignored),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(crate::error::AppError::Validation(format!(
                "Invalid status type: {other}"
            ))),
        }
    }
}

/// Directed record of one user's decision about another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConnectionRequest {
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pending request as seen by its addressee
#[derive(Debug, Clone, Serialize)]
pub struct ReceivedRequest {
    pub id: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    /// Sender's public profile
    pub from_user: UserProfile,
}

// =============================================================================
// Messages
// =============================================================================

/// A persisted chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    /// Insertion sequence, tie-breaker for equal timestamps
    pub seq: i64,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// Message decorated with the sender's display fields
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub photo_url: Option<String>,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_id_is_symmetric() {
        let ab = ConversationId::between("01HZA", "01HZB");
        let ba = ConversationId::between("01HZB", "01HZA");
        assert_eq!(ab, ba);
        assert_eq!(ab.as_str(), "5:01HZA:01HZB");
    }

    #[test]
    fn conversation_ids_differ_per_pair() {
        assert_ne!(
            ConversationId::between("alice", "bob"),
            ConversationId::between("alice", "carol")
        );
    }

    #[test]
    fn separator_in_user_ids_does_not_merge_pairs() {
        assert_ne!(
            ConversationId::between("a:b", "c"),
            ConversationId::between("a", "b:c")
        );
        assert_ne!(pair_key("a:b", "c"), pair_key("a", "b:c"));
    }

    #[test]
    fn status_parsing_rejects_unknown_values() {
        assert_eq!(
            "interested".parse::<RequestStatus>().unwrap(),
            RequestStatus::Interested
        );
        assert!("maybe".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn status_roles() {
        assert!(RequestStatus::Interested.is_sendable());
        assert!(RequestStatus::Ignored.is_sendable());
        assert!(!RequestStatus::Accepted.is_sendable());
        assert!(RequestStatus::Rejected.is_review_outcome());
        assert!(!RequestStatus::Interested.is_review_outcome());
        assert!(RequestStatus::Ignored.is_terminal());
        assert!(!RequestStatus::Interested.is_terminal());
    }
}
