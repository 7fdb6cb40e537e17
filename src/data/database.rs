//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with migrations embedded at compile time.

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

use super::models::*;
use crate::error::AppError;

/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Map constraint violations raised by the request insert onto domain errors.
fn map_request_insert_error(error: sqlx::Error) -> AppError {
    match error {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::DuplicateRequest
        }
        sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => AppError::SelfRequest,
        other => other.into(),
    }
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert or update a user's public profile
    pub async fn upsert_user(&self, user: &UserProfile) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, first_name, last_name, photo_url, age, gender, about, skills, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                photo_url = excluded.photo_url,
                age = excluded.age,
                gender = excluded.gender,
                about = excluded.about,
                skills = excluded.skills
            "#,
        )
        .bind(&user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.photo_url)
        .bind(user.age)
        .bind(&user.gender)
        .bind(&user.about)
        .bind(&user.skills)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a user's public profile
    pub async fn get_user(&self, id: &str) -> Result<Option<UserProfile>, AppError> {
        let user = sqlx::query_as::<_, UserProfile>(
            "SELECT id, first_name, last_name, photo_url, age, gender, about, skills FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Check if a user exists
    pub async fn user_exists(&self, id: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    // =========================================================================
    // Connection Requests
    // =========================================================================

    /// Insert a new connection request
    ///
    /// The unordered-pair uniqueness is enforced by the `pair_key` UNIQUE
    /// constraint, so concurrent inserts for the same pair (in either
    /// direction) cannot both succeed; the loser gets `DuplicateRequest`.
    pub async fn insert_connection_request(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        status: RequestStatus,
    ) -> Result<ConnectionRequest, AppError> {
        let now = Utc::now();
        let request = ConnectionRequest {
            id: EntityId::new().0,
            from_user_id: from_user_id.to_string(),
            to_user_id: to_user_id.to_string(),
            status,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO connection_requests (id, from_user_id, to_user_id, pair_key, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.from_user_id)
        .bind(&request.to_user_id)
        .bind(pair_key(from_user_id, to_user_id))
        .bind(request.status)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_request_insert_error)?;

        Ok(request)
    }

    /// Get connection request by ID
    pub async fn get_connection_request(
        &self,
        id: &str,
    ) -> Result<Option<ConnectionRequest>, AppError> {
        let request = sqlx::query_as::<_, ConnectionRequest>(
            "SELECT id, from_user_id, to_user_id, status, created_at, updated_at FROM connection_requests WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    /// Move a pending request to a review outcome
    ///
    /// Runs under `BEGIN IMMEDIATE` so the status check and the update
    /// observe the same row state.
    pub async fn review_connection_request(
        &self,
        request_id: &str,
        reviewer_id: &str,
        new_status: RequestStatus,
    ) -> Result<ConnectionRequest, AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result: Result<ConnectionRequest, AppError> = async {
            let mut request = sqlx::query_as::<_, ConnectionRequest>(
                "SELECT id, from_user_id, to_user_id, status, created_at, updated_at FROM connection_requests WHERE id = ?",
            )
            .bind(request_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(AppError::NotFound)?;

            if request.to_user_id != reviewer_id {
                return Err(AppError::Unauthorized);
            }

            if request.status.is_terminal() {
                return Err(AppError::InvalidTransition);
            }

            let now = Utc::now();
            sqlx::query("UPDATE connection_requests SET status = ?, updated_at = ? WHERE id = ?")
                .bind(new_status)
                .bind(now)
                .bind(request_id)
                .execute(&mut *conn)
                .await?;

            request.status = new_status;
            request.updated_at = now;
            Ok(request)
        }
        .await;

        match result {
            Ok(request) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(request)
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(error)
            }
        }
    }

    /// Pending requests addressed to a user, newest first
    pub async fn get_received_requests(
        &self,
        user_id: &str,
    ) -> Result<Vec<ReceivedRequest>, AppError> {
        let rows = sqlx::query_as::<_, ReceivedRequestRow>(
            r#"
            SELECT r.id, r.status, r.created_at,
                   u.id AS user_id, u.first_name, u.last_name, u.photo_url,
                   u.age, u.gender, u.about, u.skills
            FROM connection_requests r
            JOIN users u ON u.id = r.from_user_id
            WHERE r.to_user_id = ? AND r.status = 'interested'
            ORDER BY julianday(r.created_at) DESC, r.rowid DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ReceivedRequest::from).collect())
    }

    /// Check whether an accepted request exists between two users
    pub async fn has_connection(&self, user_a: &str, user_b: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM connection_requests WHERE pair_key = ? AND status = 'accepted'",
        )
        .bind(pair_key(user_a, user_b))
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Profiles of every user connected to `user_id`, ordered by id
    pub async fn get_connections(&self, user_id: &str) -> Result<Vec<UserProfile>, AppError> {
        let users = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.first_name, u.last_name, u.photo_url, u.age, u.gender, u.about, u.skills
            FROM connection_requests r
            JOIN users u
              ON u.id = CASE WHEN r.from_user_id = ?1 THEN r.to_user_id ELSE r.from_user_id END
            WHERE (r.from_user_id = ?1 OR r.to_user_id = ?1) AND r.status = 'accepted'
            ORDER BY u.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    // =========================================================================
    // Feed
    // =========================================================================

    /// Candidate profiles for a user's feed
    ///
    /// Excludes the user and anyone sharing any request row with them,
    /// whatever its status or direction. Ordered by ascending id.
    ///
    /// # Arguments
    /// * `after` - Keyset cursor: only ids strictly greater are returned
    /// * `limit` - Maximum number of results
    /// * `offset` - Rows to skip (offset paging, ignored by callers using `after`)
    pub async fn get_feed_candidates(
        &self,
        user_id: &str,
        after: Option<&str>,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<UserProfile>, AppError> {
        let users = sqlx::query_as::<_, UserProfile>(
            r#"
            SELECT u.id, u.first_name, u.last_name, u.photo_url, u.age, u.gender, u.about, u.skills
            FROM users u
            WHERE u.id <> ?1
              AND (?2 IS NULL OR u.id > ?2)
              AND NOT EXISTS (
                  SELECT 1 FROM connection_requests r
                  WHERE (r.from_user_id = ?1 AND r.to_user_id = u.id)
                     OR (r.to_user_id = ?1 AND r.from_user_id = u.id)
              )
            ORDER BY u.id ASC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(user_id)
        .bind(after)
        .bind(i64::from(limit))
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Append a message to a conversation
    ///
    /// The text is stored trimmed.
    ///
    /// # Errors
    /// `Validation` if the text is blank
    pub async fn insert_message(
        &self,
        conversation_id: &ConversationId,
        sender_id: &str,
        text: &str,
    ) -> Result<Message, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation("Message text cannot be empty".to_string()));
        }

        let id = EntityId::new().0;
        let sent_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO messages (id, conversation_id, sender_id, text, sent_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(conversation_id.as_str())
        .bind(sender_id)
        .bind(text)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::Database(ref db_err) if db_err.is_check_violation() => {
                AppError::Validation("Message text cannot be empty".to_string())
            }
            other => other.into(),
        })?;

        Ok(Message {
            id,
            seq: result.last_insert_rowid(),
            conversation_id: conversation_id.as_str().to_string(),
            sender_id: sender_id.to_string(),
            text: text.to_string(),
            sent_at,
        })
    }

    /// All messages of a conversation in (sent_at, seq) order
    pub async fn get_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, seq, conversation_id, sender_id, text, sent_at
            FROM messages
            WHERE conversation_id = ?
            ORDER BY julianday(sent_at) ASC, seq ASC
            "#,
        )
        .bind(conversation_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Messages of a conversation joined with sender display fields
    pub async fn get_chat_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<ChatMessage>, AppError> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT m.id, m.sender_id, u.first_name, u.last_name, u.photo_url, m.text, m.sent_at
            FROM messages m
            LEFT JOIN users u ON u.id = m.sender_id
            WHERE m.conversation_id = ?
            ORDER BY julianday(m.sent_at) ASC, m.seq ASC
            "#,
        )
        .bind(conversation_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Delete every message of a conversation
    ///
    /// Returns the number of messages removed; clearing an empty
    /// conversation is a no-op.
    pub async fn delete_messages(&self, conversation_id: &ConversationId) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(conversation_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Flat row for the received-requests join
#[derive(sqlx::FromRow)]
struct ReceivedRequestRow {
    id: String,
    status: RequestStatus,
    created_at: chrono::DateTime<Utc>,
    user_id: String,
    first_name: String,
    last_name: Option<String>,
    photo_url: Option<String>,
    age: Option<i64>,
    gender: Option<String>,
    about: Option<String>,
    skills: Option<String>,
}

impl From<ReceivedRequestRow> for ReceivedRequest {
    fn from(row: ReceivedRequestRow) -> Self {
        Self {
            id: row.id,
            status: row.status,
            created_at: row.created_at,
            from_user: UserProfile {
                id: row.user_id,
                first_name: row.first_name,
                last_name: row.last_name,
                photo_url: row.photo_url,
                age: row.age,
                gender: row.gender,
                about: row.about,
                skills: row.skills,
            },
        }
    }
}
