//! Feed service
//!
//! Produces pages of candidate profiles a user has not yet acted on.

use std::sync::Arc;

use serde::Serialize;

use crate::config::FeedConfig;
use crate::data::{Database, UserProfile};
use crate::error::AppError;

/// Paging parameters as supplied by the caller
#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    /// 1-based page number (offset paging). Shifts when candidates are
    /// acted on between fetches; `after` does not.
    pub page: Option<u32>,
    /// Requested page size
    pub limit: Option<u32>,
    /// Last user id seen (keyset paging, takes precedence over `page`)
    pub after: Option<String>,
}

/// One page of feed candidates
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub users: Vec<UserProfile>,
    /// Cursor for the next page, absent once the feed is exhausted
    pub next_cursor: Option<String>,
}

/// Feed service
pub struct FeedService {
    db: Arc<Database>,
    config: FeedConfig,
}

impl FeedService {
    /// Create new feed service
    pub fn new(db: Arc<Database>, config: FeedConfig) -> Self {
        Self { db, config }
    }

    /// Get a page of candidates for `user_id`
    ///
    /// Excludes the user and anyone sharing a request with them in either
    /// direction, whatever its status.
    ///
    /// # Errors
    /// Only store failures; an exhausted feed is an empty page.
    pub async fn get_feed(&self, user_id: &str, query: &FeedQuery) -> Result<FeedPage, AppError> {
        let limit = self.page_size(query.limit);

        let offset = match query.after {
            Some(_) => 0,
            None => u64::from(query.page.unwrap_or(1).max(1) - 1) * u64::from(limit),
        };

        let users = self
            .db
            .get_feed_candidates(user_id, query.after.as_deref(), limit, offset)
            .await?;

        let next_cursor = if users.len() == limit as usize {
            users.last().map(|u| u.id.clone())
        } else {
            None
        };

        tracing::debug!(user_id, count = users.len(), "Feed page served");

        Ok(FeedPage { users, next_cursor })
    }

    fn page_size(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(0) | None => self.config.default_page_size,
            Some(limit) => limit.min(self.config.max_page_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RequestStatus;
    use tempfile::TempDir;

    async fn create_service(users: &[&str]) -> (FeedService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(
            Database::connect(&temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        for id in users {
            db.upsert_user(&UserProfile {
                id: id.to_string(),
                first_name: id.to_uppercase(),
                last_name: None,
                photo_url: None,
                age: None,
                gender: None,
                about: None,
                skills: None,
            })
            .await
            .unwrap();
        }
        let config = FeedConfig {
            default_page_size: 2,
            max_page_size: 3,
        };
        (FeedService::new(db.clone(), config), db, temp_dir)
    }

    fn ids(page: &FeedPage) -> Vec<&str> {
        page.users.iter().map(|u| u.id.as_str()).collect()
    }

    #[tokio::test]
    async fn page_size_defaults_and_clamps() {
        let (service, _db, _temp_dir) = create_service(&[]).await;
        assert_eq!(service.page_size(None), 2);
        assert_eq!(service.page_size(Some(0)), 2);
        assert_eq!(service.page_size(Some(1)), 1);
        assert_eq!(service.page_size(Some(500)), 3);
    }

    #[tokio::test]
    async fn offset_pages_are_one_based() {
        let (service, _db, _temp_dir) = create_service(&["a", "b", "c", "d", "e"]).await;

        let first = service
            .get_feed("a", &FeedQuery { page: Some(0), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(ids(&first), vec!["b", "c"]);
        assert_eq!(first.next_cursor.as_deref(), Some("c"));

        let second = service
            .get_feed("a", &FeedQuery { page: Some(2), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(ids(&second), vec!["d", "e"]);

        let third = service
            .get_feed("a", &FeedQuery { page: Some(3), ..Default::default() })
            .await
            .unwrap();
        assert!(third.users.is_empty());
        assert!(third.next_cursor.is_none());
    }

    #[tokio::test]
    async fn cursor_paging_survives_reviews_between_fetches() {
        let (service, db, _temp_dir) = create_service(&["a", "b", "c", "d", "e", "f"]).await;

        let first = service.get_feed("a", &FeedQuery::default()).await.unwrap();
        assert_eq!(ids(&first), vec!["b", "c"]);

        // Acting on the first page shrinks the candidate set
        db.insert_connection_request("a", "b", RequestStatus::Ignored)
            .await
            .unwrap();
        db.insert_connection_request("a", "c", RequestStatus::Interested)
            .await
            .unwrap();

        let second = service
            .get_feed(
                "a",
                &FeedQuery {
                    after: first.next_cursor.clone(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(ids(&second), vec!["d", "e"]);

        let third = service
            .get_feed(
                "a",
                &FeedQuery {
                    after: second.next_cursor.clone(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(ids(&third), vec!["f"]);
        assert!(third.next_cursor.is_none());
    }

    #[tokio::test]
    async fn incoming_requests_hide_sender() {
        let (service, db, _temp_dir) = create_service(&["a", "b", "c"]).await;
        db.insert_connection_request("b", "a", RequestStatus::Interested)
            .await
            .unwrap();

        let page = service.get_feed("a", &FeedQuery::default()).await.unwrap();
        assert_eq!(ids(&page), vec!["c"]);
    }
}
