//! Database tests

use super::*;
use crate::error::AppError;
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn profile(id: &str, first_name: &str) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        first_name: first_name.to_string(),
        last_name: None,
        photo_url: None,
        age: Some(30),
        gender: None,
        about: None,
        skills: None,
    }
}

async fn seed_users(db: &Database, ids: &[&str]) {
    for id in ids {
        db.upsert_user(&profile(id, &format!("User {id}")))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
}

#[tokio::test]
async fn test_user_upsert_and_get() {
    let (db, _temp_dir) = create_test_db().await;

    db.upsert_user(&profile("u1", "Ada")).await.unwrap();
    let mut updated = profile("u1", "Ada");
    updated.about = Some("Compilers".to_string());
    db.upsert_user(&updated).await.unwrap();

    let retrieved = db.get_user("u1").await.unwrap().unwrap();
    assert_eq!(retrieved.about.as_deref(), Some("Compilers"));
    assert!(db.user_exists("u1").await.unwrap());
    assert!(!db.user_exists("nobody").await.unwrap());
}

#[tokio::test]
async fn test_request_unique_per_unordered_pair() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a", "b"]).await;

    db.insert_connection_request("a", "b", RequestStatus::Interested)
        .await
        .unwrap();

    let same_direction = db
        .insert_connection_request("a", "b", RequestStatus::Ignored)
        .await;
    assert!(matches!(same_direction, Err(AppError::DuplicateRequest)));

    let reverse = db
        .insert_connection_request("b", "a", RequestStatus::Interested)
        .await;
    assert!(matches!(reverse, Err(AppError::DuplicateRequest)));
}

#[tokio::test]
async fn test_self_request_rejected_by_constraint() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a"]).await;

    let result = db
        .insert_connection_request("a", "a", RequestStatus::Interested)
        .await;
    assert!(matches!(result, Err(AppError::SelfRequest)));
}

#[tokio::test]
async fn test_concurrent_mutual_interest_creates_one_row() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a", "b"]).await;
    let db = Arc::new(db);

    let forward = {
        let db = db.clone();
        tokio::spawn(async move {
            db.insert_connection_request("a", "b", RequestStatus::Interested)
                .await
        })
    };
    let backward = {
        let db = db.clone();
        tokio::spawn(async move {
            db.insert_connection_request("b", "a", RequestStatus::Interested)
                .await
        })
    };

    let results = [forward.await.unwrap(), backward.await.unwrap()];
    let created = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::DuplicateRequest)))
        .count();
    assert_eq!(created, 1);
    assert_eq!(duplicates, 1);
}

#[tokio::test]
async fn test_review_transitions() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a", "b", "c"]).await;

    let request = db
        .insert_connection_request("a", "b", RequestStatus::Interested)
        .await
        .unwrap();

    let wrong_reviewer = db
        .review_connection_request(&request.id, "a", RequestStatus::Accepted)
        .await;
    assert!(matches!(wrong_reviewer, Err(AppError::Unauthorized)));

    let third_party = db
        .review_connection_request(&request.id, "c", RequestStatus::Accepted)
        .await;
    assert!(matches!(third_party, Err(AppError::Unauthorized)));

    let accepted = db
        .review_connection_request(&request.id, "b", RequestStatus::Accepted)
        .await
        .unwrap();
    assert_eq!(accepted.status, RequestStatus::Accepted);

    let again = db
        .review_connection_request(&request.id, "b", RequestStatus::Rejected)
        .await;
    assert!(matches!(again, Err(AppError::InvalidTransition)));

    let stored = db.get_connection_request(&request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Accepted);

    let missing = db
        .review_connection_request("missing", "b", RequestStatus::Accepted)
        .await;
    assert!(matches!(missing, Err(AppError::NotFound)));
}

#[tokio::test]
async fn test_ignored_request_cannot_be_reviewed() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a", "b"]).await;

    let request = db
        .insert_connection_request("a", "b", RequestStatus::Ignored)
        .await
        .unwrap();

    let result = db
        .review_connection_request(&request.id, "b", RequestStatus::Accepted)
        .await;
    assert!(matches!(result, Err(AppError::InvalidTransition)));
}

#[tokio::test]
async fn test_received_requests_and_connections() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a", "b", "c", "d"]).await;

    let from_a = db
        .insert_connection_request("a", "d", RequestStatus::Interested)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    db.insert_connection_request("b", "d", RequestStatus::Interested)
        .await
        .unwrap();
    db.insert_connection_request("c", "d", RequestStatus::Ignored)
        .await
        .unwrap();

    let received = db.get_received_requests("d").await.unwrap();
    let senders: Vec<_> = received.iter().map(|r| r.from_user.id.as_str()).collect();
    assert_eq!(senders, vec!["b", "a"]);

    db.review_connection_request(&from_a.id, "d", RequestStatus::Accepted)
        .await
        .unwrap();

    assert!(db.has_connection("a", "d").await.unwrap());
    assert!(db.has_connection("d", "a").await.unwrap());
    assert!(!db.has_connection("b", "d").await.unwrap());

    let connections: Vec<_> = db
        .get_connections("d")
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(connections, vec!["a".to_string()]);

    let received = db.get_received_requests("d").await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn test_feed_excludes_any_request_row() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a", "b", "c", "d", "e"]).await;

    db.insert_connection_request("a", "b", RequestStatus::Ignored)
        .await
        .unwrap();
    db.insert_connection_request("c", "a", RequestStatus::Interested)
        .await
        .unwrap();

    let feed: Vec<_> = db
        .get_feed_candidates("a", None, 10, 0)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(feed, vec!["d".to_string(), "e".to_string()]);

    let after_d: Vec<_> = db
        .get_feed_candidates("a", Some("d"), 10, 0)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(after_d, vec!["e".to_string()]);
}

#[tokio::test]
async fn test_messages_append_order_and_clear() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a", "b", "c"]).await;

    let ab = ConversationId::between("a", "b");
    let ac = ConversationId::between("a", "c");

    let first = db.insert_message(&ab, "a", "hello").await.unwrap();
    let second = db.insert_message(&ab, "b", "hi there").await.unwrap();
    db.insert_message(&ac, "c", "other room").await.unwrap();
    assert!(second.seq > first.seq);

    let messages = db.get_messages(&ab).await.unwrap();
    let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["hello", "hi there"]);

    let decorated = db.get_chat_messages(&ab).await.unwrap();
    assert_eq!(decorated[0].first_name.as_deref(), Some("User a"));

    assert_eq!(db.delete_messages(&ab).await.unwrap(), 2);
    assert!(db.get_messages(&ab).await.unwrap().is_empty());
    assert_eq!(db.delete_messages(&ab).await.unwrap(), 0);
    assert_eq!(db.get_messages(&ac).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_received_requests_newest_first_within_same_instant() {
    let (db, _temp_dir) = create_test_db().await;
    let senders: Vec<String> = (0..20).map(|i| format!("s{i:02}")).collect();
    let mut ids: Vec<&str> = senders.iter().map(String::as_str).collect();
    ids.push("target");
    seed_users(&db, &ids).await;

    // Back to back, so many share a millisecond
    for sender in &senders {
        db.insert_connection_request(sender, "target", RequestStatus::Interested)
            .await
            .unwrap();
    }

    let received: Vec<_> = db
        .get_received_requests("target")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.from_user.id)
        .collect();
    let expected: Vec<_> = senders.iter().rev().cloned().collect();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn test_blank_message_is_a_validation_error() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a", "b"]).await;
    let ab = ConversationId::between("a", "b");

    let result = db.insert_message(&ab, "a", "   ").await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(db.get_messages(&ab).await.unwrap().is_empty());

    let stored = db.insert_message(&ab, "a", "  padded \n").await.unwrap();
    assert_eq!(stored.text, "padded");
}

#[tokio::test]
async fn test_colon_bearing_ids_get_distinct_pairs() {
    let (db, _temp_dir) = create_test_db().await;
    seed_users(&db, &["a:b", "c", "a", "b:c"]).await;

    let request = db
        .insert_connection_request("a:b", "c", RequestStatus::Interested)
        .await
        .unwrap();
    db.review_connection_request(&request.id, "c", RequestStatus::Accepted)
        .await
        .unwrap();

    assert!(db.has_connection("c", "a:b").await.unwrap());
    assert!(!db.has_connection("a", "b:c").await.unwrap());
    db.insert_connection_request("a", "b:c", RequestStatus::Interested)
        .await
        .unwrap();
}
