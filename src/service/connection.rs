//! Connection request service
//!
//! Owns the request state machine: who may create a request, who may
//! review it, and which transitions are allowed.

use std::sync::Arc;

use crate::data::{ConnectionRequest, Database, ReceivedRequest, RequestStatus, UserProfile};
use crate::error::AppError;
use crate::metrics::CONNECTION_REQUESTS_TOTAL;

/// Connection request service
pub struct ConnectionService {
    db: Arc<Database>,
}

impl ConnectionService {
    /// Create new connection service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record `from_user_id`'s decision about `to_user_id`
    ///
    /// # Errors
    /// - `Validation` if status is not interested/ignored
    /// - `SelfRequest` if both ids are equal
    /// - `NotFound` if the addressee is unknown
    /// - `DuplicateRequest` if any request already exists for the pair
    pub async fn send_request(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        status: RequestStatus,
    ) -> Result<ConnectionRequest, AppError> {
        if !status.is_sendable() {
            return Err(AppError::Validation(format!(
                "Invalid status type: {status}"
            )));
        }

        if from_user_id == to_user_id {
            return Err(AppError::SelfRequest);
        }

        if !self.db.user_exists(to_user_id).await? {
            return Err(AppError::NotFound);
        }

        let request = self
            .db
            .insert_connection_request(from_user_id, to_user_id, status)
            .await?;

        CONNECTION_REQUESTS_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();
        tracing::info!(
            request_id = %request.id,
            from_user_id,
            to_user_id,
            status = %status,
            "Connection request created"
        );

        Ok(request)
    }

    /// Accept or reject a pending request addressed to `reviewer_id`
    ///
    /// # Errors
    /// - `Validation` if status is not accepted/rejected
    /// - `NotFound`, `Unauthorized`, `InvalidTransition` from the store
    pub async fn review_request(
        &self,
        request_id: &str,
        reviewer_id: &str,
        status: RequestStatus,
    ) -> Result<ConnectionRequest, AppError> {
        if !status.is_review_outcome() {
            return Err(AppError::Validation(format!(
                "Invalid status type: {status}"
            )));
        }

        let request = self
            .db
            .review_connection_request(request_id, reviewer_id, status)
            .await?;

        CONNECTION_REQUESTS_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();
        tracing::info!(
            request_id,
            reviewer_id,
            status = %status,
            "Connection request reviewed"
        );

        Ok(request)
    }

    /// Pending requests addressed to a user, newest first
    pub async fn received_requests(&self, user_id: &str) -> Result<Vec<ReceivedRequest>, AppError> {
        self.db.get_received_requests(user_id).await
    }

    /// Users connected to `user_id`
    pub async fn connections(&self, user_id: &str) -> Result<Vec<UserProfile>, AppError> {
        self.db.get_connections(user_id).await
    }

    /// Whether the two users have an accepted request in either direction
    pub async fn has_connection(&self, user_a: &str, user_b: &str) -> Result<bool, AppError> {
        self.db.has_connection(user_a, user_b).await
    }
}
