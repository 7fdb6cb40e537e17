//! API layer
//!
//! HTTP handlers for:
//! - Feed
//! - Connection requests and connections
//! - Chat history
//! - Metrics (Prometheus)
//!
//! The websocket endpoint lives in `realtime`.

mod chat;
mod dto;
mod feed;
pub mod metrics;
mod requests;

pub use dto::*;
pub use metrics::metrics_router;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;

/// Create the authenticated JSON API router
///
/// Every handler takes `CurrentUser`, so unauthenticated calls fail 401.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/feed", get(feed::get_feed))
        .route("/request/send/:status/:user_id", post(requests::send_request))
        .route(
            "/request/review/:status/:request_id",
            post(requests::review_request),
        )
        .route("/user/requests/received", get(requests::received_requests))
        .route("/user/connections", get(requests::connections))
        .route(
            "/chat/:target_user_id",
            get(chat::get_history).delete(chat::clear_history),
        )
}
