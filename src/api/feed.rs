//! Feed endpoint

use axum::{
    extract::{Query, State},
    response::Json,
};

use super::dto::{FeedParams, FeedResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::service::FeedQuery;

/// GET /feed
///
/// Profiles the caller has not acted on and that have not acted on the
/// caller.
///
/// Every response carries `next_cursor`; clients should fetch the next
/// page with `after=<next_cursor>`. That is the supported way to walk the
/// feed: acting on candidates between fetches shrinks the result set, so
/// `page=N` (a plain offset) can skip candidates and is kept only for
/// jumping to an approximate position.
pub async fn get_feed(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Query(params): Query<FeedParams>,
) -> Result<Json<FeedResponse>, AppError> {
    let query = FeedQuery {
        page: params.page,
        limit: params.limit,
        after: params.after.filter(|after| !after.is_empty()),
    };

    let page = state.feed.get_feed(&session.user_id, &query).await?;

    Ok(Json(FeedResponse {
        data: page.users,
        next_cursor: page.next_cursor,
    }))
}
