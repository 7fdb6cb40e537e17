//! Connection request endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::dto::{DataResponse, RequestResponse};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::data::{ReceivedRequest, RequestStatus, UserProfile};
use crate::error::AppError;

/// POST /request/send/:status/:user_id
///
/// `status` is `interested` or `ignored`.
pub async fn send_request(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((status, to_user_id)): Path<(String, String)>,
) -> Result<Json<RequestResponse>, AppError> {
    let status: RequestStatus = status.parse()?;

    let request = state
        .connections
        .send_request(&session.user_id, &to_user_id, status)
        .await?;

    Ok(Json(RequestResponse {
        message: format!("Marked {to_user_id} as {status}"),
        data: request,
    }))
}

/// POST /request/review/:status/:request_id
///
/// `status` is `accepted` or `rejected`; only the addressee may review.
pub async fn review_request(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path((status, request_id)): Path<(String, String)>,
) -> Result<Json<RequestResponse>, AppError> {
    let status: RequestStatus = status.parse()?;

    let request = state
        .connections
        .review_request(&request_id, &session.user_id, status)
        .await?;

    Ok(Json(RequestResponse {
        message: format!("Connection request {status}"),
        data: request,
    }))
}

/// GET /user/requests/received
pub async fn received_requests(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<DataResponse<Vec<ReceivedRequest>>>, AppError> {
    let data = state.connections.received_requests(&session.user_id).await?;
    Ok(Json(DataResponse { data }))
}

/// GET /user/connections
pub async fn connections(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<DataResponse<Vec<UserProfile>>>, AppError> {
    let data = state.connections.connections(&session.user_id).await?;
    Ok(Json(DataResponse { data }))
}
