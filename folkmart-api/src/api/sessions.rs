//! Session booking routes

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use super::{created, ok, paginated, ApiJson, ApiPath, ApiQuery};
use crate::booking::BookingRequest;
use crate::error::{ApiError, ApiResult};
use crate::models::{Caller, SessionStatus};
use crate::pagination::PageRequest;
use crate::AppState;

/// `GET /sessions` query string
#[derive(Debug, Deserialize)]
pub struct SessionListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct RatingInput {
    /// Kept loose so `4.5` or `"4"` fail as a bad score rather than a bad body
    #[serde(default)]
    pub score: Value,
    #[serde(default)]
    pub review: Option<String>,
}

/// GET /sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(query): ApiQuery<SessionListQuery>,
) -> ApiResult<impl IntoResponse> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<SessionStatus>)
        .transpose()?;
    let page = PageRequest {
        page: query.page,
        limit: query.limit,
    };

    let page = state.bookings.list_sessions(&caller, page, status).await?;
    Ok(paginated(page))
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.bookings.get_session(&caller, id).await?))
}

/// POST /sessions
pub async fn book_session(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<BookingRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.bookings.book_session(&caller, request).await?))
}

/// PUT /sessions/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> ApiResult<impl IntoResponse> {
    let status: SessionStatus = update.status.trim().parse()?;
    Ok(ok(state
        .bookings
        .update_session_status(&caller, id, status)
        .await?))
}

/// PUT /sessions/:id/rate
pub async fn rate_session(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<RatingInput>,
) -> ApiResult<impl IntoResponse> {
    let score = input.score.as_i64().ok_or_else(|| {
        ApiError::InvalidArgument("score must be an integer between 1 and 5".to_string())
    })?;
    Ok(ok(state
        .bookings
        .rate_session(&caller, id, score, input.review)
        .await?))
}

pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(book_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/status", put(update_status))
        .route("/sessions/:id/rate", put(rate_session))
}
