//! Identity routes

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::{created, ok, ApiJson, ApiPath};
use crate::accounts::RegistrationRequest;
use crate::error::ApiResult;
use crate::models::{Caller, Identity, Preferences};
use crate::AppState;

/// Registration result: the account plus a bearer token for it
#[derive(Debug, Serialize)]
pub struct Registered {
    pub user: Identity,
    pub token: String,
}

/// POST /users
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegistrationRequest>,
) -> ApiResult<impl IntoResponse> {
    let (user, token) = state.accounts.register_user(request).await?;
    Ok(created(Registered { user, token }))
}

/// GET /users/me
pub async fn current_user(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.accounts.current_user(&caller).await?))
}

/// PUT /users/me/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(preferences): ApiJson<Preferences>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .accounts
        .update_preferences(&caller, preferences)
        .await?))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.accounts.get_user(&caller, id).await?))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/me", get(current_user))
        .route("/users/me/preferences", put(update_preferences))
        .route("/users/:id", get(get_user))
}
