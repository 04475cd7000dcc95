//! Artist profile routes

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use super::{created, ok, paginated, ApiJson, ApiPath, ApiQuery};
use crate::error::ApiResult;
use crate::models::{Caller, PortfolioItem, Specialization};
use crate::profiles::{ArtistQuery, CreateArtistRequest, UpdateArtistRequest};
use crate::AppState;

/// GET /artists
pub async fn list_artists(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ArtistQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(paginated(state.profiles.list_artists(&query).await?))
}

/// GET /artists/:id
pub async fn get_artist(
    State(state): State<AppState>,
    caller: Option<Caller>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.profiles.get_artist(caller.as_ref(), id).await?))
}

/// POST /artists
pub async fn create_artist(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<CreateArtistRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(
        state.profiles.create_artist_profile(&caller, request).await?,
    ))
}

/// PUT /artists/:id
pub async fn update_artist(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateArtistRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .profiles
        .update_artist_profile(&caller, id, request)
        .await?))
}

/// POST /artists/:id/specializations
pub async fn add_specialization(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(specialization): ApiJson<Specialization>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .profiles
        .add_specialization(&caller, id, specialization)
        .await?))
}

/// POST /artists/:id/portfolio
pub async fn add_portfolio_item(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(item): ApiJson<PortfolioItem>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.profiles.add_portfolio_item(&caller, id, item).await?))
}

pub fn artist_routes() -> Router<AppState> {
    Router::new()
        .route("/artists", get(list_artists).post(create_artist))
        .route("/artists/:id", get(get_artist).put(update_artist))
        .route("/artists/:id/specializations", post(add_specialization))
        .route("/artists/:id/portfolio", post(add_portfolio_item))
}
