//! HTTP API handlers for folkmart-api
//!
//! Successful responses use `{ success: true, data }`, with `pagination`
//! added for lists. Failures are rendered by [`crate::error::ApiError`].

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::pagination::{Page, PageInfo};

pub mod artists;
pub mod auth;
pub mod extract;
pub mod health;
pub mod sessions;
pub mod users;

pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use health::health_routes;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
}

/// 200 with `data`
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data,
        pagination: None,
    })
}

/// 201 with `data`
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok(data))
}

/// 200 with one page of `data` and its pagination block
pub fn paginated<T: Serialize>(page: Page<T>) -> Json<Envelope<Vec<T>>> {
    Json(Envelope {
        success: true,
        data: page.items,
        pagination: Some(page.info),
    })
}
