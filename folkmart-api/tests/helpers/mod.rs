//! Shared helpers for folkmart-api integration tests
//!
//! Each test gets a fresh database in a temp dir and drives the real router
//! with `oneshot`.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use folkmart_api::db::users;
use folkmart_api::models::Role;
use folkmart_api::{build_router, AppState, ServiceOptions};
use folkmart_common::api::auth::issue_token;
use folkmart_common::db::init_database;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: i64 = 424_242;

pub struct TestApp {
    _dir: TempDir,
    pub pool: SqlitePool,
    pub router: Router,
}

/// A registered user and its bearer token
pub struct TestUser {
    pub id: Uuid,
    pub token: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_options(ServiceOptions::default()).await
    }

    pub async fn with_options(options: ServiceOptions) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let pool = init_database(&dir.path().join("folkmart.db"))
            .await
            .expect("database init");
        let router = build_router(AppState::new(pool.clone(), SECRET, options));
        Self {
            _dir: dir,
            pool,
            router,
        }
    }

    /// Send a request; returns status and parsed JSON body (Null when empty)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn register(&self, name: &str, role: &str) -> TestUser {
        let (status, body) = self
            .send(
                "POST",
                "/users",
                None,
                Some(json!({
                    "name": name,
                    "email": format!("{}@example.com", name),
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", name, body);

        TestUser {
            id: body["data"]["user"]["id"].as_str().unwrap().parse().unwrap(),
            token: body["data"]["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn admin(&self, name: &str) -> TestUser {
        let user = self.register(name, "customer").await;
        users::set_role(&self.pool, user.id, Role::Admin).await.unwrap();
        TestUser {
            id: user.id,
            token: issue_token(user.id, SECRET),
        }
    }

    /// Register an artist and create a profile at `rate` INR; returns (user, profile id)
    pub async fn artist(&self, name: &str, rate: f64) -> (TestUser, String) {
        let user = self.register(name, "artist").await;
        let (status, body) = self
            .send(
                "POST",
                "/artists",
                Some(&user.token),
                Some(json!({
                    "bio": "Folk musician",
                    "location": "Jodhpur, Rajasthan",
                    "specializations": [
                        { "artform": "Manganiyar", "category": "music", "yearsOfExperience": 15 }
                    ],
                    "pricing": { "sessionRate": rate, "currency": "INR" }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create artist: {}", body);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        (user, id)
    }

    pub async fn book(
        &self,
        customer: &TestUser,
        artist_id: &str,
        start: &str,
        duration: i64,
    ) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/sessions",
            Some(&customer.token),
            Some(json!({
                "artistId": artist_id,
                "sessionType": "lesson",
                "title": "Khartal for beginners",
                "scheduledDate": start,
                "duration": duration,
                "format": "online",
                "meetingLink": "https://meet.example/khartal"
            })),
        )
        .await
    }

    pub async fn set_status(&self, user: &TestUser, session_id: &str, status: &str) -> (StatusCode, Value) {
        self.send(
            "PUT",
            &format!("/sessions/{}/status", session_id),
            Some(&user.token),
            Some(json!({ "status": status })),
        )
        .await
    }

    pub async fn rate(&self, user: &TestUser, session_id: &str, score: i64) -> (StatusCode, Value) {
        self.send(
            "PUT",
            &format!("/sessions/{}/rate", session_id),
            Some(&user.token),
            Some(json!({ "score": score, "review": "Great session" })),
        )
        .await
    }
}
