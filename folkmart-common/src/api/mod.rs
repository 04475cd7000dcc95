//! Shared HTTP API functionality
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Pure functions (no HTTP framework dependencies)
//! - Database operations (via sqlx)
//!
//! The service crate wraps these with axum extractors and middleware.

pub mod auth;

pub use auth::{
    calculate_token_hash, issue_token, issue_token_at, verify_token, SecretError, TokenError,
    SHARED_SECRET_KEY,
};

#[cfg(feature = "sqlx")]
pub use auth::{initialize_shared_secret, load_shared_secret};
