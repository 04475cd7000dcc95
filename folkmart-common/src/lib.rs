//! # Folkmart Common Library
//!
//! Shared code for Folkmart services:
//! - Error type for storage, configuration, and I/O failures
//! - Bootstrap configuration (TOML + environment + compiled defaults)
//! - Database initialization and schema
//! - Bearer token signing and verification
//! - Timestamp helpers

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
