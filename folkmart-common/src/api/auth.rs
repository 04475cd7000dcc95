//! Bearer token issue and verification
//!
//! # Token format
//!
//! `<user-uuid>.<issued-at-ms>.<sha256-hex>`
//!
//! The hash is SHA-256 over `"{uuid}:{issued_at}:{secret}"` where the secret
//! is the i64 stored under `api_shared_secret` in the settings table. A
//! secret of 0 disables hash checking: any well-formed token, or a bare user
//! UUID, is accepted (development mode).
//!
//! # Pure Functions
//!
//! Apart from shared secret management this module has no I/O and no HTTP
//! framework dependencies. The service crate wraps it in an axum extractor.

use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

/// Settings key holding the shared secret
pub const SHARED_SECRET_KEY: &str = "api_shared_secret";

/// Allowed clock skew for tokens issued "in the future"
const FUTURE_SKEW_MS: i64 = 5_000;

/// Token verification failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Not three dot-separated parts, bad UUID, or bad timestamp
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// Hash does not match the shared secret
    #[error("Invalid token signature")]
    InvalidHash,

    /// Token older than the configured lifetime
    #[error("Token expired {age_ms}ms after issue (max {ttl_ms}ms)")]
    Expired { age_ms: i64, ttl_ms: i64 },

    /// Token issued too far in the future
    #[error("Token issued {ahead_ms}ms in the future")]
    IssuedInFuture { ahead_ms: i64 },
}

/// Failures loading or creating the shared secret
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Stored secret is not an i64: {0}")]
    Corrupt(String),
}

/// Calculate the token signature
pub fn calculate_token_hash(user_id: &Uuid, issued_at_ms: i64, shared_secret: i64) -> String {
    let to_hash = format!("{}:{}:{}", user_id, issued_at_ms, shared_secret);

    let mut hasher = Sha256::new();
    hasher.update(to_hash.as_bytes());
    let result = hasher.finalize();

    format!("{:x}", result)
}

/// Issue a token stamped with an explicit issue time
pub fn issue_token_at(user_id: Uuid, issued_at_ms: i64, shared_secret: i64) -> String {
    let hash = calculate_token_hash(&user_id, issued_at_ms, shared_secret);
    format!("{}.{}.{}", user_id, issued_at_ms, hash)
}

/// Issue a token stamped now
///
/// # Examples
///
/// ```
/// use folkmart_common::api::auth::{issue_token, verify_token};
/// use uuid::Uuid;
///
/// let user = Uuid::new_v4();
/// let token = issue_token(user, 42);
/// let now = chrono::Utc::now().timestamp_millis();
/// assert_eq!(verify_token(&token, 42, 60_000, now), Ok(user));
/// ```
pub fn issue_token(user_id: Uuid, shared_secret: i64) -> String {
    issue_token_at(user_id, crate::time::now_millis(), shared_secret)
}

/// Verify a token and return the user it names
///
/// `ttl_ms` bounds token age; `now_ms` is passed in so callers and tests
/// control the clock.
pub fn verify_token(
    token: &str,
    shared_secret: i64,
    ttl_ms: i64,
    now_ms: i64,
) -> Result<Uuid, TokenError> {
    let token = token.trim();

    // Auth disabled: a bare UUID is enough
    if shared_secret == 0 {
        if let Ok(user_id) = Uuid::parse_str(token) {
            return Ok(user_id);
        }
    }

    let mut parts = token.splitn(3, '.');
    let (user_part, issued_part, hash_part) = match (parts.next(), parts.next(), parts.next()) {
        (Some(u), Some(i), Some(h)) => (u, i, h),
        _ => return Err(TokenError::Malformed("expected 3 parts".to_string())),
    };

    let user_id = Uuid::parse_str(user_part)
        .map_err(|e| TokenError::Malformed(format!("user id: {}", e)))?;
    let issued_at_ms: i64 = issued_part
        .parse()
        .map_err(|e| TokenError::Malformed(format!("issued at: {}", e)))?;

    if shared_secret == 0 {
        return Ok(user_id);
    }

    let calculated = calculate_token_hash(&user_id, issued_at_ms, shared_secret);
    if !constant_time_eq(hash_part.as_bytes(), calculated.as_bytes()) {
        return Err(TokenError::InvalidHash);
    }

    let age_ms = now_ms - issued_at_ms;
    if age_ms < -FUTURE_SKEW_MS {
        return Err(TokenError::IssuedInFuture { ahead_ms: -age_ms });
    }
    if age_ms > ttl_ms {
        return Err(TokenError::Expired { age_ms, ttl_ms });
    }

    Ok(user_id)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Load the shared secret from the settings table, creating it on first use
#[cfg(feature = "sqlx")]
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64, SecretError> {
    let result: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(SHARED_SECRET_KEY)
        .fetch_optional(db)
        .await
        .map_err(|e| SecretError::Database(e.to_string()))?;

    match result {
        Some((value,)) => value
            .parse::<i64>()
            .map_err(|e| SecretError::Corrupt(format!("{} ({})", value, e))),
        None => initialize_shared_secret(db).await,
    }
}

/// Generate and store a random non-zero secret
#[cfg(feature = "sqlx")]
pub async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64, SecretError> {
    use rand::Rng;

    let secret: i64 = {
        let mut rng = rand::thread_rng();
        loop {
            let val = rng.gen::<i64>();
            if val != 0 {
                break val;
            }
        }
    };

    // OR IGNORE: a concurrent starter may have won; re-read what is stored
    sqlx::query(
        "INSERT OR IGNORE INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)",
    )
    .bind(SHARED_SECRET_KEY)
    .bind(secret.to_string())
    .execute(db)
    .await
    .map_err(|e| SecretError::Database(e.to_string()))?;

    let (stored,): (String,) = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(SHARED_SECRET_KEY)
        .fetch_one(db)
        .await
        .map_err(|e| SecretError::Database(e.to_string()))?;

    stored
        .parse::<i64>()
        .map_err(|e| SecretError::Corrupt(format!("{} ({})", stored, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: i64 = 987_654_321;
    const HOUR_MS: i64 = 3_600_000;

    #[test]
    fn test_hash_is_sha256_hex() {
        let hash = calculate_token_hash(&Uuid::nil(), 0, SECRET);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_round_trip() {
        let user = Uuid::new_v4();
        let token = issue_token_at(user, 1_000, SECRET);
        assert_eq!(verify_token(&token, SECRET, HOUR_MS, 2_000), Ok(user));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token_at(Uuid::new_v4(), 1_000, SECRET);
        assert_eq!(
            verify_token(&token, SECRET + 1, HOUR_MS, 2_000),
            Err(TokenError::InvalidHash)
        );
    }

    #[test]
    fn test_swapped_user_rejected() {
        let token = issue_token_at(Uuid::new_v4(), 1_000, SECRET);
        let forged = format!(
            "{}{}",
            Uuid::new_v4(),
            &token[token.find('.').unwrap()..]
        );
        assert_eq!(
            verify_token(&forged, SECRET, HOUR_MS, 2_000),
            Err(TokenError::InvalidHash)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue_token_at(Uuid::new_v4(), 0, SECRET);
        assert!(matches!(
            verify_token(&token, SECRET, HOUR_MS, HOUR_MS + 1),
            Err(TokenError::Expired { .. })
        ));
    }

    #[test]
    fn test_future_token_rejected() {
        let token = issue_token_at(Uuid::new_v4(), 60_000, SECRET);
        assert!(matches!(
            verify_token(&token, SECRET, HOUR_MS, 0),
            Err(TokenError::IssuedInFuture { .. })
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        for token in ["", "abc", "a.b", "not-a-uuid.1.hash"] {
            assert!(
                matches!(
                    verify_token(token, SECRET, HOUR_MS, 0),
                    Err(TokenError::Malformed(_))
                ),
                "token {:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_secret_zero_accepts_bare_uuid() {
        let user = Uuid::new_v4();
        assert_eq!(verify_token(&user.to_string(), 0, HOUR_MS, 0), Ok(user));
    }

    #[test]
    fn test_secret_zero_skips_hash_check() {
        let user = Uuid::new_v4();
        let token = format!("{}.0.garbage", user);
        assert_eq!(verify_token(&token, 0, HOUR_MS, i64::MAX), Ok(user));
    }
}
