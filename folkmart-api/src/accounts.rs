//! Identity operations: registration, profile lookup, preferences

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use folkmart_common::api::auth::issue_token;

use crate::db::{is_unique_violation, users};
use crate::error::{ApiError, ApiResult};
use crate::models::{Caller, Identity, Preferences, Role};

/// Sign-up payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

fn default_role() -> Role {
    Role::Customer
}

#[derive(Debug, Clone)]
pub struct AccountService {
    db: SqlitePool,
    shared_secret: i64,
}

impl AccountService {
    pub fn new(db: SqlitePool, shared_secret: i64) -> Self {
        Self { db, shared_secret }
    }

    /// Create an account and issue its first bearer token
    pub async fn register_user(&self, request: RegistrationRequest) -> ApiResult<(Identity, String)> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidArgument("name is required".to_string()));
        }

        let email = request.email.trim().to_lowercase();
        if !is_plausible_email(&email) {
            return Err(ApiError::InvalidArgument(
                "email must be a valid address".to_string(),
            ));
        }

        if request.role == Role::Admin {
            return Err(ApiError::InvalidArgument(
                "admin accounts cannot be self-registered".to_string(),
            ));
        }

        if users::find_user_by_email(&self.db, &email).await?.is_some() {
            return Err(ApiError::Conflict(
                "an account with this email already exists".to_string(),
            ));
        }

        let ts = folkmart_common::time::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email,
            role: request.role,
            phone: request.phone,
            profile_image: request.profile_image,
            preferences: request.preferences.unwrap_or_default(),
            created_at: ts,
            updated_at: ts,
        };

        users::insert_user(&self.db, &identity).await.map_err(|e| {
            // Lost a race with a concurrent sign-up for the same address
            if is_unique_violation(&e) {
                ApiError::Conflict("an account with this email already exists".to_string())
            } else {
                ApiError::from(e)
            }
        })?;

        info!(user_id = %identity.id, role = %identity.role, "User registered");

        let token = issue_token(identity.id, self.shared_secret);
        Ok((identity, token))
    }

    /// The caller's own account
    pub async fn current_user(&self, caller: &Caller) -> ApiResult<Identity> {
        self.load(caller.id).await
    }

    /// Any account; only the account itself or an admin may look
    pub async fn get_user(&self, caller: &Caller, id: Uuid) -> ApiResult<Identity> {
        if caller.id != id && !caller.is_admin() {
            return Err(ApiError::Forbidden(
                "not permitted to view this user".to_string(),
            ));
        }
        self.load(id).await
    }

    pub async fn update_preferences(
        &self,
        caller: &Caller,
        preferences: Preferences,
    ) -> ApiResult<Identity> {
        if preferences.language.trim().is_empty() {
            return Err(ApiError::InvalidArgument(
                "preferences.language must not be empty".to_string(),
            ));
        }

        if !users::update_preferences(&self.db, caller.id, &preferences).await? {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        self.load(caller.id).await
    }

    async fn load(&self, id: Uuid) -> ApiResult<Identity> {
        users::find_user(&self.db, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
