//! Identity store

use folkmart_common::time::parse_rfc3339;
use folkmart_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor};
use uuid::Uuid;

use super::{parse_enum, parse_uuid};
use crate::models::{Identity, Preferences, Role};

const USER_COLUMNS: &str = r#"
    guid, name, email, role, phone, profile_image, preferences, created_at, updated_at
"#;

fn identity_from_row(row: &SqliteRow) -> Result<Identity> {
    let guid: String = row.try_get("guid")?;
    let role: String = row.try_get("role")?;
    let preferences: String = row.try_get("preferences")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Identity {
        id: parse_uuid("users.guid", &guid)?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        role: parse_enum(&role)?,
        phone: row.try_get("phone")?,
        profile_image: row.try_get("profile_image")?,
        preferences: serde_json::from_str(&preferences)?,
        created_at: parse_rfc3339(&created_at)?,
        updated_at: parse_rfc3339(&updated_at)?,
    })
}

/// Insert a new account
pub async fn insert_user<'e, E>(executor: E, identity: &Identity) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    let preferences = serde_json::to_string(&identity.preferences)?;

    sqlx::query(
        r#"
        INSERT INTO users (
            guid, name, email, role, phone, profile_image, preferences, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(identity.id.to_string())
    .bind(&identity.name)
    .bind(&identity.email)
    .bind(identity.role.as_str())
    .bind(&identity.phone)
    .bind(&identity.profile_image)
    .bind(preferences)
    .bind(identity.created_at.to_rfc3339())
    .bind(identity.updated_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Load account by id
pub async fn find_user<'e, E>(executor: E, id: Uuid) -> Result<Option<Identity>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE guid = ?", USER_COLUMNS))
        .bind(id.to_string())
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(identity_from_row).transpose()
}

/// Load account by (lower-cased) email
pub async fn find_user_by_email<'e, E>(executor: E, email: &str) -> Result<Option<Identity>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
        .bind(email)
        .fetch_optional(executor)
        .await?;

    row.as_ref().map(identity_from_row).transpose()
}

/// Replace preferences; returns false when the user does not exist
pub async fn update_preferences<'e, E>(
    executor: E,
    id: Uuid,
    preferences: &Preferences,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let encoded = serde_json::to_string(preferences)?;

    let result = sqlx::query("UPDATE users SET preferences = ?, updated_at = ? WHERE guid = ?")
        .bind(encoded)
        .bind(folkmart_common::time::now().to_rfc3339())
        .bind(id.to_string())
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Change an account's role; returns false when the user does not exist
pub async fn set_role<'e, E>(executor: E, id: Uuid, role: Role) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE guid = ?")
        .bind(role.as_str())
        .bind(folkmart_common::time::now().to_rfc3339())
        .bind(id.to_string())
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}
