//! Session record store

use chrono::{DateTime, Utc};
use folkmart_common::time::{from_millis, parse_rfc3339};
use folkmart_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use super::{parse_enum, parse_uuid};
use crate::models::{
    ArtistSummary, PartySummary, SessionPricing, SessionRating, SessionRecord, SessionStatus,
    SessionView, TimeWindow,
};

const SESSION_COLUMNS: &str = r#"
    s.guid, s.customer_id, s.artist_id, s.session_type, s.title, s.description,
    s.scheduled_at_ms, s.duration_minutes, s.format, s.location, s.meeting_link,
    s.amount, s.currency, s.status, s.payment_status,
    s.rating_score, s.rating_review, s.rated_at, s.created_at, s.updated_at
"#;

const PARTY_COLUMNS: &str = r#"
    cu.name AS customer_name, cu.profile_image AS customer_image,
    ap.user_id AS artist_user_id, au.name AS artist_name, au.profile_image AS artist_image
"#;

const VIEW_FROM: &str = r#"
    FROM sessions s
    JOIN users cu ON cu.guid = s.customer_id
    JOIN artist_profiles ap ON ap.guid = s.artist_id
    JOIN users au ON au.guid = ap.user_id
"#;

/// Which sessions a listing may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScope {
    /// Every session (admin)
    All,
    /// Sessions booked by this identity
    Customer(Uuid),
    /// Sessions on the profile owned by this identity, plus its own bookings
    Artist { user_id: Uuid },
}

fn record_from_row(row: &SqliteRow) -> Result<SessionRecord> {
    let guid: String = row.try_get("guid")?;
    let customer_id: String = row.try_get("customer_id")?;
    let artist_id: String = row.try_get("artist_id")?;
    let session_type: String = row.try_get("session_type")?;
    let format: String = row.try_get("format")?;
    let status: String = row.try_get("status")?;
    let payment_status: String = row.try_get("payment_status")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    let rating_score: Option<i64> = row.try_get("rating_score")?;
    let rating = match rating_score {
        Some(score) => {
            let rated_at: Option<String> = row.try_get("rated_at")?;
            let rated_at = match rated_at {
                Some(text) => parse_rfc3339(&text)?,
                None => parse_rfc3339(&updated_at)?,
            };
            Some(SessionRating {
                score: u8::try_from(score).map_err(|_| {
                    folkmart_common::Error::InvalidData(format!(
                        "sessions.rating_score out of range: {}",
                        score
                    ))
                })?,
                review: row.try_get("rating_review")?,
                rated_at,
            })
        }
        None => None,
    };

    Ok(SessionRecord {
        id: parse_uuid("sessions.guid", &guid)?,
        customer_id: parse_uuid("sessions.customer_id", &customer_id)?,
        artist_id: parse_uuid("sessions.artist_id", &artist_id)?,
        session_type: parse_enum(&session_type)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        scheduled_date: from_millis(row.try_get("scheduled_at_ms")?)?,
        duration: row.try_get("duration_minutes")?,
        format: parse_enum(&format)?,
        location: row.try_get("location")?,
        meeting_link: row.try_get("meeting_link")?,
        pricing: SessionPricing {
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
        },
        status: parse_enum(&status)?,
        payment_status: parse_enum(&payment_status)?,
        rating,
        created_at: parse_rfc3339(&created_at)?,
        updated_at: parse_rfc3339(&updated_at)?,
    })
}

fn view_from_row(row: &SqliteRow) -> Result<SessionView> {
    let record = record_from_row(row)?;
    let artist_user_id: String = row.try_get("artist_user_id")?;

    let customer = PartySummary {
        id: record.customer_id,
        name: row.try_get("customer_name")?,
        profile_image: row.try_get("customer_image")?,
    };
    let artist = ArtistSummary {
        id: record.artist_id,
        user_id: parse_uuid("artist_profiles.user_id", &artist_user_id)?,
        name: row.try_get("artist_name")?,
        profile_image: row.try_get("artist_image")?,
    };

    Ok(SessionView {
        record,
        customer,
        artist,
    })
}

/// Insert a new session
pub async fn insert_session<'e, E>(executor: E, record: &SessionRecord) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO sessions (
            guid, customer_id, artist_id, session_type, title, description,
            scheduled_at_ms, duration_minutes, format, location, meeting_link,
            amount, currency, status, payment_status,
            rating_score, rating_review, rated_at, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.customer_id.to_string())
    .bind(record.artist_id.to_string())
    .bind(record.session_type.as_str())
    .bind(&record.title)
    .bind(&record.description)
    .bind(record.scheduled_date.timestamp_millis())
    .bind(record.duration)
    .bind(record.format.as_str())
    .bind(&record.location)
    .bind(&record.meeting_link)
    .bind(record.pricing.amount)
    .bind(&record.pricing.currency)
    .bind(record.status.as_str())
    .bind(record.payment_status.as_str())
    .bind(record.rating.as_ref().map(|r| i64::from(r.score)))
    .bind(record.rating.as_ref().and_then(|r| r.review.clone()))
    .bind(record.rating.as_ref().map(|r| r.rated_at.to_rfc3339()))
    .bind(record.created_at.to_rfc3339())
    .bind(record.updated_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Load session by id
pub async fn find_session<'e, E>(executor: E, id: Uuid) -> Result<Option<SessionRecord>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!(
        "SELECT {} FROM sessions s WHERE s.guid = ?",
        SESSION_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Load session with both parties expanded
pub async fn find_session_view<'e, E>(executor: E, id: Uuid) -> Result<Option<SessionView>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!(
        "SELECT {}, {} {} WHERE s.guid = ?",
        SESSION_COLUMNS, PARTY_COLUMNS, VIEW_FROM
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(view_from_row).transpose()
}

/// Slot-holding windows on an artist's calendar that start before `before`
///
/// Coarse filter only: callers still run [`TimeWindow::overlaps`] against
/// each result, since a window starting earlier may end before theirs starts.
pub async fn occupied_windows<'e, E>(
    executor: E,
    artist_id: Uuid,
    before: DateTime<Utc>,
) -> Result<Vec<(Uuid, TimeWindow)>>
where
    E: SqliteExecutor<'e>,
{
    let rows = sqlx::query(
        r#"
        SELECT guid, scheduled_at_ms, duration_minutes
        FROM sessions
        WHERE artist_id = ?
          AND status IN (?, ?)
          AND scheduled_at_ms < ?
        "#,
    )
    .bind(artist_id.to_string())
    .bind(SessionStatus::Pending.as_str())
    .bind(SessionStatus::Confirmed.as_str())
    .bind(before.timestamp_millis())
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            let guid: String = row.try_get("guid")?;
            let start = from_millis(row.try_get("scheduled_at_ms")?)?;
            let minutes: i64 = row.try_get("duration_minutes")?;
            Ok((
                parse_uuid("sessions.guid", &guid)?,
                TimeWindow::new(start, minutes),
            ))
        })
        .collect()
}

/// Overwrite status; returns false when the session does not exist
pub async fn update_status<'e, E>(
    executor: E,
    id: Uuid,
    status: SessionStatus,
    updated_at: DateTime<Utc>,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE sessions SET status = ?, updated_at = ? WHERE guid = ?")
        .bind(status.as_str())
        .bind(updated_at.to_rfc3339())
        .bind(id.to_string())
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Attach a rating if the session is completed and still unrated
///
/// Returns false when another writer got there first (or the status moved),
/// so at most one rating is ever recorded per session.
pub async fn record_rating<'e, E>(executor: E, id: Uuid, rating: &SessionRating) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let rated_at = rating.rated_at.to_rfc3339();
    let result = sqlx::query(
        r#"
        UPDATE sessions SET
            rating_score = ?,
            rating_review = ?,
            rated_at = ?,
            updated_at = ?
        WHERE guid = ?
          AND status = ?
          AND rating_score IS NULL
        "#,
    )
    .bind(i64::from(rating.score))
    .bind(&rating.review)
    .bind(&rated_at)
    .bind(&rated_at)
    .bind(id.to_string())
    .bind(SessionStatus::Completed.as_str())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

fn push_scope(
    builder: &mut QueryBuilder<'_, Sqlite>,
    scope: SessionScope,
    status: Option<SessionStatus>,
) {
    builder.push(" WHERE 1 = 1");

    match scope {
        SessionScope::All => {}
        SessionScope::Customer(customer_id) => {
            builder
                .push(" AND s.customer_id = ")
                .push_bind(customer_id.to_string());
        }
        SessionScope::Artist { user_id } => {
            builder
                .push(" AND (ap.user_id = ")
                .push_bind(user_id.to_string())
                .push(" OR s.customer_id = ")
                .push_bind(user_id.to_string())
                .push(")");
        }
    }

    if let Some(status) = status {
        builder.push(" AND s.status = ").push_bind(status.as_str());
    }
}

/// Count sessions visible in `scope`
pub async fn count_sessions(
    pool: &SqlitePool,
    scope: SessionScope,
    status: Option<SessionStatus>,
) -> Result<i64> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM sessions s JOIN artist_profiles ap ON ap.guid = s.artist_id",
    );
    push_scope(&mut builder, scope, status);

    let total: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(total)
}

/// One page of sessions visible in `scope`, latest scheduled first
pub async fn list_session_views(
    pool: &SqlitePool,
    scope: SessionScope,
    status: Option<SessionStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<SessionView>> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {}, {} {}",
        SESSION_COLUMNS, PARTY_COLUMNS, VIEW_FROM
    ));
    push_scope(&mut builder, scope, status);
    builder
        .push(" ORDER BY s.scheduled_at_ms DESC, s.created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = builder.build().fetch_all(pool).await?;
    rows.iter().map(view_from_row).collect()
}
