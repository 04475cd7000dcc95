//! Artist profile store
//!
//! Specializations and portfolio are JSON arrays on the profile row. The
//! rating aggregate columns are only written by [`add_rating`].

use folkmart_common::time::parse_rfc3339;
use folkmart_common::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;
use crate::models::{
    ArtistPricing, ArtistProfile, ArtistView, PartySummary, RatingAggregate,
};

const PROFILE_COLUMNS: &str = r#"
    ap.guid, ap.user_id, ap.bio, ap.location, ap.specializations, ap.portfolio,
    ap.session_rate, ap.currency, ap.rating_sum, ap.rating_count, ap.is_active,
    ap.created_at, ap.updated_at
"#;

const OWNER_COLUMNS: &str = "u.name AS owner_name, u.profile_image AS owner_image";

/// Listing filters; all optional, combined with AND
#[derive(Debug, Clone, Default)]
pub struct ArtistFilter {
    /// Case-insensitive match on any specialization's artform
    pub artform: Option<String>,
    /// Case-insensitive match on any specialization's category
    pub category: Option<String>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    /// Substring match on location
    pub location: Option<String>,
}

fn profile_from_row(row: &SqliteRow) -> Result<ArtistProfile> {
    let guid: String = row.try_get("guid")?;
    let user_id: String = row.try_get("user_id")?;
    let specializations: String = row.try_get("specializations")?;
    let portfolio: String = row.try_get("portfolio")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(ArtistProfile {
        id: parse_uuid("artist_profiles.guid", &guid)?,
        user_id: parse_uuid("artist_profiles.user_id", &user_id)?,
        bio: row.try_get("bio")?,
        location: row.try_get("location")?,
        specializations: serde_json::from_str(&specializations)?,
        portfolio: serde_json::from_str(&portfolio)?,
        pricing: ArtistPricing {
            session_rate: row.try_get("session_rate")?,
            currency: row.try_get("currency")?,
        },
        ratings: RatingAggregate::from_totals(
            row.try_get("rating_sum")?,
            row.try_get("rating_count")?,
        ),
        is_active: row.try_get::<i64, _>("is_active")? != 0,
        created_at: parse_rfc3339(&created_at)?,
        updated_at: parse_rfc3339(&updated_at)?,
    })
}

fn view_from_row(row: &SqliteRow) -> Result<ArtistView> {
    let profile = profile_from_row(row)?;
    let user = PartySummary {
        id: profile.user_id,
        name: row.try_get("owner_name")?,
        profile_image: row.try_get("owner_image")?,
    };
    Ok(ArtistView { profile, user })
}

/// Insert a new profile
pub async fn insert_artist<'e, E>(executor: E, profile: &ArtistProfile) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO artist_profiles (
            guid, user_id, bio, location, specializations, portfolio,
            session_rate, currency, rating_sum, rating_count, is_active,
            created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile.id.to_string())
    .bind(profile.user_id.to_string())
    .bind(&profile.bio)
    .bind(&profile.location)
    .bind(serde_json::to_string(&profile.specializations)?)
    .bind(serde_json::to_string(&profile.portfolio)?)
    .bind(profile.pricing.session_rate)
    .bind(&profile.pricing.currency)
    .bind(profile.ratings.sum)
    .bind(profile.ratings.count)
    .bind(profile.is_active)
    .bind(profile.created_at.to_rfc3339())
    .bind(profile.updated_at.to_rfc3339())
    .execute(executor)
    .await?;

    Ok(())
}

/// Load profile by id
pub async fn find_artist<'e, E>(executor: E, id: Uuid) -> Result<Option<ArtistProfile>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!(
        "SELECT {} FROM artist_profiles ap WHERE ap.guid = ?",
        PROFILE_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(profile_from_row).transpose()
}

/// Load the profile owned by an identity
pub async fn find_artist_by_user<'e, E>(executor: E, user_id: Uuid) -> Result<Option<ArtistProfile>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!(
        "SELECT {} FROM artist_profiles ap WHERE ap.user_id = ?",
        PROFILE_COLUMNS
    ))
    .bind(user_id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(profile_from_row).transpose()
}

/// Load profile with owner summary
pub async fn find_artist_view<'e, E>(executor: E, id: Uuid) -> Result<Option<ArtistView>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(&format!(
        r#"
        SELECT {}, {}
        FROM artist_profiles ap
        JOIN users u ON u.guid = ap.user_id
        WHERE ap.guid = ?
        "#,
        PROFILE_COLUMNS, OWNER_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(view_from_row).transpose()
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ArtistFilter) {
    builder.push(" WHERE ap.is_active = 1");

    if let Some(artform) = &filter.artform {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM json_each(ap.specializations) js \
                 WHERE lower(json_extract(js.value, '$.artform')) = lower(",
            )
            .push_bind(artform.clone())
            .push("))");
    }
    if let Some(category) = &filter.category {
        builder
            .push(
                " AND EXISTS (SELECT 1 FROM json_each(ap.specializations) js \
                 WHERE lower(json_extract(js.value, '$.category')) = lower(",
            )
            .push_bind(category.clone())
            .push("))");
    }
    if let Some(min_rate) = filter.min_rate {
        builder.push(" AND ap.session_rate >= ").push_bind(min_rate);
    }
    if let Some(max_rate) = filter.max_rate {
        builder.push(" AND ap.session_rate <= ").push_bind(max_rate);
    }
    if let Some(location) = &filter.location {
        builder
            .push(" AND ap.location LIKE '%' || ")
            .push_bind(location.clone())
            .push(" || '%'");
    }
}

/// Count active profiles matching the filter
pub async fn count_artists(pool: &SqlitePool, filter: &ArtistFilter) -> Result<i64> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM artist_profiles ap");
    push_filters(&mut builder, filter);

    let total: i64 = builder.build_query_scalar().fetch_one(pool).await?;
    Ok(total)
}

/// One page of active profiles, best rated first
pub async fn list_artists(
    pool: &SqlitePool,
    filter: &ArtistFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<ArtistView>> {
    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {}, {} FROM artist_profiles ap JOIN users u ON u.guid = ap.user_id",
        PROFILE_COLUMNS, OWNER_COLUMNS
    ));
    push_filters(&mut builder, filter);
    builder
        .push(
            " ORDER BY CASE WHEN ap.rating_count = 0 THEN 0.0 \
             ELSE CAST(ap.rating_sum AS REAL) / ap.rating_count END DESC, \
             ap.created_at ASC LIMIT ",
        )
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows = builder.build().fetch_all(pool).await?;
    rows.iter().map(view_from_row).collect()
}

/// Write back the editable fields of a profile (never the rating columns)
pub async fn update_artist<'e, E>(executor: E, profile: &ArtistProfile) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE artist_profiles SET
            bio = ?,
            location = ?,
            specializations = ?,
            portfolio = ?,
            session_rate = ?,
            currency = ?,
            is_active = ?,
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(&profile.bio)
    .bind(&profile.location)
    .bind(serde_json::to_string(&profile.specializations)?)
    .bind(serde_json::to_string(&profile.portfolio)?)
    .bind(profile.pricing.session_rate)
    .bind(&profile.pricing.currency)
    .bind(profile.is_active)
    .bind(profile.updated_at.to_rfc3339())
    .bind(profile.id.to_string())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fold one score into the aggregate
///
/// Expressed as a delta so it never depends on a previously read total.
pub async fn add_rating<'e, E>(executor: E, artist_id: Uuid, score: u8) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE artist_profiles SET
            rating_sum = rating_sum + ?,
            rating_count = rating_count + 1,
            updated_at = ?
        WHERE guid = ?
        "#,
    )
    .bind(i64::from(score))
    .bind(folkmart_common::time::now().to_rfc3339())
    .bind(artist_id.to_string())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{artist_profile, identity, test_pool};
    use crate::db::users::insert_user;
    use crate::models::{Role, Specialization};

    async fn seed_artist(pool: &SqlitePool, name: &str, rate: f64) -> ArtistProfile {
        let user = identity(name, &format!("{}@example.com", name), Role::Artist);
        insert_user(pool, &user).await.unwrap();
        let profile = artist_profile(user.id, rate);
        insert_artist(pool, &profile).await.unwrap();
        profile
    }

    #[tokio::test]
    async fn test_insert_and_find_view() {
        let (_dir, pool) = test_pool().await;
        let profile = seed_artist(&pool, "sita", 500.0).await;

        let view = find_artist_view(&pool, profile.id)
            .await
            .unwrap()
            .expect("profile exists");
        assert_eq!(view.user.name, "sita");
        assert_eq!(view.profile.pricing.session_rate, 500.0);
        assert_eq!(view.profile.specializations.len(), 1);
        assert_eq!(view.profile.ratings, RatingAggregate::default());

        let by_user = find_artist_by_user(&pool, profile.user_id)
            .await
            .unwrap()
            .expect("profile exists");
        assert_eq!(by_user.id, profile.id);
    }

    #[tokio::test]
    async fn test_add_rating_is_incremental() {
        let (_dir, pool) = test_pool().await;
        let profile = seed_artist(&pool, "gopal", 300.0).await;

        assert!(add_rating(&pool, profile.id, 4).await.unwrap());
        assert!(add_rating(&pool, profile.id, 5).await.unwrap());

        let loaded = find_artist(&pool, profile.id).await.unwrap().unwrap();
        assert_eq!(loaded.ratings, RatingAggregate::from_totals(9, 2));
        assert_eq!(loaded.ratings.average(), 4.5);

        assert!(!add_rating(&pool, Uuid::new_v4(), 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_never_touches_ratings() {
        let (_dir, pool) = test_pool().await;
        let mut profile = seed_artist(&pool, "lata", 300.0).await;
        add_rating(&pool, profile.id, 5).await.unwrap();

        // Stale in-memory copy still has zero ratings
        profile.specializations.push(Specialization {
            artform: "Warli".to_string(),
            category: "painting".to_string(),
            years_of_experience: 3,
        });
        profile.is_active = false;
        assert!(update_artist(&pool, &profile).await.unwrap());

        let loaded = find_artist(&pool, profile.id).await.unwrap().unwrap();
        assert_eq!(loaded.specializations.len(), 2);
        assert!(!loaded.is_active);
        assert_eq!(loaded.ratings.count, 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_hides_inactive() {
        let (_dir, pool) = test_pool().await;
        let cheap = seed_artist(&pool, "asha", 200.0).await;
        let pricey = seed_artist(&pool, "bhanu", 900.0).await;
        let mut hidden = seed_artist(&pool, "chitra", 400.0).await;
        hidden.is_active = false;
        update_artist(&pool, &hidden).await.unwrap();

        add_rating(&pool, pricey.id, 5).await.unwrap();

        let all = ArtistFilter::default();
        assert_eq!(count_artists(&pool, &all).await.unwrap(), 2);
        let page = list_artists(&pool, &all, 10, 0).await.unwrap();
        let ids: Vec<_> = page.iter().map(|v| v.profile.id).collect();
        assert_eq!(ids, vec![pricey.id, cheap.id], "best rated first");

        let under_500 = ArtistFilter {
            max_rate: Some(500.0),
            ..Default::default()
        };
        let page = list_artists(&pool, &under_500, 10, 0).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].profile.id, cheap.id);

        let by_artform = ArtistFilter {
            artform: Some("madhubani".to_string()),
            ..Default::default()
        };
        assert_eq!(count_artists(&pool, &by_artform).await.unwrap(), 2);

        let unknown_artform = ArtistFilter {
            artform: Some("Kathakali".to_string()),
            ..Default::default()
        };
        assert_eq!(count_artists(&pool, &unknown_artform).await.unwrap(), 0);

        let by_location = ArtistFilter {
            location: Some("Bihar".to_string()),
            ..Default::default()
        };
        assert_eq!(count_artists(&pool, &by_location).await.unwrap(), 2);
    }
}
