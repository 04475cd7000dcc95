//! Artist profile operations
//!
//! Rating totals are never accepted from clients; only the booking workflow
//! moves them. Specializations and portfolio are appended read-modify-write
//! inside a transaction.

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::artists::{self, ArtistFilter};
use crate::db::is_unique_violation;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    ArtistPricing, ArtistProfile, ArtistView, Caller, PortfolioItem, RatingAggregate, Role,
    Specialization,
};
use crate::pagination::{calculate_pagination, Page, PageRequest};
use crate::retry::retry_on_lock;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateArtistRequest {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub specializations: Vec<Specialization>,
    #[serde(default)]
    pub portfolio: Vec<PortfolioItem>,
    #[serde(default)]
    pub pricing: Option<ArtistPricing>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateArtistRequest {
    pub bio: Option<String>,
    pub location: Option<String>,
    pub pricing: Option<ArtistPricing>,
    pub is_active: Option<bool>,
}

/// `GET /artists` query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub artform: Option<String>,
    pub category: Option<String>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    pub location: Option<String>,
}

impl ArtistQuery {
    fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            limit: self.limit,
        }
    }

    fn filter(&self) -> ArtistFilter {
        fn non_empty(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        ArtistFilter {
            artform: non_empty(&self.artform),
            category: non_empty(&self.category),
            min_rate: self.min_rate,
            max_rate: self.max_rate,
            location: non_empty(&self.location),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileService {
    db: SqlitePool,
    max_lock_wait_ms: u64,
}

impl ProfileService {
    pub fn new(db: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self {
            db,
            max_lock_wait_ms,
        }
    }

    /// Create the caller's artist profile (one per identity)
    pub async fn create_artist_profile(
        &self,
        caller: &Caller,
        request: CreateArtistRequest,
    ) -> ApiResult<ArtistView> {
        caller.require_role(&[Role::Artist])?;

        let pricing = request.pricing.unwrap_or(ArtistPricing {
            session_rate: 0.0,
            currency: crate::models::artist::default_currency(),
        });
        validate_pricing(&pricing)?;
        for specialization in &request.specializations {
            validate_specialization(specialization)?;
        }
        for item in &request.portfolio {
            validate_portfolio_item(item)?;
        }

        if artists::find_artist_by_user(&self.db, caller.id)
            .await?
            .is_some()
        {
            return Err(ApiError::Conflict(
                "artist profile already exists for this user".to_string(),
            ));
        }

        let ts = folkmart_common::time::now();
        let profile = ArtistProfile {
            id: Uuid::new_v4(),
            user_id: caller.id,
            bio: trimmed(request.bio),
            location: trimmed(request.location),
            specializations: request.specializations,
            portfolio: request.portfolio,
            pricing,
            ratings: RatingAggregate::default(),
            is_active: true,
            created_at: ts,
            updated_at: ts,
        };

        artists::insert_artist(&self.db, &profile)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ApiError::Conflict("artist profile already exists for this user".to_string())
                } else {
                    ApiError::from(e)
                }
            })?;

        info!(artist_id = %profile.id, user_id = %caller.id, "Artist profile created");

        self.load_view(profile.id).await
    }

    /// Active profiles, best rated first
    pub async fn list_artists(&self, query: &ArtistQuery) -> ApiResult<Page<ArtistView>> {
        if let (Some(min), Some(max)) = (query.min_rate, query.max_rate) {
            if min > max {
                return Err(ApiError::InvalidArgument(
                    "minRate must not exceed maxRate".to_string(),
                ));
            }
        }

        let filter = query.filter();
        let total = artists::count_artists(&self.db, &filter).await?;
        let pagination = calculate_pagination(total, query.page_request());
        let items =
            artists::list_artists(&self.db, &filter, pagination.limit, pagination.offset).await?;

        Ok(Page {
            items,
            info: pagination.into(),
        })
    }

    /// Inactive profiles are only visible to their owner and admins
    pub async fn get_artist(&self, caller: Option<&Caller>, id: Uuid) -> ApiResult<ArtistView> {
        let view = self.load_view(id).await?;
        let privileged = caller
            .map(|c| c.is_admin() || c.id == view.profile.user_id)
            .unwrap_or(false);

        if !view.profile.is_active && !privileged {
            return Err(ApiError::NotFound("Artist not found".to_string()));
        }
        Ok(view)
    }

    pub async fn update_artist_profile(
        &self,
        caller: &Caller,
        id: Uuid,
        request: UpdateArtistRequest,
    ) -> ApiResult<ArtistView> {
        if let Some(pricing) = &request.pricing {
            validate_pricing(pricing)?;
        }

        self.modify(caller, id, "update artist profile", |profile| {
            if let Some(bio) = &request.bio {
                profile.bio = trimmed(Some(bio.clone()));
            }
            if let Some(location) = &request.location {
                profile.location = trimmed(Some(location.clone()));
            }
            if let Some(pricing) = &request.pricing {
                profile.pricing = pricing.clone();
            }
            if let Some(is_active) = request.is_active {
                profile.is_active = is_active;
            }
        })
        .await
    }

    pub async fn add_specialization(
        &self,
        caller: &Caller,
        id: Uuid,
        specialization: Specialization,
    ) -> ApiResult<ArtistView> {
        validate_specialization(&specialization)?;

        self.modify(caller, id, "add specialization", |profile| {
            profile.specializations.push(specialization.clone());
        })
        .await
    }

    pub async fn add_portfolio_item(
        &self,
        caller: &Caller,
        id: Uuid,
        item: PortfolioItem,
    ) -> ApiResult<ArtistView> {
        validate_portfolio_item(&item)?;

        self.modify(caller, id, "add portfolio item", |profile| {
            profile.portfolio.push(item.clone());
        })
        .await
    }

    /// Read the profile, authorize, apply `change`, write it back
    async fn modify<F>(
        &self,
        caller: &Caller,
        id: Uuid,
        operation: &str,
        change: F,
    ) -> ApiResult<ArtistView>
    where
        F: Fn(&mut ArtistProfile),
    {
        retry_on_lock(operation, self.max_lock_wait_ms, || {
            self.try_modify(caller, id, &change)
        })
        .await?;

        info!(artist_id = %id, caller = %caller.id, operation, "Artist profile modified");

        self.load_view(id).await
    }

    async fn try_modify<F>(&self, caller: &Caller, id: Uuid, change: &F) -> ApiResult<()>
    where
        F: Fn(&mut ArtistProfile),
    {
        let mut tx = self.db.begin().await?;

        let mut profile = artists::find_artist(&mut *tx, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Artist not found".to_string()))?;
        ensure_owner(caller, &profile)?;

        change(&mut profile);
        profile.updated_at = folkmart_common::time::now();
        artists::update_artist(&mut *tx, &profile).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn load_view(&self, id: Uuid) -> ApiResult<ArtistView> {
        artists::find_artist_view(&self.db, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Artist not found".to_string()))
    }
}

fn ensure_owner(caller: &Caller, profile: &ArtistProfile) -> ApiResult<()> {
    if caller.is_admin() || caller.id == profile.user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "not permitted to modify this artist profile".to_string(),
        ))
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_pricing(pricing: &ArtistPricing) -> ApiResult<()> {
    if !(pricing.session_rate.is_finite() && pricing.session_rate >= 0.0) {
        return Err(ApiError::InvalidArgument(
            "pricing.sessionRate must be a non-negative number".to_string(),
        ));
    }
    if pricing.currency.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "pricing.currency must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_specialization(specialization: &Specialization) -> ApiResult<()> {
    if specialization.artform.trim().is_empty() || specialization.category.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "specialization requires artform and category".to_string(),
        ));
    }
    Ok(())
}

fn validate_portfolio_item(item: &PortfolioItem) -> ApiResult<()> {
    if item.title.trim().is_empty() || item.media_url.trim().is_empty() {
        return Err(ApiError::InvalidArgument(
            "portfolio item requires title and mediaUrl".to_string(),
        ));
    }
    Ok(())
}
