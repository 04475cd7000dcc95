//! Session booking & rating workflow
//!
//! Every write that touches an artist's calendar or rating aggregate runs
//! under that artist's [`ArtistLocks`] entry and inside one transaction, so
//! the availability check and the insert (or the rating and the aggregate
//! update) are observed together or not at all.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{artists, sessions};
use crate::db::sessions::SessionScope;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Caller, PaymentStatus, Role, SessionFormat, SessionPricing, SessionRating, SessionRecord,
    SessionStatus, SessionType, SessionView, TimeWindow,
};
use crate::pagination::{calculate_pagination, Page, PageRequest};
use crate::retry::retry_on_lock;

pub mod locks;
pub mod transitions;

pub use locks::ArtistLocks;
pub use transitions::TransitionPolicy;

/// Longest bookable session unless configured otherwise
pub const DEFAULT_MAX_DURATION_MINUTES: i64 = 24 * 60;

const NOT_AVAILABLE: &str = "artist not available at requested time";
const NOT_COMPLETED: &str = "session must be completed before rating";
const ALREADY_RATED: &str = "session has already been rated";

/// Booking input as posted by the customer
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(alias = "artist")]
    pub artist_id: Uuid,
    pub session_type: SessionType,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    /// Minutes
    pub duration: i64,
    pub format: SessionFormat,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub meeting_link: Option<String>,
    /// Defaults to the artist's session rate
    #[serde(default)]
    pub pricing: Option<SessionPricing>,
}

/// Booking workflow service
#[derive(Debug, Clone)]
pub struct BookingService {
    db: SqlitePool,
    locks: ArtistLocks,
    policy: TransitionPolicy,
    max_lock_wait_ms: u64,
    max_duration_minutes: i64,
}

impl BookingService {
    pub fn new(db: SqlitePool, policy: TransitionPolicy, max_lock_wait_ms: u64) -> Self {
        Self {
            db,
            locks: ArtistLocks::new(),
            policy,
            max_lock_wait_ms,
            max_duration_minutes: DEFAULT_MAX_DURATION_MINUTES,
        }
    }

    pub fn with_max_duration(mut self, minutes: i64) -> Self {
        self.max_duration_minutes = minutes;
        self
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Create a pending session if the artist's calendar has room
    pub async fn book_session(
        &self,
        caller: &Caller,
        request: BookingRequest,
    ) -> ApiResult<SessionView> {
        if request.duration <= 0 {
            return Err(ApiError::InvalidArgument(
                "duration must be a positive number of minutes".to_string(),
            ));
        }
        if request.duration > self.max_duration_minutes {
            return Err(ApiError::InvalidArgument(format!(
                "duration must not exceed {} minutes",
                self.max_duration_minutes
            )));
        }
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ApiError::InvalidArgument("title is required".to_string()));
        }
        if let Some(pricing) = &request.pricing {
            if !(pricing.amount.is_finite() && pricing.amount >= 0.0) {
                return Err(ApiError::InvalidArgument(
                    "pricing.amount must be a non-negative number".to_string(),
                ));
            }
        }

        let artist = artists::find_artist(&self.db, request.artist_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or_else(|| ApiError::NotFound("Artist not found".to_string()))?;

        if artist.user_id == caller.id {
            return Err(ApiError::Forbidden(
                "artists cannot book their own profile".to_string(),
            ));
        }

        let pricing = request.pricing.unwrap_or_else(|| SessionPricing {
            amount: artist.pricing.session_rate,
            currency: artist.pricing.currency.clone(),
        });

        let ts = folkmart_common::time::now();
        let record = SessionRecord {
            id: Uuid::new_v4(),
            customer_id: caller.id,
            artist_id: artist.id,
            session_type: request.session_type,
            title: title.to_string(),
            description: request.description,
            scheduled_date: request.scheduled_date,
            duration: request.duration,
            format: request.format,
            location: request.location,
            meeting_link: request.meeting_link,
            pricing,
            status: SessionStatus::Pending,
            payment_status: PaymentStatus::Pending,
            rating: None,
            created_at: ts,
            updated_at: ts,
        };

        {
            let _guard = self.locks.lock(artist.id).await;
            retry_on_lock("book session", self.max_lock_wait_ms, || {
                self.try_insert_booking(&record)
            })
            .await?;
        }

        info!(
            session_id = %record.id,
            artist_id = %record.artist_id,
            customer_id = %record.customer_id,
            scheduled = %record.scheduled_date,
            duration = record.duration,
            "Session booked"
        );

        self.load_view(record.id).await
    }

    async fn try_insert_booking(&self, record: &SessionRecord) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        ensure_slot_free(&mut tx, record.artist_id, record.window(), None).await?;
        sessions::insert_session(&mut *tx, record).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Move a session to `status` under the configured policy
    pub async fn update_session_status(
        &self,
        caller: &Caller,
        session_id: Uuid,
        status: SessionStatus,
    ) -> ApiResult<SessionView> {
        let view = self.load_view(session_id).await?;
        if !view.is_party(caller) {
            return Err(ApiError::Forbidden(
                "not permitted to update this session".to_string(),
            ));
        }

        let from = {
            let _guard = self.locks.lock(view.record.artist_id).await;
            retry_on_lock("update session status", self.max_lock_wait_ms, || {
                self.try_update_status(session_id, status)
            })
            .await?
        };

        info!(
            session_id = %session_id,
            artist_id = %view.record.artist_id,
            from = %from,
            to = %status,
            caller = %caller.id,
            "Session status changed"
        );

        self.load_view(session_id).await
    }

    /// Returns the status the session moved away from
    async fn try_update_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
    ) -> ApiResult<SessionStatus> {
        let mut tx = self.db.begin().await?;

        // Re-read inside the transaction; the earlier read was only for authorization
        let current = sessions::find_session(&mut *tx, session_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

        self.policy.check(current.status, status)?;

        // A session coming back onto the calendar must still fit
        if !current.status.occupies_slot() && status.occupies_slot() {
            ensure_slot_free(&mut tx, current.artist_id, current.window(), Some(current.id))
                .await?;
        }

        sessions::update_status(&mut *tx, session_id, status, folkmart_common::time::now())
            .await?;

        tx.commit().await?;
        Ok(current.status)
    }

    /// Attach the customer's rating and fold it into the artist aggregate
    pub async fn rate_session(
        &self,
        caller: &Caller,
        session_id: Uuid,
        score: i64,
        review: Option<String>,
    ) -> ApiResult<SessionView> {
        let score = u8::try_from(score)
            .ok()
            .filter(|s| (1..=5).contains(s))
            .ok_or_else(|| {
                ApiError::InvalidArgument("score must be an integer between 1 and 5".to_string())
            })?;

        let view = self.load_view(session_id).await?;
        if caller.id != view.record.customer_id {
            return Err(ApiError::Forbidden(
                "only the booking customer may rate this session".to_string(),
            ));
        }
        if view.record.status != SessionStatus::Completed {
            return Err(ApiError::InvalidState(NOT_COMPLETED.to_string()));
        }
        if view.record.rating.is_some() {
            return Err(ApiError::InvalidState(ALREADY_RATED.to_string()));
        }

        let rating = SessionRating {
            score,
            review: review.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()),
            rated_at: folkmart_common::time::now(),
        };
        let artist_id = view.record.artist_id;

        {
            let _guard = self.locks.lock(artist_id).await;
            retry_on_lock("rate session", self.max_lock_wait_ms, || {
                self.try_record_rating(session_id, artist_id, &rating)
            })
            .await?;
        }

        info!(
            session_id = %session_id,
            artist_id = %artist_id,
            score,
            "Session rated"
        );

        self.load_view(session_id).await
    }

    async fn try_record_rating(
        &self,
        session_id: Uuid,
        artist_id: Uuid,
        rating: &SessionRating,
    ) -> ApiResult<()> {
        let mut tx = self.db.begin().await?;

        if !sessions::record_rating(&mut *tx, session_id, rating).await? {
            // Lost a race: report what the row looks like now
            let current = sessions::find_session(&mut *tx, session_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;
            let message = if current.status != SessionStatus::Completed {
                NOT_COMPLETED
            } else {
                ALREADY_RATED
            };
            return Err(ApiError::InvalidState(message.to_string()));
        }

        if !artists::add_rating(&mut *tx, artist_id, rating.score).await? {
            return Err(ApiError::Internal(format!(
                "artist {} vanished while rating session {}",
                artist_id, session_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    /// Sessions visible to the caller, latest scheduled first
    pub async fn list_sessions(
        &self,
        caller: &Caller,
        page: PageRequest,
        status: Option<SessionStatus>,
    ) -> ApiResult<Page<SessionView>> {
        let scope = match caller.role {
            Role::Admin => SessionScope::All,
            Role::Artist => SessionScope::Artist { user_id: caller.id },
            Role::Customer => SessionScope::Customer(caller.id),
        };

        let total = sessions::count_sessions(&self.db, scope, status).await?;
        let pagination = calculate_pagination(total, page);
        let items = sessions::list_session_views(
            &self.db,
            scope,
            status,
            pagination.limit,
            pagination.offset,
        )
        .await?;

        debug!(
            caller = %caller.id,
            total,
            page = pagination.page,
            "Listed sessions"
        );

        Ok(Page {
            items,
            info: pagination.into(),
        })
    }

    /// One session, visible to its parties and admins
    pub async fn get_session(&self, caller: &Caller, session_id: Uuid) -> ApiResult<SessionView> {
        let view = self.load_view(session_id).await?;
        if !view.is_party(caller) {
            return Err(ApiError::Forbidden(
                "not permitted to view this session".to_string(),
            ));
        }
        Ok(view)
    }

    async fn load_view(&self, session_id: Uuid) -> ApiResult<SessionView> {
        sessions::find_session_view(&self.db, session_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))
    }
}

/// Conflict when any slot-holding session (other than `ignore`) overlaps `window`
async fn ensure_slot_free(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    artist_id: Uuid,
    window: TimeWindow,
    ignore: Option<Uuid>,
) -> ApiResult<()> {
    let occupied = sessions::occupied_windows(&mut **tx, artist_id, window.end()).await?;

    let clash = occupied
        .iter()
        .find(|(id, existing)| Some(*id) != ignore && existing.overlaps(&window));

    if let Some((existing_id, _)) = clash {
        debug!(
            artist_id = %artist_id,
            existing_session = %existing_id,
            requested_start = %window.start,
            "Booking rejected: slot taken"
        );
        return Err(ApiError::Conflict(NOT_AVAILABLE.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::artists::{find_artist, insert_artist};
    use crate::db::test_support::{artist_profile, identity, test_pool};
    use crate::db::users::insert_user;
    use crate::models::{ArtistProfile, Identity};
    use chrono::TimeZone;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        pool: SqlitePool,
        service: BookingService,
        customer: Caller,
        artist_user: Caller,
        artist: ArtistProfile,
    }

    async fn harness(policy: TransitionPolicy) -> Harness {
        let (dir, pool) = test_pool().await;
        let customer = identity("divya", "divya@example.com", Role::Customer);
        let artist_user = identity("raghu", "raghu@example.com", Role::Artist);
        insert_user(&pool, &customer).await.unwrap();
        insert_user(&pool, &artist_user).await.unwrap();
        let artist = artist_profile(artist_user.id, 500.0);
        insert_artist(&pool, &artist).await.unwrap();

        Harness {
            _dir: dir,
            service: BookingService::new(pool.clone(), policy, 5000),
            pool,
            customer: Caller::from(&customer),
            artist_user: Caller::from(&artist_user),
            artist,
        }
    }

    async fn add_customer(pool: &SqlitePool, name: &str) -> Caller {
        let user: Identity = identity(name, &format!("{}@example.com", name), Role::Customer);
        insert_user(pool, &user).await.unwrap();
        Caller::from(&user)
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, hour, minute, 0).unwrap()
    }

    fn request(artist_id: Uuid, start: DateTime<Utc>, minutes: i64) -> BookingRequest {
        BookingRequest {
            artist_id,
            session_type: SessionType::Lesson,
            title: "Pattachitra basics".to_string(),
            description: None,
            scheduled_date: start,
            duration: minutes,
            format: SessionFormat::Online,
            location: None,
            meeting_link: None,
            pricing: None,
        }
    }

    async fn completed_session(h: &Harness, customer: &Caller, start: DateTime<Utc>) -> Uuid {
        let view = h
            .service
            .book_session(customer, request(h.artist.id, start, 60))
            .await
            .unwrap();
        let id = view.record.id;
        for status in [SessionStatus::Confirmed, SessionStatus::Completed] {
            h.service
                .update_session_status(&h.artist_user, id, status)
                .await
                .unwrap();
        }
        id
    }

    #[tokio::test]
    async fn test_booking_starts_pending_with_artist_rate() {
        let h = harness(TransitionPolicy::Strict).await;
        let view = h
            .service
            .book_session(&h.customer, request(h.artist.id, at(10, 0), 60))
            .await
            .unwrap();

        assert_eq!(view.record.status, SessionStatus::Pending);
        assert_eq!(view.record.payment_status, PaymentStatus::Pending);
        assert!(view.record.rating.is_none());
        assert_eq!(view.record.pricing.amount, 500.0);
        assert_eq!(view.record.pricing.currency, "INR");
        assert_eq!(view.customer.name, "divya");
        assert_eq!(view.artist.name, "raghu");
    }

    #[tokio::test]
    async fn test_overlap_scenario() {
        let h = harness(TransitionPolicy::Strict).await;
        let svc = &h.service;

        svc.book_session(&h.customer, request(h.artist.id, at(10, 0), 60))
            .await
            .unwrap();

        let clash = svc
            .book_session(&h.customer, request(h.artist.id, at(10, 30), 60))
            .await;
        assert!(matches!(clash, Err(ApiError::Conflict(ref m)) if m == NOT_AVAILABLE));

        // Starts exactly when the first ends
        svc.book_session(&h.customer, request(h.artist.id, at(11, 0), 30))
            .await
            .unwrap();

        // Earlier window containing the 10:00 start
        let before = svc
            .book_session(&h.customer, request(h.artist.id, at(9, 30), 60))
            .await;
        assert!(matches!(before, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cancelled_session_frees_slot() {
        let h = harness(TransitionPolicy::Strict).await;
        let first = h
            .service
            .book_session(&h.customer, request(h.artist.id, at(10, 0), 60))
            .await
            .unwrap();
        h.service
            .update_session_status(&h.customer, first.record.id, SessionStatus::Cancelled)
            .await
            .unwrap();

        h.service
            .book_session(&h.customer, request(h.artist.id, at(10, 0), 60))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_booking_validation() {
        let h = harness(TransitionPolicy::Strict).await;

        let mut bad = request(h.artist.id, at(10, 0), 0);
        assert!(matches!(
            h.service.book_session(&h.customer, bad.clone()).await,
            Err(ApiError::InvalidArgument(_))
        ));

        bad.duration = DEFAULT_MAX_DURATION_MINUTES + 1;
        assert!(matches!(
            h.service.book_session(&h.customer, bad.clone()).await,
            Err(ApiError::InvalidArgument(_))
        ));

        bad.duration = 30;
        bad.title = "   ".to_string();
        assert!(matches!(
            h.service.book_session(&h.customer, bad).await,
            Err(ApiError::InvalidArgument(_))
        ));

        let mut negative = request(h.artist.id, at(10, 0), 30);
        negative.pricing = Some(SessionPricing {
            amount: -1.0,
            currency: "INR".to_string(),
        });
        assert!(matches!(
            h.service.book_session(&h.customer, negative).await,
            Err(ApiError::InvalidArgument(_))
        ));

        assert!(matches!(
            h.service
                .book_session(&h.customer, request(Uuid::new_v4(), at(10, 0), 30))
                .await,
            Err(ApiError::NotFound(_))
        ));

        assert!(matches!(
            h.service
                .book_session(&h.artist_user, request(h.artist.id, at(10, 0), 30))
                .await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_configured_duration_cap() {
        let h = harness(TransitionPolicy::Strict).await;
        let service = h.service.clone().with_max_duration(90);

        assert!(matches!(
            service
                .book_session(&h.customer, request(h.artist.id, at(10, 0), 120))
                .await,
            Err(ApiError::InvalidArgument(_))
        ));
        let booked = service
            .book_session(&h.customer, request(h.artist.id, at(10, 0), 90))
            .await
            .unwrap();
        assert_eq!(booked.record.duration, 90);
    }

    #[tokio::test]
    async fn test_inactive_artist_is_not_bookable() {
        let h = harness(TransitionPolicy::Strict).await;
        let mut artist = h.artist.clone();
        artist.is_active = false;
        artists::update_artist(&h.pool, &artist).await.unwrap();

        assert!(matches!(
            h.service
                .book_session(&h.customer, request(h.artist.id, at(10, 0), 30))
                .await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_bookings_yield_one_success() {
        let h = harness(TransitionPolicy::Strict).await;
        let mut customers = Vec::new();
        for i in 0..6 {
            customers.push(add_customer(&h.pool, &format!("c{}", i)).await);
        }

        let mut handles = Vec::new();
        for (i, customer) in customers.into_iter().enumerate() {
            let service = h.service.clone();
            let artist_id = h.artist.id;
            handles.push(tokio::spawn(async move {
                let start = at(10, 0) + chrono::Duration::minutes(i as i64 * 5);
                service
                    .book_session(&customer, request(artist_id, start, 60))
                    .await
            }));
        }

        let mut booked = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => booked += 1,
                Err(ApiError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(booked, 1);
        assert_eq!(conflicts, 5);
    }

    #[tokio::test]
    async fn test_status_authorization() {
        let h = harness(TransitionPolicy::Strict).await;
        let view = h
            .service
            .book_session(&h.customer, request(h.artist.id, at(10, 0), 60))
            .await
            .unwrap();
        let stranger = add_customer(&h.pool, "stranger").await;

        assert!(matches!(
            h.service
                .update_session_status(&stranger, view.record.id, SessionStatus::Cancelled)
                .await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            h.service
                .update_session_status(&stranger, Uuid::new_v4(), SessionStatus::Cancelled)
                .await,
            Err(ApiError::NotFound(_))
        ));

        let admin = Caller::new(Uuid::new_v4(), Role::Admin);
        let confirmed = h
            .service
            .update_session_status(&admin, view.record.id, SessionStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(confirmed.record.status, SessionStatus::Confirmed);
        // Payment untouched
        assert_eq!(confirmed.record.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_strict_policy_rejects_skips_and_terminal_moves() {
        let h = harness(TransitionPolicy::Strict).await;
        let view = h
            .service
            .book_session(&h.customer, request(h.artist.id, at(10, 0), 60))
            .await
            .unwrap();
        let id = view.record.id;

        assert!(matches!(
            h.service
                .update_session_status(&h.artist_user, id, SessionStatus::Completed)
                .await,
            Err(ApiError::InvalidState(_))
        ));
        assert!(matches!(
            h.service
                .update_session_status(&h.artist_user, id, SessionStatus::Pending)
                .await,
            Err(ApiError::InvalidState(_))
        ));

        h.service
            .update_session_status(&h.artist_user, id, SessionStatus::Cancelled)
            .await
            .unwrap();
        assert!(matches!(
            h.service
                .update_session_status(&h.artist_user, id, SessionStatus::Confirmed)
                .await,
            Err(ApiError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_permissive_policy_allows_any_move() {
        let h = harness(TransitionPolicy::Permissive).await;
        let view = h
            .service
            .book_session(&h.customer, request(h.artist.id, at(10, 0), 60))
            .await
            .unwrap();
        let id = view.record.id;

        for status in [
            SessionStatus::Completed,
            SessionStatus::Pending,
            SessionStatus::Cancelled,
            SessionStatus::Confirmed,
        ] {
            let updated = h
                .service
                .update_session_status(&h.customer, id, status)
                .await
                .unwrap();
            assert_eq!(updated.record.status, status);
        }
    }

    #[tokio::test]
    async fn test_reactivated_session_must_still_fit() {
        let h = harness(TransitionPolicy::Permissive).await;
        let first = h
            .service
            .book_session(&h.customer, request(h.artist.id, at(10, 0), 60))
            .await
            .unwrap();
        h.service
            .update_session_status(&h.customer, first.record.id, SessionStatus::Cancelled)
            .await
            .unwrap();
        h.service
            .book_session(&h.customer, request(h.artist.id, at(10, 30), 60))
            .await
            .unwrap();

        assert!(matches!(
            h.service
                .update_session_status(&h.customer, first.record.id, SessionStatus::Pending)
                .await,
            Err(ApiError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_rating_scenario_updates_aggregate() {
        let h = harness(TransitionPolicy::Strict).await;

        let first = completed_session(&h, &h.customer, at(10, 0)).await;
        let rated = h
            .service
            .rate_session(&h.customer, first, 4, Some("Wonderful".to_string()))
            .await
            .unwrap();
        assert_eq!(rated.record.rating.as_ref().map(|r| r.score), Some(4));

        let artist = find_artist(&h.pool, h.artist.id).await.unwrap().unwrap();
        assert_eq!((artist.ratings.average(), artist.ratings.count), (4.0, 1));

        let second = completed_session(&h, &h.customer, at(12, 0)).await;
        h.service
            .rate_session(&h.customer, second, 5, None)
            .await
            .unwrap();

        let artist = find_artist(&h.pool, h.artist.id).await.unwrap().unwrap();
        assert_eq!((artist.ratings.average(), artist.ratings.count), (4.5, 2));
    }

    #[tokio::test]
    async fn test_rating_checks() {
        let h = harness(TransitionPolicy::Strict).await;
        let pending = h
            .service
            .book_session(&h.customer, request(h.artist.id, at(8, 0), 60))
            .await
            .unwrap()
            .record
            .id;

        for score in [0, 6, -1, 300] {
            assert!(matches!(
                h.service.rate_session(&h.customer, pending, score, None).await,
                Err(ApiError::InvalidArgument(_))
            ));
        }

        assert!(matches!(
            h.service.rate_session(&h.customer, Uuid::new_v4(), 3, None).await,
            Err(ApiError::NotFound(_))
        ));

        assert!(matches!(
            h.service.rate_session(&h.customer, pending, 3, None).await,
            Err(ApiError::InvalidState(ref m)) if m == NOT_COMPLETED
        ));

        let done = completed_session(&h, &h.customer, at(10, 0)).await;
        assert!(matches!(
            h.service.rate_session(&h.artist_user, done, 5, None).await,
            Err(ApiError::Forbidden(_))
        ));

        h.service.rate_session(&h.customer, done, 5, None).await.unwrap();
        assert!(matches!(
            h.service.rate_session(&h.customer, done, 1, None).await,
            Err(ApiError::InvalidState(ref m)) if m == ALREADY_RATED
        ));

        let artist = find_artist(&h.pool, h.artist.id).await.unwrap().unwrap();
        assert_eq!(artist.ratings.count, 1);
        assert_eq!(artist.ratings.sum, 5);
    }

    #[tokio::test]
    async fn test_concurrent_ratings_keep_aggregate_exact() {
        let h = harness(TransitionPolicy::Strict).await;
        let mut jobs = Vec::new();
        for i in 0..5u32 {
            let customer = add_customer(&h.pool, &format!("r{}", i)).await;
            let id = completed_session(&h, &customer, at(6 + i * 2, 0)).await;
            jobs.push((customer, id, i64::from(i % 5) + 1));
        }

        let mut handles = Vec::new();
        for (customer, id, score) in jobs {
            let service = h.service.clone();
            handles.push(tokio::spawn(async move {
                service.rate_session(&customer, id, score, None).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let artist = find_artist(&h.pool, h.artist.id).await.unwrap().unwrap();
        assert_eq!(artist.ratings.count, 5);
        assert_eq!(artist.ratings.sum, 1 + 2 + 3 + 4 + 5);
        assert_eq!(artist.ratings.average(), 3.0);
    }

    #[tokio::test]
    async fn test_listing_and_visibility() {
        let h = harness(TransitionPolicy::Strict).await;
        let other = add_customer(&h.pool, "other").await;

        let mine = h
            .service
            .book_session(&h.customer, request(h.artist.id, at(9, 0), 60))
            .await
            .unwrap();
        h.service
            .book_session(&other, request(h.artist.id, at(11, 0), 60))
            .await
            .unwrap();

        let page = h
            .service
            .list_sessions(&h.customer, PageRequest::default(), None)
            .await
            .unwrap();
        assert_eq!(page.info.total, 1);
        assert_eq!(page.items[0].record.id, mine.record.id);

        let page = h
            .service
            .list_sessions(&h.artist_user, PageRequest::new(1, 1), None)
            .await
            .unwrap();
        assert_eq!(page.info.total, 2);
        assert_eq!(page.info.pages, 2);
        assert_eq!(page.items.len(), 1);

        let page = h
            .service
            .list_sessions(&h.artist_user, PageRequest::default(), Some(SessionStatus::Confirmed))
            .await
            .unwrap();
        assert_eq!(page.info.total, 0);

        assert!(matches!(
            h.service.get_session(&other, mine.record.id).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(h.service.get_session(&h.artist_user, mine.record.id).await.is_ok());
    }
}
