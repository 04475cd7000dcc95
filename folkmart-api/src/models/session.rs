//! Session (booking) records

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{PartySummary, UnknownVariant};

/// Kind of engagement being booked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Lesson,
    Workshop,
    Consultation,
    Performance,
}

impl SessionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Lesson => "lesson",
            SessionType::Workshop => "workshop",
            SessionType::Consultation => "consultation",
            SessionType::Performance => "performance",
        }
    }
}

impl FromStr for SessionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lesson" => Ok(SessionType::Lesson),
            "workshop" => Ok(SessionType::Workshop),
            "consultation" => Ok(SessionType::Consultation),
            "performance" => Ok(SessionType::Performance),
            other => Err(UnknownVariant::new("session type", other)),
        }
    }
}

/// Where the session happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionFormat {
    Online,
    InPerson,
    Hybrid,
}

impl SessionFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionFormat::Online => "online",
            SessionFormat::InPerson => "in-person",
            SessionFormat::Hybrid => "hybrid",
        }
    }
}

impl FromStr for SessionFormat {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(SessionFormat::Online),
            "in-person" => Ok(SessionFormat::InPerson),
            "hybrid" => Ok(SessionFormat::Hybrid),
            other => Err(UnknownVariant::new("session format", other)),
        }
    }
}

/// Booking lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Rescheduled,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 5] = [
        SessionStatus::Pending,
        SessionStatus::Confirmed,
        SessionStatus::Completed,
        SessionStatus::Cancelled,
        SessionStatus::Rescheduled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Confirmed => "confirmed",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Rescheduled => "rescheduled",
        }
    }

    /// Statuses that hold the artist's calendar slot
    pub fn occupies_slot(self) -> bool {
        matches!(self, SessionStatus::Pending | SessionStatus::Confirmed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SessionStatus::Pending),
            "confirmed" => Ok(SessionStatus::Confirmed),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            "rescheduled" => Ok(SessionStatus::Rescheduled),
            other => Err(UnknownVariant::new("session status", other)),
        }
    }
}

/// Payment state; recorded only, never derived from `SessionStatus`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(UnknownVariant::new("payment status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPricing {
    pub amount: f64,
    #[serde(default = "super::artist::default_currency")]
    pub currency: String,
}

/// Customer feedback, written once after completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRating {
    pub score: u8,
    pub review: Option<String>,
    pub rated_at: DateTime<Utc>,
}

/// Half-open time interval `[start, start + minutes)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub minutes: i64,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, minutes: i64) -> Self {
        Self { start, minutes }
    }

    /// Saturates at the latest representable instant instead of overflowing
    pub fn end(&self) -> DateTime<Utc> {
        Duration::try_minutes(self.minutes)
            .and_then(|length| self.start.checked_add_signed(length))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Two windows overlap when each starts before the other ends.
    /// Back-to-back windows (one ends exactly when the next starts) do not.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// Booking record
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub artist_id: Uuid,
    pub session_type: SessionType,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_date: DateTime<Utc>,
    /// Minutes
    pub duration: i64,
    pub format: SessionFormat,
    pub location: Option<String>,
    pub meeting_link: Option<String>,
    pub pricing: SessionPricing,
    pub status: SessionStatus,
    pub payment_status: PaymentStatus,
    pub rating: Option<SessionRating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.scheduled_date, self.duration)
    }
}

/// Artist side of a session projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistSummary {
    /// Artist profile id
    pub id: Uuid,
    /// Identity owning the profile
    pub user_id: Uuid,
    pub name: String,
    pub profile_image: Option<String>,
}

/// Session with both parties expanded for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    #[serde(flatten)]
    pub record: SessionRecord,
    pub customer: PartySummary,
    pub artist: ArtistSummary,
}

impl SessionView {
    /// Booking customer, owning artist, or admin
    pub fn is_party(&self, caller: &super::Caller) -> bool {
        caller.is_admin()
            || caller.id == self.record.customer_id
            || caller.id == self.artist.user_id
    }
}
