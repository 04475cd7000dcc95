//! Domain types for identities, artist profiles, and session records
//!
//! Enums are stored as their lowercase text form and serialized the same way
//! on the wire.

pub mod artist;
pub mod identity;
pub mod session;

pub use artist::{
    ArtistPricing, ArtistProfile, ArtistView, PortfolioItem, RatingAggregate, Specialization,
};
pub use identity::{Caller, Identity, PartySummary, Preferences, Role};
pub use session::{
    ArtistSummary, PaymentStatus, SessionFormat, SessionPricing, SessionRating, SessionRecord,
    SessionStatus, SessionType, SessionView, TimeWindow,
};

use thiserror::Error;

/// Text that does not name any variant of a domain enum
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown {kind}: '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
