//! Artist profile records and the derived rating aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PartySummary;

/// One artform an artist practices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialization {
    pub artform: String,
    pub category: String,
    #[serde(default)]
    pub years_of_experience: u32,
}

/// Showcase entry (photo, recording, video link)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    pub title: String,
    pub media_url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Default booking price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistPricing {
    pub session_rate: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

pub(crate) fn default_currency() -> String {
    "INR".to_string()
}

/// Rating aggregate stored as running totals
///
/// Only the booking workflow changes it, by adding one score at a time.
/// Serializes as `{ average, count }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RatingAggregate {
    pub sum: i64,
    pub count: i64,
}

impl RatingAggregate {
    pub fn from_totals(sum: i64, count: i64) -> Self {
        Self { sum, count }
    }

    /// Aggregate after adding one more score
    pub fn with_score(self, score: u8) -> Self {
        Self {
            sum: self.sum + i64::from(score),
            count: self.count + 1,
        }
    }

    /// Mean score rounded half-up to one decimal place; 0.0 with no ratings
    ///
    /// Works in integer tenths so 4.45 rounds to 4.5 regardless of float
    /// representation.
    pub fn average(&self) -> f64 {
        if self.count <= 0 {
            return 0.0;
        }
        let tenths = (self.sum * 20 + self.count) / (self.count * 2);
        tenths as f64 / 10.0
    }
}

impl Serialize for RatingAggregate {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("RatingAggregate", 2)?;
        state.serialize_field("average", &self.average())?;
        state.serialize_field("count", &self.count)?;
        state.end()
    }
}

/// Artist profile row
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub specializations: Vec<Specialization>,
    pub portfolio: Vec<PortfolioItem>,
    pub pricing: ArtistPricing,
    pub ratings: RatingAggregate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile plus the owner's display summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistView {
    #[serde(flatten)]
    pub profile: ArtistProfile,
    pub user: PartySummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_aggregate_is_zero() {
        let agg = RatingAggregate::default();
        assert_eq!(agg.average(), 0.0);
        assert_eq!(agg.count, 0);
    }

    #[test]
    fn test_incremental_scores() {
        let agg = RatingAggregate::default().with_score(4);
        assert_eq!((agg.average(), agg.count), (4.0, 1));

        let agg = agg.with_score(5);
        assert_eq!((agg.average(), agg.count), (4.5, 2));
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        // 13 / 3 = 4.333...
        assert_eq!(RatingAggregate::from_totals(13, 3).average(), 4.3);
        // 14 / 3 = 4.666...
        assert_eq!(RatingAggregate::from_totals(14, 3).average(), 4.7);
        // 89 / 20 = 4.45 rounds half up
        assert_eq!(RatingAggregate::from_totals(89, 20).average(), 4.5);
    }

    #[test]
    fn test_average_matches_rounded_mean_for_all_small_populations() {
        for count in 1..=12i64 {
            for sum in count..=count * 5 {
                let mean = sum as f64 / count as f64;
                let expected = (mean * 10.0 + 1e-9).round() / 10.0;
                assert_eq!(
                    RatingAggregate::from_totals(sum, count).average(),
                    expected,
                    "sum={} count={}",
                    sum,
                    count
                );
            }
        }
    }

    #[test]
    fn test_serializes_average_not_sum() {
        let json = serde_json::to_value(RatingAggregate::from_totals(9, 2)).unwrap();
        assert_eq!(json, serde_json::json!({ "average": 4.5, "count": 2 }));
    }
}
