use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, Result};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const MAX_COMMENT_CHARS: usize = 1000;

/// A rating left by a user for a venue, anchored to one completed booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub venue_id: Uuid,
    pub booking_id: Uuid,
    pub rating: u8,
    pub comment: String,
    /// Soft-deleted reviews keep their booking slot; see `ReviewRepo::find_by_booking`
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    pub fn validate_content(rating: u8, comment: &str) -> Result<()> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(DomainError::Validation(format!(
                "rating must be between {MIN_RATING} and {MAX_RATING}"
            )));
        }
        if comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(DomainError::Validation(format!(
                "comment exceeds {MAX_COMMENT_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// Aggregate rating for a venue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: u64,
}

impl RatingSummary {
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let (sum, count) = reviews
            .into_iter()
            .filter(|r| r.is_active)
            .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r.rating), count + 1));
        let average = if count == 0 {
            0.0
        } else {
            // one decimal place, as shown next to venue names
            ((sum as f64 / count as f64) * 10.0).round() / 10.0
        };
        Self { average, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_enforced() {
        assert!(Review::validate_content(0, "").is_err());
        assert!(Review::validate_content(6, "").is_err());
        assert!(Review::validate_content(5, "great courts").is_ok());
        assert!(Review::validate_content(3, &"x".repeat(MAX_COMMENT_CHARS + 1)).is_err());
    }

    #[test]
    fn summary_ignores_inactive_reviews() {
        let now = Utc::now();
        let mk = |rating, is_active| Review {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            venue_id: Uuid::nil(),
            booking_id: Uuid::new_v4(),
            rating,
            comment: String::new(),
            is_active,
            created_at: now,
            updated_at: now,
        };
        let reviews = vec![mk(5, true), mk(4, true), mk(1, false)];
        let summary = RatingSummary::from_reviews(&reviews);
        assert_eq!(summary.count, 2);
        assert_eq!(summary.average, 4.5);
    }
}
