use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::UnavailabilityReason;
use super::intervals_overlap;
use crate::error::{DomainError, Result};

/// An owner-declared window during which a court (or a whole venue) cannot be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unavailability {
    pub id: Uuid,
    pub venue_id: Uuid,
    /// `None` blocks every court of the venue
    pub court_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason: UnavailabilityReason,
    pub note: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Unavailability {
    pub fn validate_window(start: NaiveTime, end: NaiveTime) -> Result<()> {
        if start >= end {
            return Err(DomainError::Validation("unavailability must end after it starts".into()));
        }
        Ok(())
    }

    pub fn applies_to(&self, court_id: Uuid) -> bool {
        self.court_id.map_or(true, |c| c == court_id)
    }

    pub fn blocks(&self, court_id: Uuid, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        self.applies_to(court_id)
            && self.date == date
            && intervals_overlap(self.start_time, self.end_time, start, end)
    }
}
