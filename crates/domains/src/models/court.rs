use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{SlotDuration, SportType};
use crate::error::{DomainError, Result};

/// Upper bound on a slot price in minor units (one million in major units).
pub const MAX_PRICE_PER_SLOT: i64 = 100_000_000;

/// A single bookable playing surface inside a venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Court {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub name: String,
    pub sport_type: SportType,
    pub slot_duration: SlotDuration,
    /// Price of one slot in minor currency units
    pub price_per_slot: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CourtDetails {
    pub name: String,
    pub sport_type: SportType,
    pub slot_duration: SlotDuration,
    pub price_per_slot: i64,
}

impl CourtDetails {
    pub fn validate(&mut self) -> Result<()> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() || self.name.chars().count() > 80 {
            return Err(DomainError::Validation("court name must be 1-80 characters".into()));
        }
        if self.price_per_slot <= 0 {
            return Err(DomainError::Validation("price per slot must be positive".into()));
        }
        if self.price_per_slot > MAX_PRICE_PER_SLOT {
            return Err(DomainError::Validation(format!("price per slot must not exceed {MAX_PRICE_PER_SLOT}")));
        }
        Ok(())
    }
}

impl Court {
    pub fn new(venue_id: Uuid, details: CourtDetails, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            venue_id,
            name: details.name,
            sport_type: details.sport_type,
            slot_duration: details.slot_duration,
            price_per_slot: details.price_per_slot,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, details: CourtDetails, now: DateTime<Utc>) {
        self.name = details.name;
        self.sport_type = details.sport_type;
        self.slot_duration = details.slot_duration;
        self.price_per_slot = details.price_per_slot;
        self.updated_at = now;
    }

    pub fn price_for(&self, slot_count: u32) -> Result<i64> {
        self.price_per_slot
            .checked_mul(i64::from(slot_count))
            .ok_or_else(|| DomainError::Validation("booking total is out of range".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(price: i64) -> CourtDetails {
        CourtDetails {
            name: " Court 1 ".into(),
            sport_type: SportType::Tennis,
            slot_duration: SlotDuration::OneHour,
            price_per_slot: price,
        }
    }

    #[test]
    fn price_must_be_positive_and_bounded() {
        assert!(matches!(details(0).validate(), Err(DomainError::Validation(_))));
        assert!(matches!(details(MAX_PRICE_PER_SLOT + 1).validate(), Err(DomainError::Validation(_))));

        let mut ok = details(MAX_PRICE_PER_SLOT);
        ok.validate().unwrap();
        assert_eq!(ok.name, "Court 1");
    }

    #[test]
    fn booking_total_is_checked() {
        let mut court = Court::new(Uuid::new_v4(), details(750), Utc::now());
        assert_eq!(court.price_for(3).unwrap(), 2_250);

        // Rows written before the price bound existed can still hold huge prices.
        court.price_per_slot = i64::MAX / 2 + 1;
        assert!(matches!(court.price_for(2), Err(DomainError::Validation(_))));
        assert!(court.price_for(1).is_ok());
    }
}
