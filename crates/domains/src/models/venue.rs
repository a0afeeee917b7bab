use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{DayOfWeek, SportType, VenueStatus, VenueType};
use crate::error::{DomainError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// An image already stored by the MediaStorage port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueImage {
    /// Opaque storage id, used for deletion
    pub id: String,
    pub url: String,
}

/// Opening window for one weekday. A weekday without an entry is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
    pub day: DayOfWeek,
    pub open: NaiveTime,
    pub close: NaiveTime,
}

/// The owner-editable part of a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueDetails {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: String,
    pub location: Option<GeoPoint>,
    pub venue_type: VenueType,
    pub sports: Vec<SportType>,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub images: Vec<VenueImage>,
    #[serde(default)]
    pub operating_hours: Vec<OperatingHours>,
}

impl VenueDetails {
    /// Checks field constraints and normalizes the sport list (sorted, no duplicates).
    pub fn validate(&mut self) -> Result<()> {
        self.name = self.name.trim().to_string();
        self.address = self.address.trim().to_string();
        if self.name.is_empty() || self.name.chars().count() > 120 {
            return Err(DomainError::Validation("venue name must be 1-120 characters".into()));
        }
        if self.address.is_empty() {
            return Err(DomainError::Validation("venue address is required".into()));
        }
        if self.description.chars().count() > 2000 {
            return Err(DomainError::Validation("venue description exceeds 2000 characters".into()));
        }
        self.sports.sort();
        self.sports.dedup();
        if self.sports.is_empty() {
            return Err(DomainError::Validation("a venue must offer at least one sport".into()));
        }
        if let Some(loc) = self.location {
            if !(-90.0..=90.0).contains(&loc.latitude) || !(-180.0..=180.0).contains(&loc.longitude) {
                return Err(DomainError::Validation("location is out of range".into()));
            }
        }
        self.amenities.retain(|a| !a.trim().is_empty());

        let mut seen = Vec::with_capacity(self.operating_hours.len());
        for hours in &self.operating_hours {
            if hours.open >= hours.close {
                return Err(DomainError::Validation(format!(
                    "opening time must be before closing time on {}",
                    hours.day
                )));
            }
            if seen.contains(&hours.day) {
                return Err(DomainError::Validation(format!("duplicate operating hours for {}", hours.day)));
            }
            seen.push(hours.day);
        }
        self.operating_hours.sort_by_key(|h| h.day);
        Ok(())
    }
}

/// A facility registered by a facility owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: Uuid,
    pub owner_id: Uuid,
    #[serde(flatten)]
    pub details: VenueDetails,
    pub status: VenueStatus,
    /// Present iff `status == Rejected`
    pub rejection_reason: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Venue {
    pub fn new(owner_id: Uuid, details: VenueDetails, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            details,
            status: VenueStatus::Pending,
            rejection_reason: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(VenueStatus::Approved)?;
        self.rejection_reason = None;
        self.updated_at = now;
        Ok(())
    }

    pub fn reject(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::Validation("a rejection reason is required".into()));
        }
        self.transition(VenueStatus::Rejected)?;
        self.rejection_reason = Some(reason.to_string());
        self.updated_at = now;
        Ok(())
    }

    fn transition(&mut self, next: VenueStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::Conflict(format!(
                "venue {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    /// Details may only change while the venue awaits moderation.
    pub fn ensure_editable(&self) -> Result<()> {
        match self.status {
            VenueStatus::Pending => Ok(()),
            other => Err(DomainError::Conflict(format!(
                "venue {} is {} and can no longer be edited",
                self.id, other
            ))),
        }
    }

    pub fn is_publicly_visible(&self) -> bool {
        self.status == VenueStatus::Approved && self.is_active
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn hours_on(&self, day: DayOfWeek) -> Option<&OperatingHours> {
        self.details.operating_hours.iter().find(|h| h.day == day)
    }

    pub fn offers(&self, sport: SportType) -> bool {
        self.details.sports.contains(&sport)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VenueFilter {
    pub owner_id: Option<Uuid>,
    pub status: Option<VenueStatus>,
    pub sport: Option<SportType>,
    pub venue_type: Option<VenueType>,
    pub search: Option<String>,
    /// Restrict to approved and active venues
    #[serde(default)]
    pub public_only: bool,
}

impl VenueFilter {
    pub fn matches(&self, venue: &Venue) -> bool {
        if self.public_only && !venue.is_publicly_visible() {
            return false;
        }
        if self.owner_id.is_some_and(|o| o != venue.owner_id) {
            return false;
        }
        if self.status.is_some_and(|s| s != venue.status) {
            return false;
        }
        if self.sport.is_some_and(|s| !venue.offers(s)) {
            return false;
        }
        if self.venue_type.is_some_and(|t| t != venue.details.venue_type) {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                venue.details.name.to_lowercase().contains(&needle)
                    || venue.details.address.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details() -> VenueDetails {
        VenueDetails {
            name: " Smash Arena ".into(),
            description: String::new(),
            address: "12 Court Lane".into(),
            location: Some(GeoPoint { latitude: 12.9, longitude: 77.6 }),
            venue_type: VenueType::Indoor,
            sports: vec![SportType::Tennis, SportType::Badminton, SportType::Tennis],
            amenities: vec!["parking".into(), " ".into()],
            images: vec![],
            operating_hours: vec![OperatingHours {
                day: DayOfWeek::Monday,
                open: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                close: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            }],
        }
    }

    #[test]
    fn validate_normalizes_sports_and_names() {
        let mut d = details();
        d.validate().unwrap();
        assert_eq!(d.name, "Smash Arena");
        assert_eq!(d.sports, vec![SportType::Badminton, SportType::Tennis]);
        assert_eq!(d.amenities, vec!["parking".to_string()]);
    }

    #[test]
    fn validate_rejects_inverted_hours() {
        let mut d = details();
        d.operating_hours[0].close = NaiveTime::from_hms_opt(5, 0, 0).unwrap();
        assert!(matches!(d.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn rejected_venue_cannot_be_approved() {
        let now = Utc::now();
        let mut venue = Venue::new(Uuid::new_v4(), details(), now);
        assert!(matches!(venue.reject("  ", now), Err(DomainError::Validation(_))));
        venue.reject("blurry photos", now).unwrap();
        assert_eq!(venue.rejection_reason.as_deref(), Some("blurry photos"));
        assert!(matches!(venue.approve(now), Err(DomainError::Conflict(_))));
        assert!(venue.ensure_editable().is_err());
    }

    #[test]
    fn approval_makes_active_venue_visible() {
        let now = Utc::now();
        let mut venue = Venue::new(Uuid::new_v4(), details(), now);
        assert!(!venue.is_publicly_visible());
        venue.approve(now).unwrap();
        assert!(venue.is_publicly_visible());
        venue.is_active = false;
        assert!(!venue.is_publicly_visible());
    }
}
