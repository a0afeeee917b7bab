use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{BookingStatus, SlotDuration, SportType};
use super::intervals_overlap;
use crate::error::{DomainError, Result};

/// A reservation of consecutive slots on one court.
///
/// Dates and times are venue-local wall-clock values; the platform compares
/// them against `Clock::now()` expressed as naive UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub venue_id: Uuid,
    pub court_id: Uuid,
    /// Copied from the court at booking time
    pub sport_type: SportType,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_count: u32,
    pub slot_duration: SlotDuration,
    /// Minor currency units
    pub total_amount: i64,
    pub status: BookingStatus,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// No gateway is wired in; payment completion is simulated
    pub payment_simulated: bool,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.end_time)
    }

    /// Whether this booking currently blocks `[start, end)` on `date`.
    pub fn blocks(&self, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> bool {
        self.status == BookingStatus::Confirmed
            && self.date == date
            && intervals_overlap(self.start_time, self.end_time, start, end)
    }

    /// Moves an elapsed confirmed booking to `Completed`.
    /// Returns `true` when the status changed.
    pub fn settle(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == BookingStatus::Confirmed && self.ends_at() <= now.naive_utc() {
            self.status = BookingStatus::Completed;
            self.completed_at = Some(now);
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::Validation("a cancellation reason is required".into()));
        }
        if !self.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(DomainError::Conflict(format!(
                "booking {} is already {}",
                self.id, self.status
            )));
        }
        if now.naive_utc() >= self.starts_at() {
            return Err(DomainError::Conflict(format!(
                "booking {} has already started and can no longer be cancelled",
                self.id
            )));
        }
        self.status = BookingStatus::Cancelled;
        self.cancellation_reason = Some(reason.to_string());
        self.cancelled_at = Some(now);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingFilter {
    pub user_id: Option<Uuid>,
    /// Restrict to these venues; `Some(vec![])` matches nothing
    pub venue_ids: Option<Vec<Uuid>>,
    pub court_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        if self.user_id.is_some_and(|u| u != booking.user_id) {
            return false;
        }
        if let Some(venues) = &self.venue_ids {
            if !venues.contains(&booking.venue_id) {
                return false;
            }
        }
        if self.court_id.is_some_and(|c| c != booking.court_id) {
            return false;
        }
        if self.status.is_some_and(|s| s != booking.status) {
            return false;
        }
        if self.date_from.is_some_and(|d| booking.date < d) {
            return false;
        }
        if self.date_to.is_some_and(|d| booking.date > d) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn booking() -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            court_id: Uuid::new_v4(),
            sport_type: SportType::Badminton,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            slot_count: 1,
            slot_duration: SlotDuration::OneHour,
            total_amount: 50_000,
            status: BookingStatus::Confirmed,
            cancellation_reason: None,
            cancelled_at: None,
            completed_at: None,
            payment_simulated: true,
            created_at: Utc.with_ymd_and_hms(2023, 12, 30, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn settle_completes_only_after_end() {
        let mut b = booking();
        assert!(!b.settle(Utc.with_ymd_and_hms(2024, 1, 1, 10, 59, 0).unwrap()));
        assert_eq!(b.status, BookingStatus::Confirmed);
        assert!(b.settle(Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap()));
        assert_eq!(b.status, BookingStatus::Completed);
        assert!(b.completed_at.is_some());
    }

    #[test]
    fn cancel_requires_reason_and_future_start() {
        let before = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
        let mut b = booking();
        assert!(matches!(b.cancel(" ", before), Err(DomainError::Validation(_))));

        let mut late = booking();
        let after_start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        assert!(matches!(late.cancel("rain", after_start), Err(DomainError::Conflict(_))));

        b.cancel("rain", before).unwrap();
        assert_eq!(b.status, BookingStatus::Cancelled);
        assert_eq!(b.cancelled_at, Some(before));
    }

    #[test]
    fn terminal_booking_never_regresses() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut b = booking();
        b.settle(now);
        assert!(b.cancel("too late", now).is_err());
        assert!(!b.settle(now));
        assert_eq!(b.status, BookingStatus::Completed);
    }

    #[test]
    fn only_confirmed_bookings_block_slots() {
        let mut b = booking();
        let t = |h| NaiveTime::from_hms_opt(h, 30, 0).unwrap();
        assert!(b.blocks(b.date, t(10), t(11)));
        assert!(!b.blocks(b.date.succ_opt().unwrap(), t(10), t(11)));
        b.status = BookingStatus::Cancelled;
        assert!(!b.blocks(b.date, t(10), t(11)));
    }
}
