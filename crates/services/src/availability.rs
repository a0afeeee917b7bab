//! Slot grids, owner-declared unavailability and per-day court availability.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Timelike};
use domains::{
    Actor, Booking, BookingFilter, BookingRepo, BookingStatus, Clock, Court, CourtRepo, DayOfWeek,
    DomainError, Result, SlotDuration, Unavailability, UnavailabilityReason, UnavailabilityRepo, Venue,
    VenueRepo,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::{can_see_hidden, require_manager};
use crate::Ports;

pub const MAX_SLOTS_PER_BOOKING: u32 = 24;

/// End of `slot_count` consecutive slots starting at `start`. Bookings never
/// cross midnight.
pub fn booking_end(start: NaiveTime, slot_count: u32, duration: SlotDuration) -> Result<NaiveTime> {
    if slot_count == 0 {
        return Err(DomainError::Validation("at least one slot must be booked".into()));
    }
    if slot_count > MAX_SLOTS_PER_BOOKING {
        return Err(DomainError::Validation(format!(
            "at most {MAX_SLOTS_PER_BOOKING} slots can be booked at once"
        )));
    }
    let length = duration.as_duration() * slot_count as i32;
    let (end, wrapped) = start.overflowing_add_signed(length);
    if wrapped != 0 || end <= start {
        return Err(DomainError::Validation("a booking cannot extend past midnight".into()));
    }
    Ok(end)
}

/// Every slot boundary between `open` and `close`, aligned to `open`.
pub fn slot_grid(open: NaiveTime, close: NaiveTime, duration: SlotDuration) -> Vec<(NaiveTime, NaiveTime)> {
    let mut slots = Vec::new();
    let mut start = open;
    while let Ok(end) = booking_end(start, 1, duration) {
        if end > close {
            break;
        }
        slots.push((start, end));
        start = end;
    }
    slots
}

/// Checks that `[start, end)` lies inside the venue's hours on `date` and sits
/// on the court's slot grid.
pub fn ensure_within_hours(
    venue: &Venue,
    duration: SlotDuration,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
) -> Result<()> {
    let day = DayOfWeek::from(chrono::Datelike::weekday(&date));
    let hours = venue
        .hours_on(day)
        .ok_or_else(|| DomainError::Validation(format!("venue is closed on {day}")))?;
    if start < hours.open || end > hours.close {
        return Err(DomainError::Validation(format!(
            "requested time is outside operating hours {}-{}",
            hours.open.format("%H:%M"),
            hours.close.format("%H:%M")
        )));
    }
    let offset = (start - hours.open).num_minutes();
    if offset % i64::from(duration.minutes()) != 0 || start.second() != 0 {
        return Err(DomainError::Validation(format!(
            "start time must align to {}-minute slots from {}",
            duration.minutes(),
            hours.open.format("%H:%M")
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Free,
    Booked,
    Blocked,
    Past,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub state: SlotState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourtAvailability {
    pub court_id: Uuid,
    pub venue_id: Uuid,
    pub date: NaiveDate,
    pub slot_duration: SlotDuration,
    pub price_per_slot: i64,
    /// `None` when the venue is closed that day
    pub open: Option<NaiveTime>,
    pub close: Option<NaiveTime>,
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUnavailability {
    pub court_id: Option<Uuid>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason: UnavailabilityReason,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct AvailabilityService {
    venues: Arc<dyn VenueRepo>,
    courts: Arc<dyn CourtRepo>,
    bookings: Arc<dyn BookingRepo>,
    blocks: Arc<dyn UnavailabilityRepo>,
    clock: Arc<dyn Clock>,
}

impl AvailabilityService {
    pub fn new(ports: &Ports) -> Self {
        Self {
            venues: ports.venues.clone(),
            courts: ports.courts.clone(),
            bookings: ports.bookings.clone(),
            blocks: ports.unavailability.clone(),
            clock: ports.clock.clone(),
        }
    }

    async fn venue(&self, id: Uuid) -> Result<Venue> {
        self.venues.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("Venue", id))
    }

    async fn court(&self, id: Uuid) -> Result<Court> {
        self.courts.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("Court", id))
    }

    /// Existing bookings inside the window are kept; only new bookings are refused.
    pub async fn add_block(&self, actor: &Actor, venue_id: Uuid, req: NewUnavailability) -> Result<Unavailability> {
        let venue = self.venue(venue_id).await?;
        require_manager(actor, &venue)?;
        Unavailability::validate_window(req.start_time, req.end_time)?;
        let now = self.clock.now();
        if req.date < now.date_naive() {
            return Err(DomainError::Validation("unavailability cannot be declared in the past".into()));
        }
        if let Some(court_id) = req.court_id {
            let court = self.court(court_id).await?;
            if court.venue_id != venue_id {
                return Err(DomainError::Validation(format!("court {court_id} does not belong to venue {venue_id}")));
            }
        }
        let block = Unavailability {
            id: Uuid::new_v4(),
            venue_id,
            court_id: req.court_id,
            date: req.date,
            start_time: req.start_time,
            end_time: req.end_time,
            reason: req.reason,
            note: req.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            created_by: actor.user_id,
            created_at: now,
        };
        let block = self.blocks.insert(block).await?;
        tracing::info!(block_id = %block.id, %venue_id, reason = %block.reason, "unavailability declared");
        Ok(block)
    }

    pub async fn list_blocks(&self, actor: &Actor, venue_id: Uuid, date: Option<NaiveDate>) -> Result<Vec<Unavailability>> {
        let venue = self.venue(venue_id).await?;
        require_manager(actor, &venue)?;
        self.blocks.list_by_venue(venue_id, date).await
    }

    pub async fn remove_block(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let block = self
            .blocks
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Unavailability", id))?;
        let venue = self.venue(block.venue_id).await?;
        require_manager(actor, &venue)?;
        self.blocks.delete(id).await
    }

    /// First block covering the interval, if any.
    pub async fn blocking(&self, court: &Court, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Result<Option<Unavailability>> {
        let blocks = self.blocks.list_by_venue(court.venue_id, Some(date)).await?;
        Ok(blocks.into_iter().find(|b| b.blocks(court.id, date, start, end)))
    }

    pub async fn court_availability(&self, actor: Option<&Actor>, court_id: Uuid, date: NaiveDate) -> Result<CourtAvailability> {
        let court = self.court(court_id).await?;
        let venue = self.venue(court.venue_id).await?;
        let visible = (venue.is_publicly_visible() && court.is_active) || can_see_hidden(actor, &venue);
        if !visible {
            return Err(DomainError::not_found("Court", court_id));
        }

        let mut result = CourtAvailability {
            court_id,
            venue_id: venue.id,
            date,
            slot_duration: court.slot_duration,
            price_per_slot: court.price_per_slot,
            open: None,
            close: None,
            slots: Vec::new(),
        };
        let day = DayOfWeek::from(chrono::Datelike::weekday(&date));
        let Some(hours) = venue.hours_on(day).copied() else {
            return Ok(result);
        };
        result.open = Some(hours.open);
        result.close = Some(hours.close);

        let filter = BookingFilter {
            court_id: Some(court_id),
            status: Some(BookingStatus::Confirmed),
            date_from: Some(date),
            date_to: Some(date),
            ..BookingFilter::default()
        };
        let bookings: Vec<Booking> = self.bookings.list(&filter).await?;
        let blocks = self.blocks.list_by_venue(venue.id, Some(date)).await?;
        let now = self.clock.now().naive_utc();

        result.slots = slot_grid(hours.open, hours.close, court.slot_duration)
            .into_iter()
            .map(|(start, end)| {
                let state = if date.and_time(start) <= now {
                    SlotState::Past
                } else if blocks.iter().any(|b| b.blocks(court_id, date, start, end)) {
                    SlotState::Blocked
                } else if bookings.iter().any(|b| b.blocks(date, start, end)) {
                    SlotState::Booked
                } else {
                    SlotState::Free
                };
                SlotView { start_time: start, end_time: end, state }
            })
            .collect();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn booking_end_rejects_midnight_wrap() {
        assert_eq!(booking_end(t(21, 0), 2, SlotDuration::OneHour).unwrap(), t(23, 0));
        assert!(booking_end(t(23, 0), 1, SlotDuration::TwoHours).is_err());
        assert!(booking_end(t(10, 0), 0, SlotDuration::OneHour).is_err());
    }

    #[test]
    fn slot_grid_stops_before_close() {
        let grid = slot_grid(t(6, 0), t(10, 0), SlotDuration::NinetyMinutes);
        assert_eq!(grid, vec![(t(6, 0), t(7, 30)), (t(7, 30), t(9, 0))]);
    }
}
