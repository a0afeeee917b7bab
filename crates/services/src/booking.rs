//! Booking lifecycle.
//!
//! ```text
//! confirmed ──(end time elapsed)──▶ completed
//!     └──────(cancel before start)─▶ cancelled
//! ```
//! Completion is applied lazily whenever bookings are read and by the
//! periodic sweep in the binary. Both terminal states are final.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use domains::{
    Actor, Booking, BookingFilter, BookingRepo, BookingStatus, Clock, CourtRepo, DomainError, Page,
    Paginated, Result, SlotDuration, VenueRepo,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::availability::{booking_end, ensure_within_hours, AvailabilityService};
use crate::Ports;

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub court_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub slot_count: u32,
    /// Must match the court's slot duration when given
    pub slot_duration: Option<SlotDuration>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwnerBookingQuery {
    pub venue_id: Option<Uuid>,
    pub court_id: Option<Uuid>,
    pub status: Option<BookingStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct BookingService {
    bookings: Arc<dyn BookingRepo>,
    courts: Arc<dyn CourtRepo>,
    venues: Arc<dyn VenueRepo>,
    availability: AvailabilityService,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(ports: &Ports) -> Self {
        Self {
            bookings: ports.bookings.clone(),
            courts: ports.courts.clone(),
            venues: ports.venues.clone(),
            availability: AvailabilityService::new(ports),
            clock: ports.clock.clone(),
        }
    }

    pub async fn create(&self, actor: &Actor, req: NewBooking) -> Result<Booking> {
        let court = self
            .courts
            .find_by_id(req.court_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Court", req.court_id))?;
        let venue = self
            .venues
            .find_by_id(court.venue_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Venue", court.venue_id))?;
        if !venue.is_publicly_visible() || !court.is_active {
            return Err(DomainError::Validation(format!("court {} is not accepting bookings", court.id)));
        }

        if let Some(requested) = req.slot_duration {
            if requested != court.slot_duration {
                return Err(DomainError::Validation(format!(
                    "court {} is booked in {}-minute slots",
                    court.id,
                    court.slot_duration.minutes()
                )));
            }
        }
        let end_time = booking_end(req.start_time, req.slot_count, court.slot_duration)?;
        let now = self.clock.now();
        if req.date.and_time(req.start_time) <= now.naive_utc() {
            return Err(DomainError::Validation("cannot book a slot in the past".into()));
        }
        ensure_within_hours(&venue, court.slot_duration, req.date, req.start_time, end_time)?;

        // Blocks never look at bookings, so a block racing this insert orders after it and
        // leaves the booking standing. Only bookings must be exclusive under concurrency.
        if let Some(block) = self.availability.blocking(&court, req.date, req.start_time, end_time).await? {
            return Err(DomainError::Conflict(format!(
                "court {} is unavailable at that time ({})",
                court.id, block.reason
            )));
        }

        let booking = Booking {
            id: Uuid::new_v4(),
            user_id: actor.user_id,
            venue_id: venue.id,
            court_id: court.id,
            sport_type: court.sport_type,
            date: req.date,
            start_time: req.start_time,
            end_time,
            slot_count: req.slot_count,
            slot_duration: court.slot_duration,
            total_amount: court.price_for(req.slot_count)?,
            status: BookingStatus::Confirmed,
            cancellation_reason: None,
            cancelled_at: None,
            completed_at: None,
            payment_simulated: true,
            created_at: now,
        };

        match self.bookings.insert_if_free(booking).await {
            Ok(booking) => {
                tracing::info!(
                    booking_id = %booking.id,
                    court_id = %booking.court_id,
                    date = %booking.date,
                    start = %booking.start_time,
                    end = %booking.end_time,
                    "booking confirmed"
                );
                Ok(booking)
            }
            Err(e) => {
                if matches!(e, DomainError::Conflict(_)) {
                    tracing::debug!(court_id = %court.id, date = %req.date, start = %req.start_time, "slot already taken");
                }
                Err(e)
            }
        }
    }

    /// Persists lazy completion for bookings whose end time has passed.
    pub async fn settle(&self, bookings: &mut [Booking]) -> Result<()> {
        let now = self.clock.now();
        for booking in bookings.iter_mut() {
            if booking.settle(now) {
                match self.bookings.update_status(booking, BookingStatus::Confirmed).await {
                    Ok(()) => {}
                    // Stored row moved on since it was read; report what was stored instead.
                    Err(DomainError::Conflict(_)) => {
                        if let Some(stored) = self.bookings.find_by_id(booking.id).await? {
                            *booking = stored;
                        }
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Booking> {
        let mut booking = self
            .bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", id))?;
        self.settle(std::slice::from_mut(&mut booking)).await?;
        Ok(booking)
    }

    async fn is_venue_owner(&self, actor: &Actor, venue_id: Uuid) -> Result<bool> {
        Ok(self
            .venues
            .find_by_id(venue_id)
            .await?
            .is_some_and(|v| v.is_owned_by(actor.user_id)))
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Booking> {
        let booking = self.load(id).await?;
        if booking.user_id == actor.user_id || actor.is_admin() || self.is_venue_owner(actor, booking.venue_id).await? {
            Ok(booking)
        } else {
            Err(DomainError::Authorization(format!("booking {id} does not belong to the caller")))
        }
    }

    pub async fn cancel(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<Booking> {
        let mut booking = self.load(id).await?;
        if booking.user_id != actor.user_id && !self.is_venue_owner(actor, booking.venue_id).await? {
            return Err(DomainError::Authorization(format!(
                "only the booker or the venue owner may cancel booking {id}"
            )));
        }
        booking.cancel(reason, self.clock.now())?;
        self.bookings.update_status(&booking, BookingStatus::Confirmed).await?;
        tracing::info!(booking_id = %id, by = %actor.user_id, "booking cancelled");
        Ok(booking)
    }

    pub async fn list_mine(&self, actor: &Actor, status: Option<BookingStatus>, page: Page) -> Result<Paginated<Booking>> {
        let filter = BookingFilter { user_id: Some(actor.user_id), ..BookingFilter::default() };
        let bookings = self.fetch(&filter, status).await?;
        Ok(page.apply(bookings))
    }

    /// Bookings across the venues the caller manages; `venue_ids = None` means all.
    pub async fn list_for_venues(
        &self,
        venue_ids: Option<Vec<Uuid>>,
        query: &OwnerBookingQuery,
        page: Page,
    ) -> Result<Paginated<Booking>> {
        let bookings = self.fetch_for_venues(venue_ids, query).await?;
        Ok(page.apply(bookings))
    }

    /// Settled, newest-first bookings for aggregation and listing.
    pub async fn fetch_for_venues(&self, venue_ids: Option<Vec<Uuid>>, query: &OwnerBookingQuery) -> Result<Vec<Booking>> {
        let venue_ids = match (venue_ids, query.venue_id) {
            (Some(ids), Some(v)) => Some(ids.into_iter().filter(|id| *id == v).collect()),
            (None, Some(v)) => Some(vec![v]),
            (ids, None) => ids,
        };
        let filter = BookingFilter {
            venue_ids,
            court_id: query.court_id,
            date_from: query.date_from,
            date_to: query.date_to,
            ..BookingFilter::default()
        };
        self.fetch(&filter, query.status).await
    }

    /// Status is filtered after settling so that lazily completed bookings
    /// are reported under their new status.
    async fn fetch(&self, filter: &BookingFilter, status: Option<BookingStatus>) -> Result<Vec<Booking>> {
        let mut bookings = self.bookings.list(filter).await?;
        self.settle(&mut bookings).await?;
        if let Some(status) = status {
            bookings.retain(|b| b.status == status);
        }
        bookings.sort_by(|a, b| b.starts_at().cmp(&a.starts_at()).then(b.created_at.cmp(&a.created_at)));
        Ok(bookings)
    }

    /// Periodic sweep entry point.
    pub async fn complete_elapsed(&self) -> Result<u64> {
        let completed = self.bookings.complete_elapsed(self.clock.now()).await?;
        if completed > 0 {
            tracing::info!(completed, "completed elapsed bookings");
        }
        Ok(completed)
    }
}
