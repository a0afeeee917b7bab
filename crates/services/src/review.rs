//! Review eligibility and authoring. Eligibility is always re-derived from
//! stored bookings; nothing the client claims about a booking is trusted.

use std::sync::Arc;

use domains::{
    Actor, Booking, BookingFilter, BookingRepo, BookingStatus, Clock, DomainError, Page, Paginated, RatingSummary,
    Result, Review, ReviewRepo, VenueRepo,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::BookingService;
use crate::Ports;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub venue_id: Uuid,
    pub booking_id: Uuid,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewEdit {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Eligibility {
    pub can_review: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub eligible_bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VenueReviews {
    pub summary: RatingSummary,
    pub reviews: Paginated<Review>,
}

#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepo>,
    venues: Arc<dyn VenueRepo>,
    bookings: Arc<dyn BookingRepo>,
    booking_service: BookingService,
    clock: Arc<dyn Clock>,
}

impl ReviewService {
    pub fn new(ports: &Ports, booking_service: BookingService) -> Self {
        Self {
            reviews: ports.reviews.clone(),
            venues: ports.venues.clone(),
            bookings: ports.bookings.clone(),
            booking_service,
            clock: ports.clock.clone(),
        }
    }

    pub async fn can_review(&self, actor: &Actor, venue_id: Uuid) -> Result<Eligibility> {
        if self.venues.find_by_id(venue_id).await?.is_none() {
            return Err(DomainError::not_found("Venue", venue_id));
        }
        let filter = BookingFilter {
            user_id: Some(actor.user_id),
            venue_ids: Some(vec![venue_id]),
            ..BookingFilter::default()
        };
        let mut bookings = self.bookings.list(&filter).await?;
        self.booking_service.settle(&mut bookings).await?;

        let completed: Vec<Booking> = bookings.into_iter().filter(|b| b.status == BookingStatus::Completed).collect();
        if completed.is_empty() {
            return Ok(Eligibility {
                can_review: false,
                reason: Some("no completed bookings at this venue".into()),
                eligible_bookings: Vec::new(),
            });
        }

        let mut eligible = Vec::new();
        for booking in completed {
            if self.reviews.find_by_booking(booking.id).await?.is_none() {
                eligible.push(booking);
            }
        }
        let reason = eligible.is_empty().then(|| "every completed booking has already been reviewed".to_string());
        Ok(Eligibility { can_review: !eligible.is_empty(), reason, eligible_bookings: eligible })
    }

    pub async fn create(&self, actor: &Actor, req: NewReview) -> Result<Review> {
        let comment = req.comment.trim().to_string();
        Review::validate_content(req.rating, &comment)?;

        let mut booking = self
            .bookings
            .find_by_id(req.booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking", req.booking_id))?;
        self.booking_service.settle(std::slice::from_mut(&mut booking)).await?;

        if booking.user_id != actor.user_id {
            return Err(DomainError::Authorization(format!(
                "booking {} does not belong to the caller",
                booking.id
            )));
        }
        if booking.venue_id != req.venue_id {
            return Err(DomainError::Validation(format!(
                "booking {} is not for venue {}",
                booking.id, req.venue_id
            )));
        }
        if booking.status != BookingStatus::Completed {
            return Err(DomainError::Validation(format!(
                "booking {} is {} and cannot be reviewed yet",
                booking.id, booking.status
            )));
        }
        if self.reviews.find_by_booking(booking.id).await?.is_some() {
            return Err(DomainError::Conflict(format!("booking {} has already been reviewed", booking.id)));
        }

        let now = self.clock.now();
        let review = Review {
            id: Uuid::new_v4(),
            user_id: actor.user_id,
            venue_id: req.venue_id,
            booking_id: booking.id,
            rating: req.rating,
            comment,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let review = self.reviews.insert(review).await?;
        tracing::info!(review_id = %review.id, venue_id = %review.venue_id, rating = review.rating, "review posted");
        Ok(review)
    }

    async fn load_active(&self, id: Uuid) -> Result<Review> {
        self.reviews
            .find_by_id(id)
            .await?
            .filter(|r| r.is_active)
            .ok_or_else(|| DomainError::not_found("Review", id))
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, edit: ReviewEdit) -> Result<Review> {
        let comment = edit.comment.trim().to_string();
        Review::validate_content(edit.rating, &comment)?;
        let mut review = self.load_active(id).await?;
        if review.user_id != actor.user_id {
            return Err(DomainError::Authorization("only the author may edit a review".into()));
        }
        review.rating = edit.rating;
        review.comment = comment;
        review.updated_at = self.clock.now();
        self.reviews.update(&review).await?;
        Ok(review)
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<()> {
        let mut review = self.load_active(id).await?;
        if review.user_id != actor.user_id && !actor.is_admin() {
            return Err(DomainError::Authorization("only the author or an admin may delete a review".into()));
        }
        review.is_active = false;
        review.updated_at = self.clock.now();
        self.reviews.update(&review).await?;
        tracing::info!(review_id = %id, by = %actor.user_id, "review removed");
        Ok(())
    }

    pub async fn list_for_venue(&self, venue_id: Uuid, page: Page) -> Result<VenueReviews> {
        if self.venues.find_by_id(venue_id).await?.is_none() {
            return Err(DomainError::not_found("Venue", venue_id));
        }
        let reviews = self.reviews.list_by_venue(venue_id).await?;
        let summary = RatingSummary::from_reviews(&reviews);
        Ok(VenueReviews { summary, reviews: page.apply(reviews) })
    }

    pub async fn list_mine(&self, actor: &Actor, page: Page) -> Result<Paginated<Review>> {
        let mut reviews = self.reviews.list_by_user(actor.user_id).await?;
        reviews.retain(|r| r.is_active);
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.apply(reviews))
    }
}
