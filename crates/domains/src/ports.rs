//! # Core Traits (Ports)
//!
//! Any storage, media or identity adapter must implement these traits to be
//! wired into the binary. With the `testing` feature each trait also gets a
//! mockall-generated `MockXxx`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Booking, BookingFilter, BookingStatus, Court, IdentityClaims, Page, Paginated, Review,
    Unavailability, User, UserFilter, UserRole, Venue, VenueFilter, VenueStatus,
};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>>;
    /// Fails with `Conflict` when the external id is already registered.
    async fn insert(&self, user: User) -> Result<User>;
    async fn update(&self, user: &User) -> Result<()>;
    async fn list(&self, filter: &UserFilter, page: Page) -> Result<Paginated<User>>;
    async fn count_by_role(&self) -> Result<Vec<(UserRole, u64)>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait VenueRepo: Send + Sync {
    async fn insert(&self, venue: Venue) -> Result<Venue>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Venue>>;
    async fn update(&self, venue: &Venue) -> Result<()>;
    /// Newest first.
    async fn list(&self, filter: &VenueFilter, page: Page) -> Result<Paginated<Venue>>;
    async fn list_ids_by_owner(&self, owner_id: Uuid) -> Result<Vec<Uuid>>;
    async fn count_by_status(&self) -> Result<Vec<(VenueStatus, u64)>>;
    /// Whether any venue, active or not, lists the stored image.
    async fn image_in_use(&self, image_id: &str) -> Result<bool>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CourtRepo: Send + Sync {
    async fn insert(&self, court: Court) -> Result<Court>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Court>>;
    async fn update(&self, court: &Court) -> Result<()>;
    async fn list_by_venue(&self, venue_id: Uuid) -> Result<Vec<Court>>;
}

/// Booking persistence. `insert_if_free` is the only operation in the system
/// that needs cross-request coordination.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BookingRepo: Send + Sync {
    /// Atomically checks that no confirmed booking on the same court and date
    /// overlaps `[start_time, end_time)` and inserts. Fails with `Conflict`
    /// otherwise; a failed call leaves nothing behind.
    async fn insert_if_free(&self, booking: Booking) -> Result<Booking>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>>;
    /// Compare-and-set: persists `booking` only if the stored status is still
    /// `expected`, otherwise `Conflict`.
    async fn update_status(&self, booking: &Booking, expected: BookingStatus) -> Result<()>;
    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>>;
    /// Marks every confirmed booking that ended at or before `now` completed.
    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReviewRepo: Send + Sync {
    /// Fails with `Conflict` when a review for the same booking exists,
    /// including soft-deleted ones.
    async fn insert(&self, review: Review) -> Result<Review>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>>;
    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<Review>>;
    async fn update(&self, review: &Review) -> Result<()>;
    /// Active reviews only, newest first.
    async fn list_by_venue(&self, venue_id: Uuid) -> Result<Vec<Review>>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Review>>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UnavailabilityRepo: Send + Sync {
    async fn insert(&self, block: Unavailability) -> Result<Unavailability>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Unavailability>>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn list_by_venue(&self, venue_id: Uuid, date: Option<NaiveDate>) -> Result<Vec<Unavailability>>;
}

/// An object accepted by the media store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredImage {
    pub id: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
}

/// Media storage contract for venue images.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Persists raw bytes and returns the public URL and an opaque id.
    async fn put(&self, data: Bytes, content_type: &str) -> Result<StoredImage>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// Who uploaded which stored image. Identical files share one id, so an id
/// can have several uploaders.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ImageRepo: Send + Sync {
    /// Idempotent per image and user.
    async fn record(&self, image_id: &str, user_id: Uuid, at: DateTime<Utc>) -> Result<()>;
    async fn uploaders(&self, image_id: &str) -> Result<Vec<Uuid>>;
    /// Drops one uploader, or all of them when `user_id` is `None`.
    async fn forget(&self, image_id: &str, user_id: Option<Uuid>) -> Result<()>;
}

/// Verifies access tokens issued by the external identity provider.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<IdentityClaims>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
