//! # In-memory store
//!
//! DashMap-backed implementations of every repository port. Used by the test
//! suites and by `store = "memory"` deployments; nothing survives a restart.
//!
//! Uniqueness and the booking overlap check rely on DashMap's entry API: the
//! shard lock taken by `entry()` serializes every writer for the same key.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    intervals_overlap, Booking, BookingFilter, BookingRepo, BookingStatus, Court, CourtRepo, DomainError,
    ImageRepo, MediaStorage, Page, Paginated, Result, Review, ReviewRepo, StoredImage, Unavailability,
    UnavailabilityRepo, User, UserFilter, UserRepo, UserRole, Venue, VenueFilter, VenueRepo, VenueStatus,
};
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryUserRepo {
    users: DashMap<Uuid, User>,
    by_external_id: DashMap<String, Uuid>,
}

#[async_trait]
impl UserRepo for MemoryUserRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<User>> {
        let Some(id) = self.by_external_id.get(external_id).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn insert(&self, user: User) -> Result<User> {
        match self.by_external_id.entry(user.external_id.clone()) {
            Entry::Occupied(_) => Err(DomainError::Conflict(format!(
                "external id {} is already registered",
                user.external_id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user.clone());
                Ok(user)
            }
        }
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut stored = self.users.get_mut(&user.id).ok_or_else(|| DomainError::not_found("User", user.id))?;
        *stored = user.clone();
        Ok(())
    }

    async fn list(&self, filter: &UserFilter, page: Page) -> Result<Paginated<User>> {
        let mut users: Vec<User> =
            self.users.iter().filter(|u| filter.matches(u.value())).map(|u| u.value().clone()).collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.email.cmp(&b.email)));
        Ok(page.apply(users))
    }

    async fn count_by_role(&self) -> Result<Vec<(UserRole, u64)>> {
        let mut counts: HashMap<UserRole, u64> = HashMap::new();
        for user in self.users.iter() {
            *counts.entry(user.role).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }
}

#[derive(Default)]
pub struct MemoryVenueRepo {
    venues: DashMap<Uuid, Venue>,
}

#[async_trait]
impl VenueRepo for MemoryVenueRepo {
    async fn insert(&self, venue: Venue) -> Result<Venue> {
        self.venues.insert(venue.id, venue.clone());
        Ok(venue)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Venue>> {
        Ok(self.venues.get(&id).map(|v| v.clone()))
    }

    async fn update(&self, venue: &Venue) -> Result<()> {
        let mut stored = self.venues.get_mut(&venue.id).ok_or_else(|| DomainError::not_found("Venue", venue.id))?;
        *stored = venue.clone();
        Ok(())
    }

    async fn list(&self, filter: &VenueFilter, page: Page) -> Result<Paginated<Venue>> {
        let mut venues: Vec<Venue> =
            self.venues.iter().filter(|v| filter.matches(v.value())).map(|v| v.value().clone()).collect();
        venues.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(page.apply(venues))
    }

    async fn list_ids_by_owner(&self, owner_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self.venues.iter().filter(|v| v.owner_id == owner_id).map(|v| v.id).collect())
    }

    async fn count_by_status(&self) -> Result<Vec<(VenueStatus, u64)>> {
        let mut counts: HashMap<VenueStatus, u64> = HashMap::new();
        for venue in self.venues.iter() {
            *counts.entry(venue.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn image_in_use(&self, image_id: &str) -> Result<bool> {
        Ok(self.venues.iter().any(|v| v.details.images.iter().any(|img| img.id == image_id)))
    }
}

#[derive(Default)]
pub struct MemoryCourtRepo {
    courts: DashMap<Uuid, Court>,
}

#[async_trait]
impl CourtRepo for MemoryCourtRepo {
    async fn insert(&self, court: Court) -> Result<Court> {
        self.courts.insert(court.id, court.clone());
        Ok(court)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Court>> {
        Ok(self.courts.get(&id).map(|c| c.clone()))
    }

    async fn update(&self, court: &Court) -> Result<()> {
        let mut stored = self.courts.get_mut(&court.id).ok_or_else(|| DomainError::not_found("Court", court.id))?;
        *stored = court.clone();
        Ok(())
    }

    async fn list_by_venue(&self, venue_id: Uuid) -> Result<Vec<Court>> {
        Ok(self.courts.iter().filter(|c| c.venue_id == venue_id).map(|c| c.clone()).collect())
    }
}

/// Bookings plus a per-(court, date) index. Holding the index entry is what
/// makes check-then-insert atomic for one court and day.
#[derive(Default)]
pub struct MemoryBookingRepo {
    bookings: DashMap<Uuid, Booking>,
    by_court_day: DashMap<(Uuid, NaiveDate), Vec<Uuid>>,
}

#[async_trait]
impl BookingRepo for MemoryBookingRepo {
    async fn insert_if_free(&self, booking: Booking) -> Result<Booking> {
        let mut day = self.by_court_day.entry((booking.court_id, booking.date)).or_default();
        let taken = day.iter().filter_map(|id| self.bookings.get(id)).any(|existing| {
            existing.status == BookingStatus::Confirmed
                && intervals_overlap(existing.start_time, existing.end_time, booking.start_time, booking.end_time)
        });
        if taken {
            return Err(DomainError::Conflict(format!(
                "court {} is already booked on {} between {} and {}",
                booking.court_id, booking.date, booking.start_time, booking.end_time
            )));
        }
        self.bookings.insert(booking.id, booking.clone());
        day.push(booking.id);
        Ok(booking)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|b| b.clone()))
    }

    async fn update_status(&self, booking: &Booking, expected: BookingStatus) -> Result<()> {
        let mut stored =
            self.bookings.get_mut(&booking.id).ok_or_else(|| DomainError::not_found("Booking", booking.id))?;
        if stored.status != expected {
            return Err(DomainError::Conflict(format!(
                "booking {} is {}, expected {}",
                booking.id, stored.status, expected
            )));
        }
        *stored = booking.clone();
        Ok(())
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        Ok(self.bookings.iter().filter(|b| filter.matches(b.value())).map(|b| b.value().clone()).collect())
    }

    async fn complete_elapsed(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut completed = 0;
        for mut booking in self.bookings.iter_mut() {
            if booking.settle(now) {
                completed += 1;
            }
        }
        Ok(completed)
    }
}

#[derive(Default)]
pub struct MemoryReviewRepo {
    reviews: DashMap<Uuid, Review>,
    by_booking: DashMap<Uuid, Uuid>,
}

#[async_trait]
impl ReviewRepo for MemoryReviewRepo {
    async fn insert(&self, review: Review) -> Result<Review> {
        match self.by_booking.entry(review.booking_id) {
            Entry::Occupied(_) => {
                Err(DomainError::Conflict(format!("booking {} has already been reviewed", review.booking_id)))
            }
            Entry::Vacant(slot) => {
                slot.insert(review.id);
                self.reviews.insert(review.id, review.clone());
                Ok(review)
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Review>> {
        Ok(self.reviews.get(&id).map(|r| r.clone()))
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> Result<Option<Review>> {
        let Some(id) = self.by_booking.get(&booking_id).map(|id| *id) else {
            return Ok(None);
        };
        self.find_by_id(id).await
    }

    async fn update(&self, review: &Review) -> Result<()> {
        let mut stored =
            self.reviews.get_mut(&review.id).ok_or_else(|| DomainError::not_found("Review", review.id))?;
        *stored = review.clone();
        Ok(())
    }

    async fn list_by_venue(&self, venue_id: Uuid) -> Result<Vec<Review>> {
        let mut reviews: Vec<Review> = self
            .reviews
            .iter()
            .filter(|r| r.venue_id == venue_id && r.is_active)
            .map(|r| r.clone())
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Review>> {
        Ok(self.reviews.iter().filter(|r| r.user_id == user_id).map(|r| r.clone()).collect())
    }
}

#[derive(Default)]
pub struct MemoryUnavailabilityRepo {
    blocks: DashMap<Uuid, Unavailability>,
}

#[async_trait]
impl UnavailabilityRepo for MemoryUnavailabilityRepo {
    async fn insert(&self, block: Unavailability) -> Result<Unavailability> {
        self.blocks.insert(block.id, block.clone());
        Ok(block)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Unavailability>> {
        Ok(self.blocks.get(&id).map(|b| b.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.blocks.remove(&id).map(|_| ()).ok_or_else(|| DomainError::not_found("Unavailability", id))
    }

    async fn list_by_venue(&self, venue_id: Uuid, date: Option<NaiveDate>) -> Result<Vec<Unavailability>> {
        let mut blocks: Vec<Unavailability> = self
            .blocks
            .iter()
            .filter(|b| b.venue_id == venue_id && date.map_or(true, |d| b.date == d))
            .map(|b| b.clone())
            .collect();
        blocks.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
        Ok(blocks)
    }
}

/// Keeps uploads in memory under their content hash. No thumbnails.
pub struct MemoryMediaStorage {
    objects: DashMap<String, (String, Bytes)>,
    url_prefix: String,
}

impl MemoryMediaStorage {
    pub fn new(url_prefix: impl Into<String>) -> Self {
        Self { objects: DashMap::new(), url_prefix: url_prefix.into().trim_end_matches('/').to_string() }
    }

    pub fn get(&self, id: &str) -> Option<(String, Bytes)> {
        self.objects.get(id).map(|o| o.value().clone())
    }
}

impl Default for MemoryMediaStorage {
    fn default() -> Self {
        Self::new("/media")
    }
}

#[async_trait]
impl MediaStorage for MemoryMediaStorage {
    async fn put(&self, data: Bytes, content_type: &str) -> Result<StoredImage> {
        let id = format!("{}.{}", hex::encode(Sha256::digest(&data)), crate::extension_for(content_type));
        self.objects.insert(id.clone(), (content_type.to_string(), data));
        Ok(StoredImage { url: format!("{}/{id}", self.url_prefix), id, thumbnail_url: None })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.objects.remove(id).map(|_| ()).ok_or_else(|| DomainError::not_found("Image", id))
    }
}

/// Upload ledger keyed by image id.
#[derive(Default)]
pub struct MemoryImageRepo {
    uploads: DashMap<String, HashMap<Uuid, DateTime<Utc>>>,
}

#[async_trait]
impl ImageRepo for MemoryImageRepo {
    async fn record(&self, image_id: &str, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        self.uploads.entry(image_id.to_string()).or_default().entry(user_id).or_insert(at);
        Ok(())
    }

    async fn uploaders(&self, image_id: &str) -> Result<Vec<Uuid>> {
        Ok(self.uploads.get(image_id).map(|u| u.keys().copied().collect()).unwrap_or_default())
    }

    async fn forget(&self, image_id: &str, user_id: Option<Uuid>) -> Result<()> {
        match user_id {
            None => {
                self.uploads.remove(image_id);
            }
            Some(user_id) => {
                if let Entry::Occupied(mut held) = self.uploads.entry(image_id.to_string()) {
                    held.get_mut().remove(&user_id);
                    if held.get().is_empty() {
                        held.remove();
                    }
                }
            }
        }
        Ok(())
    }
}

/// Every in-memory repository, shareable as `Arc<dyn Port>`.
#[derive(Clone, Default)]
pub struct MemoryStore {
    pub users: Arc<MemoryUserRepo>,
    pub venues: Arc<MemoryVenueRepo>,
    pub courts: Arc<MemoryCourtRepo>,
    pub bookings: Arc<MemoryBookingRepo>,
    pub reviews: Arc<MemoryReviewRepo>,
    pub unavailability: Arc<MemoryUnavailabilityRepo>,
    pub images: Arc<MemoryImageRepo>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};
    use domains::{SlotDuration, SportType};

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn booking(court_id: Uuid, start: u32, end: u32) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            venue_id: Uuid::new_v4(),
            court_id,
            sport_type: SportType::Badminton,
            date: NaiveDate::from_ymd_opt(2030, 5, 1).unwrap(),
            start_time: t(start),
            end_time: t(end),
            slot_count: end - start,
            slot_duration: SlotDuration::OneHour,
            total_amount: 500 * i64::from(end - start),
            status: BookingStatus::Confirmed,
            cancellation_reason: None,
            cancelled_at: None,
            completed_at: None,
            payment_simulated: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn overlapping_booking_is_rejected() {
        let repo = MemoryBookingRepo::default();
        let court = Uuid::new_v4();
        repo.insert_if_free(booking(court, 10, 12)).await.unwrap();

        let clash = repo.insert_if_free(booking(court, 11, 13)).await;
        assert!(matches!(clash, Err(DomainError::Conflict(_))));
        // Back-to-back and other courts are fine.
        repo.insert_if_free(booking(court, 12, 13)).await.unwrap();
        repo.insert_if_free(booking(Uuid::new_v4(), 10, 12)).await.unwrap();
        assert_eq!(repo.list(&BookingFilter::default()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn cancelled_booking_frees_the_slot() {
        let repo = MemoryBookingRepo::default();
        let court = Uuid::new_v4();
        let mut first = repo.insert_if_free(booking(court, 10, 11)).await.unwrap();
        first.status = BookingStatus::Cancelled;
        repo.update_status(&first, BookingStatus::Confirmed).await.unwrap();

        repo.insert_if_free(booking(court, 10, 11)).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_inserts_for_one_slot_admit_exactly_one() {
        let repo = Arc::new(MemoryBookingRepo::default());
        let court = Uuid::new_v4();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move { repo.insert_if_free(booking(court, 18, 19)).await })
            })
            .collect();
        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
    }

    #[tokio::test]
    async fn status_update_is_compare_and_set() {
        let repo = MemoryBookingRepo::default();
        let mut b = repo.insert_if_free(booking(Uuid::new_v4(), 9, 10)).await.unwrap();
        b.status = BookingStatus::Completed;
        repo.update_status(&b, BookingStatus::Confirmed).await.unwrap();
        b.status = BookingStatus::Cancelled;
        let stale = repo.update_status(&b, BookingStatus::Confirmed).await;
        assert!(matches!(stale, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn complete_elapsed_only_touches_finished_confirmed_bookings() {
        let repo = MemoryBookingRepo::default();
        let court = Uuid::new_v4();
        repo.insert_if_free(booking(court, 8, 9)).await.unwrap();
        repo.insert_if_free(booking(court, 20, 21)).await.unwrap();
        let now = Utc.with_ymd_and_hms(2030, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(repo.complete_elapsed(now).await.unwrap(), 1);
        assert_eq!(repo.complete_elapsed(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn a_booking_can_only_be_reviewed_once() {
        let repo = MemoryReviewRepo::default();
        let booking_id = Uuid::new_v4();
        let review = |id| Review {
            id,
            user_id: Uuid::nil(),
            venue_id: Uuid::nil(),
            booking_id,
            rating: 4,
            comment: String::new(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut first = repo.insert(review(Uuid::new_v4())).await.unwrap();
        first.is_active = false;
        repo.update(&first).await.unwrap();

        let again = repo.insert(review(Uuid::new_v4())).await;
        assert!(matches!(again, Err(DomainError::Conflict(_))));
        assert!(repo.list_by_venue(Uuid::nil()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_external_id_conflicts() {
        let repo = MemoryUserRepo::default();
        let now = Utc::now();
        repo.insert(User::new("sub-1", "a@example.com", "A", UserRole::User, now)).await.unwrap();
        let dup = repo.insert(User::new("sub-1", "b@example.com", "B", UserRole::User, now)).await;
        assert!(matches!(dup, Err(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn memory_media_is_content_addressed() {
        let media = MemoryMediaStorage::default();
        let a = media.put(Bytes::from_static(b"png-bytes"), "image/png").await.unwrap();
        let b = media.put(Bytes::from_static(b"png-bytes"), "image/png").await.unwrap();
        assert_eq!(a.id, b.id);
        assert!(a.url.starts_with("/media/"));
        media.delete(&a.id).await.unwrap();
        assert!(media.get(&a.id).is_none());
    }

    #[tokio::test]
    async fn image_ledger_tracks_every_uploader() {
        let repo = MemoryImageRepo::default();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        repo.record("abc.png", a, Utc::now()).await.unwrap();
        repo.record("abc.png", a, Utc::now()).await.unwrap();
        repo.record("abc.png", b, Utc::now()).await.unwrap();
        assert_eq!(repo.uploaders("abc.png").await.unwrap().len(), 2);

        repo.forget("abc.png", Some(a)).await.unwrap();
        assert_eq!(repo.uploaders("abc.png").await.unwrap(), vec![b]);
        repo.forget("abc.png", None).await.unwrap();
        assert!(repo.uploaders("abc.png").await.unwrap().is_empty());
    }
}
