//! Shared fixtures for the integration suites: a controllable clock and a
//! fully wired service set over the in-memory store.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use domains::{
    Actor, Clock, CourtDetails, DayOfWeek, IdentityClaims, OperatingHours, SlotDuration, SportType, User,
    UserRepo, UserRole, Venue, VenueDetails, VenueType,
};
use services::booking::NewBooking;
use services::user::SignUp;
use services::{Ports, ServiceSettings, Services};
use storage_adapters::{MemoryMediaStorage, MemoryStore};
use uuid::Uuid;

/// A clock the test moves by hand.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Monday 2024-01-01, 08:00 UTC.
pub fn monday_morning() -> DateTime<Utc> {
    at(2024, 1, 1, 8, 0)
}

/// Every weekday open 06:00-22:00.
pub fn venue_details(name: &str, sports: Vec<SportType>) -> VenueDetails {
    let days = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];
    VenueDetails {
        name: name.to_string(),
        description: "Indoor courts with sprung floors".to_string(),
        address: "12 Baseline Road".to_string(),
        location: None,
        venue_type: VenueType::Indoor,
        sports,
        amenities: vec!["parking".to_string(), "showers".to_string()],
        images: Vec::new(),
        operating_hours: days.into_iter().map(|day| OperatingHours { day, open: time(6, 0), close: time(22, 0) }).collect(),
    }
}

pub fn court_details(name: &str, sport: SportType, price: i64) -> CourtDetails {
    CourtDetails { name: name.to_string(), sport_type: sport, slot_duration: SlotDuration::OneHour, price_per_slot: price }
}

pub fn hour_booking(court_id: Uuid, day: NaiveDate, start: NaiveTime, slots: u32) -> NewBooking {
    NewBooking { court_id, date: day, start_time: start, slot_count: slots, slot_duration: None }
}

pub fn claims(external_id: &str) -> IdentityClaims {
    IdentityClaims { external_id: external_id.to_string(), email: format!("{external_id}@courtside.test"), name: None }
}

/// The in-memory application: store, clock and services wired together.
pub struct Harness {
    pub store: MemoryStore,
    pub media: Arc<MemoryMediaStorage>,
    pub clock: Arc<ManualClock>,
    pub services: Services,
}

impl Harness {
    pub fn new(now: DateTime<Utc>) -> Self {
        let store = MemoryStore::new();
        let media = Arc::new(MemoryMediaStorage::default());
        let clock = Arc::new(ManualClock::new(now));
        let ports = Ports {
            users: store.users.clone(),
            venues: store.venues.clone(),
            courts: store.courts.clone(),
            bookings: store.bookings.clone(),
            reviews: store.reviews.clone(),
            unavailability: store.unavailability.clone(),
            media: media.clone(),
            images: store.images.clone(),
            clock: clock.clone(),
        };
        let services = Services::new(ports, ServiceSettings::default());
        Self { store, media, clock, services }
    }

    /// Registers a self-service account (player or facility owner).
    pub async fn sign_up(&self, external_id: &str, role: UserRole) -> Actor {
        let sign_up = SignUp { role: Some(role), display_name: None };
        let (user, _) = self.services.users.sync(&claims(external_id), sign_up).await.unwrap();
        Actor::from(&user)
    }

    /// Admins cannot self-register; they are seeded straight into the store.
    pub async fn seed_admin(&self, external_id: &str) -> Actor {
        let c = claims(external_id);
        let user = User::new(c.external_id, c.email, "Admin", UserRole::Admin, self.clock.now());
        let user = self.store.users.insert(user).await.unwrap();
        Actor::from(&user)
    }

    /// A venue offering badminton and tennis, approved by `admin`.
    pub async fn approved_venue(&self, owner: &Actor, admin: &Actor, name: &str) -> Venue {
        let venue = self
            .services
            .venues
            .create(owner, venue_details(name, vec![SportType::Badminton, SportType::Tennis]))
            .await
            .unwrap();
        self.services.venues.approve(admin, venue.id).await.unwrap()
    }

    /// An owner, an admin, an approved venue and one 60-minute badminton court at 500 cents.
    pub async fn bookable_court(&self) -> Fixture {
        let owner = self.sign_up("owner-1", UserRole::FacilityOwner).await;
        let admin = self.seed_admin("admin-1").await;
        let venue = self.approved_venue(&owner, &admin, "Smash Arena").await;
        let court = self
            .services
            .courts
            .add(&owner, venue.id, court_details("Court A", SportType::Badminton, 500))
            .await
            .unwrap();
        Fixture { owner, admin, venue_id: venue.id, court_id: court.id }
    }
}

pub struct Fixture {
    pub owner: Actor,
    pub admin: Actor,
    pub venue_id: Uuid,
    pub court_id: Uuid,
}
