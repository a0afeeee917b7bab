//! # services
//!
//! Use-case orchestration for Courtside. Every service receives its ports as
//! `Arc<dyn Trait>` and is cheap to clone into request handlers.

pub mod access;
pub mod availability;
pub mod booking;
pub mod court;
pub mod dashboard;
pub mod media;
pub mod retry;
pub mod review;
pub mod user;
pub mod venue;

use std::sync::Arc;

use domains::{
    BookingRepo, Clock, CourtRepo, ImageRepo, MediaStorage, ReviewRepo, UnavailabilityRepo, UserRepo, VenueRepo,
};

pub use availability::AvailabilityService;
pub use booking::BookingService;
pub use court::CourtService;
pub use dashboard::DashboardService;
pub use media::{MediaService, MediaSettings};
pub use review::ReviewService;
pub use user::UserService;
pub use venue::VenueService;

/// Every adapter the services depend on.
#[derive(Clone)]
pub struct Ports {
    pub users: Arc<dyn UserRepo>,
    pub venues: Arc<dyn VenueRepo>,
    pub courts: Arc<dyn CourtRepo>,
    pub bookings: Arc<dyn BookingRepo>,
    pub reviews: Arc<dyn ReviewRepo>,
    pub unavailability: Arc<dyn UnavailabilityRepo>,
    pub media: Arc<dyn MediaStorage>,
    pub images: Arc<dyn ImageRepo>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Platform cut of gross booking revenue, in percent
    pub commission_percent: u32,
    pub media: MediaSettings,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { commission_percent: dashboard::DEFAULT_COMMISSION_PERCENT, media: MediaSettings::default() }
    }
}

/// The full service set, assembled once at startup.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub venues: VenueService,
    pub courts: CourtService,
    pub availability: AvailabilityService,
    pub bookings: BookingService,
    pub reviews: ReviewService,
    pub dashboard: DashboardService,
    pub media: MediaService,
}

impl Services {
    pub fn new(ports: Ports, settings: ServiceSettings) -> Self {
        let bookings = BookingService::new(&ports);
        Self {
            users: UserService::new(&ports),
            venues: VenueService::new(&ports),
            courts: CourtService::new(&ports),
            availability: AvailabilityService::new(&ports),
            reviews: ReviewService::new(&ports, bookings.clone()),
            dashboard: DashboardService::new(&ports, bookings.clone(), settings.commission_percent),
            media: MediaService::new(&ports, settings.media),
            bookings,
        }
    }
}
