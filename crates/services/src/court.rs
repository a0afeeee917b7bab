use std::sync::Arc;

use domains::{Actor, Clock, Court, CourtDetails, CourtRepo, DomainError, Result, Venue, VenueRepo};
use uuid::Uuid;

use crate::access::{can_see_hidden, require_owner};
use crate::Ports;

#[derive(Clone)]
pub struct CourtService {
    courts: Arc<dyn CourtRepo>,
    venues: Arc<dyn VenueRepo>,
    clock: Arc<dyn Clock>,
}

impl CourtService {
    pub fn new(ports: &Ports) -> Self {
        Self { courts: ports.courts.clone(), venues: ports.venues.clone(), clock: ports.clock.clone() }
    }

    async fn venue(&self, id: Uuid) -> Result<Venue> {
        self.venues.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("Venue", id))
    }

    pub async fn load(&self, id: Uuid) -> Result<Court> {
        self.courts.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("Court", id))
    }

    pub async fn add(&self, actor: &Actor, venue_id: Uuid, mut details: CourtDetails) -> Result<Court> {
        let venue = self.venue(venue_id).await?;
        require_owner(actor, &venue)?;
        details.validate()?;
        ensure_offered(&venue, &details)?;
        let court = self.courts.insert(Court::new(venue_id, details, self.clock.now())).await?;
        tracing::info!(court_id = %court.id, %venue_id, "court added");
        Ok(court)
    }

    /// Public callers only see active courts of publicly visible venues.
    pub async fn list(&self, actor: Option<&Actor>, venue_id: Uuid) -> Result<Vec<Court>> {
        let venue = self.venue(venue_id).await?;
        let privileged = can_see_hidden(actor, &venue);
        if !venue.is_publicly_visible() && !privileged {
            return Err(DomainError::not_found("Venue", venue_id));
        }
        let mut courts = self.courts.list_by_venue(venue_id).await?;
        if !privileged {
            courts.retain(|c| c.is_active);
        }
        courts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(courts)
    }

    pub async fn update(&self, actor: &Actor, court_id: Uuid, mut details: CourtDetails) -> Result<Court> {
        let mut court = self.load(court_id).await?;
        let venue = self.venue(court.venue_id).await?;
        require_owner(actor, &venue)?;
        details.validate()?;
        ensure_offered(&venue, &details)?;
        court.apply(details, self.clock.now());
        self.courts.update(&court).await?;
        Ok(court)
    }

    pub async fn set_active(&self, actor: &Actor, court_id: Uuid, is_active: bool) -> Result<Court> {
        let mut court = self.load(court_id).await?;
        let venue = self.venue(court.venue_id).await?;
        require_owner(actor, &venue)?;
        if court.is_active != is_active {
            court.is_active = is_active;
            court.updated_at = self.clock.now();
            self.courts.update(&court).await?;
        }
        Ok(court)
    }
}

fn ensure_offered(venue: &Venue, details: &CourtDetails) -> Result<()> {
    if venue.offers(details.sport_type) {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "venue {} does not offer {}",
            venue.id, details.sport_type
        )))
    }
}
