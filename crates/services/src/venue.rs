//! Venue registration and the moderation state machine.
//!
//! ```text
//! pending ──approve──▶ approved
//!    └─────reject────▶ rejected   (terminal for moderation)
//! ```
//! The active flag toggles independently; only approved + active venues are
//! listed publicly.

use std::sync::Arc;

use domains::{
    Actor, Clock, DomainError, Page, Paginated, Result, UserRole, Venue, VenueDetails, VenueFilter,
    VenueRepo, VenueStatus,
};
use uuid::Uuid;

use crate::access::{can_see_hidden, require_admin, require_manager, require_owner, require_role};
use crate::Ports;

#[derive(Clone)]
pub struct VenueService {
    venues: Arc<dyn VenueRepo>,
    clock: Arc<dyn Clock>,
}

impl VenueService {
    pub fn new(ports: &Ports) -> Self {
        Self { venues: ports.venues.clone(), clock: ports.clock.clone() }
    }

    pub async fn create(&self, actor: &Actor, mut details: VenueDetails) -> Result<Venue> {
        require_role(actor, &[UserRole::FacilityOwner])?;
        details.validate()?;
        let venue = self.venues.insert(Venue::new(actor.user_id, details, self.clock.now())).await?;
        tracing::info!(venue_id = %venue.id, owner_id = %actor.user_id, "venue submitted for approval");
        Ok(venue)
    }

    /// Loads a venue regardless of visibility. Internal lookups only.
    pub async fn load(&self, id: Uuid) -> Result<Venue> {
        self.venues.find_by_id(id).await?.ok_or_else(|| DomainError::not_found("Venue", id))
    }

    /// Hidden venues are reported as missing to anyone but their owner and admins.
    pub async fn get(&self, actor: Option<&Actor>, id: Uuid) -> Result<Venue> {
        let venue = self.load(id).await?;
        if venue.is_publicly_visible() || can_see_hidden(actor, &venue) {
            Ok(venue)
        } else {
            Err(DomainError::not_found("Venue", id))
        }
    }

    pub async fn list_public(&self, mut filter: VenueFilter, page: Page) -> Result<Paginated<Venue>> {
        filter.public_only = true;
        filter.owner_id = None;
        filter.status = None;
        self.venues.list(&filter, page).await
    }

    pub async fn list_mine(&self, actor: &Actor, status: Option<VenueStatus>, page: Page) -> Result<Paginated<Venue>> {
        require_role(actor, &[UserRole::FacilityOwner])?;
        let filter = VenueFilter { owner_id: Some(actor.user_id), status, ..VenueFilter::default() };
        self.venues.list(&filter, page).await
    }

    pub async fn update(&self, actor: &Actor, id: Uuid, mut details: VenueDetails) -> Result<Venue> {
        let mut venue = self.load(id).await?;
        require_owner(actor, &venue)?;
        details.validate()?;
        venue.ensure_editable()?;
        venue.details = details;
        venue.updated_at = self.clock.now();
        self.venues.update(&venue).await?;
        Ok(venue)
    }

    pub async fn set_active(&self, actor: &Actor, id: Uuid, is_active: bool) -> Result<Venue> {
        let mut venue = self.load(id).await?;
        require_manager(actor, &venue)?;
        if venue.is_active != is_active {
            venue.is_active = is_active;
            venue.updated_at = self.clock.now();
            self.venues.update(&venue).await?;
            tracing::info!(venue_id = %id, is_active, by = %actor.user_id, "venue active flag changed");
        }
        Ok(venue)
    }

    pub async fn list_pending(&self, actor: &Actor, page: Page) -> Result<Paginated<Venue>> {
        require_admin(actor)?;
        let filter = VenueFilter { status: Some(VenueStatus::Pending), ..VenueFilter::default() };
        self.venues.list(&filter, page).await
    }

    pub async fn approve(&self, actor: &Actor, id: Uuid) -> Result<Venue> {
        require_admin(actor)?;
        let mut venue = self.load(id).await?;
        venue.approve(self.clock.now())?;
        self.venues.update(&venue).await?;
        tracing::info!(venue_id = %id, admin = %actor.user_id, "venue approved");
        Ok(venue)
    }

    pub async fn reject(&self, actor: &Actor, id: Uuid, reason: &str) -> Result<Venue> {
        require_admin(actor)?;
        let mut venue = self.load(id).await?;
        venue.reject(reason, self.clock.now())?;
        self.venues.update(&venue).await?;
        tracing::info!(venue_id = %id, admin = %actor.user_id, "venue rejected");
        Ok(venue)
    }

    /// Venue ids whose bookings the caller may aggregate. `None` means all (admins).
    pub async fn managed_venue_ids(&self, actor: &Actor) -> Result<Option<Vec<Uuid>>> {
        match actor.role {
            UserRole::Admin => Ok(None),
            UserRole::FacilityOwner => Ok(Some(self.venues.list_ids_by_owner(actor.user_id).await?)),
            UserRole::User => Err(DomainError::Authorization("only facility owners and admins manage venues".into())),
        }
    }

    pub async fn count_by_status(&self) -> Result<Vec<(VenueStatus, u64)>> {
        self.venues.count_by_status().await
    }
}
