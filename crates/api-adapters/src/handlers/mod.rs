//! HTTP handlers, one module per resource.

pub mod admin;
pub mod auth;
pub mod availability;
pub mod bookings;
pub mod courts;
pub mod health;
pub mod reviews;
pub mod uploads;
pub mod venues;

use serde::Deserialize;

/// Body of every `.../active` and `.../status` toggle.
#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub is_active: bool,
}
