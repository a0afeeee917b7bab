//! Booking endpoints.
//!
//! - POST /bookings              - book consecutive slots on a court
//! - GET  /bookings/my           - the caller's bookings
//! - GET  /bookings/{id}         - one booking (booker, venue owner or admin)
//! - POST /bookings/{id}/cancel  - cancel before start
//! - GET  /bookings/owner        - bookings across managed venues
//! - GET  /bookings/owner/stats  - counts and earnings
//! - GET  /bookings/owner/charts - time series, peak hours, sports

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{Booking, BookingStatus, DomainError, Page, Paginated};
use serde::Deserialize;
use services::booking::{NewBooking, OwnerBookingQuery};
use services::dashboard::{BookingStats, ChartQuery, Charts};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::metrics::BookingOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct MyBookingsQuery {
    pub status: Option<BookingStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub venue_id: Option<Uuid>,
}

pub async fn create(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Json(req): Json<NewBooking>,
) -> ApiResult<(StatusCode, Json<Booking>)> {
    match state.services.bookings.create(&actor, req).await {
        Ok(booking) => {
            state.metrics.record_booking(BookingOutcome::Created, 1);
            Ok((StatusCode::CREATED, Json(booking)))
        }
        Err(e) => {
            if matches!(e, DomainError::Conflict(_)) {
                state.metrics.record_booking(BookingOutcome::Conflict, 1);
            }
            Err(e.into())
        }
    }
}

pub async fn list_mine(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<MyBookingsQuery>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Paginated<Booking>>> {
    Ok(Json(state.services.bookings.list_mine(&actor, query.status, page).await?))
}

pub async fn get(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Booking>> {
    Ok(Json(state.services.bookings.get(&actor, id).await?))
}

pub async fn cancel(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> ApiResult<Json<Booking>> {
    let booking = state.services.bookings.cancel(&actor, id, &req.reason).await?;
    state.metrics.record_booking(BookingOutcome::Cancelled, 1);
    Ok(Json(booking))
}

pub async fn list_for_owner(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<OwnerBookingQuery>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Paginated<Booking>>> {
    let venue_ids = state.services.venues.managed_venue_ids(&actor).await?;
    Ok(Json(state.services.bookings.list_for_venues(venue_ids, &query, page).await?))
}

pub async fn owner_stats(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<BookingStats>> {
    Ok(Json(state.services.dashboard.stats(&actor, query.venue_id).await?))
}

pub async fn owner_charts(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<ChartQuery>,
) -> ApiResult<Json<Charts>> {
    Ok(Json(state.services.dashboard.charts(&actor, query).await?))
}
