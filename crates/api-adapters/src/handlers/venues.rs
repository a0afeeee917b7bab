use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{Page, Paginated, SportType, Venue, VenueDetails, VenueFilter, VenueStatus, VenueType};
use serde::Deserialize;
use uuid::Uuid;

use super::ActiveRequest;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PublicVenueQuery {
    pub sport: Option<SportType>,
    pub venue_type: Option<VenueType>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MyVenuesQuery {
    pub status: Option<VenueStatus>,
}

pub async fn list_approved(
    State(state): State<AppState>,
    Query(query): Query<PublicVenueQuery>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Paginated<Venue>>> {
    let filter = VenueFilter {
        sport: query.sport,
        venue_type: query.venue_type,
        search: query.search,
        ..VenueFilter::default()
    };
    Ok(Json(state.services.venues.list_public(filter, page).await?))
}

pub async fn list_mine(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<MyVenuesQuery>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Paginated<Venue>>> {
    Ok(Json(state.services.venues.list_mine(&actor, query.status, page).await?))
}

pub async fn create(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Json(details): Json<VenueDetails>,
) -> ApiResult<(StatusCode, Json<Venue>)> {
    let venue = state.services.venues.create(&actor, details).await?;
    Ok((StatusCode::CREATED, Json(venue)))
}

pub async fn get(
    caller: MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Venue>> {
    Ok(Json(state.services.venues.get(caller.as_ref(), id).await?))
}

pub async fn update(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(details): Json<VenueDetails>,
) -> ApiResult<Json<Venue>> {
    Ok(Json(state.services.venues.update(&actor, id, details).await?))
}

/// Venues are never hard-deleted; DELETE deactivates.
pub async fn deactivate(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.venues.set_active(&actor, id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_active(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ActiveRequest>,
) -> ApiResult<Json<Venue>> {
    Ok(Json(state.services.venues.set_active(&actor, id, req.is_active).await?))
}
