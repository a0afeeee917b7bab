use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use domains::{Court, CourtDetails};
use serde::Deserialize;
use services::availability::CourtAvailability;
use uuid::Uuid;

use super::ActiveRequest;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

pub async fn list(
    caller: MaybeUser,
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Court>>> {
    Ok(Json(state.services.courts.list(caller.as_ref(), venue_id).await?))
}

pub async fn create(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
    Json(details): Json<CourtDetails>,
) -> ApiResult<(StatusCode, Json<Court>)> {
    let court = state.services.courts.add(&actor, venue_id, details).await?;
    Ok((StatusCode::CREATED, Json(court)))
}

pub async fn update(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(details): Json<CourtDetails>,
) -> ApiResult<Json<Court>> {
    Ok(Json(state.services.courts.update(&actor, id, details).await?))
}

pub async fn deactivate(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.courts.set_active(&actor, id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_active(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ActiveRequest>,
) -> ApiResult<Json<Court>> {
    Ok(Json(state.services.courts.set_active(&actor, id, req.is_active).await?))
}

/// Slot grid for one court and day, with each slot marked free, booked,
/// blocked or past.
pub async fn availability(
    caller: MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<Json<CourtAvailability>> {
    Ok(Json(state.services.availability.court_availability(caller.as_ref(), id, query.date).await?))
}
