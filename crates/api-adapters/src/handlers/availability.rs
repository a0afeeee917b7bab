//! Owner-managed unavailability blocks.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use domains::Unavailability;
use serde::Deserialize;
use services::availability::NewUnavailability;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BlockQuery {
    pub date: Option<NaiveDate>,
}

pub async fn list(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
    Query(query): Query<BlockQuery>,
) -> ApiResult<Json<Vec<Unavailability>>> {
    Ok(Json(state.services.availability.list_blocks(&actor, venue_id, query.date).await?))
}

pub async fn create(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
    Json(req): Json<NewUnavailability>,
) -> ApiResult<(StatusCode, Json<Unavailability>)> {
    let block = state.services.availability.add_block(&actor, venue_id, req).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

pub async fn remove(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.availability.remove_block(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
