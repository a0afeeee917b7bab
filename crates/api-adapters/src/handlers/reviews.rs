use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{Page, Paginated, Review};
use services::review::{Eligibility, NewReview, ReviewEdit, VenueReviews};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_mine(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Paginated<Review>>> {
    Ok(Json(state.services.reviews.list_mine(&actor, page).await?))
}

pub async fn create(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Json(req): Json<NewReview>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let review = state.services.reviews.create(&actor, req).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn update(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(edit): Json<ReviewEdit>,
) -> ApiResult<Json<Review>> {
    Ok(Json(state.services.reviews.update(&actor, id, edit).await?))
}

pub async fn delete(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.reviews.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Public: active reviews of a venue with the rating summary.
pub async fn list_for_venue(
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
    Query(page): Query<Page>,
) -> ApiResult<Json<VenueReviews>> {
    Ok(Json(state.services.reviews.list_for_venue(venue_id, page).await?))
}

pub async fn can_review(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(venue_id): Path<Uuid>,
) -> ApiResult<Json<Eligibility>> {
    Ok(Json(state.services.reviews.can_review(&actor, venue_id).await?))
}
