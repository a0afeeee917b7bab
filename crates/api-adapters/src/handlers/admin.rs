//! Admin moderation. Every service call below re-checks the admin role.

use axum::extract::{Path, Query, State};
use axum::Json;
use domains::{Page, Paginated, User, UserFilter, UserRole, Venue};
use serde::Deserialize;
use services::dashboard::PlatformStats;
use uuid::Uuid;

use super::ActiveRequest;
use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: UserRole,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<UserRole>,
    pub active: Option<bool>,
    pub search: Option<String>,
}

pub async fn stats(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
) -> ApiResult<Json<PlatformStats>> {
    Ok(Json(state.services.dashboard.platform(&actor).await?))
}

pub async fn pending_venues(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Paginated<Venue>>> {
    Ok(Json(state.services.venues.list_pending(&actor, page).await?))
}

pub async fn approve_venue(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Venue>> {
    Ok(Json(state.services.venues.approve(&actor, id).await?))
}

pub async fn reject_venue(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> ApiResult<Json<Venue>> {
    Ok(Json(state.services.venues.reject(&actor, id, &req.reason).await?))
}

pub async fn list_users(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
    Query(page): Query<Page>,
) -> ApiResult<Json<Paginated<User>>> {
    let filter = UserFilter { role: query.role, is_active: query.active, search: query.search };
    Ok(Json(state.services.users.list(&actor, &filter, page).await?))
}

pub async fn change_role(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RoleRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.services.users.change_role(&actor, id, req.role).await?))
}

pub async fn set_status(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ActiveRequest>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.services.users.set_active(&actor, id, req.is_active).await?))
}
