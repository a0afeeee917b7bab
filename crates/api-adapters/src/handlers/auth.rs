//! Account endpoints.
//!
//! - POST /auth/users - register the token's subject on first sign-in (idempotent)
//! - GET  /auth/me    - the caller's profile and landing path
//! - PUT  /auth/me    - change the caller's display name

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use domains::{User, UserRole};
use serde::{Deserialize, Serialize};
use services::user::SignUp;

use crate::auth::{CurrentUser, Verified};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SyncRequest {
    /// Only honoured when the account is created
    #[serde(default)]
    pub role: Option<UserRole>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMe {
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    /// Where the client should land this user
    pub home_path: &'static str,
    pub created: bool,
}

impl SessionResponse {
    fn new(user: User, created: bool) -> Self {
        Self { home_path: user.role.home_path(), user, created }
    }
}

pub async fn sync_user(
    Verified(claims): Verified,
    State(state): State<AppState>,
    Json(req): Json<SyncRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let sign_up = SignUp { role: req.role, display_name: req.display_name };
    let (user, created) = state.services.users.sync(&claims, sign_up).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(SessionResponse::new(user, created))))
}

pub async fn me(CurrentUser { user, .. }: CurrentUser) -> Json<SessionResponse> {
    Json(SessionResponse::new(user, false))
}

pub async fn update_me(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateMe>,
) -> ApiResult<Json<SessionResponse>> {
    let user = state.services.users.update_display_name(&actor, &req.display_name).await?;
    Ok(Json(SessionResponse::new(user, false)))
}
