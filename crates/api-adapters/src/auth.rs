//! Request authentication extractors.
//!
//! - [`Verified`] checks the bearer token only. Used by the sign-up call,
//!   before a user record exists.
//! - [`CurrentUser`] additionally resolves the stored user into an `Actor`.
//! - [`MaybeUser`] is for public routes that reveal more to the owner. No
//!   header means anonymous, a bad token is still a 401.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domains::{Actor, DomainError, IdentityClaims, User};

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_token(parts: &Parts) -> Result<Option<&str>, ApiError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| DomainError::Authentication("authorization header is not valid ASCII".into()))?;
    let token = value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DomainError::Authentication("expected 'Authorization: Bearer <token>'".into()))?;
    Ok(Some(token))
}

async fn verify(state: &AppState, token: &str) -> Result<IdentityClaims, ApiError> {
    match tokio::time::timeout(state.verify_timeout, state.identity.verify(token)).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(DomainError::Upstream("identity verification timed out".into()).into()),
    }
}

/// Verified identity claims, no user lookup.
#[derive(Debug, Clone)]
pub struct Verified(pub IdentityClaims);

impl FromRequestParts<AppState> for Verified {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| DomainError::Authentication("missing bearer token".into()))?;
        Ok(Self(verify(state, token).await?))
    }
}

/// The authenticated, registered and active caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub actor: Actor,
    pub user: User,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Verified(claims) = Verified::from_request_parts(parts, state).await?;
        let (actor, user) = state.services.users.resolve(&claims).await?;
        Ok(Self { actor, user })
    }
}

#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Actor>);

impl MaybeUser {
    pub fn as_ref(&self) -> Option<&Actor> {
        self.0.as_ref()
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if bearer_token(parts)?.is_none() {
            return Ok(Self(None));
        }
        let CurrentUser { actor, .. } = CurrentUser::from_request_parts(parts, state).await?;
        Ok(Self(Some(actor)))
    }
}
