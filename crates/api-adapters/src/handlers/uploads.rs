//! Multipart image uploads. Only parts that carry a file name are read.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use domains::{DomainError, StoredImage};
use services::media::{Upload, MAX_IMAGES_PER_REQUEST};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

async fn read_files(mut multipart: Multipart, limit: usize) -> Result<Vec<Upload>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_none() {
            continue;
        }
        if uploads.len() == limit {
            return Err(DomainError::Validation(format!("at most {limit} images per request")).into());
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        uploads.push(Upload { content_type, data });
    }
    Ok(uploads)
}

pub async fn upload_one(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<StoredImage>)> {
    let upload = read_files(multipart, 1)
        .await?
        .pop()
        .ok_or_else(|| DomainError::Validation("no file was uploaded".into()))?;
    let stored = state.services.media.upload(&actor, upload).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn upload_many(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Vec<StoredImage>>)> {
    let uploads = read_files(multipart, MAX_IMAGES_PER_REQUEST).await?;
    let stored = state.services.media.upload_many(&actor, uploads).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn delete(
    CurrentUser { actor, .. }: CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.services.media.delete(&actor, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
