use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use domains::{Actor, Clock, DomainError, ImageRepo, MediaStorage, Result, StoredImage, VenueRepo};

use crate::retry::RetryPolicy;
use crate::Ports;

pub const MAX_IMAGES_PER_REQUEST: usize = 10;

#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub max_bytes: usize,
    pub retry: RetryPolicy,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            max_bytes: 5 * 1024 * 1024,
            retry: RetryPolicy { attempt_timeout: Duration::from_secs(15), ..RetryPolicy::default() },
        }
    }
}

/// An upload as received from the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
    pub content_type: String,
    pub data: Bytes,
}

/// Uploads and deletions of venue images. Every upload is recorded against
/// its uploader; only uploaders and admins may delete, and never while a
/// venue still lists the image.
#[derive(Clone)]
pub struct MediaService {
    storage: Arc<dyn MediaStorage>,
    images: Arc<dyn ImageRepo>,
    venues: Arc<dyn VenueRepo>,
    clock: Arc<dyn Clock>,
    settings: MediaSettings,
}

impl MediaService {
    pub fn new(ports: &Ports, settings: MediaSettings) -> Self {
        Self {
            storage: ports.media.clone(),
            images: ports.images.clone(),
            venues: ports.venues.clone(),
            clock: ports.clock.clone(),
            settings,
        }
    }

    fn check(&self, upload: &Upload) -> Result<mime::Mime> {
        let parsed: mime::Mime = upload
            .content_type
            .parse()
            .map_err(|_| DomainError::Validation(format!("invalid content type '{}'", upload.content_type)))?;
        if parsed.type_() != mime::IMAGE {
            return Err(DomainError::Validation(format!("only images can be uploaded, got {parsed}")));
        }
        if upload.data.is_empty() {
            return Err(DomainError::Validation("uploaded file is empty".into()));
        }
        if upload.data.len() > self.settings.max_bytes {
            return Err(DomainError::Validation(format!(
                "file exceeds the {} byte limit",
                self.settings.max_bytes
            )));
        }
        Ok(parsed)
    }

    pub async fn upload(&self, actor: &Actor, upload: Upload) -> Result<StoredImage> {
        let content_type = self.check(&upload)?;
        let size = upload.data.len();
        let stored = self
            .settings
            .retry
            .run("media upload", || self.storage.put(upload.data.clone(), content_type.essence_str()))
            .await?;
        self.images.record(&stored.id, actor.user_id, self.clock.now()).await?;
        tracing::info!(image_id = %stored.id, size, by = %actor.user_id, "image stored");
        Ok(stored)
    }

    /// All files are validated before any is stored.
    pub async fn upload_many(&self, actor: &Actor, uploads: Vec<Upload>) -> Result<Vec<StoredImage>> {
        if uploads.is_empty() {
            return Err(DomainError::Validation("no files were uploaded".into()));
        }
        if uploads.len() > MAX_IMAGES_PER_REQUEST {
            return Err(DomainError::Validation(format!(
                "at most {MAX_IMAGES_PER_REQUEST} images per request"
            )));
        }
        for upload in &uploads {
            self.check(upload)?;
        }
        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            stored.push(self.upload(actor, upload).await?);
        }
        Ok(stored)
    }

    pub async fn delete(&self, actor: &Actor, id: &str) -> Result<()> {
        let well_formed = id.split_once('.').is_some_and(|(hash, ext)| {
            !hash.is_empty() && hash.chars().all(|c| c.is_ascii_hexdigit()) && ext.chars().all(|c| c.is_ascii_alphanumeric())
        });
        if !well_formed {
            return Err(DomainError::Validation(format!("invalid image id '{id}'")));
        }

        let uploaders = self.images.uploaders(id).await?;
        if !actor.is_admin() && !uploaders.contains(&actor.user_id) {
            return Err(if uploaders.is_empty() {
                DomainError::not_found("Image", id)
            } else {
                DomainError::Authorization(format!("image {id} was uploaded by someone else"))
            });
        }
        // Identical uploads share one file; a non-admin only gives up their own claim.
        if !actor.is_admin() && uploaders.iter().any(|u| *u != actor.user_id) {
            self.images.forget(id, Some(actor.user_id)).await?;
            tracing::info!(image_id = %id, by = %actor.user_id, "image released, other uploaders keep it");
            return Ok(());
        }
        if self.venues.image_in_use(id).await? {
            return Err(DomainError::Conflict(format!("image {id} is still used by a venue")));
        }

        self.settings.retry.run("media delete", || self.storage.delete(id)).await?;
        self.images.forget(id, None).await?;
        tracing::info!(image_id = %id, by = %actor.user_id, "image deleted");
        Ok(())
    }
}
