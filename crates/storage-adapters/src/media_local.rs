//! Local filesystem implementation of `MediaStorage`.
//! Content-addressed: the SHA-256 of the upload names the file, so identical
//! uploads share one copy. Files are sharded two levels deep (`ab/cd/<hash>.<ext>`)
//! and every image gets a 250px WebP thumbnail next to it.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use domains::{DomainError, MediaStorage, Result, StoredImage};
use image::{DynamicImage, ImageFormat, ImageReader};
use sha2::{Digest, Sha256};
use tokio::fs;

pub const THUMBNAIL_EDGE: u32 = 250;

pub struct LocalMediaStorage {
    /// Root directory for all uploads (e.g., "./data/media")
    root: PathBuf,
    /// Public URL prefix the root is served under (e.g., "/media")
    url_prefix: String,
}

fn io_error(context: &str, e: std::io::Error) -> DomainError {
    DomainError::Upstream(format!("{context}: {e}"))
}

/// Splits `<hash>.<ext>` and rejects anything that could escape the root.
fn parse_id(id: &str) -> Result<(&str, &str)> {
    match id.split_once('.') {
        Some((hash, ext))
            if hash.len() == 64
                && hash.chars().all(|c| c.is_ascii_hexdigit())
                && !ext.is_empty()
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            Ok((hash, ext))
        }
        _ => Err(DomainError::Validation(format!("invalid image id '{id}'"))),
    }
}

fn render_thumbnail(data: &[u8]) -> Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| DomainError::Validation(format!("unreadable image: {e}")))?
        .decode()
        .map_err(|e| DomainError::Validation(format!("unsupported or corrupt image: {e}")))?;
    let thumb = DynamicImage::ImageRgba8(img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE).to_rgba8());
    let mut out = Cursor::new(Vec::new());
    thumb
        .write_to(&mut out, ImageFormat::WebP)
        .map_err(|e| DomainError::Internal(format!("thumbnail encoding failed: {e}")))?;
    Ok(out.into_inner())
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self { root: root.into(), url_prefix: url_prefix.into().trim_end_matches('/').to_string() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn shard(hash: &str) -> String {
        format!("{}/{}", &hash[0..2], &hash[2..4])
    }

    fn paths(&self, hash: &str, ext: &str) -> (PathBuf, PathBuf) {
        let dir = self.root.join(&hash[0..2]).join(&hash[2..4]);
        (dir.join(format!("{hash}.{ext}")), dir.join(format!("thumb_{hash}.webp")))
    }

    fn urls(&self, hash: &str, ext: &str) -> (String, String) {
        let shard = Self::shard(hash);
        (
            format!("{}/{shard}/{hash}.{ext}", self.url_prefix),
            format!("{}/{shard}/thumb_{hash}.webp", self.url_prefix),
        )
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn put(&self, data: Bytes, content_type: &str) -> Result<StoredImage> {
        let hash = hex::encode(Sha256::digest(&data));
        let ext = crate::extension_for(content_type);
        let (original, thumbnail) = self.paths(&hash, ext);

        // Decoding doubles as validation: nothing is written for a broken image.
        let thumb = {
            let data = data.clone();
            tokio::task::spawn_blocking(move || render_thumbnail(&data))
                .await
                .map_err(|e| DomainError::Internal(format!("thumbnail task failed: {e}")))??
        };

        if let Some(parent) = original.parent() {
            fs::create_dir_all(parent).await.map_err(|e| io_error("creating media directory", e))?;
        }
        if !fs::try_exists(&original).await.unwrap_or(false) {
            fs::write(&original, &data).await.map_err(|e| io_error("writing image", e))?;
            fs::write(&thumbnail, &thumb).await.map_err(|e| io_error("writing thumbnail", e))?;
            tracing::debug!(%hash, bytes = data.len(), "stored new image");
        }

        let (url, thumbnail_url) = self.urls(&hash, ext);
        Ok(StoredImage { id: format!("{hash}.{ext}"), url, thumbnail_url: Some(thumbnail_url) })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let (hash, ext) = parse_id(id)?;
        let (original, thumbnail) = self.paths(hash, ext);
        match fs::remove_file(&original).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(DomainError::not_found("Image", id)),
            Err(e) => return Err(io_error("deleting image", e)),
        }
        if let Err(e) = fs::remove_file(&thumbnail).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(%id, error = %e, "thumbnail could not be removed");
            }
        }
        Ok(())
    }
}
