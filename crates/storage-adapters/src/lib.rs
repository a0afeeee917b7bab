//! # storage-adapters
//!
//! Implementations of the `domains` persistence and media ports.
//!
//! - [`memory`]: DashMap repositories, always compiled
//! - `postgres`: sqlx repositories (feature `db-postgres`)
//! - `media_local`: content-addressed files on disk (feature `media-local`)

pub mod memory;

#[cfg(feature = "media-local")]
pub mod media_local;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use memory::{MemoryMediaStorage, MemoryStore};

/// File extension used for a stored upload of `content_type`.
pub(crate) fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => "jpg",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first())
            .copied()
            .unwrap_or("bin"),
    }
}

#[cfg(test)]
mod tests {
    use super::extension_for;

    #[test]
    fn extensions_follow_content_type() {
        assert_eq!(extension_for("image/jpeg"), "jpg");
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("application/x-unknown-thing"), "bin");
    }
}
