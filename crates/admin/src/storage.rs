//! Artwork image storage.
//!
//! Uploaded images are written under a generated name
//! `<random>-<timestamp>.<ext>` and addressed by a public URL. The store only
//! ever deletes images it owns, so artworks pointing at external URLs (seeded
//! or hand-entered) are never touched.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rand::Rng;
use rand::distr::Alphanumeric;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Accepted image extensions.
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Length of the random part of generated file names.
const RANDOM_NAME_LEN: usize = 12;

/// Largest accepted upload.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Errors from image storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("empty upload")]
    Empty,

    #[error("image larger than {} MB", MAX_IMAGE_BYTES / 1024 / 1024)]
    TooLarge,

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An image received from the admin form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// Lower-case file extension, from the file name or else the content type.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedType` for anything but common web image formats.
    pub fn extension(&self) -> Result<String, StorageError> {
        let from_name = Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let from_type = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.strip_prefix("image/"))
            .map(str::to_ascii_lowercase);

        from_name
            .into_iter()
            .chain(from_type)
            .find(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
            .ok_or_else(|| StorageError::UnsupportedType(self.file_name.clone()))
    }
}

/// Where artwork images live.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist an image and return its public URL.
    async fn store(&self, image: UploadedImage) -> Result<String, StorageError>;

    /// Delete an image this store owns. URLs it does not own are ignored.
    async fn delete(&self, url: &str) -> Result<(), StorageError>;

    /// Whether `url` points at an image this store wrote.
    fn owns(&self, url: &str) -> bool;
}

/// Images on the local filesystem, served by the admin under a URL prefix.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    dir: PathBuf,
    public_prefix: String,
}

impl LocalImageStore {
    /// `public_prefix` is the URL the directory is served under, e.g. `/uploads`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, public_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// The directory images are written to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The stored file name behind `url`, if this store owns it.
    fn file_name<'u>(&self, url: &'u str) -> Option<&'u str> {
        url.strip_prefix(&self.public_prefix)?
            .strip_prefix('/')
            .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."))
    }
}

/// `<random>-<timestamp>.<ext>`
fn generate_file_name(extension: &str) -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_NAME_LEN)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    let timestamp = chrono::Utc::now().timestamp_millis();
    format!("{random}-{timestamp}.{extension}")
}

#[async_trait]
impl ImageStore for LocalImageStore {
    #[instrument(skip(self, image), fields(file_name = %image.file_name, bytes = image.bytes.len()))]
    async fn store(&self, image: UploadedImage) -> Result<String, StorageError> {
        if image.bytes.is_empty() {
            return Err(StorageError::Empty);
        }
        if image.bytes.len() > MAX_IMAGE_BYTES {
            return Err(StorageError::TooLarge);
        }
        let name = generate_file_name(&image.extension()?);

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&name), &image.bytes).await?;

        info!(%name, "Image stored");
        Ok(format!("{}/{name}", self.public_prefix))
    }

    #[instrument(skip(self))]
    async fn delete(&self, url: &str) -> Result<(), StorageError> {
        let Some(name) = self.file_name(url) else {
            return Ok(());
        };

        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => {
                info!(%name, "Image deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(%name, "Image already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn owns(&self, url: &str) -> bool {
        self.file_name(url).is_some()
    }
}
