//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{AdminConfig, AdminCredentials};
use crate::storage::{ImageStore, LocalImageStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: PgPool,
    images: Arc<dyn ImageStore>,
    credentials: AdminCredentials,
}

impl AppState {
    /// Build state from configuration, storing images on the local disk.
    #[must_use]
    pub fn new(config: &AdminConfig, pool: PgPool) -> Self {
        let images = LocalImageStore::new(&config.upload_dir, &config.public_upload_url);
        Self::from_parts(pool, Arc::new(images), config.credentials.clone())
    }

    /// Build state from already-constructed collaborators.
    #[must_use]
    pub fn from_parts(
        pool: PgPool,
        images: Arc<dyn ImageStore>,
        credentials: AdminCredentials,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pool,
                images,
                credentials,
            }),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    #[must_use]
    pub fn images(&self) -> &dyn ImageStore {
        self.inner.images.as_ref()
    }

    #[must_use]
    pub fn credentials(&self) -> &AdminCredentials {
        &self.inner.credentials
    }
}
