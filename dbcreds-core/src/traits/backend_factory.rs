//! Backend factory abstract Trait

use std::sync::Arc;

use async_trait::async_trait;

use dbcreds_backend::{create_backend, DatabaseBackend, DatabaseConfig};

/// Builds an uninitialized backend for a database configuration.
///
/// The cache calls this at most once per name at a time; tests substitute
/// counting implementations.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    async fn create(&self, config: &DatabaseConfig)
        -> dbcreds_backend::Result<Arc<dyn DatabaseBackend>>;
}

/// Factory backed by [`dbcreds_backend::create_backend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackendFactory;

#[async_trait]
impl BackendFactory for DefaultBackendFactory {
    async fn create(
        &self,
        config: &DatabaseConfig,
    ) -> dbcreds_backend::Result<Arc<dyn DatabaseBackend>> {
        create_backend(config).await
    }
}
