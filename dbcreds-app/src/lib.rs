//! Platform-agnostic application bootstrap for dbcreds.
//!
//! Provides `AppState` (service container) and `AppStateBuilder` (adapter
//! injection), plus the in-memory [`adapters::InMemoryStorage`] fed from a
//! JSON [`adapters::Catalog`].

pub mod adapters;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dbcreds_core::cache::BackendCache;
use dbcreds_core::error::{CoreError, CoreResult};
use dbcreds_core::services::{ConnectionService, CredentialService, ServiceContext};
use dbcreds_core::traits::{BackendFactory, DefaultBackendFactory, Storage};
use dbcreds_core::types::DatabaseConfig;

use adapters::InMemoryStorage;

/// Platform-agnostic application state.
///
/// Holds all services and the `ServiceContext`. Every frontend constructs this
/// once at startup via `AppStateBuilder`.
pub struct AppState {
    /// Service context (storage, factory, backend cache)
    pub ctx: Arc<ServiceContext>,
    /// Issue / renew / revoke
    pub credential_service: CredentialService,
    /// Cached backend lifecycle
    pub connection_service: ConnectionService,
    /// Writable store, when the builder was given one
    writable: Option<Arc<InMemoryStorage>>,
    shut_down: AtomicBool,
}

impl AppState {
    /// Replace a database configuration and drop its cached backend so the
    /// next request connects with the new settings.
    ///
    /// # Errors
    /// `ValidationError` if the state was built over a read-only storage or
    /// the configuration is invalid.
    pub async fn replace_database_config(
        &self,
        name: &str,
        config: DatabaseConfig,
    ) -> CoreResult<()> {
        let storage = self.writable.as_ref().ok_or_else(|| {
            CoreError::ValidationError("storage is read-only".to_string())
        })?;

        storage.put_database_config(name, config).await?;
        self.connection_service.replace_config(name).await;
        log::info!("Database config replaced: {name}");
        Ok(())
    }

    /// Remove a database configuration and close its cached backend.
    pub async fn remove_database_config(&self, name: &str) -> CoreResult<bool> {
        let storage = self.writable.as_ref().ok_or_else(|| {
            CoreError::ValidationError("storage is read-only".to_string())
        })?;

        let existed = storage.remove_database_config(name).await;
        self.connection_service.replace_config(name).await;
        Ok(existed)
    }

    /// Close every cached backend. Later calls are no-ops.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("Shutting down");
        self.connection_service.close_all().await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `storage` or `in_memory_storage`: where roles and database configs live
///
/// # Optional
/// - `factory`: defaults to `DefaultBackendFactory`
/// - `cache`: defaults to an empty `BackendCache`
#[derive(Default)]
pub struct AppStateBuilder {
    storage: Option<Arc<dyn Storage>>,
    writable: Option<Arc<InMemoryStorage>>,
    factory: Option<Arc<dyn BackendFactory>>,
    cache: Option<Arc<BackendCache>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only storage; `replace_database_config` is unavailable.
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self.writable = None;
        self
    }

    /// Writable in-memory storage.
    #[must_use]
    pub fn in_memory_storage(mut self, storage: Arc<InMemoryStorage>) -> Self {
        let shared: Arc<dyn Storage> = storage.clone();
        self.storage = Some(shared);
        self.writable = Some(storage);
        self
    }

    #[must_use]
    pub fn factory(mut self, factory: Arc<dyn BackendFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    #[must_use]
    pub fn cache(mut self, cache: Arc<BackendCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if required adapters are missing.
    pub fn build(self) -> CoreResult<AppState> {
        let storage = self
            .storage
            .ok_or_else(|| CoreError::ValidationError("storage is required".to_string()))?;
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(DefaultBackendFactory));
        let cache = self.cache.unwrap_or_else(|| Arc::new(BackendCache::new()));

        let ctx = Arc::new(ServiceContext::new(storage, factory, cache));

        Ok(AppState {
            credential_service: CredentialService::new(Arc::clone(&ctx)),
            connection_service: ConnectionService::new(Arc::clone(&ctx)),
            ctx,
            writable: self.writable,
            shut_down: AtomicBool::new(false),
        })
    }
}
