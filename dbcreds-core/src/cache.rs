//! Backend handle cache
//!
//! One live, initialized backend per database configuration name.
//!
//! Each name maps to a [`Slot`]: either a ready handle or a single in-flight
//! construction that every concurrent caller for that name awaits. The map
//! lock is only held to read or swap slots, never across construction or a
//! backend call, so different names are built in parallel and a slow plugin
//! start does not block cache hits for other databases.
//!
//! The configuration is read from storage inside the construction, so a
//! handle is always built from the configuration current at the miss.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

use dbcreds_backend::DatabaseBackend;

use crate::error::{CoreError, CoreResult};
use crate::traits::{BackendFactory, Storage};

type BackendHandle = Arc<dyn DatabaseBackend>;
type PendingBuild = Shared<BoxFuture<'static, CoreResult<BackendHandle>>>;

/// Rebuilds attempted when the configuration is replaced mid-construction.
const MAX_BUILD_ATTEMPTS: usize = 3;

// Pending 槽位的驱逐状态
const LIVE: u8 = 0;
const REPLACED: u8 = 1;
const CLOSED: u8 = 2;

struct Pending {
    build: PendingBuild,
    eviction: Arc<AtomicU8>,
}

enum Slot {
    Ready(BackendHandle),
    Pending(Pending),
}

/// Remove `name` and, if it was still being built, mark how it was evicted.
///
/// Marking happens under the map lock so a waiter that sees its build still
/// live can safely promote it.
fn take_slot(slots: &mut HashMap<String, Slot>, name: &str, how: u8) -> Option<Slot> {
    let slot = slots.remove(name)?;
    if let Slot::Pending(pending) = &slot {
        pending.eviction.store(how, Ordering::SeqCst);
    }
    Some(slot)
}

/// Get-or-create map from database configuration name to backend handle.
///
/// Handles are only removed by [`close`](Self::close),
/// [`invalidate`](Self::invalidate) or [`close_all`](Self::close_all); a
/// failing operation on a handle never evicts it.
#[derive(Default)]
pub struct BackendCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl BackendCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `name`, building it on a miss.
    ///
    /// On a miss the configuration is looked up in `storage` and handed to
    /// `factory`. Concurrent misses for the same name share one construction:
    /// the factory runs once and every caller receives the same handle or the
    /// same error. A failed construction is not cached, so the next call
    /// retries.
    ///
    /// A construction evicted before it finishes is never handed out. After
    /// [`invalidate`](Self::invalidate) the waiters rebuild from the current
    /// configuration; after [`close`](Self::close) or
    /// [`close_all`](Self::close_all) they get [`CoreError::BackendEvicted`].
    pub async fn get_or_create(
        &self,
        name: &str,
        storage: &Arc<dyn Storage>,
        factory: &Arc<dyn BackendFactory>,
    ) -> CoreResult<BackendHandle> {
        for attempt in 1..=MAX_BUILD_ATTEMPTS {
            let (build, eviction) = {
                let mut slots = self.slots.lock().await;
                match slots.get(name) {
                    Some(Slot::Ready(backend)) => return Ok(backend.clone()),
                    Some(Slot::Pending(pending)) => {
                        log::debug!("Waiting for in-flight backend construction: {name}");
                        (pending.build.clone(), pending.eviction.clone())
                    }
                    None => {
                        let build =
                            build_backend(name.to_string(), storage.clone(), factory.clone())
                                .boxed()
                                .shared();
                        let eviction = Arc::new(AtomicU8::new(LIVE));
                        slots.insert(
                            name.to_string(),
                            Slot::Pending(Pending {
                                build: build.clone(),
                                eviction: eviction.clone(),
                            }),
                        );
                        (build, eviction)
                    }
                }
            };

            let result = build.clone().await;

            let mut slots = self.slots.lock().await;
            match eviction.load(Ordering::SeqCst) {
                LIVE => {
                    // 第一个醒来的等待者负责更新槽位
                    let owns_slot = matches!(
                        slots.get(name),
                        Some(Slot::Pending(current)) if current.build.ptr_eq(&build)
                    );
                    if owns_slot {
                        match &result {
                            Ok(backend) => {
                                slots.insert(name.to_string(), Slot::Ready(backend.clone()));
                            }
                            Err(_) => {
                                slots.remove(name);
                            }
                        }
                    }
                    return result;
                }
                CLOSED => {
                    return Err(CoreError::BackendEvicted {
                        database: name.to_string(),
                    });
                }
                _ => {
                    // 被 invalidate 的构建由 discard_pending 负责关闭
                    log::info!(
                        "Configuration of {name} replaced during construction, rebuilding (attempt {attempt})"
                    );
                }
            }
        }

        let err = CoreError::BackendEvicted {
            database: name.to_string(),
        };
        log_error(&err);
        Err(err)
    }

    /// The ready handle for `name`, without building one.
    pub async fn get(&self, name: &str) -> Option<BackendHandle> {
        match self.slots.lock().await.get(name) {
            Some(Slot::Ready(backend)) => Some(backend.clone()),
            _ => None,
        }
    }

    /// Names with a ready handle.
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .lock()
            .await
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Evict `name` and close its handle.
    ///
    /// Returns `Ok(false)` if nothing was cached. The handle is evicted even
    /// when its `close` fails; that error is returned.
    pub async fn close(&self, name: &str) -> CoreResult<bool> {
        let Some(slot) = take_slot(&mut *self.slots.lock().await, name, CLOSED) else {
            return Ok(false);
        };

        match slot {
            Slot::Ready(backend) => {
                backend
                    .close()
                    .await
                    .map_err(|source| CoreError::BackendOperation {
                        operation: "Close".to_string(),
                        source,
                    })?;
                log::info!("Backend closed: {name}");
            }
            Slot::Pending(pending) => discard_pending(name.to_string(), pending.build),
        }
        Ok(true)
    }

    /// Evict `name` after its configuration changed; closing is best-effort.
    ///
    /// Callers waiting on an in-flight construction rebuild from the new
    /// configuration.
    pub async fn invalidate(&self, name: &str) {
        let Some(slot) = take_slot(&mut *self.slots.lock().await, name, REPLACED) else {
            return;
        };

        match slot {
            Slot::Ready(backend) => close_quietly(name, &backend).await,
            Slot::Pending(pending) => discard_pending(name.to_string(), pending.build),
        }
        log::info!("Backend invalidated: {name}");
    }

    /// Evict and close every handle (shutdown path).
    pub async fn close_all(&self) {
        let drained: Vec<(String, Slot)> = {
            let mut slots = self.slots.lock().await;
            let names: Vec<String> = slots.keys().cloned().collect();
            names
                .into_iter()
                .filter_map(|name| take_slot(&mut slots, &name, CLOSED).map(|slot| (name, slot)))
                .collect()
        };

        let closes = drained.into_iter().map(|(name, slot)| async move {
            match slot {
                Slot::Ready(backend) => close_quietly(&name, &backend).await,
                Slot::Pending(pending) => discard_pending(name, pending.build),
            }
        });
        futures::future::join_all(closes).await;
    }
}

/// Look up the configuration, create, then initialize. A handle that fails to
/// initialize is closed so a plugin process does not outlive the failed
/// attempt.
async fn build_backend(
    name: String,
    storage: Arc<dyn Storage>,
    factory: Arc<dyn BackendFactory>,
) -> CoreResult<BackendHandle> {
    let config = match storage.get_database_config(&name).await {
        Ok(Some(config)) => config,
        Ok(None) => return Err(CoreError::DatabaseConfigNotFound(name)),
        Err(err) => {
            log_error(&err);
            return Err(err);
        }
    };

    log::info!(
        "Creating backend for database {name} (type: {})",
        config.backend_type
    );

    let unavailable = |source| CoreError::BackendUnavailable {
        database: name.clone(),
        source,
    };

    let backend = match factory.create(&config).await {
        Ok(backend) => backend,
        Err(source) => {
            let err = unavailable(source);
            log_error(&err);
            return Err(err);
        }
    };

    if let Err(source) = backend.initialize(&config.connection_details).await {
        close_quietly(&name, &backend).await;
        let err = unavailable(source);
        log_error(&err);
        return Err(err);
    }

    log::info!("Backend ready: {name}");
    Ok(backend)
}

async fn close_quietly(name: &str, backend: &BackendHandle) {
    if let Err(e) = backend.close().await {
        log::warn!("Failed to close backend {name}: {e}");
    }
}

/// Let an abandoned construction finish in the background and close its
/// result, so no plugin process is left behind.
fn discard_pending(name: String, build: PendingBuild) {
    tokio::spawn(async move {
        if let Ok(backend) = build.await {
            close_quietly(&name, &backend).await;
            log::debug!("Discarded backend built after eviction: {name}");
        }
    });
}

fn log_error(err: &CoreError) {
    if err.is_expected() {
        log::warn!("{err}");
    } else {
        log::error!("{err}");
    }
}
