// /////////////////////////////////////////////////////////////////////////////
// CTI Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The background prefetcher (§4.7): periodically re-fetches the Auth DB
//! into a fresh [`AuthSnapshot`] and swaps it into a shared handle by
//! pointer. Filter and anonymizer only ever read through [`AuthSnapshotHandle`];
//! they never touch the Auth DB or this module's fetch loop directly.

use crate::infrastructure::auth::cache::SignedSnapshotCache;
use crate::infrastructure::config::AuthApiPrefetchingConfig;
use chrono::Utc;
use cti_pipeline_bootstrap::CancellationToken;
use cti_pipeline_domain::entities::AuthSnapshot;
use cti_pipeline_domain::repositories::AuthDataSource;
use parking_lot::RwLock;
use std::sync::Arc;

/// A shared, atomically-swappable view onto the latest snapshot. Cloning
/// is cheap: it shares the same `Arc<RwLock<..>>` as the prefetcher that
/// refreshes it.
#[derive(Clone)]
pub struct AuthSnapshotHandle {
    inner: Arc<RwLock<Arc<AuthSnapshot>>>,
}

impl AuthSnapshotHandle {
    /// `pub` so tests (unit and integration) can construct a handle from a
    /// hand-built snapshot without driving the prefetcher's fetch loop.
    pub fn new(initial: AuthSnapshot) -> Self {
        Self { inner: Arc::new(RwLock::new(Arc::new(initial))) }
    }

    /// The current snapshot. Cheap: one `Arc` clone under a read lock held
    /// only for the duration of the clone.
    pub fn current(&self) -> Arc<AuthSnapshot> {
        self.inner.read().clone()
    }

    fn swap(&self, snapshot: AuthSnapshot) {
        *self.inner.write() = Arc::new(snapshot);
    }

    /// True once the current snapshot has aged past the soft warning
    /// threshold (§4.7); the caller decides whether to log or alert.
    pub fn is_stale(&self, config: &AuthApiPrefetchingConfig) -> bool {
        self.current().is_stale(Utc::now(), config.tolerance_for_outdated())
    }

    /// True once the current snapshot is old enough that serving from it
    /// is no longer acceptable (§4.7's hard stop-serving threshold).
    pub fn is_unusable(&self, config: &AuthApiPrefetchingConfig) -> bool {
        self.current().is_unusable(Utc::now(), config.tolerance_for_outdated_on_error())
    }
}

/// Fetches the first snapshot (falling back to the signed cache, then to
/// an empty snapshot, if the Auth DB is unreachable at startup) and spawns
/// the background refresh loop. Returns the shared handle and the loop's
/// join handle so the caller can await it on shutdown.
pub async fn start(
    source: Arc<dyn AuthDataSource>,
    config: AuthApiPrefetchingConfig,
    shutdown: CancellationToken,
) -> (AuthSnapshotHandle, tokio::task::JoinHandle<()>) {
    let cache = SignedSnapshotCache::new(config.pickle_cache_dir.join("auth-snapshot.cache"), config.pickle_cache_signature_secret.clone());

    let initial = match source.fetch_snapshot().await {
        Ok(snapshot) => {
            if let Err(err) = cache.save(&snapshot).await {
                tracing::warn!(error = %err, "failed to persist auth snapshot cache after initial fetch");
            }
            snapshot
        }
        Err(err) => {
            tracing::warn!(error = %err, "initial auth snapshot fetch failed, falling back to signed cache");
            match cache.load().await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    tracing::warn!("no cached auth snapshot available, starting with an empty one");
                    AuthSnapshot::empty(Utc::now())
                }
                Err(cache_err) => {
                    tracing::error!(error = %cache_err, "cached auth snapshot failed integrity verification, starting with an empty one");
                    AuthSnapshot::empty(Utc::now())
                }
            }
        }
    };

    let handle = AuthSnapshotHandle::new(initial);
    let loop_handle = handle.clone();
    let join = tokio::spawn(run_refresh_loop(source, config, cache, loop_handle, shutdown));
    (handle, join)
}

async fn run_refresh_loop(
    source: Arc<dyn AuthDataSource>,
    config: AuthApiPrefetchingConfig,
    cache: SignedSnapshotCache,
    handle: AuthSnapshotHandle,
    shutdown: CancellationToken,
) {
    let interval = config.max_sleep_between_runs().to_std().unwrap_or(std::time::Duration::from_secs(600));
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        match source.fetch_snapshot().await {
            Ok(snapshot) => {
                if let Err(err) = cache.save(&snapshot).await {
                    tracing::warn!(error = %err, "failed to persist refreshed auth snapshot cache");
                }
                handle.swap(snapshot);
                tracing::info!("auth snapshot refreshed");
            }
            Err(err) => {
                tracing::warn!(error = %err, "auth snapshot refresh failed, retaining previous snapshot");
                if handle.is_unusable(&config) {
                    tracing::error!("auth snapshot has exceeded its error tolerance and is no longer safe to serve from");
                } else if handle.is_stale(&config) {
                    tracing::warn!("auth snapshot is stale but still within its error tolerance");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cti_pipeline_domain::PipelineError;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingSource {
        calls: AtomicU32,
    }

    #[async_trait]
    impl AuthDataSource for CountingSource {
        async fn fetch_snapshot(&self) -> Result<AuthSnapshot, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AuthSnapshot::empty(Utc::now()))
        }
    }

    fn sample_config(dir: &std::path::Path) -> AuthApiPrefetchingConfig {
        AuthApiPrefetchingConfig {
            uri: "sqlite::memory:".to_string(),
            max_sleep_between_runs: 3600,
            tolerance_for_outdated: 60,
            tolerance_for_outdated_on_error: 120,
            pickle_cache_dir: dir.to_path_buf(),
            pickle_cache_signature_secret: "top-secret".to_string(),
        }
    }

    #[tokio::test]
    async fn initial_fetch_populates_the_handle_without_waiting_for_the_refresh_interval() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CountingSource { calls: AtomicU32::new(0) });
        let coordinator = cti_pipeline_bootstrap::ShutdownCoordinator::new(std::time::Duration::from_secs(1));

        let (handle, join) = start(source.clone(), sample_config(dir.path()), coordinator.token()).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(handle.current().organizations.is_empty());

        coordinator.initiate_shutdown();
        join.await.unwrap();
    }
}
