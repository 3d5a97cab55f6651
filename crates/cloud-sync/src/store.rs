//! Shared-document store: one load/save boundary over the remote bin and a
//! local cache, with a never-throw contract. Loads always yield a document;
//! saves report success as a boolean.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use cuetprep_core::domain::SharedDocument;
use cuetprep_core::scheduler::SYNC_MIN_INTERVAL_SECS;
use cuetprep_storage::{KvBackend, LAST_SYNC_KEY, SHARED_CACHE_KEY};

use crate::client::{RemoteDocumentSource, SharedBinClient};
use crate::config::CloudConfig;

/// Current sync state, exposed to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_enabled: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub user_id: String,
}

/// Load/save access to the shared document. Remote-first with a cache
/// fallback; with sync disabled the cache is the only source.
pub struct SharedDocumentStore {
    remote: Option<Arc<dyn RemoteDocumentSource>>,
    cache: Arc<dyn KvBackend>,
    user_id: String,
}

impl SharedDocumentStore {
    pub fn new(config: &CloudConfig, cache: Arc<dyn KvBackend>, user_id: String) -> Self {
        let remote: Option<Arc<dyn RemoteDocumentSource>> = if config.is_enabled() {
            Some(Arc::new(SharedBinClient::new(config)))
        } else {
            None
        };
        Self {
            remote,
            cache,
            user_id,
        }
    }

    /// Build a store over an already-constructed transport. Used by tests.
    pub fn with_remote(
        remote: Arc<dyn RemoteDocumentSource>,
        cache: Arc<dyn KvBackend>,
        user_id: String,
    ) -> Self {
        Self {
            remote: Some(remote),
            cache,
            user_id,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.remote.is_some()
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Load the shared document. Remote wins when reachable and refreshes the
    /// cache; otherwise the cached copy, or a fresh default, is returned.
    pub async fn load(&self) -> SharedDocument {
        let Some(remote) = &self.remote else {
            return self.cached_or_default();
        };

        match remote.fetch_latest().await {
            Ok(document) => {
                self.write_cache(&document);
                document
            }
            Err(err) => {
                warn!("[CloudSync] Remote load failed, using cached copy: {}", err);
                self.cached_or_default()
            }
        }
    }

    /// Persist the document: cache first, then best-effort remote. A reachable
    /// cache makes the save a success even when the remote write fails; the
    /// periodic sync pushes the cached copy later.
    pub async fn save(&self, document: &SharedDocument) -> bool {
        let mut stamped = document.clone();
        stamped.metadata.last_updated = Utc::now();

        let cached = self.write_cache(&stamped);

        if let Some(remote) = &self.remote {
            match remote.put_document(&stamped).await {
                Ok(()) => self.record_last_sync(),
                Err(err) => {
                    warn!("[CloudSync] Remote save failed, cached locally: {}", err);
                }
            }
        }

        cached
    }

    /// Timestamp of the last successful remote round trip.
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        let raw = self.cache.get(LAST_SYNC_KEY).ok().flatten()?;
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }

    pub fn sync_status(&self) -> SyncStatus {
        SyncStatus {
            is_enabled: self.is_enabled(),
            last_sync: self.last_sync(),
            user_id: self.user_id.clone(),
        }
    }

    /// Full refresh round trip, rate limited. Returns true when the data is
    /// considered current: sync disabled, a recent round trip already
    /// happened, or the refresh succeeded.
    pub async fn sync_data(&self) -> bool {
        if self.remote.is_none() {
            return true;
        }

        if let Some(last) = self.last_sync() {
            let elapsed = Utc::now().signed_duration_since(last).num_seconds();
            if elapsed < SYNC_MIN_INTERVAL_SECS {
                log::debug!(
                    "[CloudSync] Skipping sync, last round trip {}s ago",
                    elapsed
                );
                return true;
            }
        }

        let document = self.load().await;
        self.save(&document).await
    }

    fn cached_or_default(&self) -> SharedDocument {
        match self.cache.get(SHARED_CACHE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(document) => document,
                Err(err) => {
                    warn!("[CloudSync] Cached document unreadable: {}", err);
                    SharedDocument::default()
                }
            },
            Ok(None) => SharedDocument::default(),
            Err(err) => {
                warn!("[CloudSync] Cache read failed: {}", err);
                SharedDocument::default()
            }
        }
    }

    fn write_cache(&self, document: &SharedDocument) -> bool {
        let raw = match serde_json::to_string(document) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("[CloudSync] Document serialization failed: {}", err);
                return false;
            }
        };
        match self.cache.set(SHARED_CACHE_KEY, &raw) {
            Ok(()) => true,
            Err(err) => {
                warn!("[CloudSync] Cache write failed: {}", err);
                false
            }
        }
    }

    fn record_last_sync(&self) {
        if let Err(err) = self.cache.set(LAST_SYNC_KEY, &Utc::now().to_rfc3339()) {
            warn!("[CloudSync] Could not record sync timestamp: {}", err);
        }
    }
}
