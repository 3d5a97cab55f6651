//! Shared cross-device document synchronization: hosted-bin transport,
//! cache-backed document store, and the reconciliation operations layered on
//! top.

mod client;
mod config;
mod error;
mod ops;
mod store;

pub use client::{RemoteDocumentSource, SharedBinClient};
pub use config::{CloudConfig, DEFAULT_BASE_URL, PLACEHOLDER_API_KEY, PLACEHOLDER_BIN_ID};
pub use error::{CloudSyncError, Result};
pub use ops::SharedDataService;
pub use store::{SharedDocumentStore, SyncStatus};
