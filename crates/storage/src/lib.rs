//! On-device persistence: a keyed JSON-document layer and the local profile
//! store built on top of it.

mod error;
mod kv;
mod profile;

pub use error::{Result, StorageError};
pub use kv::{
    ensure_user_id, FileBackend, KvBackend, MemoryBackend, LAST_SYNC_KEY, LEGACY_STATS_KEY,
    SHARED_CACHE_KEY, USER_DATA_KEY, USER_ID_KEY,
};
pub use profile::ProfileStore;
