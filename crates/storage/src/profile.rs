//! Local profile store: durable single-document persistence for the active
//! device's user.
//!
//! Every mutator follows the same contract as the state controller: load the
//! whole document, patch through the shared shallow-merge rule, write the
//! whole document back. Loads never fail visibly; saves report success as a
//! boolean and log failures.

use std::sync::Arc;

use chrono::Utc;
use log::warn;
use serde_json::Value;

use cuetprep_core::domain::{
    chapter_key, record_quiz, ChapterProgress, ChapterProgressPatch, LocalUserDocument,
    ProfilePatch, QuizResult, SettingsPatch, StatsPatch,
};
use cuetprep_core::merge::apply_patch;

use crate::error::{Result, StorageError};
use crate::kv::{KvBackend, LEGACY_STATS_KEY, USER_DATA_KEY};

pub struct ProfileStore {
    backend: Arc<dyn KvBackend>,
}

impl ProfileStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Load the local document. Absent or corrupt storage yields a freshly
    /// persisted default document; callers never see an error.
    pub fn load(&self) -> LocalUserDocument {
        match self.try_load() {
            Ok(Some(document)) => document,
            Ok(None) => self.fresh_default(),
            Err(err) => {
                warn!(
                    "[Storage] Local document unreadable, replacing with defaults: {}",
                    err
                );
                self.fresh_default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<LocalUserDocument>> {
        self.backend
            .get(USER_DATA_KEY)?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StorageError::from)
    }

    fn fresh_default(&self) -> LocalUserDocument {
        let document = LocalUserDocument::default();
        self.save(&document);
        document
    }

    /// Persist the whole document. Failures are logged, never thrown.
    pub fn save(&self, document: &LocalUserDocument) -> bool {
        let raw = match serde_json::to_string(document) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("[Storage] Local document serialization failed: {}", err);
                return false;
            }
        };
        match self.backend.set(USER_DATA_KEY, &raw) {
            Ok(()) => true,
            Err(err) => {
                warn!("[Storage] Local document write failed: {}", err);
                false
            }
        }
    }

    /// Delete the persisted document; the next `load` returns defaults.
    pub fn reset(&self) {
        if let Err(err) = self.backend.remove(USER_DATA_KEY) {
            warn!("[Storage] Local document reset failed: {}", err);
        }
    }

    fn patch_and_save<F>(&self, mutate: F) -> LocalUserDocument
    where
        F: FnOnce(&mut LocalUserDocument),
    {
        let mut document = self.load();
        mutate(&mut document);
        self.save(&document);
        document
    }

    fn patched<T>(current: &T, patch: &impl serde::Serialize) -> T
    where
        T: serde::Serialize + serde::de::DeserializeOwned + Clone,
    {
        match apply_patch(current, patch) {
            Ok(merged) => merged,
            Err(err) => {
                warn!("[Storage] Patch rejected, keeping previous value: {}", err);
                current.clone()
            }
        }
    }

    pub fn update_profile(&self, patch: &ProfilePatch) -> LocalUserDocument {
        self.patch_and_save(|document| {
            document.profile = Self::patched(&document.profile, patch);
        })
    }

    pub fn update_stats(&self, patch: &StatsPatch) -> LocalUserDocument {
        self.patch_and_save(|document| {
            document.stats = Self::patched(&document.stats, patch);
        })
    }

    pub fn update_settings(&self, patch: &SettingsPatch) -> LocalUserDocument {
        self.patch_and_save(|document| {
            document.settings = Self::patched(&document.settings, patch);
        })
    }

    /// Prepend a quiz result, evicting past the history cap.
    pub fn add_quiz_result(&self, quiz: QuizResult) -> LocalUserDocument {
        self.patch_and_save(|document| record_quiz(&mut document.quiz_history, quiz))
    }

    /// Patch a chapter's progress, stamping `last_attempt` with the current
    /// time on every call.
    pub fn update_chapter_progress(
        &self,
        subject: &str,
        chapter: &str,
        patch: &ChapterProgressPatch,
    ) -> LocalUserDocument {
        self.patch_and_save(|document| {
            let key = chapter_key(subject, chapter);
            let current = document
                .stats
                .chapter_progress
                .get(&key)
                .cloned()
                .unwrap_or_default();
            let mut merged: ChapterProgress = Self::patched(&current, patch);
            merged.last_attempt = Utc::now();
            document.stats.chapter_progress.insert(key, merged);
        })
    }

    // ── Data management ─────────────────────────────────────────────────────

    /// Export the current document as (filename, pretty JSON). The filename
    /// carries an ISO date suffix.
    pub fn export_document(&self) -> Result<(String, String)> {
        let document = self.load();
        let filename = format!("cuet-prep-backup-{}.json", Utc::now().format("%Y-%m-%d"));
        let raw = serde_json::to_string_pretty(&document)?;
        Ok((filename, raw))
    }

    /// Replace the whole local document from an exported backup. A file that
    /// does not parse as a user document is rejected without touching the
    /// existing state.
    pub fn import_document(&self, raw: &str) -> Result<LocalUserDocument> {
        let document: LocalUserDocument = serde_json::from_str(raw)
            .map_err(|err| StorageError::InvalidBackup(err.to_string()))?;
        self.backend
            .set(USER_DATA_KEY, &serde_json::to_string(&document)?)?;
        Ok(document)
    }

    /// Legacy stats snapshot from older builds, if present. Read-only.
    pub fn legacy_stats_snapshot(&self) -> Option<Value> {
        let raw = self.backend.get(LEGACY_STATS_KEY).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }
}
