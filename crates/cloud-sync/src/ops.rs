//! Reconciliation operations over the shared document.
//!
//! Every write follows the same cycle: load the whole document, mutate it
//! with the pure reconcile functions, save the whole document back. Readers
//! run the same load and project the slice they need.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use cuetprep_core::domain::{
    GlobalStats, LeaderboardEntry, QuizResult, StudyTask, UserRecord, UserSnapshot,
};
use cuetprep_core::reconcile::{
    apply_quiz_result, merge_user_snapshot, replace_study_tracker, update_leaderboard,
};
use cuetprep_storage::KvBackend;

use crate::config::CloudConfig;
use crate::store::{SharedDocumentStore, SyncStatus};

/// High-level shared-data operations for the active device's user.
pub struct SharedDataService {
    store: SharedDocumentStore,
}

impl SharedDataService {
    pub fn new(config: &CloudConfig, cache: Arc<dyn KvBackend>, user_id: String) -> Self {
        Self {
            store: SharedDocumentStore::new(config, cache, user_id),
        }
    }

    pub fn with_store(store: SharedDocumentStore) -> Self {
        Self { store }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_enabled()
    }

    pub fn user_id(&self) -> &str {
        self.store.user_id()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.store.sync_status()
    }

    /// Rate-limited full refresh round trip.
    pub async fn sync_data(&self) -> bool {
        self.store.sync_data().await
    }

    /// Merge a profile snapshot into this user's record and recompute the
    /// leaderboard.
    pub async fn update_user_data(&self, snapshot: &UserSnapshot) -> bool {
        let mut document = self.store.load().await;
        let now = Utc::now();
        if let Err(err) = merge_user_snapshot(&mut document, self.user_id(), snapshot, now) {
            log::warn!("[CloudSync] Snapshot merge failed: {}", err);
            return false;
        }
        update_leaderboard(&mut document);
        self.store.save(&document).await
    }

    /// Record one quiz result across user, global, subject and daily
    /// aggregates. The day bucket comes from the current UTC date.
    pub async fn add_quiz_result(&self, quiz: &QuizResult) -> bool {
        let mut document = self.store.load().await;
        let now = Utc::now();
        let today = now.format("%Y-%m-%d").to_string();
        apply_quiz_result(&mut document, self.user_id(), quiz, &today, now);
        self.store.save(&document).await
    }

    /// Replace this user's study tracker wholesale.
    pub async fn update_study_tracker(&self, tracker: Vec<StudyTask>) -> bool {
        let mut document = self.store.load().await;
        replace_study_tracker(&mut document, self.user_id(), tracker, Utc::now());
        update_leaderboard(&mut document);
        self.store.save(&document).await
    }

    /// This user's study tracker, if one was ever pushed.
    pub async fn get_study_tracker(&self) -> Option<Vec<StudyTask>> {
        let document = self.store.load().await;
        document
            .users
            .get(self.user_id())
            .and_then(|record| record.study_tracker.clone())
    }

    pub async fn get_global_stats(&self) -> GlobalStats {
        self.store.load().await.global_stats
    }

    pub async fn get_leaderboard(&self) -> Vec<LeaderboardEntry> {
        self.store.load().await.leaderboard
    }

    pub async fn get_all_users(&self) -> BTreeMap<String, UserRecord> {
        self.store.load().await.users
    }

    /// This user's aggregated record, if the shared document knows them.
    pub async fn get_current_user_data(&self) -> Option<UserRecord> {
        self.store.load().await.users.get(self.user_id()).cloned()
    }

    /// Convenience constructor for local-only mode in tests and tools.
    pub fn disabled(cache: Arc<dyn KvBackend>, user_id: String) -> Self {
        Self::new(&CloudConfig::default(), cache, user_id)
    }
}
