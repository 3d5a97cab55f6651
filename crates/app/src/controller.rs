//! State controller: every mutation flows through `dispatch`, which advances
//! the in-memory state with the pure reducer and then binds the side effects
//! to it: local persistence, and a best-effort snapshot push to the shared
//! document.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use cuetprep_cloud_sync::{SharedDataService, SyncStatus};
use cuetprep_core::domain::{
    chapter_key, ChapterProgress, ChapterProgressPatch, GlobalStats, LocalUserDocument,
    ProfilePatch, QuizResult, StatsPatch, UserSnapshot,
};
use cuetprep_core::progression::{
    accuracy_percent, calculate_xp, check_achievements, next_streak,
};
use cuetprep_core::state::{reduce, AppAction, AppState};
use cuetprep_storage::ProfileStore;

pub struct AppController {
    state: Mutex<AppState>,
    profile_store: ProfileStore,
    shared: Arc<SharedDataService>,
}

impl AppController {
    /// Build a controller seeded from the persisted local document.
    pub fn new(profile_store: ProfileStore, shared: Arc<SharedDataService>) -> Self {
        let state = AppState {
            document: profile_store.load(),
            ..AppState::default()
        };
        Self {
            state: Mutex::new(state),
            profile_store,
            shared,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, AppState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current state snapshot.
    pub fn state(&self) -> AppState {
        self.lock_state().clone()
    }

    fn snapshot_of(document: &LocalUserDocument) -> UserSnapshot {
        UserSnapshot {
            name: Some(document.profile.name.clone()),
            total_xp: Some(document.profile.xp),
            average_accuracy: Some(document.stats.average_accuracy),
            badges: Some(document.profile.badges.clone()),
            streak: Some(document.profile.streak),
            subject_mastery: Some(document.stats.subject_mastery.clone()),
            settings: Some(document.settings.clone()),
        }
    }

    /// Advance the state by one transition and bind its side effects: local
    /// persistence for document mutations, tracker replacement for tracker
    /// updates, and a profile snapshot push after any document change.
    pub async fn dispatch(&self, action: AppAction) -> AppState {
        let mutates = action.mutates_document();
        let is_reset = matches!(action, AppAction::Reset);
        let tracker = match &action {
            AppAction::UpdateStudyTracker(tracker) => Some(tracker.clone()),
            _ => None,
        };

        let next = {
            let mut state = self.lock_state();
            let next = reduce(&state, action);
            *state = next.clone();
            next
        };

        if is_reset {
            self.profile_store.reset();
        } else if mutates {
            self.profile_store.save(&next.document);
        }

        if let Some(tracker) = tracker {
            if !self.shared.update_study_tracker(tracker).await {
                log::debug!("[App] Study tracker push failed, kept locally");
            }
        }

        // Reset is local-only: the shared record is append-mostly and keeps
        // its last pushed values.
        if mutates && !is_reset {
            let snapshot = Self::snapshot_of(&next.document);
            if !self.shared.update_user_data(&snapshot).await {
                log::debug!("[App] Profile snapshot push failed, kept locally");
            }
        }

        next
    }

    /// Load the remote-derived global mirrors into the state. Called once at
    /// startup; failures leave the mirrors empty.
    pub async fn start(&self) {
        let (global_stats, leaderboard) =
            tokio::join!(self.shared.get_global_stats(), self.shared.get_leaderboard());
        // A defaulted document carries no information; previously fetched
        // mirrors stay in place rather than being overwritten with empties.
        let current = self.state();
        if current.global_stats.is_none() || global_stats != GlobalStats::default() {
            self.dispatch(AppAction::SetGlobalStats(global_stats)).await;
        }
        if current.leaderboard.is_empty() || !leaderboard.is_empty() {
            self.dispatch(AppAction::SetLeaderboard(leaderboard)).await;
        }
    }

    /// Refresh the global mirrors from the shared document.
    pub async fn refresh_global_data(&self) {
        self.start().await;
    }

    // ── Quiz flow ───────────────────────────────────────────────────────────

    /// Record a completed quiz end to end: history, cumulative stats, chapter
    /// progress, XP, achievements, and the shared aggregates. Returns the
    /// badge ids newly earned by this quiz.
    pub async fn record_quiz_completion(
        &self,
        subject: &str,
        chapter: &str,
        score: u32,
        total_questions: u32,
        time_bonus: u32,
    ) -> Vec<String> {
        let earned_xp = calculate_xp(score, total_questions, time_bonus);
        let quiz = QuizResult::new(subject, chapter, score, total_questions, earned_xp);

        let after_quiz = self.dispatch(AppAction::AddQuizResult(quiz.clone())).await;

        // Cumulative stats, with the subject's mastery recomputed as the mean
        // accuracy over its history entries.
        let stats = &after_quiz.document.stats;
        let total = stats.total_questions + total_questions;
        let correct = stats.correct_answers + score;
        let mut mastery = stats.subject_mastery.clone();
        mastery.insert(
            subject.to_string(),
            subject_mastery_of(&after_quiz.document.quiz_history, subject),
        );
        let after_stats = self
            .dispatch(AppAction::UpdateStats(StatsPatch {
                total_questions: Some(total),
                correct_answers: Some(correct),
                average_accuracy: Some(accuracy_percent(correct, total)),
                subject_mastery: Some(mastery),
                ..StatsPatch::default()
            }))
            .await;

        let progress = self.get_chapter_progress(subject, chapter);
        let chapter_total = progress.total_questions + total_questions;
        let chapter_correct = progress.correct_answers + score;
        self.dispatch(AppAction::UpdateChapterProgress {
            subject: subject.to_string(),
            chapter: chapter.to_string(),
            patch: ChapterProgressPatch {
                mastery: Some(f64::from(accuracy_percent(chapter_correct, chapter_total))),
                attempts: Some(progress.attempts + 1),
                best_score: Some(progress.best_score.max(score)),
                total_questions: Some(chapter_total),
                correct_answers: Some(chapter_correct),
                last_attempt: Some(Utc::now()),
            },
        })
        .await;

        // The shared aggregation lands before the XP dispatch: the record
        // earns the XP once here, and the absolute snapshot pushed with the
        // profile update then matches it instead of adding on top.
        if !self.shared.add_quiz_result(&quiz).await {
            log::debug!("[App] Shared quiz aggregation failed, kept locally");
        }

        self.dispatch(AppAction::UpdateProfile(ProfilePatch {
            xp: Some(after_stats.document.profile.xp + earned_xp),
            ..ProfilePatch::default()
        }))
        .await;

        let earned = self.check_achievements(&quiz).await;
        self.refresh_global_data().await;

        earned
    }

    /// Evaluate the achievement rules against the current state and persist
    /// any newly earned badges. Awards are idempotent.
    pub async fn check_achievements(&self, quiz: &QuizResult) -> Vec<String> {
        let state = self.state();
        let mut badges = state.document.profile.badges.clone();
        let earned = check_achievements(
            &mut badges,
            quiz,
            state.document.quiz_history.len(),
            &state.document.stats.subject_mastery,
        );
        if !earned.is_empty() {
            self.dispatch(AppAction::UpdateProfile(ProfilePatch {
                badges: Some(badges),
                ..ProfilePatch::default()
            }))
            .await;
        }
        earned
    }

    /// Award a single badge by id. Returns false when already owned.
    pub async fn award_badge(&self, badge_id: &str) -> bool {
        let mut badges = self.state().document.profile.badges;
        if !cuetprep_core::progression::award_badge(&mut badges, badge_id) {
            return false;
        }
        self.dispatch(AppAction::UpdateProfile(ProfilePatch {
            badges: Some(badges),
            ..ProfilePatch::default()
        }))
        .await;
        true
    }

    /// Advance or reset the consecutive-correct streak.
    pub async fn update_streak(&self, is_correct: bool) -> u32 {
        let streak = next_streak(self.state().document.profile.streak, is_correct);
        self.dispatch(AppAction::UpdateProfile(ProfilePatch {
            streak: Some(streak),
            ..ProfilePatch::default()
        }))
        .await;
        streak
    }

    /// A chapter's progress, zero-valued when never attempted.
    pub fn get_chapter_progress(&self, subject: &str, chapter: &str) -> ChapterProgress {
        let key = chapter_key(subject, chapter);
        self.state()
            .document
            .stats
            .chapter_progress
            .get(&key)
            .cloned()
            .unwrap_or_default()
    }

    // ── Sync and data management ────────────────────────────────────────────

    pub fn sync_status(&self) -> SyncStatus {
        self.shared.sync_status()
    }

    /// Rate-limited on-demand sync round trip.
    pub async fn sync_now(&self) -> bool {
        self.shared.sync_data().await
    }

    /// Export the local document as (filename, pretty JSON).
    pub fn export_data(&self) -> cuetprep_storage::Result<(String, String)> {
        self.profile_store.export_document()
    }

    /// Replace the local document from an exported backup and load it into
    /// the live state.
    pub async fn import_data(&self, raw: &str) -> cuetprep_storage::Result<AppState> {
        let document = self.profile_store.import_document(raw)?;
        Ok(self.dispatch(AppAction::SetDocument(document)).await)
    }
}

/// Mean accuracy over the subject's history entries, 0 when none exist.
fn subject_mastery_of(history: &[QuizResult], subject: &str) -> f64 {
    let accuracies: Vec<u32> = history
        .iter()
        .filter(|quiz| quiz.subject == subject)
        .map(|quiz| quiz.accuracy)
        .collect();
    if accuracies.is_empty() {
        return 0.0;
    }
    f64::from(accuracies.iter().sum::<u32>()) / accuracies.len() as f64
}
