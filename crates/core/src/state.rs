//! Reducer-driven application state machine.
//!
//! Transitions are pure: `reduce` never mutates in place and never fails.
//! Side effects (persistence, remote pushes) are bound to state changes by
//! the controller, not by the transitions themselves.

use serde::{Deserialize, Serialize};

use crate::domain::{
    chapter_key, record_quiz, ChapterProgress, ChapterProgressPatch, GlobalStats,
    LeaderboardEntry, LocalUserDocument, ProfilePatch, QuizResult, SettingsPatch, StatsPatch,
    StudyTask,
};
use crate::merge::apply_patch;

/// In-memory session state: the local document plus mirrored global data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub document: LocalUserDocument,
    pub global_stats: Option<GlobalStats>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Named state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    SetDocument(LocalUserDocument),
    UpdateProfile(ProfilePatch),
    UpdateStats(StatsPatch),
    UpdateSettings(SettingsPatch),
    AddQuizResult(QuizResult),
    UpdateChapterProgress {
        subject: String,
        chapter: String,
        patch: ChapterProgressPatch,
    },
    UpdateStudyTracker(Vec<StudyTask>),
    SetGlobalStats(GlobalStats),
    SetLeaderboard(Vec<LeaderboardEntry>),
    Reset,
}

impl AppAction {
    /// Whether the transition mutates the local document (and therefore
    /// warrants persistence and a remote snapshot push).
    pub fn mutates_document(&self) -> bool {
        !matches!(
            self,
            AppAction::SetGlobalStats(_) | AppAction::SetLeaderboard(_)
        )
    }
}

fn patched<T, P>(target: &T, patch: &P) -> T
where
    T: serde::Serialize + serde::de::DeserializeOwned + Clone,
    P: serde::Serialize,
{
    match apply_patch(target, patch) {
        Ok(merged) => merged,
        Err(err) => {
            log::warn!("[State] Patch rejected, keeping previous value: {}", err);
            target.clone()
        }
    }
}

/// Advance the state by one transition.
pub fn reduce(state: &AppState, action: AppAction) -> AppState {
    let mut next = state.clone();
    match action {
        AppAction::SetDocument(document) => next.document = document,
        AppAction::UpdateProfile(patch) => {
            next.document.profile = patched(&state.document.profile, &patch);
        }
        AppAction::UpdateStats(patch) => {
            next.document.stats = patched(&state.document.stats, &patch);
        }
        AppAction::UpdateSettings(patch) => {
            next.document.settings = patched(&state.document.settings, &patch);
        }
        AppAction::AddQuizResult(quiz) => record_quiz(&mut next.document.quiz_history, quiz),
        AppAction::UpdateChapterProgress {
            subject,
            chapter,
            patch,
        } => {
            let key = chapter_key(&subject, &chapter);
            let current = state
                .document
                .stats
                .chapter_progress
                .get(&key)
                .cloned()
                .unwrap_or_default();
            let merged: ChapterProgress = patched(&current, &patch);
            next.document.stats.chapter_progress.insert(key, merged);
        }
        AppAction::UpdateStudyTracker(tracker) => next.document.study_tracker = tracker,
        AppAction::SetGlobalStats(stats) => next.global_stats = Some(stats),
        AppAction::SetLeaderboard(entries) => next.leaderboard = entries,
        // Local reset: the document returns to defaults; fetched global data
        // is remote-derived and survives.
        AppAction::Reset => next.document = LocalUserDocument::default(),
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QUIZ_HISTORY_CAP;

    #[test]
    fn transitions_do_not_mutate_the_previous_state() {
        let state = AppState::default();
        let next = reduce(
            &state,
            AppAction::UpdateProfile(ProfilePatch {
                xp: Some(100),
                ..ProfilePatch::default()
            }),
        );
        assert_eq!(state.document.profile.xp, 0);
        assert_eq!(next.document.profile.xp, 100);
    }

    #[test]
    fn add_quiz_result_prepends_and_caps_history() {
        let mut state = AppState::default();
        for i in 0..(QUIZ_HISTORY_CAP as u32 + 2) {
            state = reduce(
                &state,
                AppAction::AddQuizResult(QuizResult::new("Physics", "Waves", i, 20, 0)),
            );
        }
        let history = &state.document.quiz_history;
        assert_eq!(history.len(), QUIZ_HISTORY_CAP);
        assert_eq!(history[0].score, QUIZ_HISTORY_CAP as u32 + 1);
    }

    #[test]
    fn chapter_progress_patch_starts_from_zero_default() {
        let state = AppState::default();
        let next = reduce(
            &state,
            AppAction::UpdateChapterProgress {
                subject: "Physics".to_string(),
                chapter: "Waves".to_string(),
                patch: ChapterProgressPatch {
                    mastery: Some(40.0),
                    ..ChapterProgressPatch::default()
                },
            },
        );
        let progress = next
            .document
            .stats
            .chapter_progress
            .get("Physics-Waves")
            .expect("progress");
        assert_eq!(progress.mastery, 40.0);
        assert_eq!(progress.attempts, 0);
    }

    #[test]
    fn reset_restores_document_but_keeps_global_mirrors() {
        let mut state = AppState::default();
        state = reduce(
            &state,
            AppAction::UpdateProfile(ProfilePatch {
                xp: Some(500),
                ..ProfilePatch::default()
            }),
        );
        state = reduce(&state, AppAction::SetGlobalStats(GlobalStats::default()));
        let next = reduce(&state, AppAction::Reset);
        assert_eq!(next.document.profile.xp, 0);
        assert!(next.global_stats.is_some());
    }

    #[test]
    fn global_mirror_transitions_do_not_touch_the_document() {
        assert!(!AppAction::SetGlobalStats(GlobalStats::default()).mutates_document());
        assert!(!AppAction::SetLeaderboard(Vec::new()).mutates_document());
        assert!(AppAction::Reset.mutates_document());
        assert!(AppAction::UpdateStudyTracker(Vec::new()).mutates_document());
    }
}
