//! Pure shared-document reconciliation: ensure-user, snapshot merge, quiz
//! aggregation across user/global/subject/daily counters, and the
//! leaderboard recompute.
//!
//! Every mutation here is deterministic over its inputs; the I/O cycle
//! (load, mutate, save) lives in the cloud-sync crate.

use chrono::{DateTime, Utc};

use crate::domain::{
    DailyStats, LeaderboardEntry, QuizResult, SharedDocument, StudyTask, SubjectStats, UserRecord,
    UserSnapshot,
};
use crate::merge::apply_patch;
use crate::progression::accuracy_percent;

/// Leaderboard length after a recompute.
pub const LEADERBOARD_CAP: usize = 100;

/// Per-user quiz history kept in the shared document. Mirrors the local cap
/// so the shared document does not grow without bound per user.
pub const REMOTE_QUIZ_HISTORY_CAP: usize = 50;

/// Return the user's record, creating a fresh one on first sight and keeping
/// `metadata.total_users` consistent with the map.
pub fn ensure_user<'a>(
    doc: &'a mut SharedDocument,
    user_id: &str,
    now: DateTime<Utc>,
) -> &'a mut UserRecord {
    if !doc.users.contains_key(user_id) {
        doc.users
            .insert(user_id.to_string(), UserRecord::new(user_id, now));
    }
    doc.metadata.total_users = doc.users.len() as u32;
    doc.users
        .entry(user_id.to_string())
        .or_insert_with(|| UserRecord::new(user_id, now))
}

/// Shallow-merge a profile snapshot into the user's record. `created_at` is
/// never part of a snapshot, so first-sight stamps survive merges.
pub fn merge_user_snapshot(
    doc: &mut SharedDocument,
    user_id: &str,
    snapshot: &UserSnapshot,
    now: DateTime<Utc>,
) -> Result<(), serde_json::Error> {
    let record = ensure_user(doc, user_id, now);
    *record = apply_patch(record, snapshot)?;
    record.last_active = now;
    Ok(())
}

/// Wholesale replacement of the user's study tracker.
pub fn replace_study_tracker(
    doc: &mut SharedDocument,
    user_id: &str,
    tracker: Vec<StudyTask>,
    now: DateTime<Utc>,
) {
    let record = ensure_user(doc, user_id, now);
    record.study_tracker = Some(tracker);
    record.last_tracker_update = Some(now);
    record.last_active = now;
}

/// Apply one quiz result: user counters and history, global counters,
/// per-subject counters, the day's stats, and the leaderboard. Every derived
/// accuracy is recomputed from its counters.
pub fn apply_quiz_result(
    doc: &mut SharedDocument,
    user_id: &str,
    quiz: &QuizResult,
    today: &str,
    now: DateTime<Utc>,
) {
    let user = ensure_user(doc, user_id, now);
    user.quiz_history.push(quiz.clone());
    if user.quiz_history.len() > REMOTE_QUIZ_HISTORY_CAP {
        let overflow = user.quiz_history.len() - REMOTE_QUIZ_HISTORY_CAP;
        user.quiz_history.drain(..overflow);
    }
    user.total_quizzes += 1;
    user.total_questions += quiz.total_questions;
    user.total_correct_answers += quiz.score;
    user.total_xp += quiz.earned_xp;
    user.average_accuracy = accuracy_percent(user.total_correct_answers, user.total_questions);
    user.last_active = now;

    let globals = &mut doc.global_stats;
    globals.total_quizzes += 1;
    globals.total_questions += quiz.total_questions;
    globals.total_correct_answers += quiz.score;
    globals.average_accuracy =
        accuracy_percent(globals.total_correct_answers, globals.total_questions);

    let subject = globals
        .subject_stats
        .entry(quiz.subject.clone())
        .or_insert_with(SubjectStats::default);
    subject.total_quizzes += 1;
    subject.total_questions += quiz.total_questions;
    subject.total_correct_answers += quiz.score;
    subject.average_accuracy =
        accuracy_percent(subject.total_correct_answers, subject.total_questions);

    let day = globals
        .daily_stats
        .entry(today.to_string())
        .or_insert_with(DailyStats::default);
    day.quizzes += 1;
    day.questions += quiz.total_questions;
    day.correct_answers += quiz.score;
    if !day.unique_users.iter().any(|seen| seen == user_id) {
        day.unique_users.push(user_id.to_string());
    }

    doc.metadata.total_quizzes += 1;
    update_leaderboard(doc);
}

/// Rewrite the leaderboard from scratch: users with at least one quiz,
/// ranked by total XP, then average accuracy, then quiz count, top
/// [`LEADERBOARD_CAP`]. Never patched incrementally.
pub fn update_leaderboard(doc: &mut SharedDocument) {
    let mut ranked: Vec<&UserRecord> = doc
        .users
        .values()
        .filter(|user| user.total_quizzes > 0)
        .collect();
    ranked.sort_by(|a, b| {
        b.total_xp
            .cmp(&a.total_xp)
            .then_with(|| b.average_accuracy.cmp(&a.average_accuracy))
            .then_with(|| b.total_quizzes.cmp(&a.total_quizzes))
    });

    doc.leaderboard = ranked
        .into_iter()
        .take(LEADERBOARD_CAP)
        .enumerate()
        .map(|(index, user)| LeaderboardEntry {
            rank: index as u32 + 1,
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            total_xp: user.total_xp,
            average_accuracy: user.average_accuracy,
            total_quizzes: user.total_quizzes,
            last_active: user.last_active,
        })
        .collect();
}
