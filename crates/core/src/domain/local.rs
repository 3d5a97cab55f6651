//! Local per-device user document: profile, stats, settings, quiz history
//! and study tracker.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subjects seeded into a fresh mastery map.
pub const SUBJECTS: [&str; 6] = [
    "Physics",
    "Chemistry",
    "Mathematics",
    "Biology",
    "English",
    "General Test",
];

/// Maximum quiz history entries kept per user; oldest evicted on overflow.
pub const QUIZ_HISTORY_CAP: usize = 50;

/// The single authoritative local document for the active device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalUserDocument {
    pub profile: Profile,
    pub stats: Stats,
    pub settings: Settings,
    /// Most-recent-first, capped at [`QUIZ_HISTORY_CAP`].
    pub quiz_history: Vec<QuizResult>,
    pub study_tracker: Vec<StudyTask>,
}

impl Default for LocalUserDocument {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            stats: Stats::default(),
            settings: Settings::default(),
            quiz_history: Vec::new(),
            study_tracker: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub name: String,
    pub xp: u32,
    pub streak: u32,
    pub level: u32,
    /// Unique badge ids, in award order.
    pub badges: Vec<String>,
    pub join_date: DateTime<Utc>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            name: "CUET Aspirant".to_string(),
            xp: 0,
            streak: 0,
            level: 1,
            badges: Vec::new(),
            join_date: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub total_questions: u32,
    pub correct_answers: u32,
    /// Cumulative time spent answering, in seconds.
    pub total_time: f64,
    /// Derived: recomputed from the counters, never mutated independently.
    pub average_accuracy: u32,
    /// Subject name to mastery percentage in `[0, 100]`.
    pub subject_mastery: BTreeMap<String, f64>,
    /// Keyed by `"{subject}-{chapter}"`.
    pub chapter_progress: BTreeMap<String, ChapterProgress>,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            total_questions: 0,
            correct_answers: 0,
            total_time: 0.0,
            average_accuracy: 0,
            subject_mastery: SUBJECTS
                .iter()
                .map(|subject| (subject.to_string(), 0.0))
                .collect(),
            chapter_progress: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChapterProgress {
    pub mastery: f64,
    pub attempts: u32,
    pub best_score: u32,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub last_attempt: DateTime<Utc>,
}

impl Default for ChapterProgress {
    fn default() -> Self {
        Self {
            mastery: 0.0,
            attempts: 0,
            best_score: 0,
            total_questions: 0,
            correct_answers: 0,
            last_attempt: DateTime::UNIX_EPOCH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub dark_mode: bool,
    pub sound_enabled: bool,
    pub notifications: bool,
    pub auto_submit: bool,
    pub show_explanations: bool,
    pub timer_warnings: bool,
    pub vibration: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dark_mode: false,
            sound_enabled: true,
            notifications: true,
            auto_submit: false,
            show_explanations: true,
            timer_warnings: true,
            vibration: true,
        }
    }
}

/// Outcome of one completed quiz. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub subject: String,
    pub chapter: String,
    /// Number of correctly answered questions.
    pub score: u32,
    pub total_questions: u32,
    /// Derived: `round(100 * score / total_questions)`, 0 when empty.
    pub accuracy: u32,
    pub earned_xp: u32,
    pub date: DateTime<Utc>,
}

impl QuizResult {
    pub fn new(
        subject: impl Into<String>,
        chapter: impl Into<String>,
        score: u32,
        total_questions: u32,
        earned_xp: u32,
    ) -> Self {
        Self {
            subject: subject.into(),
            chapter: chapter.into(),
            score,
            total_questions,
            accuracy: crate::progression::accuracy_percent(score, total_questions),
            earned_xp,
            date: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    Done,
    Revise,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyTask {
    pub week: String,
    pub status: TaskStatus,
}

/// Key under which a chapter's progress is stored.
pub fn chapter_key(subject: &str, chapter: &str) -> String {
    format!("{}-{}", subject, chapter)
}

/// Prepend a quiz result and evict the oldest entries past the cap.
pub fn record_quiz(history: &mut Vec<QuizResult>, quiz: QuizResult) {
    history.insert(0, quiz);
    history.truncate(QUIZ_HISTORY_CAP);
}

// ── Partial updates ─────────────────────────────────────────────────────────
//
// Patch structs feed the shared shallow-merge rule in `crate::merge`; absent
// fields are skipped during serialization and never touch the target.

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xp: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_accuracy: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_mastery: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dark_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_submit: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_explanations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timer_warnings: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibration: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterProgressPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mastery: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_is_fresh_install_shape() {
        let doc = LocalUserDocument::default();
        assert_eq!(doc.profile.xp, 0);
        assert_eq!(doc.profile.streak, 0);
        assert_eq!(doc.profile.level, 1);
        assert!(doc.profile.badges.is_empty());
        assert!(doc.quiz_history.is_empty());
        assert_eq!(doc.stats.subject_mastery.len(), SUBJECTS.len());
        assert!(doc.stats.subject_mastery.values().all(|m| *m == 0.0));
    }

    #[test]
    fn quiz_history_is_capped_newest_first() {
        let mut history = Vec::new();
        for i in 0..(QUIZ_HISTORY_CAP as u32 + 1) {
            record_quiz(
                &mut history,
                QuizResult::new("Physics", "Waves", i, 20, 0),
            );
        }
        assert_eq!(history.len(), QUIZ_HISTORY_CAP);
        // Newest entry first; the very first quiz (score 0) was evicted.
        assert_eq!(history[0].score, QUIZ_HISTORY_CAP as u32);
        assert_eq!(history.last().map(|q| q.score), Some(1));
    }

    #[test]
    fn task_status_serializes_with_display_labels() {
        let labels = [
            TaskStatus::NotStarted,
            TaskStatus::InProgress,
            TaskStatus::Done,
            TaskStatus::Revise,
        ]
        .iter()
        .map(|status| serde_json::to_string(status).expect("serialize status"))
        .collect::<Vec<_>>();
        assert_eq!(
            labels,
            vec!["\"Not Started\"", "\"In Progress\"", "\"Done\"", "\"Revise\""]
        );
    }

    #[test]
    fn document_tolerates_missing_fields() {
        let doc: LocalUserDocument =
            serde_json::from_str(r#"{"profile":{"name":"Asha","xp":120}}"#).expect("parse");
        assert_eq!(doc.profile.name, "Asha");
        assert_eq!(doc.profile.xp, 120);
        assert_eq!(doc.profile.level, 1);
        assert!(doc.quiz_history.is_empty());
    }
}
