//! The shared cross-device document: one hosted JSON document holding every
//! known user's aggregated data, global stats and the computed leaderboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::local::{QuizResult, Settings, StudyTask};

/// Application name stamped into fresh shared documents.
pub const SHARED_APP_NAME: &str = "CUET Prep";

/// Schema tag stamped into fresh shared documents.
pub const SHARED_SCHEMA_VERSION: &str = "1.0.0";

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// The singleton remote (or cached) document, fetched and replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SharedDocument {
    pub metadata: DocumentMetadata,
    pub global_stats: GlobalStats,
    pub users: BTreeMap<String, UserRecord>,
    /// Derived: always recomputed from `users`, never patched incrementally.
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Reserved extension point; carried through round trips untouched.
    #[serde(default = "empty_object")]
    pub achievements: Value,
    /// Reserved extension point; carried through round trips untouched.
    #[serde(default = "empty_object")]
    pub shared_question_banks: Value,
}

impl Default for SharedDocument {
    fn default() -> Self {
        Self {
            metadata: DocumentMetadata::default(),
            global_stats: GlobalStats::default(),
            users: BTreeMap::new(),
            leaderboard: Vec::new(),
            achievements: empty_object(),
            shared_question_banks: empty_object(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentMetadata {
    pub app_name: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    /// Derived: `users.len()`.
    pub total_users: u32,
    pub total_quizzes: u32,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            app_name: SHARED_APP_NAME.to_string(),
            version: SHARED_SCHEMA_VERSION.to_string(),
            created_at: now,
            last_updated: now,
            total_users: 0,
            total_quizzes: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalStats {
    pub total_questions: u32,
    pub total_correct_answers: u32,
    pub total_quizzes: u32,
    /// Derived: recomputed from the counters after every increment.
    pub average_accuracy: u32,
    pub subject_stats: BTreeMap<String, SubjectStats>,
    /// Keyed by ISO date (`YYYY-MM-DD`).
    pub daily_stats: BTreeMap<String, DailyStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubjectStats {
    pub total_quizzes: u32,
    pub total_questions: u32,
    pub total_correct_answers: u32,
    /// Derived: recomputed from the counters after every increment.
    pub average_accuracy: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyStats {
    pub quizzes: u32,
    pub questions: u32,
    pub correct_answers: u32,
    /// Logically a set; stored as a duplicate-free ordered sequence.
    pub unique_users: Vec<String>,
}

/// One user's aggregated record inside the shared document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserRecord {
    pub user_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub total_quizzes: u32,
    pub total_questions: u32,
    pub total_correct_answers: u32,
    pub total_xp: u32,
    /// Derived: recomputed from the counters after every increment.
    pub average_accuracy: u32,
    /// Append-only, oldest first, capped remotely (see `reconcile`).
    pub quiz_history: Vec<QuizResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub study_tracker: Option<Vec<StudyTask>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tracker_update: Option<DateTime<Utc>>,
    pub badges: Vec<String>,
    pub streak: u32,
    pub subject_mastery: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl Default for UserRecord {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            name: String::new(),
            created_at: DateTime::UNIX_EPOCH,
            last_active: DateTime::UNIX_EPOCH,
            total_quizzes: 0,
            total_questions: 0,
            total_correct_answers: 0,
            total_xp: 0,
            average_accuracy: 0,
            quiz_history: Vec::new(),
            study_tracker: None,
            last_tracker_update: None,
            badges: Vec::new(),
            streak: 0,
            subject_mastery: BTreeMap::new(),
            settings: None,
        }
    }
}

impl UserRecord {
    /// A fresh record for a user first seen at `now`.
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            created_at: now,
            last_active: now,
            ..Self::default()
        }
    }
}

/// One derived leaderboard row; ranks are rewritten wholesale on recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub name: String,
    pub total_xp: u32,
    pub average_accuracy: u32,
    pub total_quizzes: u32,
    pub last_active: DateTime<Utc>,
}

/// Partial profile summary pushed by the state controller after local
/// mutations; shallow-merged into the matching [`UserRecord`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_xp: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_accuracy: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_mastery: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_document_has_reserved_extension_points() {
        let doc = SharedDocument::default();
        assert!(doc.achievements.is_object());
        assert!(doc.shared_question_banks.is_object());
        assert_eq!(doc.metadata.app_name, SHARED_APP_NAME);
        assert_eq!(doc.metadata.total_users, 0);
    }

    #[test]
    fn document_round_trips_through_json() {
        let mut doc = SharedDocument::default();
        doc.users
            .insert("u1".to_string(), UserRecord::new("u1", Utc::now()));
        let raw = serde_json::to_string(&doc).expect("serialize");
        let parsed: SharedDocument = serde_json::from_str(&raw).expect("parse");
        assert_eq!(parsed, doc);
    }

    #[test]
    // Wire names are shared with the hosted document; renames break old data.
    fn user_record_fields_use_camel_case_wire_names() {
        let record = UserRecord::new("u1", Utc::now());
        let value = serde_json::to_value(&record).expect("serialize");
        assert!(value.get("userId").is_some());
        assert!(value.get("totalXP").is_none(), "camelCase keeps totalXp");
        assert!(value.get("totalXp").is_some());
        assert!(value.get("averageAccuracy").is_some());
    }
}
