//! Progression math: accuracy, XP, streaks, badges and achievement rules.

use std::collections::BTreeMap;

use crate::domain::QuizResult;

/// Badge id for a 100% accuracy quiz.
pub const BADGE_PERFECT_SCORE: &str = "perfect-score";

/// Badge id for the first completed quiz.
pub const BADGE_FIRST_QUIZ: &str = "first-quiz";

/// Mastery threshold (percent) for the per-subject expert badge.
pub const SUBJECT_EXPERT_THRESHOLD: f64 = 80.0;

/// Percentage accuracy rounded to the nearest integer; 0 when nothing has
/// been answered (never a division error).
pub fn accuracy_percent(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((f64::from(correct) / f64::from(total)) * 100.0).round() as u32
}

/// XP for a completed quiz: 10 per correct answer, plus up to 50 bonus
/// scaled by accuracy, plus any time bonus.
pub fn calculate_xp(score: u32, total_questions: u32, time_bonus: u32) -> u32 {
    let accuracy_bonus = if total_questions == 0 {
        0
    } else {
        score * 50 / total_questions
    };
    score * 10 + accuracy_bonus + time_bonus
}

/// Consecutive-correct streak: increments on a correct answer, resets on a miss.
pub fn next_streak(current: u32, is_correct: bool) -> u32 {
    if is_correct {
        current + 1
    } else {
        0
    }
}

/// Idempotent badge award. Returns false when the badge is already present.
pub fn award_badge(badges: &mut Vec<String>, badge_id: &str) -> bool {
    if badges.iter().any(|badge| badge == badge_id) {
        return false;
    }
    badges.push(badge_id.to_string());
    true
}

/// Badge id for mastering a subject.
pub fn subject_expert_badge(subject: &str) -> String {
    format!("{}-expert", subject.to_lowercase().replace(' ', "-"))
}

/// Evaluate the fixed achievement rule set after a quiz and award any newly
/// earned badges into `badges`. Returns only the ids awarded by this call.
pub fn check_achievements(
    badges: &mut Vec<String>,
    quiz: &QuizResult,
    quizzes_taken: usize,
    subject_mastery: &BTreeMap<String, f64>,
) -> Vec<String> {
    let mut earned = Vec::new();

    if quiz.accuracy == 100 && award_badge(badges, BADGE_PERFECT_SCORE) {
        earned.push(BADGE_PERFECT_SCORE.to_string());
    }
    if quizzes_taken == 1 && award_badge(badges, BADGE_FIRST_QUIZ) {
        earned.push(BADGE_FIRST_QUIZ.to_string());
    }
    if subject_mastery
        .get(&quiz.subject)
        .is_some_and(|mastery| *mastery >= SUBJECT_EXPERT_THRESHOLD)
    {
        let badge = subject_expert_badge(&quiz.subject);
        if award_badge(badges, &badge) {
            earned.push(badge);
        }
    }

    earned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_handles_empty_denominator() {
        assert_eq!(accuracy_percent(0, 0), 0);
        assert_eq!(accuracy_percent(18, 20), 90);
        assert_eq!(accuracy_percent(1, 3), 33);
        assert_eq!(accuracy_percent(2, 3), 67);
    }

    #[test]
    fn accuracy_recompute_is_idempotent() {
        let first = accuracy_percent(7, 9);
        assert_eq!(accuracy_percent(7, 9), first);
    }

    #[test]
    fn xp_formula_matches_scoring_contract() {
        // 18*10 + floor((18/20)*50) + 0 = 180 + 45
        assert_eq!(calculate_xp(18, 20, 0), 225);
        assert_eq!(calculate_xp(20, 20, 10), 260);
        assert_eq!(calculate_xp(0, 0, 5), 5);
    }

    #[test]
    fn streak_increments_and_resets() {
        assert_eq!(next_streak(3, true), 4);
        assert_eq!(next_streak(3, false), 0);
    }

    #[test]
    fn badge_award_is_idempotent() {
        let mut badges = Vec::new();
        assert!(award_badge(&mut badges, "perfect-score"));
        assert!(!award_badge(&mut badges, "perfect-score"));
        assert_eq!(badges, vec!["perfect-score".to_string()]);
    }

    #[test]
    fn perfect_score_badge_awarded_once_across_quizzes() {
        let mut badges = Vec::new();
        let quiz = QuizResult::new("Physics", "Waves", 20, 20, 0);
        let mastery = BTreeMap::new();

        let first = check_achievements(&mut badges, &quiz, 5, &mastery);
        assert_eq!(first, vec![BADGE_PERFECT_SCORE.to_string()]);

        let second = check_achievements(&mut badges, &quiz, 6, &mastery);
        assert!(second.is_empty());
    }

    #[test]
    fn first_quiz_and_subject_expert_rules() {
        let mut badges = Vec::new();
        let quiz = QuizResult::new("General Test", "Reasoning", 15, 20, 0);
        let mastery = BTreeMap::from([("General Test".to_string(), 85.0)]);

        let earned = check_achievements(&mut badges, &quiz, 1, &mastery);
        assert_eq!(
            earned,
            vec![
                BADGE_FIRST_QUIZ.to_string(),
                "general-test-expert".to_string()
            ]
        );
    }
}
