//! XP, levels and achievements.

use serde::Serialize;

/// Level for an XP total. Level 1 starts at zero XP.
pub fn level_for_xp(xp: i32, xp_per_level: i32) -> i32 {
    let per_level = xp_per_level.max(1);
    xp.max(0) / per_level + 1
}

/// XP still needed to reach the next level.
pub fn xp_to_next_level(xp: i32, xp_per_level: i32) -> i32 {
    let per_level = xp_per_level.max(1);
    per_level - xp.max(0) % per_level
}

/// Counters an achievement can be unlocked from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub lessons_completed: i64,
    pub quiz_correct_answers: i64,
    pub quiz_sections_completed: i64,
    pub flashcard_reviews: i64,
    pub posts_created: i64,
    pub trades_placed: i64,
    pub level: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Achievement {
    FirstLesson,
    FiveLessons,
    FirstCorrectAnswer,
    QuizSectionComplete,
    TenFlashcardReviews,
    FirstPost,
    LevelFive,
    FirstTrade,
}

impl Achievement {
    pub const ALL: [Achievement; 8] = [
        Achievement::FirstLesson,
        Achievement::FiveLessons,
        Achievement::FirstCorrectAnswer,
        Achievement::QuizSectionComplete,
        Achievement::TenFlashcardReviews,
        Achievement::FirstPost,
        Achievement::LevelFive,
        Achievement::FirstTrade,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Achievement::FirstLesson => "First Steps",
            Achievement::FiveLessons => "Bookworm",
            Achievement::FirstCorrectAnswer => "Quick Study",
            Achievement::QuizSectionComplete => "Section Cleared",
            Achievement::TenFlashcardReviews => "Card Shark",
            Achievement::FirstPost => "Town Crier",
            Achievement::LevelFive => "Rising Trader",
            Achievement::FirstTrade => "Market Debut",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Achievement::FirstLesson => "Complete your first lesson",
            Achievement::FiveLessons => "Complete five lessons",
            Achievement::FirstCorrectAnswer => "Answer a quiz question correctly",
            Achievement::QuizSectionComplete => "Answer every question in a quiz section",
            Achievement::TenFlashcardReviews => "Review ten flashcards",
            Achievement::FirstPost => "Share your first post with the community",
            Achievement::LevelFive => "Reach level 5",
            Achievement::FirstTrade => "Place your first paper trade",
        }
    }

    pub fn is_unlocked(&self, progress: &ProgressSnapshot) -> bool {
        match self {
            Achievement::FirstLesson => progress.lessons_completed >= 1,
            Achievement::FiveLessons => progress.lessons_completed >= 5,
            Achievement::FirstCorrectAnswer => progress.quiz_correct_answers >= 1,
            Achievement::QuizSectionComplete => progress.quiz_sections_completed >= 1,
            Achievement::TenFlashcardReviews => progress.flashcard_reviews >= 10,
            Achievement::FirstPost => progress.posts_created >= 1,
            Achievement::LevelFive => progress.level >= 5,
            Achievement::FirstTrade => progress.trades_placed >= 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AchievementStatus {
    pub id: Achievement,
    pub title: &'static str,
    pub description: &'static str,
    pub unlocked: bool,
}

pub fn evaluate_achievements(progress: &ProgressSnapshot) -> Vec<AchievementStatus> {
    Achievement::ALL
        .iter()
        .map(|a| AchievementStatus {
            id: *a,
            title: a.title(),
            description: a.description(),
            unlocked: a.is_unlocked(progress),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_boundaries() {
        assert_eq!(level_for_xp(0, 100), 1);
        assert_eq!(level_for_xp(99, 100), 1);
        assert_eq!(level_for_xp(100, 100), 2);
        assert_eq!(level_for_xp(450, 100), 5);
        assert_eq!(level_for_xp(-20, 100), 1);
        assert_eq!(level_for_xp(30, 0), 31);
    }

    #[test]
    fn xp_remaining_to_next_level() {
        assert_eq!(xp_to_next_level(0, 100), 100);
        assert_eq!(xp_to_next_level(130, 100), 70);
        assert_eq!(xp_to_next_level(200, 100), 100);
    }

    #[test]
    fn fresh_account_has_nothing_unlocked() {
        let statuses = evaluate_achievements(&ProgressSnapshot {
            level: 1,
            ..Default::default()
        });
        assert_eq!(statuses.len(), Achievement::ALL.len());
        assert!(statuses.iter().all(|s| !s.unlocked));
    }

    #[test]
    fn unlocks_follow_thresholds() {
        let progress = ProgressSnapshot {
            lessons_completed: 4,
            quiz_correct_answers: 2,
            flashcard_reviews: 10,
            trades_placed: 1,
            level: 5,
            ..Default::default()
        };
        let unlocked: Vec<Achievement> = evaluate_achievements(&progress)
            .into_iter()
            .filter(|s| s.unlocked)
            .map(|s| s.id)
            .collect();

        assert_eq!(
            unlocked,
            vec![
                Achievement::FirstLesson,
                Achievement::FirstCorrectAnswer,
                Achievement::TenFlashcardReviews,
                Achievement::LevelFive,
                Achievement::FirstTrade,
            ]
        );
    }

    #[test]
    fn achievement_ids_serialize_snake_case() {
        let json = serde_json::to_string(&Achievement::TenFlashcardReviews).unwrap();
        assert_eq!(json, "\"ten_flashcard_reviews\"");
    }
}
