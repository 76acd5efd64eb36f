use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LessonSummary {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub xp_reward: i32,
    pub position: i32,
    pub completed: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Lesson {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub xp_reward: i32,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonDetail {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub completed: bool,
    pub flashcards: Vec<Flashcard>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LessonCompletion {
    pub lesson_id: Uuid,
    pub xp_awarded: i32,
    pub total_xp: i32,
    pub level: i32,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Flashcard {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub front: String,
    pub back: String,
}

/// A flashcard together with the learner's scheduling state.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DueFlashcard {
    pub id: Uuid,
    pub lesson_id: Uuid,
    pub front: String,
    pub back: String,
    pub ease_factor: f64,
    pub interval_days: i32,
    pub review_count: i32,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlashcardReview {
    pub flashcard_id: Uuid,
    pub correct: bool,
    pub ease_factor: f64,
    pub interval_days: i32,
    pub review_count: i32,
    pub due_at: DateTime<Utc>,
}
