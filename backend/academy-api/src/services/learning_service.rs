// Learning service - lessons, flashcards and achievement progress
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::db::Database;
use crate::domain::progression::{level_for_xp, ProgressSnapshot};
use crate::domain::spaced_repetition::ReviewState;
use crate::error::{AppError, Result};
use crate::models::{
    DueFlashcard, Flashcard, FlashcardReview, Lesson, LessonCompletion, LessonDetail,
    LessonSummary,
};

pub struct LearningService {
    db: Database,
    xp_per_level: i32,
}

pub struct NewLesson<'a> {
    pub title: &'a str,
    pub summary: &'a str,
    pub content: &'a str,
    pub xp_reward: i32,
    pub position: i32,
}

impl LearningService {
    pub fn new(db: Database, xp_per_level: i32) -> Self {
        Self { db, xp_per_level }
    }

    pub async fn list_lessons(&self, user_id: Uuid) -> Result<Vec<LessonSummary>> {
        let lessons: Vec<LessonSummary> = sqlx::query_as(
            r#"
            SELECT
                l.id, l.title, l.summary, l.xp_reward, l.position,
                (up.user_id IS NOT NULL) AS completed
            FROM lessons l
            LEFT JOIN user_progress up ON up.lesson_id = l.id AND up.user_id = $1
            ORDER BY l.position ASC, l.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(lessons)
    }

    pub async fn lesson_detail(&self, user_id: Uuid, lesson_id: Uuid) -> Result<LessonDetail> {
        let lesson: Lesson = sqlx::query_as(
            "SELECT id, title, summary, content, xp_reward, position, created_at FROM lessons WHERE id = $1",
        )
        .bind(lesson_id)
        .fetch_optional(&self.db.pg)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lesson {} not found", lesson_id)))?;

        let completed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM user_progress WHERE user_id = $1 AND lesson_id = $2)",
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_one(&self.db.pg)
        .await?;

        let flashcards: Vec<Flashcard> = sqlx::query_as(
            "SELECT id, lesson_id, front, back FROM flashcards WHERE lesson_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(lesson_id)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(LessonDetail {
            lesson,
            completed,
            flashcards,
        })
    }

    pub async fn create_lesson(&self, lesson: NewLesson<'_>) -> Result<Lesson> {
        let created: Lesson = sqlx::query_as(
            r#"
            INSERT INTO lessons (title, summary, content, xp_reward, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, summary, content, xp_reward, position, created_at
            "#,
        )
        .bind(lesson.title)
        .bind(lesson.summary)
        .bind(lesson.content)
        .bind(lesson.xp_reward)
        .bind(lesson.position)
        .fetch_one(&self.db.pg)
        .await?;

        tracing::info!(lesson_id = %created.id, "Lesson created");
        Ok(created)
    }

    /// Mark a lesson complete and award its XP in one transaction. A lesson
    /// can only be completed once per user.
    pub async fn complete_lesson(&self, user_id: Uuid, lesson_id: Uuid) -> Result<LessonCompletion> {
        let mut tx = self.db.pg.begin().await?;

        let xp_reward: i32 = sqlx::query_scalar("SELECT xp_reward FROM lessons WHERE id = $1")
            .bind(lesson_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lesson {} not found", lesson_id)))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO user_progress (user_id, lesson_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, lesson_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::BadRequest("Lesson already completed".to_string()));
        }

        let total_xp: i32 = sqlx::query_scalar(
            "UPDATE users SET xp = xp + $2, updated_at = NOW() WHERE id = $1 RETURNING xp",
        )
        .bind(user_id)
        .bind(xp_reward)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user_id, lesson_id = %lesson_id, xp_reward, "Lesson completed");

        Ok(LessonCompletion {
            lesson_id,
            xp_awarded: xp_reward,
            total_xp,
            level: level_for_xp(total_xp, self.xp_per_level),
        })
    }

    pub async fn create_flashcard(&self, lesson_id: Uuid, front: &str, back: &str) -> Result<Flashcard> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM lessons WHERE id = $1)")
            .bind(lesson_id)
            .fetch_one(&self.db.pg)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Lesson {} not found", lesson_id)));
        }

        let card: Flashcard = sqlx::query_as(
            "INSERT INTO flashcards (lesson_id, front, back) VALUES ($1, $2, $3) RETURNING id, lesson_id, front, back",
        )
        .bind(lesson_id)
        .bind(front)
        .bind(back)
        .fetch_one(&self.db.pg)
        .await?;

        Ok(card)
    }

    /// Cards never reviewed, or whose next review is due, soonest first.
    pub async fn due_flashcards(&self, user_id: Uuid, limit: i64) -> Result<Vec<DueFlashcard>> {
        let cards: Vec<DueFlashcard> = sqlx::query_as(
            r#"
            SELECT
                f.id, f.lesson_id, f.front, f.back,
                COALESCE(r.ease_factor, 2.5) AS ease_factor,
                COALESCE(r.interval_days, 0) AS interval_days,
                COALESCE(r.review_count, 0) AS review_count,
                r.due_at
            FROM flashcards f
            LEFT JOIN user_flashcard_reviews r ON r.flashcard_id = f.id AND r.user_id = $1
            WHERE r.due_at IS NULL OR r.due_at <= NOW()
            ORDER BY r.due_at ASC NULLS FIRST, f.created_at ASC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(cards)
    }

    pub async fn review_flashcard(&self, user_id: Uuid, flashcard_id: Uuid, correct: bool) -> Result<FlashcardReview> {
        let mut tx = self.db.pg.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM flashcards WHERE id = $1)")
            .bind(flashcard_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound(format!("Flashcard {} not found", flashcard_id)));
        }

        // Seed the row before locking it so concurrent first reviews
        // serialize on the primary key.
        let initial = ReviewState::default();
        sqlx::query(
            r#"
            INSERT INTO user_flashcard_reviews (user_id, flashcard_id, ease_factor, interval_days, review_count)
            VALUES ($1, $2, $3, $4, 0)
            ON CONFLICT (user_id, flashcard_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(flashcard_id)
        .bind(initial.ease_factor)
        .bind(initial.interval_days)
        .execute(&mut *tx)
        .await?;

        let (ease, interval, review_count): (f64, i32, i32) = sqlx::query_as(
            r#"
            SELECT ease_factor, interval_days, review_count
            FROM user_flashcard_reviews
            WHERE user_id = $1 AND flashcard_id = $2
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(flashcard_id)
        .fetch_one(&mut *tx)
        .await?;

        let next = ReviewState::new(ease, interval).review(correct);
        let due_at = Utc::now()
            .checked_add_signed(Duration::days(i64::from(next.interval_days)))
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!("Review interval of {} days overflows", next.interval_days))
            })?;

        sqlx::query(
            r#"
            UPDATE user_flashcard_reviews SET
                ease_factor = $3,
                interval_days = $4,
                review_count = review_count + 1,
                due_at = $5,
                last_reviewed_at = NOW()
            WHERE user_id = $1 AND flashcard_id = $2
            "#,
        )
        .bind(user_id)
        .bind(flashcard_id)
        .bind(next.ease_factor)
        .bind(next.interval_days)
        .bind(due_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            user_id = %user_id,
            flashcard_id = %flashcard_id,
            correct,
            interval_days = next.interval_days,
            ease_factor = next.ease_factor,
            "Flashcard reviewed"
        );

        Ok(FlashcardReview {
            flashcard_id,
            correct,
            ease_factor: next.ease_factor,
            interval_days: next.interval_days,
            review_count: review_count + 1,
            due_at,
        })
    }

    /// Counters the achievement catalog is evaluated against.
    pub async fn progress_snapshot(&self, user_id: Uuid) -> Result<ProgressSnapshot> {
        let row: Option<(i32, i32, i64, i64, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                u.xp,
                u.trades_placed,
                (SELECT COUNT(*) FROM user_progress WHERE user_id = u.id),
                (SELECT COUNT(*) FROM user_quiz_progress WHERE user_id = u.id AND answered_correctly),
                (
                    SELECT COUNT(*) FROM quiz_sections s
                    WHERE EXISTS (SELECT 1 FROM quiz_questions q WHERE q.section_id = s.id)
                      AND NOT EXISTS (
                        SELECT 1 FROM quiz_questions q
                        WHERE q.section_id = s.id
                          AND NOT EXISTS (
                            SELECT 1 FROM user_quiz_progress p
                            WHERE p.question_id = q.id AND p.user_id = u.id
                          )
                      )
                ),
                (SELECT COALESCE(SUM(review_count), 0)::BIGINT FROM user_flashcard_reviews WHERE user_id = u.id),
                (SELECT COUNT(*) FROM posts WHERE author_id = u.id)
            FROM users u
            WHERE u.id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db.pg)
        .await?;

        let (xp, trades, lessons, correct, sections, reviews, posts) =
            row.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(ProgressSnapshot {
            lessons_completed: lessons,
            quiz_correct_answers: correct,
            quiz_sections_completed: sections,
            flashcard_reviews: reviews,
            posts_created: posts,
            trades_placed: i64::from(trades),
            level: level_for_xp(xp, self.xp_per_level),
        })
    }
}
