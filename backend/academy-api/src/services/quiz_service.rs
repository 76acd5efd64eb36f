// Quiz service - sections, questions and scored attempts
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{
    AnswerOutcome, QuizQuestion, QuizQuestionRow, QuizSection, QuizSectionDetail,
    QuizSectionSummary, SectionProgress,
};

pub struct QuizService {
    db: Database,
    correct_answer_xp: i32,
}

pub struct NewQuestion<'a> {
    pub prompt: &'a str,
    pub choices: &'a [String],
    pub correct_choice: i32,
    pub explanation: &'a str,
    pub position: i32,
}

const PROGRESS_QUERY: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM user_quiz_progress WHERE user_id = $1 AND section_id = $2),
        (SELECT COUNT(*) FROM user_quiz_progress WHERE user_id = $1 AND section_id = $2 AND answered_correctly),
        (SELECT COUNT(*) FROM quiz_questions WHERE section_id = $2)
"#;

impl QuizService {
    pub fn new(db: Database, correct_answer_xp: i32) -> Self {
        Self {
            db,
            correct_answer_xp,
        }
    }

    pub async fn list_sections(&self, user_id: Uuid) -> Result<Vec<QuizSectionSummary>> {
        let rows: Vec<(Uuid, String, String, i32, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT
                s.id, s.title, s.description, s.position,
                (SELECT COUNT(*) FROM user_quiz_progress p WHERE p.section_id = s.id AND p.user_id = $1),
                (SELECT COUNT(*) FROM user_quiz_progress p WHERE p.section_id = s.id AND p.user_id = $1 AND p.answered_correctly),
                (SELECT COUNT(*) FROM quiz_questions q WHERE q.section_id = s.id)
            FROM quiz_sections s
            ORDER BY s.position ASC, s.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, title, description, position, answered, correct, total)| QuizSectionSummary {
                section: QuizSection {
                    id,
                    title,
                    description,
                    position,
                },
                progress: SectionProgress::new(answered, correct, total),
            })
            .collect())
    }

    pub async fn section_detail(&self, user_id: Uuid, section_id: Uuid) -> Result<QuizSectionDetail> {
        let section = self.find_section(section_id).await?;

        let rows: Vec<QuizQuestionRow> = sqlx::query_as(
            "SELECT * FROM quiz_questions WHERE section_id = $1 ORDER BY position ASC, id ASC",
        )
        .bind(section_id)
        .fetch_all(&self.db.pg)
        .await?;

        let (answered, correct, total): (i64, i64, i64) = sqlx::query_as(PROGRESS_QUERY)
            .bind(user_id)
            .bind(section_id)
            .fetch_one(&self.db.pg)
            .await?;

        Ok(QuizSectionDetail {
            section,
            questions: rows.into_iter().map(QuizQuestion::from).collect(),
            progress: SectionProgress::new(answered, correct, total),
        })
    }

    pub async fn create_section(&self, title: &str, description: &str, position: i32) -> Result<QuizSection> {
        let section: QuizSection = sqlx::query_as(
            r#"
            INSERT INTO quiz_sections (title, description, position)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, position
            "#,
        )
        .bind(title)
        .bind(description)
        .bind(position)
        .fetch_one(&self.db.pg)
        .await?;

        Ok(section)
    }

    pub async fn add_question(&self, section_id: Uuid, question: NewQuestion<'_>) -> Result<QuizQuestion> {
        validate_choice(question.correct_choice, question.choices.len())?;
        self.find_section(section_id).await?;

        let row: QuizQuestionRow = sqlx::query_as(
            r#"
            INSERT INTO quiz_questions (section_id, prompt, choices, correct_choice, explanation, position)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(section_id)
        .bind(question.prompt)
        .bind(Json(question.choices))
        .bind(question.correct_choice)
        .bind(question.explanation)
        .bind(question.position)
        .fetch_one(&self.db.pg)
        .await?;

        Ok(row.into())
    }

    /// Score an answer. Every attempt is recorded; XP is only awarded the
    /// first time the question is answered correctly.
    pub async fn answer(&self, user_id: Uuid, question_id: Uuid, choice: i32) -> Result<AnswerOutcome> {
        let question: QuizQuestionRow = sqlx::query_as("SELECT * FROM quiz_questions WHERE id = $1")
            .bind(question_id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Question {} not found", question_id)))?;

        validate_choice(choice, question.choices.0.len())?;
        let correct = choice == question.correct_choice;

        let mut tx = self.db.pg.begin().await?;

        sqlx::query(
            "INSERT INTO user_quiz_attempts (user_id, question_id, choice, is_correct) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(question_id)
        .bind(choice)
        .bind(correct)
        .execute(&mut *tx)
        .await?;

        let xp_awarded = self
            .record_progress(&mut tx, user_id, &question, correct)
            .await?;

        let (answered, correct_count, total): (i64, i64, i64) = sqlx::query_as(PROGRESS_QUERY)
            .bind(user_id)
            .bind(question.section_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(AnswerOutcome {
            question_id,
            correct,
            correct_choice: question.correct_choice,
            explanation: question.explanation,
            xp_awarded,
            section_progress: SectionProgress::new(answered, correct_count, total),
        })
    }

    /// Upsert the per-question progress row and grant XP on the first
    /// correct answer. Returns the XP granted.
    ///
    /// Inserting before reading makes concurrent first answers wait on the
    /// conflicting row.
    async fn record_progress(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user_id: Uuid,
        question: &QuizQuestionRow,
        correct: bool,
    ) -> Result<i32> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_quiz_progress (user_id, question_id, section_id, answered_correctly)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, question_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(question.id)
        .bind(question.section_id)
        .bind(correct)
        .execute(&mut **tx)
        .await?
        .rows_affected()
            == 1;

        if !inserted {
            let previously_correct: bool = sqlx::query_scalar(
                r#"
                SELECT answered_correctly FROM user_quiz_progress
                WHERE user_id = $1 AND question_id = $2
                FOR UPDATE
                "#,
            )
            .bind(user_id)
            .bind(question.id)
            .fetch_one(&mut **tx)
            .await?;

            if previously_correct || !correct {
                return Ok(0);
            }

            sqlx::query(
                "UPDATE user_quiz_progress SET answered_correctly = TRUE WHERE user_id = $1 AND question_id = $2",
            )
            .bind(user_id)
            .bind(question.id)
            .execute(&mut **tx)
            .await?;
        }

        if !correct {
            return Ok(0);
        }

        sqlx::query("UPDATE users SET xp = xp + $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(self.correct_answer_xp)
            .execute(&mut **tx)
            .await?;

        tracing::debug!(user_id = %user_id, question_id = %question.id, "First correct answer, XP awarded");
        Ok(self.correct_answer_xp)
    }

    async fn find_section(&self, section_id: Uuid) -> Result<QuizSection> {
        sqlx::query_as("SELECT id, title, description, position FROM quiz_sections WHERE id = $1")
            .bind(section_id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz section {} not found", section_id)))
    }
}

fn validate_choice(choice: i32, choice_count: usize) -> Result<()> {
    if choice < 0 || choice as usize >= choice_count {
        return Err(AppError::BadRequest(format!(
            "Choice must be between 0 and {}",
            choice_count.saturating_sub(1)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_must_index_an_option() {
        assert!(validate_choice(0, 4).is_ok());
        assert!(validate_choice(3, 4).is_ok());
        assert!(matches!(validate_choice(4, 4), Err(AppError::BadRequest(_))));
        assert!(matches!(validate_choice(-1, 4), Err(AppError::BadRequest(_))));
        assert!(validate_choice(0, 0).is_err());
    }
}
