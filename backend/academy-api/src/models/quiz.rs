use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QuizSection {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub position: i32,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SectionProgress {
    pub answered: i64,
    pub correct: i64,
    pub total: i64,
    pub completed: bool,
}

impl SectionProgress {
    pub fn new(answered: i64, correct: i64, total: i64) -> Self {
        Self {
            answered,
            correct,
            total,
            completed: total > 0 && answered >= total,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizSectionSummary {
    #[serde(flatten)]
    pub section: QuizSection,
    pub progress: SectionProgress,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuizQuestionRow {
    pub id: Uuid,
    pub section_id: Uuid,
    pub prompt: String,
    pub choices: sqlx::types::Json<Vec<String>>,
    pub correct_choice: i32,
    pub explanation: String,
    pub position: i32,
}

/// A question as shown to a learner: no answer key.
#[derive(Debug, Clone, Serialize)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub prompt: String,
    pub choices: Vec<String>,
    pub position: i32,
}

impl From<QuizQuestionRow> for QuizQuestion {
    fn from(row: QuizQuestionRow) -> Self {
        Self {
            id: row.id,
            prompt: row.prompt,
            choices: row.choices.0,
            position: row.position,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizSectionDetail {
    #[serde(flatten)]
    pub section: QuizSection,
    pub questions: Vec<QuizQuestion>,
    pub progress: SectionProgress,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnswerOutcome {
    pub question_id: Uuid,
    pub correct: bool,
    pub correct_choice: i32,
    pub explanation: String,
    pub xp_awarded: i32,
    pub section_progress: SectionProgress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_completes_when_every_question_answered() {
        assert!(!SectionProgress::new(2, 1, 3).completed);
        assert!(SectionProgress::new(3, 1, 3).completed);
        assert!(!SectionProgress::new(0, 0, 0).completed);
    }

    #[test]
    fn learner_view_drops_answer_key() {
        let row = QuizQuestionRow {
            id: Uuid::new_v4(),
            section_id: Uuid::new_v4(),
            prompt: "Pick one".into(),
            choices: sqlx::types::Json(vec!["a".into(), "b".into()]),
            correct_choice: 1,
            explanation: "because".into(),
            position: 1,
        };
        let json = serde_json::to_value(QuizQuestion::from(row)).unwrap();
        assert!(json.get("correct_choice").is_none());
        assert!(json.get("explanation").is_none());
        assert_eq!(json["choices"][1], "b");
    }
}
