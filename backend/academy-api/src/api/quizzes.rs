use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use super::parse_id;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{AnswerOutcome, QuizQuestion, QuizSection, QuizSectionDetail, QuizSectionSummary};
use crate::services::{NewQuestion, QuizService};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sections", get(list_sections).post(create_section))
        .route("/sections/:id", get(get_section))
        .route("/sections/:id/questions", post(add_question))
        .route("/questions/:id/answer", post(answer_question))
}

fn quiz_service(state: &AppState) -> QuizService {
    QuizService::new(state.db.clone(), state.config.rewards.quiz_correct_xp)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSectionRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,
    #[validate(length(min = 2, max = 6))]
    pub choices: Vec<String>,
    pub correct_choice: i32,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub position: i32,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub choice: i32,
}

async fn list_sections(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<QuizSectionSummary>>> {
    Ok(Json(quiz_service(&state).list_sections(current_user.id).await?))
}

async fn create_section(
    State(state): State<AppState>,
    Json(payload): Json<CreateSectionRequest>,
) -> Result<(StatusCode, Json<QuizSection>)> {
    payload.validate()?;

    let section = quiz_service(&state)
        .create_section(payload.title.trim(), payload.description.trim(), payload.position)
        .await?;

    Ok((StatusCode::CREATED, Json(section)))
}

async fn get_section(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<QuizSectionDetail>> {
    let section_id = parse_id(&id, "section")?;
    Ok(Json(
        quiz_service(&state)
            .section_detail(current_user.id, section_id)
            .await?,
    ))
}

async fn add_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<(StatusCode, Json<QuizQuestion>)> {
    let section_id = parse_id(&id, "section")?;
    payload.validate()?;

    let question = quiz_service(&state)
        .add_question(
            section_id,
            NewQuestion {
                prompt: payload.prompt.trim(),
                choices: &payload.choices,
                correct_choice: payload.correct_choice,
                explanation: payload.explanation.trim(),
                position: payload.position,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

async fn answer_question(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerOutcome>> {
    let question_id = parse_id(&id, "question")?;
    Ok(Json(
        quiz_service(&state)
            .answer(current_user.id, question_id, payload.choice)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_needs_at_least_two_choices() {
        let request: CreateQuestionRequest = serde_json::from_str(
            r#"{"prompt":"What is a stop order?","choices":["Only answer"],"correct_choice":0}"#,
        )
        .unwrap();
        assert!(request.validate().is_err());

        let request: CreateQuestionRequest = serde_json::from_str(
            r#"{"prompt":"What is a stop order?","choices":["A","B"],"correct_choice":1}"#,
        )
        .unwrap();
        assert!(request.validate().is_ok());
    }
}
