use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::parse_id;
use crate::domain::progression::{evaluate_achievements, AchievementStatus};
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{
    DueFlashcard, Flashcard, FlashcardReview, Lesson, LessonCompletion, LessonDetail,
    LessonSummary,
};
use crate::services::{LearningService, NewLesson};
use crate::AppState;

const DEFAULT_DUE_LIMIT: i64 = 20;
const MAX_DUE_LIMIT: i64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/lessons", get(list_lessons).post(create_lesson))
        .route("/lessons/:id", get(get_lesson))
        .route("/lessons/:id/complete", post(complete_lesson))
        .route("/lessons/:id/flashcards", post(create_flashcard))
        .route("/flashcards/due", get(due_flashcards))
        .route("/flashcards/:id/review", post(review_flashcard))
        .route("/achievements", get(achievements))
}

fn learning_service(state: &AppState) -> LearningService {
    LearningService::new(state.db.clone(), state.config.rewards.xp_per_level)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLessonRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub summary: String,
    #[validate(length(min = 1))]
    pub content: String,
    #[validate(range(min = 0, max = 1000))]
    #[serde(default = "default_lesson_xp")]
    pub xp_reward: i32,
    #[serde(default)]
    pub position: i32,
}

fn default_lesson_xp() -> i32 {
    50
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFlashcardRequest {
    #[validate(length(min = 1, max = 500))]
    pub front: String,
    #[validate(length(min = 1, max = 2000))]
    pub back: String,
}

#[derive(Debug, Deserialize)]
pub struct DueQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub correct: bool,
}

#[derive(Debug, Serialize)]
pub struct AchievementsResponse {
    pub level: i32,
    pub achievements: Vec<AchievementStatus>,
}

async fn list_lessons(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<LessonSummary>>> {
    Ok(Json(learning_service(&state).list_lessons(current_user.id).await?))
}

async fn create_lesson(
    State(state): State<AppState>,
    Json(payload): Json<CreateLessonRequest>,
) -> Result<(StatusCode, Json<Lesson>)> {
    payload.validate()?;

    let lesson = learning_service(&state)
        .create_lesson(NewLesson {
            title: payload.title.trim(),
            summary: payload.summary.trim(),
            content: &payload.content,
            xp_reward: payload.xp_reward,
            position: payload.position,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(lesson)))
}

async fn get_lesson(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<LessonDetail>> {
    let lesson_id = parse_id(&id, "lesson")?;
    Ok(Json(
        learning_service(&state)
            .lesson_detail(current_user.id, lesson_id)
            .await?,
    ))
}

async fn complete_lesson(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<LessonCompletion>> {
    let lesson_id = parse_id(&id, "lesson")?;
    Ok(Json(
        learning_service(&state)
            .complete_lesson(current_user.id, lesson_id)
            .await?,
    ))
}

async fn create_flashcard(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CreateFlashcardRequest>,
) -> Result<(StatusCode, Json<Flashcard>)> {
    let lesson_id = parse_id(&id, "lesson")?;
    payload.validate()?;

    let card = learning_service(&state)
        .create_flashcard(lesson_id, payload.front.trim(), payload.back.trim())
        .await?;

    Ok((StatusCode::CREATED, Json(card)))
}

async fn due_flashcards(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<DueQuery>,
) -> Result<Json<Vec<DueFlashcard>>> {
    let limit = query.limit.unwrap_or(DEFAULT_DUE_LIMIT).clamp(1, MAX_DUE_LIMIT);
    Ok(Json(
        learning_service(&state)
            .due_flashcards(current_user.id, limit)
            .await?,
    ))
}

async fn review_flashcard(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<FlashcardReview>> {
    let flashcard_id = parse_id(&id, "flashcard")?;
    Ok(Json(
        learning_service(&state)
            .review_flashcard(current_user.id, flashcard_id, payload.correct)
            .await?,
    ))
}

async fn achievements(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<AchievementsResponse>> {
    let progress = learning_service(&state)
        .progress_snapshot(current_user.id)
        .await?;

    Ok(Json(AchievementsResponse {
        level: progress.level,
        achievements: evaluate_achievements(&progress),
    }))
}
