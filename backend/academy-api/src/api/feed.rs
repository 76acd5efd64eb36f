use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use super::parse_id;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{Comment, FeedPost, LikeState, PostDetail};
use crate::services::{FeedPage, FeedService};
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/feed", get(get_feed))
        .route("/posts", post(create_post))
        .route("/posts/:id", get(get_post).delete(delete_post))
        .route("/posts/:id/comments", post(add_comment))
        .route("/posts/:id/like", post(like_post).delete(unlike_post))
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl FeedQuery {
    fn page(&self) -> FeedPage {
        FeedPage {
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
}

async fn get_feed(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<FeedPost>>> {
    let posts = FeedService::new(state.db.clone())
        .feed(current_user.id, query.page())
        .await?;

    Ok(Json(posts))
}

async fn create_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<FeedPost>)> {
    payload.validate()?;
    let content = non_blank(&payload.content)?;

    let post = FeedService::new(state.db.clone())
        .create_post(current_user.id, content)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<PostDetail>> {
    let post_id = parse_id(&id, "post")?;

    let detail = FeedService::new(state.db.clone())
        .post_detail(current_user.id, post_id)
        .await?;

    Ok(Json(detail))
}

async fn delete_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let post_id = parse_id(&id, "post")?;

    FeedService::new(state.db.clone())
        .delete_post(current_user.id, post_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_comment(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>)> {
    let post_id = parse_id(&id, "post")?;
    payload.validate()?;
    let content = non_blank(&payload.content)?;

    let comment = FeedService::new(state.db.clone())
        .add_comment(current_user.id, post_id, content)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

async fn like_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<LikeState>> {
    let post_id = parse_id(&id, "post")?;

    let like = FeedService::new(state.db.clone())
        .like(current_user.id, post_id)
        .await?;

    Ok(Json(like))
}

async fn unlike_post(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<LikeState>> {
    let post_id = parse_id(&id, "post")?;

    let like = FeedService::new(state.db.clone())
        .unlike(current_user.id, post_id)
        .await?;

    Ok(Json(like))
}

fn non_blank(content: &str) -> Result<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(crate::error::AppError::BadRequest(
            "content must not be blank".to_string(),
        ));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_page_is_clamped() {
        let page = FeedQuery::default().page();
        assert_eq!((page.limit, page.offset), (20, 0));

        let page = FeedQuery {
            limit: Some(500),
            offset: Some(-4),
        }
        .page();
        assert_eq!((page.limit, page.offset), (100, 0));

        let page = FeedQuery {
            limit: Some(0),
            offset: Some(40),
        }
        .page();
        assert_eq!((page.limit, page.offset), (1, 40));
    }

    #[test]
    fn blank_content_is_rejected() {
        assert!(non_blank("   \n").is_err());
        assert_eq!(non_blank("  hello ").unwrap(), "hello");
    }
}
