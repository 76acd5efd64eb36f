// Feed service - posts, comments and likes
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Comment, FeedPost, LikeState, PostDetail};

pub struct FeedService {
    db: Database,
}

#[derive(Debug, Clone, Copy)]
pub struct FeedPage {
    pub limit: i64,
    pub offset: i64,
}

const FEED_SELECT: &str = r#"
    SELECT
        p.id,
        p.author_id,
        u.username AS author_username,
        p.content,
        p.like_count,
        p.comment_count,
        EXISTS(
            SELECT 1 FROM likes l WHERE l.post_id = p.id AND l.user_id = $1
        ) AS liked_by_me,
        p.created_at
    FROM posts p
    JOIN users u ON u.id = p.author_id
"#;

impl FeedService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Newest posts first.
    pub async fn feed(&self, viewer_id: Uuid, page: FeedPage) -> Result<Vec<FeedPost>> {
        let query = format!(
            "{} ORDER BY p.created_at DESC, p.id DESC LIMIT $2 OFFSET $3",
            FEED_SELECT
        );

        let posts: Vec<FeedPost> = sqlx::query_as(&query)
            .bind(viewer_id)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.db.pg)
            .await?;

        Ok(posts)
    }

    pub async fn create_post(&self, author_id: Uuid, content: &str) -> Result<FeedPost> {
        let post_id: Uuid = sqlx::query_scalar(
            "INSERT INTO posts (author_id, content) VALUES ($1, $2) RETURNING id",
        )
        .bind(author_id)
        .bind(content)
        .fetch_one(&self.db.pg)
        .await?;

        tracing::info!(post_id = %post_id, author_id = %author_id, "Post created");
        self.get_post(author_id, post_id).await
    }

    pub async fn get_post(&self, viewer_id: Uuid, post_id: Uuid) -> Result<FeedPost> {
        let query = format!("{} WHERE p.id = $2", FEED_SELECT);

        sqlx::query_as(&query)
            .bind(viewer_id)
            .bind(post_id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))
    }

    pub async fn post_detail(&self, viewer_id: Uuid, post_id: Uuid) -> Result<PostDetail> {
        let post = self.get_post(viewer_id, post_id).await?;
        let comments = self.comments(post_id).await?;
        Ok(PostDetail { post, comments })
    }

    /// Only the author may delete a post.
    pub async fn delete_post(&self, requester_id: Uuid, post_id: Uuid) -> Result<()> {
        let author_id: Option<Uuid> = sqlx::query_scalar("SELECT author_id FROM posts WHERE id = $1")
            .bind(post_id)
            .fetch_optional(&self.db.pg)
            .await?;

        match author_id {
            None => Err(AppError::NotFound(format!("Post {} not found", post_id))),
            Some(author) if author != requester_id => Err(AppError::Forbidden),
            Some(_) => {
                sqlx::query("DELETE FROM posts WHERE id = $1")
                    .bind(post_id)
                    .execute(&self.db.pg)
                    .await?;
                tracing::info!(post_id = %post_id, "Post deleted");
                Ok(())
            }
        }
    }

    /// Comments oldest first.
    pub async fn comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let comments: Vec<Comment> = sqlx::query_as(
            r#"
            SELECT c.id, c.post_id, c.author_id, u.username AS author_username, c.content, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(comments)
    }

    pub async fn add_comment(&self, author_id: Uuid, post_id: Uuid, content: &str) -> Result<Comment> {
        let mut tx = self.db.pg.begin().await?;

        let updated = sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }

        let comment: Comment = sqlx::query_as(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, author_id, content)
                VALUES ($1, $2, $3)
                RETURNING id, post_id, author_id, content, created_at
            )
            SELECT i.id, i.post_id, i.author_id, u.username AS author_username, i.content, i.created_at
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(comment)
    }

    /// Like a post. Liking twice is a no-op; the like row and the counter
    /// change together or not at all.
    pub async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeState> {
        let mut tx = self.db.pg.begin().await?;

        // Row lock serialises concurrent likes on the same post.
        let current: Option<i32> =
            sqlx::query_scalar("SELECT like_count FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
        let mut like_count =
            current.ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

        let inserted = sqlx::query(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) ON CONFLICT (user_id, post_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() > 0 {
            like_count = sqlx::query_scalar(
                "UPDATE posts SET like_count = like_count + 1 WHERE id = $1 RETURNING like_count",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(LikeState {
            post_id,
            liked: true,
            like_count,
        })
    }

    pub async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeState> {
        let mut tx = self.db.pg.begin().await?;

        let current: Option<i32> =
            sqlx::query_scalar("SELECT like_count FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
        let mut like_count =
            current.ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

        let deleted = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() > 0 {
            like_count = sqlx::query_scalar(
                "UPDATE posts SET like_count = GREATEST(like_count - 1, 0) WHERE id = $1 RETURNING like_count",
            )
            .bind(post_id)
            .fetch_one(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(LikeState {
            post_id,
            liked: false,
            like_count,
        })
    }
}
