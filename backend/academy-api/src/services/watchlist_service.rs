// Watchlist service - symbols a user follows
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::Database;
use crate::error::Result;

pub struct WatchlistService {
    db: Database,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WatchlistItem {
    pub symbol: String,
    pub added_at: DateTime<Utc>,
}

impl WatchlistService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<WatchlistItem>> {
        let items: Vec<WatchlistItem> = sqlx::query_as(
            "SELECT symbol, added_at FROM watchlist_items WHERE user_id = $1 ORDER BY added_at ASC, symbol ASC",
        )
        .bind(user_id)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(items)
    }

    /// Adding a symbol twice keeps the original entry.
    pub async fn add(&self, user_id: Uuid, symbol: &str) -> Result<WatchlistItem> {
        let item: WatchlistItem = sqlx::query_as(
            r#"
            INSERT INTO watchlist_items (user_id, symbol)
            VALUES ($1, $2)
            ON CONFLICT (user_id, symbol) DO UPDATE SET symbol = EXCLUDED.symbol
            RETURNING symbol, added_at
            "#,
        )
        .bind(user_id)
        .bind(symbol)
        .fetch_one(&self.db.pg)
        .await?;

        Ok(item)
    }

    /// Returns whether the symbol was on the list.
    pub async fn remove(&self, user_id: Uuid, symbol: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM watchlist_items WHERE user_id = $1 AND symbol = $2")
            .bind(user_id)
            .bind(symbol)
            .execute(&self.db.pg)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
