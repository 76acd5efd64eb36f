use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::Deserialize;

use super::trading::parse_symbol;
use crate::error::{AppError, Result};
use crate::middleware::CurrentUser;
use crate::services::{WatchlistItem, WatchlistService};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_watchlist).post(add_symbol))
        .route("/:symbol", delete(remove_symbol))
}

#[derive(Debug, Deserialize)]
pub struct AddSymbolRequest {
    pub symbol: String,
}

async fn list_watchlist(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<Vec<WatchlistItem>>> {
    Ok(Json(
        WatchlistService::new(state.db.clone())
            .list(current_user.id)
            .await?,
    ))
}

async fn add_symbol(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<AddSymbolRequest>,
) -> Result<(StatusCode, Json<WatchlistItem>)> {
    let symbol = parse_symbol(&payload.symbol)?;

    let item = WatchlistService::new(state.db.clone())
        .add(current_user.id, &symbol)
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

async fn remove_symbol(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(symbol): Path<String>,
) -> Result<StatusCode> {
    let symbol = parse_symbol(&symbol)?;

    let removed = WatchlistService::new(state.db.clone())
        .remove(current_user.id, &symbol)
        .await?;

    if !removed {
        return Err(AppError::NotFound(format!("{} is not on your watchlist", symbol)));
    }
    Ok(StatusCode::NO_CONTENT)
}
