use axum::{extract::Query, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::domain::ticker_search::{search, SearchHit, SearchOrder, CATALOG};
use crate::AppState;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(search_tickers))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub sort: SearchOrder,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

/// Public: the landing page searches before anyone signs in.
async fn search_tickers(Query(query): Query<SearchQuery>) -> Json<SearchResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let results = search(CATALOG, &query.q, query.sort, limit);

    Json(SearchResponse {
        query: query.q,
        results,
    })
}
