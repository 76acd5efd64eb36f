mod ai;
mod auth;
mod feed;
mod learning;
mod quizzes;
mod search;
mod trading;
mod users;
mod watchlist;

use axum::{middleware, Router};

use crate::middleware::require_session;
use crate::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/users", users::routes())
        .merge(trading::routes())
        .nest("/ai", ai::routes())
        .merge(feed::routes())
        .merge(learning::routes())
        .nest("/quiz", quizzes::routes())
        .nest("/watchlist", watchlist::routes())
        .route_layer(middleware::from_fn_with_state(state, require_session));

    Router::new()
        .nest("/auth", auth::routes())
        .nest("/search", search::routes())
        .merge(protected)
}

fn parse_id(raw: &str, what: &str) -> crate::error::Result<uuid::Uuid> {
    uuid::Uuid::parse_str(raw).map_err(|_| crate::error::AppError::BadRequest(format!("Invalid {} ID", what)))
}
