use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::UserProfile;
use crate::services::AuthService;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/me/brokerage-keys", put(set_brokerage_keys))
}

#[derive(Debug, Deserialize, Validate)]
pub struct BrokerageKeysRequest {
    #[validate(length(min = 1, max = 128))]
    pub key_id: String,
    #[validate(length(min = 1, max = 256))]
    pub secret_key: String,
}

async fn get_me(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<UserProfile>> {
    let user = AuthService::new(state.db.clone())
        .find_user(current_user.id)
        .await?;

    Ok(Json(user.profile(state.config.rewards.xp_per_level)))
}

async fn set_brokerage_keys(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<BrokerageKeysRequest>,
) -> Result<Json<UserProfile>> {
    payload.validate()?;

    let user = AuthService::new(state.db.clone())
        .set_brokerage_keys(current_user.id, payload.key_id.trim(), payload.secret_key.trim())
        .await?;

    Ok(Json(user.profile(state.config.rewards.xp_per_level)))
}
