use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

/// The authenticated caller, inserted into request extensions by
/// [`require_session`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub session_id: String,
}

/// Session id from the session cookie, falling back to a bearer token.
pub fn session_id_from_request(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

pub async fn resolve_current_user(state: &AppState, headers: &HeaderMap) -> Result<Option<CurrentUser>, AppError> {
    let Some(session_id) = session_id_from_request(headers, &state.config.session.cookie_name) else {
        return Ok(None);
    };

    Ok(state
        .sessions
        .resolve(&session_id)
        .await?
        .map(|id| CurrentUser { id, session_id }))
}

pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let current_user = resolve_current_user(&state, request.headers())
        .await?
        .ok_or(AppError::Unauthorized)?;

    tracing::debug!(user_id = %current_user.id, "Session resolved");
    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}
