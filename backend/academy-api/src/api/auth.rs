use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::middleware::{resolve_current_user, session_id_from_request};
use crate::models::UserProfile;
use crate::services::{AuthService, NewAccount};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

impl RegisterRequest {
    /// Surrounding whitespace is not part of a username or email.
    fn trimmed(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            ..self
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    /// Same value as the session cookie, for clients that cannot use cookies.
    pub session_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

fn session_cookie(config: &SessionConfig, session_id: String) -> Cookie<'static> {
    Cookie::build((config.cookie_name.clone(), session_id))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookie)
        .same_site(SameSite::Lax)
        .build()
}

async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let payload = payload.trimmed();
    payload.validate()?;

    let auth_service = AuthService::new(state.db.clone());
    let user = auth_service
        .register(NewAccount {
            username: &payload.username,
            email: &payload.email,
            password: &payload.password,
        })
        .await?;

    let session_id = state.sessions.create(user.id).await?;
    let jar = jar.add(session_cookie(&state.config.session, session_id.clone()));

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            user: user.profile(state.config.rewards.xp_per_level),
            session_token: session_id,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>)> {
    payload.validate()?;

    let auth_service = AuthService::new(state.db.clone());
    let user = auth_service
        .authenticate(payload.username.trim(), &payload.password)
        .await
        .map_err(|e| {
            tracing::info!(username = %payload.username, "Failed login attempt");
            e
        })?;

    let session_id = state.sessions.create(user.id).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    let jar = jar.add(session_cookie(&state.config.session, session_id.clone()));

    Ok((
        jar,
        Json(AuthResponse {
            user: user.profile(state.config.rewards.xp_per_level),
            session_token: session_id,
        }),
    ))
}

async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Json<serde_json::Value>)> {
    if let Some(session_id) = session_id_from_request(&headers, &state.config.session.cookie_name) {
        state.sessions.revoke(&session_id).await?;
    }

    let jar = jar.remove(Cookie::build((state.config.session.cookie_name.clone(), "")).path("/"));

    Ok((jar, Json(serde_json::json!({ "message": "Logged out successfully" }))))
}

/// Never fails with 401: an unauthenticated caller just gets
/// `authenticated: false`.
async fn session(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<SessionResponse>> {
    let Some(current) = resolve_current_user(&state, &headers).await? else {
        return Ok(Json(SessionResponse {
            authenticated: false,
            user: None,
        }));
    };

    let auth_service = AuthService::new(state.db.clone());
    let user = match auth_service.find_user(current.id).await {
        Ok(user) => user,
        Err(crate::error::AppError::NotFound(_)) => {
            return Ok(Json(SessionResponse {
                authenticated: false,
                user: None,
            }))
        }
        Err(e) => return Err(e),
    };

    Ok(Json(SessionResponse {
        authenticated: true,
        user: Some(user.profile(state.config.rewards.xp_per_level)),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_validation() {
        let ok = RegisterRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "longenough".into(),
        };
        assert!(ok.validate().is_ok());

        let short_password = RegisterRequest {
            password: "short".into(),
            ..ok.clone()
        };
        assert!(short_password.validate().is_err());

        let bad_email = RegisterRequest {
            email: "not-an-email".into(),
            ..ok.clone()
        };
        assert!(bad_email.validate().is_err());

        let short_name = RegisterRequest {
            username: "al".into(),
            ..ok.clone()
        };
        assert!(short_name.validate().is_err());
    }

    #[test]
    fn padding_does_not_count_toward_username_length() {
        let padded = RegisterRequest {
            username: "  ab  ".into(),
            email: "ab@example.com".into(),
            password: "longenough".into(),
        };
        assert!(padded.validate().is_ok());

        let padded_email = RegisterRequest {
            email: " ab@example.com ".into(),
            ..padded.clone()
        }
        .trimmed();
        assert_eq!(padded_email.email, "ab@example.com");

        let trimmed = padded.trimmed();
        assert_eq!(trimmed.username, "ab");
        assert!(trimmed.validate().is_err());

        let fine = RegisterRequest {
            username: " alice ".into(),
            ..trimmed
        }
        .trimmed();
        assert!(fine.validate().is_ok());
    }

    #[test]
    fn session_cookie_is_http_only() {
        let config = SessionConfig {
            backend: crate::config::SessionBackend::Memory,
            cookie_name: "academy_sid".into(),
            ttl_hours: 1,
            secure_cookie: true,
        };
        let cookie = session_cookie(&config, "abc".into());
        assert_eq!(cookie.name(), "academy_sid");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }
}
