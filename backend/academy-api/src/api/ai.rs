use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::clients::ChatMessage;
use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::services::{AiService, Audience, AuthService, StockAnalysis};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chat", post(chat))
        .route("/analyze", post(analyze))
        .route("/explain", post(explain))
        .route("/advisor", post(advisor))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 4000))]
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub symbol: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExplainRequest {
    #[validate(length(min = 1, max = 200))]
    pub term: String,
    #[serde(default)]
    pub level: Audience,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdvisorRequest {
    #[validate(length(min = 1, max = 4000))]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct AiReply {
    pub reply: String,
    pub model: String,
}

fn reply(state: &AppState, text: String) -> Json<AiReply> {
    Json(AiReply {
        reply: text,
        model: state.llm.model().to_string(),
    })
}

async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<AiReply>> {
    payload.validate()?;

    let text = AiService::new(state.llm.clone())
        .chat(payload.message.trim(), &payload.history)
        .await?;

    Ok(reply(&state, text))
}

/// Live quote data is folded into the prompt when the user has connected
/// a brokerage account; otherwise the model works from the symbol alone.
async fn analyze(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<StockAnalysis>> {
    let symbol = super::trading::parse_symbol(&payload.symbol)?;

    let user = AuthService::new(state.db.clone())
        .find_user(current_user.id)
        .await?;

    let quote = match user.brokerage_credentials() {
        Some(creds) => match state.brokerage.latest_quote(&creds, &symbol).await {
            Ok(quote) => Some(quote),
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Quote lookup failed, analyzing without it");
                None
            }
        },
        None => None,
    };

    let analysis = AiService::new(state.llm.clone())
        .analyze(&symbol, quote.as_ref())
        .await?;

    Ok(Json(analysis))
}

async fn explain(
    State(state): State<AppState>,
    Json(payload): Json<ExplainRequest>,
) -> Result<Json<AiReply>> {
    payload.validate()?;

    let text = AiService::new(state.llm.clone())
        .explain(payload.term.trim(), payload.level)
        .await?;

    Ok(reply(&state, text))
}

async fn advisor(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(payload): Json<AdvisorRequest>,
) -> Result<Json<AiReply>> {
    payload.validate()?;

    let user = AuthService::new(state.db.clone())
        .find_user(current_user.id)
        .await?;

    let positions = match user.brokerage_credentials() {
        Some(creds) => match state.brokerage.positions(&creds).await {
            Ok(positions) => Some(positions),
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Position lookup failed, advising without portfolio");
                None
            }
        },
        None => None,
    };

    let text = AiService::new(state.llm.clone())
        .advise(payload.question.trim(), positions.as_deref())
        .await?;

    Ok(reply(&state, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explain_level_defaults_to_beginner() {
        let request: ExplainRequest = serde_json::from_str(r#"{"term":"short selling"}"#).unwrap();
        assert_eq!(request.level, Audience::Beginner);

        let request: ExplainRequest =
            serde_json::from_str(r#"{"term":"theta","level":"advanced"}"#).unwrap();
        assert_eq!(request.level, Audience::Advanced);
    }

    #[test]
    fn chat_requires_a_message() {
        let request: ChatRequest = serde_json::from_str(r#"{"message":""}"#).unwrap();
        assert!(request.validate().is_err());
        assert!(request.history.is_empty());
    }
}
