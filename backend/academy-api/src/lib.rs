pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::clients::{BrokerageClient, LlmProvider, OpenAiCompatibleProvider};
use crate::config::{Config, SessionBackend};
use crate::db::Database;
use crate::session::{MemorySessionStore, RedisSessionStore, SessionStore};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub sessions: Arc<dyn SessionStore>,
    pub brokerage: BrokerageClient,
    pub llm: Arc<dyn LlmProvider>,
}

impl AppState {
    /// Wire up upstream clients and the configured session store.
    pub async fn build(config: Config, db: Database) -> anyhow::Result<Self> {
        let ttl = Duration::from_secs(config.session.ttl_hours * 3600);
        let sessions: Arc<dyn SessionStore> = match config.session.backend {
            SessionBackend::Redis => Arc::new(RedisSessionStore::connect(&config.redis.url, ttl).await?),
            SessionBackend::Memory => {
                tracing::warn!("Using in-memory sessions; logins will not survive a restart");
                Arc::new(MemorySessionStore::new(ttl))
            }
        };

        let brokerage = BrokerageClient::new(&config.brokerage)?;
        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatibleProvider::new(&config.llm)?);

        Ok(Self {
            db,
            config,
            sessions,
            brokerage,
            llm,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes(state.clone()));

    if let Some(dir) = &state.config.server.static_dir {
        // Unknown paths fall through to the web client's entry point.
        let index = format!("{}/index.html", dir.trim_end_matches('/'));
        app = app.fallback_service(ServeDir::new(dir).not_found_service(ServeFile::new(index)));
    }

    app.layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
