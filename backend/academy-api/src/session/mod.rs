//! Server-side login sessions.
//!
//! A session is an opaque random id mapped to a user id with a TTL. The id
//! is all the client holds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session for `user_id` and return its id.
    async fn create(&self, user_id: Uuid) -> Result<String>;

    /// Resolve a session id. Unknown or expired ids yield `None`.
    async fn resolve(&self, session_id: &str) -> Result<Option<Uuid>>;

    async fn revoke(&self, session_id: &str) -> Result<()>;
}

/// 256 random bits, hex encoded.
fn new_session_id() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

pub struct RedisSessionStore {
    conn: redis::aio::ConnectionManager,
    ttl: Duration,
}

impl RedisSessionStore {
    pub async fn connect(url: &str, ttl: Duration) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        tracing::info!("Redis session store connected");
        Ok(Self { conn, ttl })
    }

    fn key(session_id: &str) -> String {
        format!("session:{}", session_id)
    }
}

fn redis_error(e: redis::RedisError) -> AppError {
    AppError::Internal(anyhow::anyhow!("Session store error: {}", e))
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn create(&self, user_id: Uuid) -> Result<String> {
        let session_id = new_session_id();
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(Self::key(&session_id), user_id.to_string(), self.ttl.as_secs())
            .await
            .map_err(redis_error)?;
        Ok(session_id)
    }

    async fn resolve(&self, session_id: &str) -> Result<Option<Uuid>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(Self::key(session_id)).await.map_err(redis_error)?;
        Ok(value.and_then(|v| Uuid::parse_str(&v).ok()))
    }

    async fn revoke(&self, session_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(Self::key(session_id))
            .await
            .map_err(redis_error)?;
        Ok(())
    }
}

/// Process-local store; sessions die with the process.
#[derive(Clone)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, (Uuid, Instant)>>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user_id: Uuid) -> Result<String> {
        let session_id = new_session_id();
        let expires_at = Instant::now() + self.ttl;
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, (_, exp)| *exp > Instant::now());
        sessions.insert(session_id.clone(), (user_id, expires_at));
        Ok(session_id)
    }

    async fn resolve(&self, session_id: &str) -> Result<Option<Uuid>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .get(session_id)
            .filter(|(_, exp)| *exp > Instant::now())
            .map(|(user_id, _)| *user_id))
    }

    async fn revoke(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_resolve() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let user_id = Uuid::new_v4();
        let sid = store.create(user_id).await.unwrap();

        assert_eq!(store.resolve(&sid).await.unwrap(), Some(user_id));
        assert_eq!(store.resolve("not-a-session").await.unwrap(), None);
    }

    #[tokio::test]
    async fn revoked_session_no_longer_resolves() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let sid = store.create(Uuid::new_v4()).await.unwrap();
        store.revoke(&sid).await.unwrap();

        assert_eq!(store.resolve(&sid).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_session_does_not_resolve() {
        let store = MemorySessionStore::new(Duration::ZERO);
        let sid = store.create(Uuid::new_v4()).await.unwrap();

        assert_eq!(store.resolve(&sid).await.unwrap(), None);
    }

    #[tokio::test]
    async fn session_ids_are_unique() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        let user_id = Uuid::new_v4();
        let a = store.create(user_id).await.unwrap();
        let b = store.create(user_id).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn session_id_decodes_to_32_bytes() {
        let id = new_session_id();
        assert_eq!(id, id.to_lowercase());
        assert_eq!(hex::decode(&id).unwrap().len(), 32);
    }
}
