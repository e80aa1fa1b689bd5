use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use redis::{aio::ConnectionManager, Client};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Server-side session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    /// Social auth backend used for the most recent login.
    pub last_login_backend: Option<String>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<Session>, AppError>;
    async fn save(
        &self,
        session_id: &str,
        session: &Session,
        ttl_seconds: u64,
    ) -> Result<(), AppError>;
    /// Extend the lifetime of an existing session.
    async fn touch(&self, session_id: &str, ttl_seconds: u64) -> Result<(), AppError>;
    async fn delete(&self, session_id: &str) -> Result<(), AppError>;
    async fn health_check(&self) -> Result<(), AppError>;
}

/// Random URL-safe session id.
pub fn new_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Start a session for a user that just completed a backend login.
pub async fn start_session(
    store: &dyn SessionStore,
    user_id: i64,
    backend: &str,
    ttl_seconds: u64,
) -> Result<String, AppError> {
    let session_id = new_session_id();
    let session = Session {
        user_id,
        last_login_backend: Some(backend.to_string()),
    };
    store.save(&session_id, &session, ttl_seconds).await?;
    tracing::info!(user_id, backend, "Session started");
    Ok(session_id)
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

#[derive(Clone)]
pub struct RedisSessionStore {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn new(config: &crate::config::RedisConfig) -> Result<Self, AppError> {
        tracing::info!(url = %config.url, "Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        // Use ConnectionManager for automatic reconnection
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            AppError::RedisError(e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn health_check(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        redis::cmd("PING").query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(session_key(session_id))
            .query_async(&mut conn)
            .await?;

        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|e| {
                AppError::InternalError(anyhow::anyhow!("Corrupt session {}: {}", session_id, e))
            })
        })
        .transpose()
    }

    async fn save(
        &self,
        session_id: &str,
        session: &Session,
        ttl_seconds: u64,
    ) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let value = serde_json::to_string(session)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;

        redis::cmd("SET")
            .arg(session_key(session_id))
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn touch(&self, session_id: &str, ttl_seconds: u64) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: bool = redis::cmd("EXPIRE")
            .arg(session_key(session_id))
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(session_key(session_id))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> AppError {
    AppError::InternalError(anyhow::anyhow!("Mock session mutex poisoned: {}", e))
}

/// In-memory session store. Records touches so tests can observe them.
pub struct MockSessionStore {
    pub sessions: std::sync::Mutex<std::collections::HashMap<String, Session>>,
    pub touched: std::sync::Mutex<Vec<String>>,
}

impl Default for MockSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSessionStore {
    pub fn new() -> Self {
        Self {
            sessions: std::sync::Mutex::new(std::collections::HashMap::new()),
            touched: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions
            .lock()
            .map(|s| s.contains_key(session_id))
            .unwrap_or(false)
    }

    pub fn was_touched(&self, session_id: &str) -> bool {
        self.touched
            .lock()
            .map(|t| t.iter().any(|id| id == session_id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let session = self
            .sessions
            .lock()
            .map_err(poisoned)?
            .get(session_id)
            .cloned();
        Ok(session)
    }

    async fn save(
        &self,
        session_id: &str,
        session: &Session,
        _ttl_seconds: u64,
    ) -> Result<(), AppError> {
        self.sessions
            .lock()
            .map_err(poisoned)?
            .insert(session_id.to_string(), session.clone());
        Ok(())
    }

    async fn touch(&self, session_id: &str, _ttl_seconds: u64) -> Result<(), AppError> {
        self.touched
            .lock()
            .map_err(poisoned)?
            .push(session_id.to_string());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), AppError> {
        self.sessions
            .lock()
            .map_err(poisoned)?
            .remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique_and_url_safe() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[tokio::test]
    async fn test_start_session_records_backend() {
        let store = MockSessionStore::new();
        let id = start_session(&store, 42, "google", 60).await.unwrap();

        let session = store.load(&id).await.unwrap().unwrap();
        assert_eq!(session.user_id, 42);
        assert_eq!(session.last_login_backend.as_deref(), Some("google"));

        store.delete(&id).await.unwrap();
        assert!(!store.contains(&id));
    }
}
