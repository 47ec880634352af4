//! Session registry.
//!
//! Maps an opaque per-user session token to exactly one live pool. The map is
//! the only shared mutable state in the engine; pools are always opened and
//! closed outside the lock.

use crate::config::PoolOptions;
use crate::db::pool::{DbPool, create_pool};
use crate::error::{DbError, DbResult};
use crate::models::{ConnectRequest, SessionInfo, mask_connection_url};
use sha2::{Digest, Sha512};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct SessionEntry {
    pool: DbPool,
    info: SessionInfo,
}

#[derive(Debug, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    pool_options: PoolOptions,
}

impl SessionRegistry {
    /// Create a new registry with default pool options.
    pub fn new() -> Self {
        Self::with_pool_options(PoolOptions::default())
    }

    pub fn with_pool_options(pool_options: PoolOptions) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            pool_options,
        }
    }

    /// Open a pool, verify it with a round trip and register it under a
    /// freshly minted token.
    ///
    /// On failure nothing is registered and any opened pool is closed.
    pub async fn connect(&self, request: ConnectRequest) -> DbResult<SessionInfo> {
        let (pool, mut info) = self.open(&request).await?;
        info.token = mint_token();

        // If the token is somehow taken, hand the pool back so it can be
        // closed outside the lock.
        let collision: Option<DbPool> = {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&info.token) {
                Some(pool)
            } else {
                sessions.insert(
                    info.token.clone(),
                    SessionEntry {
                        pool,
                        info: info.clone(),
                    },
                );
                None
            }
        };

        if let Some(pool) = collision {
            pool.close().await;
            return Err(DbError::internal("Session token collision"));
        }

        info!(db_type = %info.database_type, "Succeed: Connected DB");
        Ok(info)
    }

    /// Reconnect an existing session to a new target, closing the previous
    /// pool. The token stays the same.
    pub async fn replace(&self, token: &str, request: ConnectRequest) -> DbResult<SessionInfo> {
        if !self.contains(token).await {
            return Err(DbError::NoActiveConnection);
        }

        let (pool, mut info) = self.open(&request).await?;
        info.token = token.to_string();

        // The session may have been disposed while we were connecting.
        let (old, orphan): (Option<DbPool>, Option<DbPool>) = {
            let mut sessions = self.sessions.write().await;
            match sessions.get_mut(token) {
                Some(entry) => {
                    let old = std::mem::replace(&mut entry.pool, pool);
                    entry.info = info.clone();
                    (Some(old), None)
                }
                None => (None, Some(pool)),
            }
        };

        if let Some(pool) = orphan {
            pool.close().await;
            return Err(DbError::NoActiveConnection);
        }
        if let Some(old) = old {
            old.close().await;
        }

        info!(db_type = %info.database_type, "Session reconnected");
        Ok(info)
    }

    /// Close and remove the pool for `token`.
    ///
    /// Unknown or already-disposed tokens fail with `NoActiveConnection`.
    pub async fn dispose(&self, token: &str) -> DbResult<()> {
        let entry = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(token)
        };

        match entry {
            Some(entry) => {
                entry.pool.close().await;
                info!(db_type = %entry.info.database_type, "Succeed: Disposed DB");
                Ok(())
            }
            None => Err(DbError::NoActiveConnection),
        }
    }

    /// Look up the pool for a token.
    pub async fn resolve(&self, token: &str) -> Option<DbPool> {
        let sessions = self.sessions.read().await;
        sessions.get(token).map(|entry| entry.pool.clone())
    }

    /// Like [`resolve`](Self::resolve) but failing with `NoActiveConnection`.
    pub async fn require(&self, token: &str) -> DbResult<DbPool> {
        self.resolve(token).await.ok_or(DbError::NoActiveConnection)
    }

    pub async fn info(&self, token: &str) -> Option<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.get(token).map(|entry| entry.info.clone())
    }

    pub async fn contains(&self, token: &str) -> bool {
        let sessions = self.sessions.read().await;
        sessions.contains_key(token)
    }

    /// Get the number of live sessions.
    pub async fn session_count(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions.len()
    }

    /// Close every session.
    pub async fn dispose_all(&self) {
        let drained: Vec<SessionEntry> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, entry)| entry).collect()
        };
        for entry in drained {
            entry.pool.close().await;
        }
        info!("All sessions closed");
    }

    async fn open(&self, request: &ConnectRequest) -> DbResult<(DbPool, SessionInfo)> {
        let (url, db_type) = request.resolve()?;
        debug!(url = %mask_connection_url(&url), db_type = %db_type, "Connecting to database");

        let pool = create_pool(&url, db_type, &self.pool_options).await?;
        if let Err(e) = pool.ping().await {
            warn!(error = %e, "Connectivity check failed");
            pool.close().await;
            return Err(e);
        }
        let server_version = pool.server_version().await;

        let info = SessionInfo {
            token: String::new(),
            database_type: db_type,
            server_version,
            connected_at: chrono::Utc::now(),
        };
        Ok((pool, info))
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Mint a session token: a nanosecond timestamp salted with three random
/// UUIDs, SHA-512 hashed and hex encoded.
pub fn mint_token() -> String {
    let nanos = chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default();
    let salt = format!(
        "{}_{}_{}_{}",
        nanos,
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );

    let mut hasher = Sha512::new();
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_token_shape() {
        let token = mint_token();
        assert_eq!(token.len(), 128);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, mint_token());
    }

    #[tokio::test]
    async fn test_registry_starts_empty() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.session_count().await, 0);
        assert!(registry.resolve("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_dispose_unknown_token() {
        let registry = SessionRegistry::new();
        let err = registry.dispose("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NoActiveConnection));
    }

    #[tokio::test]
    async fn test_blank_url_registers_nothing() {
        let registry = SessionRegistry::new();
        let err = registry.connect(ConnectRequest::url("")).await.unwrap_err();
        assert_eq!(err.to_string(), "Required DB URL");
        assert_eq!(registry.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_memory_session_lifecycle() {
        let registry = SessionRegistry::new();
        let info = registry
            .connect(ConnectRequest::url("sqlite::memory:"))
            .await
            .unwrap();
        assert!(registry.resolve(&info.token).await.is_some());
        assert_eq!(registry.session_count().await, 1);

        registry.dispose(&info.token).await.unwrap();
        assert!(registry.resolve(&info.token).await.is_none());
        assert!(matches!(
            registry.dispose(&info.token).await,
            Err(DbError::NoActiveConnection)
        ));
    }
}
