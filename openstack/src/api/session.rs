//! Root authenticated session
//!
//! One session per configured provider. It owns the current token and
//! catalog; every `ServiceClient` reads the token from here, so a refresh is
//! visible to all clients at once.

use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::catalog::Catalog;
use super::error::ApiError;
use super::identity::{self, Token};
use super::pool::{ConnectionPoolConfig, ConnectionPoolManager};
use crate::config::Config;

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: Arc<Config>,
    http_client: reqwest::Client,
    token: RwLock<Option<Token>>,
    refresh: Mutex<()>,
}

impl Session {
    pub fn new(config: Arc<Config>) -> Result<Self, ApiError> {
        let pool_manager = ConnectionPoolManager::new(ConnectionPoolConfig::default());
        let http_client = pool_manager.build_client(&config)?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                http_client,
                token: RwLock::new(None),
                refresh: Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.inner.config
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.inner.http_client
    }

    pub fn allow_reauth(&self) -> bool {
        self.inner.config.allow_reauth
    }

    /// Authenticate now, replacing any current token
    pub async fn authenticate(&self) -> Result<Token, ApiError> {
        let _refresh = self.inner.refresh.lock().await;
        self.issue().await
    }

    async fn issue(&self) -> Result<Token, ApiError> {
        let token = identity::authenticate(&self.inner.http_client, &self.inner.config).await?;
        tracing::debug!("Obtained token expiring at {:?}", token.expires_at);
        *self.inner.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Current token, authenticating lazily on first use and refreshing an
    /// expired token when re-authentication is allowed
    pub async fn current(&self) -> Result<Token, ApiError> {
        if let Some(token) = self.usable_token().await {
            return Ok(token);
        }

        let _refresh = self.inner.refresh.lock().await;
        // Another task may have refreshed while we waited.
        if let Some(token) = self.usable_token().await {
            return Ok(token);
        }
        self.issue().await
    }

    async fn usable_token(&self) -> Option<Token> {
        let guard = self.inner.token.read().await;
        guard
            .as_ref()
            .filter(|t| !(self.allow_reauth() && t.is_expired()))
            .cloned()
    }

    pub async fn token_id(&self) -> Result<String, ApiError> {
        Ok(self.current().await?.id)
    }

    pub async fn catalog(&self) -> Result<Catalog, ApiError> {
        Ok(self.current().await?.catalog)
    }

    /// Replace `stale` with a fresh token. Concurrent callers holding the same
    /// stale token share a single identity round-trip.
    pub async fn reauthenticate(&self, stale: &str) -> Result<String, ApiError> {
        let _refresh = self.inner.refresh.lock().await;
        if let Some(current) = self.inner.token.read().await.as_ref() {
            if current.id != stale {
                return Ok(current.id.clone());
            }
        }
        tracing::debug!("Re-authenticating after token rejection");
        Ok(self.issue().await?.id)
    }
}
