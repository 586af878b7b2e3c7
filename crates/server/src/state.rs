//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::db::{PgSessionStore, SessionStore};
use crate::services::relay::{HttpRelay, LogRelay, Relay, RelayError};
use crate::shopify::{OAuthClient, ShopifyError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("relay setup failed: {0}")]
    Relay(#[from] RelayError),
    #[error("oauth client setup failed: {0}")]
    OAuth(#[from] ShopifyError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the session store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<dyn SessionStore>,
    relay: Arc<dyn Relay>,
    oauth: OAuthClient,
}

impl AppState {
    /// Create the application state over a `PostgreSQL` pool.
    ///
    /// Picks the HTTP relay when a relay URL is configured, the log-only
    /// relay otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the relay or OAuth client cannot be built.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, StateError> {
        let relay: Arc<dyn Relay> = match &config.relay.base_url {
            Some(base_url) => Arc::new(HttpRelay::new(base_url, &config.relay)?),
            None => Arc::new(LogRelay),
        };
        let store = Arc::new(PgSessionStore::new(pool));

        Self::from_parts(config, store, relay)
    }

    /// Create the application state from explicit store and relay
    /// implementations. Used by tests to swap in in-memory doubles.
    ///
    /// # Errors
    ///
    /// Returns an error if the OAuth client cannot be built.
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        relay: Arc<dyn Relay>,
    ) -> Result<Self, StateError> {
        let oauth = OAuthClient::new(&config.install.client_id, config.client_secret.clone())?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                relay,
                oauth,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn store(&self) -> &dyn SessionStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the backend relay.
    #[must_use]
    pub fn relay(&self) -> &dyn Relay {
        self.inner.relay.as_ref()
    }

    /// Get a reference to the Shopify OAuth client.
    #[must_use]
    pub fn oauth(&self) -> &OAuthClient {
        &self.inner.oauth
    }
}
