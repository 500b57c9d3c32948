//! Session state: access token, refresh coordination and renewal
//!
//! A [`SessionManager`] is an explicitly constructed object. It owns the
//! in-memory [`TokenStore`], the [`RefreshCoordinator`], the
//! [`RenewalScheduler`] and a handle to durable [`CredentialStore`] storage.
//! Clones share the same session.

pub mod refresh;
pub mod scheduler;
pub mod token;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use crate::auth::CredentialStore;
use crate::error::Result;

pub use refresh::{RefreshCoordinator, TokenGrant, validity_from_expires_in};
pub use scheduler::{DEFAULT_REFRESH_MARGIN, RenewalScheduler};
pub use token::{AccessToken, Subscription, TokenStore};

/// Tunables for token renewal and request replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Renew this long before the access token expires
    pub refresh_margin: Duration,
    /// Replays allowed per request after a successful refresh
    pub max_auth_retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            max_auth_retries: 1,
        }
    }
}

pub(crate) struct Inner {
    pub(crate) tokens: TokenStore,
    pub(crate) credentials: Arc<dyn CredentialStore>,
    pub(crate) coordinator: RefreshCoordinator,
    pub(crate) scheduler: RenewalScheduler,
    pub(crate) config: SessionConfig,
    /// Bumped by login, logout and dispose; a refresh started under an older
    /// generation must not publish its result
    pub(crate) generation: Mutex<u64>,
}

/// Handle to one authenticated session
#[derive(Clone)]
pub struct SessionManager {
    pub(crate) inner: Arc<Inner>,
}

impl SessionManager {
    /// New logged-out session refreshing against `{base_url}/auth/refresh`
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        http: reqwest::Client,
        base_url: &str,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tokens: TokenStore::new(),
                credentials,
                coordinator: RefreshCoordinator::new(http, base_url),
                scheduler: RenewalScheduler::new(config.refresh_margin),
                config,
                generation: Mutex::new(0),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.inner
            .generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn generation(&self) -> u64 {
        *self.lock_generation()
    }

    /// Restore the session from a stored refresh token
    ///
    /// Returns whether an access token is held afterwards. A failed restore
    /// leaves the session logged out rather than returning an error.
    pub async fn init(&self) -> bool {
        match self.inner.credentials.refresh_token() {
            Ok(Some(_)) => {}
            Ok(None) => return false,
            Err(err) => {
                tracing::warn!(error = %err, "Could not read stored refresh token");
                return false;
            }
        }

        match self.refresh().await {
            Ok(_) => {
                tracing::info!("Session restored");
                true
            }
            Err(err) => {
                tracing::info!(error = %err, "Stored session is no longer valid");
                if let Err(e) = self.logout() {
                    tracing::warn!(error = %e, "Failed to clear stored session");
                }
                false
            }
        }
    }

    /// Adopt tokens issued by a login
    ///
    /// Supersedes any refresh still in flight.
    pub fn establish(&self, grant: &TokenGrant) -> Result<AccessToken> {
        {
            let mut generation = self.lock_generation();
            *generation += 1;
            self.inner
                .credentials
                .set_refresh_token(&grant.refresh_token)?;
        }
        Ok(self.publish(grant))
    }

    /// Forget the session locally: access token, timer and refresh token
    ///
    /// A refresh still in flight is discarded when it completes.
    pub fn logout(&self) -> Result<()> {
        let deleted = {
            let mut generation = self.lock_generation();
            *generation += 1;
            self.inner.credentials.delete_refresh_token()
        };
        self.clear_local();
        deleted?;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Stop background work and drop subscribers; durable state is kept
    pub fn dispose(&self) {
        *self.lock_generation() += 1;
        self.inner.scheduler.cancel();
        self.inner.tokens.clear_subscribers();
    }

    /// Clear the in-memory token and any pending renewal
    pub(crate) fn clear_local(&self) {
        self.inner.scheduler.cancel();
        if self.inner.tokens.get().is_some() {
            self.inner.tokens.set(None);
        }
    }

    /// Current access token
    pub fn access_token(&self) -> Option<AccessToken> {
        self.inner.tokens.get()
    }

    /// Whether an access token is held
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Watch access token changes
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&AccessToken>) + Send + Sync + 'static,
    {
        self.inner.tokens.subscribe(callback)
    }

    /// The in-memory token store
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    /// Durable refresh token storage
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.inner.credentials.as_ref()
    }

    /// The proactive renewal timer
    pub fn scheduler(&self) -> &RenewalScheduler {
        &self.inner.scheduler
    }

    /// Whether a refresh is in flight
    pub fn is_refreshing(&self) -> bool {
        self.inner.coordinator.is_refreshing()
    }

    /// Session tunables
    pub fn config(&self) -> SessionConfig {
        self.inner.config
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("tokens", &self.inner.tokens)
            .field("refreshing", &self.is_refreshing())
            .field("renewal_armed", &self.inner.scheduler.is_armed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;
    use crate::error::Error;

    fn session(store: MemoryStore) -> SessionManager {
        SessionManager::new(
            Arc::new(store),
            reqwest::Client::new(),
            "http://127.0.0.1:9",
            SessionConfig::default(),
        )
    }

    fn grant(access: &str, refresh: &str, expires_in: Option<u64>) -> TokenGrant {
        TokenGrant {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_in,
        }
    }

    #[tokio::test]
    async fn test_establish_stores_both_tokens() {
        let session = session(MemoryStore::new());

        session.establish(&grant("tok1", "rt1", Some(3600))).unwrap();

        assert_eq!(session.access_token().unwrap().as_str(), "tok1");
        assert_eq!(
            session.credentials().refresh_token().unwrap().as_deref(),
            Some("rt1")
        );
        assert!(session.scheduler().is_armed());
        assert!(session.scheduler().remaining().unwrap() <= Duration::from_secs(3540));
    }

    #[tokio::test]
    async fn test_establish_without_expiry_leaves_timer_idle() {
        let session = session(MemoryStore::new());
        session.establish(&grant("tok1", "rt1", None)).unwrap();
        assert!(!session.scheduler().is_armed());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let session = session(MemoryStore::new());
        session.establish(&grant("tok1", "rt1", Some(3600))).unwrap();

        session.logout().unwrap();

        assert!(!session.is_authenticated());
        assert!(!session.scheduler().is_armed());
        assert_eq!(session.credentials().refresh_token().unwrap(), None);
    }

    #[tokio::test]
    async fn test_refresh_without_token_fails_fast() {
        let session = session(MemoryStore::new());
        let err = session.refresh().await.unwrap_err();
        assert!(matches!(err, Error::NoRefreshToken));
        assert!(!session.is_refreshing());
    }

    #[tokio::test]
    async fn test_init_without_stored_token() {
        let session = session(MemoryStore::new());
        assert!(!session.init().await);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_dispose_drops_subscribers_but_keeps_credentials() {
        let session = session(MemoryStore::new());
        session.establish(&grant("tok1", "rt1", Some(3600))).unwrap();
        let _sub = session.subscribe(|_| {});

        session.dispose();

        assert_eq!(session.tokens().subscriber_count(), 0);
        assert!(!session.scheduler().is_armed());
        assert_eq!(
            session.credentials().refresh_token().unwrap().as_deref(),
            Some("rt1")
        );
    }

    #[tokio::test]
    async fn test_session_changes_advance_generation() {
        let session = session(MemoryStore::new());
        let start = session.generation();

        session.establish(&grant("tok1", "rt1", None)).unwrap();
        session.logout().unwrap();
        session.dispose();

        assert_eq!(session.generation(), start + 3);
    }
}
