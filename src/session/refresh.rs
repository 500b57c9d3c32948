//! Single-flight access token refresh
//!
//! At most one `POST /auth/refresh` is in flight per session. Callers that
//! arrive while it runs join the waiter set of the [`PendingRefresh`] and all
//! receive the same outcome. The network exchange runs on its own task so a
//! caller that gives up waiting cannot strand the others.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::{Error, Result, parse_error_body};

use super::SessionManager;
use super::token::AccessToken;

/// `expires_in` values below this are seconds, values at or above are milliseconds
pub const EXPIRES_IN_MILLIS_THRESHOLD: u64 = 10_000;

/// Interpret a server-supplied `expires_in`
pub const fn validity_from_expires_in(expires_in: u64) -> Duration {
    if expires_in < EXPIRES_IN_MILLIS_THRESHOLD {
        Duration::from_secs(expires_in)
    } else {
        Duration::from_millis(expires_in)
    }
}

/// Tokens issued by `/auth/login` or `/auth/refresh`
#[derive(Clone, Deserialize)]
pub struct TokenGrant {
    /// New access token
    pub access_token: String,
    /// Rotated refresh token
    pub refresh_token: String,
    /// Validity of the access token (seconds, or milliseconds when large)
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenGrant {
    /// Validity of the access token, if the server supplied one
    pub fn validity(&self) -> Option<Duration> {
        self.expires_in.map(validity_from_expires_in)
    }
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

type Waiter = oneshot::Sender<Result<AccessToken>>;

/// A refresh in flight and the callers waiting on it
#[derive(Default)]
struct PendingRefresh {
    waiters: Vec<Waiter>,
}

/// How a caller entered the coordinator
enum Ticket {
    /// First caller: must start the exchange
    Leader(String, oneshot::Receiver<Result<AccessToken>>),
    /// A refresh was already running
    Follower(oneshot::Receiver<Result<AccessToken>>),
}

/// Owns the refresh endpoint and the process-wide pending marker
pub struct RefreshCoordinator {
    http: reqwest::Client,
    url: String,
    pending: Mutex<Option<PendingRefresh>>,
}

impl RefreshCoordinator {
    /// Coordinator posting to `{base_url}/auth/refresh`
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            url: format!("{}/auth/refresh", base_url.trim_end_matches('/')),
            pending: Mutex::new(None),
        }
    }

    /// Whether a refresh is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PendingRefresh>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Join the pending refresh, or claim it if none exists
    ///
    /// The check and the claim happen under one lock with no await in between.
    fn enter(&self, read_refresh_token: impl FnOnce() -> Result<Option<String>>) -> Result<Ticket> {
        let mut pending = self.lock();
        let (tx, rx) = oneshot::channel();

        if let Some(in_flight) = pending.as_mut() {
            in_flight.waiters.push(tx);
            return Ok(Ticket::Follower(rx));
        }

        let Some(refresh_token) = read_refresh_token()? else {
            return Err(Error::NoRefreshToken);
        };

        *pending = Some(PendingRefresh { waiters: vec![tx] });
        Ok(Ticket::Leader(refresh_token, rx))
    }

    /// Drop the pending marker and deliver `outcome` to every waiter
    fn settle(&self, outcome: &Result<AccessToken>) -> usize {
        let waiters = self.lock().take().map(|p| p.waiters).unwrap_or_default();
        let count = waiters.len();

        for waiter in waiters {
            // A waiter that stopped listening is fine to skip
            let _ = waiter.send(outcome.clone());
        }

        count
    }

    /// Exchange a refresh token for a new grant
    async fn exchange(&self, refresh_token: &str) -> Result<TokenGrant> {
        tracing::debug!(url = %self.url, "Requesting token refresh");

        let response = self
            .http
            .post(&self.url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (_, message) = parse_error_body(status, &body);
            return Err(Error::RefreshRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

impl SessionManager {
    /// Obtain a new access token using the stored refresh token
    ///
    /// Joins an in-flight refresh if there is one. Fails with
    /// [`Error::NoRefreshToken`] without any network I/O when nothing is
    /// stored. Any failure logs the session out before it is returned, unless a
    /// logout, login or dispose already replaced the session.
    pub async fn refresh(&self) -> Result<AccessToken> {
        // Read before the stored token so a logout in between is noticed later
        let generation = self.generation();
        let ticket = self
            .inner
            .coordinator
            .enter(|| self.inner.credentials.refresh_token());

        let rx = match ticket {
            Ok(Ticket::Follower(rx)) => {
                tracing::debug!("Refresh already in flight, waiting");
                rx
            }
            Ok(Ticket::Leader(refresh_token, rx)) => {
                let session = self.clone();
                tokio::spawn(async move {
                    session.run_refresh(refresh_token, generation).await;
                });
                rx
            }
            Err(err) => {
                tracing::info!(error = %err, "Cannot refresh session");
                self.clear_local();
                return Err(err);
            }
        };

        rx.await.unwrap_or(Err(Error::Interrupted))
    }

    async fn run_refresh(self, refresh_token: String, generation: u64) {
        let outcome = match self.inner.coordinator.exchange(&refresh_token).await {
            Ok(grant) => self.apply_refreshed(&grant, generation),
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(_) => tracing::info!("Access token refreshed"),
            Err(err) if self.generation() != generation => {
                tracing::debug!(error = %err, "Session changed during refresh, outcome discarded");
            }
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh failed, clearing session");
                self.clear_local();
                if let Err(e) = self.inner.credentials.delete_refresh_token() {
                    tracing::error!(error = %e, "Failed to delete refresh token");
                }
            }
        }

        let waiters = self.inner.coordinator.settle(&outcome);
        tracing::debug!(waiters, "Refresh outcome delivered");
    }

    /// Adopt a refreshed grant unless the session moved on since `generation`
    ///
    /// Durable write, then in-memory token, then timer. Waiters are resolved
    /// only after this returns. A logout, login or dispose that lands while
    /// this runs wins: the new access token is withdrawn and the call fails
    /// with [`Error::NoRefreshToken`].
    fn apply_refreshed(&self, grant: &TokenGrant, generation: u64) -> Result<AccessToken> {
        {
            let current = self.lock_generation();
            if *current != generation {
                return Err(Error::NoRefreshToken);
            }
            self.inner
                .credentials
                .set_refresh_token(&grant.refresh_token)?;
        }

        let token = self.publish(grant);

        if self.generation() != generation {
            self.withdraw(&token);
            return Err(Error::NoRefreshToken);
        }
        Ok(token)
    }

    /// Publish the access token of `grant` and re-arm renewal
    pub(crate) fn publish(&self, grant: &TokenGrant) -> AccessToken {
        let validity = grant.validity();
        let token = AccessToken::with_validity(grant.access_token.clone(), validity);
        self.inner.tokens.set(Some(token.clone()));

        match validity {
            Some(validity) => self.arm_renewal(validity),
            None => self.inner.scheduler.cancel(),
        }

        token
    }

    /// Undo [`publish`](Self::publish) if `token` is still the current one
    fn withdraw(&self, token: &AccessToken) {
        if self.inner.tokens.get().as_ref() == Some(token) {
            self.clear_local();
        }
    }

    fn arm_renewal(&self, validity: Duration) {
        let weak = self.downgrade();
        self.inner.scheduler.arm(validity, async move {
            let Some(session) = SessionManager::upgrade(&weak) else {
                return;
            };
            if let Err(err) = session.refresh().await {
                tracing::warn!(error = %err, "Scheduled token renewal failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_in_units() {
        assert_eq!(validity_from_expires_in(3600), Duration::from_secs(3600));
        assert_eq!(validity_from_expires_in(9_999), Duration::from_secs(9_999));
        assert_eq!(
            validity_from_expires_in(900_000),
            Duration::from_secs(900)
        );
    }

    #[test]
    fn test_grant_parses_optional_expiry() {
        let grant: TokenGrant =
            serde_json::from_str(r#"{"access_token":"a","refresh_token":"r"}"#).unwrap();
        assert!(grant.validity().is_none());

        let grant: TokenGrant = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600}"#,
        )
        .unwrap();
        assert_eq!(grant.validity(), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn test_second_caller_joins_pending_refresh() {
        let coordinator = RefreshCoordinator::new(reqwest::Client::new(), "http://localhost");

        let first = coordinator
            .enter(|| Ok(Some("rt".to_string())))
            .unwrap();
        assert!(matches!(first, Ticket::Leader(ref rt, _) if rt == "rt"));
        assert!(coordinator.is_refreshing());

        // The store is not consulted once a refresh is pending
        let second = coordinator
            .enter(|| panic!("refresh token read while refresh pending"))
            .unwrap();
        assert!(matches!(second, Ticket::Follower(_)));

        let token = AccessToken::new("tok2", None);
        assert_eq!(coordinator.settle(&Ok(token)), 2);
        assert!(!coordinator.is_refreshing());

        for ticket in [first, second] {
            let mut rx = match ticket {
                Ticket::Leader(_, rx) | Ticket::Follower(rx) => rx,
            };
            assert_eq!(rx.try_recv().unwrap().unwrap().as_str(), "tok2");
        }
    }

    #[test]
    fn test_missing_refresh_token_does_not_claim() {
        let coordinator = RefreshCoordinator::new(reqwest::Client::new(), "http://localhost");
        let result = coordinator.enter(|| Ok(None));
        assert!(matches!(result, Err(Error::NoRefreshToken)));
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_failure_reaches_every_waiter() {
        let coordinator = RefreshCoordinator::new(reqwest::Client::new(), "http://localhost");
        let mut receivers = Vec::new();
        for _ in 0..3 {
            match coordinator.enter(|| Ok(Some("rt".into()))).unwrap() {
                Ticket::Leader(_, rx) | Ticket::Follower(rx) => receivers.push(rx),
            }
        }

        let outcome = Err(Error::RefreshRejected {
            status: 401,
            message: "revoked".into(),
        });
        assert_eq!(coordinator.settle(&outcome), 3);

        for mut rx in receivers {
            assert!(matches!(
                rx.try_recv().unwrap(),
                Err(Error::RefreshRejected { status: 401, .. })
            ));
        }
    }
}
