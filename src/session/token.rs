//! In-memory access token holder with change subscriptions

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

/// Short-lived bearer credential, never persisted
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Token with an optional expiry instant
    pub fn new(secret: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// Token valid for `validity` from now
    pub fn with_validity(secret: impl Into<String>, validity: Option<Duration>) -> Self {
        let expires_at = validity
            .and_then(|v| chrono::Duration::from_std(v).ok())
            .map(|v| Utc::now() + v);
        Self::new(secret, expires_at)
    }

    /// The raw token string
    pub fn as_str(&self) -> &str {
        &self.secret
    }

    /// When the token stops being valid, if known
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the known expiry has passed
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Utc::now())
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.secret)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

type Listener = Arc<dyn Fn(Option<&AccessToken>) + Send + Sync>;

#[derive(Default)]
struct Shared {
    current: RwLock<Option<AccessToken>>,
    listeners: Mutex<BTreeMap<u64, Listener>>,
    next_id: AtomicU64,
    // Held across write and notification so subscribers see sets in write order
    delivery: Mutex<()>,
}

impl Shared {
    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

/// Holds the current access token and notifies subscribers on change
///
/// All operations are synchronous and infallible. Cloning yields a handle to
/// the same token.
#[derive(Clone, Default)]
pub struct TokenStore {
    shared: Arc<Shared>,
}

impl TokenStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token, if any
    pub fn get(&self) -> Option<AccessToken> {
        self.shared
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the token and notify every subscriber before returning
    ///
    /// Concurrent calls are serialized, so the last value each subscriber
    /// receives is the value [`get`](Self::get) returns. Callbacks may read the
    /// store and subscribe or unsubscribe but must not call `set` themselves.
    pub fn set(&self, token: Option<AccessToken>) {
        let _delivery = self
            .shared
            .delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        *self
            .shared
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token.clone();

        // Snapshot so callbacks may subscribe, unsubscribe or read the store
        let listeners: Vec<Listener> = self
            .shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        for listener in listeners {
            listener(token.as_ref());
        }
    }

    /// Register a callback; it is invoked immediately with the current value
    /// and then on every [`set`](Self::set)
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&AccessToken>) + Send + Sync + 'static,
    {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let listener: Listener = Arc::new(callback);

        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&listener));

        listener(self.get().as_ref());

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn clear_subscribers(&self) {
        self.shared
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("current", &self.get())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle returned by [`TokenStore::subscribe`]; unsubscribes when dropped
#[must_use = "dropping a Subscription unsubscribes its callback"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Stop receiving notifications
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.id);
        }
    }
}
