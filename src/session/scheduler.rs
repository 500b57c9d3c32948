//! Proactive access token renewal timer

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Renew this long before the token expires unless configured otherwise
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(60);

struct Armed {
    handle: JoinHandle<()>,
    fires_at: Instant,
}

/// Single-slot timer that fires a renewal shortly before token expiry
///
/// Arming always replaces the previous timer. Must be armed from within a
/// Tokio runtime.
pub struct RenewalScheduler {
    margin: Duration,
    slot: Mutex<Option<Armed>>,
}

impl RenewalScheduler {
    /// Scheduler that fires `margin` before expiry
    pub const fn new(margin: Duration) -> Self {
        Self {
            margin,
            slot: Mutex::new(None),
        }
    }

    /// Safety margin before expiry
    pub const fn margin(&self) -> Duration {
        self.margin
    }

    /// Delay until firing for a token valid for `validity`, floored at zero
    pub const fn delay_for(&self, validity: Duration) -> Duration {
        validity.saturating_sub(self.margin)
    }

    /// Cancel any pending renewal and schedule `on_fire` ahead of expiry
    ///
    /// Returns the delay until firing.
    pub fn arm<F>(&self, validity: Duration, on_fire: F) -> Duration
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay_for(validity);
        let fires_at = Instant::now() + delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(fires_at).await;
            tracing::debug!("Renewal timer fired");
            on_fire.await;
        });

        let previous = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Armed { handle, fires_at });

        if let Some(previous) = previous {
            previous.handle.abort();
        }

        tracing::debug!(delay_secs = delay.as_secs(), "Renewal scheduled");
        delay
    }

    /// Clear any pending renewal
    pub fn cancel(&self) {
        let previous = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(previous) = previous {
            previous.handle.abort();
            tracing::debug!("Renewal cancelled");
        }
    }

    /// Whether a renewal is waiting to fire
    pub fn is_armed(&self) -> bool {
        self.fires_at().is_some()
    }

    /// When the pending renewal will fire
    pub fn fires_at(&self) -> Option<Instant> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|armed| !armed.handle.is_finished() && armed.fires_at > Instant::now())
            .map(|armed| armed.fires_at)
    }

    /// Time left until the pending renewal fires
    pub fn remaining(&self) -> Option<Duration> {
        self.fires_at()
            .map(|at| at.saturating_duration_since(Instant::now()))
    }
}

impl Default for RenewalScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_MARGIN)
    }
}

impl Drop for RenewalScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}
