//! Short-lived Copilot token ownership.
//!
//! The current token sits behind a `tokio::sync::Mutex` that stays locked for
//! the whole refresh exchange. A caller that finds the token stale performs
//! the exchange while later callers queue on the lock and then observe the
//! stored result, so at most one exchange is ever in flight.

use secrecy::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{CredentialStore, Result, TokenExchanger};

const REFRESH_RETRY_DELAY: Duration = Duration::from_secs(30);
const MIN_REFRESH_SPACING: Duration = Duration::from_secs(5);

/// Backend token plus the instant after which it must not be used.
#[derive(Debug, Clone)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: Instant,
    generation: u64,
}

impl AccessToken {
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Monotonic counter of the exchange that produced this token.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

pub struct TokenManager {
    store: Arc<CredentialStore>,
    exchanger: Arc<dyn TokenExchanger>,
    refresh_margin: Duration,
    show_token: bool,
    current: Mutex<Option<AccessToken>>,
    generations: AtomicU64,
}

impl TokenManager {
    pub fn new(store: Arc<CredentialStore>, exchanger: Arc<dyn TokenExchanger>) -> Self {
        let flags = store.flags();
        let refresh_margin = flags.refresh_margin;
        let show_token = flags.show_token;
        Self {
            store,
            exchanger,
            refresh_margin,
            show_token,
            current: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Return the current token, exchanging a new one if none is cached or the
    /// cached one has expired.
    pub async fn get_valid_token(&self) -> Result<AccessToken> {
        let mut current = self.current.lock().await;

        if let Some(token) = current.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.clone());
        }

        let token = self.exchange().await?;
        *current = Some(token.clone());
        Ok(token)
    }

    /// Replace a token the backend rejected.
    ///
    /// If another caller already swapped `stale` out, its replacement is
    /// returned without a second exchange.
    pub async fn force_refresh(&self, stale: &AccessToken) -> Result<AccessToken> {
        let mut current = self.current.lock().await;

        if let Some(token) = current
            .as_ref()
            .filter(|t| t.generation != stale.generation && !t.is_expired())
        {
            return Ok(token.clone());
        }

        *current = None;
        let token = self.exchange().await?;
        *current = Some(token.clone());
        Ok(token)
    }

    /// Snapshot of the cached token, if any, without refreshing.
    pub async fn current(&self) -> Option<AccessToken> {
        self.current.lock().await.clone()
    }

    /// Keep the token fresh in the background.
    ///
    /// The task wakes when the current token expires and refreshes it; failed
    /// refreshes are retried after a delay. Dropping the handle stops it.
    pub fn spawn_refresh_loop(self: &Arc<Self>) -> RefreshHandle {
        let manager = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match manager.get_valid_token().await {
                    Ok(token) => {
                        let wake_at = token
                            .expires_at()
                            .max(Instant::now() + MIN_REFRESH_SPACING);
                        tokio::time::sleep_until(wake_at).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "background Copilot token refresh failed");
                        tokio::time::sleep(REFRESH_RETRY_DELAY).await;
                    }
                }
            }
        });
        RefreshHandle(handle)
    }

    async fn exchange(&self) -> Result<AccessToken> {
        let credential = self.store.credential();
        let exchanged = self.exchanger.exchange(&credential).await?;

        let usable_for = exchanged.lifetime.saturating_sub(self.refresh_margin);
        if usable_for.is_zero() {
            warn!(
                lifetime_secs = exchanged.lifetime.as_secs(),
                margin_secs = self.refresh_margin.as_secs(),
                "Copilot token lifetime is shorter than the refresh margin"
            );
        }

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let token = AccessToken {
            secret: exchanged.token,
            expires_at: Instant::now() + usable_for,
            generation,
        };

        if self.show_token {
            info!(token = %token.expose(), generation, "Copilot token refreshed");
        } else {
            debug!(
                generation,
                usable_for_secs = usable_for.as_secs(),
                "Copilot token refreshed"
            );
        }

        Ok(token)
    }
}

/// Aborts the background refresh task on drop.
pub struct RefreshHandle(JoinHandle<()>);

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}
