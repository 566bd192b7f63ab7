// ── Session manager ──
//
// Owns the only shared mutable state of a run: the cached bearer token.
// Reads go through an `ArcSwapOption` (lock-free); refreshes are
// serialized by a mutex so exactly one login is in flight and every
// waiter observes the same new token.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use ccsync_api::{AuthToken, Credentials, Error as ApiError};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::backend::ControllerApi;
use crate::backoff::calculate_backoff;
use crate::config::SessionPolicy;
use crate::error::CoreError;

/// A token plus the bookkeeping needed to refresh it safely.
#[derive(Debug)]
pub struct Credential {
    token: AuthToken,
    generation: u64,
    expires_at: Instant,
}

impl Credential {
    pub fn token(&self) -> &AuthToken {
        &self.token
    }

    /// Monotonic refresh counter; invalidation only applies to the
    /// generation that was actually rejected.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Retry behavior for a controller call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// Safe to repeat: retried on any transient failure.
    Idempotent,
    /// Not safe to repeat: retried only when the request never left.
    Mutation,
    /// No transient retry; the caller owns the retry loop.
    Single,
}

impl CallMode {
    fn retries(self, err: &ApiError) -> bool {
        match self {
            Self::Idempotent => err.is_transient(),
            Self::Mutation => err.is_unsent(),
            Self::Single => false,
        }
    }
}

/// Acquires and refreshes controller tokens on behalf of every component.
pub struct SessionManager<A> {
    api: Arc<A>,
    credentials: Credentials,
    policy: SessionPolicy,
    current: ArcSwapOption<Credential>,
    refresh_lock: Mutex<()>,
    generation: AtomicU64,
}

impl<A: ControllerApi> SessionManager<A> {
    pub fn new(api: Arc<A>, credentials: Credentials, policy: SessionPolicy) -> Self {
        Self {
            api,
            credentials,
            policy,
            current: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Return a valid credential, logging in if none is cached or the
    /// cached one has expired.
    pub async fn acquire(&self) -> Result<Arc<Credential>, CoreError> {
        if let Some(cred) = self.cached() {
            return Ok(cred);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(cred) = self.cached() {
            return Ok(cred);
        }
        self.refresh_locked().await
    }

    /// Drop `stale` if it is still the cached credential.
    ///
    /// A newer generation installed by a concurrent refresh is left alone.
    pub fn invalidate(&self, stale: &Credential) {
        let generation = stale.generation;
        self.current.rcu(|current| match current {
            Some(cred) if cred.generation == generation => None,
            other => other.clone(),
        });
    }

    /// Number of successful logins so far.
    pub fn refresh_count(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Run `op` with a valid token.
    ///
    /// A 401 invalidates the token and retries once with a fresh one.
    /// Transient failures are retried per `mode` with capped backoff.
    pub async fn call<T, F, Fut>(&self, mode: CallMode, mut op: F) -> Result<T, CoreError>
    where
        F: FnMut(Arc<A>, AuthToken) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut reauthenticated = false;
        let mut retries = 0_u32;

        loop {
            let cred = self.acquire().await?;
            match op(Arc::clone(&self.api), cred.token().clone()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_auth_expired() => {
                    if reauthenticated {
                        return Err(CoreError::AuthenticationFailed {
                            message: "controller rejected a freshly issued token".into(),
                            attempts: 2,
                        });
                    }
                    debug!(generation = cred.generation, "token rejected, refreshing");
                    self.invalidate(&cred);
                    reauthenticated = true;
                }
                Err(err) if mode.retries(&err) && retries < self.policy.max_transient_retries => {
                    let delay = calculate_backoff(
                        retries,
                        self.policy.retry_initial,
                        self.policy.retry_max,
                    );
                    retries += 1;
                    warn!(
                        error = %err,
                        attempt = retries,
                        delay_ms = delay.as_millis(),
                        "transient controller error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn cached(&self) -> Option<Arc<Credential>> {
        self.current.load_full().filter(|cred| !cred.is_expired())
    }

    async fn refresh_locked(&self) -> Result<Arc<Credential>, CoreError> {
        let attempts = self.policy.max_auth_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.api.login(&self.credentials).await {
                Ok(token) => {
                    let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
                    let cred = Arc::new(Credential {
                        token,
                        generation,
                        expires_at: Instant::now() + self.policy.token_ttl,
                    });
                    self.current.store(Some(Arc::clone(&cred)));
                    info!(generation, "controller session established");
                    return Ok(cred);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "login attempt failed");
                    last_error = err.to_string();
                    if attempt < attempts {
                        let delay = calculate_backoff(
                            attempt - 1,
                            self.policy.retry_initial,
                            self.policy.retry_max,
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(CoreError::AuthenticationFailed {
            message: last_error,
            attempts,
        })
    }
}
