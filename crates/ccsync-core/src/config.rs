// ── Runtime connection configuration ──
//
// These types describe *how* to reach a controller and how patiently to
// wait on it. They carry credential data and tuning, but never touch disk.
// The CLI constructs a `ControllerConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs). Default for lab controllers.
    #[default]
    DangerAcceptInvalid,
}

/// Polling cadence for asynchronous controller tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskPolicy {
    /// First poll delay; doubles on every poll up to `max_interval`.
    pub initial_interval: Duration,
    pub max_interval: Duration,
    /// Give up waiting on a single task after this long.
    pub timeout: Duration,
    /// Consecutive failed status polls tolerated before giving up on a task.
    pub max_transient_retries: u32,
}

impl Default for TaskPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            max_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(600),
            max_transient_retries: 3,
        }
    }
}

/// Token lifetime and request retry tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Consecutive login attempts before the run is aborted.
    pub max_auth_attempts: u32,
    /// Tokens are refreshed proactively after this long.
    pub token_ttl: Duration,
    /// Retries for transient request failures.
    pub max_transient_retries: u32,
    pub retry_initial: Duration,
    pub retry_max: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            max_auth_attempts: 3,
            // Catalyst Center tokens are valid for one hour.
            token_ttl: Duration::from_secs(55 * 60),
            max_transient_retries: 3,
            retry_initial: Duration::from_secs(1),
            retry_max: Duration::from_secs(8),
        }
    }
}

/// Configuration for talking to a single controller.
///
/// Built by the CLI, passed to `Controller` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Controller root URL (e.g., `https://10.10.20.85`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub tasks: TaskPolicy,
    pub session: SessionPolicy,
}

impl ControllerConfig {
    pub fn new(url: Url, username: impl Into<String>, password: SecretString) -> Self {
        Self {
            url,
            username: username.into(),
            password,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            tasks: TaskPolicy::default(),
            session: SessionPolicy::default(),
        }
    }
}
