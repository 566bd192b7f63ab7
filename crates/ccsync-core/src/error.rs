// ── Core error types ──
//
// Reconciliation errors. Consumers never see HTTP status codes or JSON
// parse failures directly: the `From<ccsync_api::Error>` impl translates
// transport-layer errors into the reconciliation taxonomy.
//
// Fatal kinds unwind a run; everything else is recorded against the
// resource that produced it.

use thiserror::Error;

use crate::report::FailureKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Fatal: before any network call ───────────────────────────────
    #[error("Dependency cycle or dangling reference: {reason}")]
    CycleDetected {
        /// Resources that could not be ordered.
        involved: Vec<String>,
        reason: String,
    },

    #[error("Invalid site hierarchy: {message}")]
    InvalidHierarchy { message: String },

    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{operation} requires explicit confirmation")]
    ConfirmationRequired { operation: String },

    // ── Fatal: during a run ──────────────────────────────────────────
    #[error("Authentication failed after {attempts} attempt(s): {message}")]
    AuthenticationFailed { message: String, attempts: u32 },

    #[error("Run cancelled")]
    Cancelled,

    // ── Per-resource ─────────────────────────────────────────────────
    #[error("Controller unreachable: {message}")]
    TransientNetwork { message: String },

    #[error("Task {task_id} failed: {reason}")]
    TaskFailed { task_id: String, reason: String },

    #[error("Task {task_id} did not finish within {waited_secs}s")]
    TaskTimeout { task_id: String, waited_secs: u64 },

    #[error("{resource} is still referenced by {}", referenced_by.join(", "))]
    DependencyConflict {
        resource: String,
        referenced_by: Vec<String>,
    },

    #[error("Controller rejected the request (HTTP {status}): {detail}")]
    ValidationRejected { status: u16, detail: String },

    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("API error: {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Fatal errors abort the whole run instead of failing one resource.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CycleDetected { .. }
                | Self::InvalidHierarchy { .. }
                | Self::Validation { .. }
                | Self::ConfirmationRequired { .. }
                | Self::AuthenticationFailed { .. }
                | Self::Cancelled
                | Self::Config { .. }
        )
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Report classification for this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::CycleDetected { .. } => FailureKind::CycleDetected,
            Self::InvalidHierarchy { .. } | Self::Validation { .. } => FailureKind::InvalidInput,
            Self::ConfirmationRequired { .. } => FailureKind::ConfirmationRequired,
            Self::AuthenticationFailed { .. } => FailureKind::AuthenticationFailed,
            Self::Cancelled => FailureKind::Cancelled,
            Self::TransientNetwork { .. } => FailureKind::TransientNetwork,
            Self::TaskFailed { .. } => FailureKind::TaskFailed,
            Self::TaskTimeout { .. } => FailureKind::TaskTimeout,
            Self::DependencyConflict { .. } => FailureKind::DependencyConflict,
            Self::ValidationRejected { .. } => FailureKind::ValidationRejected,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Api { .. } | Self::Config { .. } | Self::Internal(_) => FailureKind::Other,
        }
    }

    /// Controller-side identifier of the task this error came from.
    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::TaskFailed { task_id, .. } | Self::TaskTimeout { task_id, .. } => Some(task_id),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<ccsync_api::Error> for CoreError {
    fn from(err: ccsync_api::Error) -> Self {
        match err {
            ccsync_api::Error::Authentication { message } => CoreError::AuthenticationFailed {
                message,
                attempts: 1,
            },
            ccsync_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired -- re-authentication required".into(),
                attempts: 1,
            },
            ccsync_api::Error::Transport(ref e) => {
                if e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
                {
                    CoreError::TransientNetwork {
                        message: e.to_string(),
                    }
                } else if e.status().map(|s| s.as_u16()) == Some(404) {
                    CoreError::NotFound {
                        entity_type: "resource".into(),
                        identifier: e.url().map(|u| u.path().to_string()).unwrap_or_default(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ccsync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ccsync_api::Error::Timeout { timeout_secs } => CoreError::TransientNetwork {
                message: format!("request timed out after {timeout_secs}s"),
            },
            ccsync_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            ccsync_api::Error::Api {
                status,
                message,
                code,
            } => match status {
                404 => CoreError::NotFound {
                    entity_type: "resource".into(),
                    identifier: message,
                },
                400 | 409 | 422 => CoreError::ValidationRejected {
                    status,
                    detail: message,
                },
                429 | 500..=599 => CoreError::TransientNetwork {
                    message: format!("HTTP {status}: {message}"),
                },
                _ => CoreError::Api {
                    message,
                    code,
                    status: Some(status),
                },
            },
            ccsync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_rejection_keeps_detail_verbatim() {
        let err = CoreError::from(ccsync_api::Error::Api {
            status: 400,
            message: "Subnet is not within global pool".into(),
            code: Some("NCIP10283".into()),
        });
        assert!(matches!(
            err,
            CoreError::ValidationRejected { status: 400, ref detail }
                if detail == "Subnet is not within global pool"
        ));
        assert!(!err.is_fatal());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = CoreError::from(ccsync_api::Error::Api {
            status: 502,
            message: "bad gateway".into(),
            code: None,
        });
        assert!(err.is_transient());
    }

    #[test]
    fn fatal_kinds() {
        assert!(CoreError::Cancelled.is_fatal());
        assert!(
            CoreError::AuthenticationFailed {
                message: "nope".into(),
                attempts: 3
            }
            .is_fatal()
        );
        assert!(
            !CoreError::TaskFailed {
                task_id: "t".into(),
                reason: "r".into()
            }
            .is_fatal()
        );
    }
}
