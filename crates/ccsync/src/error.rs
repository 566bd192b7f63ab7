//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use ccsync_config::ConfigError;
use ccsync_core::{CoreError, FailureKind, RunReport, RunStatus};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    /// The run finished but at least one resource failed or was blocked.
    pub const PARTIAL_FAILURE: i32 = 10;
    /// The run stopped before visiting every resource.
    pub const ABORTED: i32 = 11;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the controller: {message}")]
    #[diagnostic(
        code(ccsync::connection_failed),
        help(
            "Check that the controller is reachable from this host.\n\
             Self-signed certificate? Try --insecure (-k)."
        )
    )]
    ConnectionFailed { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(ccsync::auth_failed),
        help("Verify the username and password for this controller.")
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(ccsync::no_credentials),
        help(
            "Pass --username/--password, set CCSYNC_USERNAME and CCSYNC_PASSWORD,\n\
             or point --config at a CC_Env.yml credential file."
        )
    )]
    NoCredentials { profile: String },

    // ── Input ────────────────────────────────────────────────────────
    #[error("Cannot read manifest {path}: {reason}")]
    #[diagnostic(
        code(ccsync::manifest),
        help("Manifests are YAML (.yaml/.yml), TOML (.toml) or JSON (.json).")
    )]
    Manifest { path: String, reason: String },

    #[error("{message}")]
    #[diagnostic(
        code(ccsync::invalid_desired_state),
        help("Run: ccsync plan <MANIFEST> to check ordering without touching the controller.")
    )]
    InvalidDesiredState { message: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(ccsync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(ccsync::profile_not_found),
        help("Available profiles: {available}\nConfig file: {path}")
    )]
    ProfileNotFound {
        name: String,
        available: String,
        path: String,
    },

    #[error("No controller configured")]
    #[diagnostic(
        code(ccsync::no_config),
        help(
            "Pass --controller, use --config <CC_Env.yml>, or add a profile to\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(ccsync::config))]
    Config(Box<figment::Error>),

    #[error("{0}")]
    #[diagnostic(code(ccsync::config))]
    ConfigFile(String),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(ccsync::confirmation_required),
        help("Use --yes (-y) or --force (-f) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Run outcome ──────────────────────────────────────────────────
    #[error("{failed} of {total} resource(s) did not reach the desired state")]
    #[diagnostic(
        code(ccsync::partial_failure),
        help("The report above lists each failure. Re-running is safe: existing resources are skipped.")
    )]
    RunFailed { failed: usize, total: usize },

    #[error("Run aborted: {reason}")]
    #[diagnostic(code(ccsync::aborted))]
    RunAborted { reason: String, exit: i32 },

    // ── Remaining core errors ────────────────────────────────────────
    #[error("{entity_type} '{identifier}' not found")]
    #[diagnostic(code(ccsync::not_found))]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    #[error("{message}")]
    #[diagnostic(code(ccsync::conflict))]
    Conflict { message: String },

    #[error("{message}")]
    #[diagnostic(
        code(ccsync::timeout),
        help("Raise --task-timeout or check the controller's task queue.")
    )]
    Timeout { message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(ccsync::api_error))]
    ApiError { message: String },

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Manifest { .. }
            | Self::InvalidDesiredState { .. }
            | Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::RunFailed { .. } => exit_code::PARTIAL_FAILURE,
            Self::RunAborted { exit, .. } => *exit,
            _ => exit_code::GENERAL,
        }
    }

    /// Error for a finished run that did not fully succeed.
    pub fn from_report(report: &RunReport) -> Option<Self> {
        match report.status {
            RunStatus::AllSucceeded => None,
            RunStatus::PartialFailure => Some(Self::RunFailed {
                failed: report.count(|s| !s.is_ok()),
                total: report.outcomes.len(),
            }),
            RunStatus::Aborted => Some(Self::RunAborted {
                reason: report
                    .abort_reason
                    .clone()
                    .unwrap_or_else(|| "unknown".into()),
                exit: match report.abort_kind {
                    Some(FailureKind::AuthenticationFailed) => exit_code::AUTH,
                    _ => exit_code::ABORTED,
                },
            }),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::CycleDetected { .. } | CoreError::InvalidHierarchy { .. } => {
                CliError::InvalidDesiredState {
                    message: err.to_string(),
                }
            }

            CoreError::Validation { field, reason } => CliError::Validation { field, reason },

            CoreError::ConfirmationRequired { operation } => {
                CliError::NonInteractiveRequiresYes { action: operation }
            }

            CoreError::AuthenticationFailed { .. } => CliError::AuthFailed {
                message: err.to_string(),
            },

            CoreError::Cancelled => CliError::RunAborted {
                reason: "cancelled".into(),
                exit: exit_code::ABORTED,
            },

            CoreError::TransientNetwork { message } => CliError::ConnectionFailed { message },

            CoreError::TaskTimeout { .. } => CliError::Timeout {
                message: err.to_string(),
            },

            CoreError::DependencyConflict { .. } => CliError::Conflict {
                message: err.to_string(),
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                entity_type,
                identifier,
            },

            CoreError::Config { message } => CliError::ConfigFile(message),

            CoreError::TaskFailed { .. }
            | CoreError::ValidationRejected { .. }
            | CoreError::Api { .. }
            | CoreError::Internal(_) => CliError::ApiError {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile { name, path } => CliError::ProfileNotFound {
                name,
                available: String::from("(none)"),
                path,
            },
            ConfigError::Figment(inner) => CliError::Config(inner),
            ConfigError::Io(e) => CliError::Io(e),
            other @ (ConfigError::CredentialFileMissing { .. }
            | ConfigError::Yaml { .. }
            | ConfigError::Serialization(_)) => CliError::ConfigFile(other.to_string()),
        }
    }
}

/// An aborted run with no outcomes, as produced when the first step
/// hits a fatal error.
#[cfg(test)]
pub(crate) fn aborted_report(kind: FailureKind, reason: &str) -> RunReport {
    let now = chrono::Utc::now();
    RunReport {
        run_id: uuid::Uuid::nil(),
        operation: ccsync_core::Operation::Create,
        status: RunStatus::Aborted,
        abort_reason: Some(reason.into()),
        abort_kind: Some(kind),
        started_at: now,
        finished_at: now,
        outcomes: indexmap::IndexMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_network_rejections_are_usage_errors() {
        let err = CliError::from(CoreError::CycleDetected {
            involved: vec!["floor 'Global/US/HQ/F1'".into()],
            reason: "parent 'Global/US/HQ' is not declared".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);

        let err = CliError::from(CoreError::ConfirmationRequired {
            operation: "delete".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn aborted_run_keeps_its_reason() {
        let report = aborted_report(FailureKind::Cancelled, "cancelled by user");
        let err = CliError::from_report(&report).expect("aborted run is an error");
        assert_eq!(err.exit_code(), exit_code::ABORTED);
        assert!(err.to_string().contains("cancelled by user"));
    }

    #[test]
    fn login_abort_exits_with_auth_code() {
        let report = aborted_report(FailureKind::AuthenticationFailed, "bad password");
        let err = CliError::from_report(&report).expect("aborted run is an error");
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn auth_failure_maps_to_auth_exit() {
        let err = CliError::from(CoreError::AuthenticationFailed {
            message: "bad password".into(),
            attempts: 3,
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }
}
