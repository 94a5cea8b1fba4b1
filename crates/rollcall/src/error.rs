//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use rollcall_config::ConfigError;
use rollcall_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const PARTIAL: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the attendance service at {url}")]
    #[diagnostic(
        code(rollcall::connection_failed),
        help(
            "Check that the service is running and reachable.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("TLS certificate verification failed")]
    #[diagnostic(
        code(rollcall::tls_error),
        help(
            "The service is using a certificate the system does not trust.\n\
             Use --insecure (-k) to accept it, or configure ca_cert in your profile.\n\
             Detail: {reason}"
        )
    )]
    TlsError { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication required: {message}")]
    #[diagnostic(
        code(rollcall::auth_failed),
        help(
            "Your token is missing, expired, or lacks access.\n\
             Run: rollcall config set-token\n\
             Or set ROLLCALL_TOKEN."
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(rollcall::not_found),
        help("Run: rollcall {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Service error: {message}")]
    #[diagnostic(code(rollcall::api_error))]
    ApiError {
        status: Option<u16>,
        message: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(rollcall::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(rollcall::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: rollcall config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No service configured")]
    #[diagnostic(
        code(rollcall::no_config),
        help(
            "Create a profile with: rollcall config init\n\
             Or pass --server / set ROLLCALL_SERVER.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(rollcall::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(rollcall::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(rollcall::timeout),
        help("Increase the timeout with --timeout or check service responsiveness.")
    )]
    Timeout,

    // ── Bulk ─────────────────────────────────────────────────────────
    #[error("Some operations failed: {summary}")]
    #[diagnostic(
        code(rollcall::partial_failure),
        help("Failed ids are listed above; rerun the command with just those ids to retry.")
    )]
    PartialFailure { summary: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(rollcall::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(rollcall::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout => exit_code::TIMEOUT,
            Self::PartialFailure { .. } => exit_code::PARTIAL,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                if reason.starts_with("TLS error") {
                    CliError::TlsError { reason }
                } else {
                    CliError::ConnectionFailed { url, reason }
                }
            }

            CoreError::Timeout => CliError::Timeout,

            CoreError::AuthenticationExpired { message } => CliError::AuthFailed { message },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => {
                let lower = entity_type.to_lowercase();
                CliError::NotFound {
                    list_command: format!("{} list", list_command_for(&lower)),
                    resource_type: lower,
                    identifier,
                }
            }

            CoreError::Validation { field, message } => CliError::Validation {
                field: field.unwrap_or_else(|| "input".into()),
                reason: message,
            },

            CoreError::Api { message, status } => CliError::ApiError { status, message },

            CoreError::Config { message } => CliError::Validation {
                field: "server".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                status: None,
                message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::UnknownProfile { name } => {
                let available = rollcall_config::load_config_or_default()
                    .profiles
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ");
                CliError::ProfileNotFound {
                    name,
                    available: if available.is_empty() {
                        "(none)".into()
                    } else {
                        available
                    },
                }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}

/// Subcommand that lists records of `noun`.
fn list_command_for(noun: &str) -> &'static str {
    match noun {
        "instructor" => "instructors",
        "email" => "emails",
        "reader" => "readers",
        "tag" => "tags",
        "backup" => "backups",
        _ => "instructors",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_points_at_the_collection_list() {
        let err = CliError::from(CoreError::NotFound {
            entity_type: "tag".into(),
            identifier: "9".into(),
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        match err {
            CliError::NotFound { list_command, .. } => assert_eq!(list_command, "tags list"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn expired_session_maps_to_auth_exit_code() {
        let err = CliError::from(CoreError::AuthenticationExpired {
            message: "token expired".into(),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }

    #[test]
    fn tls_failures_are_told_apart_from_plain_connection_errors() {
        let err = CliError::from(CoreError::ConnectionFailed {
            url: String::new(),
            reason: "TLS error: bad cert".into(),
        });
        assert!(matches!(err, CliError::TlsError { .. }));
        assert_eq!(err.exit_code(), exit_code::CONNECTION);
    }
}
