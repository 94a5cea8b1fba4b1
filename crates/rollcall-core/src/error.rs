// ── Core error types ──
//
// View-facing errors from rollcall-core. Consumers never see raw HTTP
// statuses or JSON parse failures; the `From<rollcall_api::Error>` impl
// translates transport-layer errors into the taxonomy the views act on.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach the service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    /// HTTP 401/403. Views redirect to login instead of showing this inline.
    #[error("Session expired or access denied: {message}")]
    AuthenticationExpired { message: String },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    /// Malformed create/update payload; `field` is set when the service named one.
    #[error("Validation failed: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Service error: {message}")]
    Api {
        message: String,
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
    /// `true` for 401/403: the view must hand off to the login collaborator.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthenticationExpired { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Transient failures surface with a retry affordance.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<rollcall_api::Error> for CoreError {
    fn from(err: rollcall_api::Error) -> Self {
        match err {
            rollcall_api::Error::Authentication { message }
            | rollcall_api::Error::Forbidden { message } => {
                CoreError::AuthenticationExpired { message }
            }
            rollcall_api::Error::Csrf { message } => CoreError::Api {
                message: format!("CSRF token unavailable: {message}"),
                status: None,
            },
            rollcall_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            rollcall_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            rollcall_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            rollcall_api::Error::Api {
                status: 404,
                message,
                ..
            } => CoreError::NotFound {
                entity_type: "Record".into(),
                identifier: message,
            },
            rollcall_api::Error::Api {
                status: 400 | 422,
                message,
                field,
            } => CoreError::Validation { field, message },
            rollcall_api::Error::Api {
                status, message, ..
            } => CoreError::Api {
                message,
                status: Some(status),
            },
            rollcall_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_and_unauthorized_both_expire_the_session() {
        let a = CoreError::from(rollcall_api::Error::Authentication {
            message: "expired".into(),
        });
        let b = CoreError::from(rollcall_api::Error::Forbidden {
            message: "denied".into(),
        });
        assert!(a.is_auth_expired());
        assert!(b.is_auth_expired());
    }

    #[test]
    fn unprocessable_entity_keeps_the_field() {
        let err = CoreError::from(rollcall_api::Error::Api {
            status: 422,
            message: "uid already in use".into(),
            field: Some("uid".into()),
        });
        match err {
            CoreError::Validation { field, message } => {
                assert_eq!(field.as_deref(), Some("uid"));
                assert_eq!(message, "uid already in use");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn server_errors_are_transient() {
        let err = CoreError::from(rollcall_api::Error::Api {
            status: 503,
            message: "down".into(),
            field: None,
        });
        assert!(err.is_transient());
        assert!(!err.is_auth_expired());
    }
}
