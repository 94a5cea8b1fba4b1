use thiserror::Error;

/// Top-level error type for the `rollcall-api` crate.
///
/// Covers authentication, transport, and application failures reported
/// by the listing service. `rollcall-core` maps these into view state.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// HTTP 401: the session or token is missing, expired, or revoked.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// HTTP 403: authenticated but not allowed to perform the request.
    #[error("Access denied: {message}")]
    Forbidden { message: String },

    /// A CSRF token could not be obtained for a mutating request.
    #[error("CSRF token unavailable: {message}")]
    Csrf { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Application ─────────────────────────────────────────────────
    /// Non-2xx response other than 401/403, with the message extracted
    /// from the body when the service provides one.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        field: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the caller must re-authenticate (HTTP 401/403).
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::Forbidden { .. })
    }

    /// Returns `true` if this is a transient error worth a manual retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => false,
        }
    }

    /// The offending field for validation failures, if the service named one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Api { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}
