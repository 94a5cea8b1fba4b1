use secrecy::SecretString;

/// Credentials for authenticating with the listing service.
///
/// Each variant carries the secret material needed for its auth flow.
#[derive(Debug, Clone, Default)]
pub enum Credentials {
    /// No credentials; rely on whatever the cookie jar already holds.
    #[default]
    Anonymous,

    /// Bearer token sent as `Authorization: Bearer <token>` on every request.
    Bearer { token: SecretString },

    /// Pre-established session cookie (e.g. copied from a browser login),
    /// seeded into the client's cookie jar as `name=value`.
    SessionCookie { name: String, value: SecretString },
}

/// Where the CSRF token attached to mutating requests comes from.
///
/// Resolution order on a POST/PATCH/DELETE: the named cookie, then the
/// last token seen in a response header, then the token endpoint.
/// When every source comes up empty the request is sent without the header
/// and the service decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfSource {
    /// Cookie holding the token.
    pub cookie: Option<String>,
    /// Path (relative to the base URL) of an endpoint returning a token.
    pub endpoint: Option<String>,
    /// Request header the token is sent in.
    pub header: String,
}

/// Default CSRF cookie name.
pub const DEFAULT_CSRF_COOKIE: &str = "csrf_token";

/// Default CSRF request header.
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRF-Token";

impl Default for CsrfSource {
    fn default() -> Self {
        Self {
            cookie: Some(DEFAULT_CSRF_COOKIE.into()),
            endpoint: None,
            header: DEFAULT_CSRF_HEADER.into(),
        }
    }
}

impl CsrfSource {
    /// Never attach a CSRF header.
    pub fn disabled() -> Self {
        Self {
            cookie: None,
            endpoint: None,
            header: DEFAULT_CSRF_HEADER.into(),
        }
    }

    /// Fetch the token from a dedicated endpoint (cookie lookup still applies first).
    pub fn with_endpoint(mut self, path: impl Into<String>) -> Self {
        self.endpoint = Some(path.into());
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.cookie.is_none() && self.endpoint.is_none()
    }
}
