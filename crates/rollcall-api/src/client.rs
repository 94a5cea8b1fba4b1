// Listing service HTTP client
//
// Wraps `reqwest::Client` with collection-scoped URL construction, CSRF
// token management and error-body parsing. Every collection shares the
// same verbs, so callers name the collection path segment explicitly.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::auth::{Credentials, CsrfSource};
use crate::error::Error;
use crate::models::{CsrfTokenResponse, ErrorBody, ListPage, ListParams, ListResponse};
use crate::transport::TransportConfig;

/// Response header carrying a rotated CSRF token.
const UPDATED_CSRF_HEADER: &str = "X-Updated-CSRF-Token";

/// Maximum number of body characters echoed into error messages.
const BODY_PREVIEW_CHARS: usize = 200;

/// Async client for the listing service REST contract:
///
/// - `GET    /{collection}?search=&<filter>=&sortBy=&sortOrder=&page=&pageSize=`
/// - `GET    /{collection}/{id}`
/// - `PATCH  /{collection}/{id}`
/// - `POST   /{collection}`
/// - `DELETE /{collection}/{id}`
///
/// Mutating requests carry a CSRF header when a token can be resolved.
/// HTTP 401/403 become [`Error::Authentication`] / [`Error::Forbidden`].
pub struct ListingClient {
    http: reqwest::Client,
    base_url: Url,
    csrf: CsrfSource,
    /// Last token handed out by the service in a response header.
    csrf_token: RwLock<Option<String>>,
    cookie_jar: Option<Arc<Jar>>,
}

impl ListingClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build a client from credentials and a transport config.
    ///
    /// A cookie jar is always attached: session cookies and CSRF cookies
    /// both live there.
    pub fn new(
        base_url: &str,
        credentials: &Credentials,
        csrf: CsrfSource,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        let config = if transport.cookie_jar.is_some() {
            transport.clone()
        } else {
            transport.clone().with_cookie_jar()
        };
        let cookie_jar = config.cookie_jar.clone();

        let mut headers = HeaderMap::new();
        match credentials {
            Credentials::Anonymous => {}
            Credentials::Bearer { token } => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                    .map_err(|e| Error::Authentication {
                        message: format!("invalid token header value: {e}"),
                    })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Credentials::SessionCookie { name, value } => {
                if let Some(ref jar) = cookie_jar {
                    jar.add_cookie_str(&format!("{name}={}", value.expose_secret()), &base_url);
                }
            }
        }

        let http = config.build_client_with_headers(headers)?;
        Ok(Self {
            http,
            base_url,
            csrf,
            csrf_token: RwLock::new(None),
            cookie_jar,
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth and cookies).
    pub fn with_client(http: reqwest::Client, base_url: &str, csrf: CsrfSource) -> Result<Self, Error> {
        Ok(Self {
            http,
            base_url: Self::normalize_base_url(base_url)?,
            csrf,
            csrf_token: RwLock::new(None),
            cookie_jar: None,
        })
    }

    /// Ensure the base URL is hierarchical and ends with `/`.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The service base URL (always ends with `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// `{base}/{collection}/{rest...}` with each segment percent-encoded.
    fn url(&self, collection: &str, rest: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            segments.pop_if_empty();
            segments.extend(collection.split('/').filter(|s| !s.is_empty()));
            segments.extend(rest);
        }
        Ok(url)
    }

    // ── CSRF token management ────────────────────────────────────────

    /// The most recent token seen in a response header, if any.
    pub fn csrf_token(&self) -> Option<String> {
        self.csrf_token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store a CSRF token explicitly (e.g. one obtained out of band).
    pub fn set_csrf_token(&self, token: impl Into<String>) {
        debug!("storing CSRF token");
        *self
            .csrf_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Forget the stored token so the next mutating request resolves a fresh one.
    pub fn clear_csrf_token(&self) {
        *self
            .csrf_token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Update the stored token if the response rotated it.
    fn update_csrf_from_response(&self, headers: &HeaderMap) {
        if let Some(token) = header_token(headers, &self.csrf.header) {
            trace!("CSRF token rotated");
            self.set_csrf_token(token);
        }
    }

    /// Look the token up in the cookie jar.
    fn csrf_from_cookie(&self) -> Option<String> {
        let name = self.csrf.cookie.as_deref()?;
        let jar = self.cookie_jar.as_ref()?;
        let header = jar.cookies(&self.base_url)?;
        let raw = header.to_str().ok()?;
        raw.split(';').map(str::trim).find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_owned())
        })
    }

    /// Ask the dedicated token endpoint for a fresh token.
    async fn fetch_csrf_token(&self, path: &str) -> Result<String, Error> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        debug!("GET {url} (csrf)");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(match self.parse_error(status, resp).await {
                e if e.is_auth_expired() => e,
                e => Error::Csrf {
                    message: e.to_string(),
                },
            });
        }

        if let Some(token) = header_token(resp.headers(), &self.csrf.header) {
            return Ok(token);
        }

        let body = resp.text().await?;
        let parsed: CsrfTokenResponse = serde_json::from_str(&body).map_err(|e| Error::Csrf {
            message: format!("unexpected token response: {e}"),
        })?;
        Ok(parsed.token)
    }

    /// Resolve a token: cookie, then stored header token, then endpoint.
    async fn resolve_csrf(&self) -> Result<Option<String>, Error> {
        if self.csrf.is_disabled() {
            return Ok(None);
        }
        if let Some(token) = self.csrf_from_cookie() {
            return Ok(Some(token));
        }
        if let Some(token) = self.csrf_token() {
            return Ok(Some(token));
        }
        if let Some(ref path) = self.csrf.endpoint {
            let token = self.fetch_csrf_token(path).await?;
            self.set_csrf_token(token.clone());
            return Ok(Some(token));
        }
        Ok(None)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request, attaching CSRF for mutating verbs, and turn
    /// non-2xx statuses into errors.
    async fn execute(&self, builder: RequestBuilder, mutating: bool) -> Result<Response, Error> {
        let builder = if mutating {
            match self.resolve_csrf().await? {
                Some(token) => builder.header(self.csrf.header.as_str(), token),
                None => builder,
            }
        } else {
            builder
        };

        let resp = builder.send().await?;
        self.update_csrf_from_response(resp.headers());

        let status = resp.status();
        if status.is_success() {
            Ok(resp)
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, Error> {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }

    async fn parse_error(&self, status: StatusCode, resp: Response) -> Error {
        let raw = resp.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<ErrorBody>(&raw).ok();
        let field = parsed.as_ref().and_then(|b| b.field.clone());
        let message = parsed.and_then(ErrorBody::into_message);

        match status {
            StatusCode::UNAUTHORIZED => Error::Authentication {
                message: message.unwrap_or_else(|| "session expired or invalid credentials".into()),
            },
            StatusCode::FORBIDDEN => {
                // A rejected CSRF token must not be replayed.
                self.clear_csrf_token();
                Error::Forbidden {
                    message: message.unwrap_or_else(|| "insufficient permissions (HTTP 403)".into()),
                }
            }
            _ => Error::Api {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| {
                    if raw.trim().is_empty() {
                        status.to_string()
                    } else {
                        preview(&raw)
                    }
                }),
                field,
            },
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// `GET /{collection}` with the given query parameters.
    pub async fn list<T: DeserializeOwned>(
        &self,
        collection: &str,
        params: &ListParams,
    ) -> Result<ListPage<T>, Error> {
        let url = self.url(collection, &[])?;
        let query = params.to_query();
        debug!("GET {url} params={query:?}");

        let resp = self.execute(self.http.get(url).query(&query), false).await?;
        let decoded: ListResponse<T> = Self::decode(resp).await?;
        Ok(decoded.into())
    }

    /// `GET /{collection}/{id}`
    pub async fn get<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<T, Error> {
        let url = self.url(collection, &[id])?;
        debug!("GET {url}");

        let resp = self.execute(self.http.get(url), false).await?;
        Self::decode(resp).await
    }

    /// `PATCH /{collection}/{id}` with a partial-field body.
    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(collection, &[id])?;
        debug!("PATCH {url}");

        let resp = self.execute(self.http.patch(url).json(body), true).await?;
        Self::decode(resp).await
    }

    /// `POST /{collection}` with a full-field body.
    pub async fn create<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        collection: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(collection, &[])?;
        debug!("POST {url}");

        let resp = self.execute(self.http.post(url).json(body), true).await?;
        Self::decode(resp).await
    }

    /// `POST /{collection}/{id}/{action}` (e.g. `backups/7/restore`).
    pub async fn action<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        collection: &str,
        id: &str,
        action: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(collection, &[id, action])?;
        debug!("POST {url}");

        let resp = self.execute(self.http.post(url).json(body), true).await?;
        Self::decode(resp).await
    }

    /// `DELETE /{collection}/{id}`. Any 2xx counts as success; the body is ignored.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<(), Error> {
        let url = self.url(collection, &[id])?;
        debug!("DELETE {url}");

        self.execute(self.http.delete(url), true).await?;
        Ok(())
    }
}

fn header_token(headers: &HeaderMap, header: &str) -> Option<String> {
    headers
        .get(UPDATED_CSRF_HEADER)
        .or_else(|| headers.get(header))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}
