// ── Runtime configuration ──
//
// How to reach the listing service and how views behave by default.
// Carries credential data but never touches disk: the CLI and TUI build
// these from `rollcall-config` and hand them in.

use std::sync::Arc;
use std::time::Duration;

use rollcall_api::{Credentials, CsrfSource, ListingClient, TlsMode, TransportConfig};
use url::Url;

use crate::debounce::DEFAULT_DEBOUNCE;
use crate::engine::FacetScope;
use crate::error::CoreError;
use crate::query::DEFAULT_PAGE_SIZE;

/// Connection settings for one service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root, e.g. `https://school.example/api/`.
    pub base_url: Url,
    pub credentials: Credentials,
    pub csrf: CsrfSource,
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            credentials: Credentials::default(),
            csrf: CsrfSource::default(),
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn build_client(&self) -> Result<Arc<ListingClient>, CoreError> {
        let transport = TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
            cookie_jar: None,
        };
        ListingClient::new(
            self.base_url.as_str(),
            &self.credentials,
            self.csrf.clone(),
            &transport,
        )
        .map(Arc::new)
        .map_err(|e| match e {
            rollcall_api::Error::InvalidUrl(_) | rollcall_api::Error::Tls(_) => CoreError::Config {
                message: e.to_string(),
            },
            other => other.into(),
        })
    }
}

/// Behavior shared by every list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewDefaults {
    pub page_size: u32,
    pub debounce: Duration,
    pub facet_scope: FacetScope,
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_DEBOUNCE,
            facet_scope: FacetScope::Global,
        }
    }
}
