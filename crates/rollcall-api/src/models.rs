// Wire types shared by every collection endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort direction as sent in the `sortOrder` query parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Parse `asc` / `desc` case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters for `GET /{collection}`.
///
/// Absent values mean "unconstrained" and are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub search: Option<String>,
    /// Filter key to selected values; sent as a repeated key
    /// (`status=active&status=lost`).
    pub filters: Vec<(String, Vec<String>)>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortDirection>,
    /// 1-based page index.
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListParams {
    /// Only the free-text search.
    pub fn search(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            search: (!text.is_empty()).then_some(text),
            ..Self::default()
        }
    }

    /// Flatten into `(name, value)` pairs for `RequestBuilder::query`.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Some(ref s) = self.search {
            if !s.is_empty() {
                out.push(("search".to_owned(), s.clone()));
            }
        }
        for (key, values) in &self.filters {
            for value in values {
                out.push((key.clone(), value.clone()));
            }
        }
        if let Some(ref field) = self.sort_by {
            out.push(("sortBy".to_owned(), field.clone()));
        }
        if let Some(order) = self.sort_order {
            out.push(("sortOrder".to_owned(), order.as_str().to_owned()));
        }
        if let Some(page) = self.page {
            out.push(("page".to_owned(), page.to_string()));
        }
        if let Some(size) = self.page_size {
            out.push(("pageSize".to_owned(), size.to_string()));
        }
        out
    }
}

/// One page (or the whole collection) returned by `GET /{collection}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage<T> {
    pub items: Vec<T>,
    /// Total matching items across all pages. Absent when the service
    /// returned the full collection.
    pub total: Option<u64>,
    /// Optional aggregate block (counts per status, unread totals, ...).
    pub stats: Option<serde_json::Value>,
}

impl<T> ListPage<T> {
    /// The server-reported total, or the item count when none was sent.
    pub fn total_or_len(&self) -> u64 {
        self.total
            .unwrap_or_else(|| u64::try_from(self.items.len()).unwrap_or(u64::MAX))
    }
}

/// Accepted response shapes: the `{items, total, stats}` envelope or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse<T> {
    Envelope {
        #[serde(alias = "data")]
        items: Vec<T>,
        #[serde(default)]
        total: Option<u64>,
        #[serde(default)]
        stats: Option<serde_json::Value>,
    },
    Bare(Vec<T>),
}

impl<T> From<ListResponse<T>> for ListPage<T> {
    fn from(resp: ListResponse<T>) -> Self {
        match resp {
            ListResponse::Envelope {
                items,
                total,
                stats,
            } => Self {
                items,
                total,
                stats,
            },
            ListResponse::Bare(items) => Self {
                items,
                total: None,
                stats: None,
            },
        }
    }
}

/// Error body shapes: `{"message": ..}`, `{"error": ..}`, optionally with `field`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
    #[serde(default)]
    pub field: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message.or_else(|| match self.error {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Object(map)) => map
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned),
            _ => None,
        })
    }
}

/// Response of the CSRF token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct CsrfTokenResponse {
    #[serde(alias = "csrfToken", alias = "csrf_token")]
    pub token: String,
}
