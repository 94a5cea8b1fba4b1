// ── View persistence ──
//
// Query state leaves the controller only through the `Persistence`
// collaborator, called at mount (load) and after every change (save).
// Two real backends: the address-bar synchronizer for shareable deep links
// and a per-collection JSON file for remembered view preferences. Both
// speak the same query-string format through `QueryCodec`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::form_urlencoded;

use rollcall_api::SortDirection;

use crate::model::ListItem;
use crate::query::{QueryState, SortSpec};

/// Upper bound accepted for `pageSize` from untrusted input.
pub const MAX_PAGE_SIZE: u32 = 500;

/// Load/save hook for a view's query state.
pub trait Persistence: Send {
    /// State to seed the view with, starting from `defaults`. `None` when
    /// nothing was stored.
    fn load(&mut self, defaults: &QueryState) -> Option<QueryState>;

    /// Record the current state. Failures are logged, never raised.
    fn save(&mut self, state: &QueryState);
}

/// Keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

impl Persistence for NoPersistence {
    fn load(&mut self, _defaults: &QueryState) -> Option<QueryState> {
        None
    }

    fn save(&mut self, _state: &QueryState) {}
}

// ── Query-string codec ──────────────────────────────────────────────

/// Encodes non-default query state as `search=&status=&sortBy=&sortOrder=&page=&pageSize=`
/// and decodes it back, falling back to defaults on anything malformed.
/// A multi-valued filter repeats its key (`status=active&status=lost`), so
/// values may contain commas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCodec {
    filter_keys: Vec<&'static str>,
    sort_fields: Vec<&'static str>,
}

impl QueryCodec {
    /// Recognize `T`'s facet keys and sort fields.
    pub fn for_item<T: ListItem>() -> Self {
        Self {
            filter_keys: T::FACETS.iter().map(|f| f.key).collect(),
            sort_fields: T::SORT_FIELDS.to_vec(),
        }
    }

    pub fn encode(&self, state: &QueryState) -> String {
        let defaults = state.defaults();
        let mut out = form_urlencoded::Serializer::new(String::new());

        let search = state.search_text();
        if !search.is_empty() {
            out.append_pair("search", search);
        }
        for key in &self.filter_keys {
            for value in state.filter(key).into_iter().flatten() {
                out.append_pair(key, value);
            }
        }
        if state.sort().field != defaults.sort.field {
            out.append_pair("sortBy", &state.sort().field);
        }
        if state.sort().order != defaults.sort.order {
            out.append_pair("sortOrder", state.sort().order.as_str());
        }
        if state.page() != 1 {
            out.append_pair("page", &state.page().to_string());
        }
        if state.page_size() != defaults.page_size {
            out.append_pair("pageSize", &state.page_size().to_string());
        }
        out.finish()
    }

    /// Seed a state from `query`, starting at `defaults`. Unknown keys are
    /// ignored; malformed values keep their default.
    pub fn decode(&self, query: &str, defaults: &QueryState) -> QueryState {
        let mut state = defaults.clone();
        state.reset();

        let mut search = None;
        let mut filters: Vec<(&'static str, Vec<String>)> = Vec::new();
        let mut sort_by = None;
        let mut sort_order = None;
        let mut page = None;
        let mut page_size = None;

        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            match key.as_ref() {
                "search" => search = Some(value.into_owned()),
                "sortBy" => {
                    if self.sort_fields.is_empty() || self.sort_fields.contains(&value.as_ref()) {
                        sort_by = Some(value.into_owned());
                    }
                }
                "sortOrder" => sort_order = SortDirection::parse(&value),
                "page" => page = parse_positive(&value, u32::MAX),
                "pageSize" => page_size = parse_positive(&value, MAX_PAGE_SIZE),
                k => {
                    if let Some(&known) = self.filter_keys.iter().find(|f| **f == k) {
                        let value = (!value.is_empty()).then(|| value.into_owned());
                        match filters.iter_mut().find(|(key, _)| *key == known) {
                            Some((_, values)) => values.extend(value),
                            None => filters.push((known, value.into_iter().collect())),
                        }
                    }
                }
            }
        }

        // Paging last: search and filter changes reset the page.
        if let Some(s) = search {
            state.set_search_text(s);
        }
        for (key, values) in filters {
            state.set_filter(key, values);
        }
        let defaults_sort = &defaults.defaults().sort;
        state.set_sort_spec(SortSpec::new(
            sort_by.unwrap_or_else(|| defaults_sort.field.clone()),
            sort_order.unwrap_or(defaults_sort.order),
        ));
        if let Some(n) = page_size {
            state.set_page_size(n);
        }
        if let Some(n) = page {
            state.set_page(n);
        }
        state
    }
}

fn parse_positive(raw: &str, max: u32) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| (1..=max).contains(n))
}

// ── Address bar ─────────────────────────────────────────────────────

/// The location a view is displayed at.
pub trait AddressBar: Send {
    /// Current query string, without the leading `?`.
    fn query(&self) -> String;

    /// Replace the current location in place; never adds a history entry.
    fn replace(&mut self, query: &str);
}

/// Address bar held in memory (CLI share links, tests).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryAddressBar {
    path: String,
    query: String,
    replacements: usize,
}

impl MemoryAddressBar {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    /// `path?query`, or just `path` when the query is empty.
    pub fn href(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl AddressBar for MemoryAddressBar {
    fn query(&self) -> String {
        self.query.clone()
    }

    fn replace(&mut self, query: &str) {
        self.query = query.to_owned();
        self.replacements += 1;
    }
}

/// Mirrors query state into an address bar.
pub struct UrlSynchronizer<B> {
    codec: QueryCodec,
    bar: B,
}

impl<B: AddressBar> UrlSynchronizer<B> {
    pub fn new(codec: QueryCodec, bar: B) -> Self {
        Self { codec, bar }
    }

    pub fn bar(&self) -> &B {
        &self.bar
    }
}

impl<B: AddressBar> Persistence for UrlSynchronizer<B> {
    fn load(&mut self, defaults: &QueryState) -> Option<QueryState> {
        let query = self.bar.query();
        if query.trim_start_matches('?').is_empty() {
            return None;
        }
        Some(self.codec.decode(&query, defaults))
    }

    fn save(&mut self, state: &QueryState) {
        let encoded = self.codec.encode(state);
        if encoded != self.bar.query() {
            debug!(query = %encoded, "address bar updated");
            self.bar.replace(&encoded);
        }
    }
}

// ── Saved view file ─────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SavedView {
    query: String,
    saved_at: DateTime<Utc>,
}

/// Remembers a view's preferences across sessions in a JSON file.
pub struct FilePersistence {
    path: PathBuf,
    codec: QueryCodec,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>, codec: QueryCodec) -> Self {
        Self {
            path: path.into(),
            codec,
        }
    }

    /// `{dir}/views/{collection}.json`, with `/` in the collection turned into `-`.
    pub fn for_item<T: ListItem>(dir: &Path) -> Self {
        let name = format!("{}.json", T::COLLECTION.replace('/', "-"));
        Self::new(dir.join("views").join(name), QueryCodec::for_item::<T>())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> io::Result<Option<SavedView>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, view: &SavedView) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(view).map_err(io::Error::other)?;
        fs::write(&self.path, json)
    }
}

impl Persistence for FilePersistence {
    fn load(&mut self, defaults: &QueryState) -> Option<QueryState> {
        match self.read() {
            Ok(Some(view)) => Some(self.codec.decode(&view.query, defaults)),
            Ok(None) => None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable saved view");
                None
            }
        }
    }

    fn save(&mut self, state: &QueryState) {
        let view = SavedView {
            query: self.codec.encode(state),
            saved_at: Utc::now(),
        };
        if let Err(e) = self.write(&view) {
            warn!(path = %self.path.display(), error = %e, "failed to save view");
        }
    }
}
