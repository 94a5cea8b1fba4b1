// ── Data fetcher ──
//
// Owns the ResultSet of one view and arbitrates overlapping requests.
// Every request is tagged with a sequence number; only the newest one is
// allowed to touch state, so a slow early response can never overwrite a
// fast later one.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use rollcall_api::{ListPage, ListParams};

use crate::error::CoreError;
use crate::model::{EntityId, ListItem};
use crate::query::{QueryChange, QueryState};

/// Where refinement of a collection happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Fetch the whole collection once; search, filter, sort and paginate locally.
    Client,
    /// Send only the search text; refine the rest locally.
    ServerSearch,
    /// Send search, filters, sort and paging; the server reports `total`.
    ServerFull,
}

impl ListMode {
    /// The request parameters this mode sends for `state`.
    pub fn params(self, state: &QueryState) -> ListParams {
        match self {
            Self::Client => ListParams::default(),
            Self::ServerSearch => ListParams::search(state.search_text()),
            Self::ServerFull => {
                let search = state.search_text();
                ListParams {
                    search: (!search.is_empty()).then(|| search.to_owned()),
                    filters: state
                        .filters()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
                        .collect(),
                    sort_by: Some(state.sort().field.clone()),
                    sort_order: Some(state.sort().order),
                    page: Some(state.page()),
                    page_size: Some(state.page_size()),
                }
            }
        }
    }

    /// Whether a change of this kind requires asking the server again.
    pub fn refetch_on(self, change: QueryChange) -> bool {
        match self {
            Self::Client => false,
            Self::ServerSearch => matches!(change, QueryChange::Search | QueryChange::Reset),
            Self::ServerFull => true,
        }
    }

    /// Whether visible rows are derived locally from the result set.
    pub fn refines_locally(self) -> bool {
        !matches!(self, Self::ServerFull)
    }
}

/// The fetched collection and its freshness.
#[derive(Debug, Clone)]
pub struct ResultSet<T> {
    items: Vec<T>,
    total: usize,
    stats: Option<serde_json::Value>,
    loading: bool,
    error: Option<String>,
    auth_expired: bool,
    fetched_at: Option<DateTime<Utc>>,
}

impl<T> Default for ResultSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            stats: None,
            loading: false,
            error: None,
            auth_expired: false,
            fetched_at: None,
        }
    }
}

impl<T> ResultSet<T> {
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Server-reported total, or the item count when the server sent none.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn stats(&self) -> Option<&serde_json::Value> {
        self.stats.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Human-readable message of the last failed fetch.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_auth_expired(&self) -> bool {
        self.auth_expired
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}

/// Handle for one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
}

impl FetchTicket {
    pub fn seq(self) -> u64 {
        self.seq
    }
}

/// What `Fetcher::resolve` did with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Newest response; result set replaced.
    Applied,
    /// Applied, but the page was clamped and the server must be asked again.
    Clamped,
    /// A newer request was issued meanwhile; response discarded.
    Stale,
    /// HTTP 401/403; the login collaborator takes over.
    AuthExpired,
    /// Any other failure; `error` is set and the items are emptied.
    Failed,
}

pub struct Fetcher<T> {
    result: ResultSet<T>,
    issued: u64,
}

impl<T> Default for Fetcher<T> {
    fn default() -> Self {
        Self {
            result: ResultSet::default(),
            issued: 0,
        }
    }
}

impl<T: ListItem> Fetcher<T> {
    pub fn result(&self) -> &ResultSet<T> {
        &self.result
    }

    /// Issue a new request: marks the set loading and supersedes every
    /// earlier ticket.
    pub fn begin(&mut self) -> FetchTicket {
        self.issued += 1;
        self.result.loading = true;
        debug!(seq = self.issued, collection = T::COLLECTION, "fetch started");
        FetchTicket { seq: self.issued }
    }

    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        ticket.seq == self.issued
    }

    /// Apply a response if `ticket` is the newest one issued.
    ///
    /// `loading` is cleared whenever the newest ticket resolves, on
    /// success and on failure alike.
    pub fn resolve(
        &mut self,
        ticket: FetchTicket,
        result: Result<ListPage<T>, CoreError>,
    ) -> FetchOutcome {
        if !self.is_current(ticket) {
            debug!(
                seq = ticket.seq,
                latest = self.issued,
                collection = T::COLLECTION,
                "discarding stale response"
            );
            return FetchOutcome::Stale;
        }

        self.result.loading = false;
        match result {
            Ok(page) => {
                self.result.total = usize::try_from(page.total_or_len()).unwrap_or(usize::MAX);
                self.result.items = page.items;
                self.result.stats = page.stats;
                self.result.error = None;
                self.result.auth_expired = false;
                self.result.fetched_at = Some(Utc::now());
                debug!(
                    seq = ticket.seq,
                    items = self.result.items.len(),
                    total = self.result.total,
                    "fetch applied"
                );
                FetchOutcome::Applied
            }
            Err(e) => {
                let expired = e.is_auth_expired();
                warn!(error = %e, collection = T::COLLECTION, "fetch failed");
                self.result.items.clear();
                self.result.total = 0;
                self.result.stats = None;
                self.result.error = Some(e.to_string());
                self.result.auth_expired = expired;
                if expired {
                    FetchOutcome::AuthExpired
                } else {
                    FetchOutcome::Failed
                }
            }
        }
    }

    /// Orphan every in-flight request (view teardown).
    pub fn invalidate(&mut self) {
        self.issued += 1;
        self.result.loading = false;
    }

    pub fn dismiss_error(&mut self) {
        self.result.error = None;
    }

    pub fn item(&self, id: &EntityId) -> Option<&T> {
        self.result.items.iter().find(|item| &item.id() == id)
    }

    /// Local copy for optimistic overlays; reconciled on the next fetch.
    pub fn item_mut(&mut self, id: &EntityId) -> Option<&mut T> {
        self.result.items.iter_mut().find(|item| &item.id() == id)
    }

    /// Replace the local copy of a record with the server's version.
    pub fn replace_item(&mut self, item: T) -> bool {
        let id = item.id();
        match self.item_mut(&id) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{InstructorStatus, Instructor};
    use crate::query::QueryState;

    fn instructor(id: i64, name: &str) -> Instructor {
        Instructor {
            id: EntityId::Int(id),
            name: name.into(),
            email: format!("{}@school.test", name.to_lowercase()),
            department: None,
            status: InstructorStatus::Active,
            rfid_tag: None,
            present_today: false,
            attendance_rate: None,
            last_check_in: None,
        }
    }

    fn page(names: &[&str]) -> ListPage<Instructor> {
        ListPage {
            items: names
                .iter()
                .zip(1..)
                .map(|(n, i)| instructor(i, n))
                .collect(),
            total: None,
            stats: None,
        }
    }

    #[test]
    fn last_issued_wins_regardless_of_arrival_order() {
        let mut f = Fetcher::<Instructor>::default();
        let first = f.begin();
        let second = f.begin();

        assert_eq!(f.resolve(second, Ok(page(&["Bob"]))), FetchOutcome::Applied);
        assert!(!f.result().is_loading());

        assert_eq!(f.resolve(first, Ok(page(&["Ann", "Cid"]))), FetchOutcome::Stale);
        assert_eq!(f.result().items().len(), 1);
        assert_eq!(f.result().items()[0].name, "Bob");
    }

    #[test]
    fn loading_stays_set_until_newest_resolves() {
        let mut f = Fetcher::<Instructor>::default();
        let first = f.begin();
        let second = f.begin();
        f.resolve(first, Ok(page(&["Ann"])));
        assert!(f.result().is_loading());
        f.resolve(second, Err(CoreError::Timeout));
        assert!(!f.result().is_loading());
    }

    #[test]
    fn failure_empties_items_and_sets_message() {
        let mut f = Fetcher::<Instructor>::default();
        let t = f.begin();
        f.resolve(t, Ok(page(&["Ann"])));

        let t = f.begin();
        let outcome = f.resolve(
            t,
            Err(CoreError::Api {
                message: "boom".into(),
                status: Some(500),
            }),
        );
        assert_eq!(outcome, FetchOutcome::Failed);
        assert!(f.result().items().is_empty());
        assert_eq!(f.result().error(), Some("Service error: boom"));
        assert!(!f.result().is_auth_expired());
    }

    #[test]
    fn auth_failure_is_distinct() {
        let mut f = Fetcher::<Instructor>::default();
        let t = f.begin();
        let outcome = f.resolve(
            t,
            Err(CoreError::AuthenticationExpired {
                message: "401".into(),
            }),
        );
        assert_eq!(outcome, FetchOutcome::AuthExpired);
        assert!(f.result().is_auth_expired());
    }

    #[test]
    fn success_clears_previous_error() {
        let mut f = Fetcher::<Instructor>::default();
        let t = f.begin();
        f.resolve(t, Err(CoreError::Timeout));
        let t = f.begin();
        f.resolve(t, Ok(page(&["Ann"])));
        assert!(f.result().error().is_none());
        assert_eq!(f.result().total(), 1);
    }

    #[test]
    fn invalidate_orphans_in_flight_requests() {
        let mut f = Fetcher::<Instructor>::default();
        let t = f.begin();
        f.invalidate();
        assert!(!f.result().is_loading());
        assert_eq!(f.resolve(t, Ok(page(&["Late"]))), FetchOutcome::Stale);
        assert!(f.result().items().is_empty());
    }

    #[test]
    fn replace_item_reconciles_local_copy() {
        let mut f = Fetcher::<Instructor>::default();
        let t = f.begin();
        f.resolve(t, Ok(page(&["Ann", "Bob"])));
        let mut updated = instructor(2, "Robert");
        updated.present_today = true;
        assert!(f.replace_item(updated));
        assert_eq!(f.item(&EntityId::Int(2)).unwrap().name, "Robert");
        assert!(!f.replace_item(instructor(99, "Nobody")));
    }

    #[test]
    fn modes_send_the_right_params() {
        let mut state = QueryState::for_item::<Instructor>();
        state.set_search_text("ann");
        state.set_filter("status", ["active"]);

        assert_eq!(ListMode::Client.params(&state), ListParams::default());
        assert_eq!(ListMode::ServerSearch.params(&state), ListParams::search("ann"));

        let full = ListMode::ServerFull.params(&state);
        assert_eq!(full.search.as_deref(), Some("ann"));
        assert_eq!(full.filters, vec![("status".to_owned(), vec!["active".to_owned()])]);
        assert_eq!(full.page, Some(1));

        assert!(!ListMode::Client.refetch_on(QueryChange::Search));
        assert!(ListMode::ServerSearch.refetch_on(QueryChange::Search));
        assert!(!ListMode::ServerSearch.refetch_on(QueryChange::Page));
        assert!(ListMode::ServerFull.refetch_on(QueryChange::Page));
    }
}
