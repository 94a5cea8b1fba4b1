// ── List-view controller ──
//
// One `ListController` backs one list view. It owns the query state, the
// result set, row expansion and the active dialog, and talks to the
// service through a `ListingSource`. Mutators are synchronous and report
// whether the service must be asked again; fetches and actions are split
// into begin/finish halves so an event loop never holds the controller
// across an await, with async conveniences layered on top.

use std::borrow::Cow;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use rollcall_api::ListParams;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bulk::{BulkReport, run_bulk};
use crate::command::OptimisticCommand;
use crate::config::ViewDefaults;
use crate::dialog::ActiveDialog;
use crate::engine::{self, FacetScope, FilterDefinition};
use crate::error::CoreError;
use crate::expansion::ExpansionSet;
use crate::fetch::{FetchOutcome, FetchTicket, Fetcher, ListMode, ResultSet};
use crate::model::{EntityId, ListItem};
use crate::persist::{NoPersistence, Persistence};
use crate::query::{QueryChange, QueryDefaults, QueryState, SortSpec};
use crate::selection::Selection;
use crate::source::ListingSource;

/// Where a view sends the user once the session is gone.
pub trait LoginRedirect: Send + Sync {
    fn redirect(&self, reason: &str);
}

impl<F> LoginRedirect for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect(&self, reason: &str) {
        self(reason);
    }
}

/// Logs the redirect and nothing else.
struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect(&self, reason: &str) {
        warn!(reason, "session expired, login required");
    }
}

pub struct ListController<T: ListItem, S> {
    source: Arc<S>,
    mode: ListMode,
    facet_scope: FacetScope,
    state: QueryState,
    fetcher: Fetcher<T>,
    expansion: ExpansionSet,
    details: HashMap<EntityId, T>,
    dialog: ActiveDialog,
    persistence: Box<dyn Persistence>,
    login: Box<dyn LoginRedirect>,
    mounted: bool,
}

impl<T: ListItem, S: ListingSource<T>> ListController<T, S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            mode: T::MODE,
            facet_scope: FacetScope::default(),
            state: QueryState::for_item::<T>(),
            fetcher: Fetcher::default(),
            expansion: ExpansionSet::default(),
            details: HashMap::new(),
            dialog: ActiveDialog::None,
            persistence: Box::new(NoPersistence),
            login: Box::new(LogRedirect),
            mounted: false,
        }
    }

    // ── Builder ─────────────────────────────────────────────────────

    #[must_use]
    pub fn with_mode(mut self, mode: ListMode) -> Self {
        self.mode = mode;
        self
    }

    /// Default page size for this view; replaces the current query state.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.state = QueryState::new(QueryDefaults::for_item::<T>().with_page_size(page_size));
        self
    }

    #[must_use]
    pub fn with_facet_scope(mut self, scope: FacetScope) -> Self {
        self.facet_scope = scope;
        self
    }

    #[must_use]
    pub fn with_view_defaults(self, defaults: ViewDefaults) -> Self {
        self.with_page_size(defaults.page_size)
            .with_facet_scope(defaults.facet_scope)
    }

    #[must_use]
    pub fn with_persistence(mut self, persistence: impl Persistence + 'static) -> Self {
        self.persistence = Box::new(persistence);
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, login: impl LoginRedirect + 'static) -> Self {
        self.login = Box::new(login);
        self
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Seed query state from persistence. The caller follows up with a fetch.
    pub fn mount(&mut self) {
        if let Some(saved) = self.persistence.load(&self.state) {
            debug!(collection = T::COLLECTION, "restored saved view");
            self.state = saved;
        }
        self.mounted = true;
        info!(collection = T::COLLECTION, mode = ?self.mode, "view mounted");
    }

    /// Orphan in-flight fetches and record the final state.
    pub fn unmount(&mut self) {
        self.fetcher.invalidate();
        self.persistence.save(&self.state);
        self.mounted = false;
        debug!(collection = T::COLLECTION, "view unmounted");
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn result(&self) -> &ResultSet<T> {
        self.fetcher.result()
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    pub fn facet_scope(&self) -> FacetScope {
        self.facet_scope
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn dialog(&self) -> &ActiveDialog {
        &self.dialog
    }

    pub fn selection(&self) -> &Selection {
        self.state.selection()
    }

    /// Map a user-typed id onto the loaded record it names, comparing
    /// display forms. Ids that name nothing loaded are kept verbatim.
    pub fn resolve_id(&self, raw: &str) -> EntityId {
        self.fetcher
            .result()
            .items()
            .iter()
            .map(ListItem::id)
            .find(|id| id.matches(raw))
            .unwrap_or_else(|| EntityId::verbatim(raw))
    }

    pub fn item(&self, id: &EntityId) -> Option<&T> {
        self.fetcher.item(id)
    }

    // ── Query mutators ──────────────────────────────────────────────
    //
    // Each returns `true` when the view must fetch again.

    pub fn set_search_text(&mut self, text: impl Into<String>) -> bool {
        let changed = self.state.set_search_text(text);
        self.after_change(changed, QueryChange::Search)
    }

    pub fn set_filter<I, V>(&mut self, key: &str, values: I) -> bool
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let changed = self.state.set_filter(key, values);
        self.after_change(changed, QueryChange::Filter)
    }

    pub fn toggle_filter_value(&mut self, key: &str, value: &str) -> bool {
        let changed = self.state.toggle_filter_value(key, value);
        self.after_change(changed, QueryChange::Filter)
    }

    pub fn clear_filters(&mut self) -> bool {
        let changed = self.state.clear_filters();
        self.after_change(changed, QueryChange::Filter)
    }

    pub fn set_sort(&mut self, field: &str) -> bool {
        self.state.set_sort(field);
        self.after_change(true, QueryChange::Sort)
    }

    pub fn set_sort_spec(&mut self, spec: SortSpec) -> bool {
        let changed = self.state.set_sort_spec(spec);
        self.after_change(changed, QueryChange::Sort)
    }

    pub fn set_page(&mut self, n: u32) -> bool {
        let changed = self.state.set_page(n);
        self.after_change(changed, QueryChange::Page)
    }

    pub fn next_page(&mut self) -> bool {
        if self.state.page() >= self.page_count() {
            return false;
        }
        self.set_page(self.state.page() + 1)
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.state.page().saturating_sub(1))
    }

    pub fn set_page_size(&mut self, n: u32) -> bool {
        let changed = self.state.set_page_size(n);
        self.after_change(changed, QueryChange::PageSize)
    }

    /// Restore every query field to its default and close any dialog.
    pub fn reset(&mut self) -> bool {
        let changed = !self.state.is_default() || !self.state.selection().is_empty();
        self.state.reset();
        self.dialog = ActiveDialog::None;
        self.after_change(changed, QueryChange::Reset)
    }

    fn after_change(&mut self, changed: bool, change: QueryChange) -> bool {
        if !changed {
            return false;
        }
        self.persistence.save(&self.state);
        self.mode.refetch_on(change)
    }

    // ── Fetching ────────────────────────────────────────────────────

    /// Mark the view loading and describe the request to send.
    pub fn begin_fetch(&mut self) -> (FetchTicket, ListParams) {
        let ticket = self.fetcher.begin();
        (ticket, self.mode.params(&self.state))
    }

    /// Apply a response. Clamps the page against the post-filter total;
    /// `Clamped` tells the caller the server must be asked for the new page.
    pub fn finish_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<rollcall_api::ListPage<T>, CoreError>,
    ) -> FetchOutcome {
        let outcome = self.fetcher.resolve(ticket, result);
        match outcome {
            FetchOutcome::Applied => {
                let total = self.total();
                if self.state.clamp_page(total) {
                    debug!(page = self.state.page(), total, "page clamped");
                    self.persistence.save(&self.state);
                    if self.mode == ListMode::ServerFull {
                        return FetchOutcome::Clamped;
                    }
                }
                outcome
            }
            FetchOutcome::AuthExpired => {
                let reason = self.result().error().unwrap_or("authentication required");
                self.login.redirect(reason);
                outcome
            }
            FetchOutcome::Clamped | FetchOutcome::Stale | FetchOutcome::Failed => outcome,
        }
    }

    /// Fetch and apply, re-asking once if the server page had to be clamped.
    pub async fn refresh(&mut self) -> FetchOutcome {
        let source = Arc::clone(&self.source);
        let (ticket, params) = self.begin_fetch();
        let result = source.list(&params).await;
        let outcome = self.finish_fetch(ticket, result);
        if outcome != FetchOutcome::Clamped {
            return outcome;
        }
        let (ticket, params) = self.begin_fetch();
        let result = source.list(&params).await;
        self.finish_fetch(ticket, result)
    }

    pub fn dismiss_error(&mut self) {
        self.fetcher.dismiss_error();
    }

    // ── Derived views ───────────────────────────────────────────────

    /// Query used for local refinement. Server-searched views have
    /// already applied the search text.
    fn local_query(&self) -> Cow<'_, QueryState> {
        if self.mode == ListMode::ServerSearch && !self.state.search_text().is_empty() {
            let mut local = self.state.clone();
            let page = local.page();
            local.set_search_text("");
            local.set_page(page);
            Cow::Owned(local)
        } else {
            Cow::Borrowed(&self.state)
        }
    }

    /// Rows on the current page, in display order.
    pub fn visible_rows(&self) -> Vec<&T> {
        let items = self.fetcher.result().items();
        if self.mode.refines_locally() {
            engine::refine(items, &self.local_query()).rows
        } else {
            items.iter().collect()
        }
    }

    pub fn visible_ids(&self) -> Vec<EntityId> {
        self.visible_rows().iter().map(|row| row.id()).collect()
    }

    /// Matching items across all pages.
    pub fn total(&self) -> usize {
        if self.mode.refines_locally() {
            engine::filter(self.fetcher.result().items(), &self.local_query()).len()
        } else {
            self.fetcher.result().total()
        }
    }

    pub fn page_count(&self) -> u32 {
        self.state.page_count(self.total())
    }

    pub fn facets(&self) -> Vec<FilterDefinition> {
        let result = self.fetcher.result();
        if self.mode.refines_locally() {
            engine::facets(result.items(), &self.local_query(), self.facet_scope)
        } else {
            engine::server_facets(result.items(), &self.state, result.stats())
        }
    }

    /// Nothing matched and nothing failed.
    pub fn is_empty_state(&self) -> bool {
        let result = self.fetcher.result();
        !result.is_loading() && result.error().is_none() && self.total() == 0
    }

    // ── Selection and expansion ─────────────────────────────────────

    pub fn toggle_row(&mut self, id: EntityId) -> bool {
        self.state.selection_mut().toggle_one(id)
    }

    pub fn toggle_all_on_page(&mut self) {
        let ids = self.visible_ids();
        self.state.selection_mut().toggle_all_on_page(&ids);
    }

    pub fn is_all_selected(&self) -> bool {
        self.state.selection().is_all_selected(&self.visible_ids())
    }

    pub fn is_indeterminate(&self) -> bool {
        self.state.selection().is_indeterminate(&self.visible_ids())
    }

    pub fn clear_selection(&mut self) {
        self.state.selection_mut().clear();
    }

    /// Flip a row's expansion. Returns `true` when it opened without a
    /// cached detail record, i.e. the detail should be fetched.
    pub fn toggle_expanded(&mut self, id: EntityId) -> bool {
        let needs_detail = !self.details.contains_key(&id);
        self.expansion.toggle(id) && needs_detail
    }

    pub fn is_expanded(&self, id: &EntityId) -> bool {
        self.expansion.is_expanded(id)
    }

    /// Detail record if fetched, else the list projection.
    pub fn detail(&self, id: &EntityId) -> Option<&T> {
        self.details.get(id).or_else(|| self.fetcher.item(id))
    }

    pub fn store_detail(&mut self, item: T) {
        self.details.insert(item.id(), item);
    }

    pub async fn load_detail(&mut self, id: &EntityId) -> Result<(), CoreError> {
        let source = Arc::clone(&self.source);
        match source.get(id).await {
            Ok(item) => {
                self.store_detail(item);
                Ok(())
            }
            Err(e) => Err(self.note_error(e)),
        }
    }

    // ── Dialogs ─────────────────────────────────────────────────────

    pub fn open_dialog(&mut self, dialog: ActiveDialog) {
        debug!(dialog = dialog.title(), "dialog opened");
        self.dialog = dialog;
    }

    pub fn close_dialog(&mut self) {
        self.dialog = ActiveDialog::None;
    }

    /// Ask for confirmation before deleting the current selection.
    pub fn confirm_bulk_delete(&mut self) -> bool {
        let count = self.state.selection().len();
        if count == 0 {
            return false;
        }
        self.open_dialog(ActiveDialog::BulkDelete { count });
        true
    }

    // ── Actions ─────────────────────────────────────────────────────

    /// Delete every selected record concurrently.
    ///
    /// Records with a soft-delete patch are updated instead of removed.
    /// Succeeded ids leave the selection; the view then refetches and the
    /// tally is shown in a `BulkResult` dialog.
    pub async fn bulk_delete(&mut self) -> BulkReport {
        let report = self.bulk_delete_job().await;
        self.finish_bulk(report).await
    }

    /// Detached half of [`bulk_delete`](Self::bulk_delete): the requests
    /// for the current selection, owning everything they need. Feed the
    /// report back through [`apply_bulk_report`](Self::apply_bulk_report).
    pub fn bulk_delete_job(&self) -> impl Future<Output = BulkReport> + Send + use<T, S> {
        let ids = self.state.selection().to_vec();
        let known = self.known_items();
        let check_known = self.mode.refines_locally();
        let source = Arc::clone(&self.source);

        async move {
            run_bulk(
                &ids,
                |id| !check_known || known.contains_key(id),
                |id| {
                    let source = Arc::clone(&source);
                    let local = known.get(&id).cloned();
                    async move { delete_with(source.as_ref(), &id, local).await }
                },
            )
            .await
        }
    }

    /// Apply the same PATCH to every selected record concurrently.
    pub async fn bulk_update(&mut self, patch: &Value) -> BulkReport {
        let ids = self.state.selection().to_vec();
        let known = self.known_items();
        let check_known = self.mode.refines_locally();
        let source = Arc::clone(&self.source);

        let report = run_bulk(
            &ids,
            |id| !check_known || known.contains_key(id),
            |id| {
                let source = Arc::clone(&source);
                async move { source.update(&id, patch).await.map(drop) }
            },
        )
        .await;

        self.finish_bulk(report).await
    }

    fn known_items(&self) -> HashMap<EntityId, T> {
        self.fetcher
            .result()
            .items()
            .iter()
            .map(|item| (item.id(), item.clone()))
            .collect()
    }

    async fn finish_bulk(&mut self, report: BulkReport) -> BulkReport {
        self.apply_bulk_report(&report);
        self.refresh().await;
        self.dialog = ActiveDialog::BulkResult(report.clone());
        report
    }

    /// Settle a finished bulk action: succeeded ids leave the selection and
    /// the tally dialog opens. The caller refetches.
    pub fn apply_bulk_report(&mut self, report: &BulkReport) {
        info!(
            collection = T::COLLECTION,
            succeeded = report.succeeded_count(),
            failed = report.failed_count(),
            "bulk action finished"
        );
        self.state.selection_mut().remove_all(&report.succeeded);
        for id in &report.succeeded {
            self.details.remove(id);
        }
        self.persistence.save(&self.state);
        self.dialog = ActiveDialog::BulkResult(report.clone());
    }

    /// Delete one record (soft delete where the record supports it).
    pub async fn delete_one(&mut self, id: &EntityId) -> Result<(), CoreError> {
        let result = self.delete_job(id).await;
        self.finish_delete(id, result)?;
        self.refresh().await;
        Ok(())
    }

    /// Detached half of [`delete_one`](Self::delete_one). Closes the
    /// confirmation dialog.
    pub fn delete_job(&mut self, id: &EntityId) -> impl Future<Output = Result<(), CoreError>> + Send + use<T, S> {
        let source = Arc::clone(&self.source);
        let local = self.fetcher.item(id).cloned();
        let id = id.clone();
        self.dialog = ActiveDialog::None;
        async move { delete_with(source.as_ref(), &id, local).await }
    }

    /// Settle a finished single delete. The caller refetches on success.
    pub fn finish_delete(&mut self, id: &EntityId, result: Result<(), CoreError>) -> Result<(), CoreError> {
        match result {
            Ok(()) => {
                self.state.selection_mut().remove_all([id]);
                self.details.remove(id);
                self.persistence.save(&self.state);
                Ok(())
            }
            Err(e) => Err(self.note_error(e)),
        }
    }

    /// Create a record. Validation errors come back untouched so a form
    /// can keep its input.
    pub async fn create(&mut self, body: &Value) -> Result<T, CoreError> {
        let source = Arc::clone(&self.source);
        match source.create(body).await {
            Ok(created) => {
                info!(collection = T::COLLECTION, id = %created.id(), "created");
                self.refresh().await;
                Ok(created)
            }
            Err(e) => Err(self.note_error(e)),
        }
    }

    // ── Optimistic updates ──────────────────────────────────────────

    /// Apply `cmd` to the local copy and return the PATCH body to send.
    /// `None` when the record is not loaded.
    pub fn apply_optimistic<C>(&mut self, id: &EntityId, cmd: &C) -> Option<Value>
    where
        C: OptimisticCommand<T> + ?Sized,
    {
        let item = self.fetcher.item_mut(id)?;
        cmd.apply(item);
        let patch = cmd.patch(item);
        if let Some(detail) = self.details.get_mut(id) {
            cmd.apply(detail);
        }
        debug!(%id, change = %cmd.describe(), "optimistic update applied");
        Some(patch)
    }

    /// Reconcile with the server's copy, or invert on failure.
    pub fn settle_optimistic<C>(
        &mut self,
        id: &EntityId,
        cmd: &C,
        result: Result<T, CoreError>,
    ) -> Result<(), CoreError>
    where
        C: OptimisticCommand<T> + ?Sized,
    {
        match result {
            Ok(server) => {
                if let Some(detail) = self.details.get_mut(id) {
                    *detail = server.clone();
                }
                self.fetcher.replace_item(server);
                Ok(())
            }
            Err(e) => {
                if let Some(item) = self.fetcher.item_mut(id) {
                    cmd.invert(item);
                }
                if let Some(detail) = self.details.get_mut(id) {
                    cmd.invert(detail);
                }
                warn!(%id, change = %cmd.describe(), "optimistic update rolled back");
                Err(self.note_error(e))
            }
        }
    }

    pub async fn execute_optimistic<C>(&mut self, id: &EntityId, cmd: &C) -> Result<(), CoreError>
    where
        C: OptimisticCommand<T> + ?Sized,
    {
        let Some(patch) = self.apply_optimistic(id, cmd) else {
            return Err(CoreError::NotFound {
                entity_type: T::NOUN.into(),
                identifier: id.to_string(),
            });
        };
        let source = Arc::clone(&self.source);
        let result = source.update(id, &patch).await;
        self.settle_optimistic(id, cmd, result)
    }

    /// Log an action failure and hand auth failures to the login collaborator.
    fn note_error(&self, err: CoreError) -> CoreError {
        warn!(collection = T::COLLECTION, error = %err, "action failed");
        if err.is_auth_expired() {
            self.login.redirect(&err.to_string());
        }
        err
    }
}

/// Soft delete via PATCH where the record has one, else DELETE. Records
/// not loaded locally are fetched first to decide.
async fn delete_with<T, S>(source: &S, id: &EntityId, local: Option<T>) -> Result<(), CoreError>
where
    T: ListItem,
    S: ListingSource<T>,
{
    let item = match local {
        Some(item) => item,
        None => source.get(id).await?,
    };
    match item.soft_delete_patch() {
        Some(patch) => source.update(id, &patch).await.map(drop),
        None => source.delete(id).await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::bulk::VANISHED_REASON;
    use crate::command::ToggleStarred;
    use crate::model::{Email, Folder, Instructor, InstructorStatus, Priority};
    use crate::persist::{MemoryAddressBar, QueryCodec, UrlSynchronizer};
    use crate::source::MemorySource;

    fn instructor(id: i64, name: &str) -> Instructor {
        Instructor {
            id: EntityId::Int(id),
            name: name.into(),
            email: format!("{}@school.test", name.to_lowercase()),
            department: Some(if id % 2 == 0 { "Math" } else { "Science" }.into()),
            status: InstructorStatus::Active,
            rfid_tag: None,
            present_today: id % 3 == 0,
            attendance_rate: None,
            last_check_in: None,
        }
    }

    fn staff(n: i64) -> Vec<Instructor> {
        (1..=n).map(|i| instructor(i, &format!("Teacher{i:02}"))).collect()
    }

    fn email(id: i64, folder: Folder) -> Email {
        Email {
            id: EntityId::Int(id),
            subject: format!("Notice {id}"),
            sender: "office@school.test".into(),
            recipients: vec!["staff@school.test".into()],
            folder,
            priority: Priority::Normal,
            read: false,
            starred: false,
            received_at: Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap()
                + chrono::Duration::minutes(id),
            preview: None,
            body: None,
        }
    }

    async fn mounted_instructors(items: Vec<Instructor>, page_size: u32) -> ListController<Instructor, MemorySource<Instructor>> {
        let mut ctl = ListController::<Instructor, _>::new(Arc::new(MemorySource::new(items))).with_page_size(page_size);
        ctl.mount();
        assert_eq!(ctl.refresh().await, FetchOutcome::Applied);
        ctl
    }

    #[tokio::test]
    async fn pagination_over_local_results() {
        let mut ctl = mounted_instructors(staff(7), 5).await;
        assert_eq!(ctl.visible_rows().len(), 5);
        assert_eq!(ctl.page_count(), 2);

        assert!(!ctl.set_page(2), "client mode never refetches");
        let names: Vec<&str> = ctl.visible_rows().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Teacher06", "Teacher07"]);

        ctl.set_page(3);
        assert!(ctl.visible_rows().is_empty());
    }

    #[tokio::test]
    async fn page_is_clamped_after_fetch() {
        let mut ctl = mounted_instructors(staff(7), 5).await;
        ctl.set_page(4);
        assert_eq!(ctl.refresh().await, FetchOutcome::Applied);
        assert_eq!(ctl.state().page(), 2);
    }

    #[tokio::test]
    async fn context_change_clears_selection_but_paging_does_not() {
        let mut ctl = mounted_instructors(staff(12), 5).await;
        ctl.toggle_all_on_page();
        assert!(ctl.is_all_selected());
        ctl.set_page(2);
        assert_eq!(ctl.selection().len(), 5);
        assert!(!ctl.is_indeterminate());

        ctl.set_search_text("teacher1");
        assert!(ctl.selection().is_empty());
        assert_eq!(ctl.state().page(), 1);
        assert_eq!(ctl.total(), 3);
    }

    #[tokio::test]
    async fn bulk_delete_reports_partial_failure() {
        let source = Arc::new(MemorySource::new(staff(3)));
        source.fail_on(EntityId::Int(2));
        let mut ctl = ListController::<Instructor, _>::new(Arc::clone(&source));
        ctl.mount();
        ctl.refresh().await;

        for id in 1..=3 {
            ctl.toggle_row(EntityId::Int(id));
        }
        assert!(ctl.confirm_bulk_delete());
        assert_eq!(ctl.dialog(), &ActiveDialog::BulkDelete { count: 3 });

        let report = ctl.bulk_delete().await;
        assert_eq!(report.succeeded_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(ctl.selection().to_vec(), vec![EntityId::Int(2)]);
        assert_eq!(ctl.result().items().len(), 1);
        assert!(matches!(ctl.dialog(), ActiveDialog::BulkResult(r) if r == &report));
    }

    #[tokio::test]
    async fn bulk_update_patches_each_selected_record() {
        let source = Arc::new(MemorySource::new(staff(3)));
        source.fail_on(EntityId::Int(3));
        let mut ctl = ListController::<Instructor, _>::new(Arc::clone(&source)).with_mode(ListMode::ServerFull);
        assert!(!ctl.is_mounted());
        ctl.mount();
        assert!(ctl.is_mounted());
        ctl.refresh().await;

        ctl.toggle_all_on_page();
        let report = ctl.bulk_update(&json!({ "status": "on_leave" })).await;
        assert_eq!(report.summary(), "2 succeeded, 1 failed");
        assert_eq!(ctl.selection().to_vec(), vec![EntityId::Int(3)]);

        let statuses: Vec<InstructorStatus> = source.snapshot().iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            [InstructorStatus::OnLeave, InstructorStatus::OnLeave, InstructorStatus::Active]
        );
        assert_eq!(source.list_calls(), 2);

        ctl.unmount();
        assert!(!ctl.is_mounted());
    }

    #[tokio::test]
    async fn typed_ids_resolve_against_string_keyed_records() {
        let mut stored = instructor(42, "Ada");
        stored.id = EntityId::Str("42".into());
        let source = Arc::new(MemorySource::new(vec![stored, instructor(7, "Bob")]));
        let mut ctl = ListController::<Instructor, _>::new(Arc::clone(&source));
        ctl.mount();
        ctl.refresh().await;

        assert_eq!(ctl.resolve_id("42"), EntityId::Str("42".into()));
        assert_eq!(ctl.resolve_id("7"), EntityId::Int(7));
        assert_eq!(ctl.resolve_id("007"), EntityId::Str("007".into()));

        ctl.toggle_row(ctl.resolve_id("42"));
        let report = ctl.bulk_delete().await;
        assert!(report.is_complete_success(), "{report:?}");
        assert_eq!(source.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn detached_jobs_run_without_borrowing_the_controller() {
        let mut ctl = mounted_instructors(staff(3), 10).await;
        ctl.toggle_row(EntityId::Int(1));
        ctl.toggle_row(EntityId::Int(3));

        let report = tokio::spawn(ctl.bulk_delete_job()).await.unwrap();
        ctl.apply_bulk_report(&report);
        assert!(ctl.selection().is_empty());
        assert!(matches!(ctl.dialog(), ActiveDialog::BulkResult(_)));

        let id = EntityId::Int(2);
        let result = tokio::spawn(ctl.delete_job(&id)).await.unwrap();
        ctl.finish_delete(&id, result).unwrap();
        assert!(!ctl.dialog().is_open());
        assert_eq!(ctl.refresh().await, FetchOutcome::Applied);
        assert_eq!(ctl.total(), 0);
    }

    #[tokio::test]
    async fn vanished_ids_fail_softly_without_a_request() {
        let mut ctl = mounted_instructors(staff(2), 10).await;
        ctl.toggle_row(EntityId::Int(1));
        ctl.toggle_row(EntityId::Int(99));

        let report = ctl.bulk_delete().await;
        assert_eq!(report.succeeded, vec![EntityId::Int(1)]);
        assert_eq!(report.failed[0].id, EntityId::Int(99));
        assert_eq!(report.failed[0].reason, VANISHED_REASON);
    }

    #[tokio::test]
    async fn auth_failure_redirects_and_empties_items() {
        let redirects = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&redirects);
        let source = Arc::new(MemorySource::new(staff(3)));
        let mut ctl = ListController::<Instructor, _>::new(Arc::clone(&source)).with_login_redirect(move |_: &str| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        ctl.mount();
        ctl.refresh().await;
        assert_eq!(ctl.result().items().len(), 3);

        source.fail_list(Some(|| CoreError::AuthenticationExpired {
            message: "token revoked".into(),
        }));
        assert_eq!(ctl.refresh().await, FetchOutcome::AuthExpired);
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
        assert!(ctl.result().items().is_empty());
        assert!(ctl.result().is_auth_expired());
        assert!(!ctl.result().is_loading());
    }

    #[tokio::test]
    async fn failure_replaces_items_with_empty_set() {
        let source = Arc::new(MemorySource::new(staff(3)));
        let mut ctl = ListController::<Instructor, _>::new(Arc::clone(&source));
        ctl.refresh().await;
        source.fail_list(Some(|| CoreError::Timeout));

        assert_eq!(ctl.refresh().await, FetchOutcome::Failed);
        assert!(ctl.result().items().is_empty());
        assert_eq!(ctl.result().error(), Some("Request timed out"));
        assert!(!ctl.is_empty_state());

        source.fail_list(None);
        ctl.dismiss_error();
        ctl.refresh().await;
        assert_eq!(ctl.result().items().len(), 3);
    }

    #[tokio::test]
    async fn older_response_never_overwrites_newer() {
        let source = Arc::new(MemorySource::new(staff(3)));
        let mut ctl = ListController::<Instructor, _>::new(Arc::clone(&source));

        let (first, params) = ctl.begin_fetch();
        let slow = source.list(&params).await;
        let (second, params) = ctl.begin_fetch();
        let fast = source.list(&params).await;

        assert_eq!(ctl.finish_fetch(second, fast), FetchOutcome::Applied);
        assert_eq!(ctl.finish_fetch(first, Err(CoreError::Timeout)), FetchOutcome::Stale);
        assert_eq!(ctl.result().items().len(), 3);
        assert!(ctl.result().error().is_none());
        drop(slow);
    }

    #[tokio::test]
    async fn server_mode_refetches_and_clamps() {
        let emails: Vec<Email> = (1..=12).map(|i| email(i, Folder::Inbox)).collect();
        let source = Arc::new(MemorySource::new(emails));
        let mut ctl = ListController::<Email, _>::new(Arc::clone(&source)).with_page_size(5);
        assert_eq!(ctl.mode(), ListMode::ServerFull);

        assert!(ctl.set_page(5));
        assert_eq!(ctl.refresh().await, FetchOutcome::Applied);
        assert_eq!(ctl.state().page(), 3);
        assert_eq!(ctl.visible_rows().len(), 2);
        assert_eq!(source.list_calls(), 2);

        assert!(ctl.set_filter("folder", ["archive"]));
        ctl.refresh().await;
        assert!(ctl.is_empty_state());
    }

    #[tokio::test]
    async fn server_paged_facets_keep_every_option() {
        let emails: Vec<Email> = (1..=12)
            .map(|i| email(i, if i <= 8 { Folder::Inbox } else { Folder::Archive }))
            .collect();
        let source = Arc::new(MemorySource::new(emails));
        let mut ctl = ListController::<Email, _>::new(source).with_page_size(5);
        ctl.set_filter("folder", ["archive"]);
        ctl.refresh().await;
        assert_eq!(ctl.visible_rows().len(), 4);

        let defs = ctl.facets();
        let folder = defs.iter().find(|f| f.key == "folder").unwrap();
        assert_eq!(folder.count_of("inbox"), Some(8));
        assert_eq!(folder.count_of("archive"), Some(4));
        assert_eq!(folder.count_of("sent"), Some(0));
        assert!(folder.options.iter().any(|o| o.value == "trash"));
    }

    #[tokio::test]
    async fn email_delete_moves_to_trash() {
        let source = Arc::new(MemorySource::new(vec![
            email(1, Folder::Inbox),
            email(2, Folder::Inbox),
            email(3, Folder::Trash),
        ]));
        let mut ctl = ListController::<Email, _>::new(Arc::clone(&source));
        ctl.refresh().await;
        ctl.toggle_row(EntityId::Int(1));
        ctl.toggle_row(EntityId::Int(3));

        let report = ctl.bulk_delete().await;
        assert!(report.is_complete_success());

        let left = source.snapshot();
        assert_eq!(left.len(), 2);
        assert!(left.iter().all(|e| e.folder == Folder::Trash || e.id == EntityId::Int(2)));
        assert_eq!(left.iter().find(|e| e.id == EntityId::Int(1)).unwrap().folder, Folder::Trash);
    }

    #[tokio::test]
    async fn optimistic_toggle_rolls_back_on_failure() {
        let source = Arc::new(MemorySource::new(vec![email(1, Folder::Inbox), email(2, Folder::Inbox)]));
        source.fail_on(EntityId::Int(2));
        let mut ctl = ListController::<Email, _>::new(Arc::clone(&source));
        ctl.refresh().await;

        ctl.execute_optimistic(&EntityId::Int(1), &ToggleStarred).await.unwrap();
        assert!(ctl.item(&EntityId::Int(1)).unwrap().starred);
        assert!(source.snapshot()[0].starred);

        let err = ctl.execute_optimistic(&EntityId::Int(2), &ToggleStarred).await;
        assert!(err.is_err());
        assert!(!ctl.item(&EntityId::Int(2)).unwrap().starred);
    }

    #[tokio::test]
    async fn optimistic_change_is_visible_before_settling() {
        let source = Arc::new(MemorySource::new(vec![email(1, Folder::Inbox)]));
        let mut ctl = ListController::<Email, _>::new(Arc::clone(&source));
        ctl.refresh().await;

        let patch = ctl.apply_optimistic(&EntityId::Int(1), &ToggleStarred).unwrap();
        assert_eq!(patch, json!({ "starred": true }));
        assert!(ctl.item(&EntityId::Int(1)).unwrap().starred);

        let settled = ctl.settle_optimistic(&EntityId::Int(1), &ToggleStarred, Err(CoreError::Timeout));
        assert!(settled.is_err());
        assert!(!ctl.item(&EntityId::Int(1)).unwrap().starred);
    }

    #[tokio::test]
    async fn mount_seeds_state_from_address_bar() {
        let bar = MemoryAddressBar::new("/instructors").with_query("search=teacher0&page=2&pageSize=3");
        let sync = UrlSynchronizer::new(QueryCodec::for_item::<Instructor>(), bar);
        let mut ctl = ListController::<Instructor, _>::new(Arc::new(MemorySource::new(staff(12)))).with_persistence(sync);
        ctl.mount();
        ctl.refresh().await;

        assert_eq!(ctl.state().search_text(), "teacher0");
        assert_eq!(ctl.state().page(), 2);
        assert_eq!(ctl.total(), 9);
        let names: Vec<&str> = ctl.visible_rows().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Teacher04", "Teacher05", "Teacher06"]);
    }

    #[tokio::test]
    async fn expansion_requests_detail_once() {
        let mut ctl = mounted_instructors(staff(3), 10).await;
        let id = EntityId::Int(2);
        assert!(ctl.toggle_expanded(id.clone()));
        ctl.load_detail(&id).await.unwrap();
        assert!(!ctl.toggle_expanded(id.clone()));
        assert!(!ctl.toggle_expanded(id.clone()));
        assert!(ctl.is_expanded(&id));
        assert_eq!(ctl.detail(&id).unwrap().name, "Teacher02");
    }

    #[tokio::test]
    async fn facets_follow_the_configured_scope() {
        let mut ctl = mounted_instructors(staff(6), 10).await;
        ctl.set_filter("department", ["Math"]);

        let global = ctl.facets();
        let presence = global.iter().find(|f| f.key == "presence").unwrap();
        assert_eq!(presence.count_of("absent"), Some(4));

        let mut ctl = ctl.with_facet_scope(FacetScope::Contextual);
        ctl.set_filter("department", ["Math"]);
        let contextual = ctl.facets();
        let presence = contextual.iter().find(|f| f.key == "presence").unwrap();
        assert_eq!(presence.count_of("absent"), Some(2));
    }

    #[tokio::test]
    async fn reset_restores_defaults_and_closes_dialog() {
        let mut ctl = mounted_instructors(staff(12), 5).await;
        ctl.set_search_text("teacher");
        ctl.set_sort("email");
        ctl.open_dialog(ActiveDialog::BulkDelete { count: 1 });
        assert!(!ctl.reset());
        assert!(ctl.state().is_default());
        assert!(!ctl.dialog().is_open());
    }
}
