//! Generic list screen: one `ListController` rendered as a table with a
//! facet panel, paging footer, detail pane and modal dialogs.
//!
//! Requests never hold the controller across an await. Each one is
//! spawned with clones of what it needs and reports back through the
//! screen's inbox, which is drained on every tick.

use std::future::Future;
use std::marker::PhantomData;
use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};
use rollcall_api::{ListPage, SortDirection};
use rollcall_core::poll::{PROGRESS_POLL_INTERVAL, spawn_interval};
use rollcall_core::{
    ActiveDialog, BulkReport, CoreError, Debouncer, EntityId, FetchOutcome, FetchTicket, FilePersistence,
    HttpSource, ListController, ListItem, ListingSource, MemorySource, OptimisticCommand, ViewDefaults,
};
use serde_json::{Value, json};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::action::{Action, Notification};
use crate::component::Component;
use crate::theme;
use crate::widgets::{facets, popup};

/// Page sizes offered by `+` / `-`.
const PAGE_SIZES: [u32; 5] = [5, 10, 25, 50, 100];

const FACET_PANEL_WIDTH: u16 = 26;
const DETAIL_HEIGHT: u16 = 9;

// ── Collection seam ─────────────────────────────────────────────────

/// Named server-side actions beyond CRUD (`POST /{collection}/{id}/{action}`).
pub trait ActionSource<T: ListItem>: ListingSource<T> {
    fn invoke(&self, id: &EntityId, action: &str) -> impl Future<Output = Result<T, CoreError>> + Send;
}

impl<T: ListItem> ActionSource<T> for HttpSource<T> {
    async fn invoke(&self, id: &EntityId, action: &str) -> Result<T, CoreError> {
        self.action(id, action, &json!({})).await
    }
}

/// In memory there are no jobs; the action just reads the record back.
impl<T: ListItem> ActionSource<T> for MemorySource<T> {
    async fn invoke(&self, id: &EntityId, _action: &str) -> Result<T, CoreError> {
        self.get(id).await
    }
}

/// Something a collection asks the screen to do.
pub enum ViewCommand<T> {
    Optimistic(EntityId, Box<dyn OptimisticCommand<T>>),
    Open(ActiveDialog),
    Create { body: Value, label: String },
}

/// What one collection contributes to the generic screen: columns,
/// detail lines, and its own keys.
pub trait CollectionView: Send + 'static {
    type Item: ListItem;

    const TITLE: &'static str;
    const COLUMNS: &'static [(&'static str, Constraint)];
    /// Extra key hints shown in the footer.
    const HINTS: &'static [(&'static str, &'static str)] = &[];

    fn cells(item: &Self::Item, now: DateTime<Utc>) -> Vec<Cell<'static>>;

    fn detail(item: &Self::Item, now: DateTime<Utc>) -> Vec<Line<'static>>;

    /// Collection-specific key on the row under the cursor.
    fn on_key(_key: KeyEvent, _row: Option<&Self::Item>) -> Option<ViewCommand<Self::Item>> {
        None
    }

    /// Command for a submitted `Assign` prompt.
    fn assign(_item: &Self::Item, _draft: &str) -> Option<Box<dyn OptimisticCommand<Self::Item>>> {
        None
    }

    /// A job on this record is still running; the screen polls while any is.
    fn is_busy(_item: &Self::Item) -> bool {
        false
    }
}

// ── Inbox ───────────────────────────────────────────────────────────

enum Msg<T> {
    Fetched(FetchTicket, Result<ListPage<T>, CoreError>),
    Detail(Result<T, CoreError>),
    Deleted(EntityId, Result<(), CoreError>),
    Bulk(BulkReport),
    Settled(EntityId, Box<dyn OptimisticCommand<T>>, Result<T, CoreError>),
    Done(Result<String, CoreError>),
    Poll,
}

// ── Screen ──────────────────────────────────────────────────────────

pub struct ListScreen<V: CollectionView, S> {
    controller: ListController<V::Item, S>,
    action_tx: UnboundedSender<Action>,
    inbox_tx: UnboundedSender<Msg<V::Item>>,
    inbox: UnboundedReceiver<Msg<V::Item>>,
    search: Debouncer<String>,
    debounce: std::time::Duration,
    table_state: TableState,
    /// Focused facet entry; `None` while the table has focus.
    facet_cursor: Option<usize>,
    poll: Option<CancellationToken>,
    focused: bool,
    loaded: bool,
    now: DateTime<Utc>,
    _view: PhantomData<V>,
}

impl<V, S> ListScreen<V, S>
where
    V: CollectionView,
    S: ActionSource<V::Item>,
{
    /// Build and mount the view. Nothing is fetched until first focus.
    pub fn new(
        source: Arc<S>,
        view: ViewDefaults,
        persistence: Option<FilePersistence>,
        action_tx: UnboundedSender<Action>,
    ) -> Self {
        let login_tx = action_tx.clone();
        let mut controller = ListController::new(source)
            .with_view_defaults(view)
            .with_login_redirect(move |reason: &str| {
                let _ = login_tx.send(Action::SessionExpired(reason.to_owned()));
            });
        if let Some(persistence) = persistence {
            controller = controller.with_persistence(persistence);
        }
        controller.mount();

        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let search = Debouncer::spawn(controller.state().search_text().to_owned(), view.debounce);

        Self {
            controller,
            action_tx,
            inbox_tx,
            inbox,
            search,
            debounce: view.debounce,
            table_state: TableState::default().with_selected(Some(0)),
            facet_cursor: None,
            poll: None,
            focused: false,
            loaded: false,
            now: Utc::now(),
            _view: PhantomData,
        }
    }

    #[cfg(test)]
    pub fn controller(&self) -> &ListController<V::Item, S> {
        &self.controller
    }

    // ── Requests ────────────────────────────────────────────────────

    fn fetch(&mut self) {
        let (ticket, params) = self.controller.begin_fetch();
        let source = Arc::clone(self.controller.source());
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = source.list(&params).await;
            let _ = tx.send(Msg::Fetched(ticket, result));
        });
    }

    fn refetch_if(&mut self, changed: bool) {
        if changed {
            self.fetch();
        }
    }

    fn load_detail(&self, id: EntityId) {
        let source = Arc::clone(self.controller.source());
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = source.get(&id).await;
            let _ = tx.send(Msg::Detail(result));
        });
    }

    fn delete(&mut self, id: EntityId) {
        let job = self.controller.delete_job(&id);
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = job.await;
            let _ = tx.send(Msg::Deleted(id, result));
        });
    }

    fn bulk_delete(&mut self) {
        let count = self.controller.selection().len();
        self.controller.close_dialog();
        let job = self.controller.bulk_delete_job();
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(Msg::Bulk(job.await));
        });
        self.notify(Notification::info(format!("Deleting {count} {}s", V::Item::NOUN)));
    }

    fn optimistic(&mut self, id: EntityId, cmd: Box<dyn OptimisticCommand<V::Item>>) {
        let Some(patch) = self.controller.apply_optimistic(&id, cmd.as_ref()) else {
            return;
        };
        let source = Arc::clone(self.controller.source());
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = source.update(&id, &patch).await;
            let _ = tx.send(Msg::Settled(id, cmd, result));
        });
    }

    fn create(&self, body: Value, label: String) {
        let source = Arc::clone(self.controller.source());
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = source.create(&body).await.map(|_| format!("Created {label}"));
            let _ = tx.send(Msg::Done(result));
        });
    }

    fn restore(&mut self, id: EntityId, label: String) {
        self.controller.close_dialog();
        let source = Arc::clone(self.controller.source());
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            let result = source
                .invoke(&id, "restore")
                .await
                .map(|_| format!("Restore from {label} started"));
            let _ = tx.send(Msg::Done(result));
        });
    }

    /// Poll while any record has a running job; stop once none does.
    fn update_polling(&mut self) {
        let busy = self.controller.result().items().iter().any(V::is_busy);
        match (busy, self.poll.is_some()) {
            (true, false) => {
                debug!(collection = V::Item::COLLECTION, "progress polling started");
                let cancel = CancellationToken::new();
                let tx = self.inbox_tx.clone();
                spawn_interval(PROGRESS_POLL_INTERVAL, cancel.clone(), move || {
                    let sent = tx.send(Msg::Poll);
                    async move {
                        if sent.is_ok() {
                            ControlFlow::Continue(())
                        } else {
                            ControlFlow::Break(())
                        }
                    }
                });
                self.poll = Some(cancel);
            }
            (false, true) => {
                debug!(collection = V::Item::COLLECTION, "progress polling stopped");
                if let Some(cancel) = self.poll.take() {
                    cancel.cancel();
                }
            }
            _ => {}
        }
    }

    // ── Inbox ───────────────────────────────────────────────────────

    fn drain(&mut self) {
        while let Ok(msg) = self.inbox.try_recv() {
            self.handle_msg(msg);
        }
        if let Some(text) = self.search.poll_settled() {
            let changed = self.controller.set_search_text(text);
            self.refetch_if(changed);
            self.select(0);
        }
    }

    fn handle_msg(&mut self, msg: Msg<V::Item>) {
        match msg {
            Msg::Fetched(ticket, result) => match self.controller.finish_fetch(ticket, result) {
                FetchOutcome::Clamped => self.fetch(),
                FetchOutcome::Applied => {
                    self.clamp_cursor();
                    self.update_polling();
                }
                FetchOutcome::Failed => {
                    let message = self.controller.result().error().unwrap_or("request failed").to_owned();
                    self.notify(Notification::error(message));
                }
                FetchOutcome::Stale | FetchOutcome::AuthExpired => {}
            },
            Msg::Detail(Ok(item)) => self.controller.store_detail(item),
            Msg::Detail(Err(e)) | Msg::Done(Err(e)) => self.report(&e),
            Msg::Deleted(id, result) => match self.controller.finish_delete(&id, result) {
                Ok(()) => {
                    self.notify(Notification::success(format!("Deleted {}", V::Item::NOUN)));
                    self.fetch();
                }
                Err(e) => self.report_noted(&e),
            },
            Msg::Bulk(report) => {
                self.controller.apply_bulk_report(&report);
                let note = if report.is_complete_success() {
                    Notification::success(report.summary())
                } else {
                    Notification::warning(report.summary())
                };
                self.notify(note);
                self.fetch();
            }
            Msg::Settled(id, cmd, result) => {
                if let Err(e) = self.controller.settle_optimistic(&id, cmd.as_ref(), result) {
                    if !e.is_auth_expired() {
                        self.notify(Notification::error(format!("{}: {e}", cmd.describe())));
                    }
                }
            }
            Msg::Done(Ok(message)) => {
                self.notify(Notification::success(message));
                self.fetch();
            }
            Msg::Poll => {
                if !self.controller.result().is_loading() {
                    self.fetch();
                }
            }
        }
    }

    fn notify(&self, note: Notification) {
        let _ = self.action_tx.send(Action::Notify(note));
    }

    /// Errors that did not pass through the controller.
    fn report(&self, err: &CoreError) {
        let action = if err.is_auth_expired() {
            Action::SessionExpired(err.to_string())
        } else {
            Action::Notify(Notification::error(err.to_string()))
        };
        let _ = self.action_tx.send(action);
    }

    /// Errors the controller already logged and redirected.
    fn report_noted(&self, err: &CoreError) {
        if !err.is_auth_expired() {
            self.notify(Notification::error(err.to_string()));
        }
    }

    // ── Cursor ──────────────────────────────────────────────────────

    fn cursor(&self) -> usize {
        self.table_state.selected().unwrap_or(0)
    }

    fn select(&mut self, idx: usize) {
        let len = self.controller.visible_rows().len();
        self.table_state.select(Some(idx.min(len.saturating_sub(1))));
    }

    fn move_cursor(&mut self, down: bool, by: usize) {
        let idx = if down {
            self.cursor().saturating_add(by)
        } else {
            self.cursor().saturating_sub(by)
        };
        self.select(idx);
    }

    fn clamp_cursor(&mut self) {
        self.select(self.cursor());
    }

    fn current(&self) -> Option<&V::Item> {
        self.controller.visible_rows().get(self.cursor()).copied()
    }

    fn current_id(&self) -> Option<EntityId> {
        self.current().map(ListItem::id)
    }

    // ── Keys ────────────────────────────────────────────────────────

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        match (self.controller.dialog().clone(), key.code) {
            (ActiveDialog::ConfirmDelete { id, .. }, KeyCode::Char('y' | 'Y')) => self.delete(id),
            (ActiveDialog::BulkDelete { .. }, KeyCode::Char('y' | 'Y')) => self.bulk_delete(),
            (ActiveDialog::Restore { id, label }, KeyCode::Char('y' | 'Y')) => self.restore(id, label),
            (
                ActiveDialog::ConfirmDelete { .. } | ActiveDialog::BulkDelete { .. } | ActiveDialog::Restore { .. },
                KeyCode::Char('n' | 'N'),
            )
            | (_, KeyCode::Esc) => self.controller.close_dialog(),
            (ActiveDialog::Assign { id, mut draft }, code) => match code {
                KeyCode::Enter => {
                    self.controller.close_dialog();
                    let cmd = self.controller.item(&id).and_then(|item| V::assign(item, draft.trim()));
                    if let Some(cmd) = cmd {
                        self.optimistic(id, cmd);
                    }
                }
                KeyCode::Backspace => {
                    draft.pop();
                    self.controller.open_dialog(ActiveDialog::Assign { id, draft });
                }
                KeyCode::Char(c) => {
                    draft.push(c);
                    self.controller.open_dialog(ActiveDialog::Assign { id, draft });
                }
                _ => {}
            },
            (ActiveDialog::BulkResult(_), KeyCode::Enter | KeyCode::Char('q')) => self.controller.close_dialog(),
            _ => {}
        }
    }

    fn handle_facet_key(&mut self, key: KeyEvent, cursor: usize) {
        let entries = facets::entries(&self.controller.facets());
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.facet_cursor = Some((cursor + 1).min(entries.len().saturating_sub(1)));
            }
            KeyCode::Char('k') | KeyCode::Up => self.facet_cursor = Some(cursor.saturating_sub(1)),
            KeyCode::Char(' ') | KeyCode::Enter => {
                if let Some((key, value)) = entries.get(cursor) {
                    let changed = self.controller.toggle_filter_value(key, value);
                    self.refetch_if(changed);
                    self.select(0);
                }
            }
            KeyCode::Char('c') => {
                let changed = self.controller.clear_filters();
                self.refetch_if(changed);
            }
            KeyCode::Char('f') | KeyCode::Esc | KeyCode::Tab => self.facet_cursor = None,
            _ => {}
        }
    }

    fn run(&mut self, cmd: ViewCommand<V::Item>) {
        match cmd {
            ViewCommand::Optimistic(id, cmd) => self.optimistic(id, cmd),
            ViewCommand::Open(dialog) => self.controller.open_dialog(dialog),
            ViewCommand::Create { body, label } => self.create(body, label),
        }
    }

    fn cycle_sort(&mut self) {
        let fields = V::Item::SORT_FIELDS;
        let current = self.controller.state().sort().field.as_str();
        let idx = fields
            .iter()
            .position(|f| *f == current)
            .map_or(0, |i| (i + 1) % fields.len());
        if let Some(field) = fields.get(idx) {
            let changed = self.controller.set_sort(field);
            self.refetch_if(changed);
        }
    }

    fn flip_sort(&mut self) {
        let field = self.controller.state().sort().field.clone();
        let changed = self.controller.set_sort(&field);
        self.refetch_if(changed);
    }

    fn step_page_size(&mut self, larger: bool) {
        let current = self.controller.state().page_size();
        let next = if larger {
            PAGE_SIZES.iter().copied().find(|&n| n > current)
        } else {
            PAGE_SIZES.iter().rev().copied().find(|&n| n < current)
        };
        if let Some(n) = next {
            let changed = self.controller.set_page_size(n);
            self.refetch_if(changed);
            self.select(0);
        }
    }

    fn page(&mut self, forward: bool) {
        let changed = if forward {
            self.controller.next_page()
        } else {
            self.controller.prev_page()
        };
        self.refetch_if(changed);
        self.select(0);
    }

    fn delete_key(&mut self) {
        if self.controller.confirm_bulk_delete() {
            return;
        }
        if let Some(row) = self.current() {
            let dialog = ActiveDialog::ConfirmDelete {
                id: row.id(),
                label: row.label(),
            };
            self.controller.open_dialog(dialog);
        }
    }

    fn expand_current(&mut self) {
        if let Some(id) = self.current_id() {
            if self.controller.toggle_expanded(id.clone()) {
                self.load_detail(id);
            }
        }
    }

    fn reset(&mut self) {
        let changed = self.controller.reset();
        self.search = Debouncer::spawn(String::new(), self.debounce);
        self.facet_cursor = None;
        self.refetch_if(changed);
        self.select(0);
    }

    // ── Rendering ───────────────────────────────────────────────────

    fn title(&self) -> String {
        let state = self.controller.state();
        let arrow = match state.sort().order {
            SortDirection::Asc => "↑",
            SortDirection::Desc => "↓",
        };
        let mut title = format!(
            " {} ({}) · {} {arrow} ",
            V::TITLE,
            self.controller.total(),
            state.sort().field
        );
        if !state.search_text().is_empty() {
            title.push_str(&format!("· \"{}\" ", state.search_text()));
        }
        title
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let result = self.controller.result();
        if let Some(err) = result.error() {
            let text = vec![
                Line::from(Span::styled(format!("  Failed to load: {err}"), Style::default().fg(theme::ERROR_RED))),
                Line::from(Span::styled("  Ctrl+r to retry", theme::key_hint())),
            ];
            frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }), area);
            return;
        }
        if self.controller.is_empty_state() {
            let text = vec![
                Line::from(Span::styled(format!("  No {}s match.", V::Item::NOUN), theme::table_row())),
                Line::from(Span::styled("  X resets the view", theme::key_hint())),
            ];
            frame.render_widget(Paragraph::new(text), area);
            return;
        }
        let rows = self.controller.visible_rows();
        if rows.is_empty() && result.is_loading() {
            frame.render_widget(Paragraph::new(Span::styled("  Loading…", theme::key_hint())), area);
            return;
        }

        let all = if self.controller.is_all_selected() {
            "[x]"
        } else if self.controller.is_indeterminate() {
            "[-]"
        } else {
            "[ ]"
        };
        let mut header = vec![Cell::from(all).style(theme::table_header())];
        header.extend(V::COLUMNS.iter().map(|(name, _)| Cell::from(*name).style(theme::table_header())));

        let selection = self.controller.selection();
        let body: Vec<Row> = rows
            .iter()
            .map(|item| {
                let id = item.id();
                let mark = match (selection.contains(&id), self.controller.is_expanded(&id)) {
                    (true, true) => "[x]▾",
                    (true, false) => "[x] ",
                    (false, true) => "[ ]▾",
                    (false, false) => "[ ] ",
                };
                let mut cells = vec![Cell::from(mark)];
                cells.extend(V::cells(item, self.now));
                Row::new(cells).style(theme::table_row())
            })
            .collect();

        let mut widths = vec![Constraint::Length(5)];
        widths.extend(V::COLUMNS.iter().map(|(_, w)| *w));

        let table = Table::new(body, widths)
            .header(Row::new(header))
            .row_highlight_style(theme::table_selected());
        let mut state = self.table_state;
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect, id: &EntityId) {
        let block = Block::default()
            .title(format!(" {} {id} ", V::Item::NOUN))
            .title_style(theme::title_style())
            .borders(Borders::TOP)
            .border_style(theme::border_default());
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let lines = self
            .controller
            .detail(id)
            .map_or_else(|| vec![Line::from(Span::styled("Loading…", theme::key_hint()))], |item| {
                V::detail(item, self.now)
            });
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let state = self.controller.state();
        let mut spans = vec![Span::styled(
            format!(
                " page {}/{} · {} per page",
                state.page(),
                self.controller.page_count(),
                state.page_size()
            ),
            theme::table_row(),
        )];
        let selected = self.controller.selection().len();
        if selected > 0 {
            spans.push(Span::styled(
                format!(" · {selected} selected"),
                Style::default().fg(theme::ELECTRIC_PURPLE),
            ));
        }
        if self.controller.result().is_loading() {
            spans.push(Span::styled(" · loading…", Style::default().fg(theme::ELECTRIC_YELLOW)));
        }
        spans.push(Span::styled("  │ ", theme::key_hint()));
        let generic: [(&str, &str); 6] = [
            ("space", "select"),
            ("enter", "expand"),
            ("f", "filter"),
            ("s/S", "sort"),
            ("←/→", "page"),
            ("d", "delete"),
        ];
        for (key, label) in generic.iter().chain(V::HINTS) {
            spans.push(Span::styled(format!("{key} "), theme::key_hint_key()));
            spans.push(Span::styled(format!("{label}  "), theme::key_hint()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_dialog(&self, frame: &mut Frame, area: Rect) {
        let dialog = self.controller.dialog();
        let (text, border, height) = match dialog {
            ActiveDialog::None => return,
            ActiveDialog::ConfirmDelete { label, .. } => {
                (vec![Line::from(format!("  Delete {label}?"))], theme::ELECTRIC_YELLOW, 5)
            }
            ActiveDialog::BulkDelete { count } => (
                vec![Line::from(format!("  Delete {count} selected {}s?", V::Item::NOUN))],
                theme::ELECTRIC_YELLOW,
                5,
            ),
            ActiveDialog::Restore { label, .. } => (
                vec![
                    Line::from(format!("  Restore from {label}?")),
                    Line::from(Span::styled("  Current data will be replaced.", theme::key_hint())),
                ],
                theme::CORAL,
                6,
            ),
            ActiveDialog::Assign { draft, .. } => (
                vec![
                    Line::from(Span::styled("  Instructor (empty to unassign):", theme::key_hint())),
                    Line::from(Span::styled(format!("  {draft}▏"), theme::title_style())),
                ],
                theme::NEON_CYAN,
                6,
            ),
            ActiveDialog::BulkResult(report) => {
                let mut lines = vec![Line::from(format!("  {}", report.summary()))];
                lines.extend(report.failed.iter().take(5).map(|f| {
                    Line::from(Span::styled(
                        format!("  ✗ {}: {}", f.id, f.reason),
                        Style::default().fg(theme::ERROR_RED),
                    ))
                }));
                let height = u16::try_from(lines.len()).unwrap_or(6) + 4;
                let border = if report.is_complete_success() {
                    theme::SUCCESS_GREEN
                } else {
                    theme::ELECTRIC_YELLOW
                };
                (lines, border, height)
            }
        };

        let mut text = text;
        text.push(Line::from(""));
        text.push(if dialog.is_confirmation() {
            Line::from(vec![
                Span::styled("  y ", theme::key_hint_key()),
                Span::styled("confirm    ", theme::key_hint()),
                Span::styled("n ", theme::key_hint_key()),
                Span::styled("cancel", theme::key_hint()),
            ])
        } else {
            Line::from(vec![
                Span::styled("  enter ", theme::key_hint_key()),
                Span::styled("ok    ", theme::key_hint()),
                Span::styled("esc ", theme::key_hint_key()),
                Span::styled("close", theme::key_hint()),
            ])
        });

        let rect = popup::centered(area, 56, height);
        let inner = popup::frame(frame, rect, dialog.title(), border);
        frame.render_widget(Paragraph::new(text), inner);
    }
}

impl<V, S> Component for ListScreen<V, S>
where
    V: CollectionView,
    S: ActionSource<V::Item>,
{
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.controller.dialog().is_open() {
            self.handle_dialog_key(key);
            return Ok(None);
        }
        if let Some(cursor) = self.facet_cursor {
            self.handle_facet_key(key, cursor);
            return Ok(None);
        }

        match (key.modifiers, key.code) {
            (_, KeyCode::Char('j') | KeyCode::Down) => self.move_cursor(true, 1),
            (_, KeyCode::Char('k') | KeyCode::Up) => self.move_cursor(false, 1),
            (_, KeyCode::Char('g') | KeyCode::Home) => self.select(0),
            (_, KeyCode::Char('G') | KeyCode::End) => self.select(usize::MAX),
            (_, KeyCode::Char('h' | '[') | KeyCode::Left) => self.page(false),
            (_, KeyCode::Char('l' | ']') | KeyCode::Right) => self.page(true),
            (_, KeyCode::Char('+')) => self.step_page_size(true),
            (_, KeyCode::Char('-')) => self.step_page_size(false),
            (_, KeyCode::Char(' ')) => {
                if let Some(id) = self.current_id() {
                    self.controller.toggle_row(id);
                }
            }
            (_, KeyCode::Char('V')) => self.controller.toggle_all_on_page(),
            (_, KeyCode::Enter) => self.expand_current(),
            (_, KeyCode::Char('s')) => self.cycle_sort(),
            (_, KeyCode::Char('S')) => self.flip_sort(),
            (_, KeyCode::Char('f')) => {
                if !facets::entries(&self.controller.facets()).is_empty() {
                    self.facet_cursor = Some(0);
                }
            }
            (_, KeyCode::Char('d') | KeyCode::Delete) => self.delete_key(),
            (KeyModifiers::CONTROL, KeyCode::Char('r')) => self.fetch(),
            (_, KeyCode::Char('X')) => self.reset(),
            (_, KeyCode::Esc) => self.controller.clear_selection(),
            _ => {
                if let Some(cmd) = V::on_key(key, self.current()) {
                    self.run(cmd);
                }
            }
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::Tick => self.drain(),
            Action::SearchInput(text) => self.search.push(text.clone()),
            Action::Clock(now) => self.now = now.with_timezone(&Utc),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(self.title())
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [body, footer] = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);
        let [panel, main] =
            Layout::horizontal([Constraint::Length(FACET_PANEL_WIDTH), Constraint::Min(1)]).areas(body);

        let defs = self.controller.facets();
        let panel_block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(if self.facet_cursor.is_some() {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let panel_inner = panel_block.inner(panel);
        frame.render_widget(panel_block, panel);
        frame.render_widget(
            Paragraph::new(facets::lines(&defs, self.controller.state(), self.facet_cursor)),
            panel_inner,
        );

        let expanded = self.current_id().filter(|id| self.controller.is_expanded(id));
        if let Some(id) = expanded {
            let [table, detail] =
                Layout::vertical([Constraint::Min(3), Constraint::Length(DETAIL_HEIGHT)]).areas(main);
            self.render_table(frame, table);
            self.render_detail(frame, detail, &id);
        } else {
            self.render_table(frame, main);
        }

        self.render_footer(frame, footer);
        self.render_dialog(frame, area);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        if focused && !self.loaded {
            self.loaded = true;
            self.fetch();
        }
    }

    fn captures_keys(&self) -> bool {
        self.controller.dialog().is_open()
    }

    fn search_text(&self) -> String {
        self.controller.state().search_text().to_owned()
    }

    fn unmount(&mut self) {
        if let Some(cancel) = self.poll.take() {
            cancel.cancel();
        }
        self.search.cancel();
        self.controller.unmount();
    }

    fn id(&self) -> &'static str {
        V::TITLE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use ratatui::{Terminal, backend::TestBackend};
    use rollcall_core::model::{Instructor, InstructorStatus};

    use super::*;
    use crate::screens::instructors::InstructorsView;

    type Screen = ListScreen<InstructorsView, MemorySource<Instructor>>;

    fn instructor(id: i64, name: &str, department: &str) -> Instructor {
        Instructor {
            id: EntityId::Int(id),
            name: name.into(),
            email: format!("{}@school.test", name.to_lowercase()),
            department: Some(department.into()),
            status: InstructorStatus::Active,
            rfid_tag: None,
            present_today: id % 2 == 0,
            attendance_rate: Some(90.0),
            last_check_in: None,
        }
    }

    fn staff() -> Vec<Instructor> {
        vec![
            instructor(1, "Ada", "Math"),
            instructor(2, "Grace", "Science"),
            instructor(3, "Alan", "Math"),
        ]
    }

    fn screen(source: Arc<MemorySource<Instructor>>) -> (Screen, UnboundedReceiver<Action>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let view = ViewDefaults {
            page_size: 10,
            debounce: Duration::from_millis(300),
            ..ViewDefaults::default()
        };
        (Screen::new(source, view, None, tx), rx)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(screen: &mut Screen, code: KeyCode) {
        screen.handle_key_event(key(code)).unwrap();
    }

    /// Let spawned requests finish and drain the inbox.
    async fn settle(screen: &mut Screen) {
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            screen.update(&Action::Tick).unwrap();
        }
    }

    fn names(screen: &Screen) -> Vec<String> {
        screen.controller().visible_rows().iter().map(|i| i.name.clone()).collect()
    }

    fn rendered(screen: &Screen) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 24)).unwrap();
        terminal
            .draw(|frame| {
                let area = frame.area();
                screen.render(frame, area);
            })
            .unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content().iter().map(ratatui::buffer::Cell::symbol).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn first_focus_fetches_and_renders_rows() {
        let source = Arc::new(MemorySource::new(staff()));
        let (mut screen, _rx) = screen(Arc::clone(&source));
        assert_eq!(source.list_calls(), 0);

        screen.set_focused(true);
        settle(&mut screen).await;
        assert_eq!(names(&screen), ["Ada", "Alan", "Grace"]);

        screen.set_focused(false);
        screen.set_focused(true);
        assert_eq!(source.list_calls(), 1);

        let text = rendered(&screen);
        assert!(text.contains("Instructors (3)"));
        assert!(text.contains("Grace"));
        assert!(text.contains("Department"));
    }

    #[tokio::test(start_paused = true)]
    async fn search_applies_after_the_quiet_period() {
        let (mut screen, _rx) = screen(Arc::new(MemorySource::new(staff())));
        screen.set_focused(true);
        settle(&mut screen).await;

        screen.update(&Action::SearchInput("al".into())).unwrap();
        screen.update(&Action::Tick).unwrap();
        assert_eq!(names(&screen).len(), 3, "not yet settled");

        settle(&mut screen).await;
        assert_eq!(names(&screen), ["Alan"]);
        assert_eq!(screen.search_text(), "al");
    }

    #[tokio::test(start_paused = true)]
    async fn confirmed_delete_removes_the_row() {
        let source = Arc::new(MemorySource::new(staff()));
        let (mut screen, mut rx) = screen(Arc::clone(&source));
        screen.set_focused(true);
        settle(&mut screen).await;

        press(&mut screen, KeyCode::Char('d'));
        assert!(screen.captures_keys());
        assert!(rendered(&screen).contains("Delete Ada?"));
        press(&mut screen, KeyCode::Char('y'));
        settle(&mut screen).await;

        assert_eq!(names(&screen), ["Alan", "Grace"]);
        assert_eq!(source.snapshot().len(), 2);
        let note = rx.try_recv().unwrap();
        assert_eq!(note, Action::Notify(Notification::success("Deleted instructor")));
    }

    #[tokio::test(start_paused = true)]
    async fn bulk_delete_reports_the_tally() {
        let source = Arc::new(MemorySource::new(staff()));
        source.fail_on(EntityId::Int(3));
        let (mut screen, _rx) = screen(Arc::clone(&source));
        screen.set_focused(true);
        settle(&mut screen).await;

        press(&mut screen, KeyCode::Char(' '));
        press(&mut screen, KeyCode::Char('j'));
        press(&mut screen, KeyCode::Char(' '));
        press(&mut screen, KeyCode::Char('d'));
        assert_eq!(screen.controller().dialog(), &ActiveDialog::BulkDelete { count: 2 });
        press(&mut screen, KeyCode::Char('y'));
        settle(&mut screen).await;

        let ActiveDialog::BulkResult(report) = screen.controller().dialog() else {
            panic!("expected a bulk result dialog");
        };
        assert_eq!(report.summary(), "1 succeeded, 1 failed");
        assert_eq!(screen.controller().selection().to_vec(), vec![EntityId::Int(3)]);
        assert!(rendered(&screen).contains("1 succeeded, 1 failed"));

        press(&mut screen, KeyCode::Esc);
        assert!(!screen.controller().dialog().is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_change_is_rolled_back() {
        let source = Arc::new(MemorySource::new(staff()));
        source.fail_on(EntityId::Int(1));
        let (mut screen, mut rx) = screen(Arc::clone(&source));
        screen.set_focused(true);
        settle(&mut screen).await;

        press(&mut screen, KeyCode::Char('t'));
        assert_eq!(screen.current().unwrap().status, InstructorStatus::OnLeave);
        settle(&mut screen).await;

        assert_eq!(screen.current().unwrap().status, InstructorStatus::Active);
        assert!(matches!(rx.try_recv().unwrap(), Action::Notify(n) if n.message.contains("rejected")));
    }

    #[tokio::test(start_paused = true)]
    async fn facet_panel_toggles_filters() {
        let (mut screen, _rx) = screen(Arc::new(MemorySource::new(staff())));
        screen.set_focused(true);
        settle(&mut screen).await;

        // First facet group is department: Math, then Science.
        press(&mut screen, KeyCode::Char('f'));
        press(&mut screen, KeyCode::Char('j'));
        press(&mut screen, KeyCode::Char(' '));
        assert_eq!(names(&screen), ["Grace"]);

        press(&mut screen, KeyCode::Char('c'));
        press(&mut screen, KeyCode::Esc);
        assert_eq!(names(&screen).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn expanding_a_row_shows_its_detail() {
        let (mut screen, _rx) = screen(Arc::new(MemorySource::new(staff())));
        screen.set_focused(true);
        settle(&mut screen).await;

        press(&mut screen, KeyCode::Enter);
        settle(&mut screen).await;
        assert!(screen.controller().is_expanded(&EntityId::Int(1)));
        let text = rendered(&screen);
        assert!(text.contains("RFID tag"));
        assert!(text.contains("instructor 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_fetch_shows_the_error_state() {
        let source = Arc::new(MemorySource::new(staff()));
        source.fail_list(Some(|| CoreError::Timeout));
        let (mut screen, mut rx) = screen(Arc::clone(&source));
        screen.set_focused(true);
        settle(&mut screen).await;

        assert!(rendered(&screen).contains("Failed to load"));
        assert!(matches!(rx.try_recv().unwrap(), Action::Notify(_)));
    }
}
