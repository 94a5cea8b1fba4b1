//! Collection-agnostic handlers shared by every resource command.
//!
//! `list` drives a `ListController` the same way the TUI does (mount,
//! apply the query, fetch), so flags, saved views and share links behave
//! identically in both front ends.

use std::sync::Arc;

use serde_json::Value;
use tabled::Tabled;
use tracing::{debug, info};

use rollcall_api::ListingClient;
use rollcall_core::persist::MAX_PAGE_SIZE;
use rollcall_core::{
    BulkReport, EntityId, FetchOutcome, FilePersistence, HttpSource, ListController, ListItem,
    ListingSource, MemoryAddressBar, OptimisticCommand, QueryCodec, UrlSynchronizer, ViewDefaults,
};

use crate::cli::{GlobalOpts, ListArgs, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util;

/// A connected client plus the view defaults of the active profile.
pub struct Session {
    client: Arc<ListingClient>,
    pub view: ViewDefaults,
}

impl Session {
    pub fn connect(global: &GlobalOpts, cfg: &Config) -> Result<Self, CliError> {
        let resolved = config::resolve(global, cfg)?;
        debug!(url = %resolved.client.base_url, "connecting");
        Ok(Self {
            client: resolved.client.build_client()?,
            view: resolved.view,
        })
    }

    pub fn source<T: ListItem>(&self) -> Arc<HttpSource<T>> {
        Arc::new(HttpSource::new(Arc::clone(&self.client)))
    }

    fn controller<T: ListItem>(&self) -> ListController<T, HttpSource<T>> {
        ListController::new(self.source::<T>()).with_view_defaults(self.view)
    }
}

fn row_id<T: ListItem>(item: &T) -> String {
    item.id().to_string()
}

// ── List ────────────────────────────────────────────────────────────

/// Render one page of a collection (or its facet counts).
pub async fn list<T, R>(
    session: &Session,
    args: ListArgs,
    global: &GlobalOpts,
    to_row: impl Fn(&T) -> R,
) -> Result<(), CliError>
where
    T: ListItem,
    R: Tabled,
{
    let mut ctrl = session.controller::<T>();
    if let Some(ref query) = args.from_query {
        let bar = MemoryAddressBar::new(T::COLLECTION).with_query(query.trim_start_matches('?'));
        ctrl = ctrl.with_persistence(UrlSynchronizer::new(QueryCodec::for_item::<T>(), bar));
    } else if args.remember {
        ctrl = ctrl.with_persistence(FilePersistence::for_item::<T>(&config::config_dir()));
    }
    ctrl.mount();
    apply_args(&mut ctrl, &args)?;
    fetch(&mut ctrl).await?;

    if args.share && !global.quiet {
        eprintln!("?{}", QueryCodec::for_item::<T>().encode(ctrl.state()));
    }

    let out = if args.facets {
        output::render_facets(global.output, &ctrl.facets())?
    } else {
        let rows = ctrl.visible_rows();
        if ctrl.is_empty_state() && global.output == OutputFormat::Table {
            if !global.quiet {
                eprintln!("No {}s match.", T::NOUN);
            }
            String::new()
        } else {
            output::render_list(global.output, &rows, |t| to_row(t), |t| row_id(*t))?
        }
    };
    output::print_output(&out, global.quiet);
    if !args.facets {
        output::print_page_footer(
            global.output,
            global.quiet,
            ctrl.state().page(),
            ctrl.page_count(),
            ctrl.total(),
        );
    }
    ctrl.unmount();
    Ok(())
}

/// Apply explicit flags over whatever state was restored. Page goes last
/// since every other change resets it.
fn apply_args<T: ListItem, S: ListingSource<T>>(
    ctrl: &mut ListController<T, S>,
    args: &ListArgs,
) -> Result<(), CliError> {
    if let Some(ref text) = args.search {
        ctrl.set_search_text(text.clone());
    }
    for raw in &args.filter {
        let (key, values) = util::parse_filter(raw)?;
        if !T::FACETS.iter().any(|f| f.key == key) {
            let known: Vec<&str> = T::FACETS.iter().map(|f| f.key).collect();
            return Err(CliError::Validation {
                field: "filter".into(),
                reason: format!("unknown filter '{key}'; choose one of: {}", known.join(", ")),
            });
        }
        ctrl.set_filter(&key, values);
    }
    if let Some(ref raw) = args.sort {
        ctrl.set_sort_spec(util::parse_sort(raw, T::SORT_FIELDS)?);
    }
    if let Some(size) = args.page_size {
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(CliError::Validation {
                field: "page-size".into(),
                reason: format!("must be between 1 and {MAX_PAGE_SIZE}"),
            });
        }
        ctrl.set_page_size(size);
    }
    if let Some(page) = args.page {
        if page == 0 {
            return Err(CliError::Validation {
                field: "page".into(),
                reason: "pages start at 1".into(),
            });
        }
        ctrl.set_page(page);
    }
    Ok(())
}

/// Fetch and apply one response, asking again once if the page was clamped.
///
/// Errors are returned as-is rather than folded into the result set, so
/// the exit code reflects the failure kind.
async fn fetch<T: ListItem, S: ListingSource<T>>(
    ctrl: &mut ListController<T, S>,
) -> Result<(), CliError> {
    let source = Arc::clone(ctrl.source());
    for _ in 0..2 {
        let (ticket, params) = ctrl.begin_fetch();
        let page = source.list(&params).await?;
        if ctrl.finish_fetch(ticket, Ok(page)) != FetchOutcome::Clamped {
            break;
        }
    }
    Ok(())
}

// ── Single record ───────────────────────────────────────────────────

pub async fn get<T: ListItem>(
    session: &Session,
    id: &str,
    global: &GlobalOpts,
    detail: impl Fn(&T) -> String,
) -> Result<(), CliError> {
    let item = session.source::<T>().get(&EntityId::verbatim(id)).await?;
    print_single(&item, global, detail)
}

pub async fn create<T: ListItem>(
    session: &Session,
    body: &Value,
    global: &GlobalOpts,
    detail: impl Fn(&T) -> String,
) -> Result<(), CliError> {
    let created = session.source::<T>().create(body).await?;
    info!(collection = T::COLLECTION, id = %created.id(), "created");
    if !global.quiet {
        eprintln!("Created {} {}", T::NOUN, created.id());
    }
    print_single(&created, global, detail)
}

pub async fn update<T: ListItem>(
    session: &Session,
    id: &str,
    patch: &Value,
    global: &GlobalOpts,
    detail: impl Fn(&T) -> String,
) -> Result<(), CliError> {
    let updated = session
        .source::<T>()
        .update(&EntityId::verbatim(id), patch)
        .await?;
    print_single(&updated, global, detail)
}

/// Run an edit command against the current server copy: fetch, apply
/// locally to build the PATCH, send it, then show the server's answer.
pub async fn apply_command<T, C>(
    session: &Session,
    id: &str,
    global: &GlobalOpts,
    make: impl FnOnce(&T) -> C,
    detail: impl Fn(&T) -> String,
) -> Result<(), CliError>
where
    T: ListItem,
    C: OptimisticCommand<T>,
{
    let source = session.source::<T>();
    let id = EntityId::verbatim(id);
    let mut item = source.get(&id).await?;
    let cmd = make(&item);
    cmd.apply(&mut item);
    let updated = source.update(&id, &cmd.patch(&item)).await?;
    info!(%id, change = %cmd.describe(), "updated");
    if !global.quiet {
        eprintln!("{} {id}: {}", T::NOUN, cmd.describe());
    }
    print_single(&updated, global, detail)
}

fn print_single<T: ListItem>(
    item: &T,
    global: &GlobalOpts,
    detail: impl Fn(&T) -> String,
) -> Result<(), CliError> {
    let out = output::render_single(global.output, item, detail, row_id)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Delete ──────────────────────────────────────────────────────────

/// Delete the given records concurrently through the controller's bulk
/// path, so vanished ids and soft deletes are handled like in the TUI.
pub async fn delete<T: ListItem>(
    session: &Session,
    ids: &[String],
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let prompt = match ids {
        [single] => format!("Delete {} {single}?", T::NOUN),
        many => format!("Delete {} {}s?", many.len(), T::NOUN),
    };
    if !util::confirm(&prompt, &format!("{} delete", T::COLLECTION), global.yes)? {
        return Ok(());
    }

    let mut ctrl = session.controller::<T>();
    ctrl.mount();
    if ctrl.mode().refines_locally() {
        fetch(&mut ctrl).await?;
    }
    for raw in ids {
        let id = ctrl.resolve_id(raw);
        ctrl.toggle_row(id);
    }
    let report = ctrl.bulk_delete().await;
    report_bulk::<T>(&report, global)
}

/// Print a bulk tally; any failure turns into a partial-failure exit.
fn report_bulk<T: ListItem>(report: &BulkReport, global: &GlobalOpts) -> Result<(), CliError> {
    for failure in &report.failed {
        eprintln!("  ✗ {} {}: {}", T::NOUN, failure.id, failure.reason);
    }
    let out = output::render_single(
        global.output,
        report,
        |r| format!("{}s: {}", T::NOUN, r.summary()),
        |r| {
            r.succeeded
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        },
    )?;
    output::print_output(&out, global.quiet);

    if report.is_complete_success() {
        Ok(())
    } else {
        Err(CliError::PartialFailure {
            summary: report.summary(),
        })
    }
}
