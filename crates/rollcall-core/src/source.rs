// ── Listing sources ──
//
// The controller talks to its collection through `ListingSource`. The
// HTTP implementation wraps `ListingClient`; `MemorySource` behaves like
// the service over an in-memory vector and backs tests and demos.

use std::collections::HashSet;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rollcall_api::{ListPage, ListParams, ListingClient};
use serde_json::Value;

use crate::engine::{self, FacetScope};
use crate::error::CoreError;
use crate::model::{EntityId, ListItem};
use crate::query::{QueryState, SortSpec};

/// External listing service for one collection.
pub trait ListingSource<T: ListItem>: Send + Sync + 'static {
    /// `GET /{collection}`
    fn list(&self, params: &ListParams) -> impl Future<Output = Result<ListPage<T>, CoreError>> + Send;

    /// `GET /{collection}/{id}`: possibly richer than the list projection.
    fn get(&self, id: &EntityId) -> impl Future<Output = Result<T, CoreError>> + Send;

    /// `PATCH /{collection}/{id}`
    fn update(&self, id: &EntityId, patch: &Value) -> impl Future<Output = Result<T, CoreError>> + Send;

    /// `POST /{collection}`
    fn create(&self, body: &Value) -> impl Future<Output = Result<T, CoreError>> + Send;

    /// `DELETE /{collection}/{id}`
    fn delete(&self, id: &EntityId) -> impl Future<Output = Result<(), CoreError>> + Send;
}

// ── HTTP ────────────────────────────────────────────────────────────

/// `ListingSource` over the REST service.
pub struct HttpSource<T> {
    client: Arc<ListingClient>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for HttpSource<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            _marker: PhantomData,
        }
    }
}

impl<T: ListItem> HttpSource<T> {
    pub fn new(client: Arc<ListingClient>) -> Self {
        Self {
            client,
            _marker: PhantomData,
        }
    }

    pub fn client(&self) -> &ListingClient {
        &self.client
    }

    /// `POST /{collection}/{id}/{action}` returning the updated record.
    pub async fn action(&self, id: &EntityId, action: &str, body: &Value) -> Result<T, CoreError> {
        Ok(self
            .client
            .action(T::COLLECTION, &id.to_string(), action, body)
            .await?)
    }
}

impl<T: ListItem> ListingSource<T> for HttpSource<T> {
    async fn list(&self, params: &ListParams) -> Result<ListPage<T>, CoreError> {
        Ok(self.client.list(T::COLLECTION, params).await?)
    }

    async fn get(&self, id: &EntityId) -> Result<T, CoreError> {
        self.client
            .get(T::COLLECTION, &id.to_string())
            .await
            .map_err(|e| not_found_as::<T>(e, id))
    }

    async fn update(&self, id: &EntityId, patch: &Value) -> Result<T, CoreError> {
        self.client
            .patch(T::COLLECTION, &id.to_string(), patch)
            .await
            .map_err(|e| not_found_as::<T>(e, id))
    }

    async fn create(&self, body: &Value) -> Result<T, CoreError> {
        Ok(self.client.create(T::COLLECTION, body).await?)
    }

    async fn delete(&self, id: &EntityId) -> Result<(), CoreError> {
        self.client
            .delete(T::COLLECTION, &id.to_string())
            .await
            .map_err(|e| not_found_as::<T>(e, id))
    }
}

/// Name the entity in 404s instead of echoing the body.
fn not_found_as<T: ListItem>(err: rollcall_api::Error, id: &EntityId) -> CoreError {
    if err.is_not_found() {
        CoreError::NotFound {
            entity_type: T::NOUN.into(),
            identifier: id.to_string(),
        }
    } else {
        err.into()
    }
}

// ── In-memory ───────────────────────────────────────────────────────

/// In-memory stand-in for the service.
///
/// Applies search, filters, sort and paging the way the server does when
/// the request carries them, merges PATCH bodies into the stored JSON, and
/// can be told to fail specific ids.
pub struct MemorySource<T> {
    items: Mutex<Vec<T>>,
    failing: Mutex<HashSet<EntityId>>,
    list_error: Mutex<Option<fn() -> CoreError>>,
    list_calls: AtomicUsize,
    next_id: Mutex<i64>,
}

impl<T: ListItem> MemorySource<T> {
    pub fn new(items: Vec<T>) -> Self {
        let next_id = items.iter().filter_map(|i| i.id().as_int()).max().unwrap_or(0) + 1;
        Self {
            items: Mutex::new(items),
            failing: Mutex::new(HashSet::new()),
            list_error: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            next_id: Mutex::new(next_id),
        }
    }

    /// Make every write to `id` fail with a service error.
    pub fn fail_on(&self, id: EntityId) {
        lock(&self.failing).insert(id);
    }

    /// Make `list` fail with the error produced by `make`, or succeed again with `None`.
    pub fn fail_list(&self, make: Option<fn() -> CoreError>) {
        *lock(&self.list_error) = make;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Vec<T> {
        lock(&self.items).clone()
    }

    fn check_writable(&self, id: &EntityId) -> Result<(), CoreError> {
        if lock(&self.failing).contains(id) {
            return Err(CoreError::Api {
                message: format!("write to {id} rejected"),
                status: Some(500),
            });
        }
        Ok(())
    }

    fn not_found(id: &EntityId) -> CoreError {
        CoreError::NotFound {
            entity_type: T::NOUN.into(),
            identifier: id.to_string(),
        }
    }

    fn page(&self, params: &ListParams) -> Result<ListPage<T>, CoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(make) = *lock(&self.list_error) {
            return Err(make());
        }
        let items = lock(&self.items).clone();

        let mut state = QueryState::for_item::<T>();
        state.set_search_text(params.search.clone().unwrap_or_default());
        for (key, values) in &params.filters {
            state.set_filter(key, values.iter().cloned());
        }
        if let Some(ref field) = params.sort_by {
            state.set_sort_spec(SortSpec::new(field.clone(), params.sort_order.unwrap_or_default()));
        }

        let paged = params.page.is_some() || params.page_size.is_some();
        if paged {
            state.set_page_size(params.page_size.unwrap_or(state.page_size()));
            state.set_page(params.page.unwrap_or(1));
            let refined = engine::refine(&items, &state);
            return Ok(ListPage {
                items: refined.rows.into_iter().cloned().collect(),
                total: u64::try_from(refined.total).ok(),
                stats: Some(facet_stats(&items, &state)),
            });
        }

        let mut rows = engine::filter(&items, &state);
        if params.sort_by.is_some() {
            engine::sort(&mut rows, state.sort());
        }
        Ok(ListPage {
            items: rows.into_iter().cloned().collect(),
            total: None,
            stats: None,
        })
    }
}

impl<T: ListItem> ListingSource<T> for MemorySource<T> {
    async fn list(&self, params: &ListParams) -> Result<ListPage<T>, CoreError> {
        self.page(params)
    }

    async fn get(&self, id: &EntityId) -> Result<T, CoreError> {
        lock(&self.items)
            .iter()
            .find(|item| &item.id() == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn update(&self, id: &EntityId, patch: &Value) -> Result<T, CoreError> {
        self.check_writable(id)?;
        let mut items = lock(&self.items);
        let slot = items
            .iter_mut()
            .find(|item| &item.id() == id)
            .ok_or_else(|| Self::not_found(id))?;
        let mut json = serde_json::to_value(&*slot).map_err(|e| CoreError::Internal(e.to_string()))?;
        merge(&mut json, patch);
        let updated: T = serde_json::from_value(json).map_err(|e| CoreError::Validation {
            field: None,
            message: e.to_string(),
        })?;
        *slot = updated.clone();
        Ok(updated)
    }

    async fn create(&self, body: &Value) -> Result<T, CoreError> {
        let mut body = body.clone();
        if let Value::Object(ref mut map) = body {
            if !map.contains_key("id") {
                let mut next = lock(&self.next_id);
                map.insert("id".into(), Value::from(*next));
                *next += 1;
            }
        }
        let created: T = serde_json::from_value(body).map_err(|e| CoreError::Validation {
            field: None,
            message: e.to_string(),
        })?;
        lock(&self.items).push(created.clone());
        Ok(created)
    }

    async fn delete(&self, id: &EntityId) -> Result<(), CoreError> {
        self.check_writable(id)?;
        let mut items = lock(&self.items);
        let before = items.len();
        items.retain(|item| &item.id() != id);
        if items.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }
}

/// Whole-collection facet counts, shaped `{"<key>": {"<value>": n}}` as a
/// paging server reports them.
fn facet_stats<T: ListItem>(items: &[T], state: &QueryState) -> Value {
    engine::facets(items, state, FacetScope::Global)
        .into_iter()
        .map(|def| {
            let counts = def
                .options
                .into_iter()
                .map(|o| (o.value, Value::from(o.count.unwrap_or(0))))
                .collect();
            (def.key, Value::Object(counts))
        })
        .collect()
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shallow JSON merge of `patch` into `target` (PATCH semantics).
fn merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(t), Value::Object(p)) = (target, patch) {
        for (k, v) in p {
            t.insert(k.clone(), v.clone());
        }
    }
}
