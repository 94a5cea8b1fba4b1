// ── Query state store ──
//
// Single source of truth for everything that shapes a list view: search
// text, facet filters, sort, page, page size and the cross-page selection.
// Mutators that change the filter context clear the selection; paging
// does not.

use std::collections::{BTreeMap, BTreeSet};

use rollcall_api::SortDirection;

use crate::model::ListItem;
use crate::selection::Selection;

/// Page size used when neither the view nor the config names one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Sort key and direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub field: String,
    pub order: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, order: SortDirection) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Values `reset()` returns to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDefaults {
    pub sort: SortSpec,
    pub page_size: u32,
}

impl QueryDefaults {
    pub fn for_item<T: ListItem>() -> Self {
        Self {
            sort: SortSpec::new(T::DEFAULT_SORT_FIELD, T::DEFAULT_SORT_ORDER),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// What a mutator changed, so callers can decide whether to refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryChange {
    Search,
    Filter,
    Sort,
    Page,
    PageSize,
    Reset,
}

/// Current view parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    search_text: String,
    filters: BTreeMap<String, BTreeSet<String>>,
    sort: SortSpec,
    page: u32,
    page_size: u32,
    selection: Selection,
    defaults: QueryDefaults,
}

impl QueryState {
    pub fn new(defaults: QueryDefaults) -> Self {
        Self {
            search_text: String::new(),
            filters: BTreeMap::new(),
            sort: defaults.sort.clone(),
            page: 1,
            page_size: defaults.page_size.max(1),
            selection: Selection::default(),
            defaults,
        }
    }

    pub fn for_item<T: ListItem>() -> Self {
        Self::new(QueryDefaults::for_item::<T>())
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn filters(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.filters
    }

    /// Selected values for `key`; `None` means unconstrained.
    pub fn filter(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.filters.get(key)
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn defaults(&self) -> &QueryDefaults {
        &self.defaults
    }

    /// Number of pages for `total` items (at least 1).
    pub fn page_count(&self, total: usize) -> u32 {
        let size = usize::try_from(self.page_size).unwrap_or(usize::MAX).max(1);
        u32::try_from(total.div_ceil(size)).unwrap_or(u32::MAX).max(1)
    }

    /// `true` when every field (selection aside) equals its default.
    pub fn is_default(&self) -> bool {
        self.search_text.is_empty()
            && self.filters.is_empty()
            && self.sort == self.defaults.sort
            && self.page == 1
            && self.page_size == self.defaults.page_size
    }

    // ── Mutators ────────────────────────────────────────────────────

    /// Replace the search text. Clears the selection and returns to page 1
    /// when the text actually changes.
    pub fn set_search_text(&mut self, text: impl Into<String>) -> bool {
        let text = text.into();
        if text == self.search_text {
            return false;
        }
        self.search_text = text;
        self.invalidate_context();
        true
    }

    /// Replace the value set for `key`. An empty set removes the constraint.
    pub fn set_filter<I, V>(&mut self, key: &str, values: I) -> bool
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values: BTreeSet<String> = values.into_iter().map(Into::into).collect();
        let current = self.filters.get(key);
        let unchanged = match current {
            Some(existing) => *existing == values,
            None => values.is_empty(),
        };
        if unchanged {
            return false;
        }
        if values.is_empty() {
            self.filters.remove(key);
        } else {
            self.filters.insert(key.to_owned(), values);
        }
        self.invalidate_context();
        true
    }

    /// Add or remove a single value from a filter key.
    pub fn toggle_filter_value(&mut self, key: &str, value: &str) -> bool {
        let mut values = self.filters.get(key).cloned().unwrap_or_default();
        if !values.remove(value) {
            values.insert(value.to_owned());
        }
        self.set_filter(key, values)
    }

    /// Drop every filter constraint.
    pub fn clear_filters(&mut self) -> bool {
        if self.filters.is_empty() {
            return false;
        }
        self.filters.clear();
        self.invalidate_context();
        true
    }

    /// Sort by `field`: the current field toggles its order, a new field
    /// starts ascending. Always clears the selection.
    pub fn set_sort(&mut self, field: &str) {
        if self.sort.field == field {
            self.sort.order = self.sort.order.reversed();
        } else {
            self.sort = SortSpec::asc(field);
        }
        self.selection.clear();
    }

    /// Set field and order explicitly (deep links, CLI flags).
    pub fn set_sort_spec(&mut self, spec: SortSpec) -> bool {
        if spec == self.sort {
            return false;
        }
        self.sort = spec;
        self.selection.clear();
        true
    }

    /// Go to page `n` (1-based); `0` is clamped to 1. The selection survives.
    pub fn set_page(&mut self, n: u32) -> bool {
        let n = n.max(1);
        if n == self.page {
            return false;
        }
        self.page = n;
        true
    }

    /// Change the density. Resets to page 1 and clears the selection.
    pub fn set_page_size(&mut self, n: u32) -> bool {
        let n = n.max(1);
        if n == self.page_size {
            return false;
        }
        self.page_size = n;
        self.page = 1;
        self.selection.clear();
        true
    }

    /// Restore every field to its default and empty the selection.
    pub fn reset(&mut self) {
        *self = Self::new(self.defaults.clone());
    }

    /// Clamp `page` into `[1, page_count(total)]`. Returns `true` if it moved.
    pub fn clamp_page(&mut self, total: usize) -> bool {
        let last = self.page_count(total);
        if self.page > last {
            self.page = last;
            true
        } else {
            false
        }
    }

    fn invalidate_context(&mut self) {
        self.page = 1;
        self.selection.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EntityId;

    fn state() -> QueryState {
        QueryState::new(QueryDefaults {
            sort: SortSpec::asc("name"),
            page_size: 5,
        })
    }

    fn with_selection() -> QueryState {
        let mut s = state();
        s.selection_mut().toggle_one(EntityId::Int(1));
        s.selection_mut().toggle_one(EntityId::Int(2));
        s
    }

    #[test]
    fn sort_toggles_on_same_field_and_resets_on_new_field() {
        let mut s = state();
        s.set_sort("name");
        assert_eq!(s.sort(), &SortSpec::desc("name"));
        s.set_sort("name");
        assert_eq!(s.sort(), &SortSpec::asc("name"));
        s.set_sort("name");
        s.set_sort("email");
        assert_eq!(s.sort(), &SortSpec::asc("email"));
    }

    #[test]
    fn context_changes_clear_selection() {
        let mut s = with_selection();
        s.set_search_text("ann");
        assert!(s.selection().is_empty());

        let mut s = with_selection();
        s.set_filter("status", ["active"]);
        assert!(s.selection().is_empty());

        let mut s = with_selection();
        s.set_sort("email");
        assert!(s.selection().is_empty());

        let mut s = with_selection();
        s.set_page_size(20);
        assert!(s.selection().is_empty());
    }

    #[test]
    fn paging_keeps_selection() {
        let mut s = with_selection();
        s.set_page(3);
        assert_eq!(s.page(), 3);
        assert_eq!(s.selection().len(), 2);
    }

    #[test]
    fn identical_values_are_no_ops() {
        let mut s = with_selection();
        assert!(!s.set_search_text(""));
        assert!(!s.set_filter("status", Vec::<String>::new()));
        assert!(!s.set_page_size(5));
        assert_eq!(s.selection().len(), 2);
    }

    #[test]
    fn page_below_one_is_clamped() {
        let mut s = state();
        s.set_page(4);
        s.set_page(0);
        assert_eq!(s.page(), 1);
    }

    #[test]
    fn page_size_resets_page() {
        let mut s = state();
        s.set_page(3);
        s.set_page_size(25);
        assert_eq!(s.page(), 1);
        assert_eq!(s.page_size(), 25);
        s.set_page_size(0);
        assert_eq!(s.page_size(), 1);
    }

    #[test]
    fn empty_filter_removes_key() {
        let mut s = state();
        s.set_filter("status", ["active", "lost"]);
        assert_eq!(s.filter("status").map(BTreeSet::len), Some(2));
        s.set_filter("status", Vec::<&str>::new());
        assert!(s.filter("status").is_none());
    }

    #[test]
    fn toggle_filter_value_adds_then_removes() {
        let mut s = state();
        s.toggle_filter_value("folder", "inbox");
        s.toggle_filter_value("folder", "sent");
        s.toggle_filter_value("folder", "inbox");
        let values: Vec<&str> = s.filter("folder").into_iter().flatten().map(String::as_str).collect();
        assert_eq!(values, vec!["sent"]);
    }

    #[test]
    fn clamp_uses_page_count() {
        let mut s = state();
        s.set_page(3);
        assert!(s.clamp_page(7));
        assert_eq!(s.page(), 2);
        assert!(s.clamp_page(0));
        assert_eq!(s.page(), 1);
        assert!(!s.clamp_page(100));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut s = with_selection();
        s.set_search_text("x");
        s.set_filter("status", ["lost"]);
        s.set_sort("uid");
        s.set_page_size(50);
        s.set_page(2);
        s.reset();
        assert!(s.is_default());
        assert!(s.selection().is_empty());
        assert_eq!(s, state());
    }
}
