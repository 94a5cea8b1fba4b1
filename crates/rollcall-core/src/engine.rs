// ── Local filter / sort / paginate engine ──
//
// Pure functions of `(items, QueryState)`. Used when a collection is
// fetched whole and refined client-side; the email view refines on the
// server and only uses `facets`.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use rollcall_api::SortDirection;

use crate::model::{FieldValue, ListItem, humanize};
use crate::query::{QueryState, SortSpec};

/// One page of refined rows plus the post-filter total.
#[derive(Debug)]
pub struct Refined<'a, T> {
    pub rows: Vec<&'a T>,
    /// Items matching search and filters, across all pages.
    pub total: usize,
}

/// Search lowercased once per pass. Only the empty string passes
/// everything; whitespace is matched like any other text.
fn needle(state: &QueryState) -> Option<String> {
    let text = state.search_text();
    (!text.is_empty()).then(|| text.to_lowercase())
}

/// Search AND every filter key (OR within a key). `skip_key` leaves one
/// key out, for contextual facet counts.
fn matches<T: ListItem>(
    item: &T,
    needle: Option<&str>,
    state: &QueryState,
    skip_key: Option<&str>,
) -> bool {
    if let Some(n) = needle {
        if !item.matches_search(n) {
            return false;
        }
    }
    state
        .filters()
        .iter()
        .filter(|(key, _)| Some(key.as_str()) != skip_key)
        .all(|(key, selected)| {
            selected.is_empty()
                || item
                    .facet_values(key)
                    .iter()
                    .any(|v| selected.contains(v))
        })
}

/// Items matching the search text and all active filters, in input order.
pub fn filter<'a, T: ListItem>(items: &'a [T], state: &QueryState) -> Vec<&'a T> {
    let n = needle(state);
    items
        .iter()
        .filter(|item| matches(*item, n.as_deref(), state, None))
        .collect()
}

/// Stable sort by `spec.field`. Equal and incomparable keys keep their order.
pub fn sort<T: ListItem>(rows: &mut Vec<&T>, spec: &SortSpec) {
    let mut keyed: Vec<(FieldValue, &T)> = rows
        .drain(..)
        .map(|item| (item.field(&spec.field), item))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| {
        let ord = a.compare(b);
        match spec.order {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    rows.extend(keyed.into_iter().map(|(_, item)| item));
}

/// Slice `[(page-1)*page_size, page*page_size)`; empty when out of range.
pub fn paginate<U>(rows: &[U], page: u32, page_size: u32) -> &[U] {
    let size = usize::try_from(page_size.max(1)).unwrap_or(usize::MAX);
    let index = usize::try_from(page.max(1) - 1).unwrap_or(usize::MAX);
    let start = index.saturating_mul(size);
    if start >= rows.len() {
        return &[];
    }
    let end = start.saturating_add(size).min(rows.len());
    rows.get(start..end).unwrap_or(&[])
}

/// Filter, sort, then paginate.
pub fn refine<'a, T: ListItem>(items: &'a [T], state: &QueryState) -> Refined<'a, T> {
    let mut rows = filter(items, state);
    sort(&mut rows, state.sort());
    let total = rows.len();
    let rows = paginate(&rows, state.page(), state.page_size()).to_vec();
    Refined { rows, total }
}

// ── Facets ──────────────────────────────────────────────────────────

/// Which items facet counts are computed over.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FacetScope {
    /// The whole result set; counts do not shrink as filters are applied.
    #[default]
    Global,
    /// Items matching the search and every other active filter.
    Contextual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    /// `None` when the count is unknown (a server-paged view whose
    /// response carried no stats).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

/// A filter dimension with its selectable values and their counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterDefinition {
    pub key: String,
    pub title: String,
    pub options: Vec<FilterOption>,
}

impl FilterDefinition {
    pub fn count_of(&self, value: &str) -> Option<usize> {
        self.options
            .iter()
            .find(|o| o.value == value)
            .and_then(|o| o.count)
    }
}

/// Facet definitions for every `T::FACETS` key. Options appear in order of
/// first occurrence; values currently selected but absent from the items
/// are kept with a zero count so they stay deselectable.
pub fn facets<T: ListItem>(
    items: &[T],
    state: &QueryState,
    scope: FacetScope,
) -> Vec<FilterDefinition> {
    let n = needle(state);
    T::FACETS
        .iter()
        .map(|spec| {
            let mut counts: IndexMap<String, usize> = IndexMap::new();
            for item in items {
                let values = item.facet_values(spec.key);
                for v in &values {
                    counts.entry(v.clone()).or_insert(0);
                }
                let counted = match scope {
                    FacetScope::Global => true,
                    FacetScope::Contextual => matches(item, n.as_deref(), state, Some(spec.key)),
                };
                if counted {
                    for v in values {
                        *counts.entry(v).or_insert(0) += 1;
                    }
                }
            }
            if let Some(selected) = state.filter(spec.key) {
                for v in selected {
                    counts.entry(v.clone()).or_insert(0);
                }
            }
            FilterDefinition {
                key: spec.key.to_owned(),
                title: spec.title.to_owned(),
                options: counts
                    .into_iter()
                    .map(|(value, count)| FilterOption {
                        label: humanize(&value),
                        value,
                        count: Some(count),
                    })
                    .collect(),
            }
        })
        .collect()
}

/// Facets for a view refined on the server, where only one page is held.
///
/// Options are the facet's closed value set, then values seen on the page,
/// in `stats` and among the selection. Counts come from the response's
/// `stats` block (`{"folder": {"inbox": 8}}`); without one they are
/// `None`, never a count over the loaded page.
pub fn server_facets<T: ListItem>(
    items: &[T],
    state: &QueryState,
    stats: Option<&Value>,
) -> Vec<FilterDefinition> {
    T::FACETS
        .iter()
        .map(|spec| {
            let reported = stats.and_then(|s| s.get(spec.key)).and_then(Value::as_object);
            let mut values: IndexSet<String> = T::facet_domain(spec.key).into_iter().collect();
            values.extend(items.iter().flat_map(|item| item.facet_values(spec.key)));
            if let Some(reported) = reported {
                values.extend(reported.keys().cloned());
            }
            if let Some(selected) = state.filter(spec.key) {
                values.extend(selected.iter().cloned());
            }
            FilterDefinition {
                key: spec.key.to_owned(),
                title: spec.title.to_owned(),
                options: values
                    .into_iter()
                    .map(|value| FilterOption {
                        label: humanize(&value),
                        count: reported.map(|r| {
                            r.get(&value)
                                .and_then(Value::as_u64)
                                .and_then(|n| usize::try_from(n).ok())
                                .unwrap_or(0)
                        }),
                        value,
                    })
                    .collect(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityId, FacetSpec};
    use crate::query::QueryDefaults;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        id: i64,
        name: String,
        dept: String,
        score: f64,
    }

    impl ListItem for Person {
        const COLLECTION: &'static str = "people";
        const NOUN: &'static str = "person";
        const SEARCH_FIELDS: &'static [&'static str] = &["name"];
        const FACETS: &'static [FacetSpec] = &[FacetSpec {
            key: "dept",
            title: "Department",
        }];
        const SORT_FIELDS: &'static [&'static str] = &["name", "score"];
        const DEFAULT_SORT_FIELD: &'static str = "id";

        fn id(&self) -> EntityId {
            EntityId::Int(self.id)
        }

        fn label(&self) -> String {
            self.name.clone()
        }

        fn field(&self, name: &str) -> FieldValue {
            match name {
                "id" => FieldValue::Int(self.id),
                "name" => (&self.name).into(),
                "dept" => (&self.dept).into(),
                "score" => self.score.into(),
                _ => FieldValue::Missing,
            }
        }
    }

    fn p(id: i64, name: &str, dept: &str, score: f64) -> Person {
        Person {
            id,
            name: name.into(),
            dept: dept.into(),
            score,
        }
    }

    fn ann_bob() -> Vec<Person> {
        vec![p(1, "Ann", "math", 3.0), p(2, "Bob", "art", 1.0)]
    }

    fn state() -> QueryState {
        QueryState::new(QueryDefaults {
            sort: SortSpec::asc("id"),
            page_size: 5,
        })
    }

    fn names<T: ListItem>(rows: &[&T]) -> Vec<String> {
        rows.iter().map(|r| r.label()).collect()
    }

    #[test]
    fn empty_search_yields_full_set_in_order() {
        let items = ann_bob();
        let out = filter(&items, &state());
        assert_eq!(names(&out), vec!["Ann", "Bob"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let items = ann_bob();
        let mut s = state();
        s.set_search_text("an");
        let out = filter(&items, &s);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1);

        s.set_search_text("BO");
        assert_eq!(names(&filter(&items, &s)), vec!["Bob"]);
    }

    #[test]
    fn whitespace_search_is_a_constraint() {
        let items = vec![p(1, "Ann Lee", "math", 0.0), p(2, "Bob", "art", 0.0)];
        let mut s = state();
        s.set_search_text(" ");
        assert_eq!(names(&filter(&items, &s)), vec!["Ann Lee"]);
    }

    #[test]
    fn filter_is_pure() {
        let items = ann_bob();
        let mut s = state();
        s.set_filter("dept", ["art"]);
        assert_eq!(filter(&items, &s), filter(&items, &s));
    }

    #[test]
    fn or_within_key_and_across_keys() {
        let items = vec![
            p(1, "Ann", "math", 1.0),
            p(2, "Bob", "art", 1.0),
            p(3, "Cid", "music", 1.0),
        ];
        let mut s = state();
        s.set_filter("dept", ["math", "art"]);
        assert_eq!(names(&filter(&items, &s)), vec!["Ann", "Bob"]);
        s.set_search_text("b");
        assert_eq!(names(&filter(&items, &s)), vec!["Bob"]);
    }

    #[test]
    fn sort_toggle_reverses() {
        let items = vec![p(1, "Bob", "x", 0.0), p(2, "Ann", "x", 0.0)];
        let mut s = state();
        s.set_sort("name");
        let mut rows = filter(&items, &s);
        sort(&mut rows, s.sort());
        assert_eq!(names(&rows), vec!["Ann", "Bob"]);

        s.set_sort("name");
        assert_eq!(s.sort().order, SortDirection::Desc);
        sort(&mut rows, s.sort());
        assert_eq!(names(&rows), vec!["Bob", "Ann"]);
    }

    #[test]
    fn sorting_sorted_input_is_a_no_op() {
        let items = vec![
            p(1, "Ann", "x", 1.0),
            p(2, "Ann", "y", 1.0),
            p(3, "Bob", "x", 2.0),
        ];
        let mut rows: Vec<&Person> = items.iter().collect();
        sort(&mut rows, &SortSpec::asc("name"));
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn numeric_sort_and_unknown_field_keeps_order() {
        let items = vec![p(1, "a", "x", 2.5), p(2, "b", "x", -1.0), p(3, "c", "x", 10.0)];
        let mut rows: Vec<&Person> = items.iter().collect();
        sort(&mut rows, &SortSpec::desc("score"));
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![3, 1, 2]);

        let mut rows: Vec<&Person> = items.iter().collect();
        sort(&mut rows, &SortSpec::asc("nonexistent"));
        assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn pagination_bounds() {
        let rows: Vec<u32> = (1..=7).collect();
        assert_eq!(paginate(&rows, 1, 5), &[1, 2, 3, 4, 5]);
        assert_eq!(paginate(&rows, 2, 5), &[6, 7]);
        assert!(paginate(&rows, 3, 5).is_empty());
        assert_eq!(paginate(&rows, 0, 5), &[1, 2, 3, 4, 5]);

        for total in 0..20usize {
            let rows: Vec<usize> = (0..total).collect();
            for size in 1..6u32 {
                for page in 1..10u32 {
                    let out = paginate(&rows, page, size);
                    assert!(out.len() <= usize::try_from(size).unwrap_or(usize::MAX));
                    let pages = total.div_ceil(usize::try_from(size).unwrap_or(1));
                    if usize::try_from(page).unwrap_or(usize::MAX) > pages {
                        assert!(out.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn refine_reports_post_filter_total() {
        let items: Vec<Person> = (1..=12)
            .map(|i| p(i, if i % 2 == 0 { "even" } else { "odd" }, "x", 0.0))
            .collect();
        let mut s = state();
        s.set_search_text("even");
        s.set_page(2);
        let out = refine(&items, &s);
        assert_eq!(out.total, 6);
        assert_eq!(out.rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![12]);
    }

    #[test]
    fn global_facets_ignore_filters() {
        let items = vec![
            p(1, "Ann", "math", 0.0),
            p(2, "Bob", "art", 0.0),
            p(3, "Cid", "math", 0.0),
        ];
        let mut s = state();
        s.set_search_text("bob");
        let defs = facets(&items, &s, FacetScope::Global);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].count_of("math"), Some(2));
        assert_eq!(defs[0].count_of("art"), Some(1));
        assert_eq!(defs[0].options[0].label, "Math");
    }

    #[test]
    fn contextual_facets_follow_search_but_not_own_key() {
        let items = vec![
            p(1, "Ann", "math", 0.0),
            p(2, "Bob", "art", 0.0),
            p(3, "Anna", "art", 0.0),
        ];
        let mut s = state();
        s.set_search_text("ann");
        s.set_filter("dept", ["math"]);
        let defs = facets(&items, &s, FacetScope::Contextual);
        // Own key is skipped, so "art" still counts Anna.
        assert_eq!(defs[0].count_of("math"), Some(1));
        assert_eq!(defs[0].count_of("art"), Some(1));
    }

    #[test]
    fn server_facets_list_the_closed_set_and_reported_counts() {
        use crate::model::{Email, Folder, Priority};
        use chrono::Utc;

        let page = vec![Email {
            id: EntityId::Int(1),
            subject: "Timetable".into(),
            sender: "office@school.test".into(),
            recipients: Vec::new(),
            folder: Folder::Archive,
            priority: Priority::Normal,
            read: true,
            starred: false,
            received_at: Utc::now(),
            preview: None,
            body: None,
        }];
        let mut s = QueryState::for_item::<Email>();
        s.set_filter("folder", ["archive"]);

        let defs = server_facets(&page, &s, None);
        let folder = &defs[0];
        let values: Vec<&str> = folder.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["inbox", "sent", "drafts", "archive", "trash"]);
        assert!(folder.options.iter().all(|o| o.count.is_none()));

        let stats = serde_json::json!({ "folder": { "inbox": 8, "archive": 4 } });
        let defs = server_facets(&page, &s, Some(&stats));
        assert_eq!(defs[0].count_of("inbox"), Some(8));
        assert_eq!(defs[0].count_of("archive"), Some(4));
        assert_eq!(defs[0].count_of("trash"), Some(0));
        assert!(defs[1].options.iter().all(|o| o.count.is_none()));
    }

    #[test]
    fn selected_values_without_items_stay_listed() {
        let items = ann_bob();
        let mut s = state();
        s.set_filter("dept", ["history"]);
        let defs = facets(&items, &s, FacetScope::Global);
        assert_eq!(defs[0].count_of("history"), Some(0));
    }
}
