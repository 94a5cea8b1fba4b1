// ── List item projection ──
//
// Every collection shown in a list view implements `ListItem`. The trait
// exposes just enough of a record for the local engine to search, facet
// and sort it without knowing the concrete type.

use std::cmp::Ordering;
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::EntityId;
use crate::fetch::ListMode;
use rollcall_api::SortDirection;

/// Comparable projection of one record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    Missing,
}

impl FieldValue {
    /// Ordering used by the sort engine.
    ///
    /// Text compares byte-wise (case-sensitive), numbers numerically.
    /// Mismatched or missing values compare equal so a stable sort keeps
    /// their original order.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Time(a), Self::Time(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }

    /// Text form used for search matching and facet values.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Int(n) => Some(n.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Time(t) => Some(t.to_rfc3339()),
            Self::Missing => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<&String> for FieldValue {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Missing, Into::into)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u8> for FieldValue {
    fn from(n: u8) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<u64> for FieldValue {
    fn from(n: u64) -> Self {
        i64::try_from(n).map_or(Self::Missing, Self::Int)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(t: DateTime<Utc>) -> Self {
        Self::Time(t)
    }
}

/// A filterable dimension of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FacetSpec {
    /// Filter key; also the query-string parameter name.
    pub key: &'static str,
    pub title: &'static str,
}

/// A record that can be listed, searched, faceted and sorted.
pub trait ListItem: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// REST collection path segment.
    const COLLECTION: &'static str;
    /// Singular display noun ("instructor", "email", ...).
    const NOUN: &'static str;
    /// Fields matched by the free-text search.
    const SEARCH_FIELDS: &'static [&'static str];
    /// Filterable dimensions.
    const FACETS: &'static [FacetSpec];
    /// Fields a user may sort by.
    const SORT_FIELDS: &'static [&'static str];
    const DEFAULT_SORT_FIELD: &'static str;
    const DEFAULT_SORT_ORDER: SortDirection = SortDirection::Asc;
    /// Where refinement happens for this collection.
    const MODE: ListMode = ListMode::Client;

    fn id(&self) -> EntityId;

    /// Short human label used in dialogs and reports.
    fn label(&self) -> String;

    fn field(&self, name: &str) -> FieldValue;

    /// Every value a facet can take, for facets over a closed set (enum
    /// fields). Listed even when the loaded page holds none of them.
    fn facet_domain(_key: &str) -> Vec<String> {
        Vec::new()
    }

    /// Values this record contributes to a facet. Defaults to the text
    /// form of the field with the same name.
    fn facet_values(&self, key: &str) -> Vec<String> {
        self.field(key).as_text().into_iter().collect()
    }

    /// Case-insensitive substring match over `SEARCH_FIELDS`.
    /// `needle` must already be lowercase.
    fn matches_search(&self, needle: &str) -> bool {
        Self::SEARCH_FIELDS.iter().any(|name| {
            self.field(name)
                .as_text()
                .is_some_and(|text| text.to_lowercase().contains(needle))
        })
    }

    /// Patch body that replaces physical deletion (soft delete), if any.
    fn soft_delete_patch(&self) -> Option<serde_json::Value> {
        None
    }
}

/// Humanize a wire value for display: `on_leave` becomes `On leave`.
pub fn humanize(value: &str) -> String {
    let spaced = value.replace(['_', '-'], " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_values_compare_equal() {
        assert_eq!(
            FieldValue::Text("a".into()).compare(&FieldValue::Int(1)),
            Ordering::Equal
        );
        assert_eq!(FieldValue::Missing.compare(&FieldValue::Int(1)), Ordering::Equal);
        assert_eq!(
            FieldValue::Float(f64::NAN).compare(&FieldValue::Float(1.0)),
            Ordering::Equal
        );
    }

    #[test]
    fn text_compare_is_case_sensitive() {
        assert_eq!(
            FieldValue::from("B").compare(&FieldValue::from("a")),
            Ordering::Less
        );
    }

    #[test]
    fn humanize_wire_values() {
        assert_eq!(humanize("on_leave"), "On leave");
        assert_eq!(humanize("inbox"), "Inbox");
        assert_eq!(humanize(""), "");
    }
}
