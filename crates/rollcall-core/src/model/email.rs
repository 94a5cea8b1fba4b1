// ── Email domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use super::entity_id::EntityId;
use super::item::{FacetSpec, FieldValue, ListItem};
use crate::fetch::ListMode;
use rollcall_api::SortDirection;

/// Mailbox folder.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Folder {
    Inbox,
    Sent,
    Drafts,
    Archive,
    Trash,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

/// A message in the administrative mailbox.
///
/// The list projection omits `body`; `GET /emails/{id}` fills it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Email {
    pub id: EntityId,
    pub subject: String,
    pub sender: String,
    #[serde(default)]
    pub recipients: Vec<String>,
    pub folder: Folder,
    #[serde(default = "default_priority")]
    pub priority: Priority,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub starred: bool,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_priority() -> Priority {
    Priority::Normal
}

impl Email {
    pub fn read_state(&self) -> &'static str {
        if self.read { "read" } else { "unread" }
    }
}

impl ListItem for Email {
    const COLLECTION: &'static str = "emails";
    const NOUN: &'static str = "email";
    const SEARCH_FIELDS: &'static [&'static str] = &["subject", "sender", "recipients", "preview"];
    const FACETS: &'static [FacetSpec] = &[
        FacetSpec {
            key: "folder",
            title: "Folder",
        },
        FacetSpec {
            key: "priority",
            title: "Priority",
        },
        FacetSpec {
            key: "status",
            title: "Status",
        },
    ];
    const SORT_FIELDS: &'static [&'static str] =
        &["receivedAt", "subject", "sender", "priority", "read", "starred"];
    const DEFAULT_SORT_FIELD: &'static str = "receivedAt";
    const DEFAULT_SORT_ORDER: SortDirection = SortDirection::Desc;
    const MODE: ListMode = ListMode::ServerFull;

    fn id(&self) -> EntityId {
        self.id.clone()
    }

    fn label(&self) -> String {
        self.subject.clone()
    }

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Text(self.id.to_string()),
            "subject" => (&self.subject).into(),
            "sender" => (&self.sender).into(),
            "recipients" => FieldValue::Text(self.recipients.join(", ")),
            "folder" => self.folder.as_ref().into(),
            // Ordered by urgency rather than by name.
            "priority" => FieldValue::Int(match self.priority {
                Priority::Low => 0,
                Priority::Normal => 1,
                Priority::High => 2,
                Priority::Urgent => 3,
            }),
            "status" => self.read_state().into(),
            "read" => self.read.into(),
            "starred" => self.starred.into(),
            "receivedAt" => self.received_at.into(),
            "preview" => self.preview.as_ref().into(),
            _ => FieldValue::Missing,
        }
    }

    fn facet_domain(key: &str) -> Vec<String> {
        match key {
            "folder" => Folder::iter().map(|f| f.as_ref().to_owned()).collect(),
            "priority" => Priority::iter().map(|p| p.as_ref().to_owned()).collect(),
            "status" => ["unread", "read", "starred"].into_iter().map(str::to_owned).collect(),
            _ => Vec::new(),
        }
    }

    fn facet_values(&self, key: &str) -> Vec<String> {
        match key {
            "priority" => vec![self.priority.to_string()],
            "status" => {
                let mut values = vec![self.read_state().to_owned()];
                if self.starred {
                    values.push("starred".to_owned());
                }
                values
            }
            _ => self.field(key).as_text().into_iter().collect(),
        }
    }

    /// Deleting outside the trash moves the message there instead.
    fn soft_delete_patch(&self) -> Option<serde_json::Value> {
        (self.folder != Folder::Trash).then(|| json!({ "folder": Folder::Trash }))
    }
}
