// ── RFID reader and tag domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::entity_id::EntityId;
use super::item::{FacetSpec, FieldValue, ListItem};

/// Reader connectivity as last reported by the scanner network.
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
pub enum ReaderStatus {
    Online,
    Offline,
    Maintenance,
}

/// A door or classroom RFID reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidReader {
    pub id: EntityId,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub status: ReaderStatus,
    #[serde(default)]
    pub scans_today: u64,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl ListItem for RfidReader {
    const COLLECTION: &'static str = "rfid/readers";
    const NOUN: &'static str = "reader";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "location", "ipAddress"];
    const FACETS: &'static [FacetSpec] = &[
        FacetSpec {
            key: "status",
            title: "Status",
        },
        FacetSpec {
            key: "location",
            title: "Location",
        },
    ];
    const SORT_FIELDS: &'static [&'static str] =
        &["name", "location", "status", "scansToday", "lastSeen"];
    const DEFAULT_SORT_FIELD: &'static str = "name";

    fn id(&self) -> EntityId {
        self.id.clone()
    }

    fn label(&self) -> String {
        format!("{} ({})", self.name, self.location)
    }

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Text(self.id.to_string()),
            "name" => (&self.name).into(),
            "location" => (&self.location).into(),
            "ipAddress" => self.ip_address.as_ref().into(),
            "status" => self.status.as_ref().into(),
            "scansToday" => self.scans_today.into(),
            "lastSeen" => self.last_seen.into(),
            _ => FieldValue::Missing,
        }
    }
}

// ── Tags ────────────────────────────────────────────────────────────

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
pub enum TagType {
    Card,
    Fob,
    Sticker,
}

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
pub enum TagStatus {
    Active,
    Inactive,
    Lost,
}

/// An RFID credential, optionally assigned to an instructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidTag {
    pub id: EntityId,
    pub uid: String,
    pub tag_type: TagType,
    pub status: TagStatus,
    /// Name of the instructor holding the tag.
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub last_scanned: Option<DateTime<Utc>>,
}

impl RfidTag {
    pub fn assignment(&self) -> &'static str {
        if self.assigned_to.is_some() {
            "assigned"
        } else {
            "unassigned"
        }
    }
}

impl ListItem for RfidTag {
    const COLLECTION: &'static str = "rfid/tags";
    const NOUN: &'static str = "tag";
    const SEARCH_FIELDS: &'static [&'static str] = &["uid", "assignedTo"];
    const FACETS: &'static [FacetSpec] = &[
        FacetSpec {
            key: "status",
            title: "Status",
        },
        FacetSpec {
            key: "tagType",
            title: "Type",
        },
        FacetSpec {
            key: "assignment",
            title: "Assignment",
        },
    ];
    const SORT_FIELDS: &'static [&'static str] =
        &["uid", "tagType", "status", "assignedTo", "lastScanned"];
    const DEFAULT_SORT_FIELD: &'static str = "uid";

    fn id(&self) -> EntityId {
        self.id.clone()
    }

    fn label(&self) -> String {
        self.uid.clone()
    }

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Text(self.id.to_string()),
            "uid" => (&self.uid).into(),
            "tagType" => self.tag_type.as_ref().into(),
            "status" => self.status.as_ref().into(),
            "assignedTo" => self.assigned_to.as_ref().into(),
            "assignment" => self.assignment().into(),
            "lastScanned" => self.last_scanned.into(),
            _ => FieldValue::Missing,
        }
    }
}
