// ── Backup domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::entity_id::EntityId;
use super::item::{FacetSpec, FieldValue, ListItem};
use rollcall_api::SortDirection;

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
pub enum BackupKind {
    Full,
    Incremental,
}

/// Lifecycle of a backup archive. `Restoring` is entered when a restore
/// job is started from the archive and returns to `Completed` afterwards.
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
pub enum BackupStatus {
    Pending,
    InProgress,
    Restoring,
    Completed,
    Failed,
}

impl BackupStatus {
    /// No further progress updates will arrive.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub id: EntityId,
    pub filename: String,
    pub kind: BackupKind,
    pub status: BackupStatus,
    /// Percent complete of the running job, 0 to 100.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    pub created_at: DateTime<Utc>,
    /// Failure reason or operator note.
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /backups`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBackupRequest {
    pub kind: BackupKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ListItem for Backup {
    const COLLECTION: &'static str = "backups";
    const NOUN: &'static str = "backup";
    const SEARCH_FIELDS: &'static [&'static str] = &["filename", "message"];
    const FACETS: &'static [FacetSpec] = &[
        FacetSpec {
            key: "kind",
            title: "Kind",
        },
        FacetSpec {
            key: "status",
            title: "Status",
        },
    ];
    const SORT_FIELDS: &'static [&'static str] =
        &["createdAt", "filename", "kind", "status", "sizeBytes"];
    const DEFAULT_SORT_FIELD: &'static str = "createdAt";
    const DEFAULT_SORT_ORDER: SortDirection = SortDirection::Desc;

    fn id(&self) -> EntityId {
        self.id.clone()
    }

    fn label(&self) -> String {
        self.filename.clone()
    }

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Text(self.id.to_string()),
            "filename" => (&self.filename).into(),
            "kind" => self.kind.as_ref().into(),
            "status" => self.status.as_ref().into(),
            "progress" => self.progress.into(),
            "sizeBytes" => self.size_bytes.into(),
            "createdAt" => self.created_at.into(),
            "message" => self.message.as_ref().into(),
            _ => FieldValue::Missing,
        }
    }
}
