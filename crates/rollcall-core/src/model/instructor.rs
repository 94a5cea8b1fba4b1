// ── Instructor domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::entity_id::EntityId;
use super::item::{FacetSpec, FieldValue, ListItem};

/// Employment status of an instructor.
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
pub enum InstructorStatus {
    Active,
    OnLeave,
    Inactive,
}

/// An instructor with today's attendance summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instructor {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    pub status: InstructorStatus,
    /// UID of the RFID tag assigned to this instructor.
    #[serde(default)]
    pub rfid_tag: Option<String>,
    #[serde(default)]
    pub present_today: bool,
    /// Share of scheduled days attended, 0.0 to 100.0.
    #[serde(default)]
    pub attendance_rate: Option<f64>,
    #[serde(default)]
    pub last_check_in: Option<DateTime<Utc>>,
}

impl Instructor {
    pub fn presence(&self) -> &'static str {
        if self.present_today { "present" } else { "absent" }
    }
}

impl ListItem for Instructor {
    const COLLECTION: &'static str = "instructors";
    const NOUN: &'static str = "instructor";
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "email", "department", "rfidTag"];
    const FACETS: &'static [FacetSpec] = &[
        FacetSpec {
            key: "department",
            title: "Department",
        },
        FacetSpec {
            key: "status",
            title: "Status",
        },
        FacetSpec {
            key: "presence",
            title: "Presence",
        },
    ];
    const SORT_FIELDS: &'static [&'static str] = &[
        "name",
        "email",
        "department",
        "status",
        "attendanceRate",
        "lastCheckIn",
    ];
    const DEFAULT_SORT_FIELD: &'static str = "name";

    fn id(&self) -> EntityId {
        self.id.clone()
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn field(&self, name: &str) -> FieldValue {
        match name {
            "id" => FieldValue::Text(self.id.to_string()),
            "name" => (&self.name).into(),
            "email" => (&self.email).into(),
            "department" => self.department.as_ref().into(),
            "status" => self.status.as_ref().into(),
            "rfidTag" => self.rfid_tag.as_ref().into(),
            "presence" => self.presence().into(),
            "presentToday" => self.present_today.into(),
            "attendanceRate" => self.attendance_rate.into(),
            "lastCheckIn" => self.last_check_in.into(),
            _ => FieldValue::Missing,
        }
    }
}
