// ── Active dialog ──
//
// A view shows at most one modal at a time; the tagged union replaces a
// pile of independent open/closed flags.

use crate::bulk::BulkReport;
use crate::model::EntityId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ActiveDialog {
    #[default]
    None,
    /// Confirm deleting a single record.
    ConfirmDelete { id: EntityId, label: String },
    /// Confirm deleting every selected record.
    BulkDelete { count: usize },
    /// Assign an RFID tag; `draft` is the instructor name being typed.
    Assign { id: EntityId, draft: String },
    /// Confirm restoring a backup archive.
    Restore { id: EntityId, label: String },
    /// Tally of the last bulk action.
    BulkResult(BulkReport),
}

impl ActiveDialog {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::None)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::ConfirmDelete { .. } => "Delete",
            Self::BulkDelete { .. } => "Delete selected",
            Self::Assign { .. } => "Assign tag",
            Self::Restore { .. } => "Restore backup",
            Self::BulkResult(_) => "Bulk action finished",
        }
    }

    /// Whether the dialog asks a yes/no question.
    pub fn is_confirmation(&self) -> bool {
        matches!(
            self,
            Self::ConfirmDelete { .. } | Self::BulkDelete { .. } | Self::Restore { .. }
        )
    }
}
