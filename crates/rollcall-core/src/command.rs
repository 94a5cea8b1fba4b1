// ── Optimistic commands ──
//
// A command edits the local copy of a record before the service confirms
// it, and knows how to undo itself if the write fails. The controller
// applies, sends `patch`, then reconciles with the server's copy or
// inverts.

use serde_json::{Value, json};

use crate::model::{Email, Folder, Instructor, InstructorStatus, RfidReader, RfidTag, ReaderStatus, TagStatus};

pub trait OptimisticCommand<T>: Send + Sync {
    /// Apply the change to the local copy.
    fn apply(&self, item: &mut T);

    /// Undo `apply`.
    fn invert(&self, item: &mut T);

    /// PATCH body describing the change, built from the applied item.
    fn patch(&self, item: &T) -> Value;

    /// Short description for logs and notifications.
    fn describe(&self) -> String;
}

// ── Email ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct ToggleRead;

impl OptimisticCommand<Email> for ToggleRead {
    fn apply(&self, item: &mut Email) {
        item.read = !item.read;
    }

    fn invert(&self, item: &mut Email) {
        item.read = !item.read;
    }

    fn patch(&self, item: &Email) -> Value {
        json!({ "read": item.read })
    }

    fn describe(&self) -> String {
        "toggle read".into()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ToggleStarred;

impl OptimisticCommand<Email> for ToggleStarred {
    fn apply(&self, item: &mut Email) {
        item.starred = !item.starred;
    }

    fn invert(&self, item: &mut Email) {
        item.starred = !item.starred;
    }

    fn patch(&self, item: &Email) -> Value {
        json!({ "starred": item.starred })
    }

    fn describe(&self) -> String {
        "toggle star".into()
    }
}

/// Move a message between folders; `from` is captured at construction.
#[derive(Debug, Clone, Copy)]
pub struct MoveToFolder {
    pub from: Folder,
    pub to: Folder,
}

impl MoveToFolder {
    pub fn new(email: &Email, to: Folder) -> Self {
        Self {
            from: email.folder,
            to,
        }
    }
}

impl OptimisticCommand<Email> for MoveToFolder {
    fn apply(&self, item: &mut Email) {
        item.folder = self.to;
    }

    fn invert(&self, item: &mut Email) {
        item.folder = self.from;
    }

    fn patch(&self, _item: &Email) -> Value {
        json!({ "folder": self.to })
    }

    fn describe(&self) -> String {
        format!("move to {}", self.to)
    }
}

// ── Status transitions ──────────────────────────────────────────────

/// Set a status field, remembering the previous value for rollback.
#[derive(Debug, Clone, Copy)]
pub struct SetStatus<S> {
    pub from: S,
    pub to: S,
}

macro_rules! status_command {
    ($item:ty, $status:ty) => {
        impl SetStatus<$status> {
            pub fn for_item(item: &$item, to: $status) -> Self {
                Self {
                    from: item.status,
                    to,
                }
            }
        }

        impl OptimisticCommand<$item> for SetStatus<$status> {
            fn apply(&self, item: &mut $item) {
                item.status = self.to;
            }

            fn invert(&self, item: &mut $item) {
                item.status = self.from;
            }

            fn patch(&self, _item: &$item) -> Value {
                json!({ "status": self.to })
            }

            fn describe(&self) -> String {
                format!("set status {}", self.to)
            }
        }
    };
}

status_command!(Instructor, InstructorStatus);
status_command!(RfidReader, ReaderStatus);
status_command!(RfidTag, TagStatus);

/// Assign a tag to an instructor, or release it with `None`.
#[derive(Debug, Clone)]
pub struct AssignTag {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl AssignTag {
    pub fn new(tag: &RfidTag, to: Option<String>) -> Self {
        Self {
            from: tag.assigned_to.clone(),
            to,
        }
    }
}

impl OptimisticCommand<RfidTag> for AssignTag {
    fn apply(&self, item: &mut RfidTag) {
        item.assigned_to.clone_from(&self.to);
    }

    fn invert(&self, item: &mut RfidTag) {
        item.assigned_to.clone_from(&self.from);
    }

    fn patch(&self, _item: &RfidTag) -> Value {
        json!({ "assignedTo": self.to })
    }

    fn describe(&self) -> String {
        match self.to {
            Some(ref who) => format!("assign to {who}"),
            None => "unassign".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityId, Priority, TagType};
    use chrono::Utc;

    fn email() -> Email {
        Email {
            id: EntityId::Int(1),
            subject: "Timetable".into(),
            sender: "office@school.test".into(),
            recipients: vec![],
            folder: Folder::Inbox,
            priority: Priority::Normal,
            read: false,
            starred: false,
            received_at: Utc::now(),
            preview: None,
            body: None,
        }
    }

    fn round_trip<T: Clone + PartialEq + std::fmt::Debug>(cmd: &dyn OptimisticCommand<T>, item: &T) {
        let mut local = item.clone();
        cmd.apply(&mut local);
        assert_ne!(&local, item, "{} should change the item", cmd.describe());
        cmd.invert(&mut local);
        assert_eq!(&local, item);
    }

    #[test]
    fn email_commands_invert() {
        let e = email();
        round_trip(&ToggleRead, &e);
        round_trip(&ToggleStarred, &e);
        round_trip(&MoveToFolder::new(&e, Folder::Archive), &e);
    }

    #[test]
    fn patch_reflects_applied_state() {
        let mut e = email();
        ToggleRead.apply(&mut e);
        assert_eq!(ToggleRead.patch(&e), json!({ "read": true }));
        let mv = MoveToFolder::new(&e, Folder::Trash);
        assert_eq!(mv.patch(&e), json!({ "folder": "trash" }));
    }

    #[test]
    fn tag_commands_invert() {
        let tag = RfidTag {
            id: EntityId::Int(3),
            uid: "04:a1".into(),
            tag_type: TagType::Card,
            status: TagStatus::Active,
            assigned_to: None,
            last_scanned: None,
        };
        round_trip(&SetStatus::<TagStatus>::for_item(&tag, TagStatus::Lost), &tag);
        let assign = AssignTag::new(&tag, Some("Ann".into()));
        round_trip(&assign, &tag);
        assert_eq!(assign.patch(&tag), json!({ "assignedTo": "Ann" }));
    }
}
