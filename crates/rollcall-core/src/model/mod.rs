// ── Domain model ──
//
// The five listed collections plus the `ListItem` projection the list
// engine works against.

pub mod backup;
pub mod email;
pub mod entity_id;
pub mod instructor;
pub mod item;
pub mod rfid;

pub use backup::{Backup, BackupKind, BackupStatus, CreateBackupRequest};
pub use email::{Email, Folder, Priority};
pub use entity_id::EntityId;
pub use instructor::{Instructor, InstructorStatus};
pub use item::{FacetSpec, FieldValue, ListItem, humanize};
pub use rfid::{ReaderStatus, RfidReader, RfidTag, TagStatus, TagType};
