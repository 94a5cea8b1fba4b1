//! Reactive list-view controller between `rollcall-api` and the CLI / TUI.
//!
//! Every admin list (instructors, emails, RFID readers and tags, backups)
//! is the same machine parameterized over its record type:
//!
//! - **[`ListController`]**: owns one view's [`QueryState`], result set,
//!   row expansion and [`ActiveDialog`]. Synchronous mutators report
//!   whether a refetch is needed; fetches are sequence-numbered so a stale
//!   response never overwrites a newer one.
//!
//! - **[`engine`]**: pure filter / sort / paginate / facet functions used
//!   when a collection is refined locally.
//!
//! - **[`ListingSource`]**: the service seam. [`HttpSource`] wraps
//!   `rollcall_api::ListingClient`; [`MemorySource`] serves tests and demos.
//!
//! - **Collaborators**: [`Persistence`] (address bar or saved-view file),
//!   [`Debouncer`] for search input, [`poll`] for clock ticks and backup
//!   progress, [`LoginRedirect`] for expired sessions.
//!
//! - **Actions**: concurrent bulk operations with per-item tallies
//!   ([`BulkReport`]) and optimistic edits ([`OptimisticCommand`]).

pub mod bulk;
pub mod command;
pub mod config;
pub mod controller;
pub mod debounce;
pub mod dialog;
pub mod engine;
pub mod error;
pub mod expansion;
pub mod fetch;
pub mod model;
pub mod persist;
pub mod poll;
pub mod query;
pub mod selection;
pub mod source;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bulk::{BulkFailure, BulkReport};
pub use command::{AssignTag, MoveToFolder, OptimisticCommand, SetStatus, ToggleRead, ToggleStarred};
pub use config::{ClientConfig, ViewDefaults};
pub use controller::{ListController, LoginRedirect};
pub use debounce::Debouncer;
pub use dialog::ActiveDialog;
pub use engine::{FacetScope, FilterDefinition, FilterOption};
pub use error::CoreError;
pub use expansion::ExpansionSet;
pub use fetch::{FetchOutcome, FetchTicket, ListMode, ResultSet};
pub use persist::{
    AddressBar, FilePersistence, MemoryAddressBar, NoPersistence, Persistence, QueryCodec,
    UrlSynchronizer,
};
pub use query::{QueryState, SortSpec};
pub use selection::Selection;
pub use source::{HttpSource, ListingSource, MemorySource};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Backup, BackupKind, BackupStatus, CreateBackupRequest, Email, EntityId, FieldValue, Folder,
    Instructor, InstructorStatus, ListItem, Priority, ReaderStatus, RfidReader, RfidTag, TagStatus,
    TagType,
};

pub use rollcall_api::SortDirection;
