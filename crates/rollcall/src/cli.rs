//! Clap derive structures for the `rollcall` CLI.
//!
//! Defines the command tree, global flags, and the list arguments shared
//! by every collection.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use rollcall_core::{BackupKind, Folder, InstructorStatus, ReaderStatus, TagStatus};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// rollcall -- admin CLI for the school attendance service
#[derive(Debug, Parser)]
#[command(
    name = "rollcall",
    version,
    about = "Administer school attendance: instructors, email, RFID and backups",
    long_about = "Scriptable list views over the rollcall attendance service.\n\n\
        Every collection supports search, filters, sorting and paging, with\n\
        bulk deletes that report per-item results.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Service profile to use
    #[arg(long, short = 'p', env = "ROLLCALL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Service URL (overrides profile)
    #[arg(long, short = 's', env = "ROLLCALL_SERVER", global = true)]
    pub server: Option<String>,

    /// API token
    #[arg(long, env = "ROLLCALL_TOKEN", global = true, hide_env = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ROLLCALL_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ROLLCALL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ROLLCALL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one id per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage instructors and their attendance
    #[command(alias = "inst", alias = "i")]
    Instructors(InstructorsArgs),

    /// Manage the staff mailbox
    #[command(alias = "mail", alias = "e")]
    Emails(EmailsArgs),

    /// Manage RFID readers
    #[command(alias = "rd")]
    Readers(ReadersArgs),

    /// Manage RFID tags
    #[command(alias = "tg")]
    Tags(TagsArgs),

    /// Create, restore and prune backups
    #[command(alias = "bk")]
    Backups(BackupsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// Search, filter, sort and paging shared by every list command.
#[derive(Debug, Default, Args)]
pub struct ListArgs {
    /// Case-insensitive text search
    #[arg(long, short = 'S')]
    pub search: Option<String>,

    /// Filter as key=value[,value...]; repeat for more keys
    /// Examples: "status=active", "department=Math,Science", "department=Arts\, Music"
    #[arg(long, short = 'f', value_name = "KEY=VALUES")]
    pub filter: Vec<String>,

    /// Sort field, optionally with direction: "name", "name:desc"
    #[arg(long)]
    pub sort: Option<String>,

    /// Page to show (1-based)
    #[arg(long)]
    pub page: Option<u32>,

    /// Rows per page (overrides profile)
    #[arg(long, short = 'l')]
    pub page_size: Option<u32>,

    /// Show facet counts instead of rows
    #[arg(long)]
    pub facets: bool,

    /// Print the view's shareable query string to stderr
    #[arg(long)]
    pub share: bool,

    /// Start from a query string (as printed by --share)
    #[arg(long, value_name = "QUERY", conflicts_with = "remember")]
    pub from_query: Option<String>,

    /// Remember this view and reuse it next time
    #[arg(long)]
    pub remember: bool,
}

/// One or more record ids.
#[derive(Debug, Args)]
pub struct IdsArg {
    /// Record ids
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,
}

/// JSON body given inline or from a file.
#[derive(Debug, Args)]
pub struct BodyArgs {
    /// Read the JSON body from a file
    #[arg(long, short = 'F', conflicts_with = "set")]
    pub from_file: Option<PathBuf>,

    /// Set a field: key=value (repeatable; values parsed as JSON when possible)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INSTRUCTORS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct InstructorsArgs {
    #[command(subcommand)]
    pub command: InstructorsCommand,
}

#[derive(Debug, Subcommand)]
pub enum InstructorsCommand {
    /// List instructors
    #[command(alias = "ls")]
    List(ListArgs),

    /// Get instructor details
    Get {
        /// Instructor id
        id: String,
    },

    /// Create an instructor
    Create {
        /// Full name
        #[arg(long, required_unless_present = "from_file")]
        name: Option<String>,

        /// Email address
        #[arg(long, required_unless_present = "from_file")]
        email: Option<String>,

        /// Department
        #[arg(long)]
        department: Option<String>,

        /// Read the JSON body from a file
        #[arg(long, short = 'F')]
        from_file: Option<PathBuf>,
    },

    /// Update fields of an instructor
    Update {
        /// Instructor id
        id: String,

        #[command(flatten)]
        body: BodyArgs,
    },

    /// Change an instructor's status
    SetStatus {
        /// Instructor id
        id: String,

        /// New status
        #[arg(value_parser = parse_enum::<InstructorStatus>)]
        status: InstructorStatus,
    },

    /// Delete instructors (several ids run concurrently)
    #[command(alias = "rm")]
    Delete(IdsArg),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EMAILS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EmailsArgs {
    #[command(subcommand)]
    pub command: EmailsCommand,
}

#[derive(Debug, Subcommand)]
pub enum EmailsCommand {
    /// List messages (searched, filtered and paged by the server)
    #[command(alias = "ls")]
    List(ListArgs),

    /// Show a message with its body
    Get {
        /// Message id
        id: String,
    },

    /// Toggle read/unread
    ToggleRead {
        /// Message id
        id: String,
    },

    /// Toggle the star
    Star {
        /// Message id
        id: String,
    },

    /// Move a message to another folder
    Move {
        /// Message id
        id: String,

        /// Target folder
        #[arg(value_parser = parse_enum::<Folder>)]
        folder: Folder,
    },

    /// Move messages to trash (deletes them for good if already there)
    #[command(alias = "rm")]
    Delete(IdsArg),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RFID READERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ReadersArgs {
    #[command(subcommand)]
    pub command: ReadersCommand,
}

#[derive(Debug, Subcommand)]
pub enum ReadersCommand {
    /// List readers
    #[command(alias = "ls")]
    List(ListArgs),

    /// Get reader details
    Get {
        /// Reader id
        id: String,
    },

    /// Register a reader
    Create {
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Change a reader's status
    SetStatus {
        /// Reader id
        id: String,

        /// New status
        #[arg(value_parser = parse_enum::<ReaderStatus>)]
        status: ReaderStatus,
    },

    /// Remove readers
    #[command(alias = "rm")]
    Delete(IdsArg),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RFID TAGS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct TagsArgs {
    #[command(subcommand)]
    pub command: TagsCommand,
}

#[derive(Debug, Subcommand)]
pub enum TagsCommand {
    /// List tags
    #[command(alias = "ls")]
    List(ListArgs),

    /// Get tag details
    Get {
        /// Tag id
        id: String,
    },

    /// Register a tag
    Create {
        #[command(flatten)]
        body: BodyArgs,
    },

    /// Assign a tag to an instructor
    Assign {
        /// Tag id
        id: String,

        /// Instructor name
        instructor: String,
    },

    /// Clear a tag's assignment
    Unassign {
        /// Tag id
        id: String,
    },

    /// Change a tag's status
    SetStatus {
        /// Tag id
        id: String,

        /// New status
        #[arg(value_parser = parse_enum::<TagStatus>)]
        status: TagStatus,
    },

    /// Remove tags
    #[command(alias = "rm")]
    Delete(IdsArg),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  BACKUPS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct BackupsArgs {
    #[command(subcommand)]
    pub command: BackupsCommand,
}

#[derive(Debug, Subcommand)]
pub enum BackupsCommand {
    /// List backups
    #[command(alias = "ls")]
    List(ListArgs),

    /// Get backup details
    Get {
        /// Backup id
        id: String,
    },

    /// Start a new backup
    Create {
        /// Backup kind
        #[arg(long, default_value = "full", value_parser = parse_enum::<BackupKind>)]
        kind: BackupKind,

        /// Operator note
        #[arg(long)]
        note: Option<String>,

        /// Wait for the job to finish, showing progress
        #[arg(long, short = 'w')]
        wait: bool,
    },

    /// Restore the system from a backup
    Restore {
        /// Backup id
        id: String,

        /// Wait for the restore to finish, showing progress
        #[arg(long, short = 'w')]
        wait: bool,
    },

    /// Delete backups
    #[command(alias = "rm")]
    Delete(IdsArg),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a profile value
    Set {
        /// Profile key (server, api_token_env, csrf_path, ca_cert, insecure, timeout, page_size)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an API token in the system keyring
    SetToken {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}

/// Parse a wire-name enum value (`on_leave`, `maintenance`, ...).
fn parse_enum<E: std::str::FromStr>(raw: &str) -> Result<E, String> {
    let normalized = raw.trim().to_lowercase().replace('-', "_");
    normalized
        .parse()
        .map_err(|_| format!("unrecognized value '{raw}'"))
}
