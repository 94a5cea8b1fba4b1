//! Command dispatch: bridges CLI args -> list controllers -> output formatting.

pub mod backups;
pub mod config_cmd;
pub mod emails;
pub mod instructors;
pub mod listing;
pub mod readers;
pub mod tags;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

use self::listing::Session;

/// Dispatch a service-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Instructors(args) => instructors::handle(session, args, global).await,
        Command::Emails(args) => emails::handle(session, args, global).await,
        Command::Readers(args) => readers::handle(session, args, global).await,
        Command::Tags(args) => tags::handle(session, args, global).await,
        Command::Backups(args) => backups::handle(session, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
