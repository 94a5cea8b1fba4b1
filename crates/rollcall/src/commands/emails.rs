//! Mailbox command handlers.

use tabled::Tabled;

use rollcall_core::{Email, MoveToFolder, ToggleRead, ToggleStarred};
use rollcall_core::model::humanize;

use crate::cli::{EmailsArgs, EmailsCommand, GlobalOpts};
use crate::error::CliError;

use super::listing::{self, Session};

#[derive(Tabled)]
struct EmailRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "")]
    flags: String,
    #[tabled(rename = "From")]
    sender: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Folder")]
    folder: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Received")]
    received: String,
}

impl From<&Email> for EmailRow {
    fn from(e: &Email) -> Self {
        Self {
            id: e.id.to_string(),
            flags: flags(e),
            sender: e.sender.clone(),
            subject: e.subject.clone(),
            folder: humanize(e.folder.as_ref()),
            priority: humanize(e.priority.as_ref()),
            received: e.received_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// `●` unread, `★` starred.
fn flags(e: &Email) -> String {
    let mut out = String::new();
    out.push(if e.read { ' ' } else { '●' });
    out.push(if e.starred { '★' } else { ' ' });
    out
}

fn detail(e: &Email) -> String {
    let mut lines = vec![
        format!("ID:        {}", e.id),
        format!("Subject:   {}", e.subject),
        format!("From:      {}", e.sender),
        format!("To:        {}", e.recipients.join(", ")),
        format!("Folder:    {}", humanize(e.folder.as_ref())),
        format!("Priority:  {}", humanize(e.priority.as_ref())),
        format!("Received:  {}", e.received_at.format("%Y-%m-%d %H:%M")),
        format!("Status:    {}{}", e.read_state(), if e.starred { ", starred" } else { "" }),
    ];
    if let Some(body) = e.body.as_deref().or(e.preview.as_deref()) {
        lines.push(String::new());
        lines.push(body.to_owned());
    }
    lines.join("\n")
}

pub async fn handle(session: &Session, args: EmailsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        EmailsCommand::List(list) => {
            listing::list(session, list, global, |e: &Email| EmailRow::from(e)).await
        }

        EmailsCommand::Get { id } => listing::get(session, &id, global, detail).await,

        EmailsCommand::ToggleRead { id } => {
            listing::apply_command(session, &id, global, |_: &Email| ToggleRead, detail).await
        }

        EmailsCommand::Star { id } => {
            listing::apply_command(session, &id, global, |_: &Email| ToggleStarred, detail).await
        }

        EmailsCommand::Move { id, folder } => {
            listing::apply_command(
                session,
                &id,
                global,
                |email: &Email| MoveToFolder::new(email, folder),
                detail,
            )
            .await
        }

        EmailsCommand::Delete(ids) => listing::delete::<Email>(session, &ids.ids, global).await,
    }
}
