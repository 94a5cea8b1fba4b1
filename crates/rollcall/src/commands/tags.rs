//! RFID tag command handlers.

use tabled::Tabled;

use rollcall_core::{AssignTag, RfidTag, SetStatus, TagStatus};
use rollcall_core::model::humanize;

use crate::cli::{GlobalOpts, TagsArgs, TagsCommand};
use crate::error::CliError;
use crate::output;

use super::listing::{self, Session};
use super::util;

#[derive(Tabled)]
struct TagRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "UID")]
    uid: String,
    #[tabled(rename = "Type")]
    tag_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Assigned to")]
    assigned_to: String,
    #[tabled(rename = "Last scan")]
    last_scanned: String,
}

fn row(t: &RfidTag, color: bool) -> TagRow {
    TagRow {
        id: t.id.to_string(),
        uid: t.uid.clone(),
        tag_type: humanize(t.tag_type.as_ref()),
        status: output::paint_status(t.status.as_ref(), color),
        assigned_to: t.assigned_to.clone().unwrap_or_else(|| "-".into()),
        last_scanned: t
            .last_scanned
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
    }
}

fn detail(t: &RfidTag) -> String {
    [
        format!("ID:           {}", t.id),
        format!("UID:          {}", t.uid),
        format!("Type:         {}", humanize(t.tag_type.as_ref())),
        format!("Status:       {}", humanize(t.status.as_ref())),
        format!("Assigned to:  {}", t.assigned_to.as_deref().unwrap_or("-")),
        format!(
            "Last scan:    {}",
            t.last_scanned.map_or_else(|| "never".into(), |ts| ts.to_rfc3339())
        ),
    ]
    .join("\n")
}

pub async fn handle(session: &Session, args: TagsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    match args.command {
        TagsCommand::List(list) => {
            listing::list(session, list, global, |t: &RfidTag| row(t, color)).await
        }

        TagsCommand::Get { id } => listing::get(session, &id, global, detail).await,

        TagsCommand::Create { body } => {
            let body = util::read_body(&body, "create")?;
            listing::create(session, &body, global, detail).await
        }

        TagsCommand::Assign { id, instructor } => {
            listing::apply_command(
                session,
                &id,
                global,
                |tag: &RfidTag| AssignTag::new(tag, Some(instructor)),
                detail,
            )
            .await
        }

        TagsCommand::Unassign { id } => {
            listing::apply_command(session, &id, global, |tag: &RfidTag| AssignTag::new(tag, None), detail)
                .await
        }

        TagsCommand::SetStatus { id, status } => {
            listing::apply_command(
                session,
                &id,
                global,
                |tag: &RfidTag| SetStatus::<TagStatus>::for_item(tag, status),
                detail,
            )
            .await
        }

        TagsCommand::Delete(ids) => listing::delete::<RfidTag>(session, &ids.ids, global).await,
    }
}
