//! RFID reader command handlers.

use tabled::Tabled;

use rollcall_core::{ReaderStatus, RfidReader, SetStatus};
use rollcall_core::model::humanize;

use crate::cli::{GlobalOpts, ReadersArgs, ReadersCommand};
use crate::error::CliError;
use crate::output;

use super::listing::{self, Session};
use super::util;

#[derive(Tabled)]
struct ReaderRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Scans")]
    scans: u64,
    #[tabled(rename = "Last seen")]
    last_seen: String,
}

fn row(r: &RfidReader, color: bool) -> ReaderRow {
    ReaderRow {
        id: r.id.to_string(),
        name: r.name.clone(),
        location: r.location.clone(),
        ip: r.ip_address.clone().unwrap_or_default(),
        status: output::paint_status(r.status.as_ref(), color),
        scans: r.scans_today,
        last_seen: r
            .last_seen
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default(),
    }
}

fn detail(r: &RfidReader) -> String {
    [
        format!("ID:         {}", r.id),
        format!("Name:       {}", r.name),
        format!("Location:   {}", r.location),
        format!("IP:         {}", r.ip_address.as_deref().unwrap_or("-")),
        format!("Status:     {}", humanize(r.status.as_ref())),
        format!("Scans:      {} today", r.scans_today),
        format!(
            "Last seen:  {}",
            r.last_seen.map_or_else(|| "never".into(), |t| t.to_rfc3339())
        ),
    ]
    .join("\n")
}

pub async fn handle(session: &Session, args: ReadersArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    match args.command {
        ReadersCommand::List(list) => {
            listing::list(session, list, global, |r: &RfidReader| row(r, color)).await
        }

        ReadersCommand::Get { id } => listing::get(session, &id, global, detail).await,

        ReadersCommand::Create { body } => {
            let body = util::read_body(&body, "create")?;
            listing::create(session, &body, global, detail).await
        }

        ReadersCommand::SetStatus { id, status } => {
            listing::apply_command(
                session,
                &id,
                global,
                |reader: &RfidReader| SetStatus::<ReaderStatus>::for_item(reader, status),
                detail,
            )
            .await
        }

        ReadersCommand::Delete(ids) => {
            listing::delete::<RfidReader>(session, &ids.ids, global).await
        }
    }
}
