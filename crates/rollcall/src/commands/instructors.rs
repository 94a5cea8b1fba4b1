//! Instructor command handlers.

use serde_json::json;
use tabled::Tabled;

use rollcall_core::{Instructor, InstructorStatus, SetStatus};
use rollcall_core::model::humanize;

use crate::cli::{GlobalOpts, InstructorsArgs, InstructorsCommand};
use crate::error::CliError;

use super::listing::{self, Session};
use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct InstructorRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Email")]
    email: String,
    #[tabled(rename = "Department")]
    department: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Today")]
    presence: String,
    #[tabled(rename = "Attendance")]
    rate: String,
}

impl From<&Instructor> for InstructorRow {
    fn from(i: &Instructor) -> Self {
        Self {
            id: i.id.to_string(),
            name: i.name.clone(),
            email: i.email.clone(),
            department: i.department.clone().unwrap_or_default(),
            status: humanize(i.status.as_ref()),
            presence: i.presence().into(),
            rate: i
                .attendance_rate
                .map(|r| format!("{r:.1}%"))
                .unwrap_or_default(),
        }
    }
}

fn detail(i: &Instructor) -> String {
    [
        format!("ID:          {}", i.id),
        format!("Name:        {}", i.name),
        format!("Email:       {}", i.email),
        format!("Department:  {}", i.department.as_deref().unwrap_or("-")),
        format!("Status:      {}", humanize(i.status.as_ref())),
        format!("RFID tag:    {}", i.rfid_tag.as_deref().unwrap_or("-")),
        format!("Today:       {}", i.presence()),
        format!(
            "Attendance:  {}",
            i.attendance_rate
                .map_or_else(|| "-".into(), |r| format!("{r:.1}%"))
        ),
        format!(
            "Last scan:   {}",
            i.last_check_in
                .map_or_else(|| "-".into(), |t| t.format("%Y-%m-%d %H:%M").to_string())
        ),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &Session,
    args: InstructorsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        InstructorsCommand::List(list) => {
            listing::list(session, list, global, |i: &Instructor| InstructorRow::from(i)).await
        }

        InstructorsCommand::Get { id } => listing::get(session, &id, global, detail).await,

        InstructorsCommand::Create {
            name,
            email,
            department,
            from_file,
        } => {
            let body = if let Some(ref path) = from_file {
                util::read_json_file(path)?
            } else {
                json!({
                    "name": name,
                    "email": email,
                    "department": department,
                    "status": "active",
                })
            };
            listing::create(session, &body, global, detail).await
        }

        InstructorsCommand::Update { id, body } => {
            let patch = util::read_body(&body, "update")?;
            listing::update(session, &id, &patch, global, detail).await
        }

        InstructorsCommand::SetStatus { id, status } => {
            listing::apply_command(
                session,
                &id,
                global,
                |item: &Instructor| SetStatus::<InstructorStatus>::for_item(item, status),
                detail,
            )
            .await
        }

        InstructorsCommand::Delete(ids) => {
            listing::delete::<Instructor>(session, &ids.ids, global).await
        }
    }
}
