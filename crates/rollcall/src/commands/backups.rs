//! Backup command handlers.
//!
//! Create and restore are long-running jobs on the service; `--wait`
//! polls the record until it settles and draws a progress bar meanwhile.

use std::io::IsTerminal;

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use rollcall_core::poll::{PROGRESS_POLL_INTERVAL, wait_for_backup};
use rollcall_core::{
    Backup, BackupStatus, CreateBackupRequest, EntityId, HttpSource, ListingSource,
};
use rollcall_core::model::humanize;

use crate::cli::{BackupsArgs, BackupsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::listing::{self, Session};
use super::util;

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "File")]
    filename: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Created")]
    created: String,
}

fn row(b: &Backup, color: bool) -> BackupRow {
    let status = if b.status.is_terminal() {
        output::paint_status(b.status.as_ref(), color)
    } else {
        format!("{} {}%", output::paint_status(b.status.as_ref(), color), b.progress)
    };
    BackupRow {
        id: b.id.to_string(),
        filename: b.filename.clone(),
        kind: humanize(b.kind.as_ref()),
        status,
        size: b.size_bytes.map(format_size).unwrap_or_default(),
        created: b.created_at.format("%Y-%m-%d %H:%M").to_string(),
    }
}

fn detail(b: &Backup) -> String {
    let mut lines = vec![
        format!("ID:        {}", b.id),
        format!("File:      {}", b.filename),
        format!("Kind:      {}", humanize(b.kind.as_ref())),
        format!("Status:    {}", humanize(b.status.as_ref())),
        format!("Progress:  {}%", b.progress),
        format!(
            "Size:      {}",
            b.size_bytes.map_or_else(|| "-".into(), format_size)
        ),
        format!("Created:   {}", b.created_at.to_rfc3339()),
    ];
    if let Some(ref message) = b.message {
        lines.push(format!("Message:   {message}"));
    }
    lines.join("\n")
}

#[allow(clippy::cast_precision_loss)]
fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub async fn handle(session: &Session, args: BackupsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);
    match args.command {
        BackupsCommand::List(list) => {
            listing::list(session, list, global, |b: &Backup| row(b, color)).await
        }

        BackupsCommand::Get { id } => listing::get(session, &id, global, detail).await,

        BackupsCommand::Create { kind, note, wait } => {
            let source = session.source::<Backup>();
            let body = serde_json::to_value(CreateBackupRequest { kind, note })?;
            let created = source.create(&body).await?;
            if !global.quiet {
                eprintln!("Started {kind} backup {}", created.id);
            }
            let settled = if wait {
                follow(&source, created, global).await?
            } else {
                created
            };
            let out = output::render_single(global.output, &settled, detail, |b| b.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BackupsCommand::Restore { id, wait } => {
            if !util::confirm(
                &format!("Restore from backup {id}? Current data will be replaced."),
                "backups restore",
                global.yes,
            )? {
                return Ok(());
            }
            let source = session.source::<Backup>();
            let started = source
                .action(&EntityId::verbatim(id.as_str()), "restore", &json!({}))
                .await?;
            if !global.quiet {
                eprintln!("Restore from {} started", started.filename);
            }
            let settled = if wait {
                follow(&source, started, global).await?
            } else {
                started
            };
            let out = output::render_single(global.output, &settled, detail, |b| b.id.to_string())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        BackupsCommand::Delete(ids) => listing::delete::<Backup>(session, &ids.ids, global).await,
    }
}

/// Poll a running job until it settles, drawing progress on stderr.
/// Ctrl-C stops waiting without touching the job.
async fn follow(
    source: &HttpSource<Backup>,
    job: Backup,
    global: &GlobalOpts,
) -> Result<Backup, CliError> {
    if job.status.is_terminal() {
        return finished(job);
    }

    let bar = if global.quiet || !std::io::stderr().is_terminal() {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(100)
    };
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg:12} [{bar:30}] {pos:>3}%") {
        bar.set_style(style.progress_chars("=> "));
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = wait_for_backup(source, &job.id, PROGRESS_POLL_INTERVAL, &cancel, |b| {
        bar.set_position(u64::from(b.progress));
        bar.set_message(humanize(b.status.as_ref()));
    })
    .await;
    interrupt.abort();
    bar.finish_and_clear();

    match result? {
        Some(done) => finished(done),
        None => {
            if !global.quiet {
                eprintln!("Stopped waiting; the job keeps running on the service.");
            }
            source.get(&job.id).await.map_err(Into::into)
        }
    }
}

fn finished(job: Backup) -> Result<Backup, CliError> {
    if job.status == BackupStatus::Failed {
        return Err(CliError::ApiError {
            status: None,
            message: job
                .message
                .unwrap_or_else(|| format!("backup {} failed", job.id)),
        });
    }
    Ok(job)
}
