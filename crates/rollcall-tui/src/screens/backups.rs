//! Backups. Running jobs are polled until they finish.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Constraint;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Cell;
use rollcall_core::model::humanize;
use rollcall_core::{ActiveDialog, Backup, BackupKind, BackupStatus, CreateBackupRequest, ListItem};

use super::list::{CollectionView, ViewCommand};
use crate::theme;
use crate::widgets::fmt;

pub struct BackupsView;

fn create(kind: BackupKind) -> Option<ViewCommand<Backup>> {
    let body = serde_json::to_value(CreateBackupRequest { kind, note: None }).ok()?;
    Some(ViewCommand::Create {
        body,
        label: format!("{} backup", humanize(kind.as_ref()).to_lowercase()),
    })
}

impl CollectionView for BackupsView {
    type Item = Backup;

    const TITLE: &'static str = "Backups";
    const COLUMNS: &'static [(&'static str, Constraint)] = &[
        ("File", Constraint::Min(24)),
        ("Kind", Constraint::Length(11)),
        ("Status", Constraint::Length(11)),
        ("Progress", Constraint::Length(17)),
        ("Size", Constraint::Length(10)),
        ("Created", Constraint::Length(10)),
    ];
    const HINTS: &'static [(&'static str, &'static str)] =
        &[("n", "full backup"), ("i", "incremental"), ("R", "restore")];

    fn cells(item: &Backup, now: DateTime<Utc>) -> Vec<Cell<'static>> {
        let progress = if item.status.is_terminal() {
            String::new()
        } else {
            fmt::progress(item.progress)
        };
        vec![
            Cell::from(item.filename.clone()),
            Cell::from(humanize(item.kind.as_ref())),
            Cell::from(humanize(item.status.as_ref())).style(theme::status_style(item.status.as_ref())),
            Cell::from(progress).style(Style::default().fg(theme::NEON_CYAN)),
            Cell::from(fmt::size(item.size_bytes)),
            Cell::from(fmt::ago(Some(item.created_at), now)),
        ]
    }

    fn detail(item: &Backup, _now: DateTime<Utc>) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(Span::styled(item.filename.clone(), theme::title_style())),
            Line::from(format!(
                "{} · {} · {}",
                humanize(item.kind.as_ref()),
                humanize(item.status.as_ref()),
                fmt::size(item.size_bytes)
            )),
            Line::from(Span::styled(
                item.created_at.format("created %Y-%m-%d %H:%M UTC").to_string(),
                theme::key_hint(),
            )),
        ];
        if let Some(ref message) = item.message {
            let style = if item.status == BackupStatus::Failed {
                Style::default().fg(theme::ERROR_RED)
            } else {
                theme::table_row()
            };
            lines.push(Line::from(Span::styled(message.clone(), style)));
        }
        lines
    }

    fn on_key(key: KeyEvent, row: Option<&Backup>) -> Option<ViewCommand<Backup>> {
        match key.code {
            KeyCode::Char('n') => create(BackupKind::Full),
            KeyCode::Char('i') => create(BackupKind::Incremental),
            KeyCode::Char('R') => {
                let row = row?;
                (row.status == BackupStatus::Completed).then(|| {
                    ViewCommand::Open(ActiveDialog::Restore {
                        id: row.id(),
                        label: row.label(),
                    })
                })
            }
            _ => None,
        }
    }

    fn is_busy(item: &Backup) -> bool {
        !item.status.is_terminal()
    }
}
