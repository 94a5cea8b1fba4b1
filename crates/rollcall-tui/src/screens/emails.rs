//! Emails: the admin mailbox. Refined server-side.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Constraint;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Cell;
use rollcall_core::model::humanize;
use rollcall_core::{Email, Folder, ListItem, MoveToFolder, Priority, ToggleRead, ToggleStarred};

use super::list::{CollectionView, ViewCommand};
use crate::theme;
use crate::widgets::fmt;

pub struct EmailsView;

fn priority_style(priority: Priority) -> Style {
    match priority {
        Priority::Urgent => Style::default().fg(theme::ERROR_RED).add_modifier(Modifier::BOLD),
        Priority::High => Style::default().fg(theme::CORAL),
        Priority::Normal => Style::default().fg(theme::DIM_WHITE),
        Priority::Low => Style::default().fg(theme::BORDER_GRAY),
    }
}

impl CollectionView for EmailsView {
    type Item = Email;

    const TITLE: &'static str = "Emails";
    const COLUMNS: &'static [(&'static str, Constraint)] = &[
        ("", Constraint::Length(2)),
        ("Subject", Constraint::Min(24)),
        ("From", Constraint::Min(18)),
        ("Folder", Constraint::Length(8)),
        ("Priority", Constraint::Length(8)),
        ("Received", Constraint::Length(10)),
    ];
    const HINTS: &'static [(&'static str, &'static str)] = &[("u", "read"), ("*", "star"), ("a", "archive")];

    fn cells(item: &Email, now: DateTime<Utc>) -> Vec<Cell<'static>> {
        let subject_style = if item.read {
            theme::table_row()
        } else {
            theme::table_row().add_modifier(Modifier::BOLD)
        };
        vec![
            Cell::from(if item.starred { "★" } else { " " }).style(Style::default().fg(theme::ELECTRIC_YELLOW)),
            Cell::from(item.subject.clone()).style(subject_style),
            Cell::from(item.sender.clone()),
            Cell::from(humanize(item.folder.as_ref())),
            Cell::from(humanize(item.priority.as_ref())).style(priority_style(item.priority)),
            Cell::from(fmt::ago(Some(item.received_at), now)),
        ]
    }

    fn detail(item: &Email, _now: DateTime<Utc>) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(Span::styled(item.subject.clone(), theme::title_style())),
            Line::from(vec![
                Span::styled("From ", theme::key_hint()),
                Span::raw(item.sender.clone()),
                Span::styled("  To ", theme::key_hint()),
                Span::raw(item.recipients.join(", ")),
            ]),
            Line::from(Span::styled(
                item.received_at.format("%Y-%m-%d %H:%M UTC").to_string(),
                theme::key_hint(),
            )),
            Line::from(""),
        ];
        let body = item.body.as_deref().or(item.preview.as_deref()).unwrap_or("(no content)");
        lines.extend(body.lines().map(|l| Line::from(l.to_owned())));
        lines
    }

    fn on_key(key: KeyEvent, row: Option<&Email>) -> Option<ViewCommand<Email>> {
        let row = row?;
        let cmd: Box<dyn rollcall_core::OptimisticCommand<Email>> = match key.code {
            KeyCode::Char('u') => Box::new(ToggleRead),
            KeyCode::Char('*') => Box::new(ToggleStarred),
            KeyCode::Char('a') if row.folder != Folder::Archive => Box::new(MoveToFolder::new(row, Folder::Archive)),
            _ => return None,
        };
        Some(ViewCommand::Optimistic(row.id(), cmd))
    }
}
