//! RFID tags and who carries them.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Constraint;
use ratatui::text::{Line, Span};
use ratatui::widgets::Cell;
use rollcall_core::model::humanize;
use rollcall_core::{ActiveDialog, AssignTag, ListItem, OptimisticCommand, RfidTag, SetStatus, TagStatus};

use super::list::{CollectionView, ViewCommand};
use crate::theme;
use crate::widgets::fmt;

pub struct TagsView;

impl CollectionView for TagsView {
    type Item = RfidTag;

    const TITLE: &'static str = "Tags";
    const COLUMNS: &'static [(&'static str, Constraint)] = &[
        ("UID", Constraint::Length(18)),
        ("Type", Constraint::Length(8)),
        ("Status", Constraint::Length(9)),
        ("Assigned to", Constraint::Min(18)),
        ("Last scan", Constraint::Length(10)),
    ];
    const HINTS: &'static [(&'static str, &'static str)] = &[("t", "status"), ("a", "assign")];

    fn cells(item: &RfidTag, now: DateTime<Utc>) -> Vec<Cell<'static>> {
        vec![
            Cell::from(item.uid.clone()),
            Cell::from(humanize(item.tag_type.as_ref())),
            Cell::from(humanize(item.status.as_ref())).style(theme::status_style(item.status.as_ref())),
            Cell::from(item.assigned_to.clone().unwrap_or_else(|| fmt::NONE.into())),
            Cell::from(fmt::ago(item.last_scanned, now)),
        ]
    }

    fn detail(item: &RfidTag, now: DateTime<Utc>) -> Vec<Line<'static>> {
        vec![
            Line::from(Span::styled(item.uid.clone(), theme::title_style())),
            Line::from(format!(
                "{} · {} · last scanned {}",
                humanize(item.tag_type.as_ref()),
                humanize(item.assignment()),
                fmt::ago(item.last_scanned, now)
            )),
        ]
    }

    fn on_key(key: KeyEvent, row: Option<&RfidTag>) -> Option<ViewCommand<RfidTag>> {
        let row = row?;
        match key.code {
            KeyCode::Char('t') => {
                let next = match row.status {
                    TagStatus::Active => TagStatus::Inactive,
                    TagStatus::Inactive => TagStatus::Lost,
                    TagStatus::Lost => TagStatus::Active,
                };
                Some(ViewCommand::Optimistic(
                    row.id(),
                    Box::new(SetStatus::<TagStatus>::for_item(row, next)),
                ))
            }
            KeyCode::Char('a') => Some(ViewCommand::Open(ActiveDialog::Assign {
                id: row.id(),
                draft: row.assigned_to.clone().unwrap_or_default(),
            })),
            _ => None,
        }
    }

    /// An empty draft releases the tag.
    fn assign(item: &RfidTag, draft: &str) -> Option<Box<dyn OptimisticCommand<RfidTag>>> {
        let to = (!draft.is_empty()).then(|| draft.to_owned());
        if to == item.assigned_to {
            return None;
        }
        Some(Box::new(AssignTag::new(item, to)))
    }
}
