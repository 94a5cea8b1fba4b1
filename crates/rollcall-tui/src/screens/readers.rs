//! RFID readers.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Constraint;
use ratatui::text::{Line, Span};
use ratatui::widgets::Cell;
use rollcall_core::model::humanize;
use rollcall_core::{ListItem, ReaderStatus, RfidReader, SetStatus};

use super::list::{CollectionView, ViewCommand};
use crate::theme;
use crate::widgets::fmt;

pub struct ReadersView;

impl CollectionView for ReadersView {
    type Item = RfidReader;

    const TITLE: &'static str = "Readers";
    const COLUMNS: &'static [(&'static str, Constraint)] = &[
        ("Name", Constraint::Min(16)),
        ("Location", Constraint::Min(16)),
        ("IP", Constraint::Length(15)),
        ("Status", Constraint::Length(11)),
        ("Scans", Constraint::Length(6)),
        ("Last seen", Constraint::Length(10)),
    ];
    const HINTS: &'static [(&'static str, &'static str)] = &[("t", "status")];

    fn cells(item: &RfidReader, now: DateTime<Utc>) -> Vec<Cell<'static>> {
        vec![
            Cell::from(item.name.clone()),
            Cell::from(item.location.clone()),
            Cell::from(item.ip_address.clone().unwrap_or_else(|| fmt::NONE.into())),
            Cell::from(humanize(item.status.as_ref())).style(theme::status_style(item.status.as_ref())),
            Cell::from(item.scans_today.to_string()),
            Cell::from(fmt::ago(item.last_seen, now)),
        ]
    }

    fn detail(item: &RfidReader, now: DateTime<Utc>) -> Vec<Line<'static>> {
        vec![
            Line::from(vec![
                Span::styled(item.name.clone(), theme::title_style()),
                Span::styled(format!("  {}", item.location), theme::key_hint()),
            ]),
            Line::from(format!(
                "{} scans today, last seen {}",
                item.scans_today,
                fmt::ago(item.last_seen, now)
            )),
        ]
    }

    fn on_key(key: KeyEvent, row: Option<&RfidReader>) -> Option<ViewCommand<RfidReader>> {
        let row = row?;
        if key.code != KeyCode::Char('t') {
            return None;
        }
        let next = match row.status {
            ReaderStatus::Online => ReaderStatus::Maintenance,
            ReaderStatus::Maintenance => ReaderStatus::Offline,
            ReaderStatus::Offline => ReaderStatus::Online,
        };
        Some(ViewCommand::Optimistic(
            row.id(),
            Box::new(SetStatus::<ReaderStatus>::for_item(row, next)),
        ))
    }
}
