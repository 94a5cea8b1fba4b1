//! Instructors: roster with presence and attendance rate.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Constraint;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Cell;
use rollcall_core::model::humanize;
use rollcall_core::{Instructor, InstructorStatus, ListItem, SetStatus};

use super::list::{CollectionView, ViewCommand};
use crate::theme;
use crate::widgets::fmt;

pub struct InstructorsView;

/// Next status in the `t` cycle.
fn next_status(status: InstructorStatus) -> InstructorStatus {
    match status {
        InstructorStatus::Active => InstructorStatus::OnLeave,
        InstructorStatus::OnLeave => InstructorStatus::Inactive,
        InstructorStatus::Inactive => InstructorStatus::Active,
    }
}

impl CollectionView for InstructorsView {
    type Item = Instructor;

    const TITLE: &'static str = "Instructors";
    const COLUMNS: &'static [(&'static str, Constraint)] = &[
        ("Name", Constraint::Min(14)),
        ("Email", Constraint::Min(20)),
        ("Department", Constraint::Length(12)),
        ("Status", Constraint::Length(9)),
        ("Today", Constraint::Length(8)),
        ("Rate", Constraint::Length(6)),
        ("Last check-in", Constraint::Length(14)),
    ];
    const HINTS: &'static [(&'static str, &'static str)] = &[("t", "status")];

    fn cells(item: &Instructor, now: DateTime<Utc>) -> Vec<Cell<'static>> {
        let presence = item.presence();
        vec![
            Cell::from(item.name.clone()),
            Cell::from(item.email.clone()),
            Cell::from(item.department.clone().unwrap_or_else(|| fmt::NONE.into())),
            Cell::from(humanize(item.status.as_ref())).style(theme::status_style(item.status.as_ref())),
            Cell::from(humanize(presence)).style(theme::status_style(presence)),
            Cell::from(fmt::percent(item.attendance_rate)),
            Cell::from(fmt::ago(item.last_check_in, now)),
        ]
    }

    fn detail(item: &Instructor, now: DateTime<Utc>) -> Vec<Line<'static>> {
        let field = |name: &str, value: String| {
            Line::from(vec![
                Span::styled(format!("{name:<14}"), theme::key_hint()),
                Span::styled(value, Style::default().fg(theme::DIM_WHITE)),
            ])
        };
        vec![
            field("Name", item.name.clone()),
            field("Email", item.email.clone()),
            field("Department", item.department.clone().unwrap_or_else(|| fmt::NONE.into())),
            field("RFID tag", item.rfid_tag.clone().unwrap_or_else(|| fmt::NONE.into())),
            field("Attendance", fmt::percent(item.attendance_rate)),
            field("Last check-in", fmt::ago(item.last_check_in, now)),
        ]
    }

    fn on_key(key: KeyEvent, row: Option<&Instructor>) -> Option<ViewCommand<Instructor>> {
        let row = row?;
        match key.code {
            KeyCode::Char('t') => Some(ViewCommand::Optimistic(
                row.id(),
                Box::new(SetStatus::<InstructorStatus>::for_item(row, next_status(row.status))),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_cycle_visits_every_status() {
        let mut status = InstructorStatus::Active;
        let mut seen = vec![status];
        for _ in 0..2 {
            status = next_status(status);
            seen.push(status);
        }
        assert_eq!(next_status(status), InstructorStatus::Active);
        assert_eq!(
            seen,
            [InstructorStatus::Active, InstructorStatus::OnLeave, InstructorStatus::Inactive]
        );
    }
}
