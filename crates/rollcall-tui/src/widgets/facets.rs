//! Facet side panel: one group per filter key with per-value counts.

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use rollcall_core::{FilterDefinition, QueryState};

use crate::theme;

/// `(key, value)` for every option, in display order. The panel cursor
/// indexes into this list.
pub fn entries(defs: &[FilterDefinition]) -> Vec<(String, String)> {
    defs.iter()
        .flat_map(|def| {
            def.options
                .iter()
                .map(move |opt| (def.key.clone(), opt.value.clone()))
        })
        .collect()
}

/// Panel lines. `cursor` highlights one entry when the panel has focus.
pub fn lines(defs: &[FilterDefinition], state: &QueryState, cursor: Option<usize>) -> Vec<Line<'static>> {
    let mut out = Vec::new();
    let mut index = 0;
    for def in defs {
        if !out.is_empty() {
            out.push(Line::from(""));
        }
        out.push(Line::from(Span::styled(
            def.title.clone(),
            Style::default().fg(theme::NEON_CYAN).add_modifier(Modifier::BOLD),
        )));
        let selected = state.filter(&def.key);
        for opt in &def.options {
            let checked = selected.is_some_and(|s| s.contains(&opt.value));
            let mark = if checked { "[x]" } else { "[ ]" };
            let style = if cursor == Some(index) {
                theme::table_selected()
            } else if checked {
                Style::default().fg(theme::ELECTRIC_PURPLE)
            } else {
                theme::table_row()
            };
            let mut spans = vec![Span::styled(format!(" {mark} {}", opt.label), style)];
            if let Some(count) = opt.count {
                spans.push(Span::styled(format!(" {count}"), theme::key_hint()));
            }
            out.push(Line::from(spans));
            index += 1;
        }
    }
    if out.is_empty() {
        out.push(Line::from(Span::styled(" no filters", theme::key_hint())));
    }
    out
}
