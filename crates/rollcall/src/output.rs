//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::{OwoColorize, Style as Paint};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use rollcall_core::FilterDefinition;

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Color a status wire value: healthy green, degraded yellow, failed red.
pub fn paint_status(value: &str, color: bool) -> String {
    if !color {
        return value.to_owned();
    }
    let style = match value {
        "active" | "online" | "completed" | "present" | "assigned" => Paint::new().green(),
        "on_leave" | "maintenance" | "pending" | "in_progress" | "restoring" => {
            Paint::new().yellow()
        }
        "inactive" | "offline" | "failed" | "lost" | "absent" => Paint::new().red(),
        _ => Paint::new(),
    };
    value.style(style).to_string()
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views are
/// key/value blocks rather than tables.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

#[derive(Tabled)]
struct FacetRow {
    #[tabled(rename = "Filter")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Count")]
    count: String,
}

/// Render facet options with counts. Plain emits `key=value<TAB>count`,
/// or bare `key=value` when the count is unknown.
pub fn render_facets(format: OutputFormat, facets: &[FilterDefinition]) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<FacetRow> = facets
                .iter()
                .flat_map(|facet| {
                    facet.options.iter().map(|opt| FacetRow {
                        key: facet.key.clone(),
                        value: opt.value.clone(),
                        label: opt.label.clone(),
                        count: opt.count.map_or_else(|| "-".to_owned(), |n| n.to_string()),
                    })
                })
                .collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(facets, false),
        OutputFormat::JsonCompact => render_json(facets, true),
        OutputFormat::Yaml => render_yaml(facets),
        OutputFormat::Plain => Ok(facets
            .iter()
            .flat_map(|facet| {
                facet
                    .options
                    .iter()
                    .map(|opt| match opt.count {
                        Some(n) => format!("{}={}\t{n}", facet.key, opt.value),
                        None => format!("{}={}", facet.key, opt.value),
                    })
            })
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// "Page 2 of 5 (43 matching)" footer, written to stderr in table mode only.
pub fn print_page_footer(format: OutputFormat, quiet: bool, page: u32, pages: u32, total: usize) {
    if quiet || format != OutputFormat::Table {
        return;
    }
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "Page {page} of {pages} ({total} matching)");
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rollcall_core::FilterOption;

    use super::*;

    fn facets() -> Vec<FilterDefinition> {
        vec![FilterDefinition {
            key: "status".into(),
            title: "Status".into(),
            options: vec![
                FilterOption {
                    value: "active".into(),
                    label: "Active".into(),
                    count: Some(3),
                },
                FilterOption {
                    value: "on_leave".into(),
                    label: "On leave".into(),
                    count: None,
                },
            ],
        }]
    }

    #[test]
    fn plain_facets_are_tab_separated() {
        let out = render_facets(OutputFormat::Plain, &facets()).unwrap();
        assert_eq!(out, "status=active\t3\nstatus=on_leave");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_facets(OutputFormat::JsonCompact, &facets()).unwrap();
        assert!(!out.contains('\n'));
        assert!(out.contains("\"count\":3"));
        assert_eq!(out.matches("\"count\"").count(), 1);
    }

    #[test]
    fn status_is_left_alone_without_color() {
        assert_eq!(paint_status("active", false), "active");
        assert!(paint_status("failed", true).contains("failed"));
    }
}
