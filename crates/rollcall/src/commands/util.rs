//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::path::Path;

use serde_json::{Map, Value};

use rollcall_core::{SortDirection, SortSpec};

use crate::cli::BodyArgs;
use crate::error::CliError;

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
///
/// Without a terminal there is nobody to ask, so `action` must be
/// confirmed with `--yes`.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)
}

/// Read and parse a JSON file for `--from-file` flags.
pub fn read_json_file(path: &Path) -> Result<Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: "from-file".into(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// JSON body from `--from-file` or `--set` pairs; one of them is required.
pub fn read_body(body: &BodyArgs, action: &str) -> Result<Value, CliError> {
    match body.from_file {
        Some(ref path) => read_json_file(path),
        None if body.set.is_empty() => Err(CliError::Validation {
            field: action.into(),
            reason: "nothing to send; pass --set KEY=VALUE or --from-file".into(),
        }),
        None => parse_set_pairs(&body.set),
    }
}

/// Build a JSON object from `key=value` pairs. Values that parse as JSON
/// (`true`, `42`, `null`, `"quoted"`) keep their type; anything else is a string.
pub fn parse_set_pairs(pairs: &[String]) -> Result<Value, CliError> {
    let mut body = Map::new();
    for pair in pairs {
        let (key, raw) = split_pair(pair, "set")?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_owned()));
        body.insert(key.to_owned(), value);
    }
    Ok(Value::Object(body))
}

/// `status=active,on_leave` into the key and its selected values.
pub fn parse_filter(raw: &str) -> Result<(String, Vec<String>), CliError> {
    let (key, values) = split_pair(raw, "filter")?;
    Ok((key.to_owned(), split_values(values)))
}

/// Split on commas; `\,` keeps a literal comma inside a value.
fn split_values(raw: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(',') => current.push(','),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            ',' => values.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    values.push(current);
    values
        .iter()
        .map(String::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `name`, `name:asc` or `name:desc`, checked against the sortable fields.
pub fn parse_sort(raw: &str, allowed: &[&str]) -> Result<SortSpec, CliError> {
    let (field, order) = match raw.split_once(':') {
        Some((field, "asc")) => (field, SortDirection::Asc),
        Some((field, "desc")) => (field, SortDirection::Desc),
        Some((_, other)) => {
            return Err(CliError::Validation {
                field: "sort".into(),
                reason: format!("direction must be 'asc' or 'desc', got '{other}'"),
            });
        }
        None => (raw, SortDirection::Asc),
    };
    if !allowed.contains(&field) {
        return Err(CliError::Validation {
            field: "sort".into(),
            reason: format!("'{field}' is not sortable; choose one of: {}", allowed.join(", ")),
        });
    }
    Ok(SortSpec::new(field, order))
}

fn split_pair<'a>(raw: &'a str, flag: &str) -> Result<(&'a str, &'a str), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(CliError::Validation {
            field: flag.into(),
            reason: format!("expected KEY=VALUE, got '{raw}'"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn set_pairs_keep_json_types() {
        let body = parse_set_pairs(&[
            "department=Math".into(),
            "presentToday=true".into(),
            "attendanceRate=97.5".into(),
        ])
        .unwrap();
        assert_eq!(
            body,
            json!({ "department": "Math", "presentToday": true, "attendanceRate": 97.5 })
        );
    }

    #[test]
    fn filter_values_split_on_commas() {
        let (key, values) = parse_filter("department=Math, Science,").unwrap();
        assert_eq!(key, "department");
        assert_eq!(values, vec!["Math", "Science"]);
        assert!(parse_filter("department").is_err());
    }

    #[test]
    fn escaped_commas_stay_inside_a_value() {
        let (_, values) = parse_filter(r"department=Arts\, Music,Math").unwrap();
        assert_eq!(values, vec!["Arts, Music", "Math"]);
    }

    #[test]
    fn sort_rejects_unknown_fields_and_directions() {
        let spec = parse_sort("name:desc", &["name"]).unwrap();
        assert_eq!(spec, SortSpec::desc("name"));
        assert!(parse_sort("salary", &["name"]).is_err());
        assert!(parse_sort("name:sideways", &["name"]).is_err());
    }
}
