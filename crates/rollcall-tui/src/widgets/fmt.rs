//! Human-readable size, percentage, and age formatting.

use bytesize::ByteSize;
use chrono::{DateTime, Utc};

/// Placeholder for absent values.
pub const NONE: &str = "─";

/// "1.2 MB", or the placeholder.
pub fn size(bytes: Option<u64>) -> String {
    bytes.map_or_else(|| NONE.into(), |b| ByteSize(b).to_string())
}

/// "93.5%", or the placeholder.
pub fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| NONE.into(), |v| format!("{v:.1}%"))
}

/// Compact age relative to `now`: "42s ago", "5m ago", "3h ago", "2d ago".
pub fn ago(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return NONE.into();
    };
    let secs = now.signed_duration_since(ts).num_seconds().max(0);
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3_600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3_600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}

/// Text progress bar: "[█████░░░░░] 50%".
pub fn progress(pct: u8) -> String {
    let pct = pct.min(100);
    let filled = usize::from(pct / 10);
    format!("[{}{}] {pct}%", "█".repeat(filled), "░".repeat(10 - filled))
}
