//! Every state transition in the app loop is expressed as an Action.

use chrono::{DateTime, Local};

use crate::screen::ScreenId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A toast in the bottom-right corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn success(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Success,
        }
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Warning,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Error,
        }
    }

    pub fn info(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
            level: NotificationLevel::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Lifecycle ──────────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),
    /// Wall clock for the status bar, once per second.
    Clock(DateTime<Local>),

    // ── Navigation ────────────────────────────────────────────────
    SwitchScreen(ScreenId),

    // ── Search ────────────────────────────────────────────────────
    OpenSearch,
    CloseSearch,
    /// Raw text as typed; screens debounce it.
    SearchInput(String),

    // ── Help ──────────────────────────────────────────────────────
    ToggleHelp,

    // ── Session ───────────────────────────────────────────────────
    /// The service rejected our credentials.
    SessionExpired(String),

    // ── Notifications ─────────────────────────────────────────────
    Notify(Notification),
}
