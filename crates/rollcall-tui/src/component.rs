//! Component trait, implemented by every screen.

use color_eyre::eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};

use crate::action::Action;

/// Lifecycle: (`set_focused` | `handle_key_event` | `update` | `render`)* → `unmount`
pub trait Component: Send {
    /// Handle a key the app did not consume. May return an Action.
    fn handle_key_event(&mut self, _key: KeyEvent) -> Result<Option<Action>> {
        Ok(None)
    }

    /// Process a dispatched action. May return a follow-up.
    fn update(&mut self, _action: &Action) -> Result<Option<Action>> {
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect);

    fn set_focused(&mut self, _focused: bool) {}

    /// Whether every key, global ones included, goes to this component
    /// (a text prompt is open).
    fn captures_keys(&self) -> bool {
        false
    }

    /// Current search text, used to seed the search prompt.
    fn search_text(&self) -> String {
        String::new()
    }

    /// Stop background work before the app exits.
    fn unmount(&mut self) {}

    fn id(&self) -> &'static str;
}
