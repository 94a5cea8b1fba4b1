//! Application core: the event loop and action dispatch across screens.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Tabs},
};
use rollcall_core::poll::{CLOCK_TICK, spawn_interval};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tui_input::{Input, InputRequest};

use crate::action::{Action, Notification, NotificationLevel};
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::session::Session;
use crate::theme;
use crate::tui::Tui;
use crate::widgets::popup;

const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

/// Top-level application state and event loop.
pub struct App {
    active_screen: ScreenId,
    screens: HashMap<ScreenId, Box<dyn Component>>,
    running: bool,
    server: String,
    /// Set once the service rejects our credentials.
    session_expired: Option<String>,
    help_visible: bool,
    /// Search prompt; `Some` while open.
    search: Option<Input>,
    notification: Option<(Notification, Instant)>,
    clock: DateTime<Local>,
    clock_cancel: CancellationToken,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(session: &Session) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let screens: HashMap<ScreenId, Box<dyn Component>> =
            create_screens(session, &action_tx).into_iter().collect();

        Self {
            active_screen: ScreenId::default(),
            screens,
            running: true,
            server: session.server().to_string(),
            session_expired: None,
            help_visible: false,
            search: None,
            notification: None,
            clock: Local::now(),
            clock_cancel: CancellationToken::new(),
            action_tx,
            action_rx,
        }
    }

    fn start_clock(&self) {
        let tx = self.action_tx.clone();
        spawn_interval(CLOCK_TICK, self.clock_cancel.clone(), move || {
            let sent = tx.send(Action::Clock(Local::now()));
            async move {
                if sent.is_ok() {
                    ControlFlow::Continue(())
                } else {
                    ControlFlow::Break(())
                }
            }
        });
    }

    /// Run the main event loop.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;

        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
        self.start_clock();

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.clock_cancel.cancel();
        for screen in self.screens.values_mut() {
            screen.unmount();
        }
        events.stop();
        tui.exit();
        info!("TUI event loop ended");
        Ok(())
    }

    // ── Keys ────────────────────────────────────────────────────────

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        if let Some(ref mut input) = self.search {
            if key.code == KeyCode::Esc {
                input.reset();
                self.action_tx.send(Action::SearchInput(String::new()))?;
                return Ok(Some(Action::CloseSearch));
            }
            return Ok(handle_search_key(input, key));
        }

        if self.help_visible {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?' | 'q') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        let Some(screen) = self.screens.get_mut(&self.active_screen) else {
            return Ok(None);
        };
        // An open dialog owns the keyboard.
        if screen.captures_keys() {
            return screen.handle_key_event(key);
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),
            (KeyModifiers::NONE, KeyCode::Char('/')) => return Ok(Some(Action::OpenSearch)),
            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='5')) => {
                let n = u8::try_from(c).map_or(0, |b| b - b'0');
                if let Some(target) = ScreenId::from_number(n) {
                    return Ok(Some(Action::SwitchScreen(target)));
                }
            }
            (KeyModifiers::NONE, KeyCode::Tab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }
            (KeyModifiers::SHIFT, KeyCode::BackTab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
            }
            _ => {}
        }

        screen.handle_key_event(key)
    }

    // ── Actions ─────────────────────────────────────────────────────

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::Resize(w, h) => debug!(width = w, height = h, "terminal resized"),

            Action::Render => {}

            Action::Tick => {
                if let Some((_, created)) = &self.notification {
                    if created.elapsed() > NOTIFICATION_TTL {
                        self.notification = None;
                    }
                }
                // Background screens still settle their in-flight requests.
                self.broadcast(action)?;
            }

            Action::Clock(now) => {
                self.clock = *now;
                self.broadcast(action)?;
            }

            Action::SwitchScreen(target) => {
                if *target != self.active_screen {
                    debug!("switching screen: {} → {}", self.active_screen, target);
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(false);
                    }
                    self.active_screen = *target;
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(true);
                    }
                }
            }

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::OpenSearch => {
                let current = self
                    .screens
                    .get(&self.active_screen)
                    .map(|s| s.search_text())
                    .unwrap_or_default();
                self.search = Some(Input::new(current));
            }

            Action::CloseSearch => self.search = None,

            Action::SessionExpired(reason) => {
                if self.session_expired.is_none() {
                    warn!(reason = %reason, "session expired");
                    self.notification = Some((
                        Notification::error("Session expired; restart with a fresh token"),
                        Instant::now(),
                    ));
                }
                self.session_expired = Some(reason.clone());
            }

            Action::Notify(n) => self.notification = Some((n.clone(), Instant::now())),

            Action::SearchInput(_) => {
                if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                    if let Some(follow_up) = screen.update(action)? {
                        self.action_tx.send(follow_up)?;
                    }
                }
            }
        }

        Ok(())
    }

    fn broadcast(&mut self, action: &Action) -> Result<()> {
        for screen in self.screens.values_mut() {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    // ── Rendering ───────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let [content_area, tab_area, status_area] = Layout::vertical([
            Constraint::Min(1),    // Screen content
            Constraint::Length(1), // Tab bar
            Constraint::Length(1), // Status bar
        ])
        .areas(area);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, content_area);
        }

        self.render_tab_bar(frame, tab_area);
        self.render_status_bar(frame, status_area);

        if let Some(ref input) = self.search {
            render_search(frame, content_area, input);
        }
        if self.help_visible {
            render_help_overlay(frame, area);
        }
        if let Some((ref notif, _)) = self.notification {
            render_notification(frame, area, notif);
        }
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                Line::from(Span::styled(format!(" {} {} ", id.number(), id.label()), style))
            })
            .collect();

        let tabs = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(
                ScreenId::ALL
                    .iter()
                    .position(|&s| s == self.active_screen)
                    .unwrap_or(0),
            );

        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let indicator = match self.session_expired {
            Some(_) => Span::styled("○ session expired", Style::default().fg(theme::ERROR_RED)),
            None => Span::styled(
                format!("● {}", self.server),
                Style::default().fg(theme::SUCCESS_GREEN),
            ),
        };

        let line = Line::from(vec![
            Span::raw(" "),
            indicator,
            Span::styled(" │ ? help  / search  q quit", theme::key_hint()),
        ]);
        let clock = Paragraph::new(Span::styled(
            self.clock.format("%a %d %b %H:%M:%S ").to_string(),
            theme::key_hint(),
        ))
        .alignment(ratatui::layout::Alignment::Right);

        frame.render_widget(Paragraph::new(line), area);
        frame.render_widget(clock, area);
    }
}

/// Edit the prompt. Every change re-emits the whole text.
fn handle_search_key(input: &mut Input, key: KeyEvent) -> Option<Action> {
    let request = match (key.modifiers, key.code) {
        (_, KeyCode::Enter) => return Some(Action::CloseSearch),
        (KeyModifiers::CONTROL, KeyCode::Char('u')) => InputRequest::DeleteLine,
        (KeyModifiers::CONTROL, KeyCode::Char('w')) => InputRequest::DeletePrevWord,
        (_, KeyCode::Char(c)) => InputRequest::InsertChar(c),
        (_, KeyCode::Backspace) => InputRequest::DeletePrevChar,
        (_, KeyCode::Delete) => InputRequest::DeleteNextChar,
        (_, KeyCode::Left) => InputRequest::GoToPrevChar,
        (_, KeyCode::Right) => InputRequest::GoToNextChar,
        (_, KeyCode::Home) => InputRequest::GoToStart,
        (_, KeyCode::End) => InputRequest::GoToEnd,
        _ => return None,
    };
    match input.handle(request) {
        Some(changed) if changed.value => Some(Action::SearchInput(input.value().to_owned())),
        _ => None,
    }
}

fn render_search(frame: &mut Frame, area: Rect, input: &Input) {
    let width = area.width.saturating_sub(8).min(60);
    let rect = Rect::new(area.x + (area.width.saturating_sub(width)) / 2, area.y + 1, width, 3);
    let inner = popup::frame(frame, rect, "Search", theme::NEON_CYAN);

    let scroll = input.visual_scroll(usize::from(inner.width.saturating_sub(1)));
    let text = Paragraph::new(input.value())
        .style(theme::title_style())
        .scroll((0, u16::try_from(scroll).unwrap_or(0)));
    frame.render_widget(text, inner);

    let cursor = input.visual_cursor().saturating_sub(scroll);
    frame.set_cursor_position((inner.x + u16::try_from(cursor).unwrap_or(0), inner.y));
}

fn render_notification(frame: &mut Frame, area: Rect, notif: &Notification) {
    let msg_len = u16::try_from(notif.message.chars().count()).unwrap_or(u16::MAX);
    let width = msg_len.saturating_add(6).clamp(20, 70);
    let height = 3u16;

    let x = area.width.saturating_sub(width + 1);
    let y = area.height.saturating_sub(height + 2); // above status bar
    let toast_area = Rect::new(area.x + x, area.y + y, width.min(area.width), height.min(area.height));

    let (border_color, icon) = match notif.level {
        NotificationLevel::Success => (theme::SUCCESS_GREEN, "✓"),
        NotificationLevel::Error => (theme::ERROR_RED, "✗"),
        NotificationLevel::Warning => (theme::ELECTRIC_YELLOW, "!"),
        NotificationLevel::Info => (theme::NEON_CYAN, "·"),
    };

    frame.render_widget(Block::default().style(Style::default().bg(theme::BG_DARK)), toast_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(toast_area);
    frame.render_widget(block, toast_area);

    let line = Line::from(vec![
        Span::styled(format!(" {icon} "), Style::default().fg(border_color)),
        Span::styled(notif.message.as_str(), Style::default().fg(theme::DIM_WHITE)),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let help_area = popup::centered(area, 62, 26);
    let inner = popup::frame(frame, help_area, "Keyboard Shortcuts", theme::ELECTRIC_PURPLE);

    let section = |title: &'static str| {
        [
            Line::from(Span::styled(format!("  {title}"), Style::default().fg(theme::NEON_CYAN))),
            Line::from(Span::styled(format!("  {}", "─".repeat(title.chars().count())), theme::key_hint())),
        ]
    };
    let row = |keys: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {keys:<12}"), theme::key_hint_key()),
            Span::styled(what, theme::key_hint()),
        ])
    };

    let mut text = vec![Line::from("")];
    text.extend(section("Global"));
    text.extend([
        row("1-5 Tab", "Switch screen"),
        row("/", "Search (Enter keeps, Esc clears)"),
        row("?", "This help"),
        row("q Ctrl+c", "Quit"),
        Line::from(""),
    ]);
    text.extend(section("Lists"));
    text.extend([
        row("j/k g/G", "Move / top / bottom"),
        row("h/l [ ]", "Previous / next page"),
        row("+ -", "Page size"),
        row("space V", "Select row / whole page"),
        row("Enter", "Expand row"),
        row("s S", "Next sort field / flip order"),
        row("f", "Filter panel (space toggles, c clears)"),
        row("d", "Delete row or selection"),
        row("Ctrl+r", "Reload"),
        row("X", "Reset view"),
        row("Esc", "Clear selection"),
        Line::from(""),
    ]);
    text.extend(section("Collections"));
    text.extend([
        row("t", "Cycle status (instructors, readers, tags)"),
        row("u * a", "Read / star / archive email"),
        row("a", "Assign tag"),
        row("n i R", "Full / incremental backup, restore"),
    ]);

    frame.render_widget(Paragraph::new(text), inner);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn search_prompt_emits_the_whole_text() {
        let mut input = Input::new("ad".into());
        assert_eq!(
            handle_search_key(&mut input, key(KeyCode::Char('a'))),
            Some(Action::SearchInput("ada".into()))
        );
        assert_eq!(
            handle_search_key(&mut input, key(KeyCode::Backspace)),
            Some(Action::SearchInput("ad".into()))
        );
        assert_eq!(handle_search_key(&mut input, key(KeyCode::Left)), None);
        assert_eq!(handle_search_key(&mut input, key(KeyCode::Enter)), Some(Action::CloseSearch));
    }

    #[test]
    fn line_editing_keys() {
        let mut input = Input::new("grace hopper".into());
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(
            handle_search_key(&mut input, ctrl('w')),
            Some(Action::SearchInput("grace ".into()))
        );
        assert_eq!(
            handle_search_key(&mut input, ctrl('u')),
            Some(Action::SearchInput(String::new()))
        );
        assert_eq!(handle_search_key(&mut input, key(KeyCode::Tab)), None);
    }
}
