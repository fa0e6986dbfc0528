//! The interactive application: input box, transcript view, status line.
//!
//! One `App` owns the transcript, the stream controller and the terminal
//! loop. Stream events arrive over the controller's channel and are applied
//! to the transcript between redraws.

use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{Event as TermEvent, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use tokio::sync::mpsc;

use rill_client::{SessionEvent, SessionHandle, SessionStatus, StreamController};
use rill_core::{AUTOSCROLL_PROXIMITY, Error, MAX_PROMPT_CHARS, Preferences};

use crate::render::MessageRenderer;
use crate::syntax::SyntaxHighlighter;
use crate::theme::Theme;
use crate::transcript::{MessageId, Notice, Transcript};

/// Whether the app is accepting a new prompt or waiting on a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ready,
    Busy,
}

struct ActiveStream {
    handle: SessionHandle,
    message: MessageId,
}

pub struct App {
    transcript: Transcript,
    controller: StreamController,
    events: mpsc::UnboundedReceiver<SessionEvent>,

    input: String,
    mode: Mode,
    active: Option<ActiveStream>,
    status: Option<String>,

    prefs: Preferences,
    prefs_path: PathBuf,
    theme: Theme,
    highlighter: SyntaxHighlighter,

    scroll: usize,
    follow: bool,
    should_exit: bool,
}

impl App {
    pub fn new(
        controller: StreamController,
        events: mpsc::UnboundedReceiver<SessionEvent>,
        prefs: Preferences,
        prefs_path: PathBuf,
    ) -> Self {
        let theme = Theme::from_preference(prefs.theme);
        let highlighter = SyntaxHighlighter::new(prefs.theme);
        Self {
            transcript: Transcript::new(),
            controller,
            events,
            input: String::new(),
            mode: Mode::Ready,
            active: None,
            status: None,
            prefs,
            prefs_path,
            theme,
            highlighter,
            scroll: 0,
            follow: true,
            should_exit: false,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Submit the current input as a prompt.
    fn submit(&mut self) {
        let prompt = self.input.clone();
        match self.controller.begin(&prompt) {
            Ok(handle) => {
                self.transcript.append_user(prompt);
                let message = self.transcript.append_assistant();
                self.active = Some(ActiveStream { handle, message });
                self.mode = Mode::Busy;
                self.input.clear();
                self.follow = true;
            }
            Err(Error::Busy) => {
                self.status = Some("still generating, press Esc to stop".to_string());
            }
            Err(e) => {
                self.status = Some(e.to_string());
            }
        }
    }

    fn cancel_active(&mut self) {
        if let Some(active) = &self.active {
            self.controller.cancel(&active.handle);
        }
    }

    fn toggle_theme(&mut self) {
        self.prefs.theme = self.prefs.theme.toggled();
        self.theme = Theme::from_preference(self.prefs.theme);
        self.highlighter = SyntaxHighlighter::new(self.prefs.theme);
        if let Err(e) = self.prefs.save_to(&self.prefs_path) {
            tracing::warn!(error = %e, "failed to persist theme preference");
            self.status = Some("could not save theme preference".to_string());
        }
    }

    fn clear_transcript(&mut self) {
        // Late events for a cleared message id fall into the transcript's
        // unknown-id no-op.
        self.transcript.clear();
        self.scroll = 0;
        self.follow = true;
    }

    /// Apply one stream event to the transcript.
    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Opened { .. } => {}
            SessionEvent::Buffer { text, .. } => {
                if let Some(active) = &self.active {
                    self.transcript.update(active.message, text);
                }
            }
            SessionEvent::Closed { status, .. } => {
                if let Some(active) = self.active.take() {
                    match status {
                        SessionStatus::Completed => self.transcript.freeze(active.message),
                        SessionStatus::Cancelled => {
                            let empty = self
                                .transcript
                                .get(active.message)
                                .is_none_or(|e| e.content.is_empty());
                            if empty {
                                self.transcript.set_notice(active.message, Notice::Stopped);
                            } else {
                                self.transcript.freeze(active.message);
                            }
                        }
                        SessionStatus::Failed(message) => {
                            self.transcript.set_notice(active.message, Notice::Error(message));
                        }
                    }
                }
                self.mode = Mode::Ready;
            }
        }
    }

    /// Handle one terminal event.
    pub fn handle_event(&mut self, event: TermEvent) {
        let TermEvent::Key(key) = event else { return };
        if key.kind != KeyEventKind::Press {
            return;
        }

        self.status = None;

        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('c') => self.should_exit = true,
                KeyCode::Char('t') => self.toggle_theme(),
                KeyCode::Char('l') => self.clear_transcript(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Enter => {
                if self.mode == Mode::Ready {
                    self.submit();
                } else {
                    self.status = Some("still generating, press Esc to stop".to_string());
                }
            }
            KeyCode::Esc => self.cancel_active(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Up => {
                self.scroll = self.scroll.saturating_sub(1);
                self.follow = false;
            }
            KeyCode::Down => {
                self.scroll = self.scroll.saturating_add(1);
            }
            KeyCode::PageUp => {
                self.scroll = self.scroll.saturating_sub(10);
                self.follow = false;
            }
            KeyCode::PageDown => {
                self.scroll = self.scroll.saturating_add(10);
            }
            _ => {}
        }
    }

    fn draw(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> std::io::Result<()> {
        let transcript = &self.transcript;
        let theme = self.theme;
        let highlighter = &self.highlighter;

        terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(3),
                    Constraint::Length(3),
                    Constraint::Length(1),
                ])
                .split(frame.area());

            let body_width = chunks[0].width.saturating_sub(2) as usize;
            let renderer = MessageRenderer::new(&theme, highlighter, body_width);
            let mut lines: Vec<Line<'static>> = Vec::new();
            for entry in transcript.entries() {
                lines.extend(renderer.render(entry));
            }

            let viewport = chunks[0].height.saturating_sub(2) as usize;
            let max_scroll = lines.len().saturating_sub(viewport);
            if self.follow {
                self.scroll = max_scroll;
            }
            self.scroll = self.scroll.min(max_scroll);
            // Stick to the bottom again once scrolled back near it.
            self.follow = max_scroll - self.scroll <= AUTOSCROLL_PROXIMITY as usize;

            let body = Paragraph::new(lines)
                .style(theme.base())
                .scroll((self.scroll as u16, 0))
                .block(Block::default().borders(Borders::ALL).border_style(theme.border()));
            frame.render_widget(body, chunks[0]);

            render_input(frame, chunks[1], &theme, &self.input, self.mode);
            render_status(frame, chunks[2], &theme, &self.input, self.mode, self.status.as_deref());
        })?;
        Ok(())
    }

    /// Run the terminal loop to completion.
    pub async fn run(&mut self) -> std::io::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(std::io::stdout());
        let mut terminal = Terminal::new(backend)?;

        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let _ = crossterm::terminal::disable_raw_mode();
            let _ = crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen);
            original_hook(panic_info);
        }));

        terminal.clear()?;
        self.draw(&mut terminal)?;

        while !self.should_exit {
            let input_poll = async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                read_term_event()
            };

            tokio::select! {
                maybe_input = input_poll => {
                    if let Some(event) = maybe_input {
                        self.handle_event(event);
                    }
                    self.draw(&mut terminal)?;
                }
                maybe_session = self.events.recv() => {
                    match maybe_session {
                        Some(event) => {
                            self.handle_session_event(event);
                            self.draw(&mut terminal)?;
                        }
                        None => break,
                    }
                }
            }
        }

        self.cancel_active();

        terminal.show_cursor()?;
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;

        Ok(())
    }
}

fn read_term_event() -> Option<TermEvent> {
    if crossterm::event::poll(Duration::from_millis(0)).unwrap_or(false) {
        crossterm::event::read().ok()
    } else {
        None
    }
}

fn render_input(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    theme: &Theme,
    input: &str,
    mode: Mode,
) {
    let title = match mode {
        Mode::Ready => " prompt ",
        Mode::Busy => " generating… (Esc to stop) ",
    };
    let widget = Paragraph::new(input.to_string())
        .style(theme.panel())
        .block(Block::default().borders(Borders::ALL).border_style(theme.border()).title(title));
    frame.render_widget(widget, area);
}

fn render_status(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    theme: &Theme,
    input: &str,
    mode: Mode,
    status: Option<&str>,
) {
    let count = input.chars().count();
    let counter_style = if count > MAX_PROMPT_CHARS { theme.error() } else { theme.muted() };

    let mut spans = vec![
        Span::styled(format!(" {}/{} ", count, MAX_PROMPT_CHARS), counter_style),
        Span::styled(
            match mode {
                Mode::Ready => "ready",
                Mode::Busy => "busy",
            },
            theme.muted(),
        ),
    ];

    if let Some(message) = status {
        spans.push(Span::styled(format!("  {}", message), theme.error()));
    } else {
        spans.push(Span::styled(
            "  Enter send · Esc stop · ^T theme · ^L clear · ^C quit",
            theme.muted(),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(theme.base()), area);
}
