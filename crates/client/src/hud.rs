use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};

use ridgeline::MovementMode;

use crate::frontend::{FrameInput, FrameView, Frontend, LinkView};
use crate::input::KeyboardInput;
use crate::net::LinkStatus;

/// Full-screen terminal HUD with keyboard control.
pub struct TerminalFrontend {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    input: KeyboardInput,
}

impl TerminalFrontend {
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

        let enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(
                    KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                        | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
                )
            )?;
        }
        log::debug!("keyboard release events: {}", enhanced);

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            input: KeyboardInput::new(enhanced),
        })
    }
}

impl Drop for TerminalFrontend {
    fn drop(&mut self) {
        if self.input.enhanced() {
            let _ = execute!(self.terminal.backend_mut(), PopKeyboardEnhancementFlags);
        }
        let _ = terminal::disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen, cursor::Show);
    }
}

impl Frontend for TerminalFrontend {
    fn poll_input(&mut self, now: Instant) -> io::Result<FrameInput> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                self.input.handle_event(&key, now);
            }
        }

        Ok(FrameInput {
            movement: self.input.sample(now),
            quit: self.input.quit_requested(),
        })
    }

    fn present(&mut self, view: &FrameView<'_>) -> io::Result<()> {
        self.terminal.draw(|frame| render(frame, view))?;
        Ok(())
    }
}

fn render(frame: &mut Frame, view: &FrameView<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(7),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], view);
    render_player(frame, chunks[1], view);
    render_remotes(frame, chunks[2], view);
    render_help(frame, chunks[3]);
}

fn render_header(frame: &mut Frame, area: Rect, view: &FrameView<'_>) {
    let (link, color) = match view.link.map(|l| l.status) {
        None => ("offline", Color::DarkGray),
        Some(LinkStatus::Waiting) => (LinkStatus::Waiting.as_str(), Color::Yellow),
        Some(LinkStatus::Live) => (LinkStatus::Live.as_str(), Color::Green),
        Some(LinkStatus::Silent) => (LinkStatus::Silent.as_str(), Color::Red),
    };

    let block = Block::default()
        .title(" Ridgeline ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mut spans = vec![
        Span::styled(format!("Frame: {}  |  ", view.frame), Style::default().fg(Color::White)),
        Span::styled(format!("FPS: {:.0}  |  ", view.fps), Style::default().fg(Color::White)),
    ];
    if let Some(LinkView {
        snapshots_received,
        stale_dropped,
        ..
    }) = view.link
    {
        spans.push(Span::styled(
            format!(
                "Snapshots: {} ({:.1}/s, {} stale)  |  ",
                snapshots_received, view.snapshot_rate, stale_dropped
            ),
            Style::default().fg(if stale_dropped > 0 {
                Color::Yellow
            } else {
                Color::White
            }),
        ));
    }
    spans.push(Span::styled(link, Style::default().fg(color).add_modifier(Modifier::BOLD)));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_player(frame: &mut Frame, area: Rect, view: &FrameView<'_>) {
    let block = Block::default()
        .title(" Player ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let s = view.local;
    let mode = match s.mode {
        MovementMode::PlayerLocked => "walking",
        MovementMode::Free => "free flight",
    };
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::Gray));
    let value = |text: String| Span::styled(text, Style::default().fg(Color::White));

    let lines = vec![
        Line::from(vec![
            label("Position: "),
            value(format!("{:.2} {:.2} {:.2}", s.position.x, s.position.y, s.position.z)),
        ]),
        Line::from(vec![
            label("Velocity: "),
            value(format!(
                "{:.2} {:.2} {:.2} ({:.2} m/s horizontal)",
                s.velocity.x,
                s.velocity.y,
                s.velocity.z,
                s.horizontal_speed()
            )),
        ]),
        Line::from(vec![
            label("Heading: "),
            value(format!("{:.0}°  pitch {:.0}°", s.angle_h, s.angle_v)),
        ]),
        Line::from(vec![
            label("Mode: "),
            value(mode.to_string()),
            label("  Grounded: "),
            value(s.grounded.to_string()),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_remotes(frame: &mut Frame, area: Rect, view: &FrameView<'_>) {
    let block = Block::default()
        .title(format!(" Other players ({}) ", view.remotes.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let header = Row::new(vec!["#", "Position", "Heading", "Distance"])
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

    let rows = view.remotes.iter().enumerate().map(|(i, r)| {
        Row::new(vec![
            i.to_string(),
            format!("{:.1} {:.1} {:.1}", r.position.x, r.position.y, r.position.z),
            format!("{:.0}°", r.angle_h),
            format!("{:.1}", r.position.distance(view.local.position)),
        ])
    });

    let widths = [
        Constraint::Length(4),
        Constraint::Min(20),
        Constraint::Length(8),
        Constraint::Length(10),
    ];

    frame.render_widget(Table::new(rows, widths).header(header).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new(
        "WASD move  Shift sprint  Space jump  Tab fly/walk  Arrows look  q quit",
    )
    .block(block)
    .style(
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    );

    frame.render_widget(text, area);
}
