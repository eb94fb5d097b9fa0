mod config;
mod events;
mod server;
pub mod tui;

use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

pub use config::ServerConfig;
pub use events::{DisconnectReason, ServerEvent};
pub use server::{ClientInfo, GameServer, ServerStats};

use tui::TuiState;

/// Ticks forever, logging server events.
pub fn run_headless(server: &mut GameServer) {
    log::info!(
        "server listening on {} ({} Hz, {} clients max)",
        server.local_addr(),
        server.config().tick_rate,
        server.config().max_clients
    );

    let running = server.running();
    while running.load(Ordering::SeqCst) {
        server.tick_once();
        for event in server.drain_events() {
            event.log();
        }
    }

    log::info!("server shutting down");
}

pub fn run_with_tui(server: &mut GameServer) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = tui_loop(server, &mut terminal);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    result
}

fn tui_loop(
    server: &mut GameServer,
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> io::Result<()> {
    let running = server.running();
    let mut tui_state = TuiState::new();

    tui_state.log_info(format!("Server started on {}", server.local_addr()));

    while running.load(Ordering::SeqCst) {
        server.tick_once();

        for event in server.drain_events() {
            tui_state.record(&event);
        }

        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                {
                    running.store(false, Ordering::SeqCst);
                }
            }
        }

        let stats = server.stats();
        let clients = server.client_infos();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &stats, &clients);
        })?;
    }

    Ok(())
}
