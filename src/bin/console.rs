//! Vetchat console
//!
//! Terminal client for clinic admins: browse rooms, open a conversation and
//! reply while the room list updates in the background.
//!
//! Usage: `vetchat-console [settings.json]`

use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use vetchat::{
    api::HttpChatApi,
    model::{RoomStatus, Settings},
    tui::{App, Screen, ui::ui},
};

const DEFAULT_SETTINGS_PATH: &str = "vetchat.json";

/// Rows moved by PgUp/PgDn
const PAGE_SCROLL: i64 = 10;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());
    let settings = Settings::load(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path))?;

    vetchat::init_with_log_file(&settings.log_path).context("Failed to open log file")?;
    let api = Arc::new(HttpChatApi::new(&settings).context("Failed to build HTTP client")?);

    let mut app = App::new(settings, api);
    app.start().await;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;
    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        app.process_events();
        app.sync_viewport(terminal.size()?);
        terminal.draw(|f| ui(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key).await;
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

async fn handle_key(app: &mut App, key: KeyEvent) {
    match app.current_screen {
        Screen::RoomList => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => app.room_list.select_next(),
            KeyCode::Up | KeyCode::Char('k') => app.room_list.select_previous(),
            KeyCode::Enter => app.open_selected().await,
            KeyCode::Char('f') => app.room_list.cycle_filter(),
            KeyCode::Char('r') => app.refresh().await,
            KeyCode::Char('a') => app.assign_selected().await,
            KeyCode::Char('c') => app.set_selected_status(RoomStatus::Completed).await,
            KeyCode::Char('x') => app.set_selected_status(RoomStatus::Cancelled).await,
            _ => {}
        },
        Screen::Conversation => {
            let Some(view) = app.conversation.clone() else {
                app.close_conversation();
                return;
            };
            match key.code {
                KeyCode::Esc => app.close_conversation(),
                KeyCode::Enter => app.send_draft(),
                KeyCode::Backspace => view.pop_draft_char(),
                KeyCode::Up => app.scroll_conversation(-1),
                KeyCode::Down => app.scroll_conversation(1),
                KeyCode::PageUp => app.scroll_conversation(-PAGE_SCROLL),
                KeyCode::PageDown => app.scroll_conversation(PAGE_SCROLL),
                KeyCode::End => view.scroll_to_bottom(),
                KeyCode::Char(c) => {
                    app.status_message = None;
                    view.push_draft_char(c);
                }
                _ => {}
            }
        }
    }
}
