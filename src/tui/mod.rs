mod app;
mod event_handler;
mod ui;

use anyhow::Result;
use crossterm::{
    event::{
        poll, read, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

use crate::config::Config;

pub use app::{App, AppMode};

/// How long to wait for a key before redrawing; also bounds how late a
/// finished batch shows up
const TICK: Duration = Duration::from_millis(100);

type StudioTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Run the TUI application
pub async fn run(config: &mut Config) -> Result<()> {
    let mut terminal = enter_terminal()?;
    let mut app = App::new(config.clone());

    let result = run_app(&mut terminal, &mut app).await;
    leave_terminal(&mut terminal)?;

    // Settings edits are persisted on exit
    if app.config_changed {
        *config = app.config.clone();
        config.save()?;
    }

    result
}

fn enter_terminal() -> Result<StudioTerminal> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn leave_terminal(terminal: &mut StudioTerminal) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    while !app.should_quit {
        app.poll_completions();
        terminal.draw(|f| ui::draw(f, app))?;

        if !poll(TICK)? {
            continue;
        }
        let Event::Key(key) = read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            break;
        }

        match app.mode {
            AppMode::Main => event_handler::handle_main_input(app, key).await?,
            AppMode::Input(field) => event_handler::handle_input_mode(app, field, key)?,
            AppMode::Settings => event_handler::handle_settings_input(app, key)?,
        }
    }
    Ok(())
}
