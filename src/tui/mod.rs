mod app;
mod batch;
pub mod command;
mod editing;
pub mod forms;
pub mod help;
mod input;
pub mod message;
mod results;
mod ui;

use crate::backend::Backend;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub use app::{
    App, LastAction, PendingMove, ViewState, BATCH_EDIT_OPTIONS, FIXED_CHROME,
    MIN_CONTENT_HEIGHT, PAGE_JUMP, SPINNER_FRAMES, STATUS_HISTORY,
};
pub use command::Command;
pub use input::dispatch;
pub use message::{Message, Outcome};
pub use ui::draw;

pub async fn run(backend: Arc<dyn Backend>, title: String) -> Result<()> {
    // Check if stdout is a terminal
    if !std::io::IsTerminal::is_terminal(&io::stdout()) {
        anyhow::bail!("hippo requires an interactive terminal");
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let mut app = App::new(title);
    let result = run_app(&mut terminal, &mut app, backend).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Run each command on a worker task; its message comes back through `tx`.
fn spawn_commands(
    commands: Vec<Command>,
    backend: &Arc<dyn Backend>,
    tx: &mpsc::UnboundedSender<Message>,
) {
    for command in commands {
        let backend = Arc::clone(backend);
        let tx = tx.clone();
        tokio::spawn(async move {
            let msg = command.execute(backend).await;
            // The receiver is gone once the loop has exited
            let _ = tx.send(msg);
        });
    }
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    backend: Arc<dyn Backend>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = std::time::Instant::now();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let size = terminal.size()?;
    app.update(Message::Resize {
        width: size.width,
        height: size.height,
    });
    let commands = app.init();
    spawn_commands(commands, &backend, &tx);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());

        if event::poll(timeout)? {
            let msg = match event::read()? {
                Event::Resize(width, height) => Message::Resize { width, height },
                Event::Key(key) if key.kind == KeyEventKind::Press => input::dispatch(app, key),
                _ => Message::None,
            };
            let commands = app.update(msg);
            spawn_commands(commands, &backend, &tx);
        }

        // Apply finished commands (non-blocking)
        while let Ok(msg) = rx.try_recv() {
            let commands = app.update(msg);
            spawn_commands(commands, &backend, &tx);
        }

        if app.should_quit {
            return Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            app.update(Message::Tick);
            last_tick = std::time::Instant::now();
        }
    }
}
