use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, mpsc};
use std::sync::atomic::AtomicBool;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use sunpick_core::{logger, orchestrator, settings::Settings};
use sunpick_core::orchestrator::Session;
use sunpick_core::platform::{create_platform, hotkey};
use sunpick_core::types::{Command, Status};

fn main() -> Result<()> {
    let has_flag = |flag: &str| std::env::args().any(|a| a == flag);
    let force_stub = has_flag("--stub");
    let desktop = has_flag("--desktop");

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    logger::init(&cwd.join("logs")).context("cannot open logs/app.log")?;

    let settings_path = cwd.join("settings.json");
    let settings = Settings::load_or_create(&settings_path);

    let platform = create_platform(force_stub);

    if has_flag("--list-windows") {
        for (id, title) in platform.list_windows()? {
            println!("{:#x}  {}", id, title);
        }
        return Ok(());
    }

    // Missing window or bad settings end the run before the terminal is touched
    let session = Session::open(platform.as_ref(), &settings, desktop)?;

    let status = Arc::new(Mutex::new(Status::default()));
    let (log_tx, log_rx) = mpsc::channel::<String>();
    let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

    logger::set_tui_sender(log_tx);
    logger::info(&format!("sunpick started, settings from {}", settings_path.display()));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = sunpick_tui::App::new(Arc::clone(&status), log_rx, cmd_tx);

    let worker_status = Arc::clone(&status);
    let worker = thread::spawn(move || orchestrator::orchestrate(session, worker_status, cmd_rx));

    let hotkey_flag = Arc::new(AtomicBool::new(false));
    hotkey::start_hotkey_listener(Arc::clone(&hotkey_flag));

    let result = sunpick_tui::event::run(
        &mut terminal,
        &mut app,
        hotkey_flag,
        Duration::from_millis(settings.key_poll_ms),
    );

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    logger::clear_tui_sender();

    // Dropping the app closes the command channel, which stops the worker
    drop(app);
    match worker.join() {
        Ok(worker_result) => worker_result?,
        Err(_) => anyhow::bail!("automation thread panicked"),
    }

    result
}
