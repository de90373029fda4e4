use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use sunpick_core::platform::hotkey;

use crate::App;
use crate::ui;

/// Drive the UI until the user quits or the worker stops. Keys are polled
/// every `poll`, independent of how long a detection takes.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    hotkey_flag: Arc<AtomicBool>,
    poll: Duration,
) -> anyhow::Result<()> {
    loop {
        if app.should_quit || app.worker_finished() {
            return Ok(());
        }

        app.drain_logs();
        terminal.draw(|f| ui::draw(f, app))?;

        if hotkey::take(&hotkey_flag) {
            app.toggle_automation();
        }

        if !event::poll(poll)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(dialog) = app.confirm.as_mut() {
                    if let Some(accept) = dialog.handle(key.code) {
                        app.resolve_confirm(accept);
                    }
                    continue;
                }
                match key.code {
                    KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_log(),
                    KeyCode::Char(c) => app.key(c.to_ascii_lowercase()),
                    _ => {}
                }
            }
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollUp => app.scroll_log_up(3),
                MouseEventKind::ScrollDown => app.scroll_log_down(3),
                _ => {}
            },
            _ => {}
        }
    }
}
