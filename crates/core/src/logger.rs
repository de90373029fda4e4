use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{mpsc, Mutex, OnceLock};
use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: File,
    tui_tx: Option<mpsc::Sender<String>>,
    prefixes: HashMap<String, u8>, // prefix -> color index
}

// Color indices for TUI rendering (mapped in ui.rs)
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;
pub const COLOR_GREEN: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Initialize the global logger, truncating `log_dir/app.log`.
///
/// Until this is called every log function is a no-op, which is what the
/// tests rely on.
pub fn init(log_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_dir.join("app.log"))?;

    LOGGER
        .set(Mutex::new(Logger { file, tui_tx: None, prefixes: HashMap::new() }))
        .ok();
    Ok(())
}

fn with_logger(f: impl FnOnce(&mut Logger)) {
    if let Some(mut l) = LOGGER.get().and_then(|l| l.lock().ok()) {
        f(&mut l);
    }
}

/// Forward every following line to the TUI log panel.
pub fn set_tui_sender(tx: mpsc::Sender<String>) {
    with_logger(|l| l.tui_tx = Some(tx));
}

/// Stop forwarding; the terminal is being restored.
pub fn clear_tui_sender() {
    with_logger(|l| l.tui_tx = None);
}

/// Give `prefix` a color in the TUI. Unregistered prefixes are white.
pub fn register_prefix(prefix: &str, color: u8) {
    with_logger(|l| {
        l.prefixes.insert(prefix.to_string(), color);
    });
}

/// `[HH:MM:SS] [LEVEL] [prefix] msg`, prefix omitted when empty.
fn file_line(ts: &str, level: Level, prefix: &str, msg: &str) -> String {
    if prefix.is_empty() {
        format!("[{}] [{}] {}", ts, level.as_str(), msg)
    } else {
        format!("[{}] [{}] [{}] {}", ts, level.as_str(), prefix, msg)
    }
}

/// Fields joined by \x1f: level, prefix, color, timestamp, message.
fn tui_line(ts: &str, level: Level, prefix: &str, color: u8, msg: &str) -> String {
    format!("{}\x1f{}\x1f{}\x1f{}\x1f{}", level.as_str(), prefix, color, ts, msg)
}

fn write_log(level: Level, prefix: &str, msg: &str) {
    let ts = Local::now().format("%H:%M:%S").to_string();
    with_logger(|l| {
        writeln!(l.file, "{}", file_line(&ts, level, prefix, msg)).ok();
        let color = l.prefixes.get(prefix).copied().unwrap_or(0);
        if let Some(tx) = &l.tui_tx {
            tx.send(tui_line(&ts, level, prefix, color, msg)).ok();
        }
    });
}

pub fn info(msg: &str) {
    write_log(Level::Info, "", msg);
}

pub fn warn(msg: &str) {
    write_log(Level::Warn, "", msg);
}

pub fn error(msg: &str) {
    write_log(Level::Error, "", msg);
}

/// Log under a registered prefix, e.g. `info_p("win32", ...)`.
pub fn info_p(prefix: &str, msg: &str) {
    write_log(Level::Info, prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log(Level::Warn, prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log(Level::Error, prefix, msg);
}
