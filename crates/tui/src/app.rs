use std::sync::{Arc, Mutex, mpsc};

use sunpick_core::types::{AutomationState, Command, Status};

use crate::confirm::ConfirmDialog;

/// Older log lines are dropped past this.
const MAX_LOG_LINES: usize = 2000;

pub struct App {
    pub status: Arc<Mutex<Status>>,
    pub log_visible: bool,
    pub log_messages: Vec<String>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<String>,
    pub cmd_tx: mpsc::Sender<Command>,
    pub confirm: Option<ConfirmDialog>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        status: Arc<Mutex<Status>>,
        log_rx: mpsc::Receiver<String>,
        cmd_tx: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            status,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            cmd_tx,
            confirm: None,
            should_quit: false,
        }
    }

    pub fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            self.log_messages.push(msg);
        }
        if self.log_messages.len() > MAX_LOG_LINES {
            let excess = self.log_messages.len() - MAX_LOG_LINES;
            self.log_messages.drain(..excess);
        }
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    fn send(&self, cmd: Command) {
        self.cmd_tx.send(cmd).ok();
    }

    /// Handle one of the `s`/`b`/`e`/`q` keys. Quitting while the bot is
    /// running asks for confirmation first.
    pub fn key(&mut self, key: char) {
        match Command::from_key(key) {
            Some(Command::Quit) if self.state() == AutomationState::Running => {
                self.confirm = Some(ConfirmDialog::new("Automation is running. Quit?"));
            }
            Some(Command::Quit) => self.quit(),
            Some(cmd) => self.send(cmd),
            None => {}
        }
    }

    /// Global hotkey pressed.
    pub fn toggle_automation(&mut self) {
        self.send(Command::Toggle);
    }

    /// Close the dialog, quitting if "Yes" was chosen.
    pub fn resolve_confirm(&mut self, accept: bool) {
        if self.confirm.take().is_some() && accept {
            self.quit();
        }
    }

    pub fn quit(&mut self) {
        self.send(Command::Quit);
        self.should_quit = true;
    }

    pub fn state(&self) -> AutomationState {
        self.status.lock().map(|s| s.state).unwrap_or_default()
    }

    /// The worker has exited (quit or failure); nothing left to show.
    pub fn worker_finished(&self) -> bool {
        self.status.lock().map(|s| s.finished).unwrap_or(true)
    }
}
