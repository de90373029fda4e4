use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::capture::{Inset, WindowCapture};
use crate::controller::{Controller, StepReport, Tuning};
use crate::error::{Error, Result};
use crate::input::Dispatcher;
use crate::logger;
use crate::platform::Platform;
use crate::settings::Settings;
use crate::sleep;
use crate::types::*;
use crate::vision::{self, TemplateMatcher};

/// Everything the worker thread owns for one automation session.
pub struct Session {
    pub capture: WindowCapture,
    pub matcher: TemplateMatcher,
    pub controller: Controller,
    pub dispatcher: Dispatcher<StdRng>,
    pub settings: Settings,
}

impl Session {
    /// Resolve the target window and wire up matcher and input.
    /// Fails with `WindowNotFound` before anything else starts.
    pub fn open(platform: &dyn Platform, settings: &Settings, desktop: bool) -> Result<Self> {
        settings.validate()?;
        let capture = if desktop {
            WindowCapture::desktop(platform)?
        } else {
            let inset = Inset { border: settings.border_px, title_bar: settings.title_bar_px };
            WindowCapture::new(platform, &settings.window_title, inset)?
        };
        Ok(Self {
            capture,
            matcher: TemplateMatcher::new(&settings.template_dir),
            controller: Controller::new(Tuning::from(settings)),
            dispatcher: Dispatcher::new(platform.pointer(), StdRng::from_entropy(), settings.click_pause_ms),
            settings: settings.clone(),
        })
    }
}

/// What the command queue asked for since the last frame.
#[derive(Debug, Default, PartialEq, Eq)]
struct Pending {
    save: bool,
    quit: bool,
}

/// Drain pending commands into the controller.
fn process_commands(cmd_rx: &mpsc::Receiver<Command>, controller: &mut Controller) -> Pending {
    let mut pending = Pending::default();
    loop {
        match cmd_rx.try_recv() {
            Ok(Command::Quit) => {
                logger::info("shutting down");
                pending.quit = true;
                return pending;
            }
            Ok(Command::Save) => pending.save = true,
            Ok(cmd) => controller.apply(cmd),
            Err(mpsc::TryRecvError::Empty) => return pending,
            // UI is gone, nobody can stop us any more
            Err(mpsc::TryRecvError::Disconnected) => {
                pending.quit = true;
                return pending;
            }
        }
    }
}

/// Write the frame and its edge map, overwriting whatever was there.
pub fn save_snapshot(frame: &Frame, snapshot_path: &Path, edges_path: &Path) -> Result<()> {
    frame
        .save(snapshot_path)
        .map_err(|source| Error::Snapshot { path: snapshot_path.to_path_buf(), source })?;
    vision::edge_map(frame)
        .save(edges_path)
        .map_err(|source| Error::Snapshot { path: edges_path.to_path_buf(), source })?;
    logger::info_p("snapshot", &format!(
        "saved {} and {}",
        snapshot_path.display(),
        edges_path.display()
    ));
    Ok(())
}

/// Loops-per-second over one-second windows.
struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: f64,
}

impl FpsCounter {
    fn new() -> Self {
        Self { window_start: Instant::now(), frames: 0, fps: 0.0 }
    }

    /// Count a frame; returns the fresh rate when a window closes.
    fn tick(&mut self) -> Option<f64> {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        self.fps = self.frames as f64 / elapsed.as_secs_f64();
        self.frames = 0;
        self.window_start = Instant::now();
        Some(self.fps)
    }
}

fn publish(status: &Mutex<Status>, controller: &Controller, report: StepReport, preview: Option<Frame>, fps: f64) {
    if let Ok(mut s) = status.lock() {
        s.state = controller.state();
        s.frames += 1;
        s.fps = fps;
        s.clicks += report.clicks.len() as u64;
        if !report.detections.is_empty() {
            s.last_detections = report.detections;
        }
        s.preview = preview;
    }
}

fn run(session: &mut Session, status: &Mutex<Status>, cmd_rx: &mpsc::Receiver<Command>) -> Result<()> {
    let mut fps = FpsCounter::new();

    loop {
        let pending = process_commands(cmd_rx, &mut session.controller);
        if pending.quit {
            return Ok(());
        }

        let frame = session.capture.capture()?;
        let report = session.controller.step(
            &frame,
            &session.matcher,
            session.capture.geometry(),
            &mut session.dispatcher,
        )?;

        if pending.save {
            save_snapshot(&frame, &session.settings.snapshot_path, &session.settings.edges_path)?;
        }

        if let Some(rate) = fps.tick() {
            if session.settings.profile {
                logger::info_p("auto", &format!("working at {:.1} loops per second", rate));
            }
        }

        let preview = if session.settings.visualize {
            let mut shown = frame;
            vision::annotate(&mut shown, &report.detections);
            Some(shown)
        } else {
            None
        };
        publish(status, &session.controller, report, preview, fps.fps);

        sleep::sleep_ms(session.settings.frame_interval_ms);
    }
}

/// Main automation loop. Runs on a background thread until `Quit`, a closed
/// command channel, or the first error, which is returned.
pub fn orchestrate(
    mut session: Session,
    status: Arc<Mutex<Status>>,
    cmd_rx: mpsc::Receiver<Command>,
) -> Result<()> {
    logger::register_prefix("snapshot", logger::COLOR_GREEN);
    if let Ok(mut s) = status.lock() {
        s.window_title = session.capture.title().to_string();
    }

    let result = run(&mut session, &status, &cmd_rx);
    if let Err(e) = &result {
        logger::error_p("auto", &format!("automation failed: {}", e));
    }

    if let Ok(mut s) = status.lock() {
        s.state = AutomationState::Idle;
        s.error = result.as_ref().err().map(|e| e.to_string());
        s.finished = true;
    }
    result
}
