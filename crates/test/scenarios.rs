//! End-to-end scenarios against the stub platform.
//!
//! Run with `cargo test -p sunpick-test`; filter like any libtest suite.

use std::path::Path;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use image::{Rgb, RgbImage};
use libtest_mimic::{Arguments, Failed, Trial};
use sunpick_core::orchestrator::{self, Session};
use sunpick_core::platform::stub::StubPlatform;
use sunpick_core::platform::{self, Platform};
use sunpick_core::settings::Settings;
use sunpick_core::types::{AutomationState, Command, Region, ScreenPoint, Status};
use sunpick_core::vision::{LAWN, SEED, SUN, TEMPLATE_MARGIN};
use sunpick_core::Error;

const TITLE: &str = "Plants vs. Zombies";
/// Outer window rect; with the default 8/30 inset the frame is 304x240 at (108, 130).
const WINDOW: (i32, i32, i32, i32) = (100, 100, 420, 378);

/// Frame-space top-left and size of each sprite in the scene.
const SUN_AT: (i32, i32, u32, u32) = (50, 50, 20, 20);
const SEED_AT: (i32, i32, u32, u32) = (200, 20, 24, 16);
const LAWN_AT: (i32, i32, u32, u32) = (120, 150, 30, 30);

fn sprite(w: u32, h: u32, tint: u8) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        let ring = (x as i32 - w as i32 / 2).abs() + (y as i32 - h as i32 / 2).abs();
        if ring < w as i32 / 3 {
            Rgb([240, 200u8.wrapping_add(tint), tint])
        } else {
            Rgb([((x * 13 + tint as u32) % 180) as u8 + 30, ((y * 11) % 180) as u8 + 30, 70])
        }
    })
}

fn sprites() -> [(&'static str, (i32, i32, u32, u32), RgbImage); 3] {
    [
        (SUN, SUN_AT, sprite(SUN_AT.2, SUN_AT.3, 0)),
        (SEED, SEED_AT, sprite(SEED_AT.2, SEED_AT.3, 80)),
        (LAWN, LAWN_AT, sprite(LAWN_AT.2, LAWN_AT.3, 160)),
    ]
}

/// Whole outer window: textured background with the three sprites pasted in
/// the client area.
fn scene() -> RgbImage {
    let (l, t, r, b) = WINDOW;
    let mut scene = RgbImage::from_fn((r - l) as u32, (b - t) as u32, |x, y| {
        let v = ((x * 29 + y * 19 + (x * y) % 31) % 140 + 50) as u8;
        Rgb([v, 255 - v, v / 2 + 40])
    });
    for (_, (x, y, _, _), img) in sprites() {
        image::imageops::replace(&mut scene, &img, (x + 8) as i64, (y + 30) as i64);
    }
    scene
}

fn platform() -> StubPlatform {
    let (l, t, r, b) = WINDOW;
    StubPlatform::empty()
        .with_window("Notepad", Region::from_ltrb(0, 0, 200, 200), RgbImage::new(200, 200))
        .with_window(TITLE, Region::from_ltrb(l, t, r, b), scene())
}

fn template_dir() -> Result<tempfile::TempDir, Failed> {
    let dir = tempfile::tempdir()?;
    for (name, _, img) in sprites() {
        img.save(dir.path().join(format!("{}.png", name)))?;
    }
    Ok(dir)
}

fn settings(dir: &Path, p_click_sun: f64, p_plant: f64) -> Settings {
    Settings {
        template_dir: dir.to_path_buf(),
        p_click_sun,
        p_plant,
        click_pause_ms: 0,
        frame_interval_ms: 0,
        snapshot_path: dir.join("frame.png"),
        edges_path: dir.join("edges.png"),
        ..Settings::default()
    }
}

/// Where a click on a sprite lands: center of the margin-padded box, on screen.
fn click_point((x, y, w, h): (i32, i32, u32, u32)) -> ScreenPoint {
    let (w, h) = ((w + TEMPLATE_MARGIN) as i32, (h + TEMPLATE_MARGIN) as i32);
    ScreenPoint::new(WINDOW.0 + 8 + x + w / 2, WINDOW.1 + 30 + y + h / 2)
}

fn run_steps(session: &mut Session, n: usize) -> Result<(), Failed> {
    session.controller.start();
    for _ in 0..n {
        let frame = session.capture.capture()?;
        session.controller.step(
            &frame,
            &session.matcher,
            session.capture.geometry(),
            &mut session.dispatcher,
        )?;
    }
    Ok(())
}

fn ensure(cond: bool, msg: impl Into<String>) -> Result<(), Failed> {
    if cond { Ok(()) } else { Err(msg.into().into()) }
}

fn missing_window_aborts_startup() -> Result<(), Failed> {
    let dir = template_dir()?;
    let s = Settings { window_title: "Minesweeper".into(), ..settings(dir.path(), 1.0, 0.0) };
    match Session::open(&platform(), &s, false) {
        Err(Error::WindowNotFound(t)) => ensure(t == "Minesweeper", format!("reported {:?}", t)),
        Err(e) => Err(format!("unexpected error: {}", e).into()),
        Ok(_) => Err("session opened without a window".into()),
    }
}

fn certain_sun_is_always_clicked() -> Result<(), Failed> {
    let dir = template_dir()?;
    let platform = platform();
    let mut session = Session::open(&platform, &settings(dir.path(), 1.0, 0.0), false)?;
    run_steps(&mut session, 10)?;

    let clicks = platform.clicks().lock().map_err(|_| "poisoned")?.clone();
    ensure(clicks.len() == 10, format!("{} clicks", clicks.len()))?;
    ensure(
        clicks.iter().all(|c| *c == click_point(SUN_AT)),
        format!("clicked {:?}, expected {:?}", clicks[0], click_point(SUN_AT)),
    )
}

fn zero_chance_sun_is_never_clicked() -> Result<(), Failed> {
    let dir = template_dir()?;
    let platform = platform();
    let mut session = Session::open(&platform, &settings(dir.path(), 0.0, 0.0), false)?;
    run_steps(&mut session, 10)?;
    let n = platform.clicks().lock().map_err(|_| "poisoned")?.len();
    ensure(n == 0, format!("{} clicks", n))
}

fn planting_clicks_seed_then_lawn() -> Result<(), Failed> {
    let dir = template_dir()?;
    let platform = platform();
    let mut session = Session::open(&platform, &settings(dir.path(), 0.0, 1.0), false)?;
    run_steps(&mut session, 3)?;

    let clicks = platform.clicks().lock().map_err(|_| "poisoned")?.clone();
    let pair = vec![click_point(SEED_AT), click_point(LAWN_AT)];
    let expected: Vec<_> = pair.iter().cycle().take(6).copied().collect();
    ensure(clicks == expected, format!("clicks {:?}", clicks))
}

fn idle_session_never_clicks() -> Result<(), Failed> {
    let dir = template_dir()?;
    let platform = platform();
    let mut session = Session::open(&platform, &settings(dir.path(), 1.0, 1.0), false)?;
    for _ in 0..3 {
        let frame = session.capture.capture()?;
        let report = session.controller.step(
            &frame,
            &session.matcher,
            session.capture.geometry(),
            &mut session.dispatcher,
        )?;
        ensure(report.detections.is_empty(), "idle step matched templates")?;
    }
    let n = platform.clicks().lock().map_err(|_| "poisoned")?.len();
    ensure(n == 0, format!("{} clicks", n))
}

fn wait_for(status: &Mutex<Status>, what: &str, pred: impl Fn(&Status) -> bool) -> Result<(), Failed> {
    let deadline = Instant::now() + Duration::from_secs(30);
    while Instant::now() < deadline {
        if status.lock().map(|s| pred(&*s)).unwrap_or(false) {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(10));
    }
    Err(format!("timed out waiting for {}", what).into())
}

fn worker_runs_until_quit() -> Result<(), Failed> {
    let dir = template_dir()?;
    let platform = platform();
    let s = settings(dir.path(), 1.0, 0.0);
    let session = Session::open(&platform, &s, false)?;

    let status = Arc::new(Mutex::new(Status::default()));
    let (tx, rx) = mpsc::channel();
    let worker_status = Arc::clone(&status);
    let worker = thread::spawn(move || orchestrator::orchestrate(session, worker_status, rx));

    tx.send(Command::Start)?;
    tx.send(Command::Save)?;
    wait_for(&status, "three frames", |s| s.frames >= 3)?;
    ensure(
        status.lock().map(|s| s.state == AutomationState::Running).unwrap_or(false),
        "worker not running",
    )?;
    tx.send(Command::Quit)?;

    worker.join().map_err(|_| "worker panicked")??;

    let s_now = status.lock().map_err(|_| "poisoned")?;
    ensure(s_now.finished && s_now.error.is_none(), format!("finished {} error {:?}", s_now.finished, s_now.error))?;
    ensure(s_now.state == AutomationState::Idle, "state not reset")?;
    ensure(s_now.window_title == TITLE, format!("title {:?}", s_now.window_title))?;
    ensure(s_now.clicks >= 3, format!("{} clicks", s_now.clicks))?;
    ensure(s_now.preview.is_some(), "no preview published")?;
    ensure(s.snapshot_path.exists() && s.edges_path.exists(), "snapshots not written")?;

    let saved = image::open(&s.snapshot_path)?.to_rgb8();
    ensure(saved.dimensions() == (304, 240), format!("snapshot is {:?}", saved.dimensions()))
}

fn missing_template_is_fatal() -> Result<(), Failed> {
    let dir = template_dir()?;
    let platform = platform();
    let s = settings(dir.path(), 1.0, 0.0);
    std::fs::remove_file(dir.path().join("sun.png"))?;
    let session = Session::open(&platform, &s, false)?;

    let status = Arc::new(Mutex::new(Status::default()));
    let (tx, rx) = mpsc::channel();
    tx.send(Command::Start)?;
    let result = orchestrator::orchestrate(session, Arc::clone(&status), rx);
    drop(tx);

    ensure(matches!(result, Err(Error::TemplateLoad { .. })), format!("got {:?}", result.err()))?;
    let s_now = status.lock().map_err(|_| "poisoned")?;
    ensure(s_now.finished && s_now.error.is_some(), "error not published")
}

fn window_titles_match_case_insensitively() -> Result<(), Failed> {
    let platform = platform();
    let found = platform::get_instances(&platform, "plants VS")?;
    ensure(found.len() == 1 && found[0].1 == TITLE, format!("found {:?}", found))?;
    ensure(platform.list_windows()?.len() == 2, "stub should list two windows")?;
    ensure(
        matches!(platform::get_instances(&platform, "("), Err(Error::InvalidPattern { .. })),
        "bad pattern accepted",
    )
}

fn main() {
    let args = Arguments::from_args();
    let trials = vec![
        Trial::test("missing_window_aborts_startup", missing_window_aborts_startup),
        Trial::test("certain_sun_is_always_clicked", certain_sun_is_always_clicked),
        Trial::test("zero_chance_sun_is_never_clicked", zero_chance_sun_is_never_clicked),
        Trial::test("planting_clicks_seed_then_lawn", planting_clicks_seed_then_lawn),
        Trial::test("idle_session_never_clicks", idle_session_never_clicks),
        Trial::test("worker_runs_until_quit", worker_runs_until_quit),
        Trial::test("missing_template_is_fatal", missing_template_is_fatal),
        Trial::test("window_titles_match_case_insensitively", window_titles_match_case_insensitively),
    ];
    libtest_mimic::run(&args, trials).exit();
}
