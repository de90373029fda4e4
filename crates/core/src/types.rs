use image::RgbImage;

use crate::vision::Detection;

/// Window identifier (HWND on Windows, synthetic id on the stub platform)
pub type WindowId = u64;

/// One captured frame. Owned by a single loop iteration.
pub type Frame = RgbImage;

/// Screen-coordinate bounding box of a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region {
    pub l: i32,
    pub t: i32,
    pub r: i32,
    pub b: i32,
    pub w: i32,
    pub h: i32,
    pub cx: i32,
    pub cy: i32,
}

impl Region {
    pub fn from_ltrb(l: i32, t: i32, r: i32, b: i32) -> Self {
        let (w, h) = (r - l, b - t);
        Self { l, t, r, b, w, h, cx: l + w / 2, cy: t + h / 2 }
    }
}

/// Sub-region for partial capture (relative to window origin)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRect {
    pub l: i32,
    pub t: i32,
    pub w: i32,
    pub h: i32,
}

/// Raw screenshot pixel data (BGRA, top-down rows)
#[derive(Debug)]
pub struct Capture {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

impl Capture {
    /// Drop the alpha channel and reorder to RGB.
    pub fn to_frame(&self) -> Frame {
        Frame::from_fn(self.width, self.height, |x, y| {
            let i = (y * self.bytes_per_row + x * 4) as usize;
            match self.data.get(i..i + 3) {
                Some(&[b, g, r]) => image::Rgb([r, g, b]),
                _ => image::Rgb([0, 0, 0]),
            }
        })
    }
}

/// A position inside a captured frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramePoint {
    pub x: i32,
    pub y: i32,
}

impl FramePoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An absolute position on the display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Whether the controller is allowed to click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AutomationState {
    #[default]
    Idle,
    Running,
}

/// Command from TUI to orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Save,
    Start,
    Stop,
    Toggle,
    Quit,
}

impl Command {
    /// Map a key typed into the visualization to its command.
    pub fn from_key(key: char) -> Option<Self> {
        match key {
            's' => Some(Command::Save),
            'b' => Some(Command::Start),
            'e' => Some(Command::Stop),
            'q' => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Snapshot the worker publishes for the UI after every frame.
#[derive(Debug, Default)]
pub struct Status {
    pub window_title: String,
    pub state: AutomationState,
    pub frames: u64,
    pub fps: f64,
    pub clicks: u64,
    pub last_detections: Vec<Detection>,
    pub preview: Option<Frame>,
    pub error: Option<String>,
    /// Set once the worker has left its loop, for whatever reason.
    pub finished: bool,
}
