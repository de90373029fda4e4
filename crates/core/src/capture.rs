use crate::error::{Error, Result};
use crate::logger;
use crate::platform::{self, Platform, WindowHandle};
use crate::types::*;

/// Pixels trimmed off the outer window rectangle before capturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inset {
    /// Left, right and bottom frame width.
    pub border: i32,
    pub title_bar: i32,
}

impl Default for Inset {
    fn default() -> Self {
        Self { border: 8, title_bar: 30 }
    }
}

impl Inset {
    pub const NONE: Inset = Inset { border: 0, title_bar: 0 };
}

/// Where to grab pixels from and how to map them back to the screen.
/// Computed once; moving the window afterwards is not noticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureGeometry {
    pub width: i32,
    pub height: i32,
    /// Top-left of the captured area relative to the window's outer corner.
    pub crop: (i32, i32),
    /// Screen position of frame pixel (0, 0).
    pub offset: (i32, i32),
}

impl CaptureGeometry {
    pub fn from_window_rect(region: Region, inset: Inset) -> Result<Self> {
        let width = region.w - inset.border * 2;
        let height = region.h - inset.title_bar - inset.border;
        if width <= 0 || height <= 0 {
            return Err(Error::Capture(format!(
                "window {}x{} is too small for a {}px border and {}px title bar",
                region.w, region.h, inset.border, inset.title_bar
            )));
        }
        let crop = (inset.border, inset.title_bar);
        Ok(Self {
            width,
            height,
            crop,
            offset: (region.l + crop.0, region.t + crop.1),
        })
    }

    pub fn to_screen(&self, p: FramePoint) -> ScreenPoint {
        ScreenPoint::new(p.x + self.offset.0, p.y + self.offset.1)
    }

    fn rect(&self) -> CaptureRect {
        CaptureRect { l: self.crop.0, t: self.crop.1, w: self.width, h: self.height }
    }
}

pub struct WindowCapture {
    window: Box<dyn WindowHandle>,
    geometry: CaptureGeometry,
}

impl WindowCapture {
    /// Bind to the visible window titled `title`, or failing that the first
    /// one whose title matches it as a pattern.
    pub fn new(platform: &dyn Platform, title: &str, inset: Inset) -> Result<Self> {
        let (id, found) = platform::find_window(platform, title)?
            .ok_or_else(|| Error::WindowNotFound(title.to_string()))?;
        logger::info(&format!("capturing \"{}\"", found));
        Self::bind(platform.open_window(id)?, inset)
    }

    /// Capture the whole desktop, untrimmed.
    pub fn desktop(platform: &dyn Platform) -> Result<Self> {
        Self::bind(platform.desktop()?, Inset::NONE)
    }

    fn bind(window: Box<dyn WindowHandle>, inset: Inset) -> Result<Self> {
        let geometry = CaptureGeometry::from_window_rect(window.region()?, inset)?;
        Ok(Self { window, geometry })
    }

    pub fn title(&self) -> &str {
        self.window.title()
    }

    pub fn geometry(&self) -> &CaptureGeometry {
        &self.geometry
    }

    pub fn capture(&mut self) -> Result<Frame> {
        self.window.capture(self.geometry.rect())
    }

    pub fn to_screen(&self, p: FramePoint) -> ScreenPoint {
        self.geometry.to_screen(p)
    }
}
