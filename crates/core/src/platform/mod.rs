pub mod stub;
pub mod hotkey;

#[cfg(target_os = "windows")]
pub mod win32;

use regex::RegexBuilder;

use crate::error::{Error, Result};
use crate::types::*;
use crate::logger;

/// Handle to a specific OS window, providing capture.
pub trait WindowHandle: Send {
    fn id(&self) -> WindowId;
    fn title(&self) -> &str;
    /// Outer rectangle in screen coordinates, including border and title bar.
    fn region(&self) -> Result<Region>;
    /// Pixels of `rect`, relative to the window's outer top-left corner.
    fn capture(&mut self, rect: CaptureRect) -> Result<Frame>;
}

/// Synthesizes mouse input at absolute screen positions.
pub trait Pointer: Send {
    fn click(&mut self, at: ScreenPoint) -> Result<()>;
}

/// Platform-level operations (window enumeration, factory).
pub trait Platform: Send {
    /// Every visible top-level window with a non-empty title.
    fn list_windows(&self) -> Result<Vec<(WindowId, String)>>;
    fn open_window(&self, window_id: WindowId) -> Result<Box<dyn WindowHandle>>;
    /// The whole desktop as one window.
    fn desktop(&self) -> Result<Box<dyn WindowHandle>>;
    fn pointer(&self) -> Box<dyn Pointer>;
}

/// Visible windows whose title matches `pattern` (case-insensitive regex).
pub fn get_instances(platform: &dyn Platform, pattern: &str) -> Result<Vec<(WindowId, String)>> {
    let re = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| Error::InvalidPattern { pattern: pattern.to_string(), source })?;
    Ok(platform
        .list_windows()?
        .into_iter()
        .filter(|(_, title)| re.is_match(title))
        .collect())
}

/// The window to bind for `title`: a window whose whole title equals it
/// (ignoring case) wins over windows that only match it as a pattern, so a
/// shell or folder named after the game is not picked over the game itself.
pub fn find_window(platform: &dyn Platform, title: &str) -> Result<Option<(WindowId, String)>> {
    let instances = get_instances(platform, title)?;
    let exact = platform
        .list_windows()?
        .into_iter()
        .find(|(_, t)| t.eq_ignore_ascii_case(title));
    if exact.is_none() && instances.len() > 1 {
        logger::warn_p("auto", &format!("{} windows match \"{}\", using the first", instances.len(), title));
    }
    Ok(exact.or_else(|| instances.into_iter().next()))
}

/// Map a pixel coordinate on an axis starting at `origin` and `extent` pixels
/// long to the 0..=65535 range `SendInput` expects for absolute moves.
///
/// Windows maps `dx` back to the pixel `dx * extent / 65536`, rounded down;
/// rounding up here makes that land on `pixel` exactly.
pub fn to_absolute(pixel: i32, origin: i32, extent: i32) -> i32 {
    let extent = extent.max(1) as i64;
    let offset = (pixel - origin) as i64;
    ((offset * 65536 + extent - 1) / extent).clamp(0, 65535) as i32
}

/// Create the platform appropriate for the current OS.
pub fn create_platform(force_stub: bool) -> Box<dyn Platform> {
    logger::register_prefix("auto", logger::COLOR_BLUE);
    if force_stub {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        return Box::new(stub::StubPlatform::new());
    }
    #[cfg(target_os = "windows")]
    {
        logger::register_prefix("win32", logger::COLOR_GRAY);
        return Box::new(win32::Win32Platform);
    }
    #[cfg(not(target_os = "windows"))]
    {
        logger::register_prefix("stub", logger::COLOR_GRAY);
        logger::warn("no capture backend for this OS, using the stub platform");
        return Box::new(stub::StubPlatform::new());
    }
}
