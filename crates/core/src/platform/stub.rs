use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};

use crate::error::{Error, Result};
use crate::types::*;
use crate::logger;
use super::{Platform, Pointer, WindowHandle};

/// Every click the stub pointer received, in order.
pub type ClickLog = Arc<Mutex<Vec<ScreenPoint>>>;

#[derive(Clone)]
struct StubWindowSpec {
    id: WindowId,
    title: String,
    region: Region,
    /// Contents of the whole outer rectangle.
    scene: Arc<RgbImage>,
}

/// In-memory platform: windows are fixed images and clicks are only recorded.
#[derive(Clone, Default)]
pub struct StubPlatform {
    windows: Vec<StubWindowSpec>,
    clicks: ClickLog,
}

impl StubPlatform {
    /// One 800x600 "Plants vs. Zombies" window at (100, 100) showing an empty lawn.
    pub fn new() -> Self {
        let region = Region::from_ltrb(100, 100, 900, 700);
        Self::empty().with_window("Plants vs. Zombies", region, lawn_scene(800, 600))
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_window(mut self, title: &str, region: Region, scene: RgbImage) -> Self {
        let id = 20001 + self.windows.len() as WindowId;
        self.windows.push(StubWindowSpec {
            id,
            title: title.to_string(),
            region,
            scene: Arc::new(scene),
        });
        self
    }

    pub fn clicks(&self) -> ClickLog {
        Arc::clone(&self.clicks)
    }
}

impl Platform for StubPlatform {
    fn list_windows(&self) -> Result<Vec<(WindowId, String)>> {
        Ok(self.windows.iter().map(|w| (w.id, w.title.clone())).collect())
    }

    fn open_window(&self, window_id: WindowId) -> Result<Box<dyn WindowHandle>> {
        logger::info_p("stub", &format!("open_window({})", window_id));
        let spec = self
            .windows
            .iter()
            .find(|w| w.id == window_id)
            .ok_or_else(|| Error::WindowNotFound(format!("#{}", window_id)))?;
        Ok(Box::new(StubWindow { spec: spec.clone() }))
    }

    fn desktop(&self) -> Result<Box<dyn WindowHandle>> {
        let (w, h) = (1920, 1080);
        let mut scene = RgbImage::from_pixel(w as u32, h as u32, Rgb([30, 30, 40]));
        for spec in &self.windows {
            image::imageops::replace(&mut scene, &*spec.scene, spec.region.l as i64, spec.region.t as i64);
        }
        Ok(Box::new(StubWindow {
            spec: StubWindowSpec {
                id: 0,
                title: "Desktop".into(),
                region: Region::from_ltrb(0, 0, w, h),
                scene: Arc::new(scene),
            },
        }))
    }

    fn pointer(&self) -> Box<dyn Pointer> {
        Box::new(StubPointer { clicks: self.clicks() })
    }
}

struct StubWindow {
    spec: StubWindowSpec,
}

impl WindowHandle for StubWindow {
    fn id(&self) -> WindowId { self.spec.id }
    fn title(&self) -> &str { &self.spec.title }
    fn region(&self) -> Result<Region> { Ok(self.spec.region) }

    fn capture(&mut self, rect: CaptureRect) -> Result<Frame> {
        if rect.w <= 0 || rect.h <= 0 {
            return Err(Error::Capture(format!("empty capture rect {:?}", rect)));
        }
        // Anything outside the scene stays black, like an off-screen BitBlt.
        let mut frame = Frame::new(rect.w as u32, rect.h as u32);
        image::imageops::replace(&mut frame, &*self.spec.scene, -(rect.l as i64), -(rect.t as i64));
        Ok(frame)
    }
}

struct StubPointer {
    clicks: ClickLog,
}

impl Pointer for StubPointer {
    fn click(&mut self, at: ScreenPoint) -> Result<()> {
        logger::info_p("stub", &format!("click({}, {})", at.x, at.y));
        self.clicks
            .lock()
            .map_err(|_| Error::Input("click log poisoned".into()))?
            .push(at);
        Ok(())
    }
}

/// Striped green lawn with a dark title strip and border, roughly what the game looks like.
pub(crate) fn lawn_scene(w: u32, h: u32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        if y < 30 || x < 8 || x >= w - 8 || y >= h - 8 {
            Rgb([45, 45, 60])
        } else if (x / 80 + y / 100) % 2 == 0 {
            Rgb([60, 150 + (x % 7) as u8, 40])
        } else {
            Rgb([80, 170 + (y % 5) as u8, 50])
        }
    })
}
