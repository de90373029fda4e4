use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::logger;

/// User-tunable knobs, read from `settings.json` next to the working directory.
///
/// Every field falls back to its default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Case-insensitive pattern matched against visible window titles.
    pub window_title: String,
    /// Directory holding `sun.png`, `seed.png` and `lawn.png`.
    pub template_dir: PathBuf,
    pub border_px: i32,
    pub title_bar_px: i32,

    pub p_click_sun: f64,
    pub p_plant: f64,
    pub collect_all_suns: bool,
    pub sun_threshold: f32,
    pub min_score: f32,

    pub click_pause_ms: u64,
    pub frame_interval_ms: u64,
    pub key_poll_ms: u64,

    pub visualize: bool,
    pub profile: bool,

    pub snapshot_path: PathBuf,
    pub edges_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_title: "Plants vs. Zombies".into(),
            template_dir: PathBuf::from("."),
            border_px: 8,
            title_bar_px: 30,
            p_click_sun: 0.95,
            p_plant: 0.25,
            collect_all_suns: false,
            sun_threshold: 0.8,
            min_score: 0.0,
            click_pause_ms: 100,
            frame_interval_ms: 5,
            key_poll_ms: 5,
            visualize: true,
            profile: false,
            snapshot_path: PathBuf::from("seed.png"),
            edges_path: PathBuf::from("processed_sun.png"),
        }
    }
}

impl Settings {
    /// Read `path`. A missing file gives the defaults; a file that does not
    /// parse also does, with a warning naming the problem.
    pub fn load(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Settings::default();
        };
        Settings::parse(&text).unwrap_or_else(|e| {
            logger::warn(&format!("ignoring {}: {}, using defaults", path.display(), e));
            Settings::default()
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Settings(e.to_string()))
    }

    /// Load `path`, writing the defaults there first if it does not exist yet.
    pub fn load_or_create(path: &Path) -> Self {
        if !path.exists() {
            Settings::default().save(path);
        }
        Settings::load(path)
    }

    pub fn save(&self, path: &Path) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = std::fs::write(path, json);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, p) in [("p_click_sun", self.p_click_sun), ("p_plant", self.p_plant)] {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::Settings(format!("{} must be within [0, 1], got {}", name, p)));
            }
        }
        for (name, t) in [("sun_threshold", self.sun_threshold), ("min_score", self.min_score)] {
            if !(0.0..=1.0).contains(&t) {
                return Err(Error::Settings(format!("{} must be within [0, 1], got {}", name, t)));
            }
        }
        if self.border_px < 0 || self.title_bar_px < 0 {
            return Err(Error::Settings("window insets cannot be negative".into()));
        }
        if self.window_title.trim().is_empty() {
            return Err(Error::Settings("window_title is empty".into()));
        }
        Ok(())
    }
}
