use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop an automation session.
///
/// None of these are retried: the worker logs the error and exits.
#[derive(Debug, Error)]
pub enum Error {
    #[error("window not found: {0}")]
    WindowNotFound(String),

    #[error("invalid window pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to load template {}: {source}", path.display())]
    TemplateLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("template '{name}' ({template_w}x{template_h}) is larger than the frame ({frame_w}x{frame_h})")]
    TemplateTooLarge {
        name: String,
        template_w: u32,
        template_h: u32,
        frame_w: u32,
        frame_h: u32,
    },

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("input failed: {0}")]
    Input(String),

    #[error("failed to write {}: {source}", path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid settings: {0}")]
    Settings(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
