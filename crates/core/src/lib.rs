pub mod capture;
pub mod controller;
pub mod error;
pub mod input;
pub mod logger;
pub mod orchestrator;
pub mod platform;
pub mod settings;
pub mod sleep;
pub mod types;
pub mod vision;

pub use error::{Error, Result};

#[cfg(test)]
mod testutil;
