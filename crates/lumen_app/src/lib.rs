//! Lumen App
//!
//! Application shell around the element tree:
//!
//! - [`config`]: `lumen.toml` loading and conversion into screen/cache tuning
//! - [`logging`]: `tracing` subscriber setup
//! - [`app`]: the headless frame loop and a demo scene

pub mod app;
pub mod config;
pub mod error;
pub mod logging;

pub use app::{App, DemoScene, RunReport, FRAME_INTERVAL};
pub use config::LumenConfig;
pub use error::{AppError, Result};
pub use logging::init_tracing;
