//! Application error types

use lumen_layout::LayoutError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A frame was requested before a root element was installed
    #[error("No root element installed")]
    NoRoot,

    /// Rendering a frame failed
    #[error("Frame {frame} failed: {source}")]
    Frame {
        frame: u64,
        #[source]
        source: LayoutError,
    },

    #[error(transparent)]
    Layout(#[from] LayoutError),
}

pub type Result<T> = std::result::Result<T, AppError>;
