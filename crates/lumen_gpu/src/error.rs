//! GPU error types

use thiserror::Error;

/// Errors reported by a graphics device or the asset cache
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// The device could not allocate a resource
    #[error("Failed to allocate {resource}: {reason}")]
    AllocationFailed {
        resource: &'static str,
        reason: String,
    },

    /// A handle does not refer to a live resource
    #[error("Invalid GPU handle: {0}")]
    InvalidHandle(&'static str),

    /// Vertex data larger than the buffer it is written to
    #[error("Vertex data of {actual} bytes exceeds buffer of {capacity} bytes")]
    BufferOverflow { capacity: usize, actual: usize },

    /// The device is no longer usable
    #[error("Device lost: {0}")]
    DeviceLost(String),
}

/// Result type for GPU operations
pub type Result<T> = std::result::Result<T, GpuError>;
