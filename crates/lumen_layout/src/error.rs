//! Layout error types

use lumen_core::CoreError;
use lumen_gpu::GpuError;
use thiserror::Error;

use crate::element::ElementId;

/// Errors raised by tree mutation and rendering
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    /// The element (or the collection's owner) has been disposed
    #[error("Element {0} is disposed")]
    Disposed(ElementId),

    /// The element already belongs to a collection
    #[error("Element {0} already has a parent")]
    AlreadyParented(ElementId),

    /// Collection index outside `0..len`
    #[error("Index {index} out of range for collection of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Device or asset failure while rendering
    #[error("Render failed: {0}")]
    Render(#[from] GpuError),

    /// Property access failure
    #[error("Property error: {0}")]
    Property(#[from] CoreError),
}

/// Result type for layout operations
pub type Result<T> = std::result::Result<T, LayoutError>;
