//! Lumen Core
//!
//! Foundation types shared by every Lumen crate:
//!
//! - **Geometry**: points, sizes, rects, thickness and NaN-aware comparisons
//! - **Transforms**: 2D affine matrices and declarative transform descriptions
//! - **Properties**: observable value cells with ordered change listeners
//! - **Pending values**: deferring writes from foreign threads to the render thread
//! - **Copying**: identity-preserving deep copies of shared object graphs
//!
//! # Example
//!
//! ```rust
//! use lumen_core::Property;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let width = Property::new("Width", f32::NAN);
//! let changes = Arc::new(AtomicUsize::new(0));
//! let counter = changes.clone();
//! width.attach(move |_, _| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! width.set(120.0);
//! width.set(120.0);
//! assert_eq!(changes.load(Ordering::SeqCst), 1);
//! ```

pub mod copy;
pub mod error;
pub mod geometry;
pub mod pending;
pub mod property;
pub mod transform;

pub use copy::{deep_copy, CopyManager, DeepCopy};
pub use error::{CoreError, Result};
pub use geometry::{is_near, same_value, Color, Point, Rect, Size, Thickness, DELTA};
pub use pending::PendingValues;
pub use property::{
    AnyProperty, Listener, ListenerId, Property, PropertyId, PropertyMap, PropertyValue,
};
pub use transform::{Matrix, Transform};
