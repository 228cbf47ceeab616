//! Lumen GPU Resources
//!
//! The rendering core never talks to a concrete graphics API. It consumes the
//! [`GraphicsDevice`] capability trait and keeps every per-element GPU resource
//! in a [`VisualAssetCache`] that reclaims idle resources between frames.
//!
//! # Modules
//!
//! - [`device`]: device trait, handles, draw calls and render targets
//! - [`vertex`]: vertex layouts and shape descriptors
//! - [`asset`]: a single cached resource bundle
//! - [`cache`]: the per-screen asset cache with idle eviction
//! - [`headless`]: a recording device for tests and offscreen runs

pub mod asset;
pub mod cache;
pub mod device;
pub mod error;
pub mod headless;
pub mod vertex;

pub use asset::{live_visual_assets, VisualAsset};
pub use cache::{AssetKey, CacheConfig, CacheStats, VisualAssetCache};
pub use device::{
    BufferHandle, DrawCall, GraphicsDevice, RenderTarget, TextureDescriptor, TextureHandle,
};
pub use error::{GpuError, Result};
pub use headless::{DeviceCounters, HeadlessDevice};
pub use vertex::{
    quad_colored, quad_textured, quad_textured_region, ColoredVertex, PrimitiveType,
    ShapeDescriptor, TexturedVertex, VertexFormat,
};
