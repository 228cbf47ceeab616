//! Visual assets
//!
//! A [`VisualAsset`] bundles the device resources one element (or one region
//! of an element) draws with: a vertex buffer described by a
//! [`ShapeDescriptor`] and an optional render-target texture. Allocation is
//! all-or-nothing. Freeing releases both handles and leaves the bundle empty.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use bytemuck::Pod;

use crate::device::{BufferHandle, GraphicsDevice, TextureDescriptor, TextureHandle};
use crate::error::{GpuError, Result};
use crate::vertex::ShapeDescriptor;

static LIVE_ASSETS: AtomicUsize = AtomicUsize::new(0);

/// Number of allocated visual assets across the process
pub fn live_visual_assets() -> usize {
    LIVE_ASSETS.load(Ordering::Relaxed)
}

/// Cached GPU resource bundle
#[derive(Debug)]
pub struct VisualAsset {
    buffer: Option<BufferHandle>,
    texture: Option<TextureHandle>,
    shape: Option<ShapeDescriptor>,
    last_used: Instant,
    last_used_frame: u64,
    /// Fingerprint of the vertex data last written
    content_stamp: Option<u64>,
}

impl VisualAsset {
    /// Allocate every resource `shape` calls for.
    ///
    /// On failure nothing stays allocated.
    pub fn allocate(
        device: &dyn GraphicsDevice,
        shape: ShapeDescriptor,
        now: Instant,
        frame: u64,
    ) -> Result<Self> {
        let buffer = if shape.vertex_count > 0 {
            Some(device.create_vertex_buffer(shape.buffer_size())?)
        } else {
            None
        };

        let texture = match shape.texture {
            Some((width, height)) => {
                let descriptor = TextureDescriptor {
                    width,
                    height,
                    render_target: true,
                };
                match device.create_texture(&descriptor) {
                    Ok(texture) => Some(texture),
                    Err(err) => {
                        if let Some(buffer) = buffer {
                            device.destroy_vertex_buffer(buffer);
                        }
                        return Err(err);
                    }
                }
            }
            None => None,
        };

        if buffer.is_none() && texture.is_none() {
            return Err(GpuError::AllocationFailed {
                resource: "visual asset",
                reason: "shape requests neither vertices nor a texture".into(),
            });
        }

        LIVE_ASSETS.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "allocated visual asset: {} vertices, texture {:?}",
            shape.vertex_count,
            shape.texture
        );

        Ok(Self {
            buffer,
            texture,
            shape: Some(shape),
            last_used: now,
            last_used_frame: frame,
            content_stamp: None,
        })
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some() || self.texture.is_some()
    }

    /// Whether this asset is allocated with exactly `shape`
    pub fn matches(&self, shape: &ShapeDescriptor) -> bool {
        self.is_allocated() && self.shape.as_ref() == Some(shape)
    }

    pub fn buffer(&self) -> Option<BufferHandle> {
        self.buffer
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn shape(&self) -> Option<&ShapeDescriptor> {
        self.shape.as_ref()
    }

    pub fn last_used(&self) -> Instant {
        self.last_used
    }

    pub fn last_used_frame(&self) -> u64 {
        self.last_used_frame
    }

    /// Device memory held, in bytes
    pub fn byte_size(&self) -> usize {
        match (&self.shape, self.is_allocated()) {
            (Some(shape), true) => shape.buffer_size() + shape.texture_size(),
            _ => 0,
        }
    }

    /// Mark as used at `now` during `frame`
    pub fn touch(&mut self, now: Instant, frame: u64) {
        self.last_used = now;
        self.last_used_frame = frame;
    }

    /// Allocated, idle for at least `threshold`, and not used during `frame`
    pub fn can_be_deleted(&self, now: Instant, frame: u64, threshold: Duration) -> bool {
        self.is_allocated()
            && self.last_used_frame != frame
            && now.saturating_duration_since(self.last_used) >= threshold
    }

    /// True if the buffer does not yet hold data with this fingerprint
    pub fn needs_upload(&self, stamp: u64) -> bool {
        self.content_stamp != Some(stamp)
    }

    /// Write vertex data and remember its fingerprint
    pub fn upload<V: Pod>(
        &mut self,
        device: &dyn GraphicsDevice,
        vertices: &[V],
        stamp: u64,
    ) -> Result<()> {
        let buffer = self.buffer.ok_or(GpuError::InvalidHandle("vertex buffer"))?;
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        let capacity = self.shape.map(|s| s.buffer_size()).unwrap_or(0);
        if bytes.len() > capacity {
            return Err(GpuError::BufferOverflow {
                capacity,
                actual: bytes.len(),
            });
        }
        device.write_vertex_buffer(buffer, bytes)?;
        self.content_stamp = Some(stamp);
        Ok(())
    }

    /// Release all device resources. Returns false if nothing was allocated.
    pub fn free(&mut self, device: &dyn GraphicsDevice) -> bool {
        if !self.is_allocated() {
            return false;
        }
        if let Some(buffer) = self.buffer.take() {
            device.destroy_vertex_buffer(buffer);
        }
        if let Some(texture) = self.texture.take() {
            device.destroy_texture(texture);
        }
        self.shape = None;
        self.content_stamp = None;
        LIVE_ASSETS.fetch_sub(1, Ordering::Relaxed);
        true
    }
}
