//! Headless graphics device
//!
//! Implements [`GraphicsDevice`] without a GPU. Every call is recorded so
//! tests and offscreen runs can inspect what the renderer submitted, and
//! allocation failures can be injected to exercise error paths.

use lumen_core::Color;
use parking_lot::Mutex;
use slotmap::SlotMap;

use crate::device::{
    BufferHandle, DrawCall, GraphicsDevice, RenderTarget, TextureDescriptor, TextureHandle,
};
use crate::error::{GpuError, Result};

/// Running totals of device operations
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceCounters {
    pub buffers_created: usize,
    pub buffers_destroyed: usize,
    pub textures_created: usize,
    pub textures_destroyed: usize,
    pub buffer_writes: usize,
    pub blits: usize,
    pub clears: usize,
    pub target_switches: usize,
    pub draws: usize,
}

struct BufferRecord {
    size: usize,
    data: Vec<u8>,
}

struct HeadlessState {
    back_buffer: (u32, u32),
    buffers: SlotMap<BufferHandle, BufferRecord>,
    textures: SlotMap<TextureHandle, TextureDescriptor>,
    target: RenderTarget,
    draws: Vec<(RenderTarget, DrawCall)>,
    clears: Vec<(RenderTarget, Color)>,
    blits: Vec<(RenderTarget, RenderTarget)>,
    failing_buffers: usize,
    failing_textures: usize,
    counters: DeviceCounters,
}

/// Recording device with no GPU behind it
pub struct HeadlessDevice {
    state: Mutex<HeadlessState>,
}

impl HeadlessDevice {
    /// Create a device with a back buffer of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Mutex::new(HeadlessState {
                back_buffer: (width, height),
                buffers: SlotMap::with_key(),
                textures: SlotMap::with_key(),
                target: RenderTarget::BackBuffer,
                draws: Vec::new(),
                clears: Vec::new(),
                blits: Vec::new(),
                failing_buffers: 0,
                failing_textures: 0,
                counters: DeviceCounters::default(),
            }),
        }
    }

    /// Simulate a swap chain resize
    pub fn resize(&self, width: u32, height: u32) {
        self.state.lock().back_buffer = (width, height);
    }

    /// Make the next `count` vertex buffer allocations fail
    pub fn fail_buffer_allocations(&self, count: usize) {
        self.state.lock().failing_buffers = count;
    }

    /// Make the next `count` texture allocations fail
    pub fn fail_texture_allocations(&self, count: usize) {
        self.state.lock().failing_textures = count;
    }

    pub fn live_buffers(&self) -> usize {
        self.state.lock().buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.lock().textures.len()
    }

    pub fn texture_descriptor(&self, texture: TextureHandle) -> Option<TextureDescriptor> {
        self.state.lock().textures.get(texture).copied()
    }

    /// Bytes last written to a buffer
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(buffer).map(|b| b.data.clone())
    }

    pub fn counters(&self) -> DeviceCounters {
        self.state.lock().counters
    }

    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state.lock().draws.iter().map(|(_, call)| call.clone()).collect()
    }

    /// Draw calls that were submitted while `target` was bound
    pub fn draw_calls_on(&self, target: RenderTarget) -> Vec<DrawCall> {
        self.state
            .lock()
            .draws
            .iter()
            .filter(|(bound, _)| *bound == target)
            .map(|(_, call)| call.clone())
            .collect()
    }

    /// Drain recorded draw calls and clears
    pub fn take_draw_calls(&self) -> Vec<DrawCall> {
        let mut state = self.state.lock();
        state.clears.clear();
        state.draws.drain(..).map(|(_, call)| call).collect()
    }

    pub fn clears(&self) -> Vec<(RenderTarget, Color)> {
        self.state.lock().clears.clone()
    }

    pub fn blits(&self) -> Vec<(RenderTarget, RenderTarget)> {
        self.state.lock().blits.clone()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_vertex_buffer(&self, size_bytes: usize) -> Result<BufferHandle> {
        let mut state = self.state.lock();
        if state.failing_buffers > 0 {
            state.failing_buffers -= 1;
            return Err(GpuError::AllocationFailed {
                resource: "vertex buffer",
                reason: "injected failure".into(),
            });
        }
        state.counters.buffers_created += 1;
        Ok(state.buffers.insert(BufferRecord {
            size: size_bytes,
            data: Vec::new(),
        }))
    }

    fn write_vertex_buffer(&self, buffer: BufferHandle, data: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        let record = state
            .buffers
            .get_mut(buffer)
            .ok_or(GpuError::InvalidHandle("vertex buffer"))?;
        if data.len() > record.size {
            return Err(GpuError::BufferOverflow {
                capacity: record.size,
                actual: data.len(),
            });
        }
        record.data.clear();
        record.data.extend_from_slice(data);
        state.counters.buffer_writes += 1;
        Ok(())
    }

    fn destroy_vertex_buffer(&self, buffer: BufferHandle) {
        let mut state = self.state.lock();
        if state.buffers.remove(buffer).is_some() {
            state.counters.buffers_destroyed += 1;
        } else {
            tracing::warn!("destroy of unknown vertex buffer {:?}", buffer);
        }
    }

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureHandle> {
        let mut state = self.state.lock();
        if state.failing_textures > 0 {
            state.failing_textures -= 1;
            return Err(GpuError::AllocationFailed {
                resource: "texture",
                reason: "injected failure".into(),
            });
        }
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(GpuError::AllocationFailed {
                resource: "texture",
                reason: format!("zero-sized {}x{}", descriptor.width, descriptor.height),
            });
        }
        state.counters.textures_created += 1;
        Ok(state.textures.insert(*descriptor))
    }

    fn destroy_texture(&self, texture: TextureHandle) {
        let mut state = self.state.lock();
        if state.textures.remove(texture).is_some() {
            state.counters.textures_destroyed += 1;
            if state.target == RenderTarget::Texture(texture) {
                state.target = RenderTarget::BackBuffer;
            }
        } else {
            tracing::warn!("destroy of unknown texture {:?}", texture);
        }
    }

    fn back_buffer_size(&self) -> (u32, u32) {
        self.state.lock().back_buffer
    }

    fn current_render_target(&self) -> RenderTarget {
        self.state.lock().target
    }

    fn set_render_target(&self, target: RenderTarget) -> Result<()> {
        let mut state = self.state.lock();
        if let RenderTarget::Texture(texture) = target {
            if !state.textures.contains_key(texture) {
                return Err(GpuError::InvalidHandle("render target"));
            }
        }
        if state.target != target {
            state.counters.target_switches += 1;
        }
        state.target = target;
        Ok(())
    }

    fn clear(&self, color: Color) -> Result<()> {
        let mut state = self.state.lock();
        let target = state.target;
        state.clears.push((target, color));
        state.counters.clears += 1;
        Ok(())
    }

    fn stretch_blit(&self, source: RenderTarget, destination: RenderTarget) -> Result<()> {
        let mut state = self.state.lock();
        for target in [source, destination] {
            if let RenderTarget::Texture(texture) = target {
                if !state.textures.contains_key(texture) {
                    return Err(GpuError::InvalidHandle("blit surface"));
                }
            }
        }
        state.blits.push((source, destination));
        state.counters.blits += 1;
        Ok(())
    }

    fn draw(&self, call: &DrawCall) -> Result<()> {
        let mut state = self.state.lock();
        if !state.buffers.contains_key(call.buffer) {
            return Err(GpuError::InvalidHandle("draw buffer"));
        }
        let target = state.target;
        state.draws.push((target, call.clone()));
        state.counters.draws += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_lifecycle() {
        let device = HeadlessDevice::new(640, 480);
        let buffer = device.create_vertex_buffer(16).unwrap();
        device.write_vertex_buffer(buffer, &[1, 2, 3]).unwrap();
        assert_eq!(device.buffer_contents(buffer), Some(vec![1, 2, 3]));
        assert!(matches!(
            device.write_vertex_buffer(buffer, &[0; 32]),
            Err(GpuError::BufferOverflow { .. })
        ));

        device.destroy_vertex_buffer(buffer);
        assert_eq!(device.live_buffers(), 0);
        assert_eq!(
            device.write_vertex_buffer(buffer, &[1]),
            Err(GpuError::InvalidHandle("vertex buffer"))
        );
        let counters = device.counters();
        assert_eq!(counters.buffers_created, 1);
        assert_eq!(counters.buffers_destroyed, 1);
    }

    #[test]
    fn test_injected_failures_are_consumed() {
        let device = HeadlessDevice::new(640, 480);
        device.fail_buffer_allocations(1);
        assert!(device.create_vertex_buffer(8).is_err());
        assert!(device.create_vertex_buffer(8).is_ok());
    }

    #[test]
    fn test_render_target_switching() {
        let device = HeadlessDevice::new(640, 480);
        let texture = device
            .create_texture(&TextureDescriptor {
                width: 640,
                height: 480,
                render_target: true,
            })
            .unwrap();

        device.set_render_target(RenderTarget::Texture(texture)).unwrap();
        assert_eq!(device.current_render_target(), RenderTarget::Texture(texture));

        device.clear(Color::TRANSPARENT).unwrap();
        assert_eq!(
            device.clears(),
            vec![(RenderTarget::Texture(texture), Color::TRANSPARENT)]
        );
        assert_eq!(device.counters().target_switches, 1);

        device.destroy_texture(texture);
        assert_eq!(device.current_render_target(), RenderTarget::BackBuffer);
        assert!(device.set_render_target(RenderTarget::Texture(texture)).is_err());
    }

    #[test]
    fn test_draws_remember_their_target() {
        let device = HeadlessDevice::new(64, 64);
        let buffer = device.create_vertex_buffer(64).unwrap();
        let texture = device
            .create_texture(&TextureDescriptor {
                width: 64,
                height: 64,
                render_target: true,
            })
            .unwrap();
        let call = DrawCall {
            buffer,
            format: crate::VertexFormat::PositionColored,
            primitive: crate::PrimitiveType::TriangleList,
            vertex_count: 0,
            transform: lumen_core::Matrix::IDENTITY,
            opacity: 1.0,
            texture: None,
        };

        device.draw(&call).unwrap();
        device.set_render_target(RenderTarget::Texture(texture)).unwrap();
        device.draw(&call).unwrap();
        device.draw(&call).unwrap();

        assert_eq!(device.draw_calls_on(RenderTarget::BackBuffer).len(), 1);
        assert_eq!(device.draw_calls_on(RenderTarget::Texture(texture)).len(), 2);
        assert_eq!(device.take_draw_calls().len(), 3);
        assert!(device.draw_calls().is_empty());
    }
}
