//! Graphics device capability trait
//!
//! The subset of a graphics API the rendering core needs: vertex buffers,
//! 2D textures, render-target switching and clearing, a stretch blit between
//! surfaces and draw submission. Methods take `&self`; implementations
//! synchronise internally so one device can be shared by the render thread
//! and by disposal on other threads.

use lumen_core::{Color, Matrix};
use slotmap::new_key_type;

use crate::error::Result;
use crate::vertex::{PrimitiveType, VertexFormat};

new_key_type! {
    /// Handle to a device vertex buffer
    pub struct BufferHandle;

    /// Handle to a device texture
    pub struct TextureHandle;
}

/// Parameters for texture creation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub width: u32,
    pub height: u32,
    /// Whether the texture can be bound as a render target
    pub render_target: bool,
}

/// Surface that draw calls and blits write to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RenderTarget {
    #[default]
    BackBuffer,
    Texture(TextureHandle),
}

/// A single draw submission
#[derive(Clone, Debug, PartialEq)]
pub struct DrawCall {
    pub buffer: BufferHandle,
    pub format: VertexFormat,
    pub primitive: PrimitiveType,
    pub vertex_count: u32,
    /// Final world transform
    pub transform: Matrix,
    /// Accumulated opacity in [0, 1]
    pub opacity: f32,
    /// Texture sampled by the draw, if any
    pub texture: Option<TextureHandle>,
}

/// Device operations consumed by the rendering core
pub trait GraphicsDevice: Send + Sync {
    /// Allocate a vertex buffer of `size_bytes`
    fn create_vertex_buffer(&self, size_bytes: usize) -> Result<BufferHandle>;

    /// Replace the contents of a vertex buffer
    fn write_vertex_buffer(&self, buffer: BufferHandle, data: &[u8]) -> Result<()>;

    fn destroy_vertex_buffer(&self, buffer: BufferHandle);

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Result<TextureHandle>;

    fn destroy_texture(&self, texture: TextureHandle);

    /// Current back buffer dimensions in pixels
    fn back_buffer_size(&self) -> (u32, u32);

    fn current_render_target(&self) -> RenderTarget;

    fn set_render_target(&self, target: RenderTarget) -> Result<()>;

    /// Fill the current render target with `color`
    fn clear(&self, color: Color) -> Result<()>;

    /// Copy `source` into `destination`, scaling to fit
    fn stretch_blit(&self, source: RenderTarget, destination: RenderTarget) -> Result<()>;

    fn draw(&self, call: &DrawCall) -> Result<()>;
}
