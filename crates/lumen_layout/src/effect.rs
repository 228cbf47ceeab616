//! Effects applied to a captured background

use lumen_core::{Color, Matrix, Rect};
use lumen_gpu::{
    quad_textured, AssetKey, DrawCall, GpuError, PrimitiveType, ShapeDescriptor, TextureHandle,
    VertexFormat,
};

use crate::element::ElementId;
use crate::error::Result;
use crate::kind::slots;
use crate::render::FrameContext;

/// What an effect knows about the element it draws for
#[derive(Clone, Debug, PartialEq)]
pub struct EffectContext {
    pub owner: ElementId,
    /// Element bounds in element space
    pub bounds: Rect,
    pub transform: Matrix,
    pub inverse_transform: Option<Matrix>,
    pub opacity: f32,
    pub z_order: f32,
}

/// Draws using a texture holding the content behind an element
pub trait Effect: Send + Sync {
    fn name(&self) -> &str;

    fn apply(
        &self,
        frame: &mut FrameContext<'_>,
        capture: TextureHandle,
        ctx: &EffectContext,
    ) -> Result<()>;
}

/// Draws the captured background over the element bounds, modulated by a
/// tint color
#[derive(Clone, Debug, PartialEq)]
pub struct TintEffect {
    pub tint: Color,
}

impl TintEffect {
    pub fn new(tint: Color) -> Self {
        Self { tint }
    }
}

impl Effect for TintEffect {
    fn name(&self) -> &str {
        "Tint"
    }

    fn apply(
        &self,
        frame: &mut FrameContext<'_>,
        capture: TextureHandle,
        ctx: &EffectContext,
    ) -> Result<()> {
        let device = frame.device();
        let shape = ShapeDescriptor::vertices(
            6,
            VertexFormat::PositionColoredTextured,
            PrimitiveType::TriangleList,
        );
        let asset = frame.asset(AssetKey::new(ctx.owner.get(), slots::EFFECT), shape)?;

        let vertices = quad_textured(&ctx.bounds, self.tint);
        let stamp = vertex_stamp(&vertices);
        if asset.needs_upload(stamp) {
            asset.upload(device, &vertices, stamp)?;
        }
        let buffer = asset
            .buffer()
            .ok_or(GpuError::InvalidHandle("effect vertex buffer"))?;

        frame.draw(&DrawCall {
            buffer,
            format: VertexFormat::PositionColoredTextured,
            primitive: PrimitiveType::TriangleList,
            vertex_count: 6,
            transform: ctx.transform,
            opacity: ctx.opacity,
            texture: Some(capture),
        })?;
        Ok(())
    }
}

/// Fingerprint of textured vertex data, for skipping redundant uploads
pub(crate) fn vertex_stamp(vertices: &[lumen_gpu::TexturedVertex]) -> u64 {
    use std::hash::Hasher;
    let mut hasher = rustc_hash::FxHasher::default();
    hasher.write(bytemuck::cast_slice(vertices));
    hasher.finish()
}
