//! Filled shapes

use std::hash::Hasher;

use lumen_core::{Color, Property, PropertyMap, Rect, Size};
use lumen_gpu::{
    quad_colored, AssetKey, DrawCall, GpuError, PrimitiveType, ShapeDescriptor, VertexFormat,
};
use rustc_hash::FxHasher;

use crate::element::Element;
use crate::error::Result;
use crate::kind::{slots, ElementBehavior, Layoutable, Renderable};
use crate::render::{FrameContext, RenderContext};

pub const FILL: &str = "Fill";

/// A rectangle filled with a solid color. Takes its size from Width/Height
/// or from the slot it is stretched into.
pub struct RectangleShape {
    pub fill: Property<Color>,
}

impl RectangleShape {
    pub fn new(fill: Color) -> Self {
        Self {
            fill: Property::new(FILL, fill),
        }
    }

    pub(crate) fn copy_state(&self) -> Self {
        Self::new(self.fill.get())
    }
}

impl Layoutable for RectangleShape {
    fn measure_override(&self, _element: &Element, _available: Size) -> Size {
        Size::ZERO
    }
}

impl Renderable for RectangleShape {
    fn render_override(
        &self,
        element: &Element,
        frame: &mut FrameContext<'_>,
        ctx: &mut RenderContext,
    ) -> Result<()> {
        draw_fill(
            element,
            frame,
            ctx,
            slots::FILL,
            element.props().actual_bounds(),
            self.fill.get(),
        )?;
        element.render_children(frame, ctx);
        Ok(())
    }
}

impl ElementBehavior for RectangleShape {
    fn register(&self, map: &mut PropertyMap) {
        map.register(&self.fill);
    }
}

/// Content stamp of a colored quad
fn fingerprint(rect: &Rect, color: Color) -> u64 {
    let mut hasher = FxHasher::default();
    for value in [
        rect.x(),
        rect.y(),
        rect.width(),
        rect.height(),
        color.r,
        color.g,
        color.b,
        color.a,
    ] {
        hasher.write_u32(value.to_bits());
    }
    hasher.finish()
}

/// Draw `rect` filled with `color` through the cached asset in `slot`.
/// Vertices are only uploaded when the rect or color changed.
pub(crate) fn draw_fill(
    element: &Element,
    frame: &mut FrameContext<'_>,
    ctx: &mut RenderContext,
    slot: u32,
    rect: Rect,
    color: Color,
) -> Result<()> {
    if color.a <= 0.0 {
        return Ok(());
    }
    let device = frame.device();
    let shape = ShapeDescriptor::vertices(
        6,
        VertexFormat::PositionColored,
        PrimitiveType::TriangleList,
    );
    let asset = frame.asset(AssetKey::new(element.id().get(), slot), shape)?;

    let stamp = fingerprint(&rect, color);
    if asset.needs_upload(stamp) {
        asset.upload(device, &quad_colored(&rect, color), stamp)?;
    }
    let buffer = asset
        .buffer()
        .ok_or(GpuError::InvalidHandle("fill vertex buffer"))?;

    frame.draw(&DrawCall {
        buffer,
        format: VertexFormat::PositionColored,
        primitive: PrimitiveType::TriangleList,
        vertex_count: 6,
        transform: ctx.transform(),
        opacity: ctx.opacity(),
        texture: None,
    })?;
    ctx.include_local_bounds(rect);
    Ok(())
}
