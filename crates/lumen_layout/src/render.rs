//! Render traversal
//!
//! Rendering walks the tree depth-first. Each visible element derives a
//! [`RenderContext`] from its parent's, draws itself through its kind, then
//! draws its children in ascending `ZIndex` order (stable for ties).
//!
//! ```text
//!   parent ctx ──derive(bounds, layout, render, origin, opacity)──► local ctx
//!                                                                      │
//!        occupied bounds ◄──────── include_transformed_bounds ─────────┘
//! ```
//!
//! A child subtree that fails is logged and skipped; its siblings still draw.
//!
//! # Masked rendering
//!
//! An element with an `OpacityMask`, or whose kind clips its output, draws
//! its subtree into an off-screen texture the size of the back buffer, then
//! composites the drawn area onto the previous target:
//!
//! ```text
//!   target ─► mask texture (cleared) ─► render_override ─► restore target
//!                                                              │
//!      draw quad(occupied ∩ clip, uv = area / back buffer) ◄───┘
//! ```

use std::time::Instant;

use lumen_core::{Color, Matrix, Point, Rect, Size};
use lumen_gpu::{
    quad_textured_region, AssetKey, DrawCall, GpuError, GraphicsDevice, PrimitiveType,
    RenderTarget, ShapeDescriptor, VertexFormat, VisualAsset, VisualAssetCache,
};

use crate::effect::vertex_stamp;
use crate::element::Element;
use crate::error::Result;
use crate::kind::slots;
use crate::properties::Visibility;

/// Depth decrement per nesting level
pub const Z_STEP: f32 = 0.001;

/// Transform, opacity and depth accumulated from the root down
#[derive(Clone, Debug, PartialEq)]
pub struct RenderContext {
    transform: Matrix,
    opacity: f32,
    z_order: f32,
    bounds: Rect,
    occupied: Rect,
}

impl RenderContext {
    /// Context of the screen itself
    pub fn root(size: Size) -> Self {
        Self {
            transform: Matrix::IDENTITY,
            opacity: 1.0,
            z_order: 1.0,
            bounds: size.to_rect(),
            occupied: Rect::ZERO,
        }
    }

    /// Context of a child with the given arranged `bounds`.
    ///
    /// The layout transform (without translation) is applied around the
    /// centre of the bounds, then the render transform around
    /// `bounds.origin + origin * bounds.size`, then the parent transform.
    pub fn derive(
        &self,
        bounds: Rect,
        layout: Option<Matrix>,
        render: Option<Matrix>,
        origin: Point,
        opacity: f32,
    ) -> RenderContext {
        let mut local = Matrix::IDENTITY;
        if let Some(layout) = layout {
            local = local.then(&layout.remove_translation().about(bounds.center()));
        }
        if let Some(render) = render {
            let pivot = Point::new(
                bounds.x() + origin.x * bounds.width(),
                bounds.y() + origin.y * bounds.height(),
            );
            local = local.then(&render.about(pivot));
        }
        RenderContext {
            transform: local.then(&self.transform),
            opacity: self.opacity * opacity,
            z_order: self.z_order - Z_STEP,
            bounds,
            occupied: Rect::ZERO,
        }
    }

    pub fn transform(&self) -> Matrix {
        self.transform
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn z_order(&self) -> f32 {
        self.z_order
    }

    /// Untransformed bounds of the element being drawn
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Screen-space area drawn so far in this context
    pub fn occupied_bounds(&self) -> Rect {
        self.occupied
    }

    /// Record a draw of `rect` given in element space
    pub fn include_local_bounds(&mut self, rect: Rect) {
        let transformed = self.transform.transform_rect(&rect);
        self.occupied = self.occupied.union(&transformed);
    }

    /// Record an area already in screen space
    pub fn include_transformed_bounds(&mut self, rect: Rect) {
        self.occupied = self.occupied.union(&rect);
    }

    /// Limit the occupied area to `area`, given in screen space
    pub fn clip_occupied(&mut self, area: Rect) {
        self.occupied = self.occupied.intersect(&area);
    }
}

/// Counters for one rendered frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub elements_rendered: usize,
    pub elements_skipped: usize,
    pub draw_calls: usize,
    pub captures: usize,
    /// Subtrees composited through an off-screen mask texture
    pub masked: usize,
    pub failed_subtrees: usize,
    pub pending_applied: usize,
    pub assets_swept: usize,
    pub live_assets: usize,
}

/// Device, asset cache and clock for the frame being rendered
pub struct FrameContext<'a> {
    device: &'a dyn GraphicsDevice,
    cache: &'a mut VisualAssetCache,
    now: Instant,
    stats: FrameStats,
}

impl<'a> FrameContext<'a> {
    pub fn new(
        device: &'a dyn GraphicsDevice,
        cache: &'a mut VisualAssetCache,
        now: Instant,
    ) -> Self {
        Self {
            device,
            cache,
            now,
            stats: FrameStats::default(),
        }
    }

    pub fn device(&self) -> &'a dyn GraphicsDevice {
        self.device
    }

    pub fn cache(&mut self) -> &mut VisualAssetCache {
        &mut *self.cache
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    pub fn frame(&self) -> u64 {
        self.cache.frame()
    }

    /// The cached asset for `key`, (re)allocated to match `shape`
    pub fn asset(
        &mut self,
        key: AssetKey,
        shape: ShapeDescriptor,
    ) -> lumen_gpu::Result<&mut VisualAsset> {
        self.cache.get_or_create(self.device, key, shape, self.now)
    }

    pub fn draw(&mut self, call: &DrawCall) -> lumen_gpu::Result<()> {
        self.device.draw(call)?;
        self.stats.draw_calls += 1;
        Ok(())
    }

    pub(crate) fn record_capture(&mut self) {
        self.stats.captures += 1;
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

impl Element {
    /// Draw this subtree. Invisible, disposed and empty elements draw
    /// nothing.
    pub fn render(&self, frame: &mut FrameContext<'_>, parent: &mut RenderContext) -> Result<()> {
        let props = self.props();
        let bounds = props.actual_bounds();
        if props.visibility.get() != Visibility::Visible
            || bounds.size.is_empty()
            || self.is_disposed()
        {
            frame.stats.elements_skipped += 1;
            return Ok(());
        }

        let layout = props.layout_transform.get().map(|t| t.to_matrix());
        let render = props.render_transform.get().map(|t| t.to_matrix());
        let mut local = parent.derive(
            bounds,
            layout,
            render,
            props.render_transform_origin.get(),
            props.opacity.get(),
        );
        {
            let mut state = self.0.render.lock();
            state.transform = local.transform();
            state.inverse_transform = local.transform().invert();
        }
        frame.stats.elements_rendered += 1;

        let mask = props.opacity_mask.get();
        let clip = self.kind().clip_bounds(self);
        if mask.is_some() || clip.is_some() {
            self.render_masked(frame, &mut local, mask.unwrap_or(Color::WHITE), clip)?;
        } else {
            self.kind().render_override(self, frame, &mut local)?;
        }

        self.0.render.lock().occupied_bounds = local.occupied_bounds();
        parent.include_transformed_bounds(local.occupied_bounds());
        Ok(())
    }

    fn render_masked(
        &self,
        frame: &mut FrameContext<'_>,
        local: &mut RenderContext,
        mask: Color,
        clip: Option<Rect>,
    ) -> Result<()> {
        let device = frame.device();
        let (width, height) = device.back_buffer_size();
        if width == 0 || height == 0 {
            return Ok(());
        }
        let owner = self.id().get();
        let target = ShapeDescriptor::texture(width, height);
        let texture = frame
            .asset(AssetKey::new(owner, slots::MASK_TARGET), target)?
            .texture()
            .ok_or(GpuError::InvalidHandle("mask texture"))?;

        let previous = device.current_render_target();
        device.set_render_target(RenderTarget::Texture(texture))?;
        let drawn = match device.clear(Color::TRANSPARENT) {
            Ok(()) => self.kind().render_override(self, frame, local),
            Err(err) => Err(err.into()),
        };
        device.set_render_target(previous)?;
        drawn?;
        frame.stats.masked += 1;

        if let Some(clip) = clip {
            let viewport = local.transform().transform_rect(&clip);
            local.clip_occupied(viewport);
        }
        let surface = Size::new(width as f32, height as f32);
        let area = local.occupied_bounds().intersect(&surface.to_rect());
        local.clip_occupied(area);
        if area.is_empty() {
            return Ok(());
        }

        let uv = Rect::new(
            area.x() / surface.width,
            area.y() / surface.height,
            area.width() / surface.width,
            area.height() / surface.height,
        );
        let vertices = quad_textured_region(&area, mask, &uv);
        let stamp = vertex_stamp(&vertices);
        let shape = ShapeDescriptor::vertices(
            6,
            VertexFormat::PositionColoredTextured,
            PrimitiveType::TriangleList,
        );
        let asset = frame.asset(AssetKey::new(owner, slots::MASK), shape)?;
        if asset.needs_upload(stamp) {
            asset.upload(device, &vertices, stamp)?;
        }
        let buffer = asset
            .buffer()
            .ok_or(GpuError::InvalidHandle("mask vertex buffer"))?;

        // Vertices are already in screen space and the content carries its
        // own opacity
        frame.draw(&DrawCall {
            buffer,
            format: VertexFormat::PositionColoredTextured,
            primitive: PrimitiveType::TriangleList,
            vertex_count: 6,
            transform: Matrix::IDENTITY,
            opacity: 1.0,
            texture: Some(texture),
        })?;
        Ok(())
    }

    /// Draw the children in ascending `ZIndex` order
    pub fn render_children(&self, frame: &mut FrameContext<'_>, ctx: &mut RenderContext) {
        let mut children = self.children().snapshot();
        children.sort_by_key(|child| child.props().z_index.get());
        for child in children {
            child.render_subtree(frame, ctx);
        }
    }

    /// Render, logging a failure instead of returning it
    pub fn render_subtree(&self, frame: &mut FrameContext<'_>, ctx: &mut RenderContext) {
        if let Err(err) = self.render(frame, ctx) {
            frame.stats.failed_subtrees += 1;
            tracing::warn!("skipping {} this frame: {}", self, err);
        }
    }

    /// Screen-space transform used by the last render
    pub fn render_transform_matrix(&self) -> Matrix {
        self.0.render.lock().transform
    }
}
