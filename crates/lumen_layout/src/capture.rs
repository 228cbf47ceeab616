//! Background capture
//!
//! Before drawing its children, a capture element copies whatever has been
//! rendered so far into a texture the size of the back buffer, then lets its
//! effect draw with that texture.
//!
//! ```text
//!   current target ──stretch_blit──► capture texture (cached, per element)
//!                                         │
//!                                  effect.apply(texture)
//!                                         │
//!                                  children rendered on top
//! ```
//!
//! The texture is reallocated only when the back buffer size changes.

use std::sync::Arc;

use lumen_core::Matrix;
use lumen_gpu::{AssetKey, GpuError, RenderTarget, ShapeDescriptor, TextureHandle};
use parking_lot::Mutex;

use crate::effect::{Effect, EffectContext};
use crate::element::Element;
use crate::error::Result;
use crate::kind::{slots, ElementBehavior, Layoutable, Renderable};
use crate::render::{FrameContext, RenderContext};

pub struct BackgroundCapture {
    effect: Mutex<Option<Arc<dyn Effect>>>,
    last_inverse: Mutex<Option<Matrix>>,
    last_texture: Mutex<Option<TextureHandle>>,
}

impl BackgroundCapture {
    pub fn new(effect: Option<Arc<dyn Effect>>) -> Self {
        Self {
            effect: Mutex::new(effect),
            last_inverse: Mutex::new(None),
            last_texture: Mutex::new(None),
        }
    }

    pub(crate) fn copy_state(&self) -> Self {
        Self::new(self.effect())
    }

    pub fn effect(&self) -> Option<Arc<dyn Effect>> {
        self.effect.lock().clone()
    }

    pub fn set_effect(&self, effect: Option<Arc<dyn Effect>>) {
        *self.effect.lock() = effect;
    }

    /// Inverse transform cached by the last capture
    pub fn last_inverse_transform(&self) -> Option<Matrix> {
        *self.last_inverse.lock()
    }

    /// Texture written by the last capture
    pub fn last_texture(&self) -> Option<TextureHandle> {
        *self.last_texture.lock()
    }
}

impl Layoutable for BackgroundCapture {}

impl Renderable for BackgroundCapture {
    fn render_override(
        &self,
        element: &Element,
        frame: &mut FrameContext<'_>,
        ctx: &mut RenderContext,
    ) -> Result<()> {
        let device = frame.device();
        let (width, height) = device.back_buffer_size();
        if width == 0 || height == 0 {
            element.render_children(frame, ctx);
            return Ok(());
        }

        let key = AssetKey::new(element.id().get(), slots::CAPTURE);
        let texture = frame
            .asset(key, ShapeDescriptor::texture(width, height))?
            .texture()
            .ok_or(GpuError::InvalidHandle("capture texture"))?;

        device.stretch_blit(device.current_render_target(), RenderTarget::Texture(texture))?;
        frame.record_capture();

        let inverse = ctx.transform().invert();
        *self.last_inverse.lock() = inverse;
        *self.last_texture.lock() = Some(texture);

        if let Some(effect) = self.effect() {
            let effect_ctx = EffectContext {
                owner: element.id(),
                bounds: ctx.bounds(),
                transform: ctx.transform(),
                inverse_transform: inverse,
                opacity: ctx.opacity(),
                z_order: ctx.z_order(),
            };
            effect.apply(frame, texture, &effect_ctx)?;
            ctx.include_local_bounds(ctx.bounds());
        }

        element.render_children(frame, ctx);
        Ok(())
    }
}

impl ElementBehavior for BackgroundCapture {
    fn on_dispose(&self) {
        self.set_effect(None);
        *self.last_texture.lock() = None;
    }
}
