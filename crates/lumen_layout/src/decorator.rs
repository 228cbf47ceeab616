//! Decorator: a single content child with padding and an optional background

use lumen_core::{Color, Property, PropertyMap, Rect, Size, Thickness};

use crate::element::Element;
use crate::error::Result;
use crate::kind::{slots, ElementBehavior, Layoutable, Renderable};
use crate::render::{FrameContext, RenderContext};
use crate::shape::draw_fill;

pub const BACKGROUND: &str = "Background";
pub const PADDING: &str = "Padding";

/// Wraps the first child. Further children are neither measured nor drawn.
pub struct Decorator {
    pub background: Property<Option<Color>>,
    pub padding: Property<Thickness>,
}

impl Decorator {
    pub fn new(background: Option<Color>) -> Self {
        Self {
            background: Property::new(BACKGROUND, background),
            padding: Property::new(PADDING, Thickness::ZERO),
        }
    }

    pub(crate) fn copy_state(&self) -> Self {
        let copy = Self::new(self.background.get());
        copy.padding.set(self.padding.get());
        copy
    }

    pub fn content(element: &Element) -> Option<Element> {
        element.children().get(0)
    }
}

impl Layoutable for Decorator {
    fn measure_override(&self, element: &Element, available: Size) -> Size {
        let padding = self.padding.get();
        let content = match Self::content(element) {
            Some(content) => content.measure(available.deflate(padding)),
            None => Size::ZERO,
        };
        content.inflate(padding)
    }

    fn arrange_override(&self, element: &Element, inner: Rect) {
        if let Some(content) = Self::content(element) {
            content.arrange(inner.deflate(self.padding.get()));
        }
    }
}

impl Renderable for Decorator {
    fn render_override(
        &self,
        element: &Element,
        frame: &mut FrameContext<'_>,
        ctx: &mut RenderContext,
    ) -> Result<()> {
        if let Some(background) = self.background.get() {
            draw_fill(
                element,
                frame,
                ctx,
                slots::BACKGROUND,
                element.props().actual_bounds(),
                background,
            )?;
        }
        if let Some(content) = Self::content(element) {
            content.render_subtree(frame, ctx);
        }
        Ok(())
    }
}

impl ElementBehavior for Decorator {
    fn register(&self, map: &mut PropertyMap) {
        map.register(&self.background);
        map.register(&self.padding);
    }

    fn measure_properties(&self) -> &'static [&'static str] {
        &[PADDING]
    }
}
