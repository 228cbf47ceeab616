//! Element kinds
//!
//! Behavior that differs between elements lives in [`ElementKind`]. Each
//! variant implements [`Layoutable`] (measure and arrange of its children)
//! and [`Renderable`] (what it draws), and may add property cells of its own.

use std::sync::Arc;

use lumen_core::{Color, PropertyMap, Rect, Size};

use crate::aspect_ratio::AspectRatioBox;
use crate::capture::BackgroundCapture;
use crate::decorator::Decorator;
use crate::effect::Effect;
use crate::element::Element;
use crate::error::Result;
use crate::panels::{Canvas, Orientation, StackPanel};
use crate::render::{FrameContext, RenderContext};
use crate::scroll::ScrollPresenter;
use crate::shape::RectangleShape;

/// Asset slots used by the built-in kinds
pub mod slots {
    pub const FILL: u32 = 0;
    pub const BACKGROUND: u32 = 1;
    pub const CAPTURE: u32 = 0x10;
    pub const EFFECT: u32 = 0x11;
    pub const MASK_TARGET: u32 = 0x20;
    pub const MASK: u32 = 0x21;
}

/// Layout participation of an element kind
pub trait Layoutable {
    /// Size wanted by the content within `available`, which already excludes
    /// margin and honors explicit Width/Height
    fn measure_override(&self, element: &Element, available: Size) -> Size {
        measure_children_max(element, available)
    }

    /// Position the children within `inner`, the element's arranged bounds
    fn arrange_override(&self, element: &Element, inner: Rect) {
        arrange_children_fill(element, inner);
    }
}

/// Drawing of an element kind
pub trait Renderable {
    fn render_override(
        &self,
        element: &Element,
        frame: &mut FrameContext<'_>,
        ctx: &mut RenderContext,
    ) -> Result<()> {
        element.render_children(frame, ctx);
        Ok(())
    }

    /// Element-space area this frame's output is clipped to. A clipped
    /// element is drawn off-screen and composited through its bounds.
    fn clip_bounds(&self, _element: &Element) -> Option<Rect> {
        None
    }

    /// Whether descendants can only be hit inside this element's area
    fn clips_hit_testing(&self) -> bool {
        false
    }
}

/// Per-kind property cells and invalidation
pub trait ElementBehavior: Layoutable + Renderable {
    fn register(&self, _map: &mut PropertyMap) {}

    /// Kind cells whose change invalidates measure
    fn measure_properties(&self) -> &'static [&'static str] {
        &[]
    }

    /// Kind cells whose change invalidates arrange only
    fn arrange_properties(&self) -> &'static [&'static str] {
        &[]
    }

    fn on_dispose(&self) {}
}

/// Largest desired size among the children
pub fn measure_children_max(element: &Element, available: Size) -> Size {
    element
        .children()
        .iter()
        .map(|child| child.measure(available))
        .fold(Size::ZERO, |acc, desired| {
            Size::new(acc.width.max(desired.width), acc.height.max(desired.height))
        })
}

/// Give every child the whole of `inner`
pub fn arrange_children_fill(element: &Element, inner: Rect) {
    for child in element.children().iter() {
        child.arrange(inner);
    }
}

pub enum ElementKind {
    Canvas(Canvas),
    StackPanel(StackPanel),
    Decorator(Decorator),
    AspectRatio(AspectRatioBox),
    Rectangle(RectangleShape),
    BackgroundCapture(BackgroundCapture),
    ScrollPresenter(ScrollPresenter),
}

impl ElementKind {
    pub fn canvas() -> Self {
        ElementKind::Canvas(Canvas)
    }

    pub fn stack_panel(orientation: Orientation) -> Self {
        ElementKind::StackPanel(StackPanel::new(orientation))
    }

    pub fn decorator(background: Option<Color>) -> Self {
        ElementKind::Decorator(Decorator::new(background))
    }

    pub fn aspect_ratio(ratio: f32) -> Self {
        ElementKind::AspectRatio(AspectRatioBox::new(ratio))
    }

    pub fn rectangle(fill: Color) -> Self {
        ElementKind::Rectangle(RectangleShape::new(fill))
    }

    pub fn background_capture(effect: Option<Arc<dyn Effect>>) -> Self {
        ElementKind::BackgroundCapture(BackgroundCapture::new(effect))
    }

    pub fn scroll_presenter() -> Self {
        ElementKind::ScrollPresenter(ScrollPresenter::new())
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Canvas(_) => "Canvas",
            ElementKind::StackPanel(_) => "StackPanel",
            ElementKind::Decorator(_) => "Decorator",
            ElementKind::AspectRatio(_) => "AspectRatio",
            ElementKind::Rectangle(_) => "Rectangle",
            ElementKind::BackgroundCapture(_) => "BackgroundCapture",
            ElementKind::ScrollPresenter(_) => "ScrollPresenter",
        }
    }

    fn behavior(&self) -> &dyn ElementBehavior {
        match self {
            ElementKind::Canvas(k) => k,
            ElementKind::StackPanel(k) => k,
            ElementKind::Decorator(k) => k,
            ElementKind::AspectRatio(k) => k,
            ElementKind::Rectangle(k) => k,
            ElementKind::BackgroundCapture(k) => k,
            ElementKind::ScrollPresenter(k) => k,
        }
    }

    pub(crate) fn register(&self, map: &mut PropertyMap) {
        self.behavior().register(map);
    }

    pub(crate) fn measure_properties(&self) -> &'static [&'static str] {
        self.behavior().measure_properties()
    }

    pub(crate) fn arrange_properties(&self) -> &'static [&'static str] {
        self.behavior().arrange_properties()
    }

    pub(crate) fn on_dispose(&self) {
        self.behavior().on_dispose();
    }

    pub(crate) fn measure_override(&self, element: &Element, available: Size) -> Size {
        self.behavior().measure_override(element, available)
    }

    pub(crate) fn arrange_override(&self, element: &Element, inner: Rect) {
        self.behavior().arrange_override(element, inner);
    }

    pub(crate) fn render_override(
        &self,
        element: &Element,
        frame: &mut FrameContext<'_>,
        ctx: &mut RenderContext,
    ) -> Result<()> {
        self.behavior().render_override(element, frame, ctx)
    }

    pub(crate) fn clip_bounds(&self, element: &Element) -> Option<Rect> {
        self.behavior().clip_bounds(element)
    }

    pub(crate) fn clips_hit_testing(&self) -> bool {
        self.behavior().clips_hit_testing()
    }

    /// Fresh kind state for a deep copy. Property cells are created with the
    /// source values, effects are shared, per-frame state is not carried over.
    pub(crate) fn copy_kind(&self) -> ElementKind {
        match self {
            ElementKind::Canvas(_) => ElementKind::Canvas(Canvas),
            ElementKind::StackPanel(k) => ElementKind::StackPanel(k.copy_state()),
            ElementKind::Decorator(k) => ElementKind::Decorator(k.copy_state()),
            ElementKind::AspectRatio(k) => ElementKind::AspectRatio(k.copy_state()),
            ElementKind::Rectangle(k) => ElementKind::Rectangle(k.copy_state()),
            ElementKind::BackgroundCapture(k) => ElementKind::BackgroundCapture(k.copy_state()),
            ElementKind::ScrollPresenter(k) => ElementKind::ScrollPresenter(k.copy_state()),
        }
    }

    pub fn as_stack_panel(&self) -> Option<&StackPanel> {
        match self {
            ElementKind::StackPanel(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_decorator(&self) -> Option<&Decorator> {
        match self {
            ElementKind::Decorator(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_aspect_ratio(&self) -> Option<&AspectRatioBox> {
        match self {
            ElementKind::AspectRatio(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_rectangle(&self) -> Option<&RectangleShape> {
        match self {
            ElementKind::Rectangle(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_background_capture(&self) -> Option<&BackgroundCapture> {
        match self {
            ElementKind::BackgroundCapture(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_scroll_presenter(&self) -> Option<&ScrollPresenter> {
        match self {
            ElementKind::ScrollPresenter(k) => Some(k),
            _ => None,
        }
    }
}

impl std::fmt::Debug for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
