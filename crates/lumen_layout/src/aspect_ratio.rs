//! Aspect ratio box
//!
//! Sizes its content to the largest rectangle of a fixed width/height ratio
//! that fits the available space, centred in the box.

use lumen_core::{Property, PropertyMap, Rect, Size};

use crate::element::Element;
use crate::kind::{measure_children_max, ElementBehavior, Layoutable, Renderable};

pub const ASPECT_RATIO: &str = "AspectRatio";

/// Largest size with `width / height == ratio` inside `bounds`.
///
/// A NaN dimension is unconstrained. Non-positive or non-finite ratios, and
/// bounds unconstrained in both dimensions, return `bounds` unchanged.
pub fn fit_aspect(bounds: Size, ratio: f32) -> Size {
    if !(ratio > 0.0 && ratio.is_finite()) {
        return bounds;
    }
    match (bounds.width.is_nan(), bounds.height.is_nan()) {
        (true, true) => bounds,
        (false, true) => Size::new(bounds.width, bounds.width / ratio),
        (true, false) => Size::new(bounds.height * ratio, bounds.height),
        (false, false) => {
            let candidate = bounds.height * ratio;
            if bounds.width < candidate {
                Size::new(bounds.width, bounds.width / ratio)
            } else {
                Size::new(candidate, bounds.height)
            }
        }
    }
}

pub struct AspectRatioBox {
    pub ratio: Property<f32>,
}

impl AspectRatioBox {
    pub fn new(ratio: f32) -> Self {
        Self {
            ratio: Property::new(ASPECT_RATIO, ratio),
        }
    }

    pub(crate) fn copy_state(&self) -> Self {
        Self::new(self.ratio.get())
    }
}

impl Layoutable for AspectRatioBox {
    fn measure_override(&self, element: &Element, available: Size) -> Size {
        let target = fit_aspect(available, self.ratio.get());
        if target.width.is_nan() || target.height.is_nan() {
            return measure_children_max(element, available);
        }
        measure_children_max(element, target);
        target
    }

    fn arrange_override(&self, element: &Element, inner: Rect) {
        let fitted = fit_aspect(inner.size, self.ratio.get());
        let rect = Rect::new(
            inner.x() + (inner.width() - fitted.width) / 2.0,
            inner.y() + (inner.height() - fitted.height) / 2.0,
            fitted.width,
            fitted.height,
        );
        for child in element.children().iter() {
            child.arrange(rect);
        }
    }
}

impl Renderable for AspectRatioBox {}

impl ElementBehavior for AspectRatioBox {
    fn register(&self, map: &mut PropertyMap) {
        map.register(&self.ratio);
    }

    fn measure_properties(&self) -> &'static [&'static str] {
        &[ASPECT_RATIO]
    }
}
