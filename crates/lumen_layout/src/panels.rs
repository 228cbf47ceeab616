//! Panels
//!
//! - [`Canvas`]: overlays every child on its full bounds
//! - [`StackPanel`]: lines children up along one axis

use lumen_core::{Property, PropertyMap, Rect, Size};

use crate::element::Element;
use crate::kind::{ElementBehavior, Layoutable, Renderable};

pub const ORIENTATION: &str = "Orientation";

/// Stacking direction of a [`StackPanel`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Vertical,
    Horizontal,
}

/// Children share the panel's bounds; desired size is the largest child
#[derive(Clone, Copy, Debug, Default)]
pub struct Canvas;

impl Layoutable for Canvas {}
impl Renderable for Canvas {}
impl ElementBehavior for Canvas {}

pub struct StackPanel {
    pub orientation: Property<Orientation>,
}

impl StackPanel {
    pub fn new(orientation: Orientation) -> Self {
        Self {
            orientation: Property::new(ORIENTATION, orientation),
        }
    }

    pub(crate) fn copy_state(&self) -> Self {
        Self::new(self.orientation.get())
    }
}

impl Layoutable for StackPanel {
    fn measure_override(&self, element: &Element, available: Size) -> Size {
        let vertical = self.orientation.get() == Orientation::Vertical;
        let child_available = if vertical {
            Size::new(available.width, f32::NAN)
        } else {
            Size::new(f32::NAN, available.height)
        };

        let (mut along, mut across) = (0.0f32, 0.0f32);
        for child in element.children().iter() {
            let desired = child.measure(child_available);
            if vertical {
                along += desired.height;
                across = across.max(desired.width);
            } else {
                along += desired.width;
                across = across.max(desired.height);
            }
        }

        if vertical {
            Size::new(across, along)
        } else {
            Size::new(along, across)
        }
    }

    fn arrange_override(&self, element: &Element, inner: Rect) {
        let vertical = self.orientation.get() == Orientation::Vertical;
        let mut offset = 0.0;
        for child in element.children().iter() {
            let desired = child.desired_size();
            if vertical {
                child.arrange(Rect::new(
                    inner.x(),
                    inner.y() + offset,
                    inner.width(),
                    desired.height,
                ));
                offset += desired.height;
            } else {
                child.arrange(Rect::new(
                    inner.x() + offset,
                    inner.y(),
                    desired.width,
                    inner.height(),
                ));
                offset += desired.width;
            }
        }
    }
}

impl Renderable for StackPanel {}

impl ElementBehavior for StackPanel {
    fn register(&self, map: &mut PropertyMap) {
        map.register(&self.orientation);
    }

    fn measure_properties(&self) -> &'static [&'static str] {
        &[ORIENTATION]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ElementKind;
    use crate::properties::Alignment;
    use lumen_core::Point;

    fn sized(width: f32, height: f32) -> Element {
        Element::new(ElementKind::canvas()).with_size(width, height)
    }

    #[test]
    fn test_canvas_overlays_children() {
        let a = sized(30.0, 10.0).with_alignment(Alignment::Start, Alignment::Start);
        let b = sized(10.0, 40.0).with_alignment(Alignment::End, Alignment::End);
        let canvas = Element::new(ElementKind::canvas())
            .with_child(a.clone())
            .unwrap()
            .with_child(b.clone())
            .unwrap();

        assert_eq!(canvas.measure(Size::new(100.0, 100.0)), Size::new(30.0, 40.0));
        canvas.arrange(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(a.actual_position(), Point::new(0.0, 0.0));
        assert_eq!(b.actual_position(), Point::new(90.0, 60.0));
    }

    #[test]
    fn test_vertical_stack() {
        let a = sized(30.0, 10.0);
        let b = sized(50.0, 20.0);
        let stack = Element::new(ElementKind::stack_panel(Orientation::Vertical))
            .with_child(a.clone())
            .unwrap()
            .with_child(b.clone())
            .unwrap();

        assert_eq!(stack.measure(Size::new(100.0, 100.0)), Size::new(50.0, 30.0));
        stack.arrange(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(a.actual_position(), Point::new(35.0, 0.0));
        assert_eq!(b.actual_position(), Point::new(25.0, 10.0));
    }

    #[test]
    fn test_orientation_change_relayouts() {
        let stack = Element::new(ElementKind::stack_panel(Orientation::Vertical))
            .with_child(sized(30.0, 10.0))
            .unwrap()
            .with_child(sized(50.0, 20.0))
            .unwrap();
        stack.measure(Size::new(100.0, 100.0));
        assert!(stack.is_measure_valid());

        let panel = stack.kind().as_stack_panel().unwrap();
        panel.orientation.set(Orientation::Horizontal);
        assert!(!stack.is_measure_valid());
        assert_eq!(stack.measure(Size::new(100.0, 100.0)), Size::new(80.0, 20.0));
    }
}
