//! Element property set
//!
//! Every element carries the same base cells, created once at construction
//! and kept for the element's lifetime. Each cell is also registered by name
//! in the element's [`PropertyMap`].

use std::sync::Arc;

use lumen_core::{Color, Point, Property, PropertyMap, Rect, Size, Thickness, Transform};

/// Property names
pub mod names {
    pub const NAME: &str = "Name";
    pub const WIDTH: &str = "Width";
    pub const HEIGHT: &str = "Height";
    pub const MIN_WIDTH: &str = "MinWidth";
    pub const MIN_HEIGHT: &str = "MinHeight";
    pub const MAX_WIDTH: &str = "MaxWidth";
    pub const MAX_HEIGHT: &str = "MaxHeight";
    pub const MARGIN: &str = "Margin";
    pub const HORIZONTAL_ALIGNMENT: &str = "HorizontalAlignment";
    pub const VERTICAL_ALIGNMENT: &str = "VerticalAlignment";
    pub const VISIBILITY: &str = "Visibility";
    pub const OPACITY: &str = "Opacity";
    pub const OPACITY_MASK: &str = "OpacityMask";
    pub const Z_INDEX: &str = "ZIndex";
    pub const LAYOUT_TRANSFORM: &str = "LayoutTransform";
    pub const RENDER_TRANSFORM: &str = "RenderTransform";
    pub const RENDER_TRANSFORM_ORIGIN: &str = "RenderTransformOrigin";
    pub const IS_ENABLED: &str = "IsEnabled";
    pub const ACTUAL_WIDTH: &str = "ActualWidth";
    pub const ACTUAL_HEIGHT: &str = "ActualHeight";
    pub const ACTUAL_POSITION: &str = "ActualPosition";
    pub const LAYOUT_BOUNDS: &str = "LayoutBounds";
}

/// Properties whose change invalidates measure
pub(crate) const LAYOUT_AFFECTING: &[&str] = &[
    names::WIDTH,
    names::HEIGHT,
    names::MIN_WIDTH,
    names::MIN_HEIGHT,
    names::MAX_WIDTH,
    names::MAX_HEIGHT,
    names::MARGIN,
    names::HORIZONTAL_ALIGNMENT,
    names::VERTICAL_ALIGNMENT,
    names::VISIBILITY,
    names::LAYOUT_TRANSFORM,
];

/// Placement of an element inside the slot offered by its parent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    /// Fill the slot, or center if an explicit size is set
    #[default]
    Stretch,
    Start,
    Center,
    End,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Visible,
    /// Keeps its layout slot but does not render
    Hidden,
    /// Takes no space and does not render
    Collapsed,
}

/// Shared transform slot
pub type TransformRef = Option<Arc<Transform>>;

/// Base cells of every element
pub struct ElementProperties {
    pub name: Property<String>,
    pub width: Property<f32>,
    pub height: Property<f32>,
    pub min_width: Property<f32>,
    pub min_height: Property<f32>,
    pub max_width: Property<f32>,
    pub max_height: Property<f32>,
    pub margin: Property<Thickness>,
    pub horizontal_alignment: Property<Alignment>,
    pub vertical_alignment: Property<Alignment>,
    pub visibility: Property<Visibility>,
    pub opacity: Property<f32>,
    /// Solid mask the subtree is composited through; the subtree is drawn
    /// into an off-screen texture first, then onto the target tinted by it
    pub opacity_mask: Property<Option<Color>>,
    pub z_index: Property<i32>,
    pub layout_transform: Property<TransformRef>,
    pub render_transform: Property<TransformRef>,
    /// Pivot of the render transform, relative to the element bounds
    pub render_transform_origin: Property<Point>,
    pub is_enabled: Property<bool>,
    pub actual_width: Property<f32>,
    pub actual_height: Property<f32>,
    pub actual_position: Property<Point>,
    /// Set once per arrange after the actual cells; listeners see whole bounds
    pub layout_bounds: Property<Rect>,
}

impl ElementProperties {
    pub fn new() -> Self {
        Self {
            name: Property::new(names::NAME, String::new()),
            width: Property::new(names::WIDTH, f32::NAN),
            height: Property::new(names::HEIGHT, f32::NAN),
            min_width: Property::new(names::MIN_WIDTH, 0.0),
            min_height: Property::new(names::MIN_HEIGHT, 0.0),
            max_width: Property::new(names::MAX_WIDTH, f32::INFINITY),
            max_height: Property::new(names::MAX_HEIGHT, f32::INFINITY),
            margin: Property::new(names::MARGIN, Thickness::ZERO),
            horizontal_alignment: Property::new(names::HORIZONTAL_ALIGNMENT, Alignment::Stretch),
            vertical_alignment: Property::new(names::VERTICAL_ALIGNMENT, Alignment::Stretch),
            visibility: Property::new(names::VISIBILITY, Visibility::Visible),
            opacity: Property::new(names::OPACITY, 1.0),
            opacity_mask: Property::new(names::OPACITY_MASK, None),
            z_index: Property::new(names::Z_INDEX, 0),
            layout_transform: Property::new(names::LAYOUT_TRANSFORM, None),
            render_transform: Property::new(names::RENDER_TRANSFORM, None),
            render_transform_origin: Property::new(names::RENDER_TRANSFORM_ORIGIN, Point::ZERO),
            is_enabled: Property::new(names::IS_ENABLED, true),
            actual_width: Property::new(names::ACTUAL_WIDTH, 0.0),
            actual_height: Property::new(names::ACTUAL_HEIGHT, 0.0),
            actual_position: Property::new(names::ACTUAL_POSITION, Point::ZERO),
            layout_bounds: Property::new(names::LAYOUT_BOUNDS, Rect::ZERO),
        }
    }

    /// Register every cell by name
    pub fn register(&self, map: &mut PropertyMap) {
        map.register(&self.name);
        map.register(&self.width);
        map.register(&self.height);
        map.register(&self.min_width);
        map.register(&self.min_height);
        map.register(&self.max_width);
        map.register(&self.max_height);
        map.register(&self.margin);
        map.register(&self.horizontal_alignment);
        map.register(&self.vertical_alignment);
        map.register(&self.visibility);
        map.register(&self.opacity);
        map.register(&self.opacity_mask);
        map.register(&self.z_index);
        map.register(&self.layout_transform);
        map.register(&self.render_transform);
        map.register(&self.render_transform_origin);
        map.register(&self.is_enabled);
        map.register(&self.actual_width);
        map.register(&self.actual_height);
        map.register(&self.actual_position);
        map.register(&self.layout_bounds);
    }

    /// Clamp a size to Min/Max, leaving NaN components alone
    pub fn clamp(&self, size: Size) -> Size {
        let clamp = |value: f32, min: f32, max: f32| {
            if value.is_nan() {
                value
            } else {
                value.max(min).min(max)
            }
        };
        Size::new(
            clamp(size.width, self.min_width.get(), self.max_width.get()),
            clamp(size.height, self.min_height.get(), self.max_height.get()),
        )
    }

    /// Bounds published by the last arrange
    pub fn actual_bounds(&self) -> Rect {
        Rect::from_origin_size(
            self.actual_position.get(),
            Size::new(self.actual_width.get(), self.actual_height.get()),
        )
    }
}

impl Default for ElementProperties {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let props = ElementProperties::new();
        assert!(props.width.get().is_nan());
        assert_eq!(props.min_width.get(), 0.0);
        assert_eq!(props.max_height.get(), f32::INFINITY);
        assert_eq!(props.horizontal_alignment.get(), Alignment::Stretch);
        assert_eq!(props.opacity.get(), 1.0);
        assert!(props.layout_transform.get().is_none());
    }

    #[test]
    fn test_every_cell_is_registered() {
        let props = ElementProperties::new();
        let mut map = PropertyMap::new();
        props.register(&mut map);
        assert_eq!(map.len(), 22);
        for name in LAYOUT_AFFECTING {
            assert!(map.contains(name), "{name} missing");
        }
        assert!(map.get::<f32>(names::ACTUAL_WIDTH).is_ok());
        assert!(map.get::<Option<Color>>(names::OPACITY_MASK).is_ok());
    }

    #[test]
    fn test_clamp() {
        let props = ElementProperties::new();
        props.min_width.set(10.0);
        props.max_height.set(50.0);
        let clamped = props.clamp(Size::new(5.0, 80.0));
        assert_eq!(clamped, Size::new(10.0, 50.0));
        assert!(props.clamp(Size::new(f32::NAN, 1.0)).width.is_nan());
    }
}
