//! Scroll presenter
//!
//! Shows a window onto its first child. The child is measured unconstrained
//! and arranged at its full size, shifted by the scroll offsets. Offsets are
//! clamped to `0..=content - viewport` when arranging.
//!
//! [`ScrollPresenter::scroll_to`] animates the offsets linearly; the screen
//! advances running animations once per frame before layout.
//!
//! While the content overflows the viewport the presenter renders through
//! an off-screen texture clipped to its bounds, and hit testing of the
//! content is limited to the viewport.

use std::time::{Duration, Instant};

use lumen_core::{Point, Property, PropertyMap, Rect, Size, DELTA};
use parking_lot::Mutex;

use crate::element::Element;
use crate::kind::{ElementBehavior, Layoutable, Renderable};

pub const SCROLL_OFFSET_X: &str = "ScrollOffsetX";
pub const SCROLL_OFFSET_Y: &str = "ScrollOffsetY";

/// Used when the presenter is not attached to a screen
pub const DEFAULT_SCROLL_DURATION: Duration = Duration::from_millis(150);

#[derive(Clone, Copy, Debug)]
struct ScrollAnimation {
    from: Point,
    to: Point,
    start: Instant,
    duration: Duration,
}

#[derive(Clone, Copy, Debug, Default)]
struct Extent {
    content: Size,
    viewport: Size,
}

pub struct ScrollPresenter {
    pub offset_x: Property<f32>,
    pub offset_y: Property<f32>,
    animation: Mutex<Option<ScrollAnimation>>,
    extent: Mutex<Extent>,
}

impl Default for ScrollPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScrollPresenter {
    pub fn new() -> Self {
        Self {
            offset_x: Property::new(SCROLL_OFFSET_X, 0.0),
            offset_y: Property::new(SCROLL_OFFSET_Y, 0.0),
            animation: Mutex::new(None),
            extent: Mutex::new(Extent::default()),
        }
    }

    pub(crate) fn copy_state(&self) -> Self {
        let copy = Self::new();
        copy.offset_x.set(self.offset_x.get());
        copy.offset_y.set(self.offset_y.get());
        copy
    }

    pub fn offset(&self) -> Point {
        Point::new(self.offset_x.get(), self.offset_y.get())
    }

    /// Largest offsets for the last arranged content and viewport
    pub fn max_offset(&self) -> Point {
        let extent = *self.extent.lock();
        Point::new(
            (extent.content.width - extent.viewport.width).max(0.0),
            (extent.content.height - extent.viewport.height).max(0.0),
        )
    }

    fn clamp(&self, offset: Point) -> Point {
        let max = self.max_offset();
        Point::new(offset.x.clamp(0.0, max.x), offset.y.clamp(0.0, max.y))
    }

    /// Jump to `target` (clamped), cancelling any animation
    pub fn set_offset(&self, target: Point) {
        *self.animation.lock() = None;
        let target = self.clamp(target);
        self.offset_x.set(target.x);
        self.offset_y.set(target.y);
    }

    /// Animate towards `target` (clamped) over `duration`
    pub fn scroll_to(&self, target: Point, now: Instant, duration: Duration) {
        if duration.is_zero() {
            self.set_offset(target);
            return;
        }
        *self.animation.lock() = Some(ScrollAnimation {
            from: self.offset(),
            to: self.clamp(target),
            start: now,
            duration,
        });
    }

    pub fn scroll_by(&self, delta: Point, now: Instant, duration: Duration) {
        let base = match *self.animation.lock() {
            Some(animation) => animation.to,
            None => self.offset(),
        };
        self.scroll_to(Point::new(base.x + delta.x, base.y + delta.y), now, duration);
    }

    pub fn is_animating(&self) -> bool {
        self.animation.lock().is_some()
    }

    /// Step the running animation to `now`. Returns true while it is still
    /// running.
    pub fn advance(&self, now: Instant) -> bool {
        let Some(animation) = *self.animation.lock() else {
            return false;
        };
        let elapsed = now.saturating_duration_since(animation.start);
        let t = (elapsed.as_secs_f32() / animation.duration.as_secs_f32()).min(1.0);
        let x = animation.from.x + (animation.to.x - animation.from.x) * t;
        let y = animation.from.y + (animation.to.y - animation.from.y) * t;
        self.offset_x.set(x);
        self.offset_y.set(y);

        if t >= 1.0 {
            *self.animation.lock() = None;
            false
        } else {
            true
        }
    }

    /// Duration configured for the element's screen
    pub fn duration_for(element: &Element) -> Duration {
        element
            .screen()
            .map(|screen| screen.config().scroll_duration)
            .unwrap_or(DEFAULT_SCROLL_DURATION)
    }
}

impl Layoutable for ScrollPresenter {
    fn measure_override(&self, element: &Element, available: Size) -> Size {
        let Some(content) = element.children().get(0) else {
            return Size::ZERO;
        };
        let desired = content.measure(Size::UNCONSTRAINED);
        let fit = |content: f32, available: f32| {
            if available.is_nan() {
                content
            } else {
                content.min(available)
            }
        };
        Size::new(
            fit(desired.width, available.width),
            fit(desired.height, available.height),
        )
    }

    fn arrange_override(&self, element: &Element, inner: Rect) {
        let Some(content) = element.children().get(0) else {
            return;
        };
        let desired = content.desired_size();
        *self.extent.lock() = Extent {
            content: desired,
            viewport: inner.size,
        };
        let offset = self.clamp(self.offset());
        content.arrange(Rect::new(
            inner.x() - offset.x,
            inner.y() - offset.y,
            desired.width.max(inner.width()),
            desired.height.max(inner.height()),
        ));
    }
}

impl Renderable for ScrollPresenter {
    /// Content larger than the viewport is clipped to it
    fn clip_bounds(&self, element: &Element) -> Option<Rect> {
        let extent = *self.extent.lock();
        let overflows = extent.content.width > extent.viewport.width + DELTA
            || extent.content.height > extent.viewport.height + DELTA;
        overflows.then(|| element.props().actual_bounds())
    }

    fn clips_hit_testing(&self) -> bool {
        true
    }
}

impl ElementBehavior for ScrollPresenter {
    fn register(&self, map: &mut PropertyMap) {
        map.register(&self.offset_x);
        map.register(&self.offset_y);
    }

    fn arrange_properties(&self) -> &'static [&'static str] {
        &[SCROLL_OFFSET_X, SCROLL_OFFSET_Y]
    }
}

impl Element {
    /// Advance every scroll animation in this subtree
    pub fn advance_animations(&self, now: Instant) -> usize {
        self.descendants()
            .iter()
            .filter_map(|element| element.kind().as_scroll_presenter())
            .filter(|presenter| presenter.advance(now))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ElementKind;

    fn presenter_with_content() -> (Element, Element) {
        let content = Element::new(ElementKind::canvas()).with_size(100.0, 400.0);
        let presenter = Element::new(ElementKind::scroll_presenter())
            .with_child(content.clone())
            .unwrap();
        presenter.measure(Size::new(100.0, 100.0));
        presenter.arrange(Rect::new(0.0, 0.0, 100.0, 100.0));
        (presenter, content)
    }

    #[test]
    fn test_viewport_and_max_offset() {
        let (presenter, content) = presenter_with_content();
        assert_eq!(presenter.desired_size(), Size::new(100.0, 100.0));
        assert_eq!(content.actual_size(), Size::new(100.0, 400.0));
        let scroll = presenter.kind().as_scroll_presenter().unwrap();
        assert_eq!(scroll.max_offset(), Point::new(0.0, 300.0));
    }

    #[test]
    fn test_offset_moves_content() {
        let (presenter, content) = presenter_with_content();
        let scroll = presenter.kind().as_scroll_presenter().unwrap();
        scroll.set_offset(Point::new(0.0, 120.0));
        assert!(!presenter.is_arrange_valid());
        assert!(presenter.is_measure_valid());

        presenter.arrange(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(content.actual_position(), Point::new(0.0, -120.0));
    }

    #[test]
    fn test_targets_are_clamped() {
        let (presenter, _) = presenter_with_content();
        let scroll = presenter.kind().as_scroll_presenter().unwrap();
        scroll.set_offset(Point::new(-10.0, 1000.0));
        assert_eq!(scroll.offset(), Point::new(0.0, 300.0));
    }

    #[test]
    fn test_animation_is_linear() {
        let (presenter, _) = presenter_with_content();
        let scroll = presenter.kind().as_scroll_presenter().unwrap();
        let start = Instant::now();
        scroll.scroll_to(Point::new(0.0, 200.0), start, Duration::from_millis(100));
        assert!(scroll.is_animating());

        assert!(scroll.advance(start + Duration::from_millis(50)));
        assert!((scroll.offset().y - 100.0).abs() < 0.5);

        assert_eq!(presenter.advance_animations(start + Duration::from_millis(150)), 0);
        assert_eq!(scroll.offset(), Point::new(0.0, 200.0));
        assert!(!scroll.is_animating());
    }
}
