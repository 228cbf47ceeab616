//! Two-pass layout
//!
//! ```text
//!   measure(available)              arrange(final_rect)
//!   ───────────────────             ───────────────────
//!   - margin deflated               - alignment within the slot
//!   - layout transform bound        - margin deflated
//!   - explicit Width/Height         - layout transform centred
//!   - kind measure_override         - Actual* published
//!   - Min/Max clamp                 - kind arrange_override
//!   - transform + margin inflated
//! ```
//!
//! Both passes are memoized: a valid element asked to measure the same
//! available size (or arrange into the same rect) returns immediately.
//! Invalidation marks the element and walks up its ancestors, stopping at
//! the first one that is already invalid.
//!
//! Sizes use NaN for "unconstrained" (available) and "unset" (Width/Height).

use lumen_core::{is_near, ListenerId, Matrix, Point, Rect, Size, DELTA};

use crate::element::Element;
use crate::properties::{Alignment, Visibility};

#[derive(Clone, Debug)]
pub(crate) struct LayoutState {
    pub measure_invalid: bool,
    pub arrange_invalid: bool,
    pub available_size: Option<Size>,
    pub desired_size: Size,
    /// Desired size before the layout transform and margin are applied
    pub inner_desired_size: Size,
    pub outer_rect: Option<Rect>,
    pub measure_passes: u64,
    pub arrange_passes: u64,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            measure_invalid: true,
            arrange_invalid: true,
            available_size: None,
            desired_size: Size::ZERO,
            inner_desired_size: Size::ZERO,
            outer_rect: None,
            measure_passes: 0,
            arrange_passes: 0,
        }
    }
}

/// Position and extent of an element along one axis of its slot.
///
/// `explicit` is the element's own Width or Height (NaN if unset).
pub fn align_axis(
    start: f32,
    available: f32,
    desired: f32,
    alignment: Alignment,
    explicit: f32,
) -> (f32, f32) {
    if desired.is_nan() || available.is_nan() || desired > available {
        return (start, available);
    }
    match alignment {
        Alignment::Stretch if explicit.is_nan() => (start, available),
        Alignment::Stretch | Alignment::Center => (start + (available - desired) / 2.0, desired),
        Alignment::Start => (start, desired),
        Alignment::End => (start + available - desired, desired),
    }
}

/// Slot of an element with `desired` size inside `slot`
pub fn align_rect(
    slot: Rect,
    desired: Size,
    horizontal: Alignment,
    vertical: Alignment,
    explicit: Size,
) -> Rect {
    let (x, width) = align_axis(
        slot.x(),
        slot.width(),
        desired.width,
        horizontal,
        explicit.width,
    );
    let (y, height) = align_axis(
        slot.y(),
        slot.height(),
        desired.height,
        vertical,
        explicit.height,
    );
    Rect::new(x, y, width, height)
}

fn concrete(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}

fn explicit_or(explicit: f32, value: f32) -> f32 {
    if explicit.is_nan() {
        value
    } else {
        explicit
    }
}

impl Element {
    fn layout_matrix(&self) -> Option<Matrix> {
        self.props()
            .layout_transform
            .get()
            .map(|t| t.to_matrix().remove_translation())
            .filter(|m| !m.is_identity())
    }

    // =========================================================================
    // Measure
    // =========================================================================

    /// Compute and cache the size this element wants within `available`
    pub fn measure(&self, available: Size) -> Size {
        {
            let mut state = self.0.layout.lock();
            if !state.measure_invalid
                && state.available_size.is_some_and(|last| last.same(&available))
            {
                return state.desired_size;
            }
            state.measure_invalid = false;
            state.available_size = Some(available);
        }

        let (inner, desired) = if self.props().visibility.get() == Visibility::Collapsed {
            (Size::ZERO, Size::ZERO)
        } else {
            self.measure_visible(available)
        };

        let mut state = self.0.layout.lock();
        if !state.desired_size.same(&desired) {
            state.arrange_invalid = true;
        }
        state.desired_size = desired;
        state.inner_desired_size = inner;
        state.measure_passes += 1;
        tracing::trace!(
            "measured {} in {:?}: {:?}",
            self,
            (available.width, available.height),
            (desired.width, desired.height)
        );
        desired
    }

    fn measure_visible(&self, available: Size) -> (Size, Size) {
        let props = self.props();
        let margin = props.margin.get();
        let layout = self.layout_matrix();
        let (width, height) = (props.width.get(), props.height.get());

        let mut constraint = available.deflate(margin);
        if let Some(matrix) = &layout {
            constraint = matrix.max_local_size(constraint);
        }
        constraint = Size::new(
            explicit_or(width, constraint.width),
            explicit_or(height, constraint.height),
        );

        let content = self.kind().measure_override(self, constraint);
        let sized = Size::new(
            explicit_or(width, concrete(content.width)),
            explicit_or(height, concrete(content.height)),
        );
        let inner = props.clamp(sized).non_negative();

        let mut outer = inner;
        if let Some(matrix) = &layout {
            outer = matrix.transform_size(outer);
        }
        outer = outer.inflate(margin);

        if available.is_empty() {
            outer = Size::ZERO;
        }
        (inner, outer.non_negative())
    }

    // =========================================================================
    // Arrange
    // =========================================================================

    /// Position this element within `final_rect` and publish its actual
    /// bounds
    pub fn arrange(&self, final_rect: Rect) {
        let needs_measure = {
            let state = self.0.layout.lock();
            state.measure_invalid.then(|| state.available_size.unwrap_or(final_rect.size))
        };
        if let Some(available) = needs_measure {
            self.measure(available);
        }

        let (desired, inner_desired) = {
            let mut state = self.0.layout.lock();
            if !state.arrange_invalid
                && state.outer_rect.is_some_and(|last| last.same(&final_rect))
            {
                return;
            }
            state.arrange_invalid = false;
            state.outer_rect = Some(final_rect);
            state.arrange_passes += 1;
            (state.desired_size, state.inner_desired_size)
        };

        let props = self.props();
        if props.visibility.get() == Visibility::Collapsed {
            self.publish_bounds(Rect::from_origin_size(final_rect.origin, Size::ZERO));
            return;
        }

        let slot = align_rect(
            final_rect,
            desired,
            props.horizontal_alignment.get(),
            props.vertical_alignment.get(),
            Size::new(props.width.get(), props.height.get()),
        );
        let mut rect = slot.deflate(props.margin.get());

        if let Some(matrix) = self.layout_matrix() {
            let mut inner = inner_desired;
            let outer = matrix.transform_size(inner);
            if outer.width > rect.width() + DELTA || outer.height > rect.height() + DELTA {
                inner = matrix.max_local_size(rect.size);
            }
            rect = Rect::new(
                rect.x() + (rect.width() - inner.width) / 2.0,
                rect.y() + (rect.height() - inner.height) / 2.0,
                inner.width,
                inner.height,
            );
        }

        self.publish_bounds(rect);
        self.kind().arrange_override(self, rect);
    }

    fn publish_bounds(&self, rect: Rect) {
        let props = self.props();
        props.actual_position.set(rect.origin);
        props.actual_width.set(rect.width());
        props.actual_height.set(rect.height());
        props.layout_bounds.set(rect);
    }

    /// Call `handler` with the previous and new bounds whenever an arrange
    /// moves or resizes this element
    pub fn on_layout_changed<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(Rect, Rect) + Send + Sync + 'static,
    {
        self.props()
            .layout_bounds
            .attach(move |cell, previous| handler(*previous, cell.get()))
    }

    pub fn remove_layout_changed(&self, id: ListenerId) -> bool {
        self.props().layout_bounds.detach(id)
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Mark measure and arrange stale here and on every ancestor up to the
    /// first one that is already stale
    pub fn invalidate_layout(&self) {
        {
            let mut state = self.0.layout.lock();
            state.measure_invalid = true;
            state.arrange_invalid = true;
        }
        let mut current = self.parent();
        while let Some(element) = current {
            {
                let mut state = element.0.layout.lock();
                if state.measure_invalid {
                    break;
                }
                state.measure_invalid = true;
                state.arrange_invalid = true;
            }
            current = element.parent();
        }
    }

    /// Mark arrange stale here and up the ancestor chain
    pub fn invalidate_arrange(&self) {
        self.0.layout.lock().arrange_invalid = true;
        let mut current = self.parent();
        while let Some(element) = current {
            {
                let mut state = element.0.layout.lock();
                if state.arrange_invalid {
                    break;
                }
                state.arrange_invalid = true;
            }
            current = element.parent();
        }
    }

    /// Re-run layout for this element only. A root is laid out at the screen
    /// size. Any other element is re-measured with its last constraint; if
    /// its desired size changed the parent is invalidated instead, otherwise
    /// it is re-arranged into its last rect.
    pub fn update_layout(&self) {
        let (available, outer, former) = {
            let mut state = self.0.layout.lock();
            state.measure_invalid = true;
            state.arrange_invalid = true;
            (state.available_size, state.outer_rect, state.desired_size)
        };

        let Some(parent) = self.parent() else {
            let size = self.screen().map(|screen| screen.size()).or(available);
            if let Some(size) = size {
                self.measure(size);
                self.arrange(size.to_rect());
            }
            return;
        };

        match (available, outer) {
            (Some(available), Some(outer)) => {
                let desired = self.measure(available);
                if desired.same(&former) {
                    self.arrange(outer);
                } else {
                    parent.invalidate_layout();
                }
            }
            _ => parent.invalidate_layout(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn desired_size(&self) -> Size {
        self.0.layout.lock().desired_size
    }

    pub fn is_measure_valid(&self) -> bool {
        !self.0.layout.lock().measure_invalid
    }

    pub fn is_arrange_valid(&self) -> bool {
        !self.0.layout.lock().arrange_invalid
    }

    /// Number of measure passes that did work
    pub fn measure_passes(&self) -> u64 {
        self.0.layout.lock().measure_passes
    }

    /// Number of arrange passes that did work
    pub fn arrange_passes(&self) -> u64 {
        self.0.layout.lock().arrange_passes
    }

    /// Rect last passed to [`arrange`](Self::arrange)
    pub fn layout_slot(&self) -> Option<Rect> {
        self.0.layout.lock().outer_rect
    }

    pub fn actual_size(&self) -> Size {
        let props = self.props();
        Size::new(props.actual_width.get(), props.actual_height.get())
    }

    pub fn actual_position(&self) -> Point {
        self.props().actual_position.get()
    }
}

/// Whether two sizes agree within layout tolerance
pub fn sizes_near(a: Size, b: Size) -> bool {
    is_near(a.width, b.width) && is_near(a.height, b.height)
}
