//! Geometry primitives for layout and rendering
//!
//! Sizes and rects use `f32::NAN` to mean "unset" or "unconstrained". All
//! arithmetic that shrinks or grows a size leaves NaN components untouched,
//! and [`same_value`] treats two NaNs as equal so memoized layout results
//! survive unconstrained passes.

/// Tolerance used by [`is_near`]
pub const DELTA: f32 = 0.01;

/// Returns true if `a` and `b` differ by less than [`DELTA`]
pub fn is_near(a: f32, b: f32) -> bool {
    (a - b).abs() < DELTA
}

/// Exact comparison where NaN equals NaN
pub fn same_value(a: f32, b: f32) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn shrink(value: f32, by: f32) -> f32 {
    if value.is_nan() {
        value
    } else {
        (value - by).max(0.0)
    }
}

fn grow(value: f32, by: f32) -> f32 {
    if value.is_nan() {
        value
    } else {
        value + by
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Core Geometry Types
// ─────────────────────────────────────────────────────────────────────────────

/// 2D point
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// 2D size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    /// Both dimensions unconstrained
    pub const UNCONSTRAINED: Size = Size {
        width: f32::NAN,
        height: f32::NAN,
    };

    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Convert to a Rect at the origin (0, 0)
    pub const fn to_rect(self) -> Rect {
        Rect {
            origin: Point::ZERO,
            size: self,
        }
    }

    /// True unless both dimensions are strictly positive. NaN counts as
    /// non-empty so unconstrained sizes still get measured.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Component-wise [`same_value`]
    pub fn same(&self, other: &Size) -> bool {
        same_value(self.width, other.width) && same_value(self.height, other.height)
    }

    /// Remove a thickness from each side, never going below zero
    pub fn deflate(&self, thickness: Thickness) -> Size {
        Size::new(
            shrink(self.width, thickness.horizontal()),
            shrink(self.height, thickness.vertical()),
        )
    }

    /// Add a thickness to each side
    pub fn inflate(&self, thickness: Thickness) -> Size {
        Size::new(
            grow(self.width, thickness.horizontal()),
            grow(self.height, thickness.vertical()),
        )
    }

    /// Replace negative components with zero
    pub fn non_negative(&self) -> Size {
        Size::new(shrink(self.width, 0.0), shrink(self.height, 0.0))
    }
}

impl From<Size> for Rect {
    fn from(size: Size) -> Self {
        size.to_rect()
    }
}

/// 2D rectangle
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        origin: Point::ZERO,
        size: Size::ZERO,
    };

    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// Smallest rect containing all given points
    pub fn from_points(points: &[Point]) -> Rect {
        let Some(first) = points.first() else {
            return Rect::ZERO;
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn x(&self) -> f32 {
        self.origin.x
    }

    pub fn y(&self) -> f32 {
        self.origin.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.width
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.height
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.size.width / 2.0,
            self.origin.y + self.size.height / 2.0,
        )
    }

    /// The four corners, clockwise from the origin
    pub fn corners(&self) -> [Point; 4] {
        [
            self.origin,
            Point::new(self.right(), self.y()),
            Point::new(self.right(), self.bottom()),
            Point::new(self.x(), self.bottom()),
        ]
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.origin.x
            && point.x <= self.right()
            && point.y >= self.origin.y
            && point.y <= self.bottom()
    }

    pub fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// Offset the rect by a delta
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Rect {
            origin: self.origin.offset(dx, dy),
            size: self.size,
        }
    }

    /// Shrink by a thickness, moving the origin inwards
    pub fn deflate(&self, thickness: Thickness) -> Self {
        Rect {
            origin: self.origin.offset(thickness.left, thickness.top),
            size: self.size.deflate(thickness),
        }
    }

    /// Smallest rect containing both. Empty rects are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x().min(other.x());
        let y = self.y().min(other.y());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Overlap of both, or [`Rect::ZERO`] if they do not overlap
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x = self.x().max(other.x());
        let y = self.y().max(other.y());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= x || bottom <= y {
            return Rect::ZERO;
        }
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Component-wise [`same_value`]
    pub fn same(&self, other: &Rect) -> bool {
        same_value(self.origin.x, other.origin.x)
            && same_value(self.origin.y, other.origin.y)
            && self.size.same(&other.size)
    }
}

/// Per-side spacing used for margins and padding
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Thickness {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Thickness {
    pub const ZERO: Thickness = Thickness::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn uniform(value: f32) -> Self {
        Self::new(value, value, value, value)
    }

    pub const fn symmetric(horizontal: f32, vertical: f32) -> Self {
        Self::new(horizontal, vertical, horizontal, vertical)
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Color
// ─────────────────────────────────────────────────────────────────────────────

/// RGBA color (linear space)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.a = alpha;
        self
    }

    /// Scale alpha by an accumulated opacity
    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = self.a * opacity.clamp(0.0, 1.0);
        self.with_alpha(a)
    }

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}
