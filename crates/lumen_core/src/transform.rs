//! 2D affine transforms
//!
//! [`Matrix`] is the concrete affine matrix used during layout and rendering.
//! [`Transform`] is the declarative description an element holds in its
//! `LayoutTransform` / `RenderTransform` properties; it resolves to a matrix
//! on demand and is shared by reference, so deep copies go through the
//! [`CopyManager`](crate::copy::CopyManager).

use std::sync::Arc;

use crate::copy::{CopyManager, DeepCopy};
use crate::geometry::{is_near, Point, Rect, Size};

/// 2D affine transformation
///
/// ```text
/// | a  c  tx |
/// | b  d  ty |
/// | 0  0   1 |
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    /// Matrix elements [a, b, c, d, tx, ty]
    pub elements: [f32; 6],
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        elements: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };

    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self {
            elements: [a, b, c, d, tx, ty],
        }
    }

    pub fn translation(x: f32, y: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Rotation by `angle` radians
    pub fn rotation(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Shear by the given angles in radians
    pub fn skew(x_angle: f32, y_angle: f32) -> Self {
        Self::new(1.0, y_angle.tan(), x_angle.tan(), 1.0, 0.0, 0.0)
    }

    /// This matrix applied around `center` instead of the origin
    pub fn about(&self, center: Point) -> Matrix {
        Matrix::translation(-center.x, -center.y)
            .then(self)
            .then(&Matrix::translation(center.x, center.y))
    }

    /// Compose so that `self` is applied first, then `next`
    pub fn then(&self, next: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, tx1, ty1] = self.elements;
        let [a2, b2, c2, d2, tx2, ty2] = next.elements;

        Matrix::new(
            a2 * a1 + c2 * b1,
            b2 * a1 + d2 * b1,
            a2 * c1 + c2 * d1,
            b2 * c1 + d2 * d1,
            a2 * tx1 + c2 * ty1 + tx2,
            b2 * tx1 + d2 * ty1 + ty2,
        )
    }

    pub fn determinant(&self) -> f32 {
        let [a, b, c, d, _, _] = self.elements;
        a * d - b * c
    }

    /// Inverse matrix, or `None` if the matrix is singular
    pub fn invert(&self) -> Option<Matrix> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let [a, b, c, d, tx, ty] = self.elements;
        Some(Matrix::new(
            d / det,
            -b / det,
            -c / det,
            a / det,
            (c * ty - d * tx) / det,
            (b * tx - a * ty) / det,
        ))
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// The translation component
    pub fn offset(&self) -> Point {
        Point::new(self.elements[4], self.elements[5])
    }

    pub fn remove_translation(&self) -> Matrix {
        let [a, b, c, d, _, _] = self.elements;
        Matrix::new(a, b, c, d, 0.0, 0.0)
    }

    pub fn transform_point(&self, point: Point) -> Point {
        let [a, b, c, d, tx, ty] = self.elements;
        Point::new(a * point.x + c * point.y + tx, b * point.x + d * point.y + ty)
    }

    /// Axis-aligned bounding box of the transformed rect
    pub fn transform_rect(&self, rect: &Rect) -> Rect {
        let corners = rect.corners().map(|p| self.transform_point(p));
        Rect::from_points(&corners)
    }

    /// Size of the bounding box of a `size` rect after transformation,
    /// ignoring translation
    pub fn transform_size(&self, size: Size) -> Size {
        self.remove_translation()
            .transform_rect(&size.to_rect())
            .size()
    }

    /// Largest local-space size which, once transformed, fits inside `bounds`.
    ///
    /// NaN in one dimension of `bounds` is treated as a square constraint;
    /// NaN in both returns an unconstrained size. Singular matrices and
    /// near-zero bounds yield zero.
    pub fn max_local_size(&self, bounds: Size) -> Size {
        let mut x_constr = bounds.width;
        let mut y_constr = bounds.height;

        if is_near(x_constr, 0.0) || is_near(y_constr, 0.0) {
            return Size::ZERO;
        }

        let x_infinite = x_constr.is_nan();
        let y_infinite = y_constr.is_nan();
        if x_infinite && y_infinite {
            return Size::UNCONSTRAINED;
        }
        if x_infinite {
            x_constr = y_constr;
        } else if y_infinite {
            y_constr = x_constr;
        }

        if self.determinant() == 0.0 {
            return Size::ZERO;
        }

        let [a, b, c, d, _, _] = self.elements;
        let (w, h);

        if is_near(b, 0.0) || is_near(c, 0.0) {
            let y_cover_d = if y_infinite {
                f32::INFINITY
            } else {
                (y_constr / d).abs()
            };
            let x_cover_a = if x_infinite {
                f32::INFINITY
            } else {
                (x_constr / a).abs()
            };

            if is_near(b, 0.0) {
                if is_near(c, 0.0) {
                    h = y_cover_d;
                    w = x_cover_a;
                } else {
                    h = (0.5 * (x_constr / c).abs()).min(y_cover_d);
                    w = x_cover_a - (c * h) / a;
                }
            } else {
                w = (0.5 * (y_constr / b).abs()).min(x_cover_a);
                h = y_cover_d - (b * w) / d;
            }
        } else if is_near(a, 0.0) || is_near(d, 0.0) {
            let y_cover_b = (y_constr / b).abs();
            let x_cover_c = (x_constr / c).abs();

            if is_near(a, 0.0) {
                if is_near(d, 0.0) {
                    h = x_cover_c;
                    w = y_cover_b;
                } else {
                    h = (0.5 * (y_constr / d).abs()).min(x_cover_c);
                    w = y_cover_b - (d * h) / b;
                }
            } else {
                w = (0.5 * (x_constr / a).abs()).min(y_cover_b);
                h = x_cover_c - (a * w) / c;
            }
        } else {
            let x_cover_a = (x_constr / a).abs();
            let x_cover_c = (x_constr / c).abs();
            let y_cover_b = (y_constr / b).abs();
            let y_cover_d = (y_constr / d).abs();

            // Area w*h is maximal halfway to the tighter intercepts
            let mut w0 = y_cover_b.min(x_cover_a) * 0.5;
            let mut h0 = x_cover_c.min(y_cover_d) * 0.5;

            let crossing = (x_cover_a >= y_cover_b - 0.01 && x_cover_c <= y_cover_d + 0.01)
                || (x_cover_a <= y_cover_b + 0.01 && x_cover_c >= y_cover_d - 0.01);
            if crossing {
                // Scale up until the transformed shape touches one constraint
                let transformed = self.transform_size(Size::new(w0, h0));
                let expand = (x_constr / transformed.width).min(y_constr / transformed.height);
                if expand.is_finite() {
                    w0 *= expand;
                    h0 *= expand;
                }
            }
            w = w0;
            h = h0;
        }

        Size::new(w, h)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Declarative transforms
// ─────────────────────────────────────────────────────────────────────────────

/// A transform description held by element properties
#[derive(Clone, Debug, PartialEq)]
pub enum Transform {
    Translate { x: f32, y: f32 },
    Scale { x: f32, y: f32, center: Point },
    /// Rotation in degrees, clockwise in screen space
    Rotate { degrees: f32, center: Point },
    Skew { x_degrees: f32, y_degrees: f32, center: Point },
    Matrix(Matrix),
    /// Children applied in order
    Group(Vec<Arc<Transform>>),
}

impl Transform {
    pub fn translate(x: f32, y: f32) -> Self {
        Transform::Translate { x, y }
    }

    pub fn scale(x: f32, y: f32) -> Self {
        Transform::Scale {
            x,
            y,
            center: Point::ZERO,
        }
    }

    pub fn rotate(degrees: f32) -> Self {
        Transform::Rotate {
            degrees,
            center: Point::ZERO,
        }
    }

    /// Resolve to an affine matrix
    pub fn to_matrix(&self) -> Matrix {
        match self {
            Transform::Translate { x, y } => Matrix::translation(*x, *y),
            Transform::Scale { x, y, center } => Matrix::scale(*x, *y).about(*center),
            Transform::Rotate { degrees, center } => {
                Matrix::rotation(degrees.to_radians()).about(*center)
            }
            Transform::Skew {
                x_degrees,
                y_degrees,
                center,
            } => Matrix::skew(x_degrees.to_radians(), y_degrees.to_radians()).about(*center),
            Transform::Matrix(m) => *m,
            Transform::Group(children) => children
                .iter()
                .fold(Matrix::IDENTITY, |acc, child| acc.then(&child.to_matrix())),
        }
    }
}

impl DeepCopy for Transform {
    fn deep_copy(&self, copies: &mut CopyManager) -> Self {
        match self {
            Transform::Group(children) => {
                Transform::Group(children.iter().map(|c| copies.get_copy(c)).collect())
            }
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_point_near(actual: Point, expected: Point) {
        assert!(
            (actual.x - expected.x).abs() < 1e-4 && (actual.y - expected.y).abs() < 1e-4,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_then_applies_self_first() {
        let m = Matrix::translation(10.0, 0.0).then(&Matrix::scale(2.0, 2.0));
        assert_point_near(m.transform_point(Point::ZERO), Point::new(20.0, 0.0));

        let m = Matrix::scale(2.0, 2.0).then(&Matrix::translation(10.0, 0.0));
        assert_point_near(m.transform_point(Point::new(1.0, 1.0)), Point::new(12.0, 2.0));
    }

    #[test]
    fn test_invert() {
        let m = Matrix::rotation(0.7)
            .then(&Matrix::scale(2.0, 3.0))
            .then(&Matrix::translation(5.0, -4.0));
        let inv = m.invert().expect("invertible");
        let p = Point::new(3.0, 7.0);
        assert_point_near(inv.transform_point(m.transform_point(p)), p);

        assert!(Matrix::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn test_about_center() {
        let m = Matrix::scale(2.0, 2.0).about(Point::new(10.0, 10.0));
        assert_point_near(m.transform_point(Point::new(10.0, 10.0)), Point::new(10.0, 10.0));
        assert_point_near(m.transform_point(Point::new(11.0, 10.0)), Point::new(12.0, 10.0));
    }

    #[test]
    fn test_transform_size_of_rotation() {
        let rotate = Matrix::rotation(std::f32::consts::FRAC_PI_2);
        let size = rotate.transform_size(Size::new(100.0, 40.0));
        assert!((size.width - 40.0).abs() < 1e-3);
        assert!((size.height - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_max_local_size_scale() {
        let size = Matrix::scale(2.0, 4.0).max_local_size(Size::new(100.0, 100.0));
        assert!((size.width - 50.0).abs() < 1e-4);
        assert!((size.height - 25.0).abs() < 1e-4);
    }

    #[test]
    fn test_max_local_size_rotation_fits() {
        let m = Matrix::rotation(30f32.to_radians());
        let bounds = Size::new(200.0, 100.0);
        let local = m.max_local_size(bounds);
        assert!(local.width > 0.0 && local.height > 0.0);
        let transformed = m.transform_size(local);
        assert!(transformed.width <= bounds.width + 0.1);
        assert!(transformed.height <= bounds.height + 0.1);
    }

    #[test]
    fn test_max_local_size_edge_cases() {
        let m = Matrix::rotation(0.5);
        assert_eq!(m.max_local_size(Size::new(0.0, 10.0)), Size::ZERO);
        assert!(m.max_local_size(Size::UNCONSTRAINED).width.is_nan());
        assert_eq!(Matrix::scale(0.0, 0.0).max_local_size(Size::new(10.0, 10.0)), Size::ZERO);
    }

    #[test]
    fn test_group_resolves_in_order() {
        let group = Transform::Group(vec![
            Arc::new(Transform::translate(10.0, 0.0)),
            Arc::new(Transform::scale(2.0, 2.0)),
        ]);
        assert_point_near(group.to_matrix().transform_point(Point::ZERO), Point::new(20.0, 0.0));
    }

    #[test]
    fn test_rotate_degrees() {
        let m = Transform::rotate(90.0).to_matrix();
        assert_point_near(m.transform_point(Point::new(1.0, 0.0)), Point::new(0.0, 1.0));
    }
}
