use nalgebra::{Matrix3, Point2, Vector3};

/// Planar projective transform, `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new((v.x / v.z) as f32, (v.y / v.z) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }
}

/// Map from the unit square `(0,0) (1,0) (1,1) (0,1)` onto `quad`.
///
/// Closed form for the square-to-quadrilateral case; parallelograms come
/// out with a zero projective row. `None` when three corners are collinear.
fn unit_square_to(quad: &[Point2<f32>; 4]) -> Option<Matrix3<f64>> {
    let [x0, x1, x2, x3] = quad.map(|p| p.x as f64);
    let [y0, y1, y2, y3] = quad.map(|p| p.y as f64);

    let skew_x = x0 - x1 + x2 - x3;
    let skew_y = y0 - y1 + y2 - y3;
    let (ex1, ex2) = (x1 - x2, x3 - x2);
    let (ey1, ey2) = (y1 - y2, y3 - y2);

    let den = ex1 * ey2 - ex2 * ey1;
    if den.abs() < 1e-12 {
        return None;
    }
    let g = (skew_x * ey2 - ex2 * skew_y) / den;
    let h = (ex1 * skew_y - skew_x * ey1) / den;

    Some(Matrix3::new(
        x1 - x0 + g * x1, x3 - x0 + h * x3, x0, //
        y1 - y0 + g * y1, y3 - y0 + h * y3, y0, //
        g, h, 1.0,
    ))
}

/// Compute H such that `dst ~ H * src` from four correspondences.
///
/// Both quads are routed through the unit square, so corner order must
/// match between `src` and `dst`. Returns `None` for degenerate input.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let to_src = unit_square_to(src)?;
    let to_dst = unit_square_to(dst)?;
    let h = to_dst * to_src.try_inverse()?;

    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 || h.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(Homography::new(h / scale))
}
