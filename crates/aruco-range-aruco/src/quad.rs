//! Candidate quad extraction from a dark mask.
//!
//! Pipeline: 4-connected dark components → boundary pixels → convex hull →
//! four extreme hull points → optional edge line fits whose pairwise
//! intersections become the refined corners.

use std::collections::VecDeque;

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// How quad corners are refined after the hull fit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerRefinement {
    /// Use the extreme hull pixels as corners.
    None,
    /// Fit a line to the boundary pixels of each edge and intersect them.
    #[default]
    Lines,
}

/// Settings for quad extraction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuadParams {
    /// Smallest accepted quad side, in pixels.
    pub min_side_px: f32,
    /// Largest accepted boundary length relative to the image perimeter.
    pub max_perimeter_rel: f32,
    /// Components closer than this to the image border are dropped.
    pub min_distance_to_border: usize,
    /// Minimum ratio between quad area and hull area.
    pub min_hull_fill: f32,
    pub refinement: CornerRefinement,
}

impl Default for QuadParams {
    fn default() -> Self {
        Self {
            min_side_px: 12.0,
            max_perimeter_rel: 4.0,
            min_distance_to_border: 5,
            min_hull_fill: 0.85,
            refinement: CornerRefinement::Lines,
        }
    }
}

/// A quad candidate with corners ordered clockwise as seen in the image.
#[derive(Clone, Debug)]
pub(crate) struct Quad {
    pub corners: [Point2<f32>; 4],
}

/// Extract quad candidates from a row-major dark mask.
pub(crate) fn find_quads(mask: &[bool], width: usize, height: usize, params: &QuadParams) -> Vec<Quad> {
    let mut out = Vec::new();
    if width == 0 || height == 0 || mask.len() != width * height {
        return out;
    }

    let max_boundary = (params.max_perimeter_rel * 2.0 * (width + height) as f32) as usize;
    let margin = params.min_distance_to_border;

    let mut visited = vec![false; width * height];
    let mut queue = VecDeque::new();
    let mut pixels: Vec<(usize, usize)> = Vec::new();

    for y0 in 0..height {
        for x0 in 0..width {
            let idx0 = y0 * width + x0;
            if visited[idx0] || !mask[idx0] {
                continue;
            }

            pixels.clear();
            visited[idx0] = true;
            queue.push_back((x0, y0));
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);

            while let Some((x, y)) = queue.pop_front() {
                pixels.push((x, y));
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                for (nx, ny) in neighbours4(x, y, width, height) {
                    let nidx = ny * width + nx;
                    if !visited[nidx] && mask[nidx] {
                        visited[nidx] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }

            let bw = (max_x - min_x + 1) as f32;
            let bh = (max_y - min_y + 1) as f32;
            if bw < params.min_side_px || bh < params.min_side_px {
                continue;
            }
            if min_x < margin || min_y < margin || max_x + margin >= width || max_y + margin >= height
            {
                continue;
            }

            let boundary: Vec<Point2<i32>> = pixels
                .iter()
                .filter(|&&(x, y)| is_boundary(mask, x, y, width, height))
                .map(|&(x, y)| Point2::new(x as i32, y as i32))
                .collect();
            if boundary.len() < 4 * params.min_side_px as usize || boundary.len() > max_boundary {
                continue;
            }

            if let Some(quad) = quad_from_boundary(&boundary, params) {
                out.push(quad);
            }
        }
    }

    out
}

fn neighbours4(
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> impl Iterator<Item = (usize, usize)> {
    let left = x.checked_sub(1).map(|nx| (nx, y));
    let right = (x + 1 < width).then_some((x + 1, y));
    let up = y.checked_sub(1).map(|ny| (x, ny));
    let down = (y + 1 < height).then_some((x, y + 1));
    [left, right, up, down].into_iter().flatten()
}

fn is_boundary(mask: &[bool], x: usize, y: usize, width: usize, height: usize) -> bool {
    if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
        return true;
    }
    neighbours4(x, y, width, height).any(|(nx, ny)| !mask[ny * width + nx])
}

fn quad_from_boundary(boundary: &[Point2<i32>], params: &QuadParams) -> Option<Quad> {
    let hull = convex_hull(boundary);
    if hull.len() < 4 {
        return None;
    }
    let hull_area = polygon_area(&hull.iter().map(to_f32).collect::<Vec<_>>()).abs();

    let coarse = extreme_quad(&hull)?;
    let quad_area = polygon_area(&coarse);
    if quad_area <= 0.0 || quad_area < params.min_hull_fill * hull_area {
        return None;
    }

    let corners = match params.refinement {
        CornerRefinement::None => coarse,
        CornerRefinement::Lines => refine_with_lines(&coarse, boundary).unwrap_or(coarse),
    };

    if !is_convex_clockwise(&corners) {
        return None;
    }
    for i in 0..4 {
        if (corners[(i + 1) % 4] - corners[i]).norm() < params.min_side_px {
            return None;
        }
    }

    Some(Quad { corners })
}

#[inline]
fn to_f32(p: &Point2<i32>) -> Point2<f32> {
    Point2::new(p.x as f32, p.y as f32)
}

#[inline]
fn cross_i(o: Point2<i32>, a: Point2<i32>, b: Point2<i32>) -> i64 {
    (a.x - o.x) as i64 * (b.y - o.y) as i64 - (a.y - o.y) as i64 * (b.x - o.x) as i64
}

/// Andrew's monotone chain; returns the hull without repeated end point.
pub(crate) fn convex_hull(points: &[Point2<i32>]) -> Vec<Point2<i32>> {
    let mut pts: Vec<Point2<i32>> = points.to_vec();
    pts.sort_unstable_by(|a, b| (a.x, a.y).cmp(&(b.x, b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point2<i32>> = Vec::with_capacity(2 * pts.len());
    for &p in &pts {
        while hull.len() >= 2 && cross_i(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross_i(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// Shoelace area; positive for clockwise order in image (y-down) coordinates.
fn polygon_area(poly: &[Point2<f32>]) -> f32 {
    let n = poly.len();
    let mut acc = 0.0f32;
    for i in 0..n {
        let a = poly[i];
        let b = poly[(i + 1) % n];
        acc += a.x * b.y - b.x * a.y;
    }
    0.5 * acc
}

/// Four hull points spanning the largest quad, ordered clockwise.
fn extreme_quad(hull: &[Point2<i32>]) -> Option<[Point2<f32>; 4]> {
    let pts: Vec<Point2<f32>> = hull.iter().map(to_f32).collect();
    let n = pts.len() as f32;
    let centroid = Point2::from(pts.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n);

    let far = |from: Point2<f32>| {
        pts.iter()
            .copied()
            .max_by(|a, b| (*a - from).norm_squared().total_cmp(&(*b - from).norm_squared()))
    };
    let c0 = far(centroid)?;
    let c2 = far(c0)?;
    let axis = c2 - c0;
    if axis.norm_squared() < 1.0 {
        return None;
    }

    let side = |p: &Point2<f32>| axis.x * (p.y - c0.y) - axis.y * (p.x - c0.x);
    let c1 = pts.iter().copied().max_by(|a, b| side(a).total_cmp(&side(b)))?;
    let c3 = pts.iter().copied().min_by(|a, b| side(a).total_cmp(&side(b)))?;
    if side(&c1) <= 0.0 || side(&c3) >= 0.0 {
        return None;
    }

    let mut quad = [c0, c1, c2, c3];
    if polygon_area(&quad) < 0.0 {
        quad.swap(1, 3);
    }
    Some(quad)
}

fn is_convex_clockwise(q: &[Point2<f32>; 4]) -> bool {
    (0..4).all(|i| {
        let a = q[i];
        let b = q[(i + 1) % 4];
        let c = q[(i + 2) % 4];
        let ab = b - a;
        let bc = c - b;
        ab.x * bc.y - ab.y * bc.x > 0.0
    })
}

/// Line through `point` with unit `dir`.
#[derive(Clone, Copy, Debug)]
struct Line {
    point: Point2<f32>,
    dir: Vector2<f32>,
}

fn fit_line(points: &[Point2<f32>]) -> Option<Line> {
    if points.len() < 3 {
        return None;
    }
    let n = points.len() as f32;
    let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n;
    let (mut sxx, mut sxy, mut syy) = (0.0f32, 0.0f32, 0.0f32);
    for p in points {
        let d = p.coords - mean;
        sxx += d.x * d.x;
        sxy += d.x * d.y;
        syy += d.y * d.y;
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    Some(Line {
        point: Point2::from(mean),
        dir: Vector2::new(theta.cos(), theta.sin()),
    })
}

fn intersect(a: &Line, b: &Line) -> Option<Point2<f32>> {
    let denom = a.dir.x * b.dir.y - a.dir.y * b.dir.x;
    if denom.abs() < 1e-4 {
        return None;
    }
    let d = b.point - a.point;
    let t = (d.x * b.dir.y - d.y * b.dir.x) / denom;
    Some(a.point + a.dir * t)
}

/// Refit each edge on its outer contour, pushed half a pixel outwards so
/// the line sits on the dark/light transition.
///
/// Wide dark borders can leave low-contrast holes in the mask. Their
/// boundary pixels lie inside the marker, so for every pixel step along an
/// edge only the outermost boundary pixel is kept.
fn refine_with_lines(coarse: &[Point2<f32>; 4], boundary: &[Point2<i32>]) -> Option<[Point2<f32>; 4]> {
    let centroid = Point2::from(coarse.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / 4.0);
    let mut lines = [Line {
        point: Point2::origin(),
        dir: Vector2::zeros(),
    }; 4];
    let mut outermost: Vec<Option<(f32, Point2<f32>)>> = Vec::new();
    let mut support = Vec::new();

    for (i, line) in lines.iter_mut().enumerate() {
        let a = coarse[i];
        let b = coarse[(i + 1) % 4];
        let edge = b - a;
        let len = edge.norm();
        if len < 1.0 {
            return None;
        }
        let dir = edge / len;
        let mut outward = Vector2::new(-dir.y, dir.x);
        if outward.dot(&(a - centroid)) < 0.0 {
            outward = -outward;
        }
        let band = (0.05 * len).max(1.5);

        outermost.clear();
        outermost.resize(len.ceil() as usize + 1, None);
        for p in boundary {
            let q = to_f32(p);
            let along = (q - a).dot(&dir);
            if !(0.1 * len..=0.9 * len).contains(&along) {
                continue;
            }
            let out = (q - a).dot(&outward);
            if out.abs() > band {
                continue;
            }
            let slot = &mut outermost[along.round() as usize];
            if slot.map_or(true, |(best, _)| out > best) {
                *slot = Some((out, q));
            }
        }
        support.clear();
        support.extend(outermost.iter().flatten().map(|&(_, q)| q));

        let mut fitted = fit_line(&support)?;
        let mut normal = Vector2::new(-fitted.dir.y, fitted.dir.x);
        if normal.dot(&(fitted.point - centroid)) < 0.0 {
            normal = -normal;
        }
        fitted.point += normal * 0.5;
        *line = fitted;
    }

    let mut refined = [Point2::origin(); 4];
    for (i, corner) in refined.iter_mut().enumerate() {
        let prev = &lines[(i + 3) % 4];
        let next = &lines[i];
        let p = intersect(prev, next)?;
        // Keep the refinement local to the coarse corner.
        if (p - coarse[i]).norm() > 0.1 * (coarse[(i + 1) % 4] - coarse[i]).norm() + 2.0 {
            return None;
        }
        *corner = p;
    }
    Some(refined)
}
