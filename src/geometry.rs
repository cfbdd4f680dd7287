//! Geometric constants and primitives shared by the mesh and its operators.
//!
//! Coordinates are right-handed with +Y up. All world-space comparisons use
//! [`EPSILON`]; ray/triangle intersection uses the tighter [`RAY_EPSILON`].

use nalgebra::{Point3, Vector3};

/// World up axis.
pub const WORLD_UP: Vector3<f64> = Vector3::new(0.0, 1.0, 0.0);

/// World forward axis.
pub const WORLD_FORWARD: Vector3<f64> = Vector3::new(0.0, 0.0, -1.0);

/// World right axis.
pub const WORLD_RIGHT: Vector3<f64> = Vector3::new(1.0, 0.0, 0.0);

/// Tolerance for world-space geometric comparisons.
pub const EPSILON: f64 = 1e-6;

/// Tolerance for the Möller–Trumbore determinant and hit distance.
pub const RAY_EPSILON: f64 = 1e-8;

/// Unnormalized polygon normal by Newell's method.
///
/// The length of the result is twice the polygon's area for planar polygons.
pub fn newell_vector(points: &[Point3<f64>]) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    let len = points.len();
    for i in 0..len {
        let cur = &points[i];
        let next = &points[(i + 1) % len];
        n.x += (cur.y - next.y) * (cur.z + next.z);
        n.y += (cur.z - next.z) * (cur.x + next.x);
        n.z += (cur.x - next.x) * (cur.y + next.y);
    }
    n
}

/// Unit polygon normal by Newell's method, or `None` for degenerate polygons.
pub fn newell_normal(points: &[Point3<f64>]) -> Option<Vector3<f64>> {
    let n = newell_vector(points);
    let len = n.norm();
    if len < EPSILON * EPSILON {
        None
    } else {
        Some(n / len)
    }
}

/// Average of a set of points. Returns the origin for an empty slice.
pub fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    if points.is_empty() {
        return Point3::origin();
    }
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Point3::from(sum / points.len() as f64)
}

/// Area of a polygon.
///
/// Triangles use `½‖e₁×e₂‖`; larger polygons are fan-triangulated from their
/// centroid and the triangle areas summed.
pub fn polygon_area(points: &[Point3<f64>]) -> f64 {
    match points.len() {
        0..=2 => 0.0,
        3 => triangle_area(&points[0], &points[1], &points[2]),
        n => {
            let c = centroid(points);
            (0..n)
                .map(|i| triangle_area(&c, &points[i], &points[(i + 1) % n]))
                .sum()
        }
    }
}

/// Area of a triangle.
#[inline]
pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    0.5 * (b - a).cross(&(c - a)).norm()
}

/// Normalize `v`, substituting `fallback` when `v` is too short.
#[inline]
pub fn normalize_or(v: Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    let len = v.norm();
    if len < EPSILON {
        fallback
    } else {
        v / len
    }
}

/// Ray/triangle intersection (Möller–Trumbore).
///
/// Returns `(t, u, v)` with `t` the ray parameter of the hit and `(u, v)` the
/// barycentric coordinates relative to `b` and `c`. Hits with `t <= RAY_EPSILON`
/// are rejected.
pub fn ray_triangle(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<(f64, f64, f64)> {
    let e1 = b - a;
    let e2 = c - a;
    let p = direction.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < RAY_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = origin - a;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = direction.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&q) * inv_det;
    if t > RAY_EPSILON {
        Some((t, u, v))
    } else {
        None
    }
}

/// Closest point on segment `[a, b]` to `p`, with its clamped parameter.
pub fn closest_point_on_segment(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
) -> (Point3<f64>, f64) {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < EPSILON * EPSILON {
        return (*a, 0.0);
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Distance from `p` to the segment `[a, b]`.
#[inline]
pub fn point_segment_distance(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let (q, _) = closest_point_on_segment(p, a, b);
    (p - q).norm()
}

/// Distance from `p` to the triangle `(a, b, c)`.
pub fn point_triangle_distance(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> f64 {
    let n = (b - a).cross(&(c - a));
    let n_len = n.norm();
    if n_len > EPSILON * EPSILON {
        let n = n / n_len;
        let dist = (p - a).dot(&n);
        let q = p - n * dist;
        // Inside test by consistent orientation of the sub-triangles.
        let c0 = (b - a).cross(&(q - a)).dot(&n);
        let c1 = (c - b).cross(&(q - b)).dot(&n);
        let c2 = (a - c).cross(&(q - c)).dot(&n);
        if c0 >= 0.0 && c1 >= 0.0 && c2 >= 0.0 {
            return dist.abs();
        }
    }
    point_segment_distance(p, a, b)
        .min(point_segment_distance(p, b, c))
        .min(point_segment_distance(p, c, a))
}

/// Angle between two face normals in radians (0 for coplanar faces).
#[inline]
pub fn dihedral_angle(n1: &Vector3<f64>, n2: &Vector3<f64>) -> f64 {
    n1.dot(n2).clamp(-1.0, 1.0).acos()
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Aabb {
    /// The box spanned by two arbitrary corners.
    pub fn from_corners(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// The smallest box containing all points, or `None` for no points.
    pub fn from_points<'a, T>(points: T) -> Option<Self>
    where
        T: IntoIterator<Item = &'a Point3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bb = Self { min: first, max: first };
        for p in iter {
            for i in 0..3 {
                bb.min[i] = bb.min[i].min(p[i]);
                bb.max[i] = bb.max[i].max(p[i]);
            }
        }
        Some(bb)
    }

    /// Whether `p` lies inside the box (inclusive, with [`EPSILON`] slack).
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - EPSILON && p[i] <= self.max[i] + EPSILON)
    }

    /// Center of the box.
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Edge lengths of the box.
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }
}
