//! Ray casting and closest-element queries.
//!
//! Every face is fan-triangulated from its first vertex and tested with
//! Möller–Trumbore. The nearest hit wins; exact ties go to the lower face id.
//! Picking only reads the mesh, so it can run on a worker thread while no
//! edit is in progress.
//!
//! # Example
//!
//! ```
//! use chisel::mesh::{primitives, HalfEdgeMesh};
//! use chisel::pick::Picker;
//! use nalgebra::{Point3, Vector3};
//!
//! let mesh: HalfEdgeMesh = primitives::triangle().unwrap();
//! let hit = Picker::default().raycast(
//!     &mesh,
//!     Point3::new(0.25, 0.25, 1.0),
//!     Vector3::new(0.0, 0.0, -1.0),
//! );
//! assert!(hit.hit);
//! assert!((hit.distance - 1.0).abs() < 1e-9);
//! ```

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{self, EPSILON};
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// A half-line in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Point3<f64>,
    /// Unit direction.
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Ray from `origin` along `direction`; `None` for a zero direction.
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Option<Self> {
        let len = direction.norm();
        if !len.is_finite() || len < EPSILON {
            return None;
        }
        Some(Self {
            origin,
            direction: direction / len,
        })
    }

    /// Point at distance `t` along the ray.
    #[inline]
    pub fn at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }
}

/// Result of a ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit<I: MeshIndex = u32> {
    /// Whether any face was hit.
    pub hit: bool,
    /// World-space hit point.
    pub point: Point3<f64>,
    /// Distance from the ray origin to the hit point.
    pub distance: f64,
    /// Closest vertex of the hit face, when refinement found one.
    pub vertex: Option<VertexId<I>>,
    /// Closest half-edge of the hit face, when refinement found one.
    pub edge: Option<HalfEdgeId<I>>,
    /// The hit face.
    pub face: Option<FaceId<I>>,
}

impl<I: MeshIndex> RayHit<I> {
    /// A miss.
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Point3::origin(),
            distance: f64::INFINITY,
            vertex: None,
            edge: None,
            face: None,
        }
    }
}

/// Tolerances for closest-element refinement.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PickOptions {
    /// Largest vertex distance that still counts as picking the vertex.
    pub max_vertex_distance: f64,

    /// Largest point-to-segment distance that still counts as picking the edge.
    pub max_edge_distance: f64,

    /// Largest point-to-face distance used by point picking of faces.
    pub max_face_distance: f64,

    /// Whether to sweep faces in parallel (default: true).
    pub parallel: bool,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            max_vertex_distance: 0.1,
            max_edge_distance: 0.05,
            max_face_distance: 0.05,
            parallel: true,
        }
    }
}

impl PickOptions {
    /// Set the vertex tolerance.
    pub fn with_vertex_distance(mut self, d: f64) -> Self {
        self.max_vertex_distance = d.max(0.0);
        self
    }

    /// Set the edge tolerance.
    pub fn with_edge_distance(mut self, d: f64) -> Self {
        self.max_edge_distance = d.max(0.0);
        self
    }

    /// Set the face tolerance.
    pub fn with_face_distance(mut self, d: f64) -> Self {
        self.max_face_distance = d.max(0.0);
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Ray/mesh intersection and closest-element queries.
#[derive(Debug, Clone, Default)]
pub struct Picker {
    /// Refinement tolerances.
    pub options: PickOptions,
}

impl Picker {
    /// Picker with the given tolerances.
    pub fn new(options: PickOptions) -> Self {
        Self { options }
    }

    /// Cast a ray and report the nearest face hit.
    ///
    /// Only `face` is filled in; see [`Picker::raycast_with_refinement`] for
    /// vertex and edge.
    pub fn raycast<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        origin: Point3<f64>,
        direction: Vector3<f64>,
    ) -> RayHit<I> {
        match Ray::new(origin, direction) {
            Some(ray) => self.cast(mesh, &ray),
            None => RayHit::miss(),
        }
    }

    /// Cast a ray, then fill in the closest vertex and edge of the hit face
    /// that lie within the configured tolerances of the hit point.
    pub fn raycast_with_refinement<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        origin: Point3<f64>,
        direction: Vector3<f64>,
    ) -> RayHit<I> {
        let mut hit = self.raycast(mesh, origin, direction);
        let Some(f) = hit.face else {
            return hit;
        };

        hit.vertex = mesh
            .face_vertices(f)
            .map(|v| (v, (mesh.position(v) - hit.point).norm()))
            .filter(|&(_, d)| d <= self.options.max_vertex_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(v, _)| v);

        hit.edge = mesh
            .face_halfedges(f)
            .map(|he| (he, segment_distance(mesh, he, &hit.point)))
            .filter(|&(_, d)| d <= self.options.max_edge_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(he, _)| he);

        hit
    }

    /// Nearest hit of `ray` against every face.
    pub fn cast<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>, ray: &Ray) -> RayHit<I> {
        let faces: Vec<FaceId<I>> = mesh.face_ids().collect();
        let intersect = |&f: &FaceId<I>| intersect_face(mesh, f, ray).map(|t| (t, f));
        let nearest = |a: (f64, FaceId<I>), b: (f64, FaceId<I>)| {
            if b.0 < a.0 || (b.0 == a.0 && b.1 < a.1) {
                b
            } else {
                a
            }
        };

        let best = if self.options.parallel {
            faces
                .par_iter()
                .filter_map(intersect)
                .reduce_with(nearest)
        } else {
            faces.iter().filter_map(intersect).reduce(nearest)
        };

        match best {
            Some((t, f)) => RayHit {
                hit: true,
                point: ray.at(t),
                distance: t,
                vertex: None,
                edge: None,
                face: Some(f),
            },
            None => RayHit::miss(),
        }
    }

    /// Vertex closest to `point` within `max_distance`, with its distance.
    pub fn closest_vertex<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        point: &Point3<f64>,
        max_distance: f64,
    ) -> Option<(VertexId<I>, f64)> {
        mesh.vertices()
            .map(|(v, vertex)| (v, (vertex.position - point).norm()))
            .filter(|&(_, d)| d <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }

    /// Edge closest to `point` within `max_distance`, with its distance.
    ///
    /// Returns the lower-id half of the edge.
    pub fn closest_edge<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        point: &Point3<f64>,
        max_distance: f64,
    ) -> Option<(HalfEdgeId<I>, f64)> {
        mesh.edge_ids()
            .map(|he| (he, segment_distance(mesh, he, point)))
            .filter(|&(_, d)| d <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }

    /// Face closest to `point` within `max_distance`, with its distance.
    pub fn closest_face<I: MeshIndex>(
        &self,
        mesh: &HalfEdgeMesh<I>,
        point: &Point3<f64>,
        max_distance: f64,
    ) -> Option<(FaceId<I>, f64)> {
        mesh.face_ids()
            .map(|f| (f, face_distance(mesh, f, point)))
            .filter(|&(_, d)| d <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
    }
}

fn intersect_face<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, f: FaceId<I>, ray: &Ray) -> Option<f64> {
    let pts = mesh.face_positions(f);
    (1..pts.len().saturating_sub(1))
        .filter_map(|i| {
            geometry::ray_triangle(&ray.origin, &ray.direction, &pts[0], &pts[i], &pts[i + 1])
                .map(|(t, _, _)| t)
        })
        .min_by(f64::total_cmp)
}

fn segment_distance<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, he: HalfEdgeId<I>, p: &Point3<f64>) -> f64 {
    geometry::point_segment_distance(p, mesh.position(mesh.origin(he)), mesh.position(mesh.target(he)))
}

fn face_distance<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, f: FaceId<I>, p: &Point3<f64>) -> f64 {
    let pts = mesh.face_positions(f);
    (1..pts.len().saturating_sub(1))
        .map(|i| geometry::point_triangle_distance(p, &pts[0], &pts[i], &pts[i + 1]))
        .fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{build_from_triangles, primitives};
    use approx::assert_relative_eq;

    #[test]
    fn test_raycast_triangle() {
        let mesh: HalfEdgeMesh = primitives::triangle().unwrap();
        let picker = Picker::default();
        let dir = Vector3::new(0.0, 0.0, -1.0);

        let hit = picker.raycast(&mesh, Point3::new(0.25, 0.25, 1.0), dir);
        assert!(hit.hit);
        assert_eq!(hit.face, Some(FaceId::new(0)));
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-9);
        assert_relative_eq!(hit.point, Point3::new(0.25, 0.25, 0.0), epsilon = 1e-9);

        let miss = picker.raycast(&mesh, Point3::new(2.0, 2.0, 1.0), dir);
        assert!(!miss.hit);
        assert_eq!(miss.face, None);
    }

    #[test]
    fn test_unnormalized_direction() {
        let mesh: HalfEdgeMesh = primitives::triangle().unwrap();
        let hit = Picker::default().raycast(
            &mesh,
            Point3::new(0.25, 0.25, 2.0),
            Vector3::new(0.0, 0.0, -10.0),
        );
        assert_relative_eq!(hit.distance, 2.0, epsilon = 1e-9);

        let none = Picker::default().raycast(&mesh, Point3::origin(), Vector3::zeros());
        assert!(!none.hit);
    }

    #[test]
    fn test_nearest_face_on_cube() {
        let mesh: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        for parallel in [true, false] {
            let picker = Picker::new(PickOptions::default().with_parallel(parallel));
            let hit = picker.raycast(&mesh, Point3::new(0.1, 5.0, 0.2), -Vector3::y());
            assert!(hit.hit);
            assert_eq!(hit.face, Some(FaceId::new(1)));
            assert_relative_eq!(hit.point.y, 0.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_tie_goes_to_lower_face_id() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mesh: HalfEdgeMesh = build_from_triangles(&positions, &[[3, 4, 5], [0, 1, 2]]).unwrap();
        let hit = Picker::default().raycast(&mesh, Point3::new(0.2, 0.2, 1.0), -Vector3::z());
        assert_eq!(hit.face, Some(FaceId::new(0)));
    }

    #[test]
    fn test_refinement_near_corner() {
        let mesh: HalfEdgeMesh = primitives::triangle().unwrap();
        let picker = Picker::default();
        let hit = picker.raycast_with_refinement(
            &mesh,
            Point3::new(0.93, 0.01, 1.0),
            -Vector3::z(),
        );
        assert_eq!(hit.vertex, Some(VertexId::new(1)));
        let edge = hit.edge.unwrap();
        assert_eq!(mesh.origin(edge), VertexId::new(0));
        assert_eq!(mesh.target(edge), VertexId::new(1));

        let center = picker.raycast_with_refinement(&mesh, Point3::new(0.3, 0.3, 1.0), -Vector3::z());
        assert_eq!(center.vertex, None);
        assert_eq!(center.edge, None);
    }

    #[test]
    fn test_closest_elements() {
        let mesh: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let picker = Picker::default();

        let (v, d) = picker
            .closest_vertex(&mesh, &Point3::new(0.55, 0.5, 0.5), 0.1)
            .unwrap();
        assert_eq!(v, VertexId::new(6));
        assert_relative_eq!(d, 0.05, epsilon = 1e-9);
        assert!(picker.closest_vertex(&mesh, &Point3::origin(), 0.1).is_none());

        let (he, d) = picker
            .closest_edge(&mesh, &Point3::new(0.0, -0.52, -0.5), 0.1)
            .unwrap();
        let mut ends = [mesh.origin(he), mesh.target(he)];
        ends.sort();
        assert_eq!(ends, [VertexId::new(0), VertexId::new(1)]);
        assert_relative_eq!(d, 0.02, epsilon = 1e-9);

        let (f, _) = picker
            .closest_face(&mesh, &Point3::new(0.0, 0.51, 0.0), 0.05)
            .unwrap();
        assert_eq!(f, FaceId::new(1));
    }
}
