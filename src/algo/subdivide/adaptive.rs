//! Adaptive subdivision driven by face area.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::geometry::centroid;
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// Options for [`subdivide_adaptive`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AdaptiveOptions {
    /// Faces with a larger area are split.
    pub error_threshold: f64,

    /// Upper bound on refinement passes.
    pub max_iterations: usize,

    /// Refuse a pass that would produce more faces than this.
    pub max_faces: usize,
}

impl Default for AdaptiveOptions {
    fn default() -> Self {
        Self {
            error_threshold: 0.1,
            max_iterations: 8,
            max_faces: 1_000_000,
        }
    }
}

impl AdaptiveOptions {
    /// Options with the given area threshold.
    pub fn new(error_threshold: f64) -> Self {
        Self {
            error_threshold,
            ..Self::default()
        }
    }

    /// Set the pass limit.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the face limit.
    pub fn with_max_faces(mut self, max_faces: usize) -> Self {
        self.max_faces = max_faces;
        self
    }
}

/// Split every face whose area exceeds the threshold, repeating until no
/// face does or the pass limit is reached.
///
/// A split face of degree `k` becomes `k` quads around its centroid. Its
/// edges are split at their midpoints, so neighbors that are not split
/// gain the midpoints as extra corners and no T-junctions appear.
///
/// The input is not modified.
pub fn subdivide_adaptive<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, options: &AdaptiveOptions) -> Result<HalfEdgeMesh<I>> {
    subdivide_adaptive_with_progress(mesh, options, &Progress::none())
}

/// [`subdivide_adaptive`] with one progress report per pass.
pub fn subdivide_adaptive_with_progress<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    options: &AdaptiveOptions,
    progress: &Progress,
) -> Result<HalfEdgeMesh<I>> {
    if !(options.error_threshold.is_finite() && options.error_threshold > 0.0) {
        return Err(MeshError::invalid_param(
            "error_threshold",
            options.error_threshold,
            "must be positive",
        ));
    }
    if mesh.num_faces() == 0 {
        warn!("cannot subdivide a mesh without faces");
        return Err(MeshError::EmptyMesh);
    }

    let mut result = mesh.clone();
    let mut passes = 0;
    for pass in 0..options.max_iterations {
        progress.report(pass, options.max_iterations, "adaptive subdivision");
        let large: Vec<FaceId<I>> = result
            .face_ids()
            .filter(|&f| result.face_area(f) > options.error_threshold)
            .collect();
        if large.is_empty() {
            break;
        }

        let added: usize = large.iter().map(|&f| result.face_degree(f) - 1).sum();
        let projected = result.num_faces() + added;
        if projected > options.max_faces {
            warn!(projected, max = options.max_faces, "adaptive pass refused");
            return Err(MeshError::MeshTooLarge {
                current: result.num_faces(),
                projected,
                max: options.max_faces,
            });
        }

        refine(&mut result, &large)?;
        passes += 1;
        debug!(pass, split = large.len(), faces = result.num_faces(), "adaptive pass");
    }
    progress.report(options.max_iterations, options.max_iterations, "adaptive subdivision");

    result.update_normals();
    info!(passes, faces = result.num_faces(), "adaptive subdivision finished");
    Ok(result)
}

/// One pass: split the edges of `large`, then fan each face into quads.
fn refine<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, large: &[FaceId<I>]) -> Result<()> {
    let corners: Vec<Vec<VertexId<I>>> = large.iter().map(|&f| mesh.face_vertices(f).collect()).collect();

    let mut seen = HashSet::new();
    let mut to_split: Vec<HalfEdgeId<I>> = Vec::new();
    for &f in large {
        for he in mesh.face_halfedges(f) {
            if seen.insert(mesh.edge_key(he)) {
                to_split.push(he);
            }
        }
    }

    let mut midpoints: HashMap<(VertexId<I>, VertexId<I>), VertexId<I>> = HashMap::new();
    for he in to_split {
        let (a, b) = (mesh.origin(he), mesh.target(he));
        let (m, _) = mesh.split_edge(he, 0.5)?;
        midpoints.insert(edge_key(a, b), m);
    }

    for (&f, ring) in large.iter().zip(&corners) {
        let (selected, marked) = (mesh[f].selected, mesh[f].marked);
        let points: Vec<_> = ring.iter().map(|&v| *mesh.position(v)).collect();
        let center = mesh.add_vertex(centroid(&points));
        mesh.remove_face(f);

        let k = ring.len();
        let mids = (0..k)
            .map(|i| midpoints.get(&edge_key(ring[i], ring[(i + 1) % k])).copied())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| MeshError::DegenerateGeometry("face side was not split".into()))?;
        for i in 0..k {
            let quad = mesh.create_quad_face(ring[i], mids[i], center, mids[(i + k - 1) % k])?;
            mesh[quad].selected = selected;
            mesh[quad].marked = marked;
        }
    }
    Ok(())
}

fn edge_key<I: MeshIndex>(a: VertexId<I>, b: VertexId<I>) -> (VertexId<I>, VertexId<I>) {
    if a.index() <= b.index() {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives;
    use approx::assert_relative_eq;

    #[test]
    fn test_splits_only_large_faces() {
        let positions = [
            nalgebra::Point3::new(0.0, 0.0, 0.0),
            nalgebra::Point3::new(2.0, 0.0, 0.0),
            nalgebra::Point3::new(2.0, 2.0, 0.0),
            nalgebra::Point3::new(0.0, 2.0, 0.0),
            nalgebra::Point3::new(2.5, 0.0, 0.0),
            nalgebra::Point3::new(2.5, 2.0, 0.0),
        ];
        // A 2x2 quad next to a thin 0.5x2 strip.
        let faces = [vec![0, 1, 2, 3], vec![1, 4, 5, 2]];
        let mesh: HalfEdgeMesh = crate::mesh::build_from_polygons(&positions, &faces).unwrap();
        let out = subdivide_adaptive(&mesh, &AdaptiveOptions::new(1.5).with_max_iterations(1)).unwrap();

        assert_eq!(out.num_faces(), 5);
        assert!(out.validate().is_ok());
        assert_relative_eq!(out.surface_area(), mesh.surface_area(), epsilon = 1e-9);
        // The strip gained the midpoint of the shared edge.
        let strip = FaceId::new(1);
        assert_eq!(out.face_degree(strip), 5);
        assert_eq!(mesh.num_faces(), 2);
    }

    #[test]
    fn test_converges_below_threshold() {
        let quad: HalfEdgeMesh = primitives::quad(2.0).unwrap();
        let out = subdivide_adaptive(&quad, &AdaptiveOptions::new(0.3)).unwrap();
        // 4 -> 1 -> 0.25: two passes.
        assert_eq!(out.num_faces(), 16);
        assert!(out.face_ids().all(|f| out.face_area(f) <= 0.3));
        assert_eq!(out.euler_characteristic(), 1);
    }

    #[test]
    fn test_cube_stays_closed() {
        let cube: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        // Faces of area 4, then 1, then 0.25.
        let out = subdivide_adaptive(&cube, &AdaptiveOptions::new(0.5)).unwrap();
        assert_eq!(out.num_faces(), 96);
        assert!(out.is_closed());
        assert!(out.is_manifold());
        assert_eq!(out.euler_characteristic(), 2);
    }

    #[test]
    fn test_pass_limit() {
        let quad: HalfEdgeMesh = primitives::quad(2.0).unwrap();
        let out = subdivide_adaptive(&quad, &AdaptiveOptions::new(1e-3).with_max_iterations(1)).unwrap();
        assert_eq!(out.num_faces(), 4);
    }

    #[test]
    fn test_rejects_bad_input() {
        let quad: HalfEdgeMesh = primitives::quad(2.0).unwrap();
        assert!(subdivide_adaptive(&quad, &AdaptiveOptions::new(0.0)).is_err());
        let limited = AdaptiveOptions::new(1e-3).with_max_faces(10);
        assert!(matches!(
            subdivide_adaptive(&quad, &limited),
            Err(MeshError::MeshTooLarge { .. })
        ));
        let empty: HalfEdgeMesh = HalfEdgeMesh::new();
        assert!(matches!(
            subdivide_adaptive(&empty, &AdaptiveOptions::default()),
            Err(MeshError::EmptyMesh)
        ));
    }
}
