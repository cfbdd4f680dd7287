//! Loop subdivision for triangle meshes.

use std::f64::consts::PI;

use nalgebra::{Point3, Vector3};
use tracing::warn;

use super::face_table::FaceTable;
use super::{map_indices, SubdivideOptions};
use crate::error::{MeshError, Result};

/// Fail with `NotTriangleMesh` on the first face that is not a triangle.
pub(super) fn require_triangles(faces: &[Vec<usize>]) -> Result<()> {
    match faces.iter().position(|f| f.len() != 3) {
        Some(face) => {
            warn!(face, degree = faces[face].len(), "scheme needs a triangle mesh");
            Err(MeshError::NotTriangleMesh { face })
        }
        None => Ok(()),
    }
}

/// Loop's interior vertex weight for valence `n`.
///
/// `β = (5/8 - (3/8 + cos(2π/n)/4)²) / n`, which is 3/16 at `n = 3`.
pub fn loop_beta(n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let c = 3.0 / 8.0 + (2.0 * PI / n).cos() / 4.0;
    (5.0 / 8.0 - c * c) / n
}

/// One level of Loop subdivision.
///
/// # Vertex Rules
///
/// - **Interior edge vertex**: `3/8 * (v0 + v1) + 1/8 * (v_left + v_right)`
/// - **Boundary edge vertex**: `1/2 * (v0 + v1)`
/// - **Interior vertex**: `(1 - n*β) * v + β * Σ(neighbors)`
/// - **Boundary vertex**: `1/8 * (left + right) + 3/4 * v`, or fixed when
///   boundaries are preserved
///
/// Each triangle `(v0, v1, v2)` becomes `(v0, e01, e20)`, `(v1, e12, e01)`,
/// `(v2, e20, e12)` and `(e01, e12, e20)`.
pub(super) fn subdivide_once(
    positions: &[Point3<f64>],
    faces: &[Vec<usize>],
    table: &FaceTable,
    options: &SubdivideOptions,
) -> Result<(Vec<Point3<f64>>, Vec<Vec<usize>>)> {
    require_triangles(faces)?;

    let edge_points: Vec<Point3<f64>> = map_indices(table.edges.len(), options.parallel, |e| {
        let edge = &table.edges[e];
        let [a, b] = edge.ends;
        match edge.right {
            Some(right) => {
                let c = opposite(&faces[edge.left], a, b);
                let d = opposite(&faces[right], a, b);
                Point3::from(
                    (positions[a].coords + positions[b].coords) * (3.0 / 8.0)
                        + (positions[c].coords + positions[d].coords) * (1.0 / 8.0),
                )
            }
            None => Point3::from((positions[a].coords + positions[b].coords) * 0.5),
        }
    });

    let vertex_points: Vec<Point3<f64>> = map_indices(positions.len(), options.parallel, |v| {
        let pos = positions[v];
        let edges = &table.vertex_edges[v];
        if edges.is_empty() {
            return pos;
        }
        if table.is_boundary_vertex(v) {
            let rim = table.boundary_neighbors(v);
            if options.preserve_boundary || rim.len() != 2 {
                return pos;
            }
            return Point3::from(
                pos.coords * 0.75 + (positions[rim[0]].coords + positions[rim[1]].coords) * 0.125,
            );
        }
        let n = edges.len();
        let beta = loop_beta(n);
        let sum: Vector3<f64> = edges
            .iter()
            .map(|&e| positions[table.edges[e].other(v)].coords)
            .sum();
        Point3::from(pos.coords * (1.0 - n as f64 * beta) + sum * beta)
    });

    Ok(split_triangles(vertex_points, edge_points, faces, table))
}

/// The vertex of triangle `tri` that is neither `a` nor `b`.
pub(super) fn opposite(tri: &[usize], a: usize, b: usize) -> usize {
    tri.iter().copied().find(|&x| x != a && x != b).unwrap_or(a)
}

/// Assemble the 1-to-4 triangle split shared by Loop and Butterfly.
pub(super) fn split_triangles(
    vertex_points: Vec<Point3<f64>>,
    edge_points: Vec<Point3<f64>>,
    faces: &[Vec<usize>],
    table: &FaceTable,
) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let base = vertex_points.len();
    let mut positions = vertex_points;
    positions.extend(edge_points);

    let edge_vertex = |a: usize, b: usize| base + table.edge(a, b).unwrap_or_default();
    let mut new_faces = Vec::with_capacity(faces.len() * 4);
    for tri in faces {
        let (v0, v1, v2) = (tri[0], tri[1], tri[2]);
        let e01 = edge_vertex(v0, v1);
        let e12 = edge_vertex(v1, v2);
        let e20 = edge_vertex(v2, v0);
        new_faces.push(vec![v0, e01, e20]);
        new_faces.push(vec![v1, e12, e01]);
        new_faces.push(vec![v2, e20, e12]);
        new_faces.push(vec![e01, e12, e20]);
    }
    (positions, new_faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::subdivide::{subdivide, SubdivisionScheme};
    use crate::geometry::EPSILON;
    use crate::mesh::{primitives, HalfEdgeMesh, VertexId};
    use approx::assert_relative_eq;

    fn options(levels: usize) -> SubdivideOptions {
        SubdivideOptions::new(levels).with_scheme(SubdivisionScheme::Loop)
    }

    #[test]
    fn test_beta() {
        assert_relative_eq!(loop_beta(3), 3.0 / 16.0, epsilon = 1e-12);
        // Valence 6 is the regular case: β = 1/16.
        assert_relative_eq!(loop_beta(6), 1.0 / 16.0, epsilon = 1e-12);
        assert_eq!(loop_beta(0), 0.0);
    }

    #[test]
    fn test_tetrahedron() {
        let tet: HalfEdgeMesh = primitives::tetrahedron(1.0).unwrap();
        let out = subdivide(&tet, &options(1)).unwrap();
        assert_eq!(out.num_vertices(), 10);
        assert_eq!(out.num_edges(), 24);
        assert_eq!(out.num_faces(), 16);
        assert!(out.is_triangle_mesh());
        assert!(out.is_closed());
        assert!(out.validate().is_ok());

        let two = subdivide(&tet, &options(2)).unwrap();
        assert_eq!(two.num_faces(), 64);
        assert_eq!(two.euler_characteristic(), 2);
    }

    #[test]
    fn test_vertex_rule_on_tetrahedron() {
        let tet: HalfEdgeMesh = primitives::tetrahedron(2.0).unwrap();
        let out = subdivide(&tet, &options(1).sequential()).unwrap();
        // v' = (1 - 3β) v + β Σ n with β = 3/16; the neighbors of (1,1,1)
        // sum to (-1,-1,-1).
        let expected = (1.0 - 9.0 / 16.0) - 3.0 / 16.0;
        let p = out.position(VertexId::new(0));
        assert_relative_eq!(p.x, expected, epsilon = EPSILON);
        assert_relative_eq!(p.y, expected, epsilon = EPSILON);
    }

    #[test]
    fn test_boundary_rules() {
        let tri: HalfEdgeMesh = primitives::triangle().unwrap();
        let fixed = subdivide(&tri, &options(1).with_preserve_boundary(true)).unwrap();
        assert_eq!(*fixed.position(VertexId::new(1)), Point3::new(1.0, 0.0, 0.0));
        assert_eq!(fixed.num_faces(), 4);

        let smooth = subdivide(&tri, &options(1)).unwrap();
        let p = smooth.position(VertexId::new(1));
        assert_relative_eq!(p.x, 0.75, epsilon = EPSILON);
        assert_relative_eq!(p.y, 0.125, epsilon = EPSILON);
        // Boundary edge points are midpoints.
        let e = smooth.position(VertexId::new(3));
        assert_relative_eq!(e.x, 0.5, epsilon = EPSILON);
    }

    #[test]
    fn test_quads_are_refused() {
        let cube: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let err = subdivide(&cube, &options(1)).unwrap_err();
        assert!(matches!(err, MeshError::NotTriangleMesh { face: 0 }));
        assert_eq!(err.kind(), crate::error::ErrorKind::Precondition);
    }
}
