//! Modified Butterfly subdivision.

use std::f64::consts::PI;

use nalgebra::{Point3, Vector3};

use super::face_table::FaceTable;
use super::loop_subdivision::{opposite, require_triangles, split_triangles};
use super::{map_indices, SubdivideOptions};
use crate::error::Result;

/// Weights of the extraordinary stencil for valence `k`, starting at the
/// opposite end of the edge. The vertex itself takes `3/4`.
pub fn extraordinary_weights(k: usize) -> Vec<f64> {
    match k {
        3 => vec![5.0 / 12.0, -1.0 / 12.0, -1.0 / 12.0],
        4 => vec![3.0 / 8.0, 0.0, -1.0 / 8.0, 0.0],
        _ => {
            let kf = k as f64;
            (0..k)
                .map(|j| {
                    let t = 2.0 * PI * j as f64 / kf;
                    (0.25 + t.cos() + 0.5 * (2.0 * t).cos()) / kf
                })
                .collect()
        }
    }
}

/// One level of Modified Butterfly.
///
/// Original vertices keep their position. Edge points use:
///
/// - **Both ends of valence 6**: `1/2 (a + b) + 1/8 (c + d) - 1/16 (wings)`
/// - **One extraordinary end**: that end's stencil
/// - **Two extraordinary ends**: the average of both stencils
/// - **Boundary edge**: the midpoint
///
/// Where a stencil would reach past the boundary the Loop edge mask is used.
pub(super) fn subdivide_once(
    positions: &[Point3<f64>],
    faces: &[Vec<usize>],
    table: &FaceTable,
    options: &SubdivideOptions,
) -> Result<(Vec<Point3<f64>>, Vec<Vec<usize>>)> {
    require_triangles(faces)?;

    let edge_points: Vec<Point3<f64>> = map_indices(table.edges.len(), options.parallel, |e| {
        let [a, b] = table.edges[e].ends;
        edge_point(a, b, positions, faces, table)
    });

    Ok(split_triangles(positions.to_vec(), edge_points, faces, table))
}

fn edge_point(a: usize, b: usize, positions: &[Point3<f64>], faces: &[Vec<usize>], table: &FaceTable) -> Point3<f64> {
    let pa = positions[a].coords;
    let pb = positions[b].coords;
    let (Some((f, _)), Some((g, _))) = (table.corner(a, b), table.corner(b, a)) else {
        return Point3::from((pa + pb) * 0.5);
    };
    let c = opposite(&faces[f], a, b);
    let d = opposite(&faces[g], a, b);
    let loop_mask = || {
        Point3::from((pa + pb) * (3.0 / 8.0) + (positions[c].coords + positions[d].coords) * (1.0 / 8.0))
    };

    let valence = |v: usize| table.vertex_edges[v].len();
    let interior = |v: usize| !table.is_boundary_vertex(v);
    let regular = |v: usize| interior(v) && valence(v) == 6;

    if regular(a) && regular(b) {
        // Third vertex of the triangle across the directed side x -> y.
        let wing = |x: usize, y: usize| table.corner(y, x).map(|(h, _)| opposite(&faces[h], x, y));
        let wings = [wing(b, c), wing(c, a), wing(a, d), wing(d, b)];
        if wings.iter().any(Option::is_none) {
            return loop_mask();
        }
        let wing_sum: Vector3<f64> = wings.iter().flatten().map(|&w| positions[w].coords).sum();
        return Point3::from(
            (pa + pb) * 0.5 + (positions[c].coords + positions[d].coords) * 0.125 - wing_sum * (1.0 / 16.0),
        );
    }

    let stencil = |v: usize, other: usize| -> Option<Vector3<f64>> {
        if !interior(v) || valence(v) == 6 {
            return None;
        }
        let ring = table.ring(v, faces)?;
        let start = ring.iter().position(|&x| x == other)?;
        let weights = extraordinary_weights(ring.len());
        let sum: Vector3<f64> = (0..ring.len())
            .map(|j| positions[ring[(start + j) % ring.len()]].coords * weights[j])
            .sum();
        Some(positions[v].coords * 0.75 + sum)
    };

    match (stencil(a, b), stencil(b, a)) {
        (Some(sa), Some(sb)) => Point3::from((sa + sb) * 0.5),
        (Some(s), None) | (None, Some(s)) => Point3::from(s),
        (None, None) => loop_mask(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::subdivide::{subdivide, SubdivisionScheme};
    use crate::geometry::EPSILON;
    use crate::mesh::{primitives, HalfEdgeMesh, VertexId};
    use approx::assert_relative_eq;

    fn options(levels: usize) -> SubdivideOptions {
        SubdivideOptions::new(levels).with_scheme(SubdivisionScheme::Butterfly)
    }

    #[test]
    fn test_weights_sum_to_quarter() {
        for k in 3..10 {
            let sum: f64 = extraordinary_weights(k).iter().sum();
            assert_relative_eq!(sum, 0.25, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_interpolates_original_vertices() {
        let tet: HalfEdgeMesh = primitives::tetrahedron(2.0).unwrap();
        let out = subdivide(&tet, &options(1)).unwrap();
        for v in tet.vertex_ids() {
            assert_eq!(out.position(v), tet.position(v));
        }
        assert_eq!(out.num_faces(), 16);
        assert!(out.is_closed());
        assert!(out.validate().is_ok());
    }

    #[test]
    fn test_valence_three_stencil() {
        let tet: HalfEdgeMesh = primitives::tetrahedron(2.0).unwrap();
        let out = subdivide(&tet, &options(1).sequential()).unwrap();
        // Edge (0,1) is the first edge. Both ends have valence 3, and each
        // stencil gives 3/4 v + 5/12 other - 1/12 (the two remaining).
        let a = tet.position(VertexId::new(0)).coords;
        let b = tet.position(VertexId::new(1)).coords;
        let c = tet.position(VertexId::new(2)).coords;
        let d = tet.position(VertexId::new(3)).coords;
        let sa = a * 0.75 + b * (5.0 / 12.0) - (c + d) / 12.0;
        let sb = b * 0.75 + a * (5.0 / 12.0) - (c + d) / 12.0;
        let expected = (sa + sb) * 0.5;
        let p = out.position(VertexId::new(4));
        assert_relative_eq!(p.coords, expected, epsilon = EPSILON);
    }

    #[test]
    fn test_boundary_edges_use_midpoints() {
        let tri: HalfEdgeMesh = primitives::triangle().unwrap();
        let out = subdivide(&tri, &options(1)).unwrap();
        assert_eq!(*out.position(VertexId::new(3)), Point3::new(0.5, 0.0, 0.0));
        assert_eq!(out.num_faces(), 4);
    }

    #[test]
    fn test_quads_are_refused() {
        let cube: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        assert!(subdivide(&cube, &options(1)).is_err());
    }
}
