//! Linear midpoint subdivision.

use nalgebra::Point3;

use super::average;
use super::face_table::FaceTable;

/// One level of linear subdivision; no vertex moves.
///
/// Triangles split into four at their edge midpoints. Every other face gets
/// a centroid and splits into one quad per corner.
pub(super) fn subdivide_once(
    positions: &[Point3<f64>],
    faces: &[Vec<usize>],
    table: &FaceTable,
) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let mut new_positions = positions.to_vec();
    let base = new_positions.len();
    new_positions.extend(table.edges.iter().map(|edge| {
        let [a, b] = edge.ends;
        Point3::from((positions[a].coords + positions[b].coords) * 0.5)
    }));
    let mid = |a: usize, b: usize| base + table.edge(a, b).unwrap_or_default();

    let mut new_faces = Vec::new();
    for face in faces {
        let k = face.len();
        if k == 3 {
            let (v0, v1, v2) = (face[0], face[1], face[2]);
            let (e01, e12, e20) = (mid(v0, v1), mid(v1, v2), mid(v2, v0));
            new_faces.push(vec![v0, e01, e20]);
            new_faces.push(vec![v1, e12, e01]);
            new_faces.push(vec![v2, e20, e12]);
            new_faces.push(vec![e01, e12, e20]);
            continue;
        }
        let center = new_positions.len();
        new_positions.push(average(face.iter().map(|&v| &positions[v])));
        for i in 0..k {
            let v = face[i];
            let next = face[(i + 1) % k];
            let prev = face[(i + k - 1) % k];
            new_faces.push(vec![v, mid(v, next), center, mid(prev, v)]);
        }
    }
    (new_positions, new_faces)
}

#[cfg(test)]
mod tests {
    use crate::algo::subdivide::{subdivide, SubdivideOptions, SubdivisionScheme};
    use crate::mesh::{primitives, HalfEdgeMesh};
    use approx::assert_relative_eq;

    fn options(levels: usize) -> SubdivideOptions {
        SubdivideOptions::new(levels).with_scheme(SubdivisionScheme::Simple)
    }

    #[test]
    fn test_cube_keeps_shape() {
        let cube: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let out = subdivide(&cube, &options(1)).unwrap();
        assert_eq!(out.num_faces(), 24);
        assert_eq!(out.num_vertices(), 26);
        assert!(out.is_closed());
        assert_relative_eq!(out.surface_area(), 24.0, epsilon = 1e-9);
    }

    #[test]
    fn test_triangles_split_in_four() {
        let tet: HalfEdgeMesh = primitives::tetrahedron(1.0).unwrap();
        let out = subdivide(&tet, &options(2)).unwrap();
        assert_eq!(out.num_faces(), 64);
        assert!(out.is_triangle_mesh());
        assert_relative_eq!(out.surface_area(), tet.surface_area(), epsilon = 1e-9);
    }
}
