//! Doo–Sabin subdivision.

use nalgebra::Point3;

use super::average;
use super::face_table::FaceTable;

/// One level of Doo–Sabin.
///
/// Every face corner `i` gets a new point `(v_i + F + E_i + E_i-1) / 4`,
/// where `F` is the face centroid and `E_i` the midpoint of the side leaving
/// `v_i`. The result has three kinds of faces:
///
/// - **F-face**: the shrunken original face
/// - **E-face**: a quad across every interior edge
/// - **V-face**: a polygon around every interior vertex, one corner per
///   adjacent face
///
/// Boundary edges and boundary vertices get no E- or V-face.
pub(super) fn subdivide_once(
    positions: &[Point3<f64>],
    faces: &[Vec<usize>],
    table: &FaceTable,
) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let mut first_corner = Vec::with_capacity(faces.len());
    let mut new_positions = Vec::with_capacity(faces.iter().map(Vec::len).sum());
    for face in faces {
        first_corner.push(new_positions.len());
        let k = face.len();
        let center = average(face.iter().map(|&v| &positions[v]));
        for i in 0..k {
            let v = positions[face[i]].coords;
            let next = positions[face[(i + 1) % k]].coords;
            let prev = positions[face[(i + k - 1) % k]].coords;
            let e_next = (v + next) * 0.5;
            let e_prev = (v + prev) * 0.5;
            new_positions.push(Point3::from((v + center.coords + e_next + e_prev) / 4.0));
        }
    }
    let point = |f: usize, i: usize| first_corner[f] + i % faces[f].len();

    let mut new_faces: Vec<Vec<usize>> = faces
        .iter()
        .enumerate()
        .map(|(f, face)| (0..face.len()).map(|i| point(f, i)).collect())
        .collect();

    for edge in &table.edges {
        let [a, b] = edge.ends;
        let (Some((f, i)), Some((g, j))) = (table.corner(a, b), table.corner(b, a)) else {
            continue;
        };
        // f runs a -> b and g runs b -> a.
        new_faces.push(vec![point(f, i + 1), point(f, i), point(g, j + 1), point(g, j)]);
    }

    for v in 0..positions.len() {
        if let Some(rotation) = table.rotation(v, faces) {
            if rotation.len() >= 3 {
                new_faces.push(rotation.iter().rev().map(|&(f, i)| point(f, i)).collect());
            }
        }
    }

    (new_positions, new_faces)
}

#[cfg(test)]
mod tests {
    use crate::algo::subdivide::{subdivide, SubdivideOptions, SubdivisionScheme};
    use crate::geometry::EPSILON;
    use crate::mesh::{primitives, HalfEdgeMesh, VertexId};
    use approx::assert_relative_eq;

    fn options(levels: usize) -> SubdivideOptions {
        SubdivideOptions::new(levels).with_scheme(SubdivisionScheme::DooSabin)
    }

    #[test]
    fn test_cube() {
        let cube: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let out = subdivide(&cube, &options(1)).unwrap();
        assert_eq!(out.num_vertices(), 24);
        assert_eq!(out.num_edges(), 48);
        assert_eq!(out.num_faces(), 26);
        assert!(out.is_closed());
        assert!(out.is_manifold());
        assert_eq!(out.euler_characteristic(), 2);
        assert!(out.validate().is_ok());

        // Bottom face corner 0 is cube vertex (-1,-1,-1).
        let p = out.position(VertexId::new(0));
        assert_relative_eq!(p.x, -0.5, epsilon = EPSILON);
        assert_relative_eq!(p.y, -1.0, epsilon = EPSILON);
        assert_relative_eq!(p.z, -0.5, epsilon = EPSILON);
    }

    #[test]
    fn test_tetrahedron_face_kinds() {
        let tet: HalfEdgeMesh = primitives::tetrahedron(1.0).unwrap();
        let out = subdivide(&tet, &options(1)).unwrap();
        // 4 triangles, 6 edge quads, 4 vertex triangles.
        assert_eq!(out.num_faces(), 14);
        assert_eq!(out.num_vertices(), 12);
        assert!(out.is_closed());
    }

    #[test]
    fn test_open_grid_skips_boundary() {
        let grid: HalfEdgeMesh = primitives::grid(2, 2, 2.0).unwrap();
        let out = subdivide(&grid, &options(1)).unwrap();
        // 4 shrunken quads, 4 interior edges, 1 interior vertex.
        assert_eq!(out.num_faces(), 9);
        assert_eq!(out.num_vertices(), 16);
        assert!(!out.is_closed());
        assert!(out.validate().is_ok());
    }
}
