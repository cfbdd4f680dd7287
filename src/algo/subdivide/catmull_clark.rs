//! Catmull–Clark subdivision for polygon meshes.

use nalgebra::{Point3, Vector3};

use super::face_table::FaceTable;
use super::{average, map_indices, BoundaryRule, SubdivideOptions};
use crate::geometry::{dihedral_angle, newell_normal, WORLD_UP};

/// One level of Catmull–Clark.
///
/// # Vertex Rules
///
/// - **Face point**: centroid of the face
/// - **Edge point**: average of both ends and both face points; midpoint on
///   sharp edges
/// - **Vertex point**: `(Q + 2R + (n-3)S) / n` where:
///   - Q = average of adjacent face points
///   - R = average of adjacent edge midpoints
///   - S = original position
///   - n = valence
/// - **Vertex on exactly two sharp edges**: `3/4 S + 1/8 (left + right)`,
///   or fixed under the sharp rule
/// - **Vertex on more than two sharp edges**: fixed
///
/// Output vertices are the moved originals, then face points, then edge
/// points. Face `f` with `k` corners emits `k` quads
/// `(v_i, E(v_i v_i+1), F(f), E(v_i-1 v_i))`.
pub(super) fn subdivide_once(
    positions: &[Point3<f64>],
    faces: &[Vec<usize>],
    table: &FaceTable,
    options: &SubdivideOptions,
) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let face_points: Vec<Point3<f64>> = map_indices(faces.len(), options.parallel, |f| {
        average(faces[f].iter().map(|&v| &positions[v]))
    });

    let sharp = sharp_edges(positions, faces, table, options);

    let edge_points: Vec<Point3<f64>> = map_indices(table.edges.len(), options.parallel, |e| {
        let edge = &table.edges[e];
        let [a, b] = edge.ends;
        let mid = Point3::from((positions[a].coords + positions[b].coords) * 0.5);
        match edge.right {
            Some(right) if !sharp[e] => Point3::from(
                (positions[a].coords
                    + positions[b].coords
                    + face_points[edge.left].coords
                    + face_points[right].coords)
                    / 4.0,
            ),
            _ => mid,
        }
    });

    let vertex_points: Vec<Point3<f64>> = map_indices(positions.len(), options.parallel, |v| {
        vertex_point(v, positions, &face_points, table, &sharp, options)
    });

    let num_original = positions.len();
    let num_face_points = face_points.len();
    let mut new_positions = vertex_points;
    new_positions.extend(face_points);
    new_positions.extend(edge_points);

    let edge_vertex = |a: usize, b: usize| {
        // Every consecutive pair of a face was registered by the table.
        num_original + num_face_points + table.edge(a, b).unwrap_or_default()
    };

    let mut new_faces = Vec::with_capacity(faces.iter().map(Vec::len).sum());
    for (fi, face) in faces.iter().enumerate() {
        let k = face.len();
        let fp = num_original + fi;
        for i in 0..k {
            let v = face[i];
            let next = face[(i + 1) % k];
            let prev = face[(i + k - 1) % k];
            new_faces.push(vec![v, edge_vertex(v, next), fp, edge_vertex(prev, v)]);
        }
    }

    (new_positions, new_faces)
}

/// Edges treated as sharp: boundary edges, and creases under the crease rule.
fn sharp_edges(
    positions: &[Point3<f64>],
    faces: &[Vec<usize>],
    table: &FaceTable,
    options: &SubdivideOptions,
) -> Vec<bool> {
    let normals: Option<Vec<Vector3<f64>>> = (options.boundary_rule == BoundaryRule::CreaseAngle).then(|| {
        faces
            .iter()
            .map(|face| {
                let pts: Vec<Point3<f64>> = face.iter().map(|&v| positions[v]).collect();
                newell_normal(&pts).unwrap_or(WORLD_UP)
            })
            .collect()
    });

    table
        .edges
        .iter()
        .map(|edge| match (edge.right, &normals) {
            (None, _) => true,
            (Some(right), Some(n)) => dihedral_angle(&n[edge.left], &n[right]) > options.crease_angle,
            (Some(_), None) => false,
        })
        .collect()
}

fn vertex_point(
    v: usize,
    positions: &[Point3<f64>],
    face_points: &[Point3<f64>],
    table: &FaceTable,
    sharp: &[bool],
    options: &SubdivideOptions,
) -> Point3<f64> {
    let pos = positions[v];
    let edges = &table.vertex_edges[v];
    let adjacent_faces = &table.vertex_faces[v];
    if adjacent_faces.is_empty() || edges.is_empty() {
        return pos;
    }

    let sharp_neighbors: Vec<usize> = edges
        .iter()
        .filter(|&&e| sharp[e])
        .map(|&e| table.edges[e].other(v))
        .collect();
    let on_boundary = edges.iter().any(|&e| table.edges[e].is_boundary());

    if on_boundary && (options.preserve_boundary || options.boundary_rule == BoundaryRule::Sharp) {
        return pos;
    }

    match sharp_neighbors.len() {
        0 | 1 => {
            let n = edges.len() as f64;
            let q = average(adjacent_faces.iter().map(|&f| &face_points[f]));
            let r: Vector3<f64> = edges
                .iter()
                .map(|&e| {
                    let [a, b] = table.edges[e].ends;
                    (positions[a].coords + positions[b].coords) * 0.5
                })
                .sum::<Vector3<f64>>()
                / n;
            Point3::from((q.coords + r * 2.0 + pos.coords * (n - 3.0)) / n)
        }
        2 => {
            let left = positions[sharp_neighbors[0]].coords;
            let right = positions[sharp_neighbors[1]].coords;
            Point3::from(pos.coords * 0.75 + (left + right) * 0.125)
        }
        _ => pos,
    }
}

#[cfg(test)]
mod tests {
    use crate::algo::subdivide::{subdivide, BoundaryRule, SubdivideOptions};
    use crate::geometry::EPSILON;
    use crate::mesh::{build_from_polygons, primitives, HalfEdgeMesh};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_cube_one_level() {
        let cube: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let out = subdivide(&cube, &SubdivideOptions::new(1)).unwrap();

        assert_eq!(out.num_vertices(), 26);
        assert_eq!(out.num_edges(), 48);
        assert_eq!(out.num_faces(), 24);
        assert!(out.is_quad_mesh());
        assert!(out.is_manifold());
        assert!(out.is_closed());
        assert_eq!(out.euler_characteristic(), 2);
        assert!(out.validate().is_ok());
    }

    #[test]
    fn test_cube_corner_and_edge_points() {
        let cube: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let out = subdivide(&cube, &SubdivideOptions::new(1).sequential()).unwrap();

        // Corner (1,1,1): Q = (1,1,1)/3 and R = 2(1,1,1)/3, giving 5(1,1,1)/9.
        let corner = out.position(crate::mesh::VertexId::new(6));
        for c in corner.iter() {
            assert_relative_eq!(*c, 5.0 / 9.0, epsilon = EPSILON);
        }
        // Face point of the top face sits at its centroid.
        let top = out.position(crate::mesh::VertexId::new(8 + 1));
        assert_relative_eq!(top.y, 1.0, epsilon = EPSILON);
        assert_relative_eq!(top.x, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let cube: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let a = subdivide(&cube, &SubdivideOptions::new(2)).unwrap();
        let b = subdivide(&cube, &SubdivideOptions::new(2).sequential()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_mixed_polygons() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(2.0, 0.5, 0.0),
        ];
        let faces = vec![vec![0, 1, 2, 3], vec![1, 4, 2]];
        let mesh: HalfEdgeMesh = build_from_polygons(&positions, &faces).unwrap();
        let out = subdivide(&mesh, &SubdivideOptions::new(1)).unwrap();
        assert_eq!(out.num_faces(), 7);
        assert_eq!(out.num_vertices(), 5 + 2 + 6);
        assert!(out.is_quad_mesh());
        assert_eq!(out.euler_characteristic(), 1);
    }

    #[test]
    fn test_sharp_boundary_holds_boundary() {
        let grid: HalfEdgeMesh = primitives::grid(2, 2, 2.0).unwrap();
        let options = SubdivideOptions::new(1).with_boundary_rule(BoundaryRule::Sharp);
        let out = subdivide(&grid, &options).unwrap();
        // The sharp rule pins every boundary vertex. The smooth rule slides
        // them along the border, which keeps a straight border straight.
        assert_eq!(*out.position(crate::mesh::VertexId::new(0)), Point3::new(-1.0, 0.0, -1.0));
        assert_eq!(*out.position(crate::mesh::VertexId::new(1)), Point3::new(0.0, 0.0, -1.0));

        let smooth = subdivide(&grid, &SubdivideOptions::new(1)).unwrap();
        assert_relative_eq!(smooth.position(crate::mesh::VertexId::new(1)).z, -1.0, epsilon = EPSILON);
        assert_eq!(smooth.num_faces(), 16);
    }

    #[test]
    fn test_crease_angle_keeps_cube_corners_sharp() {
        let cube: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let options = SubdivideOptions::new(1).with_boundary_rule(BoundaryRule::CreaseAngle);
        let out = subdivide(&cube, &options).unwrap();
        // Every cube edge is a 90 degree crease, so corners stay fixed.
        assert_eq!(*out.position(crate::mesh::VertexId::new(6)), Point3::new(1.0, 1.0, 1.0));
        assert!(out.is_closed());
    }
}
