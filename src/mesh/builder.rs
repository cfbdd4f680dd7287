//! Conversion between face-vertex lists and half-edge meshes.
//!
//! Subdivision and other wholesale rebuilds work on plain polygon lists and
//! come back through [`build_from_polygons`].

use nalgebra::Point3;

use super::halfedge::HalfEdgeMesh;
use super::index::{MeshIndex, VertexId};
use crate::error::{MeshError, Result};

/// Build a half-edge mesh from positions and polygon index lists.
///
/// Each polygon is given counter-clockwise and needs at least three distinct
/// vertices. Unreferenced positions become isolated vertices.
///
/// # Example
/// ```
/// use chisel::mesh::{build_from_polygons, HalfEdgeMesh};
/// use nalgebra::Point3;
///
/// let positions = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(2.0, 0.5, 0.0),
/// ];
/// let faces = vec![vec![0, 1, 2, 3], vec![1, 4, 2]];
///
/// let mesh: HalfEdgeMesh = build_from_polygons(&positions, &faces).unwrap();
/// assert_eq!(mesh.num_faces(), 2);
/// assert_eq!(mesh.num_edges(), 6);
/// ```
pub fn build_from_polygons<I: MeshIndex, F: AsRef<[usize]>>(
    positions: &[Point3<f64>],
    faces: &[F],
) -> Result<HalfEdgeMesh<I>> {
    if faces.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    for (fi, face) in faces.iter().enumerate() {
        if let Some(&vi) = face.as_ref().iter().find(|&&vi| vi >= positions.len()) {
            return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
        }
    }

    let mut mesh = HalfEdgeMesh::with_capacity(positions.len(), faces.len());
    mesh.reserve_ids(positions.len(), 0, faces.len())?;
    let ids: Vec<VertexId<I>> = positions.iter().map(|&p| mesh.add_vertex(p)).collect();

    let mut loop_ids = Vec::new();
    for face in faces {
        loop_ids.clear();
        loop_ids.extend(face.as_ref().iter().map(|&vi| ids[vi]));
        mesh.add_face(&loop_ids)?;
    }

    mesh.update_normals();
    Ok(mesh)
}

/// Build a half-edge mesh from triangles.
pub fn build_from_triangles<I: MeshIndex>(
    positions: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<HalfEdgeMesh<I>> {
    build_from_polygons(positions, faces)
}

/// Build a half-edge mesh from quads.
pub fn build_from_quads<I: MeshIndex>(
    positions: &[Point3<f64>],
    faces: &[[usize; 4]],
) -> Result<HalfEdgeMesh<I>> {
    build_from_polygons(positions, faces)
}

/// Flatten a mesh into positions and polygon index lists.
///
/// Live vertices are renumbered densely in id order, so the output can be fed
/// back to [`build_from_polygons`].
pub fn to_face_vertex<I: MeshIndex>(mesh: &HalfEdgeMesh<I>) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let (positions, faces, _) = to_face_vertex_with_ids(mesh);
    (positions, faces)
}

/// Like [`to_face_vertex`], also returning the vertex id behind each position.
pub fn to_face_vertex_with_ids<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
) -> (Vec<Point3<f64>>, Vec<Vec<usize>>, Vec<VertexId<I>>) {
    let mut dense = vec![usize::MAX; mesh.vertices.len()];
    let mut positions = Vec::with_capacity(mesh.num_vertices());
    let mut ids = Vec::with_capacity(mesh.num_vertices());
    for (v, vertex) in mesh.vertices() {
        dense[v.index()] = positions.len();
        positions.push(vertex.position);
        ids.push(v);
    }

    let faces = mesh
        .face_ids()
        .map(|f| mesh.face_vertices(f).map(|v| dense[v.index()]).collect())
        .collect();

    (positions, faces, ids)
}
