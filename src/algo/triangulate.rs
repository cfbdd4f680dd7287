//! Fan triangulation of polygonal faces.
//!
//! Each face of degree `k > 3` is replaced by `k - 2` triangles fanning out
//! from the origin of its stored half-edge. Triangles keep the face's
//! selection and mark flags. Convex faces triangulate cleanly; concave ones
//! may produce overlapping triangles.

use tracing::{debug, warn};

use crate::error::Result;
use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex, VertexId};

use super::Progress;

/// Triangulate every face of the mesh.
///
/// Returns the number of triangles created.
pub fn triangulate<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> Result<usize> {
    triangulate_with_progress(mesh, &Progress::none())
}

/// [`triangulate`] with progress reports.
pub fn triangulate_with_progress<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, progress: &Progress) -> Result<usize> {
    let faces: Vec<FaceId<I>> = mesh.face_ids().collect();
    fan_faces(mesh, &faces, progress)
}

/// Triangulate only the given faces.
///
/// Dead faces are an error; triangles and duplicates are skipped.
pub fn triangulate_faces<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, faces: &[FaceId<I>]) -> Result<usize> {
    if let Some(&f) = faces.iter().find(|&&f| !mesh.contains_face(f)) {
        return Err(crate::error::MeshError::FaceNotFound(f.index()));
    }
    let mut unique = faces.to_vec();
    unique.sort();
    unique.dedup();
    fan_faces(mesh, &unique, &Progress::none())
}

fn fan_faces<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, faces: &[FaceId<I>], progress: &Progress) -> Result<usize> {
    let polygons: Vec<FaceId<I>> = faces.iter().copied().filter(|&f| mesh.face_degree(f) > 3).collect();
    if polygons.is_empty() {
        return Ok(0);
    }

    let snapshot = mesh.clone();
    let mut created = 0;
    for (i, &f) in polygons.iter().enumerate() {
        progress.report(i, polygons.len(), "Triangulating");
        match fan_face(mesh, f) {
            Ok(n) => created += n,
            Err(e) => {
                warn!(face = f.index(), error = %e, "triangulation failed, mesh restored");
                *mesh = snapshot;
                return Err(e);
            }
        }
    }
    progress.report(polygons.len(), polygons.len(), "Triangulating");
    mesh.update_normals();
    debug!(faces = polygons.len(), triangles = created, "triangulated");
    Ok(created)
}

fn fan_face<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, f: FaceId<I>) -> Result<usize> {
    let ring: Vec<VertexId<I>> = mesh.face_vertices(f).collect();
    let (selected, marked) = (mesh[f].selected, mesh[f].marked);
    mesh.remove_face(f);
    for i in 1..ring.len() - 1 {
        let t = mesh.add_face(&[ring[0], ring[i], ring[i + 1]])?;
        mesh[t].selected = selected;
        mesh[t].marked = marked;
    }
    Ok(ring.len() - 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EPSILON;
    use crate::mesh::primitives;
    use approx::assert_relative_eq;

    #[test]
    fn test_triangulate_cube() {
        let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let created = triangulate(&mut mesh).unwrap();
        assert_eq!(created, 12);
        assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (8, 18, 12));
        assert!(mesh.is_triangle_mesh());
        assert!(mesh.is_closed());
        assert!(mesh.validate().is_ok());
        assert_relative_eq!(mesh.surface_area(), 24.0, epsilon = EPSILON);
    }

    #[test]
    fn test_triangulate_keeps_orientation_and_flags() {
        let mut mesh: HalfEdgeMesh = primitives::grid(2, 1, 2.0).unwrap();
        mesh[FaceId::new(0)].selected = true;
        triangulate_faces(&mut mesh, &[FaceId::new(0), FaceId::new(0)]).unwrap();
        assert_eq!(mesh.num_faces(), 3);
        let selected = mesh.faces().filter(|(_, face)| face.selected).count();
        assert_eq!(selected, 2);
        for f in mesh.face_ids() {
            assert!(mesh.face_normal(f).y > 0.0);
        }
    }

    #[test]
    fn test_triangle_mesh_is_untouched() {
        let mut mesh: HalfEdgeMesh = primitives::tetrahedron(1.0).unwrap();
        let before = mesh.clone();
        assert_eq!(triangulate(&mut mesh).unwrap(), 0);
        assert_eq!(mesh, before);
        assert!(triangulate_faces(&mut mesh, &[FaceId::new(9)]).is_err());
    }
}
