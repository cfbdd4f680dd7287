//! Bridging two edge loops with a band of quads.
//!
//! Loops are vertex sequences. A loop is closed when its last and first
//! vertices are joined by an edge. Each edge of the first loop is paired
//! with one edge of the second and the pair becomes a quad.
//!
//! The winding of each loop is taken from the faces already along it, so
//! that the band continues their orientation. Where a loop has no faces yet
//! its direction is free, and closed loops may also be rotated; the choice
//! with the smallest total distance between paired vertices wins.
//!
//! # Example
//!
//! ```
//! use chisel::algo::bridge::bridge_boundary_loops;
//! use chisel::mesh::{build_from_polygons, HalfEdgeMesh};
//! use nalgebra::Point3;
//!
//! // A floor facing down and a ceiling facing up.
//! let positions = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 1.0),
//!     Point3::new(0.0, 0.0, 1.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 1.0),
//!     Point3::new(0.0, 1.0, 1.0),
//! ];
//! let mut mesh: HalfEdgeMesh = build_from_polygons(&positions, &[[0, 1, 2, 3], [4, 7, 6, 5]]).unwrap();
//!
//! let band = bridge_boundary_loops(&mut mesh).unwrap();
//! assert_eq!(band.len(), 4);
//! assert!(mesh.is_closed());
//! ```

use tracing::{debug, warn};

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex, VertexId};

/// Bridge two loops.
///
/// Both loops need the same number of edges and no shared vertex. Returns
/// the new faces in loop order. On failure the mesh is left unchanged.
pub fn bridge_loops<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    first: &[VertexId<I>],
    second: &[VertexId<I>],
) -> Result<Vec<FaceId<I>>> {
    for &v in first.iter().chain(second) {
        if !mesh.contains_vertex(v) {
            return Err(MeshError::VertexNotFound(v.index()));
        }
    }
    if first.len() < 2 || second.len() < 2 {
        return Err(MeshError::invalid_param(
            "loop length",
            first.len().min(second.len()),
            "a loop needs at least 2 vertices",
        ));
    }
    if let Some(&v) = first.iter().find(|v| second.contains(v)) {
        return Err(MeshError::invalid_param("loops", v.index(), "loops must not share a vertex"));
    }

    let closed = is_closed_loop(mesh, first);
    let edges_first = edge_count(first.len(), closed);
    let edges_second = edge_count(second.len(), is_closed_loop(mesh, second));
    if edges_first != edges_second || closed != is_closed_loop(mesh, second) {
        warn!(first = edges_first, second = edges_second, "bridge loops do not match");
        return Err(MeshError::LengthMismatch {
            left: edges_first,
            right: edges_second,
        });
    }

    // The band runs a_i -> a_i+1 and b_i+1 -> b_i.
    let mut a = first.to_vec();
    if winding(mesh, &a) == Some(true) {
        a.reverse();
    }
    let reversed: Vec<VertexId<I>> = second.iter().rev().copied().collect();
    let b = match winding(mesh, second) {
        Some(true) => align(mesh, &a, second, closed).0,
        Some(false) => align(mesh, &a, &reversed, closed).0,
        None => {
            let forward = align(mesh, &a, second, closed);
            let backward = align(mesh, &a, &reversed, closed);
            if backward.1 < forward.1 {
                backward.0
            } else {
                forward.0
            }
        }
    };

    let snapshot = mesh.clone();
    let n = a.len();
    let mut created = Vec::with_capacity(edges_first);
    for i in 0..edges_first {
        let j = (i + 1) % n;
        match mesh.add_face(&[a[i], a[j], b[j], b[i]]) {
            Ok(f) => created.push(f),
            Err(e) => {
                warn!(error = %e, "bridge failed, mesh restored");
                *mesh = snapshot;
                return Err(e);
            }
        }
    }
    mesh.update_normals();
    debug!(faces = created.len(), closed, "bridge");
    Ok(created)
}

/// Bridge the two boundary loops of a mesh that has exactly two.
pub fn bridge_boundary_loops<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>) -> Result<Vec<FaceId<I>>> {
    let loops = mesh.boundary_loops();
    if loops.len() != 2 {
        warn!(loops = loops.len(), "bridge needs exactly two boundary loops");
        return Err(MeshError::invalid_param(
            "boundary loops",
            loops.len(),
            "exactly two are needed",
        ));
    }
    bridge_loops(mesh, &loops[0], &loops[1])
}

fn is_closed_loop<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, lp: &[VertexId<I>]) -> bool {
    let (first, last) = (lp[0], lp[lp.len() - 1]);
    lp.len() >= 3 && (mesh.find_halfedge(last, first).is_some() || mesh.find_halfedge(first, last).is_some())
}

fn edge_count(len: usize, closed: bool) -> usize {
    if closed {
        len
    } else {
        len - 1
    }
}

/// Whether the loop's own direction already carries faces (`Some(true)`),
/// its reverse does (`Some(false)`), or neither does.
fn winding<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, lp: &[VertexId<I>]) -> Option<bool> {
    let faced = |x: VertexId<I>, y: VertexId<I>| mesh.find_halfedge(x, y).is_some_and(|he| !mesh.is_boundary_halfedge(he));
    lp.windows(2).find_map(|w| {
        if faced(w[0], w[1]) {
            Some(true)
        } else if faced(w[1], w[0]) {
            Some(false)
        } else {
            None
        }
    })
}

/// The rotation of `b` with the least squared pairing distance to `a`,
/// and that distance. Open loops are never rotated.
fn align<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, a: &[VertexId<I>], b: &[VertexId<I>], closed: bool) -> (Vec<VertexId<I>>, f64) {
    let n = b.len();
    let shifts = if closed { n } else { 1 };
    let (shift, cost) = (0..shifts)
        .map(|shift| {
            let cost: f64 = (0..n)
                .map(|i| (mesh.position(a[i]) - mesh.position(b[(i + shift) % n])).norm_squared())
                .sum();
            (shift, cost)
        })
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
    ((0..n).map(|i| b[(i + shift) % n]).collect(), cost)
}
