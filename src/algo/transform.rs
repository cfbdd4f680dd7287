//! Rigid and scaling transforms of the selected elements.
//!
//! Transforms move the vertices touched by the selection of the active type
//! and never change connectivity.
//!
//! # Example
//!
//! ```
//! use chisel::algo::transform::translate_selected;
//! use chisel::mesh::{primitives, FaceId, HalfEdgeMesh};
//! use chisel::selection::{Element, Selection, SelectionType};
//! use nalgebra::Vector3;
//!
//! let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
//! let selection = Selection::new(SelectionType::Face);
//! selection.select(&mut mesh, Element::Face(FaceId::new(1)), true);
//!
//! let moved = translate_selected(&mut mesh, &selection, &Vector3::new(0.0, 1.0, 0.0)).unwrap();
//! assert_eq!(moved, 4);
//! ```

use nalgebra::{Point3, UnitQuaternion, Vector3};
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::geometry::centroid;
use crate::mesh::{HalfEdgeMesh, MeshIndex, VertexId};
use crate::selection::Selection;

/// Fixed point of a scale or rotation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Pivot {
    /// Average position of the affected vertices.
    #[default]
    Centroid,
    /// The world origin.
    Origin,
    /// A given point.
    Point(Point3<f64>),
}

/// Move the selection by `offset`. Returns the number of moved vertices.
pub fn translate_selected<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    selection: &Selection,
    offset: &Vector3<f64>,
) -> Result<usize> {
    if !offset.iter().all(|c| c.is_finite()) {
        return Err(MeshError::invalid_param("offset", format!("{offset:?}"), "must be finite"));
    }
    let vertices = affected(mesh, selection)?;
    mesh.translate_vertices(&vertices, offset);
    finish(mesh, vertices.len(), "translate")
}

/// Scale the selection per axis about `pivot`.
pub fn scale_selected<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    selection: &Selection,
    factors: &Vector3<f64>,
    pivot: Pivot,
) -> Result<usize> {
    if !factors.iter().all(|c| c.is_finite()) {
        return Err(MeshError::invalid_param("factors", format!("{factors:?}"), "must be finite"));
    }
    let vertices = affected(mesh, selection)?;
    let center = pivot_point(mesh, &vertices, pivot);
    apply(mesh, &vertices, |p| center + (p - center).component_mul(factors));
    finish(mesh, vertices.len(), "scale")
}

/// Rotate the selection about `pivot`.
pub fn rotate_selected<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    selection: &Selection,
    rotation: &UnitQuaternion<f64>,
    pivot: Pivot,
) -> Result<usize> {
    let vertices = affected(mesh, selection)?;
    let center = pivot_point(mesh, &vertices, pivot);
    apply(mesh, &vertices, |p| center + rotation * (p - center));
    finish(mesh, vertices.len(), "rotate")
}

fn affected<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, selection: &Selection) -> Result<Vec<VertexId<I>>> {
    let vertices = selection.affected_vertices(mesh);
    if vertices.is_empty() {
        warn!("nothing selected to transform");
        return Err(MeshError::EmptySelection);
    }
    Ok(vertices)
}

fn pivot_point<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, vertices: &[VertexId<I>], pivot: Pivot) -> Point3<f64> {
    match pivot {
        Pivot::Centroid => {
            let points: Vec<Point3<f64>> = vertices.iter().map(|&v| *mesh.position(v)).collect();
            centroid(&points)
        }
        Pivot::Origin => Point3::origin(),
        Pivot::Point(p) => p,
    }
}

fn apply<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, vertices: &[VertexId<I>], f: impl Fn(Point3<f64>) -> Point3<f64>) {
    for &v in vertices {
        let p = f(*mesh.position(v));
        mesh.set_position(v, p);
    }
}

fn finish<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, moved: usize, what: &str) -> Result<usize> {
    mesh.update_normals();
    debug!(vertices = moved, "{what}");
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EPSILON;
    use crate::mesh::{primitives, FaceId, HalfEdgeId};
    use crate::selection::{Element, SelectionType};
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn cube_with_top() -> (HalfEdgeMesh, Selection) {
        let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let selection = Selection::new(SelectionType::Face);
        selection.select(&mut mesh, Element::Face(FaceId::new(1)), true);
        (mesh, selection)
    }

    #[test]
    fn test_translate_top_face() {
        let (mut mesh, selection) = cube_with_top();
        let before = mesh.num_edges();
        translate_selected(&mut mesh, &selection, &Vector3::new(0.0, 1.0, 0.0)).unwrap();
        for v in mesh.face_vertices(FaceId::new(1)) {
            assert_relative_eq!(mesh.position(v).y, 2.0, epsilon = EPSILON);
        }
        assert_eq!(mesh.position(VertexId::new(0)).y, -1.0);
        assert_eq!(mesh.num_edges(), before);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_scale_about_centroid() {
        let (mut mesh, selection) = cube_with_top();
        scale_selected(&mut mesh, &selection, &Vector3::new(0.5, 1.0, 0.5), Pivot::Centroid).unwrap();
        let p = mesh.position(VertexId::new(6));
        assert_relative_eq!(p.x, 0.5, epsilon = EPSILON);
        assert_relative_eq!(p.y, 1.0, epsilon = EPSILON);
        assert_relative_eq!(p.z, 0.5, epsilon = EPSILON);
        assert_relative_eq!(mesh.face_area(FaceId::new(1)), 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_rotate_about_origin() {
        let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let selection = Selection::new(SelectionType::Vertex);
        selection.select(&mut mesh, Element::Vertex(VertexId::new(1)), true);
        let quarter = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2);
        rotate_selected(&mut mesh, &selection, &quarter, Pivot::Origin).unwrap();
        // (1,-1,-1) turns a quarter about +y to (-1,-1,-1).
        let p = mesh.position(VertexId::new(1));
        assert_relative_eq!(p.x, -1.0, epsilon = EPSILON);
        assert_relative_eq!(p.z, -1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_edge_selection_moves_both_ends() {
        let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let selection = Selection::new(SelectionType::Edge);
        let he: HalfEdgeId = mesh.find_halfedge(VertexId::new(0), VertexId::new(1)).unwrap();
        selection.select(&mut mesh, Element::Edge(he), true);
        let moved = translate_selected(&mut mesh, &selection, &Vector3::new(0.0, 0.0, -1.0)).unwrap();
        assert_eq!(moved, 2);
    }

    #[test]
    fn test_empty_selection_is_refused() {
        let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let selection = Selection::new(SelectionType::Face);
        assert!(matches!(
            translate_selected(&mut mesh, &selection, &Vector3::x()),
            Err(MeshError::EmptySelection)
        ));
        let (mut mesh, selection) = cube_with_top();
        assert!(translate_selected(&mut mesh, &selection, &Vector3::new(f64::NAN, 0.0, 0.0)).is_err());
    }
}
