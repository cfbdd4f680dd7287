//! # Chisel
//!
//! A polygon mesh editing core for interactive modelers.
//!
//! Chisel keeps a half-edge mesh with stable ids and builds the usual
//! modeling operators on top of it: extrusion sessions, inset, loop cuts,
//! bevel, bridge, dissolve and several subdivision schemes. Selections and
//! ray picking connect the operators to a host application.
//!
//! ## Features
//!
//! - **Half-edge data structure**: O(1) adjacency queries with type-safe ids
//!   that are never reused
//! - **Flexible indexing**: 16-bit, 32-bit and 64-bit ids
//! - **Transactional operators**: a failed edit leaves the mesh untouched
//! - **Subdivision**: Catmull-Clark, Loop, Doo-Sabin, Modified Butterfly,
//!   linear and adaptive
//!
//! ## Quick Start
//!
//! ```
//! use chisel::prelude::*;
//! use chisel::algo::extrude::{ExtrudeOptions, ExtrudeTool};
//! use chisel::selection::{Element, Selection, SelectionType};
//!
//! let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
//!
//! let selection = Selection::new(SelectionType::Face);
//! selection.select(&mut mesh, Element::Face(FaceId::new(1)), true);
//!
//! let mut tool = ExtrudeTool::new(ExtrudeOptions::default());
//! tool.begin(&mut mesh, &selection).unwrap();
//! tool.update(&mut mesh, 1.0).unwrap();
//! tool.confirm(&mut mesh).unwrap();
//!
//! assert_eq!(mesh.num_faces(), 10);
//! assert!(mesh.is_closed());
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use chisel::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//!     Point3::new(0.5, 0.5, 1.0),
//! ];
//!
//! let faces = vec![
//!     [0, 2, 1], // bottom
//!     [0, 1, 3], // front
//!     [1, 2, 3], // right
//!     [2, 0, 3], // left
//! ];
//!
//! let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();
//! assert_eq!(mesh.num_vertices(), 4);
//! assert_eq!(mesh.num_edges(), 6);
//! assert!(mesh.is_closed());
//! ```
//!
//! ## Mesh Traversal
//!
//! ```
//! use chisel::prelude::*;
//!
//! let mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
//!
//! let v = VertexId::new(0);
//! assert_eq!(mesh.vertex_neighbors(v).count(), 3);
//! assert_eq!(mesh.vertex_faces(v).count(), 3);
//!
//! let f = FaceId::new(0);
//! assert_eq!(mesh.face_vertices(f).count(), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod geometry;
pub mod mesh;
pub mod pick;
pub mod selection;

/// Prelude module for convenient imports.
///
/// ```
/// use chisel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorKind, MeshError, Result};
    pub use crate::mesh::{
        build_from_polygons, build_from_quads, build_from_triangles, primitives, to_face_vertex, Face,
        FaceId, HalfEdge, HalfEdgeId, HalfEdgeMesh, MeshIndex, Vertex, VertexId,
    };
    pub use crate::selection::{Element, Selection, SelectionType};
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];

        let faces = vec![
            [0, 2, 1], // bottom
            [0, 1, 3], // front
            [1, 2, 3], // right
            [2, 0, 3], // left
        ];

        let mesh: HalfEdgeMesh = build_from_triangles(&vertices, &faces).unwrap();

        assert_eq!(mesh.num_vertices(), 4);
        assert_eq!(mesh.num_faces(), 4);
        // 4 faces * 3 half-edges, none on the boundary.
        assert_eq!(mesh.num_halfedges(), 12);
        assert!(mesh.validate().is_ok());

        for v in mesh.vertex_ids() {
            assert!(!mesh.is_boundary_vertex(v), "vertex {:?} should not be on boundary", v);
        }
    }
}
