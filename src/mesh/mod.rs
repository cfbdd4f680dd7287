//! Core mesh data structures.
//!
//! # Overview
//!
//! The primary type is [`HalfEdgeMesh`], a polygon mesh in half-edge
//! representation. Elements live in arenas and are named by stable ids that
//! are never reused, so ids held by a selection or an operator stay meaningful
//! across edits that do not remove the element.
//!
//! # Index Types
//!
//! - [`VertexId`] - identifies a vertex
//! - [`HalfEdgeId`] - identifies a half-edge (and, through either half, an edge)
//! - [`FaceId`] - identifies a face
//!
//! All three are generic over [`MeshIndex`] (`u16`, `u32` or `u64`).
//!
//! # Construction
//!
//! ```
//! use chisel::mesh::{primitives, HalfEdgeMesh};
//!
//! let cube: HalfEdgeMesh = primitives::cube(1.0).unwrap();
//! assert_eq!(cube.num_vertices(), 8);
//! assert_eq!(cube.num_edges(), 12);
//! assert!(cube.is_closed());
//! ```

mod builder;
mod halfedge;
mod index;
pub mod primitives;
mod topology;
mod validate;

pub use builder::{
    build_from_polygons, build_from_quads, build_from_triangles, to_face_vertex,
    to_face_vertex_with_ids,
};
pub use halfedge::{Face, FaceHalfEdgeIter, HalfEdge, HalfEdgeMesh, Vertex, VertexHalfEdgeIter};
pub use index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
pub use validate::ValidationReport;
