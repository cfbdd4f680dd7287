//! Mesh editing operators.
//!
//! Every operator works in place on a [`HalfEdgeMesh`](crate::mesh::HalfEdgeMesh)
//! and leaves it unchanged when it fails, except subdivision, which builds a
//! new mesh.
//!
//! - **Extrusion**: interactive sessions over faces, edges or vertices
//! - **Inset**: per-face or region inset with optional depth
//! - **Loop cut**: single and parallel cuts across quad rings
//! - **Subdivision**: Catmull-Clark, Loop, Doo-Sabin, Modified Butterfly,
//!   linear and adaptive refinement
//! - **Bevel**: edge and vertex chamfers
//! - **Bridge**: quad bands between edge loops
//! - **Dissolve**: merging faces across removed edges, vertices and regions
//! - **Triangulate**: fan triangulation
//! - **Smoothing** and **transforms** of whole meshes or selections

pub mod bevel;
pub mod bridge;
pub mod dissolve;
pub mod extrude;
pub mod inset;
pub mod loop_cut;
pub mod progress;
pub mod smooth;
pub mod subdivide;
pub mod transform;
pub mod triangulate;

pub use progress::Progress;
