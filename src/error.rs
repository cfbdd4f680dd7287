//! Error types for chisel.
//!
//! Every fallible mesh operation returns [`Result`]. Errors are local and never
//! fatal: a failing operator leaves the mesh as it was before the call, and the
//! failure is also reported through `tracing` at `warn` level.

use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Broad category of a [`MeshError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Null references or degenerate inputs.
    InvalidArgument,
    /// The operation cannot run in the current state (empty selection, wrong mesh type, ...).
    Precondition,
    /// The operation would break manifoldness or edge uniqueness.
    TopologyViolation,
    /// Degenerate geometry that could not be substituted with a default.
    Numerical,
}

/// Errors that can occur during mesh operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// An edge was requested from a vertex to itself.
    #[error("edge from vertex {vertex} to itself is not allowed")]
    SelfLoop {
        /// The vertex index.
        vertex: usize,
    },

    /// A face was requested with fewer than three vertices.
    #[error("face needs at least 3 vertices, got {vertices}")]
    DegenerateFace {
        /// Number of vertices supplied.
        vertices: usize,
    },

    /// A face lists the same vertex twice.
    #[error("face references vertex {vertex} more than once")]
    DuplicateVertexInFace {
        /// The repeated vertex index.
        vertex: usize,
    },

    /// A face-vertex list references a vertex index that does not exist.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// The vertex id does not name a live vertex.
    #[error("vertex {0} does not exist")]
    VertexNotFound(usize),

    /// The half-edge id does not name a live half-edge.
    #[error("half-edge {0} does not exist")]
    HalfEdgeNotFound(usize),

    /// The face id does not name a live face.
    #[error("face {0} does not exist")]
    FaceNotFound(usize),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// The operator was invoked with nothing selected.
    #[error("nothing is selected")]
    EmptySelection,

    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A triangle-only operation met a face of another degree.
    #[error("face {face} is not a triangle")]
    NotTriangleMesh {
        /// The offending face.
        face: usize,
    },

    /// A quad-only operation met a face of another degree.
    #[error("face {face} is not a quad")]
    NotQuad {
        /// The offending face.
        face: usize,
    },

    /// An edge loop could not be grown across any quad.
    #[error("edge loop through half-edge {edge} crosses no quad faces")]
    LoopTooShort {
        /// The seed half-edge.
        edge: usize,
    },

    /// A session call arrived while no session was running.
    #[error("no editing session is active")]
    NoActiveSession,

    /// A session was started while another one was still running.
    #[error("an editing session is already active")]
    SessionActive,

    /// The result would exceed the configured face budget.
    #[error("operation would exceed maximum mesh size ({current} -> {projected} faces, max {max})")]
    MeshTooLarge {
        /// Current face count.
        current: usize,
        /// Projected face count.
        projected: usize,
        /// Maximum allowed face count.
        max: usize,
    },

    /// The index type has no id left for a new element.
    #[error("no {kind} id left: slot {slot} does not fit the index type")]
    IndexOverflow {
        /// Element kind.
        kind: &'static str,
        /// The slot that would have been allocated.
        slot: usize,
    },

    /// The directed edge already carries a face.
    #[error("edge ({v0}, {v1}) already has a face on this side")]
    NonManifoldEdge {
        /// Origin vertex of the edge.
        v0: usize,
        /// Target vertex of the edge.
        v1: usize,
    },

    /// The edge already exists where a new one must be created.
    #[error("edge ({v0}, {v1}) already exists")]
    DuplicateEdge {
        /// First vertex of the edge.
        v0: usize,
        /// Second vertex of the edge.
        v1: usize,
    },

    /// The mesh has non-manifold topology.
    #[error("mesh has non-manifold topology: {details}")]
    NonManifold {
        /// Description of the non-manifold condition.
        details: String,
    },

    /// The operation needs faces on both sides of an edge.
    #[error("half-edge {edge} lies on the boundary")]
    BoundaryEdge {
        /// The boundary half-edge.
        edge: usize,
    },

    /// Two sequences that must pair one-to-one have different lengths.
    #[error("cannot pair {left} elements with {right} elements")]
    LengthMismatch {
        /// Length of the first sequence.
        left: usize,
        /// Length of the second sequence.
        right: usize,
    },

    /// Degenerate geometry that cannot be resolved.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::SelfLoop { .. }
            | MeshError::DegenerateFace { .. }
            | MeshError::DuplicateVertexInFace { .. }
            | MeshError::InvalidVertexIndex { .. }
            | MeshError::VertexNotFound(_)
            | MeshError::HalfEdgeNotFound(_)
            | MeshError::FaceNotFound(_)
            | MeshError::InvalidParameter { .. }
            | MeshError::LengthMismatch { .. } => ErrorKind::InvalidArgument,

            MeshError::EmptySelection
            | MeshError::EmptyMesh
            | MeshError::NotTriangleMesh { .. }
            | MeshError::NotQuad { .. }
            | MeshError::LoopTooShort { .. }
            | MeshError::NoActiveSession
            | MeshError::SessionActive
            | MeshError::MeshTooLarge { .. }
            | MeshError::IndexOverflow { .. }
            | MeshError::BoundaryEdge { .. } => ErrorKind::Precondition,

            MeshError::NonManifoldEdge { .. }
            | MeshError::DuplicateEdge { .. }
            | MeshError::NonManifold { .. } => ErrorKind::TopologyViolation,

            MeshError::DegenerateGeometry(_) => ErrorKind::Numerical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MeshError::DegenerateFace { vertices: 2 };
        assert_eq!(format!("{err}"), "face needs at least 3 vertices, got 2");

        let err = MeshError::invalid_param("t", 1.5, "must lie in (0, 1)");
        let display = format!("{err}");
        assert!(display.contains("t = 1.5"));
        assert!(display.contains("(0, 1)"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(MeshError::SelfLoop { vertex: 0 }.kind(), ErrorKind::InvalidArgument);
        assert_eq!(MeshError::EmptySelection.kind(), ErrorKind::Precondition);
        assert_eq!(MeshError::NotTriangleMesh { face: 3 }.kind(), ErrorKind::Precondition);
        let overflow = MeshError::IndexOverflow { kind: "vertex", slot: 65_535 };
        assert_eq!(overflow.kind(), ErrorKind::Precondition);
        assert_eq!(format!("{overflow}"), "no vertex id left: slot 65535 does not fit the index type");
        assert_eq!(
            MeshError::DuplicateEdge { v0: 1, v1: 2 }.kind(),
            ErrorKind::TopologyViolation
        );
        assert_eq!(
            MeshError::DegenerateGeometry("zero area".into()).kind(),
            ErrorKind::Numerical
        );
    }
}
