//! Subdivision surfaces.
//!
//! Every scheme reads the input mesh and returns a new one; the input is
//! never modified.
//!
//! # Schemes
//!
//! - **Catmull–Clark** (Catmull & Clark, 1978): any polygon mesh in, all
//!   quads out. Face points at centroids, edge points averaging the edge ends
//!   and both face points, vertex points `(Q + 2R + (n-3)v) / n`.
//! - **Loop** (Loop, 1987): triangles only. Every triangle splits into four;
//!   old vertices move by the `β` mask.
//! - **Doo–Sabin** (Doo & Sabin, 1978): each face shrinks, and new faces
//!   fill the gaps at every edge and every interior vertex.
//! - **Modified Butterfly** (Zorin, Schröder & Sweldens, 1996): triangles
//!   only, interpolating. Old vertices stay put; edge points use the
//!   ten-point butterfly stencil, with special stencils at extraordinary
//!   vertices.
//! - **Simple**: linear midpoint split; the shape does not change.
//! - **Adaptive**: only faces larger than an area threshold are split, and
//!   their neighbors gain the new edge midpoints.
//!
//! # Example
//!
//! ```
//! use chisel::algo::subdivide::{subdivide, SubdivideOptions};
//! use chisel::mesh::{primitives, HalfEdgeMesh};
//!
//! let cube: HalfEdgeMesh = primitives::cube(1.0).unwrap();
//! let smooth = subdivide(&cube, &SubdivideOptions::new(1)).unwrap();
//!
//! assert_eq!(smooth.num_vertices(), 26);
//! assert_eq!(smooth.num_faces(), 24);
//! assert_eq!(cube.num_faces(), 6);
//! ```
//!
//! # References
//!
//! - Catmull, E. & Clark, J. (1978). "Recursively generated B-spline surfaces
//!   on arbitrary topological meshes." Computer-Aided Design, 10(6).
//! - Doo, D. & Sabin, M. (1978). "Behaviour of recursive division surfaces
//!   near extraordinary points." Computer-Aided Design, 10(6).
//! - Loop, C. (1987). "Smooth Subdivision Surfaces Based on Triangles."
//!   Master's thesis, University of Utah.
//! - Zorin, D., Schröder, P. & Sweldens, W. (1996). "Interpolating
//!   Subdivision for Meshes with Arbitrary Topology." SIGGRAPH.

mod adaptive;
mod butterfly;
mod catmull_clark;
mod doo_sabin;
mod face_table;
mod loop_subdivision;
mod simple;

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::algo::Progress;
use crate::error::{MeshError, Result};
use crate::mesh::{build_from_polygons, to_face_vertex, HalfEdgeMesh, MeshIndex};

pub use adaptive::{subdivide_adaptive, subdivide_adaptive_with_progress, AdaptiveOptions};

use face_table::FaceTable;

/// Subdivision scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SubdivisionScheme {
    /// Catmull–Clark; polygons in, quads out.
    #[default]
    CatmullClark,
    /// Loop; triangles only.
    Loop,
    /// Doo–Sabin dual scheme.
    DooSabin,
    /// Modified Butterfly; triangles only, interpolating.
    Butterfly,
    /// Linear midpoint split.
    Simple,
}

/// How Catmull–Clark treats boundary and crease edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BoundaryRule {
    /// Boundary vertices keep their position.
    Sharp,
    /// Boundary vertices follow the cubic B-spline of the boundary curve.
    #[default]
    Smooth,
    /// Like `Smooth`, and interior edges whose dihedral angle exceeds
    /// [`SubdivideOptions::crease_angle`] are treated as boundary.
    CreaseAngle,
}

/// Options for [`subdivide`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SubdivideOptions {
    /// Scheme to apply.
    pub scheme: SubdivisionScheme,

    /// Number of subdivision levels.
    pub levels: usize,

    /// Boundary handling for Catmull–Clark.
    pub boundary_rule: BoundaryRule,

    /// Crease threshold in radians, used with [`BoundaryRule::CreaseAngle`].
    pub crease_angle: f64,

    /// Keep boundary vertices fixed, whatever the scheme.
    pub preserve_boundary: bool,

    /// Whether to compute vertex positions in parallel (default: true).
    pub parallel: bool,

    /// Refuse a level that would produce more faces than this.
    pub max_faces: usize,
}

impl Default for SubdivideOptions {
    fn default() -> Self {
        Self {
            scheme: SubdivisionScheme::CatmullClark,
            levels: 1,
            boundary_rule: BoundaryRule::Smooth,
            crease_angle: 30f64.to_radians(),
            preserve_boundary: false,
            parallel: true,
            max_faces: 4_000_000,
        }
    }
}

impl SubdivideOptions {
    /// Catmull–Clark with `levels` levels.
    pub fn new(levels: usize) -> Self {
        Self {
            levels,
            ..Self::default()
        }
    }

    /// Set the scheme.
    pub fn with_scheme(mut self, scheme: SubdivisionScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Set the boundary rule.
    pub fn with_boundary_rule(mut self, rule: BoundaryRule) -> Self {
        self.boundary_rule = rule;
        self
    }

    /// Set the crease angle in radians.
    pub fn with_crease_angle(mut self, angle: f64) -> Self {
        self.crease_angle = angle;
        self
    }

    /// Set whether boundary vertices stay fixed.
    pub fn with_preserve_boundary(mut self, preserve: bool) -> Self {
        self.preserve_boundary = preserve;
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the face limit.
    pub fn with_max_faces(mut self, max_faces: usize) -> Self {
        self.max_faces = max_faces;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.boundary_rule == BoundaryRule::CreaseAngle
            && !(self.crease_angle.is_finite() && self.crease_angle >= 0.0)
        {
            return Err(MeshError::invalid_param(
                "crease_angle",
                self.crease_angle,
                "must be a non-negative angle",
            ));
        }
        Ok(())
    }
}

/// Subdivide `mesh` and return the result.
pub fn subdivide<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, options: &SubdivideOptions) -> Result<HalfEdgeMesh<I>> {
    subdivide_with_progress(mesh, options, &Progress::none())
}

/// [`subdivide`] with one progress report per level.
pub fn subdivide_with_progress<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    options: &SubdivideOptions,
    progress: &Progress,
) -> Result<HalfEdgeMesh<I>> {
    options.validate()?;
    if mesh.num_faces() == 0 {
        warn!("cannot subdivide a mesh without faces");
        return Err(MeshError::EmptyMesh);
    }

    let (mut positions, mut faces) = to_face_vertex(mesh);
    for level in 0..options.levels {
        progress.report(level, options.levels, scheme_name(options.scheme));
        let projected = projected_faces(options.scheme, &faces);
        if projected > options.max_faces {
            warn!(projected, max = options.max_faces, "subdivision level refused");
            return Err(MeshError::MeshTooLarge {
                current: faces.len(),
                projected,
                max: options.max_faces,
            });
        }

        let table = FaceTable::new(positions.len(), &faces);
        let (p, f) = match options.scheme {
            SubdivisionScheme::CatmullClark => catmull_clark::subdivide_once(&positions, &faces, &table, options),
            SubdivisionScheme::Loop => loop_subdivision::subdivide_once(&positions, &faces, &table, options)?,
            SubdivisionScheme::DooSabin => doo_sabin::subdivide_once(&positions, &faces, &table),
            SubdivisionScheme::Butterfly => butterfly::subdivide_once(&positions, &faces, &table, options)?,
            SubdivisionScheme::Simple => simple::subdivide_once(&positions, &faces, &table),
        };
        positions = p;
        faces = f;
        debug!(level = level + 1, vertices = positions.len(), faces = faces.len(), "subdivided");
    }
    progress.report(options.levels, options.levels, scheme_name(options.scheme));

    let result = build_from_polygons(&positions, &faces)?;
    info!(
        scheme = scheme_name(options.scheme),
        levels = options.levels,
        faces = result.num_faces(),
        "subdivision finished"
    );
    Ok(result)
}

/// Catmull–Clark subdivision.
pub fn catmull_clark_subdivide<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, levels: usize) -> Result<HalfEdgeMesh<I>> {
    subdivide(mesh, &SubdivideOptions::new(levels))
}

/// Loop subdivision; fails on meshes with non-triangular faces.
pub fn loop_subdivide<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, levels: usize) -> Result<HalfEdgeMesh<I>> {
    subdivide(mesh, &SubdivideOptions::new(levels).with_scheme(SubdivisionScheme::Loop))
}

/// Doo–Sabin subdivision.
pub fn doo_sabin_subdivide<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, levels: usize) -> Result<HalfEdgeMesh<I>> {
    subdivide(mesh, &SubdivideOptions::new(levels).with_scheme(SubdivisionScheme::DooSabin))
}

/// Modified Butterfly subdivision; fails on meshes with non-triangular faces.
pub fn butterfly_subdivide<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, levels: usize) -> Result<HalfEdgeMesh<I>> {
    subdivide(mesh, &SubdivideOptions::new(levels).with_scheme(SubdivisionScheme::Butterfly))
}

fn scheme_name(scheme: SubdivisionScheme) -> &'static str {
    match scheme {
        SubdivisionScheme::CatmullClark => "Catmull-Clark subdivision",
        SubdivisionScheme::Loop => "Loop subdivision",
        SubdivisionScheme::DooSabin => "Doo-Sabin subdivision",
        SubdivisionScheme::Butterfly => "Butterfly subdivision",
        SubdivisionScheme::Simple => "simple subdivision",
    }
}

fn projected_faces(scheme: SubdivisionScheme, faces: &[Vec<usize>]) -> usize {
    match scheme {
        SubdivisionScheme::CatmullClark => faces.iter().map(Vec::len).sum(),
        SubdivisionScheme::Simple => faces.iter().map(|f| if f.len() == 3 { 4 } else { f.len() }).sum(),
        SubdivisionScheme::Loop | SubdivisionScheme::Butterfly => faces.len().saturating_mul(4),
        // Upper bound: one face per face, per edge and per vertex corner.
        SubdivisionScheme::DooSabin => faces.len() + faces.iter().map(Vec::len).sum::<usize>() * 2,
    }
}

/// Evaluate `f` over `0..n`, in parallel when asked.
fn map_indices<T, F>(n: usize, parallel: bool, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if parallel {
        (0..n).into_par_iter().map(f).collect()
    } else {
        (0..n).map(f).collect()
    }
}

fn average<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Point3<f64> {
    let mut sum = nalgebra::Vector3::zeros();
    let mut count = 0usize;
    for p in points {
        sum += p.coords;
        count += 1;
    }
    if count == 0 {
        Point3::origin()
    } else {
        Point3::from(sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives;

    #[test]
    fn test_zero_levels_copies_mesh() {
        let cube: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let out = subdivide(&cube, &SubdivideOptions::new(0)).unwrap();
        assert_eq!(out.num_vertices(), 8);
        assert_eq!(out.num_faces(), 6);
    }

    #[test]
    fn test_empty_mesh_is_refused() {
        let mesh: HalfEdgeMesh = HalfEdgeMesh::new();
        assert!(matches!(subdivide(&mesh, &SubdivideOptions::new(1)), Err(MeshError::EmptyMesh)));
    }

    #[test]
    fn test_face_limit() {
        let cube: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let options = SubdivideOptions::new(3).with_max_faces(100);
        match subdivide(&cube, &options) {
            Err(MeshError::MeshTooLarge { current, projected, max }) => {
                assert_eq!(current, 96);
                assert_eq!(projected, 384);
                assert_eq!(max, 100);
            }
            other => panic!("expected MeshTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn test_progress_reports_each_level() {
        use std::sync::{Arc, Mutex};
        let steps = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&steps);
        let progress = Progress::new(move |s, t, _| sink.lock().unwrap().push((s, t)));
        let cube: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        subdivide_with_progress(&cube, &SubdivideOptions::new(2), &progress).unwrap();
        assert_eq!(*steps.lock().unwrap(), vec![(0, 2), (1, 2), (2, 2)]);
    }

    #[test]
    fn test_negative_crease_angle_is_refused() {
        let cube: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let options = SubdivideOptions::new(1)
            .with_boundary_rule(BoundaryRule::CreaseAngle)
            .with_crease_angle(-1.0);
        assert!(subdivide(&cube, &options).is_err());
    }
}
