//! Mesh smoothing.
//!
//! Smoothing only moves vertices; connectivity is never touched.
//!
//! - [`laplacian_smooth`]: uniform Laplacian smoothing (shrinks over many
//!   iterations)
//! - [`taubin_smooth`]: Taubin's λ|μ smoothing (reduces shrinkage)
//! - [`smooth_vertices`]: Laplacian smoothing of a vertex subset, such as
//!   the current selection
//!
//! # Example
//!
//! ```
//! use chisel::algo::smooth::{laplacian_smooth, SmoothOptions};
//! use chisel::mesh::{primitives, HalfEdgeMesh};
//!
//! let mut cube: HalfEdgeMesh = primitives::cube(2.0).unwrap();
//! laplacian_smooth(&mut cube, &SmoothOptions::default().with_iterations(3));
//!
//! assert_eq!(cube.num_faces(), 6);
//! ```

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::mesh::{HalfEdgeMesh, MeshIndex, VertexId};

use super::Progress;

/// Parameters shared by the smoothing passes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SmoothOptions {
    /// Passes over the vertex set.
    pub iterations: usize,

    /// Step toward the neighbor centroid, in `[0, 1]`.
    pub lambda: f64,

    /// Pin vertices on a boundary loop.
    pub preserve_boundary: bool,

    /// Compute new positions with rayon.
    pub parallel: bool,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self {
            iterations: 1,
            lambda: 0.5,
            preserve_boundary: true,
            parallel: true,
        }
    }
}

impl SmoothOptions {
    /// Set the pass count.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    /// Set the step factor, clamped to `[0, 1]`.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda.clamp(0.0, 1.0);
        self
    }

    /// Let boundary vertices move too.
    pub fn allow_boundary_movement(mut self) -> Self {
        self.preserve_boundary = false;
        self
    }

    /// Toggle rayon.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Shorthand for `with_parallel(false)`.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Laplacian smoothing of every vertex.
///
/// For each iteration, every vertex moves toward the centroid `c` of its
/// neighbors: `new_pos = old_pos + λ * (c - old_pos)`.
pub fn laplacian_smooth<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, options: &SmoothOptions) {
    laplacian_smooth_with_progress(mesh, options, &Progress::none());
}

/// [`laplacian_smooth`] with one progress report per iteration.
pub fn laplacian_smooth_with_progress<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    options: &SmoothOptions,
    progress: &Progress,
) {
    let vertices: Vec<VertexId<I>> = mesh.vertex_ids().collect();
    smooth_subset(mesh, &vertices, options, progress);
}

/// Laplacian smoothing restricted to `vertices`.
///
/// Other vertices act as fixed neighbors.
pub fn smooth_vertices<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, vertices: &[VertexId<I>], options: &SmoothOptions) {
    let live: Vec<VertexId<I>> = vertices.iter().copied().filter(|&v| mesh.contains_vertex(v)).collect();
    smooth_subset(mesh, &live, options, &Progress::none());
}

/// Taubin smoothing.
///
/// Every iteration applies a shrinking step with `λ` followed by an
/// inflating step with `μ = λ / (0.1 λ - 1)`, which is negative.
///
/// # Reference
///
/// Taubin, G. (1995). "A signal processing approach to fair surface design."
/// SIGGRAPH '95.
pub fn taubin_smooth<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, options: &SmoothOptions) {
    if options.iterations == 0 || options.lambda == 0.0 {
        return;
    }
    let lambda = options.lambda;
    let mu = lambda / (0.1 * lambda - 1.0);
    let vertices: Vec<VertexId<I>> = mesh.vertex_ids().collect();
    let movable = movable_vertices(mesh, &vertices, options.preserve_boundary);
    for _ in 0..options.iterations {
        laplacian_step(mesh, &movable, lambda, options.parallel);
        laplacian_step(mesh, &movable, mu, options.parallel);
    }
    mesh.update_normals();
    debug!(iterations = options.iterations, lambda, mu, "taubin smoothing");
}

fn smooth_subset<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    vertices: &[VertexId<I>],
    options: &SmoothOptions,
    progress: &Progress,
) {
    if options.iterations == 0 || options.lambda == 0.0 || vertices.is_empty() {
        return;
    }

    let movable = movable_vertices(mesh, vertices, options.preserve_boundary);
    for iter in 0..options.iterations {
        progress.report(iter, options.iterations, "Laplacian smoothing");
        laplacian_step(mesh, &movable, options.lambda, options.parallel);
    }
    progress.report(options.iterations, options.iterations, "Laplacian smoothing");

    mesh.update_normals();
    debug!(
        vertices = movable.len(),
        iterations = options.iterations,
        lambda = options.lambda,
        "laplacian smoothing"
    );
}

fn movable_vertices<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, vertices: &[VertexId<I>], preserve_boundary: bool) -> Vec<VertexId<I>> {
    vertices
        .iter()
        .copied()
        .filter(|&v| !(preserve_boundary && mesh.is_boundary_vertex(v)))
        .collect()
}

/// Move every vertex of `movable` by `factor` toward its neighbor centroid,
/// using positions from before the step.
fn laplacian_step<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, movable: &[VertexId<I>], factor: f64, parallel: bool) {
    let new_positions: Vec<Point3<f64>> = if parallel {
        let view = &*mesh;
        movable
            .par_iter()
            .map(|&v| compute_laplacian_step(view, v, factor))
            .collect()
    } else {
        movable
            .iter()
            .map(|&v| compute_laplacian_step(mesh, v, factor))
            .collect()
    };

    for (&v, p) in movable.iter().zip(new_positions) {
        mesh.set_position(v, p);
    }
}

/// Compute the new position of a vertex after one Laplacian step.
fn compute_laplacian_step<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, v: VertexId<I>, factor: f64) -> Point3<f64> {
    let pos = *mesh.position(v);

    let mut sum = Vector3::zeros();
    let mut count = 0usize;
    for n in mesh.vertex_neighbors(v) {
        sum += mesh.position(n).coords;
        count += 1;
    }
    if count == 0 {
        return pos;
    }

    let centroid = Point3::from(sum / count as f64);
    pos + (centroid - pos) * factor
}
