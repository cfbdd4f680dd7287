//! Loop cuts through strips of quads.
//!
//! Starting from a seed edge, the loop runs across each quad to the opposite
//! edge until it comes back to the seed (closed loop) or reaches the boundary
//! or a face that is not a quad (open loop). Every edge crossed is split and
//! the quads are cut into strips along the new vertices.
//!
//! # Example
//!
//! ```
//! use chisel::algo::loop_cut::{create_loop_cut, LoopCutOptions};
//! use chisel::mesh::{primitives, HalfEdgeMesh, VertexId};
//!
//! let mut mesh: HalfEdgeMesh = primitives::cube(1.0).unwrap();
//! let seed = mesh.find_halfedge(VertexId::new(0), VertexId::new(3)).unwrap();
//!
//! let cuts = create_loop_cut(&mut mesh, seed, &LoopCutOptions::default()).unwrap();
//! assert_eq!(cuts[0].vertices.len(), 4);
//! assert_eq!(mesh.num_faces(), 10);
//! ```

use tracing::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::geometry::EPSILON;
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// Options for [`create_loop_cut`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoopCutOptions {
    /// Number of parallel loops to insert.
    pub num_cuts: usize,

    /// Cut position along each crossed edge, measured from the seed's origin side.
    pub position: f64,

    /// Spread the cuts evenly over the edge, ignoring `position`.
    pub even_spacing: bool,
}

impl Default for LoopCutOptions {
    fn default() -> Self {
        Self {
            num_cuts: 1,
            position: 0.5,
            even_spacing: false,
        }
    }
}

impl LoopCutOptions {
    /// Options for `num_cuts` evenly spaced loops.
    pub fn new(num_cuts: usize) -> Self {
        Self {
            num_cuts,
            position: 0.5,
            even_spacing: true,
        }
    }

    /// Set the cut position.
    pub fn with_position(mut self, position: f64) -> Self {
        self.position = position;
        self
    }

    /// Set whether cuts are evenly spaced.
    pub fn with_even_spacing(mut self, even_spacing: bool) -> Self {
        self.even_spacing = even_spacing;
        self
    }

    /// Parameters of the cuts along an edge, in increasing order.
    pub fn positions(&self) -> Result<Vec<f64>> {
        let k = self.num_cuts;
        if k == 0 {
            return Err(MeshError::invalid_param("num_cuts", k, "must be at least 1"));
        }
        if self.even_spacing {
            return Ok((1..=k).map(|j| j as f64 / (k + 1) as f64).collect());
        }
        let p = self.position;
        if !(p > EPSILON && p < 1.0 - EPSILON) {
            return Err(MeshError::invalid_param("position", p, "must lie strictly inside (0, 1)"));
        }
        if k == 1 {
            return Ok(vec![p]);
        }
        let spacing = 2.0 * p.min(1.0 - p) / (k + 1) as f64;
        Ok(centered(p, k, spacing))
    }
}

/// `num_cuts` parameters centred on 0.5, `spacing` apart.
pub fn parallel_positions(num_cuts: usize, spacing: f64) -> Result<Vec<f64>> {
    if num_cuts == 0 {
        return Err(MeshError::invalid_param("num_cuts", num_cuts, "must be at least 1"));
    }
    let ts = centered(0.5, num_cuts, spacing);
    let lo = ts.first().copied().unwrap_or(0.5);
    let hi = ts.last().copied().unwrap_or(0.5);
    if !(spacing > 0.0 || num_cuts == 1) || lo <= EPSILON || hi >= 1.0 - EPSILON {
        return Err(MeshError::invalid_param("spacing", spacing, "cuts must stay inside (0, 1)"));
    }
    Ok(ts)
}

fn centered(center: f64, k: usize, spacing: f64) -> Vec<f64> {
    let mid = (k as f64 + 1.0) * 0.5;
    (1..=k).map(|j| center + (j as f64 - mid) * spacing).collect()
}

/// A strip of quads found by [`detect_loop`].
///
/// `rungs[i]` is the half-edge through which the loop enters `faces[i]`; the
/// loop leaves that face through `twin(rungs[i + 1])`. Open loops carry one
/// extra rung, the edge where the strip ends. All rungs point the same way
/// across the strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLoop<I: MeshIndex = u32> {
    /// Crossed edges, in loop order.
    pub rungs: Vec<HalfEdgeId<I>>,
    /// Crossed quads, in loop order.
    pub faces: Vec<FaceId<I>>,
    /// Whether the strip wraps around to the seed.
    pub closed: bool,
}

impl<I: MeshIndex> EdgeLoop<I> {
    /// Number of edges the loop crosses.
    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    /// Whether the loop crosses no edges.
    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }
}

/// One inserted loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CutLoop<I: MeshIndex = u32> {
    /// New vertices, one per crossed edge, in loop order.
    pub vertices: Vec<VertexId<I>>,
    /// New edges between consecutive new vertices, one per crossed quad.
    pub edges: Vec<HalfEdgeId<I>>,
}

/// Find the quad strip crossing `start_edge`.
///
/// Fails with `LoopTooShort` when neither side of the edge is a quad, and
/// when a strip would cross the same quad twice.
pub fn detect_loop<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, start_edge: HalfEdgeId<I>) -> Result<EdgeLoop<I>> {
    let Some(seed) = mesh.halfedge(start_edge) else {
        return Err(MeshError::HalfEdgeNotFound(start_edge.index()));
    };
    if seed.is_boundary() && mesh.is_boundary_halfedge(seed.twin) {
        warn!(edge = start_edge.index(), "loop seed is a wire edge");
        return Err(MeshError::LoopTooShort {
            edge: start_edge.index(),
        });
    }

    let forward = walk(mesh, start_edge)?;
    if forward.closed {
        trace!(faces = forward.faces.len(), "closed edge loop");
        return Ok(forward);
    }

    let backward = walk(mesh, mesh.twin(start_edge))?;
    let mut rungs = Vec::with_capacity(backward.rungs.len() + forward.rungs.len());
    let mut faces = Vec::with_capacity(backward.faces.len() + forward.faces.len());
    // backward.rungs[j] enters g_j; walking the other way enters g_j through
    // twin(backward.rungs[j + 1]).
    for j in (0..backward.faces.len()).rev() {
        rungs.push(mesh.twin(backward.rungs[j + 1]));
        faces.push(backward.faces[j]);
    }
    rungs.extend_from_slice(&forward.rungs);
    faces.extend_from_slice(&forward.faces);

    for (i, f) in faces.iter().enumerate() {
        if faces[..i].contains(f) {
            warn!(face = f.index(), "edge loop crosses a face twice");
            return Err(MeshError::LoopTooShort {
                edge: start_edge.index(),
            });
        }
    }
    if faces.is_empty() {
        warn!(edge = start_edge.index(), "edge loop crosses no quads");
        return Err(MeshError::LoopTooShort {
            edge: start_edge.index(),
        });
    }
    trace!(faces = faces.len(), rungs = rungs.len(), "open edge loop");
    Ok(EdgeLoop {
        rungs,
        faces,
        closed: false,
    })
}

/// Walk across quads starting by entering the face of `entry`.
fn walk<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, entry: HalfEdgeId<I>) -> Result<EdgeLoop<I>> {
    let mut rungs = vec![entry];
    let mut faces = Vec::new();
    let mut cur = entry;
    loop {
        let f = mesh.face_of(cur);
        if !f.is_valid() || mesh.face_degree(f) != 4 || faces.contains(&f) {
            break;
        }
        faces.push(f);
        let next = mesh.twin(mesh.next(mesh.next(cur)));
        if next == entry {
            return Ok(EdgeLoop {
                rungs,
                faces,
                closed: true,
            });
        }
        rungs.push(next);
        cur = next;
    }
    Ok(EdgeLoop {
        rungs,
        faces,
        closed: false,
    })
}

/// Insert loop cuts across the strip through `start_edge`.
///
/// Returns one [`CutLoop`] per cut, ordered by increasing parameter. On
/// failure the mesh is left unchanged.
pub fn create_loop_cut<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    start_edge: HalfEdgeId<I>,
    options: &LoopCutOptions,
) -> Result<Vec<CutLoop<I>>> {
    let positions = options.positions()?;
    cut_at(mesh, start_edge, &positions)
}

/// Insert `num_cuts` parallel loops centred on the middle of the strip.
pub fn create_parallel_loop_cuts<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    start_edge: HalfEdgeId<I>,
    num_cuts: usize,
    spacing: f64,
) -> Result<Vec<CutLoop<I>>> {
    let positions = parallel_positions(num_cuts, spacing)?;
    cut_at(mesh, start_edge, &positions)
}

fn cut_at<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    start_edge: HalfEdgeId<I>,
    positions: &[f64],
) -> Result<Vec<CutLoop<I>>> {
    let edge_loop = detect_loop(mesh, start_edge)?;
    let snapshot = mesh.clone();
    match apply_cuts(mesh, &edge_loop, positions) {
        Ok(cuts) => {
            debug!(
                cuts = cuts.len(),
                faces = edge_loop.faces.len(),
                closed = edge_loop.closed,
                "loop cut"
            );
            Ok(cuts)
        }
        Err(e) => {
            warn!(error = %e, "loop cut failed, mesh restored");
            *mesh = snapshot;
            Err(e)
        }
    }
}

fn apply_cuts<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    edge_loop: &EdgeLoop<I>,
    positions: &[f64],
) -> Result<Vec<CutLoop<I>>> {
    let k = positions.len();

    // Vertex chains along each rung, origin to target.
    let mut chains: Vec<Vec<VertexId<I>>> = Vec::with_capacity(edge_loop.rungs.len());
    for &rung in &edge_loop.rungs {
        let mut chain = vec![mesh.origin(rung)];
        let target = mesh.target(rung);
        let mut piece = rung;
        let mut done = 0.0;
        for &t in positions {
            let local = (t - done) / (1.0 - done);
            let (m, rest) = mesh.split_edge(piece, local)?;
            chain.push(m);
            piece = rest;
            done = t;
        }
        chain.push(target);
        chains.push(chain);
    }

    let flags: Vec<(bool, bool)> = edge_loop
        .faces
        .iter()
        .map(|&f| (mesh[f].selected, mesh[f].marked))
        .collect();
    for &f in &edge_loop.faces {
        mesh.remove_face(f);
    }

    let n = chains.len();
    for (i, &(selected, marked)) in flags.iter().enumerate() {
        let near = &chains[i];
        let far = &chains[(i + 1) % n];
        for j in 0..=k {
            let quad = mesh.create_quad_face(near[j], near[j + 1], far[j + 1], far[j])?;
            mesh[quad].selected = selected;
            mesh[quad].marked = marked;
        }
    }

    let mut cuts = Vec::with_capacity(k);
    for j in 1..=k {
        let vertices: Vec<VertexId<I>> = chains.iter().map(|c| c[j]).collect();
        let edges = (0..edge_loop.faces.len())
            .filter_map(|i| mesh.find_halfedge(chains[i][j], chains[(i + 1) % n][j]))
            .collect();
        cuts.push(CutLoop { vertices, edges });
    }
    Ok(cuts)
}
