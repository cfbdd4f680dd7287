//! Edge and vertex bevel.
//!
//! An edge bevel replaces an edge by two parallel edges, each slid
//! `amount / 2` along the neighboring edges of one adjacent face, and fills
//! the gap with a strip of `segments` quads. Where an endpoint has exactly
//! three faces the third face absorbs the profile and the old corner goes
//! away; other endpoints keep their vertex and close the strip with a patch
//! polygon.
//!
//! A vertex bevel cuts the vertex off with a polygon whose corners sit
//! `amount` along each incident edge.
//!
//! # Example
//!
//! ```
//! use chisel::algo::bevel::{bevel_edges, BevelOptions};
//! use chisel::mesh::{primitives, HalfEdgeMesh, VertexId};
//!
//! let mut cube: HalfEdgeMesh = primitives::cube(2.0).unwrap();
//! let he = cube.find_halfedge(VertexId::new(0), VertexId::new(1)).unwrap();
//! bevel_edges(&mut cube, &[he], &BevelOptions::new(0.2)).unwrap();
//!
//! assert_eq!(cube.num_vertices(), 10);
//! assert_eq!(cube.num_faces(), 7);
//! ```

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// Largest fraction of an edge a bevel corner may slide along it.
const MAX_SLIDE: f64 = 0.45;

/// Options for [`bevel_edges`] and [`bevel_vertices`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BevelOptions {
    /// Bevel width.
    pub amount: f64,

    /// Number of quads across an edge bevel.
    pub segments: usize,
}

impl Default for BevelOptions {
    fn default() -> Self {
        Self {
            amount: 0.1,
            segments: 1,
        }
    }
}

impl BevelOptions {
    /// Single-segment bevel of the given width.
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    /// Set the segment count.
    pub fn with_segments(mut self, segments: usize) -> Self {
        self.segments = segments;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.amount.is_finite() && self.amount > 0.0) {
            return Err(MeshError::invalid_param("amount", self.amount, "must be positive"));
        }
        if self.segments == 0 {
            return Err(MeshError::invalid_param("segments", self.segments, "must be at least 1"));
        }
        Ok(())
    }
}

/// Elements created by a bevel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BevelResult<I: MeshIndex = u32> {
    /// Bevel strips, patches and vertex caps.
    pub faces: Vec<FaceId<I>>,
    /// New vertices.
    pub vertices: Vec<VertexId<I>>,
}

impl<I: MeshIndex> Default for BevelResult<I> {
    fn default() -> Self {
        Self {
            faces: Vec::new(),
            vertices: Vec::new(),
        }
    }
}

/// A face to rebuild over a new vertex loop, keeping its flags.
struct Rebuild<I: MeshIndex> {
    vertices: Vec<VertexId<I>>,
    selected: bool,
    marked: bool,
}

/// Bevel `edges`, one after another.
///
/// Every edge needs a face on both sides, and no two edges may share an
/// endpoint. On failure the mesh is left unchanged.
pub fn bevel_edges<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    edges: &[HalfEdgeId<I>],
    options: &BevelOptions,
) -> Result<BevelResult<I>> {
    options.validate()?;
    if edges.is_empty() {
        warn!("no edges to bevel");
        return Err(MeshError::EmptySelection);
    }

    let mut seen_edges = HashSet::new();
    let mut endpoints = HashSet::new();
    let mut pairs = Vec::new();
    for &he in edges {
        if !mesh.contains_halfedge(he) {
            return Err(MeshError::HalfEdgeNotFound(he.index()));
        }
        if !seen_edges.insert(mesh.edge_key(he)) {
            continue;
        }
        if mesh.is_boundary_edge(he) {
            warn!(halfedge = he.index(), "cannot bevel a boundary edge");
            return Err(MeshError::BoundaryEdge { edge: he.index() });
        }
        let (a, b) = (mesh.origin(he), mesh.target(he));
        if !endpoints.insert(a) || !endpoints.insert(b) {
            return Err(MeshError::invalid_param(
                "edges",
                he.index(),
                "beveled edges must not share a vertex",
            ));
        }
        pairs.push((a, b));
    }

    let snapshot = mesh.clone();
    let mut result = BevelResult::default();
    let outcome = pairs
        .iter()
        .try_for_each(|&(a, b)| bevel_edge(mesh, a, b, options, &mut result));
    finish(mesh, snapshot, outcome, result, "edge bevel")
}

/// Cut off each of `vertices` with a polygon.
///
/// Vertices must be interior, of valence at least three, and not adjacent
/// to each other. On failure the mesh is left unchanged.
pub fn bevel_vertices<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    vertices: &[VertexId<I>],
    options: &BevelOptions,
) -> Result<BevelResult<I>> {
    options.validate()?;
    if vertices.is_empty() {
        warn!("no vertices to bevel");
        return Err(MeshError::EmptySelection);
    }

    let mut unique: Vec<VertexId<I>> = Vec::new();
    for &v in vertices {
        if !mesh.contains_vertex(v) {
            return Err(MeshError::VertexNotFound(v.index()));
        }
        if unique.contains(&v) {
            continue;
        }
        if mesh.is_boundary_vertex(v) {
            warn!(vertex = v.index(), "cannot bevel a boundary vertex");
            return Err(MeshError::BoundaryEdge {
                edge: mesh.outgoing(v).index(),
            });
        }
        if unique.iter().any(|&u| mesh.find_halfedge(u, v).is_some()) {
            return Err(MeshError::invalid_param(
                "vertices",
                v.index(),
                "beveled vertices must not be adjacent",
            ));
        }
        unique.push(v);
    }

    let snapshot = mesh.clone();
    let mut result = BevelResult::default();
    let outcome = unique
        .iter()
        .try_for_each(|&v| bevel_vertex(mesh, v, options, &mut result));
    finish(mesh, snapshot, outcome, result, "vertex bevel")
}

fn finish<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    snapshot: HalfEdgeMesh<I>,
    outcome: Result<()>,
    result: BevelResult<I>,
    what: &str,
) -> Result<BevelResult<I>> {
    match outcome {
        Ok(()) => {
            mesh.update_normals();
            debug!(faces = result.faces.len(), vertices = result.vertices.len(), "{what}");
            Ok(result)
        }
        Err(e) => {
            warn!(error = %e, "{what} failed, mesh restored");
            *mesh = snapshot;
            Err(e)
        }
    }
}

fn bevel_edge<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    a: VertexId<I>,
    b: VertexId<I>,
    options: &BevelOptions,
    result: &mut BevelResult<I>,
) -> Result<()> {
    let he = mesh.find_halfedge(a, b).ok_or_else(|| MeshError::NonManifold {
        details: format!("edge ({}, {}) vanished during bevel", a.index(), b.index()),
    })?;
    if mesh.valence(a) < 3 || mesh.valence(b) < 3 {
        return Err(MeshError::DegenerateGeometry("bevel endpoint has valence below 3".into()));
    }
    let twin = mesh.twin(he);
    let (f1, f2) = (mesh.face_of(he), mesh.face_of(twin));

    // f1 runs p -> a -> b -> r, f2 runs s -> b -> a -> q.
    let a_p = mesh.twin(mesh.prev(he));
    let a_q = mesh.next(twin);
    let b_r = mesh.next(he);
    let b_s = mesh.twin(mesh.prev(twin));

    let half = options.amount * 0.5;
    let slide = |mesh: &HalfEdgeMesh<I>, e: HalfEdgeId<I>| (half / mesh.edge_length(e)).min(MAX_SLIDE);
    let (t_ap, t_aq, t_br, t_bs) = (slide(mesh, a_p), slide(mesh, a_q), slide(mesh, b_r), slide(mesh, b_s));

    let end_a = absorbing_face(mesh, a, f1, f2);
    let end_b = absorbing_face(mesh, b, f1, f2).filter(|&g| Some(g) != end_a);

    let (a1, _) = mesh.split_edge(a_p, t_ap)?;
    let (a2, _) = mesh.split_edge(a_q, t_aq)?;
    let (b1, _) = mesh.split_edge(b_r, t_br)?;
    let (b2, _) = mesh.split_edge(b_s, t_bs)?;
    result.vertices.extend([a1, a2, b1, b2]);

    // Profiles run a1 -> a2 and b1 -> b2.
    let s = options.segments;
    let mut profile_a = vec![a1];
    let mut profile_b = vec![b1];
    for i in 1..s {
        let t = i as f64 / s as f64;
        let pa = mesh.position(a1).coords.lerp(&mesh.position(a2).coords, t);
        let pb = mesh.position(b1).coords.lerp(&mesh.position(b2).coords, t);
        let va = mesh.add_vertex(pa.into());
        let vb = mesh.add_vertex(pb.into());
        profile_a.push(va);
        profile_b.push(vb);
        result.vertices.extend([va, vb]);
    }
    profile_a.push(a2);
    profile_b.push(b2);
    let inner_a = &profile_a[1..s];
    let inner_b = &profile_b[1..s];

    let mut rebuilds = Vec::new();
    let mut old_faces = vec![f1, f2];
    for f in [f1, f2] {
        let ring = mesh.face_vertices(f).filter(|&v| v != a && v != b).collect();
        rebuilds.push(rebuild(mesh, f, ring));
    }
    if let Some(g) = end_a {
        let reversed: Vec<VertexId<I>> = inner_a.iter().rev().copied().collect();
        let ring = replace_corner(mesh, g, a, &reversed);
        rebuilds.push(rebuild(mesh, g, ring));
        old_faces.push(g);
    }
    if let Some(g) = end_b {
        let ring = replace_corner(mesh, g, b, inner_b);
        rebuilds.push(rebuild(mesh, g, ring));
        old_faces.push(g);
    }

    for &f in &old_faces {
        mesh.remove_face(f);
    }
    mesh.remove_edge(he);
    if end_a.is_some() {
        mesh.remove_vertex(a);
    }
    if end_b.is_some() {
        mesh.remove_vertex(b);
    }

    for face in &rebuilds {
        let f = mesh.add_face(&face.vertices)?;
        mesh[f].selected = face.selected;
        mesh[f].marked = face.marked;
    }
    for i in 0..s {
        let f = mesh.add_face(&[profile_b[i], profile_a[i], profile_a[i + 1], profile_b[i + 1]])?;
        result.faces.push(f);
    }
    if end_a.is_none() {
        let patch: Vec<VertexId<I>> = [a1, a, a2].into_iter().chain(inner_a.iter().rev().copied()).collect();
        result.faces.push(mesh.add_face(&patch)?);
    }
    if end_b.is_none() {
        let patch: Vec<VertexId<I>> = [b2, b, b1].into_iter().chain(inner_b.iter().copied()).collect();
        result.faces.push(mesh.add_face(&patch)?);
    }
    Ok(())
}

/// The third face of an interior vertex with exactly three faces.
fn absorbing_face<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, v: VertexId<I>, f1: FaceId<I>, f2: FaceId<I>) -> Option<FaceId<I>> {
    if mesh.is_boundary_vertex(v) {
        return None;
    }
    let faces: Vec<FaceId<I>> = mesh.vertex_faces(v).collect();
    if faces.len() != 3 {
        return None;
    }
    faces.into_iter().find(|&f| f != f1 && f != f2)
}

/// The corners of `f` with `corner` replaced by `with`.
fn replace_corner<I: MeshIndex>(
    mesh: &HalfEdgeMesh<I>,
    f: FaceId<I>,
    corner: VertexId<I>,
    with: &[VertexId<I>],
) -> Vec<VertexId<I>> {
    let mut ring = Vec::new();
    for v in mesh.face_vertices(f) {
        if v == corner {
            ring.extend_from_slice(with);
        } else {
            ring.push(v);
        }
    }
    ring
}

fn rebuild<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, f: FaceId<I>, vertices: Vec<VertexId<I>>) -> Rebuild<I> {
    Rebuild {
        vertices,
        selected: mesh[f].selected,
        marked: mesh[f].marked,
    }
}

fn bevel_vertex<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    v: VertexId<I>,
    options: &BevelOptions,
    result: &mut BevelResult<I>,
) -> Result<()> {
    if mesh.valence(v) < 3 {
        return Err(MeshError::DegenerateGeometry("bevel vertex has valence below 3".into()));
    }
    let outgoing: Vec<HalfEdgeId<I>> = mesh.vertex_halfedges(v).collect();
    let mut cut = Vec::with_capacity(outgoing.len());
    for he in outgoing {
        let t = (options.amount / mesh.edge_length(he)).min(MAX_SLIDE);
        let (m, _) = mesh.split_edge(he, t)?;
        cut.push(m);
    }
    result.vertices.extend(&cut);

    // Each face runs m_in -> v -> m_out; the cap runs m_out -> m_in.
    let faces: Vec<FaceId<I>> = mesh.vertex_faces(v).collect();
    let mut cap_next: HashMap<VertexId<I>, VertexId<I>> = HashMap::new();
    let mut rebuilds = Vec::with_capacity(faces.len());
    for &f in &faces {
        let ring: Vec<VertexId<I>> = mesh.face_vertices(f).collect();
        let k = ring.len();
        let Some(i) = ring.iter().position(|&x| x == v) else {
            continue;
        };
        cap_next.insert(ring[(i + 1) % k], ring[(i + k - 1) % k]);
        let without: Vec<VertexId<I>> = ring.into_iter().filter(|&x| x != v).collect();
        rebuilds.push(rebuild(mesh, f, without));
    }

    let mut cap = vec![cut[0]];
    loop {
        let last = cap[cap.len() - 1];
        let next = cap_next
            .get(&last)
            .copied()
            .ok_or_else(|| MeshError::DegenerateGeometry("vertex fan is not closed".into()))?;
        if next == cap[0] {
            break;
        }
        if cap.len() > cut.len() {
            return Err(MeshError::DegenerateGeometry("vertex fan is not closed".into()));
        }
        cap.push(next);
    }

    for &f in &faces {
        mesh.remove_face(f);
    }
    mesh.remove_vertex(v);
    for face in &rebuilds {
        let f = mesh.add_face(&face.vertices)?;
        mesh[f].selected = face.selected;
        mesh[f].marked = face.marked;
    }
    result.faces.push(mesh.add_face(&cap)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EPSILON;
    use crate::mesh::primitives;
    use approx::assert_relative_eq;

    fn cube_edge(mesh: &HalfEdgeMesh, a: usize, b: usize) -> HalfEdgeId {
        mesh.find_halfedge(VertexId::new(a), VertexId::new(b)).unwrap()
    }

    #[test]
    fn test_bevel_cube_edge() {
        let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let he = cube_edge(&mesh, 0, 1);
        let result = bevel_edges(&mut mesh, &[he], &BevelOptions::new(0.4)).unwrap();

        assert_eq!(result.faces.len(), 1);
        assert_eq!(result.vertices.len(), 4);
        assert_eq!(mesh.num_vertices(), 10);
        assert_eq!(mesh.num_edges(), 15);
        assert_eq!(mesh.num_faces(), 7);
        assert!(mesh.is_closed());
        assert!(mesh.is_manifold());
        assert!(mesh.validate().is_ok());
        assert!(!mesh.contains_vertex(VertexId::new(0)));

        // The chamfer sits 0.2 in from the old edge on both faces.
        let chamfer = result.faces[0];
        for p in mesh.face_positions(chamfer) {
            let on_bottom = (p.y + 1.0).abs() < EPSILON && (p.z + 0.8).abs() < EPSILON;
            let on_back = (p.z + 1.0).abs() < EPSILON && (p.y + 0.8).abs() < EPSILON;
            assert!(on_bottom || on_back, "unexpected chamfer corner {p:?}");
        }
        assert_relative_eq!(mesh.face_area(chamfer), 2.0 * 0.2 * 2f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_bevel_segments() {
        let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let he = cube_edge(&mesh, 0, 1);
        let options = BevelOptions::new(0.4).with_segments(3);
        let result = bevel_edges(&mut mesh, &[he], &options).unwrap();
        assert_eq!(result.faces.len(), 3);
        assert_eq!(mesh.num_vertices(), 14);
        assert_eq!(mesh.num_faces(), 9);
        assert_eq!(mesh.euler_characteristic(), 2);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_bevel_grid_edge_keeps_endpoints() {
        // Interior edge of a 2x2 grid: one endpoint has four faces, the
        // other lies on the boundary.
        let mut mesh: HalfEdgeMesh = primitives::grid(2, 2, 2.0).unwrap();
        let he = cube_edge(&mesh, 1, 4);
        let result = bevel_edges(&mut mesh, &[he], &BevelOptions::new(0.2)).unwrap();
        assert_eq!(result.faces.len(), 3);
        assert!(mesh.contains_vertex(VertexId::new(1)));
        assert!(mesh.contains_vertex(VertexId::new(4)));
        assert_eq!(mesh.euler_characteristic(), 1);
        assert!(mesh.validate().is_ok());
        assert_relative_eq!(mesh.surface_area(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bevel_refusals() {
        let mut grid: HalfEdgeMesh = primitives::grid(1, 1, 1.0).unwrap();
        let before = grid.clone();
        let he = cube_edge(&grid, 0, 1);
        assert!(matches!(
            bevel_edges(&mut grid, &[he], &BevelOptions::new(0.1)),
            Err(MeshError::BoundaryEdge { .. })
        ));
        assert_eq!(grid, before);

        let mut cube: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let e1 = cube_edge(&cube, 0, 1);
        let e2 = cube_edge(&cube, 1, 2);
        assert!(bevel_edges(&mut cube, &[e1, e2], &BevelOptions::new(0.1)).is_err());
        assert!(bevel_edges(&mut cube, &[e1], &BevelOptions::new(0.1).with_segments(0)).is_err());
        assert!(bevel_edges(&mut cube, &[], &BevelOptions::new(0.1)).is_err());
        assert_eq!(cube.num_faces(), 6);
    }

    #[test]
    fn test_bevel_cube_vertex() {
        let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let corner = VertexId::new(6);
        let result = bevel_vertices(&mut mesh, &[corner], &BevelOptions::new(0.5)).unwrap();

        assert_eq!(result.faces.len(), 1);
        assert_eq!(result.vertices.len(), 3);
        assert_eq!(mesh.num_vertices(), 10);
        assert_eq!(mesh.num_edges(), 15);
        assert_eq!(mesh.num_faces(), 7);
        assert!(mesh.is_closed());
        assert!(mesh.validate().is_ok());

        // The cap faces away from the cube centre.
        let cap = result.faces[0];
        assert_eq!(mesh.face_degree(cap), 3);
        let n = mesh.face_normal(cap);
        assert!(n.x > 0.0 && n.y > 0.0 && n.z > 0.0);
    }

    #[test]
    fn test_bevel_vertex_refusals() {
        let mut grid: HalfEdgeMesh = primitives::grid(2, 2, 2.0).unwrap();
        assert!(bevel_vertices(&mut grid, &[VertexId::new(0)], &BevelOptions::new(0.1)).is_err());
        let mut cube: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let adjacent = [VertexId::new(0), VertexId::new(1)];
        assert!(bevel_vertices(&mut cube, &adjacent, &BevelOptions::new(0.1)).is_err());
        assert_eq!(cube.num_vertices(), 8);
    }

    #[test]
    fn test_bevel_on_narrow_index_mesh() {
        let mut mesh: HalfEdgeMesh<u16> = primitives::cube(2.0).unwrap();
        let he = mesh.find_halfedge(VertexId::new(0), VertexId::new(1)).unwrap();
        let result = bevel_edges(&mut mesh, &[he], &BevelOptions::new(0.4)).unwrap();
        assert_eq!(result.faces.len(), 1);
        assert_eq!(mesh.num_faces(), 7);
        assert!(mesh.is_closed());

        let empty = BevelResult::<u16>::default();
        assert!(empty.faces.is_empty() && empty.vertices.is_empty());
    }
}
