//! Dissolving edges, vertices and face regions.
//!
//! Dissolving removes elements while keeping the surface closed over the
//! gap: the faces around a dissolved element merge into one polygon.
//!
//! # Example
//!
//! ```
//! use chisel::algo::dissolve::dissolve_edge;
//! use chisel::mesh::{primitives, HalfEdgeMesh, VertexId};
//!
//! let mut cube: HalfEdgeMesh = primitives::cube(2.0).unwrap();
//! let he = cube.find_halfedge(VertexId::new(7), VertexId::new(6)).unwrap();
//! let merged = dissolve_edge(&mut cube, he).unwrap();
//!
//! assert_eq!(cube.face_degree(merged), 6);
//! assert_eq!(cube.num_faces(), 5);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{MeshError, Result};
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};

/// Remove an edge and merge the two faces beside it.
///
/// Fails on boundary edges and when the two faces share more than this
/// edge, since the merged polygon would repeat a vertex.
pub fn dissolve_edge<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, he: HalfEdgeId<I>) -> Result<FaceId<I>> {
    if !mesh.contains_halfedge(he) {
        return Err(MeshError::HalfEdgeNotFound(he.index()));
    }
    if mesh.is_boundary_edge(he) {
        warn!(halfedge = he.index(), "cannot dissolve a boundary edge");
        return Err(MeshError::BoundaryEdge { edge: he.index() });
    }
    let twin = mesh.twin(he);
    let (f1, f2) = (mesh.face_of(he), mesh.face_of(twin));
    if f1 == f2 {
        return Err(MeshError::NonManifold {
            details: format!("edge {} has face {} on both sides", he.index(), f1.index()),
        });
    }

    let mut merged = loop_after(mesh, he);
    merged.extend(loop_after(mesh, twin));
    if let Some(v) = first_repeat(&merged) {
        warn!(vertex = v.index(), "faces share more than one edge");
        return Err(MeshError::NonManifold {
            details: format!("merged face would visit vertex {} twice", v.index()),
        });
    }

    let selected = mesh[f1].selected || mesh[f2].selected;
    let marked = mesh[f1].marked || mesh[f2].marked;
    let snapshot = mesh.clone();
    mesh.remove_face(f1);
    mesh.remove_face(f2);
    mesh.remove_edge(he);
    match mesh.add_face(&merged) {
        Ok(f) => {
            mesh[f].selected = selected;
            mesh[f].marked = marked;
            mesh.update_normals();
            debug!(face = f.index(), degree = merged.len(), "dissolved edge");
            Ok(f)
        }
        Err(e) => {
            warn!(error = %e, "edge dissolve failed, mesh restored");
            *mesh = snapshot;
            Err(e)
        }
    }
}

/// Remove a vertex of valence two, joining its neighbors directly.
///
/// Faces through the vertex lose one corner. Returns the half-edge between
/// the two former neighbors.
pub fn dissolve_vertex<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, v: VertexId<I>) -> Result<HalfEdgeId<I>> {
    if !mesh.contains_vertex(v) {
        return Err(MeshError::VertexNotFound(v.index()));
    }
    let neighbors: Vec<VertexId<I>> = mesh.vertex_outgoing_all(v).map(|he| mesh.target(he)).collect();
    let [u, w] = neighbors[..] else {
        warn!(vertex = v.index(), valence = neighbors.len(), "only valence-2 vertices dissolve");
        return Err(MeshError::invalid_param("valence", neighbors.len(), "must be 2"));
    };
    if mesh.find_halfedge(u, w).is_some() {
        warn!(v0 = u.index(), v1 = w.index(), "neighbors are already joined");
        return Err(MeshError::DuplicateEdge {
            v0: u.index(),
            v1: w.index(),
        });
    }

    let faces: Vec<FaceId<I>> = mesh.vertex_faces(v).collect();
    let mut rebuilds = Vec::with_capacity(faces.len());
    for &f in &faces {
        let ring: Vec<VertexId<I>> = mesh.face_vertices(f).filter(|&x| x != v).collect();
        if ring.len() < 3 {
            return Err(MeshError::DegenerateFace { vertices: ring.len() });
        }
        rebuilds.push((ring, mesh[f].selected, mesh[f].marked));
    }

    let snapshot = mesh.clone();
    mesh.remove_vertex(v);
    let outcome = rebuilds.iter().try_for_each(|(ring, selected, marked)| {
        let f = mesh.add_face(ring)?;
        mesh[f].selected = *selected;
        mesh[f].marked = *marked;
        Ok(())
    });
    let outcome = outcome.and_then(|()| mesh.add_edge(u, w));
    match outcome {
        Ok(he) => {
            mesh.update_normals();
            debug!(vertex = v.index(), faces = rebuilds.len(), "dissolved vertex");
            Ok(he)
        }
        Err(e) => {
            warn!(error = %e, "vertex dissolve failed, mesh restored");
            *mesh = snapshot;
            Err(e)
        }
    }
}

/// Merge each edge-connected group of `faces` into a single polygon.
///
/// Edges and vertices inside a group are removed. Every group must be
/// bounded by exactly one simple loop; groups with holes, pinched borders
/// or no border at all are refused. Returns one face per group, in order of
/// each group's lowest face id. On failure the mesh is left unchanged.
pub fn dissolve_faces<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, faces: &[FaceId<I>]) -> Result<Vec<FaceId<I>>> {
    if faces.is_empty() {
        warn!("no faces to dissolve");
        return Err(MeshError::EmptySelection);
    }
    let mut set = BTreeSet::new();
    for &f in faces {
        if !mesh.contains_face(f) {
            return Err(MeshError::FaceNotFound(f.index()));
        }
        set.insert(f);
    }

    let groups = components(mesh, &set);
    let mut plans = Vec::with_capacity(groups.len());
    for group in &groups {
        plans.push(plan_region(mesh, group)?);
    }

    let snapshot = mesh.clone();
    let mut created = Vec::with_capacity(plans.len());
    for plan in &plans {
        match apply_region(mesh, plan) {
            Ok(f) => created.push(f),
            Err(e) => {
                warn!(error = %e, "face dissolve failed, mesh restored");
                *mesh = snapshot;
                return Err(e);
            }
        }
    }
    mesh.update_normals();
    debug!(groups = created.len(), faces = set.len(), "dissolved faces");
    Ok(created)
}

/// Origins of the face loop from `next(he)` up to and including `prev(he)`.
fn loop_after<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, he: HalfEdgeId<I>) -> Vec<VertexId<I>> {
    let mut ring = Vec::new();
    let mut cur = mesh.next(he);
    while cur != he {
        ring.push(mesh.origin(cur));
        cur = mesh.next(cur);
    }
    ring
}

fn first_repeat<I: MeshIndex>(ring: &[VertexId<I>]) -> Option<VertexId<I>> {
    let mut seen = HashSet::with_capacity(ring.len());
    ring.iter().copied().find(|&v| !seen.insert(v))
}

/// Edge-connected groups of `set`, each sorted.
fn components<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, set: &BTreeSet<FaceId<I>>) -> Vec<Vec<FaceId<I>>> {
    let mut visited = HashSet::new();
    let mut groups = Vec::new();
    for &seed in set {
        if !visited.insert(seed) {
            continue;
        }
        let mut group = vec![seed];
        let mut stack = vec![seed];
        while let Some(f) = stack.pop() {
            for g in mesh.face_neighbors(f) {
                if set.contains(&g) && visited.insert(g) {
                    group.push(g);
                    stack.push(g);
                }
            }
        }
        group.sort();
        groups.push(group);
    }
    groups
}

struct RegionPlan<I: MeshIndex> {
    faces: Vec<FaceId<I>>,
    border: Vec<VertexId<I>>,
    inner_edges: Vec<HalfEdgeId<I>>,
    inner_vertices: Vec<VertexId<I>>,
    selected: bool,
    marked: bool,
}

fn plan_region<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, group: &[FaceId<I>]) -> Result<RegionPlan<I>> {
    let inside: HashSet<FaceId<I>> = group.iter().copied().collect();
    let mut step: HashMap<VertexId<I>, VertexId<I>> = HashMap::new();
    let mut inner_edges = BTreeSet::new();
    let mut touched = BTreeSet::new();

    for &f in group {
        for he in mesh.face_halfedges(f) {
            let (a, b) = (mesh.origin(he), mesh.target(he));
            touched.insert(a);
            let across = mesh.face_of(mesh.twin(he));
            if across.is_valid() && inside.contains(&across) {
                inner_edges.insert(mesh.edge_key(he));
            } else if step.insert(a, b).is_some() {
                warn!(vertex = a.index(), "region border touches itself");
                return Err(MeshError::NonManifold {
                    details: format!("region border passes vertex {} twice", a.index()),
                });
            }
        }
    }

    let Some(&start) = step.keys().min() else {
        warn!(faces = group.len(), "region has no border");
        return Err(MeshError::NonManifold {
            details: "a closed region cannot become one face".into(),
        });
    };
    let mut border = vec![start];
    let mut cur = start;
    loop {
        let next = step.get(&cur).copied().ok_or_else(|| MeshError::NonManifold {
            details: format!("region border breaks at vertex {}", cur.index()),
        })?;
        if next == start {
            break;
        }
        border.push(next);
        cur = next;
    }
    if border.len() != step.len() {
        warn!(loop_len = border.len(), border = step.len(), "region has holes");
        return Err(MeshError::NonManifold {
            details: "region is bounded by more than one loop".into(),
        });
    }

    let on_border: HashSet<VertexId<I>> = border.iter().copied().collect();
    Ok(RegionPlan {
        faces: group.to_vec(),
        inner_vertices: touched.into_iter().filter(|v| !on_border.contains(v)).collect(),
        inner_edges: inner_edges.into_iter().collect(),
        border,
        selected: group.iter().any(|&f| mesh[f].selected),
        marked: group.iter().any(|&f| mesh[f].marked),
    })
}

fn apply_region<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, plan: &RegionPlan<I>) -> Result<FaceId<I>> {
    if let [single] = plan.faces[..] {
        return Ok(single);
    }
    for &f in &plan.faces {
        mesh.remove_face(f);
    }
    for &he in &plan.inner_edges {
        mesh.remove_edge(he);
    }
    for &v in &plan.inner_vertices {
        mesh.remove_vertex(v);
    }
    let f = mesh.add_face(&plan.border)?;
    mesh[f].selected = plan.selected;
    mesh[f].marked = plan.marked;
    Ok(f)
}
