//! Element selection.
//!
//! Selection state lives on the mesh: every vertex, half-edge and face
//! carries a `selected` flag. An edge is selected when both of its halves
//! are. [`Selection`] holds only what belongs to a viewport: the active
//! element type and an in-progress box.
//!
//! # Example
//!
//! ```
//! use chisel::mesh::{primitives, HalfEdgeMesh, FaceId};
//! use chisel::selection::{Element, Selection, SelectionType};
//!
//! let mut mesh: HalfEdgeMesh = primitives::cube(1.0).unwrap();
//! let mut selection = Selection::new(SelectionType::Face);
//! selection.select(&mut mesh, Element::Face(FaceId::new(1)), true);
//!
//! selection.convert(&mut mesh, SelectionType::Vertex);
//! assert_eq!(selection.selected_vertices(&mesh).len(), 4);
//! ```

use std::collections::{BTreeSet, VecDeque};

use nalgebra::Point3;
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::algo::loop_cut::detect_loop;
use crate::error::{MeshError, Result};
use crate::geometry::Aabb;
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};
use crate::pick::{PickOptions, Picker};

/// Kind of element a selection operates on.
///
/// `Object`, `Loop` and `Ring` are interaction modes; the editing core maps
/// them onto `Face`, `Edge` and `Edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelectionType {
    /// Vertices.
    Vertex,
    /// Edges.
    Edge,
    /// Faces.
    #[default]
    Face,
    /// Whole object.
    Object,
    /// Edge loops.
    Loop,
    /// Edge rings.
    Ring,
}

impl SelectionType {
    /// The element type the core works with.
    pub fn element_type(self) -> SelectionType {
        match self {
            SelectionType::Vertex => SelectionType::Vertex,
            SelectionType::Edge | SelectionType::Loop | SelectionType::Ring => SelectionType::Edge,
            SelectionType::Face | SelectionType::Object => SelectionType::Face,
        }
    }
}

/// A single mesh element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element<I: MeshIndex = u32> {
    /// A vertex.
    Vertex(VertexId<I>),
    /// An edge, named by either half.
    Edge(HalfEdgeId<I>),
    /// A face.
    Face(FaceId<I>),
}

/// Selection mode plus box-selection state for one viewport.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    mode: SelectionType,
    box_start: Option<Point3<f64>>,
    box_end: Option<Point3<f64>>,
    pick: PickOptions,
}

impl Selection {
    /// Selection working on `mode` elements.
    pub fn new(mode: SelectionType) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Use `options` as point-selection tolerances.
    pub fn with_pick_options(mut self, options: PickOptions) -> Self {
        self.pick = options;
        self
    }

    /// Active selection type.
    pub fn mode(&self) -> SelectionType {
        self.mode
    }

    /// Change the active selection type. Flags on the mesh are untouched.
    pub fn set_mode(&mut self, mode: SelectionType) {
        self.mode = mode;
    }

    fn kind(&self) -> SelectionType {
        self.mode.element_type()
    }

    // ----- set operations ---------------------------------------------------

    /// Deselect every element of the active type.
    pub fn clear<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        self.fill(mesh, false);
    }

    /// Select every element of the active type.
    pub fn select_all<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        self.fill(mesh, true);
    }

    /// Deselect every element of every type.
    pub fn clear_all<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        for v in mesh.vertices.iter_mut().flatten() {
            v.selected = false;
        }
        for h in mesh.halfedges.iter_mut().flatten() {
            h.selected = false;
        }
        for f in mesh.faces.iter_mut().flatten() {
            f.selected = false;
        }
    }

    fn fill<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>, value: bool) {
        match self.kind() {
            SelectionType::Vertex => {
                for v in mesh.vertices.iter_mut().flatten() {
                    v.selected = value;
                }
            }
            SelectionType::Edge => {
                for h in mesh.halfedges.iter_mut().flatten() {
                    h.selected = value;
                }
            }
            _ => {
                for f in mesh.faces.iter_mut().flatten() {
                    f.selected = value;
                }
            }
        }
    }

    /// Flip the selection state of every element of the active type.
    pub fn invert<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        match self.kind() {
            SelectionType::Vertex => {
                for v in mesh.vertices.iter_mut().flatten() {
                    v.selected = !v.selected;
                }
            }
            SelectionType::Edge => {
                let keys: Vec<HalfEdgeId<I>> = mesh.edge_ids().collect();
                for he in keys {
                    let value = !mesh[he].selected;
                    set_edge(mesh, he, value);
                }
            }
            _ => {
                for f in mesh.faces.iter_mut().flatten() {
                    f.selected = !f.selected;
                }
            }
        }
    }

    // ----- per element ------------------------------------------------------

    /// Set the selection state of one element. Returns false for dead ids.
    pub fn select<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>, element: Element<I>, value: bool) -> bool {
        match element {
            Element::Vertex(v) => match mesh.vertex_mut(v) {
                Some(vertex) => {
                    vertex.selected = value;
                    true
                }
                None => false,
            },
            Element::Edge(he) => {
                if !mesh.contains_halfedge(he) {
                    return false;
                }
                set_edge(mesh, he, value);
                true
            }
            Element::Face(f) => match mesh.face_mut(f) {
                Some(face) => {
                    face.selected = value;
                    true
                }
                None => false,
            },
        }
    }

    /// Whether an element is selected. Dead ids are never selected.
    pub fn is_selected<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>, element: Element<I>) -> bool {
        match element {
            Element::Vertex(v) => mesh.vertex(v).is_some_and(|x| x.selected),
            Element::Edge(he) => mesh.halfedge(he).is_some_and(|x| x.selected),
            Element::Face(f) => mesh.face(f).is_some_and(|x| x.selected),
        }
    }

    /// Selected vertices in id order.
    pub fn selected_vertices<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>) -> Vec<VertexId<I>> {
        mesh.vertices().filter(|(_, v)| v.selected).map(|(id, _)| id).collect()
    }

    /// Selected edges in id order, one half per edge.
    pub fn selected_edges<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>) -> Vec<HalfEdgeId<I>> {
        mesh.edge_ids().filter(|&he| mesh[he].selected).collect()
    }

    /// Selected faces in id order.
    pub fn selected_faces<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>) -> Vec<FaceId<I>> {
        mesh.faces().filter(|(_, f)| f.selected).map(|(id, _)| id).collect()
    }

    /// Number of selected elements of the active type.
    pub fn selected_count<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>) -> usize {
        match self.kind() {
            SelectionType::Vertex => self.selected_vertices(mesh).len(),
            SelectionType::Edge => self.selected_edges(mesh).len(),
            _ => self.selected_faces(mesh).len(),
        }
    }

    /// Whether nothing of the active type is selected.
    pub fn is_empty<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>) -> bool {
        self.selected_count(mesh) == 0
    }

    /// Vertices touched by the selected elements of the active type, in id
    /// order.
    pub fn affected_vertices<I: MeshIndex>(&self, mesh: &HalfEdgeMesh<I>) -> Vec<VertexId<I>> {
        let mut touched = vec![false; mesh.vertices.len()];
        match self.kind() {
            SelectionType::Vertex => {
                for v in self.selected_vertices(mesh) {
                    touched[v.index()] = true;
                }
            }
            SelectionType::Edge => {
                for he in self.selected_edges(mesh) {
                    touched[mesh.origin(he).index()] = true;
                    touched[mesh.target(he).index()] = true;
                }
            }
            _ => {
                for f in self.selected_faces(mesh) {
                    for v in mesh.face_vertices(f) {
                        touched[v.index()] = true;
                    }
                }
            }
        }
        mesh.vertex_ids().filter(|v| touched[v.index()]).collect()
    }

    // ----- conversion -------------------------------------------------------

    /// Grow the selection into `target` elements and make `target` active.
    ///
    /// Conversion only adds: every target element touching a selected
    /// element of the active type becomes selected.
    pub fn convert<I: MeshIndex>(&mut self, mesh: &mut HalfEdgeMesh<I>, target: SelectionType) {
        let from = self.kind();
        let to = target.element_type();
        if from != to {
            match (from, to) {
                (SelectionType::Vertex, SelectionType::Face) => {
                    let faces: BTreeSet<FaceId<I>> = self
                        .selected_vertices(mesh)
                        .into_iter()
                        .flat_map(|v| mesh.vertex_faces_all(v).collect::<Vec<_>>())
                        .collect();
                    select_faces(mesh, faces);
                }
                (SelectionType::Vertex, SelectionType::Edge) => {
                    let edges: Vec<HalfEdgeId<I>> = self
                        .selected_vertices(mesh)
                        .into_iter()
                        .flat_map(|v| mesh.vertex_outgoing_all(v).collect::<Vec<_>>())
                        .collect();
                    for he in edges {
                        set_edge(mesh, he, true);
                    }
                }
                (SelectionType::Edge, SelectionType::Vertex) => {
                    let verts: Vec<VertexId<I>> = self
                        .selected_edges(mesh)
                        .into_iter()
                        .flat_map(|he| [mesh.origin(he), mesh.target(he)])
                        .collect();
                    select_vertices(mesh, verts);
                }
                (SelectionType::Edge, SelectionType::Face) => {
                    let faces: BTreeSet<FaceId<I>> = self
                        .selected_edges(mesh)
                        .into_iter()
                        .flat_map(|he| {
                            let (a, b) = mesh.edge_faces(he);
                            a.into_iter().chain(b)
                        })
                        .collect();
                    select_faces(mesh, faces);
                }
                (SelectionType::Face, SelectionType::Vertex) => {
                    let verts: Vec<VertexId<I>> = self
                        .selected_faces(mesh)
                        .into_iter()
                        .flat_map(|f| mesh.face_vertices(f).collect::<Vec<_>>())
                        .collect();
                    select_vertices(mesh, verts);
                }
                (SelectionType::Face, SelectionType::Edge) => {
                    let edges: Vec<HalfEdgeId<I>> = self
                        .selected_faces(mesh)
                        .into_iter()
                        .flat_map(|f| mesh.face_halfedges(f).collect::<Vec<_>>())
                        .collect();
                    for he in edges {
                        set_edge(mesh, he, true);
                    }
                }
                _ => {}
            }
            debug!(?from, ?to, "converted selection");
        }
        self.mode = target;
    }

    // ----- spatial selection ------------------------------------------------

    /// Select the element of the active type nearest to `point`.
    ///
    /// Without `add` the previous selection of the active type is cleared
    /// first. Returns whether an element lay within the pick tolerance.
    pub fn select_at_point<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>, point: &Point3<f64>, add: bool) -> bool {
        if !add {
            self.clear(mesh);
        }
        let picker = Picker::new(self.pick.clone());
        let element = match self.kind() {
            SelectionType::Vertex => picker
                .closest_vertex(mesh, point, self.pick.max_vertex_distance)
                .map(|(v, _)| Element::Vertex(v)),
            SelectionType::Edge => picker
                .closest_edge(mesh, point, self.pick.max_edge_distance)
                .map(|(he, _)| Element::Edge(he)),
            _ => picker
                .closest_face(mesh, point, self.pick.max_face_distance)
                .map(|(f, _)| Element::Face(f)),
        };
        match element {
            Some(element) => {
                trace!(?element, "picked");
                self.select(mesh, element, true)
            }
            None => false,
        }
    }

    /// Start a box selection at `corner`.
    pub fn begin_box(&mut self, corner: Point3<f64>) {
        self.box_start = Some(corner);
        self.box_end = Some(corner);
    }

    /// Move the opposite box corner.
    pub fn update_box(&mut self, corner: Point3<f64>) {
        if self.box_start.is_some() {
            self.box_end = Some(corner);
        }
    }

    /// The current box, if one is in progress.
    pub fn current_box(&self) -> Option<Aabb> {
        Some(Aabb::from_corners(self.box_start?, self.box_end?))
    }

    /// Finish the box and select every element of the active type inside it.
    ///
    /// Edges need both endpoints inside, faces all of their vertices.
    /// Returns the number of elements selected by the box.
    pub fn end_box<I: MeshIndex>(&mut self, mesh: &mut HalfEdgeMesh<I>, add: bool) -> usize {
        let Some(bounds) = self.current_box() else {
            return 0;
        };
        self.box_start = None;
        self.box_end = None;
        if !add {
            self.clear(mesh);
        }

        let inside = |v: VertexId<I>| bounds.contains(mesh.position(v));
        let hits: Vec<Element<I>> = match self.kind() {
            SelectionType::Vertex => mesh.vertex_ids().filter(|&v| inside(v)).map(Element::Vertex).collect(),
            SelectionType::Edge => mesh
                .edge_ids()
                .filter(|&he| inside(mesh.origin(he)) && inside(mesh.target(he)))
                .map(Element::Edge)
                .collect(),
            _ => mesh
                .face_ids()
                .filter(|&f| mesh.face_vertices(f).all(inside))
                .map(Element::Face)
                .collect(),
        };
        for &element in &hits {
            self.select(mesh, element, true);
        }
        debug!(count = hits.len(), "box selection");
        hits.len()
    }

    // ----- topological growth -----------------------------------------------

    /// Add every element adjacent to the selection.
    pub fn grow<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        match self.kind() {
            SelectionType::Vertex => {
                let verts: Vec<VertexId<I>> = self
                    .selected_vertices(mesh)
                    .into_iter()
                    .flat_map(|v| mesh.vertex_neighbors_all(v).collect::<Vec<_>>())
                    .collect();
                select_vertices(mesh, verts);
            }
            SelectionType::Edge => {
                let edges: Vec<HalfEdgeId<I>> = self
                    .selected_edges(mesh)
                    .into_iter()
                    .flat_map(|he| [mesh.origin(he), mesh.target(he)])
                    .flat_map(|v| mesh.vertex_outgoing_all(v).collect::<Vec<_>>())
                    .collect();
                for he in edges {
                    set_edge(mesh, he, true);
                }
            }
            _ => {
                let faces: BTreeSet<FaceId<I>> = self
                    .selected_faces(mesh)
                    .into_iter()
                    .flat_map(|f| mesh.face_vertices(f).collect::<Vec<_>>())
                    .flat_map(|v| mesh.vertex_faces_all(v).collect::<Vec<_>>())
                    .collect();
                select_faces(mesh, faces);
            }
        }
    }

    /// Remove every selected element adjacent to an unselected one.
    pub fn shrink<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        match self.kind() {
            SelectionType::Vertex => {
                let drop: Vec<VertexId<I>> = self
                    .selected_vertices(mesh)
                    .into_iter()
                    .filter(|&v| mesh.vertex_neighbors_all(v).any(|n| !mesh[n].selected))
                    .collect();
                for v in drop {
                    mesh[v].selected = false;
                }
            }
            SelectionType::Edge => {
                let drop: Vec<HalfEdgeId<I>> = self
                    .selected_edges(mesh)
                    .into_iter()
                    .filter(|&he| {
                        [mesh.origin(he), mesh.target(he)]
                            .into_iter()
                            .any(|v| mesh.vertex_outgoing_all(v).any(|o| !mesh[o].selected))
                    })
                    .collect();
                for he in drop {
                    set_edge(mesh, he, false);
                }
            }
            _ => {
                let drop: Vec<FaceId<I>> = self
                    .selected_faces(mesh)
                    .into_iter()
                    .filter(|&f| {
                        mesh.face_vertices(f)
                            .any(|v| mesh.vertex_faces_all(v).any(|g| !mesh[g].selected))
                    })
                    .collect();
                for f in drop {
                    mesh[f].selected = false;
                }
            }
        }
    }

    /// Extend the selection to every element connected to it.
    pub fn select_linked<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        let seeds: Vec<VertexId<I>> = match self.kind() {
            SelectionType::Vertex => self.selected_vertices(mesh),
            SelectionType::Edge => self
                .selected_edges(mesh)
                .into_iter()
                .map(|he| mesh.origin(he))
                .collect(),
            _ => self
                .selected_faces(mesh)
                .into_iter()
                .filter_map(|f| mesh.face_vertices(f).next())
                .collect(),
        };

        let mut seen: BTreeSet<VertexId<I>> = seeds.iter().copied().collect();
        let mut queue: VecDeque<VertexId<I>> = seeds.into();
        while let Some(v) = queue.pop_front() {
            for o in mesh.vertex_outgoing_all(v) {
                let n = mesh.target(o);
                if seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }

        match self.kind() {
            SelectionType::Vertex => select_vertices(mesh, seen),
            SelectionType::Edge => {
                let edges: Vec<HalfEdgeId<I>> = seen
                    .iter()
                    .flat_map(|&v| mesh.vertex_outgoing_all(v).collect::<Vec<_>>())
                    .collect();
                for he in edges {
                    set_edge(mesh, he, true);
                }
            }
            _ => {
                let faces: BTreeSet<FaceId<I>> = seen
                    .iter()
                    .flat_map(|&v| mesh.vertex_faces_all(v).collect::<Vec<_>>())
                    .collect();
                select_faces(mesh, faces);
            }
        }
    }

    /// Add every boundary element of the active type.
    ///
    /// Faces count as boundary when one of their edges is.
    pub fn select_boundary<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        match self.kind() {
            SelectionType::Vertex => {
                let verts = mesh.boundary_vertices();
                select_vertices(mesh, verts);
            }
            SelectionType::Edge => {
                for he in mesh.boundary_edges() {
                    set_edge(mesh, he, true);
                }
            }
            _ => {
                let faces: BTreeSet<FaceId<I>> = mesh
                    .boundary_edges()
                    .into_iter()
                    .map(|he| mesh.face_of(mesh.twin(he)))
                    .filter(|f| f.is_valid())
                    .collect();
                select_faces(mesh, faces);
            }
        }
    }

    /// Select the edge loop through `edge` and return its edges.
    ///
    /// The loop continues straight through interior vertices of valence
    /// four and stops anywhere else.
    pub fn select_edge_loop<I: MeshIndex>(
        &self,
        mesh: &mut HalfEdgeMesh<I>,
        edge: HalfEdgeId<I>,
    ) -> Result<Vec<HalfEdgeId<I>>> {
        if !mesh.contains_halfedge(edge) {
            return Err(MeshError::HalfEdgeNotFound(edge.index()));
        }
        let start = mesh.edge_key(edge);
        let mut edges = vec![start];
        for dir in [edge, mesh.twin(edge)] {
            let mut cur = dir;
            while let Some(next) = straight_through(mesh, cur) {
                let key = mesh.edge_key(next);
                if key == start || edges.contains(&key) {
                    break;
                }
                edges.push(key);
                cur = next;
            }
        }
        for &he in &edges {
            set_edge(mesh, he, true);
        }
        debug!(edges = edges.len(), "selected edge loop");
        Ok(edges)
    }

    /// Select the ring of edges crossed by the quad strip through `edge`.
    pub fn select_edge_ring<I: MeshIndex>(
        &self,
        mesh: &mut HalfEdgeMesh<I>,
        edge: HalfEdgeId<I>,
    ) -> Result<Vec<HalfEdgeId<I>>> {
        let strip = detect_loop(mesh, edge)?;
        let edges: Vec<HalfEdgeId<I>> = strip.rungs.iter().map(|&he| mesh.edge_key(he)).collect();
        for &he in &edges {
            set_edge(mesh, he, true);
        }
        debug!(edges = edges.len(), "selected edge ring");
        Ok(edges)
    }

    // ----- marks ------------------------------------------------------------

    /// Set the scratch mark of one element. Returns false for dead ids.
    pub fn mark<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>, element: Element<I>, value: bool) -> bool {
        match element {
            Element::Vertex(v) => match mesh.vertex_mut(v) {
                Some(vertex) => {
                    vertex.marked = value;
                    true
                }
                None => false,
            },
            Element::Edge(he) => {
                if !mesh.contains_halfedge(he) {
                    return false;
                }
                let twin = mesh.twin(he);
                mesh[he].marked = value;
                if let Some(t) = mesh.halfedge_mut(twin) {
                    t.marked = value;
                }
                true
            }
            Element::Face(f) => match mesh.face_mut(f) {
                Some(face) => {
                    face.marked = value;
                    true
                }
                None => false,
            },
        }
    }

    /// Clear every scratch mark.
    pub fn clear_marks<I: MeshIndex>(&self, mesh: &mut HalfEdgeMesh<I>) {
        for v in mesh.vertices.iter_mut().flatten() {
            v.marked = false;
        }
        for h in mesh.halfedges.iter_mut().flatten() {
            h.marked = false;
        }
        for f in mesh.faces.iter_mut().flatten() {
            f.marked = false;
        }
    }
}

fn set_edge<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, he: HalfEdgeId<I>, value: bool) {
    let twin = mesh.twin(he);
    if let Some(h) = mesh.halfedge_mut(he) {
        h.selected = value;
    }
    if let Some(t) = mesh.halfedge_mut(twin) {
        t.selected = value;
    }
}

fn select_vertices<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, verts: impl IntoIterator<Item = VertexId<I>>) {
    for v in verts {
        if let Some(vertex) = mesh.vertex_mut(v) {
            vertex.selected = true;
        }
    }
}

fn select_faces<I: MeshIndex>(mesh: &mut HalfEdgeMesh<I>, faces: impl IntoIterator<Item = FaceId<I>>) {
    for f in faces {
        if let Some(face) = mesh.face_mut(f) {
            face.selected = true;
        }
    }
}

/// The half-edge continuing `incoming` straight across its target.
fn straight_through<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, incoming: HalfEdgeId<I>) -> Option<HalfEdgeId<I>> {
    let v = mesh.target(incoming);
    if mesh.is_boundary_vertex(v) {
        return None;
    }
    let fan: Vec<HalfEdgeId<I>> = mesh.vertex_halfedges(v).collect();
    if fan.len() != 4 {
        return None;
    }
    let back = mesh.twin(incoming);
    let k = fan.iter().position(|&o| o == back)?;
    Some(fan[(k + 2) % 4])
}
