//! Half-edge mesh data structure.
//!
//! Vertices, half-edges and faces live in arenas (`Vec<Option<T>>`). An id is
//! the slot index, removal leaves a tombstone, and slots are never reused, so
//! ids are stable for the lifetime of their element.
//!
//! # Structure
//!
//! - Half-edges are always created in twin pairs. A half-edge whose face is
//!   invalid is a **boundary** half-edge; its `next`/`prev` are invalid too.
//! - Each half-edge caches its origin and target vertex.
//! - Each vertex stores one outgoing half-edge, each face one half-edge of its
//!   boundary loop.
//! - A directed-edge map `(origin, target) -> half-edge` gives fast edge lookup
//!   and ordered enumeration of all half-edges leaving a vertex.
//!
//! Faces are arbitrary simple polygons with at least three vertices, wound
//! counter-clockwise when seen from the side their normal points to.

use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

use nalgebra::{Point3, Vector2, Vector3};
use tracing::warn;

use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};
use crate::geometry::{self, Aabb, WORLD_UP};

/// A vertex in the half-edge mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex<I: MeshIndex = u32> {
    /// Position in world space.
    pub position: Point3<f64>,

    /// Cached vertex normal (see [`HalfEdgeMesh::update_normals`]).
    pub normal: Vector3<f64>,

    /// Texture coordinate.
    pub uv: Vector2<f64>,

    /// One outgoing half-edge, or invalid for an isolated vertex.
    pub halfedge: HalfEdgeId<I>,

    /// Selection flag.
    pub selected: bool,

    /// Scratch flag for operators and hosts.
    pub marked: bool,
}

impl<I: MeshIndex> Vertex<I> {
    /// Create an isolated vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: WORLD_UP,
            uv: Vector2::zeros(),
            halfedge: HalfEdgeId::invalid(),
            selected: false,
            marked: false,
        }
    }
}

/// A directed half-edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfEdge<I: MeshIndex = u32> {
    /// Vertex this half-edge leaves.
    pub origin: VertexId<I>,

    /// Vertex this half-edge points to.
    pub target: VertexId<I>,

    /// The opposite half-edge of the same edge.
    pub twin: HalfEdgeId<I>,

    /// Next half-edge around the face (counter-clockwise).
    pub next: HalfEdgeId<I>,

    /// Previous half-edge around the face.
    pub prev: HalfEdgeId<I>,

    /// Incident face, invalid on the boundary.
    pub face: FaceId<I>,

    /// Selection flag. Edge selection keeps both halves in sync.
    pub selected: bool,

    /// Scratch flag for operators and hosts.
    pub marked: bool,
}

impl<I: MeshIndex> HalfEdge<I> {
    fn new(origin: VertexId<I>, target: VertexId<I>) -> Self {
        Self {
            origin,
            target,
            twin: HalfEdgeId::invalid(),
            next: HalfEdgeId::invalid(),
            prev: HalfEdgeId::invalid(),
            face: FaceId::invalid(),
            selected: false,
            marked: false,
        }
    }

    /// Whether this half-edge has no incident face.
    #[inline]
    pub fn is_boundary(&self) -> bool {
        !self.face.is_valid()
    }
}

/// A polygonal face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face<I: MeshIndex = u32> {
    /// One half-edge of the boundary loop.
    pub halfedge: HalfEdgeId<I>,

    /// Cached unit normal.
    pub normal: Vector3<f64>,

    /// Selection flag.
    pub selected: bool,

    /// Scratch flag for operators and hosts.
    pub marked: bool,
}

/// A polygon mesh in half-edge representation.
///
/// # Example
///
/// ```
/// use chisel::mesh::HalfEdgeMesh;
/// use nalgebra::Point3;
///
/// let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
/// let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
/// let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
/// let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
/// let f = mesh.add_face(&[a, b, c]).unwrap();
///
/// assert_eq!(mesh.face_degree(f), 3);
/// assert_eq!(mesh.num_edges(), 3);
/// assert_eq!(mesh.euler_characteristic(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct HalfEdgeMesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Option<Vertex<I>>>,
    pub(crate) halfedges: Vec<Option<HalfEdge<I>>>,
    pub(crate) faces: Vec<Option<Face<I>>>,
    pub(crate) edge_lookup: BTreeMap<(VertexId<I>, VertexId<I>), HalfEdgeId<I>>,
    live_vertices: usize,
    live_halfedges: usize,
    live_faces: usize,
}

impl<I: MeshIndex> Default for HalfEdgeMesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            halfedges: Vec::new(),
            faces: Vec::new(),
            edge_lookup: BTreeMap::new(),
            live_vertices: 0,
            live_halfedges: 0,
            live_faces: 0,
        }
    }

    /// Create an empty mesh with room for the given element counts.
    pub fn with_capacity(num_vertices: usize, num_faces: usize) -> Self {
        // Closed quad meshes have about 4 half-edges per face.
        let mut mesh = Self::new();
        mesh.vertices.reserve(num_vertices);
        mesh.halfedges.reserve(num_faces * 4 + 8);
        mesh.faces.reserve(num_faces);
        mesh
    }

    /// Remove every element.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    // ==================== Counts ====================

    /// Number of live vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.live_vertices
    }

    /// Number of live half-edges.
    #[inline]
    pub fn num_halfedges(&self) -> usize {
        self.live_halfedges
    }

    /// Number of undirected edges (twin pairs).
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.live_halfedges / 2
    }

    /// Number of live faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.live_faces
    }

    /// Whether the mesh has no vertices at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live_vertices == 0
    }

    // ==================== Lookup ====================

    /// The vertex with this id, if it is alive.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> Option<&Vertex<I>> {
        self.vertices.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable access to a live vertex.
    #[inline]
    pub fn vertex_mut(&mut self, id: VertexId<I>) -> Option<&mut Vertex<I>> {
        self.vertices.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// The half-edge with this id, if it is alive.
    #[inline]
    pub fn halfedge(&self, id: HalfEdgeId<I>) -> Option<&HalfEdge<I>> {
        self.halfedges.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable access to a live half-edge.
    #[inline]
    pub fn halfedge_mut(&mut self, id: HalfEdgeId<I>) -> Option<&mut HalfEdge<I>> {
        self.halfedges.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// The face with this id, if it is alive.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> Option<&Face<I>> {
        self.faces.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable access to a live face.
    #[inline]
    pub fn face_mut(&mut self, id: FaceId<I>) -> Option<&mut Face<I>> {
        self.faces.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Whether the vertex is alive.
    #[inline]
    pub fn contains_vertex(&self, id: VertexId<I>) -> bool {
        self.vertex(id).is_some()
    }

    /// Whether the half-edge is alive.
    #[inline]
    pub fn contains_halfedge(&self, id: HalfEdgeId<I>) -> bool {
        self.halfedge(id).is_some()
    }

    /// Whether the face is alive.
    #[inline]
    pub fn contains_face(&self, id: FaceId<I>) -> bool {
        self.face(id).is_some()
    }

    /// The half-edge from `origin` to `target`, if such an edge exists.
    #[inline]
    pub fn find_halfedge(&self, origin: VertexId<I>, target: VertexId<I>) -> Option<HalfEdgeId<I>> {
        self.edge_lookup.get(&(origin, target)).copied()
    }

    /// Position of a vertex.
    ///
    /// # Panics
    /// Panics if the vertex is dead.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self[v].position
    }

    /// Move a vertex. Returns false for a dead vertex.
    pub fn set_position(&mut self, v: VertexId<I>, position: Point3<f64>) -> bool {
        match self.vertex_mut(v) {
            Some(vertex) => {
                vertex.position = position;
                true
            }
            None => false,
        }
    }

    /// Translate a set of vertices by `offset`. Dead ids are skipped.
    pub fn translate_vertices(&mut self, vertices: &[VertexId<I>], offset: &Vector3<f64>) {
        for &v in vertices {
            if let Some(vertex) = self.vertex_mut(v) {
                vertex.position += offset;
            }
        }
    }

    // ==================== Topology Queries ====================

    /// Twin of a half-edge (invalid if the half-edge is dead).
    #[inline]
    pub fn twin(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).map_or(HalfEdgeId::invalid(), |h| h.twin)
    }

    /// Next half-edge around the face.
    #[inline]
    pub fn next(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).map_or(HalfEdgeId::invalid(), |h| h.next)
    }

    /// Previous half-edge around the face.
    #[inline]
    pub fn prev(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        self.halfedge(he).map_or(HalfEdgeId::invalid(), |h| h.prev)
    }

    /// Origin vertex of a half-edge.
    #[inline]
    pub fn origin(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).map_or(VertexId::invalid(), |h| h.origin)
    }

    /// Target vertex of a half-edge.
    #[inline]
    pub fn target(&self, he: HalfEdgeId<I>) -> VertexId<I> {
        self.halfedge(he).map_or(VertexId::invalid(), |h| h.target)
    }

    /// Face of a half-edge (invalid on the boundary).
    #[inline]
    pub fn face_of(&self, he: HalfEdgeId<I>) -> FaceId<I> {
        self.halfedge(he).map_or(FaceId::invalid(), |h| h.face)
    }

    /// One outgoing half-edge of a vertex.
    #[inline]
    pub fn outgoing(&self, v: VertexId<I>) -> HalfEdgeId<I> {
        self.vertex(v).map_or(HalfEdgeId::invalid(), |v| v.halfedge)
    }

    /// One half-edge of a face.
    #[inline]
    pub fn face_halfedge(&self, f: FaceId<I>) -> HalfEdgeId<I> {
        self.face(f).map_or(HalfEdgeId::invalid(), |f| f.halfedge)
    }

    /// The lower-id half of an edge; names the undirected edge.
    #[inline]
    pub fn edge_key(&self, he: HalfEdgeId<I>) -> HalfEdgeId<I> {
        let twin = self.twin(he);
        if twin.is_valid() && twin < he {
            twin
        } else {
            he
        }
    }

    /// Whether the half-edge has no face.
    #[inline]
    pub fn is_boundary_halfedge(&self, he: HalfEdgeId<I>) -> bool {
        !self.face_of(he).is_valid()
    }

    /// Whether either side of the edge has no face.
    #[inline]
    pub fn is_boundary_edge(&self, he: HalfEdgeId<I>) -> bool {
        self.is_boundary_halfedge(he) || self.is_boundary_halfedge(self.twin(he))
    }

    /// Whether a vertex lies on the boundary (or is isolated).
    pub fn is_boundary_vertex(&self, v: VertexId<I>) -> bool {
        let mut any = false;
        for he in self.vertex_outgoing_all(v) {
            any = true;
            if self.is_boundary_edge(he) {
                return true;
            }
        }
        !any
    }

    /// The two faces on either side of an edge, `(face_of(he), face_of(twin))`.
    pub fn edge_faces(&self, he: HalfEdgeId<I>) -> (Option<FaceId<I>>, Option<FaceId<I>>) {
        (self.face_of(he).valid(), self.face_of(self.twin(he)).valid())
    }

    /// Whether every face is a triangle.
    pub fn is_triangle_mesh(&self) -> bool {
        self.face_ids().all(|f| self.face_degree(f) == 3)
    }

    /// Whether every face is a quad.
    pub fn is_quad_mesh(&self) -> bool {
        self.face_ids().all(|f| self.face_degree(f) == 4)
    }

    // ==================== Iteration ====================

    /// Ids of all live vertices, in creation order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_some())
            .map(|(i, _)| VertexId::new(i))
    }

    /// All live vertices with their ids.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId<I>, &Vertex<I>)> + '_ {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (VertexId::new(i), v)))
    }

    /// Ids of all live half-edges, in creation order.
    pub fn halfedge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.halfedges
            .iter()
            .enumerate()
            .filter(|(_, h)| h.is_some())
            .map(|(i, _)| HalfEdgeId::new(i))
    }

    /// All live half-edges with their ids.
    pub fn halfedges(&self) -> impl Iterator<Item = (HalfEdgeId<I>, &HalfEdge<I>)> + '_ {
        self.halfedges
            .iter()
            .enumerate()
            .filter_map(|(i, h)| h.as_ref().map(|h| (HalfEdgeId::new(i), h)))
    }

    /// One half-edge per undirected edge (the lower id of each twin pair).
    pub fn edge_ids(&self) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.halfedges()
            .filter(|(id, h)| !h.twin.is_valid() || id.index() < h.twin.index())
            .map(|(id, _)| id)
    }

    /// Ids of all live faces, in creation order.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_some())
            .map(|(i, _)| FaceId::new(i))
    }

    /// All live faces with their ids.
    pub fn faces(&self) -> impl Iterator<Item = (FaceId<I>, &Face<I>)> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|f| (FaceId::new(i), f)))
    }

    /// Outgoing half-edges of a vertex in fan order.
    ///
    /// At boundary vertices the walk starts at the outgoing boundary
    /// half-edge so the whole open fan is visited.
    pub fn vertex_halfedges(&self, v: VertexId<I>) -> VertexHalfEdgeIter<'_, I> {
        VertexHalfEdgeIter::new(self, v)
    }

    /// Every half-edge leaving `v`, including wire edges that do not belong
    /// to the vertex fan. Ordered by target id.
    pub fn vertex_outgoing_all(&self, v: VertexId<I>) -> impl Iterator<Item = HalfEdgeId<I>> + '_ {
        self.edge_lookup
            .range((v, VertexId::new(0))..=(v, VertexId::invalid()))
            .map(|(_, &he)| he)
    }

    /// Vertices adjacent to a vertex, in fan order.
    pub fn vertex_neighbors(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_halfedges(v).map(|he| self.target(he))
    }

    /// Faces around a vertex, in fan order.
    pub fn vertex_faces(&self, v: VertexId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.vertex_halfedges(v).filter_map(|he| self.face_of(he).valid())
    }

    /// Vertices joined to `v` by any edge, across every fan. Ordered by id.
    pub fn vertex_neighbors_all(&self, v: VertexId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.vertex_outgoing_all(v).map(|he| self.target(he))
    }

    /// Faces with a corner at `v`, across every fan.
    ///
    /// Unlike [`HalfEdgeMesh::vertex_faces`] this also reaches faces that
    /// only share the vertex, as at a bowtie.
    pub fn vertex_faces_all(&self, v: VertexId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.vertex_outgoing_all(v).filter_map(|he| self.face_of(he).valid())
    }

    /// Half-edges of a face, starting at its stored half-edge.
    pub fn face_halfedges(&self, f: FaceId<I>) -> FaceHalfEdgeIter<'_, I> {
        FaceHalfEdgeIter::new(self, f)
    }

    /// Vertices of a face in winding order.
    pub fn face_vertices(&self, f: FaceId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.face_halfedges(f).map(|he| self.origin(he))
    }

    /// Faces sharing an edge with `f`.
    pub fn face_neighbors(&self, f: FaceId<I>) -> impl Iterator<Item = FaceId<I>> + '_ {
        self.face_halfedges(f)
            .filter_map(|he| self.face_of(self.twin(he)).valid())
    }

    /// Number of vertices of a face.
    pub fn face_degree(&self, f: FaceId<I>) -> usize {
        self.face_halfedges(f).count()
    }

    /// Number of edges in the fan of a vertex.
    pub fn valence(&self, v: VertexId<I>) -> usize {
        self.vertex_halfedges(v).count()
    }

    // ==================== Geometry ====================

    /// Positions of the vertices of a face.
    pub fn face_positions(&self, f: FaceId<I>) -> Vec<Point3<f64>> {
        self.face_vertices(f).map(|v| *self.position(v)).collect()
    }

    /// Normal of a face computed from current positions (Newell's method).
    ///
    /// Degenerate faces report [`WORLD_UP`].
    pub fn face_normal(&self, f: FaceId<I>) -> Vector3<f64> {
        geometry::newell_normal(&self.face_positions(f)).unwrap_or(WORLD_UP)
    }

    /// Area of a face.
    pub fn face_area(&self, f: FaceId<I>) -> f64 {
        geometry::polygon_area(&self.face_positions(f))
    }

    /// Average of a face's vertex positions.
    pub fn face_centroid(&self, f: FaceId<I>) -> Point3<f64> {
        geometry::centroid(&self.face_positions(f))
    }

    /// Area-weighted normal at a vertex.
    pub fn vertex_normal(&self, v: VertexId<I>) -> Vector3<f64> {
        let sum: Vector3<f64> = self
            .vertex_faces(v)
            .map(|f| geometry::newell_vector(&self.face_positions(f)))
            .sum();
        geometry::normalize_or(sum, WORLD_UP)
    }

    /// Vector from origin to target of a half-edge.
    pub fn edge_vector(&self, he: HalfEdgeId<I>) -> Vector3<f64> {
        self.position(self.target(he)) - self.position(self.origin(he))
    }

    /// Length of an edge.
    pub fn edge_length(&self, he: HalfEdgeId<I>) -> f64 {
        self.edge_vector(he).norm()
    }

    /// Midpoint of an edge.
    pub fn edge_midpoint(&self, he: HalfEdgeId<I>) -> Point3<f64> {
        nalgebra::center(self.position(self.origin(he)), self.position(self.target(he)))
    }

    /// Bounding box of all vertices.
    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices().map(|(_, v)| &v.position))
    }

    /// Average of all vertex positions.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.is_empty() {
            return None;
        }
        let sum: Vector3<f64> = self.vertices().map(|(_, v)| v.position.coords).sum();
        Some(Point3::from(sum / self.num_vertices() as f64))
    }

    /// Total area of all faces.
    pub fn surface_area(&self) -> f64 {
        self.face_ids().map(|f| self.face_area(f)).sum()
    }

    /// Recompute cached face and vertex normals.
    ///
    /// Vertex normals are the area-weighted average of the incident face
    /// normals. Degenerate faces and isolated vertices get [`WORLD_UP`].
    pub fn update_normals(&mut self) {
        let face_vectors: Vec<(FaceId<I>, Vector3<f64>)> = self
            .face_ids()
            .map(|f| (f, geometry::newell_vector(&self.face_positions(f))))
            .collect();

        let mut vertex_sums = vec![Vector3::zeros(); self.vertices.len()];
        for &(f, n) in &face_vectors {
            for v in self.face_vertices(f) {
                vertex_sums[v.index()] += n;
            }
        }

        for (f, n) in face_vectors {
            self[f].normal = geometry::normalize_or(n, WORLD_UP);
        }
        for (i, slot) in self.vertices.iter_mut().enumerate() {
            if let Some(v) = slot {
                v.normal = geometry::normalize_or(vertex_sums[i], WORLD_UP);
            }
        }
    }

    // ==================== Construction ====================

    /// Add an isolated vertex.
    ///
    /// # Panics
    ///
    /// When the index type has no vertex id left. The fallible constructors
    /// report that case as [`MeshError::IndexOverflow`] instead.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Some(Vertex::new(position)));
        self.live_vertices += 1;
        id
    }

    /// Add the edge `origin -> target` together with its twin.
    ///
    /// Returns the existing half-edge if the edge is already present. New
    /// half-edges have no face and no `next`/`prev`.
    pub fn add_edge(&mut self, origin: VertexId<I>, target: VertexId<I>) -> Result<HalfEdgeId<I>> {
        if origin == target {
            warn!(vertex = origin.index(), "refusing self-loop edge");
            return Err(MeshError::SelfLoop {
                vertex: origin.index(),
            });
        }
        for v in [origin, target] {
            if !self.contains_vertex(v) {
                warn!(vertex = v.index(), "edge endpoint does not exist");
                return Err(MeshError::VertexNotFound(v.index()));
            }
        }
        if let Some(he) = self.find_halfedge(origin, target) {
            return Ok(he);
        }
        self.reserve_ids(0, 2, 0)?;

        let (he, tw) = self.alloc_pair(origin, target);
        for (v, out) in [(origin, he), (target, tw)] {
            let vertex = &mut self[v];
            if !vertex.halfedge.is_valid() {
                vertex.halfedge = out;
            }
        }
        Ok(he)
    }

    /// Add a face over the given vertex loop.
    ///
    /// Existing edges are reused; missing ones are created. The face normal is
    /// computed with Newell's method. Fails without modifying the mesh when
    /// the loop has fewer than three vertices, repeats a vertex, names a dead
    /// vertex, or when one of its directed edges already carries a face.
    pub fn add_face(&mut self, vertices: &[VertexId<I>]) -> Result<FaceId<I>> {
        let n = vertices.len();
        if n < 3 {
            warn!(vertices = n, "refusing degenerate face");
            return Err(MeshError::DegenerateFace { vertices: n });
        }
        for (i, &v) in vertices.iter().enumerate() {
            if !self.contains_vertex(v) {
                warn!(vertex = v.index(), "face references a dead vertex");
                return Err(MeshError::VertexNotFound(v.index()));
            }
            if vertices[..i].contains(&v) {
                warn!(vertex = v.index(), "face repeats a vertex");
                return Err(MeshError::DuplicateVertexInFace { vertex: v.index() });
            }
        }
        for i in 0..n {
            let (a, b) = (vertices[i], vertices[(i + 1) % n]);
            if let Some(he) = self.find_halfedge(a, b) {
                if !self.is_boundary_halfedge(he) {
                    warn!(v0 = a.index(), v1 = b.index(), "directed edge already has a face");
                    return Err(MeshError::NonManifoldEdge {
                        v0: a.index(),
                        v1: b.index(),
                    });
                }
            }
        }

        let missing = (0..n)
            .filter(|&i| self.find_halfedge(vertices[i], vertices[(i + 1) % n]).is_none())
            .count();
        self.reserve_ids(0, 2 * missing, 1)?;

        let mut loop_edges = Vec::with_capacity(n);
        for i in 0..n {
            loop_edges.push(self.add_edge(vertices[i], vertices[(i + 1) % n])?);
        }

        let positions: Vec<Point3<f64>> = vertices.iter().map(|&v| *self.position(v)).collect();
        let f = FaceId::new(self.faces.len());
        self.faces.push(Some(Face {
            halfedge: loop_edges[0],
            normal: geometry::newell_normal(&positions).unwrap_or(WORLD_UP),
            selected: false,
            marked: false,
        }));
        self.live_faces += 1;

        for i in 0..n {
            let he = loop_edges[i];
            let h = &mut self[he];
            h.face = f;
            h.next = loop_edges[(i + 1) % n];
            h.prev = loop_edges[(i + n - 1) % n];
        }
        for &v in vertices {
            self.repair_outgoing(v);
        }
        Ok(f)
    }

    // ==================== Removal ====================

    /// Remove a face. Its edges and vertices stay; the loop becomes boundary.
    ///
    /// Returns false for a dead face.
    pub fn remove_face(&mut self, f: FaceId<I>) -> bool {
        if !self.contains_face(f) {
            return false;
        }
        let loop_edges: Vec<HalfEdgeId<I>> = self.face_halfedges(f).collect();
        for he in loop_edges {
            let h = &mut self[he];
            h.face = FaceId::invalid();
            h.next = HalfEdgeId::invalid();
            h.prev = HalfEdgeId::invalid();
        }
        self.faces[f.index()] = None;
        self.live_faces -= 1;
        true
    }

    /// Remove an edge (both half-edges) and the faces on either side.
    ///
    /// Returns false for a dead half-edge.
    pub fn remove_edge(&mut self, he: HalfEdgeId<I>) -> bool {
        let Some(h) = self.halfedge(he).copied() else {
            return false;
        };
        let (f0, f1) = self.edge_faces(he);
        for f in [f0, f1].into_iter().flatten() {
            self.remove_face(f);
        }

        for id in [he, h.twin] {
            if let Some(half) = self.halfedges.get_mut(id.index()).and_then(Option::take) {
                self.edge_lookup.remove(&(half.origin, half.target));
                self.live_halfedges -= 1;
            }
        }
        self.repair_outgoing(h.origin);
        self.repair_outgoing(h.target);
        true
    }

    /// Remove a vertex together with every incident face and edge.
    ///
    /// Returns false for a dead vertex.
    pub fn remove_vertex(&mut self, v: VertexId<I>) -> bool {
        if !self.contains_vertex(v) {
            return false;
        }
        let outgoing: Vec<HalfEdgeId<I>> = self.vertex_outgoing_all(v).collect();
        for he in outgoing {
            self.remove_edge(he);
        }
        self.vertices[v.index()] = None;
        self.live_vertices -= 1;
        true
    }

    /// Remove vertices that no edge references any more.
    pub fn remove_isolated_vertices(&mut self) -> usize {
        let isolated: Vec<VertexId<I>> = self
            .vertex_ids()
            .filter(|&v| !self.outgoing(v).is_valid())
            .collect();
        for &v in &isolated {
            self.remove_vertex(v);
        }
        isolated.len()
    }

    /// Remove edges with no face on either side.
    pub fn remove_wire_edges(&mut self) -> usize {
        let wires: Vec<HalfEdgeId<I>> = self
            .edge_ids()
            .filter(|&he| {
                self.is_boundary_halfedge(he) && self.is_boundary_halfedge(self.twin(he))
            })
            .collect();
        for &he in &wires {
            self.remove_edge(he);
        }
        wires.len()
    }

    // ==================== Internal helpers ====================

    /// Point a vertex at its most useful outgoing half-edge.
    ///
    /// Prefers half-edges inside a face so the fan walk sees the whole fan,
    /// then edges whose twin has a face, then wire edges.
    pub(crate) fn repair_outgoing(&mut self, v: VertexId<I>) {
        let current = self.outgoing(v);
        match self.vertex(v) {
            None => return,
            Some(_) if self.origin(current) == v && !self.is_boundary_halfedge(current) => return,
            Some(_) => {}
        }
        let mut best = HalfEdgeId::invalid();
        let mut best_rank = 0;
        for he in self.vertex_outgoing_all(v) {
            let rank = if !self.is_boundary_halfedge(he) {
                3
            } else if !self.is_boundary_halfedge(self.twin(he)) {
                2
            } else {
                1
            };
            if rank > best_rank {
                best = he;
                best_rank = rank;
                if rank == 3 {
                    break;
                }
            }
        }
        self[v].halfedge = best;
    }

    /// Set `a.next = b` and `b.prev = a`.
    #[inline]
    pub(crate) fn link(&mut self, a: HalfEdgeId<I>, b: HalfEdgeId<I>) {
        self[a].next = b;
        self[b].prev = a;
    }

    /// Re-key a half-edge in the directed-edge map after its endpoints changed.
    pub(crate) fn rekey(&mut self, he: HalfEdgeId<I>, origin: VertexId<I>, target: VertexId<I>) {
        let old = self[he];
        if self.edge_lookup.get(&(old.origin, old.target)) == Some(&he) {
            self.edge_lookup.remove(&(old.origin, old.target));
        }
        let h = &mut self[he];
        h.origin = origin;
        h.target = target;
        self.edge_lookup.insert((origin, target), he);
    }

    /// Fail with `IndexOverflow` unless `vertices`, `halfedges` and `faces`
    /// more elements of each kind still get ids.
    pub(crate) fn reserve_ids(&self, vertices: usize, halfedges: usize, faces: usize) -> Result<()> {
        let pending = [
            ("vertex", self.vertices.len(), vertices),
            ("half-edge", self.halfedges.len(), halfedges),
            ("face", self.faces.len(), faces),
        ];
        for (kind, len, extra) in pending {
            if extra == 0 {
                continue;
            }
            let slot = len + extra - 1;
            if I::try_from_usize(slot).is_none() {
                warn!(kind, slot, "index type exhausted");
                return Err(MeshError::IndexOverflow { kind, slot });
            }
        }
        Ok(())
    }

    /// Allocate a bare twin pair without touching vertex links.
    pub(crate) fn alloc_pair(
        &mut self,
        origin: VertexId<I>,
        target: VertexId<I>,
    ) -> (HalfEdgeId<I>, HalfEdgeId<I>) {
        let he = HalfEdgeId::new(self.halfedges.len());
        let tw = HalfEdgeId::new(self.halfedges.len() + 1);
        let mut a = HalfEdge::new(origin, target);
        let mut b = HalfEdge::new(target, origin);
        a.twin = tw;
        b.twin = he;
        self.halfedges.push(Some(a));
        self.halfedges.push(Some(b));
        self.live_halfedges += 2;
        self.edge_lookup.insert((origin, target), he);
        self.edge_lookup.insert((target, origin), tw);
        (he, tw)
    }
}

impl<I: MeshIndex> Index<VertexId<I>> for HalfEdgeMesh<I> {
    type Output = Vertex<I>;

    fn index(&self, id: VertexId<I>) -> &Vertex<I> {
        match self.vertex(id) {
            Some(v) => v,
            None => panic!("{id:?} is not a live vertex"),
        }
    }
}

impl<I: MeshIndex> IndexMut<VertexId<I>> for HalfEdgeMesh<I> {
    fn index_mut(&mut self, id: VertexId<I>) -> &mut Vertex<I> {
        match self.vertex_mut(id) {
            Some(v) => v,
            None => panic!("{id:?} is not a live vertex"),
        }
    }
}

impl<I: MeshIndex> Index<HalfEdgeId<I>> for HalfEdgeMesh<I> {
    type Output = HalfEdge<I>;

    fn index(&self, id: HalfEdgeId<I>) -> &HalfEdge<I> {
        match self.halfedge(id) {
            Some(h) => h,
            None => panic!("{id:?} is not a live half-edge"),
        }
    }
}

impl<I: MeshIndex> IndexMut<HalfEdgeId<I>> for HalfEdgeMesh<I> {
    fn index_mut(&mut self, id: HalfEdgeId<I>) -> &mut HalfEdge<I> {
        match self.halfedge_mut(id) {
            Some(h) => h,
            None => panic!("{id:?} is not a live half-edge"),
        }
    }
}

impl<I: MeshIndex> Index<FaceId<I>> for HalfEdgeMesh<I> {
    type Output = Face<I>;

    fn index(&self, id: FaceId<I>) -> &Face<I> {
        match self.face(id) {
            Some(f) => f,
            None => panic!("{id:?} is not a live face"),
        }
    }
}

impl<I: MeshIndex> IndexMut<FaceId<I>> for HalfEdgeMesh<I> {
    fn index_mut(&mut self, id: FaceId<I>) -> &mut Face<I> {
        match self.face_mut(id) {
            Some(f) => f,
            None => panic!("{id:?} is not a live face"),
        }
    }
}

/// Iterator over the outgoing half-edges of a vertex, in fan order.
pub struct VertexHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    remaining: usize,
}

impl<'a, I: MeshIndex> VertexHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, v: VertexId<I>) -> Self {
        let guard = mesh.num_halfedges();
        let mut start = mesh.outgoing(v);

        // Rewind to the first edge of an open fan.
        if start.is_valid() {
            let origin = start;
            let mut steps = 0;
            loop {
                let back = mesh.twin(mesh.prev(start));
                if !back.is_valid() || back == origin || steps > guard {
                    break;
                }
                start = back;
                steps += 1;
            }
        }

        Self {
            mesh,
            start,
            current: start,
            remaining: if start.is_valid() { guard } else { 0 },
        }
    }
}

impl<'a, I: MeshIndex> Iterator for VertexHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let result = self.current;
        // he: v -> w, twin: w -> v, next(twin): v -> x in the neighbouring face.
        let step = self.mesh.next(self.mesh.twin(self.current));
        if !step.is_valid() || step == self.start {
            self.remaining = 0;
        } else {
            self.current = step;
        }
        Some(result)
    }
}

/// Iterator over the half-edges of a face.
pub struct FaceHalfEdgeIter<'a, I: MeshIndex = u32> {
    mesh: &'a HalfEdgeMesh<I>,
    start: HalfEdgeId<I>,
    current: HalfEdgeId<I>,
    remaining: usize,
}

impl<'a, I: MeshIndex> FaceHalfEdgeIter<'a, I> {
    fn new(mesh: &'a HalfEdgeMesh<I>, f: FaceId<I>) -> Self {
        let start = mesh.face_halfedge(f);
        Self {
            mesh,
            start,
            current: start,
            remaining: if start.is_valid() {
                mesh.num_halfedges()
            } else {
                0
            },
        }
    }
}

impl<'a, I: MeshIndex> Iterator for FaceHalfEdgeIter<'a, I> {
    type Item = HalfEdgeId<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let result = self.current;
        let step = self.mesh.next(self.current);
        if !step.is_valid() || step == self.start {
            self.remaining = 0;
        } else {
            self.current = step;
        }
        Some(result)
    }
}
