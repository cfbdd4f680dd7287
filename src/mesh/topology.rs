//! Local topology edits: the building blocks the operators are made of.

use nalgebra::Point3;
use tracing::{debug, warn};

use super::halfedge::HalfEdgeMesh;
use super::index::{FaceId, HalfEdgeId, MeshIndex, VertexId};
use crate::error::{MeshError, Result};
use crate::geometry::{normalize_or, EPSILON, WORLD_UP};

/// Flags of a face that is rebuilt by a topology edit.
#[derive(Debug, Clone)]
struct SavedFace<I: MeshIndex> {
    vertices: Vec<VertexId<I>>,
    selected: bool,
    marked: bool,
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Insert a vertex on an edge at parameter `t` from its origin.
    ///
    /// The half-edge `he` keeps its id and now ends at the new vertex; the
    /// returned half-edge continues from the new vertex to the old target.
    /// Both incident faces gain one vertex. Normal and uv are interpolated.
    ///
    /// Fails with an invalid-parameter error when `t` is not inside
    /// `(EPSILON, 1 - EPSILON)`.
    pub fn split_edge(&mut self, he: HalfEdgeId<I>, t: f64) -> Result<(VertexId<I>, HalfEdgeId<I>)> {
        let Some(h) = self.halfedge(he).copied() else {
            warn!(halfedge = he.index(), "cannot split a dead half-edge");
            return Err(MeshError::HalfEdgeNotFound(he.index()));
        };
        if !(t > EPSILON && t < 1.0 - EPSILON) {
            warn!(t, "split parameter outside (0, 1)");
            return Err(MeshError::invalid_param("t", t, "must lie strictly inside (0, 1)"));
        }
        self.reserve_ids(1, 2, 0)?;

        let (a, b) = (h.origin, h.target);
        let g = h.twin;
        let g_prev = self.prev(g);
        let h_next = h.next;

        let (pa, pb) = (self[a].clone(), self[b].clone());
        let m = self.add_vertex(pa.position + (pb.position - pa.position) * t);
        {
            let vm = &mut self[m];
            vm.normal = normalize_or(pa.normal.lerp(&pb.normal, t), WORLD_UP);
            vm.uv = pa.uv.lerp(&pb.uv, t);
        }

        self.rekey(he, a, m);
        self.rekey(g, m, a);
        let (n, n_twin) = self.alloc_pair(m, b);
        self[n].selected = h.selected;
        self[n_twin].selected = self[g].selected;

        if h.face.is_valid() {
            self[n].face = h.face;
            self.link(he, n);
            self.link(n, h_next);
        }
        let g_face = self.face_of(g);
        if g_face.is_valid() {
            self[n_twin].face = g_face;
            self.link(g_prev, n_twin);
            self.link(n_twin, g);
        }

        self[m].halfedge = n;
        if self[b].halfedge == g {
            self[b].halfedge = n_twin;
        }
        Ok((m, n))
    }

    /// Merge the target of `he` into its origin.
    ///
    /// The origin keeps its position. Triangles on either side of the edge
    /// vanish, larger faces lose a vertex. Fails when the merge would make two
    /// vertices share more than one edge; the mesh is unchanged on failure.
    pub fn collapse_edge(&mut self, he: HalfEdgeId<I>) -> Result<VertexId<I>> {
        let Some(h) = self.halfedge(he).copied() else {
            return Err(MeshError::HalfEdgeNotFound(he.index()));
        };
        let (a, b) = (h.origin, h.target);

        // Link condition: the only shared neighbours may be the apexes of
        // triangles on the collapsing edge.
        let mut apexes = Vec::new();
        for side in [he, h.twin] {
            let f = self.face_of(side);
            if f.is_valid() && self.face_degree(f) == 3 {
                apexes.push(self.target(self.next(side)));
            }
        }
        let b_neighbors: Vec<VertexId<I>> =
            self.vertex_outgoing_all(b).map(|o| self.target(o)).collect();
        for o in self.vertex_outgoing_all(a) {
            let c = self.target(o);
            if c != b && b_neighbors.contains(&c) && !apexes.contains(&c) {
                warn!(a = a.index(), b = b.index(), shared = c.index(), "collapse violates link condition");
                return Err(MeshError::NonManifold {
                    details: format!("collapsing {he:?} would join {a:?} and {c:?} twice"),
                });
            }
        }

        let snapshot = self.clone();
        let result = self.collapse_unchecked(a, b);
        if result.is_err() {
            *self = snapshot;
        }
        result.map(|()| a)
    }

    fn collapse_unchecked(&mut self, a: VertexId<I>, b: VertexId<I>) -> Result<()> {
        let mut faces: Vec<FaceId<I>> = self
            .vertex_outgoing_all(b)
            .filter_map(|o| self.face_of(o).valid())
            .collect();
        faces.sort();
        let saved = self.save_faces(&faces);
        let wires: Vec<VertexId<I>> = self
            .vertex_outgoing_all(b)
            .filter(|&o| self.is_boundary_halfedge(o) && self.is_boundary_halfedge(self.twin(o)))
            .map(|o| self.target(o))
            .filter(|&c| c != a)
            .collect();

        for &f in &faces {
            self.remove_face(f);
        }
        self.remove_vertex(b);

        for mut face in saved {
            for v in face.vertices.iter_mut() {
                if *v == b {
                    *v = a;
                }
            }
            face.vertices.dedup();
            if face.vertices.len() > 1 && face.vertices.first() == face.vertices.last() {
                face.vertices.pop();
            }
            if face.vertices.len() < 3 {
                continue;
            }
            self.restore_face(&face)?;
        }
        self.remove_wire_edges_at(a);
        for c in wires {
            self.add_edge(a, c)?;
        }
        Ok(())
    }

    /// Replace the edge shared by two triangles with the other diagonal.
    ///
    /// For `he = b -> c` in triangle `(a, b, c)` with twin in `(c, b, d)`, the
    /// result is the triangles `(a, b, d)` and `(a, d, c)`. Returns the new
    /// half-edge `a -> d`.
    pub fn flip_edge(&mut self, he: HalfEdgeId<I>) -> Result<HalfEdgeId<I>> {
        let Some(h) = self.halfedge(he).copied() else {
            return Err(MeshError::HalfEdgeNotFound(he.index()));
        };
        let (f, g) = (h.face, self.face_of(h.twin));
        if !f.is_valid() {
            return Err(MeshError::BoundaryEdge { edge: he.index() });
        }
        if !g.is_valid() {
            return Err(MeshError::BoundaryEdge { edge: h.twin.index() });
        }
        for face in [f, g] {
            if self.face_degree(face) != 3 {
                warn!(face = face.index(), "edge flip needs two triangles");
                return Err(MeshError::NotTriangleMesh { face: face.index() });
            }
        }

        let (b, c) = (h.origin, h.target);
        let a = self.target(h.next);
        let d = self.target(self.next(h.twin));
        if a == d || self.find_halfedge(a, d).is_some() {
            warn!(a = a.index(), d = d.index(), "flipped diagonal already exists");
            return Err(MeshError::DuplicateEdge {
                v0: a.index(),
                v1: d.index(),
            });
        }

        let selected = self[f].selected || self[g].selected;
        let marked = self[f].marked || self[g].marked;
        let snapshot = self.clone();
        let result = (|| {
            self.remove_edge(he);
            for verts in [[a, b, d], [a, d, c]] {
                self.restore_face(&SavedFace {
                    vertices: verts.to_vec(),
                    selected,
                    marked,
                })?;
            }
            self.find_halfedge(a, d)
                .ok_or(MeshError::NonManifold {
                    details: "flipped diagonal missing".into(),
                })
        })();
        match &result {
            Ok(diag) => debug!(?he, ?diag, "flipped edge"),
            Err(_) => *self = snapshot,
        }
        result
    }

    /// Add a vertex copying normal and uv of `v` at a new position.
    ///
    /// No edges are created.
    pub fn duplicate_vertex(&mut self, v: VertexId<I>, position: Point3<f64>) -> Result<VertexId<I>> {
        let Some(src) = self.vertex(v) else {
            return Err(MeshError::VertexNotFound(v.index()));
        };
        let (normal, uv) = (src.normal, src.uv);
        self.reserve_ids(1, 0, 0)?;
        let dup = self.add_vertex(position);
        let vd = &mut self[dup];
        vd.normal = normal;
        vd.uv = uv;
        Ok(dup)
    }

    /// Add the quad `(v1, v2, v3, v4)`.
    pub fn create_quad_face(
        &mut self,
        v1: VertexId<I>,
        v2: VertexId<I>,
        v3: VertexId<I>,
        v4: VertexId<I>,
    ) -> Result<FaceId<I>> {
        self.add_face(&[v1, v2, v3, v4])
    }

    /// Remove wire edges leaving `v` (no face on either side).
    pub(crate) fn remove_wire_edges_at(&mut self, v: VertexId<I>) {
        let wires: Vec<HalfEdgeId<I>> = self
            .vertex_outgoing_all(v)
            .filter(|&o| self.is_boundary_halfedge(o) && self.is_boundary_halfedge(self.twin(o)))
            .collect();
        for he in wires {
            self.remove_edge(he);
        }
    }

    fn save_faces(&self, faces: &[FaceId<I>]) -> Vec<SavedFace<I>> {
        faces
            .iter()
            .map(|&f| SavedFace {
                vertices: self.face_vertices(f).collect(),
                selected: self[f].selected,
                marked: self[f].marked,
            })
            .collect()
    }

    fn restore_face(&mut self, face: &SavedFace<I>) -> Result<FaceId<I>> {
        let f = self.add_face(&face.vertices)?;
        self[f].selected = face.selected;
        self[f].marked = face.marked;
        Ok(f)
    }
}
