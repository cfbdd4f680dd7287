//! Consistency checks and global topological queries.

use std::fmt;

use tracing::warn;

use super::halfedge::HalfEdgeMesh;
use super::index::{HalfEdgeId, MeshIndex, VertexId};

/// Outcome of [`HalfEdgeMesh::validate`]: one line per violated check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Human-readable descriptions of every failed check.
    pub issues: Vec<String>,
}

impl ValidationReport {
    /// Whether every check passed.
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, issue: String) {
        self.issues.push(issue);
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issues.is_empty() {
            return write!(f, "mesh is consistent");
        }
        writeln!(f, "{} issue(s):", self.issues.len())?;
        for issue in &self.issues {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }
}

impl<I: MeshIndex> HalfEdgeMesh<I> {
    /// Check the structural invariants of the mesh.
    ///
    /// Covers twin symmetry, `next`/`prev` symmetry, closure of every face
    /// loop, vertex outgoing links and the directed-edge map. Failures are
    /// collected into the report and logged at `warn` level.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        for (v, vertex) in self.vertices() {
            let out = vertex.halfedge;
            if out.is_valid() {
                match self.halfedge(out) {
                    None => report.push(format!("{v:?} points at dead {out:?}")),
                    Some(h) if h.origin != v => {
                        report.push(format!("{v:?} outgoing {out:?} starts at {:?}", h.origin))
                    }
                    Some(_) => {}
                }
            } else if self.vertex_outgoing_all(v).next().is_some() {
                report.push(format!("{v:?} has edges but no outgoing half-edge"));
            }
        }

        for (he, h) in self.halfedges() {
            if !self.contains_vertex(h.origin) || !self.contains_vertex(h.target) {
                report.push(format!("{he:?} references a dead vertex"));
            }
            match self.halfedge(h.twin) {
                None => report.push(format!("{he:?} has no live twin")),
                Some(t) => {
                    if t.twin != he {
                        report.push(format!("{he:?} twin {:?} does not point back", h.twin));
                    }
                    if t.origin != h.target || t.target != h.origin {
                        report.push(format!("{he:?} and twin {:?} disagree on endpoints", h.twin));
                    }
                }
            }
            if self.find_halfedge(h.origin, h.target) != Some(he) {
                report.push(format!("{he:?} missing from the edge map"));
            }

            if h.face.is_valid() {
                if !self.contains_face(h.face) {
                    report.push(format!("{he:?} references dead {:?}", h.face));
                }
                match self.halfedge(h.next) {
                    Some(n) if n.prev == he => {
                        if n.origin != h.target {
                            report.push(format!("{he:?} next {:?} does not continue it", h.next));
                        }
                    }
                    _ => report.push(format!("{he:?}.next.prev != {he:?}")),
                }
                match self.halfedge(h.prev) {
                    Some(p) if p.next == he => {}
                    _ => report.push(format!("{he:?}.prev.next != {he:?}")),
                }
            } else if h.next.is_valid() || h.prev.is_valid() {
                report.push(format!("boundary {he:?} has face links"));
            }
        }

        for (f, face) in self.faces() {
            let start = face.halfedge;
            if !self.contains_halfedge(start) {
                report.push(format!("{f:?} points at dead {start:?}"));
                continue;
            }
            let mut he = start;
            let mut steps = 0;
            loop {
                if self.face_of(he) != f {
                    report.push(format!("{f:?} loop visits {he:?} of another face"));
                    break;
                }
                he = self.next(he);
                steps += 1;
                if he == start || !he.is_valid() || steps > self.num_halfedges() {
                    break;
                }
            }
            if he != start {
                report.push(format!("{f:?} loop does not close"));
            } else if steps < 3 {
                report.push(format!("{f:?} has only {steps} edges"));
            }
        }

        if self.edge_lookup.len() != self.num_halfedges() {
            report.push(format!(
                "edge map holds {} entries for {} half-edges",
                self.edge_lookup.len(),
                self.num_halfedges()
            ));
        }

        if !report.is_ok() {
            warn!(issues = report.issues.len(), "mesh validation failed");
        }
        report
    }

    /// Whether the mesh is an orientable 2-manifold (with boundary).
    ///
    /// Every edge carries at most one face per side by construction, so this
    /// checks that each vertex sees a single fan: all faces around it are
    /// reachable from one another, with at most one boundary gap.
    pub fn is_manifold(&self) -> bool {
        self.vertex_ids().all(|v| self.is_manifold_vertex(v))
    }

    /// Whether the faces around `v` form one (possibly open) fan.
    pub fn is_manifold_vertex(&self, v: VertexId<I>) -> bool {
        let mut faced = 0;
        let mut gaps = 0;
        for he in self.vertex_outgoing_all(v) {
            let inside = !self.is_boundary_halfedge(he);
            let twin_inside = !self.is_boundary_halfedge(self.twin(he));
            if inside {
                faced += 1;
            }
            if !inside && twin_inside {
                gaps += 1;
            }
        }
        let fan = self.vertex_faces(v).count();
        gaps <= 1 && fan == faced
    }

    /// Whether no half-edge lies on the boundary.
    pub fn is_closed(&self) -> bool {
        self.halfedges().all(|(_, h)| !h.is_boundary())
    }

    /// `V - E + F`, counting each twin pair as one edge.
    pub fn euler_characteristic(&self) -> i64 {
        self.num_vertices() as i64 - self.num_edges() as i64 + self.num_faces() as i64
    }

    /// Vertices with at least one incident boundary edge.
    pub fn boundary_vertices(&self) -> Vec<VertexId<I>> {
        self.vertex_ids()
            .filter(|&v| {
                self.vertex_outgoing_all(v)
                    .any(|he| self.is_boundary_edge(he))
            })
            .collect()
    }

    /// One half-edge per boundary edge: the side without a face.
    pub fn boundary_edges(&self) -> Vec<HalfEdgeId<I>> {
        self.edge_ids()
            .filter_map(|he| {
                if self.is_boundary_halfedge(he) {
                    Some(he)
                } else if self.is_boundary_halfedge(self.twin(he)) {
                    Some(self.twin(he))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Boundary loops as vertex sequences, following the faceless half-edges.
    pub fn boundary_loops(&self) -> Vec<Vec<VertexId<I>>> {
        let mut visited = std::collections::HashSet::new();
        let mut loops = Vec::new();
        for start in self.boundary_edges() {
            if visited.contains(&start) || self.is_boundary_halfedge(self.twin(start)) {
                continue;
            }
            let mut lp = Vec::new();
            let mut he = start;
            loop {
                visited.insert(he);
                lp.push(self.origin(he));
                match self.next_boundary(he) {
                    Some(n) if n != start && !visited.contains(&n) => he = n,
                    _ => break,
                }
            }
            loops.push(lp);
        }
        loops
    }

    /// The boundary half-edge that continues `he` at its target.
    pub(crate) fn next_boundary(&self, he: HalfEdgeId<I>) -> Option<HalfEdgeId<I>> {
        let v = self.target(he);
        self.vertex_outgoing_all(v).find(|&out| {
            self.is_boundary_halfedge(out)
                && !self.is_boundary_halfedge(self.twin(out))
                && self.target(out) != self.origin(he)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_validate_empty_and_triangle() {
        let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
        assert!(mesh.validate().is_ok());

        let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
        mesh.add_face(&[a, b, c]).unwrap();
        let report = mesh.validate();
        assert!(report.is_ok(), "{report}");
        assert!(mesh.is_manifold());
        assert!(!mesh.is_closed());
        assert_eq!(mesh.euler_characteristic(), 1);
        assert_eq!(mesh.boundary_edges().len(), 3);
        assert_eq!(mesh.boundary_vertices().len(), 3);
        assert_eq!(mesh.boundary_loops().len(), 1);
        assert_eq!(mesh.boundary_loops()[0].len(), 3);
    }

    #[test]
    fn test_validate_detects_broken_twin() {
        let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex(Point3::origin());
        let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let he = mesh.add_edge(a, b).unwrap();
        mesh[he].twin = HalfEdgeId::invalid();
        let report = mesh.validate();
        assert!(!report.is_ok());
        assert!(report.issues.iter().any(|s| s.contains("twin")));
    }

    #[test]
    fn test_bowtie_is_not_manifold() {
        let mut mesh: HalfEdgeMesh = HalfEdgeMesh::new();
        let c = mesh.add_vertex(Point3::origin());
        let a = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
        let b = mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
        let d = mesh.add_vertex(Point3::new(-1.0, 0.0, 0.0));
        let e = mesh.add_vertex(Point3::new(-1.0, -1.0, 0.0));
        mesh.add_face(&[c, a, b]).unwrap();
        mesh.add_face(&[c, d, e]).unwrap();
        assert!(mesh.validate().is_ok());
        assert!(!mesh.is_manifold_vertex(c));
        assert!(!mesh.is_manifold());
    }
}
