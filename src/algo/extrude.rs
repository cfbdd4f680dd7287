//! Interactive extrusion of vertices, edges and faces.
//!
//! Extrusion is a session: [`ExtrudeTool::begin`] builds the new topology
//! with the new elements sitting on top of the old ones,
//! [`ExtrudeTool::update`] moves them any number of times, and
//! [`ExtrudeTool::confirm`] or [`ExtrudeTool::cancel`] ends the session.
//! Cancel restores the mesh exactly as it was before `begin`.
//!
//! Connected selected faces extrude as one region: only edges on the
//! region's border grow side quads and interior edges stay on the cap.
//!
//! # Example
//!
//! ```
//! use chisel::algo::extrude::{ExtrudeOptions, ExtrudeTool};
//! use chisel::mesh::{primitives, FaceId, HalfEdgeMesh};
//! use chisel::selection::{Element, Selection, SelectionType};
//!
//! let mut mesh: HalfEdgeMesh = primitives::cube(1.0).unwrap();
//! let selection = Selection::new(SelectionType::Face);
//! selection.select(&mut mesh, Element::Face(FaceId::new(1)), true);
//!
//! let mut tool = ExtrudeTool::new(ExtrudeOptions::default());
//! tool.begin(&mut mesh, &selection).unwrap();
//! tool.update(&mut mesh, 1.0).unwrap();
//! tool.confirm(&mut mesh).unwrap();
//!
//! assert_eq!(mesh.num_faces(), 10);
//! assert!(mesh.is_closed());
//! ```

use std::collections::{HashMap, HashSet};

use nalgebra::{Point3, Vector3};
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::geometry::{normalize_or, EPSILON, WORLD_UP};
use crate::mesh::{FaceId, HalfEdgeId, HalfEdgeMesh, MeshIndex, VertexId};
use crate::selection::{Selection, SelectionType};

/// How extruded elements move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExtrudeMode {
    /// Along the averaged normal of each connected region.
    #[default]
    Normal,
    /// Along [`ExtrudeOptions::direction`].
    Direction,
    /// Each face along its own normal, with its own side quads.
    Individual,
}

/// Options for [`ExtrudeTool`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExtrudeOptions {
    /// Movement mode.
    pub mode: ExtrudeMode,
    /// Direction used by [`ExtrudeMode::Direction`]; normalized on use.
    pub direction: Vector3<f64>,
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            mode: ExtrudeMode::Normal,
            direction: WORLD_UP,
        }
    }
}

impl ExtrudeOptions {
    /// Extrude along a fixed direction.
    pub fn along(direction: Vector3<f64>) -> Self {
        Self {
            mode: ExtrudeMode::Direction,
            direction,
        }
    }

    /// Extrude every face on its own.
    pub fn individual() -> Self {
        Self {
            mode: ExtrudeMode::Individual,
            ..Self::default()
        }
    }
}

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtrudeState {
    /// No extrusion in progress.
    #[default]
    Idle,
    /// New geometry exists and follows `update` calls.
    Active,
}

/// Geometry created by the running session, for drawing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewGeometry {
    /// Outline of every created face.
    pub polygons: Vec<Vec<Point3<f64>>>,
    /// Every created edge that borders no created face.
    pub lines: Vec<[Point3<f64>; 2]>,
}

impl PreviewGeometry {
    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty() && self.lines.is_empty()
    }
}

/// A moving vertex: its position at `begin` and its unit of travel.
#[derive(Debug, Clone, Copy)]
struct Move<I: MeshIndex> {
    vertex: VertexId<I>,
    base: Point3<f64>,
    direction: Vector3<f64>,
}

/// Extrusion session.
#[derive(Debug, Clone)]
pub struct ExtrudeTool<I: MeshIndex = u32> {
    options: ExtrudeOptions,
    state: ExtrudeState,
    kind: SelectionType,
    snapshot: Option<HalfEdgeMesh<I>>,
    moves: Vec<Move<I>>,
    created_vertices: Vec<VertexId<I>>,
    created_faces: Vec<FaceId<I>>,
    created_edges: Vec<HalfEdgeId<I>>,
    caps: Vec<FaceId<I>>,
}

impl<I: MeshIndex> ExtrudeTool<I> {
    /// Idle tool with the given options.
    pub fn new(options: ExtrudeOptions) -> Self {
        Self {
            options,
            state: ExtrudeState::Idle,
            kind: SelectionType::Face,
            snapshot: None,
            moves: Vec::new(),
            created_vertices: Vec::new(),
            created_faces: Vec::new(),
            created_edges: Vec::new(),
            caps: Vec::new(),
        }
    }

    /// Current options.
    pub fn options(&self) -> &ExtrudeOptions {
        &self.options
    }

    /// Replace the options. Only allowed while idle.
    pub fn set_options(&mut self, options: ExtrudeOptions) -> Result<()> {
        if self.state == ExtrudeState::Active {
            return Err(MeshError::SessionActive);
        }
        self.options = options;
        Ok(())
    }

    /// Session state.
    pub fn state(&self) -> ExtrudeState {
        self.state
    }

    /// Whether a session is running.
    pub fn is_active(&self) -> bool {
        self.state == ExtrudeState::Active
    }

    /// Vertices created by the running or last confirmed session.
    pub fn created_vertices(&self) -> &[VertexId<I>] {
        &self.created_vertices
    }

    /// Faces created by the running or last confirmed session.
    pub fn created_faces(&self) -> &[FaceId<I>] {
        &self.created_faces
    }

    /// Whether [`ExtrudeTool::begin`] would find anything to extrude.
    pub fn can_extrude(&self, mesh: &HalfEdgeMesh<I>, selection: &Selection) -> bool {
        self.state == ExtrudeState::Idle && !selection.is_empty(mesh)
    }

    /// Build the extruded topology for the selected elements.
    ///
    /// New elements start at zero distance. Fails without touching the mesh
    /// when the selection is empty or a session is already running.
    pub fn begin(&mut self, mesh: &mut HalfEdgeMesh<I>, selection: &Selection) -> Result<()> {
        if self.state == ExtrudeState::Active {
            warn!("extrude session already active");
            return Err(MeshError::SessionActive);
        }
        if selection.is_empty(mesh) {
            warn!("nothing selected to extrude");
            return Err(MeshError::EmptySelection);
        }
        if self.options.mode == ExtrudeMode::Direction && self.options.direction.norm() < EPSILON {
            return Err(MeshError::invalid_param(
                "direction",
                format!("{:?}", self.options.direction),
                "must be non-zero",
            ));
        }

        self.reset();
        self.kind = selection.mode().element_type();
        let snapshot = mesh.clone();
        let result = match self.kind {
            SelectionType::Vertex => self.extrude_vertices(mesh, &selection.selected_vertices(mesh)),
            SelectionType::Edge => self.extrude_edges(mesh, &selection.selected_edges(mesh)),
            _ => {
                let faces = selection.selected_faces(mesh);
                if self.options.mode == ExtrudeMode::Individual {
                    faces
                        .iter()
                        .try_for_each(|&f| self.extrude_region(mesh, &[f]))
                } else {
                    face_regions(mesh, &faces)
                        .iter()
                        .try_for_each(|region| self.extrude_region(mesh, region))
                }
            }
        };

        if let Err(e) = result {
            warn!(error = %e, "extrude failed, mesh restored");
            *mesh = snapshot;
            self.reset();
            return Err(e);
        }
        mesh.update_normals();
        self.snapshot = Some(snapshot);
        self.state = ExtrudeState::Active;
        debug!(
            vertices = self.created_vertices.len(),
            faces = self.created_faces.len(),
            "extrude session started"
        );
        Ok(())
    }

    /// Move the extruded elements `distance` along their directions.
    pub fn update(&mut self, mesh: &mut HalfEdgeMesh<I>, distance: f64) -> Result<()> {
        self.require_active()?;
        for m in &self.moves {
            mesh.set_position(m.vertex, m.base + m.direction * distance);
        }
        mesh.update_normals();
        Ok(())
    }

    /// Move the extruded elements by a fixed offset, ignoring their directions.
    pub fn update_offset(&mut self, mesh: &mut HalfEdgeMesh<I>, offset: Vector3<f64>) -> Result<()> {
        self.require_active()?;
        for m in &self.moves {
            mesh.set_position(m.vertex, m.base + offset);
        }
        mesh.update_normals();
        Ok(())
    }

    /// Keep the extrusion and move the selection onto the new elements.
    pub fn confirm(&mut self, mesh: &mut HalfEdgeMesh<I>) -> Result<()> {
        self.require_active()?;
        let selection = Selection::new(self.kind);
        selection.clear(mesh);
        match self.kind {
            SelectionType::Vertex => {
                for &v in &self.created_vertices {
                    mesh[v].selected = true;
                }
            }
            SelectionType::Edge => {
                for &he in &self.created_edges {
                    let twin = mesh.twin(he);
                    mesh[he].selected = true;
                    mesh[twin].selected = true;
                }
            }
            _ => {
                for &f in &self.caps {
                    mesh[f].selected = true;
                }
            }
        }
        self.snapshot = None;
        self.state = ExtrudeState::Idle;
        info!(
            vertices = self.created_vertices.len(),
            faces = self.created_faces.len(),
            "extrude confirmed"
        );
        Ok(())
    }

    /// Drop the extrusion and restore the mesh to its state before `begin`.
    pub fn cancel(&mut self, mesh: &mut HalfEdgeMesh<I>) -> Result<()> {
        self.require_active()?;
        if let Some(snapshot) = self.snapshot.take() {
            *mesh = snapshot;
        }
        self.reset();
        debug!("extrude cancelled");
        Ok(())
    }

    /// Geometry of the running session.
    pub fn preview(&self, mesh: &HalfEdgeMesh<I>) -> PreviewGeometry {
        if self.state != ExtrudeState::Active {
            return PreviewGeometry::default();
        }
        let polygons = self
            .created_faces
            .iter()
            .filter(|&&f| mesh.contains_face(f))
            .map(|&f| mesh.face_positions(f))
            .collect();
        let lines = self
            .created_edges
            .iter()
            .filter(|&&he| mesh.contains_halfedge(he) && mesh.is_boundary_halfedge(he))
            .filter(|&&he| mesh.is_boundary_halfedge(mesh.twin(he)))
            .map(|&he| [*mesh.position(mesh.origin(he)), *mesh.position(mesh.target(he))])
            .collect();
        PreviewGeometry { polygons, lines }
    }

    fn require_active(&self) -> Result<()> {
        if self.state == ExtrudeState::Active {
            Ok(())
        } else {
            Err(MeshError::NoActiveSession)
        }
    }

    fn reset(&mut self) {
        self.state = ExtrudeState::Idle;
        self.snapshot = None;
        self.moves.clear();
        self.created_vertices.clear();
        self.created_faces.clear();
        self.created_edges.clear();
        self.caps.clear();
    }

    fn fixed_direction(&self) -> Option<Vector3<f64>> {
        (self.options.mode == ExtrudeMode::Direction).then(|| normalize_or(self.options.direction, WORLD_UP))
    }

    /// Extrude a set of faces as one region.
    fn extrude_region(&mut self, mesh: &mut HalfEdgeMesh<I>, faces: &[FaceId<I>]) -> Result<()> {
        let region: HashSet<FaceId<I>> = faces.iter().copied().collect();

        let border: Vec<(VertexId<I>, VertexId<I>)> = faces
            .iter()
            .flat_map(|&f| mesh.face_halfedges(f).collect::<Vec<_>>())
            .filter(|&he| !region.contains(&mesh.face_of(mesh.twin(he))))
            .map(|he| (mesh.origin(he), mesh.target(he)))
            .collect();

        let polygons: Vec<(Vec<VertexId<I>>, bool)> = faces
            .iter()
            .map(|&f| (mesh.face_vertices(f).collect(), mesh[f].marked))
            .collect();

        let direction = self.fixed_direction().unwrap_or_else(|| {
            let sum: Vector3<f64> = faces.iter().map(|&f| mesh.face_normal(f) * mesh.face_area(f)).sum();
            normalize_or(sum, WORLD_UP)
        });

        // Vertices shared with the rest of the mesh get a copy; vertices
        // only used by the region move with the cap.
        let mut region_vertices: Vec<VertexId<I>> = polygons.iter().flat_map(|(p, _)| p.iter().copied()).collect();
        region_vertices.sort();
        region_vertices.dedup();

        let mut copies: HashMap<VertexId<I>, VertexId<I>> = HashMap::new();
        for &v in &region_vertices {
            let shared = mesh.is_boundary_vertex(v) || mesh.vertex_faces(v).any(|f| !region.contains(&f));
            if shared {
                let dup = mesh.duplicate_vertex(v, *mesh.position(v))?;
                copies.insert(v, dup);
                self.created_vertices.push(dup);
            }
        }

        for &f in faces {
            mesh.remove_face(f);
        }

        for (polygon, marked) in &polygons {
            let cap: Vec<VertexId<I>> = polygon.iter().map(|v| *copies.get(v).unwrap_or(v)).collect();
            let f = mesh.add_face(&cap)?;
            mesh[f].marked = *marked;
            self.caps.push(f);
            self.created_faces.push(f);
        }

        for &(a, b) in &border {
            let (a2, b2) = match (copies.get(&a), copies.get(&b)) {
                (Some(&a2), Some(&b2)) => (a2, b2),
                _ => return Err(MeshError::NonManifold {
                    details: format!("border vertex {a:?} or {b:?} was not duplicated"),
                }),
            };
            let f = mesh.create_quad_face(a, b, b2, a2)?;
            self.created_faces.push(f);
        }

        for &v in copies.keys() {
            mesh.remove_wire_edges_at(v);
        }
        for &v in &region_vertices {
            mesh.repair_outgoing(v);
        }

        for &v in &region_vertices {
            let moving = copies.get(&v).copied().unwrap_or(v);
            self.moves.push(Move {
                vertex: moving,
                base: *mesh.position(moving),
                direction,
            });
        }
        Ok(())
    }

    /// Extrude open edges into side quads. Edges with faces on both sides
    /// cannot grow a quad and are refused.
    fn extrude_edges(&mut self, mesh: &mut HalfEdgeMesh<I>, edges: &[HalfEdgeId<I>]) -> Result<()> {
        let mut open = Vec::with_capacity(edges.len());
        for &he in edges {
            let free = if mesh.is_boundary_halfedge(he) {
                he
            } else if mesh.is_boundary_halfedge(mesh.twin(he)) {
                mesh.twin(he)
            } else {
                warn!(edge = he.index(), "cannot extrude an edge with two faces");
                return Err(MeshError::NonManifoldEdge {
                    v0: mesh.origin(he).index(),
                    v1: mesh.target(he).index(),
                });
            };
            open.push(free);
        }

        let fixed = self.fixed_direction();
        let mut travel: HashMap<VertexId<I>, Vector3<f64>> = HashMap::new();
        for &he in &open {
            let n = match mesh.face_of(mesh.twin(he)).valid() {
                Some(f) => mesh.face_normal(f),
                None => WORLD_UP,
            };
            for v in [mesh.origin(he), mesh.target(he)] {
                *travel.entry(v).or_insert_with(Vector3::zeros) += n;
            }
        }

        let mut ends: Vec<VertexId<I>> = travel.keys().copied().collect();
        ends.sort();
        let mut copies: HashMap<VertexId<I>, VertexId<I>> = HashMap::new();
        for &v in &ends {
            let dup = mesh.duplicate_vertex(v, *mesh.position(v))?;
            copies.insert(v, dup);
            self.created_vertices.push(dup);
            self.moves.push(Move {
                vertex: dup,
                base: *mesh.position(v),
                direction: fixed.unwrap_or_else(|| normalize_or(travel[&v], WORLD_UP)),
            });
        }

        for &he in &open {
            let (o, t) = (mesh.origin(he), mesh.target(he));
            let (o2, t2) = (copies[&o], copies[&t]);
            let f = mesh.create_quad_face(o, t, t2, o2)?;
            self.created_faces.push(f);
            if let Some(cap) = mesh.find_halfedge(o2, t2) {
                self.created_edges.push(cap);
            }
        }
        Ok(())
    }

    /// Pull a new vertex out of each selected vertex, joined by an edge.
    fn extrude_vertices(&mut self, mesh: &mut HalfEdgeMesh<I>, vertices: &[VertexId<I>]) -> Result<()> {
        let fixed = self.fixed_direction();
        for &v in vertices {
            let dup = mesh.duplicate_vertex(v, *mesh.position(v))?;
            let he = mesh.add_edge(v, dup)?;
            self.created_vertices.push(dup);
            self.created_edges.push(he);
            self.moves.push(Move {
                vertex: dup,
                base: *mesh.position(v),
                direction: fixed.unwrap_or_else(|| {
                    if mesh.vertex_faces(v).next().is_some() {
                        mesh.vertex_normal(v)
                    } else {
                        WORLD_UP
                    }
                }),
            });
        }
        Ok(())
    }
}

impl<I: MeshIndex> Default for ExtrudeTool<I> {
    fn default() -> Self {
        Self::new(ExtrudeOptions::default())
    }
}

/// Split `faces` into groups connected through shared edges.
fn face_regions<I: MeshIndex>(mesh: &HalfEdgeMesh<I>, faces: &[FaceId<I>]) -> Vec<Vec<FaceId<I>>> {
    let set: HashSet<FaceId<I>> = faces.iter().copied().collect();
    let mut visited = HashSet::new();
    let mut regions = Vec::new();
    for &seed in faces {
        if !visited.insert(seed) {
            continue;
        }
        let mut region = vec![seed];
        let mut stack = vec![seed];
        while let Some(f) = stack.pop() {
            for g in mesh.face_neighbors(f) {
                if set.contains(&g) && visited.insert(g) {
                    region.push(g);
                    stack.push(g);
                }
            }
        }
        region.sort();
        regions.push(region);
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives;
    use crate::selection::Element;
    use approx::assert_relative_eq;

    fn cube_with_top_selected() -> (HalfEdgeMesh, Selection) {
        let mut mesh: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let selection = Selection::new(SelectionType::Face);
        selection.select(&mut mesh, Element::Face(FaceId::new(1)), true);
        (mesh, selection)
    }

    #[test]
    fn test_extrude_cube_top() {
        let (mut mesh, selection) = cube_with_top_selected();
        let mut tool = ExtrudeTool::default();
        tool.begin(&mut mesh, &selection).unwrap();
        tool.update(&mut mesh, 1.0).unwrap();
        tool.confirm(&mut mesh).unwrap();

        assert_eq!(mesh.num_vertices(), 12);
        assert_eq!(mesh.num_edges(), 20);
        assert_eq!(mesh.num_faces(), 10);
        assert!(mesh.is_manifold());
        assert!(mesh.is_closed());
        assert!(mesh.validate().is_ok());

        let selected = selection.selected_faces(&mesh);
        assert_eq!(selected.len(), 1);
        for v in mesh.face_vertices(selected[0]) {
            assert_relative_eq!(mesh.position(v).y, 1.5, epsilon = EPSILON);
        }
        assert_relative_eq!(mesh.face_normal(selected[0]).y, 1.0, epsilon = EPSILON);
        // Side quads face outward.
        for &f in &tool.created_faces()[1..] {
            let n = mesh.face_normal(f);
            let c = mesh.face_centroid(f);
            assert!(n.dot(&Vector3::new(c.x, 0.0, c.z)) > 0.0);
        }
    }

    #[test]
    fn test_begin_then_cancel_is_identity() {
        let (mut mesh, selection) = cube_with_top_selected();
        let before = mesh.clone();
        let mut tool = ExtrudeTool::default();
        tool.begin(&mut mesh, &selection).unwrap();
        tool.update(&mut mesh, 0.3).unwrap();
        tool.cancel(&mut mesh).unwrap();
        assert_eq!(mesh, before);
        assert_eq!(tool.state(), ExtrudeState::Idle);
    }

    #[test]
    fn test_empty_selection_is_refused() {
        let mut mesh: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let before = mesh.clone();
        let selection = Selection::new(SelectionType::Face);
        let mut tool = ExtrudeTool::default();
        assert!(!tool.can_extrude(&mesh, &selection));
        assert!(matches!(tool.begin(&mut mesh, &selection), Err(MeshError::EmptySelection)));
        assert_eq!(mesh, before);
        assert!(matches!(tool.update(&mut mesh, 1.0), Err(MeshError::NoActiveSession)));
    }

    #[test]
    fn test_second_begin_is_refused() {
        let (mut mesh, selection) = cube_with_top_selected();
        let mut tool = ExtrudeTool::default();
        tool.begin(&mut mesh, &selection).unwrap();
        assert!(matches!(tool.begin(&mut mesh, &selection), Err(MeshError::SessionActive)));
        assert!(tool.set_options(ExtrudeOptions::individual()).is_err());
    }

    #[test]
    fn test_region_keeps_interior_edges() {
        let mut mesh: HalfEdgeMesh = primitives::grid(2, 1, 2.0).unwrap();
        let selection = Selection::new(SelectionType::Face);
        selection.select_all(&mut mesh);

        let mut tool = ExtrudeTool::default();
        tool.begin(&mut mesh, &selection).unwrap();
        tool.update(&mut mesh, 0.5).unwrap();
        tool.confirm(&mut mesh).unwrap();

        // 2 caps + 6 border quads; the shared edge stays interior to the cap.
        assert_eq!(mesh.num_faces(), 8);
        assert_eq!(mesh.num_vertices(), 12);
        assert!(mesh.validate().is_ok());
        assert!(mesh.is_manifold());
        for f in selection.selected_faces(&mesh) {
            for v in mesh.face_vertices(f) {
                assert_relative_eq!(mesh.position(v).y, 0.5, epsilon = EPSILON);
            }
        }
    }

    #[test]
    fn test_opposite_faces_extrude_outward() {
        let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let selection = Selection::new(SelectionType::Face);
        selection.select(&mut mesh, Element::Face(FaceId::new(0)), true);
        selection.select(&mut mesh, Element::Face(FaceId::new(1)), true);

        let mut tool = ExtrudeTool::default();
        tool.begin(&mut mesh, &selection).unwrap();
        tool.update(&mut mesh, 0.5).unwrap();
        tool.confirm(&mut mesh).unwrap();

        assert_eq!(mesh.num_faces(), 14);
        assert!(mesh.is_closed());
        assert!(mesh.validate().is_ok());
        let mut heights: Vec<f64> = selection
            .selected_faces(&mesh)
            .iter()
            .map(|&f| mesh.face_centroid(f).y)
            .collect();
        heights.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(heights.len(), 2);
        assert_relative_eq!(heights[0], -1.5, epsilon = EPSILON);
        assert_relative_eq!(heights[1], 1.5, epsilon = EPSILON);
    }

    #[test]
    fn test_individual_faces() {
        let mut mesh: HalfEdgeMesh = primitives::grid(2, 1, 2.0).unwrap();
        let selection = Selection::new(SelectionType::Face);
        selection.select_all(&mut mesh);

        let mut tool = ExtrudeTool::new(ExtrudeOptions::individual());
        tool.begin(&mut mesh, &selection).unwrap();
        tool.update(&mut mesh, 1.0).unwrap();
        tool.confirm(&mut mesh).unwrap();

        assert_eq!(mesh.num_faces(), 2 * 5);
        assert_eq!(mesh.num_vertices(), 6 + 8);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_direction_mode() {
        let (mut mesh, selection) = cube_with_top_selected();
        let mut tool = ExtrudeTool::new(ExtrudeOptions::along(Vector3::new(2.0, 0.0, 0.0)));
        tool.begin(&mut mesh, &selection).unwrap();
        tool.update(&mut mesh, 0.5).unwrap();
        let preview = tool.preview(&mesh);
        assert_eq!(preview.polygons.len(), 5);
        for v in tool.created_vertices() {
            assert_relative_eq!(mesh.position(*v).y, 0.5, epsilon = EPSILON);
        }
        let xs: f64 = tool.created_vertices().iter().map(|&v| mesh.position(v).x).sum();
        assert_relative_eq!(xs, 2.0, epsilon = EPSILON);
        tool.confirm(&mut mesh).unwrap();
        assert!(tool.preview(&mesh).is_empty());
    }

    #[test]
    fn test_extrude_boundary_edge() {
        let mut mesh: HalfEdgeMesh = primitives::quad(2.0).unwrap();
        let selection = Selection::new(SelectionType::Edge);
        let he = mesh.find_halfedge(VertexId::new(0), VertexId::new(1)).unwrap();
        selection.select(&mut mesh, Element::Edge(he), true);

        let mut tool = ExtrudeTool::new(ExtrudeOptions::along(Vector3::new(0.0, 0.0, -1.0)));
        tool.begin(&mut mesh, &selection).unwrap();
        tool.update(&mut mesh, 1.0).unwrap();
        tool.confirm(&mut mesh).unwrap();

        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_vertices(), 6);
        assert!(mesh.validate().is_ok());
        assert!(mesh.is_manifold());
        assert_eq!(selection.selected_edges(&mesh).len(), 1);
    }

    #[test]
    fn test_interior_edge_is_refused() {
        let mut mesh: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let before = mesh.clone();
        let selection = Selection::new(SelectionType::Edge);
        selection.select(&mut mesh, Element::Edge(HalfEdgeId::new(0)), true);
        let mut tool = ExtrudeTool::default();
        let err = tool.begin(&mut mesh, &selection).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::TopologyViolation);
        let mut restored = before;
        selection.select(&mut restored, Element::Edge(HalfEdgeId::new(0)), true);
        assert_eq!(mesh, restored);
    }

    #[test]
    fn test_extrude_vertex() {
        let mut mesh: HalfEdgeMesh = primitives::cube(1.0).unwrap();
        let selection = Selection::new(SelectionType::Vertex);
        selection.select(&mut mesh, Element::Vertex(VertexId::new(6)), true);

        let mut tool = ExtrudeTool::default();
        tool.begin(&mut mesh, &selection).unwrap();
        tool.update(&mut mesh, 3f64.sqrt()).unwrap();
        tool.confirm(&mut mesh).unwrap();

        assert_eq!(mesh.num_vertices(), 9);
        assert_eq!(mesh.num_edges(), 13);
        let tip = tool.created_vertices()[0];
        assert_relative_eq!(mesh.position(tip).x, 1.5, epsilon = 1e-9);
        assert_eq!(selection.selected_vertices(&mesh), vec![tip]);
    }
}
