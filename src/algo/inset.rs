//! Face inset.
//!
//! Insetting shrinks a face into a smaller copy of itself and fills the gap
//! with a ring of quads. In [`InsetMode::Region`] connected faces share one
//! border and only that border is inset.
//!
//! Overlaps caused by large amounts are not detected; the result can then
//! intersect itself.
//!
//! # Example
//!
//! ```
//! use chisel::algo::inset::{inset_faces, InsetOptions};
//! use chisel::mesh::{primitives, FaceId, HalfEdgeMesh};
//!
//! let mut mesh: HalfEdgeMesh = primitives::quad(2.0).unwrap();
//! let result = inset_faces(&mut mesh, &[FaceId::new(0)], &InsetOptions::new(0.2)).unwrap();
//!
//! assert_eq!(result.inner_faces.len(), 1);
//! assert_eq!(mesh.num_faces(), 5);
//! ```

use std::collections::{HashMap, HashSet};

use nalgebra::{Point3, Vector3};
use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::geometry::{normalize_or, EPSILON, WORLD_UP};
use crate::mesh::{FaceId, HalfEdgeMesh, MeshIndex, VertexId};

/// Whether faces inset on their own or as connected regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InsetMode {
    /// Every face gets its own ring of quads.
    #[default]
    Individual,
    /// Connected faces share one ring along their common border.
    Region,
}

/// Options for [`inset_faces`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InsetOptions {
    /// Inset distance; must be positive.
    pub amount: f64,

    /// Distance to push the inset faces along their normal.
    pub depth: f64,

    /// Individual or region inset.
    pub mode: InsetMode,

    /// Keep the new border exactly `amount` away from every original edge.
    ///
    /// When off, individual insets move each corner straight toward the
    /// face centroid.
    pub even_thickness: bool,
}

impl Default for InsetOptions {
    fn default() -> Self {
        Self {
            amount: 0.1,
            depth: 0.0,
            mode: InsetMode::Individual,
            even_thickness: true,
        }
    }
}

impl InsetOptions {
    /// Even-thickness individual inset by `amount`.
    pub fn new(amount: f64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    /// Set the depth.
    pub fn with_depth(mut self, depth: f64) -> Self {
        self.depth = depth;
        self
    }

    /// Set the mode.
    pub fn with_mode(mut self, mode: InsetMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set even thickness.
    pub fn with_even_thickness(mut self, even: bool) -> Self {
        self.even_thickness = even;
        self
    }
}

/// Elements created by an inset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsetResult<I: MeshIndex = u32> {
    /// The shrunken faces.
    pub inner_faces: Vec<FaceId<I>>,
    /// The quads joining old and new borders.
    pub bridge_faces: Vec<FaceId<I>>,
    /// Vertices of the new borders.
    pub created_vertices: Vec<VertexId<I>>,
}

impl<I: MeshIndex> Default for InsetResult<I> {
    fn default() -> Self {
        Self {
            inner_faces: Vec::new(),
            bridge_faces: Vec::new(),
            created_vertices: Vec::new(),
        }
    }
}

impl<I: MeshIndex> InsetResult<I> {
    /// Every created face, inner faces first.
    pub fn created_faces(&self) -> Vec<FaceId<I>> {
        self.inner_faces.iter().chain(&self.bridge_faces).copied().collect()
    }
}

/// Inset `faces`.
///
/// The inner faces inherit the selection flag of the face they replace. On
/// failure the mesh is left unchanged.
pub fn inset_faces<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    faces: &[FaceId<I>],
    options: &InsetOptions,
) -> Result<InsetResult<I>> {
    if faces.is_empty() {
        warn!("no faces to inset");
        return Err(MeshError::EmptySelection);
    }
    if !(options.amount.is_finite() && options.amount > 0.0) {
        return Err(MeshError::invalid_param("amount", options.amount, "must be positive"));
    }
    if !options.depth.is_finite() {
        return Err(MeshError::invalid_param("depth", options.depth, "must be finite"));
    }
    for &f in faces {
        if !mesh.contains_face(f) {
            return Err(MeshError::FaceNotFound(f.index()));
        }
    }

    let snapshot = mesh.clone();
    let mut result = InsetResult::default();
    let outcome = match options.mode {
        InsetMode::Individual => faces
            .iter()
            .try_for_each(|&f| inset_single(mesh, f, options, &mut result)),
        InsetMode::Region => inset_region(mesh, faces, options, &mut result),
    };

    match outcome {
        Ok(()) => {
            mesh.update_normals();
            debug!(
                faces = faces.len(),
                created = result.inner_faces.len() + result.bridge_faces.len(),
                mode = ?options.mode,
                "inset"
            );
            Ok(result)
        }
        Err(e) => {
            warn!(error = %e, "inset failed, mesh restored");
            *mesh = snapshot;
            Err(e)
        }
    }
}

/// Corner offset keeping `amount` distance from both adjacent edges.
///
/// `prev` and `next` are the incoming and outgoing edge directions, `normal`
/// the facing direction. Falls back to a plain bisector step when the edges
/// fold back on each other.
fn corner_offset(prev: Vector3<f64>, next: Vector3<f64>, normal: &Vector3<f64>, amount: f64, even: bool) -> Vector3<f64> {
    let in_prev = normal.cross(&normalize_or(prev, Vector3::zeros()));
    let in_next = normal.cross(&normalize_or(next, Vector3::zeros()));
    let bisector = normalize_or(in_prev + in_next, in_next);
    let cos = bisector.dot(&in_prev);
    if even && cos > EPSILON {
        bisector * (amount / cos)
    } else {
        bisector * amount
    }
}

fn inset_single<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    f: FaceId<I>,
    options: &InsetOptions,
    result: &mut InsetResult<I>,
) -> Result<()> {
    let ring: Vec<VertexId<I>> = mesh.face_vertices(f).collect();
    let k = ring.len();
    if k < 3 {
        return Err(MeshError::DegenerateFace { vertices: k });
    }
    let pts: Vec<Point3<f64>> = ring.iter().map(|&v| *mesh.position(v)).collect();
    let normal = crate::geometry::newell_normal(&pts).unwrap_or(WORLD_UP);
    let center = crate::geometry::centroid(&pts);
    let (selected, marked) = (mesh[f].selected, mesh[f].marked);

    let mut inner = Vec::with_capacity(k);
    for i in 0..k {
        let p = pts[i];
        let offset = if options.even_thickness {
            corner_offset(p - pts[(i + k - 1) % k], pts[(i + 1) % k] - p, &normal, options.amount, true)
        } else {
            let to_center = center - p;
            normalize_or(to_center, Vector3::zeros()) * options.amount.min(to_center.norm())
        };
        let v = mesh.duplicate_vertex(ring[i], p + offset + normal * options.depth)?;
        inner.push(v);
        result.created_vertices.push(v);
    }

    mesh.remove_face(f);
    let inner_face = mesh.add_face(&inner)?;
    mesh[inner_face].selected = selected;
    mesh[inner_face].marked = marked;
    result.inner_faces.push(inner_face);

    for i in 0..k {
        let j = (i + 1) % k;
        let bridge = mesh.create_quad_face(ring[i], ring[j], inner[j], inner[i])?;
        result.bridge_faces.push(bridge);
    }
    Ok(())
}

fn inset_region<I: MeshIndex>(
    mesh: &mut HalfEdgeMesh<I>,
    faces: &[FaceId<I>],
    options: &InsetOptions,
    result: &mut InsetResult<I>,
) -> Result<()> {
    let region: HashSet<FaceId<I>> = faces.iter().copied().collect();

    // Border half-edges keyed by origin; a vertex where the region touches
    // itself would need two.
    let mut border: HashMap<VertexId<I>, VertexId<I>> = HashMap::new();
    let mut incoming: HashMap<VertexId<I>, VertexId<I>> = HashMap::new();
    for &f in faces {
        for he in mesh.face_halfedges(f) {
            if region.contains(&mesh.face_of(mesh.twin(he))) {
                continue;
            }
            let (a, b) = (mesh.origin(he), mesh.target(he));
            if border.insert(a, b).is_some() || incoming.insert(b, a).is_some() {
                warn!(vertex = a.index(), "region border touches itself");
                return Err(MeshError::NonManifold {
                    details: format!("inset region border passes twice through {a:?}"),
                });
            }
        }
    }

    let vertex_normal = |mesh: &HalfEdgeMesh<I>, v: VertexId<I>| {
        let sum: Vector3<f64> = mesh
            .vertex_faces(v)
            .filter(|f| region.contains(f))
            .map(|f| mesh.face_normal(f) * mesh.face_area(f))
            .sum();
        normalize_or(sum, WORLD_UP)
    };

    let mut order: Vec<VertexId<I>> = border.keys().copied().collect();
    order.sort();

    let mut targets: Vec<(VertexId<I>, Point3<f64>)> = Vec::with_capacity(order.len());
    for &v in &order {
        let (next, prev) = (border[&v], incoming[&v]);
        let p = *mesh.position(v);
        let n = vertex_normal(mesh, v);
        let offset = corner_offset(
            p - mesh.position(prev),
            mesh.position(next) - p,
            &n,
            options.amount,
            options.even_thickness,
        );
        targets.push((v, p + offset + n * options.depth));
    }

    let mut region_vertices: Vec<VertexId<I>> = faces.iter().flat_map(|&f| mesh.face_vertices(f).collect::<Vec<_>>()).collect();
    region_vertices.sort();
    region_vertices.dedup();
    let lifts: Vec<(VertexId<I>, Vector3<f64>)> = region_vertices
        .iter()
        .filter(|v| !border.contains_key(v))
        .map(|&v| (v, vertex_normal(mesh, v) * options.depth))
        .collect();

    let mut copies: HashMap<VertexId<I>, VertexId<I>> = HashMap::with_capacity(targets.len());
    for (v, target) in targets {
        let dup = mesh.duplicate_vertex(v, target)?;
        copies.insert(v, dup);
        result.created_vertices.push(dup);
    }
    for (v, lift) in lifts {
        let p = *mesh.position(v) + lift;
        mesh.set_position(v, p);
    }

    let polygons: Vec<(Vec<VertexId<I>>, bool, bool)> = faces
        .iter()
        .map(|&f| (mesh.face_vertices(f).collect(), mesh[f].selected, mesh[f].marked))
        .collect();
    for &f in faces {
        mesh.remove_face(f);
    }
    for (polygon, selected, marked) in polygons {
        let inner: Vec<VertexId<I>> = polygon.iter().map(|v| *copies.get(v).unwrap_or(v)).collect();
        let f = mesh.add_face(&inner)?;
        mesh[f].selected = selected;
        mesh[f].marked = marked;
        result.inner_faces.push(f);
    }

    for &a in &order {
        let b = border[&a];
        let bridge = mesh.create_quad_face(a, b, copies[&b], copies[&a])?;
        result.bridge_faces.push(bridge);
    }

    for &v in &order {
        mesh.remove_wire_edges_at(v);
    }
    for &v in &region_vertices {
        mesh.repair_outgoing(v);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::primitives;
    use approx::assert_relative_eq;

    fn has_corner(mesh: &HalfEdgeMesh, f: FaceId, x: f64, z: f64) -> bool {
        mesh.face_vertices(f).any(|v| {
            let p = mesh.position(v);
            (p.x - x).abs() < EPSILON && p.y.abs() < EPSILON && (p.z - z).abs() < EPSILON
        })
    }

    #[test]
    fn test_inset_quad_even_thickness() {
        let mut mesh: HalfEdgeMesh = primitives::quad(2.0).unwrap();
        let result = inset_faces(&mut mesh, &[FaceId::new(0)], &InsetOptions::new(0.2)).unwrap();

        assert_eq!(mesh.num_vertices(), 8);
        assert_eq!(mesh.num_edges(), 12);
        assert_eq!(mesh.num_faces(), 5);
        assert_eq!(result.bridge_faces.len(), 4);
        assert_eq!(result.created_vertices.len(), 4);

        let inner = result.inner_faces[0];
        for (x, z) in [(-0.8, -0.8), (0.8, -0.8), (0.8, 0.8), (-0.8, 0.8)] {
            assert!(has_corner(&mesh, inner, x, z), "missing corner ({x}, {z})");
        }
        assert!(mesh.validate().is_ok());
        assert!(mesh.is_manifold());
        assert_relative_eq!(mesh.surface_area(), 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inset_toward_centroid() {
        let mut mesh: HalfEdgeMesh = primitives::quad(2.0).unwrap();
        let options = InsetOptions::new(2f64.sqrt() * 0.5).with_even_thickness(false);
        let result = inset_faces(&mut mesh, &[FaceId::new(0)], &options).unwrap();
        let inner = result.inner_faces[0];
        assert!(has_corner(&mesh, inner, -0.5, -0.5));
        assert!(has_corner(&mesh, inner, 0.5, 0.5));

        // Never past the centroid.
        let mut mesh: HalfEdgeMesh = primitives::quad(2.0).unwrap();
        let options = InsetOptions::new(10.0).with_even_thickness(false);
        let result = inset_faces(&mut mesh, &[FaceId::new(0)], &options).unwrap();
        for v in mesh.face_vertices(result.inner_faces[0]) {
            assert_relative_eq!(mesh.position(v).coords.norm(), 0.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_inset_with_depth() {
        let mut mesh: HalfEdgeMesh = primitives::cube(2.0).unwrap();
        let options = InsetOptions::new(0.25).with_depth(-0.5);
        let result = inset_faces(&mut mesh, &[FaceId::new(1)], &options).unwrap();
        for v in mesh.face_vertices(result.inner_faces[0]) {
            assert_relative_eq!(mesh.position(v).y, 0.5, epsilon = EPSILON);
        }
        assert!(mesh.is_closed());
        assert_eq!(mesh.euler_characteristic(), 2);
    }

    #[test]
    fn test_individual_inset_of_adjacent_faces() {
        let mut mesh: HalfEdgeMesh = primitives::grid(2, 1, 2.0).unwrap();
        let faces: Vec<FaceId> = mesh.face_ids().collect();
        inset_faces(&mut mesh, &faces, &InsetOptions::new(0.1)).unwrap();
        assert_eq!(mesh.num_faces(), 10);
        assert_eq!(mesh.num_vertices(), 6 + 8);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_region_inset() {
        let mut mesh: HalfEdgeMesh = primitives::grid(2, 1, 2.0).unwrap();
        let faces: Vec<FaceId> = mesh.face_ids().collect();
        let options = InsetOptions::new(0.1).with_mode(InsetMode::Region);
        let result = inset_faces(&mut mesh, &faces, &options).unwrap();

        assert_eq!(result.created_vertices.len(), 6);
        assert_eq!(result.inner_faces.len(), 2);
        assert_eq!(result.bridge_faces.len(), 6);
        assert_eq!(mesh.num_faces(), 8);
        assert_eq!(mesh.euler_characteristic(), 1);
        assert!(mesh.validate().is_ok());

        // Inner border keeps 0.1 from the outer one.
        let bb = mesh.bounding_box().unwrap();
        let inner_pts: Vec<Point3<f64>> = result.created_vertices.iter().map(|&v| *mesh.position(v)).collect();
        for p in inner_pts {
            assert!(p.x <= bb.max.x - 0.1 + EPSILON && p.x >= bb.min.x + 0.1 - EPSILON);
            assert!(p.z <= bb.max.z - 0.1 + EPSILON && p.z >= bb.min.z + 0.1 - EPSILON);
        }
    }

    #[test]
    fn test_rejections_leave_mesh_unchanged() {
        let mut mesh: HalfEdgeMesh = primitives::quad(2.0).unwrap();
        let before = mesh.clone();
        assert!(matches!(
            inset_faces(&mut mesh, &[], &InsetOptions::default()),
            Err(MeshError::EmptySelection)
        ));
        assert!(inset_faces(&mut mesh, &[FaceId::new(0)], &InsetOptions::new(0.0)).is_err());
        assert!(inset_faces(&mut mesh, &[FaceId::new(7)], &InsetOptions::new(0.1)).is_err());
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_inset_on_narrow_index_mesh() {
        let mut mesh: HalfEdgeMesh<u16> = primitives::quad(2.0).unwrap();
        let result = inset_faces(&mut mesh, &[FaceId::new(0)], &InsetOptions::new(0.2)).unwrap();
        assert_eq!(result.created_faces().len(), 5);
        assert_eq!(mesh.num_faces(), 5);
        assert!(mesh.validate().is_ok());
        assert_eq!(InsetResult::<u16>::default().created_faces(), Vec::new());
    }
}
