//! End-to-end editing scenarios on small primitives.

use approx::assert_relative_eq;
use chisel::algo::extrude::{ExtrudeOptions, ExtrudeTool};
use chisel::algo::inset::{inset_faces, InsetOptions};
use chisel::algo::loop_cut::{create_loop_cut, detect_loop, LoopCutOptions};
use chisel::algo::subdivide::catmull_clark_subdivide;
use chisel::geometry::EPSILON;
use chisel::mesh::to_face_vertex;
use chisel::pick::{PickOptions, Picker};
use chisel::prelude::*;
use nalgebra::{Point3, Vector3};

fn unit_cube() -> HalfEdgeMesh {
    primitives::cube(1.0).unwrap()
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn extrude_cube_top_face() {
    let mut mesh = unit_cube();
    let top = FaceId::new(1);
    let selection = Selection::new(SelectionType::Face);
    selection.select(&mut mesh, Element::Face(top), true);

    let mut tool = ExtrudeTool::new(ExtrudeOptions::default());
    tool.begin(&mut mesh, &selection).unwrap();
    tool.update(&mut mesh, 1.0).unwrap();
    tool.confirm(&mut mesh).unwrap();

    assert_eq!(mesh.num_vertices(), 12);
    assert_eq!(mesh.num_edges(), 20);
    assert_eq!(mesh.num_faces(), 10);
    assert!(mesh.is_manifold());
    assert!(mesh.is_closed());
    assert_eq!(mesh.euler_characteristic(), 2);

    // The cap is the selection after confirm.
    let caps = selection.selected_faces(&mesh);
    assert_eq!(caps.len(), 1);
    for v in mesh.face_vertices(caps[0]) {
        assert_relative_eq!(mesh.position(v).y, 1.5, epsilon = EPSILON);
    }
}

#[test]
fn inset_single_quad() {
    let mut mesh: HalfEdgeMesh = primitives::quad(2.0).unwrap();
    let result = inset_faces(&mut mesh, &[FaceId::new(0)], &InsetOptions::new(0.2)).unwrap();

    assert_eq!(mesh.num_vertices(), 8);
    assert_eq!(mesh.num_edges(), 12);
    assert_eq!(mesh.num_faces(), 5);
    assert_eq!(result.inner_faces.len(), 1);
    assert_eq!(result.bridge_faces.len(), 4);

    let mut corners: Vec<(f64, f64)> = mesh
        .face_vertices(result.inner_faces[0])
        .map(|v| (mesh.position(v).x, mesh.position(v).z))
        .collect();
    corners.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let expected = [(-0.8, -0.8), (-0.8, 0.8), (0.8, -0.8), (0.8, 0.8)];
    for (got, want) in corners.iter().zip(expected) {
        assert_relative_eq!(got.0, want.0, epsilon = EPSILON);
        assert_relative_eq!(got.1, want.1, epsilon = EPSILON);
    }
    assert_eq!(mesh.euler_characteristic(), 1);
}

#[test]
fn loop_cut_cube_equator() {
    let mut mesh = unit_cube();
    // 0 -> 3 runs from the bottom corner to the top corner above it.
    let seed = mesh.find_halfedge(VertexId::new(0), VertexId::new(3)).unwrap();

    let edge_loop = detect_loop(&mesh, seed).unwrap();
    assert_eq!(edge_loop.len(), 4);
    assert!(edge_loop.closed);

    let cuts = create_loop_cut(&mut mesh, seed, &LoopCutOptions::default()).unwrap();
    assert_eq!(cuts.len(), 1);
    assert_eq!(mesh.num_vertices(), 12);
    assert_eq!(mesh.num_edges(), 20);
    assert_eq!(mesh.num_faces(), 10);
    for &v in &cuts[0].vertices {
        assert_relative_eq!(mesh.position(v).y, 0.0, epsilon = EPSILON);
    }
    assert!(mesh.is_manifold());
    assert!(mesh.is_closed());
}

#[test]
fn catmull_clark_cube_one_level() {
    let cube = unit_cube();
    let smooth = catmull_clark_subdivide(&cube, 1).unwrap();

    assert_eq!(smooth.num_vertices(), 26);
    assert_eq!(smooth.num_edges(), 48);
    assert_eq!(smooth.num_faces(), 24);
    assert!(smooth.is_quad_mesh());
    assert!(smooth.is_manifold());
    assert!(smooth.is_closed());
    assert_eq!(smooth.euler_characteristic(), 2);

    // The input is untouched and the corners are pulled in toward the centre.
    assert_eq!(cube.num_faces(), 6);
    for v in smooth.vertex_ids() {
        assert!(smooth.position(v).coords.norm() < 0.6);
    }
}

#[test]
fn raycast_triangle() {
    let mesh: HalfEdgeMesh = primitives::triangle().unwrap();
    let picker = Picker::new(PickOptions::default());
    let down = Vector3::new(0.0, 0.0, -1.0);

    let hit = picker.raycast(&mesh, Point3::new(0.25, 0.25, 1.0), down);
    assert!(hit.hit);
    assert_relative_eq!(hit.point.x, 0.25, epsilon = EPSILON);
    assert_relative_eq!(hit.point.y, 0.25, epsilon = EPSILON);
    assert_relative_eq!(hit.point.z, 0.0, epsilon = EPSILON);
    assert_relative_eq!(hit.distance, 1.0, epsilon = EPSILON);
    assert_eq!(hit.face, Some(FaceId::new(0)));

    let miss = picker.raycast(&mesh, Point3::new(2.0, 2.0, 1.0), down);
    assert!(!miss.hit);
    assert_eq!(miss.face, None);
}

#[test]
fn convert_face_selection_to_vertices() {
    let mut mesh = unit_cube();
    let mut selection = Selection::new(SelectionType::Face);
    let top = FaceId::new(1);
    selection.select(&mut mesh, Element::Face(top), true);

    selection.convert(&mut mesh, SelectionType::Vertex);

    let selected = selection.selected_vertices(&mesh);
    assert_eq!(selected.len(), 4);
    let mut corners: Vec<VertexId> = mesh.face_vertices(top).collect();
    corners.sort();
    assert_eq!(selected, corners);
    assert_eq!(mesh.vertex_ids().filter(|v| !selected.contains(v)).count(), 4);
}

// =============================================================================
// Boundary behaviours
// =============================================================================

#[test]
fn isolated_triangle_is_open_disk() {
    let mesh: HalfEdgeMesh = primitives::triangle().unwrap();
    assert_eq!(mesh.num_vertices(), 3);
    assert_eq!(mesh.num_edges(), 3);
    assert_eq!(mesh.num_faces(), 1);
    assert_eq!(mesh.euler_characteristic(), 1);
    assert!(mesh.is_manifold());
    assert!(!mesh.is_closed());
    assert!(mesh.edge_ids().all(|he| mesh.is_boundary_edge(he)));
}

#[test]
fn tetrahedron_is_closed_sphere() {
    let mesh: HalfEdgeMesh = primitives::tetrahedron(1.0).unwrap();
    assert_eq!(mesh.num_vertices(), 4);
    assert_eq!(mesh.num_halfedges(), 12);
    assert_eq!(mesh.num_edges(), 6);
    assert_eq!(mesh.num_faces(), 4);
    assert_eq!(mesh.euler_characteristic(), 2);
    assert!(mesh.is_closed());
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn select_all_then_invert_selects_nothing() {
    for kind in [SelectionType::Vertex, SelectionType::Edge, SelectionType::Face] {
        let mut mesh = unit_cube();
        let selection = Selection::new(kind);
        selection.select_all(&mut mesh);
        selection.invert(&mut mesh);
        assert_eq!(selection.selected_count(&mesh), 0);
        assert!(selection.is_empty(&mesh));
    }
}

#[test]
fn invert_twice_is_identity() {
    let mut mesh = unit_cube();
    let selection = Selection::new(SelectionType::Edge);
    let he = mesh.find_halfedge(VertexId::new(0), VertexId::new(1)).unwrap();
    selection.select(&mut mesh, Element::Edge(he), true);
    let before = mesh.clone();

    selection.invert(&mut mesh);
    assert_ne!(mesh, before);
    selection.invert(&mut mesh);
    assert_eq!(mesh, before);
}

#[test]
fn begin_then_cancel_restores_mesh_and_selection() {
    let mut mesh = unit_cube();
    let selection = Selection::new(SelectionType::Face);
    selection.select(&mut mesh, Element::Face(FaceId::new(2)), true);
    let before = mesh.clone();

    let mut tool = ExtrudeTool::new(ExtrudeOptions::default());
    tool.begin(&mut mesh, &selection).unwrap();
    tool.update(&mut mesh, 0.75).unwrap();
    tool.cancel(&mut mesh).unwrap();

    assert_eq!(mesh, before);
    assert_eq!(selection.selected_faces(&mesh), vec![FaceId::new(2)]);
    assert!(!tool.is_active());
}

#[test]
fn remove_then_readd_face_restores_polygons() {
    let mut mesh = unit_cube();
    let (_, mut before) = to_face_vertex(&mesh);
    let f = FaceId::new(3);
    let ring: Vec<VertexId> = mesh.face_vertices(f).collect();

    assert!(mesh.remove_face(f));
    assert!(!mesh.is_closed());
    let g = mesh.add_face(&ring).unwrap();
    assert_ne!(f, g);

    let (_, mut after) = to_face_vertex(&mesh);
    before.sort();
    after.sort();
    assert_eq!(before, after);
    assert!(mesh.is_closed());
    assert!(mesh.validate().is_ok());
}

#[test]
fn update_normals_is_idempotent() {
    let mut mesh = unit_cube();
    mesh.set_position(VertexId::new(6), Point3::new(0.8, 0.7, 0.6));
    mesh.update_normals();
    let once = mesh.clone();
    mesh.update_normals();

    for v in mesh.vertex_ids() {
        assert_relative_eq!(mesh[v].normal, once[v].normal, epsilon = 1e-12);
    }
    for f in mesh.face_ids() {
        assert_relative_eq!(mesh[f].normal, once[f].normal, epsilon = 1e-12);
    }
}
