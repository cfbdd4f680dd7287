//! Built-in primitive meshes.
//!
//! All primitives are centred on the origin with outward-facing,
//! counter-clockwise faces.

use nalgebra::Point3;

use super::builder::build_from_polygons;
use super::halfedge::HalfEdgeMesh;
use super::index::MeshIndex;
use crate::error::{MeshError, Result};

/// Axis-aligned cube with edge length `size`: 8 vertices, 12 edges, 6 quads.
///
/// Vertex order is `(-,-,-), (+,-,-), (+,+,-), (-,+,-), (-,-,+), (+,-,+),
/// (+,+,+), (-,+,+)`; faces are bottom, top, front (+z), back, left, right.
pub fn cube<I: MeshIndex>(size: f64) -> Result<HalfEdgeMesh<I>> {
    check_size(size)?;
    let h = size * 0.5;
    let positions = [
        Point3::new(-h, -h, -h),
        Point3::new(h, -h, -h),
        Point3::new(h, h, -h),
        Point3::new(-h, h, -h),
        Point3::new(-h, -h, h),
        Point3::new(h, -h, h),
        Point3::new(h, h, h),
        Point3::new(-h, h, h),
    ];
    let faces = [
        [0, 1, 5, 4],
        [3, 7, 6, 2],
        [4, 5, 6, 7],
        [0, 3, 2, 1],
        [0, 4, 7, 3],
        [1, 2, 6, 5],
    ];
    build_from_polygons(&positions, &faces)
}

/// Regular tetrahedron inscribed in the cube of edge length `size`.
pub fn tetrahedron<I: MeshIndex>(size: f64) -> Result<HalfEdgeMesh<I>> {
    check_size(size)?;
    let h = size * 0.5;
    let positions = [
        Point3::new(h, h, h),
        Point3::new(h, -h, -h),
        Point3::new(-h, h, -h),
        Point3::new(-h, -h, h),
    ];
    let faces = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]];
    build_from_polygons(&positions, &faces)
}

/// The single triangle `(0,0,0), (1,0,0), (0,1,0)` facing +z.
pub fn triangle<I: MeshIndex>() -> Result<HalfEdgeMesh<I>> {
    let positions = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
    ];
    build_from_polygons(&positions, &[[0, 1, 2]])
}

/// A single quad in the XZ plane with corners `(±size/2, 0, ±size/2)`.
///
/// Corners run `(-,-), (+,-), (+,+), (-,+)` in (x, z).
pub fn quad<I: MeshIndex>(size: f64) -> Result<HalfEdgeMesh<I>> {
    check_size(size)?;
    let h = size * 0.5;
    let positions = [
        Point3::new(-h, 0.0, -h),
        Point3::new(h, 0.0, -h),
        Point3::new(h, 0.0, h),
        Point3::new(-h, 0.0, h),
    ];
    build_from_polygons(&positions, &[[0, 1, 2, 3]])
}

/// A grid of `nx * nz` quads in the XZ plane facing +y, spanning `size`.
pub fn grid<I: MeshIndex>(nx: usize, nz: usize, size: f64) -> Result<HalfEdgeMesh<I>> {
    check_size(size)?;
    if nx == 0 || nz == 0 {
        return Err(MeshError::invalid_param("grid resolution", nx.min(nz), "must be at least 1"));
    }
    let h = size * 0.5;
    let idx = |i: usize, j: usize| i * (nx + 1) + j;

    let mut positions = Vec::with_capacity((nx + 1) * (nz + 1));
    for i in 0..=nz {
        for j in 0..=nx {
            positions.push(Point3::new(
                -h + size * j as f64 / nx as f64,
                0.0,
                -h + size * i as f64 / nz as f64,
            ));
        }
    }

    let mut faces = Vec::with_capacity(nx * nz);
    for i in 0..nz {
        for j in 0..nx {
            faces.push([idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1)]);
        }
    }
    build_from_polygons(&positions, &faces)
}

fn check_size(size: f64) -> Result<()> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(MeshError::invalid_param("size", size, "must be positive"))
    }
}
