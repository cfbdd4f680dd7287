//! Edge and corner adjacency over an indexed polygon list.

use std::collections::HashMap;

/// An undirected edge and the faces on either side.
#[derive(Debug, Clone, Copy)]
pub(super) struct EdgeRecord {
    /// Endpoints, lower index first.
    pub ends: [usize; 2],
    /// First face using the edge.
    pub left: usize,
    /// Second face, absent on the boundary.
    pub right: Option<usize>,
}

impl EdgeRecord {
    pub fn is_boundary(&self) -> bool {
        self.right.is_none()
    }

    pub fn other(&self, v: usize) -> usize {
        if self.ends[0] == v {
            self.ends[1]
        } else {
            self.ends[0]
        }
    }
}

/// Adjacency of a polygon list. Edges are numbered in order of first use.
#[derive(Debug, Clone)]
pub(super) struct FaceTable {
    pub edges: Vec<EdgeRecord>,
    edge_index: HashMap<(usize, usize), usize>,
    /// Directed edge `(a, b)` to the face and corner of `a` that use it.
    corners: HashMap<(usize, usize), (usize, usize)>,
    pub vertex_faces: Vec<Vec<usize>>,
    pub vertex_edges: Vec<Vec<usize>>,
}

impl FaceTable {
    pub fn new(num_vertices: usize, faces: &[Vec<usize>]) -> Self {
        let mut table = Self {
            edges: Vec::new(),
            edge_index: HashMap::new(),
            corners: HashMap::new(),
            vertex_faces: vec![Vec::new(); num_vertices],
            vertex_edges: vec![Vec::new(); num_vertices],
        };

        for (fi, face) in faces.iter().enumerate() {
            let k = face.len();
            for i in 0..k {
                let (a, b) = (face[i], face[(i + 1) % k]);
                table.vertex_faces[a].push(fi);
                table.corners.insert((a, b), (fi, i));

                let key = (a.min(b), a.max(b));
                match table.edge_index.get(&key) {
                    Some(&e) => table.edges[e].right = Some(fi),
                    None => {
                        let e = table.edges.len();
                        table.edge_index.insert(key, e);
                        table.edges.push(EdgeRecord {
                            ends: [key.0, key.1],
                            left: fi,
                            right: None,
                        });
                        table.vertex_edges[a].push(e);
                        table.vertex_edges[b].push(e);
                    }
                }
            }
        }
        table
    }

    /// Index of the edge between `a` and `b`.
    pub fn edge(&self, a: usize, b: usize) -> Option<usize> {
        self.edge_index.get(&(a.min(b), a.max(b))).copied()
    }

    /// Face and corner whose outgoing side is `a -> b`.
    pub fn corner(&self, a: usize, b: usize) -> Option<(usize, usize)> {
        self.corners.get(&(a, b)).copied()
    }

    /// Whether `v` lies on a boundary edge.
    pub fn is_boundary_vertex(&self, v: usize) -> bool {
        self.vertex_edges[v].iter().any(|&e| self.edges[e].is_boundary())
    }

    /// Neighbors of `v` across boundary edges.
    pub fn boundary_neighbors(&self, v: usize) -> Vec<usize> {
        self.vertex_edges[v]
            .iter()
            .filter(|&&e| self.edges[e].is_boundary())
            .map(|&e| self.edges[e].other(v))
            .collect()
    }

    /// Corners of an interior vertex in rotation order, or `None` on the
    /// boundary.
    ///
    /// Consecutive corners share the edge leaving `v` from the first one, so
    /// the order runs clockwise about counter-clockwise faces.
    pub fn rotation(&self, v: usize, faces: &[Vec<usize>]) -> Option<Vec<(usize, usize)>> {
        let &first_face = self.vertex_faces[v].first()?;
        let start = (first_face, faces[first_face].iter().position(|&x| x == v)?);
        let limit = self.vertex_faces[v].len();

        let mut order = vec![start];
        let (mut f, mut i) = start;
        loop {
            let face = &faces[f];
            let u = face[(i + 1) % face.len()];
            let (g, j) = self.corner(u, v)?;
            let next = (g, (j + 1) % faces[g].len());
            if next == start {
                return Some(order);
            }
            if order.len() >= limit {
                return None;
            }
            order.push(next);
            f = next.0;
            i = next.1;
        }
    }

    /// Neighbors of an interior vertex in rotation order.
    pub fn ring(&self, v: usize, faces: &[Vec<usize>]) -> Option<Vec<usize>> {
        let order = self.rotation(v, faces)?;
        Some(
            order
                .into_iter()
                .map(|(f, i)| faces[f][(i + 1) % faces[f].len()])
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fan() -> Vec<Vec<usize>> {
        // Vertex 0 surrounded by 1..=4, counter-clockwise.
        vec![vec![0, 1, 2], vec![0, 2, 3], vec![0, 3, 4], vec![0, 4, 1]]
    }

    #[test]
    fn test_edges_and_boundary() {
        let faces = fan();
        let table = FaceTable::new(5, &faces);
        assert_eq!(table.edges.len(), 8);
        assert!(!table.is_boundary_vertex(0));
        assert!(table.is_boundary_vertex(1));
        assert_eq!(table.boundary_neighbors(1).len(), 2);
        let e = table.edge(2, 0).unwrap();
        assert!(!table.edges[e].is_boundary());
        assert_eq!(table.corner(0, 2), Some((1, 0)));
    }

    #[test]
    fn test_ring_order() {
        let faces = fan();
        let table = FaceTable::new(5, &faces);
        assert_eq!(table.ring(0, &faces), Some(vec![1, 4, 3, 2]));
        assert_eq!(table.ring(1, &faces), None);
    }
}
