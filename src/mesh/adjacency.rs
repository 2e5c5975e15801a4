//! Per-vertex adjacency for indexed triangle meshes.
//!
//! For every vertex: the set of vertices it shares an edge with, and the triangles
//! it is a corner of. Topology never changes while sculpting, so an [`Adjacency`]
//! built once stays valid for the mesh's lifetime.

use super::index::{TriangleId, VertexId};

/// Vertex neighbourhoods of a triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    /// Sorted, deduplicated neighbour lists.
    vertex_neighbors: Vec<Vec<VertexId>>,
    /// Incident triangles in ascending order.
    vertex_triangles: Vec<Vec<TriangleId>>,
}

impl Adjacency {
    /// Number of vertices covered.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertex_neighbors.len()
    }

    /// Vertices sharing an edge with `v`.
    #[inline]
    pub fn neighbors(&self, v: VertexId) -> &[VertexId] {
        &self.vertex_neighbors[v.index()]
    }

    /// Triangles having `v` as a corner.
    #[inline]
    pub fn triangles(&self, v: VertexId) -> &[TriangleId] {
        &self.vertex_triangles[v.index()]
    }

    /// Number of distinct neighbours of `v`.
    #[inline]
    pub fn valence(&self, v: VertexId) -> usize {
        self.vertex_neighbors[v.index()].len()
    }

    /// Vertices not referenced by any triangle.
    pub fn isolated_vertices(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertex_triangles
            .iter()
            .enumerate()
            .filter(|(_, tris)| tris.is_empty())
            .map(|(i, _)| VertexId::new(i))
    }
}

/// Build vertex neighbourhoods from a flat index buffer.
///
/// Triangles referencing a vertex `>= vertex_count` are skipped; a trailing partial
/// triangle is ignored.
///
/// # Example
/// ```
/// use chisel::mesh::{build_adjacency, VertexId};
///
/// // Two triangles sharing the edge 1-2
/// let adjacency = build_adjacency(&[0, 1, 2, 2, 1, 3], 4);
/// assert_eq!(adjacency.valence(VertexId::new(1)), 3);
/// assert_eq!(adjacency.triangles(VertexId::new(0)).len(), 1);
/// ```
pub fn build_adjacency(indices: &[u32], vertex_count: usize) -> Adjacency {
    let mut vertex_neighbors: Vec<Vec<VertexId>> = vec![Vec::new(); vertex_count];
    let mut vertex_triangles: Vec<Vec<TriangleId>> = vec![Vec::new(); vertex_count];

    for (ti, tri) in indices.chunks_exact(3).enumerate() {
        if tri.iter().any(|&v| v as usize >= vertex_count) {
            continue;
        }
        let tid = TriangleId::new(ti);
        for corner in 0..3 {
            let v = tri[corner] as usize;
            let a = VertexId::from(tri[(corner + 1) % 3]);
            let b = VertexId::from(tri[(corner + 2) % 3]);

            let tris = &mut vertex_triangles[v];
            if tris.last() != Some(&tid) {
                tris.push(tid);
            }
            let neighbors = &mut vertex_neighbors[v];
            if a.index() != v {
                neighbors.push(a);
            }
            if b.index() != v {
                neighbors.push(b);
            }
        }
    }

    for neighbors in &mut vertex_neighbors {
        neighbors.sort_unstable();
        neighbors.dedup();
    }

    Adjacency {
        vertex_neighbors,
        vertex_triangles,
    }
}
