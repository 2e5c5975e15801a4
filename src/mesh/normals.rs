//! Per-vertex normals.
//!
//! Normals are the normalized sum of the (area-weighted) face normals of the
//! incident triangles. After a stroke only the vertices around the moved region
//! change, so [`recompute_normals_local`] recomputes just those, summing faces in
//! the same order as [`compute_vertex_normals`] so both give identical results.

use nalgebra::Vector3;

use super::adjacency::Adjacency;
use super::builder::read_point;
use super::index::{TriangleId, VertexId};

/// Compute normals for every vertex. Unreferenced or degenerate vertices get a zero normal.
pub fn compute_vertex_normals(positions: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut acc = vec![Vector3::<f32>::zeros(); vertex_count];

    for tri in indices.chunks_exact(3) {
        let n = face_normal(positions, tri);
        for &v in tri {
            acc[v as usize] += n;
        }
    }

    let mut normals = Vec::with_capacity(vertex_count * 3);
    for n in &acc {
        let n = normalize_or_zero(n);
        normals.extend_from_slice(&[n.x, n.y, n.z]);
    }
    normals
}

/// Recompute the normals of every vertex that shares a triangle with a vertex in `moved`.
///
/// `normals` must already hold valid normals for the rest of the mesh.
pub fn recompute_normals_local(
    positions: &[f32],
    indices: &[u32],
    normals: &mut [f32],
    adjacency: &Adjacency,
    moved: &[VertexId],
) {
    let mut affected: Vec<VertexId> = Vec::new();
    for &v in moved {
        for &t in adjacency.triangles(v) {
            affected.extend(triangle_vertices(indices, t));
        }
        affected.push(v);
    }
    affected.sort_unstable();
    affected.dedup();

    for v in affected {
        let mut n = Vector3::zeros();
        for &t in adjacency.triangles(v) {
            let o = t.index() * 3;
            let tri = &indices[o..o + 3];
            let face = face_normal(positions, tri);
            // A corner repeated in a degenerate triangle is counted once per occurrence.
            let corners = tri.iter().filter(|&&c| c == v.raw()).count();
            for _ in 0..corners {
                n += face;
            }
        }
        let n = normalize_or_zero(&n);
        let o = v.index() * 3;
        normals[o..o + 3].copy_from_slice(&[n.x, n.y, n.z]);
    }
}

/// Area-weighted normal of one triangle (twice its area in length).
#[inline]
fn face_normal(positions: &[f32], tri: &[u32]) -> Vector3<f32> {
    let p0 = read_point(positions, tri[0] as usize);
    let p1 = read_point(positions, tri[1] as usize);
    let p2 = read_point(positions, tri[2] as usize);
    (p1 - p0).cross(&(p2 - p0))
}

#[inline]
fn triangle_vertices(indices: &[u32], t: TriangleId) -> [VertexId; 3] {
    let o = t.index() * 3;
    [
        VertexId::from(indices[o]),
        VertexId::from(indices[o + 1]),
        VertexId::from(indices[o + 2]),
    ]
}

#[inline]
fn normalize_or_zero(n: &Vector3<f32>) -> Vector3<f32> {
    let len = n.norm();
    if len > 1e-20 && len.is_finite() {
        n / len
    } else {
        Vector3::zeros()
    }
}
