//! Procedural meshes.
//!
//! Small generators for the shapes the tests, benchmarks and CLI sculpt on.

use std::f32::consts::PI;

use super::asset::MeshAsset;

/// A flat `n × n` quad grid in the XZ plane with integer-spaced vertices scaled by
/// `spacing`, centred on the origin. `(n + 1)²` vertices, `2n²` triangles.
///
/// Vertex `(i, j)` has index `j * (n + 1) + i`.
pub fn grid(id: &str, n: usize, spacing: f32) -> MeshAsset {
    let side = n + 1;
    let half = n as f32 * spacing * 0.5;
    let mut positions = Vec::with_capacity(side * side * 3);
    let mut indices = Vec::with_capacity(n * n * 6);

    for j in 0..side {
        for i in 0..side {
            positions.extend_from_slice(&[i as f32 * spacing - half, 0.0, j as f32 * spacing - half]);
        }
    }

    for j in 0..n {
        for i in 0..n {
            let v00 = (j * side + i) as u32;
            let v10 = v00 + 1;
            let v01 = v00 + side as u32;
            let v11 = v01 + 1;

            // Counter-clockwise seen from +y
            indices.extend_from_slice(&[v00, v01, v10]);
            indices.extend_from_slice(&[v10, v01, v11]);
        }
    }

    MeshAsset::from_valid_buffers(id.into(), positions, indices)
}

/// A UV sphere with `rings` latitude bands and `segments` longitude slices.
///
/// The poles are single vertices; `rings` and `segments` are clamped to at least 2 and 3.
pub fn uv_sphere(id: &str, rings: usize, segments: usize, radius: f32) -> MeshAsset {
    let rings = rings.max(2);
    let segments = segments.max(3);
    let mut positions = Vec::with_capacity(((rings - 1) * segments + 2) * 3);
    let mut indices = Vec::with_capacity(rings * segments * 6);

    positions.extend_from_slice(&[0.0, radius, 0.0]);
    for r in 1..rings {
        let theta = PI * r as f32 / rings as f32;
        let (sin_t, cos_t) = theta.sin_cos();
        for s in 0..segments {
            let phi = 2.0 * PI * s as f32 / segments as f32;
            let (sin_p, cos_p) = phi.sin_cos();
            positions.extend_from_slice(&[radius * sin_t * cos_p, radius * cos_t, radius * sin_t * sin_p]);
        }
    }
    positions.extend_from_slice(&[0.0, -radius, 0.0]);

    let ring_start = |r: usize| 1 + (r - 1) * segments;
    let south = ((rings - 1) * segments + 1) as u32;

    for s in 0..segments {
        let next = (s + 1) % segments;
        // North cap
        indices.extend_from_slice(&[0, (ring_start(1) + next) as u32, (ring_start(1) + s) as u32]);
        // South cap
        let last = ring_start(rings - 1);
        indices.extend_from_slice(&[south, (last + s) as u32, (last + next) as u32]);
    }

    for r in 1..rings - 1 {
        let a = ring_start(r);
        let b = ring_start(r + 1);
        for s in 0..segments {
            let next = (s + 1) % segments;
            let (a0, a1) = ((a + s) as u32, (a + next) as u32);
            let (b0, b1) = ((b + s) as u32, (b + next) as u32);
            indices.extend_from_slice(&[a0, a1, b0]);
            indices.extend_from_slice(&[a1, b1, b0]);
        }
    }

    MeshAsset::from_valid_buffers(id.into(), positions, indices)
}
