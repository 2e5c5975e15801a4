//! Mesh buffer validation and construction helpers.
//!
//! Meshes arrive from the model loader as flat buffers: three `f32` per vertex and
//! three `u32` per triangle. Everything downstream indexes those buffers directly, so
//! they are validated once, on the way in.

use nalgebra::Point3;

use super::index::MeshId;
use crate::error::{Result, SculptError};

/// Check that `positions` and `indices` describe a well-formed triangle mesh.
///
/// # Errors
/// - [`SculptError::MalformedPositions`] if `positions` is not whole `xyz` triples
/// - [`SculptError::MalformedIndices`] if `indices` is not whole triangles
/// - [`SculptError::InvalidVertexIndex`] for the first out-of-range index
///
/// # Example
/// ```
/// use chisel::mesh::{validate_buffers, MeshId};
///
/// let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
/// assert!(validate_buffers(&MeshId::new("tri"), &positions, &[0, 1, 2]).is_ok());
/// assert!(validate_buffers(&MeshId::new("tri"), &positions, &[0, 1, 3]).is_err());
/// ```
pub fn validate_buffers(mesh: &MeshId, positions: &[f32], indices: &[u32]) -> Result<()> {
    if positions.len() % 3 != 0 {
        return Err(SculptError::MalformedPositions {
            mesh: mesh.clone(),
            len: positions.len(),
        });
    }
    if indices.len() % 3 != 0 {
        return Err(SculptError::MalformedIndices {
            mesh: mesh.clone(),
            len: indices.len(),
        });
    }

    let vertex_count = positions.len() / 3;
    for (ti, tri) in indices.chunks_exact(3).enumerate() {
        for &vi in tri {
            if vi as usize >= vertex_count {
                return Err(SculptError::InvalidVertexIndex {
                    mesh: mesh.clone(),
                    triangle: ti,
                    vertex: vi,
                    vertex_count,
                });
            }
        }
    }

    Ok(())
}

/// Flatten points into an `xyz` position buffer.
pub fn flatten_points(points: &[Point3<f32>]) -> Vec<f32> {
    let mut out = Vec::with_capacity(points.len() * 3);
    for p in points {
        out.extend_from_slice(&[p.x, p.y, p.z]);
    }
    out
}

/// Flatten triangles into an index buffer.
pub fn flatten_triangles(triangles: &[[u32; 3]]) -> Vec<u32> {
    triangles.iter().flatten().copied().collect()
}

/// Read vertex `i` out of a flat position buffer.
#[inline]
pub fn read_point(positions: &[f32], i: usize) -> Point3<f32> {
    let o = i * 3;
    Point3::new(positions[o], positions[o + 1], positions[o + 2])
}

/// Write vertex `i` into a flat position buffer.
#[inline]
pub fn write_point(positions: &mut [f32], i: usize, p: &Point3<f32>) {
    let o = i * 3;
    positions[o] = p.x;
    positions[o + 1] = p.y;
    positions[o + 2] = p.z;
}
