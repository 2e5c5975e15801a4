//! Brush smoothing.
//!
//! One stroke sample smooths the vertices under the brush:
//!
//! 1. Select every vertex whose world position is within the brush radius of the hit
//!    point. This always scans all vertices; the spatial index is triangle based and
//!    is not consulted.
//! 2. Compute the mean of the selected world positions.
//! 3. Move each selected vertex a fraction `blend` of the way to that mean.
//! 4. Map the results back to mesh-local space with the inverse world transform and
//!    write them into the position buffer.
//! 5. Recompute vertex normals.
//!
//! Applying the same stroke twice smooths further; the operation has no fixed point
//! short of collapsing the region.
//!
//! Nothing is written unless every step succeeds: an empty selection, a degenerate
//! radius or a world transform that cannot be inverted leave the mesh untouched and
//! the call returns `false`.
//!
//! # Example
//!
//! ```
//! use chisel::algo::smooth::{smooth_region, SmoothOptions};
//! use chisel::mesh::primitives;
//! use nalgebra::Point3;
//!
//! let mut mesh = primitives::grid("patch", 8, 1.0);
//! let applied = smooth_region(&mut mesh, &Point3::origin(), 1.5, &SmoothOptions::default());
//! assert!(applied);
//! ```

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::mesh::{read_point, Adjacency, MeshAsset, VertexId};

/// Default fraction of the way each vertex moves toward the region mean.
pub const DEFAULT_BLEND: f32 = 0.35;

/// Options for brush smoothing.
#[derive(Debug, Clone)]
pub struct SmoothOptions {
    /// Blend factor in `[0, 1]` (default: 0.35).
    pub blend: f32,

    /// Whether to scan vertices in parallel (default: true).
    pub parallel: bool,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self {
            blend: DEFAULT_BLEND,
            parallel: true,
        }
    }
}

impl SmoothOptions {
    /// Set the blend factor, clamped to `[0, 1]`. NaN keeps the current value.
    pub fn with_blend(mut self, blend: f32) -> Self {
        if !blend.is_nan() {
            self.blend = blend.clamp(0.0, 1.0);
        }
        self
    }

    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// Smooth the region around a world-space point and recompute all normals.
///
/// Returns `true` if any vertex was moved.
pub fn smooth_region(mesh: &mut MeshAsset, center: &Point3<f32>, radius: f32, options: &SmoothOptions) -> bool {
    let Some(updates) = smoothed_positions(mesh, center, radius, options) else {
        return false;
    };
    mesh.write_positions(&updates);
    mesh.recompute_normals();
    true
}

/// Like [`smooth_region`], but only recomputes normals around the moved vertices.
///
/// `adjacency` must have been built from this mesh's index buffer. The resulting
/// normals are identical to a full recompute.
pub fn smooth_region_with_adjacency(
    mesh: &mut MeshAsset,
    center: &Point3<f32>,
    radius: f32,
    options: &SmoothOptions,
    adjacency: &Adjacency,
) -> bool {
    let Some(updates) = smoothed_positions(mesh, center, radius, options) else {
        return false;
    };
    mesh.write_positions(&updates);
    let moved: Vec<VertexId> = updates.iter().map(|(v, _)| *v).collect();
    mesh.recompute_normals_around(adjacency, &moved);
    true
}

/// New local positions for the selected vertices, or `None` if nothing should change.
fn smoothed_positions(
    mesh: &MeshAsset,
    center: &Point3<f32>,
    radius: f32,
    options: &SmoothOptions,
) -> Option<Vec<(VertexId, Point3<f32>)>> {
    if !(radius > 0.0) || !radius.is_finite() || !center.coords.iter().all(|v| v.is_finite()) {
        return None;
    }

    let selected = select_world_vertices(mesh, center, radius, options.parallel);
    if selected.is_empty() {
        trace!(mesh = %mesh.id(), "smoothing stroke selected no vertices");
        return None;
    }

    let Some(inverse) = mesh.transform().inverse() else {
        debug!(mesh = %mesh.id(), "world transform is not invertible, skipping smoothing");
        return None;
    };

    let sum = selected
        .iter()
        .fold(nalgebra::Vector3::zeros(), |acc, (_, p)| acc + p.coords);
    let mean = sum / selected.len() as f32;
    let blend = options.blend;

    let updates: Vec<(VertexId, Point3<f32>)> = selected
        .into_iter()
        .map(|(v, p)| {
            let world = Point3::from(p.coords.lerp(&mean, blend));
            (v, inverse.transform_point(&world))
        })
        .collect();

    if !updates.iter().all(|(_, p)| p.coords.iter().all(|c| c.is_finite())) {
        debug!(mesh = %mesh.id(), "smoothing produced non-finite positions, skipping");
        return None;
    }

    trace!(mesh = %mesh.id(), vertices = updates.len(), "smoothing stroke");
    Some(updates)
}

/// `(vertex, world position)` for every vertex inside the sphere, in vertex order.
fn select_world_vertices(
    mesh: &MeshAsset,
    center: &Point3<f32>,
    radius: f32,
    parallel: bool,
) -> Vec<(VertexId, Point3<f32>)> {
    let radius_sq = radius * radius;
    let transform = mesh.transform();
    let positions = mesh.positions();
    let test = |v: usize| {
        let world = transform.transform_point(&read_point(positions, v));
        ((world - center).norm_squared() <= radius_sq).then(|| (VertexId::new(v), world))
    };

    if parallel {
        (0..mesh.num_vertices()).into_par_iter().filter_map(test).collect()
    } else {
        (0..mesh.num_vertices()).filter_map(test).collect()
    }
}
