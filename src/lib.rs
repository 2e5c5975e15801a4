//! # Chisel
//!
//! An interactive mesh sculpting engine.
//!
//! Chisel keeps the hot path of a brush stroke off the interactive thread's critical
//! path: spatial indices are built on a background worker, brush radii are projected
//! from screen pixels to world units at the hit point, and each stroke sample smooths
//! only the vertices under the brush.
//!
//! ## Features
//!
//! - **Flat mesh buffers**: `f32` positions and `u32` indices, the layout a renderer uploads
//! - **BVH over triangle centroids**: median-split build, sub-linear sphere queries
//! - **Background builds**: bounded queue, one response per request, panics contained
//! - **Brush smoothing**: world-space selection, local-space write-back, normal updates
//! - **Highlight overlay**: world-space triangle soup of the region under the brush
//!
//! ## Quick Start
//!
//! ```
//! use chisel::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut mesh = chisel::mesh::primitives::uv_sphere("ball", 24, 32, 1.0);
//! let index = SpatialIndex::from_mesh(&mesh, &IndexOptions::default());
//!
//! // Triangles whose centroid is near the north pole
//! let north = Point3::new(0.0, 1.0, 0.0);
//! let hits = index.query_sphere(&north, 0.2);
//! assert!(!hits.is_empty());
//!
//! // One smoothing sample at the same place
//! assert!(smooth_region(&mut mesh, &north, 0.2, &SmoothOptions::default()));
//! ```
//!
//! ## Sessions
//!
//! A viewer drives the engine through [`session::SculptSession`], which owns the
//! models, the build worker and per-pointer strokes:
//!
//! ```
//! use chisel::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut session = SculptSession::with_defaults().unwrap();
//! session
//!     .load_model("scene", vec![chisel::mesh::primitives::grid("floor", 32, 0.1)])
//!     .unwrap();
//! session.set_active_tool(Some(SculptTool::Smooth));
//!
//! let camera = CameraView::from_degrees(Point3::new(0.0, 3.0, 0.0), 45.0, 900.0);
//! let hit = SurfaceHit::new("scene", "floor", Point3::new(0.2, 0.0, 0.0));
//! session.pointer_down(PointerId(0), PointerKind::Touch, Some(&hit), &camera);
//! session.pointer_up(PointerId(0));
//!
//! // Once per frame
//! session.poll_builds();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod bvh;
pub mod error;
pub mod mesh;
pub mod session;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use chisel::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{
        highlight_radius_from_percent, project_radius, smooth_region, BrushRadii, CameraView, HighlightSignal,
        HighlightSynthesizer, PointerKind, RegionSelector, SmoothOptions,
    };
    pub use crate::bvh::coordinator::{BuildRequest, BuildResponse, IndexBuildCoordinator};
    pub use crate::bvh::{IndexOptions, SpatialIndex};
    pub use crate::error::{Result, SculptError};
    pub use crate::mesh::{MeshAsset, MeshId, ModelId, TriangleId, VertexId, WorldTransform};
    pub use crate::session::{
        HighlightRadius, PointerId, RebuildPolicy, SculptConfig, SculptSession, SculptTool, SurfaceHit,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::Point3;

    #[test]
    fn test_index_then_smooth() {
        let mut mesh = crate::mesh::primitives::uv_sphere("ball", 12, 16, 1.0);
        let index = SpatialIndex::from_mesh(&mesh, &IndexOptions::default());
        let north = Point3::new(0.0, 1.0, 0.0);

        let mut selector = RegionSelector::new();
        let selected = selector.select_triangles(&mesh, Some(&index), &north, 0.4);
        assert!(!selected.is_empty());

        assert!(smooth_region(&mut mesh, &north, 0.4, &SmoothOptions::default()));
        assert_eq!(mesh.revision(), 1);
        // Smoothing a convex cap pulls it inward.
        assert!(mesh.position(VertexId::new(0)).y < 1.0);
    }
}
