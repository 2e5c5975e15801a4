//! Sculpting algorithms.
//!
//! - **Radius**: pixel brush radius to world radius at the hit point
//! - **Selection**: triangles and vertices under the brush, indexed or brute force
//! - **Smoothing**: one brush sample of local Laplacian-style smoothing
//! - **Highlight**: the world-space overlay of triangles under the brush
//! - **Progress**: callbacks for background work

pub mod highlight;
pub mod progress;
pub mod radius;
pub mod select;
pub mod smooth;

pub use highlight::{HighlightSignal, HighlightSynthesizer};
pub use progress::Progress;
pub use radius::{
    highlight_radius_from_percent, project_radius, world_per_pixel, BrushRadii, CameraView, PointerKind,
};
pub use select::{centroid_scan, RegionSelector};
pub use smooth::{smooth_region, smooth_region_with_adjacency, SmoothOptions};
