//! Brush highlight geometry.
//!
//! While the pointer hovers over a mesh, the renderer draws a translucent overlay of
//! the triangles under the brush. [`HighlightSynthesizer`] produces that overlay as a
//! flat world-space triangle soup (nine floats per triangle) and tells the caller
//! whether to show or hide it. It never mutates the mesh; its only state is the output
//! buffer, which is reused between frames.

use nalgebra::Point3;

use super::select::RegionSelector;
use crate::mesh::MeshAsset;

/// What the renderer should do with the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlightSignal {
    /// Draw [`HighlightSynthesizer::positions`].
    Show,
    /// Hide the overlay.
    #[default]
    Hide,
}

/// Builds the brush overlay.
#[derive(Debug, Default)]
pub struct HighlightSynthesizer {
    selector: RegionSelector,
    positions: Vec<f32>,
    signal: HighlightSignal,
}

impl HighlightSynthesizer {
    /// Create a hidden, empty synthesizer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the overlay for a brush at `center` with world `radius`.
    ///
    /// Triangles are included when any corner or their centroid is inside the brush.
    pub fn update(&mut self, mesh: &MeshAsset, center: &Point3<f32>, radius: f32) -> HighlightSignal {
        let count = self
            .selector
            .collect_triangle_soup(mesh, center, radius, &mut self.positions);
        self.signal = if count == 0 {
            HighlightSignal::Hide
        } else {
            HighlightSignal::Show
        };
        self.signal
    }

    /// Empty the buffer and hide.
    pub fn clear(&mut self) -> HighlightSignal {
        self.positions.clear();
        self.signal = HighlightSignal::Hide;
        self.signal
    }

    /// World-space corner positions, nine floats per triangle.
    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Number of triangles in the overlay.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 9
    }

    /// The last signal emitted.
    #[inline]
    pub fn signal(&self) -> HighlightSignal {
        self.signal
    }

    /// Whether the overlay should currently be drawn.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.signal == HighlightSignal::Show
    }
}
