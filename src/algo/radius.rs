//! Brush radius projection.
//!
//! Brushes are sized in screen pixels so they feel the same at any zoom level. At the
//! moment of a stroke the pixel radius is converted to a world-space radius at the hit
//! point using the perspective camera's vertical field of view:
//!
//! ```text
//! world_per_pixel = 2 · d · tan(fov_y / 2) / viewport_height
//! world_radius    = world_per_pixel · radius_px
//! ```
//!
//! where `d` is the distance from the camera to the hit point. The result is linear in
//! both `radius_px` and `d`. Degenerate input (non-positive viewport, non-finite values,
//! a field of view outside `(0, π)`) yields `0.0`, which every caller treats as
//! "no stroke".

use nalgebra::Point3;

use crate::mesh::MeshAsset;

/// The kind of device behind a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerKind {
    /// Mouse or any unrecognised device.
    #[default]
    Mouse,
    /// Stylus.
    Pen,
    /// Finger.
    Touch,
}

impl PointerKind {
    /// Map a DOM-style pointer type string. Anything other than `"touch"` or `"pen"`
    /// is treated as a mouse.
    pub fn from_pointer_type(pointer_type: &str) -> Self {
        match pointer_type {
            "touch" => PointerKind::Touch,
            "pen" => PointerKind::Pen,
            _ => PointerKind::Mouse,
        }
    }
}

/// On-screen brush radius per pointer kind, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushRadii {
    /// Mouse radius (default: 20).
    pub mouse_px: f32,
    /// Pen radius (default: 24).
    pub pen_px: f32,
    /// Touch radius (default: 48); fingers are imprecise.
    pub touch_px: f32,
}

impl Default for BrushRadii {
    fn default() -> Self {
        Self {
            mouse_px: 20.0,
            pen_px: 24.0,
            touch_px: 48.0,
        }
    }
}

impl BrushRadii {
    /// Pixel radius for a pointer kind.
    pub fn for_pointer(&self, kind: PointerKind) -> f32 {
        match kind {
            PointerKind::Mouse => self.mouse_px,
            PointerKind::Pen => self.pen_px,
            PointerKind::Touch => self.touch_px,
        }
    }

    /// Set every radius to the same value.
    pub fn uniform(radius_px: f32) -> Self {
        Self {
            mouse_px: radius_px,
            pen_px: radius_px,
            touch_px: radius_px,
        }
    }
}

/// World-space size of one pixel at `distance` from the camera.
pub fn world_per_pixel(fov_y: f32, viewport_height: f32, distance: f32) -> f32 {
    let valid = fov_y.is_finite()
        && fov_y > 0.0
        && fov_y < std::f32::consts::PI
        && viewport_height.is_finite()
        && viewport_height > 0.0
        && distance.is_finite()
        && distance >= 0.0;
    if !valid {
        return 0.0;
    }
    2.0 * distance * (fov_y * 0.5).tan() / viewport_height
}

/// Convert a pixel radius to a world radius at `distance` from the camera.
///
/// `fov_y` is the vertical field of view in radians.
pub fn project_radius(radius_px: f32, fov_y: f32, viewport_height: f32, distance: f32) -> f32 {
    if !radius_px.is_finite() || radius_px <= 0.0 {
        return 0.0;
    }
    let r = world_per_pixel(fov_y, viewport_height, distance) * radius_px;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

/// The parts of a perspective camera the projector needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// Eye position in world space.
    pub position: Point3<f32>,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Viewport height in pixels.
    pub viewport_height: f32,
}

impl CameraView {
    /// Create a camera view; `fov_y_degrees` is converted to radians.
    pub fn from_degrees(position: Point3<f32>, fov_y_degrees: f32, viewport_height: f32) -> Self {
        Self {
            position,
            fov_y: fov_y_degrees.to_radians(),
            viewport_height,
        }
    }

    /// World radius of a `radius_px` brush centred on `point`.
    pub fn world_radius_at(&self, point: &Point3<f32>, radius_px: f32) -> f32 {
        let distance = nalgebra::distance(&self.position, point);
        project_radius(radius_px, self.fov_y, self.viewport_height, distance)
    }
}

/// Highlight radius as a percentage of the mesh's world-space bounding sphere.
///
/// `percent` is clamped to `[0, 100]`; NaN counts as 0. The local bounding-sphere
/// radius is scaled by the largest axis scale of the mesh's world transform.
pub fn highlight_radius_from_percent(mesh: &MeshAsset, percent: f32) -> f32 {
    let normalized = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) } / 100.0;
    let Some((_, base)) = mesh.bounding_sphere() else {
        return 0.0;
    };
    let r = base * mesh.transform().max_scale() * normalized;
    if r.is_finite() {
        r
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{primitives, WorldTransform};
    use nalgebra::Vector3;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_pointer_kinds() {
        assert_eq!(PointerKind::from_pointer_type("touch"), PointerKind::Touch);
        assert_eq!(PointerKind::from_pointer_type("pen"), PointerKind::Pen);
        assert_eq!(PointerKind::from_pointer_type("mouse"), PointerKind::Mouse);
        assert_eq!(PointerKind::from_pointer_type(""), PointerKind::Mouse);

        let radii = BrushRadii::default();
        assert_eq!(radii.for_pointer(PointerKind::Touch), 48.0);
        assert_eq!(radii.for_pointer(PointerKind::Pen), 24.0);
        assert_eq!(radii.for_pointer(PointerKind::Mouse), 20.0);
    }

    #[test]
    fn test_known_value() {
        // 90° fov: the visible height at distance 1 is 2 world units.
        let r = project_radius(50.0, FRAC_PI_2, 100.0, 1.0);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_linear_in_pixels_and_distance() {
        let fov = 50f32.to_radians();
        let r = project_radius(20.0, fov, 800.0, 3.0);
        assert!((project_radius(40.0, fov, 800.0, 3.0) - 2.0 * r).abs() < 1e-6);
        assert!((project_radius(20.0, fov, 800.0, 6.0) - 2.0 * r).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_input() {
        assert_eq!(project_radius(20.0, 1.0, 0.0, 1.0), 0.0);
        assert_eq!(project_radius(20.0, 1.0, -5.0, 1.0), 0.0);
        assert_eq!(project_radius(20.0, 0.0, 600.0, 1.0), 0.0);
        assert_eq!(project_radius(20.0, f32::NAN, 600.0, 1.0), 0.0);
        assert_eq!(project_radius(20.0, 1.0, 600.0, f32::INFINITY), 0.0);
        assert_eq!(project_radius(f32::NAN, 1.0, 600.0, 1.0), 0.0);
        assert_eq!(project_radius(0.0, 1.0, 600.0, 1.0), 0.0);
        assert_eq!(project_radius(20.0, 1.0, 600.0, 0.0), 0.0);
    }

    #[test]
    fn test_camera_view() {
        let view = CameraView::from_degrees(Point3::new(0.0, 0.0, 4.0), 90.0, 100.0);
        let r = view.world_radius_at(&Point3::origin(), 25.0);
        assert!((r - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_highlight_percent() {
        let mesh = primitives::grid("g", 2, 1.0);
        let full = highlight_radius_from_percent(&mesh, 100.0);
        let half = highlight_radius_from_percent(&mesh, 50.0);
        assert!(full > 0.0);
        assert!((full - 2.0 * half).abs() < 1e-6);
        assert_eq!(highlight_radius_from_percent(&mesh, f32::NAN), 0.0);
        assert_eq!(highlight_radius_from_percent(&mesh, 250.0), full);
        assert_eq!(highlight_radius_from_percent(&mesh, -3.0), 0.0);
    }

    #[test]
    fn test_highlight_percent_respects_world_scale() {
        let base = primitives::grid("g", 2, 1.0);
        let scaled = primitives::grid("g", 2, 1.0).with_transform(WorldTransform::from_scale_translation(
            Vector3::new(2.0, 2.0, 2.0),
            Vector3::zeros(),
        ));
        let a = highlight_radius_from_percent(&base, 100.0);
        let b = highlight_radius_from_percent(&scaled, 100.0);
        assert!((b - 2.0 * a).abs() < 1e-6);
    }
}
