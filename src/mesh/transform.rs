//! Mesh world transforms.
//!
//! A [`WorldTransform`] maps mesh-local positions into world space. The sculpting
//! operations work on world-space hit points and radii, so they need the inverse as
//! well; [`WorldTransform::inverse`] refuses transforms that collapse an axis instead
//! of returning a matrix full of infinities.

use nalgebra::{Matrix4, Point3, Vector3};

/// Axis scales at or below this are treated as collapsed.
pub const MIN_AXIS_SCALE: f32 = 1e-8;

/// An affine local-to-world transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    matrix: Matrix4<f32>,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl WorldTransform {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Wrap an arbitrary affine matrix.
    pub fn from_matrix(matrix: Matrix4<f32>) -> Self {
        Self { matrix }
    }

    /// Scale about the origin, then translate.
    pub fn from_scale_translation(scale: Vector3<f32>, translation: Vector3<f32>) -> Self {
        let matrix = Matrix4::new_translation(&translation) * Matrix4::new_nonuniform_scaling(&scale);
        Self { matrix }
    }

    /// Uniform scale about the origin.
    pub fn uniform_scale(scale: f32) -> Self {
        Self::from_matrix(Matrix4::new_scaling(scale))
    }

    /// The underlying matrix.
    #[inline]
    pub fn matrix(&self) -> &Matrix4<f32> {
        &self.matrix
    }

    /// Transform a local-space point into world space.
    #[inline]
    pub fn transform_point(&self, p: &Point3<f32>) -> Point3<f32> {
        self.matrix.transform_point(p)
    }

    /// Length of each transformed basis axis.
    pub fn axis_scales(&self) -> Vector3<f32> {
        let m = self.matrix.fixed_view::<3, 3>(0, 0);
        Vector3::new(m.column(0).norm(), m.column(1).norm(), m.column(2).norm())
    }

    /// Largest axis scale (the factor a local length can grow by).
    pub fn max_scale(&self) -> f32 {
        self.axis_scales().max()
    }

    /// Smallest axis scale.
    pub fn min_scale(&self) -> f32 {
        self.axis_scales().min()
    }

    /// The world-to-local transform, or `None` if this transform is not safely
    /// invertible (collapsed axis, non-finite entries).
    pub fn inverse(&self) -> Option<WorldTransform> {
        if !self.matrix.iter().all(|v| v.is_finite()) {
            return None;
        }
        if self.min_scale() <= MIN_AXIS_SCALE {
            return None;
        }
        let inverse = self.matrix.try_inverse()?;
        if inverse.iter().all(|v| v.is_finite()) {
            Some(WorldTransform { matrix: inverse })
        } else {
            None
        }
    }

    /// Map a world-space sphere into local space.
    ///
    /// The local radius is divided by the smallest axis scale, so under non-uniform
    /// scale the local sphere encloses the world sphere's preimage. Exact for uniform
    /// scale.
    pub fn to_local_sphere(&self, center: &Point3<f32>, radius: f32) -> Option<(Point3<f32>, f32)> {
        let inverse = self.inverse()?;
        let local_center = inverse.transform_point(center);
        let local_radius = radius / self.min_scale();
        if local_center.coords.iter().all(|v| v.is_finite()) && local_radius.is_finite() {
            Some((local_center, local_radius))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_roundtrip() {
        let t = WorldTransform::identity();
        let p = Point3::new(1.0, -2.0, 3.0);
        assert_eq!(t.transform_point(&p), p);
        assert_eq!(t.inverse().unwrap().transform_point(&p), p);
    }

    #[test]
    fn test_scale_translation() {
        let t = WorldTransform::from_scale_translation(Vector3::new(2.0, 2.0, 2.0), Vector3::new(1.0, 0.0, 0.0));
        let p = t.transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert!((p - Point3::new(3.0, 2.0, 2.0)).norm() < 1e-6);
        assert!((t.max_scale() - 2.0).abs() < 1e-6);

        let back = t.inverse().unwrap().transform_point(&p);
        assert!((back - Point3::new(1.0, 1.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn test_zero_scale_is_not_invertible() {
        let t = WorldTransform::from_scale_translation(Vector3::new(1.0, 0.0, 1.0), Vector3::zeros());
        assert!(t.inverse().is_none());
        assert!(t.to_local_sphere(&Point3::origin(), 1.0).is_none());
    }

    #[test]
    fn test_nan_matrix_is_not_invertible() {
        let mut m = Matrix4::identity();
        m[(0, 3)] = f32::NAN;
        assert!(WorldTransform::from_matrix(m).inverse().is_none());
    }

    #[test]
    fn test_local_sphere_uniform_scale() {
        let t = WorldTransform::uniform_scale(4.0);
        let (c, r) = t.to_local_sphere(&Point3::new(4.0, 0.0, 0.0), 2.0).unwrap();
        assert!((c - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-6);
        assert!((r - 0.5).abs() < 1e-6);
    }
}
