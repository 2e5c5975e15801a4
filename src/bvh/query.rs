//! Sphere queries against a [`SpatialIndex`].

use nalgebra::Point3;

use super::SpatialIndex;
use crate::mesh::{NodeId, TriangleId};

impl SpatialIndex {
    /// Triangles whose centroid lies within `radius` of `center` (inclusive).
    ///
    /// `center` and `radius` are in the same space the index was built in, i.e. the
    /// mesh's local space. A non-positive or non-finite radius selects nothing.
    pub fn query_sphere(&self, center: &Point3<f32>, radius: f32) -> Vec<TriangleId> {
        let mut out = Vec::new();
        self.query_sphere_into(center, radius, &mut out);
        out
    }

    /// Like [`SpatialIndex::query_sphere`], reusing `out` (which is cleared first).
    pub fn query_sphere_into(&self, center: &Point3<f32>, radius: f32, out: &mut Vec<TriangleId>) {
        out.clear();
        if self.nodes.is_empty() || !(radius > 0.0) || !radius.is_finite() {
            return;
        }
        if !center.coords.iter().all(|v| v.is_finite()) {
            return;
        }

        let radius_sq = radius * radius;
        let mut stack: Vec<NodeId> = Vec::with_capacity(64);
        stack.push(NodeId::new(0));

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.index()];
            if node.bounds.distance_sq(center) > radius_sq {
                continue;
            }
            match node.children {
                Some([left, right]) => {
                    stack.push(right);
                    stack.push(left);
                }
                None => {
                    for &t in &self.order[node.range()] {
                        if (self.centroid(t) - center).norm_squared() <= radius_sq {
                            out.push(t);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::IndexOptions;
    use crate::mesh::{primitives, MeshAsset};

    /// Unit square from (-1,0,-1) to (1,0,1) split into [0,1,2] and [2,1,3].
    fn square() -> MeshAsset {
        MeshAsset::from_points(
            "square",
            &[
                Point3::new(-1.0, 0.0, -1.0),
                Point3::new(1.0, 0.0, -1.0),
                Point3::new(-1.0, 0.0, 1.0),
                Point3::new(1.0, 0.0, 1.0),
            ],
            &[[0, 1, 2], [2, 1, 3]],
        )
        .unwrap()
    }

    fn sorted(mut v: Vec<TriangleId>) -> Vec<TriangleId> {
        v.sort_unstable();
        v
    }

    #[test]
    fn test_square_corner_centroid_rule() {
        let index = SpatialIndex::from_mesh(&square(), &IndexOptions::default().with_leaf_size(1));
        // Centroid of triangle 0 is (-1/3, 0, -1/3), ~0.943 from the corner. The
        // centroid rule misses it at 0.75; the brute-force selector does not.
        let hits = index.query_sphere(&Point3::new(-1.0, 0.0, -1.0), 0.75);
        assert!(hits.is_empty());

        let hits = index.query_sphere(&Point3::new(-1.0, 0.0, -1.0), 1.0);
        assert_eq!(hits, vec![TriangleId::new(0)]);
    }

    #[test]
    fn test_square_center_query() {
        let index = SpatialIndex::from_mesh(&square(), &IndexOptions::default().with_leaf_size(1));
        let hits = sorted(index.query_sphere(&Point3::origin(), 2.0_f32.sqrt()));
        assert_eq!(hits, vec![TriangleId::new(0), TriangleId::new(1)]);
    }

    #[test]
    fn test_far_query_is_empty() {
        let index = SpatialIndex::from_mesh(&square(), &IndexOptions::default());
        assert!(index.query_sphere(&Point3::new(10.0, 0.0, 10.0), 0.5).is_empty());
    }

    #[test]
    fn test_degenerate_radius() {
        let index = SpatialIndex::from_mesh(&square(), &IndexOptions::default());
        let c = Point3::origin();
        assert!(index.query_sphere(&c, 0.0).is_empty());
        assert!(index.query_sphere(&c, -1.0).is_empty());
        assert!(index.query_sphere(&c, f32::NAN).is_empty());
        assert!(index.query_sphere(&c, f32::INFINITY).is_empty());
        assert!(index.query_sphere(&Point3::new(f32::NAN, 0.0, 0.0), 1.0).is_empty());
    }

    #[test]
    fn test_matches_linear_scan() {
        let mesh = primitives::uv_sphere("s", 20, 28, 1.0);
        let index = SpatialIndex::from_mesh(&mesh, &IndexOptions::default().with_leaf_size(8));
        let probes = [
            (Point3::new(0.0, 1.0, 0.0), 0.3),
            (Point3::new(0.7, 0.0, 0.7), 0.5),
            (Point3::new(0.0, 0.0, 0.0), 0.95),
            (Point3::new(-1.0, -0.2, 0.1), 0.25),
        ];
        for (center, radius) in probes {
            let expected: Vec<TriangleId> = mesh
                .triangle_ids()
                .filter(|&t| (index.centroid(t) - center).norm_squared() <= radius * radius)
                .collect();
            assert_eq!(sorted(index.query_sphere(&center, radius)), expected);
        }
    }

    #[test]
    fn test_into_clears_output() {
        let index = SpatialIndex::from_mesh(&square(), &IndexOptions::default());
        let mut out = vec![TriangleId::new(99)];
        index.query_sphere_into(&Point3::new(10.0, 0.0, 10.0), 0.5, &mut out);
        assert!(out.is_empty());
    }
}
