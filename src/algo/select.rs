//! Region selection around a stroke point.
//!
//! Two inclusion rules live here and they are deliberately different:
//!
//! - **Indexed** ([`SpatialIndex::query_sphere`]): a triangle is selected when its
//!   centroid is inside the sphere. Fast, but a large triangle whose corner touches the
//!   brush may be missed.
//! - **Brute force**: a triangle is selected when any of its three corners or its
//!   centroid is inside the sphere. Used before an index exists and always for the
//!   highlight, where generosity at the brush edge looks better.
//!
//! Results of the two rules may differ at the sphere boundary.
//!
//! All centres and radii are in world space. Brute-force scans transform each vertex
//! once per call through a reusable per-vertex cache held by [`RegionSelector`].

use nalgebra::Point3;
use tracing::trace;

use crate::bvh::SpatialIndex;
use crate::mesh::{read_point, MeshAsset, TriangleId, VertexId};

/// Brute-force centroid-only scan over a flat centroid buffer.
///
/// Selects exactly what [`SpatialIndex::query_sphere`] selects for the same centroids,
/// in triangle order.
pub fn centroid_scan(centroids: &[f32], center: &Point3<f32>, radius: f32, out: &mut Vec<TriangleId>) {
    out.clear();
    if !valid_sphere(center, radius) {
        return;
    }
    let radius_sq = radius * radius;
    for (t, c) in centroids.chunks_exact(3).enumerate() {
        let dx = center.x - c[0];
        let dy = center.y - c[1];
        let dz = center.z - c[2];
        if dx * dx + dy * dy + dz * dz <= radius_sq {
            out.push(TriangleId::new(t));
        }
    }
}

#[inline]
fn valid_sphere(center: &Point3<f32>, radius: f32) -> bool {
    radius > 0.0 && radius.is_finite() && center.coords.iter().all(|v| v.is_finite())
}

/// Reusable selection state.
///
/// Holds a world-position cache sized to the largest mesh seen so far. Entries are
/// tagged with a per-call stamp, so starting a new scan costs nothing.
#[derive(Debug, Default)]
pub struct RegionSelector {
    world: Vec<Point3<f32>>,
    stamps: Vec<u32>,
    stamp: u32,
}

impl RegionSelector {
    /// Create a selector with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&mut self, vertex_count: usize) {
        if self.world.len() < vertex_count {
            self.world.resize(vertex_count, Point3::origin());
            self.stamps.resize(vertex_count, 0);
        }
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.stamps.fill(0);
            self.stamp = 1;
        }
    }

    #[inline]
    fn world_position(&mut self, mesh: &MeshAsset, v: usize) -> Point3<f32> {
        if self.stamps[v] != self.stamp {
            self.world[v] = mesh.transform().transform_point(&read_point(mesh.positions(), v));
            self.stamps[v] = self.stamp;
        }
        self.world[v]
    }

    /// Select triangles near a world-space point.
    ///
    /// Uses `index` (centroid rule) when it is present and covers the mesh's current
    /// triangle count; otherwise scans every triangle with the any-corner-or-centroid
    /// rule. The index is pruned with a local sphere enclosing the brush, and
    /// candidates are kept only if their world-space centroid is within `radius`.
    pub fn select_triangles(
        &mut self,
        mesh: &MeshAsset,
        index: Option<&SpatialIndex>,
        center: &Point3<f32>,
        radius: f32,
    ) -> Vec<TriangleId> {
        let mut out = Vec::new();
        self.select_triangles_into(mesh, index, center, radius, &mut out);
        out
    }

    /// Like [`RegionSelector::select_triangles`], reusing `out`.
    pub fn select_triangles_into(
        &mut self,
        mesh: &MeshAsset,
        index: Option<&SpatialIndex>,
        center: &Point3<f32>,
        radius: f32,
        out: &mut Vec<TriangleId>,
    ) {
        out.clear();
        if !valid_sphere(center, radius) {
            return;
        }
        if let Some(index) = index.filter(|i| i.num_triangles() == mesh.num_triangles()) {
            let transform = mesh.transform();
            if let Some((local_center, local_radius)) = transform.to_local_sphere(center, radius) {
                index.query_sphere_into(&local_center, local_radius, out);
                // The local sphere only bounds the world one under non-uniform scale.
                let radius_sq = radius * radius;
                out.retain(|&t| (transform.transform_point(&index.centroid(t)) - center).norm_squared() <= radius_sq);
                trace!(mesh = %mesh.id(), hits = out.len(), "indexed selection");
                return;
            }
        }
        self.select_triangles_brute_force(mesh, center, radius, out);
    }

    /// Any-corner-or-centroid scan over every triangle, in triangle order.
    pub fn select_triangles_brute_force(
        &mut self,
        mesh: &MeshAsset,
        center: &Point3<f32>,
        radius: f32,
        out: &mut Vec<TriangleId>,
    ) {
        out.clear();
        self.scan(mesh, center, radius, |t, _| out.push(t));
        trace!(mesh = %mesh.id(), hits = out.len(), "brute-force selection");
    }

    /// Resolve the brute-force selection to world-space corners, nine floats per
    /// triangle, into `out`. Returns the number of triangles written.
    pub fn collect_triangle_soup(
        &mut self,
        mesh: &MeshAsset,
        center: &Point3<f32>,
        radius: f32,
        out: &mut Vec<f32>,
    ) -> usize {
        out.clear();
        let mut count = 0;
        self.scan(mesh, center, radius, |_, corners| {
            for p in &corners {
                out.extend_from_slice(&[p.x, p.y, p.z]);
            }
            count += 1;
        });
        count
    }

    /// Vertices whose world position is within `radius` of `center`, in vertex order.
    pub fn select_vertices(&mut self, mesh: &MeshAsset, center: &Point3<f32>, radius: f32) -> Vec<VertexId> {
        if !valid_sphere(center, radius) {
            return Vec::new();
        }
        self.begin(mesh.num_vertices());
        let radius_sq = radius * radius;
        (0..mesh.num_vertices())
            .filter(|&v| (self.world_position(mesh, v) - center).norm_squared() <= radius_sq)
            .map(VertexId::new)
            .collect()
    }

    fn scan<F>(&mut self, mesh: &MeshAsset, center: &Point3<f32>, radius: f32, mut visit: F)
    where
        F: FnMut(TriangleId, [Point3<f32>; 3]),
    {
        if !valid_sphere(center, radius) {
            return;
        }
        self.begin(mesh.num_vertices());
        let radius_sq = radius * radius;
        let inside = |p: &Point3<f32>| (p - center).norm_squared() <= radius_sq;

        for (t, tri) in mesh.indices().chunks_exact(3).enumerate() {
            let a = self.world_position(mesh, tri[0] as usize);
            let b = self.world_position(mesh, tri[1] as usize);
            let c = self.world_position(mesh, tri[2] as usize);
            let centroid = Point3::from((a.coords + b.coords + c.coords) / 3.0);
            if inside(&a) || inside(&b) || inside(&c) || inside(&centroid) {
                visit(TriangleId::new(t), [a, b, c]);
            }
        }
    }
}
