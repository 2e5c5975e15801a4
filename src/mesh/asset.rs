//! The sculptable mesh.
//!
//! A [`MeshAsset`] owns the flat buffers the renderer draws from: positions, triangle
//! indices and per-vertex normals, plus the mesh's current local-to-world transform.
//! Positions are the only thing sculpting mutates; every mutation bumps
//! [`MeshAsset::revision`] so a spatial index can tell which buffer generation it
//! was built from.

use nalgebra::{Point3, Vector3};

use super::adjacency::Adjacency;
use super::builder::{flatten_points, flatten_triangles, read_point, validate_buffers, write_point};
use super::index::{MeshId, TriangleId, VertexId};
use super::normals::{compute_vertex_normals, recompute_normals_local};
use super::transform::WorldTransform;
use crate::error::Result;

/// Buffers copied out of a mesh for a background index build.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPayload {
    /// The mesh the buffers belong to.
    pub mesh_id: MeshId,
    /// Flat `xyz` positions in mesh-local space.
    pub positions: Vec<f32>,
    /// Flat triangle vertex indices.
    pub indices: Vec<u32>,
}

/// An indexed triangle mesh with a world transform.
#[derive(Debug, Clone)]
pub struct MeshAsset {
    id: MeshId,
    positions: Vec<f32>,
    indices: Vec<u32>,
    normals: Vec<f32>,
    transform: WorldTransform,
    revision: u64,
}

impl MeshAsset {
    /// Create a mesh from flat buffers, validating them and computing normals.
    ///
    /// # Example
    /// ```
    /// use chisel::mesh::MeshAsset;
    ///
    /// let positions = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mesh = MeshAsset::new("tri", positions, vec![0, 1, 2]).unwrap();
    /// assert_eq!(mesh.num_vertices(), 3);
    /// assert_eq!(mesh.num_triangles(), 1);
    /// ```
    pub fn new(id: impl Into<MeshId>, positions: Vec<f32>, indices: Vec<u32>) -> Result<Self> {
        let id = id.into();
        validate_buffers(&id, &positions, &indices)?;
        Ok(Self::from_valid_buffers(id, positions, indices))
    }

    /// Create a mesh from points and triangles.
    pub fn from_points(
        id: impl Into<MeshId>,
        points: &[Point3<f32>],
        triangles: &[[u32; 3]],
    ) -> Result<Self> {
        Self::new(id, flatten_points(points), flatten_triangles(triangles))
    }

    /// Buffers already known to be valid (procedural meshes).
    pub(crate) fn from_valid_buffers(id: MeshId, positions: Vec<f32>, indices: Vec<u32>) -> Self {
        let normals = compute_vertex_normals(&positions, &indices);
        Self {
            id,
            positions,
            indices,
            normals,
            transform: WorldTransform::identity(),
            revision: 0,
        }
    }

    /// Builder-style transform setter.
    pub fn with_transform(mut self, transform: WorldTransform) -> Self {
        self.transform = transform;
        self
    }

    /// The mesh's identity.
    #[inline]
    pub fn id(&self) -> &MeshId {
        &self.id
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }

    /// Flat `xyz` positions in local space.
    #[inline]
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Flat triangle indices.
    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Flat `xyz` per-vertex normals in local space.
    #[inline]
    pub fn normals(&self) -> &[f32] {
        &self.normals
    }

    /// Local position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId) -> Point3<f32> {
        read_point(&self.positions, v.index())
    }

    /// Set the local position of a vertex.
    ///
    /// Normals are left as they are; call [`MeshAsset::recompute_normals`] afterwards.
    #[inline]
    pub fn set_position(&mut self, v: VertexId, p: Point3<f32>) {
        write_point(&mut self.positions, v.index(), &p);
        self.revision += 1;
    }

    /// Write a batch of local positions as one mutation.
    pub fn write_positions(&mut self, updates: &[(VertexId, Point3<f32>)]) {
        if updates.is_empty() {
            return;
        }
        for (v, p) in updates {
            write_point(&mut self.positions, v.index(), p);
        }
        self.revision += 1;
    }

    /// The three vertices of a triangle.
    #[inline]
    pub fn triangle(&self, t: TriangleId) -> [VertexId; 3] {
        let o = t.index() * 3;
        [
            VertexId::from(self.indices[o]),
            VertexId::from(self.indices[o + 1]),
            VertexId::from(self.indices[o + 2]),
        ]
    }

    /// Local positions of a triangle's corners.
    #[inline]
    pub fn triangle_positions(&self, t: TriangleId) -> [Point3<f32>; 3] {
        let [a, b, c] = self.triangle(t);
        [self.position(a), self.position(b), self.position(c)]
    }

    /// Mean of a triangle's corners, in local space.
    #[inline]
    pub fn triangle_centroid(&self, t: TriangleId) -> Point3<f32> {
        let [a, b, c] = self.triangle_positions(t);
        Point3::from((a.coords + b.coords + c.coords) / 3.0)
    }

    /// Local-to-world transform.
    #[inline]
    pub fn transform(&self) -> &WorldTransform {
        &self.transform
    }

    /// Replace the local-to-world transform.
    pub fn set_transform(&mut self, transform: WorldTransform) {
        self.transform = transform;
    }

    /// World position of a vertex.
    #[inline]
    pub fn world_position(&self, v: VertexId) -> Point3<f32> {
        self.transform.transform_point(&self.position(v))
    }

    /// Mutation counter, bumped on every position write.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Local-space axis-aligned bounds, or `None` for a mesh without vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f32>, Point3<f32>)> {
        let mut points = self.positions.chunks_exact(3);
        let first = points.next()?;
        let mut min = Point3::new(first[0], first[1], first[2]);
        let mut max = min;
        for p in points {
            let p = Point3::new(p[0], p[1], p[2]);
            min = min.inf(&p);
            max = max.sup(&p);
        }
        Some((min, max))
    }

    /// Local-space bounding sphere: centred on the bounding box, reaching the
    /// farthest vertex.
    pub fn bounding_sphere(&self) -> Option<(Point3<f32>, f32)> {
        let (min, max) = self.bounding_box()?;
        let center = nalgebra::center(&min, &max);
        let radius_sq = self
            .positions
            .chunks_exact(3)
            .map(|p| (Point3::new(p[0], p[1], p[2]) - center).norm_squared())
            .fold(0.0_f32, f32::max);
        Some((center, radius_sq.sqrt()))
    }

    /// Recompute every vertex normal.
    pub fn recompute_normals(&mut self) {
        self.normals = compute_vertex_normals(&self.positions, &self.indices);
    }

    /// Recompute the normals around `moved` vertices only.
    pub fn recompute_normals_around(&mut self, adjacency: &Adjacency, moved: &[VertexId]) {
        recompute_normals_local(&self.positions, &self.indices, &mut self.normals, adjacency, moved);
    }

    /// Normal of a vertex.
    #[inline]
    pub fn normal(&self, v: VertexId) -> Vector3<f32> {
        let o = v.index() * 3;
        Vector3::new(self.normals[o], self.normals[o + 1], self.normals[o + 2])
    }

    /// Copy the buffers for a background build.
    pub fn snapshot(&self) -> MeshPayload {
        MeshPayload {
            mesh_id: self.id.clone(),
            positions: self.positions.clone(),
            indices: self.indices.clone(),
        }
    }

    /// Vertex ids in order.
    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> {
        (0..self.num_vertices()).map(VertexId::new)
    }

    /// Triangle ids in order.
    pub fn triangle_ids(&self) -> impl Iterator<Item = TriangleId> {
        (0..self.num_triangles()).map(TriangleId::new)
    }
}
