//! Bounding-volume hierarchy over triangle centroids.
//!
//! A [`SpatialIndex`] answers "which triangles have their centroid inside this
//! sphere" without scanning the whole mesh. It is built once per mesh from a snapshot
//! of its buffers (usually on the background worker, see [`coordinator`]) and is
//! immutable afterwards.
//!
//! # Layout
//!
//! - `order` is a permutation of all triangle ids; every node owns the contiguous
//!   range `order[start..start + count]`.
//! - `centroids` holds one `xyz` centroid per triangle in the original triangle order.
//! - `nodes` is stored in pre-order; node 0 is the root and covers every triangle.
//!   Each node's box tightly encloses the centroids in its range.
//!
//! # Build
//!
//! Median split: the range is sorted by centroid along the longest box axis and cut
//! in half by count, until a range holds at most `leaf_size` triangles. This is not a
//! SAH build; it is deterministic and fast, which matters more for an index that is
//! rebuilt while the user waits.
//!
//! # Example
//!
//! ```
//! use chisel::bvh::{IndexOptions, SpatialIndex};
//! use chisel::mesh::primitives;
//! use nalgebra::Point3;
//!
//! let mesh = primitives::grid("grid", 32, 1.0);
//! let index = SpatialIndex::from_mesh(&mesh, &IndexOptions::default());
//! let hits = index.query_sphere(&Point3::origin(), 1.5);
//! assert!(!hits.is_empty());
//! ```

pub mod coordinator;
mod query;

use std::ops::Range;

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::error::Result;
use crate::mesh::{read_point, validate_buffers, MeshAsset, MeshId, NodeId, TriangleId};

/// Default maximum number of triangles in a leaf.
pub const DEFAULT_LEAF_SIZE: usize = 32;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Point3<f32>,
    /// Maximum corner.
    pub max: Point3<f32>,
}

impl Aabb {
    /// A box containing nothing; growing it by a point yields that point.
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    /// Whether no point has been added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Extend the box to contain `p`.
    #[inline]
    pub fn grow(&mut self, p: &Point3<f32>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Size along each axis.
    #[inline]
    pub fn extent(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Axis (0 = x, 1 = y, 2 = z) with the largest extent; ties prefer the lower axis.
    pub fn largest_axis(&self) -> usize {
        let e = self.extent();
        if e.x >= e.y && e.x >= e.z {
            0
        } else if e.y >= e.z {
            1
        } else {
            2
        }
    }

    /// Whether `p` lies inside or on the box.
    #[inline]
    pub fn contains(&self, p: &Point3<f32>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Squared distance from `p` to the box (zero inside).
    #[inline]
    pub fn distance_sq(&self, p: &Point3<f32>) -> f32 {
        let mut d = 0.0;
        for i in 0..3 {
            let clamped = p[i].clamp(self.min[i], self.max[i]);
            let delta = p[i] - clamped;
            d += delta * delta;
        }
        d
    }

    /// Box-sphere overlap test.
    #[inline]
    pub fn intersects_sphere(&self, center: &Point3<f32>, radius: f32) -> bool {
        self.distance_sq(center) <= radius * radius
    }
}

/// One node of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BvhNode {
    /// Tight box around the centroids in this node's range.
    pub bounds: Aabb,
    /// First position in [`SpatialIndex::order`].
    pub start: u32,
    /// Number of triangles in the range.
    pub count: u32,
    /// Left and right children; `None` for a leaf. Either both exist or neither does.
    pub children: Option<[NodeId; 2]>,
}

impl BvhNode {
    /// Whether this node has no children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// The left child, if any.
    #[inline]
    pub fn left(&self) -> Option<NodeId> {
        self.children.map(|[l, _]| l)
    }

    /// The right child, if any.
    #[inline]
    pub fn right(&self) -> Option<NodeId> {
        self.children.map(|[_, r]| r)
    }

    /// The node's range in [`SpatialIndex::order`].
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start as usize..(self.start + self.count) as usize
    }
}

/// Options for building a [`SpatialIndex`].
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Maximum number of triangles in a leaf (at least 1).
    pub leaf_size: usize,

    /// Whether to compute centroids and batch members in parallel (default: true).
    pub parallel: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            leaf_size: DEFAULT_LEAF_SIZE,
            parallel: true,
        }
    }
}

impl IndexOptions {
    /// Set the leaf size; values below 1 are raised to 1.
    pub fn with_leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = leaf_size.max(1);
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

/// A BVH over the triangle centroids of one mesh snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialIndex {
    order: Vec<TriangleId>,
    centroids: Vec<f32>,
    nodes: Vec<BvhNode>,
    leaf_size: usize,
}

impl SpatialIndex {
    /// Build an index from raw mesh buffers, validating them first.
    ///
    /// A mesh with no triangles yields an index with no nodes, which every query
    /// answers with an empty result.
    pub fn build(mesh_id: &MeshId, positions: &[f32], indices: &[u32], options: &IndexOptions) -> Result<Self> {
        validate_buffers(mesh_id, positions, indices)?;
        Ok(Self::build_unchecked(positions, indices, options))
    }

    /// Build an index for a mesh whose buffers are already validated.
    pub fn from_mesh(mesh: &MeshAsset, options: &IndexOptions) -> Self {
        Self::build_unchecked(mesh.positions(), mesh.indices(), options)
    }

    fn build_unchecked(positions: &[f32], indices: &[u32], options: &IndexOptions) -> Self {
        let leaf_size = options.leaf_size.max(1);
        let triangle_count = indices.len() / 3;
        let centroids = compute_centroids(positions, indices, options.parallel);

        let mut order: Vec<TriangleId> = (0..triangle_count).map(TriangleId::new).collect();
        let mut nodes = Vec::new();
        if triangle_count > 0 {
            let mut builder = NodeBuilder {
                nodes: &mut nodes,
                order: &mut order,
                centroids: &centroids,
                leaf_size,
            };
            builder.build(0, triangle_count);
        }

        Self {
            order,
            centroids,
            nodes,
            leaf_size,
        }
    }

    /// Triangle permutation; node ranges index into it.
    #[inline]
    pub fn order(&self) -> &[TriangleId] {
        &self.order
    }

    /// Flat centroids in original triangle order.
    #[inline]
    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    /// Centroid of one triangle.
    #[inline]
    pub fn centroid(&self, t: TriangleId) -> Point3<f32> {
        read_point(&self.centroids, t.index())
    }

    /// Nodes in pre-order.
    #[inline]
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// A node by id.
    #[inline]
    pub fn node(&self, id: NodeId) -> &BvhNode {
        &self.nodes[id.index()]
    }

    /// The root, or `None` for an empty mesh.
    #[inline]
    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.first()
    }

    /// Number of indexed triangles.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.order.len()
    }

    /// Whether the index covers no triangles.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Leaf size the index was built with.
    #[inline]
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Number of levels (0 for an empty index, 1 for a single leaf).
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut max_depth = 0;
        let mut stack = vec![(NodeId::new(0), 1usize)];
        while let Some((id, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some([l, r]) = self.node(id).children {
                stack.push((l, depth + 1));
                stack.push((r, depth + 1));
            }
        }
        max_depth
    }
}

/// One centroid per triangle, in triangle order.
fn compute_centroids(positions: &[f32], indices: &[u32], parallel: bool) -> Vec<f32> {
    let mut centroids = vec![0.0f32; (indices.len() / 3) * 3];
    let fill = |(t, out): (usize, &mut [f32])| {
        let o = t * 3;
        let a = read_point(positions, indices[o] as usize);
        let b = read_point(positions, indices[o + 1] as usize);
        let c = read_point(positions, indices[o + 2] as usize);
        let m = (a.coords + b.coords + c.coords) / 3.0;
        out.copy_from_slice(&[m.x, m.y, m.z]);
    };

    if parallel {
        centroids.par_chunks_mut(3).enumerate().for_each(fill);
    } else {
        centroids.chunks_mut(3).enumerate().for_each(fill);
    }
    centroids
}

struct NodeBuilder<'a> {
    nodes: &'a mut Vec<BvhNode>,
    order: &'a mut [TriangleId],
    centroids: &'a [f32],
    leaf_size: usize,
}

impl NodeBuilder<'_> {
    /// Emit the node for `order[start..end]` and its subtree; returns its id.
    fn build(&mut self, start: usize, end: usize) -> NodeId {
        let count = end - start;
        let mut bounds = Aabb::empty();
        for &t in &self.order[start..end] {
            bounds.grow(&read_point(self.centroids, t.index()));
        }

        let id = NodeId::new(self.nodes.len());
        self.nodes.push(BvhNode {
            bounds,
            start: start as u32,
            count: count as u32,
            children: None,
        });

        if count <= self.leaf_size {
            return id;
        }

        let axis = bounds.largest_axis();
        let centroids = self.centroids;
        self.order[start..end].sort_by(|a, b| {
            centroids[a.index() * 3 + axis].total_cmp(&centroids[b.index() * 3 + axis])
        });

        let mid = start + count / 2;
        let left = self.build(start, mid);
        let right = self.build(mid, end);
        self.nodes[id.index()].children = Some([left, right]);
        id
    }
}
