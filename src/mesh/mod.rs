//! Mesh data as the sculpting engine sees it.
//!
//! # Overview
//!
//! The primary type is [`MeshAsset`]: flat `f32` positions (three per vertex), flat
//! `u32` triangle indices (three per triangle), per-vertex normals and a world
//! transform. This is the layout the model loader produces and the renderer uploads,
//! so the engine reads and writes it in place rather than converting to a richer
//! topology structure.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`TriangleId`] - Identifies a triangle
//! - [`NodeId`] - Identifies a BVH node
//!
//! Models and meshes are identified by [`ModelId`] and [`MeshId`].
//!
//! # Construction
//!
//! ```
//! use chisel::mesh::MeshAsset;
//! use nalgebra::Point3;
//!
//! let mesh = MeshAsset::from_points(
//!     "quad",
//!     &[
//!         Point3::new(0.0, 0.0, 0.0),
//!         Point3::new(1.0, 0.0, 0.0),
//!         Point3::new(0.0, 0.0, 1.0),
//!         Point3::new(1.0, 0.0, 1.0),
//!     ],
//!     &[[0, 2, 1], [1, 2, 3]],
//! )
//! .unwrap();
//! assert_eq!(mesh.num_triangles(), 2);
//! ```

mod adjacency;
mod asset;
mod builder;
mod index;
mod normals;
pub mod primitives;
mod transform;

pub use adjacency::{build_adjacency, Adjacency};
pub use asset::{MeshAsset, MeshPayload};
pub use builder::{flatten_points, flatten_triangles, read_point, validate_buffers, write_point};
pub use index::{MeshId, ModelId, NodeId, TriangleId, VertexId};
pub use normals::{compute_vertex_normals, recompute_normals_local};
pub use transform::{WorldTransform, MIN_AXIS_SCALE};
