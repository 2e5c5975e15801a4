//! Error types for chisel.
//!
//! Only a handful of conditions are real errors: malformed mesh buffers, a dead or
//! saturated background worker, and bad parameters. Empty selections and degenerate
//! numeric input are not errors; the sculpting operations report them as `false`,
//! empty output or a zero radius.

use thiserror::Error;

use crate::mesh::{MeshId, ModelId};

/// Result type alias using [`SculptError`].
pub type Result<T> = std::result::Result<T, SculptError>;

/// Errors that can occur while building or managing sculpting data.
#[derive(Error, Debug)]
pub enum SculptError {
    /// The position buffer does not hold whole `xyz` triples.
    #[error("mesh {mesh}: position buffer length {len} is not a multiple of 3")]
    MalformedPositions {
        /// The offending mesh.
        mesh: MeshId,
        /// Length of the position buffer.
        len: usize,
    },

    /// The index buffer does not hold whole triangles.
    #[error("mesh {mesh}: index buffer length {len} is not a multiple of 3")]
    MalformedIndices {
        /// The offending mesh.
        mesh: MeshId,
        /// Length of the index buffer.
        len: usize,
    },

    /// A triangle references a vertex that does not exist.
    #[error("mesh {mesh}: triangle {triangle} references vertex {vertex}, but the mesh has {vertex_count} vertices")]
    InvalidVertexIndex {
        /// The offending mesh.
        mesh: MeshId,
        /// The triangle index.
        triangle: usize,
        /// The out-of-range vertex index.
        vertex: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// Building the spatial index for a mesh panicked on the worker thread.
    #[error("index build for model {model} panicked: {message}")]
    BuildPanicked {
        /// The model whose batch was being built.
        model: ModelId,
        /// The panic payload, if it was a string.
        message: String,
    },

    /// The bounded build queue is full; the request was not accepted.
    #[error("index build queue is full, request for model {model} was not accepted")]
    BuildQueueFull {
        /// The model whose request was rejected.
        model: ModelId,
    },

    /// The background worker has shut down.
    #[error("index build worker is no longer running")]
    WorkerDisconnected,

    /// The model is not loaded.
    #[error("unknown model: {0}")]
    UnknownModel(ModelId),

    /// Spawning the worker thread failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl SculptError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        SculptError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_identity() {
        let err = SculptError::InvalidVertexIndex {
            mesh: MeshId::new("body"),
            triangle: 3,
            vertex: 99,
            vertex_count: 12,
        };
        let text = err.to_string();
        assert!(text.contains("body"));
        assert!(text.contains("99"));
        assert!(text.contains("12"));
    }

    #[test]
    fn test_invalid_param() {
        let err = SculptError::invalid_param("leaf_size", 0, "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid parameter: leaf_size = 0 (must be at least 1)"
        );
    }
}
