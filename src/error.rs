//! Error taxonomy for the clustering and splash engines.
//!
//! Only caller misuse is an error here. Empty inputs, singleton clusters and
//! "nothing found" are ordinary results and never surface as an
//! [`EngineError`].

use thiserror::Error;

use crate::memory::types::EmbeddingKind;

/// Errors emitted by the analysis core.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested clustering algorithm name is not supported.
    #[error("unknown clustering algorithm: {0}. Supported: hdbscan, dbscan, agglomerative, kmeans")]
    UnknownAlgorithm(String),

    /// A splash analysis was requested in a mode whose query embedding was not supplied.
    #[error("{mode} embedding required for {mode} splash analysis")]
    MissingEmbedding {
        /// Mode the caller asked for.
        mode: EmbeddingKind,
    },

    /// A present embedding has a different length than the rest of the batch.
    #[error("embedding for memory {id} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        /// Memory whose embedding is malformed.
        id: String,
        /// Dimensionality shared by the rest of the batch.
        expected: usize,
        /// Dimensionality actually found.
        found: usize,
    },

    /// The corpus collaborator failed to load embeddings.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

/// Result alias for analysis operations.
pub type EngineResult<T> = Result<T, EngineError>;
