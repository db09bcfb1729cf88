//! Memory clustering and splash analysis for an agent's long-term memory.
//!
//! Memories are short texts carrying up to two precomputed embeddings: a
//! semantic one (what the memory is about) and an emotional one (how it
//! feels). This crate finds structure in that store:
//!
//! - **Clustering** groups memories into candidate clusters with one of four
//!   algorithms and ranks them by an interestingness score that balances
//!   cluster size against tightness.
//! - **Splash analysis** takes one memory and reports the most and least
//!   similar memories already stored.
//!
//! | Algorithm | Name | Noise | Driven by |
//! |-----------|------|-------|-----------|
//! | Variable-density (HDBSCAN) | `hdbscan` | yes | similarity threshold |
//! | Fixed-epsilon density (DBSCAN) | `dbscan` | yes | similarity threshold |
//! | Average-linkage agglomerative | `agglomerative` | no | similarity threshold |
//! | K-means | `kmeans` | no | cluster count |
//!
//! # Missing embeddings
//!
//! The two analyses treat a memory without the requested embedding
//! differently. Clustering substitutes a zero vector so labels stay aligned
//! with the input; splash analysis leaves the memory out. Cosine similarity
//! against a zero vector is defined as `0.0`.
//!
//! # Modules
//!
//! - [`vector`]: cosine similarity and distance primitives
//! - [`cluster`]: clustering algorithms, candidates, ranking, and the last-run cache
//! - [`splash`]: most/least similar retrieval and its Markdown rendering
//! - [`memory`]: the memory record and its SQLite store
//! - [`db`]: schema and migrations
//! - [`config`]: configuration from TOML and environment variables
//! - [`time`]: human-readable ages and timestamps
//! - [`error`]: errors raised by the analysis core

pub mod cluster;
pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod splash;
pub mod time;
pub mod vector;
