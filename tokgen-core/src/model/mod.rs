//! Top-level module for the n-gram model.
//!
//! Layout, leaves first:
//! - `trie`: arena-backed weighted prefix tree with count bookkeeping and
//!   child selection
//! - `ngram_model`: fixed-order model built on the trie (loading, queries,
//!   merging, persistence)
//! - `generator`: bounded-retry generation algorithms layered on the model

/// Arena-backed weighted prefix tree.
///
/// Nodes are addressed by copyable ids; the parent back-reference is a
/// plain id used only for probability denominators.
pub mod trie;

/// Fixed-order n-gram model (`order >= 1`).
///
/// Handles sliding-window ingestion, path resolution, probability and
/// completion queries, merging, and binary persistence.
pub mod ngram_model;

/// Generation algorithms and their result type.
///
/// Implemented as additional methods on `NgramModel`; all randomness is
/// drawn through an injectable `rand::Rng` source.
pub mod generator;
