//! Token-level n-gram trie language model.
//!
//! This crate provides the statistical core of a text-generation toolkit:
//! - A weighted prefix tree of observed token sequences (`Trie`)
//! - A fixed-order model with incremental loading, probability and
//!   completion queries (`NgramModel`)
//! - Constrained generation with bounded-retry semantics
//! - Compact binary persistence
//!
//! The core consumes pre-tokenized sequences of strings; tokenization,
//! tagging, and rendering are collaborators outside this crate.

/// Core trie and model types plus the generation algorithms.
pub mod model;

/// I/O helpers for corpus files and derived output paths.
///
/// Collaborator-side conveniences; the model itself performs no I/O
/// outside of explicit `save`/`load_from` calls.
pub mod io;
