//! Core trait abstractions for the indexer library.
//!
//! These traits define the seams to the outside world: the directory
//! listing service, profile resolution, and the document store.

pub mod directory;
pub mod resolver;
pub mod store;
